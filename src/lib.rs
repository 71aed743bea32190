//! # Taleforge - a text-adventure engine with generative narration
//!
//! Taleforge resolves free-form player input against a deterministic
//! rule-based world. An external generative text service interprets
//! utterances into structured intents and narrates the outcomes, but it
//! never decides what happens: every mechanical fact — movement, combat,
//! trade, crafting — is computed by the engine first, and the narration
//! is constrained to agree with it. When the service is slow, down, or
//! talking nonsense, deterministic fallbacks keep every turn playable.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use taleforge::config::Config;
//! use taleforge::engine::Session;
//! use taleforge::llm::OllamaClient;
//! use taleforge::world::GameDefinition;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let game = GameDefinition::load(&config.game.dir)?;
//!     let client = OllamaClient::new(&config.llm.base_url, &config.llm.model);
//!     let mut session = Session::new(game, Box::new(client), None);
//!
//!     println!("{}", session.intro());
//!     let turn = session.process_turn("look around").await;
//!     println!("{}", turn.response);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`world`] - entity records, inventory, the game-definition loader,
//!   and mutable per-session state
//! - [`engine`] - intent interpretation, action execution, combat,
//!   economy/crafting/gathering, quests, narration, and the session loop
//! - [`llm`] - the generative service port, HTTP and scripted backends,
//!   and defensive JSON extraction
//! - [`config`] - TOML engine configuration
//!
//! ## Turn Pipeline
//!
//! ```text
//! utterance
//!    │
//! ┌──▼──────────────┐   ordered    ┌─────────────────┐  structured
//! │ Intent          │─ intents ───▶│ Action          │─ results ──┐
//! │ Interpreter     │              │ Executor        │            │
//! └─────────────────┘              └─────────────────┘            │
//!    (service + fallback)             (only place the          ┌──▼───────┐
//!                                      world mutates)          │ Narrator │
//!                                                              └──┬───────┘
//!                                              response + footer ◀┘
//! ```

pub mod config;
pub mod engine;
pub mod llm;
pub mod logutil;
pub mod world;
