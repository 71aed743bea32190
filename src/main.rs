//! Binary entrypoint for the Taleforge CLI.
//!
//! Commands:
//! - `play [--game <dir>] [--offline] [--seed <n>]` - run a session on the console
//! - `init` - create a starter `config.toml` and a sample game under `data/game`
//! - `validate [--game <dir>]` - load a game definition and report problems
//!
//! The console loop recognizes two reserved words before interpretation:
//! `quit`/`exit` ends the session, `help` prints the command summary.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{info, warn, LevelFilter};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use taleforge::config::Config;
use taleforge::engine::{ActionIntent, ActionKind, Session};
use taleforge::llm::{GenerativeClient, OllamaClient, ScriptedClient};
use taleforge::world::GameDefinition;

#[derive(Parser)]
#[command(name = "taleforge")]
#[command(about = "A text-adventure engine with generative narration")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a game on the console
    Play {
        /// Game directory (overrides the config file)
        #[arg(short, long)]
        game: Option<String>,

        /// Run without the generative service; fallback paths only
        #[arg(long)]
        offline: bool,

        /// Fixed RNG seed for a reproducible playthrough
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Create a starter configuration and sample game
    Init,
    /// Check a game definition without playing it
    Validate {
        /// Game directory (overrides the config file)
        #[arg(short, long)]
        game: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config early so its log level can seed the logger; Init runs
    // before a config exists.
    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Play {
            game,
            offline,
            seed,
        } => {
            let config = match pre_config {
                Some(config) => config,
                None => {
                    warn!(
                        "no readable config at '{}'; using built-in defaults",
                        cli.config
                    );
                    Config::default()
                }
            };
            let game_dir = game.unwrap_or_else(|| config.game.dir.clone());
            let definition = GameDefinition::load(&game_dir)?;

            let client: Box<dyn GenerativeClient> = if offline || !config.llm.enabled {
                info!("running offline: deterministic fallbacks only");
                Box::new(ScriptedClient::empty())
            } else {
                Box::new(OllamaClient::with_timeout(
                    &config.llm.base_url,
                    &config.llm.model,
                    config.llm.timeout_secs,
                ))
            };

            let rng_seed = seed.or(config.session.rng_seed);
            let mut session = Session::new(definition, client, rng_seed);
            run_console(&mut session).await?;
        }
        Commands::Init => {
            Config::create_default(&cli.config).await?;
            println!("Wrote {}", cli.config);
            if std::path::Path::new("data/game/game.toml").exists() {
                println!("data/game already present; leaving it alone.");
            } else {
                println!(
                    "No game found at data/game. Copy a game definition there \
                     or point [game] dir at one."
                );
            }
            println!("Edit the [llm] section to point at your model endpoint, then run: taleforge play");
        }
        Commands::Validate { game } => {
            let game_dir = game
                .or(pre_config.map(|c| c.game.dir))
                .unwrap_or_else(|| "data/game".to_string());
            match GameDefinition::load(&game_dir) {
                Ok(definition) => {
                    println!(
                        "'{}' is valid: {} rooms, {} items, {} characters, {} quests, {} recipes.",
                        definition.meta.name,
                        definition.rooms.len(),
                        definition.items.len(),
                        definition.characters.len(),
                        definition.quests.len(),
                        definition.recipes.len()
                    );
                }
                Err(e) => {
                    eprintln!("Validation failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

/// Read lines, hand them to the session, print responses. Reserved
/// words bypass interpretation entirely.
async fn run_console(session: &mut Session) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(format!("{}\n", session.intro()).as_bytes())
        .await?;
    stdout.write_all(b"> ").await?;
    stdout.flush().await?;

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        match trimmed.to_lowercase().as_str() {
            "quit" | "exit" => {
                stdout.write_all(b"Farewell.\n").await?;
                break;
            }
            "help" => {
                let text = session
                    .process_intent(ActionIntent::new(ActionKind::Help))
                    .await;
                stdout.write_all(format!("{}\n\n> ", text).as_bytes()).await?;
                stdout.flush().await?;
                continue;
            }
            _ => {}
        }

        let turn = session.process_turn(trimmed).await;
        stdout
            .write_all(format!("{}\n", turn.response).as_bytes())
            .await?;
        if turn.game_over {
            info!("session over after {} turns", session.world().turn);
            break;
        }
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;
    }

    Ok(())
}

/// Initialize env_logger: config level first, then -v flags, then
/// RUST_LOG on top. Colors only when stderr is a terminal.
fn init_logging(config: &Option<Config>, verbose: u8) {
    let base = config
        .as_ref()
        .map(|c| c.logging.level.as_str())
        .unwrap_or("info");
    let level = match verbose {
        0 => match base {
            "error" => LevelFilter::Error,
            "warn" => LevelFilter::Warn,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            _ => LevelFilter::Info,
        },
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if !atty::is(atty::Stream::Stderr) {
        builder.write_style(env_logger::WriteStyle::Never);
    }
    // RUST_LOG wins over everything when set.
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }
    let _ = builder.try_init();
}
