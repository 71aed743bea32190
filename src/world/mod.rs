//! World model: entity records, inventory operations, the game-definition
//! loader, and the mutable per-session state the engine executes against.

pub mod inventory;
pub mod loader;
pub mod state;
pub mod types;

pub use loader::{GameDefinition, LoadError};
pub use state::{WorldState, PLAYER_ID};
pub use types::*;
