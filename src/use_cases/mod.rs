// Use cases layer: the game-mode controller and the per-match runtime around it.

pub mod game;
pub mod game_mode;
pub mod matches;
pub mod types;

pub use game_mode::VipFiesta;
pub use matches::{MatchError, MatchHandle, MatchRegistry, MatchSettings};
pub use types::{GameEvent, ServerState, WorldUpdate};
