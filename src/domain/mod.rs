// Domain layer: match state, rules and the platform port.

pub mod ports;
pub mod state;
pub mod systems;
pub mod tuning;

pub use ports::{Audience, Notice, Platform, PlatformError};
pub use state::{MatchState, PlayerId, PlayerStats, RosterEntry, TeamId, Vec3};
pub use tuning::VipFiestaConfig;
