// Port to the hosting game platform: identity, world queries, messaging, markers,
// scoreboard and match timing. Implemented by an adapter; the domain never
// talks to the platform any other way.

use crate::domain::state::{PlayerId, RosterEntry, TeamId, Vec3};
use crate::domain::tuning::MarkerIcon;
use std::fmt;
use std::time::Duration;

/// Who a notice is shown to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Everyone,
    Team(TeamId),
    Player(PlayerId),
}

/// Parameterized notification. Text content is owned by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    GameStarting { target_vip_kills: u32 },
    Introduction { target_vip_kills: u32 },
    YouAreVip,
    NewVip { vip: PlayerId },
    VipDied,
    SelectingNewVip,
    VipKilled { team_id: TeamId, score: u32 },
    TeamWins { team_id: TeamId },
    // Edge-triggered HUD status change (false to true only).
    VipStatusGained,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerStyle {
    pub icon: MarkerIcon,
    pub color_rgb: [f32; 3],
    pub friendly: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotMode {
    Minimap,
    World,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreboardColumn {
    pub name: &'static str,
    // Percentage of the scoreboard width; a zero width hides the column.
    pub width: u8,
}

/// One scoreboard line. `sort_key` is the hidden ascending sort column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreboardRow {
    pub player_id: PlayerId,
    pub team_id: TeamId,
    pub vip_kills: u32,
    pub kills: u32,
    pub deaths: u32,
    pub sort_key: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    UnknownMarker(MarkerHandle),
    UnknownPlayer(PlayerId),
    Rejected(String),
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::UnknownMarker(handle) => write!(f, "unknown marker {}", handle.0),
            PlatformError::UnknownPlayer(id) => write!(f, "unknown player {id}"),
            PlatformError::Rejected(reason) => write!(f, "platform rejected call: {reason}"),
        }
    }
}

pub trait Platform {
    fn roster(&self) -> Vec<RosterEntry>;
    fn team_of(&self, player_id: PlayerId) -> Option<TeamId>;
    fn is_alive(&self, player_id: PlayerId) -> bool;
    fn position(&self, player_id: PlayerId) -> Option<Vec3>;

    fn notify(&mut self, audience: Audience, notice: Notice);

    /// Spawns a marker visible to `owner` that tracks `subject`.
    fn spawn_marker(
        &mut self,
        owner: TeamId,
        subject: PlayerId,
        style: MarkerStyle,
        position: Vec3,
    ) -> Result<MarkerHandle, PlatformError>;
    fn move_marker(&mut self, handle: MarkerHandle, position: Vec3) -> Result<(), PlatformError>;
    fn remove_marker(&mut self, handle: MarkerHandle) -> Result<(), PlatformError>;
    fn spot(&mut self, player_id: PlayerId, duration: Duration, mode: SpotMode);

    /// Declares the scoreboard layout once per match.
    fn configure_scoreboard(
        &mut self,
        columns: &'static [ScoreboardColumn],
        sort_column: usize,
        ascending: bool,
    );
    fn set_scoreboard_row(&mut self, row: ScoreboardRow);

    fn remaining_time(&self) -> Duration;
    fn end_round(&mut self, winner: Option<TeamId>);

    /// Members of `team_id` in roster order.
    fn members_of(&self, team_id: TeamId) -> Vec<PlayerId> {
        self.roster()
            .into_iter()
            .filter(|entry| entry.team_id == team_id)
            .map(|entry| entry.player_id)
            .collect()
    }
}
