// Use-case level inputs/outputs for the match world task.

use crate::domain::state::{PlayerId, TeamId, Vec3};
use crate::domain::ports::ScoreboardRow;
use crate::domain::systems::ranking::TeamStanding;
use crate::interface_adapters::platform::{NoticeRecord, SimMarker, SpotRecord};
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum GameEvent {
    Join { player_id: PlayerId, team_id: TeamId },
    Leave { player_id: PlayerId },
    Deploy { player_id: PlayerId },
    Move { player_id: PlayerId, position: Vec3 },
    Died { player_id: PlayerId, killer_id: Option<PlayerId> },
    SwitchTeam { player_id: PlayerId, team_id: TeamId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerState {
    Lobby,
    MatchStarting { in_seconds: u32 },
    MatchRunning,
    MatchEnded { winner: Option<TeamId> },
}

#[derive(Debug, Clone)]
pub struct WorldUpdate {
    pub tick: u64,
    pub remaining: Duration,
    // (team, vip) pairs in team order.
    pub vips: Vec<(TeamId, PlayerId)>,
    pub markers: Vec<SimMarker>,
    // Pings and notices raised since the previous update.
    pub pings: Vec<SpotRecord>,
    pub notices: Vec<NoticeRecord>,
    pub scoreboard: Vec<ScoreboardRow>,
    pub standings: Vec<TeamStanding>,
    // What each team's players are shown: top three, own team kept visible.
    pub viewer_standings: Vec<(TeamId, Vec<TeamStanding>)>,
}
