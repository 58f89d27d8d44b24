// Wire protocol DTOs and conversions for the public WebSocket API.
// Player ids travel as strings so JavaScript clients keep full u64 precision.

use crate::domain::ports::{Audience, Notice, ScoreboardRow, SpotMode};
use crate::domain::state::{TeamId, Vec3};
use crate::domain::systems::ranking::{TeamStanding, rank_label};
use crate::domain::tuning::MarkerIcon;
use crate::interface_adapters::platform::{NoticeRecord, SimMarker, SpotRecord};
use crate::use_cases::{ServerState, WorldUpdate};
use serde::{Deserialize, Serialize};

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Assigned identity for the connection after Join is accepted.
    Identity { player_id: String, team_id: TeamId },
    WorldUpdate(WorldUpdateDto),
    GameState(ServerStateDto),
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    Join(JoinPayload),
    Deploy,
    Move(MovePayload),
    Died(DiedPayload),
    SwitchTeam(SwitchTeamPayload),
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinPayload {
    pub team_id: TeamId,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MovePayload {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl MovePayload {
    /// Rejects NaN and infinite coordinates.
    pub fn to_position(self) -> Option<Vec3> {
        if !(self.x.is_finite() && self.y.is_finite() && self.z.is_finite()) {
            return None;
        }
        Some(Vec3::new(self.x, self.y, self.z))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiedPayload {
    // Absent for environmental deaths.
    #[serde(default)]
    pub killer_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SwitchTeamPayload {
    pub team_id: TeamId,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorldUpdateDto {
    pub tick: u64,
    pub remaining_ms: u64,
    pub vips: Vec<VipDto>,
    pub markers: Vec<MarkerDto>,
    pub pings: Vec<PingDto>,
    pub notices: Vec<NoticeDto>,
    pub scoreboard: Vec<ScoreboardRowDto>,
    pub standings: Vec<StandingDto>,
    pub viewer_standings: Vec<ViewerStandingsDto>,
}

impl From<WorldUpdate> for WorldUpdateDto {
    fn from(update: WorldUpdate) -> Self {
        Self {
            tick: update.tick,
            remaining_ms: update.remaining.as_millis() as u64,
            vips: update
                .vips
                .iter()
                .map(|(team_id, vip)| VipDto {
                    team_id: *team_id,
                    player_id: vip.to_string(),
                })
                .collect(),
            markers: update.markers.iter().map(MarkerDto::from).collect(),
            pings: update.pings.iter().map(PingDto::from).collect(),
            notices: update.notices.iter().map(NoticeDto::from).collect(),
            scoreboard: update.scoreboard.iter().map(ScoreboardRowDto::from).collect(),
            standings: update.standings.iter().map(StandingDto::from).collect(),
            viewer_standings: update
                .viewer_standings
                .iter()
                .map(|(team_id, shown)| ViewerStandingsDto {
                    team_id: *team_id,
                    standings: shown.iter().map(StandingDto::from).collect(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VipDto {
    pub team_id: TeamId,
    pub player_id: String,
}

/// A world marker; `team_id` is the only team that should render it.
#[derive(Debug, Clone, Serialize)]
pub struct MarkerDto {
    pub id: u64,
    pub team_id: TeamId,
    pub player_id: String,
    pub icon: MarkerIcon,
    pub color_rgb: [f32; 3],
    pub friendly: bool,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<&SimMarker> for MarkerDto {
    fn from(marker: &SimMarker) -> Self {
        Self {
            id: marker.handle.0,
            team_id: marker.owner,
            player_id: marker.subject.to_string(),
            icon: marker.style.icon,
            color_rgb: marker.style.color_rgb,
            friendly: marker.style.friendly,
            x: marker.position.x,
            y: marker.position.y,
            z: marker.position.z,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpotModeDto {
    Minimap,
    World,
    Both,
}

impl From<SpotMode> for SpotModeDto {
    fn from(mode: SpotMode) -> Self {
        match mode {
            SpotMode::Minimap => SpotModeDto::Minimap,
            SpotMode::World => SpotModeDto::World,
            SpotMode::Both => SpotModeDto::Both,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PingDto {
    pub player_id: String,
    pub duration_ms: u64,
    pub mode: SpotModeDto,
}

impl From<&SpotRecord> for PingDto {
    fn from(spot: &SpotRecord) -> Self {
        Self {
            player_id: spot.player_id.to_string(),
            duration_ms: spot.duration.as_millis() as u64,
            mode: spot.mode.into(),
        }
    }
}

/// Notice recipients; clients show only notices addressed to them.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "scope", content = "id")]
pub enum AudienceDto {
    Everyone,
    Team(TeamId),
    Player(String),
}

impl From<Audience> for AudienceDto {
    fn from(audience: Audience) -> Self {
        match audience {
            Audience::Everyone => AudienceDto::Everyone,
            Audience::Team(team_id) => AudienceDto::Team(team_id),
            Audience::Player(player_id) => AudienceDto::Player(player_id.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoticeKindDto {
    GameStarting { target_vip_kills: u32 },
    Introduction { target_vip_kills: u32 },
    YouAreVip,
    NewVip { vip: String },
    VipDied,
    SelectingNewVip,
    VipKilled { team_id: TeamId, score: u32 },
    TeamWins { team_id: TeamId },
    VipStatusGained,
}

impl From<&Notice> for NoticeKindDto {
    fn from(notice: &Notice) -> Self {
        match notice {
            Notice::GameStarting { target_vip_kills } => NoticeKindDto::GameStarting {
                target_vip_kills: *target_vip_kills,
            },
            Notice::Introduction { target_vip_kills } => NoticeKindDto::Introduction {
                target_vip_kills: *target_vip_kills,
            },
            Notice::YouAreVip => NoticeKindDto::YouAreVip,
            Notice::NewVip { vip } => NoticeKindDto::NewVip {
                vip: vip.to_string(),
            },
            Notice::VipDied => NoticeKindDto::VipDied,
            Notice::SelectingNewVip => NoticeKindDto::SelectingNewVip,
            Notice::VipKilled { team_id, score } => NoticeKindDto::VipKilled {
                team_id: *team_id,
                score: *score,
            },
            Notice::TeamWins { team_id } => NoticeKindDto::TeamWins { team_id: *team_id },
            Notice::VipStatusGained => NoticeKindDto::VipStatusGained,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NoticeDto {
    pub audience: AudienceDto,
    pub notice: NoticeKindDto,
}

impl From<&NoticeRecord> for NoticeDto {
    fn from(record: &NoticeRecord) -> Self {
        Self {
            audience: record.audience.into(),
            notice: NoticeKindDto::from(&record.notice),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreboardRowDto {
    pub player_id: String,
    pub team_id: TeamId,
    pub vip_kills: u32,
    pub kills: u32,
    pub deaths: u32,
    pub sort_key: u64,
}

impl From<&ScoreboardRow> for ScoreboardRowDto {
    fn from(row: &ScoreboardRow) -> Self {
        Self {
            player_id: row.player_id.to_string(),
            team_id: row.team_id,
            vip_kills: row.vip_kills,
            kills: row.kills,
            deaths: row.deaths,
            sort_key: row.sort_key,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StandingDto {
    pub team_id: TeamId,
    pub vip_kills: u32,
    pub rank: u32,
    pub label: String,
}

impl From<&TeamStanding> for StandingDto {
    fn from(standing: &TeamStanding) -> Self {
        Self {
            team_id: standing.team_id,
            vip_kills: standing.vip_kills,
            rank: standing.rank,
            label: rank_label(standing.rank),
        }
    }
}

/// Standings as shown to the players of `team_id`.
#[derive(Debug, Clone, Serialize)]
pub struct ViewerStandingsDto {
    pub team_id: TeamId,
    pub standings: Vec<StandingDto>,
}

/// Server lifecycle state sent to clients for UI flow.
#[derive(Debug, Clone, Serialize)]
pub enum ServerStateDto {
    Lobby,
    MatchStarting { in_seconds: u32 },
    MatchRunning,
    MatchEnded { winner: Option<TeamId> },
}

impl From<ServerState> for ServerStateDto {
    fn from(state: ServerState) -> Self {
        match state {
            ServerState::Lobby => ServerStateDto::Lobby,
            ServerState::MatchStarting { in_seconds } => {
                ServerStateDto::MatchStarting { in_seconds }
            }
            ServerState::MatchRunning => ServerStateDto::MatchRunning,
            ServerState::MatchEnded { winner } => ServerStateDto::MatchEnded { winner },
        }
    }
}
