// Domain-level match state: identifiers, counters and the VIP assignment relation.

use std::collections::HashMap;
use std::time::Duration;

pub type PlayerId = u64;
pub type TeamId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn raised(self, meters: f32) -> Self {
        Self {
            y: self.y + meters,
            ..self
        }
    }
}

/// One roster line as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RosterEntry {
    pub player_id: PlayerId,
    pub team_id: TeamId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerStats {
    pub kills: u32,
    pub deaths: u32,
    // Kills where the victim was an enemy VIP.
    pub vip_kills: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TeamRecord {
    pub vip: Option<PlayerId>,
    // VIP kills credited to this team.
    pub vip_kills: u32,
}

/// A delayed re-assignment scheduled after a VIP death.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingReassignment {
    pub team_id: TeamId,
    pub due_at: Duration,
    // The VIP that was cleared; avoided by the next selection when possible.
    pub previous: Option<PlayerId>,
}

/// All mutable bookkeeping for a single match.
///
/// Owned by the controller and handed to each system by reference, so tests can
/// build isolated instances and a match teardown is simply a drop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchState {
    pub players: HashMap<PlayerId, PlayerStats>,
    pub teams: HashMap<TeamId, TeamRecord>,
    pub pending: Vec<PendingReassignment>,
    pub ended: bool,
    pub winner: Option<TeamId>,
}

impl MatchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vip_of(&self, team_id: TeamId) -> Option<PlayerId> {
        self.teams.get(&team_id).and_then(|team| team.vip)
    }

    /// Team whose current VIP is `player_id`, if any.
    pub fn team_with_vip(&self, player_id: PlayerId) -> Option<TeamId> {
        self.teams
            .iter()
            .find(|(_, team)| team.vip == Some(player_id))
            .map(|(team_id, _)| *team_id)
    }

    pub fn is_vip(&self, player_id: PlayerId, team_id: TeamId) -> bool {
        self.vip_of(team_id) == Some(player_id)
    }

    pub fn stats(&self, player_id: PlayerId) -> PlayerStats {
        self.players.get(&player_id).copied().unwrap_or_default()
    }

    pub fn team_vip_kills(&self, team_id: TeamId) -> u32 {
        self.teams
            .get(&team_id)
            .map(|team| team.vip_kills)
            .unwrap_or_default()
    }

    pub fn has_pending(&self, team_id: TeamId) -> bool {
        self.pending.iter().any(|task| task.team_id == team_id)
    }

    /// Current (team, vip) pairs in ascending team order.
    pub fn assignments(&self) -> Vec<(TeamId, PlayerId)> {
        let mut pairs: Vec<(TeamId, PlayerId)> = self
            .teams
            .iter()
            .filter_map(|(team_id, team)| team.vip.map(|vip| (*team_id, vip)))
            .collect();
        pairs.sort_unstable();
        pairs
    }
}
