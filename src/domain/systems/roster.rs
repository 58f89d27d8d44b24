// Roster reconciliation: keeps per-player and per-team bookkeeping aligned with the
// platform's live player list. A set reconciliation, safe to run on every event.

use crate::domain::state::{MatchState, PlayerId, RosterEntry, TeamId};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RosterChanges {
    pub joined: Vec<PlayerId>,
    pub departed: Vec<PlayerId>,
    // Teams whose VIP is no longer one of their members; the slot was cleared.
    pub orphaned_teams: Vec<TeamId>,
}

impl RosterChanges {
    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.departed.is_empty() && self.orphaned_teams.is_empty()
    }
}

pub fn sync_roster(state: &mut MatchState, roster: &[RosterEntry]) -> RosterChanges {
    let mut changes = RosterChanges::default();
    let membership: HashMap<PlayerId, TeamId> = roster
        .iter()
        .map(|entry| (entry.player_id, entry.team_id))
        .collect();
    let present_teams: HashSet<TeamId> = membership.values().copied().collect();

    for entry in roster {
        if !state.players.contains_key(&entry.player_id) {
            state.players.insert(entry.player_id, Default::default());
            changes.joined.push(entry.player_id);
        }
        state.teams.entry(entry.team_id).or_default();
    }

    state.players.retain(|player_id, _| {
        let keep = membership.contains_key(player_id);
        if !keep {
            changes.departed.push(*player_id);
        }
        keep
    });
    state
        .teams
        .retain(|team_id, _| present_teams.contains(team_id));
    state
        .pending
        .retain(|task| present_teams.contains(&task.team_id));

    for (team_id, team) in state.teams.iter_mut() {
        if let Some(vip) = team.vip {
            if membership.get(&vip) != Some(team_id) {
                team.vip = None;
                changes.orphaned_teams.push(*team_id);
            }
        }
    }

    changes.joined.sort_unstable();
    changes.departed.sort_unstable();
    changes.orphaned_teams.sort_unstable();
    changes
}
