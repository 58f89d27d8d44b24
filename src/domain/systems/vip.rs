// VIP assignment state machine.
//
// Per team: Unassigned -> Assigned -> Unassigned. A death clears the slot and
// schedules a delayed reassignment; a departure clears it and reassigns at once
// (or after the delay, when configured). The scheduled task re-checks the world
// when it fires because anything may have happened in between.

use crate::domain::ports::Platform;
use crate::domain::state::{MatchState, PendingReassignment, PlayerId, RosterEntry, TeamId};
use crate::domain::systems::selection::{SelectionStrategy, select_vip};
use rand::Rng;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub team_id: TeamId,
    pub vip: PlayerId,
}

/// Assigns a VIP to `team_id` if it has none. `avoid` is skipped when anyone else
/// is eligible. Empty teams stay unassigned.
pub fn assign_if_missing<P, R>(
    state: &mut MatchState,
    platform: &P,
    team_id: TeamId,
    strategy: SelectionStrategy,
    avoid: Option<PlayerId>,
    rng: &mut R,
) -> Option<Assignment>
where
    P: Platform + ?Sized,
    R: Rng + ?Sized,
{
    let team = state.teams.get(&team_id)?;
    if team.vip.is_some() {
        return None;
    }

    let members = platform.members_of(team_id);
    let alive: Vec<PlayerId> = members
        .iter()
        .copied()
        .filter(|id| platform.is_alive(*id))
        .collect();
    let pool = if alive.is_empty() { members } else { alive };
    let preferred: Vec<PlayerId> = pool
        .iter()
        .copied()
        .filter(|id| Some(*id) != avoid)
        .collect();
    let candidates = if preferred.is_empty() { pool } else { preferred };

    let Some(vip) = select_vip(&candidates, &state.players, strategy, rng) else {
        debug!(team_id, "no VIP candidates; team stays unassigned");
        return None;
    };

    // A VIP of another team here means the state machine was bypassed.
    let elsewhere = state.team_with_vip(vip);
    debug_assert!(elsewhere.is_none(), "player {vip} is already VIP of {elsewhere:?}");
    if elsewhere.is_some() || platform.team_of(vip) != Some(team_id) {
        return None;
    }

    if let Some(team) = state.teams.get_mut(&team_id) {
        team.vip = Some(vip);
    }
    info!(team_id, vip, "VIP assigned");
    Some(Assignment { team_id, vip })
}

/// Clears the VIP of `team_id`, returning who it was.
pub fn clear_vip(state: &mut MatchState, team_id: TeamId) -> Option<PlayerId> {
    let cleared = state.teams.get_mut(&team_id)?.vip.take();
    if let Some(vip) = cleared {
        info!(team_id, vip, "VIP cleared");
    }
    cleared
}

pub fn schedule_reassignment(
    state: &mut MatchState,
    team_id: TeamId,
    due_at: Duration,
    previous: Option<PlayerId>,
) {
    if state.has_pending(team_id) {
        return;
    }
    debug!(team_id, due_at_ms = due_at.as_millis() as u64, "VIP reassignment scheduled");
    state.pending.push(PendingReassignment {
        team_id,
        due_at,
        previous,
    });
}

/// Removes and returns every task due at `now`, earliest first.
pub fn take_due(state: &mut MatchState, now: Duration) -> Vec<PendingReassignment> {
    let (mut due, waiting): (Vec<_>, Vec<_>) =
        state.pending.drain(..).partition(|task| task.due_at <= now);
    state.pending = waiting;
    due.sort_by_key(|task| (task.due_at, task.team_id));
    due
}

/// Runs a fired reassignment task after re-validating it.
pub fn fire_reassignment<P, R>(
    state: &mut MatchState,
    platform: &P,
    task: PendingReassignment,
    strategy: SelectionStrategy,
    frozen: bool,
    rng: &mut R,
) -> Option<Assignment>
where
    P: Platform + ?Sized,
    R: Rng + ?Sized,
{
    if frozen {
        debug!(team_id = task.team_id, "match frozen; reassignment skipped");
        return None;
    }
    if state.vip_of(task.team_id).is_some() {
        // Someone was already assigned, e.g. by a departure in the meantime.
        return None;
    }
    assign_if_missing(state, platform, task.team_id, strategy, task.previous, rng)
}

/// At most one VIP per team, each a current member of that team.
pub fn assignments_consistent(state: &MatchState, roster: &[RosterEntry]) -> bool {
    let mut seen = std::collections::HashSet::new();
    state.assignments().into_iter().all(|(team_id, vip)| {
        seen.insert(vip)
            && roster
                .iter()
                .any(|entry| entry.player_id == vip && entry.team_id == team_id)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::systems::roster::sync_roster;
    use crate::interface_adapters::platform::SimPlatform;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn setup(players: &[(PlayerId, TeamId)]) -> (MatchState, SimPlatform, StdRng) {
        let mut platform = SimPlatform::new(Duration::from_secs(600));
        for (player_id, team_id) in players {
            platform.add_player(*player_id, *team_id);
            platform.set_alive(*player_id, true);
        }
        let mut state = MatchState::new();
        sync_roster(&mut state, &platform.roster());
        (state, platform, StdRng::seed_from_u64(42))
    }

    #[test]
    fn when_team_has_no_vip_then_a_member_is_assigned() {
        let (mut state, platform, mut rng) = setup(&[(1, 1), (2, 1), (3, 2)]);

        let assignment =
            assign_if_missing(&mut state, &platform, 1, SelectionStrategy::Random, None, &mut rng)
                .expect("team 1 should get a VIP");

        assert!(matches!(assignment.vip, 1 | 2));
        assert_eq!(state.vip_of(1), Some(assignment.vip));
        assert!(assignments_consistent(&state, &platform.roster()));
    }

    #[test]
    fn when_team_already_has_vip_then_nothing_changes() {
        let (mut state, platform, mut rng) = setup(&[(1, 1), (2, 1)]);
        state.teams.get_mut(&1).unwrap().vip = Some(2);

        let assignment =
            assign_if_missing(&mut state, &platform, 1, SelectionStrategy::Random, None, &mut rng);

        assert_eq!(assignment, None);
        assert_eq!(state.vip_of(1), Some(2));
    }

    #[test]
    fn when_team_has_no_members_then_it_stays_unassigned() {
        let (mut state, platform, mut rng) = setup(&[(1, 1)]);
        state.teams.insert(9, Default::default());

        let assignment =
            assign_if_missing(&mut state, &platform, 9, SelectionStrategy::Random, None, &mut rng);

        assert_eq!(assignment, None);
        assert_eq!(state.vip_of(9), None);
    }

    #[test]
    fn when_alive_members_exist_then_dead_members_are_skipped() {
        let (mut state, mut platform, mut rng) = setup(&[(1, 1), (2, 1), (3, 1)]);
        platform.set_alive(1, false);
        platform.set_alive(3, false);

        for _ in 0..10 {
            state.teams.get_mut(&1).unwrap().vip = None;
            let assignment =
                assign_if_missing(&mut state, &platform, 1, SelectionStrategy::Random, None, &mut rng);
            assert_eq!(assignment.map(|a| a.vip), Some(2));
        }
    }

    #[test]
    fn when_previous_vip_is_avoided_then_someone_else_is_picked() {
        let (mut state, platform, mut rng) = setup(&[(1, 1), (2, 1)]);

        for _ in 0..10 {
            state.teams.get_mut(&1).unwrap().vip = None;
            let assignment = assign_if_missing(
                &mut state,
                &platform,
                1,
                SelectionStrategy::Random,
                Some(1),
                &mut rng,
            );
            assert_eq!(assignment.map(|a| a.vip), Some(2));
        }
    }

    #[test]
    fn when_only_previous_vip_remains_then_they_are_picked_again() {
        let (mut state, platform, mut rng) = setup(&[(1, 1)]);

        let assignment =
            assign_if_missing(&mut state, &platform, 1, SelectionStrategy::Random, Some(1), &mut rng);

        assert_eq!(assignment.map(|a| a.vip), Some(1));
    }

    #[test]
    fn when_tasks_are_due_then_only_due_ones_are_taken() {
        let (mut state, _platform, _rng) = setup(&[(1, 1), (2, 2)]);
        schedule_reassignment(&mut state, 2, Duration::from_secs(8), None);
        schedule_reassignment(&mut state, 1, Duration::from_secs(5), None);
        // Duplicate schedule for a team is ignored.
        schedule_reassignment(&mut state, 1, Duration::from_secs(6), None);

        assert!(take_due(&mut state, Duration::from_secs(4)).is_empty());
        let due = take_due(&mut state, Duration::from_secs(5));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].team_id, 1);
        assert_eq!(state.pending.len(), 1);
    }

    #[test]
    fn when_task_fires_after_team_got_vip_then_it_is_a_no_op() {
        let (mut state, platform, mut rng) = setup(&[(1, 1), (2, 1)]);
        state.teams.get_mut(&1).unwrap().vip = Some(1);
        let task = PendingReassignment {
            team_id: 1,
            due_at: Duration::ZERO,
            previous: Some(2),
        };

        let fired =
            fire_reassignment(&mut state, &platform, task, SelectionStrategy::Random, false, &mut rng);

        assert_eq!(fired, None);
        assert_eq!(state.vip_of(1), Some(1));
    }

    #[test]
    fn when_task_fires_into_frozen_match_then_it_is_a_no_op() {
        let (mut state, platform, mut rng) = setup(&[(1, 1), (2, 1)]);
        let task = PendingReassignment {
            team_id: 1,
            due_at: Duration::ZERO,
            previous: None,
        };

        let fired =
            fire_reassignment(&mut state, &platform, task, SelectionStrategy::Random, true, &mut rng);

        assert_eq!(fired, None);
        assert_eq!(state.vip_of(1), None);
    }

    #[test]
    fn when_task_fires_for_vanished_team_then_it_is_a_no_op() {
        let (mut state, platform, mut rng) = setup(&[(1, 1)]);
        let task = PendingReassignment {
            team_id: 4,
            due_at: Duration::ZERO,
            previous: None,
        };

        let fired =
            fire_reassignment(&mut state, &platform, task, SelectionStrategy::Random, false, &mut rng);

        assert_eq!(fired, None);
    }

    #[test]
    fn when_vip_cleared_then_previous_is_returned() {
        let (mut state, _platform, _rng) = setup(&[(1, 1)]);
        state.teams.get_mut(&1).unwrap().vip = Some(1);

        assert_eq!(clear_vip(&mut state, 1), Some(1));
        assert_eq!(clear_vip(&mut state, 1), None);
        assert_eq!(clear_vip(&mut state, 77), None);
    }
}
