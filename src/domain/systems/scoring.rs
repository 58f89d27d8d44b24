// Elimination processing: the only place score state is mutated.

use crate::domain::state::{MatchState, PlayerId, TeamId};
use crate::domain::tuning::VipFiestaConfig;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Combatant {
    pub player_id: PlayerId,
    pub team_id: TeamId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Elimination {
    pub victim_was_vip: bool,
    // Team credited with a VIP kill, with its new total.
    pub credited_team: Option<TeamId>,
    pub team_score: u32,
    // Set only on the elimination that ended the match.
    pub winner: Option<TeamId>,
    // Counters were left untouched because the match is over.
    pub frozen: bool,
}

pub fn process_elimination(
    state: &mut MatchState,
    config: &VipFiestaConfig,
    victim: Combatant,
    killer: Option<Combatant>,
) -> Elimination {
    let victim_was_vip = state.is_vip(victim.player_id, victim.team_id);
    let mut outcome = Elimination {
        victim_was_vip,
        ..Default::default()
    };

    if config.scoring_frozen(state.ended) {
        outcome.frozen = true;
        return outcome;
    }

    let killer = killer.filter(|k| k.player_id != victim.player_id);

    state.players.entry(victim.player_id).or_default().deaths += 1;
    let Some(killer) = killer else {
        return outcome;
    };
    let killer_stats = state.players.entry(killer.player_id).or_default();
    killer_stats.kills += 1;

    if !victim_was_vip || killer.team_id == victim.team_id {
        return outcome;
    }

    killer_stats.vip_kills += 1;
    let team = state.teams.entry(killer.team_id).or_default();
    team.vip_kills += 1;
    outcome.credited_team = Some(killer.team_id);
    outcome.team_score = team.vip_kills;
    info!(
        team_id = killer.team_id,
        killer_id = killer.player_id,
        victim_id = victim.player_id,
        score = team.vip_kills,
        "VIP eliminated"
    );

    if !state.ended && team.vip_kills >= config.target_vip_kills {
        state.ended = true;
        state.winner = Some(killer.team_id);
        outcome.winner = Some(killer.team_id);
        info!(team_id = killer.team_id, "target reached; match ended");
    }

    outcome
}
