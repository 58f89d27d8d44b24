// Rankings: team ranks, the single-column scoreboard sort key, and the standings
// shown to players.
//
// The external scoreboard sorts by one numeric column, so the multi-key order
// (team rank, VIP kills desc, kills desc, deaths asc, player id asc) is packed
// into one integer. Each component is scaled by the product of the ranges of
// every lower-priority component, and ranges come from the current maxima, so
// no component can spill into the next one.

use crate::domain::ports::{ScoreboardColumn, ScoreboardRow};
use crate::domain::state::{MatchState, PlayerId, PlayerStats, RosterEntry, TeamId};
use std::collections::HashMap;

pub const STANDINGS_DISPLAY_LIMIT: usize = 3;

pub const SCOREBOARD_COLUMNS: [ScoreboardColumn; 5] = [
    ScoreboardColumn { name: "Team", width: 25 },
    ScoreboardColumn { name: "VIP Kills", width: 25 },
    ScoreboardColumn { name: "Kills", width: 25 },
    ScoreboardColumn { name: "Deaths", width: 25 },
    ScoreboardColumn { name: "Sort", width: 0 },
];
pub const SCOREBOARD_SORT_COLUMN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamStanding {
    pub team_id: TeamId,
    pub vip_kills: u32,
    pub rank: u32,
}

/// Teams by VIP kills desc, ties by ascending id; ranks start at 1.
pub fn team_standings(state: &MatchState) -> Vec<TeamStanding> {
    let mut teams: Vec<(TeamId, u32)> = state
        .teams
        .iter()
        .map(|(team_id, team)| (*team_id, team.vip_kills))
        .collect();
    teams.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    teams
        .into_iter()
        .enumerate()
        .map(|(index, (team_id, vip_kills))| TeamStanding {
            team_id,
            vip_kills,
            rank: index as u32 + 1,
        })
        .collect()
}

pub fn team_ranks(standings: &[TeamStanding]) -> HashMap<TeamId, u32> {
    standings
        .iter()
        .map(|standing| (standing.team_id, standing.rank))
        .collect()
}

/// Weights derived from the current value ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKeyWeights {
    pub vip_range: u64,
    pub kills_range: u64,
    pub deaths_range: u64,
    pub tie_range: u64,
    pub deaths_weight: u64,
    pub kills_weight: u64,
    pub vip_weight: u64,
    pub team_weight: u64,
}

impl SortKeyWeights {
    pub fn from_maxima(max_vip_kills: u32, max_kills: u32, max_deaths: u32, players: usize) -> Self {
        let vip_range = u64::from(max_vip_kills) + 1;
        let kills_range = u64::from(max_kills) + 1;
        let deaths_range = u64::from(max_deaths) + 1;
        let tie_range = (players as u64).max(1);

        let deaths_weight = tie_range;
        let kills_weight = deaths_weight.saturating_mul(deaths_range);
        let vip_weight = kills_weight.saturating_mul(kills_range);
        let team_weight = vip_weight.saturating_mul(vip_range);

        Self {
            vip_range,
            kills_range,
            deaths_range,
            tie_range,
            deaths_weight,
            kills_weight,
            vip_weight,
            team_weight,
        }
    }

    pub fn for_players<'a>(stats: impl Iterator<Item = &'a PlayerStats>, players: usize) -> Self {
        let (vip, kills, deaths) = stats.fold((0, 0, 0), |(v, k, d), s| {
            (v.max(s.vip_kills), k.max(s.kills), d.max(s.deaths))
        });
        Self::from_maxima(vip, kills, deaths, players)
    }

    /// `tie_index` is the player's ordinal among all current player ids.
    pub fn sort_key(&self, team_rank: u32, stats: PlayerStats, tie_index: u64) -> u64 {
        let vip = self.vip_range - 1 - u64::from(stats.vip_kills).min(self.vip_range - 1);
        let kills = self.kills_range - 1 - u64::from(stats.kills).min(self.kills_range - 1);
        let deaths = u64::from(stats.deaths).min(self.deaths_range - 1);
        let tie = tie_index.min(self.tie_range - 1);

        u64::from(team_rank)
            .saturating_mul(self.team_weight)
            .saturating_add(vip.saturating_mul(self.vip_weight))
            .saturating_add(kills.saturating_mul(self.kills_weight))
            .saturating_add(deaths.saturating_mul(self.deaths_weight))
            .saturating_add(tie)
    }
}

/// One scoreboard row per roster player, keyed for an ascending sort.
pub fn scoreboard_rows(state: &MatchState, roster: &[RosterEntry]) -> Vec<ScoreboardRow> {
    let standings = team_standings(state);
    let ranks = team_ranks(&standings);
    let unranked = standings.len() as u32 + 1;

    let mut ids: Vec<PlayerId> = roster.iter().map(|entry| entry.player_id).collect();
    ids.sort_unstable();
    ids.dedup();

    let roster_stats: Vec<PlayerStats> = ids.iter().map(|id| state.stats(*id)).collect();
    let weights = SortKeyWeights::for_players(roster_stats.iter(), ids.len());

    roster
        .iter()
        .map(|entry| {
            let stats = state.stats(entry.player_id);
            let rank = ranks.get(&entry.team_id).copied().unwrap_or(unranked);
            let tie_index = ids.binary_search(&entry.player_id).unwrap_or_default() as u64;
            ScoreboardRow {
                player_id: entry.player_id,
                team_id: entry.team_id,
                vip_kills: stats.vip_kills,
                kills: stats.kills,
                deaths: stats.deaths,
                sort_key: weights.sort_key(rank, stats, tie_index),
            }
        })
        .collect()
}

/// Top teams for a viewer; if the viewer's team is not among them, it takes the
/// last slot with its real rank.
pub fn standings_for_viewer(standings: &[TeamStanding], viewer_team: TeamId) -> Vec<TeamStanding> {
    let mut shown: Vec<TeamStanding> = standings
        .iter()
        .take(STANDINGS_DISPLAY_LIMIT)
        .copied()
        .collect();
    if shown.iter().any(|s| s.team_id == viewer_team) {
        return shown;
    }
    if let Some(own) = standings.iter().find(|s| s.team_id == viewer_team) {
        if shown.len() == STANDINGS_DISPLAY_LIMIT {
            shown.pop();
        }
        shown.push(*own);
    }
    shown
}

pub fn rank_label(rank: u32) -> String {
    let suffix = match (rank % 10, rank % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{rank}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::TeamRecord;
    use std::cmp::Ordering;

    fn state_with(teams: &[(TeamId, u32)], players: &[(PlayerId, u32, u32, u32)]) -> MatchState {
        let mut state = MatchState::new();
        for (team_id, vip_kills) in teams {
            state.teams.insert(
                *team_id,
                TeamRecord {
                    vip: None,
                    vip_kills: *vip_kills,
                },
            );
        }
        for (id, vip_kills, kills, deaths) in players {
            state.players.insert(
                *id,
                PlayerStats {
                    kills: *kills,
                    deaths: *deaths,
                    vip_kills: *vip_kills,
                },
            );
        }
        state
    }

    #[test]
    fn when_teams_tie_then_lower_id_ranks_first() {
        let state = state_with(&[(3, 2), (1, 0), (2, 2), (4, 5)], &[]);
        let standings = team_standings(&state);
        let order: Vec<(TeamId, u32)> = standings.iter().map(|s| (s.team_id, s.rank)).collect();
        assert_eq!(order, vec![(4, 1), (2, 2), (3, 3), (1, 4)]);
    }

    #[test]
    fn when_no_teams_then_standings_are_empty() {
        assert!(team_standings(&MatchState::new()).is_empty());
    }

    // Reference order: team rank, VIP kills desc, kills desc, deaths asc, id asc.
    fn precedes(a: &(u32, PlayerStats, PlayerId), b: &(u32, PlayerStats, PlayerId)) -> Ordering {
        a.0.cmp(&b.0)
            .then(b.1.vip_kills.cmp(&a.1.vip_kills))
            .then(b.1.kills.cmp(&a.1.kills))
            .then(a.1.deaths.cmp(&b.1.deaths))
            .then(a.2.cmp(&b.2))
    }

    #[test]
    fn when_keys_are_compared_then_they_follow_priority_order() {
        let mut players = Vec::new();
        let mut id: PlayerId = 100;
        for rank in 1..=3u32 {
            for vip_kills in 0..=2u32 {
                for kills in [vip_kills, vip_kills + 3] {
                    for deaths in [0u32, 4] {
                        players.push((
                            rank,
                            PlayerStats {
                                kills,
                                deaths,
                                vip_kills,
                            },
                            id,
                        ));
                        id += 7;
                    }
                }
            }
        }
        let mut ids: Vec<PlayerId> = players.iter().map(|p| p.2).collect();
        ids.sort_unstable();
        let weights = SortKeyWeights::for_players(players.iter().map(|p| &p.1), ids.len());
        let key = |p: &(u32, PlayerStats, PlayerId)| {
            weights.sort_key(p.0, p.1, ids.binary_search(&p.2).unwrap() as u64)
        };

        for a in &players {
            for b in &players {
                assert_eq!(
                    key(a).cmp(&key(b)),
                    precedes(a, b),
                    "keys disagree for {a:?} vs {b:?}"
                );
            }
        }
    }

    #[test]
    fn when_maxima_grow_then_weights_grow_with_them() {
        let small = SortKeyWeights::from_maxima(1, 2, 3, 4);
        let large = SortKeyWeights::from_maxima(10, 20, 30, 4);
        assert_eq!(small.deaths_weight, 4);
        assert_eq!(small.kills_weight, 16);
        assert_eq!(small.vip_weight, 48);
        assert_eq!(small.team_weight, 96);
        assert!(large.team_weight > small.team_weight);
    }

    #[test]
    fn when_rows_built_then_better_team_sorts_first() {
        let state = state_with(
            &[(1, 0), (2, 2)],
            &[(10, 0, 5, 0), (11, 0, 0, 3), (20, 2, 2, 1), (21, 0, 0, 0)],
        );
        let roster = [
            RosterEntry { player_id: 10, team_id: 1 },
            RosterEntry { player_id: 11, team_id: 1 },
            RosterEntry { player_id: 20, team_id: 2 },
            RosterEntry { player_id: 21, team_id: 2 },
        ];

        let mut rows = scoreboard_rows(&state, &roster);
        rows.sort_by_key(|row| row.sort_key);
        let order: Vec<PlayerId> = rows.iter().map(|row| row.player_id).collect();

        assert_eq!(order, vec![20, 21, 10, 11]);
        assert_eq!(rows[0].vip_kills, 2);
        assert_eq!(rows[0].team_id, 2);
    }

    #[test]
    fn when_viewer_team_outside_top_three_then_it_replaces_third_slot() {
        let state = state_with(&[(1, 5), (2, 4), (3, 3), (4, 2), (5, 1)], &[]);
        let standings = team_standings(&state);

        let shown = standings_for_viewer(&standings, 5);
        let ids: Vec<(TeamId, u32)> = shown.iter().map(|s| (s.team_id, s.rank)).collect();
        assert_eq!(ids, vec![(1, 1), (2, 2), (5, 5)]);

        let shown = standings_for_viewer(&standings, 2);
        let ids: Vec<TeamId> = shown.iter().map(|s| s.team_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn when_few_teams_then_all_are_shown() {
        let state = state_with(&[(1, 0), (2, 1)], &[]);
        let standings = team_standings(&state);
        assert_eq!(standings_for_viewer(&standings, 1).len(), 2);
    }

    #[test]
    fn when_rank_labelled_then_suffix_matches() {
        assert_eq!(rank_label(1), "1st");
        assert_eq!(rank_label(2), "2nd");
        assert_eq!(rank_label(3), "3rd");
        assert_eq!(rank_label(11), "11th");
    }
}
