// VIP candidate selection strategies.

use crate::domain::state::{PlayerId, PlayerStats};
use crate::domain::tuning::{VipFiestaConfig, VipSelection};
use rand::Rng;
use rand::seq::SliceRandom;
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStrategy {
    Random,
    TopPlayers { pool_size: usize },
}

impl From<&VipFiestaConfig> for SelectionStrategy {
    fn from(config: &VipFiestaConfig) -> Self {
        match config.vip_selection {
            VipSelection::Random => SelectionStrategy::Random,
            VipSelection::TopPlayers => SelectionStrategy::TopPlayers {
                pool_size: config.top_players_pool_size,
            },
        }
    }
}

/// Kills desc, deaths asc, id asc.
fn performance_order(
    a: PlayerId,
    b: PlayerId,
    stats: &HashMap<PlayerId, PlayerStats>,
) -> Ordering {
    let sa = stats.get(&a).copied().unwrap_or_default();
    let sb = stats.get(&b).copied().unwrap_or_default();
    sb.kills
        .cmp(&sa.kills)
        .then(sa.deaths.cmp(&sb.deaths))
        .then(a.cmp(&b))
}

/// Picks one of `candidates`, or `None` when there are none.
pub fn select_vip<R: Rng + ?Sized>(
    candidates: &[PlayerId],
    stats: &HashMap<PlayerId, PlayerStats>,
    strategy: SelectionStrategy,
    rng: &mut R,
) -> Option<PlayerId> {
    match strategy {
        SelectionStrategy::Random => candidates.choose(rng).copied(),
        SelectionStrategy::TopPlayers { pool_size } => {
            let mut ranked = candidates.to_vec();
            ranked.sort_by(|a, b| performance_order(*a, *b, stats));
            let pool = pool_size.clamp(1, ranked.len().max(1));
            ranked.truncate(pool);
            ranked.choose(rng).copied()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn stats_for(entries: &[(PlayerId, u32, u32)]) -> HashMap<PlayerId, PlayerStats> {
        entries
            .iter()
            .map(|(id, kills, deaths)| {
                (
                    *id,
                    PlayerStats {
                        kills: *kills,
                        deaths: *deaths,
                        vip_kills: 0,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn when_no_candidates_then_nothing_is_selected() {
        let mut rng = StdRng::seed_from_u64(1);
        let stats = HashMap::new();
        assert_eq!(
            select_vip(&[], &stats, SelectionStrategy::Random, &mut rng),
            None
        );
        assert_eq!(
            select_vip(
                &[],
                &stats,
                SelectionStrategy::TopPlayers { pool_size: 3 },
                &mut rng
            ),
            None
        );
    }

    #[test]
    fn when_random_strategy_then_pick_is_a_candidate() {
        let mut rng = StdRng::seed_from_u64(7);
        let stats = HashMap::new();
        for _ in 0..50 {
            let pick = select_vip(&[4, 8, 15], &stats, SelectionStrategy::Random, &mut rng);
            assert!(matches!(pick, Some(4) | Some(8) | Some(15)));
        }
    }

    #[test]
    fn when_top_players_pool_is_one_then_best_player_always_wins() {
        let mut rng = StdRng::seed_from_u64(3);
        let stats = stats_for(&[(1, 2, 5), (2, 9, 1), (3, 9, 4)]);
        for _ in 0..20 {
            let pick = select_vip(
                &[1, 2, 3],
                &stats,
                SelectionStrategy::TopPlayers { pool_size: 1 },
                &mut rng,
            );
            assert_eq!(pick, Some(2));
        }
    }

    #[test]
    fn when_top_players_pool_is_two_then_worst_player_never_wins() {
        let mut rng = StdRng::seed_from_u64(11);
        let stats = stats_for(&[(1, 0, 3), (2, 5, 0), (3, 5, 0)]);
        for _ in 0..50 {
            let pick = select_vip(
                &[1, 2, 3],
                &stats,
                SelectionStrategy::TopPlayers { pool_size: 2 },
                &mut rng,
            );
            assert!(matches!(pick, Some(2) | Some(3)));
        }
    }

    #[test]
    fn when_pool_exceeds_members_then_it_is_clamped() {
        let mut rng = StdRng::seed_from_u64(5);
        let stats = HashMap::new();
        let pick = select_vip(
            &[42],
            &stats,
            SelectionStrategy::TopPlayers { pool_size: 10 },
            &mut rng,
        );
        assert_eq!(pick, Some(42));
    }
}
