// Marker synchronization: keeps team-scoped world markers on live VIPs, throttles
// the radar ping, and edge-triggers the per-player "you are VIP" HUD status.
//
// Markers have no lifecycle of their own. Every tick the desired key set is
// rebuilt from assignments and life state, then diffed against what exists.

use crate::domain::ports::{MarkerHandle, MarkerStyle, Platform, SpotMode};
use crate::domain::state::{MatchState, PlayerId, TeamId, Vec3};
use crate::domain::tuning::MarkerTuning;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, warn};

/// Marker identity: which team sees it, and which VIP it tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerKey {
    pub scope: TeamId,
    pub vip: PlayerId,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MarkerTickReport {
    pub created: usize,
    pub moved: usize,
    pub removed: usize,
    pub pinged: Vec<PlayerId>,
}

/// Where a marker should be and which style it should carry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DesiredMarker {
    pub position: Vec3,
    // The scope team is the VIP's own team.
    pub friendly: bool,
}

#[derive(Debug, Clone, Copy)]
struct LiveMarker {
    handle: MarkerHandle,
    friendly: bool,
}

#[derive(Debug, Default)]
pub struct MarkerScheduler {
    markers: HashMap<MarkerKey, LiveMarker>,
    last_ping_at: Option<Duration>,
}

fn style_for(tuning: &MarkerTuning, friendly: bool) -> MarkerStyle {
    if friendly {
        MarkerStyle {
            icon: tuning.friendly_icon,
            color_rgb: tuning.friendly_color_rgb,
            friendly,
        }
    } else {
        MarkerStyle {
            icon: tuning.enemy_icon,
            color_rgb: tuning.enemy_color_rgb,
            friendly,
        }
    }
}

/// VIPs that are assigned and alive, with their current position.
fn live_vips<P: Platform + ?Sized>(state: &MatchState, platform: &P) -> Vec<(TeamId, PlayerId, Vec3)> {
    state
        .assignments()
        .into_iter()
        .filter(|(_, vip)| platform.is_alive(*vip))
        .filter_map(|(team_id, vip)| platform.position(vip).map(|pos| (team_id, vip, pos)))
        .collect()
}

/// Markers that should exist right now, with their target position.
pub fn desired_markers<P: Platform + ?Sized>(
    state: &MatchState,
    platform: &P,
    tuning: &MarkerTuning,
) -> BTreeMap<MarkerKey, DesiredMarker> {
    let mut desired = BTreeMap::new();
    if !tuning.enable_3d_icons {
        return desired;
    }
    for (vip_team, vip, position) in live_vips(state, platform) {
        let target = position.raised(tuning.vertical_offset_meters);
        for scope in state.teams.keys().copied() {
            let friendly = scope == vip_team;
            if friendly || tuning.enable_enemy_icons {
                desired.insert(
                    MarkerKey { scope, vip },
                    DesiredMarker {
                        position: target,
                        friendly,
                    },
                );
            }
        }
    }
    desired
}

impl MarkerScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn contains(&self, key: MarkerKey) -> bool {
        self.markers.contains_key(&key)
    }

    pub fn keys(&self) -> Vec<MarkerKey> {
        let mut keys: Vec<MarkerKey> = self.markers.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    pub fn tick<P: Platform + ?Sized>(
        &mut self,
        state: &MatchState,
        platform: &mut P,
        tuning: &MarkerTuning,
        now: Duration,
    ) -> MarkerTickReport {
        let mut report = MarkerTickReport::default();
        let desired = desired_markers(state, platform, tuning);

        // Gone, or the VIP changed sides relative to the scope: the style is
        // fixed at spawn, so such markers are removed and spawned again.
        let stale: Vec<MarkerKey> = self
            .markers
            .iter()
            .filter(|(key, live)| {
                desired
                    .get(key)
                    .is_none_or(|want| want.friendly != live.friendly)
            })
            .map(|(key, _)| *key)
            .collect();
        for key in stale {
            if let Some(live) = self.markers.remove(&key) {
                if let Err(error) = platform.remove_marker(live.handle) {
                    // Nothing to retry; the marker is gone either way.
                    warn!(scope = key.scope, vip = key.vip, %error, "failed to remove marker");
                }
                report.removed += 1;
            }
        }

        for (key, want) in desired {
            match self.markers.get(&key).copied() {
                Some(live) => match platform.move_marker(live.handle, want.position) {
                    Ok(()) => report.moved += 1,
                    Err(error) => {
                        // Forget it; the next tick recreates the marker.
                        warn!(scope = key.scope, vip = key.vip, %error, "failed to move marker");
                        self.markers.remove(&key);
                    }
                },
                None => {
                    let style = style_for(tuning, want.friendly);
                    match platform.spawn_marker(key.scope, key.vip, style, want.position) {
                        Ok(handle) => {
                            self.markers.insert(
                                key,
                                LiveMarker {
                                    handle,
                                    friendly: want.friendly,
                                },
                            );
                            report.created += 1;
                        }
                        Err(error) => {
                            warn!(scope = key.scope, vip = key.vip, %error, "failed to spawn marker");
                        }
                    }
                }
            }
        }

        if tuning.enable_minimap_spotting && self.ping_due(now, tuning.ping_interval()) {
            let mode = if tuning.enable_3d_icons {
                SpotMode::Minimap
            } else {
                SpotMode::Both
            };
            for (_, vip, _) in live_vips(state, platform) {
                platform.spot(vip, tuning.ping_duration(), mode);
                report.pinged.push(vip);
            }
            self.last_ping_at = Some(now);
        }

        if report.created > 0 || report.removed > 0 {
            debug!(
                created = report.created,
                removed = report.removed,
                total = self.markers.len(),
                "markers synchronized"
            );
        }
        report
    }

    fn ping_due(&self, now: Duration, interval: Duration) -> bool {
        match self.last_ping_at {
            None => true,
            Some(last) => now.saturating_sub(last) >= interval,
        }
    }

    /// Removes every marker, e.g. once the match is over.
    pub fn clear<P: Platform + ?Sized>(&mut self, platform: &mut P) {
        for (key, live) in self.markers.drain() {
            if let Err(error) = platform.remove_marker(live.handle) {
                warn!(scope = key.scope, vip = key.vip, %error, "failed to remove marker");
            }
        }
    }
}

/// Remembers each player's last seen VIP status.
#[derive(Debug, Default)]
pub struct HudTracker {
    last_known: HashMap<PlayerId, bool>,
}

impl HudTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the status; true only on a not-VIP to VIP transition.
    pub fn observe(&mut self, player_id: PlayerId, is_vip: bool) -> bool {
        let was_vip = self.last_known.insert(player_id, is_vip).unwrap_or(false);
        is_vip && !was_vip
    }

    pub fn forget(&mut self, player_id: PlayerId) {
        self.last_known.remove(&player_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::TeamRecord;
    use crate::interface_adapters::platform::SimPlatform;

    fn world() -> (MatchState, SimPlatform) {
        let mut platform = SimPlatform::new(Duration::from_secs(600));
        for (player_id, team_id) in [(1, 1), (2, 1), (3, 2), (4, 2), (5, 3)] {
            platform.add_player(player_id, team_id);
            platform.set_alive(player_id, true);
            platform.set_position(player_id, Vec3::new(player_id as f32, 0.0, 0.0));
        }
        let mut state = MatchState::new();
        for team_id in [1, 2, 3] {
            state.teams.insert(team_id, TeamRecord::default());
        }
        state.teams.get_mut(&1).unwrap().vip = Some(1);
        state.teams.get_mut(&2).unwrap().vip = Some(3);
        (state, platform)
    }

    #[test]
    fn when_enemy_icons_enabled_then_every_team_sees_every_live_vip() {
        let (state, mut platform) = world();
        let tuning = MarkerTuning::default();
        let mut scheduler = MarkerScheduler::new();

        let report = scheduler.tick(&state, &mut platform, &tuning, Duration::ZERO);

        assert_eq!(report.created, 6);
        assert_eq!(scheduler.len(), 6);
        assert_eq!(platform.markers().len(), 6);
        let marker = platform
            .marker_for(1, 3)
            .expect("team 1 should see the team 2 VIP");
        assert!(!marker.style.friendly);
        assert_eq!(marker.position, Vec3::new(3.0, 3.0, 0.0));
        assert!(platform.marker_for(2, 3).unwrap().style.friendly);
    }

    #[test]
    fn when_enemy_icons_disabled_then_only_friendly_markers_exist() {
        let (state, mut platform) = world();
        let tuning = MarkerTuning {
            enable_enemy_icons: false,
            ..Default::default()
        };
        let mut scheduler = MarkerScheduler::new();

        scheduler.tick(&state, &mut platform, &tuning, Duration::ZERO);

        assert_eq!(
            scheduler.keys(),
            vec![MarkerKey { scope: 1, vip: 1 }, MarkerKey { scope: 2, vip: 3 }]
        );
    }

    #[test]
    fn when_vip_dies_then_its_markers_are_collected() {
        let (state, mut platform) = world();
        let tuning = MarkerTuning::default();
        let mut scheduler = MarkerScheduler::new();
        scheduler.tick(&state, &mut platform, &tuning, Duration::ZERO);

        platform.set_alive(3, false);
        let report = scheduler.tick(&state, &mut platform, &tuning, Duration::from_millis(33));

        assert_eq!(report.removed, 3);
        assert_eq!(report.moved, 3);
        assert!(scheduler.keys().iter().all(|key| key.vip == 1));
        assert_eq!(platform.markers().len(), 3);
    }

    #[test]
    fn when_vip_unassigned_then_its_markers_are_collected() {
        let (mut state, mut platform) = world();
        let tuning = MarkerTuning::default();
        let mut scheduler = MarkerScheduler::new();
        scheduler.tick(&state, &mut platform, &tuning, Duration::ZERO);

        state.teams.get_mut(&1).unwrap().vip = None;
        scheduler.tick(&state, &mut platform, &tuning, Duration::from_millis(33));

        assert!(scheduler.keys().iter().all(|key| key.vip == 3));
    }

    #[test]
    fn when_vip_moves_then_marker_follows_with_offset() {
        let (state, mut platform) = world();
        let tuning = MarkerTuning::default();
        let mut scheduler = MarkerScheduler::new();
        scheduler.tick(&state, &mut platform, &tuning, Duration::ZERO);

        platform.set_position(1, Vec3::new(10.0, 2.0, -4.0));
        scheduler.tick(&state, &mut platform, &tuning, Duration::from_millis(33));

        let marker = platform.marker_for(2, 1).unwrap();
        assert_eq!(marker.position, Vec3::new(10.0, 5.0, -4.0));
    }

    #[test]
    fn when_3d_icons_disabled_then_no_markers_and_pings_show_everywhere() {
        let (state, mut platform) = world();
        let tuning = MarkerTuning {
            enable_3d_icons: false,
            ..Default::default()
        };
        let mut scheduler = MarkerScheduler::new();

        let report = scheduler.tick(&state, &mut platform, &tuning, Duration::ZERO);

        assert!(scheduler.is_empty());
        assert_eq!(report.pinged, vec![1, 3]);
        assert!(platform.spots().iter().all(|spot| spot.mode == SpotMode::Both));
    }

    #[test]
    fn when_ticks_are_closer_than_interval_then_ping_is_throttled() {
        let (state, mut platform) = world();
        let tuning = MarkerTuning::default();
        let mut scheduler = MarkerScheduler::new();

        let mut ping_ticks = Vec::new();
        for step in 0..70u64 {
            let now = Duration::from_millis(step * 33);
            let report = scheduler.tick(&state, &mut platform, &tuning, now);
            if !report.pinged.is_empty() {
                ping_ticks.push(now.as_millis());
            }
        }

        assert_eq!(ping_ticks, vec![0, 1023, 2046]);
        assert!(platform.spots().iter().all(|spot| spot.mode == SpotMode::Minimap));
    }

    #[test]
    fn when_platform_rejects_spawn_then_it_is_retried_next_tick() {
        let (state, mut platform) = world();
        let tuning = MarkerTuning::default();
        let mut scheduler = MarkerScheduler::new();

        platform.fail_marker_calls(true);
        let report = scheduler.tick(&state, &mut platform, &tuning, Duration::ZERO);
        assert_eq!(report.created, 0);
        assert!(scheduler.is_empty());

        platform.fail_marker_calls(false);
        let report = scheduler.tick(&state, &mut platform, &tuning, Duration::from_millis(33));
        assert_eq!(report.created, 6);
    }

    #[test]
    fn when_marker_vanished_on_platform_then_it_is_recreated() {
        let (state, mut platform) = world();
        let tuning = MarkerTuning::default();
        let mut scheduler = MarkerScheduler::new();
        scheduler.tick(&state, &mut platform, &tuning, Duration::ZERO);

        platform.drop_all_markers();
        let report = scheduler.tick(&state, &mut platform, &tuning, Duration::from_millis(33));
        assert_eq!(report.moved, 0);
        assert_eq!(scheduler.len(), 0);

        let report = scheduler.tick(&state, &mut platform, &tuning, Duration::from_millis(66));
        assert_eq!(report.created, 6);
    }

    #[test]
    fn when_vip_changes_sides_then_marker_is_restyled() {
        let (mut state, mut platform) = world();
        let tuning = MarkerTuning::default();
        let mut scheduler = MarkerScheduler::new();
        scheduler.tick(&state, &mut platform, &tuning, Duration::ZERO);
        assert!(!platform.marker_for(2, 1).unwrap().style.friendly);

        // Team 1's VIP moves to team 2 and becomes its VIP before the next pass.
        platform.set_team(1, 2);
        state.teams.get_mut(&1).unwrap().vip = None;
        state.teams.get_mut(&2).unwrap().vip = Some(1);
        let report = scheduler.tick(&state, &mut platform, &tuning, Duration::from_millis(33));

        let own = platform.marker_for(2, 1).expect("team 2 tracks its new VIP");
        assert!(own.style.friendly);
        assert_eq!(own.style.icon, tuning.friendly_icon);
        assert_eq!(own.style.color_rgb, tuning.friendly_color_rgb);
        let enemy = platform.marker_for(3, 1).expect("team 3 still sees them");
        assert!(!enemy.style.friendly);
        assert!(report.removed >= 1);
        assert_eq!(platform.markers().len(), scheduler.len());
    }

    #[test]
    fn when_scheduler_cleared_then_platform_markers_are_removed() {
        let (state, mut platform) = world();
        let tuning = MarkerTuning::default();
        let mut scheduler = MarkerScheduler::new();
        scheduler.tick(&state, &mut platform, &tuning, Duration::ZERO);

        scheduler.clear(&mut platform);

        assert!(scheduler.is_empty());
        assert!(platform.markers().is_empty());
    }

    #[test]
    fn when_status_flips_then_only_rising_edge_fires() {
        let mut hud = HudTracker::new();
        assert!(!hud.observe(1, false));
        assert!(hud.observe(1, true));
        assert!(!hud.observe(1, true));
        assert!(!hud.observe(1, false));
        assert!(hud.observe(1, true));

        hud.forget(1);
        assert!(hud.observe(1, true));
    }
}
