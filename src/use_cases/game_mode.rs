// VIP Fiesta controller: lifecycle hooks that drive the domain systems.
//
// Every hook is a synchronous entry point. The embedding layer (the world task,
// or a test) updates the platform first and then calls the matching hook; it
// never applies game rules itself.

use crate::domain::ports::{Audience, Notice, Platform};
use crate::domain::state::{MatchState, PlayerId, TeamId};
use crate::domain::systems::markers::{HudTracker, MarkerKey, MarkerScheduler};
use crate::domain::systems::ranking::{
    SCOREBOARD_COLUMNS, SCOREBOARD_SORT_COLUMN, TeamStanding, scoreboard_rows,
    standings_for_viewer, team_standings,
};
use crate::domain::systems::roster::{RosterChanges, sync_roster};
use crate::domain::systems::scoring::{Combatant, process_elimination};
use crate::domain::systems::selection::SelectionStrategy;
use crate::domain::systems::vip::{
    Assignment, assign_if_missing, clear_vip, fire_reassignment, schedule_reassignment, take_due,
};
use crate::domain::tuning::{DepartureReassignment, VipFiestaConfig};
use rand::Rng;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

pub struct VipFiesta<P, R> {
    config: VipFiestaConfig,
    strategy: SelectionStrategy,
    platform: P,
    rng: R,
    state: MatchState,
    markers: MarkerScheduler,
    hud: HudTracker,
    introduced: HashSet<PlayerId>,
    started: bool,
    now: Duration,
}

impl<P: Platform, R: Rng> VipFiesta<P, R> {
    pub fn new(config: VipFiestaConfig, platform: P, rng: R) -> Self {
        let strategy = SelectionStrategy::from(&config);
        Self {
            config,
            strategy,
            platform,
            rng,
            state: MatchState::new(),
            markers: MarkerScheduler::new(),
            hud: HudTracker::new(),
            introduced: HashSet::new(),
            started: false,
            now: Duration::ZERO,
        }
    }

    pub fn config(&self) -> &VipFiestaConfig {
        &self.config
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_ended(&self) -> bool {
        self.state.ended
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn marker_keys(&self) -> Vec<MarkerKey> {
        self.markers.keys()
    }

    pub fn standings(&self) -> Vec<TeamStanding> {
        team_standings(&self.state)
    }

    pub fn standings_for(&self, viewer_team: TeamId) -> Vec<TeamStanding> {
        standings_for_viewer(&self.standings(), viewer_team)
    }

    fn frozen(&self) -> bool {
        self.config.scoring_frozen(self.state.ended)
    }

    pub fn on_match_started(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.platform
            .configure_scoreboard(&SCOREBOARD_COLUMNS, SCOREBOARD_SORT_COLUMN, true);
        self.platform.notify(
            Audience::Everyone,
            Notice::GameStarting {
                target_vip_kills: self.config.target_vip_kills,
            },
        );
        self.refresh_roster();

        let mut teams: Vec<TeamId> = self.state.teams.keys().copied().collect();
        teams.sort_unstable();
        for team_id in teams {
            self.assign_and_announce(team_id, None);
        }
        self.publish_scoreboard();
        info!(
            teams = self.state.teams.len(),
            players = self.state.players.len(),
            target = self.config.target_vip_kills,
            "match started"
        );
    }

    /// Global per-tick hook: fires due reassignments and synchronizes markers.
    pub fn on_tick(&mut self, now: Duration) {
        self.now = self.now.max(now);
        if !self.started {
            return;
        }
        self.refresh_roster();

        let frozen = self.frozen();
        for task in take_due(&mut self.state, self.now) {
            let assigned = fire_reassignment(
                &mut self.state,
                &self.platform,
                task,
                self.strategy,
                frozen,
                &mut self.rng,
            );
            if let Some(assignment) = assigned {
                self.announce(assignment);
            }
        }

        // Markers were taken down when the round ended.
        if !self.state.ended {
            self.markers
                .tick(&self.state, &mut self.platform, &self.config.markers, self.now);
        }
    }

    /// Per-player tick hook: edge-triggers the HUD status message.
    pub fn on_player_tick(&mut self, player_id: PlayerId) {
        if !self.started || !self.config.ui.enable_hud {
            return;
        }
        let is_vip = self
            .platform
            .team_of(player_id)
            .is_some_and(|team_id| self.state.is_vip(player_id, team_id));
        if self.hud.observe(player_id, is_vip) {
            self.platform
                .notify(Audience::Player(player_id), Notice::VipStatusGained);
        }
    }

    pub fn on_player_deployed(&mut self, player_id: PlayerId) {
        if !self.started {
            return;
        }
        self.refresh_roster();
        if self.config.show_intro_on_deploy && self.introduced.insert(player_id) {
            self.platform.notify(
                Audience::Player(player_id),
                Notice::Introduction {
                    target_vip_kills: self.config.target_vip_kills,
                },
            );
        }
        if let Some(team_id) = self.platform.team_of(player_id) {
            self.fill_vacancy(team_id);
        }
    }

    pub fn on_player_joined(&mut self, player_id: PlayerId) {
        if !self.started {
            return;
        }
        self.refresh_roster();
        if let Some(team_id) = self.platform.team_of(player_id) {
            self.fill_vacancy(team_id);
        }
    }

    pub fn on_player_died(&mut self, victim_id: PlayerId, killer_id: Option<PlayerId>) {
        if !self.started {
            return;
        }
        self.refresh_roster();
        let Some(victim_team) = self.platform.team_of(victim_id) else {
            debug!(victim_id, "death of unknown player ignored");
            return;
        };
        let victim = Combatant {
            player_id: victim_id,
            team_id: victim_team,
        };
        let killer = killer_id.and_then(|id| {
            self.platform.team_of(id).map(|team_id| Combatant {
                player_id: id,
                team_id,
            })
        });

        let outcome = process_elimination(&mut self.state, &self.config, victim, killer);

        if outcome.victim_was_vip {
            clear_vip(&mut self.state, victim_team);
            let team = Audience::Team(victim_team);
            self.platform.notify(team, Notice::VipDied);
            self.platform.notify(team, Notice::SelectingNewVip);
            let due_at = self.now.saturating_add(self.config.reassign_delay());
            schedule_reassignment(&mut self.state, victim_team, due_at, Some(victim_id));
        }
        if let Some(team_id) = outcome.credited_team {
            self.platform.notify(
                Audience::Everyone,
                Notice::VipKilled {
                    team_id,
                    score: outcome.team_score,
                },
            );
        }
        if let Some(winner) = outcome.winner {
            self.finish(Some(winner));
        }
        if !outcome.frozen {
            self.publish_scoreboard();
        }
    }

    pub fn on_player_left(&mut self, player_id: PlayerId) {
        if let Some(team_id) = self.state.team_with_vip(player_id) {
            clear_vip(&mut self.state, team_id);
            self.handle_departure(team_id, Some(player_id));
        }
        self.hud.forget(player_id);
        self.refresh_roster();
        if self.started {
            self.publish_scoreboard();
        }
    }

    /// Called after the platform already reports `player_id` on `new_team`.
    pub fn on_player_switched_team(&mut self, player_id: PlayerId, new_team: TeamId) {
        if let Some(old_team) = self.state.team_with_vip(player_id) {
            if old_team != new_team {
                clear_vip(&mut self.state, old_team);
                self.handle_departure(old_team, Some(player_id));
            }
        }
        self.refresh_roster();
        if !self.started {
            return;
        }
        self.fill_vacancy(new_team);
        self.publish_scoreboard();
    }

    pub fn on_time_limit_reached(&mut self) {
        if !self.started || self.state.ended {
            return;
        }
        let winner = if self.config.on_time_limit_announce_winner {
            self.standings().first().map(|standing| standing.team_id)
        } else {
            None
        };
        info!(?winner, "time limit reached");
        self.state.ended = true;
        self.state.winner = winner;
        self.finish(winner);
    }

    /// Pushes one scoreboard row per roster player.
    pub fn publish_scoreboard(&mut self) {
        let roster = self.platform.roster();
        for row in scoreboard_rows(&self.state, &roster) {
            self.platform.set_scoreboard_row(row);
        }
    }

    fn finish(&mut self, winner: Option<TeamId>) {
        if let Some(team_id) = winner {
            self.platform
                .notify(Audience::Everyone, Notice::TeamWins { team_id });
        }
        self.markers.clear(&mut self.platform);
        self.platform.end_round(winner);
        info!(?winner, "round ended");
    }

    /// Assigns a VIP to `team_id` unless one exists, a delayed reassignment is
    /// pending, or the match is frozen.
    fn fill_vacancy(&mut self, team_id: TeamId) {
        if self.frozen() || self.state.has_pending(team_id) {
            return;
        }
        self.assign_and_announce(team_id, None);
    }

    fn handle_departure(&mut self, team_id: TeamId, previous: Option<PlayerId>) {
        if !self.started || self.frozen() {
            return;
        }
        match self.config.departure_reassignment {
            DepartureReassignment::Immediate => {
                self.assign_and_announce(team_id, previous);
            }
            DepartureReassignment::Delayed => {
                self.platform
                    .notify(Audience::Team(team_id), Notice::SelectingNewVip);
                let due_at = self.now.saturating_add(self.config.reassign_delay());
                schedule_reassignment(&mut self.state, team_id, due_at, previous);
            }
        }
    }

    fn assign_and_announce(&mut self, team_id: TeamId, avoid: Option<PlayerId>) {
        let assigned = assign_if_missing(
            &mut self.state,
            &self.platform,
            team_id,
            self.strategy,
            avoid,
            &mut self.rng,
        );
        if let Some(assignment) = assigned {
            self.announce(assignment);
        }
    }

    fn announce(&mut self, assignment: Assignment) {
        self.platform
            .notify(Audience::Player(assignment.vip), Notice::YouAreVip);
        self.platform.notify(
            Audience::Team(assignment.team_id),
            Notice::NewVip {
                vip: assignment.vip,
            },
        );
    }

    fn refresh_roster(&mut self) -> RosterChanges {
        let roster = self.platform.roster();
        let changes = sync_roster(&mut self.state, &roster);
        if changes.is_empty() {
            return changes;
        }
        debug!(
            joined = ?changes.joined,
            departed = ?changes.departed,
            orphaned = ?changes.orphaned_teams,
            "roster changed"
        );
        for player_id in &changes.departed {
            self.hud.forget(*player_id);
            self.introduced.remove(player_id);
        }
        for team_id in &changes.orphaned_teams {
            self.handle_departure(*team_id, None);
        }
        // New or removed players shift every sort key's tie range.
        if self.started && !(changes.joined.is_empty() && changes.departed.is_empty()) {
            self.publish_scoreboard();
        }
        changes
    }
}
