use super::game_mode::VipFiesta;
use super::types::{GameEvent, ServerState, WorldUpdate};
use crate::domain::ports::Platform;
use crate::domain::state::PlayerId;
use crate::domain::tuning::VipFiestaConfig;
use crate::interface_adapters::platform::SimPlatform;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast, mpsc, watch};
use tracing::{debug, info};

pub type MatchController = VipFiesta<SimPlatform, StdRng>;

/// Per-match world loop timing.
#[derive(Debug, Clone, Copy)]
pub struct WorldTiming {
    pub tick_interval: Duration,
    // Countdown from the first join to the match start; more players may join meanwhile.
    pub start_delay: Duration,
}

pub async fn world_task(
    mut input_rx: mpsc::Receiver<GameEvent>,
    world_tx: broadcast::Sender<WorldUpdate>,
    server_state_tx: watch::Sender<ServerState>,
    timing: WorldTiming,
    shutdown: Arc<Notify>,
    config: VipFiestaConfig,
) {
    let time_limit = config.time_limit();
    let platform = SimPlatform::new(time_limit);
    let mut fiesta = VipFiesta::new(config, platform, StdRng::from_entropy());

    let mut interval = tokio::time::interval(timing.tick_interval);
    let mut tick: u64 = 0;
    let mut elapsed = Duration::ZERO;
    // Set when the first player joins; the countdown runs from there.
    let mut countdown_from: Option<Duration> = None;
    let mut end_published = false;

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                // Exit cleanly when the match is removed.
                break;
            }
            _ = interval.tick() => {}
        }

        while let Ok(ev) = input_rx.try_recv() {
            apply_event(&mut fiesta, ev);
        }

        if countdown_from.is_none() && !fiesta.platform().roster().is_empty() {
            countdown_from = Some(elapsed);
            server_state_tx.send_replace(ServerState::MatchStarting {
                in_seconds: timing.start_delay.as_secs() as u32,
            });
        }

        if let Some(from) = countdown_from {
            let since_countdown = elapsed.saturating_sub(from);
            if !fiesta.is_started() && since_countdown >= timing.start_delay {
                fiesta.on_match_started();
                server_state_tx.send_replace(ServerState::MatchRunning);
            }
            let match_clock = since_countdown.saturating_sub(timing.start_delay);
            step(&mut fiesta, match_clock, time_limit);
        }

        if fiesta.is_ended() && !end_published {
            end_published = true;
            let winner = fiesta.state().winner;
            info!(?winner, tick, "match ended");
            server_state_tx.send_replace(ServerState::MatchEnded { winner });
        }

        tick += 1;
        elapsed += timing.tick_interval;
        let _ = world_tx.send(snapshot(&mut fiesta, tick));
    }
    debug!(tick, "world task stopped");
}

/// Advances the match clock and runs the per-tick hooks.
pub fn step(fiesta: &mut MatchController, match_clock: Duration, time_limit: Duration) {
    if !fiesta.is_started() {
        return;
    }
    fiesta.platform_mut().advance(match_clock);
    fiesta.on_tick(match_clock);

    let players: Vec<PlayerId> = fiesta
        .platform()
        .roster()
        .iter()
        .map(|entry| entry.player_id)
        .collect();
    for player_id in players {
        fiesta.on_player_tick(player_id);
    }

    // A zero time limit disables the time-based end.
    if !time_limit.is_zero() && !fiesta.is_ended() && fiesta.platform().remaining_time().is_zero() {
        fiesta.on_time_limit_reached();
    }
}

/// Applies one network event to the simulated platform, then runs its hook.
pub fn apply_event(fiesta: &mut MatchController, event: GameEvent) {
    match event {
        GameEvent::Join { player_id, team_id } => {
            info!(player_id, team_id, "player joined");
            fiesta.platform_mut().add_player(player_id, team_id);
            fiesta.on_player_joined(player_id);
        }
        GameEvent::Leave { player_id } => {
            if fiesta.platform_mut().remove_player(player_id) {
                info!(player_id, "player left");
                fiesta.on_player_left(player_id);
            }
        }
        GameEvent::Deploy { player_id } => {
            if !fiesta.platform().contains(player_id) || fiesta.platform().is_alive(player_id) {
                return;
            }
            fiesta.platform_mut().set_alive(player_id, true);
            fiesta.on_player_deployed(player_id);
        }
        GameEvent::Move {
            player_id,
            position,
        } => {
            fiesta.platform_mut().set_position(player_id, position);
        }
        GameEvent::Died {
            player_id,
            killer_id,
        } => {
            // Repeated death reports for a dead player are dropped.
            if !fiesta.platform().is_alive(player_id) {
                debug!(player_id, "death of player not alive ignored");
                return;
            }
            fiesta.platform_mut().set_alive(player_id, false);
            fiesta.on_player_died(player_id, killer_id);
        }
        GameEvent::SwitchTeam { player_id, team_id } => {
            if fiesta.platform().team_of(player_id) == Some(team_id) {
                return;
            }
            if fiesta.platform_mut().set_team(player_id, team_id) {
                info!(player_id, team_id, "player switched team");
                fiesta.on_player_switched_team(player_id, team_id);
            }
        }
    }
}

/// Builds the outgoing update and drains one-shot effects (pings, notices).
pub fn snapshot(fiesta: &mut MatchController, tick: u64) -> WorldUpdate {
    let vips = fiesta.state().assignments();
    let standings = fiesta.standings();
    let viewer_standings = standings
        .iter()
        .map(|standing| (standing.team_id, fiesta.standings_for(standing.team_id)))
        .collect();
    let platform = fiesta.platform_mut();
    WorldUpdate {
        tick,
        remaining: platform.remaining_time(),
        vips,
        markers: platform.markers(),
        pings: platform.take_spots(),
        notices: platform.take_notices(),
        scoreboard: platform.scoreboard_rows(),
        standings,
        viewer_standings,
    }
}
