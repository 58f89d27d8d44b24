// Match orchestration: one world task per match, looked up by id.

use crate::domain::tuning::VipFiestaConfig;
use crate::use_cases::game::{WorldTiming, world_task};
use crate::use_cases::{GameEvent, ServerState, WorldUpdate};
use axum::extract::ws::Utf8Bytes;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, RwLock, broadcast, mpsc, watch};
use tracing::{info, warn};

/// Shared configuration for spawning match worlds.
#[derive(Debug, Clone)]
pub struct MatchSettings {
    /// Capacity for inbound player events.
    pub input_channel_capacity: usize,
    /// Capacity for broadcast world updates.
    pub world_broadcast_capacity: usize,
    pub timing: WorldTiming,
    /// How long an ended, unpinned match stays reachable before removal.
    pub end_linger: Duration,
    /// Game-mode rules applied to every new match.
    pub rules: VipFiestaConfig,
}

#[derive(Debug)]
pub enum MatchError {
    /// Match already exists and cannot be re-created.
    AlreadyExists,
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::AlreadyExists => f.write_str("match already exists"),
        }
    }
}

/// Per-match channels.
#[derive(Debug, Clone)]
pub struct MatchHandle {
    pub match_id: Arc<str>,
    /// Sender for game events into the match world task.
    pub input_tx: mpsc::Sender<GameEvent>,
    pub world_tx: broadcast::Sender<WorldUpdate>,
    /// Serialized world updates, encoded once for all sockets.
    pub world_bytes_tx: broadcast::Sender<Utf8Bytes>,
    /// Latest serialized update for lag recovery.
    pub world_latest_tx: watch::Sender<Utf8Bytes>,
    pub server_state_tx: watch::Sender<ServerState>,
    shutdown: Arc<Notify>,
    pinned: bool,
}

impl MatchHandle {
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }
}

#[derive(Debug)]
pub struct MatchRegistry {
    settings: MatchSettings,
    matches: RwLock<HashMap<String, MatchHandle>>,
}

impl MatchRegistry {
    pub fn new(settings: MatchSettings) -> Self {
        Self {
            settings,
            matches: RwLock::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }

    /// Creates a match and spawns its world task. Pinned matches are never
    /// removed by the end watcher.
    pub async fn create_match(
        &self,
        match_id: String,
        pinned: bool,
    ) -> Result<MatchHandle, MatchError> {
        let mut matches = self.matches.write().await;
        if matches.contains_key(&match_id) {
            return Err(MatchError::AlreadyExists);
        }
        let handle = self.spawn_world(&match_id, pinned);
        info!(match_id = %match_id, pinned, "match created");
        matches.insert(match_id, handle.clone());
        Ok(handle)
    }

    /// Swaps `match_id` for a fresh match under one lock, so lookups never
    /// miss it. The old world task is stopped.
    pub async fn replace_match(&self, match_id: &str) -> MatchHandle {
        let mut matches = self.matches.write().await;
        let pinned = match matches.remove(match_id) {
            Some(old) => {
                old.shutdown.notify_one();
                old.pinned
            }
            None => true,
        };
        let handle = self.spawn_world(match_id, pinned);
        info!(match_id, pinned, "match replaced");
        matches.insert(match_id.to_string(), handle.clone());
        handle
    }

    fn spawn_world(&self, match_id: &str, pinned: bool) -> MatchHandle {
        let (input_tx, input_rx) = mpsc::channel::<GameEvent>(self.settings.input_channel_capacity);
        let (world_tx, _world_rx) =
            broadcast::channel::<WorldUpdate>(self.settings.world_broadcast_capacity);
        let (world_bytes_tx, _world_bytes_rx) =
            broadcast::channel::<Utf8Bytes>(self.settings.world_broadcast_capacity);
        let (world_latest_tx, _world_latest_rx) = watch::channel::<Utf8Bytes>(Utf8Bytes::from(""));
        let (server_state_tx, _server_state_rx) =
            watch::channel::<ServerState>(ServerState::Lobby);
        let shutdown = Arc::new(Notify::new());

        tokio::spawn(world_task(
            input_rx,
            world_tx.clone(),
            server_state_tx.clone(),
            self.settings.timing,
            shutdown.clone(),
            self.settings.rules.clone(),
        ));

        MatchHandle {
            match_id: Arc::from(match_id),
            input_tx,
            world_tx,
            world_bytes_tx,
            world_latest_tx,
            server_state_tx,
            shutdown,
            pinned,
        }
    }

    pub async fn get_match(&self, match_id: &str) -> Option<MatchHandle> {
        let matches = self.matches.read().await;
        matches.get(match_id).cloned()
    }

    /// Removes a match and stops its world task.
    pub async fn remove_match(&self, match_id: &str) -> bool {
        let removed = self.matches.write().await.remove(match_id);
        match removed {
            Some(handle) => {
                handle.shutdown.notify_one();
                info!(match_id, "match removed");
                true
            }
            None => false,
        }
    }

    /// Removes an unpinned match some time after it ends.
    pub fn spawn_match_end_watcher(
        self: Arc<Self>,
        match_id: Arc<str>,
        mut server_state_rx: watch::Receiver<ServerState>,
    ) {
        tokio::spawn(async move {
            loop {
                if matches!(*server_state_rx.borrow(), ServerState::MatchEnded { .. }) {
                    break;
                }
                if server_state_rx.changed().await.is_err() {
                    warn!(match_id = %match_id, "server state closed before match end");
                    return;
                }
            }

            let pinned = self
                .get_match(&match_id)
                .await
                .is_some_and(|handle| handle.is_pinned());
            if pinned {
                return;
            }
            tokio::time::sleep(self.settings.end_linger).await;
            self.remove_match(&match_id).await;
        });
    }

    /// Keeps a pinned match playable: some time after each round ends it is
    /// replaced by a fresh match. `on_replaced` runs for every new handle.
    pub fn spawn_pinned_recycler<F>(self: Arc<Self>, handle: MatchHandle, on_replaced: F)
    where
        F: Fn(&MatchHandle) + Send + 'static,
    {
        tokio::spawn(async move {
            let mut handle = handle;
            loop {
                let mut state_rx = handle.server_state_tx.subscribe();
                let ended = state_rx
                    .wait_for(|state| matches!(state, ServerState::MatchEnded { .. }))
                    .await
                    .is_ok();
                if !ended {
                    warn!(match_id = %handle.match_id, "server state closed before match end");
                    return;
                }
                tokio::time::sleep(self.settings.end_linger).await;
                handle = self.replace_match(&handle.match_id).await;
                on_replaced(&handle);
            }
        });
    }
}
