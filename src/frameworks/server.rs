// Framework bootstrap for the VIP Fiesta server runtime.

use crate::frameworks::config;
use crate::interface_adapters::net::{create_match_handler, spawn_match_serializer, ws_handler};
use crate::interface_adapters::state::AppState;
use crate::use_cases::game::WorldTiming;
use crate::use_cases::{MatchRegistry, MatchSettings};

use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state().await?;
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/matches", post(create_match_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

async fn build_state() -> Result<Arc<AppState>> {
    let rules = config::load_game_config().map_err(std::io::Error::other)?;
    tracing::debug!(
        target_vip_kills = rules.target_vip_kills,
        time_limit_minutes = rules.time_limit_minutes,
        vip_selection = ?rules.vip_selection,
        "match rules configured"
    );

    let match_registry = Arc::new(MatchRegistry::new(MatchSettings {
        input_channel_capacity: config::INPUT_CHANNEL_CAPACITY,
        world_broadcast_capacity: config::WORLD_BROADCAST_CAPACITY,
        timing: WorldTiming {
            tick_interval: config::TICK_INTERVAL,
            start_delay: config::MATCH_START_DELAY,
        },
        end_linger: config::MATCH_END_LINGER,
        rules,
    }));

    // The default match is pinned so sockets without a match id always land
    // somewhere; a fresh one replaces it after every round.
    let default_match = match_registry
        .create_match(config::DEFAULT_MATCH_ID.to_string(), true)
        .await
        .map_err(|e| std::io::Error::other(format!("failed to create default match: {e}")))?;
    spawn_match_serializer(&default_match);
    match_registry
        .clone()
        .spawn_pinned_recycler(default_match.clone(), spawn_match_serializer);

    Ok(Arc::new(AppState {
        match_registry,
        default_match_id: default_match.match_id.clone(),
    }))
}
