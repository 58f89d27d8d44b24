use crate::domain::state::{PlayerId, TeamId};
use crate::interface_adapters::http::error_response;
use crate::interface_adapters::protocol::{ClientMessage, ServerMessage, WorldUpdateDto};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::ids::{conn_id, next_player_id};
use crate::use_cases::{GameEvent, MatchHandle, ServerState, WorldUpdate};

use axum::{
    Error,
    extract::{
        Query, State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::timeout;
use tracing::{Instrument, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    InputClosed,
    WorldUpdatesClosed,
    ServerStateClosed,
    JoinRequired,
    JoinTimeout,
    ClosedBeforeJoin,
}

#[derive(Debug, serde::Deserialize)]
pub struct MatchQuery {
    #[serde(default)]
    match_id: Option<String>,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_MESSAGES: u32 = 10;
const MAX_DISPLAY_NAME_LEN: usize = 32;
const JOIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Serializes each world update once and fans the bytes out to every socket.
pub async fn world_update_serializer(
    mut world_rx: broadcast::Receiver<WorldUpdate>,
    world_bytes_tx: broadcast::Sender<Utf8Bytes>,
    world_latest_tx: watch::Sender<Utf8Bytes>,
) {
    loop {
        match world_rx.recv().await {
            Ok(update) => {
                let msg = ServerMessage::WorldUpdate(WorldUpdateDto::from(update));
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize world update");
                        continue;
                    }
                };
                let bytes = Utf8Bytes::from(txt);
                world_latest_tx.send_replace(bytes.clone());
                let _ = world_bytes_tx.send(bytes);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "world serializer lagged; skipping to latest update");
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("world updates channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub fn spawn_match_serializer(handle: &MatchHandle) {
    tokio::spawn(world_update_serializer(
        handle.world_tx.subscribe(),
        handle.world_bytes_tx.clone(),
        handle.world_latest_tx.clone(),
    ));
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<MatchQuery>,
) -> impl IntoResponse {
    let match_id = query
        .match_id
        .unwrap_or_else(|| state.default_match_id.to_string());

    match state.match_registry.get_match(&match_id).await {
        Some(handle) => ws.on_upgrade(move |socket| handle_socket(socket, handle)),
        None => error_response(StatusCode::NOT_FOUND, "match not found"),
    }
}

async fn handle_socket(socket: WebSocket, handle: MatchHandle) {
    // Connection id correlates logs before a player id exists.
    let span = info_span!(
        "conn",
        conn_id = conn_id(),
        match_id = %handle.match_id,
        player_id = tracing::field::Empty
    );
    serve_socket(socket, handle).instrument(span).await;
}

async fn serve_socket(mut socket: WebSocket, handle: MatchHandle) {
    let mut ctx = match bootstrap_connection(&mut socket, &handle).await {
        Ok(ctx) => ctx,
        Err(NetError::ClosedBeforeJoin) => {
            info!("client disconnected before join handshake");
            return;
        }
        Err(e) => {
            warn!(error = ?e, "failed to bootstrap connection");
            let _ = socket.close().await;
            return;
        }
    };

    tracing::Span::current().record("player_id", ctx.player_id);
    info!(
        player_id = ctx.player_id,
        team_id = ctx.team_id,
        display_name = %ctx.display_name,
        "client connected"
    );

    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

struct ConnCtx {
    player_id: PlayerId,
    team_id: TeamId,
    display_name: String,
    input_tx: mpsc::Sender<GameEvent>,
    world_bytes_rx: broadcast::Receiver<Utf8Bytes>,
    world_latest_rx: watch::Receiver<Utf8Bytes>,
    server_state_rx: watch::Receiver<ServerState>,
    stats: ConnStats,
    close_frame: Option<CloseFrame>,
}

#[derive(Debug)]
struct ConnStats {
    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,
    invalid_messages: u32,
    lag_recovery_count: u64,
    last_input_full_log: Instant,
    last_world_lag_log: Instant,
    last_invalid_log: Instant,
}

impl ConnStats {
    fn new(msgs_in: u64, bytes_in: u64) -> Self {
        let now = Instant::now() - LOG_THROTTLE;
        Self {
            msgs_in,
            msgs_out: 0,
            bytes_in,
            bytes_out: 0,
            invalid_messages: 0,
            lag_recovery_count: 0,
            last_input_full_log: now,
            last_world_lag_log: now,
            last_invalid_log: now,
        }
    }

    fn sent(&mut self, bytes: usize) {
        self.msgs_out += 1;
        self.bytes_out += bytes as u64;
    }
}

#[derive(Debug)]
struct JoinHandshake {
    team_id: TeamId,
    display_name: String,
    bytes_in: u64,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    handle: &MatchHandle,
) -> Result<ConnCtx, NetError> {
    // Subscribe before any await so no update is missed.
    let world_bytes_rx = handle.world_bytes_tx.subscribe();
    let world_latest_rx = handle.world_latest_tx.subscribe();
    let server_state_rx = handle.server_state_tx.subscribe();

    let join = match timeout(JOIN_HANDSHAKE_TIMEOUT, read_join_handshake(socket)).await {
        Ok(result) => result?,
        Err(_) => {
            let _ = send_close_with_reason(socket, close_code::POLICY, "join timeout").await;
            return Err(NetError::JoinTimeout);
        }
    };

    let player_id = next_player_id();
    let identity = ServerMessage::Identity {
        player_id: player_id.to_string(),
        team_id: join.team_id,
    };
    let mut stats = ConnStats::new(1, join.bytes_in);
    stats.sent(send_message(socket, &identity).await?);

    // Join goes out before the initial state; anything failing after it is
    // compensated with a Leave.
    handle
        .input_tx
        .send(GameEvent::Join {
            player_id,
            team_id: join.team_id,
        })
        .await
        .map_err(|_| NetError::InputClosed)?;

    let initial_state = server_state_rx.borrow().clone();
    let state_msg = ServerMessage::GameState(initial_state.into());
    match send_message(socket, &state_msg).await {
        Ok(bytes) => stats.sent(bytes),
        Err(e) => {
            handle
                .input_tx
                .send(GameEvent::Leave { player_id })
                .await
                .map_err(|_| NetError::InputClosed)?;
            return Err(e);
        }
    }

    Ok(ConnCtx {
        player_id,
        team_id: join.team_id,
        display_name: join.display_name,
        input_tx: handle.input_tx.clone(),
        world_bytes_rx,
        world_latest_rx,
        server_state_rx,
        stats,
        close_frame: None,
    })
}

async fn read_join_handshake(socket: &mut WebSocket) -> Result<JoinHandshake, NetError> {
    loop {
        let Some(incoming) = socket.recv().await else {
            return Err(NetError::ClosedBeforeJoin);
        };

        match incoming.map_err(NetError::Ws)? {
            Message::Text(text) => {
                let bytes_in = text.len() as u64;
                let payload = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(payload)) => payload,
                    Ok(_) => {
                        let _ = send_close_with_reason(socket, close_code::POLICY, "join required")
                            .await;
                        return Err(NetError::JoinRequired);
                    }
                    Err(_) => {
                        let _ = send_close_with_reason(
                            socket,
                            close_code::POLICY,
                            "invalid join payload",
                        )
                        .await;
                        return Err(NetError::JoinRequired);
                    }
                };

                if payload.team_id == 0 {
                    let _ =
                        send_close_with_reason(socket, close_code::POLICY, "invalid team").await;
                    return Err(NetError::JoinRequired);
                }

                let display_name: String = payload
                    .display_name
                    .trim()
                    .chars()
                    .take(MAX_DISPLAY_NAME_LEN)
                    .collect();
                return Ok(JoinHandshake {
                    team_id: payload.team_id,
                    display_name,
                    bytes_in,
                });
            }
            Message::Binary(_) => {
                let _ = send_close_with_reason(
                    socket,
                    close_code::UNSUPPORTED,
                    "binary messages not supported",
                )
                .await;
                return Err(NetError::JoinRequired);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Err(NetError::ClosedBeforeJoin),
        }
    }
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

enum LoopControl {
    Continue,
    Disconnect,
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let player_id = ctx.player_id;
    let mut fatal: Option<NetError> = None;

    loop {
        let disconnect: bool = tokio::select! {
            incoming = socket.recv() => {
                match handle_incoming_ws(incoming, ctx).await {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            world_msg = ctx.world_bytes_rx.recv() => {
                match world_msg {
                    Ok(bytes) => matches!(
                        forward_bytes(bytes, socket, &mut ctx.stats).await,
                        LoopControl::Disconnect
                    ),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(&mut ctx.stats.last_world_lag_log) {
                            warn!(missed = n, "world updates lagged; sending snapshot");
                        }
                        // Resync with the latest snapshot instead of replaying.
                        let latest = ctx.world_latest_rx.borrow().clone();
                        if latest.is_empty() {
                            false
                        } else {
                            ctx.stats.lag_recovery_count += 1;
                            matches!(
                                forward_bytes(latest, socket, &mut ctx.stats).await,
                                LoopControl::Disconnect
                            )
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::WorldUpdatesClosed);
                        true
                    }
                }
            }

            changed_state = ctx.server_state_rx.changed() => {
                match changed_state {
                    Ok(()) => {
                        let st = ctx.server_state_rx.borrow().clone();
                        let msg = ServerMessage::GameState(st.into());
                        match send_message(socket, &msg).await {
                            Ok(bytes) => {
                                ctx.stats.sent(bytes);
                                false
                            }
                            Err(err) => {
                                warn!(error = ?err, "failed to send server state");
                                true
                            }
                        }
                    }
                    Err(_) => {
                        warn!(player_id, "server state channel closed; disconnecting");
                        fatal = Some(NetError::ServerStateClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = ctx.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(ctx).await {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn parse_client_message(text: &str, player_id: PlayerId) -> Result<Option<GameEvent>, String> {
    let msg = serde_json::from_str::<ClientMessage>(text).map_err(|e| e.to_string())?;
    let event = match msg {
        // Repeated joins after the handshake are ignored.
        ClientMessage::Join(_) => return Ok(None),
        ClientMessage::Deploy => GameEvent::Deploy { player_id },
        ClientMessage::Move(payload) => {
            let position = payload
                .to_position()
                .ok_or_else(|| "non-finite position".to_string())?;
            GameEvent::Move {
                player_id,
                position,
            }
        }
        ClientMessage::Died(payload) => {
            let killer_id = payload
                .killer_id
                .map(|id| id.parse::<PlayerId>())
                .transpose()
                .map_err(|e| format!("invalid killer_id: {e}"))?;
            GameEvent::Died {
                player_id,
                killer_id,
            }
        }
        ClientMessage::SwitchTeam(payload) => {
            if payload.team_id == 0 {
                return Err("invalid team".to_string());
            }
            GameEvent::SwitchTeam {
                player_id,
                team_id: payload.team_id,
            }
        }
    };
    Ok(Some(event))
}

async fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    ctx: &mut ConnCtx,
) -> Result<LoopControl, NetError> {
    let player_id = ctx.player_id;
    let msg = match incoming {
        Some(Ok(msg)) => msg,
        Some(Err(e)) => {
            warn!(player_id, error = %e, "websocket recv error");
            return Ok(LoopControl::Disconnect);
        }
        None => {
            info!(player_id, "websocket closed");
            return Ok(LoopControl::Disconnect);
        }
    };

    match msg {
        Message::Text(text) => {
            ctx.stats.msgs_in += 1;
            ctx.stats.bytes_in += text.len() as u64;

            match parse_client_message(&text, player_id) {
                Ok(None) => {
                    if should_log(&mut ctx.stats.last_invalid_log) {
                        warn!(player_id, "duplicate join ignored");
                    }
                    Ok(LoopControl::Continue)
                }
                Ok(Some(event @ GameEvent::Move { .. })) => {
                    // Positions are superseded every frame, so drop when full.
                    match ctx.input_tx.try_send(event) {
                        Ok(()) => Ok(LoopControl::Continue),
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            if should_log(&mut ctx.stats.last_input_full_log) {
                                warn!(player_id, "input channel full; dropping move");
                            }
                            Ok(LoopControl::Continue)
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => Err(NetError::InputClosed),
                    }
                }
                Ok(Some(event)) => {
                    ctx.input_tx
                        .send(event)
                        .await
                        .map_err(|_| NetError::InputClosed)?;
                    Ok(LoopControl::Continue)
                }
                Err(reason) => {
                    ctx.stats.invalid_messages += 1;
                    if should_log(&mut ctx.stats.last_invalid_log) {
                        warn!(player_id, bytes = text.len(), %reason, "invalid client message");
                    }
                    if ctx.stats.invalid_messages > MAX_INVALID_MESSAGES {
                        ctx.close_frame = Some(CloseFrame {
                            code: close_code::POLICY,
                            reason: "too many invalid messages".into(),
                        });
                        return Ok(LoopControl::Disconnect);
                    }
                    Ok(LoopControl::Continue)
                }
            }
        }
        Message::Binary(_) => {
            ctx.close_frame = Some(CloseFrame {
                code: close_code::UNSUPPORTED,
                reason: "binary messages not supported".into(),
            });
            Ok(LoopControl::Disconnect)
        }
        Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
        Message::Close(_) => Ok(LoopControl::Disconnect),
    }
}

async fn forward_bytes(bytes: Utf8Bytes, socket: &mut WebSocket, stats: &mut ConnStats) -> LoopControl {
    let len = bytes.len();
    match socket.send(Message::Text(bytes)).await {
        Ok(()) => {
            stats.sent(len);
            LoopControl::Continue
        }
        Err(err) => {
            warn!(error = ?err, "failed to send world update");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(ctx: &ConnCtx) -> Result<(), NetError> {
    ctx.input_tx
        .send(GameEvent::Leave {
            player_id: ctx.player_id,
        })
        .await
        .map_err(|_| NetError::InputClosed)?;

    let stats = &ctx.stats;
    debug!(
        player_id = ctx.player_id,
        msgs_in = stats.msgs_in,
        msgs_out = stats.msgs_out,
        bytes_in = stats.bytes_in,
        bytes_out = stats.bytes_out,
        invalid_messages = stats.invalid_messages,
        lag_recovery_count = stats.lag_recovery_count,
        "connection stats"
    );
    info!(player_id = ctx.player_id, "client disconnected");
    Ok(())
}
