use crate::interface_adapters::http::error_response;
use crate::interface_adapters::net::client::spawn_match_serializer;
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::ids;
use crate::use_cases::MatchError;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

#[derive(Debug, Default, serde::Deserialize)]
pub struct MatchInitRequest {
    // Generated when missing or blank.
    #[serde(default)]
    match_id: Option<String>,
}

#[derive(Debug, serde::Serialize)]
struct MatchInitResponse {
    match_id: String,
}

pub async fn create_match_handler(
    State(state): State<Arc<AppState>>,
    payload: Option<Json<MatchInitRequest>>,
) -> impl IntoResponse {
    let payload = payload.map(|Json(body)| body).unwrap_or_default();
    let match_id = payload
        .match_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(ids::match_id);

    // Created matches are not pinned; the end watcher removes them.
    match state
        .match_registry
        .create_match(match_id.clone(), false)
        .await
    {
        Ok(handle) => {
            spawn_match_serializer(&handle);
            state
                .match_registry
                .clone()
                .spawn_match_end_watcher(handle.match_id.clone(), handle.server_state_tx.subscribe());
            (StatusCode::CREATED, Json(MatchInitResponse { match_id })).into_response()
        }
        Err(err @ MatchError::AlreadyExists) => {
            error_response(StatusCode::CONFLICT, err.to_string())
        }
    }
}
