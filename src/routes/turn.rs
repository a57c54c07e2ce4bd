//! # Turn Route
//!
//! Intake for conversation turns from the messaging collaborator. Each turn
//! is handed to the dialogue controller on its own task so this endpoint
//! stays responsive even while a swap confirmation is polling; replies are
//! pushed back through the configured messenger, not this response.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::server::AppState;

/// One user turn as delivered by the messaging collaborator.
#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    pub user_id: u64,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct TurnResponse {
    pub status: &'static str,
}

/// Accept a turn and process it in the background.
///
/// # Route
/// - **Method**: POST
/// - **Path**: `/api/v1/turn`
/// - **Response**: `202 Accepted` once the turn is queued
pub async fn submit_turn(
    State(state): State<Arc<AppState>>,
    Json(turn): Json<TurnRequest>,
) -> (StatusCode, Json<TurnResponse>) {
    debug!("turn from user {}", turn.user_id);

    let controller = Arc::clone(&state.controller);
    tokio::spawn(async move {
        controller.handle_turn(turn.user_id, &turn.text).await;
    });

    (StatusCode::ACCEPTED, Json(TurnResponse { status: "accepted" }))
}
