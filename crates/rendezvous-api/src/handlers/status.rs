//! /status and /peers handlers.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::ApiState;

// ── /status ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatusResponse {
    pub listen: String,
    pub peers: usize,
    pub uptime_secs: u64,
}

pub async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        listen: state.listen.to_string(),
        peers: state.relay.registry().len(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

// ── /peers ────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct PeersResponse {
    pub peers: Vec<PeerInfo>,
}

#[derive(Serialize)]
pub struct PeerInfo {
    pub id: u64,
    pub connected_secs: u64,
}

pub async fn handle_peers(State(state): State<ApiState>) -> Json<PeersResponse> {
    let peers = state
        .relay
        .registry()
        .snapshot()
        .iter()
        .filter(|s| s.is_open())
        .map(|s| PeerInfo {
            id: s.id().get(),
            connected_secs: s.connected_at().elapsed().as_secs(),
        })
        .collect();

    Json(PeersResponse { peers })
}
