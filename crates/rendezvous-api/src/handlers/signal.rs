//! WebSocket signaling transport.
//!
//! Each accepted socket becomes one session: a writer drains the session's
//! outbound queue onto the socket, a reader feeds inbound frames to the
//! handler. Whichever side finishes first ends the session, as does the
//! relay closing the session itself (an id collision displaced it).

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use rendezvous_services::{Frame, SignalHandler};

use super::ApiState;

pub async fn handle_upgrade(State(state): State<ApiState>, ws: WebSocketUpgrade) -> Response {
    let relay = state.relay.clone();
    let send_queue = state.send_queue;
    ws.on_upgrade(move |socket| run_session(socket, relay, send_queue))
}

/// Drive one connection from accept to teardown.
pub async fn run_session<H: SignalHandler>(socket: WebSocket, handler: Arc<H>, send_queue: usize) {
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Frame>(send_queue.max(1));
    let session = handler.on_connect(outbound_tx);
    let peer = session.id();

    let (mut ws_tx, mut ws_rx) = socket.split();

    let writer = async {
        while let Some(frame) = outbound_rx.recv().await {
            if ws_tx.send(Message::Text(frame.to_string().into())).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    };

    let reader = async {
        while let Some(msg) = ws_rx.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    handler.on_message(&session, text.as_str().as_bytes());
                }
                Ok(Message::Binary(bytes)) => {
                    handler.on_message(&session, &bytes);
                }
                Ok(Message::Close(_)) => break,
                // axum answers pings itself
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Err(e) => {
                    tracing::debug!(%peer, error = %e, "socket error");
                    break;
                }
            }
        }
    };

    tokio::select! {
        _ = writer => {},
        _ = reader => {},
        _ = session.closed() => {
            tracing::debug!(%peer, "session closed by relay, dropping socket");
        }
    }

    handler.on_disconnect(&session);
}
