//! Rendezvous integration test harness.
//!
//! Every test boots its own relay on 127.0.0.1:0 inside the test runtime
//! and talks to it over real WebSocket connections, so tests never share
//! state and need no external setup.
//!
//!   cargo test --test integration

mod failures;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use rendezvous_api::{router, serve, ApiState};
use rendezvous_services::Relay;

// ── Harness ───────────────────────────────────────────────────────────────────

/// How long to wait for a frame that should arrive.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// How long to listen before concluding nothing is coming.
pub const QUIET_PERIOD: Duration = Duration::from_millis(300);

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A relay running in the background of the current test.
pub struct TestRelay {
    pub addr: SocketAddr,
    pub relay: Arc<Relay>,
    shutdown: broadcast::Sender<()>,
}

impl TestRelay {
    pub async fn start() -> Result<Self> {
        Self::start_with(true).await
    }

    pub async fn start_with(api_enabled: bool) -> Result<Self> {
        Self::start_relay(Relay::with_id_space(1_000_000), api_enabled).await
    }

    /// Serve a caller-built relay, e.g. one with a custom id source.
    pub async fn start_relay(relay: Relay, api_enabled: bool) -> Result<Self> {
        let relay = Arc::new(relay);
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind test listener")?;
        let addr = listener.local_addr()?;

        let (shutdown, _) = broadcast::channel(1);
        let app = router(ApiState::new(relay.clone(), 64, addr), api_enabled);
        tokio::spawn(serve(listener, app, shutdown.subscribe()));

        Ok(Self {
            addr,
            relay,
            shutdown,
        })
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/", self.addr)
    }

    pub fn api_url(&self, path: &str) -> String {
        format!("http://{}/api{}", self.addr, path)
    }

    /// Connect a client and consume its identity assignment.
    pub async fn connect(&self) -> Result<Peer> {
        let (mut ws, _) = connect_async(self.ws_url())
            .await
            .context("websocket connect failed")?;
        let first = recv_json(&mut ws).await?;
        if first["type"] != "id" {
            bail!("expected identity assignment first, got {first}");
        }
        let id = first["id"].as_u64().context("identity id is not an integer")?;
        Ok(Peer { id, ws })
    }

    /// Poll until the registry holds exactly `n` sessions.
    pub async fn wait_for_peers(&self, n: usize) -> Result<()> {
        let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
        while self.relay.registry().len() != n {
            if tokio::time::Instant::now() > deadline {
                bail!(
                    "registry holds {} peers, expected {n}",
                    self.relay.registry().len()
                );
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Ok(())
    }
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
    }
}

/// One connected client.
pub struct Peer {
    pub id: u64,
    pub ws: WsStream,
}

impl Peer {
    pub async fn send_json(&mut self, value: &Value) -> Result<()> {
        self.ws
            .send(Message::text(value.to_string()))
            .await
            .context("send failed")
    }

    pub async fn send_raw(&mut self, text: &str) -> Result<()> {
        self.ws
            .send(Message::text(text.to_string()))
            .await
            .context("send failed")
    }

    pub async fn recv(&mut self) -> Result<Value> {
        recv_json(&mut self.ws).await
    }

    /// Fail if any text frame arrives within the quiet period.
    pub async fn expect_silence(&mut self) -> Result<()> {
        match timeout(QUIET_PERIOD, next_text(&mut self.ws)).await {
            Err(_) => Ok(()),
            Ok(Ok(text)) => bail!("peer {} got unexpected frame: {text}", self.id),
            Ok(Err(e)) => Err(e),
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.ws.close(None).await.context("close failed")
    }
}

async fn next_text(ws: &mut WsStream) -> Result<String> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return Ok(text.to_string()),
            Some(Ok(Message::Close(_))) | None => bail!("connection closed"),
            Some(Ok(_)) => continue,
            Some(Err(e)) => bail!("websocket error: {e}"),
        }
    }
}

/// Read the next text frame as JSON.
pub async fn recv_json(ws: &mut WsStream) -> Result<Value> {
    let text = timeout(RECV_TIMEOUT, next_text(ws))
        .await
        .context("timeout waiting for frame")??;
    serde_json::from_str(&text).with_context(|| format!("frame is not JSON: {text}"))
}

// ── Smoke test ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_first_frame_is_identity() {
    let relay = TestRelay::start().await.unwrap();
    let peer = relay.connect().await.unwrap();

    assert!(peer.id > 0 && peer.id < 1_000_000, "id {} out of range", peer.id);
    relay.wait_for_peers(1).await.unwrap();
}
