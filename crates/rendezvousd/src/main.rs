//! rendezvousd — WebSocket signaling relay for peer-to-peer negotiation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;

use rendezvous_core::config::RendezvousConfig;
use rendezvous_services::Relay;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    let config = RendezvousConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        let mut config = RendezvousConfig::default();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        if config.validate().is_err() {
            config = RendezvousConfig::default();
        }
        config
    });
    tracing::info!(
        path = %RendezvousConfig::file_path().display(),
        id_space = config.relay.id_space,
        send_queue = config.relay.send_queue,
        api = config.api.enabled,
        "rendezvousd starting"
    );

    // Shared state
    let relay = Arc::new(Relay::with_id_space(config.relay.id_space));

    // Bind
    let listener = TcpListener::bind(config.listen_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr()))?;
    let listen = listener.local_addr()?;

    let state = rendezvous_api::ApiState::new(relay.clone(), config.relay.send_queue, listen);
    let app = rendezvous_api::router(state, config.api.enabled);

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Spawn tasks ──────────────────────────────────────────────────────────

    let server_task = tokio::spawn(rendezvous_api::serve(listener, app, shutdown_tx.subscribe()));

    let peer_printer = {
        let relay = relay.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                tracing::debug!(count = relay.registry().len(), "peer table snapshot");
            }
        })
    };

    // ── Wait for exit ────────────────────────────────────────────────────────

    let result = tokio::select! {
        r = server_task  => r.context("server task panicked")?,
        r = peer_printer => {
            tracing::error!("peer printer exited: {:?}", r);
            Ok(())
        }
    };

    tracing::info!("shutting down");
    result
}
