//! Relay status and peer listing commands.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json};

// ── Response types ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct StatusResponse {
    listen: String,
    peers: usize,
    uptime_secs: u64,
}

#[derive(Deserialize)]
struct PeersResponse {
    peers: Vec<PeerInfo>,
}

#[derive(Deserialize)]
struct PeerInfo {
    id: u64,
    connected_secs: u64,
}

// ── Commands ──────────────────────────────────────────────────────────────────

pub async fn cmd_status(port: u16) -> Result<()> {
    let resp: StatusResponse = get_json(&format!("{}/status", base_url(port))).await?;

    println!("═══════════════════════════════════════");
    println!("  Rendezvous Relay Status");
    println!("═══════════════════════════════════════");
    println!("  Listening on : {}", resp.listen);
    println!("  Peers online : {}", resp.peers);
    println!("  Uptime       : {}", format_secs(resp.uptime_secs));

    Ok(())
}

pub async fn cmd_peers(port: u16) -> Result<()> {
    let resp: PeersResponse = get_json(&format!("{}/peers", base_url(port))).await?;

    if resp.peers.is_empty() {
        println!("No peers connected.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Connected Peers ({})", resp.peers.len());
    println!("═══════════════════════════════════════");

    for p in &resp.peers {
        println!("  {:>10}   connected {}", p.id, format_secs(p.connected_secs));
    }

    Ok(())
}

fn format_secs(secs: u64) -> String {
    match secs {
        s if s < 60 => format!("{}s", s),
        s if s < 3600 => format!("{}m {}s", s / 60, s % 60),
        s => format!("{}h {}m", s / 3600, (s % 3600) / 60),
    }
}
