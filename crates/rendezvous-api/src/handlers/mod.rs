//! HTTP handlers: the signaling socket and read-only relay state.

pub mod signal;
pub mod status;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use rendezvous_services::Relay;

#[derive(Clone)]
pub struct ApiState {
    pub relay: Arc<Relay>,
    /// Outbound frames buffered per connection.
    pub send_queue: usize,
    /// Address the listener is bound to, as reported by /status.
    pub listen: SocketAddr,
    pub started_at: Instant,
}

impl ApiState {
    pub fn new(relay: Arc<Relay>, send_queue: usize, listen: SocketAddr) -> Self {
        Self {
            relay,
            send_queue,
            listen,
            started_at: Instant::now(),
        }
    }
}

// Re-export handler functions for use in router setup.
pub use signal::handle_upgrade;
pub use status::{handle_peers, handle_status};
