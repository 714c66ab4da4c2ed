//! Session record — one connected peer and its outbound queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, Notify};

use rendezvous_core::{Envelope, PeerId, WireError};

/// A serialized outbound frame. Shared so a broadcast encodes once.
pub type Frame = Arc<str>;

/// A connected peer.
///
/// The session owns the sending half of its connection's outbound queue;
/// the transport drains the other half onto the socket. State moves
/// OPEN → CLOSED exactly once, via [`Session::close`].
#[derive(Debug)]
pub struct Session {
    id: PeerId,
    outbound: mpsc::Sender<Frame>,
    open: AtomicBool,
    closed: Notify,
    connected_at: Instant,
}

impl Session {
    pub fn new(id: PeerId, outbound: mpsc::Sender<Frame>) -> Self {
        Self {
            id,
            outbound,
            open: AtomicBool::new(true),
            closed: Notify::new(),
            connected_at: Instant::now(),
        }
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn connected_at(&self) -> Instant {
        self.connected_at
    }

    /// OPEN until closed explicitly or until the transport drops its receiver.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) && !self.outbound.is_closed()
    }

    /// Mark the session CLOSED. Returns true only for the call that
    /// performed the transition.
    pub fn close(&self) -> bool {
        let was_open = self.open.swap(false, Ordering::AcqRel);
        if was_open {
            self.closed.notify_waiters();
        }
        was_open
    }

    /// Resolves once [`Session::close`] has been called.
    pub async fn closed(&self) {
        let notified = self.closed.notified();
        if !self.open.load(Ordering::Acquire) {
            return;
        }
        notified.await;
    }

    /// Queue an already-encoded frame. Never waits.
    pub fn send_frame(&self, frame: Frame) -> Result<(), SendError> {
        if !self.open.load(Ordering::Acquire) {
            return Err(SendError::Closed(self.id));
        }
        self.outbound.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::QueueFull(self.id),
            mpsc::error::TrySendError::Closed(_) => SendError::Closed(self.id),
        })
    }

    /// Encode and queue one envelope.
    pub fn send(&self, envelope: &Envelope) -> Result<(), SendError> {
        let frame: Frame = envelope.to_json()?.into();
        self.send_frame(frame)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("peer {0} is closed")]
    Closed(PeerId),
    #[error("send queue for peer {0} is full")]
    QueueFull(PeerId),
    #[error("failed to encode envelope: {0}")]
    Encode(#[from] WireError),
}
