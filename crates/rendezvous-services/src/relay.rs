//! Signaling relay — routes envelopes between registered sessions.
//!
//! The relay never inspects payloads. It rewrites the `id` field of a
//! forwarded envelope from destination to source and hands it to the
//! destination's outbound queue. Anything it cannot deliver is dropped.

use std::sync::Arc;

use tokio::sync::mpsc;

use rendezvous_core::{Envelope, PeerId};

use crate::ids::{IdSource, RandomIds};
use crate::registry::SessionRegistry;
use crate::session::{Frame, SendError, Session};

/// How many fresh ids to try before accepting one that is already taken.
const ID_ATTEMPTS: usize = 8;

/// Connection lifecycle callbacks, invoked by the transport.
///
/// Each connection delivers its events in order; different connections
/// may call in concurrently.
pub trait SignalHandler: Send + Sync {
    /// A connection was accepted. `outbound` feeds its socket writer.
    fn on_connect(&self, outbound: mpsc::Sender<Frame>) -> Arc<Session>;

    /// One frame arrived from `source`.
    fn on_message(&self, source: &Session, raw: &[u8]) -> Delivery;

    /// The connection is gone. Safe to call more than once.
    fn on_disconnect(&self, session: &Session);
}

/// What happened to one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Forwarded(PeerId),
    Malformed,
    NoDestination,
    /// The sending session was already closed.
    SourceClosed,
    UnknownPeer(PeerId),
    PeerClosed(PeerId),
    QueueFull(PeerId),
}

/// The relay: identifier assignment, membership notices, and routing.
pub struct Relay {
    registry: SessionRegistry,
    ids: Box<dyn IdSource>,
}

impl Relay {
    pub fn new(registry: SessionRegistry, ids: impl IdSource + 'static) -> Self {
        Self {
            registry,
            ids: Box::new(ids),
        }
    }

    /// A relay with its own empty registry and random ids in `1..id_space`.
    pub fn with_id_space(id_space: u64) -> Self {
        Self::new(SessionRegistry::new(), RandomIds::new(id_space))
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    fn fresh_id(&self) -> PeerId {
        let mut id = self.ids.next_id();
        for _ in 1..ID_ATTEMPTS {
            if !self.registry.contains(id) {
                break;
            }
            id = self.ids.next_id();
        }
        id
    }

    /// Register a new connection and announce it.
    ///
    /// The identity frame is queued before the session is registered, so it
    /// is always the first frame the peer receives.
    pub fn connect(&self, outbound: mpsc::Sender<Frame>) -> Arc<Session> {
        let session = Arc::new(Session::new(self.fresh_id(), outbound));
        let id = session.id();

        if let Err(e) = session.send(&Envelope::identity(id)) {
            tracing::warn!(peer = %id, error = %e, "failed to send identity");
        }
        if let Some(displaced) = self.registry.insert(Arc::clone(&session)) {
            tracing::warn!(peer = %id, "peer id collision, previous session displaced");
            displaced.close();
        }
        tracing::info!(peer = %id, peers = self.registry.len(), "peer connected");

        let notified = self.broadcast_except(id, &Envelope::joined(id));
        tracing::debug!(peer = %id, notified, "join announced");

        session
    }

    /// Unregister a connection and announce its departure.
    ///
    /// Only the first call for a session broadcasts.
    pub fn disconnect(&self, session: &Session) {
        let id = session.id();
        session.close();
        if self.registry.remove_exact(session).is_none() {
            return;
        }
        tracing::info!(peer = %id, peers = self.registry.len(), "peer disconnected");

        let notified = self.broadcast_except(id, &Envelope::left(id));
        tracing::debug!(peer = %id, notified, "leave announced");
    }

    /// Route one inbound frame from `source`.
    ///
    /// Frames from a closed session are refused: its id may already belong
    /// to the session that displaced it.
    pub fn handle_inbound(&self, source: &Session, raw: &[u8]) -> Delivery {
        if !source.is_open() {
            tracing::debug!(peer = %source.id(), "frame from closed session, dropped");
            return Delivery::SourceClosed;
        }
        let envelope = match Envelope::parse_bytes(raw) {
            Ok(env) => env,
            Err(e) => {
                tracing::warn!(peer = %source.id(), error = %e, "discarding malformed envelope");
                return Delivery::Malformed;
            }
        };

        let Some(target) = envelope.peer else {
            tracing::debug!(
                peer = %source.id(),
                kind = envelope.kind_str(),
                "no destination, dropped"
            );
            return Delivery::NoDestination;
        };
        let kind = envelope.kind_str().to_string();
        let envelope = envelope.readdressed(source.id());

        let delivery = self.send_to(target, &envelope);
        match &delivery {
            Delivery::Forwarded(_) => {
                tracing::trace!(from = %source.id(), to = %target, %kind, "forwarded")
            }
            other => {
                tracing::debug!(from = %source.id(), to = %target, %kind, outcome = ?other, "dropped")
            }
        }
        delivery
    }

    fn send_to(&self, target: PeerId, envelope: &Envelope) -> Delivery {
        let Some(session) = self.registry.find(target) else {
            return Delivery::UnknownPeer(target);
        };
        if !session.is_open() {
            return Delivery::PeerClosed(target);
        }
        match session.send(envelope) {
            Ok(()) => Delivery::Forwarded(target),
            Err(SendError::QueueFull(_)) => {
                tracing::warn!(peer = %target, "send queue full, frame dropped");
                Delivery::QueueFull(target)
            }
            Err(SendError::Closed(_)) => Delivery::PeerClosed(target),
            Err(SendError::Encode(e)) => {
                tracing::warn!(peer = %target, error = %e, "failed to encode envelope");
                Delivery::Malformed
            }
        }
    }

    /// Send `envelope` to every open session except `excluded`.
    /// Returns the number of sessions that accepted it.
    pub fn broadcast_except(&self, excluded: PeerId, envelope: &Envelope) -> usize {
        let frame: Frame = match envelope.to_json() {
            Ok(json) => json.into(),
            Err(e) => {
                tracing::warn!(kind = envelope.kind_str(), error = %e, "failed to encode broadcast");
                return 0;
            }
        };

        let mut delivered = 0;
        for session in self.registry.for_each_except(excluded) {
            match session.send_frame(Arc::clone(&frame)) {
                Ok(()) => delivered += 1,
                Err(e) => tracing::debug!(peer = %session.id(), error = %e, "broadcast skipped peer"),
            }
        }
        delivered
    }
}

impl SignalHandler for Relay {
    fn on_connect(&self, outbound: mpsc::Sender<Frame>) -> Arc<Session> {
        self.connect(outbound)
    }

    fn on_message(&self, source: &Session, raw: &[u8]) -> Delivery {
        self.handle_inbound(source, raw)
    }

    fn on_disconnect(&self, session: &Session) {
        self.disconnect(session)
    }
}
