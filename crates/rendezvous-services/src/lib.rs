//! rendezvous-services — session registry and signaling relay.
//!
//! The transport hands each connection to a [`SignalHandler`]; the
//! [`Relay`] implementation assigns identifiers, keeps the
//! [`SessionRegistry`] current, and routes envelopes between peers.

pub mod ids;
pub mod registry;
pub mod relay;
pub mod session;

pub use ids::{IdSource, RandomIds};
pub use registry::SessionRegistry;
pub use relay::{Delivery, Relay, SignalHandler};
pub use session::{Frame, SendError, Session};
