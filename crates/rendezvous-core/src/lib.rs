//! rendezvous-core — wire envelope, peer identifiers, and configuration.
//! All other rendezvous crates depend on this one.

pub mod config;
pub mod wire;

pub use wire::{Envelope, EnvelopeKind, PeerId, WireError};
