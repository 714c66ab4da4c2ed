//! Rendezvous wire format: the JSON envelope exchanged with clients.
//!
//! Every frame on the signaling channel is one JSON object:
//!
//! ```text
//! { "type": "offer", "id": 123456, "data": { ... } }
//! ```
//!
//! `type` selects the envelope kind and may be absent. `id` names a peer
//! (the destination on inbound negotiation messages, the source once the
//! relay forwards them), and `data` is opaque. The relay never looks inside
//! `data`; any other top-level fields are carried through untouched.
//!
//! Peer identifiers are normalized here, at parse time, so nothing past this
//! module ever compares a textual id against a numeric one.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

// ── Peer identifiers ─────────────────────────────────────────────────────────

/// Identifier assigned to a connected peer.
///
/// Always non-zero: `0` on the wire means "no destination".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PeerId(u64);

impl PeerId {
    /// Wrap a raw identifier. Returns `None` for zero.
    pub fn new(raw: u64) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PeerId {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_destination(&Value::String(s.to_string()))? {
            Some(id) => Ok(id),
            None => Err(WireError::InvalidDestination(Value::String(s.to_string()))),
        }
    }
}

/// Normalize the `id` field of an inbound envelope.
///
/// Accepted forms for a destination: a positive integer, an integral float
/// (`42.0`), or a string holding either of those (surrounding whitespace is
/// ignored). `null`, `false`, `0` and the empty string mean "no destination".
/// Everything else is rejected.
pub fn normalize_destination(value: &Value) -> Result<Option<PeerId>, WireError> {
    let raw = match value {
        Value::Null | Value::Bool(false) => return Ok(None),
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    };

    match raw {
        Some(raw) => Ok(PeerId::new(raw)),
        None => Err(WireError::InvalidDestination(value.clone())),
    }
}

fn integral(f: f64) -> Option<u64> {
    // u64::MAX as f64 rounds up to 2^64, hence the strict bound.
    (f.is_finite() && f.fract() == 0.0 && f >= 0.0 && f < u64::MAX as f64).then(|| f as u64)
}

// ── Envelope kind ────────────────────────────────────────────────────────────

/// The `type` tag of an envelope.
///
/// Only `id`, `user_connected` and `user_disconnected` are produced by the
/// relay itself. The negotiation kinds are named for logging; any other
/// spelling is kept verbatim in `Other` and routed the same way.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EnvelopeKind {
    /// Identity assignment sent to a newly connected peer.
    Id,
    /// Another peer joined.
    UserConnected,
    /// Another peer left.
    UserDisconnected,
    Offer,
    Answer,
    Candidate,
    Other(String),
}

impl EnvelopeKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Id => "id",
            Self::UserConnected => "user_connected",
            Self::UserDisconnected => "user_disconnected",
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::Candidate => "candidate",
            Self::Other(s) => s,
        }
    }

    /// True for kinds the relay synthesizes on connect/disconnect.
    pub fn is_system(&self) -> bool {
        matches!(self, Self::Id | Self::UserConnected | Self::UserDisconnected)
    }
}

impl From<String> for EnvelopeKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "id" => Self::Id,
            "user_connected" => Self::UserConnected,
            "user_disconnected" => Self::UserDisconnected,
            "offer" => Self::Offer,
            "answer" => Self::Answer,
            "candidate" => Self::Candidate,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for EnvelopeKind {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EnvelopeKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ── Envelope ─────────────────────────────────────────────────────────────────

/// One message unit on the signaling channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    /// `None` when the frame had no string `type`. A non-string `type` is
    /// left in `extra` and forwarded as it came.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<EnvelopeKind>,

    /// Destination on inbound messages, source on forwarded ones.
    #[serde(rename = "id")]
    pub peer: Option<PeerId>,

    /// Opaque payload. `None` only when the field was absent on the wire;
    /// an explicit `null` is kept as `Some(Value::Null)`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Any other top-level fields, forwarded as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Envelope {
    /// Build a relay-originated envelope about `peer`.
    ///
    /// System envelopes carry an empty-string payload.
    pub fn system(kind: EnvelopeKind, peer: PeerId) -> Self {
        Self {
            kind: Some(kind),
            peer: Some(peer),
            data: Some(Value::String(String::new())),
            extra: Map::new(),
        }
    }

    /// Identity assignment for a newly connected peer.
    pub fn identity(peer: PeerId) -> Self {
        Self::system(EnvelopeKind::Id, peer)
    }

    /// Membership notice: `peer` joined.
    pub fn joined(peer: PeerId) -> Self {
        Self::system(EnvelopeKind::UserConnected, peer)
    }

    /// Membership notice: `peer` left.
    pub fn left(peer: PeerId) -> Self {
        Self::system(EnvelopeKind::UserDisconnected, peer)
    }

    /// Parse one text frame.
    pub fn parse(raw: &str) -> Result<Self, WireError> {
        let value: Value = serde_json::from_str(raw)?;
        let Value::Object(mut fields) = value else {
            return Err(WireError::NotObject);
        };

        let kind = match fields.remove("type") {
            Some(Value::String(s)) => Some(EnvelopeKind::from(s)),
            Some(other) => {
                fields.insert("type".to_string(), other);
                None
            }
            None => None,
        };
        let peer = match fields.remove("id") {
            Some(v) => normalize_destination(&v)?,
            None => None,
        };
        let data = fields.remove("data");

        Ok(Self {
            kind,
            peer,
            data,
            extra: fields,
        })
    }

    /// Parse one binary frame. The bytes must be UTF-8 JSON.
    pub fn parse_bytes(raw: &[u8]) -> Result<Self, WireError> {
        Self::parse(std::str::from_utf8(raw)?)
    }

    /// The `type` tag for logging, `-` when absent.
    pub fn kind_str(&self) -> &str {
        self.kind.as_ref().map_or("-", EnvelopeKind::as_str)
    }

    /// Replace the destination with the sender's identifier.
    pub fn readdressed(mut self, source: PeerId) -> Self {
        self.peer = Some(source);
        self
    }

    /// Serialize to a text frame.
    pub fn to_json(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("envelope is not a JSON object")]
    NotObject,
    #[error("invalid peer id: {0}")]
    InvalidDestination(Value),
}
