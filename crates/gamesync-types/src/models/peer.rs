//! Peer identity and per-peer partial state.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Peer-specific key/value payload.
pub type Fields = BTreeMap<String, serde_json::Value>;

/// Identity of a connected peer, always in `[1, capacity]`.
///
/// Zero is never a valid identity; deserializing it fails. Both integers and
/// numeric strings are accepted, since snapshot slots are keyed by identity
/// and JSON object keys are always strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "u16")]
pub struct PeerId(u16);

impl PeerId {
    /// Lowest identity handed out.
    pub const FIRST: Self = Self(1);

    pub const fn new(raw: u16) -> Option<Self> {
        if raw == 0 {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub const fn get(self) -> u16 {
        self.0
    }

    /// All identities available under `capacity`, lowest first.
    pub fn all(capacity: u16) -> impl Iterator<Item = Self> {
        (1..=capacity).map(Self)
    }
}

impl TryFrom<u16> for PeerId {
    type Error = String;

    fn try_from(raw: u16) -> Result<Self, Self::Error> {
        Self::new(raw).ok_or_else(|| "peer identity must be at least 1".to_string())
    }
}

impl From<PeerId> for u16 {
    fn from(id: PeerId) -> Self {
        id.0
    }
}

#[derive(Clone, Copy)]
struct PeerIdVisitor;

impl Visitor<'_> for PeerIdVisitor {
    type Value = PeerId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a peer identity between 1 and 65535")
    }

    fn visit_u64<E: de::Error>(self, raw: u64) -> Result<PeerId, E> {
        u16::try_from(raw)
            .ok()
            .and_then(PeerId::new)
            .ok_or_else(|| E::invalid_value(de::Unexpected::Unsigned(raw), &self))
    }

    fn visit_i64<E: de::Error>(self, raw: i64) -> Result<PeerId, E> {
        u64::try_from(raw)
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(raw), &self))
            .and_then(|raw| self.visit_u64(raw))
    }

    fn visit_str<E: de::Error>(self, raw: &str) -> Result<PeerId, E> {
        raw.parse::<u64>()
            .map_err(|_| E::invalid_value(de::Unexpected::Str(raw), &self))
            .and_then(|raw| self.visit_u64(raw))
    }
}

impl<'de> Deserialize<'de> for PeerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PeerIdVisitor)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Partial state reported by one peer.
///
/// `identity` is informational on the wire: the server binds every update to
/// the identity of the connection it arrived on. Values that are not a valid
/// identity (0, negative, out of range, non-numeric) read as unset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PeerState {
    #[serde(default, deserialize_with = "lenient_identity", skip_serializing_if = "Option::is_none")]
    pub identity: Option<PeerId>,
    #[serde(default)]
    pub fields: Fields,
}

impl PeerState {
    pub fn new(fields: Fields) -> Self {
        Self { identity: None, fields }
    }

    /// Builder-style field insertion.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Stamp this update with the identity that owns it.
    pub fn bound_to(mut self, identity: PeerId) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn field(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }
}

fn lenient_identity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<PeerId>, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| PeerId::deserialize(value).ok()))
}
