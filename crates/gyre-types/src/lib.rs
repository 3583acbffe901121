//! Shared types for the gyre consistent-hash-ring workspace.
//!
//! Defines the opaque node identifier ([`NodeId`]), the 31-bit ring
//! position ([`RingPosition`]), and the default virtual-point count
//! ([`DEFAULT_REPLICAS`]).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default number of virtual points each node places on the ring.
///
/// One hundred points keeps per-node load close to even while the ring
/// stays small. A single point per node makes every membership change
/// highly disruptive; thousands of points grow memory and lookup cost
/// without materially improving balance.
pub const DEFAULT_REPLICAS: u32 = 100;

/// Opaque identifier for a backing storage node (shard).
///
/// The ring never interprets the content beyond hashing it. Callers
/// supply stable printable names (e.g. `"shard-a"`) and get the same
/// names back from lookups to select a backing connection.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create an identifier from any printable name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for NodeId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Position of a virtual point (or a hashed key) on the ring.
///
/// Positions are restricted to the non-negative 31-bit range by clearing
/// the top bit of the raw hash, so ordering never depends on sign no
/// matter how the value is later stored or compared.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RingPosition(u32);

impl RingPosition {
    /// Mask clearing the top bit of a raw 32-bit hash.
    pub const MASK: u32 = 0x7FFF_FFFF;

    /// Largest representable position.
    pub const MAX: Self = Self(Self::MASK);

    /// Fold a raw 32-bit hash into the ring's position space.
    pub fn from_hash(raw: u32) -> Self {
        Self(raw & Self::MASK)
    }

    /// The numeric position.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RingPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for RingPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RingPosition({})", self.0)
    }
}
