//! Hashing of node labels and lookup keys onto the ring.

use gyre_types::{NodeId, RingPosition};

/// Maps strings onto the ring's position space.
///
/// Implementations must be deterministic across calls and across process
/// restarts (no randomized seed) and well-distributed over the 31-bit
/// space so virtual points spread evenly. Cryptographic strength is not
/// required; the hash is an interchangeable mixing strategy.
pub trait RingHasher {
    /// Hash `input` to a position on the ring.
    fn position(&self, input: &str) -> RingPosition;
}

/// Default hasher: BLAKE3 digest truncated to 31 bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Hasher;

impl RingHasher for Blake3Hasher {
    fn position(&self, input: &str) -> RingPosition {
        let digest = blake3::hash(input.as_bytes());
        let bytes: [u8; 4] = digest.as_bytes()[..4].try_into().expect("4 bytes");
        RingPosition::from_hash(u32::from_le_bytes(bytes))
    }
}

/// Label hashed to place virtual point `index` of `node`.
///
/// Placement labels and raw lookup keys go through the same hasher, so
/// both land in one shared position space.
pub(crate) fn vnode_label(node: &NodeId, index: u32) -> String {
    format!("{node}-{index}")
}
