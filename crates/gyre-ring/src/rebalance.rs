//! Before/after ownership analysis for topology changes.
//!
//! Builds no rings itself: callers hand in two snapshots (typically one
//! node apart) and a key sample, and get back which keys changed owner.
//! This is a diagnostic surface for validating how disruptive a
//! membership change will be, never part of the serving path.

use gyre_types::{NodeId, RingPosition};
use serde::Serialize;

use crate::error::RingError;
use crate::hash::RingHasher;
use crate::ring::Ring;

/// A key whose owning node differs between two ring snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct KeyMove {
    /// The key that changed owner.
    pub key: String,
    /// Owner in the first snapshot.
    pub from: NodeId,
    /// Position of the owning point in the first snapshot.
    pub from_position: RingPosition,
    /// Owner in the second snapshot.
    pub to: NodeId,
    /// Position of the owning point in the second snapshot.
    pub to_position: RingPosition,
}

/// Outcome of resolving a key sample against two ring snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct RebalanceReport {
    /// Number of keys resolved.
    pub total: usize,
    /// Keys whose owner changed, in sample order.
    pub moves: Vec<KeyMove>,
}

impl RebalanceReport {
    /// Number of keys that changed owner.
    pub fn moved(&self) -> usize {
        self.moves.len()
    }

    /// Fraction of the sample that changed owner; 0.0 for an empty sample.
    pub fn moved_fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.moves.len() as f64 / self.total as f64
        }
    }
}

/// Resolve `keys` against both snapshots and report ownership changes.
///
/// When the snapshots differ by one node, consistent hashing bounds the
/// expected moved fraction to roughly `1/(N±1)`; a report showing a full
/// reshuffle means the snapshots do not share a hash space.
///
/// Fails with [`RingError::EmptyRing`] if either snapshot has no points
/// and the sample is non-empty.
pub fn compare<H, I, S>(
    before: &Ring<H>,
    after: &Ring<H>,
    keys: I,
) -> Result<RebalanceReport, RingError>
where
    H: RingHasher,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut total = 0;
    let mut moves = Vec::new();

    for key in keys {
        let key = key.as_ref();
        total += 1;
        let (from_position, from) = before.resolve_with_position(key)?;
        let (to_position, to) = after.resolve_with_position(key)?;
        if from != to {
            moves.push(KeyMove {
                key: key.to_string(),
                from: from.clone(),
                from_position,
                to: to.clone(),
                to_position,
            });
        }
    }

    Ok(RebalanceReport { total, moves })
}
