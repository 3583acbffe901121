//! Ring topology and clockwise key lookup.

use std::collections::BTreeMap;

use gyre_types::{DEFAULT_REPLICAS, NodeId, RingPosition};
use tracing::debug;

use crate::error::RingError;
use crate::hash::{Blake3Hasher, RingHasher, vnode_label};

/// Consistent hash ring mapping keys to node identifiers.
///
/// Each node occupies `replicas` virtual points at positions
/// `hash("{node}-{i}")`; a key is owned by the first point at or after
/// the key's own hash, wrapping to the smallest position past the top of
/// the space. Two virtual points can collide on one position, in which
/// case the later-inserted node owns it (and [`Ring::remove_node`]
/// restores the earlier point on removal).
///
/// Treat a ring as immutable once published: lookups are pure reads, and
/// a topology change should build a modified clone that readers switch
/// to atomically rather than mutating a ring lookups are using.
#[derive(Debug, Clone)]
pub struct Ring<H = Blake3Hasher> {
    /// Virtual points, position to owning node, ascending.
    points: BTreeMap<RingPosition, NodeId>,
    /// Member nodes in insertion order; order decides collision winners.
    nodes: Vec<NodeId>,
    /// Virtual points per node.
    replicas: u32,
    hasher: H,
}

impl Ring<Blake3Hasher> {
    /// Build a ring with [`DEFAULT_REPLICAS`] virtual points per node.
    pub fn with_defaults<I>(nodes: I) -> Result<Self, RingError>
    where
        I: IntoIterator<Item = NodeId>,
    {
        Self::build(nodes, DEFAULT_REPLICAS)
    }

    /// Build a ring from `nodes` with `replicas` virtual points each.
    ///
    /// Fails with [`RingError::InvalidConfiguration`] when `replicas` is
    /// zero. An empty node set is accepted and yields an empty ring;
    /// lookups against it fail with [`RingError::EmptyRing`].
    pub fn build<I>(nodes: I, replicas: u32) -> Result<Self, RingError>
    where
        I: IntoIterator<Item = NodeId>,
    {
        Self::with_hasher(nodes, replicas, Blake3Hasher)
    }
}

impl<H: RingHasher> Ring<H> {
    /// Build a ring with an explicit hash strategy.
    pub fn with_hasher<I>(nodes: I, replicas: u32, hasher: H) -> Result<Self, RingError>
    where
        I: IntoIterator<Item = NodeId>,
    {
        if replicas == 0 {
            return Err(RingError::InvalidConfiguration(replicas));
        }
        let mut ring = Self {
            points: BTreeMap::new(),
            nodes: Vec::new(),
            replicas,
            hasher,
        };
        for node in nodes {
            ring.add_node(node);
        }
        Ok(ring)
    }

    /// Add a node, placing its `replicas` virtual points.
    ///
    /// Re-adding a present node recomputes the same positions with the
    /// same owner, a no-op in effect. A point that collides with an
    /// existing node's point overwrites it.
    pub fn add_node(&mut self, node: NodeId) {
        for i in 0..self.replicas {
            let pos = self.hasher.position(&vnode_label(&node, i));
            self.points.insert(pos, node.clone());
        }
        debug!(%node, replicas = self.replicas, "added node to ring");
        if !self.nodes.contains(&node) {
            self.nodes.push(node);
        }
    }

    /// Remove a node, deleting the virtual points it owns.
    ///
    /// Positions are recomputed from the node's labels, never found by
    /// scanning values. A surviving node's point that the removed node
    /// had overwritten is re-placed, so the resulting ring matches one
    /// this node never joined and keys owned by other nodes stay put.
    ///
    /// Removing an absent node is a no-op. Removing from a ring with
    /// zero points fails with [`RingError::EmptyRing`].
    pub fn remove_node(&mut self, node: &NodeId) -> Result<(), RingError> {
        if self.points.is_empty() {
            return Err(RingError::EmptyRing);
        }
        let Some(idx) = self.nodes.iter().position(|n| n == node) else {
            return Ok(());
        };
        self.nodes.remove(idx);

        let mut vacated = Vec::new();
        for i in 0..self.replicas {
            let pos = self.hasher.position(&vnode_label(node, i));
            // A later-added node may already own this position; its
            // point stays.
            if self.points.get(&pos).is_some_and(|owner| owner == node) {
                self.points.remove(&pos);
                vacated.push(pos);
            }
        }

        // The removed node may have been covering a survivor's point at
        // the same position. Re-place survivors in insertion order so
        // later members still win the collision.
        if !vacated.is_empty() {
            for survivor in &self.nodes {
                for i in 0..self.replicas {
                    let pos = self.hasher.position(&vnode_label(survivor, i));
                    if vacated.contains(&pos) {
                        self.points.insert(pos, survivor.clone());
                    }
                }
            }
        }

        debug!(%node, "removed node from ring");
        Ok(())
    }

    /// Resolve `key` to its owning node.
    pub fn resolve(&self, key: &str) -> Result<&NodeId, RingError> {
        self.resolve_with_position(key).map(|(_, node)| node)
    }

    /// Resolve `key` to its owning virtual point and node.
    ///
    /// The position identifies which arc of the ring captured the key,
    /// which is useful when analyzing distribution.
    pub fn resolve_with_position(
        &self,
        key: &str,
    ) -> Result<(RingPosition, &NodeId), RingError> {
        let hash = self.hasher.position(key);
        // First point clockwise from the key's hash; wrap to the start
        // of the map when the key hashes past every point.
        match self
            .points
            .range(hash..)
            .next()
            .or_else(|| self.points.iter().next())
        {
            Some((pos, node)) => Ok((*pos, node)),
            None => Err(RingError::EmptyRing),
        }
    }

    /// Number of virtual points on the ring.
    ///
    /// At most `replicas × |nodes|`; fewer when points collided.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the ring has no virtual points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Virtual points per node.
    pub fn replicas(&self) -> u32 {
        self.replicas
    }

    /// Member nodes in insertion order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Virtual points in ascending position order.
    pub fn points(&self) -> impl Iterator<Item = (RingPosition, &NodeId)> {
        self.points.iter().map(|(pos, node)| (*pos, node))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn node(name: &str) -> NodeId {
        NodeId::from(name)
    }

    /// Hasher with a fixed position table, for pinning ring layouts.
    struct TableHasher(HashMap<String, u32>);

    impl TableHasher {
        fn new(entries: &[(&str, u32)]) -> Self {
            Self(
                entries
                    .iter()
                    .map(|(input, pos)| (input.to_string(), *pos))
                    .collect(),
            )
        }
    }

    impl RingHasher for TableHasher {
        fn position(&self, input: &str) -> RingPosition {
            let raw = self
                .0
                .get(input)
                .unwrap_or_else(|| panic!("no table entry for {input:?}"));
            RingPosition::from_hash(*raw)
        }
    }

    #[test]
    fn zero_replicas_is_invalid() {
        let err = Ring::build([node("shard-a")], 0).unwrap_err();
        assert!(matches!(err, RingError::InvalidConfiguration(0)));
    }

    #[test]
    fn empty_ring_fails_lookup() {
        let ring = Ring::build([], 100).unwrap();
        assert!(ring.is_empty());
        assert!(matches!(ring.resolve("user:0"), Err(RingError::EmptyRing)));
    }

    #[test]
    fn remove_from_empty_ring_fails() {
        let mut ring = Ring::build([], 100).unwrap();
        let err = ring.remove_node(&node("shard-a")).unwrap_err();
        assert!(matches!(err, RingError::EmptyRing));
    }

    #[test]
    fn resolve_is_deterministic() {
        let ring = Ring::with_defaults([node("shard-a"), node("shard-b")]).unwrap();
        let rebuilt = Ring::with_defaults([node("shard-a"), node("shard-b")]).unwrap();
        for i in 0..100 {
            let key = format!("user:{i}");
            assert_eq!(ring.resolve(&key).unwrap(), ring.resolve(&key).unwrap());
            assert_eq!(ring.resolve(&key).unwrap(), rebuilt.resolve(&key).unwrap());
        }
    }

    #[test]
    fn every_node_owns_points() {
        let ring = Ring::with_defaults([node("a"), node("b"), node("c")]).unwrap();
        assert!(ring.len() <= 300);
        for member in ring.nodes() {
            let owned = ring.points().filter(|&(_, owner)| owner == member).count();
            assert!(owned > 0, "{member} owns no points");
        }
    }

    #[test]
    fn wraparound_returns_minimum_position() {
        let hasher = TableHasher::new(&[("x-0", 100), ("y-0", 200), ("past-the-end", 5000)]);
        let ring = Ring::with_hasher([node("x"), node("y")], 1, hasher).unwrap();
        let (pos, owner) = ring.resolve_with_position("past-the-end").unwrap();
        assert_eq!(pos, RingPosition::from_hash(100));
        assert_eq!(owner, &node("x"));
    }

    #[test]
    fn key_lands_on_clockwise_successor() {
        let hasher = TableHasher::new(&[("x-0", 100), ("y-0", 200), ("mid", 150), ("exact", 200)]);
        let ring = Ring::with_hasher([node("x"), node("y")], 1, hasher).unwrap();
        assert_eq!(ring.resolve("mid").unwrap(), &node("y"));
        // A key hashing exactly onto a point belongs to that point.
        assert_eq!(ring.resolve("exact").unwrap(), &node("y"));
    }

    #[test]
    fn collision_last_writer_wins() {
        let hasher = TableHasher::new(&[("x-0", 42), ("y-0", 42), ("k", 0)]);
        let ring = Ring::with_hasher([node("x"), node("y")], 1, hasher).unwrap();
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.resolve("k").unwrap(), &node("y"));
    }

    #[test]
    fn removal_restores_shadowed_point() {
        let hasher = TableHasher::new(&[("x-0", 42), ("y-0", 42), ("k", 0)]);
        let mut ring = Ring::with_hasher([node("x"), node("y")], 1, hasher).unwrap();
        ring.remove_node(&node("y")).unwrap();
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.resolve("k").unwrap(), &node("x"));
    }

    #[test]
    fn removal_leaves_later_colliding_point_alone() {
        // y overwrote x's only point; removing x must not delete it.
        let hasher = TableHasher::new(&[("x-0", 42), ("y-0", 42), ("k", 0)]);
        let mut ring = Ring::with_hasher([node("x"), node("y")], 1, hasher).unwrap();
        ring.remove_node(&node("x")).unwrap();
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.resolve("k").unwrap(), &node("y"));
    }

    #[test]
    fn readd_is_idempotent() {
        let mut ring = Ring::with_defaults([node("shard-a"), node("shard-b")]).unwrap();
        let before: Vec<_> = (0..100)
            .map(|i| ring.resolve(&format!("user:{i}")).unwrap().clone())
            .collect();
        let len = ring.len();

        ring.add_node(node("shard-a"));

        assert_eq!(ring.len(), len);
        assert_eq!(ring.nodes().len(), 2);
        for (i, owner) in before.iter().enumerate() {
            assert_eq!(ring.resolve(&format!("user:{i}")).unwrap(), owner);
        }
    }

    #[test]
    fn remove_absent_node_is_noop() {
        let mut ring = Ring::with_defaults([node("shard-a"), node("shard-b")]).unwrap();
        let len = ring.len();
        ring.remove_node(&node("shard-z")).unwrap();
        assert_eq!(ring.len(), len);
        assert_eq!(ring.nodes().len(), 2);
    }

    #[test]
    fn add_only_reassigns_to_new_node() {
        let before = Ring::with_defaults([node("shard-a"), node("shard-b")]).unwrap();
        let mut after = before.clone();
        after.add_node(node("shard-c"));

        for i in 0..1000 {
            let key = format!("user:{i}");
            let old = before.resolve(&key).unwrap();
            let new = after.resolve(&key).unwrap();
            assert!(
                new == old || new == &node("shard-c"),
                "{key} moved from {old} to {new}, not to the added node"
            );
        }
    }

    #[test]
    fn add_then_remove_restores_ownership() {
        let original = Ring::with_defaults([node("shard-a"), node("shard-b")]).unwrap();
        let mut ring = original.clone();
        ring.add_node(node("shard-c"));
        ring.remove_node(&node("shard-c")).unwrap();

        assert_eq!(ring.len(), original.len());
        for i in 0..1000 {
            let key = format!("user:{i}");
            assert_eq!(ring.resolve(&key).unwrap(), original.resolve(&key).unwrap());
        }
    }

    #[test]
    fn removal_only_moves_keys_off_removed_node() {
        let before = Ring::with_defaults([node("a"), node("b"), node("c")]).unwrap();
        let mut after = before.clone();
        after.remove_node(&node("b")).unwrap();

        for i in 0..1000 {
            let key = format!("user:{i}");
            let old = before.resolve(&key).unwrap();
            if old != &node("b") {
                assert_eq!(after.resolve(&key).unwrap(), old, "{key} moved off {old}");
            } else {
                assert_ne!(after.resolve(&key).unwrap(), &node("b"));
            }
        }
    }

    #[test]
    fn load_spreads_near_uniformly() {
        let ring = Ring::with_defaults([node("a"), node("b"), node("c")]).unwrap();
        let mut counts: HashMap<NodeId, usize> = HashMap::new();
        let mut rng = StdRng::seed_from_u64(7);
        let total = 30_000;

        for _ in 0..total {
            let key = format!("key:{}", rng.random_range(0..u64::MAX));
            *counts.entry(ring.resolve(&key).unwrap().clone()).or_default() += 1;
        }

        for member in ring.nodes() {
            let share = counts[member] as f64 / total as f64;
            assert!(
                (0.2..=0.5).contains(&share),
                "{member} owns {share:.3} of keys, expected near 1/3"
            );
        }
    }
}
