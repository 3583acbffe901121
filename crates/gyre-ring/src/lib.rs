//! Consistent hashing ring for routing keys to storage shards.
//!
//! Maps logical keys (counters, cache entries) onto a dynamic set of
//! backing nodes so that the same key always resolves to the same node
//! while membership is unchanged, and a membership change moves only
//! about `1/(N±1)` of keys instead of reshuffling everything.
//!
//! Each node occupies a configurable number of virtual points placed by
//! hashing `"{node}-{i}"`; a key resolves to the first point clockwise
//! from its own hash. Build a [`Ring`] once from the current node set,
//! share it immutably with readers, and swap in a rebuilt clone when
//! membership changes.
//!
//! ```
//! use gyre_ring::Ring;
//! use gyre_types::NodeId;
//!
//! let ring = Ring::with_defaults([NodeId::from("shard-a"), NodeId::from("shard-b")])?;
//! let owner = ring.resolve("user:42")?;
//! assert_eq!(owner, ring.resolve("user:42")?);
//! # Ok::<(), gyre_ring::RingError>(())
//! ```

mod error;
mod hash;
mod rebalance;
mod ring;

pub use error::RingError;
pub use hash::{Blake3Hasher, RingHasher};
pub use rebalance::{KeyMove, RebalanceReport, compare};
pub use ring::Ring;
