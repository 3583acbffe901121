//! Error types for ring construction and lookup.

/// Errors produced by ring construction and lookup.
///
/// Both variants are local precondition violations, not transient
/// failures. Callers should fail fast or fall back to an explicit
/// default rather than retry.
#[derive(Debug, thiserror::Error)]
pub enum RingError {
    /// The replica count was zero, which would leave every node without
    /// a single point on the ring.
    #[error("invalid replica count {0}: each node needs at least one virtual point")]
    InvalidConfiguration(u32),

    /// A lookup or removal ran against a ring with no virtual points.
    #[error("hash ring is empty")]
    EmptyRing,
}
