//! Error types for the stamp algebra.
//!
//! Every fallible operation validates its inputs before mutating anything;
//! when an error is returned the inputs are exactly as they were before the
//! call. Dropping a stamp never fails.

use crate::codec::CodecError;

/// Errors surfaced by identity, event, and stamp operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Two identity trees claim intersecting portions of the interval.
    ///
    /// Returned by [`Id::sum`](crate::Id::sum) and
    /// [`Stamp::join`](crate::Stamp::join) when the operands were not
    /// produced by complementary forks.
    #[error("identity trees own overlapping intervals")]
    OverlappingInterval,

    /// An event counter would exceed its maximum value.
    #[error("event counter overflow")]
    CounterOverflow,

    /// An event counter would drop below zero.
    #[error("event counter underflow")]
    CounterUnderflow,

    /// An identity tree does not satisfy its normal-form invariants.
    #[error("identity tree violates its normal-form invariants")]
    CorruptId,

    /// An event tree does not satisfy its normal-form invariants.
    #[error("event tree violates its normal-form invariants")]
    CorruptEvent,

    /// A serialised stamp could not be decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),
}
