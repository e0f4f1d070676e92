#![forbid(unsafe_code)]
//! Interval Tree Clocks: causality tracking for peer groups that grow and
//! shrink without coordination.
//!
//! An Interval Tree Clock subsumes vector clocks and version vectors while
//! letting identities be split, handed to new peers, and recombined when
//! peers retire. Each participant holds a [`Stamp`] pairing an identity tree
//! (which slice of the unit interval the peer owns) with an event tree (the
//! causal history it has witnessed). The four verbs are:
//!
//! - [`Stamp::fork`] — split one stamp into two with disjoint identities,
//! - [`Stamp::event`] — record a new happening,
//! - [`Stamp::join`] — merge two stamps back into one,
//! - [`Stamp::peek`] — derive an observation-only copy for the wire.
//!
//! Causal verdicts come from [`Stamp::compare`]:
//!
//! ```
//! use treeclock_core::{CausalOrder, Stamp};
//!
//! # fn main() -> Result<(), treeclock_core::Error> {
//! let (mut a, mut b) = Stamp::seed().fork();
//! a.event()?;
//! assert_eq!(a.compare(&b)?, CausalOrder::Greater);
//! b.event()?;
//! assert_eq!(a.compare(&b)?, CausalOrder::Concurrent);
//!
//! let mut merged = Stamp::join(&a, &b)?;
//! assert!(a.leq(&merged)?);
//! merged.event()?;
//! assert_eq!(merged.compare(&a)?, CausalOrder::Greater);
//! # Ok(())
//! # }
//! ```
//!
//! Stamps travel as bytes via [`Stamp::to_bytes`] / [`Stamp::from_bytes`]
//! (see [`codec`] for the wire layout) or as prefixed hex via [`text`].
//! The wire format carries no integrity checksum; callers moving stamps over
//! unreliable channels must wrap it with their own check.
//!
//! Event counters are 32-bit by default; the `wide-counters` feature widens
//! them to 64 bits. All counter arithmetic is checked and surfaces
//! [`Error::CounterOverflow`] / [`Error::CounterUnderflow`] instead of
//! wrapping, leaving the operands untouched.

pub mod codec;
pub mod error;
pub mod event;
pub mod id;
pub mod stamp;
pub mod text;

pub use codec::CodecError;
pub use error::Error;
pub use event::{Counter, Event};
pub use id::Id;
pub use stamp::{CausalOrder, Stamp};
