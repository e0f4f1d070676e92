//! Stamps: the user-facing causality API.
//!
//! A [`Stamp`] pairs an identity tree with an event tree. The fork / event /
//! join verbs manipulate both halves; [`Stamp::compare`] reduces causality
//! questions to two [`Event::leq`] checks.
//!
//! A stamp is either *owned* (its identity covers part of the interval) or a
//! *peek* (anonymous identity, observation authority only). Forking a peek
//! yields peeks; recording an event on a peek is a permitted no-op.
//!
//! Mutating operations either complete or leave the stamp exactly as it was
//! before the call — errors never expose a half-updated stamp.

use crate::error::Error;
use crate::event::Event;
use crate::id::Id;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

/// Verdict of comparing two stamps' causal histories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CausalOrder {
    /// The histories are identical.
    Equal,
    /// The left stamp happened before the right.
    Less,
    /// The left stamp happened after the right.
    Greater,
    /// Each history holds events the other has not seen.
    Concurrent,
}

/// An Interval Tree Clock stamp: identity plus causal history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stamp {
    /// The interval partition owned by this stamp.
    pub id: Id,
    /// The causal history recorded by this stamp.
    pub event: Event,
}

impl Stamp {
    /// Create a stamp from its parts.
    #[must_use]
    pub const fn new(id: Id, event: Event) -> Self {
        Self { id, event }
    }

    /// The initial stamp: owns the full interval, no recorded events.
    #[must_use]
    pub const fn seed() -> Self {
        Self {
            id: Id::one(),
            event: Event::zero(),
        }
    }

    /// An anonymous stamp: owns nothing, no recorded events.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            id: Id::zero(),
            event: Event::zero(),
        }
    }

    /// Returns `true` if this stamp owns no interval (a peek stamp).
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.id.is_zero()
    }

    /// Derive an observation-only copy: anonymous identity, same history.
    ///
    /// Peek stamps travel with messages so receivers can compare causality
    /// without being granted any interval.
    #[must_use]
    pub fn peek(&self) -> Self {
        Self::new(Id::zero(), self.event.clone())
    }

    /// Split this stamp into two with disjoint identities sharing the same
    /// history.
    ///
    /// Forking a peek stamp yields two peek stamps.
    #[must_use]
    pub fn fork(&self) -> (Self, Self) {
        let (left, right) = self.id.split();
        (
            Self::new(left, self.event.clone()),
            Self::new(right, self.event.clone()),
        )
    }

    /// Record a new happening in this stamp's history.
    ///
    /// Tries [`Event::fill`] first — simplification is preferred — and only
    /// inflates via [`Event::grow`] when nothing simplified. On a peek
    /// stamp this is a successful no-op. On error the stamp is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CounterOverflow`] when the history cannot grow
    /// without wrapping a counter.
    pub fn event(&mut self) -> Result<(), Error> {
        if self.id.is_zero() {
            // Observation authority only; nothing to record against.
            return Ok(());
        }
        let filled = Event::fill(&self.id, &self.event)?;
        if filled == self.event {
            let (grown, cost) = Event::grow(&self.id, &self.event)?;
            trace!(?cost, "inflated event tree");
            self.event = grown.normalize()?;
        } else {
            trace!("simplified event tree instead of inflating");
            self.event = filled;
        }
        Ok(())
    }

    /// Merge two stamps: disjoint union of identities, pointwise maximum of
    /// histories.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OverlappingInterval`] when the identities
    /// intersect, or [`Error::CounterOverflow`] when aligning the histories
    /// would wrap a counter.
    pub fn join(a: &Self, b: &Self) -> Result<Self, Error> {
        let id = Id::sum(&a.id, &b.id)?;
        let event = Event::join(&a.event, &b.event)?;
        Ok(Self::new(id, event))
    }

    /// Causal dominance: `true` when everything this stamp has witnessed is
    /// also in `other`'s history.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CounterOverflow`] if an accumulated path sum
    /// exceeds the counter range.
    pub fn leq(&self, other: &Self) -> Result<bool, Error> {
        self.event.leq(&other.event)
    }

    /// Returns `true` when neither stamp causally dominates the other.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CounterOverflow`] if an accumulated path sum
    /// exceeds the counter range.
    pub fn concurrent(&self, other: &Self) -> Result<bool, Error> {
        Ok(!self.leq(other)? && !other.leq(self)?)
    }

    /// Compare two histories, yielding one of the four causal verdicts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CounterOverflow`] if an accumulated path sum
    /// exceeds the counter range.
    pub fn compare(&self, other: &Self) -> Result<CausalOrder, Error> {
        Ok(match (self.leq(other)?, other.leq(self)?) {
            (true, true) => CausalOrder::Equal,
            (true, false) => CausalOrder::Less,
            (false, true) => CausalOrder::Greater,
            (false, false) => CausalOrder::Concurrent,
        })
    }

    /// Rewrite both trees to normal form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CounterOverflow`] when event normalisation would
    /// wrap a counter.
    pub fn normalize(self) -> Result<Self, Error> {
        Ok(Self::new(self.id.normalize(), self.event.normalize()?))
    }

    /// Check both trees' normal-form invariants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptId`] or [`Error::CorruptEvent`] for the
    /// first tree that fails.
    pub fn validate(&self) -> Result<(), Error> {
        self.id.validate()?;
        self.event.validate()
    }

    /// Record an event, then emit `(message, updated)`: an anonymous stamp
    /// to put on the wire and the sender's advanced stamp.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CounterOverflow`] when the history cannot grow.
    pub fn send(&self) -> Result<(Self, Self), Error> {
        let mut updated = self.clone();
        updated.event()?;
        Ok((updated.peek(), updated))
    }

    /// Merge an incoming message into this stamp and record the reception.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OverlappingInterval`] or
    /// [`Error::CounterOverflow`] as for [`Stamp::join`] and
    /// [`Stamp::event`].
    pub fn receive(&self, message: &Self) -> Result<Self, Error> {
        let mut merged = Self::join(self, message)?;
        merged.event()?;
        Ok(merged)
    }

    /// Merge two stamps and fork the result, synchronising both peers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OverlappingInterval`] or
    /// [`Error::CounterOverflow`] as for [`Stamp::join`].
    pub fn sync(a: &Self, b: &Self) -> Result<(Self, Self), Error> {
        Ok(Self::join(a, b)?.fork())
    }
}

#[cfg(feature = "extended")]
impl Stamp {
    /// Disassemble the stamp into its identity and event trees.
    #[must_use]
    pub fn explode(self) -> (Id, Event) {
        (self.id, self.event)
    }

    /// Reassemble a stamp from trees taken apart by [`Stamp::explode`].
    #[must_use]
    pub const fn rebuild(id: Id, event: Event) -> Self {
        Self::new(id, event)
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.id, self.event)
    }
}
