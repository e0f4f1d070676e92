//! Event trees: the causal-history half of a stamp.
//!
//! An [`Event`] is a binary tree of monotone counters. A node's counter
//! contributes additively to every leaf below it, so the logical time at any
//! position is the sum of counters along the root-to-leaf path. Normal form
//! keeps the representation minimal: every branch has a zero-minimum child
//! and no branch holds two equal leaf children.
//!
//! The interesting operations are [`Event::join`] (pointwise maximum),
//! [`Event::leq`] (causal dominance, a single fused traversal), and the two
//! inflation strategies used when a stamp records a happening:
//! [`Event::fill`] simplifies the tree on intervals the identity owns, and
//! [`Event::grow`] performs a minimum-cost structural inflation when no
//! simplification is possible.
//!
//! Counters never wrap: every arithmetic step is checked and failures leave
//! the operand trees untouched.

use crate::error::Error;
use crate::id::Id;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The event counter type: 32-bit by default, 64-bit under `wide-counters`.
#[cfg(not(feature = "wide-counters"))]
pub type Counter = u32;
/// The event counter type: 32-bit by default, 64-bit under `wide-counters`.
#[cfg(feature = "wide-counters")]
pub type Counter = u64;

fn add(a: Counter, b: Counter) -> Result<Counter, Error> {
    a.checked_add(b).ok_or(Error::CounterOverflow)
}

fn sub(a: Counter, b: Counter) -> Result<Counter, Error> {
    a.checked_sub(b).ok_or(Error::CounterUnderflow)
}

/// An event tree, tracking causal history as a binary tree of counters.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Event {
    /// Leaf with a counter value.
    Leaf(Counter),
    /// Branch with a base counter shared by both subtrees.
    Branch(Counter, Box<Self>, Box<Self>),
}

/// Price of one [`Event::grow`] inflation, ordered lexicographically.
///
/// Node expansions are counted before per-level increments, so turning a
/// leaf into a branch is always more expensive than bumping a counter at
/// any depth — the property the fill-then-grow strategy relies on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cost {
    expansions: u32,
    steps: u32,
}

impl Cost {
    /// The free inflation: incrementing a fully-owned leaf.
    pub const ZERO: Self = Self {
        expansions: 0,
        steps: 0,
    };

    const fn expanded(self) -> Self {
        Self {
            expansions: self.expansions.saturating_add(1),
            steps: self.steps,
        }
    }

    const fn deeper(self) -> Self {
        Self {
            expansions: self.expansions,
            steps: self.steps.saturating_add(1),
        }
    }
}

impl Event {
    /// The empty history: a leaf with counter 0.
    #[must_use]
    pub const fn zero() -> Self {
        Self::Leaf(0)
    }

    /// Create a leaf with the given counter.
    #[must_use]
    pub const fn leaf(value: Counter) -> Self {
        Self::Leaf(value)
    }

    /// Create a branch. No normalisation is applied; pair with
    /// [`Event::normalize`] when building trees by hand.
    #[must_use]
    pub fn branch(base: Counter, left: Self, right: Self) -> Self {
        Self::Branch(base, Box::new(left), Box::new(right))
    }

    /// Returns `true` if this is a leaf node.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// The counter at this node: the leaf value or the branch base.
    #[must_use]
    pub const fn value(&self) -> Counter {
        match self {
            Self::Leaf(n) | Self::Branch(n, _, _) => *n,
        }
    }

    /// The minimum root-to-leaf path sum in this subtree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CounterOverflow`] if a path sum exceeds the counter
    /// range.
    pub fn min_value(&self) -> Result<Counter, Error> {
        match self {
            Self::Leaf(n) => Ok(*n),
            Self::Branch(n, l, r) => add(*n, l.min_value()?.min(r.min_value()?)),
        }
    }

    /// The maximum root-to-leaf path sum in this subtree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CounterOverflow`] if a path sum exceeds the counter
    /// range.
    pub fn max_value(&self) -> Result<Counter, Error> {
        match self {
            Self::Leaf(n) => Ok(*n),
            Self::Branch(n, l, r) => add(*n, l.max_value()?.max(r.max_value()?)),
        }
    }

    /// Depth of the tree (0 for leaves).
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Leaf(_) => 0,
            Self::Branch(_, l, r) => 1 + l.depth().max(r.depth()),
        }
    }

    /// Number of nodes in the tree (leaves + branches).
    #[must_use]
    pub fn node_count(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Branch(_, l, r) => 1 + l.node_count() + r.node_count(),
        }
    }

    /// Add `delta` to the root counter, shape unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CounterOverflow`] when the counter would wrap.
    pub fn lift(self, delta: Counter) -> Result<Self, Error> {
        match self {
            Self::Leaf(n) => Ok(Self::Leaf(add(n, delta)?)),
            Self::Branch(n, l, r) => Ok(Self::Branch(add(n, delta)?, l, r)),
        }
    }

    /// Subtract `delta` from the root counter, shape unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CounterUnderflow`] when the counter would drop
    /// below zero.
    pub fn sink(self, delta: Counter) -> Result<Self, Error> {
        match self {
            Self::Leaf(n) => Ok(Self::Leaf(sub(n, delta)?)),
            Self::Branch(n, l, r) => Ok(Self::Branch(sub(n, delta)?, l, r)),
        }
    }

    /// Rewrite the tree to normal form, bottom-up: a branch over two equal
    /// leaves collapses to a lifted leaf, and the common child minimum is
    /// lifted into the parent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CounterOverflow`] when lifting the common minimum
    /// would wrap a counter.
    pub fn normalize(self) -> Result<Self, Error> {
        match self {
            Self::Leaf(_) => Ok(self),
            Self::Branch(n, l, r) => {
                let l = l.normalize()?;
                let r = r.normalize()?;
                if let (Self::Leaf(a), Self::Leaf(b)) = (&l, &r) {
                    if a == b {
                        return Ok(Self::Leaf(add(n, *a)?));
                    }
                }
                // Normalised children carry their minimum at the root.
                let m = l.value().min(r.value());
                Ok(Self::Branch(
                    add(n, m)?,
                    Box::new(l.sink(m)?),
                    Box::new(r.sink(m)?),
                ))
            }
        }
    }

    /// Collapse the history to a single leaf holding the maximum path sum.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CounterOverflow`] if the maximum path sum exceeds
    /// the counter range.
    pub fn maximise(&self) -> Result<Self, Error> {
        Ok(Self::leaf(self.max_value()?))
    }

    /// Check the normal-form invariant, failing with
    /// [`Error::CorruptEvent`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptEvent`] if some branch lacks a zero-minimum
    /// child or holds two equal leaf children.
    pub fn validate(&self) -> Result<(), Error> {
        if self.is_normal() {
            Ok(())
        } else {
            Err(Error::CorruptEvent)
        }
    }

    fn is_normal(&self) -> bool {
        match self {
            Self::Leaf(_) => true,
            Self::Branch(_, l, r) => {
                if let (Self::Leaf(a), Self::Leaf(b)) = (l.as_ref(), r.as_ref()) {
                    if a == b {
                        return false;
                    }
                }
                l.value().min(r.value()) == 0 && l.is_normal() && r.is_normal()
            }
        }
    }

    /// Pointwise maximum of two histories.
    ///
    /// A leaf facing a branch is promoted to `(n, 0, 0)`; two branches are
    /// aligned by lifting the higher base's children by the base difference.
    /// The result is normalised.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CounterOverflow`] when aligning the trees would
    /// wrap a counter.
    pub fn join(a: &Self, b: &Self) -> Result<Self, Error> {
        match (a, b) {
            (Self::Leaf(na), Self::Leaf(nb)) => Ok(Self::leaf((*na).max(*nb))),
            (Self::Leaf(na), Self::Branch(..)) => {
                Self::join(&Self::branch(*na, Self::zero(), Self::zero()), b)
            }
            (Self::Branch(..), Self::Leaf(nb)) => {
                Self::join(a, &Self::branch(*nb, Self::zero(), Self::zero()))
            }
            (Self::Branch(na, al, ar), Self::Branch(nb, bl, br)) => {
                if na > nb {
                    return Self::join(b, a);
                }
                let delta = nb - na;
                let left = Self::join(al, &(**bl).clone().lift(delta)?)?;
                let right = Self::join(ar, &(**br).clone().lift(delta)?)?;
                Self::branch(*na, left, right).normalize()
            }
        }
    }

    /// Causal dominance: `true` when every position in `self` counts no
    /// more events than the corresponding position in `other`.
    ///
    /// A single traversal carries the accumulated parent counters of both
    /// sides and exits at the first failed pointwise inequality.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CounterOverflow`] if an accumulated path sum
    /// exceeds the counter range.
    pub fn leq(&self, other: &Self) -> Result<bool, Error> {
        Self::leq_at(self, 0, other, 0)
    }

    fn leq_at(a: &Self, base_a: Counter, b: &Self, base_b: Counter) -> Result<bool, Error> {
        let va = add(base_a, a.value())?;
        let vb = add(base_b, b.value())?;
        match a {
            Self::Leaf(_) => Ok(va <= vb),
            Self::Branch(_, al, ar) => {
                if va > vb {
                    return Ok(false);
                }
                match b {
                    // Descending into a leaf keeps comparing against it.
                    Self::Leaf(_) => {
                        Ok(Self::leq_at(al, va, b, base_b)? && Self::leq_at(ar, va, b, base_b)?)
                    }
                    Self::Branch(_, bl, br) => {
                        Ok(Self::leq_at(al, va, bl, vb)? && Self::leq_at(ar, va, br, vb)?)
                    }
                }
            }
        }
    }

    /// Simplify the history on intervals owned by `id`.
    ///
    /// Subtrees facing an owned interval are collapsed toward their
    /// maximum; the result is normalised. When nothing simplifies the
    /// returned tree equals the input, which is how
    /// [`Stamp::event`](crate::Stamp::event) decides to fall back to
    /// [`Event::grow`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::CounterOverflow`] if collapsing a subtree would
    /// wrap a counter.
    pub fn fill(id: &Id, event: &Self) -> Result<Self, Error> {
        match (id, event) {
            (Id::Zero, _) | (_, Self::Leaf(_)) => Ok(event.clone()),
            (Id::One, _) => event.maximise(),
            (Id::Branch(il, ir), Self::Branch(n, el, er)) => {
                if il.is_one() {
                    let filled_r = Self::fill(ir, er)?;
                    let top = el.max_value()?.max(filled_r.min_value()?);
                    Self::branch(*n, Self::leaf(top), filled_r).normalize()
                } else if ir.is_one() {
                    let filled_l = Self::fill(il, el)?;
                    let top = er.max_value()?.max(filled_l.min_value()?);
                    Self::branch(*n, filled_l, Self::leaf(top)).normalize()
                } else {
                    Self::branch(*n, Self::fill(il, el)?, Self::fill(ir, er)?).normalize()
                }
            }
        }
    }

    /// Inflate the history by one event inside the interval owned by `id`,
    /// at minimum [`Cost`].
    ///
    /// Incrementing a fully-owned leaf is free; descending costs one step
    /// per level; expanding a leaf into a branch carries the dominant
    /// expansion cost. Equal-cost alternatives break toward the right
    /// subtree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CounterOverflow`] when the incremented counter
    /// would wrap, and [`Error::CorruptId`] if `id` owns nothing — callers
    /// guard that case before descending.
    pub fn grow(id: &Id, event: &Self) -> Result<(Self, Cost), Error> {
        match (id, event) {
            (Id::Zero, _) => Err(Error::CorruptId),
            (Id::One, Self::Leaf(n)) => Ok((Self::leaf(add(*n, 1)?), Cost::ZERO)),
            (_, Self::Leaf(n)) => {
                let expanded = Self::branch(*n, Self::zero(), Self::zero());
                let (grown, cost) = Self::grow(id, &expanded)?;
                Ok((grown, cost.expanded()))
            }
            (Id::One, Self::Branch(n, el, er)) => {
                // A fully-owned branch: both sides are growable.
                let (grown_l, cost_l) = Self::grow(&Id::One, el)?;
                let (grown_r, cost_r) = Self::grow(&Id::One, er)?;
                if cost_l < cost_r {
                    Ok((Self::branch(*n, grown_l, (**er).clone()), cost_l.deeper()))
                } else {
                    Ok((Self::branch(*n, (**el).clone(), grown_r), cost_r.deeper()))
                }
            }
            (Id::Branch(il, ir), Self::Branch(n, el, er)) => {
                if il.is_zero() {
                    let (grown_r, cost_r) = Self::grow(ir, er)?;
                    Ok((Self::branch(*n, (**el).clone(), grown_r), cost_r.deeper()))
                } else if ir.is_zero() {
                    let (grown_l, cost_l) = Self::grow(il, el)?;
                    Ok((Self::branch(*n, grown_l, (**er).clone()), cost_l.deeper()))
                } else {
                    let (grown_l, cost_l) = Self::grow(il, el)?;
                    let (grown_r, cost_r) = Self::grow(ir, er)?;
                    if cost_l < cost_r {
                        Ok((Self::branch(*n, grown_l, (**er).clone()), cost_l.deeper()))
                    } else {
                        Ok((Self::branch(*n, (**el).clone(), grown_r), cost_r.deeper()))
                    }
                }
            }
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf(n) => write!(f, "{n}"),
            Self::Branch(n, l, r) => write!(f, "({n}, {l:?}, {r:?})"),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
