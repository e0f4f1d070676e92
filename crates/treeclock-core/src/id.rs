//! Identity trees: the ownership half of a stamp.
//!
//! An [`Id`] encodes which subset of the unit interval \[0, 1) a peer owns.
//! Leaves are either `0` (not owned) or `1` (owned); a branch splits its
//! interval into left = \[0, ½) and right = \[½, 1) halves, recursively.
//!
//! [`Id::split`] partitions an identity into two disjoint halves (fork) and
//! [`Id::sum`] reunites disjoint identities (join). Both keep trees in
//! normal form: no subtree is ever `(0, 0)` or `(1, 1)`.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An identity tree, partitioning \[0, 1) among participants.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Id {
    /// Leaf 0 — this portion of the interval is not owned.
    Zero,
    /// Leaf 1 — this portion of the interval is owned.
    One,
    /// Branch splitting the interval into left and right halves.
    Branch(Box<Self>, Box<Self>),
}

impl Id {
    /// The anonymous (unowned) identity: leaf 0.
    #[must_use]
    pub const fn zero() -> Self {
        Self::Zero
    }

    /// The seed (fully-owned) identity: leaf 1.
    #[must_use]
    pub const fn one() -> Self {
        Self::One
    }

    /// Create a branch, collapsing the degenerate `(0, 0)` and `(1, 1)`
    /// shapes to the corresponding leaf.
    #[must_use]
    pub fn branch(left: Self, right: Self) -> Self {
        match (&left, &right) {
            (Self::Zero, Self::Zero) => Self::Zero,
            (Self::One, Self::One) => Self::One,
            _ => Self::Branch(Box::new(left), Box::new(right)),
        }
    }

    /// Returns `true` if this identity owns no interval.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::Zero
    }

    /// Returns `true` if this identity owns the entire interval.
    #[must_use]
    pub fn is_one(&self) -> bool {
        *self == Self::One
    }

    /// Returns `true` if this is a leaf node (0 or 1).
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self, Self::Zero | Self::One)
    }

    /// Depth of the tree (0 for leaves).
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Zero | Self::One => 0,
            Self::Branch(l, r) => 1 + l.depth().max(r.depth()),
        }
    }

    /// Number of nodes in the tree (leaves + branches).
    #[must_use]
    pub fn node_count(&self) -> usize {
        match self {
            Self::Zero | Self::One => 1,
            Self::Branch(l, r) => 1 + l.node_count() + r.node_count(),
        }
    }

    /// Rewrite the tree to normal form: `(0, 0) → 0` and `(1, 1) → 1`,
    /// post-order, until a fixed point. Already-normal trees come back
    /// unchanged.
    #[must_use]
    pub fn normalize(self) -> Self {
        match self {
            Self::Zero | Self::One => self,
            Self::Branch(l, r) => Self::branch(l.normalize(), r.normalize()),
        }
    }

    /// Check the normal-form invariant, failing with [`Error::CorruptId`].
    ///
    /// The basic shape invariant (a branch has two children) is carried by
    /// the type itself; only the `(0, 0)` / `(1, 1)` collapse rule needs a
    /// runtime check.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptId`] if any subtree is `(0, 0)` or `(1, 1)`.
    pub fn validate(&self) -> Result<(), Error> {
        if self.is_normal() {
            Ok(())
        } else {
            Err(Error::CorruptId)
        }
    }

    fn is_normal(&self) -> bool {
        match self {
            Self::Zero | Self::One => true,
            Self::Branch(l, r) => {
                !matches!(
                    (l.as_ref(), r.as_ref()),
                    (Self::Zero, Self::Zero) | (Self::One, Self::One)
                ) && l.is_normal()
                    && r.is_normal()
            }
        }
    }

    /// Partition this identity into two disjoint halves whose sum re-forms
    /// the original.
    ///
    /// Splitting the anonymous identity yields two anonymous identities, so
    /// forking a peek stamp produces peek stamps.
    #[must_use]
    pub fn split(&self) -> (Self, Self) {
        match self {
            Self::Zero => (Self::zero(), Self::zero()),
            Self::One => (
                Self::branch(Self::one(), Self::zero()),
                Self::branch(Self::zero(), Self::one()),
            ),
            Self::Branch(l, r) if l.is_zero() => {
                let (rl, rr) = r.split();
                (
                    Self::branch(Self::zero(), rl),
                    Self::branch(Self::zero(), rr),
                )
            }
            Self::Branch(l, r) if r.is_zero() => {
                let (ll, lr) = l.split();
                (
                    Self::branch(ll, Self::zero()),
                    Self::branch(lr, Self::zero()),
                )
            }
            Self::Branch(l, r) => (
                Self::branch((**l).clone(), Self::zero()),
                Self::branch(Self::zero(), (**r).clone()),
            ),
        }
    }

    /// Reunite two disjoint identities into one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OverlappingInterval`] when the operands claim
    /// intersecting portions of the interval — any pairing other than
    /// zero-with-anything or branch-with-branch.
    pub fn sum(a: &Self, b: &Self) -> Result<Self, Error> {
        match (a, b) {
            (Self::Zero, _) => Ok(b.clone()),
            (_, Self::Zero) => Ok(a.clone()),
            (Self::Branch(al, ar), Self::Branch(bl, br)) => {
                Ok(Self::branch(Self::sum(al, bl)?, Self::sum(ar, br)?))
            }
            _ => Err(Error::OverlappingInterval),
        }
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zero => write!(f, "0"),
            Self::One => write!(f, "1"),
            Self::Branch(l, r) => write!(f, "({l:?}, {r:?})"),
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
