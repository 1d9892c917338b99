//! Electrode identifiers and pair canonicalization
//!
//! Current and potential pairs are unordered physically: `(1, 2)` and
//! `(2, 1)` inject current through the same electrodes. Lookups therefore
//! go through a canonical `(min, max)` form.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Electrode identifier (1-based as numbered on the instrument)
pub type Electrode = u32;

/// Sort an unordered electrode pair into `(min, max)`
#[must_use]
pub fn canonical_pair(first: Electrode, second: Electrode) -> (Electrode, Electrode) {
    if first <= second {
        (first, second)
    } else {
        (second, first)
    }
}

/// Four-electrode tuple in ABMN convention
///
/// The stored order is kept as given; use [`Quadruple::canonical`] for
/// order-independent comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quadruple {
    /// Current electrode A
    pub a: Electrode,
    /// Current electrode B
    pub b: Electrode,
    /// Potential electrode M
    pub m: Electrode,
    /// Potential electrode N
    pub n: Electrode,
}

impl Quadruple {
    /// Create a quadruple from electrodes in ABMN order
    #[must_use]
    pub const fn new(a: Electrode, b: Electrode, m: Electrode, n: Electrode) -> Self {
        Self { a, b, m, n }
    }

    /// Sort the current pair and the potential pair independently
    #[must_use]
    pub fn canonical(self) -> Self {
        let (a, b) = canonical_pair(self.a, self.b);
        let (m, n) = canonical_pair(self.m, self.n);
        Self { a, b, m, n }
    }

    /// Whether both pairs are already in `(min, max)` order
    #[must_use]
    pub const fn is_canonical(&self) -> bool {
        self.a <= self.b && self.m <= self.n
    }
}

impl From<[Electrode; 4]> for Quadruple {
    fn from([a, b, m, n]: [Electrode; 4]) -> Self {
        Self::new(a, b, m, n)
    }
}

impl fmt::Display for Quadruple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} {}-{}", self.a, self.b, self.m, self.n)
    }
}
