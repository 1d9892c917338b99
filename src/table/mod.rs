//! Electrode-indexed measurement tables
//!
//! ## Table Overview
//!
//! ```text
//! TripoleTable (immutable input, one row per A-B / P / sample)
//!      │  superposition (crate::quadpole)
//!      ▼
//! QuadrupoleTable (columnar, optional columns)
//!      │  correction factors (crate::correction)
//!      │  sign normalization (crate::sign)
//!      ▼
//! QuadrupoleTable
//! ```
//!
//! Quadrupole columns behave like data-frame columns: a processing stage can
//! require a column (`frequency`, `K`, `r`) and fails with
//! [`crate::Error::MissingColumn`] when it is absent.

mod quadrupole;
mod tripole;

pub use quadrupole::{Column, QuadrupoleRecord, QuadrupoleTable};
pub use tripole::{TripoleRecord, TripoleTable};

use chrono::{DateTime, Utc};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Auxiliary instrument channels, carried through every stage unchanged
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AuxChannels {
    /// Current measured through the shunt (`Is`)
    pub is: Complex64,
    /// Leakage current (`Il`)
    pub il: Complex64,
    /// Grounding impedance (`Zg`)
    pub zg: Complex64,
    /// Grounding impedance, first channel (`Zg1`)
    pub zg1: Complex64,
    /// Grounding impedance, second channel (`Zg2`)
    pub zg2: Complex64,
    /// Grounding impedance, third channel (`Zg3`)
    pub zg3: Complex64,
    /// Injected current between A and B (`Iab`)
    pub iab: f64,
}

/// Identity of one instrument sample within a current injection
///
/// Frequencies are compared bitwise; both sides of a superposition come
/// from the same acquisition so values are bit-identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SampleKey {
    datetime: DateTime<Utc>,
    frequency_bits: u64,
}

impl SampleKey {
    pub(crate) fn new(datetime: DateTime<Utc>, frequency: f64) -> Self {
        Self {
            datetime,
            frequency_bits: frequency.to_bits(),
        }
    }
}

/// Signed magnitude: `sign(Re(z)) * |z|`, zero when the real part is zero
#[must_use]
pub fn signed_magnitude(z: Complex64) -> f64 {
    match z.re.partial_cmp(&0.0) {
        Some(Ordering::Greater) => z.norm(),
        Some(Ordering::Less) => -z.norm(),
        Some(Ordering::Equal) => 0.0,
        None => f64::NAN,
    }
}

/// Phase in milliradians: `atan2(Im(z), Re(z)) * 1000`
#[must_use]
pub fn phase_mrad(z: Complex64) -> f64 {
    z.im.atan2(z.re) * 1e3
}
