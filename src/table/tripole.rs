//! Tripole (three-point) records measured against system ground

use super::{AuxChannels, SampleKey};
use crate::electrode::{canonical_pair, Electrode};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use num_complex::Complex64;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

/// One tripole sample: current injected through `a`/`b`, potential
/// measured at `p` relative to system ground.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TripoleRecord {
    /// Current electrode as recorded
    pub a: Electrode,
    /// Current electrode as recorded
    pub b: Electrode,
    /// Potential electrode
    pub p: Electrode,
    /// Sample timestamp
    pub datetime: DateTime<Utc>,
    /// Excitation frequency (Hz)
    pub frequency: f64,
    /// Transfer impedance at `p` against ground
    pub zt: Complex64,
    /// Auxiliary instrument channels
    pub aux: AuxChannels,
}

impl TripoleRecord {
    /// Canonical current pair `(A, B)` with `A <= B`
    #[must_use]
    pub fn current_pair(&self) -> (Electrode, Electrode) {
        canonical_pair(self.a, self.b)
    }

    pub(crate) fn sample_key(&self) -> SampleKey {
        SampleKey::new(self.datetime, self.frequency)
    }
}

type LookupKey = (Electrode, Electrode, Electrode);

/// Immutable tripole table with an `(A, B, P)` lookup index
#[derive(Debug, Clone, Default)]
pub struct TripoleTable {
    records: Vec<TripoleRecord>,
    index: FxHashMap<LookupKey, Vec<usize>>,
}

impl TripoleTable {
    /// Build a table from parsed records
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if two records share the same
    /// current pair, potential electrode, timestamp and frequency.
    pub fn new(records: Vec<TripoleRecord>) -> Result<Self> {
        let mut index: FxHashMap<LookupKey, Vec<usize>> = FxHashMap::default();
        let mut seen = FxHashSet::default();

        for (row, record) in records.iter().enumerate() {
            let (a, b) = record.current_pair();
            if !seen.insert((a, b, record.p, record.sample_key())) {
                return Err(Error::InvalidInput(format!(
                    "duplicate tripole sample for A={a} B={b} P={} at {} / {} Hz",
                    record.p, record.datetime, record.frequency
                )));
            }
            index.entry((a, b, record.p)).or_default().push(row);
        }

        Ok(Self { records, index })
    }

    /// All records in input order
    #[must_use]
    pub fn records(&self) -> &[TripoleRecord] {
        &self.records
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the table holds no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records for a current pair (either order) and potential electrode,
    /// in input order
    pub fn select(
        &self,
        a: Electrode,
        b: Electrode,
        p: Electrode,
    ) -> impl Iterator<Item = &TripoleRecord> + '_ {
        let (a, b) = canonical_pair(a, b);
        self.index
            .get(&(a, b, p))
            .map_or(&[][..], Vec::as_slice)
            .iter()
            .map(move |&row| &self.records[row])
    }
}
