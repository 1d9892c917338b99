//! Correction factors for pseudo-2D measurement setups
//!
//! Measurements in a rhizotron or tank deviate from the idealized 2D
//! geometry; each electrode configuration gets a multiplicative factor that
//! is applied to all calibration-sensitive columns (see Weigand and Kemna,
//! 2017, Biogeosciences).
//!
//! ## File Encodings
//!
//! ```text
//! explicit (5 columns):  A  B  M  N  factor
//! packed   (3 columns):  AB MN factor      with AB = A * 10000 + B
//! ```
//!
//! Both encodings decode to the same canonical [`CorrectionEntry`]; the
//! rest of this module does not know which one a factor came from.
//!
//! Missing factors are fatal: a configuration that silently kept its raw
//! magnitude would corrupt the data set without notice.

use crate::electrode::Quadruple;
use crate::table::{Column, QuadrupoleTable};
use crate::text::{parse_numeric, read_numeric_file, to_electrode, NumericRows};
use crate::{Error, Result};
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::path::Path;

/// Multiplier separating the two electrodes of a packed pair
pub const PAIR_PACKING: u32 = 10_000;

/// Columns scaled by the correction factor
const SCALED_COLUMNS: [Column; 3] = [Column::R, Column::Vmn, Column::RhoA];

/// Correction factor for one canonical electrode configuration
///
/// Deserialized entries are canonicalized like [`CorrectionEntry::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "EntryFields")]
pub struct CorrectionEntry {
    quadruple: Quadruple,
    factor: f64,
}

#[derive(Deserialize)]
struct EntryFields {
    quadruple: Quadruple,
    factor: f64,
}

impl From<EntryFields> for CorrectionEntry {
    fn from(fields: EntryFields) -> Self {
        Self::new(fields.quadruple, fields.factor)
    }
}

impl CorrectionEntry {
    /// Create an entry; the electrode pairs are canonicalized
    #[must_use]
    pub fn new(quadruple: Quadruple, factor: f64) -> Self {
        Self {
            quadruple: quadruple.canonical(),
            factor,
        }
    }

    /// Canonical configuration (`A <= B`, `M <= N`)
    #[must_use]
    pub const fn quadruple(&self) -> Quadruple {
        self.quadruple
    }

    /// Multiplicative factor
    #[must_use]
    pub const fn factor(&self) -> f64 {
        self.factor
    }
}

/// On-disk layout of a correction source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionEncoding {
    /// Legacy layout: two packed electrode pairs and the factor
    Packed,
    /// `A B M N factor`
    Explicit,
}

impl CorrectionEncoding {
    /// Detect the encoding from the column count
    #[must_use]
    pub const fn from_columns(columns: usize) -> Option<Self> {
        match columns {
            3 => Some(Self::Packed),
            5 => Some(Self::Explicit),
            _ => None,
        }
    }

    fn decode(self, values: &[f64], source_name: &str, line_no: usize) -> Result<CorrectionEntry> {
        let electrode = |value| to_electrode(value, source_name, line_no);
        let quadruple = match self {
            Self::Packed => {
                let (a, b) = unpack_pair(electrode(values[0])?);
                let (m, n) = unpack_pair(electrode(values[1])?);
                Quadruple::new(a, b, m, n)
            }
            Self::Explicit => Quadruple::new(
                electrode(values[0])?,
                electrode(values[1])?,
                electrode(values[2])?,
                electrode(values[3])?,
            ),
        };
        let factor = values[values.len() - 1];
        Ok(CorrectionEntry::new(quadruple, factor))
    }
}

/// Split a packed pair `high * 10000 + low` into `(high, low)`
#[must_use]
pub const fn unpack_pair(packed: u32) -> (u32, u32) {
    (packed / PAIR_PACKING, packed % PAIR_PACKING)
}

/// Normalized correction table, concatenated from one or more sources
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrectionTable {
    entries: Vec<CorrectionEntry>,
}

impl CorrectionTable {
    /// Create from already decoded entries
    #[must_use]
    pub fn from_entries(entries: Vec<CorrectionEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|e| CorrectionEntry::new(e.quadruple, e.factor))
                .collect(),
        }
    }

    /// Load a single correction file
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedCorrectionFile`] if the file does not have
    /// 3 or 5 columns, or an IO/parse error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_files(&[path])
    }

    /// Load and concatenate several correction files
    ///
    /// Every source is validated before any entry is returned; each source
    /// may use either encoding.
    ///
    /// # Errors
    ///
    /// Same as [`CorrectionTable::from_file`], for the first bad source.
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut entries = Vec::new();
        for path in paths {
            let path = path.as_ref();
            let parsed = read_numeric_file(path)?;
            entries.extend(decode_source(&parsed, &path.display().to_string())?);
        }
        tracing::debug!(sources = paths.len(), entries = entries.len(), "loaded correction factors");
        Ok(Self { entries })
    }

    /// Parse correction data from text in either file encoding
    ///
    /// # Errors
    ///
    /// Same as [`CorrectionTable::from_file`], without the IO part.
    pub fn parse_str(text: &str) -> Result<Self> {
        let parsed = parse_numeric(text, "<memory>")?;
        Ok(Self {
            entries: decode_source(&parsed, "<memory>")?,
        })
    }

    /// Decode in-memory numeric rows (all rows 3 or all rows 5 wide)
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedCorrectionFile`] for any other width.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let columns = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|row| row.len() != columns) {
            return Err(Error::MalformedCorrectionFile {
                source_name: "<memory>".to_string(),
                columns: bad.len(),
            });
        }
        let parsed = NumericRows {
            rows: rows.iter().cloned().enumerate().map(|(i, r)| (i + 1, r)).collect(),
            columns,
        };
        Ok(Self {
            entries: decode_source(&parsed, "<memory>")?,
        })
    }

    /// Normalized entries in source order
    #[must_use]
    pub fn entries(&self) -> &[CorrectionEntry] {
        &self.entries
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Factor for a configuration in any electrode order
    ///
    /// # Errors
    ///
    /// Returns [`Error::AmbiguousCalibration`] if the table holds conflicting
    /// factors for the configuration.
    pub fn factor_for(&self, quadruple: Quadruple) -> Result<Option<f64>> {
        Ok(self.lookup()?.get(&quadruple.canonical()).copied())
    }

    /// Canonical configuration → factor map
    ///
    /// Repeated entries with the same factor (overlapping files) collapse.
    fn lookup(&self) -> Result<FxHashMap<Quadruple, f64>> {
        let mut lookup = FxHashMap::default();
        for entry in &self.entries {
            match lookup.entry(entry.quadruple) {
                Entry::Vacant(slot) => {
                    slot.insert(entry.factor);
                }
                Entry::Occupied(slot) => {
                    let first: f64 = *slot.get();
                    if first.to_bits() != entry.factor.to_bits() {
                        return Err(Error::AmbiguousCalibration {
                            quadruple: entry.quadruple.to_string(),
                            first,
                            second: entry.factor,
                        });
                    }
                }
            }
        }
        Ok(lookup)
    }
}

fn decode_source(parsed: &NumericRows, source_name: &str) -> Result<Vec<CorrectionEntry>> {
    let encoding = CorrectionEncoding::from_columns(parsed.columns).ok_or_else(|| {
        Error::MalformedCorrectionFile {
            source_name: source_name.to_string(),
            columns: parsed.columns,
        }
    })?;

    parsed
        .rows
        .iter()
        .map(|(line_no, values)| encoding.decode(values, source_name, *line_no))
        .collect()
}

/// Calibrated table together with the correction table that was used
#[derive(Debug, Clone)]
pub struct Corrected {
    /// Table with `r`, `Zt`, `Vmn`, `rho_a` scaled and `corr_fac` set
    pub table: QuadrupoleTable,
    /// Normalized correction entries
    pub corrections: CorrectionTable,
}

/// Apply correction factors to a quadrupole table
///
/// Rows are grouped by their stored `(a, b, m, n)`; each group is matched
/// against the canonical correction entries. Every present column among
/// `r`, `Zt`, `Vmn` and `rho_a` is multiplied by the factor and the factor
/// is recorded in `corr_fac`. The input table is never modified.
///
/// # Errors
///
/// - [`Error::MissingColumn`] if the table has no `frequency` column
/// - [`Error::UnmatchedCalibration`] for the first configuration (in
///   electrode order) without a factor
/// - [`Error::AmbiguousCalibration`] if the corrections conflict
pub fn apply_correction_factors(
    table: &QuadrupoleTable,
    corrections: &CorrectionTable,
) -> Result<Corrected> {
    table.require(Column::Frequency)?;
    let lookup = corrections.lookup()?;

    let mut groups: FxHashMap<Quadruple, Vec<usize>> = FxHashMap::default();
    for row in 0..table.len() {
        groups.entry(table.quadruple(row)).or_default().push(row);
    }
    let mut groups: Vec<(Quadruple, Vec<usize>)> = groups.into_iter().collect();
    groups.sort_unstable_by_key(|(key, _)| *key);

    let resolve = |(key, _): &(Quadruple, Vec<usize>)| -> Result<f64> {
        lookup
            .get(&key.canonical())
            .copied()
            .ok_or_else(|| Error::UnmatchedCalibration {
                a: key.a,
                b: key.b,
                m: key.m,
                n: key.n,
            })
    };
    #[cfg(feature = "rayon")]
    let resolved: Vec<Result<f64>> = groups.par_iter().map(resolve).collect();
    #[cfg(not(feature = "rayon"))]
    let resolved: Vec<Result<f64>> = groups.iter().map(resolve).collect();
    // first failure in electrode order, independent of scheduling
    let group_factors = resolved.into_iter().collect::<Result<Vec<f64>>>()?;

    let mut factors = vec![1.0; table.len()];
    for ((_, rows), factor) in groups.iter().zip(group_factors) {
        for &row in rows {
            factors[row] = factor;
        }
    }

    let mut corrected = table.clone();
    for column in SCALED_COLUMNS {
        if let Some(values) = corrected.slot_mut(column) {
            scale(values, &factors);
        }
    }
    if let Some(zt) = corrected.zt.as_mut() {
        for (z, factor) in zt.iter_mut().zip(&factors) {
            *z *= *factor;
        }
    }
    corrected.corr_fac = Some(factors);

    tracing::info!(
        rows = corrected.len(),
        configurations = groups.len(),
        "applied correction factors"
    );

    Ok(Corrected {
        table: corrected,
        corrections: corrections.clone(),
    })
}

/// Load correction files and apply them
///
/// # Errors
///
/// See [`CorrectionTable::from_files`] and [`apply_correction_factors`].
pub fn apply_correction_files<P: AsRef<Path>>(
    table: &QuadrupoleTable,
    sources: &[P],
) -> Result<Corrected> {
    table.require(Column::Frequency)?;
    let corrections = CorrectionTable::from_files(sources)?;
    apply_correction_factors(table, &corrections)
}

fn scale(values: &mut [f64], factors: &[f64]) {
    for (value, factor) in values.iter_mut().zip(factors) {
        *value *= factor;
    }
}
