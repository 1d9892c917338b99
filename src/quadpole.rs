//! Four-point measurements by superposition of tripole data
//!
//! A tripole record holds the potential at one electrode `P` against system
//! ground. For a fixed current injection the transfer impedance between two
//! potential electrodes is the difference of their ground-referenced
//! impedances:
//!
//! ```text
//! Zt(A, B, M, N) = Zt(A, B, P=M) - Zt(A, B, P=N)
//! ```
//!
//! Configurations whose M or N electrode was not measured are skipped and
//! reported in [`BuildReport::skipped`]; they are never an error.

use crate::configs::Configurations;
use crate::electrode::Quadruple;
use crate::table::{
    phase_mrad, signed_magnitude, QuadrupoleRecord, QuadrupoleTable, SampleKey, TripoleRecord,
    TripoleTable,
};
use crate::Result;
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::path::Path;

/// Result of a four-point construction run
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Constructed quadrupoles (empty table if nothing was constructed)
    pub table: QuadrupoleTable,
    /// Configurations without tripole data for M or N, in input order
    pub skipped: Vec<Quadruple>,
    /// M-side samples without an N-side sample at the same time and frequency
    pub unpaired_samples: usize,
}

impl BuildReport {
    /// Number of skipped configurations
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

enum Outcome {
    Built {
        records: Vec<QuadrupoleRecord>,
        unpaired: usize,
    },
    Skipped(Quadruple),
}

/// Construct four-point measurements for every configuration
///
/// Output rows follow configuration order, then the sample order of the
/// M-side tripole rows.
///
/// # Errors
///
/// Returns [`crate::Error::InvalidInput`] from
/// [`QuadrupoleTable::from_records`] if the built rows disagree on which
/// columns they carry (`column 'x' is set on N of M rows`). Every row built
/// here sets `datetime`, `frequency`, `aux`, `Zt`, `r`, `Vmn` and `rpha`.
///
/// # Example
///
/// ```rust
/// use chrono::Utc;
/// use eit_quadpole::configs::Configurations;
/// use eit_quadpole::quadpole::compute_quadrupoles;
/// use eit_quadpole::table::{AuxChannels, TripoleRecord, TripoleTable};
/// use num_complex::Complex64;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let now = Utc::now();
/// let tripole = |p, zt| TripoleRecord {
///     a: 1, b: 2, p, datetime: now, frequency: 1.0, zt, aux: AuxChannels::default(),
/// };
/// let tripoles = TripoleTable::new(vec![
///     tripole(3, Complex64::new(2.0, 1.0)),
///     tripole(4, Complex64::new(1.0, 0.0)),
/// ])?;
///
/// let configs = Configurations::from(vec![[1, 2, 3, 4], [1, 2, 3, 9]]);
/// let report = compute_quadrupoles(&tripoles, &configs)?;
///
/// assert_eq!(report.table.len(), 1);
/// assert_eq!(report.skipped_count(), 1);
/// # Ok(())
/// # }
/// ```
pub fn compute_quadrupoles(
    tripoles: &TripoleTable,
    configs: &Configurations,
) -> Result<BuildReport> {
    tracing::info!(
        configurations = configs.len(),
        tripoles = tripoles.len(),
        "constructing four-point measurements"
    );

    #[cfg(feature = "rayon")]
    let outcomes: Vec<Outcome> = configs
        .as_slice()
        .par_iter()
        .map(|config| superpose(tripoles, *config))
        .collect();
    #[cfg(not(feature = "rayon"))]
    let outcomes: Vec<Outcome> = configs
        .iter()
        .map(|config| superpose(tripoles, *config))
        .collect();

    let mut records = Vec::new();
    let mut skipped = Vec::new();
    let mut unpaired_samples = 0;
    for outcome in outcomes {
        match outcome {
            Outcome::Built {
                records: built,
                unpaired,
            } => {
                records.extend(built);
                unpaired_samples += unpaired;
            }
            Outcome::Skipped(config) => {
                tracing::debug!(%config, "no tripole data for configuration, skipping");
                skipped.push(config);
            }
        }
    }

    let table = QuadrupoleTable::from_records(&records)?;
    tracing::info!(
        rows = table.len(),
        skipped = skipped.len(),
        unpaired_samples,
        "four-point construction finished"
    );

    Ok(BuildReport {
        table,
        skipped,
        unpaired_samples,
    })
}

/// Construct four-point measurements for a configuration file
///
/// # Errors
///
/// Returns error if the configuration file cannot be read or parsed.
pub fn compute_quadrupoles_from_file<P: AsRef<Path>>(
    tripoles: &TripoleTable,
    config_file: P,
) -> Result<BuildReport> {
    let configs = Configurations::from_file(config_file)?;
    compute_quadrupoles(tripoles, &configs)
}

fn superpose(tripoles: &TripoleTable, config: Quadruple) -> Outcome {
    let rows_m: Vec<&TripoleRecord> = tripoles.select(config.a, config.b, config.m).collect();
    let rows_n: FxHashMap<SampleKey, &TripoleRecord> = tripoles
        .select(config.a, config.b, config.n)
        .map(|row| (row.sample_key(), row))
        .collect();

    if rows_m.is_empty() || rows_n.is_empty() {
        return Outcome::Skipped(config);
    }

    let mut records = Vec::with_capacity(rows_m.len());
    let mut unpaired = 0;
    for row_m in rows_m {
        match rows_n.get(&row_m.sample_key()) {
            Some(row_n) => records.push(quadrupole_record(row_m, row_n)),
            None => unpaired += 1,
        }
    }

    Outcome::Built { records, unpaired }
}

fn quadrupole_record(row_m: &TripoleRecord, row_n: &TripoleRecord) -> QuadrupoleRecord {
    let zt = row_m.zt - row_n.zt;
    let r = signed_magnitude(zt);

    QuadrupoleRecord {
        a: row_m.a,
        b: row_m.b,
        m: row_m.p,
        n: row_n.p,
        datetime: Some(row_m.datetime),
        frequency: Some(row_m.frequency),
        aux: Some(row_m.aux),
        zt: Some(zt),
        r: Some(r),
        vmn: Some(r * row_m.aux.iab),
        rpha: Some(phase_mrad(zt)),
        k: None,
        rho_a: None,
        corr_fac: None,
    }
}
