//! Processing pipeline
//!
//! ```text
//! TripoleTable ──> compute_quadrupoles ──> [geometric factors]
//!                                               │
//!                   [apply_correction_factors] <┘
//!                               │
//!                        [fix_sign_with_k] ──> PipelineOutput
//! ```
//!
//! Bracketed stages run only when the settings (or the caller) ask for
//! them. Any fatal error aborts the run without partial output. When no
//! configuration has tripole data the empty table is returned as is.

use crate::configs::Configurations;
use crate::correction::{apply_correction_factors, CorrectionTable};
use crate::electrode::Quadruple;
use crate::quadpole::compute_quadrupoles;
use crate::settings::ProcessingSettings;
use crate::sign::fix_sign_with_k;
use crate::table::{QuadrupoleTable, TripoleTable};
use crate::Result;

/// Source of geometric factors, one per quadrupole row
///
/// Geometric factors depend on electrode positions and are computed
/// outside this crate; implement this trait (or pass a closure) to attach
/// them during a pipeline run.
pub trait GeometricFactors {
    /// Geometric factor for every row of `table`, in row order
    ///
    /// # Errors
    ///
    /// Implementations report missing electrode positions and the like.
    fn geometric_factors(&self, table: &QuadrupoleTable) -> Result<Vec<f64>>;
}

impl<F> GeometricFactors for F
where
    F: Fn(&QuadrupoleTable) -> Result<Vec<f64>>,
{
    fn geometric_factors(&self, table: &QuadrupoleTable) -> Result<Vec<f64>> {
        self(table)
    }
}

/// Everything a pipeline run produced
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Final quadrupole table
    pub table: QuadrupoleTable,
    /// Configurations skipped for lack of tripole data
    pub skipped: Vec<Quadruple>,
    /// Correction table used, if calibration ran
    pub corrections: Option<CorrectionTable>,
    /// Rows flipped by sign normalization (0 if it did not run)
    pub flipped: usize,
    /// Degenerate `a == b` rows left unchanged by sign normalization
    pub degenerate: usize,
}

/// Runs the processing stages described by [`ProcessingSettings`]
#[derive(Debug, Clone)]
pub struct Pipeline {
    settings: ProcessingSettings,
}

impl Pipeline {
    /// Create a pipeline
    #[must_use]
    pub const fn new(settings: ProcessingSettings) -> Self {
        Self { settings }
    }

    /// Settings of this pipeline
    #[must_use]
    pub const fn settings(&self) -> &ProcessingSettings {
        &self.settings
    }

    /// Install the logging subscriber described by the settings
    ///
    /// Returns `false` if a subscriber was already installed.
    pub fn init_logging(&self) -> bool {
        crate::logging::init_logging(&self.settings.logging)
    }

    /// Run all configured stages on a tripole table
    ///
    /// # Errors
    ///
    /// - configuration or correction files cannot be read
    /// - calibration fails (missing `frequency`, unmatched configuration)
    /// - sign normalization is requested but no geometric factors were given
    pub fn run(
        &self,
        tripoles: &TripoleTable,
        geometric_factors: Option<&dyn GeometricFactors>,
    ) -> Result<PipelineOutput> {
        let configs = Configurations::from_file(&self.settings.configs)?;
        // validate correction files before the expensive part
        let corrections = if self.settings.corrections.is_empty() {
            None
        } else {
            Some(CorrectionTable::from_files(&self.settings.corrections)?)
        };

        let build = compute_quadrupoles(tripoles, &configs)?;
        if build.table.is_empty() {
            tracing::warn!(
                skipped = build.skipped.len(),
                "no configuration has tripole data, later stages skipped"
            );
            return Ok(PipelineOutput {
                table: build.table,
                skipped: build.skipped,
                corrections,
                flipped: 0,
                degenerate: 0,
            });
        }
        let mut table = build.table;

        if let Some(provider) = geometric_factors {
            let k = provider.geometric_factors(&table)?;
            table = table.with_geometric_factors(k)?;
        }

        if let Some(corrections) = &corrections {
            table = apply_correction_factors(&table, corrections)?.table;
        }

        let (mut flipped, mut degenerate) = (0, 0);
        if self.settings.fix_sign {
            let fixed = fix_sign_with_k(&table)?;
            table = fixed.table;
            flipped = fixed.flipped;
            degenerate = fixed.degenerate;
        }

        tracing::info!(
            rows = table.len(),
            skipped = build.skipped.len(),
            calibrated = corrections.is_some(),
            flipped,
            "processing finished"
        );

        Ok(PipelineOutput {
            table,
            skipped: build.skipped,
            corrections,
            flipped,
            degenerate,
        })
    }
}
