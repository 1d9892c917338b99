//! Importer selection by data file version
//!
//! Instrument post-processing software has produced several slightly
//! different file layouts over the years, with version tags that follow no
//! consistent scheme. Each layout gets its own [`TripoleImporter`]; the
//! [`ImporterRegistry`] maps version tags to importers and is resolved once
//! at the boundary. Parsing the raw instrument files themselves lives
//! outside this crate; register an importer for each layout you need.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use eit_quadpole::configs::Configurations;
//! use eit_quadpole::importer::{ImporterRegistry, PARQUET_3P};
//!
//! # fn main() -> eit_quadpole::Result<()> {
//! let registry = ImporterRegistry::with_defaults();
//! let configs = Configurations::from_file("configs.dat")?;
//!
//! let data = registry.get_mnu0_data(PARQUET_3P, "eit_data_mnu0.parquet", &configs, false)?;
//! println!("{} quadrupoles", data.build.table.len());
//! # Ok(())
//! # }
//! ```

use crate::configs::Configurations;
use crate::quadpole::{compute_quadrupoles, BuildReport};
use crate::storage::StorageEngine;
use crate::table::TripoleTable;
use crate::{Error, Result};
use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashMap;
use std::path::Path;

/// Version tag of the built-in Parquet tripole importer
pub const PARQUET_3P: &str = "parquet-3p";

/// Data extracted from one raw data file
#[derive(Debug, Clone)]
pub struct RawImport {
    /// Tripole (MNU0) data measured against common ground
    pub tripoles: TripoleTable,
    /// Measurement diagnostics (MD), if the layout carries them
    pub md: Option<RecordBatch>,
}

/// Strategy for one data file layout
pub trait TripoleImporter: Send + Sync {
    /// Read a data file into tripole records
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or does not match the layout.
    fn import(&self, path: &Path) -> Result<RawImport>;
}

/// Imports tripole tables stored as Parquet in the crate's column layout
#[derive(Debug, Clone, Copy, Default)]
pub struct ParquetImporter;

impl TripoleImporter for ParquetImporter {
    fn import(&self, path: &Path) -> Result<RawImport> {
        let tripoles = StorageEngine::load_parquet(path)?.tripoles()?;
        Ok(RawImport { tripoles, md: None })
    }
}

/// Result of [`ImporterRegistry::get_mnu0_data`]
#[derive(Debug, Clone)]
pub struct Mnu0Data {
    /// Constructed four-point data and skipped configurations
    pub build: BuildReport,
    /// Measurement diagnostics, when the importer provides them
    pub md: Option<RecordBatch>,
    /// The imported tripole data, if requested
    pub tripoles: Option<TripoleTable>,
}

/// Explicit version tag → importer mapping
#[derive(Default)]
pub struct ImporterRegistry {
    importers: FxHashMap<String, Box<dyn TripoleImporter>>,
}

impl ImporterRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in importers
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(PARQUET_3P, ParquetImporter);
        registry
    }

    /// Register (or replace) the importer for a version tag
    pub fn register(&mut self, version: impl Into<String>, importer: impl TripoleImporter + 'static) {
        self.importers.insert(version.into(), Box::new(importer));
    }

    /// Registered version tags, sorted
    #[must_use]
    pub fn versions(&self) -> Vec<&str> {
        let mut versions: Vec<&str> = self.importers.keys().map(String::as_str).collect();
        versions.sort_unstable();
        versions
    }

    /// Importer for a version tag
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedVersion`] for unknown tags.
    pub fn resolve(&self, version: &str) -> Result<&dyn TripoleImporter> {
        self.importers
            .get(version)
            .map(|importer| &**importer)
            .ok_or_else(|| Error::UnsupportedVersion(version.to_string()))
    }

    /// Import tripole data and construct four-point measurements from it
    ///
    /// # Errors
    ///
    /// Returns error if the version is unknown or the import fails.
    pub fn get_mnu0_data<P: AsRef<Path>>(
        &self,
        version: &str,
        path: P,
        configs: &Configurations,
        return_3p: bool,
    ) -> Result<Mnu0Data> {
        let importer = self.resolve(version)?;
        let raw = importer.import(path.as_ref())?;
        tracing::info!(
            version,
            path = %path.as_ref().display(),
            tripoles = raw.tripoles.len(),
            "imported tripole data"
        );

        let build = compute_quadrupoles(&raw.tripoles, configs)?;
        Ok(Mnu0Data {
            build,
            md: raw.md,
            tripoles: return_3p.then_some(raw.tripoles),
        })
    }
}
