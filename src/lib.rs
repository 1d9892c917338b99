//! # eit-quadpole: Four-Point Impedance from Tripole EIT Data
//!
//! Multi-channel EIT systems measure every potential electrode against a
//! common system ground (tripole, "3P" or MNU0 data). Inversion codes need
//! classical four-point transfer impedances instead. This crate
//!
//! 1. constructs quadrupoles by superposition of tripole records
//!    ([`quadpole`]),
//! 2. applies pseudo-2D correction factors per electrode configuration
//!    ([`correction`]),
//! 3. normalizes signs so geometric factors become positive ([`sign`]).
//!
//! ## Design Principles
//!
//! - **Tolerated gaps**: configurations without tripole data are skipped
//!   and counted, never raised
//! - **Stop on bad calibration**: a configuration without correction factor
//!   aborts the run with the offending electrodes
//! - **Fresh tables**: every stage returns a new table; failed stages leave
//!   their input untouched
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use eit_quadpole::configs::Configurations;
//! use eit_quadpole::correction::{apply_correction_factors, CorrectionTable};
//! use eit_quadpole::quadpole::compute_quadrupoles;
//! use eit_quadpole::storage::load_tripoles;
//!
//! let tripoles = load_tripoles("data/eit_data_mnu0.parquet")?;
//! let configs = Configurations::from_file("data/configs.dat")?;
//!
//! let report = compute_quadrupoles(&tripoles, &configs)?;
//! println!("{} rows, {} configurations skipped", report.table.len(), report.skipped_count());
//!
//! let corrections = CorrectionTable::from_file("data/corr_factors.dat")?;
//! let corrected = apply_correction_factors(&report.table, &corrections)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod configs;
pub mod correction;
pub mod electrode;
pub mod error;
pub mod importer;
pub mod logging;
pub mod pipeline;
pub mod quadpole;
pub mod settings;
pub mod sign;
pub mod storage;
pub mod table;
mod text;

pub use error::{Error, Result};
