//! Storage backend (Arrow/Parquet)
//!
//! Tables cross the crate boundary as Arrow record batches. External
//! importers hand over tripole data this way, and callers persist
//! quadrupole tables to Parquet without the core prescribing a format.
//!
//! ## Column Layout
//!
//! - electrodes (`a`, `b`, `p`, `m`, `n`): `UInt32`
//! - `datetime`: `Timestamp(Nanosecond, "UTC")`; timestamps outside
//!   1677..2262 cannot be stored
//! - complex channels (`Zt`, `Is`, `Il`, `Zg`, `Zg1`..`Zg3`): two `Float64`
//!   columns `<name>_re` and `<name>_im`
//! - real channels (`frequency`, `Iab`, `r`, `Vmn`, `rpha`, `K`, `rho_a`,
//!   `corr_fac`): `Float64`
//!
//! Optional quadrupole columns are simply left out of the batch.

mod convert;

pub use convert::tripoles_to_record_batch;

use crate::table::{QuadrupoleTable, TripoleTable};
use crate::{Error, Result};
use arrow::record_batch::RecordBatch;
use std::path::Path;

/// Storage engine for Arrow/Parquet data
pub struct StorageEngine {
    batches: Vec<RecordBatch>,
}

impl StorageEngine {
    /// Create a new storage engine from existing batches
    #[must_use]
    pub fn new(batches: Vec<RecordBatch>) -> Self {
        Self { batches }
    }

    /// Load every record batch of a Parquet file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load_parquet<P: AsRef<Path>>(path: P) -> Result<Self> {
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
        use std::fs::File;

        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            Error::StorageError(format!("Failed to open {}: {e}", path.display()))
        })?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .and_then(|builder| builder.build())
            .map_err(|e| Error::StorageError(format!("Failed to read {}: {e}", path.display())))?;

        let batches = reader
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::StorageError(format!("Failed to decode record batch: {e}")))?;
        tracing::debug!(path = %path.display(), batches = batches.len(), "loaded parquet file");

        Ok(Self { batches })
    }

    /// Write all batches to a Parquet file
    ///
    /// # Errors
    /// Returns error if the engine is empty or the file cannot be written
    pub fn write_parquet<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        use parquet::arrow::ArrowWriter;
        use std::fs::File;

        let schema = self
            .batches
            .first()
            .map(RecordBatch::schema)
            .ok_or_else(|| Error::StorageError("No batches to write".to_string()))?;

        let file = File::create(path.as_ref()).map_err(|e| {
            Error::StorageError(format!("Failed to create Parquet file: {e}"))
        })?;
        let mut writer = ArrowWriter::try_new(file, schema, None).map_err(|e| {
            Error::StorageError(format!("Failed to create Parquet writer: {e}"))
        })?;
        for batch in &self.batches {
            writer.write(batch).map_err(|e| {
                Error::StorageError(format!("Failed to write record batch: {e}"))
            })?;
        }
        writer
            .close()
            .map_err(|e| Error::StorageError(format!("Failed to finish Parquet file: {e}")))?;
        Ok(())
    }

    /// Get all record batches
    #[must_use]
    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    /// Append a batch
    ///
    /// # Errors
    ///
    /// Returns error if batch schema doesn't match existing batches
    pub fn append_batch(&mut self, batch: RecordBatch) -> Result<()> {
        if let Some(existing) = self.batches.first() {
            let existing_schema = existing.schema();
            if batch.schema() != existing_schema {
                return Err(Error::StorageError(format!(
                    "Schema mismatch: expected {:?}, got {:?}",
                    existing_schema,
                    batch.schema()
                )));
            }
        }

        self.batches.push(batch);
        Ok(())
    }

    /// Combine all batches into a single batch
    ///
    /// # Errors
    /// Returns error if the engine is empty or batches cannot be concatenated
    pub fn combined(&self) -> Result<RecordBatch> {
        match self.batches.as_slice() {
            [] => Err(Error::StorageError("No data in storage".to_string())),
            [single] => Ok(single.clone()),
            batches => arrow::compute::concat_batches(&batches[0].schema(), batches)
                .map_err(|e| Error::StorageError(format!("Failed to combine batches: {e}"))),
        }
    }

    /// Decode the stored batches as a tripole table
    ///
    /// # Errors
    /// Returns error if required tripole columns are missing or malformed
    pub fn tripoles(&self) -> Result<TripoleTable> {
        TripoleTable::try_from(&self.combined()?)
    }

    /// Decode the stored batches as a quadrupole table
    ///
    /// # Errors
    /// Returns error if electrode columns are missing or columns are malformed
    pub fn quadrupoles(&self) -> Result<QuadrupoleTable> {
        QuadrupoleTable::try_from(&self.combined()?)
    }
}

/// Write a quadrupole table to a Parquet file
///
/// # Errors
/// Returns error if the table cannot be converted or the file written
pub fn write_quadrupoles<P: AsRef<Path>>(table: &QuadrupoleTable, path: P) -> Result<()> {
    StorageEngine::new(vec![table.to_record_batch()?]).write_parquet(path)
}

/// Load a tripole table from a Parquet file
///
/// # Errors
/// Returns error if the file cannot be read or lacks tripole columns
pub fn load_tripoles<P: AsRef<Path>>(path: P) -> Result<TripoleTable> {
    StorageEngine::load_parquet(path)?.tripoles()
}
