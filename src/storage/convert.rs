//! Table <-> Arrow record batch conversion

use crate::electrode::Electrode;
use crate::table::{AuxChannels, Column, QuadrupoleTable, TripoleRecord, TripoleTable};
use crate::{Error, Result};
use arrow::array::{Array, ArrayRef, Float64Array, TimestampNanosecondArray, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use num_complex::Complex64;
use std::sync::Arc;

const COMPLEX_AUX: [&str; 6] = ["Is", "Il", "Zg", "Zg1", "Zg2", "Zg3"];
const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a tripole table to a record batch
///
/// # Errors
/// Returns error if Arrow rejects the assembled columns
pub fn tripoles_to_record_batch(table: &TripoleTable) -> Result<RecordBatch> {
    let records = table.records();
    let mut builder = BatchBuilder::default();
    builder.datetime(records.iter().map(|r| r.datetime))?;
    builder.real("frequency", records.iter().map(|r| r.frequency).collect());
    builder.electrodes("a", records.iter().map(|r| r.a).collect());
    builder.electrodes("b", records.iter().map(|r| r.b).collect());
    builder.electrodes("p", records.iter().map(|r| r.p).collect());
    builder.complex("Zt", records.iter().map(|r| r.zt));
    builder.aux(records.iter().map(|r| r.aux));
    builder.finish()
}

impl TryFrom<&RecordBatch> for TripoleTable {
    type Error = Error;

    fn try_from(batch: &RecordBatch) -> Result<Self> {
        let reader = BatchReader { batch };
        let required = |column: Option<Vec<f64>>, name: &str| {
            column.ok_or_else(|| Error::StorageError(format!("Missing tripole column '{name}'")))
        };

        let datetime = reader
            .datetime()?
            .ok_or_else(|| Error::StorageError("Missing tripole column 'datetime'".to_string()))?;
        let frequency = required(reader.real("frequency")?, "frequency")?;
        let a = reader.electrodes("a")?;
        let b = reader.electrodes("b")?;
        let p = reader.electrodes("p")?;
        let zt = reader
            .complex("Zt")?
            .ok_or_else(|| Error::StorageError("Missing tripole column 'Zt'".to_string()))?;
        let aux = reader
            .aux()?
            .ok_or_else(|| Error::StorageError("Missing tripole auxiliary channels".to_string()))?;

        let records = (0..batch.num_rows())
            .map(|row| TripoleRecord {
                a: a[row],
                b: b[row],
                p: p[row],
                datetime: datetime[row],
                frequency: frequency[row],
                zt: zt[row],
                aux: aux[row],
            })
            .collect();
        Self::new(records)
    }
}

impl QuadrupoleTable {
    /// Convert to a record batch; absent columns are left out
    ///
    /// # Errors
    /// Returns error if Arrow rejects the assembled columns
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let mut builder = BatchBuilder::default();
        if let Some(datetime) = self.datetime() {
            builder.datetime(datetime.iter().copied())?;
        }
        builder.electrodes("a", self.a.clone());
        builder.electrodes("b", self.b.clone());
        builder.electrodes("m", self.m.clone());
        builder.electrodes("n", self.n.clone());
        if let Some(aux) = self.aux() {
            builder.aux(aux.iter().copied());
        }
        if let Some(zt) = self.zt() {
            builder.complex("Zt", zt.iter().copied());
        }
        for column in Column::ALL {
            if let Some(values) = self.column(column) {
                builder.real(column.name(), values.to_vec());
            }
        }
        builder.finish()
    }
}

impl TryFrom<&RecordBatch> for QuadrupoleTable {
    type Error = Error;

    fn try_from(batch: &RecordBatch) -> Result<Self> {
        let reader = BatchReader { batch };
        let mut table = Self {
            a: reader.electrodes("a")?,
            b: reader.electrodes("b")?,
            m: reader.electrodes("m")?,
            n: reader.electrodes("n")?,
            datetime: reader.datetime()?,
            aux: reader.aux()?,
            zt: reader.complex("Zt")?,
            ..Self::default()
        };
        for column in Column::ALL {
            *table.slot_mut(column) = reader.real(column.name())?;
        }
        Ok(table)
    }
}

#[derive(Default)]
struct BatchBuilder {
    fields: Vec<Field>,
    columns: Vec<ArrayRef>,
}

impl BatchBuilder {
    fn push(&mut self, field: Field, column: ArrayRef) {
        self.fields.push(field);
        self.columns.push(column);
    }

    fn electrodes(&mut self, name: &str, values: Vec<Electrode>) {
        self.push(
            Field::new(name, DataType::UInt32, false),
            Arc::new(UInt32Array::from(values)),
        );
    }

    fn real(&mut self, name: &str, values: Vec<f64>) {
        self.push(
            Field::new(name, DataType::Float64, false),
            Arc::new(Float64Array::from(values)),
        );
    }

    fn complex(&mut self, name: &str, values: impl Iterator<Item = Complex64>) {
        let (re, im): (Vec<f64>, Vec<f64>) = values.map(|z| (z.re, z.im)).unzip();
        self.real(&format!("{name}_re"), re);
        self.real(&format!("{name}_im"), im);
    }

    fn datetime(&mut self, values: impl Iterator<Item = DateTime<Utc>>) -> Result<()> {
        let nanos = values
            .map(|dt| {
                dt.timestamp_nanos_opt().ok_or_else(|| {
                    Error::StorageError(format!("Timestamp {dt} outside the nanosecond range"))
                })
            })
            .collect::<Result<Vec<i64>>>()?;
        self.push(
            Field::new(
                "datetime",
                DataType::Timestamp(TimeUnit::Nanosecond, Some("UTC".into())),
                false,
            ),
            Arc::new(TimestampNanosecondArray::from(nanos).with_timezone("UTC")),
        );
        Ok(())
    }

    fn aux(&mut self, values: impl Iterator<Item = AuxChannels>) {
        let aux: Vec<AuxChannels> = values.collect();
        let channels: [fn(&AuxChannels) -> Complex64; 6] = [
            |c| c.is,
            |c| c.il,
            |c| c.zg,
            |c| c.zg1,
            |c| c.zg2,
            |c| c.zg3,
        ];
        for (name, get) in COMPLEX_AUX.iter().zip(channels) {
            self.complex(name, aux.iter().map(get));
        }
        self.real("Iab", aux.iter().map(|c| c.iab).collect());
    }

    fn finish(self) -> Result<RecordBatch> {
        Ok(RecordBatch::try_new(
            Arc::new(Schema::new(self.fields)),
            self.columns,
        )?)
    }
}

struct BatchReader<'a> {
    batch: &'a RecordBatch,
}

impl BatchReader<'_> {
    fn array<T: Array + 'static>(&self, name: &str) -> Result<Option<&T>> {
        let Some(column) = self.batch.column_by_name(name) else {
            return Ok(None);
        };
        if column.null_count() > 0 {
            return Err(Error::StorageError(format!("Column '{name}' contains nulls")));
        }
        column
            .as_any()
            .downcast_ref::<T>()
            .map(Some)
            .ok_or_else(|| {
                Error::StorageError(format!(
                    "Column '{name}' has unexpected type {}",
                    column.data_type()
                ))
            })
    }

    fn electrodes(&self, name: &str) -> Result<Vec<Electrode>> {
        self.array::<UInt32Array>(name)?
            .map(|array| array.values().to_vec())
            .ok_or_else(|| Error::StorageError(format!("Missing electrode column '{name}'")))
    }

    fn real(&self, name: &str) -> Result<Option<Vec<f64>>> {
        Ok(self
            .array::<Float64Array>(name)?
            .map(|array| array.values().to_vec()))
    }

    fn complex(&self, name: &str) -> Result<Option<Vec<Complex64>>> {
        let re = self.real(&format!("{name}_re"))?;
        let im = self.real(&format!("{name}_im"))?;
        match (re, im) {
            (Some(re), Some(im)) => Ok(Some(
                re.into_iter().zip(im).map(|(re, im)| Complex64::new(re, im)).collect(),
            )),
            (None, None) => Ok(None),
            _ => Err(Error::StorageError(format!(
                "Column '{name}' needs both '{name}_re' and '{name}_im'"
            ))),
        }
    }

    fn datetime(&self) -> Result<Option<Vec<DateTime<Utc>>>> {
        let Some(array) = self.array::<TimestampNanosecondArray>("datetime")? else {
            return Ok(None);
        };
        array
            .values()
            .iter()
            .map(|&nanos| {
                let subsec = u32::try_from(nanos.rem_euclid(NANOS_PER_SECOND)).ok();
                subsec
                    .and_then(|subsec| {
                        DateTime::from_timestamp(nanos.div_euclid(NANOS_PER_SECOND), subsec)
                    })
                    .ok_or_else(|| Error::StorageError(format!("Timestamp {nanos} out of range")))
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    fn aux(&self) -> Result<Option<Vec<AuxChannels>>> {
        let Some(iab) = self.real("Iab")? else {
            return Ok(None);
        };
        let mut channels = Vec::with_capacity(COMPLEX_AUX.len());
        for name in COMPLEX_AUX {
            channels.push(self.complex(name)?.ok_or_else(|| {
                Error::StorageError(format!("Missing auxiliary channel '{name}'"))
            })?);
        }

        Ok(Some(
            iab.iter()
                .enumerate()
                .map(|(row, &iab)| AuxChannels {
                    is: channels[0][row],
                    il: channels[1][row],
                    zg: channels[2][row],
                    zg1: channels[3][row],
                    zg2: channels[4][row],
                    zg3: channels[5][row],
                    iab,
                })
                .collect(),
        ))
    }
}
