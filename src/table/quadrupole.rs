//! Quadrupole (four-point) table
//!
//! Column-oriented so that calibration and sign normalization can operate
//! on whole columns. Only the electrode columns are mandatory; every other
//! column may be absent, mirroring what external tools attach over time
//! (`K` and `rho_a` come from a geometry calculator, `corr_fac` from
//! [`crate::correction`]).

use super::AuxChannels;
use crate::electrode::{Electrode, Quadruple};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Real-valued optional columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    /// Excitation frequency (Hz)
    Frequency,
    /// Signed resistance magnitude
    R,
    /// Voltage between M and N
    Vmn,
    /// Phase (mrad)
    Rpha,
    /// Geometric factor
    K,
    /// Apparent resistivity
    RhoA,
    /// Applied correction factor
    CorrFac,
}

impl Column {
    /// All real-valued columns in export order
    pub const ALL: [Self; 7] = [
        Self::Frequency,
        Self::R,
        Self::Vmn,
        Self::Rpha,
        Self::K,
        Self::RhoA,
        Self::CorrFac,
    ];

    /// Column name as used in exported tables
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Frequency => "frequency",
            Self::R => "r",
            Self::Vmn => "Vmn",
            Self::Rpha => "rpha",
            Self::K => "K",
            Self::RhoA => "rho_a",
            Self::CorrFac => "corr_fac",
        }
    }
}

/// Row view of a [`QuadrupoleTable`]; `None` marks an absent column
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[allow(clippy::struct_field_names)]
pub struct QuadrupoleRecord {
    /// Current electrode A
    pub a: Electrode,
    /// Current electrode B
    pub b: Electrode,
    /// Potential electrode M
    pub m: Electrode,
    /// Potential electrode N
    pub n: Electrode,
    /// Sample timestamp
    pub datetime: Option<DateTime<Utc>>,
    /// Excitation frequency (Hz)
    pub frequency: Option<f64>,
    /// Auxiliary instrument channels
    pub aux: Option<AuxChannels>,
    /// Transfer impedance between M and N
    pub zt: Option<Complex64>,
    /// Signed resistance magnitude
    pub r: Option<f64>,
    /// Voltage between M and N
    pub vmn: Option<f64>,
    /// Phase (mrad)
    pub rpha: Option<f64>,
    /// Geometric factor
    pub k: Option<f64>,
    /// Apparent resistivity
    pub rho_a: Option<f64>,
    /// Applied correction factor
    pub corr_fac: Option<f64>,
}

impl QuadrupoleRecord {
    /// Electrodes of this row in stored order
    #[must_use]
    pub const fn quadruple(&self) -> Quadruple {
        Quadruple::new(self.a, self.b, self.m, self.n)
    }
}

/// Columnar four-point measurement table
///
/// Deserialization rejects tables whose columns differ in length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableColumns")]
pub struct QuadrupoleTable {
    pub(crate) a: Vec<Electrode>,
    pub(crate) b: Vec<Electrode>,
    pub(crate) m: Vec<Electrode>,
    pub(crate) n: Vec<Electrode>,
    pub(crate) datetime: Option<Vec<DateTime<Utc>>>,
    pub(crate) aux: Option<Vec<AuxChannels>>,
    pub(crate) zt: Option<Vec<Complex64>>,
    pub(crate) frequency: Option<Vec<f64>>,
    pub(crate) r: Option<Vec<f64>>,
    pub(crate) vmn: Option<Vec<f64>>,
    pub(crate) rpha: Option<Vec<f64>>,
    pub(crate) k: Option<Vec<f64>>,
    pub(crate) rho_a: Option<Vec<f64>>,
    pub(crate) corr_fac: Option<Vec<f64>>,
}

impl QuadrupoleTable {
    /// Create a table holding only electrode columns
    #[must_use]
    pub fn from_electrodes(quadruples: impl IntoIterator<Item = Quadruple>) -> Self {
        let mut table = Self::default();
        for q in quadruples {
            table.a.push(q.a);
            table.b.push(q.b);
            table.m.push(q.m);
            table.n.push(q.n);
        }
        table
    }

    /// Assemble a table from row records
    ///
    /// A column is present when every record carries a value for it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a column is set on some records
    /// but not on others.
    pub fn from_records(records: &[QuadrupoleRecord]) -> Result<Self> {
        Ok(Self {
            a: records.iter().map(|r| r.a).collect(),
            b: records.iter().map(|r| r.b).collect(),
            m: records.iter().map(|r| r.m).collect(),
            n: records.iter().map(|r| r.n).collect(),
            datetime: gather(records, "datetime", |r| r.datetime)?,
            aux: gather(records, "aux", |r| r.aux)?,
            zt: gather(records, "Zt", |r| r.zt)?,
            frequency: gather(records, "frequency", |r| r.frequency)?,
            r: gather(records, "r", |r| r.r)?,
            vmn: gather(records, "Vmn", |r| r.vmn)?,
            rpha: gather(records, "rpha", |r| r.rpha)?,
            k: gather(records, "K", |r| r.k)?,
            rho_a: gather(records, "rho_a", |r| r.rho_a)?,
            corr_fac: gather(records, "corr_fac", |r| r.corr_fac)?,
        })
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.a.len()
    }

    /// Check if the table has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    /// Current electrodes A
    #[must_use]
    pub fn a(&self) -> &[Electrode] {
        &self.a
    }

    /// Current electrodes B
    #[must_use]
    pub fn b(&self) -> &[Electrode] {
        &self.b
    }

    /// Potential electrodes M
    #[must_use]
    pub fn m(&self) -> &[Electrode] {
        &self.m
    }

    /// Potential electrodes N
    #[must_use]
    pub fn n(&self) -> &[Electrode] {
        &self.n
    }

    /// Electrodes of row `row` in stored order
    ///
    /// # Panics
    ///
    /// Panics if `row` is out of bounds.
    #[must_use]
    pub fn quadruple(&self, row: usize) -> Quadruple {
        Quadruple::new(self.a[row], self.b[row], self.m[row], self.n[row])
    }

    /// Sample timestamps, if present
    #[must_use]
    pub fn datetime(&self) -> Option<&[DateTime<Utc>]> {
        self.datetime.as_deref()
    }

    /// Auxiliary channels, if present
    #[must_use]
    pub fn aux(&self) -> Option<&[AuxChannels]> {
        self.aux.as_deref()
    }

    /// Complex transfer impedances, if present
    #[must_use]
    pub fn zt(&self) -> Option<&[Complex64]> {
        self.zt.as_deref()
    }

    /// Real-valued column, if present
    #[must_use]
    pub fn column(&self, column: Column) -> Option<&[f64]> {
        self.slot(column).as_deref()
    }

    /// Check whether a real-valued column is present
    #[must_use]
    pub fn has_column(&self, column: Column) -> bool {
        self.slot(column).is_some()
    }

    /// Real-valued column, or [`Error::MissingColumn`]
    pub(crate) fn require(&self, column: Column) -> Result<&[f64]> {
        self.column(column)
            .ok_or(Error::MissingColumn(column.name()))
    }

    /// Set (or replace) a real-valued column
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the length differs from the row count.
    pub fn with_column(mut self, column: Column, values: Vec<f64>) -> Result<Self> {
        self.check_len(column.name(), values.len())?;
        *self.slot_mut(column) = Some(values);
        Ok(self)
    }

    /// Set (or replace) the transfer impedance column
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the length differs from the row count.
    pub fn with_zt(mut self, values: Vec<Complex64>) -> Result<Self> {
        self.check_len("Zt", values.len())?;
        self.zt = Some(values);
        Ok(self)
    }

    /// Set (or replace) the timestamp column
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the length differs from the row count.
    pub fn with_datetime(mut self, values: Vec<DateTime<Utc>>) -> Result<Self> {
        self.check_len("datetime", values.len())?;
        self.datetime = Some(values);
        Ok(self)
    }

    /// Set (or replace) the auxiliary channel columns
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the length differs from the row count.
    pub fn with_aux(mut self, values: Vec<AuxChannels>) -> Result<Self> {
        self.check_len("aux", values.len())?;
        self.aux = Some(values);
        Ok(self)
    }

    /// Attach geometric factors computed by an external geometry calculator
    ///
    /// Sets `K` and, when `r` is present, `rho_a = r * K`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the length differs from the row count.
    pub fn with_geometric_factors(self, k: Vec<f64>) -> Result<Self> {
        let mut table = self.with_column(Column::K, k)?;
        table.rho_a = table.r.as_ref().zip(table.k.as_ref()).map(|(r, k)| {
            r.iter().zip(k).map(|(r, k)| r * k).collect()
        });
        Ok(table)
    }

    /// Row view of row `row`, or `None` if out of bounds
    #[must_use]
    pub fn row(&self, row: usize) -> Option<QuadrupoleRecord> {
        if row >= self.len() {
            return None;
        }
        let real = |col: &Option<Vec<f64>>| col.as_ref().map(|v| v[row]);

        Some(QuadrupoleRecord {
            a: self.a[row],
            b: self.b[row],
            m: self.m[row],
            n: self.n[row],
            datetime: self.datetime.as_ref().map(|v| v[row]),
            frequency: real(&self.frequency),
            aux: self.aux.as_ref().map(|v| v[row]),
            zt: self.zt.as_ref().map(|v| v[row]),
            r: real(&self.r),
            vmn: real(&self.vmn),
            rpha: real(&self.rpha),
            k: real(&self.k),
            rho_a: real(&self.rho_a),
            corr_fac: real(&self.corr_fac),
        })
    }

    /// Iterate over row views
    pub fn records(&self) -> impl Iterator<Item = QuadrupoleRecord> + '_ {
        (0..self.len()).filter_map(|row| self.row(row))
    }

    pub(crate) const fn slot(&self, column: Column) -> &Option<Vec<f64>> {
        match column {
            Column::Frequency => &self.frequency,
            Column::R => &self.r,
            Column::Vmn => &self.vmn,
            Column::Rpha => &self.rpha,
            Column::K => &self.k,
            Column::RhoA => &self.rho_a,
            Column::CorrFac => &self.corr_fac,
        }
    }

    pub(crate) fn slot_mut(&mut self, column: Column) -> &mut Option<Vec<f64>> {
        match column {
            Column::Frequency => &mut self.frequency,
            Column::R => &mut self.r,
            Column::Vmn => &mut self.vmn,
            Column::Rpha => &mut self.rpha,
            Column::K => &mut self.k,
            Column::RhoA => &mut self.rho_a,
            Column::CorrFac => &mut self.corr_fac,
        }
    }

    /// Every column holds one value per row
    fn check_shape(&self) -> Result<()> {
        for (name, len) in [("b", self.b.len()), ("m", self.m.len()), ("n", self.n.len())] {
            self.check_len(name, len)?;
        }
        if let Some(values) = &self.datetime {
            self.check_len("datetime", values.len())?;
        }
        if let Some(values) = &self.aux {
            self.check_len("aux", values.len())?;
        }
        if let Some(values) = &self.zt {
            self.check_len("Zt", values.len())?;
        }
        for column in Column::ALL {
            if let Some(values) = self.column(column) {
                self.check_len(column.name(), values.len())?;
            }
        }
        Ok(())
    }

    fn check_len(&self, name: &str, len: usize) -> Result<()> {
        if len == self.len() {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!(
                "column '{name}' has {len} values, table has {} rows",
                self.len()
            )))
        }
    }
}

/// Serialized form of [`QuadrupoleTable`], validated on conversion
#[derive(Deserialize)]
struct TableColumns {
    a: Vec<Electrode>,
    b: Vec<Electrode>,
    m: Vec<Electrode>,
    n: Vec<Electrode>,
    datetime: Option<Vec<DateTime<Utc>>>,
    aux: Option<Vec<AuxChannels>>,
    zt: Option<Vec<Complex64>>,
    frequency: Option<Vec<f64>>,
    r: Option<Vec<f64>>,
    vmn: Option<Vec<f64>>,
    rpha: Option<Vec<f64>>,
    k: Option<Vec<f64>>,
    rho_a: Option<Vec<f64>>,
    corr_fac: Option<Vec<f64>>,
}

impl TryFrom<TableColumns> for QuadrupoleTable {
    type Error = Error;

    fn try_from(columns: TableColumns) -> Result<Self> {
        let table = Self {
            a: columns.a,
            b: columns.b,
            m: columns.m,
            n: columns.n,
            datetime: columns.datetime,
            aux: columns.aux,
            zt: columns.zt,
            frequency: columns.frequency,
            r: columns.r,
            vmn: columns.vmn,
            rpha: columns.rpha,
            k: columns.k,
            rho_a: columns.rho_a,
            corr_fac: columns.corr_fac,
        };
        table.check_shape()?;
        Ok(table)
    }
}

fn gather<T>(
    records: &[QuadrupoleRecord],
    name: &str,
    get: impl Fn(&QuadrupoleRecord) -> Option<T>,
) -> Result<Option<Vec<T>>> {
    let present = records.iter().filter(|r| get(*r).is_some()).count();
    if present == 0 {
        return Ok(None);
    }
    if present < records.len() {
        return Err(Error::InvalidInput(format!(
            "column '{name}' is set on {present} of {} rows",
            records.len()
        )));
    }
    Ok(Some(records.iter().filter_map(get).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> QuadrupoleTable {
        QuadrupoleTable::from_electrodes([Quadruple::new(1, 2, 3, 4), Quadruple::new(2, 1, 4, 3)])
    }

    #[test]
    fn test_from_electrodes_has_no_optional_columns() {
        let table = sample_table();
        assert_eq!(table.len(), 2);
        for column in Column::ALL {
            assert!(!table.has_column(column));
        }
        assert!(table.zt().is_none());
        assert_eq!(table.quadruple(1), Quadruple::new(2, 1, 4, 3));
    }

    #[test]
    fn test_with_column_length_checked() {
        let result = sample_table().with_column(Column::R, vec![1.0]);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("column 'r' has 1 values"));
    }

    #[test]
    fn test_require_missing_column() {
        let err = sample_table().require(Column::K).unwrap_err();
        assert!(matches!(err, Error::MissingColumn("K")));
    }

    #[test]
    fn test_geometric_factors_set_rho_a() {
        let table = sample_table()
            .with_column(Column::R, vec![2.0, -3.0])
            .unwrap()
            .with_geometric_factors(vec![10.0, 5.0])
            .unwrap();

        assert_eq!(table.column(Column::K), Some(&[10.0, 5.0][..]));
        assert_eq!(table.column(Column::RhoA), Some(&[20.0, -15.0][..]));
    }

    #[test]
    fn test_geometric_factors_without_r() {
        let table = sample_table().with_geometric_factors(vec![1.0, 1.0]).unwrap();
        assert!(table.has_column(Column::K));
        assert!(!table.has_column(Column::RhoA));
    }

    #[test]
    fn test_records_roundtrip_through_rows() {
        let table = sample_table()
            .with_column(Column::R, vec![1.0, 2.0])
            .unwrap();
        let records: Vec<_> = table.records().collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].r, Some(2.0));
        assert_eq!(records[1].k, None);

        let rebuilt = QuadrupoleTable::from_records(&records).unwrap();
        assert_eq!(rebuilt, table);
    }

    #[test]
    fn test_from_records_rejects_partial_columns() {
        let records = vec![
            QuadrupoleRecord {
                r: Some(1.0),
                ..QuadrupoleRecord::default()
            },
            QuadrupoleRecord::default(),
        ];
        let err = QuadrupoleTable::from_records(&records).unwrap_err();
        assert!(err.to_string().contains("column 'r' is set on 1 of 2 rows"));
    }

    #[test]
    fn test_row_out_of_bounds() {
        assert!(sample_table().row(2).is_none());
    }

    #[test]
    fn test_json_roundtrip() {
        let table = sample_table()
            .with_column(Column::R, vec![-1.0, 2.0])
            .unwrap()
            .with_zt(vec![Complex64::new(-1.0, 0.5), Complex64::new(2.0, 0.0)])
            .unwrap();
        let json = serde_json::to_string(&table).unwrap();
        let decoded: QuadrupoleTable = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, table);
    }

    #[test]
    fn test_json_electrode_length_mismatch_rejected() {
        let err = serde_json::from_str::<QuadrupoleTable>(
            r#"{"a": [1, 2], "b": [2], "m": [3, 4], "n": [4, 3],
                "r": [-1.0, -1.0], "k": [-1.0, -1.0]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("column 'b' has 1 values, table has 2 rows"));
    }

    #[test]
    fn test_json_optional_column_length_mismatch_rejected() {
        let err = serde_json::from_str::<QuadrupoleTable>(
            r#"{"a": [1, 2], "b": [2, 1], "m": [3, 4], "n": [4, 3], "k": [1.0]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("column 'K' has 1 values"));
    }

    #[test]
    fn test_json_complex_length_mismatch_rejected() {
        let err = serde_json::from_str::<QuadrupoleTable>(
            r#"{"a": [1], "b": [2], "m": [3], "n": [4], "zt": [[1.0, 0.0], [2.0, 0.0]]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("column 'Zt' has 2 values, table has 1 rows"));
    }
}
