//! Measurement configuration lists (ABMN)
//!
//! A configuration file holds one quadrupole per line, four whitespace
//! separated electrode numbers in `A B M N` order:
//!
//! ```text
//! 1 2 4 3
//! 1 2 5 4
//! 2 3 5 6
//! ```

use crate::electrode::{Electrode, Quadruple};
use crate::text::{parse_numeric, read_numeric_file, to_electrode, NumericRows};
use crate::{Error, Result};
use std::path::Path;

/// Ordered list of quadrupoles to construct
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configurations {
    quadruples: Vec<Quadruple>,
}

impl Configurations {
    /// Create from quadruples in ABMN order
    #[must_use]
    pub fn new(quadruples: Vec<Quadruple>) -> Self {
        Self { quadruples }
    }

    /// Load a configuration file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, a line does not hold four
    /// numbers, or a number is not a valid electrode id.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let parsed = read_numeric_file(path)?;
        Self::from_rows(&parsed, &path.display().to_string())
    }

    /// Parse configurations from text in the file layout
    ///
    /// # Errors
    ///
    /// Same as [`Configurations::from_file`], without the IO part.
    pub fn parse_str(text: &str) -> Result<Self> {
        let parsed = parse_numeric(text, "<memory>")?;
        Self::from_rows(&parsed, "<memory>")
    }

    fn from_rows(parsed: &NumericRows, source_name: &str) -> Result<Self> {
        if !parsed.rows.is_empty() && parsed.columns != 4 {
            return Err(Error::ParseError(format!(
                "{source_name}: configuration files need 4 columns (A B M N), found {}",
                parsed.columns
            )));
        }

        let quadruples = parsed
            .rows
            .iter()
            .map(|(line_no, values)| {
                let mut electrodes = [0; 4];
                for (slot, &value) in electrodes.iter_mut().zip(values) {
                    *slot = to_electrode(value, source_name, *line_no)?;
                }
                Ok(Quadruple::from(electrodes))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { quadruples })
    }

    /// Configurations in input order
    #[must_use]
    pub fn as_slice(&self) -> &[Quadruple] {
        &self.quadruples
    }

    /// Number of configurations
    #[must_use]
    pub fn len(&self) -> usize {
        self.quadruples.len()
    }

    /// Check if there are no configurations
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quadruples.is_empty()
    }

    /// Iterate over configurations
    pub fn iter(&self) -> std::slice::Iter<'_, Quadruple> {
        self.quadruples.iter()
    }
}

impl From<Vec<[Electrode; 4]>> for Configurations {
    fn from(rows: Vec<[Electrode; 4]>) -> Self {
        rows.into_iter().map(Quadruple::from).collect()
    }
}

impl FromIterator<Quadruple> for Configurations {
    fn from_iter<I: IntoIterator<Item = Quadruple>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Configurations {
    type Item = &'a Quadruple;
    type IntoIter = std::slice::Iter<'a, Quadruple>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
