//! Whitespace-separated numeric text files
//!
//! Configuration and correction files are plain columns of numbers. Blank
//! lines and `#` comments are skipped; every other line must hold the same
//! number of columns.

use crate::electrode::Electrode;
use crate::{Error, Result};
use std::path::Path;

/// Parsed numeric rows of one text source
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NumericRows {
    /// Rows with their 1-based line numbers
    pub rows: Vec<(usize, Vec<f64>)>,
    /// Column count shared by all rows (0 for an empty source)
    pub columns: usize,
}

/// Read and parse a numeric text file
pub(crate) fn read_numeric_file(path: &Path) -> Result<NumericRows> {
    let text = std::fs::read_to_string(path)?;
    parse_numeric(&text, &path.display().to_string())
}

/// Parse numeric rows from text
///
/// `source_name` only appears in error messages.
pub(crate) fn parse_numeric(text: &str, source_name: &str) -> Result<NumericRows> {
    let mut rows = Vec::new();
    let mut columns = None;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let content = line.split('#').next().unwrap_or_default().trim();
        if content.is_empty() {
            continue;
        }

        let values = content
            .split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|_| {
                    Error::ParseError(format!(
                        "{source_name}:{line_no}: invalid number '{token}'"
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        match columns {
            None => columns = Some(values.len()),
            Some(expected) if expected != values.len() => {
                return Err(Error::ParseError(format!(
                    "{source_name}:{line_no}: expected {expected} columns, found {}",
                    values.len()
                )));
            }
            Some(_) => {}
        }
        rows.push((line_no, values));
    }

    Ok(NumericRows {
        rows,
        columns: columns.unwrap_or(0),
    })
}

/// Convert a parsed number to an electrode id, truncating like an integer cast
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn to_electrode(value: f64, source_name: &str, line_no: usize) -> Result<Electrode> {
    if !value.is_finite() || value < 0.0 || value > f64::from(Electrode::MAX) {
        return Err(Error::ParseError(format!(
            "{source_name}:{line_no}: '{value}' is not a valid electrode number"
        )));
    }
    Ok(value.trunc() as Electrode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_blank_lines_and_comments() {
        let text = "# header\n1 2 3 4\n\n  5 6 7 8  # trailing\n";
        let parsed = parse_numeric(text, "test").unwrap();
        assert_eq!(parsed.columns, 4);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[1], (4, vec![5.0, 6.0, 7.0, 8.0]));
    }

    #[test]
    fn test_parse_scientific_notation() {
        let parsed = parse_numeric("1.000000e+00 2.5e1", "test").unwrap();
        assert_eq!(parsed.rows[0].1, vec![1.0, 25.0]);
    }

    #[test]
    fn test_parse_ragged_rows_rejected() {
        let err = parse_numeric("1 2 3\n1 2\n", "cfg.dat").unwrap_err();
        assert!(err.to_string().contains("cfg.dat:2: expected 3 columns, found 2"));
    }

    #[test]
    fn test_parse_invalid_token() {
        let err = parse_numeric("1 x 3", "cfg.dat").unwrap_err();
        assert!(err.to_string().contains("invalid number 'x'"));
    }

    #[test]
    fn test_parse_empty_source() {
        let parsed = parse_numeric("\n# nothing\n", "empty").unwrap();
        assert!(parsed.rows.is_empty());
        assert_eq!(parsed.columns, 0);
    }

    #[test]
    fn test_to_electrode() {
        assert_eq!(to_electrode(12.0, "t", 1).unwrap(), 12);
        assert_eq!(to_electrode(3.9, "t", 1).unwrap(), 3);
        assert!(to_electrode(-1.0, "t", 1).is_err());
        assert!(to_electrode(f64::NAN, "t", 1).is_err());
    }
}
