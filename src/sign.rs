//! Sign normalization using the geometric factor
//!
//! A negative resistance measured with a negative geometric factor is the
//! same measurement as a positive one with two electrodes swapped. This
//! stage relabels such rows so every geometric factor becomes positive:
//!
//! - `K`, `r`, `Vmn` and `Zt` change sign
//! - rows stored with `a > b` get `a`/`b` swapped, rows with `a < b` get
//!   `m`/`n` swapped
//! - `rho_a` and `rpha` are recomputed for all rows
//!
//! Rows with `a == b` have no physical current dipole. They are passed
//! through untouched and counted in [`SignFix::degenerate`].

use crate::table::{phase_mrad, Column, QuadrupoleTable};
use crate::Result;
use std::ops::Neg;

/// Sign-normalized table and what changed
#[derive(Debug, Clone)]
pub struct SignFix {
    /// Table with non-negative geometric factors (except degenerate rows)
    pub table: QuadrupoleTable,
    /// Rows whose signs were flipped and electrodes relabeled
    pub flipped: usize,
    /// Rows with `K < 0`, `r < 0` and `a == b`, left unchanged
    pub degenerate: usize,
}

/// Swap electrode labels so that geometric factors become positive
///
/// # Errors
///
/// Returns [`crate::Error::MissingColumn`] if `K` or `r` is absent. The
/// check happens before anything is changed.
///
/// # Example
///
/// ```rust
/// use eit_quadpole::electrode::Quadruple;
/// use eit_quadpole::sign::fix_sign_with_k;
/// use eit_quadpole::table::{Column, QuadrupoleTable};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let table = QuadrupoleTable::from_electrodes([Quadruple::new(1, 2, 3, 4)])
///     .with_column(Column::R, vec![-10.0])?
///     .with_column(Column::K, vec![-20.0])?;
///
/// let fixed = fix_sign_with_k(&table)?;
/// assert_eq!(fixed.table.quadruple(0), Quadruple::new(1, 2, 4, 3));
/// assert_eq!(fixed.table.column(Column::K), Some(&[20.0][..]));
/// # Ok(())
/// # }
/// ```
pub fn fix_sign_with_k(table: &QuadrupoleTable) -> Result<SignFix> {
    let k = table.require(Column::K)?;
    let r = table.require(Column::R)?;

    let negative: Vec<bool> = k.iter().zip(r).map(|(k, r)| *k < 0.0 && *r < 0.0).collect();
    let mut degenerate = 0;
    let flip: Vec<bool> = negative
        .iter()
        .enumerate()
        .map(|(row, &is_negative)| {
            let self_pair = table.a[row] == table.b[row];
            if is_negative && self_pair {
                degenerate += 1;
            }
            is_negative && !self_pair
        })
        .collect();
    let flipped = flip.iter().filter(|&&f| f).count();

    if degenerate > 0 {
        tracing::warn!(rows = degenerate, "current electrodes a == b, rows left unchanged");
    }

    let mut fixed = table.clone();
    for column in [Column::K, Column::R, Column::Vmn] {
        if let Some(values) = fixed.slot_mut(column) {
            negate_where(values, &flip);
        }
    }
    if let Some(zt) = fixed.zt.as_mut() {
        negate_where(zt, &flip);
    }

    for row in flip.iter().enumerate().filter_map(|(row, &f)| f.then_some(row)) {
        // decided on the stored order; a == b rows never reach this point
        if fixed.a[row] > fixed.b[row] {
            std::mem::swap(&mut fixed.a[row], &mut fixed.b[row]);
        } else {
            std::mem::swap(&mut fixed.m[row], &mut fixed.n[row]);
        }
    }

    if fixed.rho_a.is_some() {
        let rho_a = fixed
            .r
            .iter()
            .flatten()
            .zip(fixed.k.iter().flatten())
            .map(|(r, k)| r * k)
            .collect();
        fixed.rho_a = Some(rho_a);
    }

    if let (Some(zt), Some(rpha)) = (fixed.zt.as_ref(), fixed.rpha.as_mut()) {
        for (phase, z) in rpha.iter_mut().zip(zt) {
            *phase = phase_mrad(*z);
        }
    }

    tracing::debug!(flipped, degenerate, "sign normalization finished");
    Ok(SignFix {
        table: fixed,
        flipped,
        degenerate,
    })
}

fn negate_where<T: Copy + Neg<Output = T>>(values: &mut [T], mask: &[bool]) {
    for (value, &flip) in values.iter_mut().zip(mask) {
        if flip {
            *value = -*value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::electrode::Quadruple;
    use crate::Error;
    use num_complex::Complex64;

    fn two_rows() -> QuadrupoleTable {
        QuadrupoleTable::from_electrodes([Quadruple::new(1, 2, 3, 4), Quadruple::new(1, 2, 4, 3)])
            .with_column(Column::R, vec![-10.0, 10.0])
            .unwrap()
            .with_column(Column::K, vec![-20.0, 20.0])
            .unwrap()
            .with_column(Column::RhoA, vec![200.0, 200.0])
            .unwrap()
    }

    #[test]
    fn test_flip_swaps_mn_when_a_lt_b() {
        let fixed = fix_sign_with_k(&two_rows()).unwrap();
        let t = &fixed.table;

        assert_eq!(fixed.flipped, 1);
        assert_eq!(t.quadruple(0), Quadruple::new(1, 2, 4, 3));
        assert_eq!(t.quadruple(1), Quadruple::new(1, 2, 4, 3));
        assert_eq!(t.column(Column::K), Some(&[20.0, 20.0][..]));
        assert_eq!(t.column(Column::R), Some(&[10.0, 10.0][..]));
        assert_eq!(t.column(Column::RhoA), Some(&[200.0, 200.0][..]));
    }

    #[test]
    fn test_flip_swaps_ab_when_a_gt_b() {
        let table = QuadrupoleTable::from_electrodes([Quadruple::new(2, 1, 3, 4)])
            .with_column(Column::R, vec![-1.0])
            .unwrap()
            .with_column(Column::K, vec![-3.0])
            .unwrap();

        let fixed = fix_sign_with_k(&table).unwrap();
        assert_eq!(fixed.table.quadruple(0), Quadruple::new(1, 2, 3, 4));
    }

    #[test]
    fn test_only_k_negative_is_not_flipped() {
        let table = QuadrupoleTable::from_electrodes([Quadruple::new(1, 2, 3, 4)])
            .with_column(Column::R, vec![5.0])
            .unwrap()
            .with_column(Column::K, vec![-3.0])
            .unwrap();

        let fixed = fix_sign_with_k(&table).unwrap();
        assert_eq!(fixed.flipped, 0);
        assert_eq!(fixed.table, table);
    }

    #[test]
    fn test_degenerate_self_pair_passed_through() {
        let table = QuadrupoleTable::from_electrodes([Quadruple::new(2, 2, 3, 4)])
            .with_column(Column::R, vec![-1.0])
            .unwrap()
            .with_column(Column::K, vec![-3.0])
            .unwrap();

        let fixed = fix_sign_with_k(&table).unwrap();
        assert_eq!(fixed.flipped, 0);
        assert_eq!(fixed.degenerate, 1);
        assert_eq!(fixed.table, table);
    }

    #[test]
    fn test_complex_columns_and_phase() {
        let table = QuadrupoleTable::from_electrodes([Quadruple::new(1, 2, 3, 4)])
            .with_zt(vec![Complex64::new(-1.0, -1.0)])
            .unwrap()
            .with_column(Column::R, vec![-std::f64::consts::SQRT_2])
            .unwrap()
            .with_column(Column::K, vec![-1.0])
            .unwrap()
            .with_column(Column::Vmn, vec![-2.0])
            .unwrap()
            .with_column(Column::Rpha, vec![-2356.194])
            .unwrap();

        let fixed = fix_sign_with_k(&table).unwrap();
        let row = fixed.table.row(0).unwrap();

        assert_eq!(row.zt, Some(Complex64::new(1.0, 1.0)));
        assert_eq!(row.vmn, Some(2.0));
        assert!((row.rpha.unwrap() - 785.398_163).abs() < 1e-3);
    }

    #[test]
    fn test_missing_k_is_fatal() {
        let table = QuadrupoleTable::from_electrodes([Quadruple::new(1, 2, 3, 4)])
            .with_column(Column::R, vec![-1.0])
            .unwrap();
        assert!(matches!(fix_sign_with_k(&table), Err(Error::MissingColumn("K"))));
    }

    #[test]
    fn test_missing_r_is_fatal() {
        let table = QuadrupoleTable::from_electrodes([Quadruple::new(1, 2, 3, 4)])
            .with_column(Column::K, vec![-1.0])
            .unwrap();
        assert!(matches!(fix_sign_with_k(&table), Err(Error::MissingColumn("r"))));
    }

    #[test]
    fn test_second_run_is_noop() {
        let once = fix_sign_with_k(&two_rows()).unwrap();
        let twice = fix_sign_with_k(&once.table).unwrap();

        assert_eq!(twice.flipped, 0);
        assert_eq!(twice.table, once.table);
    }
}
