//! Property-based tests for eit-quadpole
//!
//! - Test superposition and calibration invariants
//! - Test data integrity of the row layout
//! - Run with ProptestConfig::with_cases(100)

use chrono::{TimeZone, Utc};
use eit_quadpole::configs::Configurations;
use eit_quadpole::correction::{apply_correction_factors, CorrectionEntry, CorrectionTable};
use eit_quadpole::electrode::{Electrode, Quadruple};
use eit_quadpole::quadpole::compute_quadrupoles;
use eit_quadpole::sign::fix_sign_with_k;
use eit_quadpole::table::{AuxChannels, Column, QuadrupoleTable, TripoleRecord, TripoleTable};
use num_complex::Complex64;
use proptest::prelude::*;

/// Potential electrodes with tripole data; 11 and 12 are never measured
const MEASURED: std::ops::RangeInclusive<Electrode> = 3..=10;

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

/// Tripole table for injection 1-2 at two frequencies
fn arb_tripoles() -> impl Strategy<Value = TripoleTable> {
    let count = MEASURED.count() * 2;
    (
        proptest::collection::vec((-50.0f64..50.0, -5.0f64..5.0), count),
        0.01f64..1.0,
    )
        .prop_map(|(potentials, iab)| {
            let datetime = Utc.with_ymd_and_hms(2019, 3, 1, 8, 0, 0).unwrap();
            let records = MEASURED
                .flat_map(|p| [1.0, 10.0].map(move |frequency| (p, frequency)))
                .zip(potentials)
                .map(|((p, frequency), (re, im))| TripoleRecord {
                    a: 1,
                    b: 2,
                    p,
                    datetime,
                    frequency,
                    zt: Complex64::new(re, im),
                    aux: AuxChannels {
                        iab,
                        ..AuxChannels::default()
                    },
                })
                .collect();
            TripoleTable::new(records).unwrap()
        })
}

/// Configurations on the measured injection, potential electrodes partly
/// outside the measured set
fn arb_configs() -> impl Strategy<Value = Configurations> {
    proptest::collection::vec((any::<bool>(), 3u32..=12, 3u32..=12), 1..20).prop_map(|rows| {
        rows.into_iter()
            .map(|(reversed, m, n)| {
                if reversed {
                    Quadruple::new(2, 1, m, n)
                } else {
                    Quadruple::new(1, 2, m, n)
                }
            })
            .collect()
    })
}

/// Deterministic factor per canonical configuration
fn factor_of(quadruple: Quadruple) -> f64 {
    let canonical = quadruple.canonical();
    0.5 + f64::from(canonical.m * 13 + canonical.n) / 100.0
}

fn corrections_for(table: &QuadrupoleTable) -> CorrectionTable {
    CorrectionTable::from_entries(
        (0..table.len())
            .map(|row| table.quadruple(row))
            .map(|q| CorrectionEntry::new(q, factor_of(q)))
            .collect(),
    )
}

fn close(lhs: f64, rhs: f64) -> bool {
    (lhs - rhs).abs() <= 1e-9 * (1.0 + lhs.abs().max(rhs.abs()))
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // ========================================================================
    // Construction Properties
    // ========================================================================

    /// Property: one row per frequency for every configuration with data
    #[test]
    fn prop_row_count_matches_measured_configurations(
        tripoles in arb_tripoles(),
        configs in arb_configs(),
    ) {
        let report = compute_quadrupoles(&tripoles, &configs).unwrap();

        let measured = configs
            .iter()
            .filter(|q| MEASURED.contains(&q.m) && MEASURED.contains(&q.n))
            .count();

        prop_assert_eq!(report.table.len(), measured * 2);
        prop_assert_eq!(report.skipped_count(), configs.len() - measured);
        prop_assert_eq!(report.unpaired_samples, 0);
    }

    /// Property: r carries the magnitude of Zt and the sign of its real part
    #[test]
    fn prop_resistance_is_signed_magnitude(
        tripoles in arb_tripoles(),
        configs in arb_configs(),
    ) {
        let table = compute_quadrupoles(&tripoles, &configs).unwrap().table;
        if table.is_empty() {
            return Ok(());
        }

        let zt = table.zt().unwrap();
        let r = table.column(Column::R).unwrap();
        let vmn = table.column(Column::Vmn).unwrap();
        let aux = table.aux().unwrap();
        for row in 0..table.len() {
            prop_assert!(close(r[row].abs(), zt[row].norm()));
            prop_assert!(zt[row].re * r[row] >= 0.0);
            prop_assert!(close(vmn[row], r[row] * aux[row].iab));
        }
    }

    /// Property: swapping M and N negates Zt
    #[test]
    fn prop_potential_swap_negates(
        tripoles in arb_tripoles(),
        m in 3u32..=10,
        n in 3u32..=10,
    ) {
        let configs = Configurations::from(vec![[1, 2, m, n], [1, 2, n, m]]);
        let table = compute_quadrupoles(&tripoles, &configs).unwrap().table;
        let zt = table.zt().unwrap();

        prop_assert_eq!(table.len(), 4);
        prop_assert_eq!(zt[0], -zt[2]);
        prop_assert_eq!(zt[1], -zt[3]);
    }

    // ========================================================================
    // Calibration Properties
    // ========================================================================

    /// Property: dividing by corr_fac restores the uncorrected values
    #[test]
    fn prop_correction_is_reversible(
        tripoles in arb_tripoles(),
        configs in arb_configs(),
    ) {
        let table = compute_quadrupoles(&tripoles, &configs).unwrap().table;
        if table.is_empty() {
            return Ok(());
        }
        let k = vec![2.5; table.len()];
        let table = table.with_geometric_factors(k).unwrap();

        let corrected = apply_correction_factors(&table, &corrections_for(&table))
            .unwrap()
            .table;
        let corr_fac = corrected.column(Column::CorrFac).unwrap();

        for row in 0..table.len() {
            prop_assert_eq!(corr_fac[row], factor_of(table.quadruple(row)));
            for column in [Column::R, Column::Vmn, Column::RhoA] {
                let before = table.column(column).unwrap()[row];
                let after = corrected.column(column).unwrap()[row];
                prop_assert!(close(after / corr_fac[row], before));
            }
            let restored = corrected.zt().unwrap()[row] / corr_fac[row];
            prop_assert!(close(restored.re, table.zt().unwrap()[row].re));
            prop_assert!(close(restored.im, table.zt().unwrap()[row].im));
            // untouched columns
            prop_assert_eq!(
                corrected.column(Column::Rpha).unwrap()[row],
                table.column(Column::Rpha).unwrap()[row]
            );
            prop_assert_eq!(corrected.quadruple(row), table.quadruple(row));
        }
    }

    /// Property: lookup ignores current and potential pair order
    #[test]
    fn prop_correction_lookup_is_order_independent(
        a in 1u32..50, b in 1u32..50, m in 1u32..50, n in 1u32..50,
        factor in 0.1f64..10.0,
    ) {
        let corrections = CorrectionTable::from_entries(vec![
            CorrectionEntry::new(Quadruple::new(a, b, m, n), factor),
        ]);

        for q in [
            Quadruple::new(a, b, m, n),
            Quadruple::new(b, a, m, n),
            Quadruple::new(a, b, n, m),
            Quadruple::new(b, a, n, m),
        ] {
            prop_assert_eq!(corrections.factor_for(q).unwrap(), Some(factor));
        }
    }

    // ========================================================================
    // Sign Normalization Properties
    // ========================================================================

    /// Property: normalizing twice equals normalizing once
    #[test]
    fn prop_sign_fix_is_idempotent(
        tripoles in arb_tripoles(),
        configs in arb_configs(),
        k_values in proptest::collection::vec(-100.0f64..100.0, 40),
    ) {
        let table = compute_quadrupoles(&tripoles, &configs).unwrap().table;
        if table.is_empty() {
            return Ok(());
        }
        let k = k_values.into_iter().cycle().take(table.len()).collect();
        let table = table.with_geometric_factors(k).unwrap();

        let once = fix_sign_with_k(&table).unwrap();
        let twice = fix_sign_with_k(&once.table).unwrap();

        prop_assert_eq!(twice.flipped, 0);
        prop_assert_eq!(&twice.table, &once.table);

        let k = once.table.column(Column::K).unwrap();
        let r = once.table.column(Column::R).unwrap();
        for row in 0..once.table.len() {
            prop_assert!(!(k[row] < 0.0 && r[row] < 0.0));
        }
    }

    /// Property: flipping preserves the configuration up to pair order
    #[test]
    fn prop_sign_fix_preserves_canonical_configuration(
        tripoles in arb_tripoles(),
        configs in arb_configs(),
    ) {
        let table = compute_quadrupoles(&tripoles, &configs).unwrap().table;
        if table.is_empty() {
            return Ok(());
        }
        let k = vec![-1.0; table.len()];
        let table = table.with_geometric_factors(k).unwrap();

        let fixed = fix_sign_with_k(&table).unwrap();
        prop_assert_eq!(fixed.table.len(), table.len());
        for row in 0..table.len() {
            prop_assert_eq!(
                fixed.table.quadruple(row).canonical(),
                table.quadruple(row).canonical()
            );
        }
    }
}
