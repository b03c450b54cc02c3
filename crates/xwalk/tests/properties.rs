// Property-based tests for identifiers and interpolation weights.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::{BTreeMap, HashMap};

use proptest::prelude::*;

use censuswalk_xwalk::accounting::reconcile_accounting;
use censuswalk_xwalk::atoms::{calculate_atoms, InterpolationRow};
use censuswalk_xwalk::geo::{CensusYear, Geography, Role};
use censuswalk_xwalk::model::BaseRow;
use censuswalk_xwalk::registry::lookup;

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// A 2010 block record; the block code leads with its block group digit.
fn arb_block_2010() -> impl Strategy<Value = BTreeMap<&'static str, String>> {
    (
        "[0-9]{2}",
        "[0-9]{3}",
        "[0-9]{6}",
        "[0-9]",
        "[0-9]{3}",
    )
        .prop_map(|(state, county, tract, bg, block)| {
            BTreeMap::from([
                ("STATEA", state),
                ("COUNTYA", county),
                ("TRACTA", tract),
                ("BLKGRPA", bg.clone()),
                ("BLOCKA", format!("{bg}{block}")),
            ])
        })
}

/// Joined base rows over a small id space so keys collide.
fn arb_rows() -> impl Strategy<Value = Vec<(u8, u8, f64, Option<f64>, Option<f64>)>> {
    prop::collection::vec(
        (
            0u8..5,
            0u8..4,
            0.0..=1.0f64,
            prop::option::of(0.0..1000.0f64),
            prop::option::of(0.0..500.0f64),
        ),
        1..40,
    )
}

struct View(BTreeMap<&'static str, String>);

impl censuswalk_xwalk::ids::Record for View {
    fn value(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str).filter(|v| !v.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn compose_is_deterministic_and_truncation_agrees(record in arb_block_2010()) {
        let rec = View(record);
        let blk = lookup(Role::Base, Geography::Blk, CensusYear::Y2010).unwrap();

        let first = blk.compose(&rec).unwrap();
        let second = blk.compose(&rec).unwrap();
        prop_assert_eq!(&first, &second);

        for geo in [Geography::Tr, Geography::Bg, Geography::Co] {
            let scheme = lookup(Role::Target, geo, CensusYear::Y2010).unwrap();
            prop_assert_eq!(scheme.truncate(&first).unwrap(), scheme.compose(&rec).unwrap());
        }
    }
}

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn weights_sum_to_one_or_exactly_zero(rows in arb_rows()) {
        let ids: Vec<(String, String)> = rows
            .iter()
            .map(|(s, t, ..)| (format!("S{s}"), format!("T{t}")))
            .collect();
        let interp: Vec<InterpolationRow<'_>> = rows
            .iter()
            .zip(&ids)
            .map(|((_, _, w, pop, hh), (s, t))| InterpolationRow {
                source: Some(s.as_str()),
                target: Some(t.as_str()),
                weight: Some(*w),
                values: vec![*pop, *hh],
            })
            .collect();

        let atoms = calculate_atoms(&interp, 2);

        // mass per source, per variable
        let mut mass: HashMap<&str, [f64; 2]> = HashMap::new();
        for r in &interp {
            let m = mass.entry(r.source.unwrap()).or_default();
            for (var, v) in r.values.iter().enumerate() {
                if let Some(v) = v {
                    m[var] += r.weight.unwrap() * v;
                }
            }
        }

        let mut sums: HashMap<&str, [f64; 2]> = HashMap::new();
        for a in &atoms {
            let s = sums.entry(a.source.as_deref().unwrap()).or_default();
            for var in 0..2 {
                prop_assert!(a.weights[var].is_finite());
                prop_assert!(a.weights[var] >= 0.0);
                s[var] += a.weights[var];
            }
        }

        for (source, total) in &sums {
            for var in 0..2 {
                if mass[source][var] > 0.0 {
                    prop_assert!((total[var] - 1.0).abs() < 1e-6, "{source} var {var}: {}", total[var]);
                } else {
                    prop_assert_eq!(total[var], 0.0);
                }
            }
        }
    }

    #[test]
    fn accounting_is_idempotent(rows in arb_rows(), covered in 0usize..10) {
        let base: Vec<BaseRow> = rows
            .iter()
            .map(|(s, t, w, ..)| BaseRow {
                source_id: Some(format!("S{s}")),
                target_id: Some(format!("T{t}")),
                ..BaseRow::new("b", "b", *w)
            })
            .collect();
        let interp: Vec<InterpolationRow<'_>> = base
            .iter()
            .take(covered)
            .map(|r| InterpolationRow {
                source: r.source_id.as_deref(),
                target: r.target_id.as_deref(),
                weight: r.weight,
                values: vec![Some(1.0)],
            })
            .collect();
        let mut atoms = calculate_atoms(&interp, 1);

        reconcile_accounting(&base, &mut atoms, 1);
        let len = atoms.len();
        let second = reconcile_accounting(&base, &mut atoms, 1);

        prop_assert_eq!(second.placeholders(), 0);
        prop_assert_eq!(atoms.len(), len);
    }
}
