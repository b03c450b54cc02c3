//! Weighted interpolation: base rows → atoms.
//!
//! For each declared variable, the elemental weight times the variable value
//! is summed per (source, target) pair and normalized by the per-source total
//! of that same variable. Variables never share a denominator.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::XwalkError;
use crate::model::{Atom, BaseRow};
use crate::table::Table;

// ---------------------------------------------------------------------------
// Variable declaration
// ---------------------------------------------------------------------------

/// Input variables paired with the weight names they produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightSpec {
    input_vars: Vec<String>,
    weight_vars: Vec<String>,
    prefix: String,
}

impl WeightSpec {
    pub fn new(
        input_vars: Vec<String>,
        weight_vars: Vec<String>,
        prefix: impl Into<String>,
    ) -> Result<Self, XwalkError> {
        if input_vars.len() != weight_vars.len() {
            return Err(XwalkError::VariableMismatch {
                inputs: input_vars.len(),
                weights: weight_vars.len(),
            });
        }
        if input_vars.is_empty() {
            return Err(XwalkError::ConfigValidation(
                "at least one input variable is required".into(),
            ));
        }
        Ok(Self {
            input_vars,
            weight_vars,
            prefix: prefix.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.input_vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_vars.is_empty()
    }

    pub fn input_vars(&self) -> &[String] {
        &self.input_vars
    }

    /// `<prefix><weight_var>` for each pair, in declared order.
    pub fn weight_columns(&self) -> Vec<String> {
        self.weight_vars
            .iter()
            .map(|w| format!("{}{w}", self.prefix))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// One joined base row as the aggregator sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationRow<'a> {
    pub source: Option<&'a str>,
    pub target: Option<&'a str>,
    pub weight: Option<f64>,
    /// One value per declared variable.
    pub values: Vec<Option<f64>>,
}

type AtomKey<'a> = (&'a str, &'a str);

/// Aggregate rows into atoms, one per distinct (source, target) pair.
///
/// Rows with a null source or target form no atom. Null or non-finite
/// products are skipped in the sums. A zero or undefined denominator yields
/// a weight of exactly `0.0`. Atoms come out ordered by key.
pub fn calculate_atoms(rows: &[InterpolationRow<'_>], n_vars: usize) -> Vec<Atom> {
    let keys: BTreeSet<AtomKey<'_>> = rows
        .iter()
        .filter_map(|r| Some((r.source?, r.target?)))
        .collect();

    let mut weights: BTreeMap<AtomKey<'_>, Vec<f64>> =
        keys.iter().map(|k| (*k, vec![0.0; n_vars])).collect();

    for var in 0..n_vars {
        let grouped = grouped_sum(rows, var);

        let mut denominator: HashMap<&str, f64> = HashMap::new();
        for (&(source, _), sum) in &grouped {
            *denominator.entry(source).or_default() += sum;
        }

        // keyed join onto the canonical key set; absent keys stay 0.0
        for (key, sum) in &grouped {
            let Some(slot) = weights.get_mut(key) else {
                continue;
            };
            let denom = denominator.get(key.0).copied().unwrap_or(0.0);
            slot[var] = normalize(*sum, denom);
        }
    }

    weights
        .into_iter()
        .map(|((source, target), w)| Atom::new(Some(source.to_string()), Some(target.to_string()), w))
        .collect()
}

fn grouped_sum<'a>(rows: &[InterpolationRow<'a>], var: usize) -> BTreeMap<AtomKey<'a>, f64> {
    let mut grouped: BTreeMap<AtomKey<'a>, f64> = BTreeMap::new();
    for row in rows {
        let (Some(source), Some(target)) = (row.source, row.target) else {
            continue;
        };
        let numerator = match (row.weight, row.values.get(var).copied().flatten()) {
            (Some(w), Some(v)) => w * v,
            _ => continue,
        };
        if numerator.is_finite() {
            *grouped.entry((source, target)).or_default() += numerator;
        }
    }
    grouped
}

fn normalize(sum: f64, denom: f64) -> f64 {
    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }
    let w = sum / denom;
    if w.is_finite() {
        w
    } else {
        0.0
    }
}

/// Aggregate joined base rows, reading variable values from `attributes`.
pub fn atoms_from_base(
    rows: &[BaseRow],
    attributes: &Table,
    spec: &WeightSpec,
) -> Result<Vec<Atom>, XwalkError> {
    let cols = spec
        .input_vars()
        .iter()
        .map(|v| attributes.column_index(v))
        .collect::<Result<Vec<_>, _>>()?;

    let mut interp = Vec::with_capacity(rows.len());
    for row in rows {
        let values = match row.attributes {
            Some(attr) => cols
                .iter()
                .zip(spec.input_vars())
                .map(|(&col, var)| parse_number(attributes.get(attr, col), var))
                .collect::<Result<Vec<_>, _>>()?,
            None => vec![None; cols.len()],
        };
        interp.push(InterpolationRow {
            source: row.source_id.as_deref(),
            target: row.target_id.as_deref(),
            weight: row.weight,
            values,
        });
    }

    let atoms = calculate_atoms(&interp, spec.len());
    log::debug!("aggregated {} base rows into {} atoms", rows.len(), atoms.len());
    Ok(atoms)
}

fn parse_number(cell: Option<&str>, column: &str) -> Result<Option<f64>, XwalkError> {
    match cell.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<f64>().map(Some).map_err(|_| XwalkError::InvalidNumber {
            column: column.to_string(),
            value: s.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
