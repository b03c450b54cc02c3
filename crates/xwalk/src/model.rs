use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::XwalkError;
use crate::geo::{CodeType, Endpoint, Side};
use crate::ids;

// ---------------------------------------------------------------------------
// Base crosswalk
// ---------------------------------------------------------------------------

/// One row of the elemental (block-to-block) crosswalk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseRow {
    pub source_base: String,
    pub target_base: String,
    /// Elemental weight in [0, 1].
    pub weight: Option<f64>,
    pub area: Option<f64>,
    /// Row of the attribute table joined onto this base row, if any.
    #[serde(skip)]
    pub attributes: Option<usize>,
    /// Source composite id derived after the join.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
}

impl BaseRow {
    pub fn new(source_base: impl Into<String>, target_base: impl Into<String>, weight: f64) -> Self {
        Self {
            source_base: source_base.into(),
            target_base: target_base.into(),
            weight: Some(weight),
            area: None,
            attributes: None,
            source_id: None,
            target_id: None,
        }
    }
}

/// Pre-loaded elemental crosswalk, with the column names it was read from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseCrosswalk {
    pub source_column: String,
    pub target_column: String,
    pub rows: Vec<BaseRow>,
}

impl BaseCrosswalk {
    pub fn new(
        source_column: impl Into<String>,
        target_column: impl Into<String>,
        rows: Vec<BaseRow>,
    ) -> Self {
        Self {
            source_column: source_column.into(),
            target_column: target_column.into(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct source block ids, in order.
    pub fn source_bases(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|r| r.source_base.as_str()).collect()
    }
}

// ---------------------------------------------------------------------------
// Atoms and crosswalks
// ---------------------------------------------------------------------------

/// One row of a crosswalk: a (source, target) link with one weight per
/// declared variable. Either id may be null for accounting placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    pub source: Option<String>,
    pub target: Option<String>,
    pub weights: Vec<f64>,
}

impl Atom {
    pub fn new(source: Option<String>, target: Option<String>, weights: Vec<f64>) -> Self {
        Self { source, target, weights }
    }

    /// A link that carries no interpolation mass.
    pub fn zero(source: Option<String>, target: Option<String>, n_vars: usize) -> Self {
        Self::new(source, target, vec![0.0; n_vars])
    }

    pub fn id(&self, side: Side) -> Option<&str> {
        match side {
            Side::Source => self.source.as_deref(),
            Side::Target => self.target.as_deref(),
        }
    }

    /// (source, target) key with nulls as `None`.
    pub fn key(&self) -> (Option<&str>, Option<&str>) {
        (self.source.as_deref(), self.target.as_deref())
    }
}

/// Crosswalk between two endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crosswalk {
    pub name: String,
    pub source: Endpoint,
    pub target: Endpoint,
    /// Output weight column names, in declared order.
    pub weight_columns: Vec<String>,
    pub atoms: Vec<Atom>,
    /// Two-digit state code when this is a single-state subset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl Crosswalk {
    pub fn endpoint(&self, side: Side) -> Endpoint {
        match side {
            Side::Source => self.source,
            Side::Target => self.target,
        }
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Output header: composite id columns, GEOID companions, weights.
    pub fn columns(&self) -> Vec<String> {
        let mut cols = vec![
            self.source.column(CodeType::Gj),
            self.target.column(CodeType::Gj),
        ];
        for ep in [self.source, self.target] {
            if ep.geo.has_geoid() {
                cols.push(ep.column(CodeType::Ge));
            }
        }
        cols.extend(self.weight_columns.iter().cloned());
        cols
    }

    /// Resolve a column name to the endpoint side and identifier style it holds.
    pub fn id_column(&self, column: &str) -> Option<(Side, CodeType)> {
        let (ep, code) = Endpoint::parse_column(column)?;
        if ep == self.source {
            Some((Side::Source, code))
        } else if ep == self.target {
            Some((Side::Target, code))
        } else {
            None
        }
    }

    /// One output row as text cells aligned with [`Crosswalk::columns`].
    /// Null ids render as empty cells.
    pub fn render_row(&self, atom: &Atom) -> Result<Vec<String>, XwalkError> {
        let mut row = Vec::with_capacity(4 + atom.weights.len());
        row.push(atom.source.clone().unwrap_or_default());
        row.push(atom.target.clone().unwrap_or_default());
        for (ep, id) in [(self.source, &atom.source), (self.target, &atom.target)] {
            if ep.geo.has_geoid() {
                row.push(match id {
                    Some(gj) => ids::to_geoid(gj)?,
                    None => String::new(),
                });
            }
        }
        row.extend(atom.weights.iter().map(|w| w.to_string()));
        Ok(row)
    }

    pub fn is_state_subset(&self) -> bool {
        self.state.is_some() || crate::finish::is_state_subset(&self.name)
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Outcome of 1990 no-data reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoDataReport {
    /// Base source blocks absent from the attribute table.
    pub unpopulated_blocks: usize,
    /// Unique (block group, target) candidates before expansion.
    pub candidates: usize,
    /// Candidates after expansion to block group parts.
    pub expanded: usize,
    /// Zero-weight atoms actually appended.
    pub appended: usize,
    /// No-data block groups with no block group part in the supplement.
    pub unresolved_block_groups: Vec<String>,
}

/// Ids present in the base crosswalk but missing from the atoms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountingReport {
    pub unmatched_source: Vec<String>,
    pub unmatched_target: Vec<String>,
}

impl AccountingReport {
    pub fn placeholders(&self) -> usize {
        self.unmatched_source.len() + self.unmatched_target.len()
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrosswalkMeta {
    pub engine_version: String,
    pub built_at: String,
    pub source: Endpoint,
    pub target: Endpoint,
    pub input_vars: Vec<String>,
    pub base_rows: usize,
    pub attribute_rows: usize,
}

/// Everything one build produces. Sub-results are always present;
/// `nodata` is `None` only when neither endpoint needed reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrosswalkResult {
    pub meta: CrosswalkMeta,
    pub crosswalk: Crosswalk,
    pub nodata: Option<NoDataReport>,
    pub accounting: AccountingReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<BaseCrosswalk>,
}
