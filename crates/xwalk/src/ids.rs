//! Composite geographic identifiers.
//!
//! A composite identifier is the `G` marker followed by the ordered component
//! codes of a geography (state, county, tract, ...). State and county codes
//! carry one padding zero each, so a 2010 tract reads
//! `G` + `10` + `0` + `001` + `0` + `042100` = `G1000010042100`.
//!
//! Coarser identifiers are prefixes of finer ones of the same lineage, which
//! is what [`truncate`] relies on.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use crate::error::XwalkError;
use crate::geo::CodeType;

/// Leading marker of composite identifiers.
pub const GJ_MARKER: char = 'G';

/// Anything that can answer "what is the value of column X for this row".
///
/// Values come back trimmed; `None` means the value is absent (an empty or
/// whitespace-only cell).
pub trait Record {
    fn value(&self, column: &str) -> Option<&str>;
}

/// Trimmed cell, or `None` when nothing is left.
pub fn present(cell: Option<&str>) -> Option<&str> {
    cell.map(str::trim).filter(|v| !v.is_empty())
}

impl<S: BuildHasher> Record for HashMap<String, String, S> {
    fn value(&self, column: &str) -> Option<&str> {
        present(self.get(column).map(String::as_str))
    }
}

impl Record for BTreeMap<&str, &str> {
    fn value(&self, column: &str) -> Option<&str> {
        present(self.get(column).copied())
    }
}

/// Build a composite identifier from `record`.
///
/// Components are concatenated in `order`; every component named in
/// `trailing_zero` gets a `0` appended, present or not. An absent interior
/// component contributes nothing. When the last component is absent the
/// geography does not exist for this record and the result is `None`.
pub fn compose<R: Record + ?Sized>(
    record: &R,
    order: &[&str],
    trailing_zero: &[&str],
) -> Option<String> {
    let last = order.last()?;
    record.value(last)?;

    let mut id = String::with_capacity(1 + order.len() * 4);
    id.push(GJ_MARKER);
    for column in order {
        if let Some(v) = record.value(column) {
            id.push_str(v);
        }
        if trailing_zero.contains(column) {
            id.push('0');
        }
    }
    Some(id)
}

/// Slice a finer composite identifier down to its first `offset` characters.
pub fn truncate(finer: &str, offset: usize) -> Result<String, XwalkError> {
    if !finer.starts_with(GJ_MARKER) {
        return Err(XwalkError::InvalidIdentifier {
            id: finer.into(),
            reason: format!("missing '{GJ_MARKER}' marker"),
        });
    }
    finer
        .get(..offset)
        .map(str::to_string)
        .ok_or_else(|| XwalkError::InvalidIdentifier {
            id: finer.into(),
            reason: format!("shorter than truncation offset {offset}"),
        })
}

/// Convert a composite identifier to its plain census code.
///
/// Drops the marker and the padding zeros that follow the state (index 3)
/// and county (index 7) codes: `G1000010042100` → `10001042100`.
pub fn to_geoid(gj: &str) -> Result<String, XwalkError> {
    let invalid = |reason: &str| XwalkError::InvalidIdentifier {
        id: gj.into(),
        reason: reason.into(),
    };
    if !gj.starts_with(GJ_MARKER) {
        return Err(invalid("missing 'G' marker"));
    }
    if !gj.is_ascii() || gj.len() < 8 {
        return Err(invalid("too short for a county-level identifier"));
    }
    let bytes = gj.as_bytes();
    if bytes[3] != b'0' || bytes[7] != b'0' {
        return Err(invalid("state/county padding zeros not found"));
    }
    let mut geoid = String::with_capacity(gj.len() - 3);
    geoid.push_str(&gj[1..3]);
    geoid.push_str(&gj[4..7]);
    geoid.push_str(&gj[8..]);
    Ok(geoid)
}

/// The state FIPS slice of an identifier in the given style.
pub fn state_slice(id: &str, code: CodeType) -> Option<&str> {
    match code {
        CodeType::Gj => id.get(1..3),
        CodeType::Ge => id.get(0..2),
    }
}
