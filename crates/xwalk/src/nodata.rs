//! Recovery of 1990 geographies omitted from the block summary files.
//!
//! Blocks without population are missing from the 1990 attribute tables, so
//! the block group parts they form never reach the aggregator. Those links are
//! rebuilt here at block group level, expanded to every block group part the
//! national supplementary table lists for the block group, and appended with
//! zero weight wherever no computed atom already covers the link.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::error::XwalkError;
use crate::model::{Atom, BaseRow, NoDataReport};
use crate::registry::IdScheme;
use crate::table::Table;

/// Identifier schemes the reconciliation composes with.
#[derive(Debug, Clone, Copy)]
pub struct NoDataSchemes<'a> {
    /// Block group part scheme, applied to supplementary rows.
    pub part: &'a IdScheme,
    /// Block group scheme: truncates base blocks and composes supplementary rows.
    pub block_group: &'a IdScheme,
    /// Scheme of the endpoint opposite the block group parts.
    pub target: &'a IdScheme,
}

/// Map each block group id in the supplementary table to its block group parts.
pub fn block_group_parts(
    supplement: &Table,
    schemes: &NoDataSchemes<'_>,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut mapping: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for row in supplement.rows() {
        let (Some(bg), Some(part)) = (schemes.block_group.compose(&row), schemes.part.compose(&row)) else {
            continue;
        };
        mapping.entry(bg).or_default().insert(part);
    }
    mapping
}

/// Append zero-weight atoms for links through unpopulated 1990 blocks.
///
/// `populated` holds the base source block ids present in the attribute table.
/// Candidates whose (source, target) key already exists in `atoms` are dropped:
/// the supplement fills gaps and never replaces a computed weight.
pub fn reconcile_nodata(
    base: &[BaseRow],
    populated: &HashSet<&str>,
    supplement: &Table,
    schemes: &NoDataSchemes<'_>,
    atoms: &mut Vec<Atom>,
    n_vars: usize,
) -> Result<NoDataReport, XwalkError> {
    let unpopulated: BTreeSet<&str> = base
        .iter()
        .map(|r| r.source_base.as_str())
        .filter(|id| !populated.contains(id))
        .collect();

    // (block group, target) candidates from rows through unpopulated blocks
    let mut candidates: BTreeSet<(String, String)> = BTreeSet::new();
    for row in base.iter().filter(|r| unpopulated.contains(r.source_base.as_str())) {
        let bg = schemes.block_group.truncate(&row.source_base)?;
        let Some(target) = schemes.target.derive(&row.target_base, None)? else {
            continue;
        };
        candidates.insert((bg, target));
    }
    log::debug!(
        "{} unpopulated blocks yield {} no-data candidates",
        unpopulated.len(),
        candidates.len()
    );

    let mapping = block_group_parts(supplement, schemes);

    let mut unresolved: BTreeSet<String> = BTreeSet::new();
    let mut expanded: BTreeSet<(String, String)> = BTreeSet::new();
    for (bg, target) in &candidates {
        match mapping.get(bg) {
            Some(parts) => {
                for part in parts {
                    expanded.insert((part.clone(), target.clone()));
                }
            }
            None => {
                unresolved.insert(bg.clone());
            }
        }
    }
    for bg in &unresolved {
        log::warn!("no-data block group {bg} has no block group part in the supplementary table");
    }

    let existing: HashSet<(Option<&str>, Option<&str>)> = atoms.iter().map(Atom::key).collect();
    let fresh: Vec<Atom> = expanded
        .iter()
        .filter(|(s, t)| !existing.contains(&(Some(s.as_str()), Some(t.as_str()))))
        .map(|(s, t)| Atom::zero(Some(s.clone()), Some(t.clone()), n_vars))
        .collect();

    let report = NoDataReport {
        unpopulated_blocks: unpopulated.len(),
        candidates: candidates.len(),
        expanded: expanded.len(),
        appended: fresh.len(),
        unresolved_block_groups: unresolved.into_iter().collect(),
    };
    atoms.extend(fresh);
    Ok(report)
}
