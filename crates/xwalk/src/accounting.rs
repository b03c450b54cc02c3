use std::collections::BTreeSet;

use crate::model::{AccountingReport, Atom, BaseRow};

/// Ensure every id derived on the base crosswalk appears in at least one atom.
///
/// Each missing source id gets a `(id, null)` placeholder, each missing target
/// id a `(null, id)` placeholder, all weights `0.0`. Null ids are not
/// accounted. Running this twice appends nothing the second time.
pub fn reconcile_accounting(base: &[BaseRow], atoms: &mut Vec<Atom>, n_vars: usize) -> AccountingReport {
    let (base_sources, base_targets) = distinct_ids(base.iter().map(|r| (r.source_id.as_deref(), r.target_id.as_deref())));
    let (atom_sources, atom_targets) = distinct_ids(atoms.iter().map(Atom::key));

    let report = AccountingReport {
        unmatched_source: base_sources.difference(&atom_sources).map(|s| s.to_string()).collect(),
        unmatched_target: base_targets.difference(&atom_targets).map(|s| s.to_string()).collect(),
    };

    for id in &report.unmatched_source {
        atoms.push(Atom::zero(Some(id.clone()), None, n_vars));
    }
    for id in &report.unmatched_target {
        atoms.push(Atom::zero(None, Some(id.clone()), n_vars));
    }
    if report.placeholders() > 0 {
        log::debug!(
            "accounting: {} unmatched source, {} unmatched target ids",
            report.unmatched_source.len(),
            report.unmatched_target.len()
        );
    }
    report
}

fn distinct_ids<'a>(
    pairs: impl Iterator<Item = (Option<&'a str>, Option<&'a str>)>,
) -> (BTreeSet<&'a str>, BTreeSet<&'a str>) {
    let mut sources = BTreeSet::new();
    let mut targets = BTreeSet::new();
    for (s, t) in pairs {
        sources.extend(s);
        targets.extend(t);
    }
    (sources, targets)
}
