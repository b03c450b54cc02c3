use std::collections::HashSet;

use crate::accounting::reconcile_accounting;
use crate::atoms::atoms_from_base;
use crate::config::XwalkConfig;
use crate::error::XwalkError;
use crate::finish::finalize;
use crate::geo::{CensusYear, CodeType, Geography, Role};
use crate::ids::{self, Record};
use crate::join::{join_attributes, PreMergeTransform};
use crate::model::{BaseCrosswalk, BaseRow, Crosswalk, CrosswalkMeta, CrosswalkResult};
use crate::nodata::{reconcile_nodata, NoDataSchemes};
use crate::registry;
use crate::table::Table;

/// Pre-loaded tables for one build.
pub struct XwalkInput {
    pub base: BaseCrosswalk,
    /// Source-year attribute table keyed by the tabular id column.
    pub attributes: Table,
    /// National block group part table, required for 1990 block group parts.
    pub supplement: Option<Table>,
    /// Applied to `attributes` before the join.
    pub pre_merge: Option<Box<dyn PreMergeTransform>>,
}

impl XwalkInput {
    pub fn new(base: BaseCrosswalk, attributes: Table) -> Self {
        Self {
            base,
            attributes,
            supplement: None,
            pre_merge: None,
        }
    }

    pub fn with_supplement(mut self, supplement: Table) -> Self {
        self.supplement = Some(supplement);
        self
    }

    pub fn with_pre_merge(mut self, hook: impl PreMergeTransform + 'static) -> Self {
        self.pre_merge = Some(Box::new(hook));
        self
    }
}

/// Build one crosswalk. Stages run strictly in order; any error aborts the build.
pub fn run(config: &XwalkConfig, input: XwalkInput) -> Result<CrosswalkResult, XwalkError> {
    config.validate()?;
    let schemes = config.schemes()?;
    let spec = config.weight_spec()?;
    let n_vars = spec.len();

    let XwalkInput {
        base,
        mut attributes,
        supplement,
        pre_merge,
    } = input;

    let supplement = match (config.needs_supplement(), supplement) {
        (true, None) => {
            let endpoint = if config.source().is_bgp1990() {
                config.source()
            } else {
                config.target()
            };
            return Err(XwalkError::MissingSupplement {
                endpoint: endpoint.label(),
            });
        }
        (true, Some(table)) => Some(table),
        (false, _) => None,
    };

    log::info!(
        "building {} from {} base rows and {} attribute rows",
        config.crosswalk_name(),
        base.len(),
        attributes.len()
    );

    // Optional single-state build, by target state of the base rows
    let mut rows = base.rows;
    if let Some(ref fips) = config.stfips {
        rows.retain(|r| ids::state_slice(&r.target_base, CodeType::Gj) == Some(fips.as_str()));
        log::info!("state {fips}: {} base rows kept", rows.len());
    }
    let base_rows = rows.len();

    if let Some(hook) = pre_merge {
        hook.apply(&mut attributes)?;
    }

    // Every component column of a composed id must exist.
    if schemes.source.offset.is_none() {
        attributes.require_columns(schemes.source.columns)?;
    }
    let block_group = registry::lookup(Role::Supplement, Geography::Bg, CensusYear::Y1990)?;
    if let Some(ref table) = supplement {
        table.require_columns(schemes.source.columns)?;
        table.require_columns(block_group.columns)?;
    }

    let mut joined = join_attributes(rows, &attributes, &config.base.tabular_key, config.join)?;
    log::info!("joined attributes: {} rows", joined.len());

    derive_ids(&mut joined, &attributes, config)?;

    let mut atoms = atoms_from_base(&joined, &attributes, &spec)?;
    log::info!("aggregated {} atoms", atoms.len());

    let nodata = match supplement {
        Some(ref table) => {
            let key = attributes.column_index(&config.base.tabular_key)?;
            let populated: HashSet<&str> = (0..attributes.len())
                .filter_map(|row| attributes.get(row, key))
                .collect();
            let nodata_schemes = NoDataSchemes {
                part: schemes.source,
                block_group,
                target: schemes.target,
            };
            let report = reconcile_nodata(&joined, &populated, table, &nodata_schemes, &mut atoms, n_vars)?;
            log::info!(
                "no-data reconciliation: {} atoms appended, {} block groups unresolved",
                report.appended,
                report.unresolved_block_groups.len()
            );
            Some(report)
        }
        None => None,
    };

    let accounting = reconcile_accounting(&joined, &mut atoms, n_vars);
    log::info!("accounting: {} placeholders appended", accounting.placeholders());

    let mut crosswalk = Crosswalk {
        name: config.crosswalk_name(),
        source: config.source(),
        target: config.target(),
        weight_columns: spec.weight_columns(),
        atoms,
        state: config.stfips.clone(),
    };
    finalize(&mut crosswalk, &config.finish);
    log::info!("{}: {} rows", crosswalk.name, crosswalk.len());

    let base = config.keep_base.then(|| {
        BaseCrosswalk::new(config.source_column(), config.target_column(), joined)
    });

    Ok(CrosswalkResult {
        meta: CrosswalkMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            built_at: chrono::Utc::now().to_rfc3339(),
            source: config.source(),
            target: config.target(),
            input_vars: spec.input_vars().to_vec(),
            base_rows,
            attribute_rows: attributes.len(),
        },
        crosswalk,
        nodata,
        accounting,
        base,
    })
}

/// Compose source ids from joined attributes and truncate target ids from
/// the base target blocks.
fn derive_ids(rows: &mut [BaseRow], attributes: &Table, config: &XwalkConfig) -> Result<(), XwalkError> {
    let schemes = config.schemes()?;
    for row in rows.iter_mut() {
        let record = row.attributes.map(|i| attributes.row(i));
        let record = record.as_ref().map(|r| r as &dyn Record);
        row.source_id = schemes.source.derive(&row.source_base, record)?;
        row.target_id = schemes.target.derive(&row.target_base, None)?;
    }
    let unmatched = rows.iter().filter(|r| r.source_id.is_none()).count();
    log::debug!("derived ids; {unmatched} rows have no source id");
    Ok(())
}
