//! State extraction, rounding, and canonical ordering of finished crosswalks.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::XwalkError;
use crate::geo::{CodeType, Endpoint, Side};
use crate::ids;
use crate::model::{Atom, Crosswalk};

/// Marker used for "no state": a null identifier.
pub const MISSING_STATE: &str = "nan";

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullPlacement {
    First,
    #[default]
    Last,
}

/// Finishing options, passed explicitly into [`finalize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishConfig {
    #[serde(default = "default_round")]
    pub round: bool,
    #[serde(default = "default_decimals")]
    pub decimals: u32,
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
    #[serde(default)]
    pub nulls: NullPlacement,
}

fn default_round() -> bool {
    true
}
fn default_decimals() -> u32 {
    10
}
fn default_name_prefix() -> String {
    "xwalk".into()
}

impl Default for FinishConfig {
    fn default() -> Self {
        Self {
            round: default_round(),
            decimals: default_decimals(),
            name_prefix: default_name_prefix(),
            nulls: NullPlacement::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Naming
// ---------------------------------------------------------------------------

/// `<prefix>_<source>_<target>[_<fips>]`
pub fn crosswalk_name(prefix: &str, source: Endpoint, target: Endpoint, state: Option<&str>) -> String {
    let mut name = format!("{prefix}_{source}_{target}");
    if let Some(fips) = state {
        name.push('_');
        name.push_str(fips);
    }
    name
}

/// A crosswalk name ending in a two-digit state code is a state subset.
pub fn is_state_subset(name: &str) -> bool {
    name.rsplit_once('_')
        .map(|(_, tail)| is_fips(tail))
        .unwrap_or(false)
}

fn is_fips(s: &str) -> bool {
    s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit())
}

// ---------------------------------------------------------------------------
// State selection
// ---------------------------------------------------------------------------

/// Which rows a state extraction keeps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateSelector {
    /// Rows whose id lies in this two-digit state.
    Fips(String),
    /// Rows whose id is null.
    Missing,
}

impl FromStr for StateSelector {
    type Err = XwalkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(MISSING_STATE) {
            Ok(Self::Missing)
        } else if is_fips(s) {
            Ok(Self::Fips(s.to_string()))
        } else {
            Err(XwalkError::ConfigValidation(format!(
                "state code must be two digits or '{MISSING_STATE}', got '{s}'"
            )))
        }
    }
}

impl fmt::Display for StateSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fips(code) => f.write_str(code),
            Self::Missing => f.write_str(MISSING_STATE),
        }
    }
}

/// State code of a composite id as seen through the given identifier style.
fn state_of(id: &str, code: CodeType) -> Option<String> {
    match code {
        CodeType::Gj => ids::state_slice(id, CodeType::Gj).map(str::to_string),
        CodeType::Ge => {
            let geoid = ids::to_geoid(id).ok()?;
            ids::state_slice(&geoid, CodeType::Ge).map(str::to_string)
        }
    }
}

/// Keep the rows of `crosswalk` whose `column` lies in the selected state.
///
/// `column` is any identifier column of the output (`tr2010gj`, `tr2010ge`).
/// Extracting from a crosswalk that is already a state subset is an error.
pub fn extract_state(
    crosswalk: &Crosswalk,
    selector: &StateSelector,
    column: &str,
) -> Result<Crosswalk, XwalkError> {
    if crosswalk.is_state_subset() {
        return Err(XwalkError::AlreadyStateSubset(crosswalk.name.clone()));
    }
    let (side, code) = crosswalk
        .id_column(column)
        .filter(|_| crosswalk.columns().iter().any(|c| c == column))
        .ok_or_else(|| XwalkError::MissingColumn {
            table: crosswalk.name.clone(),
            column: column.to_string(),
        })?;

    let atoms: Vec<Atom> = crosswalk
        .atoms
        .iter()
        .filter(|a| match (selector, a.id(side)) {
            (StateSelector::Missing, id) => id.is_none(),
            (StateSelector::Fips(_), None) => false,
            (StateSelector::Fips(fips), Some(id)) => state_of(id, code).as_deref() == Some(fips.as_str()),
        })
        .cloned()
        .collect();

    let (name, state) = match selector {
        StateSelector::Fips(fips) => (format!("{}_{fips}", crosswalk.name), Some(fips.clone())),
        StateSelector::Missing => (crosswalk.name.clone(), None),
    };
    log::info!(
        "extracted {} of {} rows for state {selector} on {column}",
        atoms.len(),
        crosswalk.atoms.len()
    );
    Ok(Crosswalk {
        name,
        state,
        atoms,
        ..crosswalk.clone_header()
    })
}

/// Ordered set of state codes on one side, with `"nan"` for null ids.
pub fn extract_unique_stfips(crosswalk: &Crosswalk, side: Side) -> BTreeSet<String> {
    crosswalk
        .atoms
        .iter()
        .map(|a| match a.id(side) {
            Some(id) => ids::state_slice(id, CodeType::Gj).unwrap_or_default().to_string(),
            None => MISSING_STATE.to_string(),
        })
        .collect()
}

/// One state-suffixed crosswalk per state code on `side`; null ids are left out.
pub fn split_by_state(crosswalk: &Crosswalk, side: Side) -> Result<Vec<Crosswalk>, XwalkError> {
    let column = crosswalk.endpoint(side).column(CodeType::Gj);
    extract_unique_stfips(crosswalk, side)
        .into_iter()
        .filter(|fips| is_fips(fips))
        .map(|fips| extract_state(crosswalk, &StateSelector::Fips(fips), &column))
        .collect()
}

// ---------------------------------------------------------------------------
// Rounding and ordering
// ---------------------------------------------------------------------------

/// Finest rounding precision accepted in `[finish] decimals`.
pub const MAX_DECIMALS: u32 = 15;

/// Round every weight to `decimals` places. Precision finer than
/// [`MAX_DECIMALS`] is below f64 resolution and leaves weights untouched.
pub fn round_weights(crosswalk: &mut Crosswalk, decimals: u32) {
    if decimals > MAX_DECIMALS {
        return;
    }
    let scale = 10f64.powi(decimals as i32);
    for atom in &mut crosswalk.atoms {
        for w in &mut atom.weights {
            *w = (*w * scale).round() / scale;
        }
    }
}

fn cmp_nullable(a: Option<&str>, b: Option<&str>, nulls: NullPlacement) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => match nulls {
            NullPlacement::First => Ordering::Less,
            NullPlacement::Last => Ordering::Greater,
        },
        (Some(_), None) => match nulls {
            NullPlacement::First => Ordering::Greater,
            NullPlacement::Last => Ordering::Less,
        },
    }
}

/// Ascending by (source, target).
pub fn sort_atoms(atoms: &mut [Atom], nulls: NullPlacement) {
    atoms.sort_by(|a, b| {
        cmp_nullable(a.source.as_deref(), b.source.as_deref(), nulls)
            .then_with(|| cmp_nullable(a.target.as_deref(), b.target.as_deref(), nulls))
    });
}

/// Round (if configured) and sort into canonical order.
pub fn finalize(crosswalk: &mut Crosswalk, config: &FinishConfig) {
    if config.round {
        round_weights(crosswalk, config.decimals);
    }
    sort_atoms(&mut crosswalk.atoms, config.nulls);
}

impl Crosswalk {
    /// Copy of everything but the atoms.
    fn clone_header(&self) -> Crosswalk {
        Crosswalk {
            name: self.name.clone(),
            source: self.source,
            target: self.target,
            weight_columns: self.weight_columns.clone(),
            atoms: Vec::new(),
            state: self.state.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{CensusYear, Geography};

    fn atom(s: Option<&str>, t: Option<&str>, w: f64) -> Atom {
        Atom::new(s.map(String::from), t.map(String::from), vec![w])
    }

    fn sample() -> Crosswalk {
        Crosswalk {
            name: "xwalk_bgp1990_tr2010".into(),
            source: Endpoint::new(Geography::Bgp, CensusYear::Y1990),
            target: Endpoint::new(Geography::Tr, CensusYear::Y2010),
            weight_columns: vec!["wt_pop".into()],
            atoms: vec![
                atom(Some("G100001"), Some("G1000010042100"), 0.123456789012345),
                atom(Some("G020001"), Some("G0200010000100"), 1.0),
                atom(None, Some("G1000030000200"), 0.0),
                atom(Some("G100003"), None, 0.0),
                atom(Some("G100002"), Some("G1000010042100"), 0.5),
            ],
            state: None,
        }
    }

    #[test]
    fn selector_parsing() {
        assert_eq!("10".parse::<StateSelector>().unwrap(), StateSelector::Fips("10".into()));
        assert_eq!("NaN".parse::<StateSelector>().unwrap(), StateSelector::Missing);
        assert!("1".parse::<StateSelector>().is_err());
        assert!("ab".parse::<StateSelector>().is_err());
    }

    #[test]
    fn naming_and_subset_detection() {
        let src = Endpoint::new(Geography::Bgp, CensusYear::Y1990);
        let tgt = Endpoint::new(Geography::Tr, CensusYear::Y2010);
        assert_eq!(crosswalk_name("xwalk", src, tgt, None), "xwalk_bgp1990_tr2010");
        assert_eq!(crosswalk_name("nhgis", src, tgt, Some("10")), "nhgis_bgp1990_tr2010_10");
        assert!(is_state_subset("xwalk_bgp1990_tr2010_10"));
        assert!(!is_state_subset("xwalk_bgp1990_tr2010"));
    }

    #[test]
    fn extract_by_fips_in_both_styles() {
        let cw = sample();
        let gj = extract_state(&cw, &StateSelector::Fips("10".into()), "tr2010gj").unwrap();
        assert_eq!(gj.name, "xwalk_bgp1990_tr2010_10");
        assert_eq!(gj.state.as_deref(), Some("10"));
        assert_eq!(gj.len(), 3);
        assert!(gj
            .atoms
            .iter()
            .all(|a| ids::state_slice(a.target.as_deref().unwrap(), CodeType::Gj) == Some("10")));

        let ge = extract_state(&cw, &StateSelector::Fips("10".into()), "tr2010ge").unwrap();
        assert_eq!(ge.atoms, gj.atoms);
    }

    #[test]
    fn extract_missing_returns_null_rows() {
        let cw = sample();
        let missing = extract_state(&cw, &StateSelector::Missing, "tr2010gj").unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing.atoms[0].source.as_deref(), Some("G100003"));
    }

    #[test]
    fn extract_guards() {
        let cw = sample();
        let sub = extract_state(&cw, &StateSelector::Fips("02".into()), "bgp1990gj").unwrap();
        let err = extract_state(&sub, &StateSelector::Fips("02".into()), "bgp1990gj").unwrap_err();
        assert!(matches!(err, XwalkError::AlreadyStateSubset(_)));

        // block group parts have no census-code column
        let err = extract_state(&cw, &StateSelector::Missing, "bgp1990ge").unwrap_err();
        assert!(matches!(err, XwalkError::MissingColumn { .. }));
    }

    #[test]
    fn unique_states_and_split() {
        let cw = sample();
        let states: Vec<_> = extract_unique_stfips(&cw, Side::Target).into_iter().collect();
        assert_eq!(states, vec!["02", "10", "nan"]);

        let parts = split_by_state(&cw, Side::Target).unwrap();
        let names: Vec<_> = parts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["xwalk_bgp1990_tr2010_02", "xwalk_bgp1990_tr2010_10"]);
        assert_eq!(parts.iter().map(Crosswalk::len).sum::<usize>(), 4);
    }

    #[test]
    fn finalize_rounds_and_sorts_nulls_last() {
        let mut cw = sample();
        finalize(&mut cw, &FinishConfig::default());
        let keys: Vec<_> = cw.atoms.iter().map(Atom::key).collect();
        assert_eq!(
            keys,
            vec![
                (Some("G020001"), Some("G0200010000100")),
                (Some("G100001"), Some("G1000010042100")),
                (Some("G100002"), Some("G1000010042100")),
                (Some("G100003"), None),
                (None, Some("G1000030000200")),
            ]
        );
        assert_eq!(cw.atoms[1].weights[0], 0.1234567890);
    }

    #[test]
    fn rounding_to_configured_precision() {
        let mut cw = sample();
        round_weights(&mut cw, 3);
        assert_eq!(cw.atoms[0].weights, vec![0.123]);

        let mut cw = sample();
        round_weights(&mut cw, MAX_DECIMALS + 5);
        assert_eq!(cw.atoms[0].weights, sample().atoms[0].weights);
    }

    #[test]
    fn nulls_first_when_configured() {
        let mut atoms = sample().atoms;
        sort_atoms(&mut atoms, NullPlacement::First);
        assert_eq!(atoms[0].source, None);
    }
}
