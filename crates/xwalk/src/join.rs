//! Attaching attribute tables to the base crosswalk.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::XwalkError;
use crate::model::BaseRow;
use crate::table::Table;

/// Transform applied to the attribute table before the join, e.g. deriving
/// an urban/rural column the identifier scheme needs.
pub trait PreMergeTransform {
    fn apply(&self, attributes: &mut Table) -> Result<(), XwalkError>;
}

impl<F> PreMergeTransform for F
where
    F: Fn(&mut Table) -> Result<(), XwalkError>,
{
    fn apply(&self, attributes: &mut Table) -> Result<(), XwalkError> {
        self(attributes)
    }
}

/// Allowed key multiplicity on each side of the join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToOne,
    #[default]
    ManyToMany,
}

impl Cardinality {
    fn left_unique(self) -> bool {
        matches!(self, Self::OneToOne | Self::OneToMany)
    }

    fn right_unique(self) -> bool {
        matches!(self, Self::OneToOne | Self::ManyToOne)
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OneToOne => write!(f, "one-to-one"),
            Self::OneToMany => write!(f, "one-to-many"),
            Self::ManyToOne => write!(f, "many-to-one"),
            Self::ManyToMany => write!(f, "many-to-many"),
        }
    }
}

/// Left-merge `attributes` onto the base rows by `source_base == key_column`.
///
/// Every base row survives. A base row whose key matches `k` attribute rows
/// is emitted `k` times, once per match; an unmatched row is emitted once with
/// no attributes. Key multiplicities are checked against `validate` first.
pub fn join_attributes(
    base: Vec<BaseRow>,
    attributes: &Table,
    key_column: &str,
    validate: Cardinality,
) -> Result<Vec<BaseRow>, XwalkError> {
    let key_col = attributes.column_index(key_column)?;

    let mut by_key: HashMap<&str, Vec<usize>> = HashMap::new();
    for row in 0..attributes.len() {
        if let Some(key) = attributes.get(row, key_col) {
            by_key.entry(key).or_default().push(row);
        }
    }

    if validate.right_unique() {
        if let Some((key, _)) = by_key.iter().find(|(_, rows)| rows.len() > 1) {
            return Err(XwalkError::JoinCardinality {
                table: attributes.name.clone(),
                key: key.to_string(),
                expected: validate.to_string(),
            });
        }
    }
    if validate.left_unique() {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for row in &base {
            let n = seen.entry(row.source_base.as_str()).or_default();
            *n += 1;
            if *n > 1 {
                return Err(XwalkError::JoinCardinality {
                    table: "base".into(),
                    key: row.source_base.clone(),
                    expected: validate.to_string(),
                });
            }
        }
    }

    let mut joined = Vec::with_capacity(base.len());
    let mut matched = 0usize;
    for row in base {
        match by_key.get(row.source_base.as_str()) {
            Some(rows) => {
                matched += 1;
                for &attr in rows {
                    let mut dup = row.clone();
                    dup.attributes = Some(attr);
                    joined.push(dup);
                }
            }
            None => joined.push(row),
        }
    }
    log::debug!(
        "joined '{}' on {key_column}: {matched} base rows matched, {} rows out",
        attributes.name,
        joined.len()
    );
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs() -> Table {
        Table::from_rows(
            "attrs",
            &["GISJOIN", "POP"],
            [["b1", "10"], ["b2", "20"], ["b2", "25"]],
        )
        .unwrap()
    }

    fn base() -> Vec<BaseRow> {
        vec![
            BaseRow::new("b1", "t1", 1.0),
            BaseRow::new("b2", "t1", 0.5),
            BaseRow::new("b2", "t2", 0.5),
            BaseRow::new("b9", "t2", 1.0),
        ]
    }

    #[test]
    fn left_merge_keeps_and_duplicates_rows() {
        let joined = join_attributes(base(), &attrs(), "GISJOIN", Cardinality::ManyToMany).unwrap();
        assert_eq!(joined.len(), 6);

        let b1: Vec<_> = joined.iter().filter(|r| r.source_base == "b1").collect();
        assert_eq!(b1.len(), 1);
        assert_eq!(b1[0].attributes, Some(0));

        let b2_rows: Vec<_> = joined
            .iter()
            .filter(|r| r.source_base == "b2")
            .map(|r| r.attributes)
            .collect();
        assert_eq!(b2_rows, vec![Some(1), Some(2), Some(1), Some(2)]);

        let unmatched: Vec<_> = joined.iter().filter(|r| r.source_base == "b9").collect();
        assert_eq!(unmatched.len(), 1);
        assert_eq!(unmatched[0].attributes, None);
    }

    #[test]
    fn cardinality_violations_fail_fast() {
        let err = join_attributes(base(), &attrs(), "GISJOIN", Cardinality::ManyToOne).unwrap_err();
        assert!(matches!(err, XwalkError::JoinCardinality { ref key, .. } if key == "b2"));

        let unique_attrs = Table::from_rows("a", &["GISJOIN"], [["b1"], ["b2"]]).unwrap();
        let err = join_attributes(base(), &unique_attrs, "GISJOIN", Cardinality::OneToOne).unwrap_err();
        assert!(err.to_string().contains("one-to-one"));
    }

    #[test]
    fn missing_key_column() {
        let err = join_attributes(base(), &attrs(), "GJOIN1990", Cardinality::ManyToMany).unwrap_err();
        assert!(matches!(err, XwalkError::MissingColumn { .. }));
    }

    #[test]
    fn closure_hook() {
        let hook = |t: &mut Table| {
            let n = t.len();
            t.set_column("URBRURALA", vec![Some("9".to_string()); n])
        };
        let mut t = attrs();
        hook.apply(&mut t).unwrap();
        assert_eq!(t.row(2).get("URBRURALA"), Some("9"));
    }
}
