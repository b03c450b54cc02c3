//! Identifier scheme registry.
//!
//! Every supported (role, geography, year) combination maps to one
//! [`IdScheme`]: the ordered component columns that compose the identifier and,
//! when the geography is a prefix of the base block identifier, the truncation
//! offset. Only combinations whose layout has been checked against published
//! identifiers are listed; everything else is rejected at lookup.

use crate::error::XwalkError;
use crate::geo::{CensusYear, Geography, Role};
use crate::ids::{self, Record};

const PADDED: &[&str] = &["STATEA", "COUNTYA"];

const BLK_COLUMNS: &[&str] = &["STATEA", "COUNTYA", "TRACTA", "BLOCKA"];

const BGP1990_COLUMNS: &[&str] = &[
    "STATEA",
    "COUNTYA",
    "CTY_SUBA",
    "PLACEA",
    "TRACTA",
    "CDA",
    "AIANHHA",
    "RES_TRSTA",
    "ANRCA",
    "URB_AREAA",
    "URBRURALA",
    "BLCK_GRPA",
];

const BGP2000_COLUMNS: &[&str] = &[
    "STATEA",
    "COUNTYA",
    "CTY_SUBA",
    "PLACEA",
    "TRACTA",
    "URBRURALA",
    "BLCK_GRPA",
];

const BG1990_COLUMNS: &[&str] = &["STATEA", "COUNTYA", "TRACTA", "BLCK_GRPA"];
const BG2010_COLUMNS: &[&str] = &["STATEA", "COUNTYA", "TRACTA", "BLKGRPA"];
const TR_COLUMNS: &[&str] = &["STATEA", "COUNTYA", "TRACTA"];
const CO_COLUMNS: &[&str] = &["STATEA", "COUNTYA"];

/// How one (role, geography, year) identifier is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdScheme {
    pub role: Role,
    pub geo: Geography,
    pub year: CensusYear,
    /// Component columns in identifier order.
    pub columns: &'static [&'static str],
    /// Components followed by a padding zero.
    pub trailing_zero: &'static [&'static str],
    /// Prefix length within the base block identifier, when the geography nests
    /// in blocks of the same vintage.
    pub offset: Option<usize>,
}

const fn scheme(
    role: Role,
    geo: Geography,
    year: CensusYear,
    columns: &'static [&'static str],
    offset: Option<usize>,
) -> IdScheme {
    IdScheme {
        role,
        geo,
        year,
        columns,
        trailing_zero: PADDED,
        offset,
    }
}

static REGISTRY: &[IdScheme] = &[
    scheme(Role::Base, Geography::Blk, CensusYear::Y1990, BLK_COLUMNS, None),
    scheme(Role::Base, Geography::Blk, CensusYear::Y2000, BLK_COLUMNS, None),
    scheme(Role::Base, Geography::Blk, CensusYear::Y2010, BLK_COLUMNS, None),
    scheme(Role::Source, Geography::Bgp, CensusYear::Y1990, BGP1990_COLUMNS, None),
    scheme(Role::Source, Geography::Bgp, CensusYear::Y2000, BGP2000_COLUMNS, None),
    scheme(Role::Target, Geography::Tr, CensusYear::Y2010, TR_COLUMNS, Some(14)),
    scheme(Role::Target, Geography::Bg, CensusYear::Y2010, BG2010_COLUMNS, Some(15)),
    scheme(Role::Target, Geography::Co, CensusYear::Y2010, CO_COLUMNS, Some(8)),
    scheme(Role::Supplement, Geography::Bg, CensusYear::Y1990, BG1990_COLUMNS, Some(15)),
];

/// Look up the scheme for a (role, geography, year) combination.
pub fn lookup(role: Role, geo: Geography, year: CensusYear) -> Result<&'static IdScheme, XwalkError> {
    REGISTRY
        .iter()
        .find(|s| s.role == role && s.geo == geo && s.year == year)
        .ok_or_else(|| XwalkError::Unsupported {
            op: "identifier lookup",
            role: role.to_string(),
            geo: geo.to_string(),
            year: year.to_string(),
        })
}

/// All registered schemes, in registry order.
pub fn entries() -> &'static [IdScheme] {
    REGISTRY
}

impl IdScheme {
    pub fn compose<R: Record + ?Sized>(&self, record: &R) -> Option<String> {
        ids::compose(record, self.columns, self.trailing_zero)
    }

    pub fn truncate(&self, finer: &str) -> Result<String, XwalkError> {
        let offset = self.offset.ok_or_else(|| self.unsupported("truncation"))?;
        ids::truncate(finer, offset)
    }

    /// Derive this geography's identifier for one base row.
    ///
    /// Nesting geographies are sliced from the base identifier; the rest are
    /// composed from the row's joined attributes. A row without attributes
    /// yields `None`.
    pub fn derive(
        &self,
        base_id: &str,
        record: Option<&dyn Record>,
    ) -> Result<Option<String>, XwalkError> {
        if self.offset.is_some() {
            return self.truncate(base_id).map(Some);
        }
        Ok(record.and_then(|r| self.compose(r)))
    }

    fn unsupported(&self, op: &'static str) -> XwalkError {
        XwalkError::Unsupported {
            op,
            role: self.role.to_string(),
            geo: self.geo.to_string(),
            year: self.year.to_string(),
        }
    }
}
