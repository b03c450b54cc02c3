use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::XwalkError;

// ---------------------------------------------------------------------------
// Geography
// ---------------------------------------------------------------------------

/// Census geographic unit. Serialized as its shorthand (`blk`, `bgp`, ...);
/// deserializes from the shorthand or the long name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Geography {
    Blk,
    Bgp,
    Bg,
    Tr,
    Co,
}

impl Geography {
    pub const ALL: [Geography; 5] = [Self::Blk, Self::Bgp, Self::Bg, Self::Tr, Self::Co];

    pub fn shorthand(&self) -> &'static str {
        match self {
            Self::Blk => "blk",
            Self::Bgp => "bgp",
            Self::Bg => "bg",
            Self::Tr => "tr",
            Self::Co => "co",
        }
    }

    pub fn long_name(&self) -> &'static str {
        match self {
            Self::Blk => "block",
            Self::Bgp => "block group part",
            Self::Bg => "block group",
            Self::Tr => "tract",
            Self::Co => "county",
        }
    }

    /// Block group parts have no census-code (GEOID) form.
    pub fn has_geoid(&self) -> bool {
        !matches!(self, Self::Bgp)
    }
}

impl fmt::Display for Geography {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.shorthand())
    }
}

impl FromStr for Geography {
    type Err = XwalkError;

    /// Accepts the shorthand or the long name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|g| g.shorthand() == wanted || g.long_name() == wanted)
            .ok_or_else(|| XwalkError::ConfigValidation(format!("unknown geography '{s}'")))
    }
}

impl TryFrom<String> for Geography {
    type Error = XwalkError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Geography> for String {
    fn from(geo: Geography) -> Self {
        geo.shorthand().to_string()
    }
}

/// Shorthand → long name lookup, or the reverse when `shorthand_name` is false.
pub fn valid_geo_shorthand(shorthand_name: bool) -> BTreeMap<&'static str, &'static str> {
    Geography::ALL
        .into_iter()
        .map(|g| {
            if shorthand_name {
                (g.shorthand(), g.long_name())
            } else {
                (g.long_name(), g.shorthand())
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Census year
// ---------------------------------------------------------------------------

/// Decennial census vintage. Deserializes from `1990` or `"1990"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "YearRepr", into = "String")]
pub enum CensusYear {
    Y1990,
    Y2000,
    Y2010,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum YearRepr {
    Number(u16),
    Text(String),
}

impl TryFrom<YearRepr> for CensusYear {
    type Error = XwalkError;

    fn try_from(repr: YearRepr) -> Result<Self, Self::Error> {
        match repr {
            YearRepr::Number(n) => n.to_string().parse(),
            YearRepr::Text(s) => s.parse(),
        }
    }
}

impl From<CensusYear> for String {
    fn from(year: CensusYear) -> Self {
        year.as_str().to_string()
    }
}

impl CensusYear {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Y1990 => "1990",
            Self::Y2000 => "2000",
            Self::Y2010 => "2010",
        }
    }
}

impl fmt::Display for CensusYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CensusYear {
    type Err = XwalkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1990" => Ok(Self::Y1990),
            "2000" => Ok(Self::Y2000),
            "2010" => Ok(Self::Y2010),
            other => Err(XwalkError::ConfigValidation(format!(
                "census year {other} is not supported"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Roles, sides, code styles
// ---------------------------------------------------------------------------

/// Role a geography plays in a crosswalk build, used as a registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Finest-grained units of the base crosswalk.
    Base,
    Source,
    Target,
    /// Block-group level used to reconcile 1990 no-data geographies.
    Supplement,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => write!(f, "base"),
            Self::Source => write!(f, "source"),
            Self::Target => write!(f, "target"),
            Self::Supplement => write!(f, "supplement"),
        }
    }
}

/// Which endpoint column of a crosswalk an operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Source,
    Target,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Target => write!(f, "target"),
        }
    }
}

/// Identifier style.
///
/// `Gj` is the composite style: a leading `G` marker with a padding zero after
/// the state and county codes. `Ge` is the plain census code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeType {
    #[default]
    Gj,
    Ge,
}

impl CodeType {
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Gj => "gj",
            Self::Ge => "ge",
        }
    }
}

impl fmt::Display for CodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// A geography at a census vintage, e.g. `bgp1990` or `tr2010`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub geo: Geography,
    pub year: CensusYear,
}

impl Endpoint {
    pub fn new(geo: Geography, year: CensusYear) -> Self {
        Self { geo, year }
    }

    /// `bgp1990`, `tr2010`, ...
    pub fn label(&self) -> String {
        format!("{}{}", self.geo, self.year)
    }

    /// Output column name for this endpoint in the given identifier style.
    pub fn column(&self, code: CodeType) -> String {
        format!("{}{}{}", self.geo, self.year, code)
    }

    /// Parse an output column name such as `tr2010ge` back into its parts.
    pub fn parse_column(column: &str) -> Option<(Endpoint, CodeType)> {
        if !column.is_ascii() {
            return None;
        }
        let code = if column.ends_with("gj") {
            CodeType::Gj
        } else if column.ends_with("ge") {
            CodeType::Ge
        } else {
            return None;
        };
        let stem = &column[..column.len() - 2];
        if stem.len() < 5 {
            return None;
        }
        let (geo, year) = stem.split_at(stem.len() - 4);
        let geo: Geography = geo.parse().ok()?;
        let year: CensusYear = year.parse().ok()?;
        Some((Endpoint::new(geo, year), code))
    }

    /// The 1990 block-group-part endpoint needs no-data reconciliation.
    pub fn is_bgp1990(&self) -> bool {
        self.geo == Geography::Bgp && self.year == CensusYear::Y1990
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.geo, self.year)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geography_parses_shorthand_and_long_name() {
        assert_eq!("bgp".parse::<Geography>().unwrap(), Geography::Bgp);
        assert_eq!("Block Group".parse::<Geography>().unwrap(), Geography::Bg);
        assert!("trt".parse::<Geography>().is_err());
    }

    #[test]
    fn shorthand_lookup_both_directions() {
        let forward = valid_geo_shorthand(true);
        assert_eq!(forward["bgp"], "block group part");
        assert_eq!(forward.len(), 5);

        let reverse = valid_geo_shorthand(false);
        assert_eq!(reverse["county"], "co");
        assert_eq!(reverse["block"], "blk");
    }

    #[test]
    fn year_accepts_number_or_string() {
        #[derive(Deserialize)]
        struct Years {
            a: CensusYear,
            b: CensusYear,
        }
        let years: Years = toml::from_str("a = 1990\nb = \"2010\"").unwrap();
        assert_eq!(years.a, CensusYear::Y1990);
        assert_eq!(years.b, CensusYear::Y2010);

        let bad: Result<Years, _> = toml::from_str("a = 1980\nb = 2010");
        assert!(bad.is_err());
    }

    #[test]
    fn endpoint_column_round_trip() {
        let ep = Endpoint::new(Geography::Tr, CensusYear::Y2010);
        assert_eq!(ep.column(CodeType::Gj), "tr2010gj");
        assert_eq!(
            Endpoint::parse_column("tr2010ge"),
            Some((ep, CodeType::Ge))
        );
        assert_eq!(
            Endpoint::parse_column("bgp1990gj"),
            Some((Endpoint::new(Geography::Bgp, CensusYear::Y1990), CodeType::Gj))
        );
        assert_eq!(Endpoint::parse_column("wt_pop"), None);
        assert_eq!(Endpoint::parse_column("gj"), None);
    }
}
