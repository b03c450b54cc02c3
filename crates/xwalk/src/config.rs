use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::atoms::WeightSpec;
use crate::error::XwalkError;
use crate::finish::{self, FinishConfig};
use crate::geo::{CensusYear, CodeType, Endpoint, Geography, Role};
use crate::join::Cardinality;
use crate::registry::{self, IdScheme};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// One crosswalk build: endpoints, variables, and how the inputs are laid out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XwalkConfig {
    pub source_geo: Geography,
    pub source_year: CensusYear,
    pub target_geo: Geography,
    pub target_year: CensusYear,
    /// Attribute columns interpolated across the crosswalk.
    pub input_vars: Vec<String>,
    /// Weight names, one per input variable.
    pub weight_vars: Vec<String>,
    #[serde(default = "default_weight_prefix")]
    pub weight_prefix: String,
    #[serde(default)]
    pub code_type: CodeType,
    /// Restrict the build to one target state.
    #[serde(default)]
    pub stfips: Option<String>,
    /// Keep the composed base crosswalk in the result.
    #[serde(default)]
    pub keep_base: bool,
    /// Cardinality the attribute join must satisfy.
    #[serde(default)]
    pub join: Cardinality,
    #[serde(default)]
    pub base: BaseColumns,
    #[serde(default)]
    pub finish: FinishConfig,
}

fn default_weight_prefix() -> String {
    "wt_".into()
}

// ---------------------------------------------------------------------------
// Base table columns
// ---------------------------------------------------------------------------

/// Column names of the base crosswalk and the attribute key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseColumns {
    /// Defaults to `GJOIN<source_year>`.
    #[serde(default)]
    pub source_column: Option<String>,
    /// Defaults to `GJOIN<target_year>`.
    #[serde(default)]
    pub target_column: Option<String>,
    #[serde(default = "default_weight_column")]
    pub weight_column: String,
    #[serde(default = "default_area_column")]
    pub area_column: String,
    /// Attribute-table column matched against the base source ids.
    #[serde(default = "default_tabular_key")]
    pub tabular_key: String,
}

fn default_weight_column() -> String {
    "WEIGHT".into()
}
fn default_area_column() -> String {
    "PAREA".into()
}
fn default_tabular_key() -> String {
    "GISJOIN".into()
}

impl Default for BaseColumns {
    fn default() -> Self {
        Self {
            source_column: None,
            target_column: None,
            weight_column: default_weight_column(),
            area_column: default_area_column(),
            tabular_key: default_tabular_key(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing and validation
// ---------------------------------------------------------------------------

impl XwalkConfig {
    pub fn from_toml(input: &str) -> Result<Self, XwalkError> {
        let config: XwalkConfig =
            toml::from_str(input).map_err(|e| XwalkError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every precondition before any table is touched.
    pub fn validate(&self) -> Result<(), XwalkError> {
        if self.code_type != CodeType::Gj {
            return Err(XwalkError::UnsupportedCodeType(self.code_type.to_string()));
        }

        self.schemes()?;

        let spec = self.weight_spec()?;
        let mut seen = HashSet::new();
        for column in spec.weight_columns() {
            if !seen.insert(column.clone()) {
                return Err(XwalkError::ConfigValidation(format!(
                    "duplicate weight column '{column}'"
                )));
            }
        }

        if let Some(ref fips) = self.stfips {
            if fips.len() != 2 || !fips.bytes().all(|b| b.is_ascii_digit()) {
                return Err(XwalkError::ConfigValidation(format!(
                    "stfips must be a two-digit state code, got '{fips}'"
                )));
            }
        }

        if self.finish.decimals > finish::MAX_DECIMALS {
            return Err(XwalkError::ConfigValidation(format!(
                "finish.decimals must be at most {}, got {}",
                finish::MAX_DECIMALS,
                self.finish.decimals
            )));
        }

        if self.finish.name_prefix.is_empty() || self.finish.name_prefix.contains(['/', '\\']) {
            return Err(XwalkError::ConfigValidation(format!(
                "name_prefix '{}' is not usable in a file name",
                self.finish.name_prefix
            )));
        }
        Ok(())
    }

    pub fn source(&self) -> Endpoint {
        Endpoint::new(self.source_geo, self.source_year)
    }

    pub fn target(&self) -> Endpoint {
        Endpoint::new(self.target_geo, self.target_year)
    }

    pub fn weight_spec(&self) -> Result<WeightSpec, XwalkError> {
        WeightSpec::new(
            self.input_vars.clone(),
            self.weight_vars.clone(),
            self.weight_prefix.clone(),
        )
    }

    /// Registry schemes for the source and target endpoints. Both base block
    /// vintages must be registered as well.
    pub fn schemes(&self) -> Result<BuildSchemes, XwalkError> {
        registry::lookup(Role::Base, Geography::Blk, self.source_year)?;
        registry::lookup(Role::Base, Geography::Blk, self.target_year)?;
        Ok(BuildSchemes {
            source: registry::lookup(Role::Source, self.source_geo, self.source_year)?,
            target: registry::lookup(Role::Target, self.target_geo, self.target_year)?,
        })
    }

    /// Whether a 1990 block group part endpoint requires the supplementary table.
    pub fn needs_supplement(&self) -> bool {
        self.source().is_bgp1990() || self.target().is_bgp1990()
    }

    pub fn source_column(&self) -> String {
        self.base
            .source_column
            .clone()
            .unwrap_or_else(|| format!("GJOIN{}", self.source_year))
    }

    pub fn target_column(&self) -> String {
        self.base
            .target_column
            .clone()
            .unwrap_or_else(|| format!("GJOIN{}", self.target_year))
    }

    pub fn crosswalk_name(&self) -> String {
        finish::crosswalk_name(
            &self.finish.name_prefix,
            self.source(),
            self.target(),
            self.stfips.as_deref(),
        )
    }
}

/// Schemes resolved for one build.
#[derive(Debug, Clone, Copy)]
pub struct BuildSchemes {
    pub source: &'static IdScheme,
    pub target: &'static IdScheme,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
