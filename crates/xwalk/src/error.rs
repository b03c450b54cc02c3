use std::fmt;

#[derive(Debug)]
pub enum XwalkError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad state code, empty variable list, etc.).
    ConfigValidation(String),
    /// Identifier style that the builder cannot produce.
    UnsupportedCodeType(String),
    /// A 1990 block-group-part endpoint was requested without the national
    /// supplementary table.
    MissingSupplement { endpoint: String },
    /// Input variable and weight variable lists differ in length.
    VariableMismatch { inputs: usize, weights: usize },
    /// The table is already a single-state subset.
    AlreadyStateSubset(String),
    /// (role, geography, year) has no registry entry for the requested operation.
    Unsupported {
        op: &'static str,
        role: String,
        geo: String,
        year: String,
    },
    /// Missing required column in a table.
    MissingColumn { table: String, column: String },
    /// Row width does not match the table header.
    RaggedRow {
        table: String,
        row: usize,
        expected: usize,
        found: usize,
    },
    /// Join keys violate the requested cardinality.
    JoinCardinality {
        table: String,
        key: String,
        expected: String,
    },
    /// Identifier that cannot be truncated or converted.
    InvalidIdentifier { id: String, reason: String },
    /// Non-numeric value in a numeric column.
    InvalidNumber { column: String, value: String },
}

/// Coarse error classes, used by front ends to pick exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Configuration,
    Capability,
    Data,
}

impl XwalkError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::ConfigParse(_)
            | Self::ConfigValidation(_)
            | Self::UnsupportedCodeType(_)
            | Self::MissingSupplement { .. }
            | Self::VariableMismatch { .. }
            | Self::AlreadyStateSubset(_) => ErrorClass::Configuration,
            Self::Unsupported { .. } => ErrorClass::Capability,
            Self::MissingColumn { .. }
            | Self::RaggedRow { .. }
            | Self::JoinCardinality { .. }
            | Self::InvalidIdentifier { .. }
            | Self::InvalidNumber { .. } => ErrorClass::Data,
        }
    }
}

impl fmt::Display for XwalkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::UnsupportedCodeType(code) => {
                write!(f, "identifier style '{code}' is not supported for crosswalk builds")
            }
            Self::MissingSupplement { endpoint } => write!(
                f,
                "{endpoint} requires the national supplementary block group part table"
            ),
            Self::VariableMismatch { inputs, weights } => write!(
                f,
                "input_vars and weight_vars must be the same length: {inputs} != {weights}"
            ),
            Self::AlreadyStateSubset(name) => {
                write!(f, "'{name}' is already a state-level subset")
            }
            Self::Unsupported { op, role, geo, year } => {
                write!(f, "unsupported {op}: {role} geography '{geo}{year}'")
            }
            Self::MissingColumn { table, column } => {
                write!(f, "table '{table}': missing column '{column}'")
            }
            Self::RaggedRow { table, row, expected, found } => write!(
                f,
                "table '{table}', row {row}: expected {expected} fields, found {found}"
            ),
            Self::JoinCardinality { table, key, expected } => write!(
                f,
                "table '{table}': key '{key}' violates {expected} join cardinality"
            ),
            Self::InvalidIdentifier { id, reason } => {
                write!(f, "invalid identifier '{id}': {reason}")
            }
            Self::InvalidNumber { column, value } => {
                write!(f, "column '{column}': cannot parse number '{value}'")
            }
        }
    }
}

impl std::error::Error for XwalkError {}
