//! CLI Exit Code Registry
//!
//! Single source of truth for `cwalk` exit codes. Build scripts branch on
//! them, so a code never changes meaning once published.
//!
//! | Code | Meaning                                                     |
//! |------|-------------------------------------------------------------|
//! | 0    | Success                                                     |
//! | 1    | General error (data problem during a build)                 |
//! | 2    | Usage error (bad arguments, unknown state code)             |
//! | 3    | Invalid job configuration (including identifier style)      |
//! | 4    | Unsupported geography/year combination                      |
//! | 5    | I/O error reading inputs or writing outputs                 |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant below
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `xwalk_exit_code` or the command that raises it

use censuswalk_xwalk::{ErrorClass, XwalkError};

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - the build failed on its input data.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Crosswalk builds (3-5)
// =============================================================================

/// Job file failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// The requested geography/year pair has no registered identifier scheme.
pub const EXIT_UNSUPPORTED: u8 = 4;

/// Reading an input table or writing an output file failed.
pub const EXIT_IO: u8 = 5;

/// Map an engine error to its exit code.
pub fn xwalk_exit_code(err: &XwalkError) -> u8 {
    match err.class() {
        ErrorClass::Configuration => EXIT_INVALID_CONFIG,
        ErrorClass::Capability => EXIT_UNSUPPORTED,
        ErrorClass::Data => EXIT_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [EXIT_SUCCESS, EXIT_ERROR, EXIT_USAGE, EXIT_INVALID_CONFIG, EXIT_UNSUPPORTED, EXIT_IO];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn engine_errors_map_by_class() {
        let config = XwalkError::ConfigValidation("x".into());
        let capability = XwalkError::Unsupported {
            op: "identifier lookup",
            role: "source".into(),
            geo: "tr".into(),
            year: "1990".into(),
        };
        let data = XwalkError::RaggedRow { table: "t".into(), row: 1, expected: 2, found: 1 };
        assert_eq!(xwalk_exit_code(&config), EXIT_INVALID_CONFIG);
        assert_eq!(xwalk_exit_code(&capability), EXIT_UNSUPPORTED);
        assert_eq!(xwalk_exit_code(&data), EXIT_ERROR);
    }
}
