//! stderr logging for the `cwalk` binary.
//!
//! Library crates only emit through the `log` facade; this is the one place a
//! backend is installed.

use flexi_logger::{Logger, LoggerHandle, WriteMode};

/// Start the stderr logger. The returned handle must stay alive for the
/// lifetime of the process.
///
/// `spec` is a level (`info`) or a full flexi_logger spec string
/// (`warn, censuswalk_xwalk=debug`). `quiet` forces `warn`.
pub fn init(spec: &str, quiet: bool) -> Result<LoggerHandle, String> {
    let spec = if quiet { "warn" } else { normalize_spec(spec)? };
    Logger::try_with_str(spec)
        .map_err(|err| format!("invalid log level `{spec}`: {err}"))?
        .log_to_stderr()
        .write_mode(WriteMode::Direct)
        .format(flexi_logger::default_format)
        .start()
        .map_err(|err| format!("failed to start logger: {err}"))
}

/// Plain level names are normalized; anything with a module path or a comma
/// is passed through to flexi_logger as a spec.
fn normalize_spec(spec: &str) -> Result<&str, String> {
    let trimmed = spec.trim();
    if trimmed.contains('=') || trimmed.contains(',') {
        return Ok(trimmed);
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        "off" => Ok("off"),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error|off"
        )),
    }
}
