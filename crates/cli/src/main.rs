// cwalk - build census temporal crosswalks from the command line

mod exit_codes;
mod job;
mod logging;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use censuswalk_io::crosswalk::file_name;
use censuswalk_io::{read_base, read_crosswalk, read_table, write_crosswalk, write_data_product, write_snapshot};
use censuswalk_xwalk::finish::{extract_state, extract_unique_stfips, StateSelector};
use censuswalk_xwalk::model::CrosswalkResult;
use censuswalk_xwalk::{run, XwalkError, XwalkInput};

use exit_codes::{xwalk_exit_code, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};
use job::Job;

#[derive(Parser)]
#[command(name = "cwalk")]
#[command(about = "Census temporal crosswalks from block-level base crosswalks")]
#[command(version)]
struct Cli {
    /// Log level or flexi_logger spec (e.g. `debug`, `warn, censuswalk_xwalk=debug`)
    #[arg(long, global = true, env = "CWALK_LOG", default_value = "info")]
    log_level: String,

    /// Only log warnings and errors
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a crosswalk from a TOML job file and write its outputs
    #[command(after_help = "\
Examples:
  cwalk build bgp1990_tr2010.toml
  cwalk build bgp1990_tr2010.toml --json
  cwalk -q build jobs/bgp2000_bg2010_de.toml")]
    Build {
        /// Path to the job file
        job: PathBuf,

        /// Print the build summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a job file without reading any table
    #[command(after_help = "\
Examples:
  cwalk validate bgp1990_tr2010.toml")]
    Validate {
        /// Path to the job file
        job: PathBuf,
    },

    /// List the state codes present in one id column of a crosswalk
    #[command(after_help = "\
Examples:
  cwalk states xwalk_bgp1990_tr2010.csv --column tr2010gj
  cwalk states xwalk_bgp1990_tr2010.csv.zip --column bgp1990gj")]
    States {
        /// Crosswalk file (.csv or .csv.zip)
        file: PathBuf,

        /// Identifier column to read state codes from
        #[arg(long)]
        column: String,

        /// Print the codes as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Write the rows of one state as a state-suffixed crosswalk
    #[command(after_help = "\
Examples:
  cwalk extract xwalk_bgp1990_tr2010.csv --state 10 --column tr2010gj
  cwalk extract xwalk_bgp1990_tr2010.csv --state 10 --column tr2010ge -o out/
  cwalk extract xwalk_bgp1990_tr2010.csv --state nan --column bgp1990gj")]
    Extract {
        /// Crosswalk file (.csv or .csv.zip)
        file: PathBuf,

        /// Two-digit state FIPS code, or `nan` for rows with a null id
        #[arg(long)]
        state: String,

        /// Identifier column to match the state against
        #[arg(long)]
        column: String,

        /// Output directory (defaults to the input file's directory)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _logger = match logging::init(&cli.log_level, cli.quiet) {
        Ok(handle) => handle,
        Err(message) => {
            eprintln!("error: {message}");
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let result = match cli.command {
        Commands::Build { job, json } => cmd_build(job, json),
        Commands::Validate { job } => cmd_validate(job),
        Commands::States { file, column, json } => cmd_states(file, column, json),
        Commands::Extract { file, state, column, output } => cmd_extract(file, state, column, output),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Create error from an engine error with its class's exit code.
    pub fn xwalk(err: XwalkError) -> Self {
        let hint = match &err {
            XwalkError::Unsupported { .. } => {
                Some("supported sources: bgp1990, bgp2000; targets: tr2010, bg2010, co2010".to_string())
            }
            XwalkError::UnsupportedCodeType(_) => Some("set code_type = \"gj\"".to_string()),
            XwalkError::AlreadyStateSubset(_) => {
                Some("extract from the national crosswalk instead".to_string())
            }
            _ => None,
        };
        Self { code: xwalk_exit_code(&err), message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// build / validate
// ============================================================================

#[derive(Serialize)]
struct BuildSummary<'a> {
    name: &'a str,
    source: String,
    target: String,
    rows: usize,
    weight_columns: &'a [String],
    unpopulated_blocks: Option<usize>,
    nodata_appended: Option<usize>,
    unresolved_block_groups: Option<&'a [String]>,
    unmatched_source: usize,
    unmatched_target: usize,
    files: Vec<String>,
}

impl<'a> BuildSummary<'a> {
    fn new(result: &'a CrosswalkResult, files: &[PathBuf]) -> Self {
        let cw = &result.crosswalk;
        Self {
            name: &cw.name,
            source: cw.source.label(),
            target: cw.target.label(),
            rows: cw.len(),
            weight_columns: &cw.weight_columns,
            unpopulated_blocks: result.nodata.as_ref().map(|n| n.unpopulated_blocks),
            nodata_appended: result.nodata.as_ref().map(|n| n.appended),
            unresolved_block_groups: result.nodata.as_ref().map(|n| n.unresolved_block_groups.as_slice()),
            unmatched_source: result.accounting.unmatched_source.len(),
            unmatched_target: result.accounting.unmatched_target.len(),
            files: files.iter().map(|p| p.display().to_string()).collect(),
        }
    }
}

fn cmd_build(job_path: PathBuf, json: bool) -> Result<(), CliError> {
    let job = Job::load(&job_path)?;
    job.check_inputs()?;
    let files = &job.files;

    let base = read_base(&files.base, &job.config).map_err(CliError::io)?;
    let attributes = read_table(&files.attributes).map_err(CliError::io)?;
    let mut input = XwalkInput::new(base, attributes);
    if let Some(path) = &files.supplement {
        input = input.with_supplement(read_table(path).map_err(CliError::io)?);
    }

    let result = run(&job.config, input).map_err(CliError::xwalk)?;

    let mut written = if files.split_states {
        write_data_product(&result.crosswalk, &files.output_dir, files.compress).map_err(CliError::io)?
    } else {
        vec![write_crosswalk(&result.crosswalk, &files.output_dir, files.compress).map_err(CliError::io)?]
    };
    if let Some(path) = &files.snapshot {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CliError::io(format!("{}: {e}", parent.display())))?;
        }
        write_snapshot(&result, path).map_err(CliError::io)?;
        written.push(path.clone());
    }

    let summary = BuildSummary::new(&result, &written);
    if json {
        let out = serde_json::to_string_pretty(&summary)
            .map_err(|e| CliError::io(format!("JSON write error: {e}")))?;
        println!("{out}");
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &BuildSummary<'_>) {
    println!("{}: {} -> {}, {} rows", summary.name, summary.source, summary.target, summary.rows);
    println!("  weights: {}", summary.weight_columns.join(", "));
    if let (Some(blocks), Some(appended)) = (summary.unpopulated_blocks, summary.nodata_appended) {
        println!("  no-data: {blocks} unpopulated blocks, {appended} links appended");
    }
    if let Some(unresolved) = summary.unresolved_block_groups.filter(|u| !u.is_empty()) {
        println!("  unresolved block groups: {}", unresolved.len());
    }
    println!(
        "  unmatched: {} source, {} target",
        summary.unmatched_source, summary.unmatched_target
    );
    for file in &summary.files {
        println!("  wrote {file}");
    }
}

fn cmd_validate(job_path: PathBuf) -> Result<(), CliError> {
    let job = Job::load(&job_path)?;
    let config = &job.config;
    println!(
        "ok: {} ({} -> {}; {})",
        config.crosswalk_name(),
        config.source().label(),
        config.target().label(),
        config.input_vars.join(", ")
    );
    Ok(())
}

// ============================================================================
// states / extract
// ============================================================================

fn cmd_states(file: PathBuf, column: String, json: bool) -> Result<(), CliError> {
    let crosswalk = read_crosswalk(&file).map_err(CliError::io)?;
    let (side, _) = crosswalk
        .id_column(&column)
        .filter(|_| crosswalk.columns().contains(&column))
        .ok_or_else(|| {
            CliError::args(format!("'{column}' is not an identifier column of {}", crosswalk.name))
                .with_hint(format!("columns: {}", crosswalk.columns().join(", ")))
        })?;

    let codes = extract_unique_stfips(&crosswalk, side);
    if json {
        let out = serde_json::to_string(&codes)
            .map_err(|e| CliError::io(format!("JSON write error: {e}")))?;
        println!("{out}");
    } else {
        for code in &codes {
            println!("{code}");
        }
    }
    Ok(())
}

fn cmd_extract(
    file: PathBuf,
    state: String,
    column: String,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let selector: StateSelector = state
        .parse()
        .map_err(|e: XwalkError| CliError::args(e.to_string()))?;
    let crosswalk = read_crosswalk(&file).map_err(CliError::io)?;
    let subset = extract_state(&crosswalk, &selector, &column).map_err(CliError::xwalk)?;

    let dir = output.unwrap_or_else(|| input_dir(&file));
    let compress = file
        .extension()
        .map(|e| e.eq_ignore_ascii_case("zip"))
        .unwrap_or(false);
    if dir.join(file_name(&subset, compress)) == file {
        return Err(CliError::args(format!("extract would overwrite {}", file.display()))
            .with_hint("pass -o <dir> to write the subset elsewhere"));
    }
    let path = write_crosswalk(&subset, &dir, compress).map_err(CliError::io)?;
    println!("{} rows -> {}", subset.len(), path.display());
    Ok(())
}

fn input_dir(file: &Path) -> PathBuf {
    match file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
