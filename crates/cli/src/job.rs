//! TOML job files: an `XwalkConfig` plus a `[files]` section.
//!
//! ```toml
//! source_geo = "bgp"
//! source_year = 1990
//! target_geo = "tr"
//! target_year = 2010
//! input_vars = ["P1", "H1"]
//! weight_vars = ["pop", "hh"]
//!
//! [files]
//! base = "nhgis_blk1990_blk2010.csv.zip"
//! attributes = "nhgis_blk1990.csv.zip"
//! supplement = "nhgis_bgp1990.csv.zip"
//! output_dir = "out"
//! ```
//!
//! Relative paths resolve against the job file's directory.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use censuswalk_xwalk::XwalkConfig;

use crate::exit_codes::{EXIT_INVALID_CONFIG, EXIT_IO};
use crate::CliError;

#[derive(Debug, Clone, Deserialize)]
pub struct FilesSection {
    pub base: PathBuf,
    pub attributes: PathBuf,
    #[serde(default)]
    pub supplement: Option<PathBuf>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub compress: bool,
    /// Also write a JSON snapshot of the full result here.
    #[serde(default)]
    pub snapshot: Option<PathBuf>,
    /// Write one file per target state next to the national file.
    #[serde(default)]
    pub split_states: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Deserialize)]
struct JobFiles {
    files: FilesSection,
}

#[derive(Debug, Clone)]
pub struct Job {
    pub config: XwalkConfig,
    pub files: FilesSection,
}

impl Job {
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CliError::io(format!("{}: {e}", path.display())))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&text, base_dir)
    }

    pub fn parse(text: &str, base_dir: &Path) -> Result<Self, CliError> {
        let config = XwalkConfig::from_toml(text).map_err(CliError::xwalk)?;
        let job_files: JobFiles = toml::from_str(text).map_err(|e| CliError {
            code: EXIT_INVALID_CONFIG,
            message: format!("job [files] section: {}", e.message()),
            hint: Some("a job file needs [files] with at least `base` and `attributes`".into()),
        })?;

        let mut files = job_files.files;
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base_dir.join(&*p);
            }
        };
        resolve(&mut files.base);
        resolve(&mut files.attributes);
        resolve(&mut files.output_dir);
        if let Some(p) = files.supplement.as_mut() {
            resolve(p);
        }
        if let Some(p) = files.snapshot.as_mut() {
            resolve(p);
        }

        if config.needs_supplement() && files.supplement.is_none() {
            return Err(CliError {
                code: EXIT_INVALID_CONFIG,
                message: "1990 block group parts need the supplementary block group part table".into(),
                hint: Some("set `supplement` in [files]".into()),
            });
        }
        Ok(Self { config, files })
    }

    /// Check that every input file exists before any table is read.
    pub fn check_inputs(&self) -> Result<(), CliError> {
        let inputs = [Some(&self.files.base), Some(&self.files.attributes), self.files.supplement.as_ref()];
        for path in inputs.into_iter().flatten() {
            if !path.is_file() {
                return Err(CliError {
                    code: EXIT_IO,
                    message: format!("input not found: {}", path.display()),
                    hint: None,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOB: &str = r#"
source_geo = "bgp"
source_year = 2000
target_geo = "tr"
target_year = 2010
input_vars = ["P1"]
weight_vars = ["pop"]

[files]
base = "base.csv"
attributes = "/data/blk2000.csv"
snapshot = "out/snap.json"
"#;

    #[test]
    fn relative_paths_resolve_against_job_dir() {
        let job = Job::parse(JOB, Path::new("/jobs")).unwrap();
        assert_eq!(job.files.base, PathBuf::from("/jobs/base.csv"));
        assert_eq!(job.files.attributes, PathBuf::from("/data/blk2000.csv"));
        assert_eq!(job.files.output_dir, PathBuf::from("/jobs/."));
        assert_eq!(job.files.snapshot, Some(PathBuf::from("/jobs/out/snap.json")));
        assert!(!job.files.compress);
        assert_eq!(job.config.crosswalk_name(), "xwalk_bgp2000_tr2010");
    }

    #[test]
    fn files_section_required() {
        let text = JOB.split("[files]").next().unwrap();
        let err = Job::parse(text, Path::new(".")).unwrap_err();
        assert_eq!(err.code, EXIT_INVALID_CONFIG);
        assert!(err.message.contains("[files]"), "{}", err.message);
    }

    #[test]
    fn bgp1990_job_requires_supplement_path() {
        let text = JOB.replace("source_year = 2000", "source_year = 1990");
        let err = Job::parse(&text, Path::new(".")).unwrap_err();
        assert_eq!(err.code, EXIT_INVALID_CONFIG);
        assert_eq!(err.hint.as_deref(), Some("set `supplement` in [files]"));
    }

    #[test]
    fn invalid_config_maps_to_config_exit_code() {
        let text = JOB.replace("weight_vars = [\"pop\"]", "weight_vars = []");
        let err = Job::parse(&text, Path::new(".")).unwrap_err();
        assert_eq!(err.code, EXIT_INVALID_CONFIG);
    }
}
