//! Full-result snapshots for reloading a finished build.
//!
//! A snapshot is a JSON envelope around [`CrosswalkResult`]. The fingerprint is
//! the BLAKE3 hash of the crosswalk's CSV rendering, so a reloaded snapshot is
//! verified against exactly what [`write_crosswalk_csv`] would produce.

use std::path::Path;

use blake3::Hasher;
use serde::{Deserialize, Serialize};

use censuswalk_xwalk::model::{Crosswalk, CrosswalkResult};

use crate::crosswalk::write_crosswalk_csv;

/// Increment when the envelope or result layout changes incompatibly.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub format_version: u32,
    pub fingerprint: String,
    pub result: CrosswalkResult,
}

/// BLAKE3 hex digest of the crosswalk CSV.
pub fn fingerprint(crosswalk: &Crosswalk) -> Result<String, String> {
    let mut buf = Vec::new();
    write_crosswalk_csv(crosswalk, &mut buf)?;
    let mut hasher = Hasher::new();
    hasher.update(&buf);
    Ok(hasher.finalize().to_hex().to_string())
}

pub fn to_json(result: &CrosswalkResult) -> Result<String, String> {
    let snapshot = Snapshot {
        format_version: SNAPSHOT_FORMAT_VERSION,
        fingerprint: fingerprint(&result.crosswalk)?,
        result: result.clone(),
    };
    serde_json::to_string_pretty(&snapshot).map_err(|e| format!("JSON write error: {e}"))
}

pub fn from_json(json: &str) -> Result<CrosswalkResult, String> {
    let snapshot: Snapshot =
        serde_json::from_str(json).map_err(|e| format!("JSON parse error: {e}"))?;
    if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
        return Err(format!(
            "unsupported snapshot format version {} (expected {SNAPSHOT_FORMAT_VERSION})",
            snapshot.format_version
        ));
    }
    let actual = fingerprint(&snapshot.result.crosswalk)?;
    if actual != snapshot.fingerprint {
        return Err(format!(
            "snapshot fingerprint mismatch: recorded {}, computed {actual}",
            snapshot.fingerprint
        ));
    }
    Ok(snapshot.result)
}

pub fn write_snapshot(result: &CrosswalkResult, path: &Path) -> Result<(), String> {
    let json = to_json(result)?;
    std::fs::write(path, json).map_err(|e| format!("{}: {e}", path.display()))?;
    log::info!("wrote snapshot {}", path.display());
    Ok(())
}

pub fn read_snapshot(path: &Path) -> Result<CrosswalkResult, String> {
    let json = std::fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
    from_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use censuswalk_xwalk::geo::{CensusYear, Endpoint, Geography};
    use censuswalk_xwalk::model::{AccountingReport, Atom, CrosswalkMeta, NoDataReport};

    fn result() -> CrosswalkResult {
        let source = Endpoint::new(Geography::Bgp, CensusYear::Y2000);
        let target = Endpoint::new(Geography::Bg, CensusYear::Y2010);
        CrosswalkResult {
            meta: CrosswalkMeta {
                engine_version: "0.3.0".into(),
                built_at: "2026-01-01T00:00:00+00:00".into(),
                source,
                target,
                input_vars: vec!["P1".into()],
                base_rows: 3,
                attribute_rows: 2,
            },
            crosswalk: Crosswalk {
                name: "xwalk_bgp2000_bg2010".into(),
                source,
                target,
                weight_columns: vec!["wt_pop".into()],
                atoms: vec![
                    Atom::new(Some("G10000509355299999051304R1".into()), Some("G10000500513041".into()), vec![1.0 / 3.0]),
                    Atom::new(Some("G10000509355299999051304R1".into()), Some("G10000500513042".into()), vec![2.0 / 3.0]),
                ],
                state: None,
            },
            nodata: Some(NoDataReport::default()),
            accounting: AccountingReport {
                unmatched_source: vec![],
                unmatched_target: vec!["G10000500513043".into()],
            },
            base: None,
        }
    }

    #[test]
    fn snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.json");
        let original = result();
        write_snapshot(&original, &path).unwrap();
        let back = read_snapshot(&path).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn tampered_snapshot_rejected() {
        let json = to_json(&result()).unwrap();
        let tampered = json.replace("G10000500513042", "G10000500513049");
        let err = from_json(&tampered).unwrap_err();
        assert!(err.contains("fingerprint mismatch"), "{err}");
    }

    #[test]
    fn version_checked() {
        let json = to_json(&result()).unwrap();
        let future = json.replace("\"format_version\": 1", "\"format_version\": 99");
        let err = from_json(&future).unwrap_err();
        assert!(err.contains("format version 99"), "{err}");
    }

    #[test]
    fn fingerprint_is_stable() {
        assert_eq!(fingerprint(&result().crosswalk).unwrap(), fingerprint(&result().crosswalk).unwrap());
        assert_eq!(fingerprint(&result().crosswalk).unwrap().len(), 64);
    }
}
