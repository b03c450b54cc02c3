// Data product: national crosswalk plus one file per target state

use std::path::{Path, PathBuf};

use censuswalk_xwalk::finish::split_by_state;
use censuswalk_xwalk::geo::Side;
use censuswalk_xwalk::model::Crosswalk;

use crate::crosswalk::write_crosswalk;

/// Write the national file and, unless the crosswalk is already a state
/// subset, one `<name>_<fips>` file per target state. Returns paths written.
pub fn write_data_product(crosswalk: &Crosswalk, dir: &Path, compress: bool) -> Result<Vec<PathBuf>, String> {
    let mut written = vec![write_crosswalk(crosswalk, dir, compress)?];
    if crosswalk.is_state_subset() {
        return Ok(written);
    }
    let states = split_by_state(crosswalk, Side::Target).map_err(|e| e.to_string())?;
    for state in &states {
        written.push(write_crosswalk(state, dir, compress)?);
    }
    log::info!("data product: {} state files", states.len());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use censuswalk_xwalk::geo::{CensusYear, Endpoint, Geography};
    use censuswalk_xwalk::model::Atom;

    use crate::crosswalk::read_crosswalk;

    fn national() -> Crosswalk {
        Crosswalk {
            name: "xwalk_bgp2000_tr2010".into(),
            source: Endpoint::new(Geography::Bgp, CensusYear::Y2000),
            target: Endpoint::new(Geography::Tr, CensusYear::Y2010),
            weight_columns: vec!["wt_pop".into()],
            atoms: vec![
                Atom::new(Some("GA".into()), Some("G0100010000100".into()), vec![1.0]),
                Atom::new(Some("GB".into()), Some("G1000010042100".into()), vec![0.5]),
                Atom::new(Some("GB".into()), Some("G1000010042200".into()), vec![0.5]),
                Atom::new(Some("GC".into()), None, vec![0.0]),
            ],
            state: None,
        }
    }

    #[test]
    fn national_and_state_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_data_product(&national(), dir.path(), false).unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "xwalk_bgp2000_tr2010.csv",
                "xwalk_bgp2000_tr2010_01.csv",
                "xwalk_bgp2000_tr2010_10.csv",
            ]
        );

        let delaware = read_crosswalk(&paths[2]).unwrap();
        assert_eq!(delaware.state.as_deref(), Some("10"));
        assert_eq!(delaware.len(), 2);
    }

    #[test]
    fn state_subset_writes_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut cw = national();
        cw.name.push_str("_10");
        cw.state = Some("10".into());
        let paths = write_data_product(&cw, dir.path(), true).unwrap();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].to_string_lossy().ends_with("xwalk_bgp2000_tr2010_10.csv.zip"));
    }
}
