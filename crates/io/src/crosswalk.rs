// Crosswalk files: `<name>.csv` or `<name>.csv.zip`

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use censuswalk_xwalk::finish::is_state_subset;
use censuswalk_xwalk::geo::{CodeType, Endpoint};
use censuswalk_xwalk::model::{Atom, Crosswalk};

use crate::csv::{read_text, table_name};

/// Write a crosswalk as CSV: id columns, GEOID columns, weights.
pub fn write_crosswalk_csv(crosswalk: &Crosswalk, writer: impl Write) -> Result<(), String> {
    let mut csv = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    csv.write_record(crosswalk.columns())
        .map_err(|e| format!("CSV write error: {e}"))?;

    for atom in &crosswalk.atoms {
        let row = crosswalk.render_row(atom).map_err(|e| e.to_string())?;
        csv.write_record(&row)
            .map_err(|e| format!("CSV write error: {e}"))?;
    }

    csv.flush().map_err(|e| format!("CSV flush error: {e}"))?;
    Ok(())
}

pub fn file_name(crosswalk: &Crosswalk, compress: bool) -> String {
    if compress {
        format!("{}.csv.zip", crosswalk.name)
    } else {
        format!("{}.csv", crosswalk.name)
    }
}

/// Write `<dir>/<name>.csv`, or a zip archive holding it when `compress`.
pub fn write_crosswalk(crosswalk: &Crosswalk, dir: &Path, compress: bool) -> Result<PathBuf, String> {
    std::fs::create_dir_all(dir).map_err(|e| format!("{}: {e}", dir.display()))?;
    let path = dir.join(file_name(crosswalk, compress));
    let file = File::create(&path).map_err(|e| format!("{}: {e}", path.display()))?;

    if compress {
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        zip.start_file(format!("{}.csv", crosswalk.name), options)
            .map_err(|e| format!("zip error: {e}"))?;
        write_crosswalk_csv(crosswalk, &mut zip)?;
        zip.finish().map_err(|e| format!("zip error: {e}"))?;
    } else {
        write_crosswalk_csv(crosswalk, std::io::BufWriter::new(file))?;
    }
    log::info!("wrote {} ({} rows)", path.display(), crosswalk.len());
    Ok(path)
}

/// Read a crosswalk written by [`write_crosswalk`]. The name comes from the
/// file name; GEOID columns are ignored since they derive from the ids.
pub fn read_crosswalk(path: &Path) -> Result<Crosswalk, String> {
    let content = read_text(path)?;
    parse_crosswalk(&table_name(path), &content)
}

pub fn parse_crosswalk(name: &str, content: &str) -> Result<Crosswalk, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(content.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| format!("CSV header error: {e}"))?
        .clone();

    let endpoint = |i: usize| -> Result<Endpoint, String> {
        headers
            .get(i)
            .and_then(Endpoint::parse_column)
            .filter(|(_, code)| *code == CodeType::Gj)
            .map(|(ep, _)| ep)
            .ok_or_else(|| {
                format!(
                    "column {} must be a composite id column, found '{}'",
                    i + 1,
                    headers.get(i).unwrap_or("")
                )
            })
    };
    let source = endpoint(0)?;
    let target = endpoint(1)?;

    let weight_idx: Vec<usize> = (2..headers.len())
        .filter(|&i| Endpoint::parse_column(&headers[i]).is_none())
        .collect();
    let weight_columns = weight_idx.iter().map(|&i| headers[i].to_string()).collect();

    let mut atoms = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(|e| format!("CSV parse error at row {}: {e}", i + 1))?;
        let id = |col: usize| record.get(col).filter(|s| !s.is_empty()).map(str::to_string);
        let weights = weight_idx
            .iter()
            .map(|&col| {
                record[col].trim().parse::<f64>().map_err(|_| {
                    format!("row {}: invalid {} '{}'", i + 1, &headers[col], &record[col])
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        atoms.push(Atom::new(id(0), id(1), weights));
    }

    let state = if is_state_subset(name) {
        name.rsplit_once('_').map(|(_, fips)| fips.to_string())
    } else {
        None
    };
    Ok(Crosswalk {
        name: name.to_string(),
        source,
        target,
        weight_columns,
        atoms,
        state,
    })
}
