// CSV table loading, plain or zip-compressed

use std::fs::File;
use std::io::Read;
use std::path::Path;

use censuswalk_xwalk::config::XwalkConfig;
use censuswalk_xwalk::model::{BaseCrosswalk, BaseRow};
use censuswalk_xwalk::table::Table;

/// Table name for a path: the file name without `.zip` and `.csv`.
pub fn table_name(path: &Path) -> String {
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = file.strip_suffix(".zip").unwrap_or(&file);
    let file = file.strip_suffix(".csv").unwrap_or(file);
    file.to_string()
}

fn is_zip(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}

/// Read a `.csv` file, or the first `.csv` member of a `.zip` archive, as text.
pub fn read_text(path: &Path) -> Result<String, String> {
    let bytes = if is_zip(path) {
        read_zip_member(path)?
    } else {
        let mut file = File::open(path).map_err(|e| format!("{}: {e}", path.display()))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|e| format!("{}: {e}", path.display()))?;
        bytes
    };
    Ok(decode_text(bytes))
}

fn read_zip_member(path: &Path) -> Result<Vec<u8>, String> {
    let file = File::open(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| format!("{}: zip error: {e}", path.display()))?;

    let index = (0..archive.len())
        .find(|&i| {
            archive
                .name_for_index(i)
                .map(|n| n.to_ascii_lowercase().ends_with(".csv"))
                .unwrap_or(false)
        })
        .ok_or_else(|| format!("{}: archive contains no .csv member", path.display()))?;

    let mut member = archive
        .by_index(index)
        .map_err(|e| format!("{}: zip error: {e}", path.display()))?;
    let mut bytes = Vec::new();
    member
        .read_to_end(&mut bytes)
        .map_err(|e| format!("{}: {e}", path.display()))?;
    Ok(bytes)
}

/// UTF-8, falling back to Windows-1252 for legacy extracts.
fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    }
}

/// Load a table with every column as text; empty cells are null.
pub fn read_table(path: &Path) -> Result<Table, String> {
    let content = read_text(path)?;
    parse_table(&table_name(path), &content)
}

pub fn parse_table(name: &str, content: &str) -> Result<Table, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| format!("CSV header error: {e}"))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let mut table = Table::new(name, headers);

    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(|e| format!("CSV parse error at row {}: {e}", i + 1))?;
        let cells = record
            .iter()
            .map(|field| (!field.is_empty()).then(|| field.to_string()))
            .collect();
        table.push_row(cells).map_err(|e| e.to_string())?;
    }
    log::debug!("read table '{name}': {} rows", table.len());
    Ok(table)
}

/// Load the elemental crosswalk using the column names in `config.base`.
pub fn read_base(path: &Path, config: &XwalkConfig) -> Result<BaseCrosswalk, String> {
    let content = read_text(path)?;
    parse_base(&content, config)
}

pub fn parse_base(content: &str, config: &XwalkConfig) -> Result<BaseCrosswalk, String> {
    let source_column = config.source_column();
    let target_column = config.target_column();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(content.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| format!("CSV header error: {e}"))?
        .clone();
    let find = |name: &str| headers.iter().position(|h| h.trim() == name);
    let required = |name: &str| find(name).ok_or_else(|| format!("base crosswalk: missing column '{name}'"));

    let src = required(source_column.as_str())?;
    let tgt = required(target_column.as_str())?;
    let weight = required(config.base.weight_column.as_str())?;
    let area = find(config.base.area_column.as_str());

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(|e| format!("CSV parse error at row {}: {e}", i + 1))?;
        let (Some(source), Some(target)) = (
            record.get(src).filter(|s| !s.is_empty()),
            record.get(tgt).filter(|s| !s.is_empty()),
        ) else {
            skipped += 1;
            continue;
        };
        rows.push(BaseRow {
            area: parse_opt_f64(area.and_then(|a| record.get(a)), i + 1, &config.base.area_column)?,
            weight: parse_opt_f64(record.get(weight), i + 1, &config.base.weight_column)?,
            ..BaseRow::new(source, target, 0.0)
        });
    }
    if skipped > 0 {
        log::warn!("base crosswalk: skipped {skipped} rows without a source or target id");
    }
    Ok(BaseCrosswalk::new(source_column, target_column, rows))
}

fn parse_opt_f64(cell: Option<&str>, row: usize, column: &str) -> Result<Option<f64>, String> {
    match cell.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse::<f64>()
            .map(Some)
            .map_err(|_| format!("row {row}: invalid {column} '{s}'")),
    }
}
