// 📂 CSV Loader - files on disk into RawTables
// The only place in the crate that touches the filesystem for inputs.
// Cells are classified here, once; nothing downstream re-parses strings.

use crate::sources::{RawTable, SourceTables};
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read a headed CSV from any reader. Short rows are allowed; their
/// missing trailing cells read as absent.
pub fn read_table<R: Read>(name: &str, reader: R) -> Result<RawTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read CSV headers of {}", name))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut table = RawTable::new(name, headers);

    for (line_num, result) in reader.records().enumerate() {
        let record = result.with_context(|| {
            // +2: 1-indexed plus the header row
            format!("Failed to parse CSV line {} in {}", line_num + 2, name)
        })?;

        table.push_raw_row(record.iter());
    }

    debug!("Loaded {} rows from {}", table.len(), name);
    Ok(table)
}

pub fn load_table(path: &Path) -> Result<RawTable> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown.csv")
        .to_string();

    let file = File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;

    read_table(&name, file)
}

// ============================================================================
// SOURCE PATHS
// ============================================================================

/// Where each input table lives. Any of them may be left out.
#[derive(Debug, Clone, Default)]
pub struct SourcePaths {
    pub auto: Option<PathBuf>,
    pub home: Option<PathBuf>,
    pub disasters: Option<PathBuf>,
    pub weather: Option<PathBuf>,
}

fn load_optional(path: Option<&PathBuf>) -> Result<Option<RawTable>> {
    path.map(|p| load_table(p)).transpose()
}

pub fn load_sources(paths: &SourcePaths) -> Result<SourceTables> {
    Ok(SourceTables {
        auto: load_optional(paths.auto.as_ref())?,
        home: load_optional(paths.home.as_ref())?,
        disasters: load_optional(paths.disasters.as_ref())?,
        weather: load_optional(paths.weather.as_ref())?,
    })
}
