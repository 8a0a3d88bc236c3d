//! Data source collaborator.
//!
//! A source delivers one raw dataset per table. [`DirectorySource`] reads
//! files named after the API resources (`deudores.csv`, `prestamos.json`, ...)
//! with polars; [`MemorySource`] serves fixed records.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use polars::prelude::*;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::{CarteraError, TableKind};
use crate::records::RawRecord;

pub trait DataSource: Send + Sync {
    fn fetch(&self, kind: TableKind) -> Result<Vec<RawRecord>, CarteraError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileType {
    Csv,
    Json,
    Parquet,
    Arrow,
}

const EXTENSIONS: [(&str, FileType); 6] = [
    ("csv", FileType::Csv),
    ("json", FileType::Json),
    ("parquet", FileType::Parquet),
    ("pq", FileType::Parquet),
    ("arrow", FileType::Arrow),
    ("ipc", FileType::Arrow),
];

#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn locate(&self, kind: TableKind) -> Result<(PathBuf, FileType), CarteraError> {
        for (ext, file_type) in EXTENSIONS {
            let path = self.dir.join(format!("{}.{ext}", kind.source_stem()));
            match fs::metadata(&path) {
                Ok(meta) if meta.is_file() => return Ok((path, file_type)),
                Ok(_) => continue,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                    return Err(CarteraError::PermissionDenied(path.display().to_string()));
                }
                Err(e) => return Err(CarteraError::IoError(e)),
            }
        }
        Err(CarteraError::FileNotFound(kind.source_stem().to_string()))
    }

    fn load_frame(path: &Path, file_type: FileType) -> Result<DataFrame, CarteraError> {
        let frame = match file_type {
            FileType::Csv => LazyCsvReader::new(PlPath::Local(path.into()))
                .with_has_header(true)
                .finish()?
                .collect()?,
            FileType::Parquet => {
                LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())?
                    .collect()?
            }
            FileType::Arrow => LazyFrame::scan_ipc(
                PlPath::Local(path.into()),
                polars::io::ipc::IpcScanOptions,
                UnifiedScanArgs::default(),
            )?
            .collect()?,
            FileType::Json => JsonReader::new(File::open(path)?).finish()?,
        };
        Ok(frame)
    }
}

impl DataSource for DirectorySource {
    fn fetch(&self, kind: TableKind) -> Result<Vec<RawRecord>, CarteraError> {
        let (path, file_type) = self.locate(kind)?;
        let start_time = Instant::now();
        let frame = Self::load_frame(&path, file_type)?;
        let records = frame_to_records(&frame);
        info!(
            "Loaded {} {:?} records from {} in {}ms",
            records.len(),
            kind,
            path.display(),
            start_time.elapsed().as_millis()
        );
        Ok(records)
    }
}

fn load_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, PolarsError> {
    let col = df.column(name)?.cast(&DataType::String)?;
    let values = col.str()?;
    Ok(values.into_iter().map(|v| v.map(str::to_string)).collect())
}

/// Turns a frame into raw records. Each column is stringified on its own
/// rayon task; columns that cannot be represented as text are skipped.
pub fn frame_to_records(df: &DataFrame) -> Vec<RawRecord> {
    let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
    let columns: Vec<(String, Vec<Option<String>>)> = names
        .par_iter()
        .filter_map(|name| match load_column(df, name) {
            Ok(values) => Some((name.clone(), values)),
            Err(e) => {
                warn!("Skipping column {name}: {e}");
                None
            }
        })
        .collect();
    debug!("Converted {} of {} columns", columns.len(), names.len());

    (0..df.height())
        .map(|row| {
            columns
                .iter()
                .filter_map(|(name, values)| {
                    values
                        .get(row)
                        .and_then(|v| v.clone())
                        .map(|v| (name.clone(), v))
                })
                .collect()
        })
        .collect()
}

/// Serves fixed datasets; a missing table fetches as empty.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: HashMap<TableKind, Vec<RawRecord>>,
}

impl MemorySource {
    pub fn with(mut self, kind: TableKind, records: Vec<RawRecord>) -> Self {
        self.tables.insert(kind, records);
        self
    }
}

impl DataSource for MemorySource {
    fn fetch(&self, kind: TableKind) -> Result<Vec<RawRecord>, CarteraError> {
        Ok(self.tables.get(&kind).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reads_csv_with_nulls_left_out() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("prestamos.csv"),
            "id,deudor,monto,fecha,estado\n1,3,1500,2024-01-05,1\n2,,2500,2024-02-10,2\n",
        )
        .unwrap();
        let records = DirectorySource::new(dir.path()).fetch(TableKind::Loans).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("deudor").map(String::as_str), Some("3"));
        assert_eq!(records[0].get("fecha").map(String::as_str), Some("2024-01-05"));
        assert!(records[1].get("deudor").is_none());
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = DirectorySource::new(dir.path()).fetch(TableKind::Payments).unwrap_err();
        assert!(matches!(err, CarteraError::FileNotFound(stem) if stem == "pagos"));
    }

    #[test]
    fn memory_source_defaults_to_empty() {
        let source = MemorySource::default();
        assert!(source.fetch(TableKind::Debtors).unwrap().is_empty());
    }
}
