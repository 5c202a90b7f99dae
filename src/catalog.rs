//! Loading of the offense and lawyer catalogs from CSV files.
//!
//! Both loaders read the whole source once, check that every required
//! column is present and refuse to build a partial or empty catalog.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, info};

use crate::error::LoadError;
use crate::models::{Classification, LawyerRecord, OffenseRecord};

pub const IPC_SECTION_COLUMN: &str = "IPC Section";
pub const OFFENSE_COLUMN: &str = "Offense";
pub const PUNISHMENT_COLUMN: &str = "Punishment";
pub const COGNIZABLE_COLUMN: &str = "Cognizable";
pub const BAILABLE_COLUMN: &str = "Bailable";
pub const COURT_COLUMN: &str = "Court";

pub const OFFENSE_COLUMNS: &[&str] = &[
    IPC_SECTION_COLUMN,
    OFFENSE_COLUMN,
    PUNISHMENT_COLUMN,
    COGNIZABLE_COLUMN,
    BAILABLE_COLUMN,
    COURT_COLUMN,
];

pub const NAME_COLUMN: &str = "Name";
pub const ADDRESS_COLUMN: &str = "Address";
pub const PHONE_COLUMN: &str = "Phone No";

pub const LAWYER_COLUMNS: &[&str] = &[NAME_COLUMN, ADDRESS_COLUMN, PHONE_COLUMN];

/// Column positions resolved from a header row.
struct Columns {
    path: PathBuf,
    indices: Vec<usize>,
}

impl Columns {
    fn resolve(path: &Path, headers: &StringRecord, required: &[&str]) -> Result<Self, LoadError> {
        let indices = required
            .iter()
            .map(|name| {
                headers
                    .iter()
                    .position(|h| h.trim() == *name)
                    .ok_or_else(|| LoadError::MissingColumn {
                        path: path.to_path_buf(),
                        column: (*name).to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            path: path.to_path_buf(),
            indices,
        })
    }

    /// Value of the `n`th required column; short rows read as empty cells.
    fn get<'r>(&self, row: &'r StringRecord, n: usize) -> &'r str {
        row.get(self.indices[n]).map(str::trim).unwrap_or("")
    }

    fn parse_error(&self, row: &StringRecord, message: impl Into<String>) -> LoadError {
        LoadError::Parse {
            path: self.path.clone(),
            line: row.position().map_or(0, |p| p.line()),
            message: message.into(),
        }
    }
}

fn open(path: &Path) -> Result<csv::Reader<File>, LoadError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => LoadError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => LoadError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    Ok(ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(file))
}

fn csv_error(path: &Path, e: csv::Error) -> LoadError {
    let line = e.position().map_or(0, |p| p.line());
    let message = e.to_string();
    match e.into_kind() {
        csv::ErrorKind::Io(source) => LoadError::Io {
            path: path.to_path_buf(),
            source,
        },
        _ => LoadError::Parse {
            path: path.to_path_buf(),
            line,
            message,
        },
    }
}

/// Reads every row of `path` through `parse_row` after validating `required`.
fn load_rows<T>(
    path: &Path,
    required: &[&str],
    parse_row: impl Fn(&Columns, &StringRecord) -> Result<T, LoadError>,
) -> Result<Vec<T>, LoadError> {
    let mut reader = open(path)?;
    let headers = reader.headers().map_err(|e| csv_error(path, e))?.clone();
    let columns = Columns::resolve(path, &headers, required)?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let row = result.map_err(|e| csv_error(path, e))?;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        rows.push(parse_row(&columns, &row)?);
    }

    if rows.is_empty() {
        return Err(LoadError::EmptyCatalog {
            path: path.to_path_buf(),
        });
    }

    Ok(rows)
}

fn parse_offense_row(columns: &Columns, row: &StringRecord) -> Result<OffenseRecord, LoadError> {
    let offense = columns.get(row, 1);
    if offense.is_empty() {
        return Err(columns.parse_error(row, "empty Offense text"));
    }

    Ok(OffenseRecord {
        ipc_section: columns.get(row, 0).to_string(),
        offense: offense.to_string(),
        punishment: columns.get(row, 2).to_string(),
        cognizable: Classification::new(columns.get(row, 3)),
        bailable: Classification::new(columns.get(row, 4)),
        court: columns.get(row, 5).to_string(),
    })
}

fn parse_lawyer_row(columns: &Columns, row: &StringRecord) -> Result<LawyerRecord, LoadError> {
    Ok(LawyerRecord {
        name: columns.get(row, 0).to_string(),
        address: columns.get(row, 1).to_string(),
        phone: columns.get(row, 2).to_string(),
    })
}

/// Read-only table of IPC offenses. Row order is fixed once loaded.
#[derive(Debug, Clone)]
pub struct OffenseCatalog {
    records: Vec<OffenseRecord>,
}

impl OffenseCatalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let records = load_rows(path, OFFENSE_COLUMNS, parse_offense_row)?;
        info!("Loaded {} offenses from {}", records.len(), path.display());
        Ok(Self { records })
    }

    /// Builds a catalog from records already in memory, enforcing the same
    /// invariants as [`OffenseCatalog::load`].
    pub fn from_records(records: Vec<OffenseRecord>) -> Result<Self, LoadError> {
        let source = PathBuf::from("<memory>");
        if records.is_empty() {
            return Err(LoadError::EmptyCatalog { path: source });
        }
        if let Some(pos) = records.iter().position(|r| r.offense.trim().is_empty()) {
            return Err(LoadError::Parse {
                path: source,
                line: pos as u64 + 1,
                message: "empty Offense text".to_string(),
            });
        }
        debug!("Built offense catalog with {} records", records.len());
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&OffenseRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OffenseRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[OffenseRecord] {
        &self.records
    }
}

/// Read-only lawyer directory. Row order is fixed once loaded.
#[derive(Debug, Clone)]
pub struct LawyerCatalog {
    records: Vec<LawyerRecord>,
}

impl LawyerCatalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let records = load_rows(path, LAWYER_COLUMNS, parse_lawyer_row)?;
        info!("Loaded {} lawyers from {}", records.len(), path.display());
        Ok(Self { records })
    }

    pub fn from_records(records: Vec<LawyerRecord>) -> Result<Self, LoadError> {
        if records.is_empty() {
            return Err(LoadError::EmptyCatalog {
                path: PathBuf::from("<memory>"),
            });
        }
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LawyerRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LawyerRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[LawyerRecord] {
        &self.records
    }
}
