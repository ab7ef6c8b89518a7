use std::{
    fmt,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use calamine::{Data, Range, Reader, open_workbook_auto};
use rust_xlsxwriter::Workbook;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Boxed decode error carried by [`TableError::Unreadable`].
type DynError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Largest magnitude an `f64` can hold while still representing every integer
/// exactly (2^53).
const INTEGRAL_LIMIT: f64 = 9_007_199_254_740_992.0;

/// Errors produced while loading a tabular file.
#[derive(Error, Debug)]
pub enum TableError {
    /// The file extension is not a recognized tabular format.
    #[error("unsupported file format for `{}`: expected .csv, .xls, or .xlsx", .path.display())]
    UnsupportedFormat {
        /// Path of the rejected file.
        path: PathBuf,
    },
    /// The file matched a recognized format but could not be decoded.
    #[error("could not read `{}`: {}", .path.display(), .source)]
    Unreadable {
        /// Path of the unreadable file.
        path:   PathBuf,
        /// Underlying decode failure.
        source: DynError,
    },
}

/// Renders a float the way spreadsheet tooling does: integral values drop the
/// fractional part, everything else keeps the default base-10 form.
pub fn canonical_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < INTEGRAL_LIMIT {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// One decoded spreadsheet or CSV cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    /// A cell with no value.
    Empty,
    /// A numeric cell.
    Number(f64),
    /// A textual cell.
    Text(String),
    /// A boolean cell.
    Bool(bool),
}

impl Cell {
    /// Returns the numeric value of the cell if it has one, parsing textual
    /// cells when they contain a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(value) => Some(*value),
            Cell::Text(text) => text.trim().parse().ok(),
            Cell::Empty | Cell::Bool(_) => None,
        }
    }

    /// Whether the cell holds no value.
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Number(value) => write!(f, "{}", canonical_number(*value)),
            Cell::Text(text) => write!(f, "{text}"),
            Cell::Bool(value) => write!(f, "{value}"),
        }
    }
}

/// An in-memory tabular file: ordered headers plus rows of cells. Rows are
/// padded to the header width on insertion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Column headers, trimmed at load time.
    headers: Vec<String>,
    /// Row-major cell data.
    rows:    Vec<Vec<Cell>>,
}

impl Table {
    /// Creates an empty table with the given headers.
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Appends a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.headers.len(), Cell::Empty);
        self.rows.push(row);
    }

    /// Returns the column headers in order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Returns the rows in order.
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Returns the index of the column with the given header, if present.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Returns the cell at the given position, or an empty cell when the
    /// position is out of range.
    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .unwrap_or(&Cell::Empty)
    }
}

/// Reads a tabular file, dispatching on its extension. CSV is decoded as
/// delimited text; XLS/XLSX are decoded from the workbook's first sheet.
pub fn read_table(path: &Path) -> Result<Table, TableError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let unreadable = |source: DynError| TableError::Unreadable {
        path: path.to_path_buf(),
        source,
    };

    match extension.as_str() {
        "csv" => read_csv(path).map_err(unreadable),
        "xls" | "xlsx" => read_workbook(path).map_err(unreadable),
        _ => Err(TableError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Decodes a delimited-text file. Fields that parse as numbers become numeric
/// cells so that answers typed as `2` and stored as `2.0` compare equal.
fn read_csv(path: &Path) -> Result<Table, DynError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

    let headers = reader
        .headers()?
        .iter()
        .map(|header| header.trim().to_string())
        .collect();

    let mut table = Table::new(headers);
    for record in reader.records() {
        let record = record?;
        table.push_row(record.iter().map(cell_from_field).collect());
    }

    Ok(table)
}

/// Converts one CSV field into a cell.
fn cell_from_field(field: &str) -> Cell {
    if field.is_empty() {
        Cell::Empty
    } else if let Ok(value) = field.trim().parse::<f64>() {
        Cell::Number(value)
    } else {
        Cell::Text(field.to_string())
    }
}

/// Decodes the first sheet of an XLS/XLSX workbook.
fn read_workbook(path: &Path) -> Result<Table, DynError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or("workbook has no sheets")??;
    Ok(table_from_range(&range))
}

/// Builds a table from a decoded worksheet range. The first row provides the
/// headers; missing trailing cells are padded.
fn table_from_range(range: &Range<Data>) -> Table {
    let mut rows = range.rows();

    let headers = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .map(|cell| cell_from_sheet(cell).to_string().trim().to_string())
            .collect(),
        None => Vec::new(),
    };

    let mut table = Table::new(headers);
    for row in rows {
        table.push_row(row.iter().map(cell_from_sheet).collect());
    }
    table
}

/// Converts one calamine cell into our cell model.
fn cell_from_sheet(value: &Data) -> Cell {
    match value {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::Int(value) => Cell::Number(*value as f64),
        Data::Float(value) => Cell::Number(*value),
        Data::String(text) => Cell::Text(text.clone()),
        Data::Bool(value) => Cell::Bool(*value),
        Data::DateTime(value) => Cell::Number(value.as_f64()),
        Data::DateTimeIso(text) | Data::DurationIso(text) => Cell::Text(text.clone()),
    }
}

/// Writes the table to an XLSX workbook at `path` with a single named sheet.
pub fn write_xlsx(table: &Table, path: &Path, sheet_name: &str) -> Result<()> {
    let mut workbook = workbook_from_table(table, sheet_name)?;
    workbook
        .save(path)
        .with_context(|| format!("Could not write `{}`", path.display()))?;
    Ok(())
}

/// Serializes the table to XLSX bytes with a single named sheet, for callers
/// that hand the artifact off instead of touching the filesystem.
pub fn xlsx_bytes(table: &Table, sheet_name: &str) -> Result<Vec<u8>> {
    let mut workbook = workbook_from_table(table, sheet_name)?;
    Ok(workbook.save_to_buffer()?)
}

/// Renders the table into an in-memory workbook.
fn workbook_from_table(table: &Table, sheet_name: &str) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (column, header) in table.headers().iter().enumerate() {
        worksheet.write_string(0, column as u16, header)?;
    }

    for (index, row) in table.rows().iter().enumerate() {
        let row_number = (index + 1) as u32;
        for (column, cell) in row.iter().enumerate() {
            let column = column as u16;
            match cell {
                Cell::Empty => {}
                Cell::Number(value) => {
                    worksheet.write_number(row_number, column, *value)?;
                }
                Cell::Text(text) => {
                    worksheet.write_string(row_number, column, text)?;
                }
                Cell::Bool(value) => {
                    worksheet.write_boolean(row_number, column, *value)?;
                }
            }
        }
    }

    Ok(workbook)
}
