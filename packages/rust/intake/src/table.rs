//! Raw intake tables loaded from workbooks or CSV files.
//!
//! Every cell is reduced to trimmed text up front so the later stages only
//! ever deal with strings, the way the intake sheets are authored.

use std::io::Read;
use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};
use chrono::{Duration, NaiveDate};
use intakeforge_shared::{IntakeForgeError, Result};
use tracing::debug;

/// A rectangular-ish grid of cell text. Rows may have different lengths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntakeTable {
    rows: Vec<Vec<String>>,
}

impl IntakeTable {
    /// Build a table from in-memory rows, trimming every cell.
    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = C>,
        C: AsRef<str>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(|c| c.as_ref().trim().to_string()).collect())
                .collect(),
        }
    }

    /// Load a table from a file, choosing the reader by extension.
    ///
    /// `.csv` is read as plain comma-separated text; workbook formats
    /// (`.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`) use their first sheet.
    pub fn load(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => {
                let file =
                    std::fs::File::open(path).map_err(|e| IntakeForgeError::io(path, e))?;
                Self::from_csv_reader(file)
            }
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Self::load_workbook(path),
            other => Err(IntakeForgeError::Read(format!(
                "{}: unsupported intake file type '{other}'",
                path.display()
            ))),
        }
    }

    /// Read the first sheet of a workbook.
    pub fn load_workbook(path: &Path) -> Result<Self> {
        let mut workbook = open_workbook_auto(path).map_err(|e| {
            IntakeForgeError::Read(format!("failed to open workbook {}: {e}", path.display()))
        })?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| {
                IntakeForgeError::Read(format!("workbook {} has no sheets", path.display()))
            })?
            .map_err(|e| {
                IntakeForgeError::Read(format!("failed to read first sheet of {}: {e}", path.display()))
            })?;

        let rows = range_rows(&range);

        debug!(path = %path.display(), rows = rows.len(), "loaded workbook sheet");
        Ok(Self::from_rows(rows))
    }

    /// Read comma-separated text with no header handling (row 0 is data too).
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record.map_err(|e| IntakeForgeError::Read(format!("invalid CSV: {e}")))?;
            rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
        }
        Ok(Self::from_rows(rows))
    }

    /// All rows.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Text of the cell at (`row`, `col`), if the row is that wide.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Width of the widest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// Cell text of a sheet range, with columns re-aligned to column A.
///
/// Ranges start at the first used cell, so a sheet whose column A is empty
/// would otherwise shift every column left by one.
pub(crate) fn range_rows(range: &Range<Data>) -> Vec<Vec<String>> {
    let col_offset = range.start().map(|(_, col)| col as usize).unwrap_or(0);
    range
        .rows()
        .map(|row| {
            std::iter::repeat_n(String::new(), col_offset)
                .chain(row.iter().map(cell_text))
                .collect()
        })
        .collect()
}

/// Render one workbook cell as the text a human would read.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => float_text(*f),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_text(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        #[allow(unreachable_patterns)]
        other => other.to_string(),
    }
}

/// Whole floats print without a trailing `.0` (ZIP codes, incomes).
fn float_text(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

/// Convert an Excel serial date into `YYYY-MM-DD HH:MM:SS`.
fn excel_serial_text(serial: f64) -> String {
    let Some(epoch) = NaiveDate::from_ymd_opt(1899, 12, 30).and_then(|d| d.and_hms_opt(0, 0, 0))
    else {
        return serial.to_string();
    };
    let millis = (serial * 86_400_000.0).round() as i64;
    match epoch.checked_add_signed(Duration::milliseconds(millis)) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => serial.to_string(),
    }
}
