//! Per-household account workbooks.
//!
//! An account workbook holds one sheet per topic (account summary, activity,
//! tax, beneficiaries, allocation). Row 0 of each sheet is the header row and
//! every later non-blank row is one record.

use std::path::{Path, PathBuf};

use calamine::{Reader, open_workbook_auto};
use intakeforge_shared::{IntakeForgeError, Result};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::table::range_rows;

/// One sheet of an account workbook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccountSheet {
    pub name: String,
    pub headers: Vec<String>,
    /// Data rows, each padded or cut to `headers.len()`.
    pub rows: Vec<Vec<String>>,
}

impl AccountSheet {
    /// Build a sheet from raw rows; row 0 is the header row.
    ///
    /// Blank rows are skipped. A sheet with no rows has no headers.
    pub fn from_rows<R, C>(name: impl Into<String>, rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = C>,
        C: AsRef<str>,
    {
        let mut rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|c| c.as_ref().trim().to_string())
                    .collect::<Vec<_>>()
            })
            .filter(|row| row.iter().any(|c| !c.is_empty()));

        let mut headers = rows.next().unwrap_or_default();
        while headers.last().is_some_and(String::is_empty) {
            headers.pop();
        }
        let width = headers.len();
        let rows = rows
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();

        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// Whether the sheet has any data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column index of `header`, matched exactly after trimming.
    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header.trim())
    }

    /// Data rows as (header, value) lookups.
    pub fn records(&self) -> impl Iterator<Item = AccountRow<'_>> {
        self.rows.iter().map(move |cells| AccountRow { sheet: self, cells })
    }
}

/// One data row of an [`AccountSheet`].
#[derive(Debug, Clone, Copy)]
pub struct AccountRow<'a> {
    sheet: &'a AccountSheet,
    cells: &'a [String],
}

impl<'a> AccountRow<'a> {
    /// Cell under `header`, or `""` when the sheet has no such column.
    pub fn get(&self, header: &str) -> &'a str {
        self.sheet
            .column(header)
            .and_then(|idx| self.cells.get(idx))
            .map_or("", String::as_str)
    }

    /// All cells in header order.
    pub fn cells(&self) -> &'a [String] {
        self.cells
    }
}

/// All sheets of an account workbook, in workbook order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccountWorkbook {
    pub path: Option<PathBuf>,
    pub sheets: Vec<AccountSheet>,
}

impl AccountWorkbook {
    /// An in-memory workbook.
    pub fn from_sheets(sheets: Vec<AccountSheet>) -> Self {
        Self { path: None, sheets }
    }

    /// Read every sheet of the workbook at `path`.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let mut workbook = open_workbook_auto(path).map_err(|e| {
            IntakeForgeError::Read(format!("failed to open workbook {}: {e}", path.display()))
        })?;

        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook.worksheet_range(&name).map_err(|e| {
                IntakeForgeError::Read(format!(
                    "failed to read sheet '{name}' of {}: {e}",
                    path.display()
                ))
            })?;
            let sheet = AccountSheet::from_rows(name, range_rows(&range));
            debug!(sheet = %sheet.name, rows = sheet.rows.len(), "loaded account sheet");
            sheets.push(sheet);
        }

        Ok(Self {
            path: Some(path.to_path_buf()),
            sheets,
        })
    }

    /// Sheet by exact name.
    pub fn sheet(&self, name: &str) -> Option<&AccountSheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}
