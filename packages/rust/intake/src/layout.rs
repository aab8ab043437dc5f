//! Intake layout detection.
//!
//! Intake sheets arrive in one of two shapes. Probes are tried in priority
//! order; the headerless wide probe is the always-last fallback, so detection
//! only fails when the table is too small to hold any data.

use intakeforge_shared::{IntakeForgeError, Result};
use serde::Serialize;
use tracing::debug;

use crate::table::IntakeTable;

/// Which shape the intake table has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    /// Row 0 is `Field | Value`; one attribute per following row, one party.
    KeyValue,
    /// Column 0 holds labels; each further column is one party.
    Wide,
}

/// The detected layout plus where data starts and how parties are named.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedLayout {
    pub kind: LayoutKind,
    /// One label per party column (a single label for key-value sheets).
    pub party_labels: Vec<String>,
    /// Index of the first data row.
    pub data_start: usize,
}

impl DetectedLayout {
    /// Number of party columns.
    pub fn party_count(&self) -> usize {
        self.party_labels.len()
    }
}

// ---------------------------------------------------------------------------
// Probes
// ---------------------------------------------------------------------------

/// One candidate layout.
trait LayoutProbe: Send + Sync {
    /// Whether this probe recognises the table.
    fn detect(&self, table: &IntakeTable) -> bool;

    /// Describe the layout. Only called after `detect` returned `true`.
    fn layout(&self, table: &IntakeTable) -> DetectedLayout;

    /// Probe name for tracing.
    fn name(&self) -> &'static str;
}

/// `Field | Value` header in row 0.
struct KeyValueProbe;

impl LayoutProbe for KeyValueProbe {
    fn detect(&self, table: &IntakeTable) -> bool {
        let first = table.cell(0, 0).unwrap_or("");
        let second = table.cell(0, 1).unwrap_or("");
        first.eq_ignore_ascii_case("field") && second.eq_ignore_ascii_case("value")
    }

    fn layout(&self, _table: &IntakeTable) -> DetectedLayout {
        DetectedLayout {
            kind: LayoutKind::KeyValue,
            party_labels: vec!["Client 1".to_string()],
            data_start: 1,
        }
    }

    fn name(&self) -> &'static str {
        "key-value"
    }
}

/// Blank top-left cell: row 0 names the parties.
struct HeaderedWideProbe;

impl LayoutProbe for HeaderedWideProbe {
    fn detect(&self, table: &IntakeTable) -> bool {
        table.cell(0, 0).is_none_or(str::is_empty)
    }

    fn layout(&self, table: &IntakeTable) -> DetectedLayout {
        let party_labels = (1..table.width())
            .map(|col| match table.cell(0, col) {
                Some(label) if !label.is_empty() => label.to_string(),
                _ => synthetic_label(col),
            })
            .collect();
        DetectedLayout {
            kind: LayoutKind::Wide,
            party_labels,
            data_start: 1,
        }
    }

    fn name(&self) -> &'static str {
        "wide-with-header"
    }
}

/// Anything else: every row is data, parties get synthetic labels.
struct HeaderlessWideProbe;

impl LayoutProbe for HeaderlessWideProbe {
    fn detect(&self, _table: &IntakeTable) -> bool {
        true
    }

    fn layout(&self, table: &IntakeTable) -> DetectedLayout {
        DetectedLayout {
            kind: LayoutKind::Wide,
            party_labels: (1..table.width()).map(synthetic_label).collect(),
            data_start: 0,
        }
    }

    fn name(&self) -> &'static str {
        "wide-headerless"
    }
}

/// `"Client N"` for party column `col` (1-based).
fn synthetic_label(col: usize) -> String {
    format!("Client {col}")
}

static PROBES: &[&dyn LayoutProbe] = &[&KeyValueProbe, &HeaderedWideProbe, &HeaderlessWideProbe];

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Classify `table` as key-value or wide.
///
/// Fails with a format error when the table has fewer than two columns or
/// no data rows after its header.
pub fn detect_layout(table: &IntakeTable) -> Result<DetectedLayout> {
    if table.width() < 2 {
        return Err(IntakeForgeError::format(format!(
            "intake has {} column(s), at least 2 are required",
            table.width()
        )));
    }

    let probe = PROBES
        .iter()
        .find(|p| p.detect(table))
        .unwrap_or(&PROBES[PROBES.len() - 1]);
    let layout = probe.layout(table);

    if table.height() <= layout.data_start {
        return Err(IntakeForgeError::format("no data rows after the header"));
    }

    debug!(
        probe = probe.name(),
        parties = layout.party_count(),
        data_start = layout.data_start,
        "detected intake layout"
    );
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_value_header_is_key_value() {
        let table = IntakeTable::from_rows([vec!["FIELD", "value"], vec!["Email", "a@b.c"]]);
        let layout = detect_layout(&table).expect("detect");
        assert_eq!(layout.kind, LayoutKind::KeyValue);
        assert_eq!(layout.data_start, 1);
        assert_eq!(layout.party_count(), 1);
    }

    #[test]
    fn blank_corner_uses_header_labels() {
        let table = IntakeTable::from_rows([
            vec!["", "Robert", "", "Sarah"],
            vec!["Full Name", "Robert Thornton", "Linda Thornton", "Sarah Thornton"],
        ]);
        let layout = detect_layout(&table).expect("detect");
        assert_eq!(layout.kind, LayoutKind::Wide);
        assert_eq!(layout.data_start, 1);
        assert_eq!(layout.party_labels, ["Robert", "Client 2", "Sarah"]);
    }

    #[test]
    fn labelled_corner_is_headerless_wide() {
        let table = IntakeTable::from_rows([
            vec!["First Name", "Robert", "Linda"],
            vec!["Last Name", "Thornton", "Thornton"],
        ]);
        let layout = detect_layout(&table).expect("detect");
        assert_eq!(layout.kind, LayoutKind::Wide);
        assert_eq!(layout.data_start, 0);
        assert_eq!(layout.party_labels, ["Client 1", "Client 2"]);
    }

    #[test]
    fn single_column_is_rejected() {
        let table = IntakeTable::from_rows([vec!["First Name"], vec!["Last Name"]]);
        let err = detect_layout(&table).expect_err("should fail");
        assert!(err.is_format());
        assert!(err.to_string().contains("key-value"));
    }

    #[test]
    fn header_without_data_is_rejected() {
        let table = IntakeTable::from_rows([vec!["Field", "Value"]]);
        let err = detect_layout(&table).expect_err("should fail");
        assert!(err.is_format());
        assert!(err.to_string().contains("no data rows"));
    }

    #[test]
    fn empty_table_is_rejected() {
        let table = IntakeTable::default();
        assert!(detect_layout(&table).expect_err("should fail").is_format());
    }
}
