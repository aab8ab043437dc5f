//! Raw label/value extraction, one record per party.

use serde::Serialize;
use tracing::debug;

use crate::layout::{DetectedLayout, LayoutKind};
use crate::table::IntakeTable;

/// Ordered label → value map for one party, labels exactly as authored.
///
/// Re-inserting a label replaces its value but keeps its first position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawPartyRecord {
    entries: Vec<(String, String)>,
}

impl RawPartyRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `label`.
    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<String>) {
        let label = label.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((label, value)),
        }
    }

    /// Value for an exact label.
    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    /// Whether `label` has been recorded.
    pub fn contains(&self, label: &str) -> bool {
        self.entries.iter().any(|(l, _)| l == label)
    }

    /// Entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, v)| (l.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<L: Into<String>, V: Into<String>> FromIterator<(L, V)> for RawPartyRecord {
    fn from_iter<I: IntoIterator<Item = (L, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (l, v) in iter {
            record.insert(l, v);
        }
        record
    }
}

/// A party that survived extraction, with its column label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedParty {
    pub label: String,
    pub raw: RawPartyRecord,
}

/// Blank cells and spreadsheet null tokens carry no data.
fn is_null_token(text: &str) -> bool {
    text.is_empty() || text.eq_ignore_ascii_case("nan") || text.eq_ignore_ascii_case("none")
}

/// Turn the table into one raw record per party.
///
/// Parties whose record ends up empty are dropped; the rest keep source order.
pub fn extract_parties(table: &IntakeTable, layout: &DetectedLayout) -> Vec<ExtractedParty> {
    let records = match layout.kind {
        LayoutKind::KeyValue => vec![extract_key_value(table, layout.data_start)],
        LayoutKind::Wide => extract_wide(table, layout),
    };

    let parties: Vec<ExtractedParty> = layout
        .party_labels
        .iter()
        .zip(records)
        .filter(|(_, raw)| !raw.is_empty())
        .map(|(label, raw)| ExtractedParty {
            label: label.clone(),
            raw,
        })
        .collect();

    debug!(
        columns = layout.party_count(),
        parties = parties.len(),
        "extracted raw party records"
    );
    parties
}

fn extract_key_value(table: &IntakeTable, data_start: usize) -> RawPartyRecord {
    let mut record = RawPartyRecord::new();
    for row in data_start..table.height() {
        let label = table.cell(row, 0).unwrap_or("");
        if is_null_token(label) || label.eq_ignore_ascii_case("field") {
            continue;
        }
        record.insert(label, table.cell(row, 1).unwrap_or(""));
    }
    record
}

fn extract_wide(table: &IntakeTable, layout: &DetectedLayout) -> Vec<RawPartyRecord> {
    let mut records = vec![RawPartyRecord::new(); layout.party_count()];

    for row in layout.data_start..table.height() {
        let label = table.cell(row, 0).unwrap_or("");
        if is_null_token(label) {
            continue;
        }

        for idx in 0..records.len() {
            let value = table.cell(row, idx + 1).unwrap_or("");
            if !is_null_token(value) {
                records[idx].insert(label, value);
                continue;
            }

            // Carry the primary's value into a later party that lacks the label
            // (shared address lines are usually only written once).
            if idx == 0 || records[idx].contains(label) {
                continue;
            }
            if let Some(primary_value) = records[0].get(label).map(str::to_string) {
                records[idx].insert(label, primary_value);
            }
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::detect_layout;

    fn parties_of(rows: Vec<Vec<&str>>) -> Vec<ExtractedParty> {
        let table = IntakeTable::from_rows(rows);
        let layout = detect_layout(&table).expect("detect");
        extract_parties(&table, &layout)
    }

    #[test]
    fn key_value_skips_null_labels_and_header_token() {
        let parties = parties_of(vec![
            vec!["Field", "Value"],
            vec!["Full Name", "Robert Thornton"],
            vec!["", "orphan"],
            vec!["nan", "x"],
            vec!["None", "x"],
            vec!["field", "repeated header"],
            vec!["Risk Tolerance", "Moderate-Aggressive"],
        ]);
        assert_eq!(parties.len(), 1);
        let raw = &parties[0].raw;
        assert_eq!(raw.len(), 2);
        assert_eq!(raw.get("Full Name"), Some("Robert Thornton"));
        assert_eq!(raw.get("Risk Tolerance"), Some("Moderate-Aggressive"));
    }

    #[test]
    fn key_value_keeps_empty_values() {
        let parties = parties_of(vec![vec!["Field", "Value"], vec!["Existing Advisor", ""]]);
        assert_eq!(parties[0].raw.get("Existing Advisor"), Some(""));
    }

    #[test]
    fn duplicate_labels_replace_in_place() {
        let mut raw = RawPartyRecord::new();
        raw.insert("Phone", "1");
        raw.insert("Email", "a@b.c");
        raw.insert("Phone", "2");
        let labels: Vec<_> = raw.iter().map(|(l, _)| l).collect();
        assert_eq!(labels, ["Phone", "Email"]);
        assert_eq!(raw.get("Phone"), Some("2"));
    }

    #[test]
    fn wide_carries_primary_value_forward() {
        let parties = parties_of(vec![
            vec!["", "Robert", "Linda"],
            vec!["Full Name", "Robert Thornton", "Linda Thornton"],
            vec!["Address", "1847 Lakeshire Dr, Naperville, IL 60540", ""],
        ]);
        assert_eq!(parties.len(), 2);
        assert_eq!(
            parties[1].raw.get("Address"),
            Some("1847 Lakeshire Dr, Naperville, IL 60540")
        );
    }

    #[test]
    fn carry_forward_never_overwrites_an_existing_value() {
        let parties = parties_of(vec![
            vec!["", "Robert", "Linda"],
            vec!["Phone", "(630) 555-0192", "(630) 555-0193"],
            vec!["Phone", "(630) 555-0100", ""],
        ]);
        assert_eq!(parties[0].raw.get("Phone"), Some("(630) 555-0100"));
        assert_eq!(parties[1].raw.get("Phone"), Some("(630) 555-0193"));
    }

    #[test]
    fn carry_forward_requires_primary_value() {
        let parties = parties_of(vec![
            vec!["", "Robert", "Linda"],
            vec!["Full Name", "Robert Thornton", "Linda Thornton"],
            vec!["Employer", "", "Naperville Schools"],
            vec!["Occupation", "nan", ""],
        ]);
        assert_eq!(parties[0].raw.get("Employer"), None);
        assert_eq!(parties[1].raw.get("Employer"), Some("Naperville Schools"));
        assert!(!parties[0].raw.contains("Occupation"));
        assert!(!parties[1].raw.contains("Occupation"));
    }

    #[test]
    fn blank_columns_inherit_from_primary() {
        let parties = parties_of(vec![
            vec!["First Name", "Robert", "", ""],
            vec!["Last Name", "Thornton", "", ""],
        ]);
        // Every later party inherits from party 0, so none is empty.
        assert_eq!(parties.len(), 3);
        assert_eq!(parties[2].raw.get("Last Name"), Some("Thornton"));
    }

    #[test]
    fn party_with_no_cells_and_empty_primary_is_dropped() {
        let parties = parties_of(vec![
            vec!["", "Robert", "Linda"],
            vec!["Spouse Note", "", "Prefers email"],
        ]);
        assert_eq!(parties.len(), 1);
        assert_eq!(parties[0].label, "Linda");
    }
}
