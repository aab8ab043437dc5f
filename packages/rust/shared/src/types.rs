//! Core domain types for IntakeForge households and documents.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of passthrough labels retained per person.
///
/// Intake sheets are human-authored and short; anything beyond this is
/// reported as a gap rather than stored.
pub const PASSTHROUGH_LIMIT: usize = 256;

/// Separator used when several intake labels accumulate into Notes.
pub const NOTES_SEPARATOR: &str = "  ";

// ---------------------------------------------------------------------------
// HouseholdId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for stored household identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HouseholdId(pub Uuid);

impl HouseholdId {
    /// Generate a new time-sortable household identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for HouseholdId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for HouseholdId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for HouseholdId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// CanonicalField
// ---------------------------------------------------------------------------

/// The fixed vocabulary every recognised intake label is normalized into.
///
/// Declaration order is the display order used by [`PersonRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CanonicalField {
    #[serde(rename = "First Name")]
    FirstName,
    #[serde(rename = "Middle Initial")]
    MiddleInitial,
    #[serde(rename = "Last Name")]
    LastName,
    #[serde(rename = "Date of Birth")]
    DateOfBirth,
    #[serde(rename = "Address")]
    Address,
    #[serde(rename = "City")]
    City,
    #[serde(rename = "State")]
    State,
    #[serde(rename = "ZIP")]
    Zip,
    #[serde(rename = "Phone")]
    Phone,
    #[serde(rename = "Email")]
    Email,
    #[serde(rename = "Annual Income")]
    AnnualIncome,
    #[serde(rename = "Est. Net Worth")]
    NetWorth,
    #[serde(rename = "Liquid Assets")]
    LiquidAssets,
    #[serde(rename = "Employer")]
    Employer,
    #[serde(rename = "Occupation")]
    Occupation,
    #[serde(rename = "Investment Goal")]
    InvestmentGoal,
    #[serde(rename = "Risk Tolerance")]
    RiskTolerance,
    #[serde(rename = "Time Horizon (yrs)")]
    TimeHorizon,
    #[serde(rename = "Referral Source")]
    ReferralSource,
    #[serde(rename = "Notes")]
    Notes,
    #[serde(rename = "WAS")]
    Was,
    #[serde(rename = "Fee")]
    Fee,
}

impl CanonicalField {
    /// Every canonical field, in display order.
    pub const ALL: [CanonicalField; 22] = [
        Self::FirstName,
        Self::MiddleInitial,
        Self::LastName,
        Self::DateOfBirth,
        Self::Address,
        Self::City,
        Self::State,
        Self::Zip,
        Self::Phone,
        Self::Email,
        Self::AnnualIncome,
        Self::NetWorth,
        Self::LiquidAssets,
        Self::Employer,
        Self::Occupation,
        Self::InvestmentGoal,
        Self::RiskTolerance,
        Self::TimeHorizon,
        Self::ReferralSource,
        Self::Notes,
        Self::Was,
        Self::Fee,
    ];

    /// The canonical display label (e.g. `"Est. Net Worth"`).
    pub fn label(self) -> &'static str {
        match self {
            Self::FirstName => "First Name",
            Self::MiddleInitial => "Middle Initial",
            Self::LastName => "Last Name",
            Self::DateOfBirth => "Date of Birth",
            Self::Address => "Address",
            Self::City => "City",
            Self::State => "State",
            Self::Zip => "ZIP",
            Self::Phone => "Phone",
            Self::Email => "Email",
            Self::AnnualIncome => "Annual Income",
            Self::NetWorth => "Est. Net Worth",
            Self::LiquidAssets => "Liquid Assets",
            Self::Employer => "Employer",
            Self::Occupation => "Occupation",
            Self::InvestmentGoal => "Investment Goal",
            Self::RiskTolerance => "Risk Tolerance",
            Self::TimeHorizon => "Time Horizon (yrs)",
            Self::ReferralSource => "Referral Source",
            Self::Notes => "Notes",
            Self::Was => "WAS",
            Self::Fee => "Fee",
        }
    }

    /// Look up a field by its canonical label, ignoring case.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.label().eq_ignore_ascii_case(label))
    }

    /// Internal-only fields never leave the firm (excluded from shared context).
    pub fn is_internal(self) -> bool {
        matches!(self, Self::Was | Self::Fee)
    }
}

impl std::fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// PersonRecord
// ---------------------------------------------------------------------------

/// A label that matched no normalization rule, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassthroughField {
    /// The trimmed label as authored.
    pub label: String,
    /// The trimmed value.
    pub value: String,
}

/// One party's canonical attributes plus any unrecognised labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRecord {
    /// Canonical attributes (unique keys).
    #[serde(default)]
    fields: BTreeMap<CanonicalField, String>,
    /// Unrecognised labels in first-seen order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    passthrough: Vec<PassthroughField>,
}

impl PersonRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored value for `field`, if any.
    pub fn get(&self, field: CanonicalField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    /// The stored value for `field`, or `""`.
    pub fn value(&self, field: CanonicalField) -> &str {
        self.get(field).unwrap_or("")
    }

    /// Whether `field` has been set (even to an empty string).
    pub fn contains(&self, field: CanonicalField) -> bool {
        self.fields.contains_key(&field)
    }

    /// Set `field`, replacing any previous value.
    pub fn set(&mut self, field: CanonicalField, value: impl Into<String>) {
        self.fields.insert(field, value.into());
    }

    /// Set `field` only if it has no value yet. Returns whether it was written.
    pub fn set_if_absent(&mut self, field: CanonicalField, value: impl Into<String>) -> bool {
        if self.fields.contains_key(&field) {
            return false;
        }
        self.fields.insert(field, value.into());
        true
    }

    /// Append to `field`, joining with `separator` when a value already exists.
    pub fn append(&mut self, field: CanonicalField, value: &str, separator: &str) {
        match self.fields.get_mut(&field) {
            Some(existing) if !existing.is_empty() => {
                existing.push_str(separator);
                existing.push_str(value);
                let trimmed = existing.trim().to_string();
                *existing = trimmed;
            }
            _ => {
                self.fields.insert(field, value.to_string());
            }
        }
    }

    /// Store an unrecognised label. A repeated label replaces its value in place.
    ///
    /// Returns `false` when the passthrough list is full and the label was not kept.
    pub fn push_passthrough(&mut self, label: impl Into<String>, value: impl Into<String>) -> bool {
        let label = label.into();
        let value = value.into();
        if let Some(existing) = self.passthrough.iter_mut().find(|p| p.label == label) {
            existing.value = value;
            return true;
        }
        if self.passthrough.len() >= PASSTHROUGH_LIMIT {
            return false;
        }
        self.passthrough.push(PassthroughField { label, value });
        true
    }

    /// Passthrough labels in first-seen order.
    pub fn passthrough(&self) -> &[PassthroughField] {
        &self.passthrough
    }

    /// A passthrough value by exact label, ignoring case.
    pub fn passthrough_value(&self, label: &str) -> Option<&str> {
        self.passthrough
            .iter()
            .find(|p| p.label.eq_ignore_ascii_case(label))
            .map(|p| p.value.as_str())
    }

    /// Look up a value by canonical label first, then by passthrough label.
    pub fn lookup(&self, label: &str) -> Option<&str> {
        CanonicalField::from_label(label)
            .and_then(|f| self.get(f))
            .or_else(|| self.passthrough_value(label))
    }

    /// First non-empty value among `labels` (canonical or passthrough), or `""`.
    pub fn first_of(&self, labels: &[&str]) -> &str {
        labels
            .iter()
            .filter_map(|l| self.lookup(l))
            .find(|v| !v.is_empty())
            .unwrap_or("")
    }

    /// Canonical fields in display order.
    pub fn canonical(&self) -> impl Iterator<Item = (CanonicalField, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Full name from First, Middle Initial and Last, falling back to a
    /// passthrough `Full Name`.
    pub fn full_name(&self) -> String {
        let joined = crate::names::join_name(
            self.value(CanonicalField::FirstName),
            self.value(CanonicalField::MiddleInitial),
            self.value(CanonicalField::LastName),
        );
        if joined.is_empty() {
            self.passthrough_value("Full Name").unwrap_or("").trim().to_string()
        } else {
            joined
        }
    }

    /// Number of non-empty values (canonical and passthrough).
    pub fn populated_count(&self) -> usize {
        self.fields.values().filter(|v| !v.is_empty()).count()
            + self.passthrough.iter().filter(|p| !p.value.is_empty()).count()
    }

    /// Whether the record holds nothing at all.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.passthrough.is_empty()
    }
}

// ---------------------------------------------------------------------------
// HouseholdRecord
// ---------------------------------------------------------------------------

/// Flat-record key for the co-holder's name.
pub const CO_HOLDER_NAME_KEY: &str = "Co-Account Holder Name";
/// Flat-record key for the co-holder's date of birth.
pub const CO_HOLDER_DOB_KEY: &str = "Co-Account Holder DOB";

/// Name and date of birth of a non-primary household member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartySummary {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub date_of_birth: String,
}

/// A primary holder plus optional co-holder and ordered dependents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseholdRecord {
    /// Party 0, verbatim.
    pub primary: PersonRecord,
    /// Party 1's name and date of birth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub co_holder: Option<PartySummary>,
    /// Parties 2..N, numbered from 1 in source order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependents: Vec<PartySummary>,
}

impl HouseholdRecord {
    /// Display name of the household (the primary's full name).
    pub fn display_name(&self) -> String {
        self.primary.full_name()
    }

    /// The household as one flat label → value list.
    ///
    /// Canonical fields come first, then passthrough labels, then co-holder
    /// and numbered dependent keys.
    pub fn flat_fields(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = self
            .primary
            .canonical()
            .map(|(k, v)| (k.label().to_string(), v.to_string()))
            .collect();
        out.extend(
            self.primary
                .passthrough()
                .iter()
                .map(|p| (p.label.clone(), p.value.clone())),
        );
        if let Some(co) = &self.co_holder {
            out.push((CO_HOLDER_NAME_KEY.to_string(), co.name.clone()));
            out.push((CO_HOLDER_DOB_KEY.to_string(), co.date_of_birth.clone()));
        }
        for (idx, dep) in self.dependents.iter().enumerate() {
            let n = idx + 1;
            out.push((format!("Dependent {n} Name"), dep.name.clone()));
            if !dep.date_of_birth.is_empty() {
                out.push((format!("Dependent {n} DOB"), dep.date_of_birth.clone()));
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// TargetFieldMap
// ---------------------------------------------------------------------------

/// One document field and the value mapped into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetField {
    pub key: String,
    pub value: String,
}

/// Document-specific field key → value, in mapping order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetFieldMap {
    entries: Vec<TargetField>,
}

impl TargetFieldMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing an existing value in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(existing) => existing.value = value,
            None => self.entries.push(TargetField { key, value }),
        }
    }

    /// Value for `key`, if mapped.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }

    /// All entries in mapping order, including empty ones.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|e| (e.key.as_str(), e.value.as_str()))
    }

    /// Entries with a non-empty value, in mapping order.
    pub fn populated(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(_, v)| !v.trim().is_empty())
    }

    /// Number of entries with a non-empty value.
    pub fn populated_count(&self) -> usize {
        self.populated().count()
    }

    /// Keys that were mapped to an empty value.
    pub fn empty_keys(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, v)| v.trim().is_empty())
            .map(|(k, _)| k)
            .collect()
    }

    /// Total number of mapped keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no keys were mapped.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TargetFieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.set(k, v);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn household_id_roundtrip() {
        let id = HouseholdId::new();
        let s = id.to_string();
        let parsed: HouseholdId = s.parse().expect("parse HouseholdId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn canonical_labels_resolve_case_insensitively() {
        assert_eq!(
            CanonicalField::from_label(" est. net worth "),
            Some(CanonicalField::NetWorth)
        );
        assert_eq!(CanonicalField::from_label("zip"), Some(CanonicalField::Zip));
        assert_eq!(CanonicalField::from_label("Spouse Name"), None);
        for field in CanonicalField::ALL {
            assert_eq!(CanonicalField::from_label(field.label()), Some(field));
        }
    }

    #[test]
    fn set_if_absent_is_first_writer_wins() {
        let mut rec = PersonRecord::new();
        assert!(rec.set_if_absent(CanonicalField::RiskTolerance, "Moderate"));
        assert!(!rec.set_if_absent(CanonicalField::RiskTolerance, "Growth"));
        assert_eq!(rec.value(CanonicalField::RiskTolerance), "Moderate");
    }

    #[test]
    fn append_accumulates_notes() {
        let mut rec = PersonRecord::new();
        rec.append(CanonicalField::Notes, "first note", NOTES_SEPARATOR);
        rec.append(CanonicalField::Notes, "second note", NOTES_SEPARATOR);
        assert_eq!(rec.value(CanonicalField::Notes), "first note  second note");
    }

    #[test]
    fn passthrough_keeps_casing_and_replaces_in_place() {
        let mut rec = PersonRecord::new();
        assert!(rec.push_passthrough("SSN Last 4", "4721"));
        assert!(rec.push_passthrough("Spouse Name", "Linda Thornton"));
        assert!(rec.push_passthrough("SSN Last 4", "0000"));
        assert_eq!(rec.passthrough().len(), 2);
        assert_eq!(rec.passthrough()[0].label, "SSN Last 4");
        assert_eq!(rec.passthrough()[0].value, "0000");
        assert_eq!(rec.lookup("spouse name"), Some("Linda Thornton"));
    }

    #[test]
    fn passthrough_is_bounded() {
        let mut rec = PersonRecord::new();
        for i in 0..PASSTHROUGH_LIMIT {
            assert!(rec.push_passthrough(format!("Extra {i}"), "x"));
        }
        assert!(!rec.push_passthrough("One Too Many", "x"));
        assert_eq!(rec.passthrough().len(), PASSTHROUGH_LIMIT);
    }

    #[test]
    fn full_name_prefers_canonical_parts() {
        let mut rec = PersonRecord::new();
        rec.push_passthrough("Full Name", "Ignored Person");
        rec.set(CanonicalField::FirstName, "Robert");
        rec.set(CanonicalField::MiddleInitial, "A");
        rec.set(CanonicalField::LastName, "Thornton");
        assert_eq!(rec.full_name(), "Robert A Thornton");

        let mut only_full = PersonRecord::new();
        only_full.push_passthrough("Full Name", "Linda Thornton");
        assert_eq!(only_full.full_name(), "Linda Thornton");
    }

    #[test]
    fn household_flattens_co_holder_and_dependents() {
        let mut primary = PersonRecord::new();
        primary.set(CanonicalField::FirstName, "Robert");
        primary.set(CanonicalField::LastName, "Thornton");
        let household = HouseholdRecord {
            primary,
            co_holder: Some(PartySummary {
                name: "Linda Thornton".into(),
                date_of_birth: "1970-09-22".into(),
            }),
            dependents: vec![PartySummary {
                name: "Sarah Thornton".into(),
                date_of_birth: String::new(),
            }],
        };

        let flat = household.flat_fields();
        assert!(flat.contains(&(CO_HOLDER_NAME_KEY.into(), "Linda Thornton".into())));
        assert!(flat.contains(&("Dependent 1 Name".into(), "Sarah Thornton".into())));
        assert!(!flat.iter().any(|(k, _)| k == "Dependent 1 DOB"));
        assert_eq!(household.display_name(), "Robert Thornton");
    }

    #[test]
    fn household_serialization() {
        let mut primary = PersonRecord::new();
        primary.set(CanonicalField::FirstName, "Robert");
        primary.set(CanonicalField::NetWorth, "3200000");
        primary.push_passthrough("SSN Last 4", "4721");
        let household = HouseholdRecord {
            primary,
            co_holder: None,
            dependents: vec![],
        };

        let json = serde_json::to_string(&household).expect("serialize");
        assert!(json.contains("\"Est. Net Worth\":\"3200000\""));
        let parsed: HouseholdRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, household);
    }

    #[test]
    fn target_map_preserves_order_and_reports_empties() {
        let mut map = TargetFieldMap::new();
        map.set("PI_FirstName", "Robert");
        map.set("PI_MI", "");
        map.set("PI_LastName", "Thornton");
        map.set("PI_FirstName", "Bob");

        let keys: Vec<_> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["PI_FirstName", "PI_MI", "PI_LastName"]);
        assert_eq!(map.get("PI_FirstName"), Some("Bob"));
        assert_eq!(map.populated_count(), 2);
        assert_eq!(map.empty_keys(), ["PI_MI"]);
    }
}
