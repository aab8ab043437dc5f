//! Rule-based normalization of raw intake labels into canonical fields.
//!
//! [`RULES`] is evaluated top to bottom against the trimmed, lower-cased
//! label and the first match wins. Each rule carries an explicit
//! [`RuleAction`] so overwrite, first-writer-wins and accumulate semantics
//! are visible in the table rather than buried in branches. Labels that
//! match nothing are kept as passthrough and reported as
//! [`ClassificationGap`]s.

use intakeforge_shared::{CanonicalField, NOTES_SEPARATOR, PersonRecord, split_full_name};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::extract::RawPartyRecord;

// ---------------------------------------------------------------------------
// Rule table
// ---------------------------------------------------------------------------

/// What a matched rule does with the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    /// Split a full name into First Name, Middle Initial and Last Name.
    SplitName,
    /// Write the field, replacing any earlier value.
    Assign(CanonicalField),
    /// Write the date part (text before the first space) of the value.
    AssignDate(CanonicalField),
    /// Write the field only if nothing has set it yet.
    AssignIfAbsent(CanonicalField),
    /// Seed both Investment Goal and Risk Tolerance, each only if absent.
    SeedGoalAndRisk,
    /// Append to the field, joined by [`NOTES_SEPARATOR`].
    Accumulate(CanonicalField),
}

/// One entry of the normalization table.
#[derive(Debug)]
pub struct Rule {
    /// Short rule name for logs and tests.
    pub name: &'static str,
    /// Predicate over the trimmed, lower-cased label.
    pub matches: fn(&str) -> bool,
    pub action: RuleAction,
}

fn is_any(label: &str, options: &[&str]) -> bool {
    options.contains(&label)
}

fn contains_any(label: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| label.contains(n))
}

fn full_name(l: &str) -> bool {
    (l.contains("first") && l.contains("last")) || is_any(l, &["full name", "name"])
}
fn first_name(l: &str) -> bool {
    is_any(l, &["first name", "firstname", "first"])
}
fn last_name(l: &str) -> bool {
    is_any(l, &["last name", "lastname", "last"])
}
fn date_of_birth(l: &str) -> bool {
    is_any(l, &["dob", "date of birth", "birthdate", "birth date"])
}
fn address(l: &str) -> bool {
    l == "address"
}
fn city(l: &str) -> bool {
    l == "city"
}
fn state(l: &str) -> bool {
    l == "state"
}
fn zip(l: &str) -> bool {
    is_any(l, &["zip", "zip code", "postal code"])
}
fn phone(l: &str) -> bool {
    l == "phone"
}
fn email(l: &str) -> bool {
    l == "email"
}
fn annual_income(l: &str) -> bool {
    l.contains("annual income")
}
fn net_worth(l: &str) -> bool {
    l.contains("net worth")
}
fn liquid_assets(l: &str) -> bool {
    l.contains("liquid")
}
fn employer(l: &str) -> bool {
    is_any(l, &["employer", "company", "firm"])
}
fn occupation(l: &str) -> bool {
    contains_any(l, &["occupation", "title", "job title"])
}
fn investment_objective(l: &str) -> bool {
    contains_any(l, &["investment objective", "objective", "investment goal"])
}
fn risk_tolerance(l: &str) -> bool {
    l.contains("risk") && l.contains("tolerance")
}
fn time_horizon(l: &str) -> bool {
    contains_any(l, &["time horizon", "horizon"])
}
fn referral(l: &str) -> bool {
    contains_any(l, &["referral", "lead source", "referred", "source"])
}
fn advisor(l: &str) -> bool {
    l.contains("advisor")
}
fn notes(l: &str) -> bool {
    contains_any(l, &["note", "account"])
}
fn was(l: &str) -> bool {
    l.contains("was")
}
fn fee(l: &str) -> bool {
    l.contains("fee")
}

/// The normalization table, in precedence order.
pub static RULES: &[Rule] = &[
    Rule { name: "full-name", matches: full_name, action: RuleAction::SplitName },
    Rule { name: "first-name", matches: first_name, action: RuleAction::Assign(CanonicalField::FirstName) },
    Rule { name: "last-name", matches: last_name, action: RuleAction::Assign(CanonicalField::LastName) },
    Rule { name: "date-of-birth", matches: date_of_birth, action: RuleAction::AssignDate(CanonicalField::DateOfBirth) },
    Rule { name: "address", matches: address, action: RuleAction::Assign(CanonicalField::Address) },
    Rule { name: "city", matches: city, action: RuleAction::Assign(CanonicalField::City) },
    Rule { name: "state", matches: state, action: RuleAction::Assign(CanonicalField::State) },
    Rule { name: "zip", matches: zip, action: RuleAction::Assign(CanonicalField::Zip) },
    Rule { name: "phone", matches: phone, action: RuleAction::Assign(CanonicalField::Phone) },
    Rule { name: "email", matches: email, action: RuleAction::Assign(CanonicalField::Email) },
    Rule { name: "annual-income", matches: annual_income, action: RuleAction::Assign(CanonicalField::AnnualIncome) },
    Rule { name: "net-worth", matches: net_worth, action: RuleAction::Assign(CanonicalField::NetWorth) },
    Rule { name: "liquid-assets", matches: liquid_assets, action: RuleAction::Assign(CanonicalField::LiquidAssets) },
    Rule { name: "employer", matches: employer, action: RuleAction::Assign(CanonicalField::Employer) },
    Rule { name: "occupation", matches: occupation, action: RuleAction::Assign(CanonicalField::Occupation) },
    Rule { name: "investment-objective", matches: investment_objective, action: RuleAction::SeedGoalAndRisk },
    Rule { name: "risk-tolerance", matches: risk_tolerance, action: RuleAction::Assign(CanonicalField::RiskTolerance) },
    Rule { name: "time-horizon", matches: time_horizon, action: RuleAction::Assign(CanonicalField::TimeHorizon) },
    Rule { name: "referral-source", matches: referral, action: RuleAction::Assign(CanonicalField::ReferralSource) },
    Rule { name: "existing-advisor", matches: advisor, action: RuleAction::AssignIfAbsent(CanonicalField::ReferralSource) },
    Rule { name: "notes", matches: notes, action: RuleAction::Accumulate(CanonicalField::Notes) },
    Rule { name: "was", matches: was, action: RuleAction::Assign(CanonicalField::Was) },
    Rule { name: "fee", matches: fee, action: RuleAction::Assign(CanonicalField::Fee) },
];

/// The first rule matching `label`, if any.
pub fn rule_for(label: &str) -> Option<&'static Rule> {
    let key = label.trim().to_lowercase();
    RULES.iter().find(|rule| (rule.matches)(&key))
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// A label no rule recognised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationGap {
    /// The trimmed label as authored.
    pub label: String,
    /// `true` when the passthrough list was full and the value was not kept.
    pub dropped: bool,
}

/// A canonical record plus the labels that fell through the rule table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Normalized {
    pub record: PersonRecord,
    pub gaps: Vec<ClassificationGap>,
}

/// Normalize one party's raw labels into a [`PersonRecord`].
#[instrument(skip_all, fields(labels = raw.len()))]
pub fn normalize(raw: &RawPartyRecord) -> Normalized {
    let mut record = PersonRecord::new();
    let mut gaps = Vec::new();

    for (label, value) in raw.iter() {
        let label = label.trim();
        let value = value.trim();

        match rule_for(label) {
            Some(rule) => apply(&mut record, rule.action, value),
            None => {
                let kept = record.push_passthrough(label, value);
                if kept {
                    debug!(label, "label kept as passthrough");
                } else {
                    warn!(label, "passthrough limit reached, label not kept");
                }
                gaps.push(ClassificationGap {
                    label: label.to_string(),
                    dropped: !kept,
                });
            }
        }
    }

    debug!(
        canonical = record.canonical().count(),
        gaps = gaps.len(),
        "normalized party record"
    );
    Normalized { record, gaps }
}

fn apply(record: &mut PersonRecord, action: RuleAction, value: &str) {
    match action {
        RuleAction::SplitName => {
            // Only the parts present in the value are written.
            let parts = split_full_name(value);
            for (field, part) in [
                (CanonicalField::FirstName, parts.first),
                (CanonicalField::MiddleInitial, parts.middle_initial),
                (CanonicalField::LastName, parts.last),
            ] {
                if !part.is_empty() {
                    record.set(field, part);
                }
            }
        }
        RuleAction::Assign(field) => record.set(field, value),
        RuleAction::AssignDate(field) => {
            let date = value.split_whitespace().next().unwrap_or("");
            record.set(field, date);
        }
        RuleAction::AssignIfAbsent(field) => {
            record.set_if_absent(field, value);
        }
        RuleAction::SeedGoalAndRisk => {
            record.set_if_absent(CanonicalField::InvestmentGoal, value);
            record.set_if_absent(CanonicalField::RiskTolerance, value);
        }
        RuleAction::Accumulate(field) => record.append(field, value, NOTES_SEPARATOR),
    }
}
