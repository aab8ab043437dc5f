//! Intake spreadsheet reading for IntakeForge.
//!
//! The stages run strictly forward:
//! 1. [`table`]: load a workbook or CSV file into cell text
//! 2. [`layout`]: decide between key-value and wide layouts
//! 3. [`extract`]: one raw label/value record per party
//! 4. [`normalize`]: raw labels → canonical fields via an ordered rule table
//! 5. [`household`]: parties → primary, co-holder and dependents
//!
//! [`accounts`] reads the separate per-household account workbooks.

pub mod accounts;
pub mod extract;
pub mod household;
pub mod layout;
pub mod normalize;
pub mod table;

pub use accounts::{AccountRow, AccountSheet, AccountWorkbook};
pub use extract::{ExtractedParty, RawPartyRecord, extract_parties};
pub use household::compose_household;
pub use layout::{DetectedLayout, LayoutKind, detect_layout};
pub use normalize::{ClassificationGap, Normalized, RULES, Rule, RuleAction, normalize, rule_for};
pub use table::IntakeTable;
