//! Core pipeline orchestration for IntakeForge.
//!
//! This crate ties together intake parsing, field mapping, rendering and the
//! household registry into end-to-end workflows. It also turns a household's
//! account workbook into context text and a meeting-prep one-pager.

pub mod accounts;
pub mod context;
pub mod pipeline;
pub mod prep;
pub mod register;
pub mod writer;

pub use accounts::{available_account_names, find_account_workbook};
pub use context::build_household_context;
pub use pipeline::{
    DocumentOutcome, IntakeResult, ParsedParty, ProgressReporter, SilentProgress, parse_intake,
    parse_table, render_documents,
};
pub use prep::{PrepFigures, build_meeting_prep, format_money, prep_figures};
pub use register::{
    CONTACT_NOTES_SEPARATOR, Registration, contact_notes, contact_record, register_household,
};
pub use writer::{OutputManifest, WriteResult, WrittenDocument, file_stem, write_documents};
