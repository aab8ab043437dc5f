//! End-to-end pipeline: intake file → household → rendered documents.
//!
//! [`parse_intake`] runs the intake stages strictly forward (table, layout,
//! extraction, normalization, composition). [`render_documents`] maps and
//! renders each requested document independently, so one failing document
//! never hides the others.

use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use intakeforge_forms::{DocumentKind, MappingContext, MappingGap, map_fields, mapping_gaps};
use intakeforge_intake::{
    ClassificationGap, DetectedLayout, IntakeTable, compose_household, detect_layout,
    extract_parties, normalize,
};
use intakeforge_render::{RenderOptions, RenderedDocument, render_document};
use intakeforge_shared::{CanonicalField, HouseholdRecord, PersonRecord, Result};

/// One party after normalization.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedParty {
    /// Column header of the party (or a generated label).
    pub label: String,
    pub record: PersonRecord,
    /// Labels that no rule recognised.
    pub gaps: Vec<ClassificationGap>,
}

/// Everything the intake stages produced for one file.
#[derive(Debug, Clone, Serialize)]
pub struct IntakeResult {
    pub layout: DetectedLayout,
    pub parties: Vec<ParsedParty>,
    pub household: HouseholdRecord,
}

impl IntakeResult {
    /// The second party's full record, when the intake had one.
    pub fn second_party(&self) -> Option<&PersonRecord> {
        self.parties.get(1).map(|p| &p.record)
    }

    /// Classification gaps across all parties.
    pub fn gap_count(&self) -> usize {
        self.parties.iter().map(|p| p.gaps.len()).sum()
    }
}

/// Outcome of rendering one requested document.
#[derive(Debug)]
pub struct DocumentOutcome {
    pub kind: DocumentKind,
    /// Required canonical fields the primary holder had no value for.
    pub missing_required: Vec<CanonicalField>,
    /// Target keys that were mapped to an empty value.
    pub gaps: Vec<MappingGap>,
    pub result: Result<RenderedDocument>,
}

impl DocumentOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each document, successful or not.
    fn document_rendered(&self, kind: DocumentKind, current: usize, total: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn document_rendered(&self, _kind: DocumentKind, _current: usize, _total: usize) {}
}

/// Read an intake file and run every intake stage on it.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn parse_intake(path: &Path) -> Result<IntakeResult> {
    let table = IntakeTable::load(path)?;
    parse_table(&table)
}

/// Run the intake stages on an already-loaded table.
pub fn parse_table(table: &IntakeTable) -> Result<IntakeResult> {
    let start = Instant::now();
    let layout = detect_layout(table)?;

    let parties: Vec<ParsedParty> = extract_parties(table, &layout)
        .into_iter()
        .map(|party| {
            let normalized = normalize(&party.raw);
            ParsedParty {
                label: party.label,
                record: normalized.record,
                gaps: normalized.gaps,
            }
        })
        .collect();

    let household = compose_household(parties.iter().map(|p| p.record.clone()).collect())?;

    let result = IntakeResult {
        layout,
        parties,
        household,
    };
    info!(
        layout = ?result.layout.kind,
        parties = result.parties.len(),
        gaps = result.gap_count(),
        household = %result.household.display_name(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "intake parsed"
    );
    Ok(result)
}

/// Map and render each of `kinds` for the parsed household.
///
/// Duplicate kinds are rendered once, in first-requested order. Each
/// outcome carries its own result.
#[instrument(skip_all, fields(household = %intake.household.display_name(), documents = kinds.len()))]
pub fn render_documents(
    intake: &IntakeResult,
    kinds: &[DocumentKind],
    ctx: &MappingContext,
    opts: &RenderOptions,
    progress: &dyn ProgressReporter,
) -> Vec<DocumentOutcome> {
    let mut seen = HashSet::new();
    let kinds: Vec<DocumentKind> = kinds.iter().copied().filter(|k| seen.insert(*k)).collect();
    let total = kinds.len();

    let mut outcomes = Vec::with_capacity(total);
    for (idx, kind) in kinds.into_iter().enumerate() {
        let spec = kind.spec();
        progress.phase(spec.label);

        let missing_required = spec.missing_required(&intake.household);
        if !missing_required.is_empty() {
            let missing: Vec<&str> = missing_required.iter().map(|f| f.label()).collect();
            warn!(document = spec.key, ?missing, "required fields missing");
        }

        let fields = map_fields(kind, &intake.household, intake.second_party(), ctx);
        let gaps = mapping_gaps(kind, &fields);
        debug!(document = spec.key, gaps = gaps.len(), "mapped fields");

        let result = render_document(spec, &fields, opts);
        if let Err(e) = &result {
            warn!(document = spec.key, error = %e, "document failed");
        }

        outcomes.push(DocumentOutcome {
            kind,
            missing_required,
            gaps,
            result,
        });
        progress.document_rendered(kind, idx + 1, total);
    }

    info!(
        rendered = outcomes.iter().filter(|o| o.is_ok()).count(),
        failed = outcomes.iter().filter(|o| !o.is_ok()).count(),
        "render batch complete"
    );
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use intakeforge_intake::LayoutKind;
    use intakeforge_render::RenderMode;
    use intakeforge_shared::IntakeForgeError;
    use std::path::PathBuf;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures/intake")
            .join(name)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 9).expect("valid date")
    }

    fn render_options(forms_dir: PathBuf) -> RenderOptions {
        RenderOptions {
            forms_dir,
            product_name: "Wealth Intelligence Platform".into(),
            confidentiality_notice: "CONFIDENTIAL".into(),
            generated_on: today(),
        }
    }

    fn empty_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("if_pipeline_{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).expect("create dir");
        dir
    }

    #[test]
    fn key_value_fixture_parses_to_single_party_with_spouse() {
        let intake = parse_intake(&fixture("thornton_key_value.csv")).expect("parse");
        assert_eq!(intake.layout.kind, LayoutKind::KeyValue);
        assert_eq!(intake.parties.len(), 1);
        assert!(intake.second_party().is_none());

        let primary = &intake.household.primary;
        assert_eq!(primary.get(CanonicalField::FirstName), Some("Robert"));
        assert_eq!(primary.get(CanonicalField::AnnualIncome), Some("285000"));
        assert_eq!(primary.get(CanonicalField::NetWorth), Some("3200000"));
        assert_eq!(primary.get(CanonicalField::RiskTolerance), Some("Moderate-Aggressive"));
        assert_eq!(primary.get(CanonicalField::ReferralSource), Some("Business colleague"));

        let co = intake.household.co_holder.as_ref().expect("spouse");
        assert_eq!(co.name, "Linda Thornton");
        assert_eq!(co.date_of_birth, "1970-09-22");
        assert!(intake.gap_count() > 0);
    }

    #[test]
    fn workbook_fixture_parses_like_csv() {
        let intake = parse_intake(&fixture("thornton_key_value.xlsx")).expect("parse");
        assert_eq!(intake.layout.kind, LayoutKind::KeyValue);

        let primary = &intake.household.primary;
        assert_eq!(primary.get(CanonicalField::FirstName), Some("Robert"));
        assert_eq!(primary.get(CanonicalField::MiddleInitial), Some("A"));
        assert_eq!(primary.get(CanonicalField::LastName), Some("Thornton"));
        assert_eq!(primary.get(CanonicalField::DateOfBirth), Some("1968-04-15"));
        assert_eq!(primary.get(CanonicalField::Zip), Some("60540"));
    }

    #[test]
    fn wide_fixture_parses_to_household() {
        let intake = parse_intake(&fixture("thornton_household_wide.csv")).expect("parse");
        assert_eq!(intake.layout.kind, LayoutKind::Wide);
        assert_eq!(intake.parties.len(), 3);
        assert_eq!(intake.parties[1].label, "Linda");

        let household = &intake.household;
        assert_eq!(household.display_name(), "Robert A Thornton");
        assert_eq!(household.primary.get(CanonicalField::DateOfBirth), Some("1968-04-15"));
        assert_eq!(household.co_holder.as_ref().map(|c| c.name.as_str()), Some("Linda Thornton"));
        assert_eq!(household.dependents.len(), 1);
        assert_eq!(household.dependents[0].name, "Sarah Thornton");
        assert_eq!(household.dependents[0].date_of_birth, "2003-02-11");
    }

    #[test]
    fn unreadable_layout_is_a_format_error() {
        let table = IntakeTable::from_rows(vec![vec!["only one column"]]);
        let err = parse_table(&table).expect_err("should fail");
        assert!(err.is_format());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = parse_intake(Path::new("/nonexistent/intake.csv")).expect_err("should fail");
        assert!(matches!(err, IntakeForgeError::Io { .. }));
    }

    #[test]
    fn batch_renders_each_document_independently() {
        let intake = parse_intake(&fixture("thornton_household_wide.csv")).expect("parse");
        let forms_dir = empty_dir();
        // A present but corrupt template fails only its own document.
        std::fs::write(
            forms_dir.join(DocumentKind::TrustApp.spec().template),
            b"not a pdf at all",
        )
        .expect("write");

        let outcomes = render_documents(
            &intake,
            &[
                DocumentKind::PersonalApp,
                DocumentKind::TrustApp,
                DocumentKind::PersonalApp,
                DocumentKind::JournalRequest,
            ],
            &MappingContext::new(today()),
            &render_options(forms_dir),
            &SilentProgress,
        );

        let kinds: Vec<DocumentKind> = outcomes.iter().map(|o| o.kind).collect();
        assert_eq!(
            kinds,
            [DocumentKind::PersonalApp, DocumentKind::TrustApp, DocumentKind::JournalRequest]
        );
        assert!(outcomes[0].is_ok());
        assert!(!outcomes[1].is_ok());
        assert!(outcomes[2].is_ok());

        let personal = outcomes[0].result.as_ref().expect("personal app");
        assert_eq!(personal.mode, RenderMode::Fallback);
        assert!(personal.page_count >= 1);
        assert!(!outcomes[0].gaps.is_empty());
    }

    #[test]
    fn missing_required_fields_are_reported_not_fatal() {
        let table = IntakeTable::from_rows(vec![
            vec!["Field", "Value"],
            vec!["First Name", "Madonna"],
        ]);
        let intake = parse_table(&table).expect("parse");
        let outcomes = render_documents(
            &intake,
            &[DocumentKind::PersonalApp],
            &MappingContext::new(today()),
            &render_options(empty_dir()),
            &SilentProgress,
        );
        assert!(outcomes[0].is_ok());
        assert!(outcomes[0].missing_required.contains(&CanonicalField::LastName));
        assert!(outcomes[0].missing_required.contains(&CanonicalField::Email));
    }
}
