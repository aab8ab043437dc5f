//! The fixed catalog of account-opening documents.
//!
//! The catalog is a process-wide `static` table: lookups borrow from it and
//! nothing ever mutates it.

use intakeforge_shared::{CanonicalField, HouseholdRecord, IntakeForgeError, Result};
use serde::Serialize;

use AccountType::{Individual, Joint, Trust};
use CanonicalField::{Address, DateOfBirth, Email, FirstName, LastName, Phone};

/// Account registrations a document can be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AccountType {
    Individual,
    Joint,
    Trust,
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Individual => "Individual",
            Self::Joint => "Joint",
            Self::Trust => "Trust",
        };
        f.write_str(s)
    }
}

/// Every document the catalog knows how to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    PersonalApp,
    TrustApp,
    AddRemoveAdvisor,
    JournalRequest,
}

impl DocumentKind {
    /// All kinds in catalog order.
    pub const ALL: [DocumentKind; 4] = [
        Self::PersonalApp,
        Self::TrustApp,
        Self::AddRemoveAdvisor,
        Self::JournalRequest,
    ];

    /// Stable lookup key (e.g. `"personal_app"`).
    pub fn key(self) -> &'static str {
        self.spec().key
    }

    /// The catalog entry for this kind.
    pub fn spec(self) -> &'static DocumentTypeSpec {
        match self {
            Self::PersonalApp => &CATALOG[0],
            Self::TrustApp => &CATALOG[1],
            Self::AddRemoveAdvisor => &CATALOG[2],
            Self::JournalRequest => &CATALOG[3],
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl std::str::FromStr for DocumentKind {
    type Err = IntakeForgeError;

    fn from_str(s: &str) -> Result<Self> {
        lookup(s).map(|spec| spec.kind)
    }
}

/// Static description of one target document.
#[derive(Debug, Serialize)]
pub struct DocumentTypeSpec {
    pub kind: DocumentKind,
    pub key: &'static str,
    /// Human-readable title, also used as the fallback data-sheet title.
    pub label: &'static str,
    pub account_types: &'static [AccountType],
    /// Canonical fields the document expects. Missing ones only warn.
    pub required: &'static [CanonicalField],
    /// File name of the fillable template inside the forms directory.
    pub template: &'static str,
}

impl DocumentTypeSpec {
    /// Required fields the household's primary holder has no value for.
    pub fn missing_required(&self, household: &HouseholdRecord) -> Vec<CanonicalField> {
        self.required
            .iter()
            .copied()
            .filter(|f| household.primary.value(*f).trim().is_empty())
            .collect()
    }

    /// Whether this document applies to `account_type`.
    pub fn supports(&self, account_type: AccountType) -> bool {
        self.account_types.contains(&account_type)
    }
}

/// The document catalog, in presentation order.
pub static CATALOG: [DocumentTypeSpec; 4] = [
    DocumentTypeSpec {
        kind: DocumentKind::PersonalApp,
        key: "personal_app",
        label: "Personal Account Application",
        account_types: &[Individual, Joint],
        required: &[FirstName, LastName, DateOfBirth, Address, Phone, Email],
        template: "IWSPersonalApp_Dec2024.pdf",
    },
    DocumentTypeSpec {
        kind: DocumentKind::TrustApp,
        key: "trust_app",
        label: "Trust Account Application",
        account_types: &[Trust],
        required: &[FirstName, LastName, DateOfBirth, Address],
        template: "IWSTrustApp_Dec2024.pdf",
    },
    DocumentTypeSpec {
        kind: DocumentKind::AddRemoveAdvisor,
        key: "add_remove_advisor",
        label: "Add / Remove Advisor - Brokerage",
        account_types: &[Individual, Joint, Trust],
        required: &[FirstName, LastName],
        template: "Add_RemoveAdvisor_Brokerage_Jan2026.pdf",
    },
    DocumentTypeSpec {
        kind: DocumentKind::JournalRequest,
        key: "journal_request",
        label: "Journal / Internal Transfer Request",
        account_types: &[Individual, Joint, Trust],
        required: &[FirstName, LastName],
        template: "JournalRequest_May2021_rev.pdf",
    },
];

/// Field-key prefixes used by the catalog's templates, longest first.
pub const FIELD_PREFIXES: &[&str] = &[
    "RAI_", "ASU_", "SaD_", "PI_", "AS_", "CT_", "AI_", "DA_", "SD_", "AO_", "JR_",
];

/// Look up a document by key (case-insensitive).
pub fn lookup(key: &str) -> Result<&'static DocumentTypeSpec> {
    let key = key.trim();
    CATALOG
        .iter()
        .find(|spec| spec.key.eq_ignore_ascii_case(key))
        .ok_or_else(|| {
            let known: Vec<&str> = CATALOG.iter().map(|s| s.key).collect();
            IntakeForgeError::validation(format!(
                "unknown document '{key}' (known: {})",
                known.join(", ")
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use intakeforge_shared::PersonRecord;

    #[test]
    fn kinds_and_catalog_agree() {
        for kind in DocumentKind::ALL {
            assert_eq!(kind.spec().kind, kind);
            assert_eq!(kind.key().parse::<DocumentKind>().expect("parse"), kind);
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let spec = lookup(" Trust_App ").expect("lookup");
        assert_eq!(spec.label, "Trust Account Application");
        assert!(spec.supports(AccountType::Trust));
        assert!(!spec.supports(AccountType::Joint));
    }

    #[test]
    fn unknown_key_lists_known_documents() {
        let err = lookup("w9").expect_err("should fail");
        let text = err.to_string();
        assert!(text.contains("unknown document 'w9'"));
        assert!(text.contains("journal_request"));
    }

    #[test]
    fn missing_required_reports_empty_fields() {
        let mut primary = PersonRecord::new();
        primary.set(FirstName, "Robert");
        primary.set(LastName, "Thornton");
        primary.set(Email, "  ");
        let household = HouseholdRecord {
            primary,
            ..HouseholdRecord::default()
        };

        let missing = DocumentKind::PersonalApp.spec().missing_required(&household);
        assert_eq!(missing, [DateOfBirth, Address, Phone, Email]);
        assert!(DocumentKind::JournalRequest.spec().missing_required(&household).is_empty());
    }
}
