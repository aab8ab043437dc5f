//! Household → document field mapping.
//!
//! Every mapping is a pure function of the household, an optional second
//! party record and a [`MappingContext`] carrying request parameters. A
//! source value that is missing maps to `""` and is reported as a
//! [`MappingGap`]; mapping itself never fails.

use chrono::NaiveDate;
use intakeforge_shared::{
    AppConfig, CanonicalField, HouseholdRecord, NameParts, PartySummary, PersonRecord,
    TargetFieldMap, split_full_name,
};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::address::{DEFAULT_COUNTRY, PostalAddress, address_of};
use crate::catalog::DocumentKind;

/// Default firm name on journal requests.
pub const DEFAULT_FIRM: &str = "IWS";

/// Advisor and journal forms accept at most this many account numbers.
pub const MAX_ADVISOR_ACCOUNTS: usize = 15;

const SSN_LABELS: &[&str] = &["SSN", "Social Security Number"];
const PHONE_LABELS: &[&str] = &["Phone", "Mobile Phone"];
const EMPLOYER_LABELS: &[&str] = &["Employer", "Employer Name"];

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Request parameters that are not part of the household itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingContext {
    /// Date stamped into the forms' signature-date fields.
    pub today: NaiveDate,
    pub advisor_name: String,
    pub g_number: String,
    pub dtc_number: String,
    pub pricing_code: String,
    /// Firm on journal requests (empty → [`DEFAULT_FIRM`]).
    pub firm: String,
    /// Brokerage account numbers for the advisor form.
    pub account_numbers: Vec<String>,
    pub receiving_account: String,
    /// Receiving owner on journal requests (empty → client name).
    pub receiving_owner: String,
}

impl MappingContext {
    /// A context with no advisor details, stamped with `today`.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            advisor_name: String::new(),
            g_number: String::new(),
            dtc_number: String::new(),
            pricing_code: String::new(),
            firm: DEFAULT_FIRM.to_string(),
            account_numbers: Vec::new(),
            receiving_account: String::new(),
            receiving_owner: String::new(),
        }
    }

    /// Advisor details from config, stamped with `today`.
    pub fn from_config(config: &AppConfig, today: NaiveDate) -> Self {
        let advisor = &config.advisor;
        Self {
            advisor_name: advisor.name.clone(),
            g_number: advisor.g_number.clone(),
            dtc_number: advisor.dtc_number.clone(),
            pricing_code: advisor.pricing_code.clone(),
            firm: advisor.firm.clone(),
            ..Self::new(today)
        }
    }

    fn date_stamp(&self) -> String {
        self.today.format("%m/%d/%Y").to_string()
    }
}

impl From<&AppConfig> for MappingContext {
    fn from(config: &AppConfig) -> Self {
        Self::from_config(config, chrono::Local::now().date_naive())
    }
}

// ---------------------------------------------------------------------------
// Gaps
// ---------------------------------------------------------------------------

/// A target key whose source value was missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingGap {
    pub document: &'static str,
    pub key: String,
}

/// The gaps in a mapped field set (keys mapped to an empty value).
pub fn mapping_gaps(kind: DocumentKind, fields: &TargetFieldMap) -> Vec<MappingGap> {
    fields
        .empty_keys()
        .into_iter()
        .map(|key| MappingGap {
            document: kind.key(),
            key: key.to_string(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// Map a household into the target fields of one document.
///
/// `second` is the second party's full normalized record when the intake
/// had one; otherwise the household co-holder's name and date of birth are
/// used for the second-holder fields.
#[instrument(skip_all, fields(document = kind.key()))]
pub fn map_fields(
    kind: DocumentKind,
    household: &HouseholdRecord,
    second: Option<&PersonRecord>,
    ctx: &MappingContext,
) -> TargetFieldMap {
    let fields = match kind {
        DocumentKind::PersonalApp => personal_app(household, second, ctx),
        DocumentKind::TrustApp => trust_app(household, second, ctx),
        DocumentKind::AddRemoveAdvisor => add_remove_advisor(household, ctx),
        DocumentKind::JournalRequest => journal_request(household, ctx),
    };

    debug!(
        mapped = fields.len(),
        populated = fields.populated_count(),
        gaps = fields.len() - fields.populated_count(),
        "mapped document fields"
    );
    fields
}

/// The details the second-holder block needs, from whichever source exists.
struct SecondParty {
    name: NameParts,
    date_of_birth: String,
    ssn: String,
    phone: String,
    email: String,
    address: PostalAddress,
}

impl SecondParty {
    fn resolve(
        household: &HouseholdRecord,
        second: Option<&PersonRecord>,
        primary_address: &PostalAddress,
    ) -> Option<Self> {
        if let Some(person) = second {
            return Some(Self {
                name: name_parts(person),
                date_of_birth: person.value(CanonicalField::DateOfBirth).to_string(),
                ssn: person.first_of(SSN_LABELS).to_string(),
                phone: person.first_of(PHONE_LABELS).to_string(),
                email: person.value(CanonicalField::Email).to_string(),
                address: address_of(person).or(primary_address),
            });
        }
        household
            .co_holder
            .as_ref()
            .filter(|co| !co.name.trim().is_empty())
            .map(|co: &PartySummary| Self {
                name: split_full_name(&co.name),
                date_of_birth: co.date_of_birth.clone(),
                ssn: String::new(),
                phone: String::new(),
                email: String::new(),
                address: primary_address.clone(),
            })
    }
}

/// Name parts from canonical fields, or from a passthrough full name.
fn name_parts(person: &PersonRecord) -> NameParts {
    let first = person.value(CanonicalField::FirstName);
    let last = person.value(CanonicalField::LastName);
    if first.is_empty() && last.is_empty() {
        return split_full_name(&person.full_name());
    }
    NameParts {
        first: first.to_string(),
        middle_initial: person.value(CanonicalField::MiddleInitial).to_string(),
        last: last.to_string(),
    }
}

fn set_name(fields: &mut TargetFieldMap, keys: [&str; 3], name: &NameParts) {
    let [first, mi, last] = keys;
    fields.set(first, name.first.as_str());
    fields.set(mi, name.middle_initial.as_str());
    fields.set(last, name.last.as_str());
}

/// Write street/city/state/zip/country under `{prefix}{suffix}` keys.
fn set_address(fields: &mut TargetFieldMap, prefix: &str, suffix: &str, addr: &PostalAddress) {
    fields.set(format!("{prefix}{suffix}"), addr.street.as_str());
    fields.set(format!("{prefix}City{suffix}"), addr.city.as_str());
    fields.set(format!("{prefix}State{suffix}"), addr.state.as_str());
    fields.set(format!("{prefix}Zip{suffix}"), addr.zip.as_str());
    fields.set(format!("{prefix}Country{suffix}"), DEFAULT_COUNTRY);
}

fn personal_app(
    household: &HouseholdRecord,
    second: Option<&PersonRecord>,
    ctx: &MappingContext,
) -> TargetFieldMap {
    let primary = &household.primary;
    let address = address_of(primary);
    let today = ctx.date_stamp();
    let mut fields = TargetFieldMap::new();

    set_name(&mut fields, ["PI_FirstName", "PI_MI", "PI_LastName"], &name_parts(primary));
    fields.set("PI_DOB", primary.value(CanonicalField::DateOfBirth));
    fields.set("PI_SSN", primary.first_of(SSN_LABELS));
    fields.set("PI_PrimaryMobilePhone", primary.first_of(PHONE_LABELS));
    fields.set("PI_Email", primary.value(CanonicalField::Email));
    set_address(&mut fields, "PI_PermAddress", "", &address);
    set_address(&mut fields, "PI_MailingAddress", "", &address);
    fields.set("PI_EIAEmployerName", primary.first_of(EMPLOYER_LABELS));
    fields.set("AS_Date03", today.as_str());

    if let Some(party) = SecondParty::resolve(household, second, &address) {
        set_name(&mut fields, ["PI_FirstName02", "PI_MI02", "PI_LastName02"], &party.name);
        fields.set("PI_DOB02", party.date_of_birth);
        fields.set("PI_SSN02", party.ssn);
        fields.set("PI_PrimaryMobilePhone02", party.phone);
        fields.set("PI_Email02", party.email);
        set_address(&mut fields, "PI_PermAddress", "02", &party.address);
        set_address(&mut fields, "PI_MailingAddress", "02", &party.address);
        fields.set("AS_Date04", today.as_str());
    }

    fields
}

fn trust_app(
    household: &HouseholdRecord,
    second: Option<&PersonRecord>,
    ctx: &MappingContext,
) -> TargetFieldMap {
    let primary = &household.primary;
    let address = address_of(primary);
    let today = ctx.date_stamp();
    let full_name = primary.full_name();
    let mut fields = TargetFieldMap::new();

    let trust_name = match primary.first_of(&["Trust Name", "Entity Name"]) {
        "" => full_name.as_str(),
        name => name,
    };
    let trust_state = match primary.value(CanonicalField::State) {
        "" => address.state.as_str(),
        state => state,
    };
    fields.set("ASU_NameofTrust", trust_name);
    fields.set("ASU_SSTIN", primary.first_of(&["Tax ID", "EIN", "SSN"]));
    fields.set("ASU_DateOfTrust", primary.first_of(&["Trust Date", "Date of Trust"]));
    fields.set("ASU_StateWhereOrganized", trust_state);
    set_address(&mut fields, "ASU_PermanentAddress", "", &address);

    set_name(&mut fields, ["PI_FirstName", "PI_MI", "PI_LastName"], &name_parts(primary));
    fields.set("PI_DOB", primary.value(CanonicalField::DateOfBirth));
    fields.set("PI_SSN", primary.first_of(SSN_LABELS));
    fields.set("PI_Email", primary.value(CanonicalField::Email));
    fields.set("PI_PrimaryMobilePhone", primary.first_of(PHONE_LABELS));
    set_address(&mut fields, "PI_PermAddress", "", &address);
    fields.set("CT_Date01", today.as_str());

    if let Some(trustee) = SecondParty::resolve(household, second, &address) {
        set_name(&mut fields, ["PI_FirstName02", "PI_MI02", "PI_LastName02"], &trustee.name);
        fields.set("PI_DOB02", trustee.date_of_birth);
        fields.set("PI_SSN02", trustee.ssn);
        fields.set("PI_Email02", trustee.email);
        fields.set("PI_PrimaryMobilePhone02", trustee.phone);
        set_address(&mut fields, "PI_PermAddress", "02", &trustee.address);
        fields.set("CT_Date02", today.as_str());
    }

    fields
}

fn add_remove_advisor(household: &HouseholdRecord, ctx: &MappingContext) -> TargetFieldMap {
    let primary = &household.primary;
    let mut fields = TargetFieldMap::new();

    set_name(&mut fields, ["AI_First", "AI_MI", "AI_Last"], &name_parts(primary));
    fields.set("DA_AdvisorName", ctx.advisor_name.as_str());
    fields.set("DA_GNumber", ctx.g_number.as_str());
    fields.set("DA_DTCNumber", ctx.dtc_number.as_str());
    fields.set("DA_PricingCode", ctx.pricing_code.as_str());
    fields.set("SD_PrintAccountOwner", primary.full_name());
    fields.set("SD_Date", ctx.date_stamp());

    for (idx, account) in ctx.account_numbers.iter().take(MAX_ADVISOR_ACCOUNTS).enumerate() {
        fields.set(account_key(idx), account.as_str());
    }

    fields
}

/// `AI_Account`, then `AI_Account01` … `AI_Account14`.
fn account_key(idx: usize) -> String {
    match idx {
        0 => "AI_Account".to_string(),
        n => format!("AI_Account{n:02}"),
    }
}

fn journal_request(household: &HouseholdRecord, ctx: &MappingContext) -> TargetFieldMap {
    let primary = &household.primary;
    let full_name = primary.full_name();
    let mut fields = TargetFieldMap::new();

    let firm = match ctx.firm.trim() {
        "" => DEFAULT_FIRM,
        firm => firm,
    };
    let owner = match ctx.receiving_owner.trim() {
        "" => full_name.as_str(),
        owner => owner,
    };

    set_name(&mut fields, ["AO_First", "AO_MI", "AO_Last"], &name_parts(primary));
    fields.set("AO_SocialSecurityNumber", primary.first_of(SSN_LABELS));
    fields.set("JR_FirmName", firm);
    fields.set("JR_GNumber", ctx.g_number.as_str());
    fields.set("RAI_OwnerName", owner);
    fields.set("RAI_Account", ctx.receiving_account.as_str());
    fields.set("SaD_PrintAccountOwnerName", full_name.as_str());
    fields.set("SD_Date", ctx.date_stamp());

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 9).expect("valid date")
    }

    fn thornton() -> HouseholdRecord {
        let mut primary = PersonRecord::new();
        primary.set(CanonicalField::FirstName, "Robert");
        primary.set(CanonicalField::MiddleInitial, "A");
        primary.set(CanonicalField::LastName, "Thornton");
        primary.set(CanonicalField::DateOfBirth, "1968-04-15");
        primary.set(CanonicalField::Address, "1847 Lakeshire Dr, Naperville, IL 60540");
        primary.set(CanonicalField::Phone, "(630) 555-0192");
        primary.set(CanonicalField::Email, "r.thornton@email.com");
        primary.set(CanonicalField::Employer, "Thornton Manufacturing Inc.");
        primary.push_passthrough("SSN", "123-45-4721");
        HouseholdRecord {
            primary,
            co_holder: None,
            dependents: Vec::new(),
        }
    }

    #[test]
    fn personal_app_maps_primary_holder() {
        let fields = map_fields(
            DocumentKind::PersonalApp,
            &thornton(),
            None,
            &MappingContext::new(today()),
        );
        assert_eq!(fields.get("PI_FirstName"), Some("Robert"));
        assert_eq!(fields.get("PI_MI"), Some("A"));
        assert_eq!(fields.get("PI_LastName"), Some("Thornton"));
        assert_eq!(fields.get("PI_SSN"), Some("123-45-4721"));
        assert_eq!(fields.get("PI_PermAddress"), Some("1847 Lakeshire Dr"));
        assert_eq!(fields.get("PI_MailingAddressCity"), Some("Naperville"));
        assert_eq!(fields.get("PI_PermAddressState"), Some("IL"));
        assert_eq!(fields.get("PI_PermAddressZip"), Some("60540"));
        assert_eq!(fields.get("PI_PermAddressCountry"), Some("USA"));
        assert_eq!(fields.get("PI_EIAEmployerName"), Some("Thornton Manufacturing Inc."));
        assert_eq!(fields.get("AS_Date03"), Some("03/09/2026"));
        assert_eq!(fields.get("PI_FirstName02"), None);
        assert_eq!(fields.get("AS_Date04"), None);
    }

    #[test]
    fn co_holder_fills_second_block_with_primary_address() {
        let mut household = thornton();
        household.co_holder = Some(PartySummary {
            name: "Linda Thornton".into(),
            date_of_birth: "1970-09-22".into(),
        });

        let fields = map_fields(
            DocumentKind::PersonalApp,
            &household,
            None,
            &MappingContext::new(today()),
        );
        assert_eq!(fields.get("PI_FirstName02"), Some("Linda"));
        assert_eq!(fields.get("PI_MI02"), Some(""));
        assert_eq!(fields.get("PI_DOB02"), Some("1970-09-22"));
        assert_eq!(fields.get("PI_PermAddress02"), Some("1847 Lakeshire Dr"));
        assert_eq!(fields.get("PI_MailingAddressZip02"), Some("60540"));
        assert_eq!(fields.get("AS_Date04"), Some("03/09/2026"));

        let gaps = mapping_gaps(DocumentKind::PersonalApp, &fields);
        assert!(gaps.iter().any(|g| g.key == "PI_SSN02"));
        assert!(gaps.iter().all(|g| g.document == "personal_app"));
    }

    #[test]
    fn second_party_record_takes_precedence() {
        let mut household = thornton();
        household.co_holder = Some(PartySummary {
            name: "Ignored Name".into(),
            date_of_birth: String::new(),
        });
        let mut linda = PersonRecord::new();
        linda.set(CanonicalField::FirstName, "Linda");
        linda.set(CanonicalField::LastName, "Thornton");
        linda.set(CanonicalField::Email, "l.thornton@email.com");
        linda.set(CanonicalField::Address, "9 Elm St, Aurora");

        let fields = map_fields(
            DocumentKind::TrustApp,
            &household,
            Some(&linda),
            &MappingContext::new(today()),
        );
        assert_eq!(fields.get("PI_FirstName02"), Some("Linda"));
        assert_eq!(fields.get("PI_Email02"), Some("l.thornton@email.com"));
        assert_eq!(fields.get("PI_PermAddress02"), Some("9 Elm St"));
        assert_eq!(fields.get("PI_PermAddressCity02"), Some("Aurora"));
        assert_eq!(fields.get("PI_PermAddressState02"), Some("IL"));
        assert_eq!(fields.get("CT_Date02"), Some("03/09/2026"));
    }

    #[test]
    fn trust_app_falls_back_to_client_name_and_ssn() {
        let fields = map_fields(
            DocumentKind::TrustApp,
            &thornton(),
            None,
            &MappingContext::new(today()),
        );
        assert_eq!(fields.get("ASU_NameofTrust"), Some("Robert A Thornton"));
        assert_eq!(fields.get("ASU_SSTIN"), Some("123-45-4721"));
        assert_eq!(fields.get("ASU_StateWhereOrganized"), Some("IL"));
        assert_eq!(fields.get("ASU_DateOfTrust"), Some(""));
        assert_eq!(fields.get("CT_Date01"), Some("03/09/2026"));
    }

    #[test]
    fn advisor_form_takes_context_and_caps_accounts() {
        let mut ctx = MappingContext::new(today());
        ctx.advisor_name = "Dana Whitfield".into();
        ctx.g_number = "G12345".into();
        ctx.account_numbers = (1..=20).map(|n| format!("ACCT-{n}")).collect();

        let fields = map_fields(DocumentKind::AddRemoveAdvisor, &thornton(), None, &ctx);
        assert_eq!(fields.get("DA_AdvisorName"), Some("Dana Whitfield"));
        assert_eq!(fields.get("AI_Account"), Some("ACCT-1"));
        assert_eq!(fields.get("AI_Account01"), Some("ACCT-2"));
        assert_eq!(fields.get("AI_Account14"), Some("ACCT-15"));
        assert_eq!(fields.get("AI_Account15"), None);
        assert_eq!(fields.get("SD_PrintAccountOwner"), Some("Robert A Thornton"));
    }

    #[test]
    fn journal_defaults_owner_and_firm() {
        let mut ctx = MappingContext::new(today());
        ctx.firm = String::new();
        ctx.receiving_account = "5XY-123456".into();

        let fields = map_fields(DocumentKind::JournalRequest, &thornton(), None, &ctx);
        assert_eq!(fields.get("JR_FirmName"), Some("IWS"));
        assert_eq!(fields.get("RAI_OwnerName"), Some("Robert A Thornton"));
        assert_eq!(fields.get("RAI_Account"), Some("5XY-123456"));
        assert_eq!(fields.get("AO_SocialSecurityNumber"), Some("123-45-4721"));
        assert_eq!(fields.get("SD_Date"), Some("03/09/2026"));
    }

    #[test]
    fn passthrough_full_name_is_split() {
        let mut primary = PersonRecord::new();
        primary.push_passthrough("Full Name", "Madonna");
        let household = HouseholdRecord {
            primary,
            ..HouseholdRecord::default()
        };
        let fields = map_fields(
            DocumentKind::JournalRequest,
            &household,
            None,
            &MappingContext::new(today()),
        );
        assert_eq!(fields.get("AO_First"), Some("Madonna"));
        assert_eq!(fields.get("AO_Last"), Some(""));
    }

    #[test]
    fn context_from_config_copies_advisor() {
        let mut config = AppConfig::default();
        config.advisor.name = "Dana Whitfield".into();
        config.advisor.pricing_code = "P7".into();
        let ctx = MappingContext::from_config(&config, today());
        assert_eq!(ctx.advisor_name, "Dana Whitfield");
        assert_eq!(ctx.pricing_code, "P7");
        assert_eq!(ctx.firm, "IWS");
    }
}
