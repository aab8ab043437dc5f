//! Plain-text household context for downstream consumers.
//!
//! The text lists the registration profile, household members and, when an
//! account workbook is on file, one block per non-empty sheet. Internal
//! fields (WAS and Fee) are never included.

use intakeforge_intake::{AccountSheet, AccountWorkbook};
use intakeforge_shared::{CanonicalField, HouseholdRecord};
use intakeforge_storage::StoredHousehold;

/// Separator between cells of an account sheet row.
pub const CELL_SEPARATOR: &str = " | ";

/// Render the context block for a stored household.
pub fn build_household_context(
    stored: &StoredHousehold,
    accounts: Option<&AccountWorkbook>,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("CLIENT: {}\n\n", stored.name));

    out.push_str("=== REGISTRATION PROFILE ===\n");
    write_profile(&mut out, &stored.record);
    if let Some(id) = &stored.contact_id {
        out.push_str(&format!("  Contact ID: {id}\n"));
    }
    out.push_str(&format!(
        "  Registration Date: {}\n\n",
        stored.registered_at.format("%Y-%m-%d")
    ));

    out.push_str("=== HOUSEHOLD ===\n");
    write_members(&mut out, &stored.record);
    out.push('\n');

    match accounts {
        Some(book) => {
            for sheet in book.sheets.iter().filter(|s| !s.is_empty()) {
                write_sheet(&mut out, sheet);
            }
        }
        None => {
            out.push_str("=== ACCOUNT DATA ===\n");
            out.push_str("  No account workbook on record for this household.\n");
            out.push_str("  Context is limited to the registration profile above.\n\n");
        }
    }
    out
}

fn write_profile(out: &mut String, household: &HouseholdRecord) {
    let primary = &household.primary;
    for (field, value) in primary.canonical() {
        if value.is_empty() || field == CanonicalField::Notes || field.is_internal() {
            continue;
        }
        out.push_str(&format!("  {field}: {value}\n"));
    }
    for p in primary.passthrough() {
        if p.value.is_empty() {
            continue;
        }
        out.push_str(&format!("  {}: {}\n", p.label, p.value));
    }
    let notes = primary.value(CanonicalField::Notes);
    if !notes.is_empty() {
        out.push_str(&format!("  Notes / Instructions: {notes}\n"));
    }
}

fn write_members(out: &mut String, household: &HouseholdRecord) {
    out.push_str(&format!("  Primary: {}\n", household.display_name()));
    if let Some(co) = &household.co_holder {
        out.push_str(&format!(
            "  Co-Account Holder: {}{}\n",
            co.name,
            dob_suffix(&co.date_of_birth)
        ));
    }
    for (idx, dep) in household.dependents.iter().enumerate() {
        out.push_str(&format!(
            "  Dependent {}: {}{}\n",
            idx + 1,
            dep.name,
            dob_suffix(&dep.date_of_birth)
        ));
    }
}

fn write_sheet(out: &mut String, sheet: &AccountSheet) {
    out.push_str(&format!("=== {} ===\n", sheet.name.to_uppercase()));
    out.push_str(&format!("  {}\n", sheet.headers.join(CELL_SEPARATOR)));
    for row in &sheet.rows {
        out.push_str(&format!("  {}\n", row.join(CELL_SEPARATOR)));
    }
    out.push('\n');
}

fn dob_suffix(dob: &str) -> String {
    if dob.is_empty() {
        String::new()
    } else {
        format!(" (DOB {dob})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use intakeforge_shared::{HouseholdId, PartySummary, PersonRecord};

    fn stored(record: HouseholdRecord) -> StoredHousehold {
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 14, 30, 0).unwrap();
        StoredHousehold {
            id: HouseholdId::new(),
            name: record.display_name(),
            contact_id: Some("0030000000001000".into()),
            record,
            registered_at: at,
            updated_at: at,
        }
    }

    fn thornton() -> HouseholdRecord {
        let mut primary = PersonRecord::new();
        primary.set(CanonicalField::FirstName, "Robert");
        primary.set(CanonicalField::LastName, "Thornton");
        primary.set(CanonicalField::RiskTolerance, "Moderate-Aggressive");
        primary.set(CanonicalField::MiddleInitial, "");
        primary.set(CanonicalField::Notes, "Prefers morning calls");
        primary.set(CanonicalField::Was, "Y");
        primary.set(CanonicalField::Fee, "1.00%");
        primary.push_passthrough("SSN Last 4", "4721");
        HouseholdRecord {
            primary,
            co_holder: Some(PartySummary {
                name: "Linda Thornton".into(),
                date_of_birth: "1970-09-22".into(),
            }),
            dependents: vec![PartySummary {
                name: "Sarah Thornton".into(),
                date_of_birth: String::new(),
            }],
        }
    }

    #[test]
    fn context_lists_profile_and_members() {
        let text = build_household_context(&stored(thornton()), None);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "CLIENT: Robert Thornton");
        assert!(lines.contains(&"=== REGISTRATION PROFILE ==="));
        assert!(lines.contains(&"  First Name: Robert"));
        assert!(lines.contains(&"  Risk Tolerance: Moderate-Aggressive"));
        assert!(lines.contains(&"  SSN Last 4: 4721"));
        assert!(lines.contains(&"  Notes / Instructions: Prefers morning calls"));
        assert!(lines.contains(&"  Contact ID: 0030000000001000"));
        assert!(lines.contains(&"  Registration Date: 2026-03-09"));
        assert!(lines.contains(&"  Co-Account Holder: Linda Thornton (DOB 1970-09-22)"));
        assert!(lines.contains(&"  Dependent 1: Sarah Thornton"));
        assert!(!text.contains("Middle Initial"));
    }

    #[test]
    fn internal_fields_never_appear() {
        let text = build_household_context(&stored(thornton()), None);
        assert!(!text.contains("WAS"));
        assert!(!text.contains("Fee"));
        assert!(!text.contains("1.00%"));
        assert!(!text.lines().any(|l| l == "  Notes: Prefers morning calls"));
    }

    #[test]
    fn missing_workbook_adds_notice() {
        let text = build_household_context(&stored(thornton()), None);
        let notice = text.find("=== ACCOUNT DATA ===").expect("notice");
        assert!(notice > text.find("=== HOUSEHOLD ===").expect("household"));
        assert!(text.contains("  No account workbook on record for this household.\n"));
    }

    #[test]
    fn workbook_sheets_render_as_blocks() {
        let book = AccountWorkbook::from_sheets(vec![
            AccountSheet::from_rows(
                "Account Summary",
                [
                    vec!["Account", "Account #", "Market Value"],
                    vec!["IRA Rollover", "IRA-7741", "1245000"],
                    vec!["Roth IRA", "RTH-0847", "320000"],
                ],
            ),
            AccountSheet::from_rows("Empty", [vec!["Header"]]),
        ]);
        let text = build_household_context(&stored(thornton()), Some(&book));

        assert!(text.contains(
            "=== ACCOUNT SUMMARY ===\n  Account | Account # | Market Value\n  IRA Rollover | IRA-7741 | 1245000\n  Roth IRA | RTH-0847 | 320000\n\n"
        ));
        assert!(!text.contains("=== EMPTY ==="));
        assert!(!text.contains("=== ACCOUNT DATA ==="));
    }
}
