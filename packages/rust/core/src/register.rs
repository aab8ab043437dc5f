//! Household registration: contact record creation plus registry save.

use tracing::{info, instrument};

use intakeforge_forms::address_of;
use intakeforge_shared::{CanonicalField, HouseholdRecord, IntakeForgeError, Result};
use intakeforge_storage::{ContactRecord, HouseholdStore, StoredHousehold};

/// Separator between the parts of a contact's notes.
pub const CONTACT_NOTES_SEPARATOR: &str = "  |  ";

/// What registration produced.
#[derive(Debug, Clone)]
pub struct Registration {
    pub contact_id: String,
    pub contact: ContactRecord,
    pub household: StoredHousehold,
}

/// Notes summarizing beneficiaries, spouse and dependents.
///
/// Beneficiaries come from `Beneficiary N Name` / `Rel` / `Pct` labels,
/// numbered from 1 while the name label is present.
pub fn contact_notes(household: &HouseholdRecord) -> String {
    let primary = &household.primary;
    let mut parts = Vec::new();

    for n in 1.. {
        let Some(name) = primary.lookup(&format!("Beneficiary {n} Name")) else {
            break;
        };
        if name.is_empty() {
            continue;
        }
        let rel = primary.lookup(&format!("Beneficiary {n} Rel")).unwrap_or("");
        let pct = primary.lookup(&format!("Beneficiary {n} Pct")).unwrap_or("");
        parts.push(format!("{name} ({rel}) {pct}%"));
    }

    if let Some(co) = &household.co_holder {
        parts.push(format!("Spouse: {}, DOB {}", co.name, co.date_of_birth));
    }

    for (idx, dep) in household.dependents.iter().enumerate() {
        let mut line = format!("Dependent {}: {}", idx + 1, dep.name);
        if !dep.date_of_birth.is_empty() {
            line.push_str(&format!(", DOB {}", dep.date_of_birth));
        }
        parts.push(line);
    }

    parts.join(CONTACT_NOTES_SEPARATOR)
}

/// The flat contact profile for the household's primary holder.
pub fn contact_record(household: &HouseholdRecord) -> ContactRecord {
    use CanonicalField::*;

    let p = &household.primary;
    let field = |f: CanonicalField| p.value(f).to_string();
    let address = address_of(p);

    ContactRecord {
        first_name: field(FirstName),
        last_name: field(LastName),
        email: field(Email),
        phone: field(Phone),
        date_of_birth: field(DateOfBirth),
        mailing_street: address.street,
        mailing_city: address.city,
        mailing_state: address.state,
        mailing_zip: address.zip,
        annual_income: field(AnnualIncome),
        employer: field(Employer),
        occupation: field(Occupation),
        risk_tolerance: field(RiskTolerance),
        investment_goal: field(InvestmentGoal),
        time_horizon_years: field(TimeHorizon),
        net_worth: field(NetWorth),
        liquid_assets: field(LiquidAssets),
        lead_source: field(ReferralSource),
        notes: contact_notes(household),
    }
}

/// Create a contact for `household` and save it to the registry.
///
/// The household is stored under its primary display name, replacing any
/// entry whose name matches without regard to case.
#[instrument(skip_all, fields(household = %household.display_name()))]
pub async fn register_household<S: HouseholdStore>(
    store: &S,
    household: &HouseholdRecord,
) -> Result<Registration> {
    let name = household.display_name();
    if name.is_empty() {
        return Err(IntakeForgeError::validation(
            "household has no primary name to register under",
        ));
    }

    let contact = contact_record(household);
    let contact_id = store.create_contact(&name, &contact).await?;
    let stored = store.save_household(household, Some(&contact_id)).await?;

    info!(contact_id = %contact_id, id = %stored.id, "household registered");
    Ok(Registration {
        contact_id,
        contact,
        household: stored,
    })
}
