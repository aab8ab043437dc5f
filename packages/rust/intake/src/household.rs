//! Household composition from normalized party records.

use intakeforge_shared::{
    CanonicalField, HouseholdRecord, IntakeForgeError, PartySummary, PersonRecord, Result,
};
use tracing::debug;

/// Passthrough labels consulted for a spouse on single-party intakes.
const SPOUSE_NAME_LABEL: &str = "Spouse Name";
const SPOUSE_DOB_LABEL: &str = "Spouse DOB";

/// Compose parties (in source order) into one household.
///
/// Party 0 becomes the primary holder verbatim, party 1 the co-holder and
/// every further party a dependent. A single-party intake that names a
/// spouse gets its co-holder from those labels.
pub fn compose_household(parties: Vec<PersonRecord>) -> Result<HouseholdRecord> {
    let mut parties = parties.into_iter();
    let primary = parties
        .next()
        .ok_or_else(|| IntakeForgeError::format("intake contains no party with any data"))?;

    let co_holder = match parties.next() {
        Some(second) => Some(summarize(&second)),
        None => spouse_from_passthrough(&primary),
    };
    let dependents: Vec<PartySummary> = parties.map(|p| summarize(&p)).collect();

    debug!(
        co_holder = co_holder.is_some(),
        dependents = dependents.len(),
        "composed household"
    );
    Ok(HouseholdRecord {
        primary,
        co_holder,
        dependents,
    })
}

fn summarize(person: &PersonRecord) -> PartySummary {
    PartySummary {
        name: person.full_name(),
        date_of_birth: person.value(CanonicalField::DateOfBirth).to_string(),
    }
}

fn spouse_from_passthrough(primary: &PersonRecord) -> Option<PartySummary> {
    let name = primary.passthrough_value(SPOUSE_NAME_LABEL)?.trim();
    if name.is_empty() {
        return None;
    }
    let dob = primary.passthrough_value(SPOUSE_DOB_LABEL).unwrap_or("");
    Some(PartySummary {
        name: name.to_string(),
        date_of_birth: dob.split_whitespace().next().unwrap_or("").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_parties;
    use crate::layout::detect_layout;
    use crate::normalize::normalize;
    use crate::table::IntakeTable;

    fn household_of(rows: Vec<Vec<&str>>) -> HouseholdRecord {
        let table = IntakeTable::from_rows(rows);
        let layout = detect_layout(&table).expect("detect");
        let parties = extract_parties(&table, &layout)
            .iter()
            .map(|p| normalize(&p.raw).record)
            .collect();
        compose_household(parties).expect("compose")
    }

    #[test]
    fn three_column_wide_layout_yields_primary_co_holder_and_dependent() {
        let household = household_of(vec![
            vec!["", "Robert", "Linda", "Sarah"],
            vec!["Full Name", "Robert Thornton", "Linda Thornton", "Sarah Thornton"],
            vec!["DOB", "1968-04-15", "1970-09-22", "2001-06-03"],
        ]);

        assert_eq!(household.display_name(), "Robert Thornton");
        assert_eq!(
            household.co_holder,
            Some(PartySummary {
                name: "Linda Thornton".into(),
                date_of_birth: "1970-09-22".into(),
            })
        );
        assert_eq!(household.dependents.len(), 1);

        let flat = household.flat_fields();
        assert!(flat.contains(&("Dependent 1 Name".into(), "Sarah Thornton".into())));
        assert!(flat.contains(&("Dependent 1 DOB".into(), "2001-06-03".into())));
    }

    #[test]
    fn single_party_uses_spouse_labels() {
        let household = household_of(vec![
            vec!["Field", "Value"],
            vec!["Full Name", "Robert Thornton"],
            vec!["Spouse Name", "Linda Thornton"],
            vec!["Spouse DOB", "1970-09-22 00:00:00"],
        ]);
        let co = household.co_holder.expect("co-holder");
        assert_eq!(co.name, "Linda Thornton");
        assert_eq!(co.date_of_birth, "1970-09-22");
        assert!(household.dependents.is_empty());
    }

    #[test]
    fn single_party_without_spouse_has_no_co_holder() {
        let household = household_of(vec![vec!["Field", "Value"], vec!["Full Name", "Madonna"]]);
        assert!(household.co_holder.is_none());
        assert_eq!(household.display_name(), "Madonna");
    }

    #[test]
    fn no_parties_is_a_format_error() {
        let err = compose_household(Vec::new()).expect_err("should fail");
        assert!(err.is_format());
    }
}
