//! Personal-name splitting shared by normalization and document mapping.

/// A full name broken into the parts account forms ask for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameParts {
    pub first: String,
    pub middle_initial: String,
    pub last: String,
}

/// Split a free-text full name on whitespace.
///
/// - one token: first name only
/// - two tokens: first and last
/// - three or more: first, the upper-cased initial of the second token, and
///   the remaining tokens as the last name (`"Anna Maria de la Cruz"` keeps
///   `"de la Cruz"` together)
pub fn split_full_name(full_name: &str) -> NameParts {
    let tokens: Vec<&str> = full_name.split_whitespace().collect();
    match tokens.as_slice() {
        [] => NameParts::default(),
        [first] => NameParts {
            first: (*first).to_string(),
            ..NameParts::default()
        },
        [first, last] => NameParts {
            first: (*first).to_string(),
            middle_initial: String::new(),
            last: (*last).to_string(),
        },
        [first, middle, rest @ ..] => NameParts {
            first: (*first).to_string(),
            middle_initial: middle
                .chars()
                .next()
                .map(|c| c.to_uppercase().collect())
                .unwrap_or_default(),
            last: rest.join(" "),
        },
    }
}

/// Join non-empty name parts with single spaces.
pub fn join_name(first: &str, middle_initial: &str, last: &str) -> String {
    [first, middle_initial, last]
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
