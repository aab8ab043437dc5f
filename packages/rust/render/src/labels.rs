//! Human-readable row labels derived from template field keys.

use intakeforge_forms::FIELD_PREFIXES;

/// `"PI_PermAddressCity02"` → `"Perm Address City 02"`.
///
/// Strips a known key prefix, then breaks camel-case humps, acronym
/// boundaries and letter/digit runs into space-separated words.
pub fn human_label(key: &str) -> String {
    let stem = FIELD_PREFIXES
        .iter()
        .find_map(|prefix| key.strip_prefix(prefix))
        .unwrap_or(key);

    let chars: Vec<char> = stem.chars().collect();
    let mut out = String::with_capacity(stem.len() + 8);

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c.is_whitespace() {
            if !out.ends_with(' ') && !out.is_empty() {
                out.push(' ');
            }
            continue;
        }
        if let Some(&prev) = i.checked_sub(1).and_then(|p| chars.get(p)) {
            let next = chars.get(i + 1).copied();
            let boundary = (prev.is_lowercase() && c.is_uppercase())
                || (prev.is_alphabetic() && c.is_ascii_digit())
                || (prev.is_ascii_digit() && c.is_alphabetic())
                || (prev.is_uppercase() && c.is_uppercase() && next.is_some_and(char::is_lowercase));
            if boundary && !out.ends_with(' ') {
                out.push(' ');
            }
        }
        out.push(c);
    }

    out.trim().to_string()
}
