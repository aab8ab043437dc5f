//! Locating a household's account workbook by name.
//!
//! Workbooks live flat in one directory, named after the household the same
//! way rendered documents are (`robert_thornton.xlsx`).

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use intakeforge_shared::{IntakeForgeError, Result};
use regex::Regex;
use tracing::debug;

use crate::writer::file_stem;

/// Extension of account workbooks.
pub const ACCOUNT_WORKBOOK_EXT: &str = "xlsx";

/// Find the account workbook for `name` in `dir`.
///
/// An exact file-stem match wins. Otherwise the first workbook (by file
/// name) whose stem contains every alphanumeric word of `name` is used.
/// A missing directory finds nothing.
pub fn find_account_workbook(dir: &Path, name: &str) -> Result<Option<PathBuf>> {
    let files = account_workbooks(dir)?;

    let exact = format!("{}.{ACCOUNT_WORKBOOK_EXT}", file_stem(name));
    if let Some(path) = files
        .iter()
        .find(|p| p.file_name().and_then(|f| f.to_str()) == Some(exact.as_str()))
    {
        debug!(path = %path.display(), "account workbook matched exactly");
        return Ok(Some(path.clone()));
    }

    let words = name_words(name);
    if words.is_empty() {
        return Ok(None);
    }
    let partial = files.into_iter().find(|p| {
        let stem = stem_of(p);
        words.iter().all(|w| stem.contains(w.as_str()))
    });
    if let Some(path) = &partial {
        debug!(path = %path.display(), "account workbook matched by name words");
    }
    Ok(partial)
}

/// Display names of every workbook in `dir` (`robert_thornton` → `Robert Thornton`).
pub fn available_account_names(dir: &Path) -> Result<Vec<String>> {
    Ok(account_workbooks(dir)?
        .iter()
        .map(|p| title_case(&stem_of(p).replace('_', " ")))
        .collect())
}

fn account_workbooks(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let entries = std::fs::read_dir(dir).map_err(|e| IntakeForgeError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| IntakeForgeError::io(dir, e))?.path();
        let is_workbook = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(ACCOUNT_WORKBOOK_EXT));
        if is_workbook && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

fn name_words(name: &str) -> Vec<String> {
    static NON_ALNUM_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^a-z0-9 ]").expect("valid regex"));

    NON_ALNUM_RE
        .replace_all(&name.to_lowercase(), "")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
