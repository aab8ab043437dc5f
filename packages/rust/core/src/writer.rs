//! Output directory writer for rendered documents.
//!
//! Each successful document is written atomically (temp file, then rename)
//! as `<household>_<document>.pdf`, and a `manifest.json` records what was
//! produced, how, and with which checksum. Failed documents are listed in
//! the manifest with their error.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use intakeforge_render::RenderMode;
use intakeforge_shared::{IntakeForgeError, Result};

use crate::pipeline::DocumentOutcome;

/// Name of the manifest written next to the documents.
pub const MANIFEST_FILE: &str = "manifest.json";

/// One written document.
#[derive(Debug, Clone, Serialize)]
pub struct WrittenDocument {
    pub document: String,
    pub label: String,
    pub filename: String,
    pub mode: RenderMode,
    pub page_count: usize,
    pub fields_written: usize,
    pub sha256: String,
    pub size_bytes: usize,
}

/// A document that could not be produced.
#[derive(Debug, Clone, Serialize)]
pub struct FailedDocument {
    pub document: String,
    pub error: String,
}

/// Contents of `manifest.json`.
#[derive(Debug, Clone, Serialize)]
pub struct OutputManifest {
    pub household: String,
    pub generated_at: DateTime<Utc>,
    pub documents: Vec<WrittenDocument>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailedDocument>,
}

/// Result of writing one batch.
#[derive(Debug, Clone)]
pub struct WriteResult {
    pub out_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub manifest: OutputManifest,
}

/// Lower-case `name` and collapse every run of non-word characters into `_`.
pub fn file_stem(name: &str) -> String {
    static NON_WORD_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^\w]+").expect("valid regex"));

    let lowered = name.to_lowercase();
    let stem = NON_WORD_RE.replace_all(&lowered, "_");
    let stem = stem.trim_matches('_');
    if stem.is_empty() {
        "household".to_string()
    } else {
        stem.to_string()
    }
}

/// Write every successful outcome into `out_dir` plus a manifest.
#[instrument(skip_all, fields(out_dir = %out_dir.display(), household = household, documents = outcomes.len()))]
pub fn write_documents(
    out_dir: &Path,
    household: &str,
    outcomes: &[DocumentOutcome],
) -> Result<WriteResult> {
    std::fs::create_dir_all(out_dir).map_err(|e| IntakeForgeError::io(out_dir, e))?;

    let stem = file_stem(household);
    let mut documents = Vec::new();
    let mut failures = Vec::new();

    for outcome in outcomes {
        let spec = outcome.kind.spec();
        let rendered = match &outcome.result {
            Ok(rendered) => rendered,
            Err(e) => {
                failures.push(FailedDocument {
                    document: spec.key.to_string(),
                    error: e.to_string(),
                });
                continue;
            }
        };

        let filename = format!("{stem}_{}.pdf", spec.key);
        write_atomic(&out_dir.join(&filename), &rendered.bytes)?;

        let mut hasher = Sha256::new();
        hasher.update(&rendered.bytes);
        let hash = format!("{:x}", hasher.finalize());

        debug!(file = %filename, size = rendered.bytes.len(), mode = %rendered.mode, "wrote document");
        documents.push(WrittenDocument {
            document: spec.key.to_string(),
            label: spec.label.to_string(),
            filename,
            mode: rendered.mode,
            page_count: rendered.page_count,
            fields_written: rendered.fields_written,
            sha256: hash,
            size_bytes: rendered.bytes.len(),
        });
    }

    let manifest = OutputManifest {
        household: household.to_string(),
        generated_at: Utc::now(),
        documents,
        failures,
    };
    let manifest_path = out_dir.join(MANIFEST_FILE);
    write_json(&manifest_path, &manifest)?;

    info!(
        written = manifest.documents.len(),
        failed = manifest.failures.len(),
        "documents written"
    );
    Ok(WriteResult {
        out_dir: out_dir.to_path_buf(),
        manifest_path,
        manifest,
    })
}

/// Write to a hidden temp file beside `target`, then rename over it.
fn write_atomic(target: &Path, bytes: &[u8]) -> Result<()> {
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("output");
    let temp = target.with_file_name(format!(".{name}.tmp"));
    std::fs::write(&temp, bytes).map_err(|e| IntakeForgeError::io(&temp, e))?;
    std::fs::rename(&temp, target).map_err(|e| IntakeForgeError::io(target, e))?;
    Ok(())
}

/// Write a JSON file (pretty-printed).
fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).map_err(|e| {
        IntakeForgeError::validation(format!("JSON serialization failed: {e}"))
    })?;
    write_atomic(path, json.as_bytes())?;
    debug!(path = %path.display(), "wrote JSON file");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
