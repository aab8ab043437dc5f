//! Document rendering for IntakeForge.
//!
//! [`render_document`] picks the mode with a single check: if the
//! document's template exists in the forms directory it is filled
//! ([`fill`]), otherwise a fallback data sheet is synthesized
//! ([`fallback`]). A missing template is never an error; a template that
//! exists but cannot be parsed is.

pub mod fallback;
pub mod fill;
pub mod labels;
pub mod layout;

use std::path::PathBuf;

use chrono::NaiveDate;
use intakeforge_forms::{DocumentKind, DocumentTypeSpec};
use intakeforge_shared::{AppConfig, Result, TargetFieldMap};
use serde::Serialize;
use tracing::{info, instrument};

pub use fallback::{DataSheet, SheetHeader, render_data_sheet};
pub use fill::{FilledTemplate, fill_template, form_fields};
pub use labels::human_label;

/// How a document was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// The original template with its fillable fields written.
    Filled,
    /// A synthesized data sheet (template unavailable).
    Fallback,
}

impl std::fmt::Display for RenderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Filled => f.pad("filled"),
            Self::Fallback => f.pad("fallback"),
        }
    }
}

/// A rendered document. The caller owns the bytes.
#[derive(Debug)]
pub struct RenderedDocument {
    pub kind: DocumentKind,
    pub mode: RenderMode,
    pub bytes: Vec<u8>,
    pub page_count: usize,
    /// Fields written (fill mode) or rows printed (fallback mode).
    pub fields_written: usize,
}

/// Where templates live and what the fallback header says.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub forms_dir: PathBuf,
    pub product_name: String,
    pub confidentiality_notice: String,
    pub generated_on: NaiveDate,
}

impl RenderOptions {
    /// Options from config, dated `today`.
    pub fn from_config(config: &AppConfig, today: NaiveDate) -> Result<Self> {
        Ok(Self {
            forms_dir: config.forms_dir()?,
            product_name: config.branding.product_name.clone(),
            confidentiality_notice: config.branding.confidentiality_notice.clone(),
            generated_on: today,
        })
    }
}

/// Render one document from its mapped fields.
#[instrument(skip_all, fields(document = spec.key))]
pub fn render_document(
    spec: &DocumentTypeSpec,
    fields: &TargetFieldMap,
    opts: &RenderOptions,
) -> Result<RenderedDocument> {
    let template = opts.forms_dir.join(spec.template);

    if template.is_file() {
        let filled = fill_template(spec.key, &template, fields)?;
        info!(
            mode = %RenderMode::Filled,
            pages = filled.page_count,
            written = filled.fields_written,
            "rendered document"
        );
        return Ok(RenderedDocument {
            kind: spec.kind,
            mode: RenderMode::Filled,
            bytes: filled.bytes,
            page_count: filled.page_count,
            fields_written: filled.fields_written,
        });
    }

    let generated_on = opts.generated_on.format("%m/%d/%Y").to_string();
    let header = SheetHeader {
        product_name: &opts.product_name,
        title: spec.label,
        generated_on: &generated_on,
        confidentiality_notice: &opts.confidentiality_notice,
    };
    let sheet = render_data_sheet(&header, fields.populated())?;
    info!(
        mode = %RenderMode::Fallback,
        template = %template.display(),
        pages = sheet.page_count,
        "template not found, rendered data sheet"
    );
    Ok(RenderedDocument {
        kind: spec.kind,
        mode: RenderMode::Fallback,
        bytes: sheet.bytes,
        page_count: sheet.page_count,
        fields_written: fields.populated_count(),
    })
}
