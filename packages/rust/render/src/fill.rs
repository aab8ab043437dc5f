//! Fill mode: write values into a template's AcroForm text fields.
//!
//! Only fields whose fully qualified name appears in the map with a
//! non-empty value are touched. Everything else in the template, including
//! its page count and static layout, is written back unchanged.

use std::collections::HashSet;
use std::path::Path;

use intakeforge_shared::{IntakeForgeError, Result, TargetFieldMap};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

/// Result of filling one template.
#[derive(Debug)]
pub struct FilledTemplate {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    /// Number of AcroForm fields that received a value.
    pub fields_written: usize,
}

/// Load `template`, fill it from `fields` and serialize the result.
///
/// `document` names the document in errors.
pub fn fill_template(
    document: &str,
    template: &Path,
    fields: &TargetFieldMap,
) -> Result<FilledTemplate> {
    let mut doc = Document::load(template).map_err(|e| {
        IntakeForgeError::render(document, format!("cannot parse {}: {e}", template.display()))
    })?;

    let targets = form_fields(&doc)
        .map_err(|e| IntakeForgeError::render(document, format!("invalid AcroForm: {e}")))?;

    let mut written = 0;
    for (id, name) in &targets {
        let Some(value) = fields.get(name).filter(|v| !v.trim().is_empty()) else {
            continue;
        };
        let field = doc
            .get_object_mut(*id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| IntakeForgeError::render(document, format!("field {name}: {e}")))?;
        field.set("V", text_object(value));
        written += 1;
    }

    if written > 0 {
        set_need_appearances(&mut doc)
            .map_err(|e| IntakeForgeError::render(document, format!("invalid AcroForm: {e}")))?;
    }

    let page_count = doc.get_pages().len();
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| IntakeForgeError::render(document, format!("cannot serialize: {e}")))?;

    debug!(
        document,
        form_fields = targets.len(),
        written,
        pages = page_count,
        "filled template"
    );
    Ok(FilledTemplate {
        bytes,
        page_count,
        fields_written: written,
    })
}

/// Every terminal AcroForm field as (object id, fully qualified name).
pub fn form_fields(doc: &Document) -> lopdf::Result<Vec<(ObjectId, String)>> {
    let Some(acro_form) = acro_form(doc)? else {
        return Ok(Vec::new());
    };
    let Ok(roots) = acro_form.get(b"Fields") else {
        return Ok(Vec::new());
    };
    let (_, roots) = doc.dereference(roots)?;

    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for item in roots.as_array()? {
        if let Ok(id) = item.as_reference() {
            collect_fields(doc, id, None, &mut out, &mut seen)?;
        }
    }
    Ok(out)
}

fn acro_form(doc: &Document) -> lopdf::Result<Option<&Dictionary>> {
    let catalog = doc.catalog()?;
    let Ok(entry) = catalog.get(b"AcroForm") else {
        return Ok(None);
    };
    let (_, object) = doc.dereference(entry)?;
    Ok(Some(object.as_dict()?))
}

fn collect_fields(
    doc: &Document,
    id: ObjectId,
    parent: Option<&str>,
    out: &mut Vec<(ObjectId, String)>,
    seen: &mut HashSet<ObjectId>,
) -> lopdf::Result<()> {
    if !seen.insert(id) {
        return Ok(());
    }
    let dict = doc.get_object(id)?.as_dict()?;

    let partial = dict.get(b"T").ok().and_then(|t| t.as_str().ok()).map(decode_text);
    let qualified = match (parent, partial) {
        (Some(p), Some(t)) => Some(format!("{p}.{t}")),
        (None, Some(t)) => Some(t),
        (Some(p), None) => Some(p.to_string()),
        (None, None) => None,
    };

    // Kids that carry their own names are child fields; nameless kids are
    // just widget annotations of this field.
    let mut named_kids = Vec::new();
    if let Ok(kids) = dict.get(b"Kids").and_then(Object::as_array) {
        for kid in kids {
            let Ok(kid_id) = kid.as_reference() else {
                continue;
            };
            let has_name = doc
                .get_object(kid_id)
                .and_then(Object::as_dict)
                .map(|d| d.has(b"T"))
                .unwrap_or(false);
            if has_name {
                named_kids.push(kid_id);
            }
        }
    }

    if named_kids.is_empty() {
        if let Some(name) = qualified {
            out.push((id, name));
        }
        return Ok(());
    }
    for kid in named_kids {
        collect_fields(doc, kid, qualified.as_deref(), out, seen)?;
    }
    Ok(())
}

fn set_need_appearances(doc: &mut Document) -> lopdf::Result<()> {
    let root_id = doc.trailer.get(b"Root")?.as_reference()?;
    let acro_ref = doc
        .get_object(root_id)?
        .as_dict()?
        .get(b"AcroForm")
        .ok()
        .and_then(|o| o.as_reference().ok());

    let acro_form = match acro_ref {
        Some(id) => doc.get_object_mut(id)?.as_dict_mut()?,
        None => doc
            .get_object_mut(root_id)?
            .as_dict_mut()?
            .get_mut(b"AcroForm")?
            .as_dict_mut()?,
    };
    acro_form.set("NeedAppearances", true);
    Ok(())
}

/// Decode a PDF text string (UTF-16BE with BOM, else PDFDocEncoding ≈ Latin-1).
pub fn decode_text(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Encode a value as a PDF text string: plain for ASCII, UTF-16BE otherwise.
fn text_object(value: &str) -> Object {
    if value.is_ascii() {
        return Object::string_literal(value);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in value.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, lopdf::StringFormat::Hexadecimal)
}
