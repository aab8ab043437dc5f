//! Fallback mode: synthesize a plain tabular data sheet.
//!
//! Used when a document's fillable template is not available. Every page
//! carries the header band (product name, document title, generation date,
//! confidentiality notice) and a footer line; rows alternate shading.

use intakeforge_shared::{IntakeForgeError, Result};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};
use tracing::debug;

use crate::labels::human_label;
use crate::layout::{
    FOOTER_HEIGHT, HEADER_HEIGHT, LABEL_BUDGET, MARGIN, PAGE_HEIGHT, PAGE_WIDTH, ROW_HEIGHT,
    VALUE_BUDGET, VALUE_COLUMN, rows_per_page, truncate,
};

const FONT_REGULAR: &str = "F1";
const FONT_BOLD: &str = "F2";

/// Text that appears on every page of one data sheet.
#[derive(Debug, Clone)]
pub struct SheetHeader<'a> {
    pub product_name: &'a str,
    pub title: &'a str,
    pub generated_on: &'a str,
    pub confidentiality_notice: &'a str,
}

/// A synthesized sheet.
#[derive(Debug)]
pub struct DataSheet {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// Lay out `rows` (already-labelled, non-empty) into a paginated PDF.
pub fn render_data_sheet<'r>(
    header: &SheetHeader<'_>,
    rows: impl IntoIterator<Item = (&'r str, &'r str)>,
) -> Result<DataSheet> {
    let rows: Vec<(String, String)> = rows
        .into_iter()
        .filter(|(_, v)| !v.trim().is_empty())
        .map(|(k, v)| {
            (
                truncate(&human_label(k), LABEL_BUDGET),
                truncate(v.trim(), VALUE_BUDGET),
            )
        })
        .collect();

    let per_page = rows_per_page();
    let chunks: Vec<&[(String, String)]> = if rows.is_empty() {
        vec![&rows[..]]
    } else {
        rows.chunks(per_page).collect()
    };
    let total = chunks.len();

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let font_bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            FONT_REGULAR => font_regular,
            FONT_BOLD => font_bold,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(total);
    for (idx, chunk) in chunks.iter().enumerate() {
        let content = page_content(header, chunk, idx + 1, total);
        let encoded = content.encode().map_err(|e| {
            IntakeForgeError::render(header.title, format!("cannot encode page content: {e}"))
        })?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => total as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), real(PAGE_WIDTH), real(PAGE_HEIGHT)],
        }),
    );
    let info_id: ObjectId = doc.add_object(dictionary! {
        "Title" => Object::string_literal(latin1(header.title)),
        "Producer" => Object::string_literal(latin1(header.product_name)),
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| IntakeForgeError::render(header.title, format!("cannot serialize: {e}")))?;

    debug!(rows = rows.len(), pages = total, "rendered fallback data sheet");
    Ok(DataSheet {
        bytes,
        page_count: total,
    })
}

fn page_content(
    header: &SheetHeader<'_>,
    rows: &[(String, String)],
    page: usize,
    total: usize,
) -> Content {
    let mut ops = Vec::new();
    let left = MARGIN;
    let width = PAGE_WIDTH - 2.0 * MARGIN;
    let band_bottom = PAGE_HEIGHT - MARGIN - HEADER_HEIGHT;

    // Header band.
    fill_rect(&mut ops, (0.11, 0.16, 0.27), left, band_bottom, width, HEADER_HEIGHT);
    set_fill(&mut ops, (0.78, 0.66, 0.32));
    text(&mut ops, FONT_BOLD, 10.0, left + 16.0, PAGE_HEIGHT - MARGIN - 26.0, header.product_name);
    set_fill(&mut ops, (1.0, 1.0, 1.0));
    text(&mut ops, FONT_BOLD, 18.0, left + 16.0, PAGE_HEIGHT - MARGIN - 58.0, header.title);
    text(
        &mut ops,
        FONT_REGULAR,
        9.0,
        left + 16.0,
        PAGE_HEIGHT - MARGIN - 84.0,
        &format!("Generated {}", header.generated_on),
    );
    set_fill(&mut ops, (0.85, 0.85, 0.85));
    text(
        &mut ops,
        FONT_REGULAR,
        8.0,
        left + 16.0,
        PAGE_HEIGHT - MARGIN - 110.0,
        header.confidentiality_notice,
    );

    // Rows.
    for (idx, (label, value)) in rows.iter().enumerate() {
        let y = band_bottom - (idx as f32 + 1.0) * ROW_HEIGHT;
        if idx % 2 == 1 {
            fill_rect(&mut ops, (0.94, 0.95, 0.97), left, y, width, ROW_HEIGHT);
        }
        set_fill(&mut ops, (0.2, 0.2, 0.2));
        text(&mut ops, FONT_BOLD, 9.0, left + 8.0, y + 9.0, label);
        set_fill(&mut ops, (0.0, 0.0, 0.0));
        text(&mut ops, FONT_REGULAR, 9.0, left + VALUE_COLUMN, y + 9.0, value);
    }

    // Footer.
    let footer_y = MARGIN + FOOTER_HEIGHT;
    ops.push(Operation::new("RG", vec![real(0.6), real(0.6), real(0.6)]));
    ops.push(Operation::new("w", vec![real(0.5)]));
    ops.push(Operation::new("m", vec![real(left), real(footer_y)]));
    ops.push(Operation::new("l", vec![real(left + width), real(footer_y)]));
    ops.push(Operation::new("S", vec![]));
    set_fill(&mut ops, (0.4, 0.4, 0.4));
    text(
        &mut ops,
        FONT_REGULAR,
        8.0,
        left,
        MARGIN + 12.0,
        &format!("{}  |  Page {page} of {total}", header.product_name),
    );

    Content { operations: ops }
}

fn real(v: f32) -> Object {
    v.into()
}

fn set_fill(ops: &mut Vec<Operation>, (r, g, b): (f32, f32, f32)) {
    ops.push(Operation::new("rg", vec![real(r), real(g), real(b)]));
}

fn fill_rect(
    ops: &mut Vec<Operation>,
    color: (f32, f32, f32),
    x: f32,
    y: f32,
    w: f32,
    h: f32,
) {
    set_fill(ops, color);
    ops.push(Operation::new("re", vec![real(x), real(y), real(w), real(h)]));
    ops.push(Operation::new("f", vec![]));
}

fn text(ops: &mut Vec<Operation>, font: &str, size: f32, x: f32, y: f32, body: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec![Object::Name(font.as_bytes().to_vec()), real(size)]));
    ops.push(Operation::new("Td", vec![real(x), real(y)]));
    ops.push(Operation::new("Tj", vec![Object::string_literal(latin1(body))]));
    ops.push(Operation::new("ET", vec![]));
}

/// WinAnsi-compatible bytes; characters outside Latin-1 become `?`.
fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn page_texts(bytes: &[u8]) -> Vec<Vec<String>> {
        let doc = Document::load_mem(bytes).expect("reload");
        doc.get_pages()
            .values()
            .map(|page_id| {
                let raw = doc.get_page_content(*page_id).expect("content");
                let content = Content::decode(&raw).expect("decode");
                content
                    .operations
                    .iter()
                    .filter(|op| op.operator == "Tj")
                    .filter_map(|op| op.operands.first())
                    .filter_map(|o| o.as_str().ok())
                    .map(|b| b.iter().map(|&c| c as char).collect::<String>())
                    .collect()
            })
            .collect()
    }

    fn header() -> SheetHeader<'static> {
        SheetHeader {
            product_name: "Wealth Intelligence Platform",
            title: "Trust Account Application",
            generated_on: "03/09/2026",
            confidentiality_notice: "CONFIDENTIAL",
        }
    }

    #[test]
    fn forty_seven_rows_make_three_pages() {
        let rows: Vec<(String, String)> = (0..47)
            .map(|i| (format!("PI_Field{i}"), format!("value {i}")))
            .collect();
        let sheet = render_data_sheet(&header(), rows.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .expect("render");
        assert_eq!(sheet.page_count, 3);

        let pages = page_texts(&sheet.bytes);
        assert_eq!(pages.len(), 3);
        for (idx, texts) in pages.iter().enumerate() {
            assert!(texts.contains(&"Trust Account Application".to_string()));
            assert!(texts.contains(&format!("Wealth Intelligence Platform  |  Page {} of 3", idx + 1)));
        }
        assert!(pages[2].contains(&"value 46".to_string()));
    }

    #[test]
    fn empty_values_are_skipped_and_sheet_keeps_one_page() {
        let sheet = render_data_sheet(&header(), [("PI_MI", ""), ("PI_SSN", "  ")]).expect("render");
        assert_eq!(sheet.page_count, 1);
        let pages = page_texts(&sheet.bytes);
        assert!(!pages[0].iter().any(|t| t == "MI"));
    }

    #[test]
    fn rows_use_human_labels_and_budgets() {
        let long = "y".repeat(120);
        let sheet = render_data_sheet(
            &header(),
            [("PI_PermAddressCity02", "Naperville"), ("PI_Email", long.as_str())],
        )
        .expect("render");
        let texts = &page_texts(&sheet.bytes)[0];
        assert!(texts.contains(&"Perm Address City 02".to_string()));
        assert!(texts.iter().any(|t| t.len() == VALUE_BUDGET && t.ends_with("...")));
    }

    #[test]
    fn non_latin_text_is_replaced() {
        assert_eq!(latin1("Zoë 日本"), b"Zo\xeb ??".to_vec());
    }
}
