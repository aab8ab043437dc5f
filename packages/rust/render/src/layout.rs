//! Page geometry of the fallback data sheet (PDF points, US Letter).

pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;
pub const MARGIN: f32 = 36.0;
pub const HEADER_HEIGHT: f32 = 130.0;
pub const FOOTER_HEIGHT: f32 = 30.0;
pub const ROW_HEIGHT: f32 = 25.0;

/// Character budget for a row label.
pub const LABEL_BUDGET: usize = 40;
/// Character budget for a row value.
pub const VALUE_BUDGET: usize = 70;

/// Horizontal offset of the value column from the left margin.
pub const VALUE_COLUMN: f32 = 210.0;

/// Vertical space left for rows between header band and footer.
pub fn usable_height() -> f32 {
    PAGE_HEIGHT - 2.0 * MARGIN - HEADER_HEIGHT - FOOTER_HEIGHT
}

/// Whole rows that fit on one page.
pub fn rows_per_page() -> usize {
    (usable_height() / ROW_HEIGHT).floor() as usize
}

/// Pages needed for `rows` rows. An empty sheet still has one page.
pub fn page_count(rows: usize) -> usize {
    rows.div_ceil(rows_per_page()).max(1)
}

/// Shorten `text` to at most `budget` characters, marking the cut with `...`.
pub fn truncate(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        return text.to_string();
    }
    let keep = budget.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}
