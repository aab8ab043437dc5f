//! Meeting-prep one-pager built from a household's account workbook.
//!
//! Everything here is deterministic: figures are summed straight from the
//! sheets and the talking points follow fixed thresholds.

use std::collections::HashMap;

use chrono::NaiveDate;
use intakeforge_intake::{AccountRow, AccountSheet, AccountWorkbook};
use serde::Serialize;
use tracing::{debug, instrument};

/// Text width of the one-pager rules.
pub const ONE_PAGER_WIDTH: usize = 64;

/// Allocation drift (in percentage points) at or beyond which a class is flagged.
pub const DRIFT_THRESHOLD: f64 = 2.0;

pub const ACCOUNT_SUMMARY_SHEET: &str = "Account Summary";
pub const ACTIVITY_SHEET: &str = "Distributions & Contributions";
pub const TAX_SHEET: &str = "Tax & Realized GL";
pub const BENEFICIARIES_SHEET: &str = "Beneficiaries";
pub const ALLOCATION_SHEET: &str = "Allocation";

const DRIFT_MARKER: &str = " ◄";

// ---------------------------------------------------------------------------
// Figures
// ---------------------------------------------------------------------------

/// An asset class whose drift reached [`DRIFT_THRESHOLD`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriftFlag {
    pub asset_class: String,
    /// Drift as written in the sheet (`+2.4%`).
    pub drift: String,
    pub points: f64,
}

/// A required minimum distribution found in the activity sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RmdEntry {
    pub date: String,
    pub account: String,
    pub amount: f64,
}

/// Totals derived from the account workbook.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PrepFigures {
    pub account_count: usize,
    pub total_aum: f64,
    pub total_contributions: f64,
    /// Sum of negative activity amounts (itself negative).
    pub total_distributions: f64,
    pub estimated_taxes: f64,
    pub net_realized: f64,
    pub qualified_dividends: f64,
    pub non_qualified_dividends: f64,
    pub interest_income: f64,
    pub drift_flags: Vec<DriftFlag>,
    pub rmds: Vec<RmdEntry>,
}

impl PrepFigures {
    /// Contributions plus (negative) distributions.
    pub fn net_activity(&self) -> f64 {
        self.total_contributions + self.total_distributions
    }

    /// Dividends plus interest.
    pub fn total_income(&self) -> f64 {
        self.qualified_dividends + self.non_qualified_dividends + self.interest_income
    }
}

/// Derive the one-pager figures. Missing sheets contribute nothing.
pub fn prep_figures(book: &AccountWorkbook) -> PrepFigures {
    let mut figures = PrepFigures::default();

    for row in rows_of(book, ACCOUNT_SUMMARY_SHEET) {
        figures.account_count += 1;
        figures.total_aum += parse_amount(row.get("Market Value"));
    }

    for row in rows_of(book, ACTIVITY_SHEET) {
        let amount = parse_amount(row.get("Amount ($)"));
        if amount > 0.0 {
            figures.total_contributions += amount;
        } else if amount < 0.0 {
            figures.total_distributions += amount;
        }
        if row.get("Description").contains("RMD") {
            figures.rmds.push(RmdEntry {
                date: row.get("Date").to_string(),
                account: row.get("Account").to_string(),
                amount,
            });
        }
    }

    let tax = tax_amounts(book);
    figures.estimated_taxes = tax
        .iter()
        .filter(|(k, _)| k.contains("Est. Tax"))
        .map(|(_, v)| v)
        .sum();
    figures.net_realized = tax
        .iter()
        .filter(|(k, _)| k.contains("Realized"))
        .map(|(_, v)| v)
        .sum();
    figures.qualified_dividends = tax.get("Qualified Dividends").copied().unwrap_or(0.0);
    figures.non_qualified_dividends = tax.get("Non-Qual Dividends").copied().unwrap_or(0.0);
    figures.interest_income = tax.get("Interest Income").copied().unwrap_or(0.0);

    for row in rows_of(book, ALLOCATION_SHEET) {
        let drift = row.get("Drift");
        match drift_points(drift) {
            Some(points) if points.abs() >= DRIFT_THRESHOLD => {
                figures.drift_flags.push(DriftFlag {
                    asset_class: row.get("Asset Class").to_string(),
                    drift: drift.to_string(),
                    points,
                });
            }
            _ => {}
        }
    }

    figures
}

fn rows_of<'a>(book: &'a AccountWorkbook, sheet: &str) -> Vec<AccountRow<'a>> {
    book.sheet(sheet)
        .map(|s| s.records().collect())
        .unwrap_or_default()
}

fn has_rows(book: &AccountWorkbook, sheet: &str) -> bool {
    book.sheet(sheet).is_some_and(|s| !s.is_empty())
}

/// Category → amount. A repeated category keeps its last amount.
fn tax_amounts(book: &AccountWorkbook) -> HashMap<String, f64> {
    rows_of(book, TAX_SHEET)
        .into_iter()
        .map(|row| (row.get("Category").to_string(), parse_amount(row.get("Amount ($)"))))
        .collect()
}

/// Parse a sheet amount, ignoring `$`, `,` and `+`. Unparseable text is `0`.
pub fn parse_amount(text: &str) -> f64 {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '+'))
        .collect();
    cleaned.parse().unwrap_or(0.0)
}

fn drift_points(text: &str) -> Option<f64> {
    text.trim()
        .trim_end_matches('%')
        .trim_start_matches('+')
        .parse()
        .ok()
}

/// Whole dollars with thousands separators; negatives as `-$1,234`.
pub fn format_money(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{}", rounded.abs() as u64);

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded < 0.0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

// ---------------------------------------------------------------------------
// One-pager
// ---------------------------------------------------------------------------

struct Page {
    out: String,
}

impl Page {
    fn line(&mut self, text: impl AsRef<str>) {
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    fn rule(&mut self, ch: char) {
        let rule: String = std::iter::repeat_n(ch, ONE_PAGER_WIDTH).collect();
        self.line(rule);
    }

    fn section(&mut self, title: &str) {
        self.line("");
        self.line(title);
        self.rule('─');
    }
}

fn dashes(n: usize) -> String {
    "─".repeat(n)
}

/// Build the meeting-prep one-pager for `name`.
#[instrument(skip_all, fields(household = name, sheets = book.sheets.len()))]
pub fn build_meeting_prep(name: &str, book: &AccountWorkbook, today: NaiveDate) -> String {
    let figures = prep_figures(book);
    debug!(
        accounts = figures.account_count,
        drift_flags = figures.drift_flags.len(),
        "derived one-pager figures"
    );

    let mut page = Page { out: String::new() };
    page.rule('═');
    page.line("  MEETING PREP ONE-PAGER");
    page.line(format!("  {name}  |  Prepared: {}", today.format("%Y-%m-%d")));
    page.rule('═');

    page.section("CLIENT SNAPSHOT");
    page.line(format!("  {:<16}{name}", "Name:"));
    page.line(format!("  {:<16}Full profile available in the household registry", "Note:"));

    page.section("ACCOUNT SUMMARY");
    if let Some(sheet) = book.sheet(ACCOUNT_SUMMARY_SHEET).filter(|s| !s.is_empty()) {
        write_accounts(&mut page, sheet, &figures);
    }

    page.section("DISTRIBUTIONS & CONTRIBUTIONS (YTD)");
    if let Some(sheet) = book.sheet(ACTIVITY_SHEET).filter(|s| !s.is_empty()) {
        write_activity(&mut page, sheet, &figures);
    }

    page.section("TAX SUMMARY (YTD)");
    if has_rows(book, TAX_SHEET) {
        write_tax(&mut page, book, &figures);
    }

    page.section("BENEFICIARIES");
    if let Some(sheet) = book.sheet(BENEFICIARIES_SHEET).filter(|s| !s.is_empty()) {
        write_beneficiaries(&mut page, sheet);
    }

    page.section("CURRENT ALLOCATION vs. TARGET");
    if let Some(sheet) = book.sheet(ALLOCATION_SHEET).filter(|s| !s.is_empty()) {
        write_allocation(&mut page, sheet, &figures);
    }

    page.section("ADVISOR TALKING POINTS");
    for point in talking_points(book, &figures) {
        page.line(format!("  {point}"));
    }

    page.line("");
    page.rule('═');
    page.out
}

fn write_accounts(page: &mut Page, sheet: &AccountSheet, figures: &PrepFigures) {
    page.line(format!(
        "  {:<22} {:<12} {:>13}  As of",
        "Account", "Acct #", "Market Value"
    ));
    page.line(format!(
        "  {} {} {}  {}",
        dashes(22),
        dashes(12),
        dashes(13),
        dashes(10)
    ));
    for row in sheet.records() {
        page.line(format!(
            "  {:<22} {:<12} {:>13}  {}",
            row.get("Account"),
            row.get("Account #"),
            format_money(parse_amount(row.get("Market Value"))),
            row.get("As of Date")
        ));
    }
    page.line(format!("  {} {} {}", dashes(22), dashes(12), dashes(13)));
    page.line(format!(
        "  {:<22} {:<12} {:>13}",
        "TOTAL AUM",
        "",
        format_money(figures.total_aum)
    ));
}

fn write_activity(page: &mut Page, sheet: &AccountSheet, figures: &PrepFigures) {
    page.line(format!(
        "  {:<12} {:<14} {:<10} {:>12}  Description",
        "Date", "Type", "Account", "Amount"
    ));
    page.line(format!(
        "  {} {} {} {}  {}",
        dashes(12),
        dashes(14),
        dashes(10),
        dashes(12),
        dashes(25)
    ));
    for row in sheet.records() {
        let amount = parse_amount(row.get("Amount ($)"));
        let sign = if amount > 0.0 { "+" } else { "" };
        page.line(format!(
            "  {:<12} {:<14} {:<10} {:>12}  {}",
            row.get("Date"),
            row.get("Type"),
            row.get("Account"),
            format!("{sign}{}", format_money(amount)),
            row.get("Description")
        ));
    }
    page.line("");
    page.line(format!(
        "  {:<28} {:>12}",
        "Total Contributions:",
        format_money(figures.total_contributions)
    ));
    page.line(format!(
        "  {:<28} {:>12}",
        "Total Distributions:",
        format_money(figures.total_distributions)
    ));
    page.line(format!(
        "  {:<28} {:>12}",
        "Net Activity:",
        format_money(figures.net_activity())
    ));
}

fn write_tax(page: &mut Page, book: &AccountWorkbook, figures: &PrepFigures) {
    let tax = tax_amounts(book);
    let amount = |category: &str| format_money(tax.get(category).copied().unwrap_or(0.0));

    page.line(format!(
        "  {:<38} {:>12}",
        "Estimated Tax Payments (Q1-Q4):",
        format_money(figures.estimated_taxes)
    ));
    page.line("");
    page.line("  Realized Gains / Losses:");
    for (label, category) in [
        ("ST Gains:", "Realized ST Gains"),
        ("LT Gains:", "Realized LT Gains"),
        ("ST Losses:", "Realized ST Losses"),
        ("LT Losses:", "Realized LT Losses"),
    ] {
        page.line(format!("    {label:<34} {:>12}", amount(category)));
    }
    page.line(format!("    {}", dashes(47)));
    page.line(format!(
        "    {:<34} {:>12}",
        "Net Realized G/L:",
        format_money(figures.net_realized)
    ));
    page.line("");
    page.line("  Investment Income:");
    page.line(format!(
        "    {:<34} {:>12}",
        "Qualified Dividends:",
        format_money(figures.qualified_dividends)
    ));
    page.line(format!(
        "    {:<34} {:>12}",
        "Non-Qual Dividends:",
        format_money(figures.non_qualified_dividends)
    ));
    page.line(format!(
        "    {:<34} {:>12}",
        "Interest Income:",
        format_money(figures.interest_income)
    ));
    page.line(format!("    {}", dashes(47)));
    page.line(format!(
        "    {:<34} {:>12}",
        "Total Income:",
        format_money(figures.total_income())
    ));
}

fn write_beneficiaries(page: &mut Page, sheet: &AccountSheet) {
    page.line(format!(
        "  {:<24} {:<12} {:>5}  {:<22}  DOB",
        "Name", "Relationship", "Pct", "Account(s)"
    ));
    page.line(format!(
        "  {} {} {}  {}  {}",
        dashes(24),
        dashes(12),
        dashes(5),
        dashes(22),
        dashes(10)
    ));
    for row in sheet.records() {
        page.line(format!(
            "  {:<24} {:<12} {:>5}  {:<22}  {}",
            row.get("Name"),
            row.get("Relationship"),
            format!("{}%", row.get("Pct")),
            row.get("Account(s)"),
            row.get("DOB")
        ));
    }
}

fn write_allocation(page: &mut Page, sheet: &AccountSheet, figures: &PrepFigures) {
    page.line(format!(
        "  {:<24} {:>7}  {:>8}  {:>12}  Drift",
        "Asset Class", "Target", "Current", "Mkt Value"
    ));
    page.line(format!(
        "  {} {}  {}  {}  {}",
        dashes(24),
        dashes(7),
        dashes(8),
        dashes(12),
        dashes(8)
    ));
    for row in sheet.records() {
        let drift = row.get("Drift");
        let marker = match drift_points(drift) {
            Some(points) if points.abs() >= DRIFT_THRESHOLD => DRIFT_MARKER,
            _ => "",
        };
        page.line(format!(
            "  {:<24} {:>7}  {:>8}  {:>12}  {drift}{marker}",
            row.get("Asset Class"),
            format!("{}%", row.get("Target %")),
            format!("{}%", row.get("Current %")),
            format_money(parse_amount(row.get("Market Value")))
        ));
    }
    if !figures.drift_flags.is_empty() {
        page.line("");
        page.line(format!(
            " {DRIFT_MARKER} Drift exceeds ±{DRIFT_THRESHOLD}% rebalancing threshold"
        ));
    }
}

/// Talking points: worst drift first, then RMDs, realized G/L and AUM.
fn talking_points(book: &AccountWorkbook, figures: &PrepFigures) -> Vec<String> {
    let mut points = Vec::new();

    let mut flags: Vec<&DriftFlag> = figures.drift_flags.iter().collect();
    flags.sort_by(|a, b| b.points.abs().total_cmp(&a.points.abs()));
    for flag in flags {
        let direction = if flag.points > 0.0 {
            "OVERWEIGHT"
        } else {
            "UNDERWEIGHT"
        };
        points.push(format!(
            "⚠  {}: {} ({direction}), review rebalancing trade",
            flag.asset_class, flag.drift
        ));
    }

    for rmd in &figures.rmds {
        points.push(format!(
            "→  RMD of {} taken {} from {}, confirm tax withholding election on file",
            format_money(rmd.amount),
            rmd.date,
            rmd.account
        ));
    }

    if has_rows(book, TAX_SHEET) {
        if figures.net_realized > 0.0 {
            points.push(format!(
                "→  Net realized gain of {} YTD, coordinate with CPA before year-end",
                format_money(figures.net_realized)
            ));
        } else {
            points.push(format!(
                "→  Net realized loss of {}, assess additional tax-loss harvesting",
                format_money(figures.net_realized.abs())
            ));
        }
    }

    if figures.account_count > 0 {
        points.push(format!(
            "→  AUM totals {} across {} accounts, review consolidation opportunities",
            format_money(figures.total_aum),
            figures.account_count
        ));
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thornton_book() -> AccountWorkbook {
        AccountWorkbook::from_sheets(vec![
            AccountSheet::from_rows(
                ACCOUNT_SUMMARY_SHEET,
                [
                    vec!["Account", "Account #", "Market Value", "As of Date"],
                    vec!["IRA Rollover", "IRA-7741", "1245000", "2024-12-31"],
                    vec!["Brokerage Taxable", "BRK-2293", "875000", "2024-12-31"],
                    vec!["Roth IRA", "RTH-0847", "320000", "2024-12-31"],
                    vec!["Joint Taxable", "JNT-5512", "560000", "2024-12-31"],
                ],
            ),
            AccountSheet::from_rows(
                ACTIVITY_SHEET,
                [
                    vec!["Date", "Type", "Account", "Amount ($)", "Description"],
                    vec!["2024-01-15", "Contribution", "IRA-7741", "7000", "Annual IRA Contribution"],
                    vec!["2024-03-01", "Distribution", "BRK-2293", "-25000", "Quarterly Income Distribution"],
                    vec!["2024-06-15", "Contribution", "RTH-0847", "7000", "Roth IRA Contribution"],
                    vec!["2024-09-01", "Distribution", "IRA-7741", "-18500", "RMD Distribution"],
                    vec!["2024-12-01", "Contribution", "JNT-5512", "15000", "Year-End Contribution"],
                ],
            ),
            AccountSheet::from_rows(
                TAX_SHEET,
                [
                    vec!["Category", "Amount ($)"],
                    vec!["Est. Tax Payment Q1", "28500"],
                    vec!["Est. Tax Payment Q2", "28500"],
                    vec!["Est. Tax Payment Q3", "28500"],
                    vec!["Est. Tax Payment Q4", "28500"],
                    vec!["Realized ST Gains", "42300"],
                    vec!["Realized LT Gains", "87500"],
                    vec!["Realized ST Losses", "-12400"],
                    vec!["Realized LT Losses", "-8750"],
                    vec!["Qualified Dividends", "18600"],
                    vec!["Non-Qual Dividends", "3200"],
                    vec!["Interest Income", "4750"],
                ],
            ),
            AccountSheet::from_rows(
                ALLOCATION_SHEET,
                [
                    vec!["Asset Class", "Target %", "Current %", "Market Value", "Drift"],
                    vec!["US Large Cap Equity", "30", "32.4", "972000", "+2.4%"],
                    vec!["Alternatives", "8", "6.7", "201000", "-1.3%"],
                    vec!["Emerging Markets", "5", "2.0", "60000", "-3.0%"],
                    vec!["Cash", "2", "1.8", "54000", "n/a"],
                ],
            ),
        ])
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 9).unwrap()
    }

    #[test]
    fn money_formatting() {
        assert_eq!(format_money(3_000_000.0), "$3,000,000");
        assert_eq!(format_money(-18_500.0), "-$18,500");
        assert_eq!(format_money(999.4), "$999");
        assert_eq!(format_money(0.0), "$0");
        assert_eq!(format_money(-0.2), "$0");
    }

    #[test]
    fn amounts_ignore_currency_noise() {
        assert_eq!(parse_amount("$1,245,000"), 1_245_000.0);
        assert_eq!(parse_amount("+7,000"), 7_000.0);
        assert_eq!(parse_amount("-25000"), -25_000.0);
        assert_eq!(parse_amount("pending"), 0.0);
        assert_eq!(parse_amount(""), 0.0);
    }

    #[test]
    fn figures_sum_the_sheets() {
        let figures = prep_figures(&thornton_book());
        assert_eq!(figures.account_count, 4);
        assert_eq!(figures.total_aum, 3_000_000.0);
        assert_eq!(figures.total_contributions, 29_000.0);
        assert_eq!(figures.total_distributions, -43_500.0);
        assert_eq!(figures.net_activity(), -14_500.0);
        assert_eq!(figures.estimated_taxes, 114_000.0);
        assert_eq!(figures.net_realized, 108_650.0);
        assert_eq!(figures.total_income(), 26_550.0);
        assert_eq!(
            figures.rmds,
            [RmdEntry {
                date: "2024-09-01".into(),
                account: "IRA-7741".into(),
                amount: -18_500.0,
            }]
        );
        let flagged: Vec<&str> = figures.drift_flags.iter().map(|f| f.asset_class.as_str()).collect();
        assert_eq!(flagged, ["US Large Cap Equity", "Emerging Markets"]);
    }

    #[test]
    fn one_pager_sections_and_talking_points() {
        let text = build_meeting_prep("Robert Thornton", &thornton_book(), today());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "═".repeat(ONE_PAGER_WIDTH));
        assert_eq!(lines[2], "  Robert Thornton  |  Prepared: 2026-03-09");
        for section in [
            "CLIENT SNAPSHOT",
            "ACCOUNT SUMMARY",
            "DISTRIBUTIONS & CONTRIBUTIONS (YTD)",
            "TAX SUMMARY (YTD)",
            "BENEFICIARIES",
            "CURRENT ALLOCATION vs. TARGET",
            "ADVISOR TALKING POINTS",
        ] {
            assert!(lines.contains(&section), "missing section {section}");
        }
        assert!(text.contains("TOTAL AUM"));
        assert!(text.contains("$3,000,000"));
        assert!(text.contains("+$7,000"));
        assert!(lines.iter().any(|l| l.contains("+2.4%") && l.ends_with(DRIFT_MARKER)));
        assert!(lines.iter().any(|l| l.contains("-1.3%") && !l.ends_with(DRIFT_MARKER)));

        let points: Vec<&str> = lines
            .iter()
            .copied()
            .skip_while(|l| *l != "ADVISOR TALKING POINTS")
            .skip(2)
            .take_while(|l| !l.is_empty())
            .collect();
        assert_eq!(points.len(), 5);
        assert!(points[0].contains("Emerging Markets: -3.0% (UNDERWEIGHT)"));
        assert!(points[1].contains("US Large Cap Equity: +2.4% (OVERWEIGHT)"));
        assert!(points[2].contains("RMD of -$18,500 taken 2024-09-01 from IRA-7741"));
        assert!(points[3].contains("Net realized gain of $108,650"));
        assert!(points[4].contains("AUM totals $3,000,000 across 4 accounts"));
    }

    #[test]
    fn empty_workbook_still_has_frame() {
        let text = build_meeting_prep("Dana Whitfield", &AccountWorkbook::default(), today());
        assert!(text.contains("ACCOUNT SUMMARY"));
        assert!(!text.contains("TOTAL AUM"));
        assert!(!text.contains("→"));
        assert!(text.ends_with(&format!("{}\n", "═".repeat(ONE_PAGER_WIDTH))));
    }

    #[test]
    fn fixture_workbook_matches_in_memory_figures() {
        let book = AccountWorkbook::load(std::path::Path::new(
            "../../../fixtures/accounts/robert_thornton.xlsx",
        ))
        .expect("load account workbook");
        let figures = prep_figures(&book);
        assert_eq!(figures.total_aum, 3_000_000.0);
        assert_eq!(figures.net_realized, 108_650.0);
        assert_eq!(figures.drift_flags.len(), 1);
        assert!(build_meeting_prep("Robert Thornton", &book, today()).contains("Linda Thornton"));
    }
}
