//! Spreadsheet styling: [`SpreadsheetInput`] → styled [`Worksheet`].
//!
//! Layout, top to bottom:
//!
//! ```text
//! row 1        title, merged across the header width, sized by length
//! row 2        header cells (bold, grey fill)
//! rows 3..     data rows; summary rows (合计 / 总计 / Total) bold, blue fill
//! (gap)
//! last+2       metadata summary line, merged
//! last+3       生成时间：YYYY-MM-DD, merged
//! ```
//!
//! The output depends only on the input, except for the date fallback used
//! when a supplied metadata timestamp cannot be parsed.

use crate::workbook::{
    CellStyle, CellValue, MergeRange, SheetMetadata, SpreadsheetInput, Worksheet,
};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

/// First-cell labels that mark a summary row. Matched exactly.
pub const SUMMARY_LABELS: [&str; 3] = ["合计", "总计", "Total"];

const HEADER_FILL: &str = "F2F2F2";
const SUMMARY_FILL: &str = "E6F3FF";
const TABLE_FONT_SIZE: u32 = 11;

/// Title font size and row height for a title of `title` characters.
pub fn title_style(title: &str) -> (u32, f64) {
    match title.chars().count() {
        0..=15 => (16, 25.0),
        16..=25 => (14, 35.0),
        26..=40 => (12, 45.0),
        _ => (11, 55.0),
    }
}

/// Whether a data row is a summary row, judged by its first cell.
pub fn is_summary_row(row: &[CellValue]) -> bool {
    match row.first() {
        Some(CellValue::Text(label)) => SUMMARY_LABELS.contains(&label.as_str()),
        _ => false,
    }
}

fn grid_style() -> CellStyle {
    CellStyle {
        border: true,
        align_center: true,
        wrap: true,
        ..CellStyle::default()
    }
}

fn highlighted(fill: &str) -> CellStyle {
    CellStyle {
        bold: true,
        font_size: Some(TABLE_FONT_SIZE),
        fill: Some(fill.to_string()),
        ..grid_style()
    }
}

/// Build the worksheet, using today's date for unparseable timestamps.
pub fn build_worksheet(input: &SpreadsheetInput) -> Worksheet {
    build_worksheet_on(input, Local::now().date_naive())
}

/// Build the worksheet with an explicit fallback date.
pub fn build_worksheet_on(input: &SpreadsheetInput, today: NaiveDate) -> Worksheet {
    let mut ws = Worksheet::default();
    let cols = u32::try_from(input.column_count()).unwrap_or(u32::MAX).max(1);

    let (title_size, title_height) = title_style(&input.title);
    ws.set(
        1,
        1,
        CellValue::Text(input.title.clone()),
        CellStyle {
            bold: true,
            font_size: Some(title_size),
            align_center: true,
            wrap: true,
            ..CellStyle::default()
        },
    );
    merge_row(&mut ws, 1, cols);
    ws.row_heights.insert(1, title_height);

    for (c, header) in (1u32..).zip(&input.headers) {
        ws.set(2, c, header.clone(), highlighted(HEADER_FILL));
    }

    let mut summary_rows = 0;
    for (r, row) in (3u32..).zip(&input.rows) {
        let style = if is_summary_row(row) {
            summary_rows += 1;
            highlighted(SUMMARY_FILL)
        } else {
            grid_style()
        };
        for (c, value) in (1u32..).zip(row) {
            ws.set(r, c, value.clone(), style.clone());
        }
    }

    // Widths cover the title and table cells, not the metadata lines below.
    for c in 1..=cols {
        let max_len = ws
            .column(c)
            .filter(|cell| !cell.value.is_empty())
            .map(|cell| cell.value.char_len())
            .max()
            .unwrap_or(0);
        ws.column_widths.insert(c, (max_len as f64 + 2.0) * 1.2);
    }

    if let Some(meta) = &input.metadata {
        append_metadata(&mut ws, meta, cols, today);
    }

    debug!(
        "Built worksheet: {} columns, {} data rows ({} summary)",
        cols,
        input.rows.len(),
        summary_rows
    );
    ws
}

fn append_metadata(ws: &mut Worksheet, meta: &SheetMetadata, cols: u32, today: NaiveDate) {
    let row = ws.max_row() + 2;
    if let Some(summary) = &meta.summary {
        ws.set(row, 1, CellValue::Text(summary.clone()), CellStyle::default());
        merge_row(ws, row, cols);
    }
    if let Some(raw) = &meta.timestamp {
        let date = parse_timestamp(raw).unwrap_or_else(|| {
            warn!("Unparseable metadata timestamp {:?}, using today", raw);
            today
        });
        let ts_row = row + 1;
        ws.set(
            ts_row,
            1,
            CellValue::Text(format!("生成时间：{}", date.format("%Y-%m-%d"))),
            CellStyle::default(),
        );
        merge_row(ws, ts_row, cols);
    }
}

/// Accepts `YYYY-MM-DDTHH:MM:SSZ`, then any RFC 3339 timestamp.
fn parse_timestamp(raw: &str) -> Option<NaiveDate> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%SZ")
        .map(|dt| dt.date())
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .ok()
}

fn merge_row(ws: &mut Worksheet, row: u32, cols: u32) {
    if cols > 1 {
        ws.merges.push(MergeRange::row_span(row, 1, cols));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn q1_report() -> SpreadsheetInput {
        SpreadsheetInput::new(
            "Q1 Report",
            strings(&["Product", "Sales"]),
            vec![strings(&["Widget A", "100"]), strings(&["Total", "100"])],
        )
        .unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn title_bands_follow_length() {
        assert_eq!(title_style("短标题"), (16, 25.0));
        assert_eq!(title_style(&"x".repeat(15)), (16, 25.0));
        assert_eq!(title_style(&"x".repeat(16)), (14, 35.0));
        assert_eq!(title_style(&"x".repeat(25)), (14, 35.0));
        assert_eq!(title_style(&"x".repeat(40)), (12, 45.0));
        assert_eq!(title_style(&"x".repeat(41)), (11, 55.0));
    }

    #[test]
    fn summary_row_gets_its_own_fill() {
        let ws = build_worksheet(&q1_report());
        let widget = &ws.get(3, 1).unwrap().style;
        let total = &ws.get(4, 1).unwrap().style;
        assert_eq!(widget.fill, None);
        assert!(!widget.bold);
        assert_eq!(total.fill.as_deref(), Some(SUMMARY_FILL));
        assert!(total.bold);
        assert_eq!(ws.get(4, 2).unwrap().style, *total);
        assert_eq!(ws.get(2, 1).unwrap().style.fill.as_deref(), Some(HEADER_FILL));
    }

    #[test]
    fn summary_labels_match_exactly() {
        for label in ["total", " Total", "合计:", "Totals"] {
            assert!(!is_summary_row(&[CellValue::from(label)]), "{label:?}");
        }
        for label in SUMMARY_LABELS {
            assert!(is_summary_row(&[CellValue::from(label)]));
        }
        assert!(!is_summary_row(&[]));
    }

    #[test]
    fn title_is_merged_and_sized() {
        let ws = build_worksheet(&q1_report());
        assert_eq!(ws.merges, vec![MergeRange::row_span(1, 1, 2)]);
        assert_eq!(ws.row_heights.get(&1), Some(&25.0));
        assert_eq!(ws.get(1, 1).unwrap().style.font_size, Some(16));
    }

    #[test]
    fn single_column_title_is_not_merged() {
        let input = SpreadsheetInput::new("t", strings(&["only"]), vec![]).unwrap();
        assert!(build_worksheet(&input).merges.is_empty());
    }

    #[test]
    fn widths_count_the_longest_cell() {
        let ws = build_worksheet(&q1_report());
        // "Q1 Report" (9) is longest in column A, "Sales" (5) in column B.
        assert_eq!(ws.column_widths[&1], (9.0 + 2.0) * 1.2);
        assert_eq!(ws.column_widths[&2], (5.0 + 2.0) * 1.2);
    }

    #[test]
    fn metadata_goes_two_rows_below_the_data() {
        let input = q1_report().with_metadata(SheetMetadata {
            summary: Some("Quarterly totals".into()),
            timestamp: Some("2024-04-02T09:30:00Z".into()),
        });
        let ws = build_worksheet_on(&input, date(2030, 1, 1));
        assert!(ws.get(5, 1).is_none());
        assert_eq!(ws.get(6, 1).unwrap().value.to_string(), "Quarterly totals");
        assert_eq!(ws.get(7, 1).unwrap().value.to_string(), "生成时间：2024-04-02");
        assert!(ws.merges.contains(&MergeRange::row_span(6, 1, 2)));
        assert!(ws.merges.contains(&MergeRange::row_span(7, 1, 2)));
        // Metadata text does not widen the columns.
        assert_eq!(ws.column_widths[&1], (9.0 + 2.0) * 1.2);
    }

    #[test]
    fn rfc3339_timestamps_are_accepted() {
        assert_eq!(
            parse_timestamp("2024-04-02T23:30:00+08:00"),
            Some(date(2024, 4, 2))
        );
    }

    #[test]
    fn bad_timestamp_falls_back_to_today() {
        let input = q1_report().with_metadata(SheetMetadata {
            summary: None,
            timestamp: Some("last tuesday".into()),
        });
        let ws = build_worksheet_on(&input, date(2025, 6, 30));
        assert_eq!(ws.get(7, 1).unwrap().value.to_string(), "生成时间：2025-06-30");
        assert!(ws.get(6, 1).is_none());
    }

    #[test]
    fn same_input_same_sheet() {
        let input = q1_report();
        assert_eq!(build_worksheet(&input), build_worksheet(&input));
    }
}
