//! Tables: Markdown table nodes → word-processing grids or plain string rows.
//!
//! The parser is not consistent about the header: depending on the source it
//! either wraps header cells in rows (`table_head > table_row > table_cell`)
//! or puts the cells directly under the head (`table_head > table_cell`).
//! Both shapes are accepted here, detected once per head by [`HeadShape`].

use crate::document::{Alignment, Paragraph, ParagraphStyle, Table};
use crate::error::Md2OfficeError;
use crate::node::{NodeKind, SyntaxNode};
use crate::pipeline::render::{SpanRenderer, SpanStyle};
use tracing::debug;

/// Layout of a `table_head` node's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeadShape {
    /// `table_head > table_row > table_cell`
    Rows,
    /// `table_head > table_cell`: the head itself is the single header row.
    Cells,
}

impl HeadShape {
    fn of(head: &SyntaxNode) -> Self {
        match head.children().first() {
            Some(first) if first.is(&NodeKind::TableCell) => HeadShape::Cells,
            _ => HeadShape::Rows,
        }
    }
}

/// Header rows of a table, each row being its list of cell nodes.
fn head_rows(table: &SyntaxNode) -> Vec<&[SyntaxNode]> {
    let Some(head) = table.children().iter().find(|c| c.is(&NodeKind::TableHead)) else {
        return Vec::new();
    };
    match HeadShape::of(head) {
        HeadShape::Cells => vec![head.children()],
        HeadShape::Rows => head
            .children()
            .iter()
            .filter(|r| r.is(&NodeKind::TableRow))
            .map(SyntaxNode::children)
            .collect(),
    }
}

/// Body rows. Rows sitting directly under the table are accepted too.
fn body_rows(table: &SyntaxNode) -> Vec<&[SyntaxNode]> {
    let mut rows = Vec::new();
    for child in table.children() {
        match child.kind {
            NodeKind::TableBody => rows.extend(
                child
                    .children()
                    .iter()
                    .filter(|r| r.is(&NodeKind::TableRow))
                    .map(SyntaxNode::children),
            ),
            NodeKind::TableRow => rows.push(child.children()),
            _ => {}
        }
    }
    rows
}

/// Header rows followed by body rows, keeping only cell nodes.
fn collect_rows(table: &SyntaxNode) -> Vec<Vec<&SyntaxNode>> {
    head_rows(table)
        .into_iter()
        .chain(body_rows(table))
        .map(|cells| {
            cells
                .iter()
                .filter(|c| c.is(&NodeKind::TableCell))
                .collect()
        })
        .collect()
}

/// Build a bordered grid from a table node.
///
/// The grid has one row per header/body row and as many columns as the
/// widest row; shorter rows leave their trailing cells empty. Returns `None`
/// when the table has no cells at all.
pub fn materialize_table(node: &SyntaxNode, spans: &SpanRenderer<'_>) -> Option<Table> {
    let rows = collect_rows(node);
    let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
    if rows.is_empty() || cols == 0 {
        return None;
    }

    let mut grid = Table::new(rows.len(), cols);
    for (r, cells) in rows.iter().enumerate() {
        for (c, cell) in cells.iter().enumerate() {
            let mut p = Paragraph::new(ParagraphStyle::Normal);
            p.format.alignment = Some(Alignment::Center);
            p.format.first_line_indent_cm = Some(0.0);
            spans.render(&mut p, cell.children(), SpanStyle::default());
            // Cells use one font throughout, monospace spans included.
            let font = spans.body_font();
            for run in p.runs_mut() {
                run.font = Some(font.clone());
            }
            if let Some(slot) = grid.cell_mut(r, c) {
                slot.paragraphs.push(p);
            }
        }
    }
    debug!("Materialised {}x{} table", grid.rows.len(), cols);
    Some(grid)
}

/// The first table of a document as plain strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Find the first table in document order and read it as text.
///
/// Inline styling is dropped. Only the first header row is used as headers;
/// rows are not padded to the header width.
pub fn extract_first_table(nodes: &[SyntaxNode]) -> Result<ExtractedTable, Md2OfficeError> {
    let table =
        SyntaxNode::find_first(nodes, &NodeKind::Table).ok_or(Md2OfficeError::NoTableFound)?;

    let cell_texts = |cells: &[SyntaxNode]| -> Vec<String> {
        cells
            .iter()
            .filter(|c| c.is(&NodeKind::TableCell))
            .map(|c| c.plain_text().trim().to_string())
            .collect()
    };

    let headers = head_rows(table)
        .first()
        .map(|cells| cell_texts(*cells))
        .unwrap_or_default();
    let rows: Vec<Vec<String>> = body_rows(table)
        .into_iter()
        .map(cell_texts)
        .collect();

    if headers.is_empty() && rows.is_empty() {
        return Err(Md2OfficeError::EmptyTable);
    }
    Ok(ExtractedTable { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConversionConfig;
    use crate::pipeline::parse::parse_markdown;

    fn cell(text: &str) -> SyntaxNode {
        SyntaxNode::container(
            NodeKind::TableCell,
            vec![SyntaxNode::leaf(NodeKind::Text, text)],
        )
    }

    fn row(texts: &[&str]) -> SyntaxNode {
        SyntaxNode::container(NodeKind::TableRow, texts.iter().map(|t| cell(t)).collect())
    }

    fn texts(grid: &Table) -> Vec<Vec<String>> {
        grid.rows
            .iter()
            .map(|r| {
                r.iter()
                    .map(|c| c.paragraphs.iter().map(|p| p.text()).collect::<String>())
                    .collect()
            })
            .collect()
    }

    #[test]
    fn both_head_shapes_give_the_same_rows() {
        let body = SyntaxNode::container(NodeKind::TableBody, vec![row(&["1", "2"])]);
        let wrapped = SyntaxNode::container(
            NodeKind::Table,
            vec![
                SyntaxNode::container(NodeKind::TableHead, vec![row(&["a", "b"])]),
                body.clone(),
            ],
        );
        let flat = SyntaxNode::container(
            NodeKind::Table,
            vec![
                SyntaxNode::container(NodeKind::TableHead, vec![cell("a"), cell("b")]),
                body,
            ],
        );
        let a = extract_first_table(std::slice::from_ref(&wrapped)).unwrap();
        let b = extract_first_table(std::slice::from_ref(&flat)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.headers, vec!["a", "b"]);
        assert_eq!(a.rows, vec![vec!["1", "2"]]);
    }

    #[test]
    fn ragged_rows_fill_the_widest_grid() {
        let config = ConversionConfig::default();
        let spans = SpanRenderer::new(&config);
        let table = SyntaxNode::container(
            NodeKind::Table,
            vec![
                SyntaxNode::container(NodeKind::TableHead, vec![cell("A"), cell("B")]),
                SyntaxNode::container(
                    NodeKind::TableBody,
                    vec![row(&["1", "2", "3"]), row(&["4"])],
                ),
            ],
        );
        let grid = materialize_table(&table, &spans).unwrap();
        assert_eq!(grid.cols, 3);
        assert_eq!(
            texts(&grid),
            vec![
                vec!["A", "B", ""],
                vec!["1", "2", "3"],
                vec!["4", "", ""],
            ]
        );
        assert!(grid.rows.iter().all(|r| r.len() == 3));
        assert!(grid.rows[2][1].paragraphs.is_empty());
    }

    #[test]
    fn cells_are_centred_with_one_font() {
        let config = ConversionConfig::default();
        let spans = SpanRenderer::new(&config);
        let nodes = parse_markdown("| **Name** | `id` |\n|---|---|\n| x | y |\n");
        let grid = materialize_table(&nodes[0], &spans).unwrap();
        let p = &grid.rows[0][0].paragraphs[0];
        assert_eq!(p.format.alignment, Some(Alignment::Center));
        assert!(p.runs().next().unwrap().bold);
        let code = grid.rows[0][1].paragraphs[0].runs().next().unwrap();
        assert_eq!(code.font.as_ref().unwrap().ascii, "Times New Roman");
    }

    #[test]
    fn table_without_cells_is_skipped() {
        let config = ConversionConfig::default();
        let spans = SpanRenderer::new(&config);
        let empty = SyntaxNode::container(NodeKind::Table, vec![]);
        assert!(materialize_table(&empty, &spans).is_none());
    }

    #[test]
    fn extracts_first_table_and_ignores_later_ones() {
        let md = "intro\n\n| A | B |\n|---|---|\n| **1** | 2 |\n\n| X |\n|---|\n| 9 |\n";
        let table = extract_first_table(&parse_markdown(md)).unwrap();
        assert_eq!(table.headers, vec!["A", "B"]);
        assert_eq!(table.rows, vec![vec!["1", "2"]]);
    }

    #[test]
    fn finds_a_table_nested_in_a_quote() {
        let md = "> | A |\n> |---|\n> | 1 |\n";
        let table = extract_first_table(&parse_markdown(md)).unwrap();
        assert_eq!(table.headers, vec!["A"]);
    }

    #[test]
    fn no_table_is_an_error() {
        let err = extract_first_table(&parse_markdown("# Just text\n")).unwrap_err();
        assert!(matches!(err, Md2OfficeError::NoTableFound));
    }

    #[test]
    fn table_without_rows_is_empty() {
        let table = SyntaxNode::container(NodeKind::Table, vec![]);
        let err = extract_first_table(&[table]).unwrap_err();
        assert!(matches!(err, Md2OfficeError::EmptyTable));
    }
}
