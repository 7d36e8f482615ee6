//! In-memory model of the spreadsheet output.
//!
//! [`SpreadsheetInput`] is the validated request (title, header row, data
//! rows, optional metadata); [`Worksheet`] is the styled grid built from it by
//! [`crate::pipeline::sheet`] and serialised by [`crate::ooxml::xlsx`].

use crate::error::Md2OfficeError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A scalar cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl CellValue {
    /// Map a JSON scalar onto a cell value. Nested values are kept as JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => CellValue::Empty,
            Value::Bool(b) => CellValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => CellValue::Integer(i),
                None => n.as_f64().map_or(CellValue::Empty, CellValue::Float),
            },
            Value::String(s) => CellValue::Text(s.clone()),
            other => CellValue::Text(other.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Display length in characters, used for column width inference.
    pub fn char_len(&self) -> usize {
        self.to_string().chars().count()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(x) => write!(f, "{x}"),
            CellValue::Bool(true) => f.write_str("TRUE"),
            CellValue::Bool(false) => f.write_str("FALSE"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

/// Optional lines appended below the data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetMetadata {
    pub summary: Option<String>,
    /// Expected as `YYYY-MM-DDTHH:MM:SSZ`; other values fall back to today.
    pub timestamp: Option<String>,
}

/// Validated spreadsheet request.
#[derive(Debug, Clone, PartialEq)]
pub struct SpreadsheetInput {
    pub title: String,
    pub headers: Vec<CellValue>,
    pub rows: Vec<Vec<CellValue>>,
    pub metadata: Option<SheetMetadata>,
}

impl SpreadsheetInput {
    /// Build an input from string cells; the header row must not be empty.
    pub fn new(
        title: impl Into<String>,
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    ) -> Result<Self, Md2OfficeError> {
        if headers.is_empty() {
            return Err(Md2OfficeError::InvalidHeaders);
        }
        Ok(Self {
            title: title.into(),
            headers: headers.into_iter().map(CellValue::from).collect(),
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(CellValue::from).collect())
                .collect(),
            metadata: None,
        })
    }

    pub fn with_metadata(mut self, metadata: SheetMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Read a `{title, data, metadata?}` payload, where `data[0]` is the
    /// header row and the remaining arrays are data rows.
    pub fn from_json(payload: &Value) -> Result<Self, Md2OfficeError> {
        let obj = payload
            .as_object()
            .ok_or_else(|| Md2OfficeError::InvalidPayload("expected a JSON object".into()))?;

        let missing: Vec<&str> = ["title", "data"]
            .into_iter()
            .filter(|k| !obj.contains_key(*k))
            .collect();
        if !missing.is_empty() {
            return Err(Md2OfficeError::MissingFields {
                fields: missing.join(", "),
            });
        }

        let title = match &obj["title"] {
            Value::String(s) => s.clone(),
            other => CellValue::from_json(other).to_string(),
        };

        let data = match obj["data"].as_array() {
            Some(data) if !data.is_empty() => data,
            _ => return Err(Md2OfficeError::InvalidData),
        };
        let headers = match data[0].as_array() {
            Some(h) if !h.is_empty() => h.iter().map(CellValue::from_json).collect(),
            _ => return Err(Md2OfficeError::InvalidHeaders),
        };
        let rows = data[1..]
            .iter()
            .map(|row| {
                row.as_array()
                    .map(|cells| cells.iter().map(CellValue::from_json).collect())
                    .ok_or(Md2OfficeError::InvalidData)
            })
            .collect::<Result<Vec<Vec<CellValue>>, _>>()?;

        let metadata = obj.get("metadata").and_then(Value::as_object).map(|m| {
            let text = |key: &str| {
                m.get(key).map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
            };
            SheetMetadata {
                summary: text("summary"),
                timestamp: text("timestamp"),
            }
        });

        Ok(Self {
            title,
            headers,
            rows,
            metadata,
        })
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }
}

/// Visual style of one cell. Equal styles share one entry in `styles.xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CellStyle {
    pub bold: bool,
    pub font_size: Option<u32>,
    /// Solid fill colour as `RRGGBB`.
    pub fill: Option<String>,
    /// Thin border on all four sides.
    pub border: bool,
    pub align_center: bool,
    pub wrap: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub style: CellStyle,
}

/// Inclusive 1-based cell range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeRange {
    pub first_row: u32,
    pub first_col: u32,
    pub last_row: u32,
    pub last_col: u32,
}

impl MergeRange {
    pub fn row_span(row: u32, first_col: u32, last_col: u32) -> Self {
        Self {
            first_row: row,
            first_col,
            last_row: row,
            last_col,
        }
    }
}

/// A single styled sheet. Rows and columns are 1-based.
#[derive(Debug, Clone, PartialEq)]
pub struct Worksheet {
    pub name: String,
    pub cells: BTreeMap<(u32, u32), Cell>,
    pub row_heights: BTreeMap<u32, f64>,
    pub column_widths: BTreeMap<u32, f64>,
    pub merges: Vec<MergeRange>,
}

impl Default for Worksheet {
    fn default() -> Self {
        Self {
            name: "Sheet".to_string(),
            cells: BTreeMap::new(),
            row_heights: BTreeMap::new(),
            column_widths: BTreeMap::new(),
            merges: Vec::new(),
        }
    }
}

impl Worksheet {
    pub fn set(&mut self, row: u32, col: u32, value: CellValue, style: CellStyle) {
        self.cells.insert((row, col), Cell { value, style });
    }

    pub fn get(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    /// Highest row holding a cell, 0 for an empty sheet.
    pub fn max_row(&self) -> u32 {
        self.cells.keys().map(|(r, _)| *r).max().unwrap_or(0)
    }

    /// Cells of column `col`, top to bottom.
    pub fn column(&self, col: u32) -> impl Iterator<Item = &Cell> {
        self.cells
            .iter()
            .filter(move |((_, c), _)| *c == col)
            .map(|(_, cell)| cell)
    }
}

/// Excel column letters for a 1-based index: 1 → `A`, 27 → `AA`.
pub fn column_letter(mut col: u32) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = ((col - 1) % 26) as u8;
        letters.push(char::from(b'A' + rem));
        col = (col - 1) / 26;
    }
    letters.iter().rev().collect()
}
