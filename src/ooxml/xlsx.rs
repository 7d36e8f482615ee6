//! `.xlsx` serialisation of a [`Worksheet`].
//!
//! Strings are written inline (`t="inlineStr"`), so there is no shared
//! string table. Cell styles are deduplicated into `cellXfs` records.

use super::{core_props, escape_xml, root_rels, Package, CORE_PROPS_CONTENT_TYPE, RELS_CONTENT_TYPE};
use crate::error::Md2OfficeError;
use crate::workbook::{column_letter, CellStyle, CellValue, Worksheet};
use std::collections::HashMap;
use std::fmt::Write as FmtWrite;
use tracing::debug;

const SHEET_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const DEFAULT_FONT_SIZE: u32 = 11;

/// Serialise `sheet` into an `.xlsx` package.
pub fn write_xlsx(sheet: &Worksheet, title: &str) -> Result<Vec<u8>, Md2OfficeError> {
    let mut styles = StylesBuilder::new();
    let sheet_xml = sheet_xml(sheet, &mut styles)?;

    let mut pkg = Package::default();
    pkg.add("[Content_Types].xml", content_types());
    pkg.add("_rels/.rels", root_rels("xl/workbook.xml"));
    pkg.add("docProps/core.xml", core_props(title));
    pkg.add("xl/workbook.xml", workbook_xml(&sheet.name));
    pkg.add("xl/_rels/workbook.xml.rels", workbook_rels());
    pkg.add("xl/worksheets/sheet1.xml", sheet_xml);
    pkg.add("xl/styles.xml", styles.to_xml()?);
    debug!(
        "Packaging xlsx: {} cells, {} styles, {} merges",
        sheet.cells.len(),
        styles.cell_formats.len(),
        sheet.merges.len()
    );
    pkg.finish()
}

/// Collects unique fonts, fills, borders and cell formats, assigning indices
/// in first-use order.
#[derive(Debug)]
struct StylesBuilder {
    /// (bold, size)
    fonts: Vec<(bool, u32)>,
    /// Solid fill colours; indices 0 and 1 are the reserved `none`/`gray125`.
    fills: Vec<String>,
    /// Cell formats: style → (font, fill, border) ids.
    cell_formats: Vec<CellStyle>,
    cell_format_map: HashMap<CellStyle, usize>,
}

impl StylesBuilder {
    fn new() -> Self {
        let mut builder = Self {
            fonts: vec![(false, DEFAULT_FONT_SIZE)],
            fills: Vec::new(),
            cell_formats: Vec::new(),
            cell_format_map: HashMap::new(),
        };
        // xf 0 is the default format every unstyled cell uses.
        builder.format_id(&CellStyle::default());
        builder
    }

    fn font_id(&mut self, style: &CellStyle) -> usize {
        let key = (style.bold, style.font_size.unwrap_or(DEFAULT_FONT_SIZE));
        match self.fonts.iter().position(|f| *f == key) {
            Some(id) => id,
            None => {
                self.fonts.push(key);
                self.fonts.len() - 1
            }
        }
    }

    fn fill_id(&mut self, style: &CellStyle) -> usize {
        let Some(color) = &style.fill else {
            return 0;
        };
        let id = match self.fills.iter().position(|f| f == color) {
            Some(id) => id,
            None => {
                self.fills.push(color.clone());
                self.fills.len() - 1
            }
        };
        id + 2
    }

    /// Index into `cellXfs` for `style`, registering it on first use.
    fn format_id(&mut self, style: &CellStyle) -> usize {
        if let Some(&id) = self.cell_format_map.get(style) {
            return id;
        }
        self.font_id(style);
        self.fill_id(style);
        let id = self.cell_formats.len();
        self.cell_formats.push(style.clone());
        self.cell_format_map.insert(style.clone(), id);
        id
    }

    fn to_xml(&mut self) -> Result<String, Md2OfficeError> {
        // Resolve ids up front; every font and fill was registered in format_id.
        let formats: Vec<(usize, usize, CellStyle)> = self
            .cell_formats
            .clone()
            .into_iter()
            .map(|s| (self.font_id(&s), self.fill_id(&s), s))
            .collect();

        let mut xml = String::new();
        write!(
            xml,
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="{SHEET_NS}">"#
        )?;

        write!(xml, r#"<fonts count="{}">"#, self.fonts.len())?;
        for (bold, size) in &self.fonts {
            xml.push_str("<font>");
            if *bold {
                xml.push_str("<b/>");
            }
            write!(xml, r#"<sz val="{size}"/><name val="Calibri"/><family val="2"/></font>"#)?;
        }
        xml.push_str("</fonts>");

        write!(xml, r#"<fills count="{}">"#, self.fills.len() + 2)?;
        xml.push_str(r#"<fill><patternFill patternType="none"/></fill>"#);
        xml.push_str(r#"<fill><patternFill patternType="gray125"/></fill>"#);
        for color in &self.fills {
            write!(
                xml,
                r#"<fill><patternFill patternType="solid"><fgColor rgb="FF{0}"/><bgColor rgb="FF{0}"/></patternFill></fill>"#,
                escape_xml(color)
            )?;
        }
        xml.push_str("</fills>");

        xml.push_str(r#"<borders count="2"><border><left/><right/><top/><bottom/><diagonal/></border>"#);
        xml.push_str(r#"<border><left style="thin"><color auto="1"/></left><right style="thin"><color auto="1"/></right><top style="thin"><color auto="1"/></top><bottom style="thin"><color auto="1"/></bottom><diagonal/></border></borders>"#);
        xml.push_str(r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#);

        write!(xml, r#"<cellXfs count="{}">"#, formats.len())?;
        for (font_id, fill_id, style) in &formats {
            let border_id = usize::from(style.border);
            write!(
                xml,
                r#"<xf numFmtId="0" fontId="{font_id}" fillId="{fill_id}" borderId="{border_id}" xfId="0""#
            )?;
            if *font_id != 0 {
                xml.push_str(r#" applyFont="1""#);
            }
            if *fill_id != 0 {
                xml.push_str(r#" applyFill="1""#);
            }
            if style.border {
                xml.push_str(r#" applyBorder="1""#);
            }
            if style.align_center || style.wrap {
                xml.push_str(r#" applyAlignment="1"><alignment"#);
                if style.align_center {
                    xml.push_str(r#" horizontal="center" vertical="center""#);
                }
                if style.wrap {
                    xml.push_str(r#" wrapText="1""#);
                }
                xml.push_str("/></xf>");
            } else {
                xml.push_str("/>");
            }
        }
        xml.push_str("</cellXfs>");
        xml.push_str(r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#);
        xml.push_str("</styleSheet>");
        Ok(xml)
    }
}

fn sheet_xml(sheet: &Worksheet, styles: &mut StylesBuilder) -> Result<String, Md2OfficeError> {
    let mut xml = String::with_capacity(2048);
    write!(
        xml,
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="{SHEET_NS}" xmlns:r="{R_NS}">"#
    )?;

    if !sheet.column_widths.is_empty() {
        xml.push_str("<cols>");
        for (col, width) in &sheet.column_widths {
            write!(
                xml,
                r#"<col min="{col}" max="{col}" width="{width:.2}" customWidth="1"/>"#
            )?;
        }
        xml.push_str("</cols>");
    }

    xml.push_str("<sheetData>");
    let mut current_row: Option<u32> = None;
    for (&(row, col), cell) in &sheet.cells {
        if current_row != Some(row) {
            if current_row.is_some() {
                xml.push_str("</row>");
            }
            write!(xml, r#"<row r="{row}""#)?;
            if let Some(height) = sheet.row_heights.get(&row) {
                write!(xml, r#" ht="{height:.2}" customHeight="1""#)?;
            }
            xml.push('>');
            current_row = Some(row);
        }

        let reference = format!("{}{}", column_letter(col), row);
        let style_id = styles.format_id(&cell.style);
        let s = if style_id == 0 {
            String::new()
        } else {
            format!(r#" s="{style_id}""#)
        };
        match &cell.value {
            CellValue::Empty => write!(xml, r#"<c r="{reference}"{s}/>"#)?,
            CellValue::Text(text) => write!(
                xml,
                r#"<c r="{reference}"{s} t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                escape_xml(text)
            )?,
            CellValue::Integer(i) => write!(xml, r#"<c r="{reference}"{s}><v>{i}</v></c>"#)?,
            CellValue::Float(x) => write!(xml, r#"<c r="{reference}"{s}><v>{x}</v></c>"#)?,
            CellValue::Bool(b) => write!(
                xml,
                r#"<c r="{reference}"{s} t="b"><v>{}</v></c>"#,
                u8::from(*b)
            )?,
        }
    }
    if current_row.is_some() {
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData>");

    if !sheet.merges.is_empty() {
        write!(xml, r#"<mergeCells count="{}">"#, sheet.merges.len())?;
        for m in &sheet.merges {
            write!(
                xml,
                r#"<mergeCell ref="{}{}:{}{}"/>"#,
                column_letter(m.first_col),
                m.first_row,
                column_letter(m.last_col),
                m.last_row
            )?;
        }
        xml.push_str("</mergeCells>");
    }
    xml.push_str("</worksheet>");
    Ok(xml)
}

fn workbook_xml(sheet_name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="{SHEET_NS}" xmlns:r="{R_NS}"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        escape_xml(sheet_name)
    )
}

fn workbook_rels() -> String {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#
        .to_string()
}

fn content_types() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="{RELS_CONTENT_TYPE}"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/><Override PartName="/docProps/core.xml" ContentType="{CORE_PROPS_CONTENT_TYPE}"/></Types>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::MergeRange;
    use std::io::{Cursor, Read};

    fn part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut out = String::new();
        archive
            .by_name(name)
            .unwrap()
            .read_to_string(&mut out)
            .unwrap();
        out
    }

    fn bold_blue() -> CellStyle {
        CellStyle {
            bold: true,
            font_size: Some(11),
            fill: Some("E6F3FF".into()),
            border: true,
            align_center: true,
            wrap: true,
        }
    }

    #[test]
    fn equal_styles_share_one_format() {
        let mut styles = StylesBuilder::new();
        let a = styles.format_id(&bold_blue());
        let b = styles.format_id(&bold_blue());
        assert_eq!(a, b);
        assert_eq!(a, 1);
        assert_eq!(styles.format_id(&CellStyle::default()), 0);
        let xml = styles.to_xml().unwrap();
        assert!(xml.contains(r#"<cellXfs count="2">"#));
        assert!(xml.contains(r#"<fgColor rgb="FFE6F3FF"/>"#));
        assert!(xml.contains(r#"fillId="2" borderId="1""#));
    }

    #[test]
    fn cells_rows_and_merges_are_written() {
        let mut ws = Worksheet::default();
        ws.set(1, 1, "Title & Co".into(), bold_blue());
        ws.set(2, 1, CellValue::Integer(42), CellStyle::default());
        ws.set(2, 2, CellValue::Bool(true), CellStyle::default());
        ws.row_heights.insert(1, 25.0);
        ws.column_widths.insert(1, 13.2);
        ws.merges.push(MergeRange::row_span(1, 1, 2));

        let bytes = write_xlsx(&ws, "t").unwrap();
        let xml = part(&bytes, "xl/worksheets/sheet1.xml");
        assert!(xml.contains(r#"<row r="1" ht="25.00" customHeight="1">"#));
        assert!(xml.contains(r#"<c r="A1" s="1" t="inlineStr"><is><t xml:space="preserve">Title &amp; Co</t></is></c>"#));
        assert!(xml.contains(r#"<c r="A2"><v>42</v></c>"#));
        assert!(xml.contains(r#"<c r="B2" t="b"><v>1</v></c>"#));
        assert!(xml.contains(r#"<col min="1" max="1" width="13.20" customWidth="1"/>"#));
        assert!(xml.contains(r#"<mergeCell ref="A1:B1"/>"#));
        assert_eq!(xml.matches("<row ").count(), 2);

        let workbook = part(&bytes, "xl/workbook.xml");
        assert!(workbook.contains(r#"<sheet name="Sheet""#));
    }

    #[test]
    fn same_sheet_same_bytes() {
        let mut ws = Worksheet::default();
        ws.set(1, 1, "x".into(), bold_blue());
        assert_eq!(write_xlsx(&ws, "t").unwrap(), write_xlsx(&ws, "t").unwrap());
    }
}
