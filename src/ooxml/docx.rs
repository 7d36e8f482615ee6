//! `.docx` serialisation of a [`RenderedDocument`].

use super::{core_props, escape_xml, root_rels, Package, RELS_CONTENT_TYPE, CORE_PROPS_CONTENT_TYPE};
use crate::config::ConversionConfig;
use crate::document::{
    Alignment, Block, EmbeddedImage, ImageLayout, Inline, LineSpacing, ListMarker, Paragraph,
    ParagraphStyle, RenderedDocument, Run, Table,
};
use crate::error::Md2OfficeError;
use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;
use tracing::debug;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const WP_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const REL_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_NUMBERING: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering";
const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

/// Abstract numbering definitions in `numbering.xml`.
const BULLET_ABSTRACT: u32 = 0;
const DECIMAL_ABSTRACT: u32 = 1;

fn cm_to_twips(cm: f64) -> i64 {
    (cm * 1440.0 / 2.54).round() as i64
}

fn cm_to_emu(cm: f64) -> i64 {
    (cm * 360_000.0).round() as i64
}

fn pt_to_twips(pt: f32) -> i64 {
    (f64::from(pt) * 20.0).round() as i64
}

fn pt_to_half_points(pt: f32) -> i64 {
    (f64::from(pt) * 2.0).round() as i64
}

/// Serialise `doc` into a `.docx` package.
pub fn write_docx(
    doc: &RenderedDocument,
    config: &ConversionConfig,
    title: &str,
) -> Result<Vec<u8>, Md2OfficeError> {
    let mut writer = DocxWriter::new(config);
    let body = writer.body(doc)?;

    let mut pkg = Package::default();
    pkg.add("[Content_Types].xml", content_types(!writer.media.is_empty()));
    pkg.add("_rels/.rels", root_rels("word/document.xml"));
    pkg.add("docProps/core.xml", core_props(title));
    pkg.add("word/document.xml", body);
    pkg.add("word/styles.xml", styles_xml(config)?);
    pkg.add("word/numbering.xml", writer.numbering_xml()?);
    pkg.add("word/_rels/document.xml.rels", writer.document_rels()?);
    for (i, data) in writer.media.iter().enumerate() {
        pkg.add(format!("word/media/image{}.jpeg", i + 1), data.clone());
    }
    debug!(
        "Packaging docx: {} blocks, {} images, {} lists",
        doc.blocks.len(),
        writer.media.len(),
        writer.lists.len()
    );
    pkg.finish()
}

struct DocxWriter<'a> {
    config: &'a ConversionConfig,
    /// JPEG bytes in embedding order; `image{n}.jpeg` is `media[n-1]`.
    media: Vec<Vec<u8>>,
    /// List instance → its marker. Each instance becomes one `w:num`.
    lists: BTreeMap<u32, ListMarker>,
}

impl<'a> DocxWriter<'a> {
    fn new(config: &'a ConversionConfig) -> Self {
        Self {
            config,
            media: Vec::new(),
            lists: BTreeMap::new(),
        }
    }

    fn body(&mut self, doc: &RenderedDocument) -> Result<String, Md2OfficeError> {
        let mut xml = String::with_capacity(4096);
        write!(
            xml,
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{W_NS}" xmlns:r="{R_NS}" xmlns:wp="{WP_NS}"><w:body>"#
        )?;
        for block in &doc.blocks {
            match block {
                Block::Paragraph(p) => self.paragraph(&mut xml, p)?,
                Block::Table(t) => self.table(&mut xml, t)?,
            }
        }
        self.section(&mut xml)?;
        xml.push_str("</w:body></w:document>");
        Ok(xml)
    }

    fn section(&self, xml: &mut String) -> Result<(), Md2OfficeError> {
        let page = &self.config.page;
        write!(
            xml,
            r#"<w:sectPr><w:pgSz w:w="{}" w:h="{}"/><w:pgMar w:top="{}" w:right="{}" w:bottom="{}" w:left="{}" w:header="851" w:footer="992" w:gutter="0"/></w:sectPr>"#,
            cm_to_twips(page.width_cm),
            cm_to_twips(page.height_cm),
            cm_to_twips(page.margin_top_cm),
            cm_to_twips(page.margin_right_cm),
            cm_to_twips(page.margin_bottom_cm),
            cm_to_twips(page.margin_left_cm),
        )?;
        Ok(())
    }

    fn paragraph(&mut self, xml: &mut String, p: &Paragraph) -> Result<(), Md2OfficeError> {
        xml.push_str("<w:p><w:pPr>");
        write!(xml, r#"<w:pStyle w:val="{}"/>"#, p.style.style_id())?;

        if let Some(marker) = p.list {
            self.lists.insert(marker.instance, marker);
            write!(
                xml,
                r#"<w:numPr><w:ilvl w:val="{}"/><w:numId w:val="{}"/></w:numPr>"#,
                marker.level.min(8),
                marker.instance
            )?;
        }

        let f = &p.format;
        if f.space_before_pt.is_some() || f.space_after_pt.is_some() || f.line_spacing.is_some() {
            xml.push_str("<w:spacing");
            if let Some(pt) = f.space_before_pt {
                write!(xml, r#" w:before="{}""#, pt_to_twips(pt))?;
            }
            if let Some(pt) = f.space_after_pt {
                write!(xml, r#" w:after="{}""#, pt_to_twips(pt))?;
            }
            match f.line_spacing {
                Some(LineSpacing::Exact(pt)) => {
                    write!(xml, r#" w:line="{}" w:lineRule="exact""#, pt_to_twips(pt))?
                }
                Some(LineSpacing::Single) => xml.push_str(r#" w:line="240" w:lineRule="auto""#),
                None => {}
            }
            xml.push_str("/>");
        }

        if f.left_indent_cm.is_some() || f.first_line_indent_cm.is_some() {
            xml.push_str("<w:ind");
            if let Some(cm) = f.left_indent_cm {
                write!(xml, r#" w:left="{}""#, cm_to_twips(f64::from(cm)))?;
            }
            if let Some(cm) = f.first_line_indent_cm {
                write!(xml, r#" w:firstLine="{}""#, cm_to_twips(f64::from(cm)))?;
            }
            xml.push_str("/>");
        }

        if let Some(Alignment::Center) = f.alignment {
            xml.push_str(r#"<w:jc w:val="center"/>"#);
        }
        xml.push_str("</w:pPr>");

        for inline in &p.content {
            match inline {
                Inline::Run(run) => write_run(xml, run)?,
                Inline::LineBreak => xml.push_str("<w:r><w:br/></w:r>"),
                Inline::Image(img) => self.image(xml, img)?,
            }
        }
        xml.push_str("</w:p>");
        Ok(())
    }

    fn image(&mut self, xml: &mut String, img: &EmbeddedImage) -> Result<(), Md2OfficeError> {
        self.media.push(img.data.clone());
        let n = self.media.len();
        let r_id = image_rel_id(n);
        let cx = cm_to_emu(img.width_cm);
        let cy = cm_to_emu(img.height_cm);
        let desc = escape_xml(&img.description);

        xml.push_str("<w:r><w:drawing>");
        match img.layout {
            ImageLayout::TopAndBottom => write!(
                xml,
                r#"<wp:anchor distT="0" distB="0" distL="114300" distR="114300" simplePos="0" relativeHeight="{n}" behindDoc="0" locked="0" layoutInCell="1" allowOverlap="1"><wp:simplePos x="0" y="0"/><wp:positionH relativeFrom="column"><wp:align>center</wp:align></wp:positionH><wp:positionV relativeFrom="paragraph"><wp:posOffset>0</wp:posOffset></wp:positionV><wp:extent cx="{cx}" cy="{cy}"/><wp:effectExtent l="0" t="0" r="0" b="0"/><wp:wrapTopAndBottom/><wp:docPr id="{n}" name="Picture {n}" descr="{desc}"/><wp:cNvGraphicFramePr><a:graphicFrameLocks xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" noChangeAspect="1"/></wp:cNvGraphicFramePr><a:graphic xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture"><pic:pic xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture"><pic:nvPicPr><pic:cNvPr id="{n}" name="image{n}.jpeg" descr="{desc}"/><pic:cNvPicPr/></pic:nvPicPr><pic:blipFill><a:blip r:embed="{r_id}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill><pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr></pic:pic></a:graphicData></a:graphic></wp:anchor>"#
            )?,
        }
        xml.push_str("</w:drawing></w:r>");
        Ok(())
    }

    fn table(&mut self, xml: &mut String, table: &Table) -> Result<(), Md2OfficeError> {
        let text_width = cm_to_twips(self.config.page.text_width_cm());
        let col_width = text_width / table.cols.max(1) as i64;

        xml.push_str("<w:tbl><w:tblPr>");
        xml.push_str(r#"<w:tblStyle w:val="TableGrid"/>"#);
        write!(xml, r#"<w:tblW w:w="{text_width}" w:type="dxa"/>"#)?;
        xml.push_str(r#"<w:jc w:val="center"/>"#);
        xml.push_str("<w:tblBorders>");
        for side in ["top", "left", "bottom", "right"] {
            write!(
                xml,
                r#"<w:{side} w:val="single" w:sz="8" w:space="0" w:color="000000"/>"#
            )?;
        }
        for side in ["insideH", "insideV"] {
            write!(
                xml,
                r#"<w:{side} w:val="single" w:sz="4" w:space="0" w:color="000000"/>"#
            )?;
        }
        xml.push_str("</w:tblBorders>");
        xml.push_str(r#"<w:tblLayout w:type="fixed"/>"#);
        xml.push_str("</w:tblPr><w:tblGrid>");
        for _ in 0..table.cols {
            write!(xml, r#"<w:gridCol w:w="{col_width}"/>"#)?;
        }
        xml.push_str("</w:tblGrid>");

        for row in &table.rows {
            xml.push_str("<w:tr>");
            for cell in row {
                write!(
                    xml,
                    r#"<w:tc><w:tcPr><w:tcW w:w="{col_width}" w:type="dxa"/><w:vAlign w:val="center"/></w:tcPr>"#
                )?;
                if cell.paragraphs.is_empty() {
                    // A cell must contain at least one paragraph.
                    xml.push_str("<w:p/>");
                }
                for p in &cell.paragraphs {
                    self.paragraph(xml, p)?;
                }
                xml.push_str("</w:tc>");
            }
            xml.push_str("</w:tr>");
        }
        xml.push_str("</w:tbl>");
        // Two adjacent tables would merge without a paragraph between them.
        xml.push_str("<w:p/>");
        Ok(())
    }

    fn numbering_xml(&self) -> Result<String, Md2OfficeError> {
        let mut xml = String::new();
        write!(
            xml,
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:numbering xmlns:w="{W_NS}">"#
        )?;
        for (id, ordered) in [(BULLET_ABSTRACT, false), (DECIMAL_ABSTRACT, true)] {
            write!(
                xml,
                r#"<w:abstractNum w:abstractNumId="{id}"><w:multiLevelType w:val="hybridMultilevel"/>"#
            )?;
            for lvl in 0..9u32 {
                let indent = 420 * (lvl + 1);
                let (fmt, text) = if ordered {
                    ("decimal", format!("%{}.", lvl + 1))
                } else {
                    ("bullet", ["•", "◦", "▪"][(lvl % 3) as usize].to_string())
                };
                write!(
                    xml,
                    r#"<w:lvl w:ilvl="{lvl}"><w:start w:val="1"/><w:numFmt w:val="{fmt}"/><w:lvlText w:val="{text}"/><w:lvlJc w:val="left"/><w:pPr><w:ind w:left="{indent}" w:hanging="420"/></w:pPr></w:lvl>"#
                )?;
            }
            xml.push_str("</w:abstractNum>");
        }
        for (instance, marker) in &self.lists {
            let abstract_id = if marker.ordered {
                DECIMAL_ABSTRACT
            } else {
                BULLET_ABSTRACT
            };
            write!(
                xml,
                r#"<w:num w:numId="{instance}"><w:abstractNumId w:val="{abstract_id}"/>"#
            )?;
            if marker.ordered {
                // Restart numbering for every ordered list, at its own level.
                write!(
                    xml,
                    r#"<w:lvlOverride w:ilvl="{}"><w:startOverride w:val="{}"/></w:lvlOverride>"#,
                    marker.level.min(8),
                    marker.start
                )?;
            }
            xml.push_str("</w:num>");
        }
        xml.push_str("</w:numbering>");
        Ok(xml)
    }

    fn document_rels(&self) -> Result<String, Md2OfficeError> {
        let mut xml = String::new();
        write!(
            xml,
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_STYLES}" Target="styles.xml"/><Relationship Id="rId2" Type="{REL_NUMBERING}" Target="numbering.xml"/>"#
        )?;
        for n in 1..=self.media.len() {
            write!(
                xml,
                r#"<Relationship Id="{}" Type="{REL_IMAGE}" Target="media/image{n}.jpeg"/>"#,
                image_rel_id(n)
            )?;
        }
        xml.push_str("</Relationships>");
        Ok(xml)
    }
}

fn image_rel_id(n: usize) -> String {
    format!("rId{}", n + 2)
}

fn write_run(xml: &mut String, run: &Run) -> Result<(), Md2OfficeError> {
    xml.push_str("<w:r><w:rPr>");
    if let Some(font) = &run.font {
        let ascii = escape_xml(&font.ascii);
        let east = escape_xml(&font.east_asia);
        write!(
            xml,
            r#"<w:rFonts w:ascii="{ascii}" w:hAnsi="{ascii}" w:eastAsia="{east}" w:cs="{ascii}"/>"#
        )?;
    }
    if run.bold {
        xml.push_str("<w:b/><w:bCs/>");
    }
    if run.italic {
        xml.push_str("<w:i/><w:iCs/>");
    }
    if let Some(pt) = run.size_pt {
        let half = pt_to_half_points(pt);
        write!(xml, r#"<w:sz w:val="{half}"/><w:szCs w:val="{half}"/>"#)?;
    }
    write!(
        xml,
        r#"</w:rPr><w:t xml:space="preserve">{}</w:t></w:r>"#,
        escape_xml(&run.text)
    )?;
    Ok(())
}

fn content_types(has_media: bool) -> String {
    let jpeg = if has_media {
        r#"<Default Extension="jpeg" ContentType="image/jpeg"/>"#
    } else {
        ""
    };
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="{RELS_CONTENT_TYPE}"/><Default Extension="xml" ContentType="application/xml"/>{jpeg}<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/><Override PartName="/word/numbering.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml"/><Override PartName="/docProps/core.xml" ContentType="{CORE_PROPS_CONTENT_TYPE}"/></Types>"#
    )
}

/// `styles.xml`: document defaults plus every [`ParagraphStyle`] and `TableGrid`.
fn styles_xml(config: &ConversionConfig) -> Result<String, Md2OfficeError> {
    let fonts = &config.fonts;
    let latin = escape_xml(&fonts.latin);
    let east = escape_xml(&fonts.east_asian);
    let mono = escape_xml(&fonts.monospace);
    let body_sz = pt_to_half_points(config.body_size_pt);

    let mut xml = String::new();
    write!(
        xml,
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="{W_NS}"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="{latin}" w:hAnsi="{latin}" w:eastAsia="{east}" w:cs="{latin}"/><w:sz w:val="{body_sz}"/><w:szCs w:val="{body_sz}"/><w:lang w:val="en-US" w:eastAsia="zh-CN"/></w:rPr></w:rPrDefault><w:pPrDefault/></w:docDefaults>"#
    )?;

    // Body spacing and indent live on Normal so list and placeholder
    // paragraphs pick them up; headings and code reset the indent.
    write!(
        xml,
        r#"<w:style w:type="paragraph" w:default="1" w:styleId="{}"><w:name w:val="Normal"/><w:qFormat/><w:pPr><w:spacing w:line="{line}" w:lineRule="exact"/><w:ind w:firstLine="{indent}"/><w:jc w:val="both"/></w:pPr></w:style>"#,
        ParagraphStyle::Normal.style_id(),
        line = pt_to_twips(config.line_spacing_pt),
        indent = cm_to_twips(f64::from(config.first_line_indent_cm)),
    )?;

    for level in 1..=6u8 {
        let sz = pt_to_half_points(config.heading_size_pt(level));
        write!(
            xml,
            r#"<w:style w:type="paragraph" w:styleId="{id}"><w:name w:val="heading {level}"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:keepNext/><w:spacing w:before="{before}" w:after="{after}"/><w:ind w:firstLine="0"/><w:jc w:val="left"/><w:outlineLvl w:val="{outline}"/></w:pPr><w:rPr><w:b/><w:bCs/><w:sz w:val="{sz}"/><w:szCs w:val="{sz}"/></w:rPr></w:style>"#,
            id = ParagraphStyle::Heading(level).style_id(),
            before = pt_to_twips(config.heading_space_before_pt),
            after = pt_to_twips(config.heading_space_after_pt),
            outline = level - 1,
        )?;
    }

    write!(
        xml,
        r#"<w:style w:type="paragraph" w:styleId="{}"><w:name w:val="No Spacing"/><w:basedOn w:val="Normal"/><w:qFormat/><w:pPr><w:spacing w:before="0" w:after="0" w:line="240" w:lineRule="auto"/><w:ind w:firstLine="0"/><w:jc w:val="left"/></w:pPr><w:rPr><w:rFonts w:ascii="{mono}" w:hAnsi="{mono}" w:cs="{mono}"/></w:rPr></w:style>"#,
        ParagraphStyle::NoSpacing.style_id()
    )?;

    for (style, name) in [
        (ParagraphStyle::ListBullet, "List Bullet"),
        (ParagraphStyle::ListNumber, "List Number"),
    ] {
        write!(
            xml,
            r#"<w:style w:type="paragraph" w:styleId="{}"><w:name w:val="{name}"/><w:basedOn w:val="Normal"/><w:pPr><w:jc w:val="left"/></w:pPr></w:style>"#,
            style.style_id()
        )?;
    }

    xml.push_str(r#"<w:style w:type="table" w:styleId="TableGrid"><w:name w:val="Table Grid"/><w:tblPr><w:tblBorders><w:top w:val="single" w:sz="4" w:space="0" w:color="000000"/><w:left w:val="single" w:sz="4" w:space="0" w:color="000000"/><w:bottom w:val="single" w:sz="4" w:space="0" w:color="000000"/><w:right w:val="single" w:sz="4" w:space="0" w:color="000000"/><w:insideH w:val="single" w:sz="4" w:space="0" w:color="000000"/><w:insideV w:val="single" w:sz="4" w:space="0" w:color="000000"/></w:tblBorders></w:tblPr></w:style>"#);
    xml.push_str("</w:styles>");
    Ok(xml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{FontFamily, TableCell};
    use std::io::{Cursor, Read};

    fn part(bytes: &[u8], name: &str) -> Option<String> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).ok()?;
        let mut out = String::new();
        file.read_to_string(&mut out).unwrap();
        Some(out)
    }

    fn para(text: &str) -> Paragraph {
        let mut p = Paragraph::new(ParagraphStyle::Normal);
        p.push_run(Run::new(text));
        p
    }

    #[test]
    fn unit_conversions() {
        assert_eq!(cm_to_twips(2.54), 1440);
        assert_eq!(cm_to_emu(1.0), 360_000);
        assert_eq!(pt_to_twips(25.0), 500);
        assert_eq!(pt_to_half_points(10.5), 21);
    }

    #[test]
    fn text_is_escaped_and_whitespace_preserved() {
        let mut doc = RenderedDocument::default();
        doc.push_paragraph(para("  a < b & c"));
        let bytes = write_docx(&doc, &ConversionConfig::default(), "t").unwrap();
        let body = part(&bytes, "word/document.xml").unwrap();
        assert!(body.contains(r#"<w:t xml:space="preserve">  a &lt; b &amp; c</w:t>"#));
    }

    #[test]
    fn run_fonts_cover_both_scripts() {
        let mut run = Run::new("中文 text");
        run.font = Some(FontFamily {
            ascii: "Times New Roman".into(),
            east_asia: "宋体".into(),
        });
        run.bold = true;
        run.size_pt = Some(16.0);
        let mut xml = String::new();
        write_run(&mut xml, &run).unwrap();
        assert!(xml.contains(r#"w:ascii="Times New Roman""#));
        assert!(xml.contains(r#"w:eastAsia="宋体""#));
        assert!(xml.contains("<w:b/>"));
        assert!(xml.contains(r#"<w:sz w:val="32"/>"#));
    }

    #[test]
    fn page_is_a4_with_configured_margins() {
        let bytes = write_docx(&RenderedDocument::default(), &ConversionConfig::default(), "t")
            .unwrap();
        let body = part(&bytes, "word/document.xml").unwrap();
        assert!(body.contains(r#"<w:pgSz w:w="11906" w:h="16838"/>"#), "{body}");
        assert!(body.contains(r#"w:top="2098""#));
    }

    #[test]
    fn empty_table_cells_get_a_paragraph() {
        let mut table = Table::new(1, 2);
        table.rows[0][0] = TableCell {
            paragraphs: vec![para("x")],
        };
        let mut doc = RenderedDocument::default();
        doc.push_table(table);
        let bytes = write_docx(&doc, &ConversionConfig::default(), "t").unwrap();
        let body = part(&bytes, "word/document.xml").unwrap();
        assert_eq!(body.matches("<w:tc>").count(), 2);
        assert_eq!(body.matches("<w:gridCol ").count(), 2);
        assert!(body.contains("<w:tcPr><w:tcW w:w=\"4365\" w:type=\"dxa\"/><w:vAlign w:val=\"center\"/></w:tcPr><w:p/></w:tc>"));
    }

    #[test]
    fn each_list_gets_its_own_numbering_instance() {
        let mut doc = RenderedDocument::default();
        for (instance, ordered) in [(1, true), (2, false), (3, true)] {
            let mut p = para("item");
            p.style = if ordered {
                ParagraphStyle::ListNumber
            } else {
                ParagraphStyle::ListBullet
            };
            p.list = Some(ListMarker {
                ordered,
                level: 0,
                instance,
                start: 1,
            });
            doc.push_paragraph(p);
        }
        let bytes = write_docx(&doc, &ConversionConfig::default(), "t").unwrap();
        let numbering = part(&bytes, "word/numbering.xml").unwrap();
        assert_eq!(numbering.matches("<w:num ").count(), 3);
        assert_eq!(numbering.matches("<w:startOverride").count(), 2);
        assert!(numbering.contains(r#"<w:num w:numId="2"><w:abstractNumId w:val="0"/></w:num>"#));
    }

    #[test]
    fn ordered_list_start_is_kept_at_its_level() {
        let mut doc = RenderedDocument::default();
        for (instance, level, start) in [(1, 0, 3), (2, 1, 1)] {
            let mut p = para("item");
            p.style = ParagraphStyle::ListNumber;
            p.list = Some(ListMarker {
                ordered: true,
                level,
                instance,
                start,
            });
            doc.push_paragraph(p);
        }
        let bytes = write_docx(&doc, &ConversionConfig::default(), "t").unwrap();
        let numbering = part(&bytes, "word/numbering.xml").unwrap();
        assert!(numbering.contains(
            r#"<w:num w:numId="1"><w:abstractNumId w:val="1"/><w:lvlOverride w:ilvl="0"><w:startOverride w:val="3"/></w:lvlOverride></w:num>"#
        ));
        assert!(numbering.contains(
            r#"<w:num w:numId="2"><w:abstractNumId w:val="1"/><w:lvlOverride w:ilvl="1"><w:startOverride w:val="1"/></w:lvlOverride></w:num>"#
        ));
    }

    #[test]
    fn images_are_stored_and_related() {
        let mut p = Paragraph::new(ParagraphStyle::Normal);
        p.content.push(Inline::Image(EmbeddedImage {
            data: vec![0xFF, 0xD8, 0xFF, 0xD9],
            width_cm: 13.5,
            height_cm: 6.75,
            description: "chart \"A\"".into(),
            layout: ImageLayout::TopAndBottom,
        }));
        let mut doc = RenderedDocument::default();
        doc.push_paragraph(p);
        let bytes = write_docx(&doc, &ConversionConfig::default(), "t").unwrap();

        let body = part(&bytes, "word/document.xml").unwrap();
        assert!(body.contains("<wp:wrapTopAndBottom/>"));
        assert!(body.contains(r#"<wp:extent cx="4860000" cy="2430000"/>"#));
        assert!(body.contains(r#"r:embed="rId3""#));
        assert!(body.contains("chart &quot;A&quot;"));
        let rels = part(&bytes, "word/_rels/document.xml.rels").unwrap();
        assert!(rels.contains(r#"Id="rId3""#) && rels.contains("media/image1.jpeg"));
        assert!(part(&bytes, "[Content_Types].xml").unwrap().contains("image/jpeg"));

        let mut archive = zip::ZipArchive::new(Cursor::new(&bytes)).unwrap();
        let mut media = Vec::new();
        archive
            .by_name("word/media/image1.jpeg")
            .unwrap()
            .read_to_end(&mut media)
            .unwrap();
        assert_eq!(media, vec![0xFF, 0xD8, 0xFF, 0xD9]);
    }

    #[test]
    fn styles_define_every_paragraph_style() {
        let styles = styles_xml(&ConversionConfig::default()).unwrap();
        for id in ["Normal", "Heading1", "Heading3", "NoSpacing", "ListBullet", "ListNumber", "TableGrid"] {
            assert!(styles.contains(&format!(r#"w:styleId="{id}""#)), "missing {id}");
        }
    }

    #[test]
    fn normal_style_carries_body_spacing_and_indent() {
        let styles = styles_xml(&ConversionConfig::default()).unwrap();
        let start = styles.find(r#"w:styleId="Normal""#).unwrap();
        let normal = &styles[start..start + styles[start..].find("</w:style>").unwrap()];
        assert!(normal.contains(r#"<w:spacing w:line="500" w:lineRule="exact"/>"#), "{normal}");
        assert!(normal.contains(r#"<w:ind w:firstLine="420"/>"#));

        let start = styles.find(r#"w:styleId="Heading1""#).unwrap();
        let heading = &styles[start..start + styles[start..].find("</w:style>").unwrap()];
        assert!(heading.contains(r#"<w:ind w:firstLine="0"/>"#));
    }

    #[test]
    fn same_document_same_bytes() {
        let mut doc = RenderedDocument::default();
        doc.push_paragraph(para("stable"));
        let config = ConversionConfig::default();
        assert_eq!(
            write_docx(&doc, &config, "t").unwrap(),
            write_docx(&doc, &config, "t").unwrap()
        );
    }
}
