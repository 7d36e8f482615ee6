//! Office Open XML packaging for the two output formats.
//!
//! Both writers build their XML parts as strings with `write!` and store them
//! in a deflated zip archive. Only the parts Word and Excel need to open the
//! file are emitted.

pub mod docx;
pub mod xlsx;

use crate::error::Md2OfficeError;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub(crate) const RELS_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-package.relationships+xml";
pub(crate) const CORE_PROPS_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-package.core-properties+xml";
pub(crate) const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub(crate) const REL_CORE_PROPS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";

/// Escape XML special characters.
///
/// Characters XML 1.0 cannot carry at all (C0 controls other than tab, line
/// feed and carriage return, plus U+FFFE and U+FFFF) become U+FFFD; Word and
/// Excel reject a part that contains them.
pub(crate) fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            '\u{0}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}' => out.push(char::REPLACEMENT_CHARACTER),
            _ => out.push(c),
        }
    }
    out
}

/// Accumulates named parts and writes them into a zip archive.
///
/// Parts are written in insertion order, so identical input yields identical
/// bytes.
#[derive(Default)]
pub(crate) struct Package {
    parts: Vec<(String, Vec<u8>)>,
}

impl Package {
    pub fn add(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.parts.push((name.into(), data.into()));
    }

    pub fn finish(self) -> Result<Vec<u8>, Md2OfficeError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        // A fixed timestamp keeps the archive reproducible.
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());
        for (name, data) in &self.parts {
            writer.start_file(name.as_str(), options)?;
            writer
                .write_all(data)
                .map_err(|e| Md2OfficeError::Package(format!("writing {name}: {e}")))?;
        }
        Ok(writer.finish()?.into_inner())
    }
}

/// `_rels/.rels` pointing at the main part and the core properties.
pub(crate) fn root_rels(main_part: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_OFFICE_DOCUMENT}" Target="{main_part}"/><Relationship Id="rId2" Type="{REL_CORE_PROPS}" Target="docProps/core.xml"/></Relationships>"#
    )
}

/// `docProps/core.xml` carrying the title.
pub(crate) fn core_props(title: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>{}</dc:title><dc:creator>md2office</dc:creator></cp:coreProperties>"#,
        escape_xml(title)
    )
}
