//! Inbound request payloads: `{ "filename": ..., "content": ... }`.

use crate::error::Md2OfficeError;
use serde::{Deserialize, Serialize};

/// Title used when a document request has no `filename`.
pub const DEFAULT_DOC_TITLE: &str = "默认文档";
/// Title used when a spreadsheet request has no `filename`.
pub const DEFAULT_SHEET_TITLE: &str = "未命名表格";

/// Request to render Markdown into a `.docx`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocRequest {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Request to turn the first Markdown table into an `.xlsx`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcelRequest {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// A request that passed validation: a trimmed title and non-empty content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRequest<'a> {
    pub title: String,
    pub content: &'a str,
}

fn validate<'a>(
    filename: Option<&str>,
    content: Option<&'a str>,
    default_title: &str,
) -> Result<ValidRequest<'a>, Md2OfficeError> {
    let content = content.unwrap_or_default();
    if content.is_empty() {
        return Err(Md2OfficeError::EmptyContent);
    }
    Ok(ValidRequest {
        title: filename.unwrap_or(default_title).trim().to_string(),
        content,
    })
}

impl DocRequest {
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
            content: Some(content.into()),
        }
    }

    pub fn validate(&self) -> Result<ValidRequest<'_>, Md2OfficeError> {
        validate(
            self.filename.as_deref(),
            self.content.as_deref(),
            DEFAULT_DOC_TITLE,
        )
    }
}

impl ExcelRequest {
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
            content: Some(content.into()),
        }
    }

    pub fn validate(&self) -> Result<ValidRequest<'_>, Md2OfficeError> {
        validate(
            self.filename.as_deref(),
            self.content.as_deref(),
            DEFAULT_SHEET_TITLE,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_filename_uses_default_title() {
        let req: DocRequest = serde_json::from_str(r##"{"content": "# hi"}"##).unwrap();
        assert_eq!(req.validate().unwrap().title, "默认文档");
        let req: ExcelRequest = serde_json::from_str(r#"{"content": "|a|"}"#).unwrap();
        assert_eq!(req.validate().unwrap().title, "未命名表格");
    }

    #[test]
    fn filename_is_trimmed() {
        let req = DocRequest::new("  Report  ", "text");
        assert_eq!(req.validate().unwrap().title, "Report");
    }

    #[test]
    fn empty_or_missing_content_is_rejected() {
        let missing: DocRequest = serde_json::from_str(r#"{"filename": "x"}"#).unwrap();
        assert!(matches!(missing.validate(), Err(Md2OfficeError::EmptyContent)));
        let empty = ExcelRequest::new("x", "");
        assert!(matches!(empty.validate(), Err(Md2OfficeError::EmptyContent)));
    }
}
