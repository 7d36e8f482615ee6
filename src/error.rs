//! Error types for the md2office library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Md2OfficeError`] — **Fatal**: the request cannot be served at all
//!   (empty content, malformed spreadsheet payload, no table, upload
//!   failure). Returned as `Err(Md2OfficeError)` from the `convert` entry
//!   points.
//!
//! * [`ImageFailure`] — **Non-fatal**: one image could not be fetched or
//!   decoded. The renderer turns it into a visible placeholder paragraph and
//!   carries on with the rest of the document.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the md2office library.
///
/// Image-level failures use [`ImageFailure`] and are rendered inline rather
/// than propagated here.
#[derive(Debug, Error)]
pub enum Md2OfficeError {
    // ── Request validation ────────────────────────────────────────────────
    /// The request carried no Markdown content.
    #[error("内容不能为空 (content must not be empty)")]
    EmptyContent,

    /// The request body could not be decoded.
    #[error("Invalid request payload: {0}")]
    InvalidPayload(String),

    /// A spreadsheet payload lacks `title` or `data`.
    #[error("Missing required fields in JSON data: {fields}")]
    MissingFields { fields: String },

    /// `data` is not an array, or is empty.
    #[error("Data must be a non-empty array")]
    InvalidData,

    /// `data[0]` (the header row) is not an array, or is empty.
    #[error("Headers must be a non-empty array")]
    InvalidHeaders,

    /// The Markdown contains no table to turn into a spreadsheet.
    #[error("未找到表格内容 (no table found in content)")]
    NoTableFound,

    /// A table was found but neither its header nor its body had cells.
    #[error("表格为空 (table is empty)")]
    EmptyTable,

    // ── Storage errors ────────────────────────────────────────────────────
    /// The object store rejected or could not receive the artifact.
    #[error("文件上传失败: could not upload '{key}': {reason}")]
    UploadFailed { key: String, reason: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// The temporary artifact could not be created or written.
    #[error("Failed to stage temporary file: {0}")]
    TempFile(#[source] std::io::Error),

    /// Could not write the artifact to the requested local path.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Building the OOXML zip package failed.
    #[error("Failed to build document package: {0}")]
    Package(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Md2OfficeError {
    /// Whether the error was caused by the caller's input (a 4xx-style
    /// failure) rather than by this service or its collaborators.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Md2OfficeError::EmptyContent
                | Md2OfficeError::InvalidPayload(_)
                | Md2OfficeError::MissingFields { .. }
                | Md2OfficeError::InvalidData
                | Md2OfficeError::InvalidHeaders
                | Md2OfficeError::NoTableFound
                | Md2OfficeError::EmptyTable
        )
    }
}

impl From<zip::result::ZipError> for Md2OfficeError {
    fn from(e: zip::result::ZipError) -> Self {
        Md2OfficeError::Package(e.to_string())
    }
}

impl From<std::fmt::Error> for Md2OfficeError {
    fn from(e: std::fmt::Error) -> Self {
        Md2OfficeError::Package(format!("XML formatting failed: {e}"))
    }
}

/// A non-fatal failure resolving one image.
///
/// Its `Display` output is the placeholder text written into the document
/// in place of the picture.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ImageFailure {
    /// The fetch did not finish within the configured timeout.
    #[error("[图片下载超时: {url}]")]
    Timeout { url: String, secs: u64 },

    /// The server answered with a non-success status.
    #[error("[图片下载失败 (HTTP {status}): {url}]")]
    Http { url: String, status: u16 },

    /// The request failed before a response arrived (DNS, TLS, reset, ...).
    #[error("[图片下载失败: {url}]")]
    Fetch { url: String, reason: String },

    /// The bytes could not be decoded as an image.
    #[error("[图片格式无效: {url}]")]
    Decode { url: String, reason: String },

    /// The decoded image could not be re-encoded for embedding.
    #[error("[图片处理失败: {url}]")]
    Encode { url: String, reason: String },
}

impl ImageFailure {
    /// The URL the failure refers to.
    pub fn url(&self) -> &str {
        match self {
            ImageFailure::Timeout { url, .. }
            | ImageFailure::Http { url, .. }
            | ImageFailure::Fetch { url, .. }
            | ImageFailure::Decode { url, .. }
            | ImageFailure::Encode { url, .. } => url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_classified() {
        assert!(Md2OfficeError::EmptyContent.is_validation());
        assert!(Md2OfficeError::NoTableFound.is_validation());
        assert!(Md2OfficeError::InvalidHeaders.is_validation());
        assert!(!Md2OfficeError::UploadFailed {
            key: "documents/a.docx".into(),
            reason: "503".into(),
        }
        .is_validation());
        assert!(!Md2OfficeError::Internal("boom".into()).is_validation());
    }

    #[test]
    fn timeout_and_fetch_placeholders_differ() {
        let timeout = ImageFailure::Timeout {
            url: "https://img.example/a.png".into(),
            secs: 10,
        };
        let fetch = ImageFailure::Fetch {
            url: "https://img.example/a.png".into(),
            reason: "connection reset".into(),
        };
        assert_ne!(timeout.to_string(), fetch.to_string());
        assert!(timeout.to_string().contains("https://img.example/a.png"));
        assert!(fetch.to_string().contains("https://img.example/a.png"));
    }

    #[test]
    fn http_placeholder_names_status_and_url() {
        let e = ImageFailure::Http {
            url: "https://img.example/missing.png".into(),
            status: 404,
        };
        let msg = e.to_string();
        assert!(msg.contains("404"), "got: {msg}");
        assert!(msg.contains("https://img.example/missing.png"));
        assert_eq!(e.url(), "https://img.example/missing.png");
    }

    #[test]
    fn upload_failure_display() {
        let e = Md2OfficeError::UploadFailed {
            key: "excel_documents/q1_20240101.xlsx".into(),
            reason: "HTTP 403".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("excel_documents/q1_20240101.xlsx"));
        assert!(msg.contains("403"));
    }
}
