//! Conversion entry points.
//!
//! Two layers are exposed:
//!
//! - **Rendering** ([`render_docx`], [`render_xlsx`], ...) turns Markdown or a
//!   spreadsheet payload into package bytes and touches nothing but the
//!   network for images.
//! - **Publishing** ([`generate_doc`], [`generate_excel`]) validates a
//!   request, renders it, stages the bytes in a temporary file, hands that
//!   file to an [`ObjectStore`] and reports where it ended up. The temporary
//!   file is removed whether or not the upload succeeds.

use crate::config::ConversionConfig;
use crate::document::RenderedDocument;
use crate::error::Md2OfficeError;
use crate::filename::{artifact_filename, DOCUMENT_FALLBACK, SPREADSHEET_FALLBACK};
use crate::ooxml;
use crate::pipeline::fetch::{HttpImageFetcher, ImageFetcher};
use crate::pipeline::parse::parse_markdown;
use crate::pipeline::render::DocumentRenderer;
use crate::pipeline::{sheet, table};
use crate::request::{DocRequest, ExcelRequest};
use crate::storage::{ObjectStore, DOCUMENT_PREFIX, SPREADSHEET_PREFIX};
use crate::workbook::SpreadsheetInput;
use chrono::Local;
use serde::Serialize;
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Outcome of a successful publish, shaped like the service's JSON response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedFile {
    pub message: String,
    pub file_url: String,
    pub filename: String,
}

// ── Rendering ────────────────────────────────────────────────────────────

/// Parse and render Markdown into the document model, resolving images
/// through `fetcher`.
pub async fn render_document<F: ImageFetcher>(
    markdown: &str,
    config: &ConversionConfig,
    fetcher: &F,
) -> RenderedDocument {
    let nodes = parse_markdown(markdown);
    let mut renderer = DocumentRenderer::new(config, fetcher);
    renderer.render(&nodes).await;
    renderer.into_document()
}

/// Render Markdown into `.docx` bytes.
///
/// Image failures never fail the call; they appear as placeholder
/// paragraphs in the document.
pub async fn render_docx<F: ImageFetcher>(
    markdown: &str,
    title: &str,
    config: &ConversionConfig,
    fetcher: &F,
) -> Result<Vec<u8>, Md2OfficeError> {
    let start = Instant::now();
    let doc = render_document(markdown, config, fetcher).await;
    let bytes = ooxml::docx::write_docx(&doc, config, title)?;
    info!(
        "Rendered docx: {} blocks, {} images, {} bytes in {}ms",
        doc.blocks.len(),
        doc.images().count(),
        bytes.len(),
        start.elapsed().as_millis()
    );
    Ok(bytes)
}

/// Synchronous wrapper around [`render_docx`] using an HTTP image fetcher.
///
/// Creates a temporary tokio runtime internally.
pub fn render_docx_sync(
    markdown: &str,
    title: &str,
    config: &ConversionConfig,
) -> Result<Vec<u8>, Md2OfficeError> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| Md2OfficeError::Internal(format!("Failed to create tokio runtime: {}", e)))?;
    runtime.block_on(async {
        let fetcher = http_fetcher(config)?;
        render_docx(markdown, title, config, &fetcher).await
    })
}

/// Read the first Markdown table into a spreadsheet input titled `title`.
pub fn extract_spreadsheet(markdown: &str, title: &str) -> Result<SpreadsheetInput, Md2OfficeError> {
    let extracted = table::extract_first_table(&parse_markdown(markdown))?;
    debug!(
        "Extracted table: {} headers, {} rows",
        extracted.headers.len(),
        extracted.rows.len()
    );
    SpreadsheetInput::new(title, extracted.headers, extracted.rows)
}

/// Style and serialise a spreadsheet input into `.xlsx` bytes.
pub fn render_xlsx(input: &SpreadsheetInput) -> Result<Vec<u8>, Md2OfficeError> {
    let ws = sheet::build_worksheet(input);
    let bytes = ooxml::xlsx::write_xlsx(&ws, &input.title)?;
    info!(
        "Rendered xlsx '{}': {} rows, {} bytes",
        input.title,
        input.rows.len(),
        bytes.len()
    );
    Ok(bytes)
}

/// Validate a `{title, data, metadata?}` payload and render it.
pub fn generate_excel_from_json(payload: &Value) -> Result<Vec<u8>, Md2OfficeError> {
    render_xlsx(&SpreadsheetInput::from_json(payload)?)
}

// ── Publishing ───────────────────────────────────────────────────────────

/// Render a document request and store it, fetching images over HTTP.
pub async fn generate_doc<S: ObjectStore>(
    request: &DocRequest,
    config: &ConversionConfig,
    store: &S,
) -> Result<GeneratedFile, Md2OfficeError> {
    let fetcher = http_fetcher(config)?;
    generate_doc_with(request, config, &fetcher, store).await
}

/// [`generate_doc`] with a caller-supplied image source.
pub async fn generate_doc_with<F: ImageFetcher, S: ObjectStore>(
    request: &DocRequest,
    config: &ConversionConfig,
    fetcher: &F,
    store: &S,
) -> Result<GeneratedFile, Md2OfficeError> {
    let valid = request.validate()?;
    info!("Generating document '{}'", valid.title);

    let filename = artifact_filename(&valid.title, DOCUMENT_FALLBACK, "docx", Local::now().date_naive());
    let bytes = render_docx(valid.content, &valid.title, config, fetcher).await?;
    let file_url = publish(&bytes, DOCUMENT_PREFIX, &filename, ".docx", store).await?;

    Ok(GeneratedFile {
        message: "生成成功".to_string(),
        file_url,
        filename,
    })
}

/// Turn the first table of a spreadsheet request into an `.xlsx` and store it.
pub async fn generate_excel<S: ObjectStore>(
    request: &ExcelRequest,
    store: &S,
) -> Result<GeneratedFile, Md2OfficeError> {
    let valid = request.validate()?;
    info!("Generating spreadsheet '{}'", valid.title);

    let input = extract_spreadsheet(valid.content, &valid.title)?;
    let bytes = render_xlsx(&input)?;
    let filename = artifact_filename(
        &valid.title,
        SPREADSHEET_FALLBACK,
        "xlsx",
        Local::now().date_naive(),
    );
    let file_url = publish(&bytes, SPREADSHEET_PREFIX, &filename, ".xlsx", store).await?;

    Ok(GeneratedFile {
        message: "Excel文件生成成功".to_string(),
        file_url,
        filename,
    })
}

/// Write artifact bytes to `path` atomically (temp file + rename).
pub async fn write_artifact(bytes: &[u8], path: impl AsRef<Path>) -> Result<(), Md2OfficeError> {
    let path = path.as_ref();
    let write_failed = |e: std::io::Error| Md2OfficeError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }
    let tmp_path = path.with_extension("part");
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_failed)?;
    Ok(())
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn http_fetcher(config: &ConversionConfig) -> Result<HttpImageFetcher, Md2OfficeError> {
    HttpImageFetcher::new(config.image_timeout_secs)
        .map_err(|e| Md2OfficeError::Internal(format!("HTTP client: {e}")))
}

/// Stage `bytes` in a `temp_*` file and upload it under `<prefix>/<filename>`.
///
/// The staged file is deleted when this returns, on success and failure alike.
async fn publish<S: ObjectStore>(
    bytes: &[u8],
    prefix: &str,
    filename: &str,
    suffix: &str,
    store: &S,
) -> Result<String, Md2OfficeError> {
    let mut staged = tempfile::Builder::new()
        .prefix("temp_")
        .suffix(suffix)
        .tempfile()
        .map_err(Md2OfficeError::TempFile)?;
    staged.write_all(bytes).map_err(Md2OfficeError::TempFile)?;
    staged.flush().map_err(Md2OfficeError::TempFile)?;

    let key = format!("{prefix}/{filename}");
    let result = store.upload(staged.path(), &key).await;
    if let Err(e) = &result {
        warn!("Upload of {} failed: {}", key, e);
    }
    // `staged` is dropped (and the file deleted) here
    result
}
