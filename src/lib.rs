//! # md2office
//!
//! Render Markdown into Word (`.docx`) documents and Excel (`.xlsx`)
//! workbooks, and publish the result to object storage.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Markdown
//!  │
//!  ├─ 1. Parse    pulldown-cmark → owned SyntaxNode tree
//!  ├─ 2a. Render  headings, paragraphs, code, lists, tables, images
//!  │     │        (images fetched over HTTP, normalised to JPEG)
//!  │     └─ docx  styles, numbering, media → zip package
//!  ├─ 2b. Extract first table → header + rows
//!  │     └─ xlsx  title band, header/summary styling, widths, metadata
//!  └─ 3. Publish  temp_* file → ObjectStore → GeneratedFile { file_url, .. }
//! ```
//!
//! A failed image never fails a document: it is replaced by a placeholder
//! paragraph naming the URL and the reason.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use md2office::{render_docx, ConversionConfig, HttpImageFetcher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let fetcher = HttpImageFetcher::new(config.image_timeout_secs)?;
//!     let bytes = render_docx("# Weekly report\n\nAll good.", "Weekly report", &config, &fetcher).await?;
//!     std::fs::write("report.docx", bytes)?;
//!     Ok(())
//! }
//! ```
//!
//! Spreadsheets need no network access:
//!
//! ```rust
//! use md2office::{extract_spreadsheet, render_xlsx};
//!
//! let input = extract_spreadsheet("| Product | Sales |\n|---|---|\n| Total | 100 |\n", "Q1").unwrap();
//! let bytes = render_xlsx(&input).unwrap();
//! assert_eq!(&bytes[..2], b"PK");
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `md2office` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! md2office = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod filename;
pub mod node;
pub mod ooxml;
pub mod pipeline;
pub mod request;
pub mod storage;
pub mod workbook;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, StorageConfig};
pub use convert::{
    extract_spreadsheet, generate_doc, generate_doc_with, generate_excel,
    generate_excel_from_json, render_document, render_docx, render_docx_sync, render_xlsx,
    write_artifact, GeneratedFile,
};
pub use document::RenderedDocument;
pub use error::{ImageFailure, Md2OfficeError};
pub use node::{NodeKind, SyntaxNode};
pub use pipeline::fetch::{HttpImageFetcher, ImageFetcher};
pub use pipeline::parse::parse_markdown;
pub use request::{DocRequest, ExcelRequest};
pub use storage::{HttpStore, LocalStore, ObjectStore};
pub use workbook::{CellValue, SheetMetadata, SpreadsheetInput};
