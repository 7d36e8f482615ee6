//! Pipeline stages for Markdown-to-Office conversion.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//!                  ┌─▶ render ──(fetch ▶ encode)──▶ RenderedDocument ─▶ ooxml::docx
//! parse ──▶ tree ──┤      └── table::materialize_table
//!                  └─▶ table::extract_first_table ─▶ sheet ─▶ Worksheet ─▶ ooxml::xlsx
//! ```
//!
//! 1. [`parse`]  — pulldown-cmark events folded into an owned node tree
//! 2. [`render`] — walk the tree into paragraphs, runs, grids and images
//! 3. [`fetch`]  — download image bytes; the only stage with network I/O
//! 4. [`encode`] — decode, flatten and re-encode images as JPEG; runs in
//!    `spawn_blocking` because it is CPU-bound
//! 5. [`table`]  — tables as word-processing grids or as plain string rows
//! 6. [`sheet`]  — style extracted rows into a worksheet

pub mod encode;
pub mod fetch;
pub mod parse;
pub mod render;
pub mod sheet;
pub mod table;
