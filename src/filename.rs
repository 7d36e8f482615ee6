//! Artifact naming: user-supplied titles → safe object names.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

/// Characters that are unsafe in paths and object keys, plus all whitespace.
static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/:*?"<>|\s]"#).expect("valid regex"));

/// Titles are cut to this many characters after stripping.
pub const MAX_TITLE_CHARS: usize = 30;

pub const DOCUMENT_FALLBACK: &str = "无标题文档";
pub const SPREADSHEET_FALLBACK: &str = "未命名表格";

/// Strip unsafe characters and whitespace, keep the first
/// [`MAX_TITLE_CHARS`] characters, and use `fallback` if nothing is left.
pub fn sanitize_title(input: &str, fallback: &str) -> String {
    let stripped = UNSAFE_CHARS.replace_all(input.trim(), "");
    let clean: String = stripped.chars().take(MAX_TITLE_CHARS).collect();
    if clean.is_empty() {
        fallback.to_string()
    } else {
        clean
    }
}

/// `<sanitised title>_<YYYYMMDD>.<ext>`
pub fn artifact_filename(title: &str, fallback: &str, ext: &str, date: NaiveDate) -> String {
    format!(
        "{}_{}.{}",
        sanitize_title(title, fallback),
        date.format("%Y%m%d"),
        ext
    )
}
