//! Configuration types for Markdown-to-Office conversion.
//!
//! Rendering behaviour is controlled through [`ConversionConfig`], built via
//! its [`ConversionConfigBuilder`]. Storage settings live in
//! [`StorageConfig`], read once from the environment at start-up and passed
//! by reference to the upload collaborator; nothing reads the environment
//! mid-request.

use crate::error::Md2OfficeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Font families applied to generated runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fonts {
    /// Latin script font. Default: Times New Roman.
    pub latin: String,
    /// East Asian script font. Default: 宋体 (SimSun).
    pub east_asian: String,
    /// Code blocks and code spans. Default: Courier New.
    pub monospace: String,
}

impl Default for Fonts {
    fn default() -> Self {
        Self {
            latin: "Times New Roman".to_string(),
            east_asian: "宋体".to_string(),
            monospace: "Courier New".to_string(),
        }
    }
}

/// Page size and margins, in centimetres. Default: A4 with official-document margins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSetup {
    pub width_cm: f64,
    pub height_cm: f64,
    pub margin_top_cm: f64,
    pub margin_bottom_cm: f64,
    pub margin_left_cm: f64,
    pub margin_right_cm: f64,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            width_cm: 21.0,
            height_cm: 29.7,
            margin_top_cm: 3.7,
            margin_bottom_cm: 3.5,
            margin_left_cm: 2.8,
            margin_right_cm: 2.8,
        }
    }
}

impl PageSetup {
    /// Usable width between the left and right margins.
    pub fn text_width_cm(&self) -> f64 {
        (self.width_cm - self.margin_left_cm - self.margin_right_cm).max(1.0)
    }
}

/// Configuration for rendering one document.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use md2office::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .image_timeout_secs(5)
///     .image_max_width_cm(12.0)
///     .build()
///     .unwrap();
/// assert_eq!(config.image_timeout_secs, 5);
/// ```
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Per-image fetch timeout in seconds. Default: 10.
    ///
    /// Images are fetched one at a time while the document is assembled, so
    /// this bounds how long a single slow host can stall a request.
    pub image_timeout_secs: u64,

    /// Target display width of an embedded image. Default: 15 cm.
    pub image_max_width_cm: f64,

    /// Cap on display height; tall images are narrowed to respect it. Default: 20 cm.
    pub image_max_height_cm: f64,

    /// Final scale applied after the width/height caps. Default: 0.9.
    pub image_shrink: f64,

    /// JPEG quality for re-encoded images, 1–100. Default: 95.
    pub jpeg_quality: u8,

    pub fonts: Fonts,

    /// Body text size. Default: 12 pt.
    pub body_size_pt: f32,

    /// Exact line spacing for body paragraphs. Default: 25 pt.
    pub line_spacing_pt: f32,

    /// First-line indent for body paragraphs. Default: 0.74 cm (two CJK characters).
    pub first_line_indent_cm: f32,

    /// Heading sizes for levels 1, 2 and 3+. Default: 16 / 15 / 14 pt.
    pub heading_sizes_pt: [f32; 3],

    pub heading_space_before_pt: f32,
    pub heading_space_after_pt: f32,

    /// Code block text size. Default: 10 pt.
    pub code_size_pt: f32,

    /// Left indent of code blocks. Default: 1 cm.
    pub code_indent_cm: f32,

    pub page: PageSetup,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            image_timeout_secs: 10,
            image_max_width_cm: 15.0,
            image_max_height_cm: 20.0,
            image_shrink: 0.9,
            jpeg_quality: 95,
            fonts: Fonts::default(),
            body_size_pt: 12.0,
            line_spacing_pt: 25.0,
            first_line_indent_cm: 0.74,
            heading_sizes_pt: [16.0, 15.0, 14.0],
            heading_space_before_pt: 22.0,
            heading_space_after_pt: 11.0,
            code_size_pt: 10.0,
            code_indent_cm: 1.0,
            page: PageSetup::default(),
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("image_timeout_secs", &self.image_timeout_secs)
            .field("image_max_width_cm", &self.image_max_width_cm)
            .field("image_max_height_cm", &self.image_max_height_cm)
            .field("image_shrink", &self.image_shrink)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("fonts", &self.fonts)
            .field("body_size_pt", &self.body_size_pt)
            .field("heading_sizes_pt", &self.heading_sizes_pt)
            .finish_non_exhaustive()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Heading run size for a level; level 3 and deeper share the smallest band.
    pub fn heading_size_pt(&self, level: u8) -> f32 {
        match level {
            0 | 1 => self.heading_sizes_pt[0],
            2 => self.heading_sizes_pt[1],
            _ => self.heading_sizes_pt[2],
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn image_timeout_secs(mut self, secs: u64) -> Self {
        self.config.image_timeout_secs = secs.max(1);
        self
    }

    pub fn image_max_width_cm(mut self, cm: f64) -> Self {
        self.config.image_max_width_cm = cm;
        self
    }

    pub fn image_max_height_cm(mut self, cm: f64) -> Self {
        self.config.image_max_height_cm = cm;
        self
    }

    pub fn image_shrink(mut self, factor: f64) -> Self {
        self.config.image_shrink = factor;
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn fonts(mut self, fonts: Fonts) -> Self {
        self.config.fonts = fonts;
        self
    }

    pub fn body_size_pt(mut self, pt: f32) -> Self {
        self.config.body_size_pt = pt;
        self
    }

    pub fn page(mut self, page: PageSetup) -> Self {
        self.config.page = page;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Md2OfficeError> {
        let c = &self.config;
        if c.image_max_width_cm <= 0.0 || c.image_max_height_cm <= 0.0 {
            return Err(Md2OfficeError::InvalidConfig(format!(
                "Image bounds must be positive, got {}×{} cm",
                c.image_max_width_cm, c.image_max_height_cm
            )));
        }
        if !(c.image_shrink > 0.0 && c.image_shrink <= 1.0) {
            return Err(Md2OfficeError::InvalidConfig(format!(
                "Image shrink factor must be in (0, 1], got {}",
                c.image_shrink
            )));
        }
        if c.body_size_pt <= 0.0 {
            return Err(Md2OfficeError::InvalidConfig(
                "Body font size must be positive".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Storage ──────────────────────────────────────────────────────────────

pub const DEFAULT_BUCKET: &str = "difyfordoc-1323080521";
pub const DEFAULT_REGION: &str = "ap-guangzhou";

/// Object storage settings, read once at process start.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    /// Base URL uploads are PUT to. Defaults to the bucket's public host.
    pub upload_url: Option<String>,
    /// Base URL returned to callers. Defaults to the bucket's public host.
    pub public_url: Option<String>,
    /// Bearer token sent with uploads.
    pub token: Option<String>,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("upload_url", &self.upload_url)
            .field("public_url", &self.public_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl StorageConfig {
    /// Read `MD2OFFICE_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let config = Self {
            bucket: get("MD2OFFICE_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            region: get("MD2OFFICE_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            upload_url: get("MD2OFFICE_UPLOAD_URL"),
            public_url: get("MD2OFFICE_PUBLIC_URL"),
            token: get("MD2OFFICE_UPLOAD_TOKEN"),
        };
        if config.token.is_none() {
            warn!("MD2OFFICE_UPLOAD_TOKEN is not set; uploads will be sent unauthenticated");
        }
        config
    }

    /// `https://<bucket>.cos.<region>.myqcloud.com`
    pub fn bucket_host(&self) -> String {
        format!("https://{}.cos.{}.myqcloud.com", self.bucket, self.region)
    }

    pub fn upload_base(&self) -> String {
        self.upload_url
            .clone()
            .unwrap_or_else(|| self.bucket_host())
    }

    pub fn public_base(&self) -> String {
        self.public_url
            .clone()
            .unwrap_or_else(|| self.bucket_host())
    }
}
