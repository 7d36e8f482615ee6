//! Image normalisation: raw bytes → opaque baseline JPEG with display size.
//!
//! Word processors handle alpha channels and palettes inconsistently, so
//! every picture is decoded, flattened onto white, converted to 8-bit RGB and
//! re-encoded as JPEG before it is embedded. The display size is computed
//! here too, from the decoded pixel dimensions.

use crate::config::ConversionConfig;
use crate::error::ImageFailure;
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, RgbImage};
use tracing::debug;

/// A fetched image after normalisation.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    /// Baseline JPEG bytes.
    pub jpeg: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
    /// Colour type of the decoded source, before normalisation.
    pub source_color: ColorType,
}

/// Decode, flatten and re-encode `bytes` fetched from `url`.
pub fn normalize_image(url: &str, bytes: &[u8], quality: u8) -> Result<ImageAsset, ImageFailure> {
    let decoded = image::load_from_memory(bytes).map_err(|e| ImageFailure::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    let source_color = decoded.color();
    let rgb = flatten_to_rgb(&decoded);
    let (width_px, height_px) = rgb.dimensions();

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality)
        .encode_image(&rgb)
        .map_err(|e| ImageFailure::Encode {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    debug!(
        "Normalised {} ({:?}, {}x{} px) → {} bytes JPEG",
        url,
        source_color,
        width_px,
        height_px,
        jpeg.len()
    );

    Ok(ImageAsset {
        jpeg,
        width_px,
        height_px,
        source_color,
    })
}

/// Convert any colour type to opaque RGB8, compositing transparency onto white.
///
/// Palette images come out of the decoder already expanded to RGB(A), so
/// an alpha check covers them too.
pub fn flatten_to_rgb(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let alpha = u32::from(px[3]);
        let blend = |c: u8| -> u8 { ((u32::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8 };
        out.put_pixel(x, y, image::Rgb([blend(px[0]), blend(px[1]), blend(px[2])]));
    }
    out
}

/// Display size in centimetres for a `width_px × height_px` image.
///
/// Aim for the configured maximum width; if the aspect ratio would push the
/// height past its cap, size by height instead. The shrink factor is applied
/// last.
pub fn display_size_cm(width_px: u32, height_px: u32, config: &ConversionConfig) -> (f64, f64) {
    if width_px == 0 || height_px == 0 {
        return (0.0, 0.0);
    }
    let aspect = f64::from(height_px) / f64::from(width_px);
    let mut width = config.image_max_width_cm;
    if width * aspect > config.image_max_height_cm {
        width = config.image_max_height_cm / aspect;
    }
    width *= config.image_shrink;
    (width, width * aspect)
}
