//! Image encoding: raw file bytes → `data:<mime>;base64,<payload>` URL.
//!
//! Chat-completion APIs accept images as data URLs inside an `image_url`
//! content part. The bytes are passed through untouched: no decoding, no
//! re-compression, no validation. If the file is not really an image the
//! provider rejects it and that rejection surfaces as a provider error.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use tracing::debug;

/// MIME type used when the extension is unknown.
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// Resolve the MIME type for a file extension (leading dot optional).
///
/// Uses the `image` crate's format table first, then a small fallback table
/// for the formats the picker accepts.
pub fn mime_for_extension(extension: &str) -> &'static str {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();
    if let Some(format) = ImageFormat::from_extension(&ext) {
        return format.to_mime_type();
    }
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => FALLBACK_MIME,
    }
}

/// Wrap `bytes` in a data URL whose MIME type comes from `extension`.
pub fn encode_image(bytes: &[u8], extension: &str) -> String {
    let mime = mime_for_extension(extension);
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} bytes as {} → {} bytes base64", bytes.len(), mime, b64.len());
    format!("data:{mime};base64,{b64}")
}
