//! PDF text extraction via pdfium.
//!
//! Only the text layer is read; there is no OCR. A scanned PDF parses fine
//! but yields no text, and that is reported as
//! [`QuizError::NoExtractableText`] rather than as a parse failure so the
//! caller can suggest adding the pages as images instead.
//!
//! pdfium is a C++ library with thread-local state, so the async entry point
//! moves the work onto `spawn_blocking`.

use crate::config::MAX_TEXT_CHARS;
use crate::error::QuizError;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// Marker appended to a single PDF's text when it was clipped.
pub const TRUNCATION_MARKER: &str = "\n...[truncated]...";

/// Extract, trim and clamp the text of a PDF held in memory.
///
/// Runs inside `spawn_blocking`; see [`extract_text_blocking`].
pub async fn extract_text(bytes: Vec<u8>) -> Result<String, QuizError> {
    tokio::task::spawn_blocking(move || extract_text_blocking(&bytes))
        .await
        .map_err(|e| QuizError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Blocking implementation of text extraction.
pub fn extract_text_blocking(bytes: &[u8]) -> Result<String, QuizError> {
    if !bytes.starts_with(b"%PDF") {
        let head: Vec<u8> = bytes.iter().take(4).copied().collect();
        return Err(QuizError::Extraction {
            detail: format!("not a PDF document (first bytes: {:?})", head),
        });
    }

    let pdfium = bind_pdfium()?;

    let document = pdfium.load_pdf_from_byte_slice(bytes, None).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            QuizError::Extraction {
                detail: "the PDF is encrypted and requires a password".to_string(),
            }
        } else {
            QuizError::Extraction { detail: err_str }
        }
    })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    let mut page_texts = Vec::with_capacity(total_pages);

    for (idx, page) in pages.iter().enumerate() {
        let text = page.text().map_err(|e| QuizError::Extraction {
            detail: format!("page {}: {:?}", idx + 1, e),
        })?;
        page_texts.push(text.all());
    }

    let text = finish_text(&page_texts)?;
    info!("Extracted {} chars from {} pages", text.chars().count(), total_pages);
    Ok(text)
}

/// Join page texts, trim, and clamp to [`MAX_TEXT_CHARS`].
///
/// A document whose pages carry only whitespace (a scan) gives
/// [`QuizError::NoExtractableText`].
pub fn finish_text(pages: &[String]) -> Result<String, QuizError> {
    let text = pages.join("\n");
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(QuizError::NoExtractableText);
    }
    Ok(clamp_text(trimmed, MAX_TEXT_CHARS, TRUNCATION_MARKER))
}

/// Cut `text` to at most `cap` chars, appending `marker` when anything was cut.
///
/// Counts `char`s, never splitting a UTF-8 sequence. For input longer than
/// `cap` the output is exactly the first `cap` chars followed by `marker`.
pub fn clamp_text(text: &str, cap: usize, marker: &str) -> String {
    match text.char_indices().nth(cap) {
        Some((byte_idx, _)) => {
            debug!("Clamping text at {} chars", cap);
            let mut out = String::with_capacity(byte_idx + marker.len());
            out.push_str(&text[..byte_idx]);
            out.push_str(marker);
            out
        }
        None => text.to_string(),
    }
}

/// Bind to a pdfium library, most specific location first.
///
/// 1. `PDFIUM_LIB_PATH` — explicit path to the shared library
/// 2. the platform library name in the current directory
/// 3. the system library search path
fn bind_pdfium() -> Result<Pdfium, QuizError> {
    if let Ok(p) = std::env::var("PDFIUM_LIB_PATH") {
        if !p.is_empty() {
            let path = PathBuf::from(p);
            return Pdfium::bind_to_library(&path)
                .map(Pdfium::new)
                .map_err(|e| {
                    QuizError::PdfiumBindingFailed(format!("{}: {}", path.display(), e))
                });
        }
    }

    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| QuizError::PdfiumBindingFailed(e.to_string()))
}
