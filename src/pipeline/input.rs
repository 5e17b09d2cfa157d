//! Input resolution: turn a user-selected file into a study source.
//!
//! Dispatch is by extension only, the same way the file picker filters:
//! `.pdf` goes through the text extractor, `.png`/`.jpg`/`.jpeg` through the
//! image encoder, and anything else is rejected before the file is read.

use crate::error::QuizError;
use crate::pipeline::{encode, extract};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Extensions accepted by [`load_source`], lower-case with leading dot.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = [".pdf", ".png", ".jpg", ".jpeg"];

/// One piece of study material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceDocument {
    /// Text extracted from a PDF, already clamped to the character cap.
    Text { content: String },
    /// An image as a `data:` URL.
    Image { data_url: String },
}

/// A source together with the label shown in the file list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedFile {
    /// e.g. `PDF: notes.pdf (12.3 KB)`
    pub label: String,
    pub document: SourceDocument,
}

/// Lower-cased extension of `path` with its leading dot, or `""`.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Read and convert one file.
///
/// # Errors
/// - [`QuizError::UnsupportedFileType`] for any other extension (checked first)
/// - [`QuizError::FileNotFound`] / [`QuizError::PermissionDenied`] /
///   [`QuizError::ReadFailed`] when reading fails
/// - extractor errors for PDFs, including [`QuizError::NoExtractableText`]
pub async fn load_source(path: impl AsRef<Path>) -> Result<SelectedFile, QuizError> {
    let path = path.as_ref();
    let ext = extension_of(path);
    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(QuizError::UnsupportedFileType { extension: ext });
    }

    let bytes = read_file(path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let size_kb = bytes.len() as f64 / 1024.0;
    debug!("Read {} ({} bytes)", path.display(), bytes.len());

    let selected = if ext == ".pdf" {
        let content = extract::extract_text(bytes).await?;
        SelectedFile {
            label: format!("PDF: {name} ({size_kb:.1} KB)"),
            document: SourceDocument::Text { content },
        }
    } else {
        SelectedFile {
            label: format!("Image: {name} ({size_kb:.1} KB)"),
            document: SourceDocument::Image {
                data_url: encode::encode_image(&bytes, &ext),
            },
        }
    };

    info!("Loaded {}", selected.label);
    Ok(selected)
}

/// Read the whole file, mapping I/O failures to input errors.
async fn read_file(path: &Path) -> Result<Vec<u8>, QuizError> {
    tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => QuizError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => QuizError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => QuizError::ReadFailed {
            path: PathBuf::from(path),
            source: e,
        },
    })
}
