//! Error types for the lazyq library.
//!
//! Every failure in a generation is terminal for that one request: nothing
//! is retried. Errors are grouped the way they reach the user:
//!
//! * **Input errors** — a selected file is missing, unreadable, not a PDF the
//!   extractor can open, has no text layer, or has an unsupported extension.
//!   Surfaced when the file is added, long before any network call.
//!
//! * [`ValidationError`] — the generation parameters are unusable (question
//!   count out of range, no sources, no API key). Checked synchronously
//!   before a background job is started.
//!
//! * **Provider errors** — the single HTTP exchange failed. Each outcome of
//!   the exchange has its own variant so callers can tell a transport failure
//!   from a provider-reported error from a contract change.

use std::path::PathBuf;
use thiserror::Error;

/// Parameters rejected before any request is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Question count parsed but outside `1..=100`.
    #[error("Question count must be between 1 and 100, got {0}")]
    QuestionCountOutOfRange(i64),

    /// Question count input was not an integer at all.
    #[error("Question count must be a whole number between 1 and 100, got '{0}'")]
    InvalidQuestionCount(String),

    /// Neither a PDF nor an image was added.
    #[error("Add at least one PDF or image before generating")]
    NoSources,

    /// The stored credential has no API key.
    #[error("No API key configured.\nRun `lazyq setup` or set OPENROUTER_API_KEY.")]
    MissingApiKey,
}

/// All errors returned by the lazyq library.
#[derive(Debug, Error)]
pub enum QuizError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Selected file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Reading the file failed for another I/O reason.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Extension is not one of `.pdf`, `.png`, `.jpg`, `.jpeg`.
    #[error("Unsupported file type '{extension}'\nChoose a PDF, PNG, JPG or JPEG file.")]
    UnsupportedFileType { extension: String },

    /// The bytes are not a PDF the extractor can parse.
    #[error("PDF parse error: {detail}")]
    Extraction { detail: String },

    /// The PDF parsed but has no text layer (e.g. a scanned document).
    #[error("No extractable text found in this PDF.\nScanned, image-only PDFs are not supported; add the pages as images instead.")]
    NoExtractableText,

    // ── Validation ────────────────────────────────────────────────────────
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // ── Provider exchange ─────────────────────────────────────────────────
    /// DNS failure, refused connection, TLS failure or timeout.
    #[error("Network error: {detail}\nCheck your internet connection.")]
    Network { detail: String },

    /// Provider answered with a non-2xx status and no structured error.
    #[error("Provider HTTP {status}: {body}")]
    ProviderHttp { status: u16, body: String },

    /// Provider answered 2xx but the body is not the expected JSON.
    #[error("Failed to decode provider response: {detail}\nRaw: {raw}")]
    Decode { detail: String, raw: String },

    /// Provider returned an explicit `error` object.
    #[error("Provider error: {message} ({kind})")]
    Provider { message: String, kind: String },

    /// Provider returned a well-formed response with no choices.
    #[error("Provider returned no choices")]
    EmptyResponse,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the export file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Preferences could not be read or written.
    #[error("Preferences error at '{path}': {detail}")]
    Preferences { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDF text extraction needs the pdfium shared library.\n\
  • Install pdfium system-wide, or\n\
  • place libpdfium next to the lazyq binary, or\n\
  • set PDFIUM_LIB_PATH=/path/to/libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl QuizError {
    /// `true` for failures detected before any network I/O.
    pub fn is_validation(&self) -> bool {
        matches!(self, QuizError::Validation(_))
    }

    /// `true` for the outcomes of the provider exchange itself.
    pub fn is_provider_exchange(&self) -> bool {
        matches!(
            self,
            QuizError::Network { .. }
                | QuizError::ProviderHttp { .. }
                | QuizError::Decode { .. }
                | QuizError::Provider { .. }
                | QuizError::EmptyResponse
        )
    }
}
