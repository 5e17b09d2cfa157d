//! Pipeline stages for quiz generation.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract / encode ──▶ request ──▶ llm ──▶ postprocess
//! (path)    (pdfium / base64)    (prompt)   (HTTP)  (clean + split)
//! ```
//!
//! 1. [`input`]   — dispatch a selected file by extension
//! 2. [`extract`] — read a PDF's text layer; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 3. [`encode`]  — wrap image bytes in a base64 data URL
//! 4. [`request`] — merge and clamp texts, assemble the chat request
//! 5. [`llm`]     — the single HTTP exchange; the only stage with network I/O
//! 6. [`postprocess`] — normalise the reply and split questions from answers

pub mod encode;
pub mod extract;
pub mod input;
pub mod llm;
pub mod postprocess;
pub mod request;
