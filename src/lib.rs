//! # lazyq
//!
//! Generate Italian study quizzes (questions plus a separate answer key)
//! from PDFs and images using an OpenRouter chat-completion model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! files
//!  │
//!  ├─ 1. Input    dispatch by extension (.pdf / .png / .jpg / .jpeg)
//!  ├─ 2. Extract  PDF text layer via pdfium (spawn_blocking), clamped
//!  ├─ 3. Encode   image bytes → base64 data URL
//!  ├─ 4. Prompt   merge texts, pick the style template, one text part + images
//!  ├─ 5. Complete one POST to the provider, no retries
//!  └─ 6. Split    clean the reply, cut questions from answers at `RISPOSTE:`
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lazyq::{generate_from_files, GenerationConfig, ProviderCredential, QuestionStyle};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let credential = ProviderCredential::from_env().ok_or("set OPENROUTER_API_KEY")?;
//!     let config = GenerationConfig::default();
//!     let result = generate_from_files(
//!         &["lecture.pdf", "diagram.png"],
//!         &credential,
//!         10,
//!         QuestionStyle::TrueFalse,
//!         &config,
//!     )
//!     .await?;
//!     println!("{}", result.questions);
//!     println!("{}", result.answers_or_placeholder());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `lazyq` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ```toml
//! lazyq = { version = "0.1", default-features = false }
//! ```
//!
//! ## Interactive use
//!
//! [`session::Session`] holds the state of an interactive session as a pure
//! value; [`driver::Driver`] performs the effects it asks for and feeds
//! background results back as events. The `lazyq shell` command is a thin
//! terminal loop over the two.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod driver;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod preferences;
pub mod progress;
pub mod prompts;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    GenerationConfig, GenerationConfigBuilder, ProviderCredential, QuestionStyle, DEFAULT_MODEL,
};
pub use error::{QuizError, ValidationError};
pub use generate::{generate, generate_from_files, generate_to_file, selftest};
pub use output::{write_result, GenerationResult, ANSWERS_UNAVAILABLE};
pub use pipeline::input::{load_source, SelectedFile, SourceDocument};
pub use pipeline::llm::{ChatTransport, CompletionClient};
pub use pipeline::postprocess::{split_reply, SplitReply};
pub use pipeline::request::GenerationRequest;
pub use preferences::{Preferences, PreferencesStore, API_KEY_GUIDE};
pub use progress::{GenerationProgressCallback, NoopProgressCallback, ProgressCallback};
