//! Progress-callback trait for generation milestones.
//!
//! Inject an [`Arc<dyn GenerationProgressCallback>`] via
//! [`crate::config::GenerationConfigBuilder::progress_callback`] to be told
//! when sources are loaded, when the request leaves, and how it ended. The
//! CLI uses this to drive a spinner; the library never prints anything
//! itself.
//!
//! # Example
//!
//! ```rust
//! use lazyq::{GenerationConfig, GenerationProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     loaded: AtomicUsize,
//! }
//!
//! impl GenerationProgressCallback for CountingCallback {
//!     fn on_source_loaded(&self, label: &str) {
//!         let n = self.loaded.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{n}: {label}");
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { loaded: AtomicUsize::new(0) });
//! let config = GenerationConfig::builder()
//!     .progress_callback(cb as Arc<dyn GenerationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the generation pipeline at each milestone.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync` because the
/// pipeline runs on a background task.
pub trait GenerationProgressCallback: Send + Sync {
    /// A selected file was read and turned into a source.
    fn on_source_loaded(&self, label: &str) {
        let _ = label;
    }

    /// The request body is built and about to be sent.
    ///
    /// # Arguments
    /// * `text_chars`  — length of the single text part
    /// * `image_parts` — number of image parts following it
    fn on_request_start(&self, text_chars: usize, image_parts: usize) {
        let _ = (text_chars, image_parts);
    }

    /// The provider replied and the reply was split.
    fn on_request_complete(&self, reply_len: usize, elapsed_ms: u64) {
        let _ = (reply_len, elapsed_ms);
    }

    /// The request failed; no result will follow.
    fn on_request_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl GenerationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GenerationConfig`].
pub type ProgressCallback = Arc<dyn GenerationProgressCallback>;
