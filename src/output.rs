//! Generation result and its text renderings.

use crate::error::QuizError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Shown (and exported) in place of answers when the reply had no
/// `RISPOSTE:` section.
pub const ANSWERS_UNAVAILABLE: &str = "Risposte non disponibili";

/// Separator between questions and answers in an exported file.
pub const EXPORT_SEPARATOR: &str = "\n\n=== RISPOSTE ===\n\n";

/// File name suggested when saving without an explicit path.
pub const DEFAULT_EXPORT_NAME: &str = "domande_risposte.txt";

/// Outcome of one successful generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Questions section, trimmed, without the `DOMANDE:` header.
    pub questions: String,
    /// Answers section; `None` when the reply carried no answers marker.
    pub answers: Option<String>,
    /// The reply exactly as returned by the provider.
    pub raw_reply: String,
    /// Wall-clock time from request build to split.
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

impl GenerationResult {
    /// Answers, or [`ANSWERS_UNAVAILABLE`].
    pub fn answers_or_placeholder(&self) -> &str {
        self.answers.as_deref().unwrap_or(ANSWERS_UNAVAILABLE)
    }

    /// Questions followed by the `Generato in …` footer, as shown on screen.
    pub fn questions_with_footer(&self) -> String {
        format!(
            "{}\n\n--\nGenerato in {}",
            self.questions.trim(),
            format_elapsed(self.elapsed)
        )
    }

    /// Text written by [`write_result`]: questions, separator, answers.
    pub fn export_text(&self) -> String {
        format!(
            "{}{}{}",
            self.questions,
            EXPORT_SEPARATOR,
            self.answers_or_placeholder()
        )
    }
}

/// `1.234s` / `850ms`, millisecond precision.
pub fn format_elapsed(d: Duration) -> String {
    let ms = d.as_millis();
    if ms < 1000 {
        format!("{ms}ms")
    } else {
        format!("{}.{:03}s", ms / 1000, ms % 1000)
    }
}

/// Atomically write the export text of `result` to `path`.
pub async fn write_result(path: impl AsRef<Path>, result: &GenerationResult) -> Result<(), QuizError> {
    write_text(path, &result.export_text()).await
}

/// Write `contents` to `path` via a sibling `.tmp` file and a rename,
/// creating parent directories as needed.
pub async fn write_text(path: impl AsRef<Path>, contents: &str) -> Result<(), QuizError> {
    let path = path.as_ref();
    let write_err = |source| QuizError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, contents).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    info!("Saved {} bytes to {}", contents.len(), path.display());
    Ok(())
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
