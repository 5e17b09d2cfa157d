//! Configuration types for quiz generation.
//!
//! Everything that shapes the provider exchange lives in
//! [`GenerationConfig`], built via [`GenerationConfigBuilder`]. The
//! credential is kept apart in [`ProviderCredential`] because it is the only
//! value that is persisted between sessions; the config is passed explicitly
//! into the client at call time and never read from global state.

use crate::error::{QuizError, ValidationError};
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chat-completions endpoint used unless overridden.
pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Model used when the user leaves the model field empty.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o";

/// Question count pre-filled in the parameter field.
pub const DEFAULT_QUESTION_COUNT: u32 = 10;

/// Inclusive bounds for the number of questions per request.
pub const MIN_QUESTIONS: u32 = 1;
pub const MAX_QUESTIONS: u32 = 100;

/// Character cap applied to each extracted PDF and to the merged prompt text.
pub const MAX_TEXT_CHARS: usize = 12_000;

/// Attribution headers sent with every request.
pub const REFERER_HEADER: &str = "https://local-app/lazyq";
pub const TITLE_HEADER: &str = "LazyQ";

/// Configuration for a generation request.
///
/// # Example
/// ```rust
/// use lazyq::GenerationConfig;
///
/// let config = GenerationConfig::builder()
///     .timeout_secs(30)
///     .temperature(0.3)
///     .build()
///     .unwrap();
/// assert_eq!(config.timeout_secs, 30);
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// Chat-completions URL. Default: [`OPENROUTER_URL`].
    pub endpoint: String,

    /// Sampling temperature. Default: 0.2.
    pub temperature: f32,

    /// Whole-request timeout in seconds. Default: 90.
    ///
    /// Covers connect, upload and the complete response body. Expiry is
    /// reported as [`QuizError::Network`].
    pub timeout_secs: u64,

    /// Character cap for the merged text of all sources. Default: [`MAX_TEXT_CHARS`].
    ///
    /// Each PDF is first clamped on its own to [`MAX_TEXT_CHARS`] at
    /// extraction time, whatever this is set to.
    pub max_text_chars: usize,

    /// `HTTP-Referer` attribution header.
    pub referer: String,

    /// `X-Title` attribution header.
    pub app_title: String,

    /// Custom system prompt. If None, uses [`crate::prompts::SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Optional observer for pipeline milestones.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: OPENROUTER_URL.to_string(),
            temperature: 0.2,
            timeout_secs: 90,
            max_text_chars: MAX_TEXT_CHARS,
            referer: REFERER_HEADER.to_string(),
            app_title: TITLE_HEADER.to_string(),
            system_prompt: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("endpoint", &self.endpoint)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_text_chars", &self.max_text_chars)
            .field("referer", &self.referer)
            .field("app_title", &self.app_title)
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn GenerationProgressCallback>"),
            )
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`GenerationConfig`].
#[derive(Debug)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    pub fn max_text_chars(mut self, n: usize) -> Self {
        self.config.max_text_chars = n.max(1);
        self
    }

    pub fn referer(mut self, referer: impl Into<String>) -> Self {
        self.config.referer = referer.into();
        self
    }

    pub fn app_title(mut self, title: impl Into<String>) -> Self {
        self.config.app_title = title.into();
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, QuizError> {
        let c = &self.config;
        if !(c.endpoint.starts_with("http://") || c.endpoint.starts_with("https://")) {
            return Err(QuizError::InvalidConfig(format!(
                "Endpoint must be an HTTP/HTTPS URL, got '{}'",
                c.endpoint
            )));
        }
        if c.timeout_secs == 0 {
            return Err(QuizError::InvalidConfig("Timeout must be ≥ 1 second".into()));
        }
        Ok(self.config)
    }
}

// ── Credential ───────────────────────────────────────────────────────────

/// API key and model identifier for the provider.
///
/// `Debug` redacts the key so configs can be logged safely.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCredential {
    pub api_key: String,
    pub model: String,
}

impl ProviderCredential {
    /// Trims both values; an empty model falls back to [`DEFAULT_MODEL`].
    pub fn new(api_key: impl AsRef<str>, model: impl AsRef<str>) -> Self {
        let model = model.as_ref().trim();
        Self {
            api_key: api_key.as_ref().trim().to_string(),
            model: if model.is_empty() {
                DEFAULT_MODEL.to_string()
            } else {
                model.to_string()
            },
        }
    }

    /// Read `OPENROUTER_API_KEY` and, optionally, `LAZYQ_MODEL`.
    pub fn from_env() -> Option<Self> {
        let key = std::env::var("OPENROUTER_API_KEY").ok()?;
        if key.trim().is_empty() {
            return None;
        }
        let model = std::env::var("LAZYQ_MODEL").unwrap_or_default();
        Some(Self::new(key, model))
    }

    pub fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Reject a credential with no key.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.has_key() {
            Ok(())
        } else {
            Err(ValidationError::MissingApiKey)
        }
    }
}

impl fmt::Debug for ProviderCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredential")
            .field("api_key", &if self.has_key() { "<redacted>" } else { "<empty>" })
            .field("model", &self.model)
            .finish()
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Template family governing the phrasing of generated questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QuestionStyle {
    /// Open questions with matching answers. (default)
    #[default]
    None,
    /// True/false statements, answered with a short justification.
    TrueFalse,
    /// Ordering of events, processes or steps.
    Sequential,
    /// Analysis, comparison and synthesis across concepts.
    Complex,
    /// Dates, quantities, percentages.
    DatesAndNumbers,
}

impl QuestionStyle {
    /// Every style, in the order the selector lists them.
    pub const ALL: [QuestionStyle; 5] = [
        QuestionStyle::None,
        QuestionStyle::TrueFalse,
        QuestionStyle::Sequential,
        QuestionStyle::Complex,
        QuestionStyle::DatesAndNumbers,
    ];

    /// Label shown in the style selector.
    pub fn label(self) -> &'static str {
        match self {
            QuestionStyle::None => "Standard",
            QuestionStyle::TrueFalse => "Vero o Falso",
            QuestionStyle::Sequential => "Sequenziale",
            QuestionStyle::Complex => "Complicate",
            QuestionStyle::DatesAndNumbers => "Date e numeri",
        }
    }
}

impl fmt::Display for QuestionStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for QuestionStyle {
    type Err = String;

    /// Accepts the selector label or a short ASCII alias, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_lowercase().replace(['_', ' '], "-");
        match norm.as_str() {
            "" | "none" | "standard" | "default" => Ok(QuestionStyle::None),
            "tf" | "true-false" | "vero-o-falso" => Ok(QuestionStyle::TrueFalse),
            "seq" | "sequential" | "sequenziale" => Ok(QuestionStyle::Sequential),
            "complex" | "complicate" => Ok(QuestionStyle::Complex),
            "dates" | "numbers" | "dates-and-numbers" | "date-e-numeri" => {
                Ok(QuestionStyle::DatesAndNumbers)
            }
            _ => Err(format!(
                "Unknown style '{s}'. Use: none, true-false, sequential, complex, dates-and-numbers"
            )),
        }
    }
}

/// Parse the question-count field the way the parameter form does:
/// blank means the default, anything else must be an integer in range.
pub fn parse_question_count(input: &str) -> Result<u32, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(DEFAULT_QUESTION_COUNT);
    }
    let n: i64 = trimmed
        .parse()
        .map_err(|_| ValidationError::InvalidQuestionCount(trimmed.to_string()))?;
    check_question_count(n)
}

/// Range check shared by the form parser and [`crate::GenerationRequest::new`].
pub fn check_question_count(n: i64) -> Result<u32, ValidationError> {
    if n < MIN_QUESTIONS as i64 || n > MAX_QUESTIONS as i64 {
        return Err(ValidationError::QuestionCountOutOfRange(n));
    }
    Ok(n as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = GenerationConfig::default();
        assert_eq!(c.endpoint, OPENROUTER_URL);
        assert_eq!(c.timeout_secs, 90);
        assert_eq!(c.max_text_chars, 12_000);
        assert!((c.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn builder_rejects_non_http_endpoint() {
        let err = GenerationConfig::builder()
            .endpoint("ftp://example.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, QuizError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        assert!(GenerationConfig::builder().timeout_secs(0).build().is_err());
    }

    #[test]
    fn builder_clamps_temperature() {
        let c = GenerationConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn credential_defaults_model_and_trims() {
        let c = ProviderCredential::new("  sk-or-v1-abc \n", "   ");
        assert_eq!(c.api_key, "sk-or-v1-abc");
        assert_eq!(c.model, DEFAULT_MODEL);
    }

    #[test]
    fn credential_debug_redacts_key() {
        let c = ProviderCredential::new("sk-or-v1-secret", "openai/gpt-4o-mini");
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret"), "got: {dbg}");
        assert!(dbg.contains("gpt-4o-mini"));
    }

    #[test]
    fn blank_credential_fails_validation() {
        let c = ProviderCredential::new("   ", "");
        assert_eq!(c.validate(), Err(ValidationError::MissingApiKey));
    }

    #[test]
    fn style_parsing() {
        assert_eq!("tf".parse::<QuestionStyle>(), Ok(QuestionStyle::TrueFalse));
        assert_eq!(
            "Vero o Falso".parse::<QuestionStyle>(),
            Ok(QuestionStyle::TrueFalse)
        );
        assert_eq!(
            "dates_and_numbers".parse::<QuestionStyle>(),
            Ok(QuestionStyle::DatesAndNumbers)
        );
        assert_eq!("".parse::<QuestionStyle>(), Ok(QuestionStyle::None));
        assert!("haiku".parse::<QuestionStyle>().is_err());
    }

    #[test]
    fn style_labels_round_trip() {
        for style in QuestionStyle::ALL {
            assert_eq!(style.label().parse::<QuestionStyle>(), Ok(style));
        }
    }

    #[test]
    fn question_count_parsing() {
        assert_eq!(parse_question_count(""), Ok(DEFAULT_QUESTION_COUNT));
        assert_eq!(parse_question_count(" 25 "), Ok(25));
        assert_eq!(parse_question_count("1"), Ok(1));
        assert_eq!(parse_question_count("100"), Ok(100));
        assert_eq!(
            parse_question_count("0"),
            Err(ValidationError::QuestionCountOutOfRange(0))
        );
        assert_eq!(
            parse_question_count("101"),
            Err(ValidationError::QuestionCountOutOfRange(101))
        );
        assert_eq!(
            parse_question_count("ten"),
            Err(ValidationError::InvalidQuestionCount("ten".into()))
        );
    }
}
