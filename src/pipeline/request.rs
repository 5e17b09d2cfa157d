//! Prompt assembly: validated parameters → chat-completion request body.
//!
//! ## Message Layout
//!
//! The request contains (in order):
//! 1. **System message** — plain-text tutor persona ([`SYSTEM_PROMPT`])
//! 2. **User message** — a list of parts:
//!    - exactly one `text` part: style instructions + merged study text
//!    - one `image_url` part per image source, in selection order
//!
//! The order is load-bearing: the text part carries the format contract the
//! reply is split on, and the provider reasons over the images in the order
//! they were added.

use crate::config::{check_question_count, GenerationConfig, QuestionStyle, DEFAULT_MODEL};
use crate::error::{QuizError, ValidationError};
use crate::pipeline::input::SourceDocument;
use crate::prompts::{self, SYSTEM_PROMPT};
use serde::Serialize;
use tracing::debug;

/// Separator placed between the texts of consecutive PDFs.
pub const TEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Marker appended when the merged text was clipped.
pub const MERGED_TRUNCATION_MARKER: &str = "\n...[troncato]...";

/// Parameters for one generation, validated on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    model: String,
    question_count: u32,
    style: QuestionStyle,
    sources: Vec<SourceDocument>,
}

impl GenerationRequest {
    /// Validate and build.
    ///
    /// # Errors
    /// [`ValidationError::QuestionCountOutOfRange`] when `question_count` is
    /// outside `1..=100`; [`ValidationError::NoSources`] when `sources` is empty.
    pub fn new(
        model: impl AsRef<str>,
        question_count: i64,
        style: QuestionStyle,
        sources: Vec<SourceDocument>,
    ) -> Result<Self, ValidationError> {
        let question_count = check_question_count(question_count)?;
        if sources.is_empty() {
            return Err(ValidationError::NoSources);
        }
        let model = model.as_ref().trim();
        Ok(Self {
            model: if model.is_empty() {
                DEFAULT_MODEL.to_string()
            } else {
                model.to_string()
            },
            question_count,
            style,
            sources,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    pub fn style(&self) -> QuestionStyle {
        self.style
    }

    pub fn sources(&self) -> &[SourceDocument] {
        &self.sources
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

/// Chat-completion request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Content,
}

/// Message content: a bare string or a list of typed parts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Content {
    PlainText(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageRef },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    pub url: String,
}

impl ChatRequest {
    /// The single text part of the user message, if present.
    pub fn user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::User)
            .and_then(|m| match &m.content {
                Content::Parts(parts) => parts.iter().find_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                }),
                Content::PlainText(t) => Some(t.as_str()),
            })
    }

    /// Number of image parts in the user message.
    pub fn image_count(&self) -> usize {
        self.messages
            .iter()
            .filter_map(|m| match &m.content {
                Content::Parts(parts) => Some(
                    parts
                        .iter()
                        .filter(|p| matches!(p, ContentPart::ImageUrl { .. }))
                        .count(),
                ),
                Content::PlainText(_) => None,
            })
            .sum()
    }
}

// ── Builder ──────────────────────────────────────────────────────────────

/// Join all text sources in order and clamp the result once.
///
/// Returns an empty string when there are no text sources.
pub fn merge_texts(sources: &[SourceDocument], cap: usize) -> String {
    let texts: Vec<&str> = sources
        .iter()
        .filter_map(|s| match s {
            SourceDocument::Text { content } => Some(content.as_str()),
            SourceDocument::Image { .. } => None,
        })
        .collect();
    let merged = texts.join(TEXT_SEPARATOR);
    crate::pipeline::extract::clamp_text(&merged, cap, MERGED_TRUNCATION_MARKER)
}

/// Assemble the provider request for `request`.
pub fn build_chat_request(request: &GenerationRequest, config: &GenerationConfig) -> ChatRequest {
    let merged = merge_texts(&request.sources, config.max_text_chars);

    let mut text = prompts::instructions(request.style, request.question_count);
    if !merged.trim().is_empty() {
        text.push_str(prompts::MATERIAL_LABEL);
        text.push_str(&merged);
    }

    let mut parts = Vec::with_capacity(1 + request.sources.len());
    parts.push(ContentPart::Text { text });
    parts.extend(request.sources.iter().filter_map(|s| match s {
        SourceDocument::Image { data_url } => Some(ContentPart::ImageUrl {
            image_url: ImageRef {
                url: data_url.clone(),
            },
        }),
        SourceDocument::Text { .. } => None,
    }));

    debug!(
        "Built request: model={}, style={:?}, n={}, {} parts",
        request.model,
        request.style,
        request.question_count,
        parts.len()
    );

    let system = config
        .system_prompt
        .clone()
        .unwrap_or_else(|| SYSTEM_PROMPT.to_string());

    ChatRequest {
        model: request.model.clone(),
        messages: vec![
            ChatMessage {
                role: Role::System,
                content: Content::PlainText(system),
            },
            ChatMessage {
                role: Role::User,
                content: Content::Parts(parts),
            },
        ],
        temperature: config.temperature,
    }
}

/// Serialize `request` to the JSON body sent on the wire.
pub fn to_body(request: &ChatRequest) -> Result<Vec<u8>, QuizError> {
    serde_json::to_vec(request)
        .map_err(|e| QuizError::Internal(format!("Failed to serialise request: {e}")))
}
