//! Provider interaction: one POST, one reply, no retries.
//!
//! This module owns the HTTP exchange with the chat-completions endpoint and
//! the mapping of its outcomes to [`QuizError`]. All prompt engineering lives
//! in [`crate::prompts`] and [`crate::pipeline::request`].
//!
//! The exchange itself sits behind [`ChatTransport`] so the outcome mapping
//! can be exercised without a network; [`ReqwestTransport`] is the production
//! implementation.
//!
//! ## Outcome mapping
//!
//! | Outcome | Error |
//! |---------|-------|
//! | DNS / connect / TLS failure, timeout | [`QuizError::Network`] |
//! | JSON body with an `error` object (any status) | [`QuizError::Provider`] |
//! | non-2xx status otherwise | [`QuizError::ProviderHttp`] |
//! | 2xx with a body that is not the expected JSON | [`QuizError::Decode`] |
//! | empty `choices` | [`QuizError::EmptyResponse`] |

use crate::config::{GenerationConfig, ProviderCredential};
use crate::error::QuizError;
use crate::pipeline::request::{to_body, ChatRequest};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Body excerpt kept for non-2xx responses.
pub const HTTP_ERROR_BODY_CHARS: usize = 500;

/// Body excerpt kept when a 2xx body fails to decode.
pub const DECODE_ERROR_BODY_CHARS: usize = 800;

/// A fully prepared HTTP POST.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and raw body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Sends one prepared request. Implementations must not retry.
///
/// Transport failures (including timeouts) are returned as
/// [`QuizError::Network`]; every HTTP status, success or not, is returned as
/// `Ok(RawResponse)`.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<RawResponse, QuizError>;
}

/// [`ChatTransport`] over a `reqwest` client with a whole-request timeout.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl ReqwestTransport {
    pub fn new(timeout_secs: u64) -> Result<Self, QuizError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| QuizError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout_secs,
        })
    }
}

#[async_trait]
impl ChatTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<RawResponse, QuizError> {
        let mut builder = self.client.post(&request.url).body(request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| self.network_error(e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.network_error(e))?;
        Ok(RawResponse { status, body })
    }
}

impl ReqwestTransport {
    fn network_error(&self, e: reqwest::Error) -> QuizError {
        if e.is_timeout() {
            QuizError::Network {
                detail: format!("request timed out after {}s", self.timeout_secs),
            }
        } else {
            QuizError::Network {
                detail: e.to_string(),
            }
        }
    }
}

// ── Response schema ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: ReplyMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReplyMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Map a completed exchange to the reply text or a typed error.
pub fn interpret_response(response: &RawResponse) -> Result<String, QuizError> {
    let parsed: Result<ChatResponse, _> = serde_json::from_str(&response.body);

    if let Ok(ChatResponse {
        error: Some(err), ..
    }) = &parsed
    {
        return Err(QuizError::Provider {
            message: err.message.clone(),
            kind: err.kind.clone(),
        });
    }

    if !(200..300).contains(&response.status) {
        return Err(QuizError::ProviderHttp {
            status: response.status,
            body: excerpt(&response.body, HTTP_ERROR_BODY_CHARS),
        });
    }

    let parsed = parsed.map_err(|e| QuizError::Decode {
        detail: e.to_string(),
        raw: excerpt(&response.body, DECODE_ERROR_BODY_CHARS),
    })?;

    let first = parsed
        .choices
        .into_iter()
        .next()
        .ok_or(QuizError::EmptyResponse)?;

    debug!(
        "Reply {} choice {} finish_reason={:?}",
        parsed.id, first.index, first.finish_reason
    );
    Ok(first.message.content.unwrap_or_default())
}

/// First `max` chars of `s`, marked when clipped.
fn excerpt(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...[truncated]", &s[..idx]),
        None => s.to_string(),
    }
}

// ── Client ───────────────────────────────────────────────────────────────

/// Chat-completion client bound to one endpoint and header set.
#[derive(Clone)]
pub struct CompletionClient {
    transport: Arc<dyn ChatTransport>,
    endpoint: String,
    referer: String,
    app_title: String,
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("transport", &"<dyn ChatTransport>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl CompletionClient {
    /// Production client: `reqwest` with the configured timeout.
    pub fn from_config(config: &GenerationConfig) -> Result<Self, QuizError> {
        let transport = ReqwestTransport::new(config.timeout_secs)?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    /// Client over a caller-supplied transport (tests, custom middleware).
    pub fn with_transport(transport: Arc<dyn ChatTransport>, config: &GenerationConfig) -> Self {
        Self {
            transport,
            endpoint: config.endpoint.clone(),
            referer: config.referer.clone(),
            app_title: config.app_title.clone(),
        }
    }

    /// Prepare the POST for `request` without sending it.
    pub fn prepare(
        &self,
        credential: &ProviderCredential,
        request: &ChatRequest,
    ) -> Result<HttpRequest, QuizError> {
        Ok(HttpRequest {
            url: self.endpoint.clone(),
            headers: vec![
                ("Content-Type".into(), "application/json".into()),
                (
                    "Authorization".into(),
                    format!("Bearer {}", credential.api_key),
                ),
                ("HTTP-Referer".into(), self.referer.clone()),
                ("X-Title".into(), self.app_title.clone()),
            ],
            body: to_body(request)?,
        })
    }

    /// Send `request` once and return the first choice's text verbatim.
    pub async fn complete(
        &self,
        credential: &ProviderCredential,
        request: &ChatRequest,
    ) -> Result<String, QuizError> {
        credential.validate()?;
        let http = self.prepare(credential, request)?;
        let start = Instant::now();
        info!(
            "POST {} (model {}, {} bytes)",
            self.endpoint,
            request.model,
            http.body.len()
        );

        let result = self
            .transport
            .send(http)
            .await
            .and_then(|raw| {
                debug!("HTTP {} with {} bytes", raw.status, raw.body.len());
                interpret_response(&raw)
            });

        match &result {
            Ok(text) => info!(
                "Reply received: {} chars in {}ms",
                text.chars().count(),
                start.elapsed().as_millis()
            ),
            Err(e) => warn!("Request failed after {}ms: {}", start.elapsed().as_millis(), e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::pipeline::request::{ChatMessage, Content, Role};
    use std::sync::Mutex;

    fn raw(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn success_returns_first_choice_verbatim() {
        let body = r#"{"id":"gen-1","object":"chat.completion","created":1,
            "choices":[{"index":0,"message":{"role":"assistant","content":"  DOMANDE:\n1. A?  "},"finish_reason":"stop"},
                       {"index":1,"message":{"role":"assistant","content":"second"},"finish_reason":"stop"}]}"#;
        assert_eq!(interpret_response(&raw(200, body)).unwrap(), "  DOMANDE:\n1. A?  ");
    }

    #[test]
    fn error_object_wins_over_status() {
        let body = r#"{"error":{"message":"invalid key","type":"auth"}}"#;
        for status in [200, 401, 500] {
            match interpret_response(&raw(status, body)).unwrap_err() {
                QuizError::Provider { message, kind } => {
                    assert_eq!(message, "invalid key");
                    assert_eq!(kind, "auth");
                }
                other => panic!("status {status}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn non_2xx_without_error_object_is_http_error() {
        let body = "<html>".to_string() + &"x".repeat(2_000);
        match interpret_response(&raw(502, &body)).unwrap_err() {
            QuizError::ProviderHttp { status, body } => {
                assert_eq!(status, 502);
                assert!(body.starts_with("<html>"));
                assert!(body.ends_with("...[truncated]"));
                assert_eq!(
                    body.chars().count(),
                    HTTP_ERROR_BODY_CHARS + "...[truncated]".len()
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn malformed_2xx_is_decode_error_with_raw_body() {
        match interpret_response(&raw(200, "not json at all")).unwrap_err() {
            QuizError::Decode { raw, .. } => assert_eq!(raw, "not json at all"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_choices_is_empty_response() {
        let body = r#"{"id":"x","object":"chat.completion","created":0,"choices":[]}"#;
        assert!(matches!(
            interpret_response(&raw(200, body)).unwrap_err(),
            QuizError::EmptyResponse
        ));
    }

    #[test]
    fn null_content_is_empty_text() {
        let body = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":null}}]}"#;
        assert_eq!(interpret_response(&raw(200, body)).unwrap(), "");
    }

    // ── Client over a recording transport ────────────────────────────────

    struct RecordingTransport {
        reply: RawResponse,
        seen: Mutex<Vec<HttpRequest>>,
    }

    #[async_trait]
    impl ChatTransport for RecordingTransport {
        async fn send(&self, request: HttpRequest) -> Result<RawResponse, QuizError> {
            self.seen.lock().unwrap().push(request);
            Ok(self.reply.clone())
        }
    }

    fn tiny_request() -> ChatRequest {
        ChatRequest {
            model: "openai/gpt-4o".into(),
            messages: vec![ChatMessage {
                role: Role::System,
                content: Content::PlainText("hi".into()),
            }],
            temperature: 0.2,
        }
    }

    #[tokio::test]
    async fn sends_auth_and_attribution_headers() {
        let transport = Arc::new(RecordingTransport {
            reply: raw(
                200,
                r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"ok"}}]}"#,
            ),
            seen: Mutex::new(Vec::new()),
        });
        let client = CompletionClient::with_transport(transport.clone(), &GenerationConfig::default());
        let cred = ProviderCredential::new("sk-or-v1-test", "");

        let text = client.complete(&cred, &tiny_request()).await.unwrap();
        assert_eq!(text, "ok");

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let req = &seen[0];
        assert_eq!(req.url, crate::config::OPENROUTER_URL);
        assert_eq!(req.header("authorization"), Some("Bearer sk-or-v1-test"));
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("HTTP-Referer"), Some(crate::config::REFERER_HEADER));
        assert_eq!(req.header("X-Title"), Some(crate::config::TITLE_HEADER));
    }

    #[tokio::test]
    async fn missing_key_never_reaches_transport() {
        let transport = Arc::new(RecordingTransport {
            reply: raw(200, "{}"),
            seen: Mutex::new(Vec::new()),
        });
        let client = CompletionClient::with_transport(transport.clone(), &GenerationConfig::default());
        let err = client
            .complete(&ProviderCredential::new("", ""), &tiny_request())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            QuizError::Validation(ValidationError::MissingApiKey)
        ));
        assert!(transport.seen.lock().unwrap().is_empty());
    }
}
