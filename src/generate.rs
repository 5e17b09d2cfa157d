//! Generation entry points.
//!
//! [`generate`] runs one request through build → complete → normalise →
//! split. The `*_from_files` / `*_to_file` variants add source loading and
//! export around it; [`selftest`] is a fixed smoke request used by
//! `lazyq --selftest`.

use crate::config::{GenerationConfig, ProviderCredential, QuestionStyle, DEFAULT_MODEL};
use crate::error::{QuizError, ValidationError};
use crate::output::{write_result, GenerationResult};
use crate::pipeline::input::{load_source, SelectedFile, SourceDocument};
use crate::pipeline::llm::CompletionClient;
use crate::pipeline::postprocess::{normalise_reply, split_reply};
use crate::pipeline::request::{build_chat_request, GenerationRequest};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Study text used by [`selftest`].
pub const SELFTEST_SAMPLE: &str = "Photosynthesis converts light energy to chemical energy in plants. \
Chlorophyll, thylakoid membranes, and the Calvin cycle are key components.";

/// Question count used by [`selftest`].
pub const SELFTEST_QUESTIONS: u32 = 5;

/// Run one generation.
///
/// Validates the credential, builds the request, performs the single HTTP
/// exchange and splits the reply.
///
/// # Errors
/// [`QuizError::Validation`] for a missing key (no request is sent); any
/// provider error from [`CompletionClient::complete`].
pub async fn generate(
    credential: &ProviderCredential,
    request: &GenerationRequest,
    config: &GenerationConfig,
    client: &CompletionClient,
) -> Result<GenerationResult, QuizError> {
    credential.validate()?;
    let start = Instant::now();

    let chat = build_chat_request(request, config);
    let text_chars = chat.user_text().map(|t| t.chars().count()).unwrap_or(0);
    let image_parts = chat.image_count();
    info!(
        "Generating {} {} questions with {} ({} text chars, {} images)",
        request.question_count(),
        request.style(),
        request.model(),
        text_chars,
        image_parts
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_request_start(text_chars, image_parts);
    }

    let reply = match client.complete(credential, &chat).await {
        Ok(reply) => reply,
        Err(e) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_request_error(&e.to_string());
            }
            return Err(e);
        }
    };

    let split = split_reply(&normalise_reply(&reply));
    if split.answers.is_none() {
        warn!("Reply has no answers section");
    }
    let elapsed = start.elapsed();
    if let Some(ref cb) = config.progress_callback {
        cb.on_request_complete(reply.len(), elapsed.as_millis() as u64);
    }
    debug!("Split reply: {} question chars", split.questions.len());

    Ok(GenerationResult {
        questions: split.questions,
        answers: split.answers,
        raw_reply: reply,
        elapsed,
    })
}

/// Load every path in order, stopping at the first failure.
pub async fn load_sources<P: AsRef<Path>>(
    paths: &[P],
    config: &GenerationConfig,
) -> Result<Vec<SelectedFile>, QuizError> {
    let mut loaded = Vec::with_capacity(paths.len());
    for path in paths {
        let selected = load_source(path).await?;
        if let Some(ref cb) = config.progress_callback {
            cb.on_source_loaded(&selected.label);
        }
        loaded.push(selected);
    }
    Ok(loaded)
}

/// Load `paths` and generate `question_count` questions from them.
///
/// Parameters are validated before any file is read, so a bad count or an
/// empty path list never touches the disk or the network.
pub async fn generate_from_files<P: AsRef<Path>>(
    paths: &[P],
    credential: &ProviderCredential,
    question_count: i64,
    style: QuestionStyle,
    config: &GenerationConfig,
) -> Result<GenerationResult, QuizError> {
    credential.validate()?;
    crate::config::check_question_count(question_count)?;
    if paths.is_empty() {
        return Err(ValidationError::NoSources.into());
    }

    let sources: Vec<SourceDocument> = load_sources(paths, config)
        .await?
        .into_iter()
        .map(|s| s.document)
        .collect();
    let request = GenerationRequest::new(&credential.model, question_count, style, sources)?;
    let client = CompletionClient::from_config(config)?;
    generate(credential, &request, config, &client).await
}

/// [`generate_from_files`], then write the export text to `output_path`.
pub async fn generate_to_file<P: AsRef<Path>>(
    paths: &[P],
    output_path: impl AsRef<Path>,
    credential: &ProviderCredential,
    question_count: i64,
    style: QuestionStyle,
    config: &GenerationConfig,
) -> Result<GenerationResult, QuizError> {
    let result = generate_from_files(paths, credential, question_count, style, config).await?;
    write_result(output_path, &result).await?;
    Ok(result)
}

/// The fixed request behind [`selftest`].
///
/// Uses the regular questions-and-answers template so the smoke test also
/// exercises the `RISPOSTE:` split.
pub fn selftest_request() -> Result<GenerationRequest, QuizError> {
    Ok(GenerationRequest::new(
        DEFAULT_MODEL,
        i64::from(SELFTEST_QUESTIONS),
        QuestionStyle::None,
        vec![SourceDocument::Text {
            content: SELFTEST_SAMPLE.to_string(),
        }],
    )?)
}

/// Five standard questions on [`SELFTEST_SAMPLE`] with the default model.
///
/// Returns the result so the caller can print the raw reply.
pub async fn selftest(api_key: &str, config: &GenerationConfig) -> Result<GenerationResult, QuizError> {
    let credential = ProviderCredential::new(api_key, DEFAULT_MODEL);
    let request = selftest_request()?;
    let client = CompletionClient::from_config(config)?;
    generate(&credential, &request, config, &client).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::llm::{ChatTransport, HttpRequest, RawResponse};
    use crate::progress::GenerationProgressCallback;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct ScriptedTransport {
        reply: Result<RawResponse, QuizError>,
        calls: AtomicUsize,
        last_body: Mutex<Option<Vec<u8>>>,
    }

    impl ScriptedTransport {
        fn ok(content: &str) -> Arc<Self> {
            let body = serde_json::json!({
                "id": "gen-1", "object": "chat.completion", "created": 0,
                "choices": [{"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}]
            });
            Arc::new(Self {
                reply: Ok(RawResponse {
                    status: 200,
                    body: body.to_string(),
                }),
                calls: AtomicUsize::new(0),
                last_body: Mutex::new(None),
            })
        }

        fn network() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(QuizError::Network {
                    detail: "request timed out after 90s".into(),
                }),
                calls: AtomicUsize::new(0),
                last_body: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn send(&self, request: HttpRequest) -> Result<RawResponse, QuizError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_body.lock().unwrap() = Some(request.body);
            match &self.reply {
                Ok(r) => Ok(r.clone()),
                Err(QuizError::Network { detail }) => Err(QuizError::Network {
                    detail: detail.clone(),
                }),
                Err(other) => Err(QuizError::Internal(other.to_string())),
            }
        }
    }

    #[derive(Default)]
    struct Events {
        started: AtomicUsize,
        completed: AtomicUsize,
        errors: AtomicUsize,
    }

    impl GenerationProgressCallback for Events {
        fn on_request_start(&self, _text_chars: usize, _image_parts: usize) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }
        fn on_request_complete(&self, _reply_len: usize, _elapsed_ms: u64) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
        fn on_request_error(&self, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn sample_request() -> GenerationRequest {
        GenerationRequest::new(
            "openai/gpt-4o",
            2,
            QuestionStyle::None,
            vec![SourceDocument::Text {
                content: SELFTEST_SAMPLE.into(),
            }],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn success_splits_and_reports_progress() {
        let events = Arc::new(Events::default());
        let config = GenerationConfig::builder()
            .progress_callback(events.clone())
            .build()
            .unwrap();
        let transport = ScriptedTransport::ok("```\nDOMANDE:\n1. A?\n2. B?\nRISPOSTE:\n1. a\n2. b\n```");
        let client = CompletionClient::with_transport(transport.clone(), &config);
        let cred = ProviderCredential::new("sk-test", "");

        let result = generate(&cred, &sample_request(), &config, &client)
            .await
            .unwrap();

        assert_eq!(result.questions, "1. A?\n2. B?");
        assert_eq!(result.answers.as_deref(), Some("1. a\n2. b"));
        assert!(result.raw_reply.starts_with("```"));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(events.started.load(Ordering::SeqCst), 1);
        assert_eq!(events.completed.load(Ordering::SeqCst), 1);
        assert_eq!(events.errors.load(Ordering::SeqCst), 0);

        let body = transport.last_body.lock().unwrap().clone().unwrap();
        let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["model"], "openai/gpt-4o");
    }

    #[test]
    fn selftest_asks_for_questions_and_answers() {
        let request = selftest_request().unwrap();
        assert_eq!(request.model(), DEFAULT_MODEL);
        assert_eq!(request.question_count(), SELFTEST_QUESTIONS);

        let chat = crate::pipeline::request::build_chat_request(&request, &GenerationConfig::default());
        let body = serde_json::to_value(chat).unwrap();
        let user_text = body["messages"][1]["content"][0]["text"].as_str().unwrap();
        assert!(user_text.contains(crate::prompts::ANSWERS_HEADER), "{user_text}");
        assert!(user_text.contains(SELFTEST_SAMPLE));
    }

    #[tokio::test]
    async fn reply_without_marker_has_no_answers() {
        let config = GenerationConfig::default();
        let client = CompletionClient::with_transport(ScriptedTransport::ok("1. A?"), &config);
        let result = generate(
            &ProviderCredential::new("k", ""),
            &sample_request(),
            &config,
            &client,
        )
        .await
        .unwrap();
        assert_eq!(result.questions, "1. A?");
        assert_eq!(result.answers_or_placeholder(), crate::output::ANSWERS_UNAVAILABLE);
    }

    #[tokio::test]
    async fn network_failure_reports_error_event() {
        let events = Arc::new(Events::default());
        let config = GenerationConfig::builder()
            .progress_callback(events.clone())
            .build()
            .unwrap();
        let client = CompletionClient::with_transport(ScriptedTransport::network(), &config);

        let err = generate(
            &ProviderCredential::new("k", ""),
            &sample_request(),
            &config,
            &client,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, QuizError::Network { .. }));
        assert_eq!(events.errors.load(Ordering::SeqCst), 1);
        assert_eq!(events.completed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn from_files_validates_before_reading() {
        let config = GenerationConfig::default();
        let cred = ProviderCredential::new("k", "");

        let err = generate_from_files(&["/missing.pdf"], &cred, 0, QuestionStyle::None, &config)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            QuizError::Validation(ValidationError::QuestionCountOutOfRange(0))
        ));

        let none: [&str; 0] = [];
        let err = generate_from_files(&none, &cred, 10, QuestionStyle::None, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, QuizError::Validation(ValidationError::NoSources)));

        let err = generate_from_files(
            &["/missing.pdf"],
            &ProviderCredential::new(" ", ""),
            10,
            QuestionStyle::None,
            &config,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, QuizError::Validation(ValidationError::MissingApiKey)));
    }
}
