//! Completion client against a real local HTTP server.
//!
//! Each test binds a one-shot server on 127.0.0.1, points the client at it
//! and checks how the exchange is classified.

use lazyq::pipeline::llm::CompletionClient;
use lazyq::pipeline::request::build_chat_request;
use lazyq::{GenerationConfig, GenerationRequest, ProviderCredential, QuestionStyle, QuizError, SourceDocument};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_test::{assert_err, assert_ok};

/// Canned reply for one connection.
struct Reply {
    status: &'static str,
    body: String,
    delay: Duration,
}

impl Reply {
    fn new(status: &'static str, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }
}

/// Serve `reply` to the first connection; resolves to the raw request text.
async fn serve_once(reply: Reply) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/api/v1/chat/completions", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 8192];

        // Headers, then exactly Content-Length bytes of body.
        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let content_length: usize = head
            .lines()
            .find_map(|l| {
                let (k, v) = l.split_once(':')?;
                k.eq_ignore_ascii_case("content-length")
                    .then(|| v.trim().parse().ok())
                    .flatten()
            })
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        tokio::time::sleep(reply.delay).await;
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            reply.status,
            reply.body.len(),
            reply.body
        );
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
        String::from_utf8_lossy(&buf).to_string()
    });

    (url, handle)
}

fn client_for(url: &str, timeout_secs: u64) -> (CompletionClient, GenerationConfig) {
    let config = GenerationConfig::builder()
        .endpoint(url)
        .timeout_secs(timeout_secs)
        .build()
        .unwrap();
    (CompletionClient::from_config(&config).unwrap(), config)
}

fn request() -> GenerationRequest {
    GenerationRequest::new(
        "openai/gpt-4o",
        5,
        QuestionStyle::None,
        vec![SourceDocument::Text {
            content: "La fotosintesi converte la luce in energia chimica.".into(),
        }],
    )
    .unwrap()
}

async fn run(reply: Reply, timeout_secs: u64) -> (Result<String, QuizError>, JoinHandle<String>) {
    let (url, server) = serve_once(reply).await;
    let (client, config) = client_for(&url, timeout_secs);
    let chat = build_chat_request(&request(), &config);
    let result = client
        .complete(&ProviderCredential::new("sk-or-v1-test", ""), &chat)
        .await;
    (result, server)
}

#[tokio::test]
async fn success_returns_content_and_sends_headers() {
    let body = r#"{"id":"gen-1","object":"chat.completion","created":1,
        "choices":[{"index":0,"message":{"role":"assistant","content":"DOMANDE:\n1. Che cos'è?\nRISPOSTE:\n1. Un processo."},"finish_reason":"stop"}]}"#;
    let (result, server) = run(Reply::new("200 OK", body), 5).await;

    let text = assert_ok!(result);
    assert!(text.starts_with("DOMANDE:"));

    let raw = server.await.unwrap();
    let lower = raw.to_ascii_lowercase();
    assert!(raw.starts_with("POST /api/v1/chat/completions"), "{raw}");
    assert!(lower.contains("authorization: bearer sk-or-v1-test"));
    assert!(lower.contains("http-referer: https://local-app/lazyq"));
    assert!(lower.contains("x-title: lazyq"));
    assert!(lower.contains("content-type: application/json"));
    assert!(raw.contains(r#""temperature":0.2"#));
}

#[tokio::test]
async fn unauthorized_with_error_body_is_provider_error() {
    let (result, _server) = run(
        Reply::new("401 Unauthorized", r#"{"error":{"message":"invalid key","type":"auth"}}"#),
        5,
    )
    .await;
    match assert_err!(result) {
        QuizError::Provider { message, kind } => {
            assert_eq!(message, "invalid key");
            assert_eq!(kind, "auth");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn server_error_with_plain_body_is_http_error() {
    let (result, _server) = run(Reply::new("500 Internal Server Error", "upstream exploded"), 5).await;
    match assert_err!(result) {
        QuizError::ProviderHttp { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn malformed_json_is_decode_error() {
    let (result, _server) = run(Reply::new("200 OK", "{\"choices\": [oops"), 5).await;
    match assert_err!(result) {
        QuizError::Decode { raw, .. } => assert_eq!(raw, "{\"choices\": [oops"),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn empty_choices_is_empty_response() {
    let (result, _server) = run(
        Reply::new("200 OK", r#"{"id":"x","object":"chat.completion","created":0,"choices":[]}"#),
        5,
    )
    .await;
    assert!(matches!(assert_err!(result), QuizError::EmptyResponse));
}

#[tokio::test]
async fn slow_server_times_out_as_network_error() {
    let reply = Reply {
        delay: Duration::from_secs(4),
        ..Reply::new("200 OK", "{}")
    };
    let (result, _server) = run(reply, 1).await;
    match assert_err!(result) {
        QuizError::Network { detail } => assert!(detail.contains("timed out"), "{detail}"),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn refused_connection_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/v1/chat/completions", listener.local_addr().unwrap());
    drop(listener);

    let (client, config) = client_for(&url, 5);
    let chat = build_chat_request(&request(), &config);
    let err = client
        .complete(&ProviderCredential::new("k", ""), &chat)
        .await
        .unwrap_err();
    assert!(matches!(err, QuizError::Network { .. }), "{err:?}");
}
