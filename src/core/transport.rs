//! Remote transport that turns one generation call into a stream of text
//! fragments.
//!
//! [`GeminiTransport`] talks to the Generative Language API's
//! `streamGenerateContent` endpoint over Server-Sent Events. Tests substitute
//! an in-memory transport through the [`StreamTransport`] trait.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::config::TranslatorConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::GenerationCall;

/// Fragments as they arrive from the remote service
pub type FragmentStream = BoxStream<'static, Result<String>>;

/// A remote source of streamed text
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Issue one call and return its fragments in arrival order.
    ///
    /// Errors before the first byte arrives are returned directly; errors
    /// after that are yielded as the last item of the stream.
    async fn open_stream(&self, call: &GenerationCall) -> Result<FragmentStream>;
}

/// Finish reasons that mean the model refused to produce text
const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

/// Streaming client for the Gemini API
#[derive(Clone)]
pub struct GeminiTransport {
    /// Pooled HTTP client
    client: reqwest::Client,
    /// Base URL up to the API version
    api_endpoint: String,
    /// Sent as `x-goog-api-key`
    api_key: String,
}

impl GeminiTransport {
    /// Create a transport for the given endpoint and key
    pub fn new(api_endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        // No overall timeout: a translation streams until the service ends it.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .build()?;

        Ok(Self {
            client,
            api_endpoint: api_endpoint.into(),
            api_key: api_key.into(),
        })
    }

    /// Create from translator configuration
    pub fn from_config(config: &TranslatorConfig) -> Result<Self> {
        Self::new(config.api_endpoint.clone(), config.api_key.clone())
    }

    /// SSE streaming URL for `model`
    fn stream_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.api_endpoint.trim_end_matches('/'),
            model
        )
    }
}

#[async_trait]
impl StreamTransport for GeminiTransport {
    async fn open_stream(&self, call: &GenerationCall) -> Result<FragmentStream> {
        let url = self.stream_url(&call.model);
        debug!("Opening stream to {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&GenerateContentRequest::from(call))
            .send()
            .await
            .map_err(|e| TranslationError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Gemini rejected request with status {}", status);
            return Err(TranslationError::ApiError {
                status: status.as_u16(),
                message: extract_error_message(&error_text),
            });
        }

        let fragments = response
            .bytes_stream()
            .eventsource()
            .filter_map(|event| {
                let item = match event {
                    Ok(event) => parse_event_data(&event.data).transpose(),
                    Err(e) => Some(Err(TranslationError::NetworkError {
                        message: e.to_string(),
                    })),
                };
                futures::future::ready(item)
            });

        Ok(fragments.boxed())
    }
}

/// Extract the text carried by one SSE `data` payload.
///
/// Returns `Ok(None)` for payloads without text, such as the final chunk that
/// only carries a finish reason or usage metadata.
pub(crate) fn parse_event_data(data: &str) -> Result<Option<String>> {
    let data = data.trim();
    if data.is_empty() {
        return Ok(None);
    }

    let chunk: GenerateContentResponse = serde_json::from_str(data).map_err(|e| {
        TranslationError::invalid_response(format!("malformed stream chunk: {}", e))
    })?;

    if let Some(error) = chunk.error {
        return Err(TranslationError::RemoteError {
            code: error.code,
            status: error.status,
            message: error.message,
        });
    }

    if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(TranslationError::BlockedError { reason });
    }

    let Some(candidate) = chunk.candidates.into_iter().next() else {
        return Ok(None);
    };

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|part| !part.thought)
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        if let Some(reason) = candidate
            .finish_reason
            .filter(|r| BLOCKING_FINISH_REASONS.contains(&r.as_str()))
        {
            return Err(TranslationError::BlockedError { reason });
        }
        return Ok(None);
    }

    Ok(Some(text))
}

/// Pull the human-readable message out of an error response body
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string())
}

// Gemini API types
/// Body of a `streamGenerateContent` call
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    /// Translator framing
    system_instruction: RequestContent<'a>,
    /// Single user turn with the source text
    contents: Vec<RequestContent<'a>>,
    /// Sampling settings
    generation_config: GenerationConfig,
}

impl<'a> From<&'a GenerationCall> for GenerateContentRequest<'a> {
    fn from(call: &'a GenerationCall) -> Self {
        Self {
            system_instruction: RequestContent {
                role: None,
                parts: vec![RequestPart {
                    text: &call.system_instruction,
                }],
            },
            contents: vec![RequestContent {
                role: Some("user"),
                parts: vec![RequestPart { text: &call.text }],
            }],
            generation_config: GenerationConfig {
                temperature: call.temperature,
            },
        }
    }
}

/// One content block of the request
#[derive(Serialize)]
struct RequestContent<'a> {
    /// `user`, or absent for the system instruction
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    /// Text parts
    parts: Vec<RequestPart<'a>>,
}

/// A text part
#[derive(Serialize)]
struct RequestPart<'a> {
    /// Part text
    text: &'a str,
}

/// Generation settings
#[derive(Serialize)]
struct GenerationConfig {
    /// Sampling temperature
    temperature: f32,
}

/// One streamed response chunk
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    /// Generated candidates; only the first is used
    #[serde(default)]
    candidates: Vec<Candidate>,
    /// Present when the prompt was screened
    prompt_feedback: Option<PromptFeedback>,
    /// Error object sent mid-stream
    error: Option<ErrorBody>,
}

/// A generated candidate
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    /// Generated content, absent on some final chunks
    content: Option<CandidateContent>,
    /// Why generation stopped
    finish_reason: Option<String>,
}

/// Content of a candidate
#[derive(Deserialize)]
struct CandidateContent {
    /// Generated parts
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

/// One generated part
#[derive(Deserialize)]
struct ResponsePart {
    /// Part text
    text: Option<String>,
    /// Reasoning part, not translation output
    #[serde(default)]
    thought: bool,
}

/// Screening result for the prompt
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    /// Set when the prompt was blocked
    block_reason: Option<String>,
}

/// Error response body
#[derive(Deserialize)]
struct ErrorEnvelope {
    /// The error
    error: ErrorBody,
}

/// Error details
#[derive(Deserialize)]
struct ErrorBody {
    /// Numeric code
    #[serde(default)]
    code: i64,
    /// Message
    #[serde(default)]
    message: String,
    /// Symbolic status
    #[serde(default)]
    status: String,
}

/// In-memory transport for tests
#[cfg(test)]
pub(crate) mod stub {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Yields a fixed list of fragments, optionally followed by a failure
    #[derive(Debug, Default)]
    pub(crate) struct StubTransport {
        /// Fragments to yield
        fragments: Vec<String>,
        /// Network failure yielded after the fragments
        failure: Option<String>,
        /// HTTP status and message returned by `open_stream`
        rejection: Option<(u16, String)>,
        /// Number of `open_stream` calls
        calls: AtomicUsize,
        /// Most recent call
        last_call: Mutex<Option<GenerationCall>>,
    }

    impl StubTransport {
        /// Yields `fragments` and ends normally
        pub(crate) fn yielding(fragments: &[&str]) -> Self {
            Self {
                fragments: fragments.iter().map(|f| f.to_string()).collect(),
                ..Default::default()
            }
        }

        /// Yields `fragments`, then a network error with `message`
        pub(crate) fn failing_after(fragments: &[&str], message: &str) -> Self {
            Self {
                failure: Some(message.to_string()),
                ..Self::yielding(fragments)
            }
        }

        /// Fails `open_stream` itself with an HTTP status, before any fragment
        pub(crate) fn rejecting(status: u16, message: &str) -> Self {
            Self {
                rejection: Some((status, message.to_string())),
                ..Default::default()
            }
        }

        /// How many times a stream was opened
        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// The call most recently opened
        pub(crate) fn last_call(&self) -> Option<GenerationCall> {
            self.last_call.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StreamTransport for StubTransport {
        async fn open_stream(&self, call: &GenerationCall) -> Result<FragmentStream> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_call.lock().unwrap() = Some(call.clone());

            if let Some((status, message)) = self.rejection.clone() {
                return Err(TranslationError::ApiError { status, message });
            }

            let failure = self
                .failure
                .clone()
                .map(|message| Err(TranslationError::NetworkError { message }));
            let items: Vec<Result<String>> = self
                .fragments
                .iter()
                .cloned()
                .map(Ok)
                .chain(failure)
                .collect();

            Ok(futures::stream::iter(items).boxed())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_include;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn call(text: &str) -> GenerationCall {
        GenerationCall {
            model: "gemini-2.5-flash-lite".to_string(),
            system_instruction: "Translate.".to_string(),
            temperature: 0.1,
            text: text.to_string(),
        }
    }

    fn sse(chunks: &[&str]) -> String {
        chunks
            .iter()
            .map(|text| {
                let payload = serde_json::json!({
                    "candidates": [{
                        "content": { "role": "model", "parts": [{ "text": text }] }
                    }]
                });
                format!("data: {}\r\n\r\n", payload)
            })
            .collect()
    }

    #[test]
    fn test_parse_text_chunk() {
        let data = r#"{"candidates":[{"content":{"parts":[{"text":"Hello"},{"text":", "}],"role":"model"}}]}"#;
        assert_eq!(parse_event_data(data).unwrap(), Some("Hello, ".to_string()));
    }

    #[test]
    fn test_parse_finish_only_chunk() {
        let data = r#"{"candidates":[{"finishReason":"STOP"}],"usageMetadata":{"totalTokenCount":12}}"#;
        assert_eq!(parse_event_data(data).unwrap(), None);
    }

    #[test]
    fn test_parse_safety_stop_is_error() {
        let data = r#"{"candidates":[{"finishReason":"SAFETY"}]}"#;
        assert!(matches!(
            parse_event_data(data),
            Err(TranslationError::BlockedError { reason }) if reason == "SAFETY"
        ));
    }

    #[test]
    fn test_parse_error_object() {
        let data = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = parse_event_data(data).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Remote error: RESOURCE_EXHAUSTED (429) - Quota exceeded"
        );
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_event_data("{not json"),
            Err(TranslationError::InvalidResponseError { .. })
        ));
    }

    #[test]
    fn test_extract_error_message() {
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
            extract_error_message(body),
            "API key not valid. Please pass a valid API key."
        );
        assert_eq!(extract_error_message(" upstream down "), "upstream down");
    }

    #[tokio::test]
    async fn test_gemini_stream_yields_fragments_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(
                "/v1beta/models/gemini-2.5-flash-lite:streamGenerateContent",
            ))
            .and(query_param("alt", "sse"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse(&["Hello", ", ", "there."])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let transport =
            GeminiTransport::new(format!("{}/v1beta", server.uri()), "test-key").unwrap();
        let fragments: Vec<String> = transport
            .open_stream(&call("こんにちは"))
            .await
            .unwrap()
            .map(|f| f.unwrap())
            .collect()
            .await;

        assert_eq!(fragments, vec!["Hello", ", ", "there."]);

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_json_include!(
            actual: body,
            expected: serde_json::json!({
                "systemInstruction": { "parts": [{ "text": "Translate." }] },
                "contents": [{ "role": "user", "parts": [{ "text": "こんにちは" }] }],
                "generationConfig": { "temperature": 0.1 }
            })
        );
    }

    #[tokio::test]
    async fn test_gemini_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string(
                r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#,
            ))
            .mount(&server)
            .await;

        let transport = GeminiTransport::new(server.uri(), "bad-key").unwrap();
        let err = match transport.open_stream(&call("テスト")).await {
            Ok(_) => panic!("expected the request to be rejected"),
            Err(e) => e,
        };

        assert!(matches!(
            err,
            TranslationError::ApiError { status: 400, ref message } if message == "API key not valid"
        ));
    }

    #[tokio::test]
    async fn test_gemini_error_mid_stream() {
        let server = MockServer::start().await;
        let body = format!(
            "{}data: {}\r\n\r\n",
            sse(&["Par"]),
            r#"{"error":{"code":500,"message":"internal","status":"INTERNAL"}}"#
        );
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let transport = GeminiTransport::new(server.uri(), "test-key").unwrap();
        let items: Vec<Result<String>> = transport
            .open_stream(&call("エラー"))
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "Par");
        assert!(matches!(items[1], Err(TranslationError::RemoteError { code: 500, .. })));
    }
}
