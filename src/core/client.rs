//! Translation client: one remote call per request, fragments relayed as they
//! arrive

use futures::stream::{BoxStream, Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::core::config::TranslatorConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{GenerationCall, StreamEvent};
use crate::core::transport::{FragmentStream, GeminiTransport, StreamTransport};

/// Japanese to English translation client.
///
/// Holds no per-call state, so one instance can serve any number of
/// sequential requests. Cloning is cheap and shares the transport.
#[derive(Clone)]
pub struct Translator {
    /// Shared remote transport
    transport: Arc<dyn StreamTransport>,
    /// Model identifier sent with every call
    model: String,
    /// Fixed translator framing
    system_instruction: String,
    /// Sampling temperature
    temperature: f32,
}

impl std::fmt::Debug for Translator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Translator")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl Translator {
    /// Create a translator backed by the Gemini API
    pub fn new(config: TranslatorConfig) -> Result<Self> {
        config.validate()?;
        let transport = GeminiTransport::from_config(&config)?;
        Ok(Self::with_transport(&config, Arc::new(transport)))
    }

    /// Create from environment
    pub fn from_env() -> Result<Self> {
        let config = TranslatorConfig::from_env()?;
        Self::new(config)
    }

    /// Create a translator that sends its calls through `transport`
    pub fn with_transport(config: &TranslatorConfig, transport: Arc<dyn StreamTransport>) -> Self {
        Self {
            transport,
            model: config.model.clone(),
            system_instruction: config.system_instruction.clone(),
            temperature: config.temperature,
        }
    }

    /// Model identifier used for every call
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Translate `text`, yielding fragments as the service produces them.
    ///
    /// Nothing happens until the returned stream is polled. Empty text ends
    /// the stream at once without contacting the service.
    pub fn translate(&self, text: &str) -> TranslationStream {
        if text.is_empty() {
            debug!("Empty input, skipping remote call");
            return TranslationStream::finished_immediately();
        }

        let call = GenerationCall {
            model: self.model.clone(),
            system_instruction: self.system_instruction.clone(),
            temperature: self.temperature,
            text: text.to_string(),
        };
        let state = CallState::Pending {
            transport: Arc::clone(&self.transport),
            call,
        };

        TranslationStream {
            inner: futures::stream::unfold(state, CallState::advance).boxed(),
        }
    }

    /// Translate `text` and return the full translation once the stream ends
    pub async fn translate_text(&self, text: &str) -> Result<String> {
        self.translate(text).collect_text().await
    }
}

/// Ordered, finite stream of [`StreamEvent`]s for one translation.
///
/// Yields fragments followed by exactly one terminal event.
pub struct TranslationStream {
    /// Fragments plus the terminal event
    inner: BoxStream<'static, StreamEvent>,
}

impl TranslationStream {
    /// Stream for empty input: a lone zero-fragment `Finished`
    fn finished_immediately() -> Self {
        let done = StreamEvent::Finished {
            elapsed: Duration::ZERO,
            fragments: 0,
        };
        Self {
            inner: futures::stream::iter([done]).boxed(),
        }
    }

    /// Concatenate every fragment, or return the error that ended the stream
    pub async fn collect_text(mut self) -> Result<String> {
        let mut text = String::new();
        while let Some(event) = self.inner.next().await {
            match event {
                StreamEvent::Fragment(fragment) => text.push_str(&fragment),
                StreamEvent::Finished { .. } => break,
                StreamEvent::Failed(err) => return Err(err),
            }
        }
        Ok(text)
    }
}

impl Stream for TranslationStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

/// Progress of a single remote call
enum CallState {
    /// Call not yet opened
    Pending {
        /// Transport to open the call on
        transport: Arc<dyn StreamTransport>,
        /// The call to make
        call: GenerationCall,
    },
    /// Stream open, fragments flowing
    Streaming {
        /// Remaining fragments
        fragments: FragmentStream,
        /// When the call was opened
        started: Instant,
        /// Fragments handed out so far
        delivered: usize,
    },
    /// Terminal event already emitted
    Done,
}

impl CallState {
    /// Produce the next event and the state after it
    async fn advance(self) -> Option<(StreamEvent, CallState)> {
        match self {
            CallState::Pending { transport, call } => {
                let started = Instant::now();
                info!("Translating {} chars with {}", call.text.chars().count(), call.model);
                match transport.open_stream(&call).await {
                    Ok(fragments) => {
                        CallState::next_fragment(fragments, started, 0).await
                    }
                    Err(e) => {
                        warn!("Translation request failed: {}", e);
                        Some((StreamEvent::Failed(e), CallState::Done))
                    }
                }
            }
            CallState::Streaming {
                fragments,
                started,
                delivered,
            } => CallState::next_fragment(fragments, started, delivered).await,
            CallState::Done => None,
        }
    }

    /// Pull one fragment, or finish the stream when the transport is exhausted
    async fn next_fragment(
        mut fragments: FragmentStream,
        started: Instant,
        delivered: usize,
    ) -> Option<(StreamEvent, CallState)> {
        match fragments.next().await {
            Some(Ok(fragment)) => {
                if delivered == 0 {
                    debug!("First fragment after {:.4} sec", started.elapsed().as_secs_f64());
                }
                let next = CallState::Streaming {
                    fragments,
                    started,
                    delivered: delivered + 1,
                };
                Some((StreamEvent::Fragment(fragment), next))
            }
            Some(Err(e)) => {
                warn!("Stream failed after {} fragments: {}", delivered, e);
                Some((StreamEvent::Failed(e), CallState::Done))
            }
            None => {
                let elapsed = started.elapsed();
                debug!("Latency: {:.4} sec", elapsed.as_secs_f64());

                if delivered == 0 {
                    let err = TranslationError::invalid_response("stream ended without any translation text");
                    return Some((StreamEvent::Failed(err), CallState::Done));
                }

                let done = StreamEvent::Finished {
                    elapsed,
                    fragments: delivered,
                };
                Some((done, CallState::Done))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{DEFAULT_MODEL, DEFAULT_TEMPERATURE, SYSTEM_INSTRUCTION};
    use crate::core::transport::stub::StubTransport;

    fn translator(transport: Arc<StubTransport>) -> Translator {
        Translator::with_transport(&TranslatorConfig::new("test_key"), transport)
    }

    #[tokio::test]
    async fn test_fragments_concatenate_to_translation() {
        let transport = Arc::new(StubTransport::yielding(&["Hello", ", ", "there."]));
        let translator = translator(transport.clone());

        let text = translator.translate_text("こんにちは").await.unwrap();

        assert_eq!(text, "Hello, there.");
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_fragments_keep_transport_order() {
        let transport = Arc::new(StubTransport::yielding(&["c", "a", "b"]));
        let events: Vec<StreamEvent> = translator(transport).translate("順番").collect().await;

        let fragments: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Fragment(f) => Some(f.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(fragments, vec!["c", "a", "b"]);
        assert!(matches!(
            events.last(),
            Some(StreamEvent::Finished { fragments: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_input_skips_transport() {
        let transport = Arc::new(StubTransport::yielding(&["unused"]));
        let events: Vec<StreamEvent> = translator(transport.clone()).translate("").collect().await;

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], StreamEvent::Finished { fragments: 0, .. }));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_stream_is_lazy() {
        let transport = Arc::new(StubTransport::yielding(&["Hi"]));
        let stream = translator(transport.clone()).translate("やあ");
        assert_eq!(transport.calls(), 0);

        drop(stream);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_failure_keeps_earlier_fragments() {
        let transport = Arc::new(StubTransport::failing_after(&["Par"], "connection reset"));
        let events: Vec<StreamEvent> = translator(transport).translate("エラー").collect().await;

        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], StreamEvent::Fragment(f) if f == "Par"));
        assert!(matches!(
            &events[1],
            StreamEvent::Failed(TranslationError::NetworkError { message }) if message == "connection reset"
        ));
    }

    #[tokio::test]
    async fn test_rejected_open_yields_single_failure() {
        let transport = Arc::new(StubTransport::rejecting(403, "denied"));
        let events: Vec<StreamEvent> = translator(transport.clone())
            .translate("拒否")
            .collect()
            .await;

        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            StreamEvent::Failed(TranslationError::ApiError { status: 403, message }) if message == "denied"
        ));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_silent_stream_is_an_error() {
        let transport = Arc::new(StubTransport::yielding(&[]));
        let err = translator(transport).translate_text("無言").await.unwrap_err();
        assert!(matches!(err, TranslationError::InvalidResponseError { .. }));
    }

    #[tokio::test]
    async fn test_call_carries_fixed_framing() {
        let transport = Arc::new(StubTransport::yielding(&["Good morning."]));
        translator(transport.clone())
            .translate_text("おはよう")
            .await
            .unwrap();

        let call = transport.last_call().unwrap();
        assert_eq!(call.model, DEFAULT_MODEL);
        assert_eq!(call.system_instruction, SYSTEM_INSTRUCTION);
        assert_eq!(call.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(call.text, "おはよう");
    }

    #[tokio::test]
    async fn test_sequential_requests_are_independent() {
        let transport = Arc::new(StubTransport::failing_after(&["x"], "boom"));
        let translator = translator(transport.clone());

        assert!(translator.translate_text("一").await.is_err());
        assert!(translator.translate_text("二").await.is_err());
        assert_eq!(transport.calls(), 2);
    }

    #[test]
    fn test_translator_rejects_invalid_config() {
        let err = Translator::new(TranslatorConfig::default()).unwrap_err();
        assert!(err.is_configuration());
    }
}
