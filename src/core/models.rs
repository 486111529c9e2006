//! Core data models for translation

use std::time::Duration;

use crate::core::errors::TranslationError;

/// Source text submitted for one translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    /// Japanese source text
    pub text: String,
}

impl TranslationRequest {
    /// Create a new request
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Whether there is anything to translate
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Everything the transport needs for one remote generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationCall {
    /// Model identifier
    pub model: String,
    /// System instruction
    pub system_instruction: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Sole content payload
    pub text: String,
}

/// One item of a translation stream.
///
/// A stream yields any number of `Fragment`s followed by exactly one terminal
/// event, `Finished` or `Failed`.
#[derive(Debug)]
pub enum StreamEvent {
    /// Next piece of translated text
    Fragment(String),
    /// The stream ended normally
    Finished {
        /// Wall-clock time from request start to the final fragment
        elapsed: Duration,
        /// Number of fragments delivered
        fragments: usize,
    },
    /// The stream ended with an error; earlier fragments stay delivered
    Failed(TranslationError),
}
