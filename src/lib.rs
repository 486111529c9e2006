//! Japanese to English translator - streaming Gemini client and interactive
//! shells
//!
//! This library sends Japanese text to the Gemini API and relays the English
//! translation fragment by fragment, either into a terminal window or to
//! stdout.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

pub mod cli;
pub mod core;
pub mod shell;

// Re-export key types for convenience
pub use self::core::{
    client::{TranslationStream, Translator},
    config::TranslatorConfig,
    errors::TranslationError,
    models::{StreamEvent, TranslationRequest},
    transport::{GeminiTransport, StreamTransport},
};

pub use shell::{
    controller::ShellController,
    state::{Phase, ShellEvent, ShellState},
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
