//! Display state of the interactive shell and its per-request state machine.
//!
//! Only the UI thread owns a [`ShellState`]. Workers describe what happened
//! with [`ShellEvent`]s and the UI loop applies them here.

use std::time::{Duration, Instant};
use tracing::debug;

use crate::core::models::TranslationRequest;
use crate::shell::clipboard::Clipboard;

/// Default label of the submit control
pub const TRANSLATE_LABEL: &str = "Translate";

/// Submit control label while a request is in flight
pub const TRANSLATING_LABEL: &str = "Translating...";

/// Default label of the copy control
pub const COPY_LABEL: &str = "Copy to Clipboard";

/// Copy control label shown right after a copy
pub const COPIED_LABEL: &str = "Copied!";

/// How long the copy confirmation stays visible
pub const COPY_FEEDBACK: Duration = Duration::from_secs(2);

/// Prefix of the synthetic fragment rendered for a failed request
pub const ERROR_TAG: &str = "[Error]";

/// Where the shell is in the lifecycle of the current request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Ready for a new submission
    Idle,
    /// Worker started, no fragment yet
    Submitting,
    /// At least one fragment has arrived
    Streaming,
    /// The request failed; waiting for the worker to finish
    Failed,
}

/// Message from a translation worker to the UI loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
    /// Translated text to append
    Fragment(String),
    /// The request failed with this message
    Failed(String),
    /// The worker is done; always the last event of a request
    Completed,
}

/// UI-thread state: output text, control labels, request phase
#[derive(Debug)]
pub struct ShellState {
    /// Where the current request stands
    phase: Phase,
    /// Text shown in the output area
    output: String,
    /// Show the copy confirmation until then
    copied_until: Option<Instant>,
}

impl Default for ShellState {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellState {
    /// Create an idle shell with empty output
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            output: String::new(),
            copied_until: None,
        }
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Full output-area text
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Whether the submit control accepts input
    pub fn submit_enabled(&self) -> bool {
        self.phase == Phase::Idle
    }

    /// Label of the submit control
    pub fn submit_label(&self) -> &'static str {
        if self.submit_enabled() {
            TRANSLATE_LABEL
        } else {
            TRANSLATING_LABEL
        }
    }

    /// Label of the copy control at `now`
    pub fn copy_label(&self, now: Instant) -> &'static str {
        match self.copied_until {
            Some(until) if now < until => COPIED_LABEL,
            _ => COPY_LABEL,
        }
    }

    /// Start a request for `input`.
    ///
    /// Returns `None` and changes nothing when the input is blank or a
    /// request is already in flight. Otherwise clears the output and moves to
    /// [`Phase::Submitting`].
    pub fn begin_submission(&mut self, input: &str) -> Option<TranslationRequest> {
        let text = input.trim();
        if text.is_empty() || !self.submit_enabled() {
            return None;
        }

        self.phase = Phase::Submitting;
        self.output.clear();
        Some(TranslationRequest::new(text))
    }

    /// Apply one worker event
    pub fn apply(&mut self, event: ShellEvent) {
        match event {
            ShellEvent::Fragment(fragment) => {
                if self.phase == Phase::Submitting {
                    self.phase = Phase::Streaming;
                }
                self.output.push_str(&fragment);
            }
            ShellEvent::Failed(message) => {
                self.output.push_str(&format!("{} {}", ERROR_TAG, message));
                self.phase = Phase::Failed;
            }
            ShellEvent::Completed => {
                debug!("Request finished in phase {:?}", self.phase);
                self.phase = Phase::Idle;
            }
        }
    }

    /// Copy the whole output to `clipboard` and show the confirmation label
    /// until `now + COPY_FEEDBACK`
    pub fn copy_output(&mut self, clipboard: &mut dyn Clipboard, now: Instant) -> anyhow::Result<()> {
        clipboard.set_text(&self.output)?;
        self.copied_until = Some(now + COPY_FEEDBACK);
        Ok(())
    }
}
