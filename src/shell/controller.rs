//! Runs translations off the UI thread and feeds their output back to it

use futures::StreamExt;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::client::Translator;
use crate::core::models::{StreamEvent, TranslationRequest};
use crate::shell::clipboard::Clipboard;
use crate::shell::state::{ShellEvent, ShellState};

/// Glue between the UI loop, the shell state and translation workers.
///
/// Lives on the UI thread. Each accepted submission starts one worker task
/// on the runtime; the worker only talks back through the event channel,
/// which [`ShellController::pump`] drains.
pub struct ShellController {
    /// State owned by the UI thread
    state: ShellState,
    /// Client shared with every worker
    translator: Translator,
    /// Runtime the workers run on
    runtime: Handle,
    /// Handed to each worker
    events_tx: UnboundedSender<ShellEvent>,
    /// Drained by `pump`
    events_rx: UnboundedReceiver<ShellEvent>,
    /// Task of the latest submission
    worker: Option<JoinHandle<()>>,
}

impl ShellController {
    /// Create a controller that spawns workers on `runtime`
    pub fn new(translator: Translator, runtime: Handle) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            state: ShellState::new(),
            translator,
            runtime,
            events_tx,
            events_rx,
            worker: None,
        }
    }

    /// Current display state
    pub fn state(&self) -> &ShellState {
        &self.state
    }

    /// Submit `input` for translation.
    ///
    /// Returns whether a worker was started. Blank input and submissions
    /// while a request is in flight are ignored.
    pub fn submit(&mut self, input: &str) -> bool {
        let Some(request) = self.state.begin_submission(input) else {
            return false;
        };

        info!("Submitting {} chars for translation", request.text.chars().count());
        let worker = run_worker(self.translator.clone(), request, self.events_tx.clone());
        self.worker = Some(self.runtime.spawn(worker));
        true
    }

    /// Apply every event the worker has sent so far, in order.
    ///
    /// Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        loop {
            match self.events_rx.try_recv() {
                Ok(event) => {
                    if event == ShellEvent::Completed {
                        self.worker = None;
                    }
                    self.state.apply(event);
                    applied += 1;
                }
                // The controller holds a sender, so the channel never closes
                // while it is alive.
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        applied
    }

    /// Copy the output area to `clipboard`
    pub fn copy(&mut self, clipboard: &mut dyn Clipboard, now: Instant) -> anyhow::Result<()> {
        self.state.copy_output(clipboard, now)
    }

    /// Wait for the current worker, then apply its events
    #[cfg(test)]
    pub(crate) async fn settle(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.await.unwrap();
        }
        self.pump();
    }
}

/// Stream one translation and relay it as shell events.
///
/// Always finishes with [`ShellEvent::Completed`] unless the UI has gone away.
async fn run_worker(
    translator: Translator,
    request: TranslationRequest,
    events: UnboundedSender<ShellEvent>,
) {
    let mut stream = translator.translate(&request.text);

    while let Some(event) = stream.next().await {
        let forwarded = match event {
            StreamEvent::Fragment(fragment) => ShellEvent::Fragment(fragment),
            StreamEvent::Finished { elapsed, fragments } => {
                debug!("Worker relayed {} fragments in {:?}", fragments, elapsed);
                break;
            }
            StreamEvent::Failed(err) => {
                warn!("Translation failed: {}", err);
                ShellEvent::Failed(err.to_string())
            }
        };

        if events.send(forwarded).is_err() {
            debug!("Shell closed, dropping translation");
            return;
        }
    }

    let _ = events.send(ShellEvent::Completed);
}
