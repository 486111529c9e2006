//! System clipboard access

use anyhow::Context;
use tracing::debug;

/// Destination for the copy control
pub trait Clipboard {
    /// Replace the clipboard contents with `text`
    fn set_text(&mut self, text: &str) -> anyhow::Result<()>;
}

/// The desktop clipboard, opened on first use.
///
/// The handle is kept open afterwards: on X11 and Wayland the copied text is
/// only served while it is alive.
#[derive(Default)]
pub struct SystemClipboard {
    /// Opened on first use
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    /// Create a clipboard that connects lazily
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: &str) -> anyhow::Result<()> {
        let mut clipboard = match self.inner.take() {
            Some(clipboard) => clipboard,
            None => arboard::Clipboard::new().context("clipboard unavailable")?,
        };
        let written = clipboard
            .set_text(text.to_owned())
            .context("failed to write clipboard");
        self.inner = Some(clipboard);
        written?;
        debug!("Copied {} chars to clipboard", text.chars().count());
        Ok(())
    }
}

/// Clipboard kept in memory, for tests
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemoryClipboard {
    /// Last text set
    contents: Option<String>,
}

#[cfg(test)]
impl MemoryClipboard {
    /// Last text set, if any
    pub(crate) fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }
}

#[cfg(test)]
impl Clipboard for MemoryClipboard {
    fn set_text(&mut self, text: &str) -> anyhow::Result<()> {
        self.contents = Some(text.to_string());
        Ok(())
    }
}
