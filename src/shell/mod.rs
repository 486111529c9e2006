//! Interactive shells around the translation client.
//!
//! The window variant keeps all display state on one UI thread and runs each
//! request on a single worker task; the REPL variant streams straight to
//! stdout.

pub mod clipboard;
pub mod controller;
pub mod repl;
pub mod state;
pub mod window;
