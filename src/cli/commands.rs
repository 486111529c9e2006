//! CLI command definitions and handlers

use clap::Subcommand;
use tokio::io::BufReader;
use tokio::runtime::Handle;
use tracing::info;

use crate::core::client::Translator;
use crate::shell::clipboard::SystemClipboard;
use crate::shell::controller::ShellController;
use crate::shell::repl::run_repl;
use crate::shell::window::TranslatorWindow;

/// Commands for the translator
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Open the interactive translator window (default)
    Window,

    /// Translate line by line from stdin, streaming to stdout
    Repl,
}

/// Handle window command
pub async fn handle_window(translator: Translator) -> anyhow::Result<()> {
    info!("Starting window with model {}", translator.model());

    let runtime = Handle::current();
    // The UI loop blocks on terminal input, so it gets a thread of its own.
    tokio::task::spawn_blocking(move || {
        let controller = ShellController::new(translator, runtime);
        TranslatorWindow::new(controller, SystemClipboard::new()).run()
    })
    .await??;

    Ok(())
}

/// Handle repl command
pub async fn handle_repl(translator: Translator) -> anyhow::Result<()> {
    info!("Starting REPL with model {}", translator.model());

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    run_repl(&translator, stdin, &mut stdout).await
}
