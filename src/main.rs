//! Main entry point for the Japanese to English translator

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ja_en_translator::cli::commands::{self, Commands};
use ja_en_translator::{Translator, TranslatorConfig};

/// Streams English translations of Japanese text from Gemini
#[derive(Parser, Debug)]
#[command(name = "ja-en-translator", version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Shell to start; defaults to the window
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Install the tracing subscriber, writing to stderr
fn init_logging(verbose: bool, command: Commands) {
    let explicit = std::env::var("RUST_LOG").is_ok();

    // Log lines would tear the terminal UI apart unless asked for.
    if command == Commands::Window && !explicit && !verbose {
        return;
    }

    let log_level = if verbose { "debug" } else { "info" };
    let crate_target = env!("CARGO_PKG_NAME").replace('-', "_");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}={}", crate_target, log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();
    let command = args.command.unwrap_or(Commands::Window);
    init_logging(args.verbose, command);

    // Fails before any window or loop is shown when the key is missing.
    // The key is read from GEMINI_API_KEY (or .env) only, never from argv.
    let config = TranslatorConfig::from_env()?;
    let translator = Translator::new(config)?;
    debug!("Translator ready: {:?}", translator);

    match command {
        Commands::Window => commands::handle_window(translator).await?,
        Commands::Repl => commands::handle_repl(translator).await?,
    }

    Ok(())
}
