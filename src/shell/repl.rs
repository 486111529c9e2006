//! Headless line-oriented shell

use futures::StreamExt;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use crate::core::client::Translator;
use crate::core::models::StreamEvent;

/// Prompt shown before each line of input
pub const PROMPT: &str = "Enter Japanese text (q to quit): ";

/// Read lines from `input` and stream each translation to `out` until the
/// user enters `q` (any case) or input ends.
///
/// A failed request is reported on one line and the loop carries on.
pub async fn run_repl<R, W>(translator: &Translator, input: R, out: &mut W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();

    loop {
        write!(out, "{}", PROMPT)?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            debug!("Input closed");
            writeln!(out)?;
            break;
        };

        if line.eq_ignore_ascii_case("q") {
            break;
        }

        translate_line(translator, &line, out).await?;
    }

    Ok(())
}

/// Stream one translation to `out` as it arrives
async fn translate_line<W: Write>(translator: &Translator, line: &str, out: &mut W) -> anyhow::Result<()> {
    let mut stream = translator.translate(line);
    let mut started = false;

    while let Some(event) = stream.next().await {
        match event {
            StreamEvent::Fragment(fragment) => {
                if !started {
                    write!(out, "English: ")?;
                    started = true;
                }
                write!(out, "{}", fragment)?;
                out.flush()?;
            }
            StreamEvent::Finished { .. } => {
                if !started {
                    write!(out, "English: ")?;
                }
                writeln!(out, "\n")?;
            }
            StreamEvent::Failed(err) => {
                if started {
                    writeln!(out)?;
                }
                writeln!(out, "An error occurred: {}", err)?;
            }
        }
    }

    Ok(())
}
