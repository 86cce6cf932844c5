//! Interactive command loop.
//!
//! Reads one command per line from stdin, dispatches it and prints the result
//! envelope as JSON.  `quit` or `exit` (or end of input) ends the loop.

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use deskflow_kernel::Dispatcher;

use crate::helpers::render_envelope;

/// Run the loop on the process stdin and stdout.
pub async fn cmd_run(dispatcher: Dispatcher) -> Result<()> {
    eprintln!("Deskflow ready. Type a command, or 'quit' to exit.");
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    run_loop(&dispatcher, stdin, stdout).await
}

/// Drive the loop over arbitrary input and output streams.
pub async fn run_loop<R, W>(dispatcher: &Dispatcher, input: R, mut output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let command = line.trim();
        if command.is_empty() {
            continue;
        }
        if command.eq_ignore_ascii_case("quit") || command.eq_ignore_ascii_case("exit") {
            break;
        }

        let envelope = dispatcher.dispatch(command).await;
        output
            .write_all(render_envelope(&envelope).as_bytes())
            .await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }
    Ok(())
}
