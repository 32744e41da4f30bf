//! The line-delimited stdio transport.
//!
//! One JSON envelope per line on stdin, one response per line on stdout.
//! Intended for local automation; stdio callers bypass the session
//! authorization policy.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::watch;

use crate::dispatch::WcpServer;

/// Serve requests from stdin until it closes or `shutdown` flips.
///
/// # Errors
///
/// Returns the underlying I/O error if stdout becomes unwritable.
pub async fn run_stdio(
    server: Arc<WcpServer>,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    tracing::info!("WCP stdio transport ready");

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
                continue;
            }
        };
        let Some(line) = line else {
            tracing::info!("stdin closed, stdio transport ending");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = server.handle_line(&line, false).await;
        stdout.write_all(response.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    Ok(())
}
