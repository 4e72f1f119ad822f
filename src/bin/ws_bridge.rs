//! WebSocket-to-stdio bridge.
//!
//! Lets browser clients talk to a line-oriented subprocess (such as
//! `tandem acp`) over a WebSocket. Each connection spawns its own child
//! from the command line given on the bridge's own argv; WebSocket text
//! messages become stdin lines, and every child stdout/stderr line comes
//! back as a small JSON envelope tagged `stdout` or `stderr`.

use anyhow::{bail, Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cmd_args: Vec<String> = std::env::args().skip(1).collect();
    if cmd_args.is_empty() {
        bail!("usage: ws_bridge <command> [args...]");
    }

    let listener = TcpListener::bind("127.0.0.1:8080")
        .await
        .context("failed to bind :8080")?;
    println!("WebSocket server running on ws://localhost:8080");

    loop {
        let (stream, peer) = listener.accept().await?;
        info!(%peer, "client connected");
        let cmd_args = cmd_args.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, &cmd_args).await {
                error!(%peer, error = %e, "connection closed with error");
            }
        });
    }
}

async fn handle_connection(stream: TcpStream, cmd_args: &[String]) -> Result<()> {
    let ws = tokio_tungstenite::accept_async(stream)
        .await
        .context("websocket handshake failed")?;
    let (mut ws_tx, mut ws_rx) = ws.split();

    let mut child = Command::new(&cmd_args[0])
        .args(&cmd_args[1..])
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn {}", cmd_args[0]))?;

    let mut stdin = child.stdin.take().context("child stdin unavailable")?;
    let stdout = child.stdout.take().context("child stdout unavailable")?;
    let stderr = child.stderr.take().context("child stderr unavailable")?;

    // Both pipe readers funnel into one channel so writes to the socket
    // stay serialized.
    let (tx, mut rx) = mpsc::channel::<String>(64);
    tokio::spawn(pump_lines(stdout, "stdout", tx.clone()));
    tokio::spawn(pump_lines(stderr, "stderr", tx));

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                match outbound {
                    Some(line) => ws_tx.send(WsMessage::text(line)).await?,
                    // Both pipes closed: the child is gone.
                    None => break,
                }
            }
            inbound = ws_rx.next() => {
                match inbound {
                    Some(Ok(WsMessage::Text(text))) => {
                        stdin.write_all(text.as_bytes()).await?;
                        stdin.write_all(b"\n").await?;
                        stdin.flush().await?;
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {} // binary/ping/pong ignored
                    Some(Err(e)) => {
                        warn!(error = %e, "websocket read error");
                        break;
                    }
                }
            }
        }
    }

    if let Err(e) = child.kill().await {
        warn!(error = %e, "failed to kill child process");
    }
    Ok(())
}

/// Forward each line from a child pipe as a tagged JSON envelope.
async fn pump_lines<R: AsyncRead + Unpin>(pipe: R, kind: &'static str, tx: mpsc::Sender<String>) {
    let mut lines = BufReader::new(pipe).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let envelope = json!({ "type": kind, "data": line }).to_string();
        if tx.send(envelope).await.is_err() {
            return;
        }
    }
}
