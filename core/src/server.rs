use std::{fmt, future::Future, sync::Arc};

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    signal::unix::{SignalKind, signal},
    sync::mpsc,
    task::JoinSet,
};

use crate::{
    protocol::{
        ClientMessage, ServerMessage, encode_server_message, parse_client_message,
        recover_request_id,
    },
    tools::ToolRegistry,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    ExitMessage,
    EndOfInput,
    Signal(&'static str),
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExitMessage => write!(f, "received exit message"),
            Self::EndOfInput => write!(f, "stdin closed"),
            Self::Signal(name) => write!(f, "received {name}"),
        }
    }
}

/// Serves the tool protocol on stdin/stdout until a signal, EOF or `exit`.
pub async fn run(registry: Arc<ToolRegistry>) -> Result<ExitReason> {
    let mut sigint =
        signal(SignalKind::interrupt()).context("unable to listen for SIGINT (Ctrl+C)")?;
    let mut sigterm = signal(SignalKind::terminate()).context("unable to listen for SIGTERM")?;
    let shutdown = async move {
        tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        }
    };

    tracing::info!(target: "server", tools = registry.len(), "server_listening_on_stdio");
    serve(registry, tokio::io::stdin(), tokio::io::stdout(), shutdown).await
}

pub async fn serve<R, W, S>(
    registry: Arc<ToolRegistry>,
    reader: R,
    writer: W,
    shutdown: S,
) -> Result<ExitReason>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
    S: Future<Output = &'static str>,
{
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<ServerMessage>();
    let writer_task = tokio::spawn(write_messages(writer, outbound_rx));
    let mut lines = BufReader::new(reader).lines();
    let mut calls = JoinSet::new();
    tokio::pin!(shutdown);

    let exit_reason = loop {
        tokio::select! {
            signal_name = &mut shutdown => break ExitReason::Signal(signal_name),
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read request line")? else {
                    break ExitReason::EndOfInput;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match parse_client_message(line) {
                    Ok(ClientMessage::Exit) => break ExitReason::ExitMessage,
                    Ok(ClientMessage::ListTools { id }) => {
                        let _ = outbound_tx.send(ServerMessage::Tools {
                            id,
                            tools: registry.descriptors(),
                        });
                    }
                    Ok(ClientMessage::CallTool { id, name, arguments }) => {
                        let registry = Arc::clone(&registry);
                        let outbound_tx = outbound_tx.clone();
                        calls.spawn(async move {
                            let message = run_call(registry, id, name, arguments).await;
                            let _ = outbound_tx.send(message);
                        });
                    }
                    Err(err) => {
                        tracing::warn!(target: "server", error = %err, "invalid_protocol_message");
                        let _ = outbound_tx.send(ServerMessage::Error {
                            id: recover_request_id(line),
                            message: format!("invalid protocol message: {err}"),
                        });
                    }
                }
            }
            Some(joined) = calls.join_next(), if !calls.is_empty() => {
                if let Err(err) = joined {
                    tracing::error!(target: "server", error = %err, "tool_call_task_failed");
                }
            }
        }
    };

    tracing::info!(
        target: "server",
        reason = %exit_reason,
        in_flight = calls.len(),
        "server_draining"
    );
    while let Some(joined) = calls.join_next().await {
        if let Err(err) = joined {
            tracing::error!(target: "server", error = %err, "tool_call_task_failed");
        }
    }

    drop(outbound_tx);
    writer_task.await.context("response writer task join failed")??;
    Ok(exit_reason)
}

/// Runs one call on its own task so a panicking handler still gets an error reply.
async fn run_call(
    registry: Arc<ToolRegistry>,
    id: Value,
    name: String,
    arguments: Value,
) -> ServerMessage {
    let tool = name.clone();
    match tokio::spawn(async move { registry.call(&name, arguments).await }).await {
        Ok(result) => ServerMessage::ToolResult { id, result },
        Err(err) => {
            tracing::error!(
                target: "server",
                tool = %tool,
                error = %err,
                "tool_call_task_failed"
            );
            ServerMessage::Error {
                id: Some(id),
                message: format!("tool {tool} failed: {err}"),
            }
        }
    }
}

async fn write_messages<W>(
    mut writer: W,
    mut outbound_rx: mpsc::UnboundedReceiver<ServerMessage>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = outbound_rx.recv().await {
        let mut line = encode_server_message(&message).context("failed to encode response")?;
        line.push('\n');
        writer
            .write_all(line.as_bytes())
            .await
            .context("failed to write response")?;
        writer.flush().await.context("failed to flush response")?;
    }
    Ok(())
}
