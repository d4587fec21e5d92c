//! Transports for the MCP client.
//!
//! Messages are newline-delimited JSON (one JSON-RPC message per line):
//! - [`ProcessTransport`]: pipes of a spawned tool server
//! - [`ChannelTransport`]: in-process tokio mpsc channels (for testing)

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;

use crate::mcp::client::ClientError;

/// Reads and writes JSON-RPC messages.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Next message, or `Ok(None)` once the remote side has closed.
    async fn read_message(&mut self) -> Result<Option<String>, ClientError>;

    /// Write one message (framing and flushing included).
    async fn write_message(&mut self, message: &str) -> Result<(), ClientError>;

    /// Flush and release the write side.
    async fn close(&mut self) -> Result<(), ClientError>;
}

/// Transport over the stdin/stdout pipes of a child process.
///
/// The child's stderr is inherited so server logs reach the terminal
/// without interleaving with protocol frames.
pub struct ProcessTransport {
    child_stdin: Option<ChildStdin>,
    reader: BufReader<ChildStdout>,
}

impl std::fmt::Debug for ProcessTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessTransport").finish()
    }
}

impl ProcessTransport {
    /// Spawn `command args...` and connect to its pipes.
    ///
    /// The child is killed when the returned handle is dropped.
    pub fn spawn(command: &str, args: &[String]) -> Result<(Self, Child), ClientError> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ClientError::Transport(format!("Failed to spawn {}: {}", command, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClientError::Transport("Failed to capture child stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClientError::Transport("Failed to capture child stdout".into()))?;

        Ok((
            Self {
                child_stdin: Some(stdin),
                reader: BufReader::new(stdout),
            },
            child,
        ))
    }
}

#[async_trait]
impl Transport for ProcessTransport {
    async fn read_message(&mut self) -> Result<Option<String>, ClientError> {
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line).await? == 0 {
                return Ok(None);
            }
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Ok(Some(trimmed.to_string()));
            }
        }
    }

    async fn write_message(&mut self, message: &str) -> Result<(), ClientError> {
        let stdin = self
            .child_stdin
            .as_mut()
            .ok_or_else(|| ClientError::Transport("Transport already closed".into()))?;
        stdin.write_all(message.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        // Dropping stdin signals EOF to the server.
        if let Some(mut stdin) = self.child_stdin.take() {
            stdin.flush().await?;
        }
        Ok(())
    }
}

/// In-process transport backed by tokio mpsc channels.
pub struct ChannelTransport {
    receiver: mpsc::Receiver<String>,
    sender: Option<mpsc::Sender<String>>,
}

impl ChannelTransport {
    pub fn new(receiver: mpsc::Receiver<String>, sender: mpsc::Sender<String>) -> Self {
        Self {
            receiver,
            sender: Some(sender),
        }
    }

    /// A linked pair: messages written on one side are read on the other.
    pub fn pair(buffer: usize) -> (Self, Self) {
        let (tx_a, rx_a) = mpsc::channel(buffer);
        let (tx_b, rx_b) = mpsc::channel(buffer);
        (
            ChannelTransport::new(rx_a, tx_b),
            ChannelTransport::new(rx_b, tx_a),
        )
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn read_message(&mut self) -> Result<Option<String>, ClientError> {
        Ok(self.receiver.recv().await)
    }

    async fn write_message(&mut self, message: &str) -> Result<(), ClientError> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| ClientError::Transport("Transport already closed".into()))?;
        sender
            .send(message.to_string())
            .await
            .map_err(|e| ClientError::Transport(format!("channel send failed: {e}")))
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        self.sender = None;
        self.receiver.close();
        Ok(())
    }
}
