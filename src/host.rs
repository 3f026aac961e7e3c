//! Stdio comm host
//!
//! Reads one JSON request per input line, drives a [`WidgetManager`], and
//! writes every outbound comm message as one JSON line. A reader task owns
//! the manager; a writer task drains the outbound channel. The loop ends at
//! EOF, once everything queued has been written.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::HostConfig;
use crate::error::{Error, ErrorCode, Result};
use crate::protocol::{ChannelTransport, CommMessage, SharedTransport, WIDGET_PROTOCOL_VERSION};
use crate::types::WidgetId;
use crate::widget::WidgetManager;

// ─────────────────────────────────────────────────────────────────
// Host Messages
// ─────────────────────────────────────────────────────────────────

/// One request line
#[derive(Debug, Clone, PartialEq)]
pub enum HostInput {
    /// A comm message coming from the front-end
    Comm(CommMessage),
    /// Create a peer on the kernel side
    CreatePeer,
    /// Create a media stream handle on the kernel side
    CreateMediaStream,
    /// Ask a peer to start signaling
    Connect { comm_id: WidgetId },
}

impl HostInput {
    /// Parse a request line
    pub fn parse(line: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(line)?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| Error::malformed("request has no 'type' field"))?;

        match kind.as_str() {
            "comm_open" | "comm_msg" | "comm_close" => {
                Ok(HostInput::Comm(serde_json::from_value(value)?))
            }
            "create_peer" => Ok(HostInput::CreatePeer),
            "create_media_stream" => Ok(HostInput::CreateMediaStream),
            "connect" => {
                let comm_id = value
                    .get("comm_id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| Error::malformed("connect requires a 'comm_id'"))?;
                Ok(HostInput::Connect {
                    comm_id: WidgetId::from(comm_id),
                })
            }
            other => Err(Error::malformed(format!("unknown request type '{}'", other))),
        }
    }
}

/// One output line
#[derive(Debug, Clone, PartialEq)]
pub enum HostOutput {
    Comm(CommMessage),
    /// A request failed; the loop keeps going
    Error { message: String, code: ErrorCode },
}

impl From<CommMessage> for HostOutput {
    fn from(message: CommMessage) -> Self {
        HostOutput::Comm(message)
    }
}

impl HostOutput {
    pub fn error(err: &Error) -> Self {
        HostOutput::Error {
            message: err.to_string(),
            code: err.code(),
        }
    }

    /// Render as a single JSON line (no trailing newline)
    pub fn to_line(&self) -> Result<String> {
        let line = match self {
            HostOutput::Comm(message) => message.to_json()?,
            HostOutput::Error { message, code } => serde_json::to_string(&json!({
                "type": "error",
                "message": message,
                "code": code.as_str(),
            }))?,
        };
        Ok(line)
    }
}

/// Counters reported when the loop ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostStats {
    /// Non-blank request lines read
    pub requests: u64,
    /// Requests that produced an error line
    pub errors: u64,
    /// Lines written to the output
    pub lines_written: u64,
}

// ─────────────────────────────────────────────────────────────────
// Host Loop
// ─────────────────────────────────────────────────────────────────

/// Run the host until `input` reaches EOF
pub async fn run<R, W>(config: &HostConfig, input: R, output: &mut W) -> Result<HostStats>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<HostOutput>();
    let transport: SharedTransport = Arc::new(ChannelTransport::new(tx.clone()));
    let manager = WidgetManager::new(transport).with_target(config.comm.target());
    let auto_connect = config.peer.auto_connect;

    info!(
        target_name = %config.comm.target_name,
        auto_connect,
        widget_types = manager.registry().len(),
        "Comm host started"
    );

    let reader = async move {
        let mut manager = manager;
        let mut stats = HostStats::default();
        let mut lines = BufReader::new(input).lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            stats.requests += 1;

            if let Err(e) = handle_line(&mut manager, line, auto_connect) {
                if e.is_fatal() {
                    return Err(e);
                }
                warn!(error = %e.format_for_log(), "Request failed");
                stats.errors += 1;
                tx.send(HostOutput::error(&e))
                    .map_err(|_| Error::TransportClosed)?;
            }
        }

        info!(
            requests = stats.requests,
            errors = stats.errors,
            live_widgets = manager.len(),
            "Input closed"
        );

        // Both the manager's transport and our sender must go for the writer to finish
        drop(manager);
        drop(tx);
        Ok::<_, Error>(stats)
    };

    let writer = async {
        let mut written = 0u64;
        while let Some(message) = rx.recv().await {
            let line = message.to_line()?;
            output.write_all(line.as_bytes()).await?;
            output.write_all(b"\n").await?;
            output.flush().await?;
            written += 1;
        }
        Ok::<_, Error>(written)
    };

    let (mut stats, written) = tokio::try_join!(reader, writer)?;
    stats.lines_written = written;
    Ok(stats)
}

fn handle_line(manager: &mut WidgetManager, line: &str, auto_connect: bool) -> Result<()> {
    let request = HostInput::parse(line)?;
    debug!(request = ?request, "Request received");

    match request {
        HostInput::Comm(CommMessage::CommOpen {
            comm_id,
            data,
            metadata,
            buffers,
            ..
        }) => {
            if !metadata.is_supported() {
                warn!(
                    widget = %comm_id,
                    version = %metadata.version,
                    supported = %WIDGET_PROTOCOL_VERSION,
                    "Front-end speaks an incompatible widget protocol version"
                );
            }
            manager.handle_comm_open(comm_id, data, buffers)
        }
        HostInput::Comm(CommMessage::CommMsg {
            comm_id,
            data,
            buffers,
        }) => manager.handle_comm_msg(&comm_id, data, buffers),
        HostInput::Comm(CommMessage::CommClose { comm_id }) => manager.handle_comm_close(&comm_id),
        HostInput::CreatePeer => {
            let id = manager.create_peer()?;
            if auto_connect {
                manager.connect(&id)?;
            }
            Ok(())
        }
        HostInput::CreateMediaStream => manager.create_media_stream().map(|_| ()),
        HostInput::Connect { comm_id } => manager.connect(&comm_id),
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
