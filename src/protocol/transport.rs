//! Outbound comm transport
//!
//! Widgets hand finished [`CommMessage`]s to a [`Transport`]; what happens
//! to them afterwards (a kernel socket, a stdio line, a test buffer) is the
//! transport's business. Sends are fire-and-forget.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::{Error, Result};
use super::CommMessage;

/// Sink for outbound comm messages
pub trait Transport: Send + Sync {
    /// Queue one message for delivery
    fn send(&self, message: CommMessage) -> Result<()>;
}

/// Shared handle to a transport
pub type SharedTransport = Arc<dyn Transport>;

/// Transport backed by an unbounded tokio channel
///
/// `T` is whatever the draining side consumes; anything that can be built
/// from a [`CommMessage`] works.
pub struct ChannelTransport<T = CommMessage> {
    tx: UnboundedSender<T>,
}

impl<T> ChannelTransport<T> {
    pub fn new(tx: UnboundedSender<T>) -> Self {
        Self { tx }
    }
}

impl<T> Transport for ChannelTransport<T>
where
    T: From<CommMessage> + Send + 'static,
{
    fn send(&self, message: CommMessage) -> Result<()> {
        tracing::trace!(
            comm_id = %message.comm_id(),
            kind = message.type_name(),
            "Queueing comm message"
        );
        self.tx
            .send(T::from(message))
            .map_err(|_| Error::TransportClosed)
    }
}

/// Transport that keeps every message in memory
///
/// Useful for embedding the widgets in-process and inspecting what
/// they would have sent.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<CommMessage>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every message sent so far
    pub fn messages(&self) -> Vec<CommMessage> {
        self.sent.lock().clone()
    }

    /// Remove and return every message sent so far
    pub fn take(&self) -> Vec<CommMessage> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Number of messages sent so far
    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.lock().is_empty()
    }
}

impl Transport for RecordingTransport {
    fn send(&self, message: CommMessage) -> Result<()> {
        self.sent.lock().push(message);
        Ok(())
    }
}
