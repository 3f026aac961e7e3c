//! Comm message definitions
//!
//! The three comm-level messages of the Jupyter widget protocol
//! (`comm_open`, `comm_msg`, `comm_close`) and the `method`-tagged
//! payloads carried by `comm_msg`. Binary buffers travel beside the JSON
//! document; on the line-delimited host channel they are base64 strings.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::WidgetId;
use super::{SemVer, WIDGET_PROTOCOL_VERSION};

/// A widget state document: property name → JSON value
pub type State = serde_json::Map<String, Value>;

/// Ordered binary buffers accompanying a JSON document
pub type BufferSequence = Vec<Vec<u8>>;

/// One step in a JSON path: an object key or an array index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl From<&str> for PathSegment {
    fn from(s: &str) -> Self {
        PathSegment::Key(s.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(i: usize) -> Self {
        PathSegment::Index(i)
    }
}

/// Location of a binary buffer inside a state document
pub type BufferPath = Vec<PathSegment>;

// ─────────────────────────────────────────────────────────────────
// Comm Messages (Discriminated Union)
// ─────────────────────────────────────────────────────────────────

/// All comm-level messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommMessage {
    /// Opens a comm and carries the widget's full initial state
    CommOpen {
        comm_id: WidgetId,
        target_name: String,
        data: OpenData,
        #[serde(default)]
        metadata: OpenMetadata,
        #[serde(default, with = "base64_buffers")]
        buffers: BufferSequence,
    },

    /// A message on an open comm
    CommMsg {
        comm_id: WidgetId,
        data: CommData,
        #[serde(default, with = "base64_buffers")]
        buffers: BufferSequence,
    },

    /// Closes a comm
    CommClose { comm_id: WidgetId },
}

impl CommMessage {
    /// Get the message type name
    pub fn type_name(&self) -> &'static str {
        match self {
            CommMessage::CommOpen { .. } => "comm_open",
            CommMessage::CommMsg { .. } => "comm_msg",
            CommMessage::CommClose { .. } => "comm_close",
        }
    }

    /// Comm this message belongs to
    pub fn comm_id(&self) -> &WidgetId {
        match self {
            CommMessage::CommOpen { comm_id, .. }
            | CommMessage::CommMsg { comm_id, .. }
            | CommMessage::CommClose { comm_id } => comm_id,
        }
    }

    /// Content of a `custom` comm message, if this is one
    pub fn custom_content(&self) -> Option<&Value> {
        match self {
            CommMessage::CommMsg {
                data: CommData::Custom { content },
                ..
            } => Some(content),
            _ => None,
        }
    }

    /// Binary buffers attached to this message
    pub fn buffers(&self) -> &[Vec<u8>] {
        match self {
            CommMessage::CommOpen { buffers, .. } | CommMessage::CommMsg { buffers, .. } => buffers,
            CommMessage::CommClose { .. } => &[],
        }
    }

    /// Serialize to a single-line JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Payload of `comm_open`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenData {
    pub state: State,
    #[serde(default)]
    pub buffer_paths: Vec<BufferPath>,
}

/// Metadata of `comm_open`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenMetadata {
    /// Widget protocol version
    pub version: String,
}

impl Default for OpenMetadata {
    fn default() -> Self {
        Self {
            version: WIDGET_PROTOCOL_VERSION.to_string(),
        }
    }
}

impl OpenMetadata {
    /// Whether the advertised protocol version is one this crate speaks
    ///
    /// Unparseable versions are unsupported.
    pub fn is_supported(&self) -> bool {
        SemVer::parse(&self.version)
            .map_or(false, |theirs| WIDGET_PROTOCOL_VERSION.is_compatible_with(&theirs))
    }
}

/// Payload of `comm_msg`, discriminated by `method`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum CommData {
    /// Partial state update (either direction)
    Update {
        state: State,
        #[serde(default)]
        buffer_paths: Vec<BufferPath>,
    },

    /// Front-end asks for the full state
    RequestState,

    /// Widget-specific message
    Custom { content: Value },
}

impl CommData {
    /// Get the method name
    pub fn method(&self) -> &'static str {
        match self {
            CommData::Update { .. } => "update",
            CommData::RequestState => "request_state",
            CommData::Custom { .. } => "custom",
        }
    }
}

mod base64_buffers {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::BufferSequence;

    pub fn serialize<S: Serializer>(buffers: &BufferSequence, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(buffers.iter().map(|b| STANDARD.encode(b)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BufferSequence, D::Error> {
        let encoded: Vec<String> = Vec::deserialize(deserializer)?;
        encoded
            .iter()
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
