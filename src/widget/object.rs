//! Widget base object and the `Widget` trait
//!
//! `WidgetObject` holds what every widget has: its comm id, the fixed
//! model/view metadata naming its front-end counterpart, and the transport
//! its comm sends on. Concrete widgets embed one and implement [`Widget`].

use std::any::Any;
use std::fmt;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::protocol::{
    BufferSequence, CommData, CommMessage, OpenData, OpenMetadata, SharedTransport, State,
    WIDGET_PROTOCOL_VERSION,
};
use crate::types::{WidgetId, WidgetRef};
use super::registry::WidgetKey;
use super::serialize::take_buffer_paths;

/// Default comm target for widgets
pub const WIDGET_TARGET_NAME: &str = "jupyter.widget";

/// Metadata keys owned by the base object
pub const METADATA_KEYS: [&str; 6] = [
    "_model_module",
    "_model_module_version",
    "_model_name",
    "_view_module",
    "_view_module_version",
    "_view_name",
];

/// Model/view metadata identifying a widget's front-end counterpart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetMeta {
    pub model_module: String,
    pub model_module_version: String,
    pub model_name: String,
    pub view_module: String,
    pub view_module_version: String,
    pub view_name: String,
}

impl WidgetMeta {
    /// Registry key for this widget type
    pub fn key(&self) -> WidgetKey {
        WidgetKey::new(
            &self.model_module,
            &self.model_name,
            &self.view_module,
            &self.view_name,
        )
    }
}

/// How comms are opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommTarget {
    pub target_name: String,
    pub protocol_version: String,
}

impl Default for CommTarget {
    fn default() -> Self {
        Self {
            target_name: WIDGET_TARGET_NAME.to_string(),
            protocol_version: WIDGET_PROTOCOL_VERSION.to_string(),
        }
    }
}

/// State and transport shared by every widget
pub struct WidgetObject {
    id: WidgetId,
    meta: WidgetMeta,
    transport: Option<SharedTransport>,
}

impl WidgetObject {
    /// New object with a fresh id
    pub fn new(meta: WidgetMeta) -> Self {
        Self::with_id(WidgetId::generate(), meta)
    }

    /// New object adopting an existing comm id
    pub fn with_id(id: WidgetId, meta: WidgetMeta) -> Self {
        Self {
            id,
            meta,
            transport: None,
        }
    }

    pub fn id(&self) -> &WidgetId {
        &self.id
    }

    pub fn meta(&self) -> &WidgetMeta {
        &self.meta
    }

    /// Reference other widgets can hold to this one
    pub fn reference(&self) -> WidgetRef {
        WidgetRef::new(self.id.clone())
    }

    /// Whether the comm is open
    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// Write the base metadata into `state`
    pub fn serialize_state(&self, state: &mut State, _buffers: &mut BufferSequence) {
        let meta = &self.meta;
        let values = [
            &meta.model_module,
            &meta.model_module_version,
            &meta.model_name,
            &meta.view_module,
            &meta.view_module_version,
            &meta.view_name,
        ];
        for (key, value) in METADATA_KEYS.iter().zip(values) {
            state.insert(key.to_string(), Value::String(value.clone()));
        }
    }

    /// Base patch application
    ///
    /// Metadata is fixed per widget type, so the metadata keys in a patch
    /// are ignored.
    pub fn apply_patch(&mut self, patch: &State, _buffers: &BufferSequence) -> Result<()> {
        for key in METADATA_KEYS {
            if let Some(value) = patch.get(key) {
                if value.as_str() != Some(self.meta_value(key)) {
                    tracing::debug!(
                        widget = %self.id,
                        key,
                        "Ignoring patch to fixed widget metadata"
                    );
                }
            }
        }
        Ok(())
    }

    fn meta_value(&self, key: &str) -> &str {
        match key {
            "_model_module" => &self.meta.model_module,
            "_model_module_version" => &self.meta.model_module_version,
            "_model_name" => &self.meta.model_name,
            "_view_module" => &self.meta.view_module,
            "_view_module_version" => &self.meta.view_module_version,
            "_view_name" => &self.meta.view_name,
            _ => "",
        }
    }

    /// Open the comm, sending the full state in `comm_open`
    pub fn open(
        &mut self,
        transport: SharedTransport,
        target: &CommTarget,
        mut state: State,
        buffers: BufferSequence,
    ) -> Result<()> {
        let buffer_paths = take_buffer_paths(&mut state, buffers.len());
        transport.send(CommMessage::CommOpen {
            comm_id: self.id.clone(),
            target_name: target.target_name.clone(),
            data: OpenData { state, buffer_paths },
            metadata: OpenMetadata {
                version: target.protocol_version.clone(),
            },
            buffers,
        })?;
        self.transport = Some(transport);
        tracing::debug!(widget = %self.id, model = %self.meta.model_name, "Comm opened");
        Ok(())
    }

    /// Attach to a comm the front-end already opened
    pub fn attach(&mut self, transport: SharedTransport) {
        self.transport = Some(transport);
    }

    /// Close the comm; no-op when already closed
    pub fn close(&mut self) -> Result<()> {
        if let Some(transport) = self.transport.take() {
            transport.send(CommMessage::CommClose {
                comm_id: self.id.clone(),
            })?;
            tracing::debug!(widget = %self.id, "Comm closed");
        }
        Ok(())
    }

    /// Forget the transport without sending anything (front-end closed it)
    pub fn detach(&mut self) {
        self.transport = None;
    }

    fn transport(&self) -> Result<&SharedTransport> {
        self.transport.as_ref().ok_or_else(|| Error::CommNotOpen {
            id: self.id.to_string(),
        })
    }

    /// Send a custom message to the front-end view
    pub fn send(&self, content: Value, buffers: BufferSequence) -> Result<()> {
        self.transport()?.send(CommMessage::CommMsg {
            comm_id: self.id.clone(),
            data: CommData::Custom { content },
            buffers,
        })
    }

    /// Send a state update to the front-end model
    pub fn send_patch(&self, mut state: State, buffers: BufferSequence) -> Result<()> {
        let buffer_paths = take_buffer_paths(&mut state, buffers.len());
        self.transport()?.send(CommMessage::CommMsg {
            comm_id: self.id.clone(),
            data: CommData::Update {
                state,
                buffer_paths,
            },
            buffers,
        })
    }

    /// Send a one-property update if the comm is open
    pub(crate) fn notify(&self, name: &str, value: Value, buffers: BufferSequence) -> Result<()> {
        if !self.is_open() {
            return Ok(());
        }
        let mut state = State::new();
        state.insert(name.to_string(), value);
        self.send_patch(state, buffers)
    }
}

impl fmt::Debug for WidgetObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetObject")
            .field("id", &self.id)
            .field("meta", &self.meta)
            .field("open", &self.is_open())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────
// Widget Trait
// ─────────────────────────────────────────────────────────────────

/// A synchronized widget model
///
/// Implementations call the base object's `serialize_state` / `apply_patch`
/// first and then handle their own properties.
pub trait Widget: Send {
    /// Base object
    fn object(&self) -> &WidgetObject;

    /// Base object (mutable)
    fn object_mut(&mut self) -> &mut WidgetObject;

    /// Write the full state (base + own properties)
    fn serialize_state(&self, state: &mut State, buffers: &mut BufferSequence);

    /// Merge a partial state into this widget
    fn apply_patch(&mut self, patch: &State, buffers: &BufferSequence) -> Result<()>;

    /// Handle a `custom` message from the front-end
    fn handle_custom_message(&mut self, content: &Value) -> Result<()> {
        tracing::debug!(
            widget = %self.object().id(),
            content = %content,
            "Ignoring custom message"
        );
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Full state snapshot
    fn state(&self) -> (State, BufferSequence) {
        let mut state = State::new();
        let mut buffers = BufferSequence::new();
        self.serialize_state(&mut state, &mut buffers);
        (state, buffers)
    }

    fn id(&self) -> &WidgetId {
        self.object().id()
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
