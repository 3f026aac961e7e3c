//! Media stream widget
//!
//! Kernel-side handle for a browser `MediaStream`. Peers point at one of
//! these by reference; the stream itself lives in the front-end.

use std::any::Any;

use crate::error::Result;
use crate::protocol::{BufferSequence, State};
use crate::types::WidgetId;

use super::registry::WidgetKey;
use super::{webrtc_meta, Widget, WidgetObject};

/// Companion stream-handle widget (`MediaStreamModel` / `MediaStreamView`)
#[derive(Debug)]
pub struct MediaStream {
    object: WidgetObject,
}

impl MediaStream {
    pub const MODEL_NAME: &'static str = "MediaStreamModel";
    pub const VIEW_NAME: &'static str = "MediaStreamView";

    pub fn new() -> Self {
        Self::with_id(WidgetId::generate())
    }

    pub fn with_id(id: WidgetId) -> Self {
        Self {
            object: WidgetObject::with_id(id, webrtc_meta(Self::MODEL_NAME, Self::VIEW_NAME)),
        }
    }

    /// Registry constructor
    pub fn make(id: WidgetId) -> Box<dyn Widget> {
        Box::new(Self::with_id(id))
    }

    /// Registry key of this widget type
    pub fn widget_key() -> WidgetKey {
        webrtc_meta(Self::MODEL_NAME, Self::VIEW_NAME).key()
    }
}

impl Default for MediaStream {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for MediaStream {
    fn object(&self) -> &WidgetObject {
        &self.object
    }

    fn object_mut(&mut self) -> &mut WidgetObject {
        &mut self.object
    }

    fn serialize_state(&self, state: &mut State, buffers: &mut BufferSequence) {
        self.object.serialize_state(state, buffers);
    }

    fn apply_patch(&mut self, patch: &State, buffers: &BufferSequence) -> Result<()> {
        self.object.apply_patch(patch, buffers)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
