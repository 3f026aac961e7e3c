//! WebRTC peer widget
//!
//! Mirrors a browser-side `RTCPeerConnection` wrapper. The kernel side only
//! holds state: which streams are attached, the signaling ids, and whether
//! the front-end reported the connection as established or failed. Asking
//! the view to start signaling is a single `{"msg": "connect"}` message;
//! the outcome comes back later as an ordinary state patch.

use std::any::Any;

use serde_json::json;

use crate::error::Result;
use crate::protocol::{BufferSequence, State};
use crate::types::{WidgetId, WidgetRef};

use super::registry::{Registration, WidgetKey, WidgetRegistry};
use super::serialize::{decode_property, serialize_property, WidgetProperty};
use super::{webrtc_meta, MediaStream, Widget, WidgetObject};

/// Kernel-side model of a WebRTC peer connection
///
/// `connected` and `failed` are independent flags; the front-end decides
/// what combinations mean.
#[derive(Debug)]
pub struct PeerModel {
    object: WidgetObject,
    stream_local: Option<WidgetRef>,
    stream_remote: Option<WidgetRef>,
    id_local: String,
    id_remote: String,
    connected: bool,
    failed: bool,
}

impl PeerModel {
    pub const MODEL_NAME: &'static str = "WebRTCPeerModel";
    pub const VIEW_NAME: &'static str = "WebRTCPeerView";

    /// New peer with a fresh id and default state
    pub fn new() -> Self {
        Self::with_id(WidgetId::generate())
    }

    /// New peer adopting an existing comm id
    pub fn with_id(id: WidgetId) -> Self {
        Self {
            object: WidgetObject::with_id(id, webrtc_meta(Self::MODEL_NAME, Self::VIEW_NAME)),
            stream_local: None,
            stream_remote: None,
            id_local: String::new(),
            id_remote: String::new(),
            connected: false,
            failed: false,
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

    /// Make the companion media stream type known to `registry`
    ///
    /// Must run before peers arrive from the front-end. Only the first call
    /// on a given registry adds anything.
    pub fn register_companions(registry: &WidgetRegistry) -> Registration {
        let outcome = registry.register(MediaStream::widget_key(), MediaStream::make);
        if outcome == Registration::Added {
            tracing::info!(
                model = MediaStream::MODEL_NAME,
                view = MediaStream::VIEW_NAME,
                "Registered media stream widget"
            );
        }
        outcome
    }

    /// Ask the front-end view to start WebRTC signaling
    ///
    /// Sends exactly one message and returns; the result arrives later as a
    /// patch setting `connected`, `failed` or the ids.
    pub fn connect(&self) -> Result<()> {
        tracing::info!(peer = %self.object.id(), "Requesting peer connection");
        self.object.send(json!({ "msg": "connect" }), BufferSequence::new())
    }

    // ─────────────────────────────────────────────────────────────
    // Properties
    // ─────────────────────────────────────────────────────────────

    pub fn stream_local(&self) -> Option<&WidgetRef> {
        self.stream_local.as_ref()
    }

    pub fn stream_remote(&self) -> Option<&WidgetRef> {
        self.stream_remote.as_ref()
    }

    pub fn id_local(&self) -> &str {
        &self.id_local
    }

    pub fn id_remote(&self) -> &str {
        &self.id_remote
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn set_stream_local(&mut self, stream: Option<WidgetRef>) -> Result<()> {
        self.stream_local = stream;
        notify(&self.object, "stream_local", &self.stream_local)
    }

    pub fn set_stream_remote(&mut self, stream: Option<WidgetRef>) -> Result<()> {
        self.stream_remote = stream;
        notify(&self.object, "stream_remote", &self.stream_remote)
    }

    pub fn set_id_local(&mut self, id: impl Into<String>) -> Result<()> {
        self.id_local = id.into();
        notify(&self.object, "id_local", &self.id_local)
    }

    pub fn set_id_remote(&mut self, id: impl Into<String>) -> Result<()> {
        self.id_remote = id.into();
        notify(&self.object, "id_remote", &self.id_remote)
    }

    pub fn set_connected(&mut self, connected: bool) -> Result<()> {
        self.connected = connected;
        notify(&self.object, "connected", &self.connected)
    }

    pub fn set_failed(&mut self, failed: bool) -> Result<()> {
        self.failed = failed;
        notify(&self.object, "failed", &self.failed)
    }
}

impl Default for PeerModel {
    fn default() -> Self {
        Self::new()
    }
}

fn notify<T: WidgetProperty>(object: &WidgetObject, name: &str, value: &T) -> Result<()> {
    let mut buffers = BufferSequence::new();
    let value = value.to_state(&mut buffers);
    object.notify(name, value, buffers)
}

impl Widget for PeerModel {
    fn object(&self) -> &WidgetObject {
        &self.object
    }

    fn object_mut(&mut self) -> &mut WidgetObject {
        &mut self.object
    }

    fn serialize_state(&self, state: &mut State, buffers: &mut BufferSequence) {
        self.object.serialize_state(state, buffers);

        serialize_property("stream_local", &self.stream_local, state, buffers);
        serialize_property("stream_remote", &self.stream_remote, state, buffers);
        serialize_property("id_local", &self.id_local, state, buffers);
        serialize_property("id_remote", &self.id_remote, state, buffers);
        serialize_property("connected", &self.connected, state, buffers);
        serialize_property("failed", &self.failed, state, buffers);
    }

    fn apply_patch(&mut self, patch: &State, buffers: &BufferSequence) -> Result<()> {
        self.object.apply_patch(patch, buffers)?;

        // Decode everything before assigning so a bad field rejects the whole patch.
        let stream_local = decode_property::<Option<WidgetRef>>("stream_local", patch, buffers)?;
        let stream_remote = decode_property::<Option<WidgetRef>>("stream_remote", patch, buffers)?;
        let id_local = decode_property::<String>("id_local", patch, buffers)?;
        let id_remote = decode_property::<String>("id_remote", patch, buffers)?;
        let connected = decode_property::<bool>("connected", patch, buffers)?;
        let failed = decode_property::<bool>("failed", patch, buffers)?;

        if let Some(v) = stream_local {
            self.stream_local = v;
        }
        if let Some(v) = stream_remote {
            self.stream_remote = v;
        }
        if let Some(v) = id_local {
            self.id_local = v;
        }
        if let Some(v) = id_remote {
            self.id_remote = v;
        }
        if let Some(v) = connected {
            self.connected = v;
        }
        if let Some(v) = failed {
            self.failed = v;
        }

        tracing::debug!(
            peer = %self.object.id(),
            connected = self.connected,
            failed = self.failed,
            "Peer patched"
        );
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::protocol::{CommData, CommMessage, RecordingTransport};
    use crate::widget::CommTarget;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn patch(value: Value) -> State {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn open_peer() -> (PeerModel, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::new());
        let mut peer = PeerModel::new();
        let (state, buffers) = peer.state();
        peer.object_mut()
            .open(transport.clone(), &CommTarget::default(), state, buffers)
            .unwrap();
        transport.take();
        (peer, transport)
    }

    #[test]
    fn test_defaults() {
        let peer = PeerModel::new();

        assert!(!peer.connected());
        assert!(!peer.failed());
        assert_eq!(peer.id_local(), "");
        assert_eq!(peer.id_remote(), "");
        assert!(peer.stream_local().is_none());
        assert!(peer.stream_remote().is_none());
    }

    #[test]
    fn test_metadata() {
        let (state, _) = PeerModel::new().state();

        assert_eq!(state["_model_module"], json!("jupyter-webrtc"));
        assert_eq!(state["_view_module"], json!("jupyter-webrtc"));
        assert_eq!(state["_model_name"], json!("WebRTCPeerModel"));
        assert_eq!(state["_view_name"], json!("WebRTCPeerView"));
        assert_eq!(state["_model_module_version"], json!("^0.4.0"));
        assert_eq!(state["_view_module_version"], json!("^0.4.0"));
    }

    #[test]
    fn test_serialized_state_shape() {
        let mut peer = PeerModel::new();
        peer.set_stream_local(Some(WidgetRef::new("cam"))).unwrap();
        peer.set_id_local("local-7").unwrap();

        let (state, buffers) = peer.state();

        assert_eq!(state["stream_local"], json!("IPY_MODEL_cam"));
        assert_eq!(state["stream_remote"], Value::Null);
        assert_eq!(state["id_local"], json!("local-7"));
        assert_eq!(state["id_remote"], json!(""));
        assert_eq!(state["connected"], json!(false));
        assert_eq!(state["failed"], json!(false));
        assert!(buffers.is_empty());
    }

    #[test]
    fn test_state_round_trip() {
        let mut source = PeerModel::new();
        source.set_stream_local(Some(WidgetRef::new("local-stream"))).unwrap();
        source.set_stream_remote(Some(WidgetRef::new("remote-stream"))).unwrap();
        source.set_id_local("alice").unwrap();
        source.set_id_remote("bob").unwrap();
        source.set_connected(true).unwrap();
        source.set_failed(true).unwrap();

        let (state, buffers) = source.state();
        let mut target = PeerModel::new();
        target.apply_patch(&state, &buffers).unwrap();

        assert_eq!(target.stream_local(), source.stream_local());
        assert_eq!(target.stream_remote(), source.stream_remote());
        assert_eq!(target.id_local(), "alice");
        assert_eq!(target.id_remote(), "bob");
        assert!(target.connected());
        assert!(target.failed());
        assert_ne!(target.object().id(), source.object().id());
    }

    #[test]
    fn test_partial_patch_touches_only_named_field() {
        let mut peer = PeerModel::new();
        peer.set_stream_local(Some(WidgetRef::new("cam"))).unwrap();
        peer.set_id_local("alice").unwrap();
        peer.set_id_remote("bob").unwrap();

        peer.apply_patch(&patch(json!({"connected": true})), &vec![]).unwrap();

        assert!(peer.connected());
        assert!(!peer.failed());
        assert_eq!(peer.id_local(), "alice");
        assert_eq!(peer.id_remote(), "bob");
        assert_eq!(peer.stream_local(), Some(&WidgetRef::new("cam")));
        assert!(peer.stream_remote().is_none());
    }

    #[test]
    fn test_flags_are_independent() {
        let mut peer = PeerModel::new();
        peer.apply_patch(&patch(json!({"connected": true, "failed": true})), &vec![])
            .unwrap();

        assert!(peer.connected());
        assert!(peer.failed());
    }

    #[test]
    fn test_null_stream_detaches() {
        let mut peer = PeerModel::new();
        peer.set_stream_remote(Some(WidgetRef::new("remote"))).unwrap();

        peer.apply_patch(&patch(json!({"stream_remote": null})), &vec![]).unwrap();

        assert!(peer.stream_remote().is_none());
    }

    #[test]
    fn test_bad_patch_is_rejected_whole() {
        let mut peer = PeerModel::new();
        let err = peer
            .apply_patch(&patch(json!({"id_remote": "bob", "connected": "yes"})), &vec![])
            .unwrap_err();

        assert!(matches!(err, Error::PatchDecode { ref field, .. } if field == "connected"));
        assert_eq!(peer.id_remote(), "");
        assert!(!peer.connected());
    }

    #[test]
    fn test_patch_cannot_change_metadata() {
        let mut peer = PeerModel::new();
        peer.apply_patch(
            &patch(json!({"_model_name": "Hijacked", "_view_module_version": "^9.9.9"})),
            &vec![],
        )
        .unwrap();

        let (state, _) = peer.state();
        assert_eq!(state["_model_name"], json!("WebRTCPeerModel"));
        assert_eq!(state["_view_module_version"], json!("^0.4.0"));
    }

    #[test]
    fn test_connect_sends_one_custom_message() {
        let (mut peer, transport) = open_peer();
        peer.apply_patch(&patch(json!({"connected": true, "id_local": "x"})), &vec![])
            .unwrap();

        peer.connect().unwrap();

        let sent = transport.take();
        assert_eq!(sent.len(), 1);
        match &sent[0] {
            CommMessage::CommMsg { comm_id, data: CommData::Custom { content }, buffers } => {
                assert_eq!(comm_id, peer.object().id());
                assert_eq!(content, &json!({"msg": "connect"}));
                assert!(buffers.is_empty());
            }
            other => panic!("Expected custom message, got {:?}", other),
        }
    }

    #[test]
    fn test_connect_without_comm() {
        let peer = PeerModel::new();
        assert!(matches!(peer.connect(), Err(Error::CommNotOpen { .. })));
    }

    #[test]
    fn test_setter_sends_single_property_update() {
        let (mut peer, transport) = open_peer();

        peer.set_id_remote("carol").unwrap();

        let sent = transport.take();
        assert_eq!(sent.len(), 1);
        match &sent[0] {
            CommMessage::CommMsg { data: CommData::Update { state, buffer_paths }, .. } => {
                assert_eq!(state.len(), 1);
                assert_eq!(state["id_remote"], json!("carol"));
                assert!(buffer_paths.is_empty());
            }
            other => panic!("Expected update, got {:?}", other),
        }
    }

    #[test]
    fn test_id_that_looks_like_buffer_reference() {
        let (mut peer, transport) = open_peer();

        peer.set_id_remote("@buffer_reference@0").unwrap();

        let sent = transport.take();
        assert_eq!(sent.len(), 1);
        match &sent[0] {
            CommMessage::CommMsg {
                data: CommData::Update { state, buffer_paths },
                buffers,
                ..
            } => {
                assert_eq!(state["id_remote"], json!("@buffer_reference@0"));
                assert!(buffer_paths.is_empty());
                assert!(buffers.is_empty());
            }
            other => panic!("Expected update, got {:?}", other),
        }
    }

    #[test]
    fn test_patch_is_not_echoed() {
        let (mut peer, transport) = open_peer();

        peer.apply_patch(&patch(json!({"failed": true})), &vec![]).unwrap();

        assert!(transport.is_empty());
    }

    #[test]
    fn test_companion_registration_happens_once() {
        let registry = WidgetRegistry::new();

        assert_eq!(PeerModel::register_companions(&registry), Registration::Added);
        for _ in 0..3 {
            let _peer = PeerModel::new();
            assert_eq!(
                PeerModel::register_companions(&registry),
                Registration::AlreadyRegistered
            );
        }

        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&MediaStream::widget_key()));
    }
}
