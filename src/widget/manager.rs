//! Widget Manager
//!
//! Owns every live widget, opens comms for widgets created on the kernel
//! side, instantiates widgets the front-end opens, and routes incoming comm
//! messages to the right widget.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::protocol::{BufferSequence, CommData, OpenData, SharedTransport};
use crate::types::WidgetId;

use super::registry::{WidgetKey, WidgetRegistry};
use super::serialize::insert_buffer_paths;
use super::{CommTarget, MediaStream, PeerModel, Widget};

/// Owner and router for live widgets
pub struct WidgetManager {
    registry: Arc<WidgetRegistry>,
    transport: SharedTransport,
    target: CommTarget,
    widgets: HashMap<WidgetId, Box<dyn Widget>>,
}

impl WidgetManager {
    /// Create a manager with the built-in widget types registered
    pub fn new(transport: SharedTransport) -> Self {
        Self::with_registry(Arc::new(WidgetRegistry::with_builtin()), transport)
    }

    /// Create a manager around an existing registry
    ///
    /// The built-in widgets are added to it if missing.
    pub fn with_registry(registry: Arc<WidgetRegistry>, transport: SharedTransport) -> Self {
        super::register_builtin_widgets(&registry);
        Self {
            registry,
            transport,
            target: CommTarget::default(),
            widgets: HashMap::new(),
        }
    }

    /// Use a non-default comm target for comms opened from here on
    pub fn with_target(mut self, target: CommTarget) -> Self {
        self.target = target;
        self
    }

    pub fn registry(&self) -> &Arc<WidgetRegistry> {
        &self.registry
    }

    /// Number of live widgets
    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Ids of every live widget
    pub fn ids(&self) -> Vec<WidgetId> {
        self.widgets.keys().cloned().collect()
    }

    // ─────────────────────────────────────────────────────────────
    // Kernel-side creation
    // ─────────────────────────────────────────────────────────────

    /// Create a peer and open its comm
    pub fn create_peer(&mut self) -> Result<WidgetId> {
        self.adopt(Box::new(PeerModel::new()))
    }

    /// Create a media stream handle and open its comm
    pub fn create_media_stream(&mut self) -> Result<WidgetId> {
        self.adopt(Box::new(MediaStream::new()))
    }

    /// Open the comm of a kernel-created widget and take ownership of it
    pub fn adopt(&mut self, mut widget: Box<dyn Widget>) -> Result<WidgetId> {
        let (state, buffers) = widget.state();
        widget
            .object_mut()
            .open(self.transport.clone(), &self.target, state, buffers)?;

        let id = widget.id().clone();
        info!(
            widget = %id,
            model = %widget.object().meta().model_name,
            "Widget created"
        );
        self.widgets.insert(id.clone(), widget);
        Ok(id)
    }

    /// Ask a peer's front-end view to start signaling
    pub fn connect(&self, id: &WidgetId) -> Result<()> {
        self.peer(id)?.connect()
    }

    /// Kernel-initiated close: sends `comm_close` and drops the widget
    pub fn close(&mut self, id: &WidgetId) -> Result<()> {
        let mut widget = self
            .widgets
            .remove(id)
            .ok_or_else(|| Error::unknown_widget(id))?;
        widget.object_mut().close()
    }

    // ─────────────────────────────────────────────────────────────
    // Front-end traffic
    // ─────────────────────────────────────────────────────────────

    /// Instantiate a widget the front-end opened a comm for
    pub fn handle_comm_open(
        &mut self,
        comm_id: WidgetId,
        data: OpenData,
        buffers: BufferSequence,
    ) -> Result<()> {
        let OpenData {
            mut state,
            buffer_paths,
        } = data;
        let key = key_from_state(&state)?;
        insert_buffer_paths(&mut state, &buffer_paths)?;

        let mut widget = self.registry.make(&key, comm_id.clone())?;
        widget.apply_patch(&state, &buffers)?;
        widget.object_mut().attach(self.transport.clone());

        if self.widgets.insert(comm_id.clone(), widget).is_some() {
            warn!(widget = %comm_id, "Comm reopened, previous widget replaced");
        }
        info!(widget = %comm_id, model = %key.model_name, "Widget opened by front-end");
        Ok(())
    }

    /// Route a `comm_msg` to its widget
    pub fn handle_comm_msg(
        &mut self,
        comm_id: &WidgetId,
        data: CommData,
        buffers: BufferSequence,
    ) -> Result<()> {
        let widget = self
            .widgets
            .get_mut(comm_id)
            .ok_or_else(|| Error::unknown_widget(comm_id))?;

        debug!(widget = %comm_id, method = data.method(), "Comm message received");

        match data {
            CommData::Update {
                mut state,
                buffer_paths,
            } => {
                insert_buffer_paths(&mut state, &buffer_paths)?;
                widget.apply_patch(&state, &buffers)
            }
            CommData::RequestState => {
                let (state, buffers) = widget.state();
                widget.object().send_patch(state, buffers)
            }
            CommData::Custom { content } => widget.handle_custom_message(&content),
        }
    }

    /// The front-end closed a comm; drop its widget without replying
    pub fn handle_comm_close(&mut self, comm_id: &WidgetId) -> Result<()> {
        let mut widget = self
            .widgets
            .remove(comm_id)
            .ok_or_else(|| Error::unknown_widget(comm_id))?;
        widget.object_mut().detach();
        info!(widget = %comm_id, "Widget closed by front-end");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Lookup
    // ─────────────────────────────────────────────────────────────

    pub fn get(&self, id: &WidgetId) -> Option<&dyn Widget> {
        self.widgets.get(id).map(|w| w.as_ref())
    }

    /// Look up a peer by id
    pub fn peer(&self, id: &WidgetId) -> Result<&PeerModel> {
        let widget = self.widgets.get(id).ok_or_else(|| Error::unknown_widget(id))?;
        widget
            .as_any()
            .downcast_ref::<PeerModel>()
            .ok_or_else(|| Error::WrongWidgetType {
                id: id.to_string(),
                expected: PeerModel::MODEL_NAME,
            })
    }

    /// Look up a peer by id (mutable)
    pub fn peer_mut(&mut self, id: &WidgetId) -> Result<&mut PeerModel> {
        let widget = self
            .widgets
            .get_mut(id)
            .ok_or_else(|| Error::unknown_widget(id))?;
        widget
            .as_any_mut()
            .downcast_mut::<PeerModel>()
            .ok_or_else(|| Error::WrongWidgetType {
                id: id.to_string(),
                expected: PeerModel::MODEL_NAME,
            })
    }
}

fn key_from_state(state: &crate::protocol::State) -> Result<WidgetKey> {
    let field = |name: &str| -> Result<String> {
        state
            .get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::malformed(format!("comm_open state is missing '{}'", name)))
    };

    Ok(WidgetKey::new(
        field("_model_module")?,
        field("_model_name")?,
        field("_view_module")?,
        field("_view_name")?,
    ))
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{CommMessage, PathSegment, RecordingTransport, State};
    use crate::types::WidgetRef;
    use serde_json::json;

    fn manager() -> (WidgetManager, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::new());
        (WidgetManager::new(transport.clone()), transport)
    }

    fn object(value: Value) -> State {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn peer_open_data(extra: Value) -> OpenData {
        let mut state = object(json!({
            "_model_module": "jupyter-webrtc",
            "_model_module_version": "^0.4.0",
            "_model_name": "WebRTCPeerModel",
            "_view_module": "jupyter-webrtc",
            "_view_module_version": "^0.4.0",
            "_view_name": "WebRTCPeerView",
        }));
        state.extend(object(extra));
        OpenData {
            state,
            buffer_paths: vec![],
        }
    }

    #[test]
    fn test_create_peer_opens_comm() {
        let (mut manager, transport) = manager();

        let id = manager.create_peer().unwrap();

        let sent = transport.take();
        assert_eq!(sent.len(), 1);
        match &sent[0] {
            CommMessage::CommOpen { comm_id, data, .. } => {
                assert_eq!(comm_id, &id);
                assert_eq!(data.state["_model_name"], json!("WebRTCPeerModel"));
                assert_eq!(data.state["connected"], json!(false));
            }
            other => panic!("Expected comm_open, got {:?}", other),
        }
        assert!(manager.peer(&id).unwrap().object().is_open());
    }

    #[test]
    fn test_connect_through_manager() {
        let (mut manager, transport) = manager();
        let id = manager.create_peer().unwrap();
        transport.take();

        manager.connect(&id).unwrap();

        let sent = transport.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].custom_content(), Some(&json!({"msg": "connect"})));
    }

    #[test]
    fn test_connect_rejects_media_stream() {
        let (mut manager, _) = manager();
        let id = manager.create_media_stream().unwrap();

        let err = manager.connect(&id).unwrap_err();
        assert!(matches!(err, Error::WrongWidgetType { .. }));
    }

    #[test]
    fn test_update_from_frontend() {
        let (mut manager, transport) = manager();
        let id = manager.create_peer().unwrap();
        transport.take();

        manager
            .handle_comm_msg(
                &id,
                CommData::Update {
                    state: object(json!({"connected": true, "id_remote": "bob"})),
                    buffer_paths: vec![],
                },
                vec![],
            )
            .unwrap();

        let peer = manager.peer(&id).unwrap();
        assert!(peer.connected());
        assert_eq!(peer.id_remote(), "bob");
        assert!(transport.is_empty());
    }

    #[test]
    fn test_request_state() {
        let (mut manager, transport) = manager();
        let id = manager.create_peer().unwrap();
        manager.peer_mut(&id).unwrap().set_id_local("alice").unwrap();
        transport.take();

        manager.handle_comm_msg(&id, CommData::RequestState, vec![]).unwrap();

        let sent = transport.take();
        assert_eq!(sent.len(), 1);
        match &sent[0] {
            CommMessage::CommMsg { data: CommData::Update { state, .. }, .. } => {
                assert_eq!(state["id_local"], json!("alice"));
                assert_eq!(state["_view_name"], json!("WebRTCPeerView"));
            }
            other => panic!("Expected update, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_message_is_ignored() {
        let (mut manager, transport) = manager();
        let id = manager.create_peer().unwrap();
        transport.take();

        manager
            .handle_comm_msg(&id, CommData::Custom { content: json!({"event": "x"}) }, vec![])
            .unwrap();

        assert!(transport.is_empty());
    }

    #[test]
    fn test_frontend_opens_peer() {
        let (mut manager, transport) = manager();
        let comm_id = WidgetId::from("frontend-peer");

        manager
            .handle_comm_open(
                comm_id.clone(),
                peer_open_data(json!({"id_local": "alice", "stream_local": "IPY_MODEL_cam"})),
                vec![],
            )
            .unwrap();

        let peer = manager.peer(&comm_id).unwrap();
        assert_eq!(peer.id_local(), "alice");
        assert_eq!(peer.stream_local(), Some(&WidgetRef::new("cam")));
        assert!(peer.object().is_open());
        assert!(transport.is_empty());
    }

    #[test]
    fn test_frontend_opens_unregistered_type() {
        let (mut manager, _) = manager();
        let mut data = peer_open_data(json!({}));
        data.state.insert("_model_name".into(), json!("SomethingElse"));

        let err = manager
            .handle_comm_open(WidgetId::from("x"), data, vec![])
            .unwrap_err();

        assert!(matches!(err, Error::UnregisteredWidget { .. }));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_frontend_open_missing_metadata() {
        let (mut manager, _) = manager();
        let data = OpenData {
            state: object(json!({"_model_name": "WebRTCPeerModel"})),
            buffer_paths: vec![],
        };

        let err = manager
            .handle_comm_open(WidgetId::from("x"), data, vec![])
            .unwrap_err();
        assert!(matches!(err, Error::ProtocolMalformed { .. }));
    }

    #[test]
    fn test_update_with_bad_buffer_path() {
        let (mut manager, _) = manager();
        let id = manager.create_peer().unwrap();

        let err = manager
            .handle_comm_msg(
                &id,
                CommData::Update {
                    state: State::new(),
                    buffer_paths: vec![vec![PathSegment::Index(0)]],
                },
                vec![vec![1]],
            )
            .unwrap_err();
        assert!(matches!(err, Error::BufferReference { .. }));
    }

    #[test]
    fn test_unknown_comm() {
        let (mut manager, _) = manager();
        let err = manager
            .handle_comm_msg(&WidgetId::from("nope"), CommData::RequestState, vec![])
            .unwrap_err();
        assert!(matches!(err, Error::UnknownWidget { .. }));
    }

    #[test]
    fn test_close_paths() {
        let (mut manager, transport) = manager();
        let a = manager.create_peer().unwrap();
        let b = manager.create_media_stream().unwrap();
        transport.take();

        manager.close(&a).unwrap();
        manager.handle_comm_close(&b).unwrap();

        let sent = transport.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].type_name(), "comm_close");
        assert_eq!(sent[0].comm_id(), &a);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_shared_registry_keeps_single_companion() {
        let registry = Arc::new(WidgetRegistry::new());
        let transport = Arc::new(RecordingTransport::new());

        let _first = WidgetManager::with_registry(registry.clone(), transport.clone());
        let _second = WidgetManager::with_registry(registry.clone(), transport);

        assert_eq!(registry.len(), 2);
    }
}
