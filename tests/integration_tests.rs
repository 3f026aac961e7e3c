//! Integration tests
//!
//! Full widget sessions: kernel-side creation, front-end updates and
//! disconnection, driven both through the library API and through the
//! stdio host binary.

mod common;

use std::sync::Arc;

use serde_json::{json, Value};

use common::{host_cmd, json_lines};
use webrtc_widgets::protocol::{CommData, CommMessage, RecordingTransport, State};
use webrtc_widgets::types::WidgetRef;
use webrtc_widgets::{Error, Widget, WidgetManager};

fn state(value: Value) -> State {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {}", other),
    }
}

// ─────────────────────────────────────────────────────────────────
// Library Sessions
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_peer_session_lifecycle() {
    let transport = Arc::new(RecordingTransport::new());
    let mut manager = WidgetManager::new(transport.clone());

    let camera = manager.create_media_stream().unwrap();
    let peer = manager.create_peer().unwrap();
    assert_eq!(transport.take().len(), 2);

    // Kernel wires the local stream and names the endpoints
    {
        let peer = manager.peer_mut(&peer).unwrap();
        peer.set_stream_local(Some(WidgetRef::new(camera.clone()))).unwrap();
        peer.set_id_local("alice").unwrap();
        peer.set_id_remote("bob").unwrap();
    }
    let updates = transport.take();
    assert_eq!(updates.len(), 3);
    match &updates[0] {
        CommMessage::CommMsg {
            data: CommData::Update { state, .. },
            ..
        } => assert_eq!(state["stream_local"], json!(format!("IPY_MODEL_{}", camera))),
        other => panic!("Expected update, got {:?}", other),
    }

    manager.connect(&peer).unwrap();
    let sent = transport.take();
    assert_eq!(sent[0].custom_content(), Some(&json!({"msg": "connect"})));

    // Front-end reports the connection and the remote stream
    manager
        .handle_comm_msg(
            &peer,
            CommData::Update {
                state: state(json!({
                    "connected": true,
                    "stream_remote": "IPY_MODEL_remote-cam",
                })),
                buffer_paths: vec![],
            },
            vec![],
        )
        .unwrap();

    let model = manager.peer(&peer).unwrap();
    assert!(model.connected());
    assert!(!model.failed());
    assert_eq!(model.stream_remote(), Some(&WidgetRef::new("remote-cam")));
    assert!(transport.is_empty());

    // Full snapshot reflects every property
    let (snapshot, buffers) = manager.get(&peer).unwrap().state();
    assert!(buffers.is_empty());
    assert_eq!(snapshot["id_local"], json!("alice"));
    assert_eq!(snapshot["id_remote"], json!("bob"));
    assert_eq!(snapshot["connected"], json!(true));
    assert_eq!(snapshot["failed"], json!(false));

    manager.close(&peer).unwrap();
    assert_eq!(transport.take()[0].type_name(), "comm_close");
    assert_eq!(manager.len(), 1);
}

#[test]
fn test_failed_patch_leaves_peer_untouched() {
    let transport = Arc::new(RecordingTransport::new());
    let mut manager = WidgetManager::new(transport);
    let peer = manager.create_peer().unwrap();

    let err = manager
        .handle_comm_msg(
            &peer,
            CommData::Update {
                state: state(json!({"id_local": "carol", "failed": "yes"})),
                buffer_paths: vec![],
            },
            vec![],
        )
        .unwrap_err();

    assert!(matches!(err, Error::PatchDecode { ref field, .. } if field == "failed"));
    let model = manager.peer(&peer).unwrap();
    assert_eq!(model.id_local(), "");
    assert!(!model.failed());
}

// ─────────────────────────────────────────────────────────────────
// Host Binary Sessions
// ─────────────────────────────────────────────────────────────────

const OPEN_PEER: &str = r#"{"type":"comm_open","comm_id":"peer-1","target_name":"jupyter.widget","data":{"state":{"_model_module":"jupyter-webrtc","_model_module_version":"^0.4.0","_model_name":"WebRTCPeerModel","_view_module":"jupyter-webrtc","_view_module_version":"^0.4.0","_view_name":"WebRTCPeerView"},"buffer_paths":[]}}"#;

#[test]
fn test_host_session() {
    let input = [
        OPEN_PEER,
        r#"{"type":"comm_msg","comm_id":"peer-1","data":{"method":"update","state":{"id_remote":"bob","failed":true}}}"#,
        r#"{"type":"connect","comm_id":"peer-1"}"#,
        r#"{"type":"comm_msg","comm_id":"peer-1","data":{"method":"request_state"}}"#,
        r#"{"type":"comm_close","comm_id":"peer-1"}"#,
        r#"{"type":"connect","comm_id":"peer-1"}"#,
    ]
    .join("\n");

    let output = host_cmd()
        .args(["--quiet", "run"])
        .write_stdin(input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let lines = json_lines(&output.stdout);
    assert_eq!(lines.len(), 3);

    assert_eq!(lines[0]["data"]["method"], "custom");
    assert_eq!(lines[0]["data"]["content"]["msg"], "connect");

    let snapshot = &lines[1]["data"]["state"];
    assert_eq!(lines[1]["data"]["method"], "update");
    assert_eq!(snapshot["id_remote"], "bob");
    assert_eq!(snapshot["failed"], true);
    assert_eq!(snapshot["connected"], false);

    // Peer is gone after the front-end closed it
    assert_eq!(lines[2]["type"], "error");
    assert_eq!(lines[2]["code"], "E500");
}

#[test]
fn test_host_rejects_unregistered_widget() {
    let input = r#"{"type":"comm_open","comm_id":"b1","target_name":"jupyter.widget","data":{"state":{"_model_module":"@jupyter-widgets/controls","_model_module_version":"2.0.0","_model_name":"ButtonModel","_view_module":"@jupyter-widgets/controls","_view_module_version":"2.0.0","_view_name":"ButtonView"}}}"#;

    let output = host_cmd()
        .args(["--quiet", "run"])
        .write_stdin(input)
        .output()
        .unwrap();

    let lines = json_lines(&output.stdout);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["type"], "error");
    assert_eq!(lines[0]["code"], "E501");
}
