//! webrtc-widgets
//!
//! Kernel-side models for the `jupyter-webrtc` widgets: a WebRTC peer
//! (`WebRTCPeerModel`) and the media stream handle it points at
//! (`MediaStreamModel`). Widgets synchronize their state with the browser
//! over the Jupyter widget comm protocol; the `webrtc-widgets` binary runs
//! them behind a line-delimited JSON stdio host.

pub mod cli;
pub mod config;
pub mod error;
pub mod host;
pub mod logging;
pub mod protocol;
pub mod types;
pub mod version;
pub mod widget;

pub use error::{Error, ErrorCode, Result};
pub use widget::{MediaStream, PeerModel, Widget, WidgetManager, WidgetRegistry};
