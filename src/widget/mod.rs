//! Widget models
//!
//! The base widget object, the generic property serializer, the registry
//! of widget types, the `jupyter-webrtc` widgets themselves, and the
//! manager that owns live widgets and routes comm traffic to them.

mod manager;
mod media_stream;
mod object;
mod peer;
pub mod registry;
pub mod serialize;

pub use manager::*;
pub use media_stream::*;
pub use object::*;
pub use peer::*;
pub use registry::{register_builtin_widgets, Registration, WidgetKey, WidgetMaker, WidgetRegistry};

use crate::protocol::jupyter_webrtc_semver;

/// npm module providing the front-end half of every widget here
pub const WEBRTC_MODULE: &str = "jupyter-webrtc";

/// Metadata for a `jupyter-webrtc` model/view pair
pub(crate) fn webrtc_meta(model_name: &str, view_name: &str) -> WidgetMeta {
    WidgetMeta {
        model_module: WEBRTC_MODULE.to_string(),
        model_module_version: jupyter_webrtc_semver(),
        model_name: model_name.to_string(),
        view_module: WEBRTC_MODULE.to_string(),
        view_module_version: jupyter_webrtc_semver(),
        view_name: view_name.to_string(),
    }
}
