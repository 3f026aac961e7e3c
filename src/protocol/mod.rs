//! Comm protocol module
//!
//! Defines the comm-level message types, the widget protocol versioning and
//! the outbound transport seam. Messages are JSON with binary side buffers.

mod messages;
mod transport;
mod version;

pub use messages::*;
pub use transport::*;
pub use version::*;
