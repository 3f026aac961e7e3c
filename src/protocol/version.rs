//! Front-end module and widget protocol versioning
//!
//! Every widget advertises the npm module version of its front-end
//! counterpart so the browser can resolve a matching view implementation.

use serde::{Deserialize, Serialize};

/// Version of the `jupyter-webrtc` front-end module this crate targets
pub const JUPYTER_WEBRTC_VERSION: SemVer = SemVer::new(0, 4, 0);

/// Version of the Jupyter widget comm protocol spoken on `comm_open`
pub const WIDGET_PROTOCOL_VERSION: SemVer = SemVer::new(2, 1, 0);

/// Semantic version identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemVer {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl SemVer {
    /// Create a new version
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Parse a plain `MAJOR.MINOR.PATCH` string
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.trim().split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        let patch = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(major, minor, patch))
    }

    /// Caret range advertised to the front-end (e.g. "^0.4.0")
    pub fn caret_range(&self) -> String {
        format!("^{}", self)
    }

    /// Check if this version is compatible with another version
    ///
    /// Compatibility rules:
    /// - Major version must match exactly
    /// - Minor version of self must be >= other (backward compatible)
    pub fn is_compatible_with(&self, other: &SemVer) -> bool {
        self.major == other.major && self.minor >= other.minor
    }
}

impl std::fmt::Display for SemVer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Module version string every `jupyter-webrtc` widget advertises
pub fn jupyter_webrtc_semver() -> String {
    JUPYTER_WEBRTC_VERSION.caret_range()
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
