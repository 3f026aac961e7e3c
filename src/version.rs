//! Version and build information
//!
//! Build-time details embedded by `build.rs`, plus the front-end and
//! protocol versions this build announces on the wire.

use std::fmt;

use crate::protocol::{jupyter_webrtc_semver, WIDGET_PROTOCOL_VERSION};
use crate::widget::WEBRTC_MODULE;

/// Build information embedded at compile time
#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    pub name: &'static str,
    /// Git commit hash (short)
    pub git_hash: &'static str,
    pub git_branch: &'static str,
    /// Raw git dirty string ("true", "false" or "unknown")
    git_dirty_str: &'static str,
    pub build_timestamp: &'static str,
    /// Target triple (e.g., x86_64-unknown-linux-gnu)
    pub target: &'static str,
    /// Build profile (debug/release)
    pub profile: &'static str,
    pub rustc_version: &'static str,
    /// Host triple (build machine)
    pub host: &'static str,
}

impl BuildInfo {
    /// Get the current build information
    pub const fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            name: env!("CARGO_PKG_NAME"),
            git_hash: env!("WEBRTC_WIDGETS_GIT_HASH"),
            git_branch: env!("WEBRTC_WIDGETS_GIT_BRANCH"),
            git_dirty_str: env!("WEBRTC_WIDGETS_GIT_DIRTY"),
            build_timestamp: env!("WEBRTC_WIDGETS_BUILD_TIMESTAMP"),
            target: env!("WEBRTC_WIDGETS_TARGET"),
            profile: env!("WEBRTC_WIDGETS_PROFILE"),
            rustc_version: env!("WEBRTC_WIDGETS_RUSTC_VERSION"),
            host: env!("WEBRTC_WIDGETS_HOST"),
        }
    }

    pub fn git_dirty(&self) -> bool {
        self.git_dirty_str == "true"
    }

    /// Full version string (e.g., "0.4.0-abc1234")
    pub fn full_version(&self) -> String {
        if self.git_dirty() {
            format!("{}-{}-dirty", self.version, self.git_hash)
        } else {
            format!("{}-{}", self.version, self.git_hash)
        }
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.name, self.full_version())?;
        writeln!(f)?;
        writeln!(f, "Widgets:")?;
        writeln!(f, "  Front-end:  {} {}", WEBRTC_MODULE, jupyter_webrtc_semver())?;
        writeln!(f, "  Protocol:   {}", WIDGET_PROTOCOL_VERSION)?;
        writeln!(f)?;
        writeln!(f, "Build Information:")?;
        writeln!(f, "  Version:    {}", self.version)?;
        writeln!(f, "  Git Hash:   {}{}", self.git_hash, if self.git_dirty() { " (dirty)" } else { "" })?;
        writeln!(f, "  Git Branch: {}", self.git_branch)?;
        writeln!(f, "  Built:      {}", self.build_timestamp)?;
        writeln!(f, "  Profile:    {}", self.profile)?;
        writeln!(f)?;
        writeln!(f, "Target:")?;
        writeln!(f, "  Triple:     {}", self.target)?;
        writeln!(f, "  Host:       {}", self.host)?;
        writeln!(f)?;
        writeln!(f, "Compiler:")?;
        writeln!(f, "  {}", self.rustc_version)?;
        Ok(())
    }
}

pub fn build_info() -> BuildInfo {
    BuildInfo::current()
}

/// Print version information to stdout
pub fn print_version() {
    print!("{}", build_info());
}
