//! Configuration system for the widget host
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (WEBRTC_WIDGETS_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::protocol::{SemVer, WIDGET_PROTOCOL_VERSION};
use crate::widget::{CommTarget, WIDGET_TARGET_NAME};

/// Main host configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Comm channel settings
    pub comm: CommSettings,

    /// Peer widget behaviour
    pub peer: PeerSettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Comm channel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommSettings {
    /// Target name put on every `comm_open`
    pub target_name: String,

    /// Widget protocol version announced in `comm_open` metadata
    pub protocol_version: String,
}

/// Peer widget settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerSettings {
    /// Send `connect` right after a peer's comm is opened
    pub auto_connect: bool,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Maximum log file size in MB before rotation
    pub max_file_size_mb: u64,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

impl Default for CommSettings {
    fn default() -> Self {
        Self {
            target_name: WIDGET_TARGET_NAME.to_string(),
            protocol_version: WIDGET_PROTOCOL_VERSION.to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_file_size_mb: 100,
            max_files: 5,
            json_format: false,
        }
    }
}

impl CommSettings {
    /// Comm target used when opening widget comms
    pub fn target(&self) -> CommTarget {
        CommTarget {
            target_name: self.target_name.clone(),
            protocol_version: self.protocol_version.clone(),
        }
    }
}

impl HostConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = Self::find_config_file(config_path)? {
            config = Self::from_file(&path)?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        config.apply_env_overrides();
        config.expand_paths();
        config.validate()?;

        Ok(config)
    }

    /// Parse a configuration file without overrides or validation
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading configuration file");
        let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| Error::ConfigParse {
            message: format!("{}: {}", path.display(), e.message()),
            source: Some(e),
        })
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::config_not_found(path));
        }

        let search_paths = [
            PathBuf::from("webrtc-widgets.toml"),
            PathBuf::from("config.toml"),
            dirs::config_dir()
                .map(|p| p.join("webrtc-widgets").join("config.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".webrtc-widgets").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in &search_paths {
            if !path.as_os_str().is_empty() && path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Comm settings
        if let Ok(val) = std::env::var("WEBRTC_WIDGETS_TARGET_NAME") {
            self.comm.target_name = val;
        }
        if let Ok(val) = std::env::var("WEBRTC_WIDGETS_PROTOCOL_VERSION") {
            self.comm.protocol_version = val;
        }

        // Peer settings
        if let Ok(val) = std::env::var("WEBRTC_WIDGETS_AUTO_CONNECT") {
            self.peer.auto_connect = parse_flag(&val);
        }

        // Logging settings
        if let Ok(val) = std::env::var("WEBRTC_WIDGETS_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("WEBRTC_WIDGETS_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Ok(val) = std::env::var("WEBRTC_WIDGETS_LOG_JSON") {
            self.logging.json_format = parse_flag(&val);
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.comm.target_name.trim().is_empty() {
            return Err(Error::config_field_invalid(
                "comm.target_name",
                "Comm target name cannot be empty",
            ));
        }

        if SemVer::parse(&self.comm.protocol_version).is_none() {
            return Err(Error::config_field_invalid(
                "comm.protocol_version",
                format!(
                    "Invalid protocol version '{}'. Expected MAJOR.MINOR.PATCH",
                    self.comm.protocol_version
                ),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        Ok(())
    }
}

fn parse_flag(val: &str) -> bool {
    val.eq_ignore_ascii_case("true") || val == "1"
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or(std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Initialize a new configuration file
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".webrtc-widgets")
                .join("config.toml")
        });

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }

    fs::write(&config_path, generate_default_config()).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    println!("Configuration file created: {}", config_path.display());
    Ok(config_path)
}

/// Generate a default configuration file with comments
pub fn generate_default_config() -> String {
    format!(
        r#"# webrtc-widgets host configuration
#
# Every value can also be set with a WEBRTC_WIDGETS_* environment variable.

[comm]
# Target name used on comm_open
target_name = "{target}"

# Widget protocol version sent in comm_open metadata
protocol_version = "{protocol}"

[peer]
# Ask the front-end view to start signaling as soon as a peer is created
auto_connect = false

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (uncomment to enable file logging)
# file = "~/.webrtc-widgets/host.log"

# Maximum log file size in MB before rotation
max_file_size_mb = 100

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logs
json_format = false
"#,
        target = WIDGET_TARGET_NAME,
        protocol = WIDGET_PROTOCOL_VERSION,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = HostConfig::default();
        assert_eq!(config.comm.target_name, "jupyter.widget");
        assert_eq!(config.comm.protocol_version, "2.1.0");
        assert!(!config.peer.auto_connect);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_env_override() {
        env::set_var("WEBRTC_WIDGETS_AUTO_CONNECT", "1");
        env::set_var("WEBRTC_WIDGETS_LOG_JSON", "TRUE");

        let mut config = HostConfig::default();
        config.apply_env_overrides();

        assert!(config.peer.auto_connect);
        assert!(config.logging.json_format);

        env::remove_var("WEBRTC_WIDGETS_AUTO_CONNECT");
        env::remove_var("WEBRTC_WIDGETS_LOG_JSON");
    }

    #[test]
    fn test_validation_empty_target() {
        let mut config = HostConfig::default();
        config.comm.target_name = "  ".to_string();

        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            Error::ConfigValidation { field: Some(ref f), .. } if f == "comm.target_name"
        ));
    }

    #[test]
    fn test_validation_bad_protocol_version() {
        let mut config = HostConfig::default();
        config.comm.protocol_version = "2.x".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_log_level() {
        let mut config = HostConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(HostConfig::default().validate().is_ok());
    }

    #[test]
    fn test_comm_target() {
        let mut config = HostConfig::default();
        config.comm.target_name = "custom.target".to_string();

        let target = config.comm.target();
        assert_eq!(target.target_name, "custom.target");
        assert_eq!(target.protocol_version, "2.1.0");
    }

    #[test]
    fn test_generated_config_parses() {
        let config: HostConfig = toml::from_str(&generate_default_config()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.comm.target_name, "jupyter.widget");
        assert!(!config.peer.auto_connect);
    }

    #[test]
    fn test_parse_partial_file() {
        let config: HostConfig = toml::from_str(
            r#"
[peer]
auto_connect = true

[logging]
level = "debug"
"#,
        )
        .unwrap();

        assert!(config.peer.auto_connect);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.comm.target_name, "jupyter.widget");
    }

    #[test]
    fn test_explicit_path_missing() {
        let err = HostConfig::load(Some("/nonexistent/webrtc-widgets.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    fn test_from_file_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[comm\ntarget_name = 1").unwrap();

        let err = HostConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_init_config_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let path_str = path.to_string_lossy().to_string();

        init_config(Some(&path_str), false).unwrap();
        assert!(path.exists());

        assert!(init_config(Some(&path_str), false).is_err());
        assert!(init_config(Some(&path_str), true).is_ok());
    }
}
