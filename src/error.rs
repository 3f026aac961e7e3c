//! Error types for the widget host
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - User-friendly messages with suggestions
//! - Exit codes for CLI

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for widget operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,

    // Comm errors (3xx)
    TransportClosed = 300,
    CommNotOpen = 301,

    // Protocol errors (4xx)
    ProtocolMalformed = 400,
    PatchDecode = 401,
    BufferReference = 402,

    // Widget errors (5xx)
    UnknownWidget = 500,
    UnregisteredWidget = 501,
    WrongWidgetType = 502,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI (maps to 1-125 range)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10, // Config errors
            200..=299 => 20, // IO errors
            300..=399 => 30, // Comm errors
            400..=499 => 40, // Protocol errors
            500..=599 => 50, // Widget errors
            900..=999 => 90, // Internal errors
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for the widget host
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    /// Generic configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// File read error
    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File write error
    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    // ─────────────────────────────────────────────────────────────
    // Comm Errors
    // ─────────────────────────────────────────────────────────────

    /// The receiving side of the transport has gone away
    #[error("Comm transport closed")]
    TransportClosed,

    /// Widget has no open comm to send on
    #[error("Comm for widget {id} is not open")]
    CommNotOpen { id: String },

    // ─────────────────────────────────────────────────────────────
    // Protocol Errors
    // ─────────────────────────────────────────────────────────────

    /// Malformed comm message
    #[error("Malformed comm message: {message}")]
    ProtocolMalformed { message: String },

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A patch value could not be decoded into its property type
    #[error("Cannot decode property '{field}': {message}")]
    PatchDecode { field: String, message: String },

    /// A buffer path or placeholder does not resolve
    #[error("Invalid buffer reference: {message}")]
    BufferReference { message: String },

    // ─────────────────────────────────────────────────────────────
    // Widget Errors
    // ─────────────────────────────────────────────────────────────

    /// No live widget with this id
    #[error("Unknown widget: {id}")]
    UnknownWidget { id: String },

    /// No constructor registered for this model/view tuple
    #[error("No widget registered for {model_module}:{model_name} / {view_module}:{view_name}")]
    UnregisteredWidget {
        model_module: String,
        model_name: String,
        view_module: String,
        view_name: String,
    },

    /// Widget exists but is not of the requested kind
    #[error("Widget {id} is not a {expected}")]
    WrongWidgetType { id: String, expected: &'static str },

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    // ─────────────────────────────────────────────────────────────
    // Error Classification
    // ─────────────────────────────────────────────────────────────

    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,
            Error::Config(_) => ErrorCode::ConfigValidation,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) => ErrorCode::ConfigParseError,

            Error::TransportClosed => ErrorCode::TransportClosed,
            Error::CommNotOpen { .. } => ErrorCode::CommNotOpen,

            Error::ProtocolMalformed { .. } => ErrorCode::ProtocolMalformed,
            Error::Json(_) => ErrorCode::ProtocolMalformed,
            Error::PatchDecode { .. } => ErrorCode::PatchDecode,
            Error::BufferReference { .. } => ErrorCode::BufferReference,

            Error::UnknownWidget { .. } => ErrorCode::UnknownWidget,
            Error::UnregisteredWidget { .. } => ErrorCode::UnregisteredWidget,
            Error::WrongWidgetType { .. } => ErrorCode::WrongWidgetType,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Check if the error is fatal (host should exit)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ConfigNotFound { .. }
                | Error::ConfigParse { .. }
                | Error::ConfigValidation { .. }
                | Error::Config(_)
                | Error::TransportClosed
                | Error::Internal(_)
        )
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'webrtc-widgets config init' to create a default configuration file."
            ),
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'webrtc-widgets config validate' to see details."
            ),
            Error::ConfigValidation { .. } => Some(
                "Review the configuration file and fix the invalid values."
            ),
            Error::TransportClosed => Some(
                "The front-end side of the comm channel went away. Restart the host."
            ),
            Error::UnregisteredWidget { .. } => Some(
                "Run 'webrtc-widgets widgets' to list the widget types this host can create."
            ),
            Error::PatchDecode { .. } => Some(
                "The front-end sent a property value of the wrong JSON type."
            ),
            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let code = self.code();
        let suggestion = self.suggestion();

        let mut output = format!(
            "\x1b[31mError [{}]\x1b[0m: {}\n",
            code.as_str(),
            self
        );

        if let Some(hint) = suggestion {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code().as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Error::ConfigNotFound { path: path.into() }
    }

    /// Create a config validation error with field name
    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a malformed protocol message error
    pub fn malformed(message: impl Into<String>) -> Self {
        Error::ProtocolMalformed {
            message: message.into(),
        }
    }

    /// Create a patch decode error
    pub fn patch_decode(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::PatchDecode {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an unknown widget error
    pub fn unknown_widget(id: impl fmt::Display) -> Self {
        Error::UnknownWidget { id: id.to_string() }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
