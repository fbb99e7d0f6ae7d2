//! Error types and handling for the CLI

use std::io;
use std::path::PathBuf;

use tellcore_ffi::ResultCategory;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for CLI operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error reported by the driver binding
    #[error("{0}")]
    Driver(#[from] tellcore_ffi::Error),

    /// File not found
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid argument combination
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic error with context
    #[error("{message}")]
    Other { message: String },
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a generic error with message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io(_) => 1,
            Self::Driver(tellcore_ffi::Error::InvalidArgument { .. }) => 6,
            Self::Driver(tellcore_ffi::Error::Load { .. }) => 7,
            Self::Driver(_) => 2,
            Self::FileNotFound { .. } => 3,
            Self::Config(_) => 5,
            Self::InvalidArgs(_) => 6,
            Self::Json(_) => 12,
            Self::Toml(_) => 13,
            Self::Other { .. } => 99,
        }
    }

    /// Check if this error should display usage help
    pub fn should_show_help(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgs(_) | Self::Driver(tellcore_ffi::Error::InvalidArgument { .. })
        )
    }

    /// A suggestion for failures with a likely local cause
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Driver(tellcore_ffi::Error::Load { .. }) => Some(
                "Install telldus-core or point `binding.library_path` in the config at the library",
            ),
            Self::Driver(e) => match e.category()? {
                ResultCategory::NotFound => Some("Is a TellStick plugged in?"),
                ResultCategory::ConnectionFailure => Some("Is the telldusd service running?"),
                ResultCategory::PermissionDenied => {
                    Some("Check that your user may access the TellStick device")
                }
                ResultCategory::DeviceNotFound => Some("Run `tdctl list` to see device ids"),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Format an error for display to the user
pub fn format_error(error: &Error, use_color: bool) -> String {
    let mut message = if use_color {
        use colored::Colorize;
        format!("{} {}", "Error:".red().bold(), error)
    } else {
        format!("Error: {}", error)
    };

    if let Some(hint) = error.hint() {
        if use_color {
            use colored::Colorize;
            message.push_str(&format!("\n{} {}", "Hint:".yellow(), hint));
        } else {
            message.push_str(&format!("\nHint: {}", hint));
        }
    }

    message
}
