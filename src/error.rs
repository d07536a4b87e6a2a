//! Structured error types for configuration resolution.

use serde::Serialize;
use std::path::PathBuf;

/// Error category for programmatic handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// The config file exists but could not be read.
    Io,
    /// The config file is not a valid YAML mapping.
    Parse,
    /// A value has the wrong type for its field.
    Decode,
    /// The decoded config breaks a required invariant.
    Invariant,
    /// Process-wide config state misuse.
    State,
}

/// Fatal configuration error. "File not found" is never one of these.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid value for `{field}`: {message}")]
    Decode { field: String, message: String },

    #[error("invalid configuration `{field}`: {reason}")]
    InvariantViolation { field: String, reason: String },

    #[error("configuration has already been installed")]
    AlreadyInstalled,
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::Read { .. } => ErrorKind::Io,
            ConfigError::Parse { .. } => ErrorKind::Parse,
            ConfigError::Decode { .. } => ErrorKind::Decode,
            ConfigError::InvariantViolation { .. } => ErrorKind::Invariant,
            ConfigError::AlreadyInstalled => ErrorKind::State,
        }
    }

    // Convenience constructors

    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ConfigError::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn decode(field: impl Into<String>, err: impl std::fmt::Display) -> Self {
        ConfigError::Decode {
            field: field.into(),
            message: err.to_string(),
        }
    }

    pub fn invariant(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvariantViolation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
