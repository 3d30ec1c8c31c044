use std::time::Duration;
use thiserror::Error;

/// Timeout description used while waiting for the bridge to accept connections.
pub const WAIT_FOR_CONNECTION: &str = "waiting for bridge connection";

/// A specialized `Result` type for bridge and capture operations.
pub type AdbResult<T> = Result<T, AdbError>;

/// The error type for all bridge, session and capture operations.
///
/// Every failure crossing a module boundary is one of these values. Library
/// and I/O errors are converted where they happen, so callers only ever need
/// to match on the variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdbError {
    #[error("adb executable not found. Install Android Platform Tools or set ANDROID_HOME.")]
    NotInstalled,

    #[error("Operation timed out after {duration:?}: {description}")]
    Timeout {
        duration: Duration,
        description: String,
    },

    #[error("No running device found")]
    NoDevice,

    #[error("Command '{command}' failed ({status}): {stderr}")]
    TransportError {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Capture produced no data")]
    EmptyResult,

    #[error("{0}")]
    Other(String),
}

/// Fieldless mirror of [`AdbError`] for presentation code that only cares
/// which kind of failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NotInstalled,
    Timeout,
    NoDevice,
    TransportError,
    EmptyResult,
    Other,
}

impl AdbError {
    pub fn timeout(duration: Duration, description: impl Into<String>) -> Self {
        AdbError::Timeout {
            duration,
            description: description.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        AdbError::Other(message.into())
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            AdbError::NotInstalled => FailureKind::NotInstalled,
            AdbError::Timeout { .. } => FailureKind::Timeout,
            AdbError::NoDevice => FailureKind::NoDevice,
            AdbError::TransportError { .. } => FailureKind::TransportError,
            AdbError::EmptyResult => FailureKind::EmptyResult,
            AdbError::Other(_) => FailureKind::Other,
        }
    }

    /// One human-readable line per failure kind, for dialogs and CLI output.
    pub fn user_message(&self) -> String {
        match self {
            AdbError::NotInstalled => {
                "adb not found. Install Android Platform Tools (https://developer.android.com/tools/adb) or pass --adb=<path>.".to_string()
            }
            AdbError::Timeout { description, .. } => {
                format!("Timed out: {description}. Check that the device is responsive and try again.")
            }
            AdbError::NoDevice => {
                "No running device found. Please start a device and try again.".to_string()
            }
            AdbError::TransportError { command, stderr, .. } => {
                if stderr.trim().is_empty() {
                    format!("Failed to capture screenshot from device ('{command}' failed).")
                } else {
                    format!(
                        "Failed to capture screenshot from device ('{command}' failed: {}).",
                        stderr.trim()
                    )
                }
            }
            AdbError::EmptyResult => "Failed to capture screenshot from device.".to_string(),
            AdbError::Other(message) => format!("An error occurred: {message}"),
        }
    }

    /// The bridge was located but never came up.
    pub fn is_connect_timeout(&self) -> bool {
        matches!(self, AdbError::Timeout { description, .. } if description == WAIT_FOR_CONNECTION)
    }

    /// Whether the underlying bridge connection should be treated as gone.
    pub fn is_disconnect(&self) -> bool {
        match self {
            AdbError::Other(message) => {
                let lower = message.to_lowercase();
                lower.contains("connection refused")
                    || lower.contains("broken pipe")
                    || lower.contains("connection reset")
                    || lower.contains("device offline")
                    || lower.contains("not found")
            }
            _ => false,
        }
    }
}

impl From<adb_client::RustADBError> for AdbError {
    fn from(source: adb_client::RustADBError) -> Self {
        AdbError::Other(source.to_string())
    }
}

impl From<std::io::Error> for AdbError {
    fn from(source: std::io::Error) -> Self {
        AdbError::Other(source.to_string())
    }
}

impl From<tokio::task::JoinError> for AdbError {
    fn from(source: tokio::task::JoinError) -> Self {
        AdbError::Other(format!("Task failed to complete: {source}"))
    }
}
