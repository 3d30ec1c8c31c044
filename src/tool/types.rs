// Commands, events and status lines exchanged with the screenshot worker
use crate::adb::{AdbError, DeviceRecord, FailureKind};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCommand {
    /// Drop the bridge connection, reconnect and refresh the status line.
    Reload,
    /// Enumerate devices without forcing a reload.
    ListDevices,
    /// Capture from the selected device and save to the chosen directory.
    Capture,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceStatus {
    Searching,
    NotFound,
    AdbNotFound,
    Connected(String),
    Error(String),
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceStatus::Searching => f.write_str("Device: Searching..."),
            DeviceStatus::NotFound => f.write_str("Device: Not found"),
            DeviceStatus::AdbNotFound => f.write_str("Device: adb not found"),
            DeviceStatus::Connected(name) => write!(f, "Device: {name} (Connected)"),
            DeviceStatus::Error(detail) => write!(f, "Device: Error - {detail}"),
        }
    }
}

impl DeviceStatus {
    /// Status line for the outcome of an enumeration.
    pub fn from_enumeration(devices: &[DeviceRecord], failure: Option<&AdbError>) -> Self {
        match (failure, devices.first()) {
            (Some(err), _) => match err.kind() {
                FailureKind::NotInstalled => DeviceStatus::AdbNotFound,
                FailureKind::Timeout if err.is_connect_timeout() => DeviceStatus::AdbNotFound,
                _ => DeviceStatus::Error(err.to_string()),
            },
            (None, Some(device)) => DeviceStatus::Connected(device.display_name().to_string()),
            (None, None) => DeviceStatus::NotFound,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureFailure {
    NoSaveDirectory,
    Adb(AdbError),
    Write { path: PathBuf, message: String },
}

impl CaptureFailure {
    /// One line for the user per failure kind.
    pub fn user_message(&self) -> String {
        match self {
            CaptureFailure::NoSaveDirectory => "Please select a save directory first.".to_string(),
            CaptureFailure::Adb(err) => err.user_message(),
            CaptureFailure::Write { path, message } => {
                format!("Could not write {}: {message}", path.display())
            }
        }
    }
}

impl From<AdbError> for CaptureFailure {
    fn from(err: AdbError) -> Self {
        CaptureFailure::Adb(err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolEvent {
    Status(DeviceStatus),
    Devices(Vec<DeviceRecord>),
    Saved { path: PathBuf, bytes: usize },
    CaptureFailed(CaptureFailure),
}
