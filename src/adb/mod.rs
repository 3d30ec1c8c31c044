// ADB module - device discovery and screen capture over the Android Debug Bridge.
// The bridge is reached either by spawning the adb executable or through the
// adb_client library; both sit behind the `Bridge` trait.

pub mod backend;
pub mod capture;
pub mod error;
pub mod locator;
pub mod rust_impl;
pub mod session;
pub mod shell;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export the main types and functions for easy access
pub use backend::{AdbBackend, BackendKind};
pub use capture::{DeviceCaptureClient, SharedSession, TransportStrategy, screenshot_file_name};
pub use error::{AdbError, AdbResult, FailureKind, WAIT_FOR_CONNECTION};
pub use locator::{BridgeLocator, ConfiguredAdbPath, Environment, LocateStrategy, SdkPathService};
pub use rust_impl::RustAdb;
pub use session::{BridgeHandle, BridgeSession, ConnectionState, PollPolicy, SessionState};
pub use shell::AdbShell;
pub use types::{Bridge, CommandOutput, DeviceRecord, ImageCapture};
