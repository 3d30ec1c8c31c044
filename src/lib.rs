pub mod adb;
pub mod config;
pub mod tool;

pub use adb::{AdbBackend, AdbError, DeviceCaptureClient};
pub use config::ScreenshotConfig;
