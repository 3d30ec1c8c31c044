//! Configuration for the screenshot tool

use crate::adb::{BackendKind, PollPolicy, TransportStrategy};
use log::warn;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_ADB_IMPL: &str = "ADB_IMPL";
pub const ENV_ADB_PATH: &str = "ADB_PATH";

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenshotConfig {
    /// Which bridge backend to drive
    pub backend: BackendKind,
    /// How the PNG travels off the device
    pub transport: TransportStrategy,
    /// Readiness polling for bridge start-up
    pub poll: PollPolicy,
    /// Upper bound for each capture step
    pub capture_timeout: Duration,
    /// Explicit adb executable, tried before any discovery
    pub adb_path: Option<PathBuf>,
    /// Where captures are written; `None` means no directory chosen
    pub output_dir: Option<PathBuf>,
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Shell,
            transport: TransportStrategy::ExecOut,
            poll: PollPolicy::default(),
            capture_timeout: Duration::from_secs(10),
            adb_path: None,
            output_dir: Some(PathBuf::from(".")),
        }
    }
}

impl ScreenshotConfig {
    /// Defaults overridden by `ADB_IMPL` and `ADB_PATH`.
    pub fn from_env() -> Self {
        Self::from_vars(&std::env::vars().collect())
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let mut config = Self::default();
        if let Some(value) = vars.get(ENV_ADB_IMPL) {
            match BackendKind::parse(value) {
                Some(kind) => config.backend = kind,
                None => warn!("Ignoring {ENV_ADB_IMPL}={value}, expected 'shell' or 'rust'"),
            }
        }
        if let Some(path) = vars.get(ENV_ADB_PATH).filter(|p| !p.trim().is_empty()) {
            config.adb_path = Some(PathBuf::from(path));
        }
        config
    }
}
