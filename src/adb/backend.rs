use super::error::AdbResult;
use super::rust_impl::RustAdb;
use super::shell::AdbShell;
use super::types::{Bridge, CommandOutput, DeviceRecord};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendKind {
    /// Spawn the `adb` executable for each operation.
    #[default]
    Shell,
    /// Talk to the adb server through `adb_client`.
    Rust,
}

impl BackendKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "shell" => Some(BackendKind::Shell),
            "rust" => Some(BackendKind::Rust),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Shell => "shell",
            BackendKind::Rust => "rust",
        }
    }
}

pub enum AdbBackend {
    Shell(AdbShell),
    Rust(RustAdb),
}

impl AdbBackend {
    pub fn new(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Shell => AdbBackend::Shell(AdbShell::new()),
            BackendKind::Rust => AdbBackend::Rust(RustAdb::new()),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            AdbBackend::Shell(_) => BackendKind::Shell,
            AdbBackend::Rust(_) => BackendKind::Rust,
        }
    }
}

impl Bridge for AdbBackend {
    async fn start(&mut self, executable: &Path) -> AdbResult<()> {
        match self {
            AdbBackend::Shell(s) => s.start(executable).await,
            AdbBackend::Rust(r) => r.start(executable).await,
        }
    }

    async fn shutdown(&mut self) {
        match self {
            AdbBackend::Shell(s) => s.shutdown().await,
            AdbBackend::Rust(r) => r.shutdown().await,
        }
    }

    async fn is_connected(&mut self) -> bool {
        match self {
            AdbBackend::Shell(s) => s.is_connected().await,
            AdbBackend::Rust(r) => r.is_connected().await,
        }
    }

    async fn has_initial_device_list(&mut self) -> bool {
        match self {
            AdbBackend::Shell(s) => s.has_initial_device_list().await,
            AdbBackend::Rust(r) => r.has_initial_device_list().await,
        }
    }

    async fn devices(&mut self) -> AdbResult<Vec<DeviceRecord>> {
        match self {
            AdbBackend::Shell(s) => s.devices().await,
            AdbBackend::Rust(r) => r.devices().await,
        }
    }

    async fn shell(
        &mut self,
        serial: &str,
        command: &[&str],
        timeout: Duration,
    ) -> AdbResult<CommandOutput> {
        match self {
            AdbBackend::Shell(s) => s.shell(serial, command, timeout).await,
            AdbBackend::Rust(r) => r.shell(serial, command, timeout).await,
        }
    }

    async fn exec_out(
        &mut self,
        serial: &str,
        command: &[&str],
        timeout: Duration,
    ) -> AdbResult<CommandOutput> {
        match self {
            AdbBackend::Shell(s) => s.exec_out(serial, command, timeout).await,
            AdbBackend::Rust(r) => r.exec_out(serial, command, timeout).await,
        }
    }

    async fn pull(
        &mut self,
        serial: &str,
        remote: &str,
        local: &Path,
        timeout: Duration,
    ) -> AdbResult<CommandOutput> {
        match self {
            AdbBackend::Shell(s) => s.pull(serial, remote, local, timeout).await,
            AdbBackend::Rust(r) => r.pull(serial, remote, local, timeout).await,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            AdbBackend::Shell(s) => s.name(),
            AdbBackend::Rust(r) => r.name(),
        }
    }
}
