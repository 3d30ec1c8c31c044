// Core bridge types and the trait both backends implement
use super::error::AdbResult;
use std::path::Path;
use std::time::Duration;

/// One attached device as reported by the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub serial: String,
    pub model: Option<String>,
}

impl DeviceRecord {
    pub fn new(serial: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Model name when the bridge reported one, otherwise the serial.
    pub fn display_name(&self) -> &str {
        self.model.as_deref().unwrap_or(&self.serial)
    }
}

/// A successful capture: PNG bytes plus the name the file should be saved as.
#[derive(Debug, Clone)]
pub struct ImageCapture {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub serial: String,
    pub captured_at_unix: i64,
    pub duration_ms: u128,
}

/// Result of one remote command. `success` mirrors a zero exit status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub status: String,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: Vec<u8>) -> Self {
        Self {
            success: true,
            status: "exit status: 0".to_string(),
            stdout,
            stderr: String::new(),
        }
    }

    pub fn failed(status: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            status: status.into(),
            stdout: Vec::new(),
            stderr: stderr.into(),
        }
    }

    #[cfg(test)]
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

// Capabilities of a bridge connection (CLI subprocess or adb_client library).
// Methods return `AdbError::Other` for transport-level faults and leave
// non-zero exits to the caller through `CommandOutput::success`.
#[allow(async_fn_in_trait)]
pub trait Bridge: Send + Sync {
    /// Launch or attach to the bridge server using the given executable.
    async fn start(&mut self, executable: &Path) -> AdbResult<()>;

    /// Drop the current connection. The next `start` begins from scratch.
    async fn shutdown(&mut self);

    async fn is_connected(&mut self) -> bool;

    async fn has_initial_device_list(&mut self) -> bool;

    async fn devices(&mut self) -> AdbResult<Vec<DeviceRecord>>;

    /// Run `command` in the remote shell of `serial`, collecting raw stdout.
    async fn shell(
        &mut self,
        serial: &str,
        command: &[&str],
        timeout: Duration,
    ) -> AdbResult<CommandOutput>;

    /// Like [`shell`](Self::shell) but for commands whose stdout is binary.
    async fn exec_out(
        &mut self,
        serial: &str,
        command: &[&str],
        timeout: Duration,
    ) -> AdbResult<CommandOutput> {
        self.shell(serial, command, timeout).await
    }

    /// Copy `remote` from the device to the local file `local`.
    async fn pull(
        &mut self,
        serial: &str,
        remote: &str,
        local: &Path,
        timeout: Duration,
    ) -> AdbResult<CommandOutput>;

    fn name(&self) -> &'static str;
}
