// https://crates.io/crates/adb_client
use super::error::{AdbError, AdbResult};
use super::types::{Bridge, CommandOutput, DeviceRecord};
use adb_client::{ADBDeviceExt, ADBServer, DeviceState, RustADBError};
use log::debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Mutex;

const SERVER_TIMEOUT: Duration = Duration::from_secs(10);
const QUERY_TIMEOUT: Duration = Duration::from_secs(3);

/// Bridge backed by the `adb_client` library talking to the adb server.
///
/// The located executable is only used to make sure the server is running;
/// everything after that goes over the server socket.
#[derive(Default)]
pub struct RustAdb {
    server: Option<Arc<Mutex<ADBServer>>>,
    listed_once: bool,
}

impl RustAdb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a blocking `adb_client` call off the async runtime, bounded by `timeout`.
    async fn with_server<T, F>(&self, timeout: Duration, description: &str, f: F) -> AdbResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut ADBServer) -> Result<T, RustADBError> + Send + 'static,
    {
        let server = self
            .server
            .clone()
            .ok_or_else(|| AdbError::other("adb bridge not started"))?;
        let task = tokio::task::spawn_blocking(move || {
            let mut server = server.blocking_lock();
            f(&mut server)
        });
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result.map_err(|e| {
                AdbError::other(format!("RustAdb: {description} failed: {e}"))
            }),
            Ok(Err(join)) => Err(join.into()),
            Err(_) => Err(AdbError::timeout(
                timeout,
                format!("RustAdb: {description} (device may be disconnected)"),
            )),
        }
    }

    async fn list(&self) -> AdbResult<Vec<DeviceRecord>> {
        let long = self
            .with_server(QUERY_TIMEOUT, "devices -l", |server| server.devices_long())
            .await;
        match long {
            Ok(devices) => Ok(devices
                .into_iter()
                .filter(|d| matches!(d.state, DeviceState::Device))
                .map(|d| device_record(d.identifier, &d.model))
                .collect()),
            Err(e) => {
                // The long listing is regex-parsed and rejects unusual lines.
                debug!("RustAdb: long device listing unavailable ({e}), using short form");
                let devices = self
                    .with_server(QUERY_TIMEOUT, "devices", |server| server.devices())
                    .await?;
                Ok(devices
                    .into_iter()
                    .filter(|d| matches!(d.state, DeviceState::Device))
                    .map(|d| DeviceRecord::new(d.identifier))
                    .collect())
            }
        }
    }
}

/// adb_client reports a missing model as "Unk".
fn device_record(identifier: String, model: &str) -> DeviceRecord {
    let record = DeviceRecord::new(identifier);
    match model {
        "" | "Unk" => record,
        model => record.with_model(model),
    }
}

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// The library's shell channel carries no exit status, so a failing
/// `screencap` shows up as its error text on stdout. Anything that is not a
/// PNG is reported as a failed command.
fn expect_png(stdout: Vec<u8>) -> CommandOutput {
    if stdout.is_empty() || stdout.starts_with(PNG_SIGNATURE) {
        return CommandOutput::ok(stdout);
    }
    let text = String::from_utf8_lossy(&stdout);
    let first = text.lines().next().unwrap_or_default().trim().to_string();
    CommandOutput::failed("output is not a PNG", first)
}

async fn start_server(executable: &Path) -> AdbResult<()> {
    let output = Command::new(executable)
        .arg("start-server")
        .kill_on_drop(true)
        .output();
    let output = tokio::time::timeout(SERVER_TIMEOUT, output)
        .await
        .map_err(|_| AdbError::timeout(SERVER_TIMEOUT, "adb start-server"))??;
    if !output.status.success() {
        return Err(AdbError::other(format!(
            "adb start-server failed ({}): {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

impl Bridge for RustAdb {
    async fn start(&mut self, executable: &Path) -> AdbResult<()> {
        start_server(executable).await?;
        self.server = Some(Arc::new(Mutex::new(ADBServer::default())));
        self.listed_once = false;
        Ok(())
    }

    async fn shutdown(&mut self) {
        self.server = None;
        self.listed_once = false;
    }

    async fn is_connected(&mut self) -> bool {
        if self.server.is_none() {
            return false;
        }
        match self.list().await {
            Ok(_) => true,
            Err(e) => {
                debug!("RustAdb: server not reachable: {e}");
                false
            }
        }
    }

    async fn has_initial_device_list(&mut self) -> bool {
        if !self.listed_once {
            self.listed_once = self.list().await.is_ok();
        }
        self.listed_once
    }

    async fn devices(&mut self) -> AdbResult<Vec<DeviceRecord>> {
        self.list().await
    }

    async fn shell(
        &mut self,
        serial: &str,
        command: &[&str],
        timeout: Duration,
    ) -> AdbResult<CommandOutput> {
        let serial = serial.to_string();
        let parts: Vec<String> = command.iter().map(|s| s.to_string()).collect();
        let description = format!("shell {}", parts.join(" "));
        let stdout = self
            .with_server(timeout, &description, move |server| {
                let mut device = server.get_device_by_name(&serial)?;
                let refs: Vec<&str> = parts.iter().map(|s| s.as_str()).collect();
                let mut out: Vec<u8> = Vec::new();
                device.shell_command(&refs, &mut out)?;
                Ok(out)
            })
            .await?;
        Ok(CommandOutput::ok(stdout))
    }

    /// Only used for `screencap -p`, whose stdout must be a PNG.
    async fn exec_out(
        &mut self,
        serial: &str,
        command: &[&str],
        timeout: Duration,
    ) -> AdbResult<CommandOutput> {
        let output = self.shell(serial, command, timeout).await?;
        Ok(expect_png(output.stdout))
    }

    async fn pull(
        &mut self,
        serial: &str,
        remote: &str,
        local: &Path,
        timeout: Duration,
    ) -> AdbResult<CommandOutput> {
        let serial = serial.to_string();
        let remote = remote.to_string();
        let local: PathBuf = local.to_path_buf();
        let mut file = std::fs::File::create(&local)?;
        // A failed pull (missing file, permission) is a command failure, not a
        // broken bridge, so it is reported through the output.
        let result = self
            .with_server(timeout, "pull", move |server| {
                let mut device = server.get_device_by_name(&serial)?;
                Ok(device.pull(&remote, &mut file))
            })
            .await?;
        match result {
            Ok(()) => Ok(CommandOutput::ok(Vec::new())),
            Err(e) => Ok(CommandOutput::failed("pull failed", e.to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "rust"
    }
}
