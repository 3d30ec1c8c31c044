use super::error::{AdbError, AdbResult};
use super::types::{Bridge, CommandOutput, DeviceRecord};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

const SERVER_TIMEOUT: Duration = Duration::from_secs(10);
const QUERY_TIMEOUT: Duration = Duration::from_secs(3);

/// Bridge backed by spawning the `adb` executable for every operation.
#[derive(Debug, Default)]
pub struct AdbShell {
    executable: Option<PathBuf>,
    listed_once: bool,
}

impl AdbShell {
    pub fn new() -> Self {
        Self::default()
    }

    fn command(&self) -> AdbResult<Command> {
        let executable = self
            .executable
            .as_ref()
            .ok_or_else(|| AdbError::other("adb bridge not started"))?;
        let mut cmd = Command::new(executable);
        cmd.kill_on_drop(true);
        Ok(cmd)
    }

    async fn run(&self, args: &[&str], timeout: Duration) -> AdbResult<Output> {
        let mut cmd = self.command()?;
        cmd.args(args);
        let description = format!("adb {}", args.join(" "));
        debug!("Running {description}");
        match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Err(AdbError::NotInstalled)
                } else {
                    Err(AdbError::other(format!("Failed to run {description}: {e}")))
                }
            }
            Err(_) => Err(AdbError::timeout(timeout, description)),
        }
    }

    async fn list(&self) -> AdbResult<Vec<DeviceRecord>> {
        let output = self.run(&["devices", "-l"], QUERY_TIMEOUT).await?;
        if !output.status.success() {
            return Err(AdbError::other(format!(
                "adb devices failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(Self::parse_devices(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Parse `adb devices -l`, keeping only online, authorized devices.
    pub fn parse_devices(output: &str) -> Vec<DeviceRecord> {
        output
            .lines()
            .filter(|line| !line.starts_with("List of devices") && !line.starts_with('*'))
            .filter_map(|line| {
                let parts: Vec<&str> = line.split_whitespace().collect();
                if parts.len() >= 2 && parts[1] == "device" {
                    let model = parts
                        .iter()
                        .find_map(|part| part.strip_prefix("model:"))
                        .filter(|m| !m.is_empty())
                        .map(str::to_string);
                    Some(DeviceRecord {
                        serial: parts[0].to_string(),
                        model,
                    })
                } else {
                    None
                }
            })
            .collect()
    }
}

fn to_command_output(output: Output) -> CommandOutput {
    CommandOutput {
        success: output.status.success(),
        status: output.status.to_string(),
        stdout: output.stdout,
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

impl Bridge for AdbShell {
    async fn start(&mut self, executable: &Path) -> AdbResult<()> {
        self.executable = Some(executable.to_path_buf());
        self.listed_once = false;
        let output = self.run(&["start-server"], SERVER_TIMEOUT).await?;
        if !output.status.success() {
            return Err(AdbError::other(format!(
                "adb start-server failed ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }

    async fn shutdown(&mut self) {
        // The adb server is shared with other tools, so it is left running.
        self.executable = None;
        self.listed_once = false;
    }

    async fn is_connected(&mut self) -> bool {
        if self.executable.is_none() {
            return false;
        }
        match self.run(&["devices"], QUERY_TIMEOUT).await {
            Ok(output) => output.status.success(),
            Err(e) => {
                debug!("adb connectivity probe failed: {e}");
                false
            }
        }
    }

    async fn has_initial_device_list(&mut self) -> bool {
        if !self.listed_once {
            match self.list().await {
                Ok(_) => self.listed_once = true,
                Err(e) => debug!("Initial device list not ready: {e}"),
            }
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
        let mut args = vec!["-s", serial, "shell"];
        args.extend_from_slice(command);
        Ok(to_command_output(self.run(&args, timeout).await?))
    }

    async fn exec_out(
        &mut self,
        serial: &str,
        command: &[&str],
        timeout: Duration,
    ) -> AdbResult<CommandOutput> {
        let mut args = vec!["-s", serial, "exec-out"];
        args.extend_from_slice(command);
        Ok(to_command_output(self.run(&args, timeout).await?))
    }

    async fn pull(
        &mut self,
        serial: &str,
        remote: &str,
        local: &Path,
        timeout: Duration,
    ) -> AdbResult<CommandOutput> {
        let local = local.to_string_lossy().into_owned();
        let output = self
            .run(&["-s", serial, "pull", remote, local.as_str()], timeout)
            .await?;
        if !output.status.success() {
            warn!(
                "adb pull {remote} failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(to_command_output(output))
    }

    fn name(&self) -> &'static str {
        "shell"
    }
}
