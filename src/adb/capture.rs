// Screen capture from the selected device over one of two transports.
use super::error::{AdbError, AdbResult};
use super::session::BridgeSession;
use super::types::{Bridge, CommandOutput, ImageCapture};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use time::OffsetDateTime;
use tokio::sync::Mutex;

pub const DEFAULT_REMOTE_PATH: &str = "/sdcard/screenshot.png";

/// Session shared between the capture client and whoever triggers reloads.
/// The lock is held for a whole capture, so reloads never interleave with one.
pub type SharedSession<B> = Arc<Mutex<BridgeSession<B>>>;

/// How the PNG bytes travel from the device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TransportStrategy {
    /// `screencap -p` with the PNG streamed on stdout.
    #[default]
    ExecOut,
    /// `screencap -p <remote_path>`, pull the file, then remove it.
    PullFile { remote_path: String },
}

impl TransportStrategy {
    pub fn pull_file() -> Self {
        TransportStrategy::PullFile {
            remote_path: DEFAULT_REMOTE_PATH.to_string(),
        }
    }
}

pub struct DeviceCaptureClient<B: Bridge> {
    session: SharedSession<B>,
    strategy: TransportStrategy,
    timeout: Duration,
}

impl<B: Bridge> DeviceCaptureClient<B> {
    pub fn new(session: SharedSession<B>, strategy: TransportStrategy, timeout: Duration) -> Self {
        Self {
            session,
            strategy,
            timeout,
        }
    }

    pub fn session(&self) -> &SharedSession<B> {
        &self.session
    }

    pub fn strategy(&self) -> &TransportStrategy {
        &self.strategy
    }

    /// Capture the screen of the first enumerated device.
    pub async fn capture(&self) -> AdbResult<ImageCapture> {
        let mut session = self.session.lock().await;
        let devices = session.list_devices().await;
        if let Some(err) = session.last_failure() {
            return Err(err.clone());
        }
        let device = devices.into_iter().next().ok_or(AdbError::NoDevice)?;
        info!(
            "Capturing screenshot from {} via {:?}",
            device.serial, self.strategy
        );

        let start = Instant::now();
        let bridge = session.bridge_mut();
        let result = match &self.strategy {
            TransportStrategy::ExecOut => exec_out(bridge, &device.serial, self.timeout).await,
            TransportStrategy::PullFile { remote_path } => {
                pull_file(bridge, &device.serial, remote_path, self.timeout).await
            }
        };
        let bytes = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                session.note_bridge_failure(&e).await;
                return Err(e);
            }
        };
        if bytes.is_empty() {
            warn!("Screenshot capture returned empty data");
            return Err(AdbError::EmptyResult);
        }

        let captured_at = OffsetDateTime::now_utc();
        let duration_ms = start.elapsed().as_millis();
        info!("Captured {} bytes of screenshot data in {duration_ms}ms", bytes.len());
        Ok(ImageCapture {
            bytes,
            file_name: screenshot_file_name(captured_at),
            serial: device.serial,
            captured_at_unix: captured_at.unix_timestamp(),
            duration_ms,
        })
    }
}

async fn exec_out<B: Bridge>(bridge: &mut B, serial: &str, timeout: Duration) -> AdbResult<Vec<u8>> {
    let command = ["screencap", "-p"];
    let output = bridge.exec_out(serial, &command, timeout).await?;
    check(&command.join(" "), &output)?;
    Ok(output.stdout)
}

async fn pull_file<B: Bridge>(
    bridge: &mut B,
    serial: &str,
    remote_path: &str,
    timeout: Duration,
) -> AdbResult<Vec<u8>> {
    let command = ["screencap", "-p", remote_path];
    let output = bridge.shell(serial, &command, timeout).await?;
    check(&command.join(" "), &output)?;

    let result = pull_to_memory(bridge, serial, remote_path, timeout).await;

    match bridge.shell(serial, &["rm", "-f", remote_path], timeout).await {
        Ok(out) if out.success => debug!("Removed {remote_path} from device"),
        Ok(out) => warn!("Could not remove {remote_path} ({}): {}", out.status, out.stderr.trim()),
        Err(e) => warn!("Could not remove {remote_path}: {e}"),
    }
    result
}

async fn pull_to_memory<B: Bridge>(
    bridge: &mut B,
    serial: &str,
    remote_path: &str,
    timeout: Duration,
) -> AdbResult<Vec<u8>> {
    let local = tempfile::Builder::new()
        .prefix("adb-screenshot-")
        .suffix(".png")
        .tempfile()?;
    let output = bridge.pull(serial, remote_path, local.path(), timeout).await?;
    check(&format!("pull {remote_path}"), &output)?;
    Ok(tokio::fs::read(local.path()).await?)
}

fn check(command: &str, output: &CommandOutput) -> AdbResult<()> {
    if output.success {
        return Ok(());
    }
    Err(AdbError::TransportError {
        command: command.to_string(),
        status: output.status.clone(),
        stderr: output.stderr.clone(),
    })
}

/// `yyyyMMdd_HHmmss.png` in UTC. Lexicographic order matches capture order.
pub fn screenshot_file_name(at: OffsetDateTime) -> String {
    let at = at.to_offset(time::UtcOffset::UTC);
    format!(
        "{:04}{:02}{:02}_{:02}{:02}{:02}.png",
        at.year(),
        u8::from(at.month()),
        at.day(),
        at.hour(),
        at.minute(),
        at.second()
    )
}
