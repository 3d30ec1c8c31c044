// Screenshot worker: runs bridge work off the caller's thread and reports
// back over the event channel. One command at a time.
use super::channels::create_tool_channels;
use super::save_location::{FixedDirectory, SaveDirectory};
use super::types::{CaptureFailure, DeviceStatus, ToolCommand, ToolEvent};
use crate::adb::{
    AdbBackend, Bridge, BridgeLocator, BridgeSession, ConfiguredAdbPath, DeviceCaptureClient,
    Environment, SdkPathService,
};
use crate::config::ScreenshotConfig;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

pub struct ScreenshotTool<B: Bridge> {
    client: DeviceCaptureClient<B>,
    save_dir: Box<dyn SaveDirectory>,
    command_rx: mpsc::Receiver<ToolCommand>,
    event_tx: mpsc::Sender<ToolEvent>,
}

impl<B: Bridge> ScreenshotTool<B> {
    pub fn new(
        client: DeviceCaptureClient<B>,
        save_dir: Box<dyn SaveDirectory>,
        command_rx: mpsc::Receiver<ToolCommand>,
        event_tx: mpsc::Sender<ToolEvent>,
    ) -> Self {
        Self {
            client,
            save_dir,
            command_rx,
            event_tx,
        }
    }

    /// Process commands until `Shutdown` or until every sender is gone.
    pub async fn run(mut self) {
        let backend = self.client.session().lock().await.backend_name();
        info!(
            "Screenshot worker started (impl={backend}, transport={:?})",
            self.client.strategy()
        );
        while let Some(command) = self.command_rx.recv().await {
            debug!("Worker command: {command:?}");
            match command {
                ToolCommand::Reload => self.reload().await,
                ToolCommand::ListDevices => self.list_devices().await,
                ToolCommand::Capture => self.capture().await,
                ToolCommand::Shutdown => break,
            }
        }
        debug!("Screenshot worker stopped");
    }

    async fn emit(&self, event: ToolEvent) {
        if self.event_tx.send(event).await.is_err() {
            debug!("Event receiver dropped");
        }
    }

    async fn reload(&self) {
        self.emit(ToolEvent::Status(DeviceStatus::Searching)).await;
        let status = {
            let mut session = self.client.session().lock().await;
            match session.reload().await {
                Ok(()) => {
                    let devices = session.list_devices().await;
                    DeviceStatus::from_enumeration(&devices, session.last_failure())
                }
                Err(err) => DeviceStatus::from_enumeration(&[], Some(&err)),
            }
        };
        info!("{status}");
        self.emit(ToolEvent::Status(status)).await;
    }

    async fn list_devices(&self) {
        let (devices, status) = {
            let mut session = self.client.session().lock().await;
            let devices = session.list_devices().await;
            let status = DeviceStatus::from_enumeration(&devices, session.last_failure());
            (devices, status)
        };
        self.emit(ToolEvent::Devices(devices)).await;
        self.emit(ToolEvent::Status(status)).await;
    }

    async fn capture(&self) {
        let Some(dir) = self.save_dir.directory() else {
            warn!("Capture requested without a save directory");
            self.emit(ToolEvent::CaptureFailed(CaptureFailure::NoSaveDirectory))
                .await;
            return;
        };

        let capture = match self.client.capture().await {
            Ok(capture) => capture,
            Err(err) => {
                warn!("Screenshot capture failed: {err}");
                self.emit(ToolEvent::CaptureFailed(err.into())).await;
                return;
            }
        };

        let path = dir.join(&capture.file_name);
        match tokio::fs::write(&path, &capture.bytes).await {
            Ok(()) => {
                info!("Screenshot saved successfully to: {}", path.display());
                self.emit(ToolEvent::Saved {
                    path,
                    bytes: capture.bytes.len(),
                })
                .await;
            }
            Err(e) => {
                warn!("Could not write {}: {e}", path.display());
                self.emit(ToolEvent::CaptureFailed(CaptureFailure::Write {
                    path,
                    message: e.to_string(),
                }))
                .await;
            }
        }
    }
}

/// Build the bridge stack from `config` and run a worker for it on the
/// current tokio runtime.
pub fn spawn_screenshot_tool(
    config: &ScreenshotConfig,
) -> (mpsc::Sender<ToolCommand>, mpsc::Receiver<ToolEvent>) {
    let env = Environment::from_process();
    let host_sdk = config
        .adb_path
        .clone()
        .map(|path| Arc::new(ConfiguredAdbPath(path)) as Arc<dyn SdkPathService>);
    let locator = BridgeLocator::new(host_sdk, &env);
    let session = BridgeSession::new(AdbBackend::new(config.backend), locator, env, config.poll);
    let client = DeviceCaptureClient::new(
        Arc::new(Mutex::new(session)),
        config.transport.clone(),
        config.capture_timeout,
    );
    let save_dir = Box::new(FixedDirectory::new(config.output_dir.clone()));

    let (cmd_tx, cmd_rx, event_tx, event_rx) = create_tool_channels();
    let tool = ScreenshotTool::new(client, save_dir, cmd_rx, event_tx);
    tokio::spawn(tool.run());
    (cmd_tx, event_rx)
}
