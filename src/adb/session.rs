// Lifecycle of one bridge connection: locate, start, wait, enumerate, tear down.
use super::error::{AdbError, AdbResult, WAIT_FOR_CONNECTION};
use super::locator::{BridgeLocator, Environment};
use super::types::{Bridge, DeviceRecord};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::time::Duration;

/// How often and for how long readiness is polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// The live connection record. At most one exists per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeHandle {
    pub executable: PathBuf,
    pub connection: ConnectionState,
    pub initial_device_list_loaded: bool,
}

#[derive(Debug, Clone, Copy)]
enum Readiness {
    Connected,
    InitialDeviceList,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Ready,
    Failed(AdbError),
}

pub struct BridgeSession<B: Bridge> {
    bridge: B,
    locator: BridgeLocator,
    env: Environment,
    poll: PollPolicy,
    state: SessionState,
    handle: Option<BridgeHandle>,
    devices: Vec<DeviceRecord>,
}

impl<B: Bridge> BridgeSession<B> {
    pub fn new(bridge: B, locator: BridgeLocator, env: Environment, poll: PollPolicy) -> Self {
        Self {
            bridge,
            locator,
            env,
            poll,
            state: SessionState::Idle,
            handle: None,
            devices: Vec::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn handle(&self) -> Option<&BridgeHandle> {
        self.handle.as_ref()
    }

    pub fn last_failure(&self) -> Option<&AdbError> {
        match &self.state {
            SessionState::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Index 0 of the most recent enumeration.
    pub fn selected_device(&self) -> Option<&DeviceRecord> {
        self.devices.first()
    }

    pub fn backend_name(&self) -> &'static str {
        self.bridge.name()
    }

    pub(crate) fn bridge_mut(&mut self) -> &mut B {
        &mut self.bridge
    }

    /// Bring the session to `Ready`, or record why it could not get there.
    pub async fn ensure_ready(&mut self) -> AdbResult<()> {
        if self.state == SessionState::Ready {
            if self.bridge.is_connected().await {
                return Ok(());
            }
            warn!("Bridge connection dropped, reinitializing");
            self.teardown().await;
        }

        self.state = SessionState::Connecting;
        let result = self.connect().await;
        match &result {
            Ok(()) => {
                info!("Bridge ready ({})", self.bridge.name());
                self.state = SessionState::Ready;
            }
            Err(e) => {
                warn!("Bridge initialization failed: {e}");
                self.teardown().await;
                self.state = SessionState::Failed(e.clone());
            }
        }
        result
    }

    async fn connect(&mut self) -> AdbResult<()> {
        let executable = self
            .locator
            .locate(&self.env)
            .await
            .ok_or(AdbError::NotInstalled)?;

        self.handle = Some(BridgeHandle {
            executable: executable.clone(),
            connection: ConnectionState::Disconnected,
            initial_device_list_loaded: false,
        });

        self.mark(|h| h.connection = ConnectionState::Connecting);
        self.bridge.start(&executable).await?;

        if !self.wait_for(Readiness::Connected).await {
            return Err(AdbError::timeout(self.poll.timeout, WAIT_FOR_CONNECTION));
        }
        self.mark(|h| h.connection = ConnectionState::Connected);

        if !self.wait_for(Readiness::InitialDeviceList).await {
            return Err(AdbError::timeout(self.poll.timeout, "waiting for initial device list"));
        }
        self.mark(|h| h.initial_device_list_loaded = true);
        Ok(())
    }

    /// Poll the bridge every `poll.interval` until the condition holds or
    /// `poll.timeout` elapses. Checked once more at the deadline.
    async fn wait_for(&mut self, readiness: Readiness) -> bool {
        let deadline = tokio::time::Instant::now() + self.poll.timeout;
        loop {
            let ready = match readiness {
                Readiness::Connected => self.bridge.is_connected().await,
                Readiness::InitialDeviceList => self.bridge.has_initial_device_list().await,
            };
            if ready {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                debug!("Gave up waiting for {readiness:?} after {:?}", self.poll.timeout);
                return false;
            }
            tokio::time::sleep(self.poll.interval).await;
        }
    }

    fn mark(&mut self, update: impl FnOnce(&mut BridgeHandle)) {
        if let Some(handle) = self.handle.as_mut() {
            update(handle);
        }
    }

    async fn teardown(&mut self) {
        if self.handle.take().is_some() {
            debug!("Discarding bridge handle");
        }
        self.bridge.shutdown().await;
        self.devices.clear();
        self.state = SessionState::Idle;
    }

    /// Currently attached devices, in bridge order. Empty on failure; check
    /// [`state`](Self::state) to tell "no devices" from "bridge unavailable".
    pub async fn list_devices(&mut self) -> Vec<DeviceRecord> {
        if self.ensure_ready().await.is_err() {
            return Vec::new();
        }
        match self.bridge.devices().await {
            Ok(devices) => {
                debug!("Enumerated {} device(s)", devices.len());
                self.devices = devices.clone();
                devices
            }
            Err(e) => {
                warn!("Device enumeration failed: {e}");
                self.teardown().await;
                self.state = SessionState::Failed(e);
                Vec::new()
            }
        }
    }

    /// Discard the current handle and run the whole initialization again.
    pub async fn reload(&mut self) -> AdbResult<()> {
        info!("Reloading bridge session");
        self.teardown().await;
        self.ensure_ready().await
    }

    /// Record a failure seen by a caller using the bridge directly, so the
    /// next call re-checks the connection.
    pub(crate) async fn note_bridge_failure(&mut self, err: &AdbError) {
        if err.is_disconnect() {
            warn!("Bridge reported disconnect: {err}");
            self.teardown().await;
        }
    }
}
