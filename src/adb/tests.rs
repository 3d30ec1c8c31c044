// Tests for session lifecycle and capture logic
// Focus: readiness polling, failure propagation, transport strategies

#[cfg(test)]
mod session_and_capture_tests {
    use super::super::capture::{DeviceCaptureClient, TransportStrategy};
    use super::super::error::{AdbError, AdbResult};
    use super::super::locator::{BridgeLocator, Environment, LocateStrategy};
    use super::super::session::{BridgeSession, ConnectionState, PollPolicy, SessionState};
    use super::super::types::{Bridge, CommandOutput, DeviceRecord};
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    // ============================================================
    // FAKE BRIDGE
    // ============================================================

    struct FakeState {
        /// Polls of `is_connected` before it reports true; `None` never connects.
        connect_after: Option<u32>,
        /// Polls of `has_initial_device_list` before it reports true.
        list_after: Option<u32>,
        start_error: Option<AdbError>,
        devices: Vec<DeviceRecord>,
        devices_error: Option<AdbError>,
        exec_out: AdbResult<CommandOutput>,
        screencap_to_file: CommandOutput,
        pull: CommandOutput,
        pulled_bytes: Vec<u8>,
        rm: AdbResult<CommandOutput>,
        started: bool,
        connect_polls: u32,
        list_polls: u32,
        starts: u32,
        shutdowns: u32,
        calls: Vec<String>,
    }

    impl Default for FakeState {
        fn default() -> Self {
            Self {
                connect_after: Some(0),
                list_after: Some(0),
                start_error: None,
                devices: vec![DeviceRecord::new("emulator-5554")],
                devices_error: None,
                exec_out: Ok(CommandOutput::ok(vec![0x89; 1024])),
                screencap_to_file: CommandOutput::ok(Vec::new()),
                pull: CommandOutput::ok(Vec::new()),
                pulled_bytes: b"\x89PNG\r\n\x1a\nfake".to_vec(),
                rm: Ok(CommandOutput::ok(Vec::new())),
                started: false,
                connect_polls: 0,
                list_polls: 0,
                starts: 0,
                shutdowns: 0,
                calls: Vec::new(),
            }
        }
    }

    #[derive(Clone, Default)]
    struct FakeBridge {
        state: Arc<Mutex<FakeState>>,
    }

    impl FakeBridge {
        fn with(configure: impl FnOnce(&mut FakeState)) -> Self {
            let bridge = FakeBridge::default();
            configure(&mut bridge.state.lock().unwrap());
            bridge
        }

        fn update(&self, configure: impl FnOnce(&mut FakeState)) {
            configure(&mut self.state.lock().unwrap());
        }

        fn starts(&self) -> u32 {
            self.state.lock().unwrap().starts
        }

        fn calls(&self) -> Vec<String> {
            self.state.lock().unwrap().calls.clone()
        }
    }

    impl Bridge for FakeBridge {
        async fn start(&mut self, _executable: &Path) -> AdbResult<()> {
            let mut s = self.state.lock().unwrap();
            s.starts += 1;
            s.connect_polls = 0;
            s.list_polls = 0;
            if let Some(err) = s.start_error.clone() {
                return Err(err);
            }
            s.started = true;
            Ok(())
        }

        async fn shutdown(&mut self) {
            let mut s = self.state.lock().unwrap();
            s.shutdowns += 1;
            s.started = false;
        }

        async fn is_connected(&mut self) -> bool {
            let mut s = self.state.lock().unwrap();
            if !s.started {
                return false;
            }
            let polls = s.connect_polls;
            s.connect_polls += 1;
            matches!(s.connect_after, Some(n) if polls >= n)
        }

        async fn has_initial_device_list(&mut self) -> bool {
            let mut s = self.state.lock().unwrap();
            let polls = s.list_polls;
            s.list_polls += 1;
            matches!(s.list_after, Some(n) if polls >= n)
        }

        async fn devices(&mut self) -> AdbResult<Vec<DeviceRecord>> {
            let mut s = self.state.lock().unwrap();
            s.calls.push("devices".into());
            match s.devices_error.clone() {
                Some(err) => Err(err),
                None => Ok(s.devices.clone()),
            }
        }

        async fn shell(
            &mut self,
            serial: &str,
            command: &[&str],
            _timeout: Duration,
        ) -> AdbResult<CommandOutput> {
            let mut s = self.state.lock().unwrap();
            s.calls.push(format!("{serial}: shell {}", command.join(" ")));
            match command.first().copied() {
                Some("screencap") => Ok(s.screencap_to_file.clone()),
                Some("rm") => s.rm.clone(),
                _ => Ok(CommandOutput::ok(Vec::new())),
            }
        }

        async fn exec_out(
            &mut self,
            serial: &str,
            command: &[&str],
            _timeout: Duration,
        ) -> AdbResult<CommandOutput> {
            let mut s = self.state.lock().unwrap();
            s.calls.push(format!("{serial}: exec-out {}", command.join(" ")));
            s.exec_out.clone()
        }

        async fn pull(
            &mut self,
            serial: &str,
            remote: &str,
            local: &Path,
            _timeout: Duration,
        ) -> AdbResult<CommandOutput> {
            let mut s = self.state.lock().unwrap();
            s.calls.push(format!("{serial}: pull {remote}"));
            if s.pull.success {
                std::fs::write(local, &s.pulled_bytes).unwrap();
            }
            Ok(s.pull.clone())
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    fn existing_path() -> PathBuf {
        std::env::current_exe().unwrap()
    }

    fn found_locator() -> BridgeLocator {
        BridgeLocator::with_strategies(vec![LocateStrategy::CommonPaths(vec![existing_path()])])
    }

    fn missing_locator() -> BridgeLocator {
        BridgeLocator::with_strategies(vec![LocateStrategy::CommonPaths(vec![PathBuf::from(
            "/nonexistent/platform-tools/adb",
        )])])
    }

    fn session(bridge: &FakeBridge) -> BridgeSession<FakeBridge> {
        BridgeSession::new(
            bridge.clone(),
            found_locator(),
            Environment::default(),
            PollPolicy::default(),
        )
    }

    fn client(bridge: &FakeBridge, strategy: TransportStrategy) -> DeviceCaptureClient<FakeBridge> {
        DeviceCaptureClient::new(
            Arc::new(tokio::sync::Mutex::new(session(bridge))),
            strategy,
            Duration::from_secs(10),
        )
    }

    fn is_screenshot_name(name: &str) -> bool {
        let bytes = name.as_bytes();
        name.len() == 19
            && bytes[..8].iter().all(u8::is_ascii_digit)
            && bytes[8] == b'_'
            && bytes[9..15].iter().all(u8::is_ascii_digit)
            && name.ends_with(".png")
    }

    // ============================================================
    // SESSION LIFECYCLE TESTS
    // ============================================================

    #[tokio::test(start_paused = true)]
    async fn test_ensure_ready_after_a_few_polls() {
        let bridge = FakeBridge::with(|s| {
            s.connect_after = Some(3);
            s.list_after = Some(2);
        });
        let mut session = session(&bridge);

        let start = tokio::time::Instant::now();
        assert_eq!(session.ensure_ready().await, Ok(()));
        assert_eq!(session.state(), &SessionState::Ready);
        assert_eq!(start.elapsed(), Duration::from_millis(500));

        let handle = session.handle().expect("handle after ready");
        assert_eq!(handle.connection, ConnectionState::Connected);
        assert!(handle.initial_device_list_loaded);
        assert_eq!(handle.executable, existing_path());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ensure_ready_is_idempotent() {
        let bridge = FakeBridge::default();
        let mut session = session(&bridge);

        session.ensure_ready().await.unwrap();
        session.ensure_ready().await.unwrap();
        session.ensure_ready().await.unwrap();

        assert_eq!(bridge.starts(), 1, "Ready session must not reinitialize");
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_timeout() {
        let bridge = FakeBridge::with(|s| s.connect_after = None);
        let mut session = session(&bridge);

        let start = tokio::time::Instant::now();
        let err = session.ensure_ready().await.unwrap_err();

        assert_eq!(
            err,
            AdbError::timeout(Duration::from_secs(5), "waiting for bridge connection")
        );
        assert_eq!(start.elapsed(), Duration::from_secs(5));
        assert_eq!(session.state(), &SessionState::Failed(err));
        assert!(session.handle().is_none(), "Failed session keeps no handle");
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_device_list_timeout() {
        let bridge = FakeBridge::with(|s| s.list_after = None);
        let mut session = session(&bridge);

        let err = session.ensure_ready().await.unwrap_err();
        assert_eq!(
            err,
            AdbError::timeout(Duration::from_secs(5), "waiting for initial device list")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_installed_never_starts_bridge() {
        let bridge = FakeBridge::default();
        let mut session = BridgeSession::new(
            bridge.clone(),
            missing_locator(),
            Environment::default(),
            PollPolicy::default(),
        );

        assert_eq!(session.ensure_ready().await, Err(AdbError::NotInstalled));
        assert_eq!(bridge.starts(), 0);
        assert_eq!(session.last_failure(), Some(&AdbError::NotInstalled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_error_becomes_failed_state() {
        let bridge = FakeBridge::with(|s| s.start_error = Some(AdbError::other("spawn failed")));
        let mut session = session(&bridge);

        assert_eq!(
            session.ensure_ready().await,
            Err(AdbError::other("spawn failed"))
        );
        assert_eq!(
            session.state(),
            &SessionState::Failed(AdbError::other("spawn failed"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_always_ends_ready_or_failed() {
        let scenarios: Vec<Box<dyn Fn(&mut FakeState)>> = vec![
            Box::new(|_| {}),
            Box::new(|s| s.connect_after = None),
            Box::new(|s| s.list_after = None),
            Box::new(|s| s.start_error = Some(AdbError::other("boom"))),
            Box::new(|s| s.connect_after = Some(10)),
        ];
        let bridge = FakeBridge::default();
        let mut session = session(&bridge);

        for _ in 0..2 {
            for configure in &scenarios {
                bridge.update(|s| *s = FakeState::default());
                bridge.update(|s| configure(s));
                let _ = session.reload().await;
                assert!(
                    matches!(session.state(), SessionState::Ready | SessionState::Failed(_)),
                    "unexpected state {:?}",
                    session.state()
                );
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_discards_handle_and_restarts() {
        let bridge = FakeBridge::default();
        let mut session = session(&bridge);

        session.ensure_ready().await.unwrap();
        session.reload().await.unwrap();

        assert_eq!(bridge.starts(), 2);
        assert!(bridge.state.lock().unwrap().shutdowns >= 1);
        assert_eq!(session.state(), &SessionState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_connection_reinitializes() {
        let bridge = FakeBridge::default();
        let mut session = session(&bridge);
        session.ensure_ready().await.unwrap();

        // Bridge process went away underneath us
        bridge.update(|s| s.started = false);
        session.ensure_ready().await.unwrap();

        assert_eq!(bridge.starts(), 2);
        assert_eq!(session.state(), &SessionState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_devices_is_deterministic() {
        let bridge = FakeBridge::with(|s| {
            s.devices = vec![
                DeviceRecord::new("R58M123"),
                DeviceRecord::new("emulator-5554").with_model("sdk_gphone64"),
            ]
        });
        let mut session = session(&bridge);

        let first = session.list_devices().await;
        let second = session.list_devices().await;

        assert_eq!(first, second);
        assert_eq!(first[0].serial, "R58M123");
        assert_eq!(session.selected_device(), Some(&first[0]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_devices_empty_with_failure_status() {
        let bridge = FakeBridge::default();
        let mut session = BridgeSession::new(
            bridge.clone(),
            missing_locator(),
            Environment::default(),
            PollPolicy::default(),
        );

        assert!(session.list_devices().await.is_empty());
        assert_eq!(session.last_failure(), Some(&AdbError::NotInstalled));
        assert!(bridge.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_devices_zero_attached() {
        let bridge = FakeBridge::with(|s| s.devices.clear());
        let mut session = session(&bridge);

        assert!(session.list_devices().await.is_empty());
        assert_eq!(session.state(), &SessionState::Ready);
        assert!(session.selected_device().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_enumeration_error_fails_session() {
        let bridge = FakeBridge::with(|s| s.devices_error = Some(AdbError::other("closed")));
        let mut session = session(&bridge);

        assert!(session.list_devices().await.is_empty());
        assert_eq!(session.last_failure(), Some(&AdbError::other("closed")));
        assert!(session.handle().is_none());
    }

    // ============================================================
    // CAPTURE TESTS
    // ============================================================

    #[tokio::test]
    async fn test_capture_no_device_spawns_nothing() {
        let bridge = FakeBridge::with(|s| s.devices.clear());
        let client = client(&bridge, TransportStrategy::ExecOut);

        assert_eq!(client.capture().await.unwrap_err(), AdbError::NoDevice);
        assert_eq!(bridge.calls(), vec!["devices".to_string()]);
    }

    #[tokio::test]
    async fn test_capture_exec_out_returns_bytes() {
        let bridge = FakeBridge::default();
        let client = client(&bridge, TransportStrategy::ExecOut);

        let capture = client.capture().await.unwrap();

        assert_eq!(capture.bytes.len(), 1024);
        assert_eq!(capture.serial, "emulator-5554");
        assert!(is_screenshot_name(&capture.file_name), "{}", capture.file_name);
        assert_eq!(
            bridge.calls(),
            vec![
                "devices".to_string(),
                "emulator-5554: exec-out screencap -p".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_capture_targets_first_device() {
        let bridge = FakeBridge::with(|s| {
            s.devices = vec![DeviceRecord::new("first"), DeviceRecord::new("second")]
        });
        let client = client(&bridge, TransportStrategy::ExecOut);

        let capture = client.capture().await.unwrap();
        assert_eq!(capture.serial, "first");
    }

    #[tokio::test]
    async fn test_capture_empty_output_is_failure() {
        let bridge = FakeBridge::with(|s| s.exec_out = Ok(CommandOutput::ok(Vec::new())));
        let client = client(&bridge, TransportStrategy::ExecOut);

        assert_eq!(client.capture().await.unwrap_err(), AdbError::EmptyResult);
    }

    #[tokio::test]
    async fn test_capture_exec_out_nonzero_exit() {
        let bridge = FakeBridge::with(|s| {
            s.exec_out = Ok(CommandOutput::failed("exit status: 1", "screencap: not found"))
        });
        let client = client(&bridge, TransportStrategy::ExecOut);

        match client.capture().await.unwrap_err() {
            AdbError::TransportError { command, stderr, .. } => {
                assert_eq!(command, "screencap -p");
                assert_eq!(stderr, "screencap: not found");
            }
            other => panic!("Expected TransportError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_capture_timeout_propagates() {
        let bridge = FakeBridge::with(|s| {
            s.exec_out = Err(AdbError::timeout(Duration::from_secs(10), "adb exec-out screencap -p"))
        });
        let client = client(&bridge, TransportStrategy::ExecOut);

        assert!(matches!(
            client.capture().await.unwrap_err(),
            AdbError::Timeout { .. }
        ));
    }

    #[tokio::test]
    async fn test_capture_surfaces_session_failure() {
        let bridge = FakeBridge::default();
        let session = BridgeSession::new(
            bridge.clone(),
            missing_locator(),
            Environment::default(),
            PollPolicy::default(),
        );
        let client = DeviceCaptureClient::new(
            Arc::new(tokio::sync::Mutex::new(session)),
            TransportStrategy::ExecOut,
            Duration::from_secs(10),
        );

        assert_eq!(client.capture().await.unwrap_err(), AdbError::NotInstalled);
        assert!(bridge.calls().is_empty());
    }

    #[tokio::test]
    async fn test_capture_disconnect_resets_session() {
        let bridge = FakeBridge::with(|s| {
            s.exec_out = Err(AdbError::other("error: device 'emulator-5554' not found"))
        });
        let client = client(&bridge, TransportStrategy::ExecOut);

        assert!(client.capture().await.is_err());
        let session = client.session().lock().await;
        assert_eq!(session.state(), &SessionState::Idle);
        assert!(session.handle().is_none());
    }

    #[tokio::test]
    async fn test_capture_pull_file_success() {
        let bridge = FakeBridge::default();
        let client = client(&bridge, TransportStrategy::pull_file());

        let capture = client.capture().await.unwrap();

        assert_eq!(capture.bytes, b"\x89PNG\r\n\x1a\nfake".to_vec());
        assert_eq!(
            bridge.calls(),
            vec![
                "devices".to_string(),
                "emulator-5554: shell screencap -p /sdcard/screenshot.png".to_string(),
                "emulator-5554: pull /sdcard/screenshot.png".to_string(),
                "emulator-5554: shell rm -f /sdcard/screenshot.png".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_capture_pull_failure_is_transport_error() {
        let bridge = FakeBridge::with(|s| {
            s.pull = CommandOutput::failed("exit status: 1", "remote object does not exist")
        });
        let client = client(&bridge, TransportStrategy::pull_file());

        let err = client.capture().await.unwrap_err();
        assert!(
            matches!(&err, AdbError::TransportError { command, .. } if command == "pull /sdcard/screenshot.png"),
            "{err:?}"
        );
        // Cleanup still attempted
        assert!(bridge.calls().iter().any(|c| c.contains("rm -f")));
    }

    #[tokio::test]
    async fn test_capture_screencap_failure_skips_pull() {
        let bridge = FakeBridge::with(|s| {
            s.screencap_to_file = CommandOutput::failed("exit status: 1", "Permission denied")
        });
        let client = client(&bridge, TransportStrategy::pull_file());

        assert!(matches!(
            client.capture().await.unwrap_err(),
            AdbError::TransportError { .. }
        ));
        assert!(!bridge.calls().iter().any(|c| c.contains("pull")));
    }

    #[tokio::test]
    async fn test_capture_cleanup_failure_is_ignored() {
        let bridge = FakeBridge::with(|s| {
            s.rm = Err(AdbError::other("rm blew up"));
        });
        let client = client(&bridge, TransportStrategy::pull_file());

        assert!(client.capture().await.is_ok());
    }

    #[tokio::test]
    async fn test_capture_pull_empty_file_is_failure() {
        let bridge = FakeBridge::with(|s| s.pulled_bytes.clear());
        let client = client(&bridge, TransportStrategy::pull_file());

        assert_eq!(client.capture().await.unwrap_err(), AdbError::EmptyResult);
    }
}

// ============================================================
// CLI BACKEND AGAINST A FAKE ADB EXECUTABLE
// ============================================================

#[cfg(all(test, unix))]
mod shell_backend_tests {
    use super::super::backend::{AdbBackend, BackendKind};
    use super::super::capture::{DeviceCaptureClient, TransportStrategy};
    use super::super::error::AdbError;
    use super::super::locator::{BridgeLocator, Environment, LocateStrategy};
    use super::super::session::{BridgeSession, PollPolicy};
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    const FAKE_ADB: &str = r#"#!/bin/sh
if [ "$1" = "-s" ]; then
  shift 2
  case "$1" in
    exec-out) printf 'PNGDATA'; exit 0 ;;
    shell) exit 0 ;;
    pull) echo "adb: error: failed to stat remote object" >&2; exit 1 ;;
  esac
  exit 1
fi
case "$1" in
  start-server) exit 0 ;;
  devices) printf 'List of devices attached\nemulator-5554\tdevice product:sdk model:Pixel_7 transport_id:1\n'; exit 0 ;;
esac
exit 1
"#;

    fn install_fake_adb(dir: &Path) -> PathBuf {
        install_script(dir, FAKE_ADB)
    }

    fn install_script(dir: &Path, script: &str) -> PathBuf {
        let path = dir.join("adb");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn client(adb: PathBuf, strategy: TransportStrategy) -> DeviceCaptureClient<AdbBackend> {
        client_with_timeout(adb, strategy, Duration::from_secs(10))
    }

    fn client_with_timeout(
        adb: PathBuf,
        strategy: TransportStrategy,
        timeout: Duration,
    ) -> DeviceCaptureClient<AdbBackend> {
        let session = BridgeSession::new(
            AdbBackend::new(BackendKind::Shell),
            BridgeLocator::with_strategies(vec![LocateStrategy::CommonPaths(vec![adb])]),
            Environment::default(),
            PollPolicy::default(),
        );
        DeviceCaptureClient::new(
            Arc::new(tokio::sync::Mutex::new(session)),
            strategy,
            timeout,
        )
    }

    #[tokio::test]
    async fn test_shell_backend_lists_and_captures() {
        let dir = tempfile::tempdir().unwrap();
        let client = client(install_fake_adb(dir.path()), TransportStrategy::ExecOut);

        let devices = client.session().lock().await.list_devices().await;
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].display_name(), "Pixel_7");

        let capture = client.capture().await.unwrap();
        assert_eq!(capture.bytes, b"PNGDATA".to_vec());
        assert_eq!(capture.serial, "emulator-5554");
    }

    #[tokio::test]
    async fn test_shell_backend_pull_failure() {
        let dir = tempfile::tempdir().unwrap();
        let client = client(install_fake_adb(dir.path()), TransportStrategy::pull_file());

        match client.capture().await.unwrap_err() {
            AdbError::TransportError { stderr, .. } => {
                assert!(stderr.contains("failed to stat remote object"));
            }
            other => panic!("Expected TransportError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_shell_backend_exec_out_timeout() {
        let slow_adb = FAKE_ADB.replace(
            "exec-out) printf 'PNGDATA'; exit 0 ;;",
            "exec-out) sleep 5; printf 'PNGDATA'; exit 0 ;;",
        );
        let dir = tempfile::tempdir().unwrap();
        let client = client_with_timeout(
            install_script(dir.path(), &slow_adb),
            TransportStrategy::ExecOut,
            Duration::from_millis(500),
        );

        let started = std::time::Instant::now();
        let err = client.capture().await.unwrap_err();

        assert_eq!(
            err,
            AdbError::timeout(
                Duration::from_millis(500),
                "adb -s emulator-5554 exec-out screencap -p"
            )
        );
        assert!(started.elapsed() < Duration::from_secs(4), "{:?}", started.elapsed());
    }
}
