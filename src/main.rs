mod args;

use adb_screenshot::config::ScreenshotConfig;
use adb_screenshot::tool::{DeviceStatus, ToolCommand, ToolEvent, spawn_screenshot_tool};
use args::{Args, Mode, print_help};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = match Args::parse() {
        Ok(Some(args)) => args,
        Ok(None) => return ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {e}");
            print_help();
            return ExitCode::FAILURE;
        }
    };

    let default_filter = if args.debug_mode { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let mut config = ScreenshotConfig::from_env();
    args.apply(&mut config);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("❌ Could not start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    if rt.block_on(run(args.mode, config)) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Drive one mode through the worker and print what comes back.
/// Returns whether everything succeeded.
async fn run(mode: Mode, config: ScreenshotConfig) -> bool {
    println!("📸 adb-screenshot (impl='{}')", config.backend.as_str());
    let (cmd_tx, mut event_rx) = spawn_screenshot_tool(&config);

    let commands: &[ToolCommand] = match mode {
        Mode::Screenshot => &[ToolCommand::Reload, ToolCommand::Capture],
        Mode::Devices => &[ToolCommand::ListDevices],
    };
    for command in commands.iter().cloned().chain([ToolCommand::Shutdown]) {
        if cmd_tx.send(command).await.is_err() {
            eprintln!("❌ Screenshot worker stopped unexpectedly");
            return false;
        }
    }

    let mut ok = true;
    while let Some(event) = event_rx.recv().await {
        match event {
            ToolEvent::Status(status) => {
                println!("{status}");
                if matches!(status, DeviceStatus::AdbNotFound | DeviceStatus::Error(_)) {
                    ok = false;
                }
            }
            ToolEvent::Devices(devices) => {
                for device in &devices {
                    match &device.model {
                        Some(model) => println!("  {}\t{model}", device.serial),
                        None => println!("  {}", device.serial),
                    }
                }
            }
            ToolEvent::Saved { path, bytes } => {
                println!("✅ Screenshot saved successfully ({bytes} bytes): {}", path.display());
            }
            ToolEvent::CaptureFailed(failure) => {
                eprintln!("❌ {}", failure.user_message());
                ok = false;
            }
        }
    }
    ok
}
