// Screenshot tool module
// A worker task that owns the bridge stack and takes commands over a channel,
// so callers never block on adb themselves.

pub mod channels;
pub mod save_location;
pub mod types;
pub mod worker;

// Re-export the main types and functions for easy access
pub use channels::create_tool_channels;
pub use save_location::{FixedDirectory, SaveDirectory};
pub use types::{CaptureFailure, DeviceStatus, ToolCommand, ToolEvent};
pub use worker::{ScreenshotTool, spawn_screenshot_tool};
