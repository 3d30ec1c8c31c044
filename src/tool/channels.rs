// Communication channels for the screenshot worker
use super::types::{ToolCommand, ToolEvent};
use tokio::sync::mpsc;

/// Helper function to create worker channels
pub fn create_tool_channels() -> (
    mpsc::Sender<ToolCommand>,
    mpsc::Receiver<ToolCommand>,
    mpsc::Sender<ToolEvent>,
    mpsc::Receiver<ToolEvent>,
) {
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (event_tx, event_rx) = mpsc::channel(32);
    (cmd_tx, cmd_rx, event_tx, event_rx)
}
