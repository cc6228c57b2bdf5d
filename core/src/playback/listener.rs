use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::capture::ScreenshotSlot;
use crate::connection::MessageReader;
use crate::error::PlaybackError;
use crate::event::ServerMessage;

/// Reads server messages until the connection fails, offering every decoded
/// image rectangle to the screenshot slot.
pub(crate) fn spawn_listener(
    id: String,
    mut reader: Box<dyn MessageReader>,
    slot: Arc<ScreenshotSlot>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let msg = match reader.read_message().await {
                Ok(msg) => msg,
                Err(e) => {
                    let err = PlaybackError::ConnectionRead(e);
                    tracing::error!(
                        playback = %id,
                        error.kind = "connection.read_failed",
                        error.message = %err,
                        "server to playback error"
                    );
                    break;
                }
            };

            match msg {
                ServerMessage::FramebufferUpdate(update) => {
                    for frame in update.rectangles.into_iter().filter_map(|r| r.pixels) {
                        if !slot.offer(frame) {
                            tracing::trace!(playback = %id, "screenshot dropped");
                        }
                    }
                }
                ServerMessage::SetColorMapEntries
                | ServerMessage::Bell
                | ServerMessage::ServerCutText(_) => {}
            }
        }
    })
}
