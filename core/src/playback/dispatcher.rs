use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};

use crate::connection::MessageWriter;
use crate::error::PlaybackError;
use crate::event::WireEvent;

use super::session::Playback;

/// Writes queued events to the connection in order and closes it when the
/// queue is exhausted. The connection's lifetime ends here and nowhere else.
pub(crate) fn spawn_dispatcher(
    session: Arc<Playback>,
    mut writer: Box<dyn MessageWriter>,
    mut out_rx: mpsc::Receiver<WireEvent>,
    listener: AbortHandle,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut written = 0u64;
        while let Some(event) = out_rx.recv().await {
            if let Err(e) = writer.write_event(&event).await {
                let err = PlaybackError::ConnectionWrite(e);
                tracing::error!(
                    playback = %session.id(),
                    error.kind = "connection.write_failed",
                    error.message = %err,
                    event = %event
                );
                session.record_error(&err);
                break;
            }
            written += 1;
            tracing::trace!(playback = %session.id(), event = %event, "event written");
        }

        // stop from a separate task: stop must never wait on this one
        let stopper = Arc::clone(&session);
        tokio::spawn(async move {
            if let Err(e) = stopper.stop() {
                tracing::debug!(playback = %stopper.id(), "{e}");
            }
        });

        // keep draining so producers never block on an abandoned queue
        while out_rx.recv().await.is_some() {}

        if let Err(e) = writer.close().await {
            tracing::warn!(playback = %session.id(), error.kind = "connection.close_failed", error.message = %e);
        }
        listener.abort();
        tracing::debug!(playback = %session.id(), written, "dispatcher finished");
        session.mark_done();
    })
}
