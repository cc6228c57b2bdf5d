use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::event::Frame;

/// Single-slot rendezvous between the listener and an active WaitForIt.
///
/// A frame is delivered only if a waiter is armed at the moment it arrives;
/// otherwise it is dropped. At most one frame is ever in flight.
#[derive(Default)]
pub struct ScreenshotSlot {
    waiter: Mutex<Option<oneshot::Sender<Frame>>>,
}

impl ScreenshotSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the caller as the current waiter, replacing any previous one.
    pub fn arm(&self) -> oneshot::Receiver<Frame> {
        let (tx, rx) = oneshot::channel();
        *self.waiter.lock() = Some(tx);
        rx
    }

    pub fn disarm(&self) {
        self.waiter.lock().take();
    }

    pub fn is_armed(&self) -> bool {
        self.waiter
            .lock()
            .as_ref()
            .map(|tx| !tx.is_closed())
            .unwrap_or(false)
    }

    /// Non-blocking hand-off. Returns false when the frame was dropped.
    pub fn offer(&self, frame: Frame) -> bool {
        let Some(tx) = self.waiter.lock().take() else {
            return false;
        };
        tx.send(frame).is_ok()
    }
}
