use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::capture::{FrameMatcher, FrameSink, ScreenshotSlot};
use crate::error::PlaybackError;
use crate::event::{WaitForIt, WireEvent};

/// Polls the display for fresh frames until one satisfies the matcher or the
/// timeout runs out.
pub(crate) struct Synchronizer {
    pub id: String,
    pub out: mpsc::Sender<WireEvent>,
    pub slot: Arc<ScreenshotSlot>,
    pub sink: Arc<dyn FrameSink>,
    pub matcher: Arc<dyn FrameMatcher>,
    pub framebuffer: (u16, u16),
    pub poll_interval: Duration,
}

impl Synchronizer {
    pub async fn wait_for_it(&self, wait: &WaitForIt) -> Result<(), PlaybackError> {
        let mut remaining = wait.timeout;
        tracing::info!(
            playback = %self.id,
            reference = %wait.reference,
            timeout = ?remaining,
            "wait for it"
        );

        let (width, height) = self.framebuffer;
        let request = WireEvent::FramebufferRequest {
            incremental: false,
            x: 0,
            y: 0,
            width,
            height,
        };

        let mut index = 0usize;
        while !remaining.is_zero() {
            // arm before asking so the reply cannot slip past
            let rx = self.slot.arm();
            self.out
                .send(request.clone())
                .await
                .map_err(|_| PlaybackError::OutboundClosed)?;

            let started = Instant::now();
            let frame = match tokio::time::timeout(remaining, rx).await {
                Ok(Ok(frame)) => frame,
                Ok(Err(_)) => {
                    remaining = remaining.saturating_sub(started.elapsed());
                    continue;
                }
                Err(_) => {
                    self.slot.disarm();
                    return Err(self.timeout(wait));
                }
            };

            let waited = started.elapsed();
            remaining = remaining.saturating_sub(waited);
            tracing::info!(playback = %self.id, waited = ?waited, "got screenshot");

            let path = self.sink.persist(index, &frame).await?;
            index += 1;
            tracing::debug!(playback = %self.id, path = %path.display(), "screenshot saved");

            if self.matcher.matches(&wait.reference, &frame) {
                return Ok(());
            }

            // sleep and try again
            let pause = self.poll_interval.min(remaining);
            tokio::time::sleep(pause).await;
            remaining -= pause;
        }

        Err(self.timeout(wait))
    }

    fn timeout(&self, wait: &WaitForIt) -> PlaybackError {
        PlaybackError::Timeout {
            reference: wait.reference.clone(),
            timeout: wait.timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PngFrameSink;
    use crate::event::Frame;

    struct Never;

    impl FrameMatcher for Never {
        fn matches(&self, _reference: &str, _frame: &Frame) -> bool {
            false
        }
    }

    fn synchronizer(
        dir: &std::path::Path,
        matcher: Arc<dyn FrameMatcher>,
    ) -> (Synchronizer, mpsc::Receiver<WireEvent>) {
        let (out, out_rx) = mpsc::channel(8);
        let sync = Synchronizer {
            id: "test".into(),
            out,
            slot: Arc::new(ScreenshotSlot::new()),
            sink: Arc::new(PngFrameSink::new(dir)),
            matcher,
            framebuffer: (4, 2),
            poll_interval: Duration::from_millis(50),
        };
        (sync, out_rx)
    }

    fn wait(ms: u64) -> WaitForIt {
        WaitForIt {
            reference: "ready.png".into(),
            timeout: Duration::from_millis(ms),
        }
    }

    #[tokio::test]
    async fn frame_answering_request_satisfies_wait() {
        let dir = tempfile::tempdir().unwrap();
        let (sync, mut out_rx) = synchronizer(dir.path(), Arc::new(crate::capture::AnyFrame));
        let slot = Arc::clone(&sync.slot);

        let server = tokio::spawn(async move {
            let req = out_rx.recv().await.unwrap();
            assert_eq!(
                req,
                WireEvent::FramebufferRequest {
                    incremental: false,
                    x: 0,
                    y: 0,
                    width: 4,
                    height: 2
                }
            );
            assert!(slot.offer(Frame::new(1, 1, vec![1, 2, 3, 255])));
        });

        sync.wait_for_it(&wait(1_000)).await.unwrap();
        server.await.unwrap();
        assert!(dir.path().join("screenshot-0.png").exists());
    }

    #[tokio::test]
    async fn rejected_frames_keep_polling_until_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let (sync, mut out_rx) = synchronizer(dir.path(), Arc::new(Never));
        let slot = Arc::clone(&sync.slot);

        tokio::spawn(async move {
            while out_rx.recv().await.is_some() {
                slot.offer(Frame::new(1, 1, vec![0, 0, 0, 255]));
            }
        });

        let err = sync.wait_for_it(&wait(300)).await.unwrap_err();
        assert!(matches!(err, PlaybackError::Timeout { ref reference, .. } if reference == "ready.png"));
        // several polls, each numbered from zero
        assert!(dir.path().join("screenshot-0.png").exists());
        assert!(dir.path().join("screenshot-1.png").exists());
    }

    #[tokio::test]
    async fn zero_timeout_fails_without_polling() {
        let dir = tempfile::tempdir().unwrap();
        let (sync, mut out_rx) = synchronizer(dir.path(), Arc::new(crate::capture::AnyFrame));

        assert!(sync.wait_for_it(&wait(0)).await.is_err());
        assert!(out_rx.try_recv().is_err());
    }
}
