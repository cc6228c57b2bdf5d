use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::PlaybackError;
use crate::event::Frame;

/// Persists frames captured while synchronizing.
#[async_trait]
pub trait FrameSink: Send + Sync {
    async fn persist(&self, index: usize, frame: &Frame) -> Result<PathBuf, PlaybackError>;
}

/// Decides whether a captured frame satisfies a WaitForIt reference.
pub trait FrameMatcher: Send + Sync {
    fn matches(&self, reference: &str, frame: &Frame) -> bool;
}

/// Accepts any frame.
///
/// TODO: compare against the reference image once a diff threshold or
/// perceptual-hash policy is chosen.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnyFrame;

impl FrameMatcher for AnyFrame {
    fn matches(&self, _reference: &str, _frame: &Frame) -> bool {
        true
    }
}

/// Writes `screenshot-<index>.png` files into a directory.
#[derive(Debug, Clone)]
pub struct PngFrameSink {
    dir: PathBuf,
}

impl PngFrameSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, index: usize) -> PathBuf {
        self.dir.join(format!("screenshot-{index}.png"))
    }
}

fn write_png(path: &Path, frame: &Frame) -> Result<(), PlaybackError> {
    let img = image::RgbaImage::from_raw(frame.width, frame.height, frame.rgba.clone())
        .ok_or_else(|| {
            PlaybackError::Screenshot(format!(
                "frame buffer does not match {}x{}",
                frame.width, frame.height
            ))
        })?;
    img.save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| PlaybackError::Screenshot(format!("unable to encode screenshot: {e}")))
}

#[async_trait]
impl FrameSink for PngFrameSink {
    async fn persist(&self, index: usize, frame: &Frame) -> Result<PathBuf, PlaybackError> {
        let path = self.path_for(index);
        let frame = frame.clone();
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_png(&target, &frame))
            .await
            .map_err(|e| PlaybackError::Screenshot(format!("screenshot task failed: {e}")))??;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_numbered_png() {
        let dir = tempfile::tempdir().unwrap();
        let sink = PngFrameSink::new(dir.path());
        let frame = Frame::new(2, 1, vec![255, 0, 0, 255, 0, 255, 0, 255]);

        let path = sink.persist(3, &frame).await.unwrap();
        assert_eq!(path, dir.path().join("screenshot-3.png"));

        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (2, 1));
        assert_eq!(img.get_pixel(1, 0).0, [0, 255, 0, 255]);
    }

    #[tokio::test]
    async fn rejects_short_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let sink = PngFrameSink::new(dir.path());
        let frame = Frame::new(4, 4, vec![0; 3]);

        let err = sink.persist(0, &frame).await.unwrap_err();
        assert!(matches!(err, PlaybackError::Screenshot(_)));
    }

    #[test]
    fn any_frame_accepts_everything() {
        assert!(AnyFrame.matches("login.png", &Frame::new(0, 0, vec![])));
    }
}
