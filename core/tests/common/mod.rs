#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;

use vncplay_core::api::{
    ConnectionError, DisplayConnection, Encoding, Frame, FramebufferUpdate, MessageReader,
    MessageWriter, Playback, PlaybackConfig, PlaybackDeps, Rectangle, ServerMessage, WireEvent,
};

#[derive(Debug, Clone)]
pub struct Recorded {
    pub at: Instant,
    pub event: WireEvent,
}

/// Shared view of everything the mock connection saw.
#[derive(Clone, Default)]
pub struct Wire {
    pub events: Arc<Mutex<Vec<Recorded>>>,
    pub encodings: Arc<Mutex<Vec<Encoding>>>,
    pub closed: Arc<AtomicBool>,
}

impl Wire {
    pub fn events(&self) -> Vec<WireEvent> {
        self.events.lock().iter().map(|r| r.event.clone()).collect()
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.events.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Poll until at least `n` events were written.
    pub async fn wait_for(&self, n: usize, limit: Duration) -> Vec<Recorded> {
        let deadline = Instant::now() + limit;
        loop {
            let seen = self.recorded();
            if seen.len() >= n {
                return seen;
            }
            assert!(
                Instant::now() < deadline,
                "expected {n} events, saw {:?}",
                seen.iter().map(|r| &r.event).collect::<Vec<_>>()
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

struct MockWriter {
    wire: Wire,
    fail_after: Option<usize>,
}

#[async_trait]
impl MessageWriter for MockWriter {
    async fn write_event(&mut self, event: &WireEvent) -> Result<(), ConnectionError> {
        let mut events = self.wire.events.lock();
        if self.fail_after.is_some_and(|n| events.len() >= n) {
            return Err(ConnectionError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "broken pipe",
            )));
        }
        events.push(Recorded {
            at: Instant::now(),
            event: event.clone(),
        });
        Ok(())
    }

    async fn set_encodings(&mut self, encodings: &[Encoding]) -> Result<(), ConnectionError> {
        self.wire.encodings.lock().extend_from_slice(encodings);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        self.wire.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct MockReader {
    rx: mpsc::UnboundedReceiver<ServerMessage>,
}

#[async_trait]
impl MessageReader for MockReader {
    async fn read_message(&mut self) -> Result<ServerMessage, ConnectionError> {
        self.rx.recv().await.ok_or(ConnectionError::Closed)
    }
}

pub struct MockConnection {
    reader: Option<Box<dyn MessageReader>>,
    writer: Option<Box<dyn MessageWriter>>,
}

impl DisplayConnection for MockConnection {
    fn reader(&mut self) -> Option<Box<dyn MessageReader>> {
        self.reader.take()
    }

    fn writer(&mut self) -> Option<Box<dyn MessageWriter>> {
        self.writer.take()
    }

    fn framebuffer_size(&self) -> (u16, u16) {
        (640, 480)
    }
}

pub struct Harness {
    pub session: Arc<Playback>,
    pub wire: Wire,
    pub server: mpsc::UnboundedSender<ServerMessage>,
    pub dir: tempfile::TempDir,
}

impl Harness {
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, body: &str) -> PathBuf {
        write_script(self.dir.path(), name, body)
    }

    pub async fn finished(&self) {
        tokio::time::timeout(Duration::from_secs(15), self.session.wait())
            .await
            .expect("playback did not finish");
    }

    pub fn send_frame(&self) {
        let update = FramebufferUpdate {
            rectangles: vec![Rectangle {
                x: 0,
                y: 0,
                width: 2,
                height: 2,
                pixels: Some(Frame::new(2, 2, vec![200; 16])),
            }],
        };
        let _ = self
            .server
            .send(ServerMessage::FramebufferUpdate(update));
    }

    pub fn screenshots(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|n| n.starts_with("screenshot-"))
            .collect();
        names.sort();
        names
    }
}

pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, body).unwrap();
    path
}

pub fn harness() -> Harness {
    harness_with(PlaybackConfig::default(), None)
}

pub fn harness_with(mut cfg: PlaybackConfig, fail_after: Option<usize>) -> Harness {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("vncplay_core=debug")
        .try_init();

    let dir = tempfile::tempdir().unwrap();
    cfg.screenshot_dir = dir.path().to_string_lossy().to_string();

    let wire = Wire::default();
    let (server, rx) = mpsc::unbounded_channel();
    let connection = MockConnection {
        reader: Some(Box::new(MockReader { rx })),
        writer: Some(Box::new(MockWriter {
            wire: wire.clone(),
            fail_after,
        })),
    };

    let deps = PlaybackDeps::standard(&cfg);
    let session = Playback::new("test", "mock:0", Box::new(connection), cfg, deps);
    Harness {
        session,
        wire,
        server,
        dir,
    }
}

/// Tracing layer that keeps every event's level and message.
#[derive(Clone, Default)]
pub struct LogCapture {
    lines: Arc<Mutex<Vec<(tracing::Level, String)>>>,
}

impl LogCapture {
    pub fn at(&self, level: tracing::Level) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

struct MessageField(String);

impl tracing::field::Visit for MessageField {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for LogCapture {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut message = MessageField(String::new());
        event.record(&mut message);
        self.lines
            .lock()
            .push((*event.metadata().level(), message.0));
    }
}

pub fn tap(c: char) -> WireEvent {
    WireEvent::KeyTap { keysym: c as u32 }
}
