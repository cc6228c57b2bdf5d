use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, watch};

use crate::capture::{AnyFrame, FrameMatcher, FrameSink, PngFrameSink, ScreenshotSlot};
use crate::config::PlaybackConfig;
use crate::connection::{DisplayConnection, DisplayConnector, Encoding};
use crate::error::{LastError, PlaybackError};
use crate::event::{Directive, Signal, WireEvent};
use crate::script::{DirectiveParser, StandardGrammar};

use super::dispatcher;
use super::interpreter::{Interpreter, Outcome};
use super::listener;
use super::state::{send_signal, ControlOp, PlaybackState, SessionState, ALREADY_STOPPED};
use super::sync::Synchronizer;

const ENCODINGS: &[Encoding] = &[Encoding::Raw, Encoding::CursorPseudo];

/// External collaborators a session relies on.
#[derive(Clone)]
pub struct PlaybackDeps {
    pub grammar: Arc<dyn DirectiveParser>,
    pub sink: Arc<dyn FrameSink>,
    pub matcher: Arc<dyn FrameMatcher>,
}

impl PlaybackDeps {
    pub fn standard(cfg: &PlaybackConfig) -> Self {
        Self {
            grammar: Arc::new(StandardGrammar),
            sink: Arc::new(PngFrameSink::new(cfg.screenshot_dir())),
            matcher: Arc::new(AnyFrame),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaybackInfo {
    pub id: String,
    pub kind: &'static str,
    pub host: String,
    pub closed: bool,
    pub state: PlaybackState,
    pub remaining: Duration,
    pub depth: usize,
    pub file: Option<PathBuf>,
    pub event: String,
    pub started_at: Option<DateTime<Utc>>,
}

impl PlaybackInfo {
    pub fn status(&self) -> String {
        match self.state {
            PlaybackState::Pause => "PAUSED".to_string(),
            PlaybackState::Play => format!("{:?} remaining", self.remaining),
        }
    }

    /// `[id, kind, status, file]`, or `None` once the session is closed.
    pub fn row(&self) -> Option<Vec<String>> {
        if self.closed {
            return None;
        }
        Some(vec![
            self.id.clone(),
            self.kind.to_string(),
            self.status(),
            self.file
                .as_ref()
                .map(|f| f.display().to_string())
                .unwrap_or_default(),
        ])
    }
}

/// One replay of a script tree against one remote display.
pub struct Playback {
    id: String,
    host: String,
    cfg: PlaybackConfig,
    deps: PlaybackDeps,
    slot: Arc<ScreenshotSlot>,
    inner: Mutex<SessionState>,
    connection: Mutex<Option<Box<dyn DisplayConnection>>>,
    receivers: Mutex<Option<(mpsc::UnboundedReceiver<Signal>, mpsc::Receiver<WireEvent>)>>,
    done: watch::Sender<bool>,
}

impl Playback {
    /// Dial `host` and wrap the connection in a fresh session.
    pub async fn open(
        id: impl Into<String>,
        host: impl Into<String>,
        connector: &dyn DisplayConnector,
        cfg: PlaybackConfig,
        deps: PlaybackDeps,
    ) -> Result<Arc<Self>, PlaybackError> {
        let host = host.into();
        let connection = connector
            .connect(&host)
            .await
            .map_err(|source| PlaybackError::Connect {
                host: host.clone(),
                source,
            })?;
        tracing::info!(connector = connector.name(), host = %host, "connected");
        Ok(Self::new(id, host, connection, cfg, deps))
    }

    pub fn new(
        id: impl Into<String>,
        host: impl Into<String>,
        connection: Box<dyn DisplayConnection>,
        cfg: PlaybackConfig,
        deps: PlaybackDeps,
    ) -> Arc<Self> {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::channel(cfg.out_queue_capacity.max(1));
        let (done, _) = watch::channel(false);
        Arc::new(Self {
            id: id.into(),
            host: host.into(),
            cfg,
            deps,
            slot: Arc::new(ScreenshotSlot::new()),
            inner: Mutex::new(SessionState::new(signal_tx, out_tx)),
            connection: Mutex::new(Some(connection)),
            receivers: Mutex::new(Some((signal_rx, out_rx))),
            done,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.cfg
    }

    /// Negotiate encodings and launch the dispatcher, listener and interpreter.
    pub async fn start(self: &Arc<Self>, path: impl AsRef<Path>) -> Result<(), PlaybackError> {
        {
            let mut st = self.inner.lock();
            st.check(ControlOp::Start)?;
            st.started = true;
            st.state = PlaybackState::Play;
            st.started_at = Some(Utc::now());
        }

        let mut connection = self
            .connection
            .lock()
            .take()
            .ok_or(PlaybackError::InvalidOperation("playback has no connection"))?;
        let framebuffer = connection.framebuffer_size();
        let (Some(mut writer), Some(reader)) = (connection.writer(), connection.reader()) else {
            return Err(self.fail_start(PlaybackError::InvalidOperation(
                "connection already split",
            )));
        };

        if let Err(e) = writer.set_encodings(ENCODINGS).await {
            tracing::error!(playback = %self.id, error.kind = "connection.encodings", error.message = %e);
            let _ = writer.close().await;
            return Err(self.fail_start(PlaybackError::ConnectionWrite(e)));
        }

        let receivers = self.receivers.lock().take();
        let out_tx = self.inner.lock().out_tx.clone();
        let (Some((signals, out_rx)), Some(out_tx)) = (receivers, out_tx) else {
            let _ = writer.close().await;
            return Err(self.fail_start(PlaybackError::InvalidOperation(ALREADY_STOPPED)));
        };

        let listener = listener::spawn_listener(self.id.clone(), reader, Arc::clone(&self.slot));
        dispatcher::spawn_dispatcher(Arc::clone(self), writer, out_rx, listener.abort_handle());

        let sync = Synchronizer {
            id: self.id.clone(),
            out: out_tx.clone(),
            slot: Arc::clone(&self.slot),
            sink: Arc::clone(&self.deps.sink),
            matcher: Arc::clone(&self.deps.matcher),
            framebuffer,
            poll_interval: self.cfg.poll_interval(),
        };
        let mut interpreter = Interpreter::new(Arc::clone(self), signals, out_tx, sync);
        let session = Arc::clone(self);
        let path = path.as_ref().to_path_buf();
        tracing::info!(playback = %self.id, file = %path.display(), "playback started");

        tokio::spawn(async move {
            match interpreter.run(&path).await {
                Ok(Outcome::Finished) => {
                    tracing::info!(playback = %session.id, "playback finished");
                }
                Ok(Outcome::Aborted) => {
                    tracing::info!(playback = %session.id, "playback aborted");
                }
                Err(e) => {
                    tracing::error!(
                        playback = %session.id,
                        error.kind = e.kind().as_str(),
                        error.message = %e,
                        "playback failed"
                    );
                    session.record_error(&e);
                }
            }

            // finished producing: drop every outbound sender so the dispatcher
            // drains and closes the connection
            drop(interpreter);
            session.release_outbound();

            if let Err(e) = session.stop() {
                tracing::debug!(playback = %session.id, "{e}");
            }
        });

        Ok(())
    }

    pub fn step(&self) -> Result<(), PlaybackError> {
        let tx = {
            let st = self.inner.lock();
            st.check(ControlOp::Step)?;
            st.signal_sender()?
        };
        send_signal(&tx, Signal::Step)
    }

    pub fn pause(&self) -> Result<(), PlaybackError> {
        let tx = {
            let mut st = self.inner.lock();
            st.check(ControlOp::Pause)?;
            let tx = st.signal_sender()?;
            st.state = PlaybackState::Pause;
            tx
        };
        send_signal(&tx, Signal::Pause)
    }

    /// Resume after [`Playback::pause`].
    pub fn resume(&self) -> Result<(), PlaybackError> {
        let tx = {
            let mut st = self.inner.lock();
            st.check(ControlOp::Continue)?;
            let tx = st.signal_sender()?;
            st.state = PlaybackState::Play;
            tx
        };
        send_signal(&tx, Signal::Play)
    }

    /// Close the signal channel. A second call is an error.
    pub fn stop(&self) -> Result<(), PlaybackError> {
        let started = {
            let mut st = self.inner.lock();
            st.check(ControlOp::Stop)?;
            st.close();
            st.started
        };
        tracing::info!(playback = %self.id, "playback stopped");

        // never started: no dispatcher will ever tear the connection down
        if !started {
            self.connection.lock().take();
            self.receivers.lock().take();
            self.mark_done();
        }
        Ok(())
    }

    /// Parse `cmd` and feed it into the running session: wire events go to the
    /// outbound queue, includes and waits go through the signal channel.
    pub async fn inject(&self, cmd: &str) -> Result<(), PlaybackError> {
        self.inner.lock().check(ControlOp::Inject)?;

        let directive = self.deps.grammar.parse(cmd)?;
        tracing::debug!(playback = %self.id, ?directive, "inject");

        match directive {
            Directive::Wire(event) => {
                let tx = {
                    let st = self.inner.lock();
                    st.check(ControlOp::Inject)?;
                    st.out_tx
                        .clone()
                        .ok_or(PlaybackError::InvalidOperation(ALREADY_STOPPED))?
                };
                tx.send(event)
                    .await
                    .map_err(|_| PlaybackError::OutboundClosed)
            }
            Directive::LoadFile(load) => {
                send_signal(&self.signal_sender()?, Signal::LoadFile(load))
            }
            Directive::WaitForIt(wait) => {
                send_signal(&self.signal_sender()?, Signal::WaitForIt(wait))
            }
        }
    }

    fn signal_sender(&self) -> Result<mpsc::UnboundedSender<Signal>, PlaybackError> {
        let st = self.inner.lock();
        st.check(ControlOp::Inject)?;
        st.signal_sender()
    }

    pub fn info(&self) -> PlaybackInfo {
        let st = self.inner.lock();
        PlaybackInfo {
            id: self.id.clone(),
            kind: "playback kb",
            host: self.host.clone(),
            closed: st.closed,
            state: st.state,
            remaining: st.remaining,
            depth: st.depth,
            file: st.current_file.clone(),
            event: st.current_event.clone(),
            started_at: st.started_at,
        }
    }

    /// The script line currently being acted on.
    pub fn get_step(&self) -> Result<String, PlaybackError> {
        let st = self.inner.lock();
        if st.closed {
            return Err(PlaybackError::InvalidOperation(ALREADY_STOPPED));
        }
        Ok(st.current_event.clone())
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn last_error(&self) -> Option<LastError> {
        self.inner.lock().last_error.clone()
    }

    /// Resolves once the connection has been torn down.
    pub async fn wait(&self) {
        let mut rx = self.done.subscribe();
        let _ = rx.wait_for(|done| *done).await;
    }

    pub(crate) fn grammar(&self) -> &dyn DirectiveParser {
        self.deps.grammar.as_ref()
    }

    pub(crate) fn set_step(&self, line: &str) {
        self.inner.lock().current_event = line.to_string();
    }

    pub(crate) fn add_remaining(&self, d: Duration) {
        let mut st = self.inner.lock();
        st.remaining = st.remaining.saturating_add(d);
    }

    pub(crate) fn sub_remaining(&self, d: Duration) {
        let mut st = self.inner.lock();
        st.remaining = st.remaining.saturating_sub(d);
    }

    /// Returns the new depth and the file that was current before.
    pub(crate) fn push_file(&self, path: &Path) -> (usize, Option<PathBuf>) {
        let mut st = self.inner.lock();
        st.depth += 1;
        let parent = st.current_file.replace(path.to_path_buf());
        (st.depth, parent)
    }

    pub(crate) fn pop_file(&self, parent: Option<PathBuf>) {
        let mut st = self.inner.lock();
        st.depth = st.depth.saturating_sub(1);
        st.current_file = parent;
    }

    /// Keeps the first fatal error.
    pub(crate) fn record_error(&self, e: &PlaybackError) {
        let mut st = self.inner.lock();
        if st.last_error.is_none() {
            st.last_error = Some(LastError::from(e));
        }
    }

    pub(crate) fn release_outbound(&self) {
        self.inner.lock().out_tx.take();
    }

    pub(crate) fn mark_done(&self) {
        self.done.send_replace(true);
    }

    fn fail_start(&self, e: PlaybackError) -> PlaybackError {
        self.record_error(&e);
        let _ = self.stop();
        self.receivers.lock().take();
        self.mark_done();
        e
    }
}
