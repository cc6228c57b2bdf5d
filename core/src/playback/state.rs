use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::error::{LastError, PlaybackError};
use crate::event::{Signal, WireEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaybackState {
    Play,
    Pause,
}

/// Operations of the session façade that are gated on state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ControlOp {
    Start,
    Step,
    Pause,
    Continue,
    Stop,
    Inject,
}

pub(crate) const ALREADY_STOPPED: &str = "playback has already stopped";

impl ControlOp {
    fn rejection(self, closed: bool) -> &'static str {
        if closed {
            return ALREADY_STOPPED;
        }
        match self {
            Self::Start => "playback already started",
            Self::Step => "playback not stepable",
            Self::Pause => "playback not pauseable",
            Self::Continue => "playback not playable",
            Self::Stop | Self::Inject => ALREADY_STOPPED,
        }
    }
}

/// Everything guarded by the session lock.
///
/// The lock is only held for short critical sections; the senders stored here
/// are cloned out and used after the guard is dropped.
pub(crate) struct SessionState {
    pub state: PlaybackState,
    pub started: bool,
    pub closed: bool,
    pub current_event: String,
    pub remaining: Duration,
    pub depth: usize,
    pub current_file: Option<PathBuf>,
    pub last_error: Option<LastError>,
    pub started_at: Option<DateTime<Utc>>,
    pub signal_tx: Option<mpsc::UnboundedSender<Signal>>,
    pub out_tx: Option<mpsc::Sender<WireEvent>>,
}

impl SessionState {
    pub fn new(signal_tx: mpsc::UnboundedSender<Signal>, out_tx: mpsc::Sender<WireEvent>) -> Self {
        Self {
            state: PlaybackState::Play,
            started: false,
            closed: false,
            current_event: String::new(),
            remaining: Duration::ZERO,
            depth: 0,
            current_file: None,
            last_error: None,
            started_at: None,
            signal_tx: Some(signal_tx),
            out_tx: Some(out_tx),
        }
    }

    pub fn check(&self, op: ControlOp) -> Result<(), PlaybackError> {
        let allowed = match op {
            ControlOp::Start => !self.started && !self.closed,
            ControlOp::Step | ControlOp::Pause => {
                self.state == PlaybackState::Play && !self.closed
            }
            ControlOp::Continue => self.state == PlaybackState::Pause && !self.closed,
            ControlOp::Stop | ControlOp::Inject => !self.closed,
        };
        if allowed {
            Ok(())
        } else {
            Err(PlaybackError::InvalidOperation(op.rejection(self.closed)))
        }
    }

    /// Clone of the signal sender; callers send after releasing the lock.
    pub fn signal_sender(&self) -> Result<mpsc::UnboundedSender<Signal>, PlaybackError> {
        self.signal_tx
            .clone()
            .ok_or(PlaybackError::InvalidOperation(ALREADY_STOPPED))
    }

    /// One-way close. Dropping the signal sender is what the interpreter observes.
    pub fn close(&mut self) {
        self.closed = true;
        self.signal_tx = None;
        self.out_tx = None;
    }
}

pub(crate) fn send_signal(
    tx: &mpsc::UnboundedSender<Signal>,
    signal: Signal,
) -> Result<(), PlaybackError> {
    tx.send(signal)
        .map_err(|_| PlaybackError::InvalidOperation(ALREADY_STOPPED))
}
