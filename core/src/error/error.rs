use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use super::connection::ConnectionError;
use super::script::GrammarError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("playback failed: {0}")]
    Playback(#[from] PlaybackError),
    #[error("command failed: {0}")]
    Command(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Failure classes a playback session distinguishes.
///
/// Line-level classes (`MalformedLine`, `ParseFailure`) are recovered inside the
/// interpreter; everything else terminates the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedLine,
    ParseFailure,
    RecursionLimitExceeded,
    ConnectionWriteFailure,
    ConnectionReadFailure,
    SynchronizerTimeout,
    InvalidOperation,
    Io,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MalformedLine => "malformed_line",
            Self::ParseFailure => "parse_failure",
            Self::RecursionLimitExceeded => "recursion_limit",
            Self::ConnectionWriteFailure => "connection_write",
            Self::ConnectionReadFailure => "connection_read",
            Self::SynchronizerTimeout => "synchronizer_timeout",
            Self::InvalidOperation => "invalid_operation",
            Self::Io => "io",
        }
    }
}

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("{0}")]
    InvalidOperation(&'static str),

    #[error("too many recursive LoadFiles (depth {depth})")]
    RecursionLimit { depth: usize },

    #[error("timeout waiting for {reference} after {timeout:?}")]
    Timeout { reference: String, timeout: Duration },

    #[error("unable to connect to {host}: {source}")]
    Connect {
        host: String,
        #[source]
        source: ConnectionError,
    },

    #[error("unable to write event: {0}")]
    ConnectionWrite(#[source] ConnectionError),

    #[error("unable to read server message: {0}")]
    ConnectionRead(#[source] ConnectionError),

    #[error("unable to read script {path}: {source}")]
    Script {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("screenshot failed: {0}")]
    Screenshot(String),

    #[error("invalid directive: {0}")]
    Grammar(#[from] GrammarError),

    #[error("outbound queue closed")]
    OutboundClosed,
}

impl PlaybackError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidOperation(_) => ErrorKind::InvalidOperation,
            Self::RecursionLimit { .. } => ErrorKind::RecursionLimitExceeded,
            Self::Timeout { .. } => ErrorKind::SynchronizerTimeout,
            Self::Connect { .. } => ErrorKind::ConnectionWriteFailure,
            Self::ConnectionWrite(_) => ErrorKind::ConnectionWriteFailure,
            Self::OutboundClosed => ErrorKind::ConnectionWriteFailure,
            Self::ConnectionRead(_) => ErrorKind::ConnectionReadFailure,
            Self::Script { .. } => ErrorKind::Io,
            Self::Screenshot(_) => ErrorKind::Io,
            Self::Grammar(_) => ErrorKind::ParseFailure,
        }
    }
}

/// Snapshot of the fatal error that ended a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&PlaybackError> for LastError {
    fn from(e: &PlaybackError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}
