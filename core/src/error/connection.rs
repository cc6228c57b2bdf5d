use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("unsupported security: {0}")]
    Security(String),

    #[error("unsupported encoding {0}")]
    UnsupportedEncoding(i32),

    #[error("connection timed out")]
    TimedOut,

    #[error("connection closed")]
    Closed,
}
