//! Boundary to the wire-level protocol implementation.
//!
//! A connection is split into an independent reader and writer so the
//! listener and the dispatcher never contend for it.

use async_trait::async_trait;

use crate::error::ConnectionError;
use crate::event::{ServerMessage, WireEvent};

/// Pixel encodings a client can advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Raw,
    CursorPseudo,
}

impl Encoding {
    pub fn code(self) -> i32 {
        match self {
            Self::Raw => 0,
            Self::CursorPseudo => -239,
        }
    }
}

#[async_trait]
pub trait MessageWriter: Send {
    async fn write_event(&mut self, event: &WireEvent) -> Result<(), ConnectionError>;
    async fn set_encodings(&mut self, encodings: &[Encoding]) -> Result<(), ConnectionError>;
    /// Ends the connection. The reader observes EOF or an error afterwards.
    async fn close(&mut self) -> Result<(), ConnectionError>;
}

#[async_trait]
pub trait MessageReader: Send {
    async fn read_message(&mut self) -> Result<ServerMessage, ConnectionError>;
}

pub trait DisplayConnection: Send {
    fn reader(&mut self) -> Option<Box<dyn MessageReader>>;
    fn writer(&mut self) -> Option<Box<dyn MessageWriter>>;
    /// Framebuffer dimensions announced by the server.
    fn framebuffer_size(&self) -> (u16, u16);
}

#[async_trait]
pub trait DisplayConnector: Send + Sync {
    fn name(&self) -> &str;
    async fn connect(&self, addr: &str) -> Result<Box<dyn DisplayConnection>, ConnectionError>;
}
