//! TCP connector speaking the RFB (VNC) protocol.

pub mod codec;
pub mod handshake;

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use vncplay_core::api::{
    ConnectionConfig, ConnectionError, DisplayConnection, DisplayConnector, Encoding,
    MessageReader, MessageWriter, ServerMessage, WireEvent,
};

use self::handshake::{handshake, ServerInit};

/// Ports below this are VNC display numbers rather than TCP ports.
const DISPLAY_LIMIT: u16 = 100;

pub struct RfbConnector {
    cfg: ConnectionConfig,
}

impl RfbConnector {
    pub fn new(cfg: ConnectionConfig) -> Self {
        Self { cfg }
    }

    /// `host`, `host:display` or `host:port`.
    pub fn resolve(&self, addr: &str) -> String {
        match addr.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') => match port.parse::<u16>() {
                Ok(n) if n < DISPLAY_LIMIT => format!("{host}:{}", self.cfg.default_port.saturating_add(n)),
                _ => addr.to_string(),
            },
            Some(_) => addr.to_string(),
            None => format!("{addr}:{}", self.cfg.default_port),
        }
    }
}

#[async_trait]
impl DisplayConnector for RfbConnector {
    fn name(&self) -> &str {
        "rfb"
    }

    async fn connect(&self, addr: &str) -> Result<Box<dyn DisplayConnection>, ConnectionError> {
        let target = self.resolve(addr);
        let limit = Duration::from_millis(self.cfg.connect_timeout_ms);

        let opening = async {
            let mut stream = TcpStream::connect(&target).await?;
            stream.set_nodelay(true)?;
            let init = handshake(&mut stream, self.cfg.shared).await?;
            Ok::<_, ConnectionError>((stream, init))
        };
        let (stream, init) = tokio::time::timeout(limit, opening)
            .await
            .map_err(|_| ConnectionError::TimedOut)??;

        tracing::info!(
            addr = %target,
            desktop = %init.name,
            width = init.width,
            height = init.height,
            "rfb session established"
        );

        let (read_half, write_half) = stream.into_split();
        Ok(Box::new(RfbConnection::new(read_half, write_half, init)))
    }
}

pub struct RfbConnection {
    reader: Option<Box<dyn MessageReader>>,
    writer: Option<Box<dyn MessageWriter>>,
    init: ServerInit,
}

impl RfbConnection {
    pub fn new<R, W>(read_half: R, write_half: W, init: ServerInit) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Self {
            reader: Some(Box::new(RfbReader {
                inner: BufReader::new(read_half),
                framebuffer: (init.width, init.height),
            })),
            writer: Some(Box::new(RfbWriter { inner: write_half })),
            init,
        }
    }
}

impl DisplayConnection for RfbConnection {
    fn reader(&mut self) -> Option<Box<dyn MessageReader>> {
        self.reader.take()
    }

    fn writer(&mut self) -> Option<Box<dyn MessageWriter>> {
        self.writer.take()
    }

    fn framebuffer_size(&self) -> (u16, u16) {
        (self.init.width, self.init.height)
    }
}

struct RfbReader<R> {
    inner: BufReader<R>,
    framebuffer: (u16, u16),
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> MessageReader for RfbReader<R> {
    async fn read_message(&mut self) -> Result<ServerMessage, ConnectionError> {
        codec::read_server_message(&mut self.inner, self.framebuffer).await
    }
}

struct RfbWriter<W> {
    inner: W,
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> MessageWriter for RfbWriter<W> {
    async fn write_event(&mut self, event: &WireEvent) -> Result<(), ConnectionError> {
        self.inner.write_all(&codec::encode_event(event)).await?;
        self.inner.flush().await?;
        Ok(())
    }

    async fn set_encodings(&mut self, encodings: &[Encoding]) -> Result<(), ConnectionError> {
        self.inner
            .write_all(&codec::encode_set_encodings(encodings))
            .await?;
        self.inner.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        self.inner.shutdown().await?;
        Ok(())
    }
}
