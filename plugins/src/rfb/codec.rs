//! RFB message framing for the client side of a session.

use tokio::io::{AsyncRead, AsyncReadExt};

use vncplay_core::api::{
    ConnectionError, Encoding, Frame, FramebufferUpdate, Rectangle, ServerMessage, WireEvent,
};

/// Bytes per pixel of the format requested in `SetPixelFormat`.
pub const BYTES_PER_PIXEL: usize = 4;

/// Largest length-prefixed string accepted from a server (cut text, desktop
/// name, failure reasons).
pub const MAX_TEXT_LEN: usize = 1 << 20;

/// 32bpp, depth 24, little endian true colour with red in the low byte.
pub const PIXEL_FORMAT: [u8; 16] = [
    32, 24, 0, 1, // bpp, depth, big-endian, true-colour
    0, 255, 0, 255, 0, 255, // red/green/blue max
    0, 8, 16, // red/green/blue shift
    0, 0, 0,
];

pub fn encode_set_pixel_format() -> Vec<u8> {
    let mut buf = vec![0u8, 0, 0, 0];
    buf.extend_from_slice(&PIXEL_FORMAT);
    buf
}

pub fn encode_set_encodings(encodings: &[Encoding]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + encodings.len() * 4);
    buf.push(2);
    buf.push(0);
    buf.extend_from_slice(&(encodings.len() as u16).to_be_bytes());
    for e in encodings {
        buf.extend_from_slice(&e.code().to_be_bytes());
    }
    buf
}

fn key_event(down: bool, keysym: u32, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&[4, down as u8, 0, 0]);
    buf.extend_from_slice(&keysym.to_be_bytes());
}

/// One wire event may expand to several client messages.
pub fn encode_event(event: &WireEvent) -> Vec<u8> {
    let mut buf = Vec::with_capacity(16);
    match *event {
        WireEvent::Key { down, keysym } => key_event(down, keysym, &mut buf),
        WireEvent::KeyTap { keysym } => {
            key_event(true, keysym, &mut buf);
            key_event(false, keysym, &mut buf);
        }
        WireEvent::Pointer { mask, x, y } => {
            buf.extend_from_slice(&[5, mask]);
            buf.extend_from_slice(&x.to_be_bytes());
            buf.extend_from_slice(&y.to_be_bytes());
        }
        WireEvent::FramebufferRequest {
            incremental,
            x,
            y,
            width,
            height,
        } => {
            buf.extend_from_slice(&[3, incremental as u8]);
            for v in [x, y, width, height] {
                buf.extend_from_slice(&v.to_be_bytes());
            }
        }
    }
    buf
}

async fn skip<R: AsyncRead + Unpin>(r: &mut R, n: usize) -> Result<(), ConnectionError> {
    let copied = tokio::io::copy(&mut (&mut *r).take(n as u64), &mut tokio::io::sink()).await?;
    if copied < n as u64 {
        return Err(ConnectionError::Closed);
    }
    Ok(())
}

/// Read a `u32` length followed by that many bytes.
///
/// The length is checked against [`MAX_TEXT_LEN`] before anything is allocated.
pub async fn read_text<R: AsyncRead + Unpin>(
    r: &mut R,
    what: &str,
) -> Result<Vec<u8>, ConnectionError> {
    let len = r.read_u32().await? as usize;
    if len > MAX_TEXT_LEN {
        return Err(ConnectionError::Protocol(format!(
            "{what} length {len} exceeds {MAX_TEXT_LEN}"
        )));
    }
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Read one server-to-client message.
///
/// Raw rectangles must lie inside `framebuffer` (width, height).
pub async fn read_server_message<R: AsyncRead + Unpin>(
    r: &mut R,
    framebuffer: (u16, u16),
) -> Result<ServerMessage, ConnectionError> {
    let kind = match r.read_u8().await {
        Ok(k) => k,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ConnectionError::Closed)
        }
        Err(e) => return Err(e.into()),
    };

    match kind {
        0 => read_framebuffer_update(r, framebuffer)
            .await
            .map(ServerMessage::FramebufferUpdate),
        1 => {
            skip(r, 3).await?;
            let count = r.read_u16().await? as usize;
            skip(r, count * 6).await?;
            Ok(ServerMessage::SetColorMapEntries)
        }
        2 => Ok(ServerMessage::Bell),
        3 => {
            skip(r, 3).await?;
            let text = read_text(r, "cut text").await?;
            // latin-1
            Ok(ServerMessage::ServerCutText(
                text.into_iter().map(char::from).collect(),
            ))
        }
        other => Err(ConnectionError::Protocol(format!(
            "unknown server message type {other}"
        ))),
    }
}

async fn read_framebuffer_update<R: AsyncRead + Unpin>(
    r: &mut R,
    (fb_width, fb_height): (u16, u16),
) -> Result<FramebufferUpdate, ConnectionError> {
    skip(r, 1).await?;
    let count = r.read_u16().await?;
    let mut rectangles = Vec::with_capacity(count as usize);

    for _ in 0..count {
        let x = r.read_u16().await?;
        let y = r.read_u16().await?;
        let width = r.read_u16().await?;
        let height = r.read_u16().await?;
        let encoding = r.read_i32().await?;
        let area = width as usize * height as usize;

        let pixels = if encoding == Encoding::Raw.code() {
            if x as u32 + width as u32 > fb_width as u32
                || y as u32 + height as u32 > fb_height as u32
            {
                return Err(ConnectionError::Protocol(format!(
                    "rectangle {width}x{height}+{x}+{y} outside {fb_width}x{fb_height} framebuffer"
                )));
            }
            let mut raw = vec![0u8; area * BYTES_PER_PIXEL];
            r.read_exact(&mut raw).await?;
            Some(raw_to_frame(width, height, raw))
        } else if encoding == Encoding::CursorPseudo.code() {
            let mask = (width as usize).div_ceil(8) * height as usize;
            skip(r, area * BYTES_PER_PIXEL + mask).await?;
            None
        } else {
            return Err(ConnectionError::UnsupportedEncoding(encoding));
        };

        rectangles.push(Rectangle {
            x,
            y,
            width,
            height,
            pixels,
        });
    }

    Ok(FramebufferUpdate { rectangles })
}

fn raw_to_frame(width: u16, height: u16, mut raw: Vec<u8>) -> Frame {
    for px in raw.chunks_exact_mut(BYTES_PER_PIXEL) {
        px[3] = 255;
    }
    Frame::new(width as u32, height as u32, raw)
}
