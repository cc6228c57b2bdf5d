use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use vncplay_core::api::ConnectionError;

use super::codec::{encode_set_pixel_format, read_text};

const SECURITY_INVALID: u8 = 0;
const SECURITY_NONE: u8 = 1;

/// Protocol revisions this client speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Version {
    V3_3,
    V3_7,
    V3_8,
}

impl Version {
    fn banner(self) -> &'static [u8; 12] {
        match self {
            Self::V3_3 => b"RFB 003.003\n",
            Self::V3_7 => b"RFB 003.007\n",
            Self::V3_8 => b"RFB 003.008\n",
        }
    }

    /// Highest revision not newer than the one the server offers.
    fn negotiate(banner: &[u8; 12]) -> Result<Self, ConnectionError> {
        let text = std::str::from_utf8(banner)
            .ok()
            .and_then(|s| s.strip_prefix("RFB "))
            .and_then(|s| s.strip_suffix('\n'))
            .ok_or_else(|| {
                ConnectionError::Protocol(format!("bad protocol banner {banner:?}"))
            })?;
        let (major, minor) = text
            .split_once('.')
            .and_then(|(a, b)| Some((a.parse::<u32>().ok()?, b.parse::<u32>().ok()?)))
            .ok_or_else(|| ConnectionError::Protocol(format!("bad protocol version {text}")))?;

        match (major, minor) {
            (3, m) if m >= 8 => Ok(Self::V3_8),
            (3, 7) => Ok(Self::V3_7),
            (3, _) => Ok(Self::V3_3),
            (m, _) if m > 3 => Ok(Self::V3_8),
            _ => Err(ConnectionError::Protocol(format!(
                "unsupported protocol version {text}"
            ))),
        }
    }
}

/// What the server announced in `ServerInit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInit {
    pub width: u16,
    pub height: u16,
    pub name: String,
}

async fn read_reason<S: AsyncRead + Unpin>(s: &mut S) -> Result<String, ConnectionError> {
    let buf = read_text(s, "reason").await?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

async fn negotiate_security<S>(s: &mut S, version: Version) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if version == Version::V3_3 {
        return match s.read_u32().await? {
            0 => Err(ConnectionError::Security(read_reason(s).await?)),
            1 => Ok(()),
            other => Err(ConnectionError::Security(format!(
                "server requires security type {other}"
            ))),
        };
    }

    let count = s.read_u8().await? as usize;
    if count == 0 {
        return Err(ConnectionError::Security(read_reason(s).await?));
    }
    let mut offered = vec![SECURITY_INVALID; count];
    s.read_exact(&mut offered).await?;
    if !offered.contains(&SECURITY_NONE) {
        return Err(ConnectionError::Security(format!(
            "no supported security type in {offered:?}"
        )));
    }
    s.write_all(&[SECURITY_NONE]).await?;

    // 3.7 skips SecurityResult for the None type
    if version == Version::V3_8 && s.read_u32().await? != 0 {
        return Err(ConnectionError::Security(read_reason(s).await?));
    }
    Ok(())
}

/// Run the opening exchange up to and including `SetPixelFormat`.
pub async fn handshake<S>(s: &mut S, shared: bool) -> Result<ServerInit, ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut banner = [0u8; 12];
    s.read_exact(&mut banner).await?;
    let version = Version::negotiate(&banner)?;
    s.write_all(version.banner()).await?;
    tracing::debug!(?version, "rfb version agreed");

    negotiate_security(s, version).await?;

    s.write_all(&[shared as u8]).await?;

    let width = s.read_u16().await?;
    let height = s.read_u16().await?;
    let mut server_format = [0u8; 16];
    s.read_exact(&mut server_format).await?;
    let name = String::from_utf8_lossy(&read_text(s, "desktop name").await?).into_owned();

    s.write_all(&encode_set_pixel_format()).await?;
    s.flush().await?;

    Ok(ServerInit {
        width,
        height,
        name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::io::duplex;

    fn server_init(name: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&800u16.to_be_bytes());
        buf.extend_from_slice(&600u16.to_be_bytes());
        buf.extend_from_slice(&[0u8; 16]);
        buf.extend_from_slice(&(name.len() as u32).to_be_bytes());
        buf.extend_from_slice(name.as_bytes());
        buf
    }

    #[tokio::test]
    async fn negotiates_3_8_with_no_security() {
        let (mut client, mut server) = duplex(1024);

        let fake = tokio::spawn(async move {
            server.write_all(b"RFB 003.008\n").await.unwrap();
            let mut version = [0u8; 12];
            server.read_exact(&mut version).await.unwrap();
            assert_eq!(&version, b"RFB 003.008\n");

            server.write_all(&[2, 2, 1]).await.unwrap();
            assert_eq!(server.read_u8().await.unwrap(), SECURITY_NONE);
            server.write_all(&0u32.to_be_bytes()).await.unwrap();

            assert_eq!(server.read_u8().await.unwrap(), 1, "shared flag");
            server.write_all(&server_init("desk")).await.unwrap();

            let mut set_pixel_format = [0u8; 20];
            server.read_exact(&mut set_pixel_format).await.unwrap();
            assert_eq!(set_pixel_format[0], 0);
            assert_eq!(set_pixel_format[4], 32);
        });

        let init = handshake(&mut client, true).await.unwrap();
        assert_eq!(
            init,
            ServerInit {
                width: 800,
                height: 600,
                name: "desk".into()
            }
        );
        fake.await.unwrap();
    }

    #[tokio::test]
    async fn speaks_3_3_to_old_servers() {
        let (mut client, mut server) = duplex(1024);

        let fake = tokio::spawn(async move {
            server.write_all(b"RFB 003.003\n").await.unwrap();
            let mut version = [0u8; 12];
            server.read_exact(&mut version).await.unwrap();
            assert_eq!(&version, b"RFB 003.003\n");
            server.write_all(&1u32.to_be_bytes()).await.unwrap();
            assert_eq!(server.read_u8().await.unwrap(), 0, "exclusive");
            server.write_all(&server_init("")).await.unwrap();
            let mut rest = [0u8; 20];
            server.read_exact(&mut rest).await.unwrap();
        });

        let init = handshake(&mut client, false).await.unwrap();
        assert_eq!((init.width, init.height), (800, 600));
        fake.await.unwrap();
    }

    #[tokio::test]
    async fn rejects_password_only_server() {
        let (mut client, mut server) = duplex(1024);

        let fake = tokio::spawn(async move {
            server.write_all(b"RFB 003.007\n").await.unwrap();
            let mut version = [0u8; 12];
            server.read_exact(&mut version).await.unwrap();
            server.write_all(&[1, 2]).await.unwrap();
        });

        let err = handshake(&mut client, true).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Security(_)));
        fake.await.unwrap();
    }

    #[test]
    fn version_negotiation() {
        assert_eq!(Version::negotiate(b"RFB 003.889\n").unwrap(), Version::V3_8);
        assert_eq!(Version::negotiate(b"RFB 003.007\n").unwrap(), Version::V3_7);
        assert_eq!(Version::negotiate(b"RFB 003.005\n").unwrap(), Version::V3_3);
        assert!(Version::negotiate(b"HTTP/1.1 200").is_err());
    }

    #[tokio::test]
    async fn huge_failure_reason_is_refused() {
        let (mut client, mut server) = duplex(1024);

        let fake = tokio::spawn(async move {
            server.write_all(b"RFB 003.003\n").await.unwrap();
            let mut version = [0u8; 12];
            server.read_exact(&mut version).await.unwrap();
            server.write_all(&0u32.to_be_bytes()).await.unwrap();
            server.write_all(&u32::MAX.to_be_bytes()).await.unwrap();
        });

        let err = handshake(&mut client, true).await.unwrap_err();
        assert!(
            matches!(&err, ConnectionError::Protocol(m) if m.contains("reason")),
            "{err:?}"
        );
        fake.await.unwrap();
    }

    #[tokio::test]
    async fn huge_desktop_name_is_refused() {
        let (mut client, mut server) = duplex(1024);

        let fake = tokio::spawn(async move {
            server.write_all(b"RFB 003.003\n").await.unwrap();
            let mut version = [0u8; 12];
            server.read_exact(&mut version).await.unwrap();
            server.write_all(&1u32.to_be_bytes()).await.unwrap();
            server.read_u8().await.unwrap();
            let mut init = server_init("");
            let len = init.len();
            init[len - 4..].copy_from_slice(&u32::MAX.to_be_bytes());
            server.write_all(&init).await.unwrap();
        });

        let err = handshake(&mut client, false).await.unwrap_err();
        assert!(
            matches!(&err, ConnectionError::Protocol(m) if m.contains("desktop name")),
            "{err:?}"
        );
        fake.await.unwrap();
    }
}
