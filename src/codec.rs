use tokio::io::{AsyncWrite, AsyncWriteExt};

use std::io;

/// Dot-stuffing for the `DATA` section.
///
/// Tracks how much of a `<CRLF>.` sequence has been seen so that a line
/// starting with a dot gets an extra one, even across `encode` calls.
#[derive(Default, Clone, Copy, Debug)]
pub struct ClientCodec {
    escape_count: u8,
}

impl ClientCodec {
    /// Creates a new client codec
    pub fn new() -> Self {
        ClientCodec::default()
    }

    /// Writes `frame` with transparency applied.
    ///
    /// An empty frame ends the data section with `<CRLF>.<CRLF>`, reusing
    /// the line break already written if the data ended with one.
    pub async fn encode<W: AsyncWrite + Unpin>(
        &mut self,
        frame: &[u8],
        buf: &mut W,
    ) -> io::Result<()> {
        if frame.is_empty() {
            match self.escape_count {
                0 => buf.write_all(b"\r\n.\r\n").await?,
                1 => buf.write_all(b"\n.\r\n").await?,
                _ => buf.write_all(b".\r\n").await?,
            }
            self.escape_count = 0;
            return Ok(());
        }

        let mut start = 0;
        for (idx, byte) in frame.iter().enumerate() {
            self.escape_count = match (self.escape_count, *byte) {
                (_, b'\r') => 1,
                (1, b'\n') => 2,
                (2, b'.') => 3,
                _ => 0,
            };
            if self.escape_count == 3 {
                self.escape_count = 0;
                buf.write_all(&frame[start..idx]).await?;
                buf.write_all(b".").await?;
                start = idx;
            }
        }
        buf.write_all(&frame[start..]).await
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_codec() {
        let mut codec = ClientCodec::new();
        let mut buf: Vec<u8> = vec![];

        assert!(codec.encode(b"test\r\n", &mut buf).await.is_ok());
        assert!(codec.encode(b".\r\n", &mut buf).await.is_ok());
        assert!(codec.encode(b"\r\ntest", &mut buf).await.is_ok());
        assert!(codec.encode(b"te\r\n.\r\nst", &mut buf).await.is_ok());
        assert!(codec.encode(b"test", &mut buf).await.is_ok());
        assert!(codec.encode(b"test.", &mut buf).await.is_ok());
        assert!(codec.encode(b"test\n", &mut buf).await.is_ok());
        assert!(codec.encode(b".test\n", &mut buf).await.is_ok());
        assert!(codec.encode(b"test", &mut buf).await.is_ok());
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "test\r\n..\r\n\r\ntestte\r\n..\r\nsttesttest.test\n.test\ntest"
        );
    }

    #[tokio::test]
    async fn test_terminator() {
        let mut buf: Vec<u8> = vec![];
        let mut codec = ClientCodec::new();
        codec.encode(b"SGkgdGhlcmU=", &mut buf).await.unwrap();
        codec.encode(b"", &mut buf).await.unwrap();
        assert_eq!(buf, b"SGkgdGhlcmU=\r\n.\r\n");

        let mut buf: Vec<u8> = vec![];
        let mut codec = ClientCodec::new();
        codec.encode(b"line\r\n", &mut buf).await.unwrap();
        codec.encode(b"", &mut buf).await.unwrap();
        assert_eq!(buf, b"line\r\n.\r\n");
    }
}
