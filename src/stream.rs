use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use log::debug;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::codec::ClientCodec;
use crate::commands::*;
use crate::error::{Error, SmtpResult};
use crate::extension::ClientId;
use crate::response::parse_response;

/// SMTP stream: writes commands, reads replies.
#[derive(Debug)]
pub struct SmtpStream<S: AsyncRead + AsyncWrite + Unpin> {
    /// Inner stream.
    inner: BufReader<S>,
    /// Deadline applied to every command/reply exchange
    timeout: Option<Duration>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> SmtpStream<S> {
    /// Creates new SMTP stream.
    pub fn new(stream: S, timeout: Option<Duration>) -> Self {
        Self {
            inner: BufReader::new(stream),
            timeout,
        }
    }

    /// Returns inner stream.
    ///
    /// Should only be used when there are no unread responses,
    /// because the buffer of `BufReader` may be lost.
    pub fn into_inner(self) -> S {
        self.inner.into_inner()
    }

    /// Sends EHLO command and returns server response.
    pub async fn ehlo(&mut self, client_id: ClientId) -> SmtpResult {
        self.command(EhloCommand::new(client_id)).await
    }

    /// Send the given SMTP command to the server.
    pub async fn command(&mut self, command: impl Display) -> SmtpResult {
        let line = command.to_string();
        let timeout = self.timeout;
        with_timeout(timeout, async {
            self.write(line.as_bytes(), false).await?;
            self.read_response_inner().await
        })
        .await
    }

    /// Like [`SmtpStream::command`], for lines carrying credentials.
    ///
    /// The line itself is kept out of the debug log.
    pub async fn secret_command(&mut self, command: impl Display) -> SmtpResult {
        let line = command.to_string();
        let timeout = self.timeout;
        with_timeout(timeout, async {
            self.write(line.as_bytes(), true).await?;
            self.read_response_inner().await
        })
        .await
    }

    /// Writes the given data to the server.
    async fn write(&mut self, string: &[u8], secret: bool) -> Result<(), Error> {
        self.inner.get_mut().write_all(string).await?;
        self.inner.get_mut().flush().await?;

        if secret {
            debug!(">> <credentials hidden>");
        } else {
            debug!(
                ">> {}",
                escape_crlf(String::from_utf8_lossy(string).as_ref())
            );
        }
        Ok(())
    }

    /// Read an SMTP response from the wire.
    pub async fn read_response(&mut self) -> SmtpResult {
        let timeout = self.timeout;
        with_timeout(timeout, self.read_response_inner()).await
    }

    async fn read_response_inner(&mut self) -> SmtpResult {
        let reader = &mut self.inner;
        let mut buffer = String::with_capacity(100);

        loop {
            let read = reader.read_line(&mut buffer).await?;
            if read == 0 {
                break;
            }
            debug!("<< {}", escape_crlf(&buffer));
            match parse_response(&buffer) {
                Ok((_remaining, response)) => {
                    if response.is_positive() {
                        return Ok(response);
                    }

                    return Err(response.into());
                }
                Err(nom::Err::Failure(e)) => {
                    return Err(Error::Parsing(e.code));
                }
                Err(nom::Err::Incomplete(_)) => { /* read more */ }
                Err(nom::Err::Error(e)) => {
                    return Err(Error::Parsing(e.code));
                }
            }
        }

        Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed before a complete reply",
        )
        .into())
    }

    /// Sends the message content, then the final dot, and reads the reply.
    pub async fn message(&mut self, message: &[u8]) -> SmtpResult {
        let timeout = self.timeout;
        with_timeout(timeout, async {
            let mut codec = ClientCodec::new();
            let stream = self.inner.get_mut();
            codec.encode(message, stream).await?;
            codec.encode(&[], stream).await?;
            stream.flush().await?;
            debug!(">> <{} bytes of message data>.<CRLF>", message.len());

            self.read_response_inner().await
        })
        .await
    }

    /// Shuts down the write half of the underlying connection.
    pub async fn shutdown(&mut self) -> Result<(), Error> {
        let timeout = self.timeout;
        with_timeout(timeout, async {
            self.inner.get_mut().shutdown().await?;
            Ok(())
        })
        .await
    }
}

/// Runs `f` under an optional deadline
pub(crate) async fn with_timeout<T, F>(timeout: Option<Duration>, f: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    match timeout {
        Some(duration) => tokio::time::timeout(duration, f).await?,
        None => f.await,
    }
}

/// Returns the string replacing all the CRLF with "\<CRLF\>"
/// Used for debug displays
fn escape_crlf(string: &str) -> String {
    string.replace("\r\n", "<CRLF>")
}
