//! Network streams and the seam used to open them

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_native_tls::TlsStream;
use async_trait::async_trait;
use log::debug;
use pin_project::pin_project;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;

use crate::error::Error;
use crate::tls::ClientTlsParameters;

/// Represents the different types of underlying network streams
#[pin_project(project = NetworkStreamProj)]
#[allow(missing_debug_implementations)]
pub enum NetworkStream {
    /// Plain TCP stream
    Tcp(#[pin] TcpStream),
    /// Encrypted TCP stream
    Tls(#[pin] TlsStream<TcpStream>),
}

impl NetworkStream {
    /// Is the stream encrypted
    pub fn is_encrypted(&self) -> bool {
        match *self {
            NetworkStream::Tcp(_) => false,
            NetworkStream::Tls(_) => true,
        }
    }
}

impl AsyncRead for NetworkStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.project() {
            NetworkStreamProj::Tcp(s) => s.poll_read(cx, buf),
            NetworkStreamProj::Tls(s) => s.poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for NetworkStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.project() {
            NetworkStreamProj::Tcp(s) => s.poll_write(cx, buf),
            NetworkStreamProj::Tls(s) => s.poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.project() {
            NetworkStreamProj::Tcp(s) => s.poll_flush(cx),
            NetworkStreamProj::Tls(s) => s.poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.project() {
            NetworkStreamProj::Tcp(s) => s.poll_shutdown(cx),
            NetworkStreamProj::Tls(s) => s.poll_shutdown(cx),
        }
    }
}

/// Opens connections to an SMTP server.
///
/// The session engine only talks to the network through this trait, so a
/// scripted implementation can stand in for a real server.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Stream produced by this connector
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Opens a connection to `host:port`, wrapped in TLS right away when
    /// `tls_parameters` is given
    async fn connect(
        &self,
        host: &str,
        port: u16,
        tls_parameters: Option<&ClientTlsParameters>,
    ) -> Result<Self::Stream, Error>;

    /// Upgrades an established plain connection to TLS
    async fn upgrade_tls(
        &self,
        stream: Self::Stream,
        tls_parameters: &ClientTlsParameters,
    ) -> Result<Self::Stream, Error>;
}

/// Connector using TCP sockets and `native-tls`
#[derive(Debug, Default, Clone, Copy)]
pub struct NetworkConnector;

#[async_trait]
impl Connector for NetworkConnector {
    type Stream = NetworkStream;

    async fn connect(
        &self,
        host: &str,
        port: u16,
        tls_parameters: Option<&ClientTlsParameters>,
    ) -> Result<NetworkStream, Error> {
        let tcp_stream = TcpStream::connect((host, port)).await?;
        debug!("connected to {}", tcp_stream.peer_addr()?);

        match tls_parameters {
            Some(context) => {
                let tls_stream = context
                    .connector
                    .connect(context.domain.as_str(), tcp_stream)
                    .await?;
                debug!("TLS handshake with {} done", context.domain);
                Ok(NetworkStream::Tls(tls_stream))
            }
            None => Ok(NetworkStream::Tcp(tcp_stream)),
        }
    }

    async fn upgrade_tls(
        &self,
        stream: NetworkStream,
        tls_parameters: &ClientTlsParameters,
    ) -> Result<NetworkStream, Error> {
        match stream {
            NetworkStream::Tcp(stream) => {
                let tls_stream = tls_parameters
                    .connector
                    .connect(tls_parameters.domain.as_str(), stream)
                    .await?;
                Ok(NetworkStream::Tls(tls_stream))
            }
            tls @ NetworkStream::Tls(_) => Ok(tls),
        }
    }
}
