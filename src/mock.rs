//! Scripted in-memory SMTP server for tests

#![allow(missing_docs)]

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::error::Error;
use crate::net::Connector;
use crate::tls::ClientTlsParameters;

#[derive(Debug, Default)]
struct Shared {
    written: Vec<u8>,
    closed: bool,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Stream replaying canned server replies.
///
/// Replies are handed out one line per read, so a buffered reader never
/// consumes more than the reply it is waiting for. Once the script is
/// exhausted reads return EOF.
#[derive(Debug)]
pub struct MockStream {
    replies: VecDeque<Vec<u8>>,
    silent: bool,
    shared: Arc<Mutex<Shared>>,
}

/// Observes a [`MockStream`] after it has been moved into a client
#[derive(Clone, Debug)]
pub struct MockHandle {
    shared: Arc<Mutex<Shared>>,
}

impl MockStream {
    pub fn with_replies(replies: &[&str]) -> MockStream {
        let replies = replies
            .iter()
            .flat_map(|reply| reply.split_inclusive('\n'))
            .map(|line| line.as_bytes().to_vec())
            .collect();
        MockStream {
            replies,
            silent: false,
            shared: Arc::default(),
        }
    }

    /// A server that accepts the connection and never answers
    pub fn silent() -> MockStream {
        MockStream {
            replies: VecDeque::new(),
            silent: true,
            shared: Arc::default(),
        }
    }

    pub fn handle(&self) -> MockHandle {
        MockHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl MockHandle {
    /// Everything the client wrote so far
    pub fn written(&self) -> String {
        String::from_utf8_lossy(&lock(&self.shared).written).into_owned()
    }

    /// Command lines written by the client, without line endings
    pub fn lines(&self) -> Vec<String> {
        self.written().lines().map(str::to_string).collect()
    }

    /// Has the stream been shut down or dropped
    pub fn is_closed(&self) -> bool {
        lock(&self.shared).closed
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        lock(&self.shared).closed = true;
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.silent {
            return Poll::Pending;
        }
        if let Some(mut line) = this.replies.pop_front() {
            let len = line.len().min(buf.remaining());
            buf.put_slice(&line[..len]);
            if len < line.len() {
                this.replies.push_front(line.split_off(len));
            }
        }
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut shared = lock(&self.shared);
        if shared.closed {
            return Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()));
        }
        shared.written.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        lock(&self.shared).closed = true;
        Poll::Ready(Ok(()))
    }
}

/// [`Connector`] handing out a single scripted [`MockStream`]
#[derive(Debug)]
pub struct MockConnector {
    stream: Mutex<Option<MockStream>>,
    handle: MockHandle,
    refuse_dial: bool,
    refuse_upgrade: bool,
    dials: AtomicUsize,
    tls_dials: AtomicUsize,
    upgrades: AtomicUsize,
    tls_domains: Mutex<Vec<String>>,
}

impl MockConnector {
    /// Serves `replies` on the first connection. A STARTTLS upgrade keeps
    /// replaying the same script.
    pub fn new(replies: &[&str]) -> MockConnector {
        MockConnector::with_stream(MockStream::with_replies(replies))
    }

    pub fn with_stream(stream: MockStream) -> MockConnector {
        MockConnector {
            handle: stream.handle(),
            stream: Mutex::new(Some(stream)),
            refuse_dial: false,
            refuse_upgrade: false,
            dials: AtomicUsize::new(0),
            tls_dials: AtomicUsize::new(0),
            upgrades: AtomicUsize::new(0),
            tls_domains: Mutex::new(Vec::new()),
        }
    }

    /// Every dial fails with "connection refused"
    pub fn refusing() -> MockConnector {
        MockConnector {
            refuse_dial: true,
            ..MockConnector::new(&[])
        }
    }

    /// The TLS handshake after STARTTLS fails
    pub fn refusing_upgrade(self) -> MockConnector {
        MockConnector {
            refuse_upgrade: true,
            ..self
        }
    }

    pub fn handle(&self) -> MockHandle {
        self.handle.clone()
    }

    /// Number of connection attempts
    pub fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }

    /// Number of connection attempts with an immediate TLS handshake
    pub fn tls_dials(&self) -> usize {
        self.tls_dials.load(Ordering::SeqCst)
    }

    /// Number of STARTTLS upgrades attempted
    pub fn upgrades(&self) -> usize {
        self.upgrades.load(Ordering::SeqCst)
    }

    /// Domains handed over for TLS, on dial or upgrade, in order
    pub fn tls_domains(&self) -> Vec<String> {
        self.tls_domains
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record_tls(&self, tls_parameters: &ClientTlsParameters) {
        self.tls_domains
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tls_parameters.domain.clone());
    }

    fn take_stream(&self) -> Option<MockStream> {
        self.stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Stream = MockStream;

    async fn connect(
        &self,
        _host: &str,
        _port: u16,
        tls_parameters: Option<&ClientTlsParameters>,
    ) -> Result<MockStream, Error> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        if let Some(tls_parameters) = tls_parameters {
            self.tls_dials.fetch_add(1, Ordering::SeqCst);
            self.record_tls(tls_parameters);
        }
        if self.refuse_dial {
            // the script is never served, release it like a failed socket
            drop(self.take_stream());
            return Err(
                io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused").into(),
            );
        }
        self.take_stream()
            .ok_or(Error::Client("mock stream already in use"))
    }

    async fn upgrade_tls(
        &self,
        stream: MockStream,
        tls_parameters: &ClientTlsParameters,
    ) -> Result<MockStream, Error> {
        self.upgrades.fetch_add(1, Ordering::SeqCst);
        self.record_tls(tls_parameters);
        if self.refuse_upgrade {
            drop(stream);
            return Err(io::Error::new(io::ErrorKind::InvalidData, "handshake failure").into());
        }
        Ok(stream)
    }
}
