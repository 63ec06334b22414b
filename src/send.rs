//! One-shot delivery of a single message

use std::time::Duration;

use log::{info, warn};

use crate::config::{ConnectionConfig, TlsMode};
use crate::error::Error;
use crate::message::Message;
use crate::net::{Connector, NetworkConnector};
use crate::smtp_client::{SmtpClient, SmtpTransport};
use crate::stream::with_timeout;
use crate::tls::ClientTlsParameters;

/// Failure of [`send`], tagged with the step that failed
#[derive(thiserror::Error, Debug)]
pub enum SendError {
    /// Invalid settings, nothing was sent
    #[error("configuration: {0}")]
    Config(#[source] Error),
    /// The connection could not be opened
    #[error("connection failed: {0}")]
    Transport(#[source] Error),
    /// Greeting or `EHLO` failed
    #[error("handshake failed: {0}")]
    Handshake(#[source] Error),
    /// `STARTTLS` refused or the TLS upgrade failed
    #[error("STARTTLS failed: {0}")]
    TlsNegotiation(#[source] Error),
    /// `AUTH` rejected or the exchange broke off
    #[error("authentication failed: {0}")]
    Auth(#[source] Error),
    /// `MAIL FROM` or `RCPT TO` rejected
    #[error("envelope rejected: {0}")]
    Envelope(#[source] Error),
    /// `DATA` or the message itself rejected
    #[error("message transmission failed: {0}")]
    Data(#[source] Error),
    /// `QUIT` failed after the message was accepted
    #[error("QUIT failed: {0}")]
    Quit(#[source] Error),
}

impl SendError {
    /// The underlying protocol error
    pub fn inner(&self) -> &Error {
        match self {
            SendError::Config(err)
            | SendError::Transport(err)
            | SendError::Handshake(err)
            | SendError::TlsNegotiation(err)
            | SendError::Auth(err)
            | SendError::Envelope(err)
            | SendError::Data(err)
            | SendError::Quit(err) => err,
        }
    }

    /// The server accepted the message data before the failure, so it was
    /// most likely delivered.
    pub fn message_may_have_been_delivered(&self) -> bool {
        matches!(self, SendError::Quit(_))
    }
}

/// Sends `message` over a real network connection.
pub async fn send(config: &ConnectionConfig, message: &Message) -> Result<(), SendError> {
    send_with(&NetworkConnector, config, message).await
}

/// Sends `message` through `connector`.
///
/// Settings are checked before anything is dialed. Once a connection
/// exists it is shut down on every path out of this function.
pub async fn send_with<C: Connector>(
    connector: &C,
    config: &ConnectionConfig,
    message: &Message,
) -> Result<(), SendError> {
    let bounds = config.tls_bounds().map_err(SendError::Config)?;
    let mode = config.tls_mode().map_err(SendError::Config)?;
    config.validate_endpoint().map_err(SendError::Config)?;
    let mechanism = config.auth_mode().mechanism();
    let credentials = config.credentials();
    let envelope = message.envelope().map_err(SendError::Envelope)?;
    let timeout = config.timeout();

    let tls_parameters = match mode {
        TlsMode::None => None,
        TlsMode::StartTls | TlsMode::Tls => Some(ClientTlsParameters::with_bounds(
            config.server.clone(),
            bounds,
            config.tls_validate,
        )),
    };

    info!("connecting to SMTP: {}:{}", config.server, config.port);
    let dial_tls = match mode {
        TlsMode::Tls => tls_parameters.as_ref(),
        TlsMode::None | TlsMode::StartTls => None,
    };
    let stream = with_timeout(
        timeout,
        connector.connect(&config.server, config.port, dial_tls),
    )
    .await
    .map_err(SendError::Transport)?;

    let client = SmtpClient::new().timeout(timeout);
    let mut transport = SmtpTransport::new(client, stream)
        .await
        .map_err(SendError::Handshake)?;

    if let (TlsMode::StartTls, Some(tls_parameters)) = (mode, tls_parameters.as_ref()) {
        transport = starttls(connector, transport, tls_parameters, timeout).await?;
    }

    if mechanism.is_some() && mode == TlsMode::None {
        warn!("credentials are sent over an unencrypted connection");
    }

    let composed = message.compose();
    let result = async {
        if let Some(mechanism) = mechanism {
            transport
                .auth(mechanism, &credentials)
                .await
                .map_err(SendError::Auth)?;
        }
        transport
            .envelope(&envelope)
            .await
            .map_err(SendError::Envelope)?;
        transport
            .data(composed.as_bytes())
            .await
            .map_err(SendError::Data)?;
        transport.quit().await.map_err(SendError::Quit)
    }
    .await;

    transport.close().await;
    result
}

/// Upgrades the session: `STARTTLS`, TLS handshake, then a new `EHLO`.
async fn starttls<C: Connector>(
    connector: &C,
    transport: SmtpTransport<C::Stream>,
    tls_parameters: &ClientTlsParameters,
    timeout: Option<Duration>,
) -> Result<SmtpTransport<C::Stream>, SendError> {
    let client = transport.client().clone().without_greeting();
    let stream = transport
        .starttls()
        .await
        .map_err(SendError::TlsNegotiation)?;
    let stream = with_timeout(timeout, connector.upgrade_tls(stream, tls_parameters))
        .await
        .map_err(SendError::TlsNegotiation)?;
    info!("connection upgraded to TLS");
    SmtpTransport::new(client, stream)
        .await
        .map_err(SendError::TlsNegotiation)
}
