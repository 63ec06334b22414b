use std::time::Duration;

use log::{debug, info};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::authentication::{Credentials, LoginState, Mechanism};
use crate::commands::*;
use crate::error::{Error, SmtpResult};
use crate::extension::{ClientId, Extension, ServerInfo};
use crate::response::Response;
use crate::stream::SmtpStream;
use crate::types::Envelope;

/// Default timeout applied to every network operation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Contains client configuration
#[derive(Clone, Debug)]
pub struct SmtpClient {
    /// Name sent during EHLO
    hello_name: ClientId,
    /// Whether to expect greeting.
    /// Normally the server sends a greeting after connection,
    /// but not after STARTTLS.
    expect_greeting: bool,
    /// Deadline for each command/reply exchange
    timeout: Option<Duration>,
}

impl Default for SmtpClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for the SMTP `SmtpTransport`
impl SmtpClient {
    /// Creates a new SMTP client.
    ///
    /// It does not connect to the server, but only creates the `SmtpTransport`.
    ///
    /// Defaults are:
    ///
    /// * The local hostname as EHLO name
    /// * A 60 seconds timeout for smtp commands
    pub fn new() -> Self {
        SmtpClient {
            hello_name: Default::default(),
            expect_greeting: true,
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    /// Set the name used during EHLO
    pub fn hello_name(self, name: ClientId) -> SmtpClient {
        Self {
            hello_name: name,
            ..self
        }
    }

    /// Do not expect greeting.
    ///
    /// Used for the second EHLO after STARTTLS.
    pub fn without_greeting(self) -> SmtpClient {
        Self {
            expect_greeting: false,
            ..self
        }
    }

    /// Set the timeout duration, `None` waits forever
    pub fn timeout(self, timeout: Option<Duration>) -> SmtpClient {
        Self { timeout, ..self }
    }
}

/// Structure that implements the high level SMTP client
#[derive(Debug)]
pub struct SmtpTransport<S: AsyncRead + AsyncWrite + Unpin> {
    /// Information about the server
    server_info: ServerInfo,
    /// Information about the client
    client_info: SmtpClient,
    /// Low level client
    stream: SmtpStream<S>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> SmtpTransport<S> {
    /// Reads the greeting and introduces the client.
    ///
    /// The stream is shut down when this fails.
    pub async fn new(builder: SmtpClient, stream: S) -> Result<Self, Error> {
        let mut stream = SmtpStream::new(stream, builder.timeout);
        match Self::handshake(&builder, &mut stream).await {
            Ok(server_info) => {
                debug!("server {}", server_info);
                Ok(SmtpTransport {
                    server_info,
                    client_info: builder,
                    stream,
                })
            }
            Err(err) => {
                if let Err(close_err) = stream.shutdown().await {
                    debug!("shutdown after failed handshake: {}", close_err);
                }
                Err(err)
            }
        }
    }

    async fn handshake(
        builder: &SmtpClient,
        stream: &mut SmtpStream<S>,
    ) -> Result<ServerInfo, Error> {
        if builder.expect_greeting {
            let greeting = stream.read_response().await?;
            debug!("greeting: {}", greeting.first_line().unwrap_or_default());
        }

        match stream.ehlo(builder.hello_name.clone()).await {
            Ok(response) => ServerInfo::from_response(&response),
            Err(Error::Permanent(response)) => {
                info!("EHLO rejected ({}), falling back to HELO", response.code);
                let response = stream
                    .command(HeloCommand::new(builder.hello_name.clone()))
                    .await?;
                Ok(ServerInfo {
                    name: response.first_word().unwrap_or_default().to_string(),
                    features: Default::default(),
                })
            }
            Err(err) => Err(err),
        }
    }

    /// What the server announced in its `EHLO` reply
    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    fn supports_feature(&self, keyword: Extension) -> bool {
        self.server_info.supports_feature(keyword)
    }

    /// Sends STARTTLS command if the server supports it.
    ///
    /// Returns inner stream which should be upgraded to TLS. The stream is
    /// shut down when the server does not accept the command.
    pub async fn starttls(mut self) -> Result<S, Error> {
        if !self.supports_feature(Extension::StartTls) {
            self.close().await;
            return Err(From::from("server does not support STARTTLS"));
        }

        if let Err(err) = self.stream.command(StarttlsCommand).await {
            self.close().await;
            return Err(err);
        }

        // Return the stream, so the caller can upgrade it to TLS.
        Ok(self.stream.into_inner())
    }

    /// The builder this transport was created with
    pub fn client(&self) -> &SmtpClient {
        &self.client_info
    }

    /// Sends an AUTH command with the given mechanism, and handles challenge if needed
    pub async fn auth(&mut self, mechanism: Mechanism, credentials: &Credentials) -> SmtpResult {
        let command = AuthCommand::new(mechanism, credentials);
        let mut response = if mechanism.supports_initial_response() {
            self.stream.secret_command(command).await?
        } else {
            self.stream.command(command).await?
        };

        match mechanism {
            Mechanism::Plain => {
                if response.has_code(334) {
                    self.cancel_auth().await;
                    return Err(Error::ResponseParsing("unexpected challenge"));
                }
            }
            Mechanism::Login => {
                let mut state = LoginState::default();
                while response.has_code(334) {
                    let answer = match decode_challenge(&response)
                        .and_then(|challenge| state.respond(credentials, &challenge))
                    {
                        Ok(answer) => answer,
                        Err(err) => {
                            self.cancel_auth().await;
                            return Err(err);
                        }
                    };
                    response = self
                        .stream
                        .secret_command(AuthResponseCommand::new(answer))
                        .await?;
                }
                state.finish()?;
            }
        }

        debug!("authenticated with {}", mechanism);
        Ok(response)
    }

    /// Aborts a SASL exchange, ignoring whatever the server answers.
    async fn cancel_auth(&mut self) {
        if let Err(err) = self.stream.command("*\r\n").await {
            debug!("AUTH cancellation: {}", err);
        }
    }

    /// Sends `MAIL FROM` and `RCPT TO` for the envelope.
    pub async fn envelope(&mut self, envelope: &Envelope) -> Result<(), Error> {
        let body = if self.supports_feature(Extension::EightBitMime) {
            Some(MailBodyParameter::EightBitMime)
        } else {
            None
        };

        self.stream
            .command(MailCommand::new(envelope.from().cloned(), body))
            .await?;
        match envelope.from() {
            Some(from) => debug!("from=<{}>", from),
            None => debug!("from=<>"),
        }

        self.stream
            .command(RcptCommand::new(envelope.to().clone()))
            .await?;
        debug!("to=<{}>", envelope.to());

        Ok(())
    }

    /// Sends `DATA` followed by the message.
    pub async fn data(&mut self, message: &[u8]) -> SmtpResult {
        self.stream.command(DataCommand).await?;

        let response = self.stream.message(message).await?;
        debug!(
            "status=sent ({})",
            response.first_line().unwrap_or("no response")
        );
        Ok(response)
    }

    /// Closes the SMTP transaction if possible.
    pub async fn quit(&mut self) -> Result<(), Error> {
        self.stream.command(QuitCommand).await?;

        Ok(())
    }

    /// Shuts the connection down. Failures are only logged.
    pub async fn close(mut self) {
        if let Err(err) = self.stream.shutdown().await {
            debug!("shutdown: {}", err);
        }
    }
}

/// Decodes the base64 text of a `334` challenge
fn decode_challenge(response: &Response) -> Result<String, Error> {
    let encoded = response
        .first_word()
        .ok_or(Error::ResponseParsing("empty challenge"))?;
    Ok(String::from_utf8(base64::decode(encoded)?)?)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mock::{MockHandle, MockStream};

    const GREETING: &str = "220 mx.example.com ESMTP\r\n";

    fn client() -> SmtpClient {
        SmtpClient::new().hello_name(ClientId::Domain("client.example.com".to_string()))
    }

    async fn transport(replies: &[&str]) -> (SmtpTransport<MockStream>, MockHandle) {
        let mock = MockStream::with_replies(replies);
        let handle = mock.handle();
        (SmtpTransport::new(client(), mock).await.unwrap(), handle)
    }

    fn credentials() -> Credentials {
        Credentials::new("alice".to_string(), "secret".to_string())
    }

    #[tokio::test]
    async fn test_handshake_reads_capabilities() {
        let (transport, handle) = transport(&[
            GREETING,
            "250-mx.example.com\r\n250-STARTTLS\r\n250 AUTH PLAIN LOGIN\r\n",
        ])
        .await;

        assert_eq!(transport.server_info().name, "mx.example.com");
        assert!(transport.server_info().supports_feature(Extension::StartTls));
        assert!(transport
            .server_info()
            .supports_auth_mechanism(Mechanism::Login));
        assert_eq!(handle.lines(), vec!["EHLO client.example.com"]);
    }

    #[tokio::test]
    async fn test_helo_fallback() {
        let (transport, handle) = transport(&[
            GREETING,
            "502 5.5.1 command not implemented\r\n",
            "250 mx.example.com\r\n",
        ])
        .await;

        assert_eq!(transport.server_info().name, "mx.example.com");
        assert!(transport.server_info().features.is_empty());
        assert_eq!(
            handle.lines(),
            vec!["EHLO client.example.com", "HELO client.example.com"]
        );
    }

    #[tokio::test]
    async fn test_rejected_greeting_closes_stream() {
        let mock = MockStream::with_replies(&["554 5.3.2 go away\r\n"]);
        let handle = mock.handle();

        let result = SmtpTransport::new(client(), mock).await;

        assert!(matches!(result, Err(Error::Permanent(_))));
        assert!(handle.written().is_empty());
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn test_starttls_requires_extension() {
        let (transport, handle) = transport(&[GREETING, "250 mx.example.com\r\n"]).await;

        assert!(matches!(
            transport.starttls().await,
            Err(Error::Client("server does not support STARTTLS"))
        ));
        assert!(handle.is_closed());
        assert_eq!(handle.lines(), vec!["EHLO client.example.com"]);
    }

    #[tokio::test]
    async fn test_starttls_returns_stream() {
        let (transport, handle) = transport(&[
            GREETING,
            "250-mx.example.com\r\n250 STARTTLS\r\n",
            "220 2.0.0 ready to start TLS\r\n",
        ])
        .await;

        let _stream = transport.starttls().await.unwrap();

        assert!(!handle.is_closed());
        assert_eq!(handle.lines().last().map(String::as_str), Some("STARTTLS"));
    }

    #[tokio::test]
    async fn test_auth_plain() {
        let (mut transport, handle) = transport(&[
            GREETING,
            "250-mx.example.com\r\n250 AUTH PLAIN\r\n",
            "235 2.7.0 accepted\r\n",
        ])
        .await;

        transport
            .auth(Mechanism::Plain, &credentials())
            .await
            .unwrap();

        assert_eq!(
            handle.lines().last().map(String::as_str),
            Some("AUTH PLAIN AGFsaWNlAHNlY3JldA==")
        );
    }

    #[tokio::test]
    async fn test_auth_login() {
        let (mut transport, handle) = transport(&[
            GREETING,
            "250-mx.example.com\r\n250 AUTH LOGIN\r\n",
            "334 VXNlcm5hbWU6\r\n",
            "334 UGFzc3dvcmQ6\r\n",
            "235 2.7.0 accepted\r\n",
        ])
        .await;

        transport
            .auth(Mechanism::Login, &credentials())
            .await
            .unwrap();

        assert_eq!(
            handle.lines()[1..],
            ["AUTH LOGIN", "YWxpY2U=", "c2VjcmV0"]
        );
    }

    #[tokio::test]
    async fn test_auth_login_out_of_order() {
        let (mut transport, handle) = transport(&[
            GREETING,
            "250 mx.example.com\r\n",
            "334 UGFzc3dvcmQ6\r\n",
            "501 5.7.0 cancelled\r\n",
        ])
        .await;

        assert!(matches!(
            transport.auth(Mechanism::Login, &credentials()).await,
            Err(Error::Client("unrecognized challenge"))
        ));
        assert_eq!(handle.lines()[1..], ["AUTH LOGIN", "*"]);
    }

    #[tokio::test]
    async fn test_auth_login_ends_early() {
        let (mut transport, _handle) = transport(&[
            GREETING,
            "250 mx.example.com\r\n",
            "334 VXNlcm5hbWU6\r\n",
            "235 2.7.0 accepted\r\n",
        ])
        .await;

        assert!(matches!(
            transport.auth(Mechanism::Login, &credentials()).await,
            Err(Error::Client("unrecognized challenge"))
        ));
    }

    #[tokio::test]
    async fn test_auth_rejected() {
        let (mut transport, _handle) = transport(&[
            GREETING,
            "250 mx.example.com\r\n",
            "535 5.7.8 bad credentials\r\n",
        ])
        .await;

        assert!(matches!(
            transport.auth(Mechanism::Plain, &credentials()).await,
            Err(Error::Permanent(_))
        ));
    }

    #[tokio::test]
    async fn test_envelope_and_data() {
        let (mut transport, handle) = transport(&[
            GREETING,
            "250-mx.example.com\r\n250 8BITMIME\r\n",
            "250 2.1.0 ok\r\n",
            "250 2.1.5 ok\r\n",
            "354 go ahead\r\n",
            "250 2.0.0 queued\r\n",
            "221 2.0.0 bye\r\n",
        ])
        .await;
        let envelope = Envelope::new(
            Some("jane@example.com".parse().unwrap()),
            "john@example.com".parse().unwrap(),
        );

        transport.envelope(&envelope).await.unwrap();
        let response = transport.data(b"SGkgdGhlcmU=").await.unwrap();
        assert_eq!(response.first_line(), Some("2.0.0 queued"));
        transport.quit().await.unwrap();
        transport.close().await;

        assert_eq!(
            handle.lines()[1..],
            [
                "MAIL FROM:<jane@example.com> BODY=8BITMIME",
                "RCPT TO:<john@example.com>",
                "DATA",
                "SGkgdGhlcmU=",
                ".",
                "QUIT",
            ]
        );
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn test_rejected_recipient() {
        let (mut transport, handle) = transport(&[
            GREETING,
            "250 mx.example.com\r\n",
            "250 2.1.0 ok\r\n",
            "550 5.1.1 no such user\r\n",
        ])
        .await;
        let envelope = Envelope::new(
            Some("jane@example.com".parse().unwrap()),
            "nobody@example.com".parse().unwrap(),
        );

        assert!(matches!(
            transport.envelope(&envelope).await,
            Err(Error::Permanent(_))
        ));
        assert_eq!(
            handle.lines().last().map(String::as_str),
            Some("RCPT TO:<nobody@example.com>")
        );
    }
}
