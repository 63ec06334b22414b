//! YAML configuration of a test run

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::authentication::{Credentials, Mechanism};
use crate::error::Error;
use crate::message::Message;
use crate::tls::TlsBounds;

/// Default port when the file does not name one
pub const SMTP_PORT: u16 = 25;

fn default_port() -> u16 {
    SMTP_PORT
}
fn default_true() -> bool {
    true
}
fn default_tls_min() -> String {
    "1.2".to_string()
}
fn default_tls_max() -> String {
    "1.3".to_string()
}
fn default_timeout_secs() -> Option<u64> {
    Some(60)
}

/// TLS versions are often written unquoted (`TLSmin: 1.2`), which YAML
/// reads as a float.
fn version_token<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Token {
        Text(String),
        Number(f64),
    }

    Ok(match Token::deserialize(deserializer)? {
        Token::Text(text) => text,
        Token::Number(number) => format!("{:?}", number),
    })
}

/// Where and how to connect
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionConfig {
    pub server: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// Connection type token: empty, `StartTLS` or `TLS`
    #[serde(rename = "TLS", default)]
    pub tls: String,
    /// Verify the server certificate and host name
    #[serde(rename = "TLSvalid", default = "default_true")]
    pub tls_validate: bool,
    #[serde(
        rename = "TLSmin",
        default = "default_tls_min",
        deserialize_with = "version_token"
    )]
    pub tls_min: String,
    #[serde(
        rename = "TLSmax",
        default = "default_tls_max",
        deserialize_with = "version_token"
    )]
    pub tls_max: String,
    /// Authentication token: `PLAIN`, `LOGIN`, anything else disables it
    #[serde(default)]
    pub auth: String,
    /// Seconds allowed for each network operation, `0` or `null` to wait
    /// forever
    #[serde(default = "default_timeout_secs")]
    pub timeout: Option<u64>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            server: String::new(),
            port: default_port(),
            user: String::new(),
            password: String::new(),
            tls: String::new(),
            tls_validate: default_true(),
            tls_min: default_tls_min(),
            tls_max: default_tls_max(),
            auth: String::new(),
            timeout: default_timeout_secs(),
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("tls", &self.tls)
            .field("tls_validate", &self.tls_validate)
            .field("tls_min", &self.tls_min)
            .field("tls_max", &self.tls_max)
            .field("auth", &self.auth)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ConnectionConfig {
    pub fn tls_mode(&self) -> Result<TlsMode, Error> {
        self.tls.parse()
    }

    pub fn tls_bounds(&self) -> Result<TlsBounds, Error> {
        TlsBounds::resolve(&self.tls_min, &self.tls_max)
    }

    pub fn auth_mode(&self) -> AuthMode {
        AuthMode::from_token(&self.auth)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.user.clone(), self.password.clone())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Checks the address fields that cannot be caught while parsing.
    pub fn validate_endpoint(&self) -> Result<(), Error> {
        if self.server.trim().is_empty() {
            return Err(Error::config("server is not set"));
        }
        if self.port == 0 {
            return Err(Error::config("port must be between 1 and 65535"));
        }
        Ok(())
    }
}

/// How TLS is applied to the connection
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum TlsMode {
    /// Plain text for the whole session
    None,
    /// Plain connection upgraded with `STARTTLS`
    StartTls,
    /// TLS from the first byte
    Tls,
}

impl FromStr for TlsMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(TlsMode::None),
            "StartTLS" => Ok(TlsMode::StartTls),
            "TLS" => Ok(TlsMode::Tls),
            _ => Err(Error::config("unsupported connection type")),
        }
    }
}

/// Authentication to perform after the handshake
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum AuthMode {
    None,
    Plain,
    Login,
}

impl AuthMode {
    /// Unknown tokens, including the empty one, skip authentication.
    pub fn from_token(token: &str) -> AuthMode {
        match token {
            "PLAIN" => AuthMode::Plain,
            "LOGIN" => AuthMode::Login,
            _ => AuthMode::None,
        }
    }

    pub fn mechanism(self) -> Option<Mechanism> {
        match self {
            AuthMode::None => None,
            AuthMode::Plain => Some(Mechanism::Plain),
            AuthMode::Login => Some(Mechanism::Login),
        }
    }
}

/// Error while reading the configuration file
#[derive(thiserror::Error, Debug)]
pub enum ConfigLoadError {
    #[error("error read {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Whole configuration file: connection settings and the message to send
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub connection: ConnectionConfig,
    #[serde(flatten)]
    pub message: Message,
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Config, ConfigLoadError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Config, ConfigLoadError> {
        let path = path.as_ref();
        let yaml = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigLoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Config::from_yaml(&yaml)
    }
}
