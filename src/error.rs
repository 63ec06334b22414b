//! Error and result type for SMTP clients

use std::io;
use std::string::FromUtf8Error;

use base64::DecodeError;

use crate::response::{Response, Severity};

use self::Error::*;

/// An enum of all error kinds.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Transient SMTP error, 4xx reply code
    ///
    /// [RFC 5321, section 4.2.1](https://tools.ietf.org/html/rfc5321#section-4.2.1)
    #[error("transient: {} {}", .0.code, .0.first_line().unwrap_or("undetailed error during SMTP transaction"))]
    Transient(Response),
    /// Permanent SMTP error, 5xx reply code
    ///
    /// [RFC 5321, section 4.2.1](https://tools.ietf.org/html/rfc5321#section-4.2.1)
    #[error("permanent: {} {}", .0.code, .0.first_line().unwrap_or("undetailed error during SMTP transaction"))]
    Permanent(Response),
    /// Error parsing a response
    #[error("{0}")]
    ResponseParsing(&'static str),
    /// Error parsing a base64 string in response
    #[error("challenge parsing: {0}")]
    ChallengeParsing(#[from] DecodeError),
    /// Error parsing UTF8 in response
    #[error("utf8: {0}")]
    Utf8Parsing(#[from] FromUtf8Error),
    /// Internal client error
    #[error("client: {0}")]
    Client(&'static str),
    /// Invalid settings, detected before any network activity
    #[error("config: {0}")]
    Config(String),
    /// IO error
    #[error("io: {0}")]
    Io(#[from] io::Error),
    /// TLS error
    #[error("tls: {0}")]
    Tls(#[from] native_tls::Error),
    /// Parsing error
    #[error("parsing: {0:?}")]
    Parsing(nom::error::ErrorKind),
    #[error("timeout: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),
}

impl Error {
    /// Builds a configuration error from anything printable
    pub fn config(msg: impl Into<String>) -> Error {
        Config(msg.into())
    }
}

impl From<Response> for Error {
    fn from(response: Response) -> Error {
        match response.code.severity {
            Severity::TransientNegativeCompletion => Transient(response),
            Severity::PermanentNegativeCompletion => Permanent(response),
            _ => Client("Unknown error code"),
        }
    }
}

impl From<&'static str> for Error {
    fn from(string: &'static str) -> Error {
        Client(string)
    }
}

/// SMTP result type
pub type SmtpResult = Result<Response, Error>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_response() {
        let transient: Response = "421 4.3.2 try later\r\n".parse().unwrap();
        let permanent: Response = "550 5.1.1 no such user\r\n".parse().unwrap();

        assert!(matches!(Error::from(transient), Error::Transient(_)));
        let err = Error::from(permanent);
        assert_eq!(err.to_string(), "permanent: 550 5.1.1 no such user");
    }

    #[test]
    fn test_positive_response_is_not_an_smtp_error() {
        let ok: Response = "250 ok\r\n".parse().unwrap();
        assert!(matches!(Error::from(ok), Error::Client(_)));
    }
}
