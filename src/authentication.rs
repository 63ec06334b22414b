//! Provides the PLAIN and LOGIN SASL authentication mechanisms

use std::fmt::{self, Debug, Display, Formatter};

use crate::error::Error;

/// Challenge text sent by the server when it expects the username
pub const LOGIN_USERNAME_CHALLENGE: &str = "Username:";
/// Challenge text sent by the server when it expects the password
pub const LOGIN_PASSWORD_CHALLENGE: &str = "Password:";

/// Contains user credentials
#[derive(PartialEq, Eq, Clone)]
pub struct Credentials {
    authentication_identity: String,
    secret: String,
}

impl Credentials {
    /// Create a `Credentials` struct from username and password
    pub fn new(username: String, password: String) -> Credentials {
        Credentials {
            authentication_identity: username,
            secret: password,
        }
    }
}

impl<S, T> From<(S, T)> for Credentials
where
    S: Into<String>,
    T: Into<String>,
{
    fn from((username, password): (S, T)) -> Self {
        Credentials::new(username.into(), password.into())
    }
}

// Never print the secret, not even in debug logs.
impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("authentication_identity", &self.authentication_identity)
            .finish()
    }
}

/// Represents authentication mechanisms
#[derive(PartialEq, Eq, Copy, Clone, Hash, Debug)]
pub enum Mechanism {
    /// PLAIN authentication mechanism, defined in
    /// [RFC 4616](https://tools.ietf.org/html/rfc4616)
    Plain,
    /// LOGIN authentication mechanism.
    /// Obsolete and never standardized, but still needed by some providers.
    Login,
}

impl Display for Mechanism {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Mechanism::Plain => "PLAIN",
            Mechanism::Login => "LOGIN",
        })
    }
}

impl Mechanism {
    /// Does the mechanism send its response along with the `AUTH` command
    pub fn supports_initial_response(self) -> bool {
        match self {
            Mechanism::Plain => true,
            Mechanism::Login => false,
        }
    }

    /// The initial response sent with `AUTH`, for mechanisms that have one
    pub fn initial_response(self, credentials: &Credentials) -> Option<String> {
        match self {
            Mechanism::Plain => Some(format!(
                "\u{0}{}\u{0}{}",
                credentials.authentication_identity, credentials.secret
            )),
            Mechanism::Login => None,
        }
    }
}

/// Progress of a LOGIN exchange.
///
/// The server must ask for the username first and the password second,
/// using the exact challenge texts `Username:` and `Password:`.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum LoginState {
    AwaitUsername,
    AwaitPassword,
    Done,
}

impl Default for LoginState {
    fn default() -> Self {
        LoginState::AwaitUsername
    }
}

impl LoginState {
    /// Answers a decoded server challenge and moves to the next state.
    pub fn respond<'c>(
        &mut self,
        credentials: &'c Credentials,
        challenge: &str,
    ) -> Result<&'c str, Error> {
        match (*self, challenge) {
            (LoginState::AwaitUsername, LOGIN_USERNAME_CHALLENGE) => {
                *self = LoginState::AwaitPassword;
                Ok(&credentials.authentication_identity)
            }
            (LoginState::AwaitPassword, LOGIN_PASSWORD_CHALLENGE) => {
                *self = LoginState::Done;
                Ok(&credentials.secret)
            }
            _ => Err(Error::Client("unrecognized challenge")),
        }
    }

    /// Checks that the server ended the exchange at the right moment.
    pub fn finish(self) -> Result<(), Error> {
        match self {
            LoginState::Done => Ok(()),
            _ => Err(Error::Client("unrecognized challenge")),
        }
    }
}
