//! SMTP commands

use std::fmt::{self, Display, Formatter};

use crate::authentication::{Credentials, Mechanism};
use crate::extension::ClientId;
use crate::types::EmailAddress;

/// EHLO command
#[derive(PartialEq, Clone, Debug)]
pub struct EhloCommand {
    client_id: ClientId,
}

impl Display for EhloCommand {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "EHLO {}\r\n", self.client_id)
    }
}

impl EhloCommand {
    /// Creates an EHLO command
    pub fn new(client_id: ClientId) -> EhloCommand {
        EhloCommand { client_id }
    }
}

/// HELO command, for servers that reject `EHLO`
#[derive(PartialEq, Clone, Debug)]
pub struct HeloCommand {
    client_id: ClientId,
}

impl Display for HeloCommand {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "HELO {}\r\n", self.client_id)
    }
}

impl HeloCommand {
    /// Creates a HELO command
    pub fn new(client_id: ClientId) -> HeloCommand {
        HeloCommand { client_id }
    }
}

/// STARTTLS command
#[derive(PartialEq, Clone, Debug, Copy)]
pub struct StarttlsCommand;

impl Display for StarttlsCommand {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str("STARTTLS\r\n")
    }
}

/// `BODY` parameter of the MAIL command
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
pub enum MailBodyParameter {
    /// `7BIT`
    SevenBit,
    /// `8BITMIME`
    EightBitMime,
}

impl Display for MailBodyParameter {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match *self {
            MailBodyParameter::SevenBit => f.write_str("BODY=7BIT"),
            MailBodyParameter::EightBitMime => f.write_str("BODY=8BITMIME"),
        }
    }
}

/// MAIL command
#[derive(PartialEq, Clone, Debug)]
pub struct MailCommand {
    sender: Option<EmailAddress>,
    body: Option<MailBodyParameter>,
}

impl Display for MailCommand {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.sender {
            Some(ref sender) => write!(f, "MAIL FROM:<{}>", sender)?,
            None => f.write_str("MAIL FROM:<>")?,
        }
        if let Some(body) = self.body {
            write!(f, " {}", body)?;
        }
        f.write_str("\r\n")
    }
}

impl MailCommand {
    /// Creates a MAIL command, `None` giving the null reverse-path
    pub fn new(sender: Option<EmailAddress>, body: Option<MailBodyParameter>) -> MailCommand {
        MailCommand { sender, body }
    }
}

/// RCPT command
#[derive(PartialEq, Clone, Debug)]
pub struct RcptCommand {
    recipient: EmailAddress,
}

impl Display for RcptCommand {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "RCPT TO:<{}>\r\n", self.recipient)
    }
}

impl RcptCommand {
    /// Creates an RCPT command
    pub fn new(recipient: EmailAddress) -> RcptCommand {
        RcptCommand { recipient }
    }
}

/// DATA command
#[derive(PartialEq, Clone, Debug, Copy)]
pub struct DataCommand;

impl Display for DataCommand {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str("DATA\r\n")
    }
}

/// QUIT command
#[derive(PartialEq, Clone, Debug, Copy)]
pub struct QuitCommand;

impl Display for QuitCommand {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str("QUIT\r\n")
    }
}

/// AUTH command, carrying the initial response when the mechanism has one
#[derive(PartialEq, Clone, Debug)]
pub struct AuthCommand {
    mechanism: Mechanism,
    response: Option<String>,
}

impl Display for AuthCommand {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.response {
            Some(ref response) => write!(
                f,
                "AUTH {} {}\r\n",
                self.mechanism,
                base64::encode(response.as_bytes())
            ),
            None => write!(f, "AUTH {}\r\n", self.mechanism),
        }
    }
}

impl AuthCommand {
    /// Creates an AUTH command
    pub fn new(mechanism: Mechanism, credentials: &Credentials) -> AuthCommand {
        AuthCommand {
            mechanism,
            response: mechanism.initial_response(credentials),
        }
    }
}

/// Answer to a `334` challenge, sent base64 encoded on its own line
#[derive(PartialEq, Clone, Debug)]
pub struct AuthResponseCommand {
    response: String,
}

impl Display for AuthResponseCommand {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}\r\n", base64::encode(self.response.as_bytes()))
    }
}

impl AuthResponseCommand {
    pub fn new(response: &str) -> AuthResponseCommand {
        AuthResponseCommand {
            response: response.to_string(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_display() {
        let id = ClientId::Domain("localhost".to_string());
        let email = EmailAddress::new("test@example.com".to_string()).unwrap();

        assert_eq!(format!("{}", EhloCommand::new(id.clone())), "EHLO localhost\r\n");
        assert_eq!(format!("{}", HeloCommand::new(id)), "HELO localhost\r\n");
        assert_eq!(format!("{}", StarttlsCommand), "STARTTLS\r\n");
        assert_eq!(
            format!("{}", MailCommand::new(Some(email.clone()), None)),
            "MAIL FROM:<test@example.com>\r\n"
        );
        assert_eq!(
            format!("{}", MailCommand::new(None, None)),
            "MAIL FROM:<>\r\n"
        );
        assert_eq!(
            format!(
                "{}",
                MailCommand::new(Some(email.clone()), Some(MailBodyParameter::EightBitMime))
            ),
            "MAIL FROM:<test@example.com> BODY=8BITMIME\r\n"
        );
        assert_eq!(
            format!("{}", RcptCommand::new(email)),
            "RCPT TO:<test@example.com>\r\n"
        );
        assert_eq!(format!("{}", DataCommand), "DATA\r\n");
        assert_eq!(format!("{}", QuitCommand), "QUIT\r\n");
    }

    #[test]
    fn test_auth_display() {
        let credentials = Credentials::new("user".to_string(), "password".to_string());

        assert_eq!(
            format!("{}", AuthCommand::new(Mechanism::Plain, &credentials)),
            "AUTH PLAIN AHVzZXIAcGFzc3dvcmQ=\r\n"
        );
        assert_eq!(
            format!("{}", AuthCommand::new(Mechanism::Login, &credentials)),
            "AUTH LOGIN\r\n"
        );
        assert_eq!(
            format!("{}", AuthResponseCommand::new("alice")),
            "YWxpY2U=\r\n"
        );
    }
}
