use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::error::Error;

/// Address used in the SMTP envelope (`MAIL FROM` / `RCPT TO`)
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn new(address: String) -> Result<EmailAddress, Error> {
        // Only refuse what would break the command line itself. Actual
        // address validation is left to the server.
        if address.is_empty() {
            return Err(Error::Client("empty email address"));
        }
        if address.chars().any(char::is_control) {
            return Err(Error::Client("control characters in email address"));
        }

        Ok(EmailAddress(address))
    }
}

impl FromStr for EmailAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EmailAddress::new(s.to_string())
    }
}

impl Display for EmailAddress {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Envelope of a single message: one sender, one recipient
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Envelope {
    /// The envelope recipient address
    forward_path: EmailAddress,
    /// The envelope sender address, `None` for the null reverse-path
    reverse_path: Option<EmailAddress>,
}

impl Envelope {
    pub fn new(from: Option<EmailAddress>, to: EmailAddress) -> Envelope {
        Envelope {
            forward_path: to,
            reverse_path: from,
        }
    }

    /// Destination address of the envelope
    pub fn to(&self) -> &EmailAddress {
        &self.forward_path
    }

    /// Source address of the envelope
    pub fn from(&self) -> Option<&EmailAddress> {
        self.reverse_path.as_ref()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_email_address() {
        assert!(EmailAddress::new("foobar@example.org".to_string()).is_ok());
        assert!(EmailAddress::new("foobar@localhost".to_string()).is_ok());
        assert!(EmailAddress::new("not an address".to_string()).is_ok());
        assert!(EmailAddress::new("".to_string()).is_err());
        assert!(EmailAddress::new("foo\rbar@localhost".to_string()).is_err());
        assert!(EmailAddress::new("foobar@exa\r\nmple.org".to_string()).is_err());
        assert!(EmailAddress::new("foo\tbar@example.org".to_string()).is_err());
    }

    #[test]
    fn test_envelope() {
        let envelope = Envelope::new(
            Some("from@example.org".parse().unwrap()),
            "to@example.org".parse().unwrap(),
        );
        assert_eq!(
            envelope.from().map(ToString::to_string),
            Some("from@example.org".to_string())
        );
        assert_eq!(envelope.to().as_ref(), "to@example.org");

        let bounce = Envelope::new(None, "to@example.org".parse().unwrap());
        assert!(bounce.from().is_none());
    }
}
