//! ESMTP features and the client identity sent with `EHLO`

use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};
use std::net::Ipv4Addr;

use log::debug;

use crate::authentication::Mechanism;
use crate::error::Error;
use crate::response::Response;

/// Client identifier, the parameter to `EHLO`
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum ClientId {
    /// A fully-qualified domain name
    Domain(String),
    /// An IPv4 address
    Ipv4(Ipv4Addr),
}

const LOCALHOST_CLIENT: ClientId = ClientId::Ipv4(Ipv4Addr::new(127, 0, 0, 1));

impl Default for ClientId {
    /// The local hostname, or the `[127.0.0.1]` address literal when it
    /// cannot be determined.
    fn default() -> Self {
        match hostname::get().map(|name| name.into_string()) {
            Ok(Ok(name)) if !name.is_empty() => ClientId::Domain(name),
            other => {
                debug!("local hostname unavailable ({:?}), using address literal", other);
                LOCALHOST_CLIENT
            }
        }
    }
}

impl Display for ClientId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            ClientId::Domain(ref value) => f.write_str(value),
            ClientId::Ipv4(ref value) => write!(f, "[{}]", value),
        }
    }
}

/// Supported ESMTP keywords
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum Extension {
    /// 8BITMIME keyword
    ///
    /// Defined in [RFC 6152](https://tools.ietf.org/html/rfc6152)
    EightBitMime,
    /// STARTTLS keyword
    ///
    /// Defined in [RFC 2487](https://tools.ietf.org/html/rfc2487)
    StartTls,
    /// AUTH mechanism
    Authentication(Mechanism),
}

impl Display for Extension {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            Extension::EightBitMime => f.write_str("8BITMIME"),
            Extension::StartTls => f.write_str("STARTTLS"),
            Extension::Authentication(ref mechanism) => write!(f, "AUTH {}", mechanism),
        }
    }
}

/// Contains information about an SMTP server
#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub struct ServerInfo {
    /// Server name, as given in the `EHLO`/`HELO` reply
    pub name: String,
    /// ESMTP features supported by the server and known by this crate
    pub features: HashSet<Extension>,
}

impl Display for ServerInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let features = if self.features.is_empty() {
            "no supported features".to_string()
        } else {
            format!("{:?}", self.features)
        };
        write!(f, "{} with {}", self.name, features)
    }
}

impl ServerInfo {
    /// Parses an `EHLO` response to create a `ServerInfo`
    pub fn from_response(response: &Response) -> Result<ServerInfo, Error> {
        let name = match response.first_word() {
            Some(name) => name,
            None => return Err(Error::ResponseParsing("Could not read server name")),
        };

        let mut features: HashSet<Extension> = HashSet::new();

        for line in response.message.iter().skip(1) {
            let mut split = line.split_whitespace();
            match split.next().map(str::to_ascii_uppercase).as_deref() {
                Some("8BITMIME") => {
                    features.insert(Extension::EightBitMime);
                }
                Some("STARTTLS") => {
                    features.insert(Extension::StartTls);
                }
                Some("AUTH") => {
                    for mechanism in split {
                        match mechanism.to_ascii_uppercase().as_str() {
                            "PLAIN" => {
                                features.insert(Extension::Authentication(Mechanism::Plain));
                            }
                            "LOGIN" => {
                                features.insert(Extension::Authentication(Mechanism::Login));
                            }
                            _ => (),
                        }
                    }
                }
                _ => (),
            };
        }

        Ok(ServerInfo {
            name: name.to_string(),
            features,
        })
    }

    /// Checks if the server supports an ESMTP feature
    pub fn supports_feature(&self, keyword: Extension) -> bool {
        self.features.contains(&keyword)
    }

    /// Checks if the server advertises an authentication mechanism
    pub fn supports_auth_mechanism(&self, mechanism: Mechanism) -> bool {
        self.features
            .contains(&Extension::Authentication(mechanism))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clientid_fmt() {
        assert_eq!(
            format!("{}", ClientId::Domain("test".to_string())),
            "test".to_string()
        );
        assert_eq!(format!("{}", LOCALHOST_CLIENT), "[127.0.0.1]".to_string());
    }

    #[test]
    fn test_clientid_default_is_never_empty() {
        assert!(!ClientId::default().to_string().is_empty());
    }

    #[test]
    fn test_extension_fmt() {
        assert_eq!(format!("{}", Extension::EightBitMime), "8BITMIME");
        assert_eq!(
            format!("{}", Extension::Authentication(Mechanism::Login)),
            "AUTH LOGIN"
        );
    }

    #[test]
    fn test_serverinfo() {
        let response: Response =
            "250-me\r\n250-8BITMIME\r\n250-SIZE 42\r\n250-STARTTLS\r\n250 AUTH PLAIN CRAM-MD5\r\n"
                .parse()
                .unwrap();

        let server_info = ServerInfo::from_response(&response).unwrap();

        assert_eq!(server_info.name, "me");
        assert!(server_info.supports_feature(Extension::EightBitMime));
        assert!(server_info.supports_feature(Extension::StartTls));
        assert!(server_info.supports_auth_mechanism(Mechanism::Plain));
        assert!(!server_info.supports_auth_mechanism(Mechanism::Login));
    }

    #[test]
    fn test_serverinfo_without_extensions() {
        let response: Response = "250 me greets you\r\n".parse().unwrap();

        let server_info = ServerInfo::from_response(&response).unwrap();

        assert_eq!(server_info.name, "me");
        assert!(server_info.features.is_empty());
        assert_eq!(server_info.to_string(), "me with no supported features");
    }
}
