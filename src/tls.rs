//! TLS protocol bounds and connector parameters

use std::fmt;
use std::str::FromStr;

use async_native_tls::TlsConnector;
use log::warn;
use native_tls::Protocol;

use crate::error::Error;

/// A TLS (or SSL) protocol version, ordered from oldest to newest
#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Debug)]
pub enum TlsVersion {
    Ssl3,
    Tls10,
    Tls11,
    Tls12,
    Tls13,
}

impl FromStr for TlsVersion {
    type Err = Error;

    /// Accepts `SSL`, `1.0`, `1.1`, `1.2`, `1.3`, and the same names
    /// spelled `SSL3`, `TLS1.0` ... `TLS1.3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SSL" | "SSL3" => Ok(TlsVersion::Ssl3),
            "1.0" | "TLS1.0" => Ok(TlsVersion::Tls10),
            "1.1" | "TLS1.1" => Ok(TlsVersion::Tls11),
            "1.2" | "TLS1.2" => Ok(TlsVersion::Tls12),
            "1.3" | "TLS1.3" => Ok(TlsVersion::Tls13),
            _ => Err(Error::config(format!("unknown TLS version: {}", s))),
        }
    }
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            TlsVersion::Ssl3 => "SSL3",
            TlsVersion::Tls10 => "TLS1.0",
            TlsVersion::Tls11 => "TLS1.1",
            TlsVersion::Tls12 => "TLS1.2",
            TlsVersion::Tls13 => "TLS1.3",
        })
    }
}

impl TlsVersion {
    /// The matching protocol of the TLS backend
    pub fn protocol(self) -> Protocol {
        match self {
            TlsVersion::Ssl3 => Protocol::Sslv3,
            TlsVersion::Tls10 => Protocol::Tlsv10,
            TlsVersion::Tls11 => Protocol::Tlsv11,
            TlsVersion::Tls12 => Protocol::Tlsv12,
            TlsVersion::Tls13 => Protocol::Tlsv13,
        }
    }
}

/// Resolved `(min, max)` protocol bounds
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct TlsBounds {
    pub min: TlsVersion,
    pub max: TlsVersion,
}

impl TlsBounds {
    /// Parses both tokens and checks that `min <= max`.
    pub fn resolve(min: &str, max: &str) -> Result<TlsBounds, Error> {
        let min = min
            .parse::<TlsVersion>()
            .map_err(|e| Error::config(format!("TLS minimum: {}", e)))?;
        let max = max
            .parse::<TlsVersion>()
            .map_err(|e| Error::config(format!("TLS maximum: {}", e)))?;
        if min > max {
            return Err(Error::config(format!(
                "TLS minimum version {} is newer than maximum version {}",
                min, max
            )));
        }
        Ok(TlsBounds { min, max })
    }
}

/// Parameters to use for secure clients
pub struct ClientTlsParameters {
    /// A connector from `native-tls`
    pub connector: TlsConnector,
    /// The domain to send during the TLS handshake and to verify the
    /// certificate against
    pub domain: String,
}

impl fmt::Debug for ClientTlsParameters {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("ClientTlsParameters")
            .field("connector", &"TlsConnector")
            .field("domain", &self.domain)
            .finish()
    }
}

impl ClientTlsParameters {
    /// Creates a `ClientTlsParameters`
    pub fn new(domain: String, connector: TlsConnector) -> ClientTlsParameters {
        ClientTlsParameters { connector, domain }
    }

    /// Builds the connector for `domain` with the given protocol bounds.
    ///
    /// With `validate` unset, neither the certificate chain nor the host
    /// name is checked.
    pub fn with_bounds(
        domain: String,
        bounds: TlsBounds,
        validate: bool,
    ) -> ClientTlsParameters {
        if !validate {
            warn!(
                "certificate validation disabled for {}, the connection is not authenticated",
                domain
            );
        }
        let connector = TlsConnector::new()
            .min_protocol_version(Some(bounds.min.protocol()))
            .max_protocol_version(Some(bounds.max.protocol()))
            .danger_accept_invalid_certs(!validate)
            .danger_accept_invalid_hostnames(!validate);
        ClientTlsParameters::new(domain, connector)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_resolve_tokens() {
        assert_eq!("SSL".parse::<TlsVersion>().unwrap(), TlsVersion::Ssl3);
        assert_eq!("1.0".parse::<TlsVersion>().unwrap(), TlsVersion::Tls10);
        assert_eq!("1.1".parse::<TlsVersion>().unwrap(), TlsVersion::Tls11);
        assert_eq!("1.2".parse::<TlsVersion>().unwrap(), TlsVersion::Tls12);
        assert_eq!("1.3".parse::<TlsVersion>().unwrap(), TlsVersion::Tls13);
        assert_eq!("TLS1.2".parse::<TlsVersion>().unwrap(), TlsVersion::Tls12);
        assert_eq!("SSL3".parse::<TlsVersion>().unwrap(), TlsVersion::Ssl3);
    }

    #[test]
    fn test_resolve_unknown_tokens() {
        for token in &["", "1.4", "tls1.2", "TLSv1.2", " 1.2", "SSL2", "1"] {
            match token.parse::<TlsVersion>() {
                Err(Error::Config(msg)) => assert!(msg.contains("unknown TLS version")),
                other => panic!("{:?} should be rejected, got {:?}", token, other),
            }
        }
    }

    #[test]
    fn test_ordering() {
        assert!(TlsVersion::Ssl3 < TlsVersion::Tls10);
        assert!(TlsVersion::Tls10 < TlsVersion::Tls11);
        assert!(TlsVersion::Tls11 < TlsVersion::Tls12);
        assert!(TlsVersion::Tls12 < TlsVersion::Tls13);
    }

    #[test]
    fn test_bounds() {
        assert_eq!(
            TlsBounds::resolve("1.2", "1.3").unwrap(),
            TlsBounds {
                min: TlsVersion::Tls12,
                max: TlsVersion::Tls13
            }
        );
        assert!(TlsBounds::resolve("1.2", "1.2").is_ok());
        assert!(matches!(
            TlsBounds::resolve("1.3", "1.2"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            TlsBounds::resolve("1.2", "bogus"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_backend_mapping() {
        assert!(matches!(TlsVersion::Tls13.protocol(), Protocol::Tlsv13));
        assert!(matches!(TlsVersion::Tls12.protocol(), Protocol::Tlsv12));
        assert!(matches!(TlsVersion::Ssl3.protocol(), Protocol::Sslv3));
    }

    #[test]
    fn test_tls13_only_bounds() {
        let bounds = TlsBounds::resolve("1.3", "1.3").unwrap();
        let params = ClientTlsParameters::with_bounds("mx.example.com".to_string(), bounds, true);
        assert_eq!(params.domain, "mx.example.com");
    }
}
