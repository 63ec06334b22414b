//! The message record and its MIME rendering

use serde::Deserialize;

use crate::address::{bare_or_raw, formatted_or_raw};
use crate::error::Error;
use crate::types::{EmailAddress, Envelope};

/// A single plain text message to a single recipient
#[derive(PartialEq, Eq, Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Message {
    /// Envelope built from the bare addresses, falling back to the raw
    /// strings when they cannot be parsed.
    ///
    /// An empty sender is the null reverse-path `<>`.
    pub fn envelope(&self) -> Result<Envelope, Error> {
        let from = bare_or_raw(&self.from);
        let from = if from.is_empty() {
            None
        } else {
            Some(EmailAddress::new(from)?)
        };
        Ok(Envelope::new(from, EmailAddress::new(bare_or_raw(&self.to))?))
    }

    /// Ordered header fields of the rendered message
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("From", formatted_or_raw(&self.from)),
            ("To", formatted_or_raw(&self.to)),
            ("Subject", encode_word(&self.subject)),
            ("MIME-Version", "1.0".to_string()),
            ("Content-Type", "text/plain; charset=\"utf-8\"".to_string()),
            ("Content-Transfer-Encoding", "base64".to_string()),
        ]
    }

    /// Renders headers, a blank line and the base64 body.
    ///
    /// The body is a single base64 line with no trailing line break.
    pub fn compose(&self) -> String {
        let mut formatted = String::new();
        for (name, value) in self.headers() {
            formatted.push_str(name);
            formatted.push_str(": ");
            formatted.push_str(&value);
            formatted.push_str("\r\n");
        }
        formatted.push_str("\r\n");
        formatted.push_str(&base64::encode(self.body.as_bytes()));
        formatted
    }
}

/// MIME encoded-word using the base64 ("B") encoding
fn encode_word(text: &str) -> String {
    format!("=?utf-8?B?{}?=", base64::encode(text.as_bytes()))
}
