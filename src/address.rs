//! Mailbox parsing and formatting
//!
//! Accepts the usual shapes found in configuration files:
//! `jane@example.com`, `<jane@example.com>`, `Jane Doe <jane@example.com>`
//! and `"Doe, Jane" <jane@example.com>`. Anything else is not an error for
//! the caller: [`bare_or_raw`] and [`formatted_or_raw`] fall back to the
//! input string unchanged.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use log::debug;
use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{anychar, char, multispace0, multispace1, none_of},
    combinator::{all_consuming, map, opt, recognize},
    multi::{fold_many0, separated_list1},
    sequence::{delimited, pair, preceded, separated_pair, terminated},
    IResult,
};

use crate::error::Error;

/// A parsed mailbox: optional display name and the bare address
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Mailbox {
    /// Display name, without quotes
    pub name: Option<String>,
    /// The `local@domain` part
    pub address: String,
}

impl Mailbox {
    pub fn new(name: Option<String>, address: String) -> Mailbox {
        Mailbox { name, address }
    }
}

impl FromStr for Mailbox {
    type Err = Error;

    fn from_str(s: &str) -> Result<Mailbox, Error> {
        match all_consuming(delimited(multispace0, mailbox, multispace0))(s) {
            Ok((_, mailbox)) => Ok(mailbox),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(Error::Parsing(e.code)),
            Err(nom::Err::Incomplete(_)) => Err(Error::ResponseParsing("incomplete mailbox")),
        }
    }
}

impl Display for Mailbox {
    /// Formats the mailbox for a `From`/`To` header.
    ///
    /// Printable ASCII names are quoted, other names are sent as a MIME
    /// encoded-word.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.name {
            None => write!(f, "<{}>", self.address),
            Some(ref name) if name.chars().all(|c| (' '..='~').contains(&c)) => {
                f.write_str("\"")?;
                for c in name.chars() {
                    if c == '"' || c == '\\' {
                        f.write_str("\\")?;
                    }
                    write!(f, "{}", c)?;
                }
                write!(f, "\" <{}>", self.address)
            }
            Some(ref name) => write!(
                f,
                "=?utf-8?B?{}?= <{}>",
                base64::encode(name.as_bytes()),
                self.address
            ),
        }
    }
}

/// Bare `local@domain` of the mailbox, or the input when it does not parse
pub fn bare_or_raw(input: &str) -> String {
    match input.parse::<Mailbox>() {
        Ok(mailbox) => mailbox.address,
        Err(err) => {
            debug!("using {:?} as is for the envelope: {}", input, err);
            input.to_string()
        }
    }
}

/// Header form of the mailbox, or the input when it does not parse
pub fn formatted_or_raw(input: &str) -> String {
    match input.parse::<Mailbox>() {
        Ok(mailbox) => mailbox.to_string(),
        Err(err) => {
            debug!("using {:?} as is for the header: {}", input, err);
            input.to_string()
        }
    }
}

// Parsers

fn is_atext(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-/=?^_`{|}~".contains(c) || !c.is_ascii()
}

fn is_phrase_char(c: char) -> bool {
    !c.is_whitespace() && !c.is_control() && !"<>\"\\()[],;:@".contains(c)
}

fn dot_atom(i: &str) -> IResult<&str, &str> {
    recognize(separated_list1(char('.'), take_while1(is_atext)))(i)
}

fn quoted_content(i: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        fold_many0(
            alt((preceded(char('\\'), anychar), none_of("\\\""))),
            String::new,
            |mut acc, c| {
                acc.push(c);
                acc
            },
        ),
        char('"'),
    )(i)
}

fn domain_literal(i: &str) -> IResult<&str, &str> {
    recognize(delimited(
        char('['),
        take_while(|c: char| c != '[' && c != ']' && !c.is_whitespace()),
        char(']'),
    ))(i)
}

fn addr_spec(i: &str) -> IResult<&str, String> {
    map(
        separated_pair(
            alt((dot_atom, recognize(quoted_content))),
            char('@'),
            alt((dot_atom, domain_literal)),
        ),
        |(local, domain)| format!("{}@{}", local, domain),
    )(i)
}

fn display_name(i: &str) -> IResult<&str, String> {
    alt((
        quoted_content,
        map(
            recognize(separated_list1(multispace1, take_while1(is_phrase_char))),
            String::from,
        ),
    ))(i)
}

fn angle_addr(i: &str) -> IResult<&str, String> {
    delimited(
        char('<'),
        delimited(multispace0, addr_spec, multispace0),
        char('>'),
    )(i)
}

fn name_addr(i: &str) -> IResult<&str, Mailbox> {
    map(
        pair(opt(terminated(display_name, multispace0)), angle_addr),
        |(name, address)| {
            let name = name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty());
            Mailbox::new(name, address)
        },
    )(i)
}

fn mailbox(i: &str) -> IResult<&str, Mailbox> {
    alt((
        name_addr,
        map(addr_spec, |address| Mailbox::new(None, address)),
    ))(i)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_bare_address() {
        assert_eq!(
            "jane@example.com".parse::<Mailbox>().unwrap(),
            Mailbox::new(None, "jane@example.com".to_string())
        );
        assert_eq!(
            "  <jane@example.com> ".parse::<Mailbox>().unwrap(),
            Mailbox::new(None, "jane@example.com".to_string())
        );
        assert_eq!(
            "first.last+tag@sub.example.com"
                .parse::<Mailbox>()
                .unwrap()
                .address,
            "first.last+tag@sub.example.com"
        );
        assert_eq!(
            "root@[127.0.0.1]".parse::<Mailbox>().unwrap().address,
            "root@[127.0.0.1]"
        );
    }

    #[test]
    fn test_parse_named_address() {
        assert_eq!(
            "Jane Doe <jane@example.com>".parse::<Mailbox>().unwrap(),
            Mailbox::new(Some("Jane Doe".to_string()), "jane@example.com".to_string())
        );
        assert_eq!(
            "\"Doe, Jane\" <jane@example.com>".parse::<Mailbox>().unwrap(),
            Mailbox::new(Some("Doe, Jane".to_string()), "jane@example.com".to_string())
        );
        assert_eq!(
            "Jane<jane@example.com>".parse::<Mailbox>().unwrap().name,
            Some("Jane".to_string())
        );
        assert_eq!(
            "\"\" <jane@example.com>".parse::<Mailbox>().unwrap().name,
            None
        );
    }

    #[test]
    fn test_parse_invalid() {
        assert!("".parse::<Mailbox>().is_err());
        assert!("jane".parse::<Mailbox>().is_err());
        assert!("jane@".parse::<Mailbox>().is_err());
        assert!("Jane <jane@example.com".parse::<Mailbox>().is_err());
        assert!("a@b.com, c@d.com".parse::<Mailbox>().is_err());
        assert!("jane..doe@example.com".parse::<Mailbox>().is_err());
    }

    #[test]
    fn test_format() {
        assert_eq!(
            Mailbox::new(None, "jane@example.com".to_string()).to_string(),
            "<jane@example.com>"
        );
        assert_eq!(
            Mailbox::new(Some("Jane Doe".to_string()), "jane@example.com".to_string())
                .to_string(),
            "\"Jane Doe\" <jane@example.com>"
        );
        assert_eq!(
            Mailbox::new(Some("J \"JD\" D".to_string()), "j@example.com".to_string())
                .to_string(),
            "\"J \\\"JD\\\" D\" <j@example.com>"
        );
        assert_eq!(
            Mailbox::new(Some("Zoë".to_string()), "zoe@example.com".to_string()).to_string(),
            "=?utf-8?B?Wm/Dqw==?= <zoe@example.com>"
        );
    }

    #[test]
    fn test_fallbacks() {
        assert_eq!(bare_or_raw("Jane Doe <jane@example.com>"), "jane@example.com");
        assert_eq!(
            formatted_or_raw("Jane Doe <jane@example.com>"),
            "\"Jane Doe\" <jane@example.com>"
        );
        assert_eq!(bare_or_raw("not an address"), "not an address");
        assert_eq!(formatted_or_raw("not an address"), "not an address");
    }
}
