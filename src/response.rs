//! SMTP reply parsing: a three digit code and one or more lines of text

use std::fmt::{Display, Formatter, Result};
use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::streaming::{tag, take_until},
    combinator::{complete, map, opt},
    multi::many0,
    sequence::{preceded, tuple},
    IResult,
};

use crate::error::Error;

/// First digit of a reply code
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Severity {
    /// 2yz
    PositiveCompletion = 2,
    /// 3yz
    PositiveIntermediate = 3,
    /// 4yz
    TransientNegativeCompletion = 4,
    /// 5yz
    PermanentNegativeCompletion = 5,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", *self as u8)
    }
}

/// A three digit reply code.
///
/// Only the severity is interpreted; the remaining two digits are kept
/// verbatim so that codes like `334` or `235` can be compared exactly.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct Code {
    /// First digit of the reply code
    pub severity: Severity,
    /// Second and third digits
    pub rest: u8,
}

impl Display for Code {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}{:02}", self.severity, self.rest)
    }
}

impl Code {
    /// Tells if the code is a positive (2yz or 3yz) one
    pub fn is_positive(self) -> bool {
        matches!(
            self.severity,
            Severity::PositiveCompletion | Severity::PositiveIntermediate
        )
    }
}

impl From<Code> for u16 {
    fn from(code: Code) -> Self {
        100 * code.severity as u16 + code.rest as u16
    }
}

/// A server reply, possibly spanning several lines
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Response {
    /// Reply code
    pub code: Code,
    /// Text of every line, without the code and separator
    pub message: Vec<String>,
}

impl FromStr for Response {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Response, Error> {
        match parse_response(s) {
            Ok((_, response)) => Ok(response),
            Err(nom::Err::Incomplete(_)) => Err(Error::ResponseParsing("incomplete reply")),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(Error::Parsing(e.code)),
        }
    }
}

impl Response {
    pub fn new(code: Code, message: Vec<String>) -> Response {
        Response { code, message }
    }

    /// Tells if the reply is positive
    pub fn is_positive(&self) -> bool {
        self.code.is_positive()
    }

    /// Tests code equality
    pub fn has_code(&self, code: u16) -> bool {
        u16::from(self.code) == code
    }

    /// First word of the first line, if any
    pub fn first_word(&self) -> Option<&str> {
        self.message
            .first()
            .and_then(|line| line.split_whitespace().next())
    }

    /// First line of the reply text, if any
    pub fn first_line(&self) -> Option<&str> {
        self.message.first().map(String::as_str)
    }
}

fn parse_code(i: &str) -> IResult<&str, Code> {
    let (i, severity) = parse_severity(i)?;
    let (i, tens) = parse_digit(i)?;
    let (i, units) = parse_digit(i)?;
    Ok((
        i,
        Code {
            severity,
            rest: tens * 10 + units,
        },
    ))
}

fn parse_severity(i: &str) -> IResult<&str, Severity> {
    alt((
        map(tag("2"), |_| Severity::PositiveCompletion),
        map(tag("3"), |_| Severity::PositiveIntermediate),
        map(tag("4"), |_| Severity::TransientNegativeCompletion),
        map(tag("5"), |_| Severity::PermanentNegativeCompletion),
    ))(i)
}

fn parse_digit(i: &str) -> IResult<&str, u8> {
    alt((
        map(tag("0"), |_| 0),
        map(tag("1"), |_| 1),
        map(tag("2"), |_| 2),
        map(tag("3"), |_| 3),
        map(tag("4"), |_| 4),
        map(tag("5"), |_| 5),
        map(tag("6"), |_| 6),
        map(tag("7"), |_| 7),
        map(tag("8"), |_| 8),
        map(tag("9"), |_| 9),
    ))(i)
}

/// Last line of a reply: `<code> <text>` or the bare `<code>`
fn parse_last_line(i: &str) -> IResult<&str, (Code, &str)> {
    let (i, code) = parse_code(i)?;
    let (i, text) = opt(preceded(tag(" "), take_until("\r\n")))(i)?;
    let (i, _) = complete(tag("\r\n"))(i)?;
    Ok((i, (code, text.unwrap_or(""))))
}

pub(crate) fn parse_response(i: &str) -> IResult<&str, Response> {
    let (i, lines) = many0(tuple((
        parse_code,
        preceded(tag("-"), take_until("\r\n")),
        tag("\r\n"),
    )))(i)?;
    let (i, (last_code, last_line)) = parse_last_line(i)?;

    // Every line of a multiline reply carries the same code
    if !lines.iter().all(|&(code, _, _)| code == last_code) {
        return Err(nom::Err::Failure(nom::error::Error::new(
            "",
            nom::error::ErrorKind::Not,
        )));
    }

    let mut lines: Vec<String> = lines.into_iter().map(|(_, text, _)| text.into()).collect();
    lines.push(last_line.into());

    Ok((
        i,
        Response {
            code: last_code,
            message: lines,
        },
    ))
}
