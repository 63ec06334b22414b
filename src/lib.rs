//! smtp-tester sends one test e-mail through an SMTP server.
//!
//! The session engine lives in [`send`]: it dials the server, optionally
//! wraps the connection in TLS or upgrades it with `STARTTLS`, authenticates
//! with `PLAIN` or `LOGIN`, sends a single message and quits. The other
//! modules are the protocol pieces it is built from.
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use smtp_tester::config::Config;
//!
//! let config = Config::load("config.yaml").await?;
//! smtp_tester::send(&config.connection, &config.message).await?;
//! # Ok(())
//! # }
//! ```

#![deny(
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    missing_debug_implementations,
    clippy::unwrap_used
)]

pub mod address;
pub mod authentication;
pub mod codec;
pub mod commands;
pub mod config;
pub mod error;
pub mod extension;
pub mod message;
pub mod mock;
pub mod net;
pub mod response;
pub mod send;
mod smtp_client;
pub mod stream;
pub mod tls;
mod types;

pub use crate::config::{Config, ConnectionConfig};
pub use crate::message::Message;
pub use crate::send::{send, send_with, SendError};
pub use crate::smtp_client::{SmtpClient, SmtpTransport, DEFAULT_TIMEOUT};
pub use crate::tls::{ClientTlsParameters, TlsBounds, TlsVersion};
pub use types::*;
