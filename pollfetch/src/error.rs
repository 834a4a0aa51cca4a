use std::io;

use mio::Token;
use protocol_http::ParseError;
use thiserror::Error;

/// Errors returned by the reactor itself.
///
/// Per-fetch failures never show up here; they are delivered as a
/// [`FetchError`] in the fetch's [`Completion`](crate::Completion).
#[derive(Debug, Error)]
pub enum Error {
    /// Selector setup or wait failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// A configuration value is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Registration table contract violations.
///
/// These indicate a logic defect in the caller, not an environmental
/// condition.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The handle already has an interest registered.
    #[error("handle {0:?} is already registered")]
    DuplicateRegistration(Token),
    /// The handle has no interest registered.
    #[error("handle {0:?} is not registered")]
    NotRegistered(Token),
    /// The selector refused the (de)registration.
    #[error("selector: {0}")]
    Io(#[from] io::Error),
}

/// Terminal failure of a single fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL could not be turned into a target.
    #[error("invalid url: {0}")]
    InvalidUrl(ParseError),
    /// Resolution, socket setup, or the non-blocking connect failed.
    #[error("connect failed: {0}")]
    ConnectFailure(io::Error),
    /// Send or receive failed after the connection was established.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The response is not valid text or has no header/body delimiter.
    #[error("decode error: {0}")]
    Decode(ParseError),
    /// The response grew past `max_response_size`.
    #[error("response exceeds {0} bytes")]
    ResponseTooLarge(usize),
    /// `max_connections` fetches are already in flight.
    #[error("connection limit reached")]
    ConnectionLimitReached,
    /// Registering or unregistering interest failed.
    #[error("registration: {0}")]
    Registry(#[from] RegistryError),
}

impl FetchError {
    /// Returns true if the fetch failed before the connection was
    /// established.
    pub fn is_connect_failure(&self) -> bool {
        matches!(self, FetchError::ConnectFailure(_))
    }
}
