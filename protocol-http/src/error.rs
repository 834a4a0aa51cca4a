//! Error types for URL and response parsing.

/// Error type for HTTP parsing operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The URL could not be split into an authority and a path.
    #[error("invalid url: {0}")]
    InvalidUrl(&'static str),

    /// The port in the URL authority is not a valid `u16`.
    #[error("invalid port")]
    InvalidPort,

    /// Response bytes are not valid UTF-8.
    #[error("response is not valid utf-8")]
    InvalidUtf8,

    /// No blank line separates the response head from the body.
    #[error("missing header delimiter")]
    MissingDelimiter,
}

impl ParseError {
    /// Returns true if the error came from decoding response bytes rather
    /// than from the URL.
    #[inline]
    pub fn is_decode(&self) -> bool {
        matches!(self, ParseError::InvalidUtf8 | ParseError::MissingDelimiter)
    }
}
