use crate::error::ParseError;

/// Blank line separating the response head from the body.
pub const HEADER_DELIMITER: &[u8] = b"\r\n\r\n";

/// An HTTP response read until connection close.
///
/// The body is everything after the first blank line, untouched: no
/// `Content-Length` truncation and no chunked decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    head: String,
    status: Option<u16>,
    headers: Vec<(String, String)>,
    body: String,
}

impl Response {
    /// Decode `data` as UTF-8 and split it once on the first blank line.
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(data).map_err(|_| ParseError::InvalidUtf8)?;
        let end = find_header_end(text.as_bytes()).ok_or(ParseError::MissingDelimiter)?;

        let head = &text[..end];
        let body = &text[end + HEADER_DELIMITER.len()..];
        let (status, headers) = parse_head(head);

        Ok(Response {
            head: head.to_string(),
            status,
            headers,
            body: body.to_string(),
        })
    }

    /// Status code, if the status line is well formed.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Response headers as (name, value) pairs.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Get the first header value matching `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Raw head text: status line and headers, without the delimiter.
    pub fn head(&self) -> &str {
        &self.head
    }

    /// Body text.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Consume the response and return the body.
    pub fn into_body(self) -> String {
        self.body
    }
}

/// Find the position of `\r\n\r\n` in data, returns index of the first `\r`.
pub fn find_header_end(data: &[u8]) -> Option<usize> {
    data.windows(HEADER_DELIMITER.len())
        .position(|w| w == HEADER_DELIMITER)
}

/// Lenient head parse. A malformed status line or header line is skipped,
/// never an error: only the delimiter decides whether a response decodes.
fn parse_head(head: &str) -> (Option<u16>, Vec<(String, String)>) {
    let mut lines = head.split("\r\n");

    // Status line: HTTP/1.1 200 OK
    let status = lines.next().and_then(|line| {
        let mut parts = line.splitn(3, ' ');
        let version = parts.next()?;
        if !version.starts_with("HTTP/") {
            return None;
        }
        parts.next()?.parse().ok()
    });

    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect();

    (status, headers)
}
