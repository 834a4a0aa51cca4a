//! URL → request target.

use crate::error::ParseError;

/// Port used when the URL authority does not name one.
pub const DEFAULT_PORT: u16 = 80;

/// Where a fetch connects and what it asks for.
///
/// Only the authority and path of a URL matter. The scheme is ignored
/// (no TLS) and the fragment is dropped. The query string stays part of
/// the request target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    authority: String,
    host: String,
    port: u16,
    path: String,
}

impl Target {
    /// Parse a URL, defaulting the port to [`DEFAULT_PORT`].
    pub fn parse(url: &str) -> Result<Self, ParseError> {
        Self::parse_with_port(url, DEFAULT_PORT)
    }

    /// Parse a URL, using `default_port` when the authority has none.
    pub fn parse_with_port(url: &str, default_port: u16) -> Result<Self, ParseError> {
        // Tabs and line breaks are dropped wherever they appear.
        let url: String = url
            .trim()
            .chars()
            .filter(|c| !matches!(c, '\t' | '\r' | '\n'))
            .collect();
        let (_scheme, rest) = url
            .split_once("://")
            .ok_or(ParseError::InvalidUrl("missing scheme"))?;

        let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let (authority, tail) = rest.split_at(authority_end);

        // Userinfo never reaches the wire.
        let authority = authority
            .rsplit_once('@')
            .map_or(authority, |(_, host)| host);
        if authority.is_empty() {
            return Err(ParseError::InvalidUrl("missing host"));
        }
        let tail = tail.split_once('#').map_or(tail, |(before, _)| before);
        if has_unsafe_byte(authority) || has_unsafe_byte(tail) {
            return Err(ParseError::InvalidUrl("control character or space"));
        }

        let (host, port) = split_host_port(authority, default_port)?;

        let path = if tail.is_empty() {
            "/".to_string()
        } else if tail.starts_with('?') {
            format!("/{tail}")
        } else {
            tail.to_string()
        };

        Ok(Target {
            authority: authority.to_string(),
            host: host.to_string(),
            port,
            path,
        })
    }

    /// Host name or address literal, without brackets or port.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port to connect to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Request target: path plus query, never empty.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Authority as written in the URL (sent as the `Host` header).
    pub fn authority(&self) -> &str {
        &self.authority
    }
}

fn split_host_port(authority: &str, default_port: u16) -> Result<(&str, u16), ParseError> {
    if let Some(bracketed) = authority.strip_prefix('[') {
        let (host, after) = bracketed
            .split_once(']')
            .ok_or(ParseError::InvalidUrl("unterminated ipv6 literal"))?;
        if host.is_empty() {
            return Err(ParseError::InvalidUrl("missing host"));
        }
        let port = match after {
            "" => default_port,
            _ => match after.strip_prefix(':') {
                Some(port) => parse_port(port, default_port)?,
                None => return Err(ParseError::InvalidUrl("junk after ipv6 literal")),
            },
        };
        return Ok((host, port));
    }

    match authority.split_once(':') {
        Some((host, port)) => {
            if host.is_empty() {
                return Err(ParseError::InvalidUrl("missing host"));
            }
            Ok((host, parse_port(port, default_port)?))
        }
        None => Ok((authority, default_port)),
    }
}

/// Bytes that would break the request line or a header line.
fn has_unsafe_byte(s: &str) -> bool {
    s.bytes().any(|b| b.is_ascii_control() || b == b' ')
}

fn parse_port(port: &str, default_port: u16) -> Result<u16, ParseError> {
    if port.is_empty() {
        return Ok(default_port);
    }
    if !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidPort);
    }
    port.parse().map_err(|_| ParseError::InvalidPort)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pathless_url_defaults_to_root() {
        let target = Target::parse("http://example.test").unwrap();
        assert_eq!(target.host(), "example.test");
        assert_eq!(target.port(), 80);
        assert_eq!(target.path(), "/");
        assert_eq!(target.authority(), "example.test");
    }

    #[test]
    fn path_is_kept() {
        let target = Target::parse("http://example.test/a/b.html").unwrap();
        assert_eq!(target.path(), "/a/b.html");
    }

    #[test]
    fn explicit_port() {
        let target = Target::parse("http://127.0.0.1:8080/x").unwrap();
        assert_eq!(target.host(), "127.0.0.1");
        assert_eq!(target.port(), 8080);
        assert_eq!(target.authority(), "127.0.0.1:8080");
        assert_eq!(target.path(), "/x");
    }

    #[test]
    fn empty_port_uses_default() {
        let target = Target::parse_with_port("http://example.test:/", 8000).unwrap();
        assert_eq!(target.port(), 8000);
    }

    #[test]
    fn query_kept_fragment_dropped() {
        let target = Target::parse("http://example.test/search?q=rust#top").unwrap();
        assert_eq!(target.path(), "/search?q=rust");

        let target = Target::parse("http://example.test?q=1").unwrap();
        assert_eq!(target.path(), "/?q=1");

        let target = Target::parse("http://example.test#frag").unwrap();
        assert_eq!(target.path(), "/");

        let target = Target::parse("http://example.test/x#a fragment").unwrap();
        assert_eq!(target.path(), "/x");
    }

    #[test]
    fn scheme_is_ignored() {
        let target = Target::parse("https://example.test/").unwrap();
        assert_eq!(target.port(), 80);
    }

    #[test]
    fn ipv6_literal() {
        let target = Target::parse("http://[::1]:9000/").unwrap();
        assert_eq!(target.host(), "::1");
        assert_eq!(target.port(), 9000);
        assert_eq!(target.authority(), "[::1]:9000");

        let target = Target::parse("http://[::1]/").unwrap();
        assert_eq!(target.port(), 80);
    }

    #[test]
    fn userinfo_is_stripped() {
        let target = Target::parse("http://user:pw@example.test/").unwrap();
        assert_eq!(target.host(), "example.test");
        assert_eq!(target.authority(), "example.test");
    }

    #[test]
    fn rejects_missing_scheme() {
        assert_eq!(
            Target::parse("example.test/"),
            Err(ParseError::InvalidUrl("missing scheme"))
        );
    }

    #[test]
    fn rejects_missing_host() {
        assert_eq!(
            Target::parse("http:///path"),
            Err(ParseError::InvalidUrl("missing host"))
        );
        assert_eq!(
            Target::parse("http://:80/"),
            Err(ParseError::InvalidUrl("missing host"))
        );
    }

    #[test]
    fn line_breaks_and_tabs_are_removed() {
        // Joined back together the smuggled request still has spaces in it.
        let err = Target::parse("http://example.test/a\r\nX-Injected: 1\r\n\r\nGET /b")
            .unwrap_err();
        assert_eq!(err, ParseError::InvalidUrl("control character or space"));

        let target = Target::parse("http://example.test/a\r\n/b\t/c").unwrap();
        assert_eq!(target.path(), "/a/b/c");

        let target = Target::parse("http://exam\nple.test:8\t0/").unwrap();
        assert_eq!(target.authority(), "example.test:80");
        assert_eq!(target.port(), 80);
    }

    #[test]
    fn rejects_control_characters_and_spaces() {
        let unsafe_urls = [
            "http://example.test/a b",
            "http://exa mple.test/",
            "http://example.test/\x00",
            "http://example.test/?q=\x7f",
        ];
        for url in unsafe_urls {
            assert_eq!(
                Target::parse(url),
                Err(ParseError::InvalidUrl("control character or space")),
                "{url:?}"
            );
        }
    }

    #[test]
    fn rejects_bad_port() {
        assert_eq!(
            Target::parse("http://example.test:http/"),
            Err(ParseError::InvalidPort)
        );
        assert_eq!(
            Target::parse("http://example.test:70000/"),
            Err(ParseError::InvalidPort)
        );
        assert_eq!(
            Target::parse("http://example.test:+80/"),
            Err(ParseError::InvalidPort)
        );
    }
}
