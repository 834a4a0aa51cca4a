//! Sans-IO HTTP/1.1 pieces for one-shot `GET` fetches.
//!
//! This crate does no socket I/O. It turns a URL into a [`Target`], encodes
//! the request bytes a client writes for that target, and splits the raw
//! bytes a server sends back (up to connection close) into head and body.
//!
//! # Example
//!
//! ```
//! use protocol_http::{Request, Response, Target};
//!
//! let target = Target::parse("http://example.test").unwrap();
//! assert_eq!(target.path(), "/");
//!
//! let request = Request::get(&target).encode();
//! assert_eq!(
//!     &request[..],
//!     b"GET / HTTP/1.1\r\nHost:example.test\r\nConnection:close\r\n\r\n"
//! );
//!
//! let response = Response::parse(b"HTTP/1.1 200 OK\r\nServer: x\r\n\r\nhello").unwrap();
//! assert_eq!(response.status(), Some(200));
//! assert_eq!(response.body(), "hello");
//! ```
//!
//! Responses are framed by connection close only: there is no
//! `Content-Length` or chunked transfer decoding.

mod error;
mod request;
mod response;
mod url;

pub use error::ParseError;
pub use request::Request;
pub use response::{HEADER_DELIMITER, Response, find_header_end};
pub use url::{DEFAULT_PORT, Target};
