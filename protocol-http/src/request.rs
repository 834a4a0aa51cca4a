use bytes::Bytes;

use crate::url::Target;

/// A one-shot HTTP/1.1 `GET` request.
///
/// The request always carries `Connection:close` so the server marks the end
/// of the response by shutting the connection down. No other headers and no
/// body are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request<'a> {
    path: &'a str,
    host: &'a str,
}

impl<'a> Request<'a> {
    /// Create a GET request for the given target.
    pub fn get(target: &'a Target) -> Self {
        Self {
            path: target.path(),
            host: target.authority(),
        }
    }

    /// Number of bytes [`encode`](Self::encode) produces.
    pub fn encoded_len(&self) -> usize {
        b"GET ".len()
            + self.path.len()
            + b" HTTP/1.1\r\nHost:".len()
            + self.host.len()
            + b"\r\nConnection:close\r\n\r\n".len()
    }

    /// Encode into a buffer. Returns the number of bytes written.
    ///
    /// # Panics
    ///
    /// Panics if `buf` is shorter than [`encoded_len`](Self::encoded_len).
    pub fn encode_into(&self, buf: &mut [u8]) -> usize {
        let mut pos = 0;
        for part in [
            b"GET ".as_slice(),
            self.path.as_bytes(),
            b" HTTP/1.1\r\nHost:",
            self.host.as_bytes(),
            b"\r\nConnection:close\r\n\r\n",
        ] {
            buf[pos..pos + part.len()].copy_from_slice(part);
            pos += part.len();
        }
        pos
    }

    /// Encode into an owned buffer.
    pub fn encode(&self) -> Bytes {
        let mut req = vec![0u8; self.encoded_len()];
        let len = self.encode_into(&mut req);
        debug_assert_eq!(len, req.len());
        Bytes::from(req)
    }
}
