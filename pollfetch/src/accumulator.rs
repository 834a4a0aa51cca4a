use bytes::{Bytes, BytesMut};

/// Per-connection response accumulator.
///
/// Append-only until the connection closes: nothing is consumed from the
/// front, the whole buffer is handed over once with [`take`](Self::take).
pub struct RecvAccumulator {
    buf: BytesMut,
    limit: usize,
}

/// Appending would grow the buffer past its limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitExceeded;

impl RecvAccumulator {
    /// Create a new accumulator with the given initial capacity and size cap.
    pub fn new(capacity: usize, limit: usize) -> Self {
        RecvAccumulator {
            buf: BytesMut::with_capacity(capacity.min(limit)),
            limit,
        }
    }

    /// Append received bytes. Grows the buffer if necessary.
    pub fn append(&mut self, data: &[u8]) -> Result<(), LimitExceeded> {
        if self.buf.len().saturating_add(data.len()) > self.limit {
            return Err(LimitExceeded);
        }
        self.buf.extend_from_slice(data);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Detach the accumulated bytes as a frozen `Bytes` (O(1)).
    pub fn take(&mut self) -> Bytes {
        std::mem::take(&mut self.buf).freeze()
    }
}
