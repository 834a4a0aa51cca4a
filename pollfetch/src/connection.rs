//! Per-fetch connection state machine.
//!
//! ```text
//! Connecting    --writable--> request written     --> AwaitingRead
//!                          |  request partly sent --> AwaitingWrite
//! AwaitingWrite --writable--> rest written        --> AwaitingRead
//! AwaitingRead  --readable, n > 0--> append       --> AwaitingRead
//! AwaitingRead  --readable, n == 0--> decode      --> Closed
//! ```
//!
//! The connection never touches the multiplexer. Handlers report progress
//! and the reactor switches registrations accordingly.

use std::fmt;
use std::io::{self, Read, Write};
use std::net::TcpStream;

use bytes::Bytes;
use protocol_http::{Request, Response, Target};

use crate::accumulator::RecvAccumulator;
use crate::config::Config;
use crate::error::FetchError;
use crate::metrics;

/// Identifies one fetch for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FetchId(pub(crate) u64);

impl FetchId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FetchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fetch#{}", self.0)
    }
}

/// Where a connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Connect issued, completion not yet observed.
    Connecting,
    /// Connected, request partly written.
    AwaitingWrite,
    /// Request written, accumulating the response.
    AwaitingRead,
    /// Peer closed or the fetch failed. Terminal.
    Closed,
}

/// Byte stream a connection runs over.
pub trait Transport: Read + Write {
    /// Pending socket error (`SO_ERROR`), cleared by the call.
    fn take_error(&self) -> io::Result<Option<io::Error>>;
}

impl Transport for TcpStream {
    fn take_error(&self) -> io::Result<Option<io::Error>> {
        TcpStream::take_error(self)
    }
}

/// Outcome of a writable event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteProgress {
    /// The socket stopped accepting bytes; wait for writability again.
    Partial,
    /// The whole request is on the wire.
    Complete,
}

/// Outcome of a readable event.
#[derive(Debug)]
pub enum ReadProgress {
    /// Drained to `WouldBlock`; more may arrive.
    Pending,
    /// Peer shut down; the full response decoded.
    Closed(Response),
}

pub struct Connection<S> {
    id: FetchId,
    url: String,
    target: Target,
    stream: S,
    request: Bytes,
    sent: usize,
    accumulator: RecvAccumulator,
    phase: Phase,
}

impl<S: Transport> Connection<S> {
    /// Wrap a stream whose connect has been issued.
    pub fn new(id: FetchId, url: String, target: Target, stream: S, config: &Config) -> Self {
        let request = Request::get(&target).encode();
        Connection {
            id,
            url,
            target,
            stream,
            request,
            sent: 0,
            accumulator: RecvAccumulator::new(
                config.recv_accumulator_capacity,
                config.max_response_size,
            ),
            phase: Phase::Connecting,
        }
    }

    /// Handle write readiness: confirm the connect on first call, then write
    /// the request from where the last attempt stopped.
    pub fn on_writable(&mut self) -> Result<WriteProgress, FetchError> {
        debug_assert!(matches!(
            self.phase,
            Phase::Connecting | Phase::AwaitingWrite
        ));

        if self.phase == Phase::Connecting {
            match self.stream.take_error() {
                Ok(None) => {}
                Ok(Some(err)) | Err(err) => return Err(FetchError::ConnectFailure(err)),
            }
            self.phase = Phase::AwaitingWrite;
        }

        while self.sent < self.request.len() {
            match self.stream.write(&self.request[self.sent..]) {
                Ok(0) => return Err(FetchError::Io(io::ErrorKind::WriteZero.into())),
                Ok(n) => {
                    self.sent += n;
                    metrics::BYTES_SENT.add(n as u64);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    metrics::PARTIAL_WRITES.increment();
                    return Ok(WriteProgress::Partial);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(FetchError::Io(e)),
            }
        }

        self.phase = Phase::AwaitingRead;
        Ok(WriteProgress::Complete)
    }

    /// Handle read readiness: read `scratch`-sized chunks until the socket
    /// would block or the peer closes.
    pub fn on_readable(&mut self, scratch: &mut [u8]) -> Result<ReadProgress, FetchError> {
        debug_assert_eq!(self.phase, Phase::AwaitingRead);

        loop {
            match self.stream.read(scratch) {
                Ok(0) => {
                    self.phase = Phase::Closed;
                    let data = self.accumulator.take();
                    let response = Response::parse(&data).map_err(FetchError::Decode)?;
                    return Ok(ReadProgress::Closed(response));
                }
                Ok(n) => {
                    metrics::BYTES_RECEIVED.add(n as u64);
                    if self.accumulator.append(&scratch[..n]).is_err() {
                        return Err(FetchError::ResponseTooLarge(self.accumulator.len() + n));
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(ReadProgress::Pending);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(FetchError::Io(e)),
            }
        }
    }

    /// Mark the connection terminal after a failure.
    pub fn mark_closed(&mut self) {
        self.phase = Phase::Closed;
    }
}

impl<S> Connection<S> {
    pub fn id(&self) -> FetchId {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    /// Request bytes written so far.
    pub fn sent(&self) -> usize {
        self.sent
    }

    /// Response bytes accumulated so far.
    pub fn received(&self) -> usize {
        self.accumulator.len()
    }
}
