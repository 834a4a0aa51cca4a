//! Thin layer over the OS readiness facility.
//!
//! [`Selector`] is the seam between the reactor and epoll/kqueue. The
//! production implementation, [`MioSelector`], goes through `mio`; tests can
//! substitute their own.

use std::io;
use std::os::fd::RawFd;
use std::sync::Arc;
use std::time::Duration;

use mio::unix::SourceFd;
use mio::{Events, Poll, Token, Waker};

/// Token reserved for the selector's own wake-up source.
pub const WAKE_TOKEN: Token = Token(usize::MAX);

/// What a registration waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interest {
    Readable,
    Writable,
}

impl Interest {
    fn to_mio(self) -> mio::Interest {
        match self {
            Interest::Readable => mio::Interest::READABLE,
            Interest::Writable => mio::Interest::WRITABLE,
        }
    }
}

/// Readiness reported by the OS for one handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    pub token: Token,
    pub readable: bool,
    pub writable: bool,
    pub error: bool,
    pub read_closed: bool,
    pub write_closed: bool,
}

impl Readiness {
    /// Readable-only readiness, as a selector reports for incoming data.
    pub fn readable(token: Token) -> Self {
        Readiness {
            token,
            readable: true,
            writable: false,
            error: false,
            read_closed: false,
            write_closed: false,
        }
    }

    /// Writable-only readiness, as a selector reports for a connected socket.
    pub fn writable(token: Token) -> Self {
        Readiness {
            token,
            readable: false,
            writable: true,
            error: false,
            read_closed: false,
            write_closed: false,
        }
    }

    /// Whether this readiness should wake a handle registered for `interest`.
    ///
    /// Errors and hang-ups satisfy either interest: the handler's next I/O
    /// call is what surfaces them.
    pub fn satisfies(&self, interest: Interest) -> bool {
        match interest {
            Interest::Readable => self.readable || self.read_closed || self.error,
            Interest::Writable => self.writable || self.write_closed || self.error,
        }
    }
}

/// Wakes a selector blocked in [`Selector::select`] from any thread.
pub trait Notify: Send + Sync {
    fn notify(&self) -> io::Result<()>;
}

impl Notify for Waker {
    fn notify(&self) -> io::Result<()> {
        self.wake()
    }
}

/// OS readiness multiplexing primitive.
pub trait Selector {
    /// Start watching `fd` for `interest`, reporting it as `token`.
    fn register(&mut self, fd: RawFd, token: Token, interest: Interest) -> io::Result<()>;

    /// Stop watching `fd`.
    fn deregister(&mut self, fd: RawFd) -> io::Result<()>;

    /// Block until at least one registered handle is ready, the timeout
    /// expires, or a [`Notify`] wake-up arrives. Ready handles are appended
    /// to `ready` in the order the OS reports them.
    fn select(&mut self, ready: &mut Vec<Readiness>, timeout: Option<Duration>)
    -> io::Result<()>;

    /// A handle that interrupts a blocked [`select`](Self::select).
    fn notifier(&self) -> io::Result<Arc<dyn Notify>>;
}

/// [`Selector`] backed by `mio::Poll` (epoll on Linux, kqueue on BSD/macOS).
///
/// Registrations are edge-triggered: callers drain a socket until
/// `WouldBlock` before waiting again. Registering a socket that is already
/// ready reports it on the next wait.
pub struct MioSelector {
    poll: Poll,
    events: Events,
    waker: Arc<Waker>,
}

impl MioSelector {
    pub fn new(events_capacity: usize) -> io::Result<Self> {
        let poll = Poll::new()?;
        let waker = Arc::new(Waker::new(poll.registry(), WAKE_TOKEN)?);
        Ok(MioSelector {
            poll,
            events: Events::with_capacity(events_capacity),
            waker,
        })
    }
}

impl Selector for MioSelector {
    fn register(&mut self, fd: RawFd, token: Token, interest: Interest) -> io::Result<()> {
        self.poll
            .registry()
            .register(&mut SourceFd(&fd), token, interest.to_mio())
    }

    fn deregister(&mut self, fd: RawFd) -> io::Result<()> {
        self.poll.registry().deregister(&mut SourceFd(&fd))
    }

    fn select(
        &mut self,
        ready: &mut Vec<Readiness>,
        timeout: Option<Duration>,
    ) -> io::Result<()> {
        loop {
            match self.poll.poll(&mut self.events, timeout) {
                Ok(()) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        for event in self.events.iter() {
            if event.token() == WAKE_TOKEN {
                continue;
            }
            ready.push(Readiness {
                token: event.token(),
                readable: event.is_readable(),
                writable: event.is_writable(),
                error: event.is_error(),
                read_closed: event.is_read_closed(),
                write_closed: event.is_write_closed(),
            });
        }
        Ok(())
    }

    fn notifier(&self) -> io::Result<Arc<dyn Notify>> {
        Ok(self.waker.clone())
    }
}
