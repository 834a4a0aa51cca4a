use std::net::TcpStream;
use std::os::fd::AsRawFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use mio::Token;
use protocol_http::{Response, Target};
use slab::Slab;
use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::connection::{Connection, FetchId, Phase, ReadProgress, WriteProgress};
use crate::error::{Error, FetchError, RegistryError};
use crate::metrics;
use crate::multiplexer::Multiplexer;
use crate::selector::{Interest, MioSelector, Notify, Selector};
use crate::socket::{self, ConnectOutcome};

/// Terminal result of one fetch.
#[derive(Debug)]
pub struct Completion {
    pub id: FetchId,
    pub url: String,
    pub result: Result<Response, FetchError>,
}

/// Handle for stopping a reactor from any thread.
///
/// The flag is checked between dispatch cycles; a reactor blocked in its
/// selector is woken so it sees the flag promptly. Stopping is permanent.
#[derive(Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
    notifier: Arc<dyn Notify>,
}

impl StopHandle {
    /// Ask the reactor to return from `run_forever` / `run_until_idle`.
    pub fn stop(&self) {
        self.flag.store(true, Ordering::Release);
        if let Err(e) = self.notifier.notify() {
            warn!(error = %e, "failed to wake reactor");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// What a handler asks the reactor to do with the connection's registration.
enum Step {
    /// Keep the current interest.
    Stay,
    /// One-shot phase done: unregister, then register the next interest.
    Rearm(Interest),
    /// Peer closed with a decoded response.
    Finish(Response),
}

/// Single-threaded readiness reactor driving one-shot HTTP fetches.
///
/// Owns the multiplexer and every in-flight connection. Nothing here
/// blocks except the selector wait inside [`turn`](Self::turn).
///
/// ```rust,no_run
/// use pollfetch::{Config, Reactor};
///
/// let mut reactor = Reactor::new(Config::default())?;
/// let completions = reactor.completions();
/// reactor.start_fetch("http://example.com/")?;
/// reactor.run_until_idle()?;
/// for done in completions.try_iter() {
///     match done.result {
///         Ok(resp) => println!("{}", resp.body()),
///         Err(e) => eprintln!("{}: {e}", done.url),
///     }
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Reactor<S: Selector = MioSelector> {
    config: Config,
    mux: Multiplexer<S>,
    connections: Slab<Connection<TcpStream>>,
    scratch: Box<[u8]>,
    next_id: u64,
    stop: StopHandle,
    completions_tx: Sender<Completion>,
    completions_rx: Receiver<Completion>,
}

impl Reactor<MioSelector> {
    /// Create a reactor on the platform selector.
    pub fn new(config: Config) -> Result<Self, Error> {
        config.validate()?;
        let selector = MioSelector::new(config.events_capacity)?;
        Self::with_selector(config, selector)
    }
}

impl<S: Selector> Reactor<S> {
    /// Create a reactor on a caller-provided selector.
    pub fn with_selector(config: Config, selector: S) -> Result<Self, Error> {
        config.validate()?;
        let mux = Multiplexer::new(selector);
        let stop = StopHandle {
            flag: Arc::new(AtomicBool::new(false)),
            notifier: mux.notifier()?,
        };
        let (completions_tx, completions_rx) = crossbeam_channel::unbounded();

        Ok(Reactor {
            scratch: vec![0u8; config.recv_chunk_size].into_boxed_slice(),
            connections: Slab::with_capacity(config.max_connections.min(1024)),
            config,
            mux,
            next_id: 0,
            stop,
            completions_tx,
            completions_rx,
        })
    }

    /// Begin fetching `url`: parse, resolve, connect without blocking, and
    /// register for writability.
    ///
    /// Failures detected here are returned directly and produce no
    /// [`Completion`]. A connect that fails later is reported as a
    /// completion with [`FetchError::ConnectFailure`].
    pub fn start_fetch(&mut self, url: &str) -> Result<FetchId, FetchError> {
        let target = Target::parse_with_port(url, self.config.default_port)
            .map_err(FetchError::InvalidUrl)?;

        if self.connections.len() >= self.config.max_connections {
            return Err(FetchError::ConnectionLimitReached);
        }

        let addr = socket::resolve(target.host(), target.port())
            .map_err(FetchError::ConnectFailure)?;
        let (stream, outcome) = socket::connect_nonblocking(addr, self.config.tcp_nodelay)
            .map_err(FetchError::ConnectFailure)?;
        match outcome {
            ConnectOutcome::Connected | ConnectOutcome::InProgress => {}
            ConnectOutcome::Failed(err) => {
                debug!(url, %addr, error = %err, "connect failed");
                return Err(FetchError::ConnectFailure(err));
            }
        }

        let id = FetchId(self.next_id);
        self.next_id += 1;

        let fd = stream.as_raw_fd();
        let entry = self.connections.vacant_entry();
        let token = Token(entry.key());
        entry.insert(Connection::new(
            id,
            url.to_string(),
            target,
            stream,
            &self.config,
        ));

        if let Err(e) = self.mux.register(token, fd, Interest::Writable) {
            self.connections.remove(token.0);
            return Err(e.into());
        }

        metrics::FETCHES_STARTED.increment();
        metrics::CONNECTIONS_ACTIVE.increment();
        debug!(fetch = %id, token = token.0, %addr, "fetch started");
        Ok(id)
    }

    /// Wait once for readiness and dispatch every event that fired.
    /// Returns the number of events dispatched.
    pub fn turn(&mut self, timeout: Option<Duration>) -> Result<usize, Error> {
        let fired = self.mux.wait_for_events(timeout)?;
        let count = fired.len();
        for (token, interest) in fired {
            self.dispatch(token, interest);
        }
        Ok(count)
    }

    /// Dispatch readiness until stopped through a [`StopHandle`].
    pub fn run_forever(&mut self) -> Result<(), Error> {
        while !self.stop.is_stopped() {
            self.turn(None)?;
        }
        debug!(in_flight = self.connections.len(), "reactor stopped");
        Ok(())
    }

    /// Dispatch readiness until no fetch is in flight, or until stopped.
    pub fn run_until_idle(&mut self) -> Result<(), Error> {
        while !self.connections.is_empty() && !self.stop.is_stopped() {
            self.turn(None)?;
        }
        Ok(())
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Receiver for finished fetches. Every clone observes the same queue.
    ///
    /// The queue is unbounded and the reactor holds a receiver of its own,
    /// so completions (response bodies included) stay in memory until some
    /// receiver takes them. Drain it regularly when running many fetches.
    pub fn completions(&self) -> Receiver<Completion> {
        self.completions_rx.clone()
    }

    /// Number of fetches not yet closed.
    pub fn in_flight(&self) -> usize {
        self.connections.len()
    }

    /// Current phase of a fetch, `None` for ids this reactor never issued.
    pub fn phase(&self, id: FetchId) -> Option<Phase> {
        if let Some((_, conn)) = self.connections.iter().find(|(_, c)| c.id() == id) {
            return Some(conn.phase());
        }
        (id.0 < self.next_id).then_some(Phase::Closed)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn multiplexer(&self) -> &Multiplexer<S> {
        &self.mux
    }

    fn dispatch(&mut self, token: Token, interest: Interest) {
        let Some(conn) = self.connections.get_mut(token.0) else {
            trace!(token = token.0, "event for closed connection");
            return;
        };
        metrics::EVENTS_DISPATCHED.increment();

        let step = match interest {
            Interest::Writable => conn.on_writable().map(|progress| match progress {
                WriteProgress::Partial => Step::Stay,
                WriteProgress::Complete => Step::Rearm(Interest::Readable),
            }),
            Interest::Readable => {
                conn.on_readable(&mut self.scratch)
                    .map(|progress| match progress {
                        ReadProgress::Pending => Step::Stay,
                        ReadProgress::Closed(response) => Step::Finish(response),
                    })
            }
        };

        match step {
            Ok(Step::Stay) => {}
            Ok(Step::Rearm(next)) => {
                if let Err(e) = self.rearm(token, next) {
                    self.close(token, Err(e.into()));
                }
            }
            Ok(Step::Finish(response)) => self.close(token, Ok(response)),
            Err(e) => self.close(token, Err(e)),
        }
    }

    fn rearm(&mut self, token: Token, next: Interest) -> Result<(), RegistryError> {
        let fd = self.connections[token.0].stream().as_raw_fd();
        self.mux.unregister(token)?;
        self.mux.register(token, fd, next)
    }

    /// Tear down a connection: drop its registration, close the socket, and
    /// deliver the result.
    fn close(&mut self, token: Token, result: Result<Response, FetchError>) {
        if self.mux.is_registered(token)
            && let Err(e) = self.mux.unregister(token)
        {
            warn!(token = token.0, error = %e, "unregister on close failed");
        }

        let mut conn = self.connections.remove(token.0);
        conn.mark_closed();
        metrics::CONNECTIONS_ACTIVE.decrement();

        match &result {
            Ok(response) => {
                metrics::FETCHES_COMPLETED.increment();
                debug!(
                    fetch = %conn.id(),
                    status = ?response.status(),
                    body_len = response.body().len(),
                    "fetch complete"
                );
            }
            Err(e) => {
                metrics::FETCHES_FAILED.increment();
                warn!(fetch = %conn.id(), url = conn.url(), error = %e, "fetch failed");
            }
        }

        let completion = Completion {
            id: conn.id(),
            url: conn.url().to_string(),
            result,
        };
        drop(conn);
        // The reactor holds a receiver, so the channel is never disconnected.
        let _ = self.completions_tx.send(completion);
    }
}

impl<S: Selector> Drop for Reactor<S> {
    fn drop(&mut self) {
        metrics::CONNECTIONS_ACTIVE.sub(self.connections.len() as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multiplexer::tests::FakeSelector;
    use crate::selector::Readiness;
    use std::io::Read;
    use std::net::TcpListener;

    fn fake_reactor(config: Config) -> Reactor<FakeSelector> {
        Reactor::with_selector(config, FakeSelector::default()).unwrap()
    }

    fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 256];
        while !buf.ends_with(b"\r\n\r\n") {
            let n = stream.read(&mut chunk).unwrap();
            assert!(n > 0, "client closed before sending request");
            buf.extend_from_slice(&chunk[..n]);
        }
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn start_fetch_registers_writable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());

        let mut reactor = fake_reactor(Config::default());
        let id = reactor.start_fetch(&url).unwrap();

        assert_eq!(reactor.in_flight(), 1);
        assert_eq!(reactor.phase(id), Some(Phase::Connecting));
        assert_eq!(
            reactor.multiplexer().interest(Token(0)),
            Some(Interest::Writable)
        );
        let registered = &reactor.multiplexer().selector().registered;
        assert_eq!(registered.len(), 1);
        assert_eq!(registered[0].1, Token(0));
    }

    #[test]
    fn writable_sends_request_and_switches_to_readable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let authority = listener.local_addr().unwrap().to_string();

        let mut reactor = fake_reactor(Config::default());
        let id = reactor
            .start_fetch(&format!("http://{authority}"))
            .unwrap();
        let (mut server, _) = listener.accept().unwrap();

        reactor
            .mux
            .selector_mut()
            .batches
            .push_back(vec![Readiness::writable(Token(0))]);
        assert_eq!(reactor.turn(None).unwrap(), 1);

        assert_eq!(reactor.phase(id), Some(Phase::AwaitingRead));
        assert_eq!(
            reactor.multiplexer().interest(Token(0)),
            Some(Interest::Readable)
        );
        assert_eq!(reactor.multiplexer().selector().deregistered.len(), 1);
        assert_eq!(
            read_request(&mut server),
            format!("GET / HTTP/1.1\r\nHost:{authority}\r\nConnection:close\r\n\r\n")
        );
    }

    #[test]
    fn invalid_url_is_rejected() {
        let mut reactor = fake_reactor(Config::default());
        let err = reactor.start_fetch("not a url").unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
        assert_eq!(reactor.in_flight(), 0);
    }

    #[test]
    fn connection_limit() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());

        let config = Config {
            max_connections: 1,
            ..Config::default()
        };
        let mut reactor = fake_reactor(config);
        reactor.start_fetch(&url).unwrap();
        let err = reactor.start_fetch(&url).unwrap_err();
        assert!(matches!(err, FetchError::ConnectionLimitReached));
    }

    #[test]
    fn registration_failure_is_returned() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());

        let selector = FakeSelector {
            fail_register: true,
            ..Default::default()
        };
        let mut reactor = Reactor::with_selector(Config::default(), selector).unwrap();
        let err = reactor.start_fetch(&url).unwrap_err();
        assert!(matches!(err, FetchError::Registry(RegistryError::Io(_))));
        assert_eq!(reactor.in_flight(), 0);
    }

    #[test]
    fn failed_switch_to_readable_closes_the_fetch() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());

        let selector = FakeSelector {
            register_limit: Some(1),
            ..Default::default()
        };
        let mut reactor = Reactor::with_selector(Config::default(), selector).unwrap();
        let completions = reactor.completions();
        let id = reactor.start_fetch(&url).unwrap();
        let (_server, _) = listener.accept().unwrap();

        reactor
            .mux
            .selector_mut()
            .batches
            .push_back(vec![Readiness::writable(Token(0))]);
        assert_eq!(reactor.turn(None).unwrap(), 1);

        assert_eq!(reactor.in_flight(), 0);
        assert_eq!(reactor.phase(id), Some(Phase::Closed));
        assert!(!reactor.multiplexer().is_registered(Token(0)));
        assert_eq!(reactor.multiplexer().selector().deregistered.len(), 1);

        let done = completions.try_recv().unwrap();
        assert_eq!(done.id, id);
        assert!(matches!(
            done.result,
            Err(FetchError::Registry(RegistryError::Io(_)))
        ));
    }

    #[test]
    fn events_for_unknown_tokens_are_ignored() {
        let mut reactor = fake_reactor(Config::default());
        reactor
            .mux
            .selector_mut()
            .batches
            .push_back(vec![Readiness::readable(Token(3))]);
        assert_eq!(reactor.turn(None).unwrap(), 0);
    }

    #[test]
    fn stopped_reactor_returns_immediately() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());

        let mut reactor = fake_reactor(Config::default());
        reactor.start_fetch(&url).unwrap();
        let stop = reactor.stop_handle();
        stop.stop();
        assert!(stop.is_stopped());

        reactor.run_forever().unwrap();
        reactor.run_until_idle().unwrap();
        assert_eq!(reactor.in_flight(), 1);
    }

    #[test]
    fn unknown_fetch_id_has_no_phase() {
        let reactor = fake_reactor(Config::default());
        assert_eq!(reactor.phase(FetchId(0)), None);
    }

    #[test]
    fn rejects_invalid_config() {
        let config = Config {
            recv_chunk_size: 0,
            ..Config::default()
        };
        assert!(matches!(
            Reactor::with_selector(config, FakeSelector::default()),
            Err(Error::InvalidConfig(_))
        ));
    }
}
