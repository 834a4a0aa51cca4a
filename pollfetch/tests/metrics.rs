//! Process-wide metrics observed across whole fetches.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;

use pollfetch::metrics::{
    BYTES_RECEIVED, BYTES_SENT, CONNECTIONS_ACTIVE, EVENTS_DISPATCHED, FETCHES_COMPLETED,
    FETCHES_FAILED, FETCHES_STARTED,
};
use pollfetch::{Config, Reactor};
use serial_test::serial;

fn serve_once(reply: &'static [u8]) -> (String, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 128];
        while !buf.ends_with(b"\r\n\r\n") {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        stream.write_all(reply).unwrap();
    });
    (url, handle)
}

#[test]
#[serial]
fn successful_fetch_updates_counters() {
    const REPLY: &[u8] = b"HTTP/1.1 200 OK\r\n\r\nok";
    let (url, server) = serve_once(REPLY);

    let started = FETCHES_STARTED.value();
    let completed = FETCHES_COMPLETED.value();
    let received = BYTES_RECEIVED.value();
    let sent = BYTES_SENT.value();
    let events = EVENTS_DISPATCHED.value();
    let active = CONNECTIONS_ACTIVE.value();

    let mut reactor = Reactor::new(Config::default()).unwrap();
    reactor.start_fetch(&url).unwrap();
    assert_eq!(CONNECTIONS_ACTIVE.value(), active + 1);
    reactor.run_until_idle().unwrap();
    server.join().unwrap();

    let authority = url.trim_start_matches("http://").trim_end_matches('/');
    let request_len = format!("GET / HTTP/1.1\r\nHost:{authority}\r\nConnection:close\r\n\r\n").len();
    assert_eq!(FETCHES_STARTED.value() - started, 1);
    assert_eq!(FETCHES_COMPLETED.value() - completed, 1);
    assert_eq!(BYTES_RECEIVED.value() - received, REPLY.len() as u64);
    assert_eq!(BYTES_SENT.value() - sent, request_len as u64);
    assert!(EVENTS_DISPATCHED.value() - events >= 2);
    assert_eq!(CONNECTIONS_ACTIVE.value(), active);
}

#[test]
#[serial]
fn failed_fetch_counts_as_failed() {
    let (url, server) = serve_once(b"garbage without a header terminator");

    let failed = FETCHES_FAILED.value();
    let completed = FETCHES_COMPLETED.value();

    let mut reactor = Reactor::new(Config::default()).unwrap();
    reactor.start_fetch(&url).unwrap();
    reactor.run_until_idle().unwrap();
    server.join().unwrap();

    assert_eq!(FETCHES_FAILED.value() - failed, 1);
    assert_eq!(FETCHES_COMPLETED.value(), completed);
}

#[test]
#[serial]
fn dropping_reactor_releases_active_gauge() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/", listener.local_addr().unwrap());
    let active = CONNECTIONS_ACTIVE.value();

    let mut reactor = Reactor::new(Config::default()).unwrap();
    reactor.start_fetch(&url).unwrap();
    reactor.start_fetch(&url).unwrap();
    assert_eq!(CONNECTIONS_ACTIVE.value(), active + 2);

    drop(reactor);
    assert_eq!(CONNECTIONS_ACTIVE.value(), active);
}
