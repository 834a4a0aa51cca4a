//! pollfetch runtime metrics.
//!
//! Process-wide counters for fetch lifecycle, bytes, and reactor dispatch.
//! Registered with metriken so an exporter can expose them.

use metriken::{Counter, Gauge, metric};

// ── Fetch lifecycle ──────────────────────────────────────────────

#[metric(name = "pollfetch/fetch/started", description = "Fetches started")]
pub static FETCHES_STARTED: Counter = Counter::new();

#[metric(
    name = "pollfetch/fetch/completed",
    description = "Fetches that delivered a response body"
)]
pub static FETCHES_COMPLETED: Counter = Counter::new();

#[metric(
    name = "pollfetch/fetch/failed",
    description = "Fetches that ended with an error"
)]
pub static FETCHES_FAILED: Counter = Counter::new();

#[metric(
    name = "pollfetch/connections/active",
    description = "Currently open fetch connections"
)]
pub static CONNECTIONS_ACTIVE: Gauge = Gauge::new();

// ── Bytes ────────────────────────────────────────────────────────

#[metric(name = "pollfetch/bytes/received", description = "Total bytes received")]
pub static BYTES_RECEIVED: Counter = Counter::new();

#[metric(name = "pollfetch/bytes/sent", description = "Total bytes sent")]
pub static BYTES_SENT: Counter = Counter::new();

// ── Reactor ──────────────────────────────────────────────────────

#[metric(
    name = "pollfetch/reactor/events_dispatched",
    description = "Readiness events dispatched to a connection"
)]
pub static EVENTS_DISPATCHED: Counter = Counter::new();

#[metric(
    name = "pollfetch/reactor/partial_writes",
    description = "Request writes that stopped short on WouldBlock"
)]
pub static PARTIAL_WRITES: Counter = Counter::new();
