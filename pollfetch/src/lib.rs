//! Single-threaded readiness reactor for one-shot HTTP fetches.
//!
//! Each fetch is a small state machine driven by socket readiness: a
//! non-blocking connect, a writable event that sends the request, readable
//! events that accumulate the response, and a zero-length read that ends it.
//! Any number of fetches share one [`Reactor`], which blocks only inside the
//! OS readiness wait (epoll/kqueue through `mio`).
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pollfetch::{Config, Reactor};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut reactor = Reactor::new(Config::default())?;
//!     let completions = reactor.completions();
//!
//!     reactor.start_fetch("http://example.com/")?;
//!     reactor.start_fetch("http://example.org")?;
//!     reactor.run_until_idle()?;
//!
//!     for done in completions.try_iter() {
//!         println!("{} -> {:?}", done.url, done.result.map(|r| r.into_body().len()));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Scope
//!
//! Plain TCP only. Responses are framed by connection close
//! (`Connection:close` is always sent); there is no keep-alive, redirect
//! following, timeout, or chunked decoding.

// ── Internal modules ────────────────────────────────────────────────────
pub(crate) mod accumulator;
pub(crate) mod socket;

// ── Public modules ──────────────────────────────────────────────────────
pub mod config;
pub mod connection;
pub mod error;
pub mod metrics;
pub mod multiplexer;
pub mod reactor;
pub mod registration;
pub mod selector;

// ── Re-exports: Reactor ─────────────────────────────────────────────────

/// Terminal result of one fetch.
pub use reactor::Completion;
/// Readiness reactor.
pub use reactor::Reactor;
/// Handle for stopping a reactor from another thread.
pub use reactor::StopHandle;

// ── Re-exports: Connection ──────────────────────────────────────────────

/// Identifier of one fetch.
pub use connection::FetchId;
/// Connection lifecycle phase.
pub use connection::Phase;

// ── Re-exports: Multiplexing ────────────────────────────────────────────

/// Registration table bound to a selector.
pub use multiplexer::Multiplexer;
/// Production selector backed by `mio`.
pub use selector::MioSelector;
/// Readiness interest.
pub use selector::{Interest, Notify, Readiness, Selector};
/// Reactor handle type.
pub use mio::Token;

// ── Re-exports: Shared types ────────────────────────────────────────────

/// Reactor configuration.
pub use config::Config;
/// Builder for [`Config`] with `build()` validation.
pub use config::ConfigBuilder;
/// Errors.
pub use error::{Error, FetchError, RegistryError};
/// Decoded HTTP response.
pub use protocol_http::Response;
