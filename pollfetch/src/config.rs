/// Configuration for a [`Reactor`](crate::Reactor).
#[derive(Clone, Debug)]
pub struct Config {
    /// Upper bound on a single `read` call when draining a readable socket.
    pub recv_chunk_size: usize,
    /// Initial capacity of each connection's response accumulator.
    pub recv_accumulator_capacity: usize,
    /// Maximum number of readiness events collected per selector wait.
    pub events_capacity: usize,
    /// Maximum number of fetches in flight at once. `start_fetch` past this
    /// limit fails with `ConnectionLimitReached`.
    pub max_connections: usize,
    /// A response that grows past this many bytes fails the fetch with
    /// `ResponseTooLarge`. Bounds memory held by a peer that never closes.
    pub max_response_size: usize,
    /// Port used when a URL does not name one.
    pub default_port: u16,
    /// Enable TCP_NODELAY on outbound sockets.
    pub tcp_nodelay: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recv_chunk_size: 1024,
            recv_accumulator_capacity: 4096,
            events_capacity: 1024,
            max_connections: 1024,
            max_response_size: 64 * 1024 * 1024,
            default_port: protocol_http::DEFAULT_PORT,
            tcp_nodelay: false,
        }
    }
}

impl Config {
    /// Validate configuration values. Returns an error if any value is out of range.
    pub fn validate(&self) -> Result<(), crate::error::Error> {
        if self.recv_chunk_size == 0 {
            return Err(crate::error::Error::InvalidConfig(
                "recv_chunk_size must be > 0".into(),
            ));
        }
        if self.events_capacity == 0 {
            return Err(crate::error::Error::InvalidConfig(
                "events_capacity must be > 0".into(),
            ));
        }
        // Token(usize::MAX) is reserved for the stop waker.
        if self.max_connections == 0 || self.max_connections >= usize::MAX >> 1 {
            return Err(crate::error::Error::InvalidConfig(
                "max_connections must be > 0 and < usize::MAX / 2".into(),
            ));
        }
        if self.max_response_size == 0 {
            return Err(crate::error::Error::InvalidConfig(
                "max_response_size must be > 0".into(),
            ));
        }
        if self.default_port == 0 {
            return Err(crate::error::Error::InvalidConfig(
                "default_port must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`Config`] with discoverable methods and `build()` validation.
///
/// # Example
///
/// ```rust
/// use pollfetch::ConfigBuilder;
///
/// let config = ConfigBuilder::default()
///     .recv_chunk_size(4096)
///     .max_connections(64)
///     .max_response_size(1 << 20)
///     .build()
///     .expect("invalid config");
/// assert_eq!(config.recv_chunk_size, 4096);
/// ```
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with default config values.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Receive settings ─────────────────────────────────────────────

    /// Set the per-read chunk size.
    pub fn recv_chunk_size(mut self, n: usize) -> Self {
        self.config.recv_chunk_size = n;
        self
    }

    /// Set the initial capacity for per-connection response accumulators.
    pub fn recv_accumulator_capacity(mut self, n: usize) -> Self {
        self.config.recv_accumulator_capacity = n;
        self
    }

    /// Set the response size cap in bytes.
    pub fn max_response_size(mut self, n: usize) -> Self {
        self.config.max_response_size = n;
        self
    }

    // ── Selector settings ────────────────────────────────────────────

    /// Set the number of events collected per selector wait.
    pub fn events_capacity(mut self, n: usize) -> Self {
        self.config.events_capacity = n;
        self
    }

    // ── Connection settings ──────────────────────────────────────────

    /// Set the maximum number of fetches in flight.
    pub fn max_connections(mut self, n: usize) -> Self {
        self.config.max_connections = n;
        self
    }

    /// Set the port used when a URL names none.
    pub fn default_port(mut self, port: u16) -> Self {
        self.config.default_port = port;
        self
    }

    /// Enable or disable TCP_NODELAY on outbound sockets.
    pub fn tcp_nodelay(mut self, enable: bool) -> Self {
        self.config.tcp_nodelay = enable;
        self
    }

    // ── Terminal ─────────────────────────────────────────────────────

    /// Validate and build the final [`Config`].
    pub fn build(self) -> Result<Config, crate::error::Error> {
        self.config.validate()?;
        Ok(self.config)
    }
}
