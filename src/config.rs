use std::time::Duration;

use crate::{
    error::{Error, Result},
    queue::DEFAULT_CAPACITY,
};

pub const DEFAULT_ENDPOINT: &str = "http://api.stathat.com/ez";

/// What [`crate::Reporter::close`] waits for besides the final flush.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ShutdownMode {
    /// Wait for every flush that is still in flight, not only the final one.
    #[default]
    Drain,
    /// Only wait for the final flush. Earlier flushes keep running on the
    /// runtime and finish (or time out) on their own.
    Detach,
}

/// Reporter configuration. Fixed once the reporter has started.
#[derive(Debug, Clone)]
pub struct Config {
    /// The EZ key identifying the account on the remote collector.
    pub key: String,
    /// Log every stat call and batch at debug level.
    pub debug: bool,
    pub endpoint: String,
    pub connect_timeout: Duration,
    /// Bound on the whole request, from write through reading the response.
    pub read_write_timeout: Duration,
    pub max_idle_conns: usize,
    /// Maximum number of flushes talking to the collector at once.
    pub max_connections: usize,
    /// How long a batch accumulates after its first event before it is sent.
    pub batch_timeout: Duration,
    pub max_batch_size: usize,
    /// Queue capacity, producers block once this many events are buffered.
    pub channel_buffer_size: usize,
    pub shutdown_mode: ShutdownMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            key: String::new(),
            debug: false,
            endpoint: DEFAULT_ENDPOINT.into(),
            connect_timeout: Duration::from_secs(1),
            read_write_timeout: Duration::from_secs(3),
            max_idle_conns: 10,
            max_connections: 10,
            batch_timeout: Duration::from_secs(10),
            max_batch_size: 500,
            channel_buffer_size: DEFAULT_CAPACITY,
            shutdown_mode: ShutdownMode::Drain,
        }
    }
}

impl Config {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_write_timeout(mut self, timeout: Duration) -> Self {
        self.read_write_timeout = timeout;
        self
    }

    pub fn with_max_idle_conns(mut self, conns: usize) -> Self {
        self.max_idle_conns = conns;
        self
    }

    pub fn with_max_connections(mut self, conns: usize) -> Self {
        self.max_connections = conns;
        self
    }

    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout = timeout;
        self
    }

    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    pub fn with_channel_buffer_size(mut self, size: usize) -> Self {
        self.channel_buffer_size = size;
        self
    }

    pub fn with_shutdown_mode(mut self, mode: ShutdownMode) -> Self {
        self.shutdown_mode = mode;
        self
    }

    /// Reject configurations the pipeline can't run with. An empty key is
    /// allowed, the collector will simply answer with an error status.
    pub fn validate(&self) -> Result<()> {
        if self.max_batch_size == 0 {
            return Err(Error::InvalidConfig("max_batch_size must be > 0".into()));
        }
        if self.channel_buffer_size == 0 {
            return Err(Error::InvalidConfig(
                "channel_buffer_size must be > 0".into(),
            ));
        }
        if self.max_connections == 0 {
            return Err(Error::InvalidConfig("max_connections must be > 0".into()));
        }
        if self.batch_timeout.is_zero() {
            return Err(Error::InvalidConfig("batch_timeout must be > 0".into()));
        }
        if self.endpoint.is_empty() {
            return Err(Error::InvalidConfig("endpoint must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::new("ezkey");
        assert_eq!(config.key, "ezkey");
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.batch_timeout, Duration::from_secs(10));
        assert_eq!(config.max_batch_size, 500);
        assert_eq!(config.channel_buffer_size, 10_000);
        assert_eq!(config.shutdown_mode, ShutdownMode::Drain);
        config.validate().unwrap();
    }

    #[test]
    fn rejects_zero_sizes() {
        for config in [
            Config::default().with_max_batch_size(0),
            Config::default().with_channel_buffer_size(0),
            Config::default().with_max_connections(0),
            Config::default().with_batch_timeout(Duration::ZERO),
            Config::default().with_endpoint(""),
        ] {
            assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
        }
    }
}
