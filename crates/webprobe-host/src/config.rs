//! Listener host configuration.
//!
//! # Example
//!
//! ```rust
//! use webprobe_host::HostConfig;
//! use std::time::Duration;
//!
//! let config = HostConfig::builder()
//!     .bind_addr("127.0.0.1:0")
//!     .shutdown_timeout(Duration::from_secs(2))
//!     .build();
//!
//! assert_eq!(config.bind_addr(), "127.0.0.1:0");
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{HostError, HostResult};

/// Default bind address: loopback, any free port.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:0";

/// Default time to wait for connections to drain on stop.
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 5_000;

/// Settings for a [`ListenerServer`](crate::ListenerServer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    bind_addr: String,
    shutdown_timeout: Duration,
    keep_alive: bool,
}

impl HostConfig {
    /// Creates a builder with default values.
    pub fn builder() -> HostConfigBuilder {
        HostConfigBuilder::default()
    }

    /// The address the listener binds to.
    pub fn bind_addr(&self) -> &str {
        &self.bind_addr
    }

    /// Parses the bind address.
    pub fn socket_addr(&self) -> HostResult<SocketAddr> {
        self.bind_addr
            .parse()
            .map_err(|_| HostError::InvalidAddress(self.bind_addr.clone()))
    }

    /// How long `shutdown` waits for open connections.
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Whether HTTP/1 keep-alive is enabled on server connections.
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`HostConfig`].
#[derive(Debug, Clone)]
pub struct HostConfigBuilder {
    bind_addr: String,
    shutdown_timeout: Duration,
    keep_alive: bool,
}

impl Default for HostConfigBuilder {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            shutdown_timeout: Duration::from_millis(DEFAULT_SHUTDOWN_TIMEOUT_MS),
            keep_alive: false,
        }
    }
}

impl HostConfigBuilder {
    /// Sets the bind address.
    pub fn bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    /// Sets the drain timeout used on shutdown.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Enables or disables HTTP/1 keep-alive.
    pub fn keep_alive(mut self, enabled: bool) -> Self {
        self.keep_alive = enabled;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> HostConfig {
        HostConfig {
            bind_addr: self.bind_addr,
            shutdown_timeout: self.shutdown_timeout,
            keep_alive: self.keep_alive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HostConfig::default();
        assert_eq!(config.bind_addr(), DEFAULT_BIND_ADDR);
        assert_eq!(
            config.shutdown_timeout(),
            Duration::from_millis(DEFAULT_SHUTDOWN_TIMEOUT_MS)
        );
        assert!(!config.keep_alive());
        assert_eq!(config.socket_addr().unwrap().port(), 0);
    }

    #[test]
    fn test_builder_overrides() {
        let config = HostConfig::builder()
            .bind_addr("127.0.0.1:9090")
            .shutdown_timeout(Duration::from_millis(250))
            .keep_alive(true)
            .build();

        assert_eq!(config.socket_addr().unwrap().port(), 9090);
        assert_eq!(config.shutdown_timeout(), Duration::from_millis(250));
        assert!(config.keep_alive());
    }

    #[test]
    fn test_invalid_address() {
        let config = HostConfig::builder().bind_addr("localhost").build();
        assert!(matches!(
            config.socket_addr(),
            Err(HostError::InvalidAddress(addr)) if addr == "localhost"
        ));
    }
}
