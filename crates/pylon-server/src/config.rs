//! Server configuration.

use pylon_core::{Environment, PylonError, PylonResult};
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport-level settings for the HTTP host.
///
/// # Example
///
/// ```
/// use pylon_server::ServerConfig;
///
/// let config = ServerConfig::builder()
///     .addr("0.0.0.0:9000")
///     .max_body_bytes(256 * 1024)
///     .build();
/// assert_eq!(config.addr(), "0.0.0.0:9000");
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    addr: String,
    max_body_bytes: usize,
    shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Starts building a configuration.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Reads `SERVER_ADDR` and `MAX_BODY_BYTES` from the environment,
    /// falling back to the defaults.
    #[must_use]
    pub fn from_env(env: &Environment) -> Self {
        let defaults = Self::default();
        Self {
            addr: env.get_or("SERVER_ADDR", DEFAULT_ADDR),
            max_body_bytes: usize::try_from(
                env.get_int("MAX_BODY_BYTES", defaults.max_body_bytes as i64).max(0),
            )
            .unwrap_or(defaults.max_body_bytes),
            shutdown_timeout: defaults.shutdown_timeout,
        }
    }

    /// The listen address.
    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Largest request body the host will buffer.
    #[must_use]
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// How long to wait for in-flight connections at shutdown.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Parses the listen address.
    ///
    /// # Errors
    ///
    /// `Configuration` when the address is not `host:port`.
    pub fn socket_addr(&self) -> PylonResult<SocketAddr> {
        self.addr
            .parse()
            .map_err(|e| PylonError::configuration(format!("Invalid address {}: {e}", self.addr)))
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    addr: Option<String>,
    max_body_bytes: Option<usize>,
    shutdown_timeout: Option<Duration>,
}

impl ServerConfigBuilder {
    /// Sets the listen address.
    #[must_use]
    pub fn addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = Some(addr.into());
        self
    }

    /// Sets the request body limit.
    #[must_use]
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = Some(limit);
        self
    }

    /// Sets the graceful-shutdown wait.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = Some(timeout);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        let defaults = ServerConfig::default();
        ServerConfig {
            addr: self.addr.unwrap_or(defaults.addr),
            max_body_bytes: self.max_body_bytes.unwrap_or(defaults.max_body_bytes),
            shutdown_timeout: self.shutdown_timeout.unwrap_or(defaults.shutdown_timeout),
        }
    }
}
