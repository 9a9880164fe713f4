use serde::{Deserialize, Serialize};
use std::net::ToSocketAddrs;
use std::time::Duration;

use crate::ConfigError;

pub const ADDR_ENV: &str = "COBOT_PROXY_ADDR";
pub const PORT_ENV: &str = "COBOT_PROXY_PORT";
pub const RECONNECT_ENV: &str = "COBOT_RECONNECT_MS";

/// Where the proxy lives and how the connection behaves.
///
/// ```rust
/// use cobot_console::drivers::ConnectionConfig;
///
/// let config = ConnectionConfig::new("127.0.0.1".to_string(), 8767);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.url(), "ws://127.0.0.1:8767");
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    pub addr: String,
    pub port: u16,
    /// Fixed wait between losing the connection and the next attempt.
    pub reconnect_delay_ms: u64,
    /// Capacity of the channel feeding decoded messages to the dispatcher.
    pub inbound_capacity: usize,
}

impl ConnectionConfig {
    pub fn new(addr: String, port: u16) -> Self {
        Self {
            addr,
            port,
            ..Default::default()
        }
    }

    /// Defaults overridden by `COBOT_PROXY_ADDR`, `COBOT_PROXY_PORT` and
    /// `COBOT_RECONNECT_MS` where set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(addr) = lookup(ADDR_ENV) {
            config.addr = addr;
        }
        if let Some(port) = lookup(PORT_ENV) {
            config.port = parse_env(PORT_ENV, &port)?;
        }
        if let Some(delay) = lookup(RECONNECT_ENV) {
            config.reconnect_delay_ms = parse_env(RECONNECT_ENV, &delay)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.addr.is_empty() {
            return Err(ConfigError::EmptyAddress);
        }
        if self.port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        if self.inbound_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }

    /// Websocket URL of the proxy.
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.addr, self.port)
    }

    /// Resolves the address to a `SocketAddr` if possible.
    pub fn resolve(&self) -> Result<String, ConfigError> {
        let address_with_port = format!("{}:{}", self.addr, self.port);
        address_with_port
            .to_socket_addrs()
            .ok()
            .and_then(|mut iter| iter.next())
            .map(|socket_addr| socket_addr.to_string())
            .ok_or(ConfigError::Unresolvable(address_with_port))
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1".to_string(),
            port: 8767,
            reconnect_delay_ms: 1000,
            inbound_capacity: 256,
        }
    }
}

fn parse_env<T: std::str::FromStr>(variable: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        variable: variable.to_string(),
        value: value.to_string(),
    })
}
