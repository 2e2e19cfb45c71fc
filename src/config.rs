//! Relay configuration
//!
//! Configuration can come from a YAML file, from command-line flags, or both
//! (flags win). Every field has a default; the UDP port defaults to 5300.
//!
//! ```yaml
//! listener:
//!   port: 5300
//!   source: 192.168.1.20
//! publisher:
//!   enabled: true
//!   address: 127.0.0.1:6379
//! console:
//!   report_hz: 10
//! ```

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

use crate::error::ConfigError;
use crate::types::ReportRate;

/// Port Forza games send to by default
pub const DEFAULT_PORT: u16 = 5300;

/// Receive buffer size: the largest UDP payload an IPv4 or IPv6 socket can
/// deliver, so no datagram is ever truncated and every length reaches the
/// decoder as sent.
pub const MAX_DATAGRAM_SIZE: usize = 65_536;

/// UDP listener settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListenerConfig {
    /// Local address to bind
    pub bind: IpAddr,

    /// Local UDP port
    pub port: u16,

    /// Only accept datagrams sent from this host
    pub source: Option<IpAddr>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self { bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED), port: DEFAULT_PORT, source: None }
    }
}

impl ListenerConfig {
    pub fn new(port: u16) -> Self {
        Self { port, ..Self::default() }
    }

    pub fn with_bind(mut self, bind: IpAddr) -> Self {
        self.bind = bind;
        self
    }

    pub fn with_source(mut self, source: Option<IpAddr>) -> Self {
        self.source = source;
        self
    }

    /// Socket address the listener binds to
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Whether a datagram from `peer` passes the source filter
    pub fn accepts(&self, peer: &SocketAddr) -> bool {
        source_matches(self.source, peer)
    }
}

/// Source filter shared by the config and the listener loop
pub(crate) fn source_matches(filter: Option<IpAddr>, peer: &SocketAddr) -> bool {
    filter.is_none_or(|host| host == peer.ip())
}

/// Key-value publisher settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublisherConfig {
    pub enabled: bool,

    /// `host:port` of the Redis-protocol server
    pub address: String,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self { enabled: true, address: "127.0.0.1:6379".to_string() }
    }
}

/// Console reporter settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleConfig {
    /// Render at most this many frames per second (every frame when unset)
    pub report_hz: Option<u32>,
}

impl ConsoleConfig {
    pub fn report_rate(&self) -> ReportRate {
        ReportRate::from(self.report_hz)
    }
}

/// Complete relay configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    pub listener: ListenerConfig,
    pub publisher: PublisherConfig,
    pub console: ConsoleConfig,
}

impl RelayConfig {
    /// Parse a YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed YAML or unknown keys.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Load a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read and
    /// [`ConfigError::Parse`] when it is not a valid config.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_yaml(&yaml)
    }
}
