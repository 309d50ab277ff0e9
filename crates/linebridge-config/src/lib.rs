//! Layered configuration for the line bridge daemon.
//!
//! Values resolve through `ortho_config`: built-in defaults, then an optional
//! configuration file, then `LINEBRIDGE_*` environment variables, and finally
//! command-line flags. The resolved [`Config`] decides where connection
//! servers listen, how local ports map onto upstream ports, and how the
//! daemon reports telemetry.

mod defaults;
mod logging;
mod socket;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LISTEN_HOST, DEFAULT_LOG_FILTER, DEFAULT_PORT_OFFSET, DEFAULT_PROBE_INTERVAL_MS,
    DEFAULT_UPSTREAM_HOST, default_listen_host, default_log_filter, default_log_filter_string,
    default_log_format, default_port_offset, default_probe_interval_ms, default_upstream_host,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{SocketEndpoint, SocketParseError};

/// How the local port of a connection server is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortPolicy {
    /// Every upstream is bridged through the same local port.
    Fixed(u16),
    /// The local port is the upstream port plus this offset.
    Offset(u16),
}

impl PortPolicy {
    /// Local port that bridges `upstream_port`, or `None` when the offset
    /// would overflow the port range.
    #[must_use]
    pub fn local_port(self, upstream_port: u16) -> Option<u16> {
        match self {
            Self::Fixed(port) => Some(port),
            Self::Offset(offset) => upstream_port.checked_add(offset),
        }
    }

    /// Returns `true` when servers outlive the upstream they were created for.
    #[must_use]
    pub const fn is_fixed(self) -> bool {
        matches!(self, Self::Fixed(_))
    }
}

/// Resolved daemon configuration.
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "LINEBRIDGE")]
pub struct Config {
    /// Address every connection server binds.
    #[serde(default = "crate::defaults::default_listen_host")]
    #[ortho_config(default = crate::defaults::default_listen_host())]
    pub listen_host: String,
    /// Fixed local port; selects [`PortPolicy::Fixed`] when present.
    #[serde(default)]
    pub listen_port: Option<u16>,
    /// Offset added to upstream ports when no fixed port is configured.
    #[serde(default = "crate::defaults::default_port_offset")]
    #[ortho_config(default = crate::defaults::default_port_offset())]
    pub port_offset: u16,
    /// Host of the upstream service.
    #[serde(default = "crate::defaults::default_upstream_host")]
    #[ortho_config(default = crate::defaults::default_upstream_host())]
    pub upstream_host: String,
    /// The only upstream port that is bridged. Announcements for other ports
    /// are ignored.
    #[serde(default)]
    pub upstream_port: Option<u16>,
    /// Poll period of the built-in upstream probe in milliseconds.
    #[serde(default = "crate::defaults::default_probe_interval_ms")]
    #[ortho_config(default = crate::defaults::default_probe_interval_ms())]
    pub probe_interval_ms: u64,
    /// Serve a single session over standard input and output.
    #[serde(default)]
    #[ortho_config(default = false)]
    pub stdio: bool,
    /// Write interactive prompts to standard error in stdio mode.
    #[serde(default)]
    #[ortho_config(default = false)]
    pub prompt: bool,
    /// Tracing filter expression.
    #[serde(default = "crate::defaults::default_log_filter_string")]
    #[ortho_config(default = crate::defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Output format for structured logs.
    #[serde(default = "crate::defaults::default_log_format")]
    #[ortho_config(default = crate::defaults::default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_host: default_listen_host(),
            listen_port: None,
            port_offset: default_port_offset(),
            upstream_host: default_upstream_host(),
            upstream_port: None,
            probe_interval_ms: default_probe_interval_ms(),
            stdio: false,
            prompt: false,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Log filter expression handed to the tracing subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Selected log format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Port mapping policy implied by the listen port settings.
    #[must_use]
    pub const fn port_policy(&self) -> PortPolicy {
        match self.listen_port {
            Some(port) => PortPolicy::Fixed(port),
            None => PortPolicy::Offset(self.port_offset),
        }
    }

    /// Endpoint a connection server should bind for `port`.
    #[must_use]
    pub fn listen_endpoint(&self, port: u16) -> SocketEndpoint {
        SocketEndpoint::tcp(self.listen_host.clone(), port)
    }

    /// Configured upstream endpoint, when an upstream port is set.
    #[must_use]
    pub fn upstream_endpoint(&self) -> Option<SocketEndpoint> {
        self.upstream_port
            .map(|port| SocketEndpoint::tcp(self.upstream_host.clone(), port))
    }

    /// Returns `true` when an announced upstream port should be bridged.
    #[must_use]
    pub fn accepts_upstream_port(&self, port: u16) -> bool {
        self.upstream_port.is_none_or(|wanted| wanted == port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(PortPolicy::Fixed(7000), 7496, Some(7000))]
    #[case(PortPolicy::Offset(100), 7496, Some(7596))]
    #[case(PortPolicy::Offset(100), u16::MAX, None)]
    fn maps_upstream_ports(
        #[case] policy: PortPolicy,
        #[case] upstream: u16,
        #[case] expected: Option<u16>,
    ) {
        assert_eq!(policy.local_port(upstream), expected);
    }

    #[test]
    fn fixed_listen_port_selects_fixed_policy() {
        let config = Config {
            listen_port: Some(8123),
            ..Config::default()
        };
        assert_eq!(config.port_policy(), PortPolicy::Fixed(8123));
    }

    #[test]
    fn defaults_use_offset_policy_and_loopback() {
        let config = Config::default();
        assert_eq!(config.port_policy(), PortPolicy::Offset(DEFAULT_PORT_OFFSET));
        assert_eq!(
            config.listen_endpoint(7596),
            SocketEndpoint::tcp(DEFAULT_LISTEN_HOST, 7596)
        );
        assert!(config.upstream_endpoint().is_none());
    }

    #[rstest]
    #[case(None, 4001, true)]
    #[case(Some(7496), 7496, true)]
    #[case(Some(7496), 4001, false)]
    fn filters_announced_upstream_ports(
        #[case] wanted: Option<u16>,
        #[case] announced: u16,
        #[case] accepted: bool,
    ) {
        let config = Config {
            upstream_port: wanted,
            ..Config::default()
        };
        assert_eq!(config.accepts_upstream_port(announced), accepted);
    }
}
