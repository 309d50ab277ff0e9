use crate::logging::LogFormat;

/// Loopback address every connection server binds unless configured.
pub const DEFAULT_LISTEN_HOST: &str = "127.0.0.1";

/// Host assumed for upstream endpoints announced without an address.
pub const DEFAULT_UPSTREAM_HOST: &str = "127.0.0.1";

/// Distance between an upstream port and the local port bridging it.
pub const DEFAULT_PORT_OFFSET: u16 = 100;

/// Poll period of the built-in upstream probe.
pub const DEFAULT_PROBE_INTERVAL_MS: u64 = 1_000;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the binaries.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Owned listen host used by serde and the configuration layers.
#[must_use]
pub fn default_listen_host() -> String {
    DEFAULT_LISTEN_HOST.to_owned()
}

/// Owned upstream host used by serde and the configuration layers.
#[must_use]
pub fn default_upstream_host() -> String {
    DEFAULT_UPSTREAM_HOST.to_owned()
}

/// Port offset applied when no fixed listen port is configured.
#[must_use]
pub const fn default_port_offset() -> u16 {
    DEFAULT_PORT_OFFSET
}

/// Probe interval in milliseconds.
#[must_use]
pub const fn default_probe_interval_ms() -> u64 {
    DEFAULT_PROBE_INTERVAL_MS
}
