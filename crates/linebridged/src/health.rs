//! Structured health reporting for bridge lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use linebridge_config::{Config, SocketEndpoint};

use crate::bootstrap::BootstrapError;
use crate::server::ServerError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer for lifecycle events that operators care about.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// A connection server started listening.
    fn server_started(&self, port: u16, local_addr: SocketAddr);

    /// A connection server stopped.
    fn server_stopped(&self, port: u16);

    /// A connection server could not be started or stopped cleanly.
    fn server_failed(&self, port: u16, error: &ServerError);

    /// Snapshot of one running server, sent when an operator asks.
    fn server_status(&self, port: u16, upstream: Option<&SocketEndpoint>, live_sessions: usize);

    /// An upstream became reachable and is bridged.
    fn upstream_opened(&self, upstream: &SocketEndpoint, local_port: u16);

    /// An upstream went away.
    fn upstream_closed(&self, upstream_port: u16);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn server_started(&self, port: u16, local_addr: SocketAddr) {
        (**self).server_started(port, local_addr);
    }

    fn server_stopped(&self, port: u16) {
        (**self).server_stopped(port);
    }

    fn server_failed(&self, port: u16, error: &ServerError) {
        (**self).server_failed(port, error);
    }

    fn server_status(&self, port: u16, upstream: Option<&SocketEndpoint>, live_sessions: usize) {
        (**self).server_status(port, upstream, live_sessions);
    }

    fn upstream_opened(&self, upstream: &SocketEndpoint, local_port: u16) {
        (**self).upstream_opened(upstream, local_port);
    }

    fn upstream_closed(&self, upstream_port: u16) {
        (**self).upstream_closed(upstream_port);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting bridge bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            port_policy = ?config.port_policy(),
            upstream = ?config.upstream_endpoint().map(|endpoint| endpoint.to_string()),
            stdio = config.stdio,
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            "bridge bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "bridge bootstrap failed"
        );
    }

    fn server_started(&self, port: u16, local_addr: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_started",
            port,
            local_addr = %local_addr,
            "connection server listening"
        );
    }

    fn server_stopped(&self, port: u16) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_stopped",
            port,
            "connection server stopped"
        );
    }

    fn server_failed(&self, port: u16, error: &ServerError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "server_failed",
            port,
            error = %error,
            "connection server failed"
        );
    }

    fn server_status(&self, port: u16, upstream: Option<&SocketEndpoint>, live_sessions: usize) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_status",
            port,
            upstream = ?upstream.map(ToString::to_string),
            live_sessions,
            "connection server status"
        );
    }

    fn upstream_opened(&self, upstream: &SocketEndpoint, local_port: u16) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "upstream_opened",
            upstream = %upstream,
            local_port,
            "upstream bridged"
        );
    }

    fn upstream_closed(&self, upstream_port: u16) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "upstream_closed",
            upstream_port,
            "upstream closed"
        );
    }
}
