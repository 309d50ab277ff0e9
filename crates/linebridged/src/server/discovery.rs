//! One connection server per discovered upstream.

use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;
use linebridge_config::{Config, PortPolicy, SocketEndpoint};
use tracing::{debug, warn};

use super::{ConnectionServer, SERVER_TARGET, ServerError};
use crate::health::HealthReporter;
use crate::session::SessionFactory;

/// Receives upstream availability changes.
#[cfg_attr(test, mockall::automock)]
pub trait UpstreamObserver: Send + Sync {
    /// An upstream started accepting connections at `host:port`.
    fn upstream_opened(&self, host: &str, port: u16);

    /// The upstream on `port` stopped accepting connections.
    fn upstream_closed(&self, port: u16);
}

/// Starts, rebinds and stops connection servers as upstreams come and go.
///
/// Under [`PortPolicy::Offset`] each upstream port gets its own server on
/// `upstream + offset`, removed when the upstream closes. Under
/// [`PortPolicy::Fixed`] a single server is started by
/// [`Discovery::initialize`] and only ever rebound.
pub struct Discovery {
    config: Config,
    factory: Arc<dyn SessionFactory>,
    reporter: Arc<dyn HealthReporter>,
    servers: DashMap<u16, ConnectionServer>,
}

impl Discovery {
    /// Creates discovery with no servers running.
    #[must_use]
    pub fn new(
        config: Config,
        factory: Arc<dyn SessionFactory>,
        reporter: Arc<dyn HealthReporter>,
    ) -> Self {
        Self {
            config,
            factory,
            reporter,
            servers: DashMap::new(),
        }
    }

    /// Starts the fixed-port server, pointed at the configured upstream.
    /// Does nothing under the offset policy.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the fixed port cannot be served.
    pub fn initialize(&self) -> Result<(), ServerError> {
        let PortPolicy::Fixed(port) = self.config.port_policy() else {
            return Ok(());
        };
        let server = self
            .servers
            .entry(port)
            .or_try_insert_with(|| self.start_server(port))?;
        server.set_upstream(self.config.upstream_endpoint());
        Ok(())
    }

    /// Stops every server.
    pub fn shutdown(&self) {
        let ports: Vec<u16> = self.servers.iter().map(|entry| *entry.key()).collect();
        for port in ports {
            if let Some((_, server)) = self.servers.remove(&port) {
                self.stop_server(port, &server);
            }
        }
    }

    /// Configured local ports that currently have a server, sorted.
    #[must_use]
    pub fn ports(&self) -> Vec<u16> {
        let mut ports: Vec<u16> = self.servers.iter().map(|entry| *entry.key()).collect();
        ports.sort_unstable();
        ports
    }

    /// Bound address of the server registered under `port`.
    #[must_use]
    pub fn local_addr(&self, port: u16) -> Option<SocketAddr> {
        self.servers.get(&port).map(|server| server.local_addr())
    }

    /// Upstream the server under `port` currently relays to.
    #[must_use]
    pub fn upstream_of(&self, port: u16) -> Option<SocketEndpoint> {
        self.servers.get(&port).and_then(|server| server.upstream())
    }

    /// Reports every server's upstream and live session count.
    pub fn report_status(&self) {
        for entry in &self.servers {
            let upstream = entry.upstream();
            self.reporter
                .server_status(*entry.key(), upstream.as_ref(), entry.live_sessions());
        }
    }

    fn start_server(&self, port: u16) -> Result<ConnectionServer, ServerError> {
        let server =
            ConnectionServer::bind(&self.config.listen_endpoint(port), Arc::clone(&self.factory))?;
        server.start()?;
        self.reporter.server_started(port, server.local_addr());
        Ok(server)
    }

    fn stop_server(&self, port: u16, server: &ConnectionServer) {
        match server.stop() {
            Ok(()) => self.reporter.server_stopped(port),
            Err(error) => self.reporter.server_failed(port, &error),
        }
    }
}

impl UpstreamObserver for Discovery {
    fn upstream_opened(&self, host: &str, port: u16) {
        if !self.config.accepts_upstream_port(port) {
            debug!(target: SERVER_TARGET, port, "ignoring upstream on unexpected port");
            return;
        }
        let policy = self.config.port_policy();
        let Some(local_port) = policy.local_port(port) else {
            let offset = match policy {
                PortPolicy::Offset(offset) => offset,
                PortPolicy::Fixed(_) => 0,
            };
            let error = ServerError::PortOverflow {
                upstream_port: port,
                offset,
            };
            warn!(target: SERVER_TARGET, %error, "cannot bridge upstream");
            return;
        };
        let upstream = SocketEndpoint::tcp(host, port);
        match self
            .servers
            .entry(local_port)
            .or_try_insert_with(|| self.start_server(local_port))
        {
            Ok(server) => {
                server.set_upstream(Some(upstream.clone()));
                self.reporter.upstream_opened(&upstream, local_port);
            }
            Err(error) => self.reporter.server_failed(local_port, &error),
        }
    }

    fn upstream_closed(&self, port: u16) {
        if !self.config.accepts_upstream_port(port) {
            return;
        }
        self.reporter.upstream_closed(port);
        let policy = self.config.port_policy();
        if policy.is_fixed() {
            debug!(target: SERVER_TARGET, port, "fixed-port server kept");
            return;
        }
        let Some(local_port) = policy.local_port(port) else {
            return;
        };
        if let Some((_, server)) = self.servers.remove(&local_port) {
            self.stop_server(local_port, &server);
        }
    }
}
