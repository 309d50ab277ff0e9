//! Connection handling abstraction for the listener.

use std::net::TcpStream;

/// Handles accepted socket connections.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single connection until it ends. Implementations should
    /// avoid panicking.
    fn handle(&self, stream: TcpStream);
}
