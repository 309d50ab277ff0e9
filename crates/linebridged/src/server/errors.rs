//! Errors raised by connection servers.

use thiserror::Error;

use crate::transport::ListenerError;

/// Failures starting or stopping a [`super::ConnectionServer`].
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be set up.
    #[error(transparent)]
    Listener(#[from] ListenerError),
    /// `start` was called twice.
    #[error("server on port {port} is already started")]
    AlreadyStarted {
        /// Local port.
        port: u16,
    },
    /// A stopped server cannot be restarted.
    #[error("server on port {port} is stopped")]
    Stopped {
        /// Local port.
        port: u16,
    },
    /// The upstream port has no local port under the configured policy.
    #[error("upstream port {upstream_port} plus offset {offset} overflows")]
    PortOverflow {
        /// Announced upstream port.
        upstream_port: u16,
        /// Configured offset.
        offset: u16,
    },
}
