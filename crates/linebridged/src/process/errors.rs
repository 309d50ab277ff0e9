//! Error surface of the process entry point.

use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::server::ServerError;
use crate::session::SessionError;

use super::shutdown::ShutdownError;

/// Errors that stop the bridge process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrap failed.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// The fixed-port server could not be started.
    #[error("failed to start connection server: {0}")]
    Server(#[from] ServerError),
    /// Waiting for a termination signal failed.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
    /// The stdio session failed.
    #[error("stdio session failed: {0}")]
    Session(#[from] SessionError),
}
