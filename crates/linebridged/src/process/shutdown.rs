//! Operator signals: SIGHUP asks for a status report, the others stop the
//! bridge.

use std::io;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::{debug, info};

use super::PROCESS_TARGET;

/// Why the bridge stopped waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    /// A termination signal arrived.
    Signal(&'static str),
    /// The embedding code released the wait.
    Released,
}

/// Blocks the main thread while servers run.
pub trait ShutdownSignal: Send + Sync {
    /// Returns once the bridge should stop. `on_status` runs for every
    /// status request received in the meantime.
    fn wait(&self, on_status: &dyn Fn()) -> Result<StopCause, ShutdownError>;
}

/// Errors reported by signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Stops on SIGTERM, SIGINT or SIGQUIT and reports status on SIGHUP.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShutdownSignal;

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self, on_status: &dyn Fn()) -> Result<StopCause, ShutdownError> {
        let mut signals = Signals::new([SIGHUP, SIGTERM, SIGINT, SIGQUIT])
            .map_err(|source| ShutdownError::Install { source })?;
        for signal in signals.forever() {
            if signal == SIGHUP {
                debug!(target: PROCESS_TARGET, "status requested");
                on_status();
                continue;
            }
            let name = signal_name(signal);
            info!(target: PROCESS_TARGET, signal = name, "stopping bridge");
            return Ok(StopCause::Signal(name));
        }
        Ok(StopCause::Released)
    }
}

const fn signal_name(signal: i32) -> &'static str {
    match signal {
        SIGTERM => "SIGTERM",
        SIGINT => "SIGINT",
        SIGQUIT => "SIGQUIT",
        _ => "unknown",
    }
}
