//! Process entry point: stdio mode or discovery-driven servers until a
//! termination signal arrives.

mod errors;
pub(crate) mod launch;
pub(crate) mod shutdown;

pub use errors::LaunchError;
pub use launch::{run_bridge, run_stdio};
pub use shutdown::{ShutdownError, ShutdownSignal, StopCause, SystemShutdownSignal};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
