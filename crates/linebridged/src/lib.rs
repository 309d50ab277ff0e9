//! Line-oriented command bridge.
//!
//! `linebridged` accepts text clients on TCP (or a single client on stdio),
//! reads one command per line with JSON arguments, dispatches it through a
//! reflective [`CommandTable`](linebridge_schema::CommandTable) and writes
//! events back as tab-separated lines. Each session owns a relay client that
//! forwards raw lines to an upstream service; connection servers follow that
//! upstream as it appears, disappears or moves.
//!
//! Startup follows a fixed order: load configuration through
//! [`ConfigLoader`], install telemetry, build the command table, then either
//! serve stdio or start [`Discovery`] and wait for a termination signal. SIGHUP
//! reports every server's upstream and live session count.
//! Every stage reports through a [`HealthReporter`].

mod bootstrap;
pub mod bridge;
mod health;
mod process;
pub mod server;
pub mod session;
mod telemetry;
mod transport;
pub mod upstream;

pub use bootstrap::{
    BootstrapError, Bridge, ConfigLoader, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    LaunchError, ShutdownError, ShutdownSignal, StopCause, SystemShutdownSignal, run_bridge,
    run_stdio,
};
pub use server::{ConnectionServer, Discovery, PortProbe, ServerError, UpstreamObserver};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::ListenerError;

#[cfg(test)]
mod tests;
