//! The bridge's built-in targets.
//!
//! Every session gets a [`ShellActions`] owning a [`RelayClient`]. Together
//! they expose help, pacing and settings commands and relay lines to the
//! upstream service the session's server currently points at.

mod events;
mod help;
mod model;
mod relay;
mod shell;

use std::sync::Arc;

use linebridge_schema::{CommandTable, DescribeError, InvocationError, Targets, TypeRegistry};

pub use self::events::BridgeEvent;
pub use self::model::{Mode, Settings, Tag};
pub use self::relay::RelayClient;
pub use self::shell::ShellActions;

use crate::session::{EventSink, SessionEvent, SessionFactory, SessionWiring};

const BRIDGE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bridge");

/// Builds the command table for the built-in targets.
///
/// # Errors
///
/// Returns [`DescribeError`] when a declared type cannot be described.
pub fn command_table(registry: Arc<TypeRegistry>) -> Result<CommandTable, DescribeError> {
    CommandTable::builder(registry)
        .source::<ShellActions>()
        .source::<RelayClient>()
        .events::<BridgeEvent>()
        .events::<SessionEvent>()
        .build()
}

/// Creates [`ShellActions`] targets for new sessions.
#[derive(Debug, Clone)]
pub struct BridgeFactory {
    table: Arc<CommandTable>,
}

impl BridgeFactory {
    /// Creates a factory serving `table`.
    #[must_use]
    pub const fn new(table: Arc<CommandTable>) -> Self {
        Self { table }
    }
}

impl SessionFactory for BridgeFactory {
    fn table(&self) -> Arc<CommandTable> {
        Arc::clone(&self.table)
    }

    fn targets(&self, wiring: SessionWiring) -> Box<dyn Targets> {
        let SessionWiring {
            sink,
            control,
            upstream,
        } = wiring;
        let relay = RelayClient::new(upstream, sink.clone());
        Box::new(ShellActions::new(self.table(), sink, control, relay))
    }
}

fn emit(sink: &EventSink, event: BridgeEvent) -> Result<(), InvocationError> {
    sink.emit(event)
        .map_err(|error| InvocationError::failed(format!("client write failed: {error}")))
}
