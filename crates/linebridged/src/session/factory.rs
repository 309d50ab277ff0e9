//! Creation of per-session targets.

use std::sync::Arc;

use linebridge_schema::{CommandTable, Targets};

use super::{EventSink, SessionControl};
use crate::upstream::UpstreamSlot;

/// Shared handles a new session's targets are built from.
#[derive(Debug)]
pub struct SessionWiring {
    /// Output shared with the session loop.
    pub sink: EventSink,
    /// Exit flag shared with the session loop and its owner.
    pub control: Arc<SessionControl>,
    /// Upstream address, rewritten when the upstream moves.
    pub upstream: Arc<UpstreamSlot>,
}

/// Supplies the command table and fresh targets for each session.
pub trait SessionFactory: Send + Sync + 'static {
    /// Table every session dispatches through.
    fn table(&self) -> Arc<CommandTable>;

    /// Builds the targets for one session.
    fn targets(&self, wiring: SessionWiring) -> Box<dyn Targets>;
}
