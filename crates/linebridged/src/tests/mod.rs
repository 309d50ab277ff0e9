//! Behaviour suites for the bridge daemon.

mod bootstrap_behaviour;
mod process_behaviour;
pub(crate) mod support;
