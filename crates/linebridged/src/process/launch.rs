//! Launch sequence shared by the binary and the behaviour tests.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};
use crate::bootstrap::{Bridge, ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::bridge::BridgeFactory;
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::server::{Discovery, PortProbe, UpstreamObserver};
use crate::session::{EventSink, Session, SessionControl, SessionError, SessionFactory, SessionWiring};
use crate::upstream::UpstreamSlot;

/// Runs the bridge with the system configuration loader and signal
/// handling.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap, serving or signal handling fails.
pub fn run_bridge() -> Result<(), LaunchError> {
    run_bridge_with(LaunchPlan {
        services: ServiceDeps {
            loader: SystemConfigLoader,
            reporter: Arc::new(StructuredHealthReporter::new()),
        },
        shutdown: SystemShutdownSignal,
    })
}

pub(crate) struct ServiceDeps<L> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
}

pub(crate) struct LaunchPlan<L, S> {
    pub(crate) services: ServiceDeps<L>,
    pub(crate) shutdown: S,
}

pub(crate) fn run_bridge_with<L, S>(plan: LaunchPlan<L, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
{
    let LaunchPlan { services, shutdown } = plan;
    let ServiceDeps { loader, reporter } = services;
    let bridge = bootstrap_with(&loader, reporter)?;

    if bridge.config().stdio {
        info!(target: PROCESS_TARGET, "serving a single session on stdio");
        let stdin = io::stdin().lock();
        return Ok(run_stdio(&bridge, stdin, io::stdout())?);
    }
    serve(&bridge, &shutdown)
}

/// Serves one session over the given streams, relaying to the configured
/// upstream. The prompt, when enabled, goes to stderr.
///
/// # Errors
///
/// Returns [`SessionError`] when `input` or `output` fails.
pub fn run_stdio<R, W>(bridge: &Bridge, input: R, output: W) -> Result<(), SessionError>
where
    R: BufRead,
    W: Write + Send + 'static,
{
    let factory = BridgeFactory::new(bridge.table());
    let table = factory.table();
    let sink = EventSink::new(output, Arc::clone(table.registry()));
    let control = Arc::new(SessionControl::default());
    let targets = factory.targets(SessionWiring {
        sink: sink.clone(),
        control: Arc::clone(&control),
        upstream: Arc::new(UpstreamSlot::new(bridge.config().upstream_endpoint())),
    });
    let session = Session::new(input, table, targets, sink, control);
    if bridge.config().prompt {
        session.with_prompt(io::stderr()).run()
    } else {
        session.run()
    }
}

fn serve<S: ShutdownSignal>(bridge: &Bridge, shutdown: &S) -> Result<(), LaunchError> {
    let config = bridge.config();
    let factory: Arc<dyn SessionFactory> = Arc::new(BridgeFactory::new(bridge.table()));
    let discovery = Arc::new(Discovery::new(config.clone(), factory, bridge.reporter()));
    discovery.initialize()?;

    let observer: Arc<dyn UpstreamObserver> = discovery.clone();
    let probe = config.upstream_endpoint().map(|upstream| {
        PortProbe::spawn(
            upstream,
            Duration::from_millis(config.probe_interval_ms),
            observer,
        )
    });
    info!(
        target: PROCESS_TARGET,
        policy = ?config.port_policy(),
        probing = probe.is_some(),
        "bridge ready"
    );

    let waited = shutdown.wait(&|| discovery.report_status());
    if let Some(probe) = probe {
        probe.stop();
    }
    discovery.shutdown();
    let cause = waited?;
    info!(target: PROCESS_TARGET, ?cause, "shutdown sequence completed");
    Ok(())
}
