//! Behavioural tests for the bridge bootstrap sequence.

use std::cell::RefCell;
use std::sync::Arc;

use linebridge_config::Config;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::bootstrap::{BootstrapError, Bridge, ConfigLoader, StaticConfigLoader, bootstrap_with};

use super::support::{FailingConfigLoader, HealthEvent, RecordingHealthReporter};

type StepResult = Result<(), String>;

struct BootstrapWorld {
    loader: Box<dyn ConfigLoader>,
    reporter: Arc<RecordingHealthReporter>,
    outcome: Option<Result<Bridge, BootstrapError>>,
}

impl BootstrapWorld {
    fn new() -> Self {
        Self {
            loader: Box::new(StaticConfigLoader::new(Config::default())),
            reporter: Arc::new(RecordingHealthReporter::default()),
            outcome: None,
        }
    }

    fn bridge(&self) -> Result<&Bridge, String> {
        match &self.outcome {
            Some(Ok(bridge)) => Ok(bridge),
            Some(Err(error)) => Err(format!("bootstrap failed: {error}")),
            None => Err("bootstrap has not run".to_owned()),
        }
    }
}

#[fixture]
fn world() -> RefCell<BootstrapWorld> {
    RefCell::new(BootstrapWorld::new())
}

#[given("a healthy configuration loader")]
fn given_healthy_loader(world: &RefCell<BootstrapWorld>) {
    world.borrow_mut().loader = Box::new(StaticConfigLoader::new(Config::default()));
}

#[given("a failing configuration loader")]
fn given_failing_loader(world: &RefCell<BootstrapWorld>) {
    world.borrow_mut().loader = Box::new(FailingConfigLoader);
}

#[when("the bridge bootstrap runs")]
fn when_bootstrap_runs(world: &RefCell<BootstrapWorld>) {
    let mut world = world.borrow_mut();
    let reporter = Arc::clone(&world.reporter);
    let outcome = bootstrap_with(world.loader.as_ref(), reporter);
    world.outcome = Some(outcome);
}

#[then("bootstrap succeeds")]
fn then_bootstrap_succeeds(world: &RefCell<BootstrapWorld>) -> StepResult {
    world.borrow().bridge().map(|_| ())
}

#[then("bootstrap fails with a configuration error")]
fn then_bootstrap_fails(world: &RefCell<BootstrapWorld>) -> StepResult {
    match &world.borrow().outcome {
        Some(Err(BootstrapError::Configuration { .. })) => Ok(()),
        Some(Err(other)) => Err(format!("unexpected bootstrap error: {other}")),
        Some(Ok(_)) => Err("bootstrap succeeded unexpectedly".to_owned()),
        None => Err("bootstrap has not run".to_owned()),
    }
}

#[then("the command table offers {command}")]
fn then_table_offers(world: &RefCell<BootstrapWorld>, command: String) -> StepResult {
    let world = world.borrow();
    let table = world.bridge()?.table();
    table
        .operation(&command)
        .map(|_| ())
        .ok_or_else(|| format!("missing command {command}"))
}

#[then("the reporter recorded bootstrap start")]
fn then_reporter_start(world: &RefCell<BootstrapWorld>) {
    assert!(
        world
            .borrow()
            .reporter
            .events()
            .contains(&HealthEvent::BootstrapStarting),
        "bootstrap start event missing"
    );
}

#[then("the reporter recorded bootstrap success")]
fn then_reporter_success(world: &RefCell<BootstrapWorld>) {
    assert!(
        world
            .borrow()
            .reporter
            .events()
            .contains(&HealthEvent::BootstrapSucceeded),
        "bootstrap success event missing"
    );
}

#[then("the reporter recorded bootstrap failure")]
fn then_reporter_failure(world: &RefCell<BootstrapWorld>) {
    let events = world.borrow().reporter.events();
    let failed = events
        .iter()
        .any(|event| matches!(event, HealthEvent::BootstrapFailed(_)));
    assert!(failed, "bootstrap failure event missing: {events:?}");
}

#[scenario(
    path = "tests/features/bridge_bootstrap.feature",
    name = "Bootstrap builds the command table"
)]
fn bootstrap_succeeds(world: RefCell<BootstrapWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/bridge_bootstrap.feature",
    name = "Bootstrap reports configuration failures"
)]
fn bootstrap_fails(world: RefCell<BootstrapWorld>) {
    drop(world);
}
