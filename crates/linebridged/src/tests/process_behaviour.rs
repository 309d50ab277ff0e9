//! Behavioural tests covering the bridge process lifecycle.

use std::cell::RefCell;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use linebridge_config::Config;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::bootstrap::StaticConfigLoader;
use crate::process::launch::{LaunchPlan, ServiceDeps, run_bridge_with};
use crate::process::{LaunchError, ShutdownError, ShutdownSignal, StopCause};

use super::support::{
    FakeUpstream, HealthEvent, RecordingHealthReporter, TestClient, UpstreamPeer,
};

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(25);

type StepResult = Result<(), String>;

/// Operator requests sent by the test instead of the operating system.
enum Trigger {
    Status,
    Stop,
}

struct TriggeredShutdown {
    trigger: Receiver<Trigger>,
}

impl ShutdownSignal for TriggeredShutdown {
    fn wait(&self, on_status: &dyn Fn()) -> Result<StopCause, ShutdownError> {
        while let Ok(Trigger::Status) = self.trigger.recv() {
            on_status();
        }
        Ok(StopCause::Released)
    }
}

struct ProcessWorld {
    config: Config,
    reporter: Arc<RecordingHealthReporter>,
    trigger: Option<Sender<Trigger>>,
    run: Option<JoinHandle<Result<(), LaunchError>>>,
    outcome: Option<Result<(), String>>,
    upstream: Option<FakeUpstream>,
    peer: Option<UpstreamPeer>,
    client: Option<TestClient>,
}

impl ProcessWorld {
    fn new() -> Self {
        Self {
            config: Config::default(),
            reporter: Arc::new(RecordingHealthReporter::default()),
            trigger: None,
            run: None,
            outcome: None,
            upstream: None,
            peer: None,
            client: None,
        }
    }

    fn start(&mut self) {
        let (trigger, signal) = unbounded();
        let plan = LaunchPlan {
            services: ServiceDeps {
                loader: StaticConfigLoader::new(self.config.clone()),
                reporter: self.reporter.clone(),
            },
            shutdown: TriggeredShutdown { trigger: signal },
        };
        self.trigger = Some(trigger);
        self.run = Some(thread::spawn(move || run_bridge_with(plan)));
    }

    fn wait_for_server(&self) -> Result<SocketAddr, String> {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        while Instant::now() < deadline {
            if let Some(addr) = self.reporter.started_addr() {
                return Ok(addr);
            }
            thread::sleep(POLL_INTERVAL);
        }
        Err(format!(
            "server never started: {:?}",
            self.reporter.events()
        ))
    }

    fn client(&mut self) -> Result<&mut TestClient, String> {
        self.client
            .as_mut()
            .ok_or_else(|| "no client connected".to_owned())
    }

    /// Accepts upstream connections until the relay announces itself with
    /// `greeting`; availability probes connect and hang up silently.
    fn accept_relay(&mut self, greeting: &str) -> StepResult {
        let upstream = self
            .upstream
            .as_ref()
            .ok_or_else(|| "no upstream service".to_owned())?;
        loop {
            let mut peer = upstream.accept();
            let line = peer.read_line();
            if line == greeting {
                self.peer = Some(peer);
                return Ok(());
            }
            if !line.is_empty() {
                return Err(format!("unexpected upstream line {line:?}"));
            }
        }
    }
}

#[fixture]
fn world() -> RefCell<ProcessWorld> {
    RefCell::new(ProcessWorld::new())
}

#[given("a bridge configured on an ephemeral fixed port")]
fn given_fixed_port(world: &RefCell<ProcessWorld>) {
    world.borrow_mut().config.listen_port = Some(0);
}

#[given("an upstream service the bridge points at")]
fn given_upstream(world: &RefCell<ProcessWorld>) {
    let mut world = world.borrow_mut();
    let upstream = FakeUpstream::bind();
    world.config.upstream_port = Some(upstream.port());
    world.config.probe_interval_ms = 60_000;
    world.upstream = Some(upstream);
}

#[when("the bridge starts")]
fn when_bridge_starts(world: &RefCell<ProcessWorld>) {
    world.borrow_mut().start();
}

#[when("the operator asks for status")]
fn when_status_requested(world: &RefCell<ProcessWorld>) -> StepResult {
    world
        .borrow()
        .trigger
        .as_ref()
        .ok_or_else(|| "bridge was not started".to_owned())?
        .send(Trigger::Status)
        .map_err(|error| error.to_string())
}

#[when("a client connects")]
fn when_client_connects(world: &RefCell<ProcessWorld>) -> StepResult {
    let addr = world.borrow().wait_for_server()?;
    world.borrow_mut().client = Some(TestClient::connect(addr));
    Ok(())
}

#[when("the client connects upstream and sends {line}")]
fn when_client_relays(world: &RefCell<ProcessWorld>, line: String) -> StepResult {
    let mut world = world.borrow_mut();
    let client = world.client()?;
    client.send("connect 5");
    let reply = client.expect_line();
    if !reply.starts_with("connected\t5\t") {
        return Err(format!("unexpected reply {reply:?}"));
    }
    client.send(&format!("send \"{line}\""));
    world.accept_relay(&line)
}

#[when("the upstream replies {line}")]
fn when_upstream_replies(world: &RefCell<ProcessWorld>, line: String) -> StepResult {
    world
        .borrow_mut()
        .peer
        .as_mut()
        .ok_or_else(|| "no relay connection".to_owned())?
        .send(&line);
    Ok(())
}

#[when("shutdown is triggered")]
fn when_shutdown_triggered(world: &RefCell<ProcessWorld>) {
    if let Some(trigger) = world.borrow_mut().trigger.take() {
        trigger.send(Trigger::Stop).ok();
    }
}

#[when("the bridge run completes")]
fn when_run_completes(world: &RefCell<ProcessWorld>) -> StepResult {
    let handle = world
        .borrow_mut()
        .run
        .take()
        .ok_or_else(|| "bridge was not started".to_owned())?;
    let outcome = handle
        .join()
        .map_err(|_| "bridge thread panicked".to_owned())?
        .map_err(|error| error.to_string());
    world.borrow_mut().outcome = Some(outcome);
    Ok(())
}

#[then("the connected client reads {line}")]
fn then_client_reads(world: &RefCell<ProcessWorld>, line: String) -> StepResult {
    let mut world = world.borrow_mut();
    let reply = world.client()?.expect_line();
    if reply == line.replace("\\t", "\t") {
        Ok(())
    } else {
        Err(format!("expected {line:?}, got {reply:?}"))
    }
}

#[then("asking isConnected answers {answer}")]
fn then_is_connected(world: &RefCell<ProcessWorld>, answer: String) -> StepResult {
    let mut world = world.borrow_mut();
    let client = world.client()?;
    client.send("isConnected");
    let reply = client.expect_line();
    if reply == format!("isConnected\t{answer}") {
        Ok(())
    } else {
        Err(format!("unexpected reply {reply:?}"))
    }
}

#[then("the bridge exits cleanly")]
fn then_exits_cleanly(world: &RefCell<ProcessWorld>) -> StepResult {
    match world.borrow().outcome.clone() {
        Some(Ok(())) => Ok(()),
        Some(Err(error)) => Err(format!("bridge failed: {error}")),
        None => Err("bridge run has not completed".to_owned()),
    }
}

#[then("the client was disconnected")]
fn then_client_disconnected(world: &RefCell<ProcessWorld>) -> StepResult {
    let mut world = world.borrow_mut();
    let client = world.client()?;
    while let Some(line) = client.read_line() {
        if !line.starts_with("connectionClosed") {
            return Err(format!("unexpected line after shutdown {line:?}"));
        }
    }
    Ok(())
}

#[then("the reporter recorded {count} live session on the fixed server")]
fn then_status_recorded(world: &RefCell<ProcessWorld>, count: usize) -> StepResult {
    let deadline = Instant::now() + WAIT_TIMEOUT;
    let reporter = Arc::clone(&world.borrow().reporter);
    while Instant::now() < deadline {
        let reported = reporter.events().into_iter().any(|event| {
            matches!(
                event,
                HealthEvent::ServerStatus { port: 0, live_sessions, .. } if live_sessions == count
            )
        });
        if reported {
            return Ok(());
        }
        thread::sleep(POLL_INTERVAL);
    }
    Err(format!("status missing: {:?}", reporter.events()))
}

#[then("the reporter recorded the server lifecycle")]
fn then_server_lifecycle(world: &RefCell<ProcessWorld>) {
    let events = world.borrow().reporter.events();
    let started = events
        .iter()
        .any(|event| matches!(event, HealthEvent::ServerStarted { port: 0, .. }));
    assert!(started, "server start missing: {events:?}");
    assert!(
        events.contains(&HealthEvent::ServerStopped(0)),
        "server stop missing: {events:?}"
    );
}

#[scenario(
    path = "tests/features/bridge_process.feature",
    name = "The bridge serves clients until shutdown"
)]
fn serves_until_shutdown(world: RefCell<ProcessWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/bridge_process.feature",
    name = "The bridge relays to its configured upstream"
)]
fn relays_to_configured_upstream(world: RefCell<ProcessWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/bridge_process.feature",
    name = "Status requests report live sessions without stopping"
)]
fn status_requests(world: RefCell<ProcessWorld>) {
    drop(world);
}
