//! Helpers shared by unit and behaviour tests.

use std::ffi::OsString;
use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use linebridge_config::{Config, SocketEndpoint};
use ortho_config::{OrthoConfig, OrthoError};

use crate::bootstrap::{BootstrapError, ConfigLoader};
use crate::health::HealthReporter;
use crate::server::ServerError;

/// In-memory writer whose contents stay readable after it is moved into a
/// sink.
#[derive(Clone, Default)]
pub(crate) struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub(crate) fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub(crate) fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub(crate) const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Line oriented TCP client with a read timeout.
pub(crate) struct TestClient {
    writer: TcpStream,
    reader: BufReader<TcpStream>,
}

impl TestClient {
    pub(crate) fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).expect("connect to bridge");
        stream
            .set_read_timeout(Some(READ_TIMEOUT))
            .expect("set read timeout");
        let reader = BufReader::new(stream.try_clone().expect("clone stream"));
        Self {
            writer: stream,
            reader,
        }
    }

    pub(crate) fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .expect("send line");
    }

    /// Next line without its newline, or `None` once the server closed the
    /// connection.
    pub(crate) fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => None,
            Err(error) if error.kind() == io::ErrorKind::ConnectionReset => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_owned()),
            Err(error) => panic!("read line: {error}"),
        }
    }

    pub(crate) fn expect_line(&mut self) -> String {
        self.read_line().expect("server closed the connection")
    }

    /// Sends `line` and reads replies until `end` (inclusive).
    pub(crate) fn request_until(&mut self, line: &str, end: &str) -> Vec<String> {
        self.send(line);
        let mut replies = Vec::new();
        loop {
            let reply = self.expect_line();
            let done = reply.starts_with(end);
            replies.push(reply);
            if done {
                return replies;
            }
        }
    }
}

/// Plain TCP peer standing in for an upstream service.
pub(crate) struct FakeUpstream {
    listener: TcpListener,
}

impl FakeUpstream {
    pub(crate) fn bind() -> Self {
        Self {
            listener: TcpListener::bind("127.0.0.1:0").expect("bind upstream"),
        }
    }

    pub(crate) fn port(&self) -> u16 {
        self.listener.local_addr().expect("upstream addr").port()
    }

    pub(crate) fn accept(&self) -> UpstreamPeer {
        let (stream, _) = self.listener.accept().expect("accept relay");
        stream
            .set_read_timeout(Some(READ_TIMEOUT))
            .expect("set read timeout");
        let reader = BufReader::new(stream.try_clone().expect("clone stream"));
        UpstreamPeer {
            writer: stream,
            reader,
        }
    }
}

/// Accepted upstream connection.
pub(crate) struct UpstreamPeer {
    writer: TcpStream,
    reader: BufReader<TcpStream>,
}

impl UpstreamPeer {
    pub(crate) fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .expect("upstream send");
    }

    pub(crate) fn read_line(&mut self) -> String {
        let mut line = String::new();
        self.reader.read_line(&mut line).expect("upstream read");
        line.trim_end_matches(['\r', '\n']).to_owned()
    }

    pub(crate) fn close(self) {
        self.writer
            .shutdown(std::net::Shutdown::Both)
            .expect("shutdown upstream peer");
    }
}

/// A port that was free a moment ago.
pub(crate) fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .expect("probe free port")
        .port()
}

/// Loader that fails the way a bad command line does.
pub(crate) struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("linebridged"),
            OsString::from("--port-offset"),
            OsString::from("not-a-number"),
        ];
        Config::load_from_iter(args)
    }
}

/// Lifecycle events captured by [`RecordingHealthReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    ServerStarted { port: u16, local_addr: SocketAddr },
    ServerStopped(u16),
    ServerFailed(u16),
    ServerStatus { port: u16, upstream: Option<SocketEndpoint>, live_sessions: usize },
    UpstreamOpened { upstream: SocketEndpoint, local_port: u16 },
    UpstreamClosed(u16),
}

/// Reporter that keeps every event for later assertions.
#[derive(Debug, Default)]
pub(crate) struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    pub(crate) fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    /// Address of the first server reported as started.
    pub(crate) fn started_addr(&self) -> Option<SocketAddr> {
        self.events().into_iter().find_map(|event| match event {
            HealthEvent::ServerStarted { local_addr, .. } => Some(local_addr),
            _ => None,
        })
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn server_started(&self, port: u16, local_addr: SocketAddr) {
        self.record(HealthEvent::ServerStarted { port, local_addr });
    }

    fn server_stopped(&self, port: u16) {
        self.record(HealthEvent::ServerStopped(port));
    }

    fn server_failed(&self, port: u16, _error: &ServerError) {
        self.record(HealthEvent::ServerFailed(port));
    }

    fn server_status(&self, port: u16, upstream: Option<&SocketEndpoint>, live_sessions: usize) {
        self.record(HealthEvent::ServerStatus {
            port,
            upstream: upstream.cloned(),
            live_sessions,
        });
    }

    fn upstream_opened(&self, upstream: &SocketEndpoint, local_port: u16) {
        self.record(HealthEvent::UpstreamOpened {
            upstream: upstream.clone(),
            local_port,
        });
    }

    fn upstream_closed(&self, upstream_port: u16) {
        self.record(HealthEvent::UpstreamClosed(upstream_port));
    }
}
