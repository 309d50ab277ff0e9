//! Connection from a session to the upstream service.
//!
//! Each session owns at most one [`UpstreamLink`]. Lines received from the
//! upstream are read on one thread and handed over a channel to a drain
//! thread, which delivers them to the session's sink. Closing a link shuts
//! the socket down and joins both threads before returning.

use std::io::{self, BufReader, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Sender, unbounded};
use linebridge_config::SocketEndpoint;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::session::LineReader;

const UPSTREAM_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::upstream");
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Upstream address shared between a server and one of its sessions.
///
/// The server rewrites it when the upstream moves; the session reads it
/// whenever it opens a link.
#[derive(Debug, Default)]
pub struct UpstreamSlot {
    endpoint: RwLock<Option<SocketEndpoint>>,
}

impl UpstreamSlot {
    /// Creates a slot holding `endpoint`.
    #[must_use]
    pub const fn new(endpoint: Option<SocketEndpoint>) -> Self {
        Self {
            endpoint: RwLock::new(endpoint),
        }
    }

    /// Replaces the address.
    pub fn set(&self, endpoint: Option<SocketEndpoint>) {
        *self.endpoint.write().unwrap_or_else(PoisonError::into_inner) = endpoint;
    }

    /// Current address, if any.
    #[must_use]
    pub fn get(&self) -> Option<SocketEndpoint> {
        self.endpoint
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Something that happened on an upstream connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamMessage {
    /// A line arrived.
    Line(String),
    /// Reading failed; the connection is unusable.
    Failed(String),
    /// The connection ended. Always the last message.
    Closed,
}

/// Errors opening or using an upstream connection.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The address did not resolve.
    #[error("failed to resolve upstream {endpoint}: {source}")]
    Resolve {
        /// Upstream address.
        endpoint: SocketEndpoint,
        /// Resolver error.
        #[source]
        source: io::Error,
    },
    /// No connection could be established.
    #[error("failed to connect to upstream {endpoint}: {source}")]
    Connect {
        /// Upstream address.
        endpoint: SocketEndpoint,
        /// Last connect error.
        #[source]
        source: io::Error,
    },
    /// Writing to the upstream failed.
    #[error("failed to send to upstream {endpoint}: {source}")]
    Send {
        /// Upstream address.
        endpoint: SocketEndpoint,
        /// Write error.
        #[source]
        source: io::Error,
    },
}

/// Open connection to the upstream service.
pub struct UpstreamLink {
    endpoint: SocketEndpoint,
    writer: TcpStream,
    connected: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
    drain: Option<JoinHandle<()>>,
}

impl UpstreamLink {
    /// Connects to `endpoint` and starts delivering received lines to
    /// `deliver` on a dedicated thread.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] when the endpoint cannot be reached.
    pub fn open<F>(endpoint: &SocketEndpoint, deliver: F) -> Result<Self, UpstreamError>
    where
        F: FnMut(UpstreamMessage) + Send + 'static,
    {
        let stream = connect(endpoint)?;
        let reader_stream = stream.try_clone().map_err(|source| UpstreamError::Connect {
            endpoint: endpoint.clone(),
            source,
        })?;
        let connected = Arc::new(AtomicBool::new(true));
        let (sender, receiver) = unbounded();

        let reader = {
            let connected = Arc::clone(&connected);
            let endpoint = endpoint.clone();
            thread::spawn(move || read_upstream(reader_stream, &sender, &connected, &endpoint))
        };
        let drain = thread::spawn(move || {
            let mut deliver = deliver;
            for message in receiver {
                let last = message == UpstreamMessage::Closed;
                deliver(message);
                if last {
                    break;
                }
            }
        });

        info!(target: UPSTREAM_TARGET, %endpoint, "upstream link opened");
        Ok(Self {
            endpoint: endpoint.clone(),
            writer: stream,
            connected,
            reader: Some(reader),
            drain: Some(drain),
        })
    }

    /// Address this link is connected to.
    #[must_use]
    pub const fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }

    /// Whether the upstream is still connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Writes one line to the upstream.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Send`] when the write fails.
    pub fn send(&mut self, line: &str) -> Result<(), UpstreamError> {
        self.writer
            .write_all(line.as_bytes())
            .and_then(|()| self.writer.write_all(b"\n"))
            .and_then(|()| self.writer.flush())
            .map_err(|source| UpstreamError::Send {
                endpoint: self.endpoint.clone(),
                source,
            })
    }

    /// Shuts the connection down and waits for its threads. The drain
    /// thread delivers [`UpstreamMessage::Closed`] before this returns.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.reader.is_none() && self.drain.is_none() {
            return;
        }
        if let Err(error) = self.writer.shutdown(Shutdown::Both) {
            debug!(target: UPSTREAM_TARGET, %error, "upstream already shut down");
        }
        for handle in [self.reader.take(), self.drain.take()].into_iter().flatten() {
            if handle.join().is_err() {
                warn!(target: UPSTREAM_TARGET, endpoint = %self.endpoint, "upstream thread panicked");
            }
        }
        self.connected.store(false, Ordering::SeqCst);
        info!(target: UPSTREAM_TARGET, endpoint = %self.endpoint, "upstream link closed");
    }
}

impl Drop for UpstreamLink {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn connect(endpoint: &SocketEndpoint) -> Result<TcpStream, UpstreamError> {
    let addrs = (endpoint.host.as_str(), endpoint.port)
        .to_socket_addrs()
        .map_err(|source| UpstreamError::Resolve {
            endpoint: endpoint.clone(),
            source,
        })?;
    let mut last_error = io::Error::new(io::ErrorKind::NotFound, "no addresses resolved");
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
            Ok(stream) => return Ok(stream),
            Err(error) => last_error = error,
        }
    }
    Err(UpstreamError::Connect {
        endpoint: endpoint.clone(),
        source: last_error,
    })
}

fn read_upstream(
    stream: TcpStream,
    sender: &Sender<UpstreamMessage>,
    connected: &AtomicBool,
    endpoint: &SocketEndpoint,
) {
    let mut reader = LineReader::new(BufReader::new(stream));
    loop {
        match reader.read_line() {
            Ok(Some(line)) => {
                if sender.send(UpstreamMessage::Line(line)).is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(error) => {
                debug!(target: UPSTREAM_TARGET, %endpoint, %error, "upstream read failed");
                sender.send(UpstreamMessage::Failed(error.to_string())).ok();
                break;
            }
        }
    }
    connected.store(false, Ordering::SeqCst);
    if sender.send(UpstreamMessage::Closed).is_err() {
        debug!(target: UPSTREAM_TARGET, %endpoint, "upstream drain already gone");
    }
}
