//! Connection servers and upstream discovery.
//!
//! A [`ConnectionServer`] listens on one local port and runs a
//! [`Session`](crate::session::Session) per accepted client. It remembers the
//! upstream address its sessions should relay to and rewrites it in every
//! live session when the upstream moves. [`Discovery`] keeps one server per
//! upstream, and [`PortProbe`] watches an upstream port and reports when it
//! opens or closes.

mod discovery;
mod errors;
mod probe;

use std::io::BufReader;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use dashmap::DashMap;
use linebridge_config::SocketEndpoint;
use tracing::{debug, info, warn};

pub use self::discovery::{Discovery, UpstreamObserver};
pub use self::errors::ServerError;
pub use self::probe::PortProbe;

#[cfg(test)]
pub(crate) use self::discovery::MockUpstreamObserver;

use crate::session::{EventSink, Session, SessionControl, SessionFactory, SessionWiring};
use crate::transport::{ConnectionHandler, ListenerHandle, SocketListener};
use crate::upstream::UpstreamSlot;

const SERVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::server");

type SessionId = u64;

/// What the server keeps about a live session.
struct SessionHandle {
    stream: TcpStream,
    control: Arc<SessionControl>,
    upstream: Arc<UpstreamSlot>,
}

struct ServerState {
    factory: Arc<dyn SessionFactory>,
    upstream: RwLock<Option<SocketEndpoint>>,
    sessions: DashMap<SessionId, SessionHandle>,
    next_id: AtomicU64,
    stopping: AtomicBool,
}

/// Accepts clients on one local port and serves each with its own session.
pub struct ConnectionServer {
    local_addr: SocketAddr,
    state: Arc<ServerState>,
    listener: Mutex<Option<SocketListener>>,
    handle: Mutex<Option<ListenerHandle>>,
}

impl ConnectionServer {
    /// Binds `endpoint` without accepting yet.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Listener`] when the port cannot be bound.
    pub fn bind(
        endpoint: &SocketEndpoint,
        factory: Arc<dyn SessionFactory>,
    ) -> Result<Self, ServerError> {
        let listener = SocketListener::bind(endpoint)?;
        Ok(Self {
            local_addr: listener.local_addr(),
            state: Arc::new(ServerState {
                factory,
                upstream: RwLock::new(None),
                sessions: DashMap::new(),
                next_id: AtomicU64::new(1),
                stopping: AtomicBool::new(false),
            }),
            listener: Mutex::new(Some(listener)),
            handle: Mutex::new(None),
        })
    }

    /// Starts accepting clients.
    ///
    /// # Errors
    ///
    /// Fails when the server was already started or stopped, or the accept
    /// loop cannot be started.
    pub fn start(&self) -> Result<(), ServerError> {
        let port = self.local_addr.port();
        if self.state.stopping.load(Ordering::SeqCst) {
            return Err(ServerError::Stopped { port });
        }
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(ServerError::AlreadyStarted { port })?;
        let handler: Arc<dyn ConnectionHandler> = self.state.clone();
        let handle = listener.start(handler)?;
        *self.handle.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        info!(target: SERVER_TARGET, local_addr = %self.local_addr, "connection server started");
        Ok(())
    }

    /// Points this server, and every live session, at a new upstream.
    pub fn set_upstream(&self, upstream: Option<SocketEndpoint>) {
        *self
            .state
            .upstream
            .write()
            .unwrap_or_else(PoisonError::into_inner) = upstream.clone();
        for session in &self.state.sessions {
            session.upstream.set(upstream.clone());
        }
        info!(
            target: SERVER_TARGET,
            local_addr = %self.local_addr,
            upstream = ?upstream.as_ref().map(ToString::to_string),
            sessions = self.state.sessions.len(),
            "upstream updated"
        );
    }

    /// Upstream new sessions start with.
    #[must_use]
    pub fn upstream(&self) -> Option<SocketEndpoint> {
        self.state.current_upstream()
    }

    /// Ends every live session and stops accepting. Calling it again does
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Listener`] when the accept loop panicked.
    pub fn stop(&self) -> Result<(), ServerError> {
        if self.state.stopping.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        for session in &self.state.sessions {
            session.control.request_exit();
            if let Err(error) = session.stream.shutdown(Shutdown::Both) {
                debug!(target: SERVER_TARGET, %error, "client socket already closed");
            }
        }
        self.listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.shutdown();
            handle.join()?;
        }
        info!(target: SERVER_TARGET, local_addr = %self.local_addr, "connection server stopped");
        Ok(())
    }

    /// Address the server is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of connected clients.
    #[must_use]
    pub fn live_sessions(&self) -> usize {
        self.state.sessions.len()
    }
}

impl Drop for ConnectionServer {
    fn drop(&mut self) {
        if let Err(error) = self.stop() {
            warn!(target: SERVER_TARGET, %error, "server stop failed on drop");
        }
    }
}

impl ServerState {
    fn current_upstream(&self) -> Option<SocketEndpoint> {
        self.upstream
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn serve(&self, id: SessionId, stream: TcpStream) -> std::io::Result<()> {
        let writer = stream.try_clone()?;
        let control = Arc::new(SessionControl::default());
        let upstream = Arc::new(UpstreamSlot::default());
        self.sessions.insert(
            id,
            SessionHandle {
                stream: stream.try_clone()?,
                control: Arc::clone(&control),
                upstream: Arc::clone(&upstream),
            },
        );
        // Read after registering so a concurrent `set_upstream` is never
        // missed.
        upstream.set(self.current_upstream());
        if self.stopping.load(Ordering::SeqCst) {
            return Ok(());
        }

        let table = self.factory.table();
        let sink = EventSink::new(writer, Arc::clone(table.registry()));
        let targets = self.factory.targets(SessionWiring {
            sink: sink.clone(),
            control: Arc::clone(&control),
            upstream,
        });
        let session = Session::new(BufReader::new(stream), table, targets, sink, control);
        if let Err(error) = session.run() {
            debug!(target: SERVER_TARGET, session = id, %error, "session ended with error");
        }
        Ok(())
    }
}

impl ConnectionHandler for ServerState {
    fn handle(&self, stream: TcpStream) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let peer = stream.peer_addr().ok();
        debug!(target: SERVER_TARGET, session = id, ?peer, "session started");
        if let Err(error) = self.serve(id, stream) {
            warn!(target: SERVER_TARGET, session = id, %error, "session setup failed");
        }
        if let Some((_, handle)) = self.sessions.remove(&id) {
            if let Err(error) = handle.stream.shutdown(Shutdown::Both) {
                debug!(target: SERVER_TARGET, session = id, %error, "client socket already closed");
            }
        }
        debug!(target: SERVER_TARGET, session = id, "session finished");
    }
}
