//! Polls an upstream port and reports availability changes.

use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use linebridge_config::SocketEndpoint;
use tracing::{debug, warn};

use super::{SERVER_TARGET, UpstreamObserver};

const SHUTDOWN_POLL: Duration = Duration::from_millis(25);

/// Background thread that tries to connect to an upstream every interval
/// and tells an [`UpstreamObserver`] when it opens or closes.
pub struct PortProbe {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PortProbe {
    /// Starts probing `upstream`.
    #[must_use]
    pub fn spawn(
        upstream: SocketEndpoint,
        interval: Duration,
        observer: Arc<dyn UpstreamObserver>,
    ) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let handle = thread::spawn(move || probe_loop(&upstream, interval, observer.as_ref(), &flag));
        Self {
            shutdown,
            handle: Some(handle),
        }
    }

    /// Stops probing and waits for the thread.
    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(target: SERVER_TARGET, "port probe panicked");
            }
        }
    }
}

impl Drop for PortProbe {
    fn drop(&mut self) {
        self.halt();
    }
}

fn probe_loop(
    upstream: &SocketEndpoint,
    interval: Duration,
    observer: &dyn UpstreamObserver,
    shutdown: &AtomicBool,
) {
    let mut open = false;
    while !shutdown.load(Ordering::SeqCst) {
        let reachable = is_reachable(upstream, interval);
        if reachable != open {
            open = reachable;
            debug!(target: SERVER_TARGET, %upstream, open, "upstream availability changed");
            if open {
                observer.upstream_opened(&upstream.host, upstream.port);
            } else {
                observer.upstream_closed(upstream.port);
            }
        }
        let deadline = Instant::now() + interval;
        while Instant::now() < deadline && !shutdown.load(Ordering::SeqCst) {
            thread::sleep(SHUTDOWN_POLL.min(interval));
        }
    }
}

fn is_reachable(upstream: &SocketEndpoint, timeout: Duration) -> bool {
    let Ok(mut addrs) = (upstream.host.as_str(), upstream.port).to_socket_addrs() else {
        return false;
    };
    let timeout = timeout.max(Duration::from_millis(1));
    addrs.any(|addr| TcpStream::connect_timeout(&addr, timeout).is_ok())
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use crossbeam_channel::unbounded;
    use mockall::predicate::eq;
    use rstest::rstest;

    use super::*;
    use crate::server::MockUpstreamObserver;
    use crate::tests::support::READ_TIMEOUT;

    #[rstest]
    fn reports_transitions_once_each() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind upstream");
        let port = listener.local_addr().expect("addr").port();
        let (opened_tx, opened) = unbounded();
        let (closed_tx, closed) = unbounded();

        let mut observer = MockUpstreamObserver::new();
        observer
            .expect_upstream_opened()
            .withf(move |host, announced| host == "127.0.0.1" && *announced == port)
            .times(1)
            .returning(move |_, _| {
                opened_tx.send(()).ok();
            });
        observer
            .expect_upstream_closed()
            .with(eq(port))
            .times(1)
            .returning(move |_| {
                closed_tx.send(()).ok();
            });

        let probe = PortProbe::spawn(
            SocketEndpoint::tcp("127.0.0.1", port),
            Duration::from_millis(20),
            Arc::new(observer),
        );
        opened.recv_timeout(READ_TIMEOUT).expect("upstream reported open");
        drop(listener);
        closed.recv_timeout(READ_TIMEOUT).expect("upstream reported closed");
        probe.stop();
    }
}
