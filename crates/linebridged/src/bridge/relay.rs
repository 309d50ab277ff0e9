//! Operations that drive the upstream link.

use std::sync::Arc;

use linebridge_schema::{ActionSource, Interface, InvocationError};
use tracing::debug;

use super::{BRIDGE_TARGET, events::BridgeEvent, emit};
use crate::session::EventSink;
use crate::upstream::{UpstreamLink, UpstreamMessage, UpstreamSlot};

/// Relays lines between a session and the upstream service.
pub struct RelayClient {
    upstream: Arc<UpstreamSlot>,
    sink: EventSink,
    link: Option<UpstreamLink>,
}

impl ActionSource for RelayClient {
    fn interfaces() -> Vec<Interface<Self>> {
        let upstream = Interface::new("Upstream")
            .operation("connect", &["clientId"], |relay: &mut Self, (client_id,): (i32,)| {
                relay.connect(client_id)
            })
            .operation("disconnect", &[], |relay: &mut Self, ()| {
                relay.disconnect();
                Ok(())
            });
        vec![
            Interface::new("RelayClient")
                .extends(upstream)
                .operation("send", &["line"], |relay: &mut Self, (line,): (String,)| {
                    relay.send(&line)
                })
                .operation("sendAll", &["lines"], |relay: &mut Self, (lines,): (Vec<String>,)| {
                    lines.iter().try_for_each(|line| relay.send(line))
                })
                .function::<(), bool>("isConnected", &[]),
        ]
    }
}

impl RelayClient {
    /// Creates a client that connects to whatever `upstream` names at the
    /// time of `connect`.
    #[must_use]
    pub const fn new(upstream: Arc<UpstreamSlot>, sink: EventSink) -> Self {
        Self {
            upstream,
            sink,
            link: None,
        }
    }

    /// Opens a link to the current upstream, replacing any live one.
    ///
    /// # Errors
    ///
    /// Fails when the upstream cannot be reached.
    pub fn connect(&mut self, client_id: i32) -> Result<(), InvocationError> {
        self.disconnect();
        let Some(endpoint) = self.upstream.get() else {
            return emit(
                &self.sink,
                BridgeEvent::Error {
                    message: "upstream is not ready".to_owned(),
                },
            );
        };
        let sink = self.sink.clone();
        let link = UpstreamLink::open(&endpoint, move |message| {
            let event = match message {
                UpstreamMessage::Line(line) => BridgeEvent::Received { line },
                UpstreamMessage::Failed(message) => BridgeEvent::Error { message },
                UpstreamMessage::Closed => BridgeEvent::ConnectionClosed,
            };
            if let Err(error) = sink.emit(event) {
                debug!(target: BRIDGE_TARGET, %error, "client gone while relaying");
            }
        })
        .map_err(|error| InvocationError::failed(error.to_string()))?;
        let host = format!("{}:{}", endpoint.host, endpoint.port);
        self.link = Some(link);
        emit(&self.sink, BridgeEvent::Connected { client_id, host })
    }

    /// Closes the link, if any, after its drain thread has finished.
    pub fn disconnect(&mut self) {
        if let Some(link) = self.link.take() {
            link.close();
        }
    }

    /// Writes one line upstream.
    ///
    /// # Errors
    ///
    /// Fails when no link is open or the write fails.
    pub fn send(&mut self, line: &str) -> Result<(), InvocationError> {
        let link = self
            .link
            .as_mut()
            .ok_or_else(|| InvocationError::failed("not connected"))?;
        link.send(line)
            .map_err(|error| InvocationError::failed(error.to_string()))
    }

    /// Whether a link is open and its upstream has not closed it.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.link.as_ref().is_some_and(UpstreamLink::is_connected)
    }

    /// `host:port` of the open link.
    #[must_use]
    pub fn connected_host(&self) -> Option<String> {
        self.link.as_ref().map(|link| {
            let endpoint = link.endpoint();
            format!("{}:{}", endpoint.host, endpoint.port)
        })
    }
}

impl Drop for RelayClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}
