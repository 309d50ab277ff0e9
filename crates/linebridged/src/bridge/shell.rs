//! Session-level commands: help, pacing, settings and exit.

use std::any::{Any, TypeId};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use linebridge_schema::{ActionSource, CommandTable, Interface, InvocationError, Targets};

use super::events::BridgeEvent;
use super::model::Settings;
use super::relay::RelayClient;
use super::{emit, help};
use crate::session::{EventSink, SessionControl};

/// Commands every bridge session offers, plus the session's relay client.
pub struct ShellActions {
    table: Arc<CommandTable>,
    sink: EventSink,
    control: Arc<SessionControl>,
    settings: Settings,
    relay: RelayClient,
}

impl ActionSource for ShellActions {
    fn interfaces() -> Vec<Interface<Self>> {
        vec![
            Interface::new("Shell")
                .operation("help", &["name"], |shell: &mut Self, (name,): (Option<String>,)| {
                    shell.help(name.as_deref())
                })
                .operation("sleep", &["millis"], |_: &mut Self, (millis,): (Option<i64>,)| {
                    let millis = millis.and_then(|value| u64::try_from(value).ok()).unwrap_or(0);
                    thread::sleep(Duration::from_millis(millis));
                    Ok(())
                })
                .operation("exit", &[], |shell: &mut Self, ()| {
                    shell.relay.disconnect();
                    shell.control.request_exit();
                    Ok(())
                })
                .operation("isConnected", &[], |shell: &mut Self, ()| {
                    let connected = shell.relay.is_connected();
                    emit(&shell.sink, BridgeEvent::IsConnected { connected })
                })
                .operation("connectedHost", &[], |shell: &mut Self, ()| {
                    let host = shell.relay.connected_host();
                    emit(&shell.sink, BridgeEvent::ConnectedHost { host })
                })
                .operation(
                    "configure",
                    &["settings"],
                    |shell: &mut Self, (settings,): (Option<Settings>,)| {
                        shell.settings = settings.unwrap_or_default();
                        Ok(())
                    },
                )
                .operation("settings", &[], |shell: &mut Self, ()| {
                    emit(&shell.sink, BridgeEvent::Settings(shell.settings.clone()))
                })
                .operation("disconnect", &[], |shell: &mut Self, ()| {
                    shell.relay.disconnect();
                    Ok(())
                }),
        ]
    }
}

impl ShellActions {
    /// Wires a fresh session's targets.
    #[must_use]
    pub fn new(
        table: Arc<CommandTable>,
        sink: EventSink,
        control: Arc<SessionControl>,
        relay: RelayClient,
    ) -> Self {
        Self {
            table,
            sink,
            control,
            settings: Settings::default(),
            relay,
        }
    }

    fn help(&self, name: Option<&str>) -> Result<(), InvocationError> {
        help::answer(&self.table, name)
            .into_iter()
            .try_for_each(|event| emit(&self.sink, event))
    }
}

impl Targets for ShellActions {
    fn target_mut(&mut self, owner: TypeId) -> Option<&mut dyn Any> {
        if owner == TypeId::of::<Self>() {
            Some(self)
        } else if owner == TypeId::of::<RelayClient>() {
            Some(&mut self.relay)
        } else {
            None
        }
    }

    fn close(&mut self) {
        self.relay.disconnect();
    }
}
