//! Events emitted by the bridge's targets.

use std::sync::Arc;

use linebridge_schema::{EventArgument, EventSet, EventSignature, Native, TypeDescriptor};

use super::model::Settings;

/// Everything the built-in targets report to a client.
#[derive(Debug)]
pub enum BridgeEvent {
    /// A failure outside command dispatch, such as a broken upstream read.
    Error {
        /// Reason.
        message: String,
    },
    /// One entry of a help listing.
    Help {
        /// What was asked about.
        topic: String,
        /// Listed name.
        entry: String,
    },
    /// A parameter of a command or event.
    HelpParameter {
        /// Command or event name.
        owner: String,
        /// Parameter name.
        name: String,
        /// Parameter type name.
        type_name: String,
    },
    /// A property of a composite type with its default value.
    HelpProperty {
        /// Type name.
        owner: String,
        /// Property name.
        name: String,
        /// Property type name.
        type_name: String,
        /// Default value, `Null` when the type has no default.
        default: Native,
        /// Descriptor used to encode `default`.
        descriptor: Arc<TypeDescriptor>,
    },
    /// Ends a help listing.
    HelpEnd,
    /// Answer to `isConnected`.
    IsConnected {
        /// Whether the upstream link is up.
        connected: bool,
    },
    /// Answer to `connectedHost`.
    ConnectedHost {
        /// `host:port` of the link, if any.
        host: Option<String>,
    },
    /// Answer to `settings`.
    Settings(Settings),
    /// A relay link was opened.
    Connected {
        /// Client id passed to `connect`.
        client_id: i32,
        /// `host:port` of the upstream.
        host: String,
    },
    /// A line arrived from the upstream.
    Received {
        /// Line without its terminator.
        line: String,
    },
    /// The upstream closed the link.
    ConnectionClosed,
}

impl EventSet for BridgeEvent {
    fn signatures() -> Vec<EventSignature> {
        vec![
            EventSignature::new("error").parameter::<String>("message"),
            EventSignature::new("help")
                .parameter::<String>("topic")
                .parameter::<String>("entry"),
            EventSignature::new("help")
                .parameter::<String>("owner")
                .parameter::<String>("parameter")
                .parameter::<String>("type"),
            EventSignature::new("help")
                .parameter::<String>("type")
                .parameter::<String>("property")
                .parameter::<String>("propertyType")
                .parameter::<Native>("default"),
            EventSignature::new("helpEnd"),
            EventSignature::new("isConnected").parameter::<bool>("connected"),
            EventSignature::new("connectedHost").parameter::<Option<String>>("host"),
            EventSignature::new("settings").parameter::<Settings>("settings"),
            EventSignature::new("connected")
                .parameter::<i32>("clientId")
                .parameter::<String>("host"),
            EventSignature::new("received").parameter::<String>("line"),
            EventSignature::new("connectionClosed"),
        ]
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Error { .. } => "error",
            Self::Help { .. } | Self::HelpParameter { .. } | Self::HelpProperty { .. } => "help",
            Self::HelpEnd => "helpEnd",
            Self::IsConnected { .. } => "isConnected",
            Self::ConnectedHost { .. } => "connectedHost",
            Self::Settings(_) => "settings",
            Self::Connected { .. } => "connected",
            Self::Received { .. } => "received",
            Self::ConnectionClosed => "connectionClosed",
        }
    }

    fn into_arguments(self) -> Vec<EventArgument> {
        match self {
            Self::Error { message } => vec![EventArgument::typed(message)],
            Self::Help { topic, entry } => {
                vec![EventArgument::typed(topic), EventArgument::typed(entry)]
            }
            Self::HelpParameter {
                owner,
                name,
                type_name,
            } => vec![
                EventArgument::typed(owner),
                EventArgument::typed(name),
                EventArgument::typed(type_name),
            ],
            Self::HelpProperty {
                owner,
                name,
                type_name,
                default,
                descriptor,
            } => vec![
                EventArgument::typed(owner),
                EventArgument::typed(name),
                EventArgument::typed(type_name),
                EventArgument::described(default, descriptor),
            ],
            Self::HelpEnd | Self::ConnectionClosed => Vec::new(),
            Self::IsConnected { connected } => vec![EventArgument::typed(connected)],
            Self::ConnectedHost { host } => vec![EventArgument::typed(host)],
            Self::Settings(settings) => vec![EventArgument::typed(settings)],
            Self::Connected { client_id, host } => {
                vec![EventArgument::typed(client_id), EventArgument::typed(host)]
            }
            Self::Received { line } => vec![EventArgument::typed(line)],
        }
    }
}
