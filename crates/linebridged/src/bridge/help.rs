//! Answers for the `help` command.

use linebridge_schema::{CommandTable, Native};

use super::events::BridgeEvent;

/// Builds the help listing for `name`. Every answer except an unknown name
/// ends with [`BridgeEvent::HelpEnd`].
pub(crate) fn answer(table: &CommandTable, name: Option<&str>) -> Vec<BridgeEvent> {
    let Some(name) = name else {
        return finish(
            table
                .commands()
                .map(|operation| help(operation.interface(), operation.name()))
                .collect(),
        );
    };
    if name == "actions" {
        return finish(table.interfaces().map(|(interface, _)| help(name, interface)).collect());
    }
    if name == "events" {
        return finish(table.events().map(|event| help(name, event)).collect());
    }
    if let Some(operation) = table.operation(name) {
        return finish(
            operation
                .parameters()
                .iter()
                .map(|parameter| BridgeEvent::HelpParameter {
                    owner: name.to_owned(),
                    name: parameter.name().to_owned(),
                    type_name: parameter.descriptor().name().to_owned(),
                })
                .collect(),
        );
    }
    if let Some(commands) = table.interface(name) {
        return finish(commands.iter().map(|command| help(name, command)).collect());
    }
    if let Some(descriptor) = table.find_type(name) {
        let literals = descriptor.literals().iter().map(|literal| help(name, literal));
        let properties = descriptor.properties().map(|property| BridgeEvent::HelpProperty {
            owner: name.to_owned(),
            name: property.name().to_owned(),
            type_name: property.descriptor().name().to_owned(),
            default: descriptor
                .default_value(property.name())
                .cloned()
                .unwrap_or(Native::Null),
            descriptor: property.descriptor().clone(),
        });
        return finish(literals.chain(properties).collect());
    }
    if let Some(shapes) = table.event(name) {
        return finish(
            shapes
                .into_iter()
                .flatten()
                .map(|(parameter, descriptor)| BridgeEvent::HelpParameter {
                    owner: name.to_owned(),
                    name: parameter.clone(),
                    type_name: descriptor.name().to_owned(),
                })
                .collect(),
        );
    }
    vec![BridgeEvent::Error {
        message: format!("{name}?"),
    }]
}

fn help(topic: &str, entry: &str) -> BridgeEvent {
    BridgeEvent::Help {
        topic: topic.to_owned(),
        entry: entry.to_owned(),
    }
}

fn finish(mut events: Vec<BridgeEvent>) -> Vec<BridgeEvent> {
    events.push(BridgeEvent::HelpEnd);
    events
}
