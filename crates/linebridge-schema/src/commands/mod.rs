//! Name-indexed operations of bridged action sources.
//!
//! [`CommandTable::builder`] collects action sources and event sets, keeps
//! one operation per name and records every type reachable from operation
//! and event parameters so help output can describe them.

mod errors;
mod interface;

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::SCHEMA_TARGET;
use crate::descriptor::{DescribeError, TypeDescriptor, TypeRegistry};
use crate::events::{EventSet, EventSignature};
use crate::native::Native;
use crate::reflect::TypeRef;

pub use self::errors::{CommandError, InvocationError};
pub use self::interface::{ActionSource, Arguments, Interface};

use self::interface::{ErasedCall, Member};

/// Per-session instances that operations are dispatched to.
pub trait Targets: Send {
    /// Returns the instance of the source identified by `owner`.
    fn target_mut(&mut self, owner: TypeId) -> Option<&mut dyn Any>;

    /// Releases resources held by the targets when a session ends.
    fn close(&mut self) {}
}

/// A parameter of an operation.
#[derive(Clone)]
pub struct Parameter {
    name: String,
    type_ref: TypeRef,
    descriptor: Arc<TypeDescriptor>,
}

impl Parameter {
    /// Declared parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Descriptor of the parameter type.
    #[must_use]
    pub const fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    /// Returns `true` when the parameter cannot be filled with `null`, so a
    /// missing value means more input is needed.
    #[must_use]
    pub fn is_required(&self) -> bool {
        !self.type_ref.is_nullable() && self.descriptor.kind().is_primitive()
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Parameter")
            .field("name", &self.name)
            .field("type", &self.descriptor.name())
            .field("required", &self.is_required())
            .finish()
    }
}

/// A void operation exposed under a command name.
pub struct Operation {
    name: String,
    interface: &'static str,
    owner: TypeId,
    parameters: Vec<Parameter>,
    call: ErasedCall,
}

impl Operation {
    /// Command name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Interface that declared the operation.
    #[must_use]
    pub const fn interface(&self) -> &'static str {
        self.interface
    }

    /// Parameters in order.
    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Operation")
            .field("name", &self.name)
            .field("interface", &self.interface)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

struct SourceDecl {
    owner: TypeId,
    interfaces: Vec<FlatInterface>,
}

struct FlatInterface {
    name: &'static str,
    members: Vec<Member>,
}

/// Collects action sources and event sets for a [`CommandTable`].
pub struct CommandTableBuilder {
    registry: Arc<TypeRegistry>,
    sources: Vec<SourceDecl>,
    events: Vec<EventSignature>,
}

impl CommandTableBuilder {
    /// Registers an action source. Sources registered earlier win name
    /// conflicts between operations with the same number of parameters.
    #[must_use]
    pub fn source<T: ActionSource>(mut self) -> Self {
        let mut seen = BTreeSet::new();
        let mut interfaces = Vec::new();
        for interface in T::interfaces() {
            flatten(interface, &mut seen, &mut interfaces);
        }
        self.sources.push(SourceDecl {
            owner: TypeId::of::<T>(),
            interfaces,
        });
        self
    }

    /// Registers the events a session may emit.
    #[must_use]
    pub fn events<E: EventSet>(mut self) -> Self {
        self.events.extend(E::signatures());
        self
    }

    /// Describes every parameter type and builds the table.
    pub fn build(self) -> Result<CommandTable, DescribeError> {
        let Self {
            registry,
            sources,
            events,
        } = self;
        let mut commands: BTreeMap<String, Operation> = BTreeMap::new();
        let mut interfaces: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut excluded = BTreeSet::new();

        for source in sources {
            for interface in source.interfaces {
                let declared = interfaces.entry(interface.name.to_owned()).or_default();
                for member in interface.members {
                    let Some(call) = member.call else {
                        excluded.insert(member.name.to_owned());
                        continue;
                    };
                    let parameters = member
                        .parameters
                        .into_iter()
                        .map(|(name, type_ref)| {
                            registry.describe(type_ref).map(|descriptor| Parameter {
                                name,
                                type_ref,
                                descriptor,
                            })
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    declared.push(member.name.to_owned());
                    insert_operation(
                        &mut commands,
                        Operation {
                            name: member.name.to_owned(),
                            interface: interface.name,
                            owner: source.owner,
                            parameters,
                            call,
                        },
                    );
                }
            }
        }

        let mut catalog: BTreeMap<String, Vec<EventDecl>> = BTreeMap::new();
        for signature in events {
            let parameters = signature
                .parameters()
                .iter()
                .map(|(name, type_ref)| {
                    registry
                        .describe(*type_ref)
                        .map(|descriptor| ((*name).to_owned(), descriptor))
                })
                .collect::<Result<Vec<_>, _>>()?;
            let shapes = catalog.entry(signature.name().to_owned()).or_default();
            if !shapes.iter().any(|shape| shape.matches(&parameters)) {
                shapes.push(EventDecl { parameters });
            }
        }

        let mut types = BTreeMap::new();
        let reachable = commands
            .values()
            .flat_map(|operation| operation.parameters.iter().map(Parameter::descriptor))
            .chain(
                catalog
                    .values()
                    .flatten()
                    .flat_map(|event| event.parameters.iter().map(|(_, descriptor)| descriptor)),
            );
        for descriptor in reachable {
            register(&mut types, descriptor);
        }

        debug!(
            target: SCHEMA_TARGET,
            commands = commands.len(),
            events = catalog.len(),
            types = types.len(),
            "command table built"
        );
        Ok(CommandTable {
            commands,
            interfaces,
            excluded,
            events: catalog,
            types,
            registry,
        })
    }
}

fn flatten<T: ActionSource>(
    interface: Interface<T>,
    seen: &mut BTreeSet<&'static str>,
    out: &mut Vec<FlatInterface>,
) {
    if !seen.insert(interface.name) {
        return;
    }
    for parent in interface.parents {
        flatten(parent, seen, out);
    }
    out.push(FlatInterface {
        name: interface.name,
        members: interface.members,
    });
}

/// Keeps the operation with strictly more parameters; ties keep the one
/// registered first.
fn insert_operation(commands: &mut BTreeMap<String, Operation>, operation: Operation) {
    match commands.get(&operation.name) {
        Some(existing) if existing.parameters.len() >= operation.parameters.len() => {
            debug!(
                target: SCHEMA_TARGET,
                command = %operation.name,
                kept = existing.interface,
                dropped = operation.interface,
                "command name conflict"
            );
        }
        _ => {
            commands.insert(operation.name.clone(), operation);
        }
    }
}

fn register(types: &mut BTreeMap<String, Arc<TypeDescriptor>>, descriptor: &Arc<TypeDescriptor>) {
    if types.contains_key(descriptor.name()) {
        return;
    }
    types.insert(descriptor.name().to_owned(), Arc::clone(descriptor));
    if let Some(key) = descriptor.key() {
        register(types, key);
    }
    if let Some(component) = descriptor.component() {
        register(types, component);
    }
    for property in descriptor.properties() {
        register(types, property.descriptor());
    }
}

struct EventDecl {
    parameters: Vec<(String, Arc<TypeDescriptor>)>,
}

impl EventDecl {
    /// Event sets registered together may repeat a shape.
    fn matches(&self, parameters: &[(String, Arc<TypeDescriptor>)]) -> bool {
        self.parameters.len() == parameters.len()
            && self
                .parameters
                .iter()
                .zip(parameters)
                .all(|((name, descriptor), (other_name, other))| {
                    name == other_name && Arc::ptr_eq(descriptor, other)
                })
    }
}

/// Name-indexed view of the operations exposed to sessions.
pub struct CommandTable {
    commands: BTreeMap<String, Operation>,
    interfaces: BTreeMap<String, Vec<String>>,
    excluded: BTreeSet<String>,
    events: BTreeMap<String, Vec<EventDecl>>,
    types: BTreeMap<String, Arc<TypeDescriptor>>,
    registry: Arc<TypeRegistry>,
}

impl CommandTable {
    /// Starts a table backed by `registry`.
    #[must_use]
    pub fn builder(registry: Arc<TypeRegistry>) -> CommandTableBuilder {
        CommandTableBuilder {
            registry,
            sources: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Parameters of the named operation.
    pub fn parameter_types(&self, name: &str) -> Result<&[Parameter], CommandError> {
        self.operation(name)
            .map(Operation::parameters)
            .ok_or_else(|| CommandError::not_found(name))
    }

    /// Looks up an operation.
    #[must_use]
    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.commands.get(name)
    }

    /// Invokes the named operation on the instance of its declaring source.
    pub fn invoke(
        &self,
        name: &str,
        targets: &mut dyn Targets,
        args: Vec<Native>,
    ) -> Result<(), CommandError> {
        let operation = self
            .operation(name)
            .ok_or_else(|| CommandError::not_found(name))?;
        let target = targets
            .target_mut(operation.owner)
            .ok_or(InvocationError::MissingTarget {
                owner: operation.interface,
            })?;
        (operation.call)(target, args)?;
        Ok(())
    }

    /// Operations in name order.
    pub fn commands(&self) -> impl Iterator<Item = &Operation> {
        self.commands.values()
    }

    /// Interface names with the operations each declares.
    pub fn interfaces(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.interfaces
            .iter()
            .map(|(name, commands)| (name.as_str(), commands.as_slice()))
    }

    /// Operations declared by one interface.
    #[must_use]
    pub fn interface(&self, name: &str) -> Option<&[String]> {
        self.interfaces.get(name).map(Vec::as_slice)
    }

    /// Returns `true` when a member with this name was left out because it
    /// returns a value.
    #[must_use]
    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded.contains(name) && !self.commands.contains_key(name)
    }

    /// Event names in order.
    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.events.keys().map(String::as_str)
    }

    /// Parameter lists of every shape of the named event.
    pub fn event(&self, name: &str) -> Option<Vec<&[(String, Arc<TypeDescriptor>)]>> {
        self.events.get(name).map(|shapes| {
            shapes
                .iter()
                .map(|event| event.parameters.as_slice())
                .collect()
        })
    }

    /// Type reachable from a parameter, by simple name.
    #[must_use]
    pub fn find_type(&self, name: &str) -> Option<&Arc<TypeDescriptor>> {
        self.types.get(name)
    }

    /// Every reachable type in name order.
    pub fn types(&self) -> impl Iterator<Item = &Arc<TypeDescriptor>> {
        self.types.values()
    }

    /// Registry the table was built from.
    #[must_use]
    pub const fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }
}

impl fmt::Debug for CommandTable {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CommandTable")
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .field("events", &self.events.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
