//! Event catalogues and event line rendering.

use std::sync::Arc;

use crate::codec::{encode, encode_untyped};
use crate::descriptor::{TypeDescriptor, TypeRegistry};
use crate::native::{IntoNative, Native};
use crate::reflect::{Reflect, TypeRef};

/// Declared shape of an event.
#[derive(Debug, Clone)]
pub struct EventSignature {
    name: &'static str,
    parameters: Vec<(&'static str, TypeRef)>,
}

impl EventSignature {
    /// Starts a signature without parameters.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            parameters: Vec::new(),
        }
    }

    /// Appends a parameter of type `T`.
    #[must_use]
    pub fn parameter<T: Reflect>(mut self, name: &'static str) -> Self {
        self.parameters.push((name, T::type_ref()));
        self
    }

    /// Event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Parameters in order.
    #[must_use]
    pub fn parameters(&self) -> &[(&'static str, TypeRef)] {
        &self.parameters
    }
}

/// One encoded argument of an event.
pub struct EventArgument {
    value: Native,
    shape: Shape,
}

enum Shape {
    Typed(TypeRef),
    Described(Arc<TypeDescriptor>),
    Untyped,
}

impl EventArgument {
    /// Argument whose type is known statically.
    pub fn typed<T: Reflect + IntoNative>(value: T) -> Self {
        Self {
            value: value.into_native(),
            shape: Shape::Typed(T::type_ref()),
        }
    }

    /// Argument encoded against an existing descriptor.
    #[must_use]
    pub const fn described(value: Native, descriptor: Arc<TypeDescriptor>) -> Self {
        Self {
            value,
            shape: Shape::Described(descriptor),
        }
    }

    /// Argument encoded by its own shape.
    #[must_use]
    pub const fn untyped(value: Native) -> Self {
        Self {
            value,
            shape: Shape::Untyped,
        }
    }

    fn encode(&self, registry: &TypeRegistry) -> String {
        match &self.shape {
            Shape::Typed(type_ref) => registry.describe(*type_ref).map_or_else(
                |_| encode_untyped(&self.value),
                |descriptor| encode(&self.value, &descriptor),
            ),
            Shape::Described(descriptor) => encode(&self.value, descriptor),
            Shape::Untyped => encode_untyped(&self.value),
        }
    }
}

/// A family of events a session can emit.
pub trait EventSet: Send + 'static {
    /// Every event shape, used for help output and type registration.
    fn signatures() -> Vec<EventSignature>;

    /// Wire name of this event.
    fn name(&self) -> &'static str;

    /// Arguments in order.
    fn into_arguments(self) -> Vec<EventArgument>;
}

/// Renders an event as a protocol line without the trailing newline:
/// the name followed by tab separated encoded arguments.
pub fn render_event<E: EventSet>(event: E, registry: &TypeRegistry) -> String {
    let mut line = event.name().to_owned();
    for argument in event.into_arguments() {
        line.push('\t');
        line.push_str(&argument.encode(registry));
    }
    line
}
