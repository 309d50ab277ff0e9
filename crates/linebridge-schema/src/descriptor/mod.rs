//! Canonical type descriptors.
//!
//! A [`TypeDescriptor`] is the single source of truth the codec, the command
//! table and the help output consult about a type: its kind, its simple name,
//! container components, enumeration literals and composite properties with
//! their default values.

mod errors;
mod registry;

use std::any::TypeId;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::native::{ConversionError, Native};
use crate::object::Object;
use crate::reflect::{Constructor, Getter, Setter};

pub use self::errors::DescribeError;
pub use self::registry::TypeRegistry;

/// Classification of a described type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// `boolean`.
    Boolean,
    /// `char`.
    Character,
    /// `String`.
    String,
    /// `int`.
    Integer,
    /// `long`.
    Long,
    /// `double`.
    Double,
    /// `BigInteger`.
    BigInteger,
    /// `BigDecimal`.
    BigDecimal,
    /// Enumeration.
    Enum,
    /// Fixed size array.
    Array,
    /// Ordered list.
    List,
    /// Set.
    Set,
    /// Map.
    Map,
    /// Key/value pair.
    Entry,
    /// Composite with properties.
    Composite,
    /// Untyped JSON.
    Opaque,
}

impl Kind {
    /// Returns `true` for arrays, lists, sets, maps and entries.
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(
            self,
            Self::Array | Self::List | Self::Set | Self::Map | Self::Entry
        )
    }

    /// Returns `true` for the kinds that cannot represent `null` when the
    /// slot is not nullable.
    #[must_use]
    pub const fn is_primitive(self) -> bool {
        matches!(
            self,
            Self::Boolean | Self::Character | Self::Integer | Self::Long | Self::Double
        )
    }
}

/// Descriptor of one bridged type.
pub struct TypeDescriptor {
    id: TypeId,
    name: String,
    kind: Kind,
    component: Option<Arc<TypeDescriptor>>,
    key: Option<Arc<TypeDescriptor>>,
    literals: &'static [&'static str],
    composite: Option<CompositeShape>,
}

struct CompositeShape {
    constructor: Option<Constructor>,
    resolved: OnceLock<Resolved>,
}

#[derive(Default)]
struct Resolved {
    properties: BTreeMap<String, Property>,
    defaults: BTreeMap<String, Native>,
}

impl TypeDescriptor {
    pub(crate) fn scalar(id: TypeId, kind: Kind, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            component: None,
            key: None,
            literals: &[],
            composite: None,
        }
    }

    pub(crate) fn enumeration(
        id: TypeId,
        name: &'static str,
        literals: &'static [&'static str],
    ) -> Self {
        Self {
            literals,
            ..Self::scalar(id, Kind::Enum, name)
        }
    }

    pub(crate) fn container(
        id: TypeId,
        kind: Kind,
        key: Option<Arc<Self>>,
        component: Arc<Self>,
    ) -> Self {
        let name = match (kind, key.as_ref()) {
            (Kind::Map, _) => format!("{{{}}}", component.name),
            (Kind::Entry, Some(key)) => {
                format!("{{key:{},value:{}}}", key.name, component.name)
            }
            _ => format!("[{}]", component.name),
        };
        Self {
            component: Some(component),
            key,
            ..Self::scalar(id, kind, name)
        }
    }

    pub(crate) fn composite(id: TypeId, name: &'static str, constructor: Option<Constructor>) -> Self {
        Self {
            composite: Some(CompositeShape {
                constructor,
                resolved: OnceLock::new(),
            }),
            ..Self::scalar(id, Kind::Composite, name)
        }
    }

    pub(crate) fn resolve(
        &self,
        properties: BTreeMap<String, Property>,
        defaults: BTreeMap<String, Native>,
    ) {
        if let Some(shape) = &self.composite {
            // A concurrent resolution of the same type produces identical
            // properties, so losing the race is harmless.
            let _already = shape.resolved.set(Resolved {
                properties,
                defaults,
            });
        }
    }

    fn resolved(&self) -> Option<&Resolved> {
        self.composite.as_ref().and_then(|shape| shape.resolved.get())
    }

    /// Type identity this descriptor was built for.
    #[must_use]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    /// Simple name used in help output and error messages.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind of the type.
    #[must_use]
    pub const fn kind(&self) -> Kind {
        self.kind
    }

    /// Element type of arrays, lists and sets, or value type of maps and
    /// entries.
    #[must_use]
    pub fn component(&self) -> Option<&Arc<Self>> {
        self.component.as_ref()
    }

    /// Key type of maps and entries.
    #[must_use]
    pub fn key(&self) -> Option<&Arc<Self>> {
        self.key.as_ref()
    }

    /// Enumeration literals in ordinal order.
    #[must_use]
    pub const fn literals(&self) -> &'static [&'static str] {
        self.literals
    }

    /// Ordinal of an enumeration literal.
    #[must_use]
    pub fn ordinal(&self, literal: &str) -> Option<usize> {
        self.literals.iter().position(|candidate| *candidate == literal)
    }

    /// Properties in name order; empty for non-composites.
    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.resolved()
            .into_iter()
            .flat_map(|resolved| resolved.properties.values())
    }

    /// Looks up a property by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.resolved()
            .and_then(|resolved| resolved.properties.get(name))
    }

    /// Value of the property on a freshly constructed instance. `None` when
    /// the type has no default constructor.
    #[must_use]
    pub fn default_value(&self, property: &str) -> Option<&Native> {
        self.resolved()
            .and_then(|resolved| resolved.defaults.get(property))
    }

    /// Returns `true` when instances can be constructed for decoding.
    #[must_use]
    pub fn has_constructor(&self) -> bool {
        self.composite
            .as_ref()
            .is_some_and(|shape| shape.constructor.is_some())
    }

    /// Builds a default instance of a composite.
    #[must_use]
    pub fn construct(&self) -> Option<Box<dyn Object>> {
        self.composite
            .as_ref()
            .and_then(|shape| shape.constructor.as_ref())
            .map(|construct| construct())
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field(
                "properties",
                &self.properties().map(Property::name).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.name)?;
        if self.kind == Kind::Composite {
            let names: Vec<&str> = self.properties().map(Property::name).collect();
            write!(formatter, "[{}]", names.join(", "))?;
        }
        Ok(())
    }
}

/// A readable and writable member of a composite.
pub struct Property {
    name: String,
    descriptor: Arc<TypeDescriptor>,
    nullable: bool,
    get: Getter,
    set: Setter,
}

impl Property {
    pub(crate) fn new(
        name: String,
        descriptor: Arc<TypeDescriptor>,
        nullable: bool,
        get: Getter,
        set: Setter,
    ) -> Self {
        Self {
            name,
            descriptor,
            nullable,
            get,
            set,
        }
    }

    /// Property name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Descriptor of the accessor's type.
    #[must_use]
    pub const fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    /// Returns `true` when the property accepts `null`.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Reads the property from an instance.
    #[must_use]
    pub fn read(&self, object: &dyn Object) -> Native {
        (self.get)(object)
    }

    /// Writes the property on an instance.
    pub fn write(&self, object: &mut dyn Object, value: Native) -> Result<(), ConversionError> {
        (self.set)(object, value)
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Property")
            .field("name", &self.name)
            .field("type", &self.descriptor.name())
            .field("nullable", &self.nullable)
            .finish_non_exhaustive()
    }
}
