use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tracing::debug;

use super::{DescribeError, Kind, Property, TypeDescriptor};
use crate::SCHEMA_TARGET;
use crate::reflect::{Accessor, ClassInfo, Mutator, Reflect, TypeInfo, TypeRef};

/// Memoising factory for [`TypeDescriptor`]s.
///
/// Descriptors are built once per type identity and shared. Composite
/// descriptors are cached before their properties are resolved so
/// self-referential types terminate on the same descriptor instance. Only
/// one thread builds at a time, and other threads never see an unresolved
/// composite.
#[derive(Default)]
pub struct TypeRegistry {
    cache: Mutex<HashMap<TypeId, Arc<TypeDescriptor>>>,
    building: Mutex<()>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Describes `T`.
    pub fn describe_type<T: Reflect>(&self) -> Result<Arc<TypeDescriptor>, DescribeError> {
        self.describe(T::type_ref())
    }

    /// Describes the type behind `type_ref`, reusing any cached descriptor.
    pub fn describe(&self, type_ref: TypeRef) -> Result<Arc<TypeDescriptor>, DescribeError> {
        if let Some(found) = self.lookup(type_ref.id()).filter(|found| is_complete(found)) {
            return Ok(found);
        }
        let _building = self
            .building
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.build(type_ref)
    }

    /// Runs with the build lock held. Composites still being resolved
    /// further up the stack are returned as they are.
    fn build(&self, type_ref: TypeRef) -> Result<Arc<TypeDescriptor>, DescribeError> {
        if let Some(found) = self.lookup(type_ref.id()) {
            return Ok(found);
        }
        let id = type_ref.id();
        let descriptor = match type_ref.info() {
            TypeInfo::Boolean => TypeDescriptor::scalar(id, Kind::Boolean, "boolean"),
            TypeInfo::Character => TypeDescriptor::scalar(id, Kind::Character, "char"),
            TypeInfo::String => TypeDescriptor::scalar(id, Kind::String, "String"),
            TypeInfo::Integer => TypeDescriptor::scalar(id, Kind::Integer, "int"),
            TypeInfo::Long => TypeDescriptor::scalar(id, Kind::Long, "long"),
            TypeInfo::Double => TypeDescriptor::scalar(id, Kind::Double, "double"),
            TypeInfo::BigInteger => TypeDescriptor::scalar(id, Kind::BigInteger, "BigInteger"),
            TypeInfo::BigDecimal => TypeDescriptor::scalar(id, Kind::BigDecimal, "BigDecimal"),
            TypeInfo::Opaque => TypeDescriptor::scalar(id, Kind::Opaque, "Object"),
            TypeInfo::Enum(info) => TypeDescriptor::enumeration(id, info.name(), info.literals()),
            TypeInfo::Array(component) => {
                TypeDescriptor::container(id, Kind::Array, None, self.build(component)?)
            }
            TypeInfo::List(component) => {
                TypeDescriptor::container(id, Kind::List, None, self.component(component)?)
            }
            TypeInfo::Set(component) => {
                TypeDescriptor::container(id, Kind::Set, None, self.component(component)?)
            }
            TypeInfo::Map(pair) => {
                let (key, value) = self.pair(pair)?;
                TypeDescriptor::container(id, Kind::Map, Some(key), value)
            }
            TypeInfo::Entry(pair) => {
                let (key, value) = self.pair(pair)?;
                TypeDescriptor::container(id, Kind::Entry, Some(key), value)
            }
            TypeInfo::Class(class) => return self.describe_class(id, class),
            TypeInfo::Unsupported(name) => return Err(DescribeError::unsupported(name)),
        };
        Ok(self.publish(descriptor))
    }

    /// Number of cached descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` when nothing has been described yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<TypeId, Arc<TypeDescriptor>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lookup(&self, id: TypeId) -> Option<Arc<TypeDescriptor>> {
        self.lock().get(&id).cloned()
    }

    fn publish(&self, descriptor: TypeDescriptor) -> Arc<TypeDescriptor> {
        Arc::clone(
            self.lock()
                .entry(descriptor.id())
                .or_insert_with(|| Arc::new(descriptor)),
        )
    }

    fn component(&self, component: Option<TypeRef>) -> Result<Arc<TypeDescriptor>, DescribeError> {
        self.build(component.unwrap_or_else(TypeRef::of::<Value>))
    }

    fn pair(
        &self,
        pair: Option<(TypeRef, TypeRef)>,
    ) -> Result<(Arc<TypeDescriptor>, Arc<TypeDescriptor>), DescribeError> {
        let (key, value) = pair.map_or((None, None), |(key, value)| (Some(key), Some(value)));
        Ok((self.component(key)?, self.component(value)?))
    }

    fn describe_class(
        &self,
        id: TypeId,
        class: ClassInfo,
    ) -> Result<Arc<TypeDescriptor>, DescribeError> {
        let shell = TypeDescriptor::composite(id, class.name, class.constructor.clone());
        let descriptor = self.publish(shell);
        if descriptor.resolved().is_some() {
            return Ok(descriptor);
        }
        match self.resolve_properties(&class) {
            Ok(properties) => {
                let defaults = default_values(&descriptor, &properties);
                debug!(
                    target: SCHEMA_TARGET,
                    composite = class.name,
                    properties = properties.len(),
                    "described composite"
                );
                descriptor.resolve(properties, defaults);
                Ok(descriptor)
            }
            Err(error) => {
                self.lock().remove(&id);
                Err(error)
            }
        }
    }

    fn resolve_properties(
        &self,
        class: &ClassInfo,
    ) -> Result<BTreeMap<String, Property>, DescribeError> {
        let mut properties = BTreeMap::new();
        for accessor in &class.accessors {
            let Some(mutator) = matching_mutator(accessor, &class.mutators) else {
                continue;
            };
            let descriptor = self
                .build(accessor.value_type)
                .map_err(|error| DescribeError::property(class.name, &accessor.name, error))?;
            properties.insert(
                accessor.name.clone(),
                Property::new(
                    accessor.name.clone(),
                    descriptor,
                    accessor.value_type.is_nullable(),
                    Arc::clone(&accessor.get),
                    Arc::clone(&mutator.set),
                ),
            );
        }
        Ok(properties)
    }
}

fn is_complete(descriptor: &TypeDescriptor) -> bool {
    descriptor.kind() != Kind::Composite || descriptor.resolved().is_some()
}

/// Picks the mutator paired with an accessor: the same name and type, or an
/// integer mutator for an enumeration accessor. An exact match wins.
fn matching_mutator<'a>(accessor: &Accessor, mutators: &'a [Mutator]) -> Option<&'a Mutator> {
    let named = || mutators.iter().filter(|mutator| mutator.name == accessor.name);
    named()
        .find(|mutator| mutator.value_type.id() == accessor.value_type.id())
        .or_else(|| {
            if !matches!(accessor.value_type.info(), TypeInfo::Enum(_)) {
                return None;
            }
            named().find(|mutator| matches!(mutator.value_type.info(), TypeInfo::Integer))
        })
}

fn default_values(
    descriptor: &TypeDescriptor,
    properties: &BTreeMap<String, Property>,
) -> BTreeMap<String, crate::Native> {
    let Some(instance) = descriptor.construct() else {
        return BTreeMap::new();
    };
    properties
        .iter()
        .map(|(name, property)| (name.clone(), property.read(instance.as_ref())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Detached, Mode, Node, Settings, Tag, Unbridgeable};
    use crate::{EnumLiteral, Native};
    use rstest::{fixture, rstest};
    use std::collections::BTreeMap;

    #[fixture]
    fn registry() -> TypeRegistry {
        TypeRegistry::new()
    }

    #[rstest]
    #[case(bool::type_ref(), Kind::Boolean, "boolean")]
    #[case(char::type_ref(), Kind::Character, "char")]
    #[case(i32::type_ref(), Kind::Integer, "int")]
    #[case(i64::type_ref(), Kind::Long, "long")]
    #[case(f64::type_ref(), Kind::Double, "double")]
    #[case(String::type_ref(), Kind::String, "String")]
    #[case(Vec::<String>::type_ref(), Kind::List, "[String]")]
    #[case(<[i32; 3]>::type_ref(), Kind::Array, "[int]")]
    #[case(BTreeMap::<String, f64>::type_ref(), Kind::Map, "{double}")]
    #[case(<(String, Tag)>::type_ref(), Kind::Entry, "{key:String,value:Tag}")]
    #[case(Mode::type_ref(), Kind::Enum, "Mode")]
    #[case(Value::type_ref(), Kind::Opaque, "Object")]
    fn classifies_declared_types(
        registry: TypeRegistry,
        #[case] type_ref: TypeRef,
        #[case] kind: Kind,
        #[case] name: &str,
    ) {
        let descriptor = registry.describe(type_ref).expect("describe");
        assert_eq!(descriptor.kind(), kind);
        assert_eq!(descriptor.name(), name);
    }

    #[rstest]
    fn memoises_per_type(registry: TypeRegistry) {
        let first = registry.describe_type::<Settings>().expect("describe");
        let second = registry.describe_type::<Option<Settings>>().expect("describe");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[rstest]
    fn self_referential_types_resolve_to_one_descriptor(registry: TypeRegistry) {
        let node = registry.describe_type::<Node>().expect("describe");
        let next = node.property("next").expect("next property");
        assert!(Arc::ptr_eq(next.descriptor(), &node));
        let children = node.property("children").expect("children property");
        let element = children.descriptor().component().expect("element type");
        assert!(Arc::ptr_eq(element, &node));
    }

    #[rstest]
    fn pairs_accessors_with_mutators(registry: TypeRegistry) {
        let settings = registry.describe_type::<Settings>().expect("describe");
        let names: Vec<&str> = settings.properties().map(Property::name).collect();
        // `revision` has no mutator and `label` only a mutator of another type.
        assert_eq!(
            names,
            ["fallback", "limits", "mode", "port", "readOnly", "tags", "timeoutMs"]
        );
    }

    #[rstest]
    fn enum_accessor_pairs_with_ordinal_mutator(registry: TypeRegistry) {
        let settings = registry.describe_type::<Settings>().expect("describe");
        let mode = settings.property("mode").expect("mode property");
        assert_eq!(mode.descriptor().kind(), Kind::Enum);

        let mut instance = settings.construct().expect("construct");
        mode.write(instance.as_mut(), Native::Enum(EnumLiteral::new("Live", 0)))
            .expect("write mode");
        assert_eq!(mode.read(instance.as_ref()), Native::Enum(EnumLiteral::new("Live", 0)));
    }

    #[rstest]
    fn captures_default_values(registry: TypeRegistry) {
        let settings = registry.describe_type::<Settings>().expect("describe");
        assert_eq!(settings.default_value("port"), Some(&Native::Integer(7496)));
        assert_eq!(
            settings.default_value("mode"),
            Some(&Native::Enum(EnumLiteral::new("Paper", 1)))
        );
        assert_eq!(settings.default_value("timeoutMs"), Some(&Native::Null));
    }

    #[rstest]
    fn composites_without_constructor_have_no_defaults(registry: TypeRegistry) {
        let detached = registry.describe_type::<Detached>().expect("describe");
        assert!(!detached.has_constructor());
        assert!(detached.construct().is_none());
        assert_eq!(detached.default_value("name"), None);
    }

    #[rstest]
    fn unsupported_types_are_configuration_errors(registry: TypeRegistry) {
        let error = registry
            .describe_type::<Vec<Unbridgeable>>()
            .expect_err("should fail");
        assert_eq!(error, DescribeError::unsupported("Unbridgeable"));
    }

    #[rstest]
    fn concurrent_describers_see_resolved_properties(registry: TypeRegistry) {
        let counts: Vec<usize> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        let node = registry.describe_type::<Node>().expect("describe node");
                        let settings =
                            registry.describe_type::<Settings>().expect("describe settings");
                        node.properties().count() + settings.properties().count()
                    })
                })
                .collect();
            workers
                .into_iter()
                .map(|worker| worker.join().expect("describer thread"))
                .collect()
        });
        let sequential = TypeRegistry::new();
        let expected = sequential.describe_type::<Node>().expect("node").properties().count()
            + sequential.describe_type::<Settings>().expect("settings").properties().count();
        assert!(counts.iter().all(|count| *count == expected), "{counts:?} != {expected}");
    }

    #[rstest]
    fn display_lists_properties(registry: TypeRegistry) {
        let tag = registry.describe_type::<Tag>().expect("describe");
        assert_eq!(tag.to_string(), "Tag[name, value]");
    }
}
