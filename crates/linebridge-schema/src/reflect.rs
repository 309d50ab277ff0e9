//! Static type declarations consumed by the descriptor engine.
//!
//! Bridged types describe themselves through [`Reflect`]. Scalars,
//! containers and JSON values are covered here; enumerations and composites
//! are declared with [`crate::bridged_enum!`] and [`crate::bridged_composite!`].

use std::any::{TypeId, type_name};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use serde_json::Value;

use crate::native::{ConversionError, FromNative, IntoNative, Native};
use crate::object::Object;

/// A type that can cross the bridge.
pub trait Reflect: 'static {
    /// Declares the shape of the type.
    fn type_info() -> TypeInfo;

    /// Reference to the type for use in parameter and property slots.
    #[must_use]
    fn type_ref() -> TypeRef
    where
        Self: Sized,
    {
        TypeRef::of::<Self>()
    }
}

/// Identity of a type in a particular slot.
#[derive(Clone, Copy)]
pub struct TypeRef {
    id: TypeId,
    rust_name: &'static str,
    info: fn() -> TypeInfo,
    nullable: bool,
}

impl TypeRef {
    /// Reference to `T` in a non-nullable slot.
    #[must_use]
    pub fn of<T: Reflect>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            rust_name: type_name::<T>(),
            info: T::type_info,
            nullable: false,
        }
    }

    /// The same type in a slot that accepts `null`.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Type identity used as the descriptor cache key.
    #[must_use]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    /// Rust path of the type, for diagnostics.
    #[must_use]
    pub const fn rust_name(&self) -> &'static str {
        self.rust_name
    }

    /// Evaluates the declaration.
    #[must_use]
    pub fn info(&self) -> TypeInfo {
        (self.info)()
    }

    /// Returns `true` when the slot accepts `null`.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.nullable == other.nullable
    }
}

impl Eq for TypeRef {}

impl fmt::Debug for TypeRef {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TypeRef")
            .field("type", &self.rust_name)
            .field("nullable", &self.nullable)
            .finish()
    }
}

/// Declared shape of a type.
pub enum TypeInfo {
    /// `bool`.
    Boolean,
    /// `char`.
    Character,
    /// Text.
    String,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    Long,
    /// Double precision float.
    Double,
    /// Arbitrary precision integer.
    BigInteger,
    /// Arbitrary precision decimal.
    BigDecimal,
    /// Enumeration with ordered literals.
    Enum(EnumInfo),
    /// Fixed size array of the component type.
    Array(TypeRef),
    /// Ordered list; `None` for untyped elements.
    List(Option<TypeRef>),
    /// Set; `None` for untyped elements.
    Set(Option<TypeRef>),
    /// Map of key type to value type; `None` for untyped entries.
    Map(Option<(TypeRef, TypeRef)>),
    /// Single key/value pair.
    Entry(Option<(TypeRef, TypeRef)>),
    /// Composite with properties.
    Class(ClassInfo),
    /// Arbitrary JSON.
    Opaque,
    /// A type the bridge cannot carry.
    Unsupported(&'static str),
}

/// Declaration of an enumeration.
#[derive(Debug, Clone, Copy)]
pub struct EnumInfo {
    name: &'static str,
    literals: &'static [&'static str],
}

impl EnumInfo {
    /// Declares an enumeration with literals in ordinal order.
    #[must_use]
    pub const fn new(name: &'static str, literals: &'static [&'static str]) -> Self {
        Self { name, literals }
    }

    /// Declared name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Literals in ordinal order.
    #[must_use]
    pub const fn literals(&self) -> &'static [&'static str] {
        self.literals
    }
}

pub(crate) type Constructor = Arc<dyn Fn() -> Box<dyn Object> + Send + Sync>;
pub(crate) type Getter = Arc<dyn Fn(&dyn Object) -> Native + Send + Sync>;
pub(crate) type Setter =
    Arc<dyn Fn(&mut dyn Object, Native) -> Result<(), ConversionError> + Send + Sync>;

/// A named reader of a composite.
#[derive(Clone)]
pub struct Accessor {
    pub(crate) name: String,
    pub(crate) value_type: TypeRef,
    pub(crate) get: Getter,
}

/// A named one-argument writer of a composite.
#[derive(Clone)]
pub struct Mutator {
    pub(crate) name: String,
    pub(crate) value_type: TypeRef,
    pub(crate) set: Setter,
}

/// Declaration of a composite type.
///
/// Accessors and mutators are declared independently; the descriptor engine
/// pairs them by name and type when it resolves properties.
///
/// ```ignore
/// ClassInfo::new("Tag")
///     .constructor(Tag::default)
///     .property("name", |tag: &Tag| tag.name.clone(), |tag: &mut Tag, name| tag.name = name)
/// ```
#[derive(Clone)]
pub struct ClassInfo {
    pub(crate) name: &'static str,
    pub(crate) constructor: Option<Constructor>,
    pub(crate) accessors: Vec<Accessor>,
    pub(crate) mutators: Vec<Mutator>,
}

impl ClassInfo {
    /// Declares a composite without a default constructor.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            constructor: None,
            accessors: Vec::new(),
            mutators: Vec::new(),
        }
    }

    /// Registers the zero-argument constructor.
    #[must_use]
    pub fn constructor<T: Object>(mut self, construct: fn() -> T) -> Self {
        self.constructor = Some(Arc::new(move || Box::new(construct()) as Box<dyn Object>));
        self
    }

    /// Registers a zero-argument reader.
    #[must_use]
    pub fn accessor<T, V>(mut self, name: &str, get: fn(&T) -> V) -> Self
    where
        T: Object,
        V: Reflect + IntoNative,
    {
        self.accessors.push(Accessor {
            name: name.to_owned(),
            value_type: V::type_ref(),
            get: Arc::new(move |object: &dyn Object| {
                object
                    .as_any()
                    .downcast_ref::<T>()
                    .map_or(Native::Null, |target| get(target).into_native())
            }),
        });
        self
    }

    /// Registers a one-argument writer.
    #[must_use]
    pub fn mutator<T, V>(mut self, name: &str, set: fn(&mut T, V)) -> Self
    where
        T: Object,
        V: Reflect + FromNative,
    {
        let owner = self.name;
        self.mutators.push(Mutator {
            name: name.to_owned(),
            value_type: V::type_ref(),
            set: Arc::new(move |object: &mut dyn Object, value: Native| {
                let target = object
                    .as_any_mut()
                    .downcast_mut::<T>()
                    .ok_or(ConversionError::Mismatch {
                        expected: owner,
                        found: "object",
                    })?;
                set(target, V::from_native(value)?);
                Ok(())
            }),
        });
        self
    }

    /// Registers a matching accessor and mutator pair.
    #[must_use]
    pub fn property<T, V>(self, name: &str, get: fn(&T) -> V, set: fn(&mut T, V)) -> Self
    where
        T: Object,
        V: Reflect + IntoNative + FromNative,
    {
        self.accessor(name, get).mutator(name, set)
    }

    /// Declared name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

/// Composite types with a default instance and a class declaration.
pub trait Composite: Object + Default {
    /// Declares the composite's constructor and properties.
    fn class() -> ClassInfo;
}

macro_rules! scalar_reflect {
    ($($ty:ty => $info:ident),+ $(,)?) => {
        $(
            impl Reflect for $ty {
                fn type_info() -> TypeInfo {
                    TypeInfo::$info
                }
            }
        )+
    };
}

scalar_reflect! {
    bool => Boolean,
    char => Character,
    String => String,
    i32 => Integer,
    i64 => Long,
    f64 => Double,
    BigInt => BigInteger,
    BigDecimal => BigDecimal,
    Value => Opaque,
    Native => Opaque,
}

impl<T: Reflect> Reflect for Option<T> {
    fn type_info() -> TypeInfo {
        T::type_info()
    }

    fn type_ref() -> TypeRef {
        T::type_ref().nullable()
    }
}

impl<T: Reflect> Reflect for Box<T> {
    fn type_info() -> TypeInfo {
        T::type_info()
    }

    fn type_ref() -> TypeRef {
        T::type_ref()
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::List(Some(T::type_ref()))
    }
}

impl<T: Reflect> Reflect for BTreeSet<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::Set(Some(T::type_ref()))
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn type_info() -> TypeInfo {
        TypeInfo::Array(T::type_ref())
    }
}

impl<K: Reflect, V: Reflect> Reflect for BTreeMap<K, V> {
    fn type_info() -> TypeInfo {
        TypeInfo::Map(Some((K::type_ref(), V::type_ref())))
    }
}

impl<K: Reflect, V: Reflect> Reflect for (K, V) {
    fn type_info() -> TypeInfo {
        TypeInfo::Entry(Some((K::type_ref(), V::type_ref())))
    }
}

/// Implements [`Reflect`], [`IntoNative`] and [`FromNative`] for a fieldless
/// enum. Literal ordinals follow the listed order.
#[macro_export]
macro_rules! bridged_enum {
    ($ty:ident { $($variant:ident),+ $(,)? }) => {
        impl $crate::Reflect for $ty {
            fn type_info() -> $crate::TypeInfo {
                $crate::TypeInfo::Enum($crate::EnumInfo::new(
                    stringify!($ty),
                    &[$(stringify!($variant)),+],
                ))
            }
        }

        impl $crate::IntoNative for $ty {
            fn into_native(self) -> $crate::Native {
                const LITERALS: &[&str] = &[$(stringify!($variant)),+];
                let name = match self {
                    $($ty::$variant => stringify!($variant),)+
                };
                let ordinal = LITERALS
                    .iter()
                    .position(|literal| *literal == name)
                    .unwrap_or_default();
                $crate::Native::Enum($crate::EnumLiteral::new(name, ordinal))
            }
        }

        impl $crate::FromNative for $ty {
            fn from_native(
                native: $crate::Native,
            ) -> ::std::result::Result<Self, $crate::ConversionError> {
                let name = $crate::native::literal_name(native, stringify!($ty))?;
                match name.as_str() {
                    $(stringify!($variant) => Ok($ty::$variant),)+
                    _ => Err($crate::ConversionError::unknown_literal(stringify!($ty), name)),
                }
            }
        }
    };
}

/// Implements [`Reflect`], [`IntoNative`] and [`FromNative`] for a type that
/// implements [`Composite`].
#[macro_export]
macro_rules! bridged_composite {
    ($ty:ty) => {
        impl $crate::Reflect for $ty {
            fn type_info() -> $crate::TypeInfo {
                $crate::TypeInfo::Class(<$ty as $crate::Composite>::class())
            }
        }

        impl $crate::IntoNative for $ty {
            fn into_native(self) -> $crate::Native {
                $crate::native::object_into_native(self)
            }
        }

        impl $crate::FromNative for $ty {
            fn from_native(
                native: $crate::Native,
            ) -> ::std::result::Result<Self, $crate::ConversionError> {
                $crate::native::object_from_native(native, stringify!($ty))
            }
        }
    };
}
