//! Runtime values exchanged between the codec and bridged targets.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use serde_json::Value;
use thiserror::Error;

use crate::object::{Object, ObjectBox};

/// A decoded value, shaped by the descriptor it was decoded against.
#[derive(Debug, Clone, PartialEq)]
pub enum Native {
    /// Absent value.
    Null,
    /// `true` or `false`.
    Boolean(bool),
    /// A single character.
    Character(char),
    /// Text.
    String(String),
    /// 32-bit integer.
    Integer(i32),
    /// 64-bit integer.
    Long(i64),
    /// Double precision float.
    Double(f64),
    /// Arbitrary precision integer.
    BigInteger(BigInt),
    /// Arbitrary precision decimal.
    BigDecimal(BigDecimal),
    /// Enumeration literal.
    Enum(EnumLiteral),
    /// Array, list or set elements in order.
    Sequence(Vec<Native>),
    /// Map entries in order.
    Map(Vec<(Native, Native)>),
    /// A single key/value pair.
    Entry(Box<Native>, Box<Native>),
    /// Composite instance.
    Object(ObjectBox),
    /// JSON kept as-is for untyped slots.
    Opaque(Value),
}

/// Literal of an enumeration with its declaration ordinal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumLiteral {
    /// Literal name as declared.
    pub name: String,
    /// Zero-based declaration position.
    pub ordinal: usize,
}

impl EnumLiteral {
    /// Builds a literal.
    #[must_use]
    pub fn new(name: impl Into<String>, ordinal: usize) -> Self {
        Self {
            name: name.into(),
            ordinal,
        }
    }
}

impl Native {
    /// Returns `true` for [`Native::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the variant, used in conversion errors.
    #[must_use]
    pub const fn variant_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Character(_) => "char",
            Self::String(_) => "String",
            Self::Integer(_) => "int",
            Self::Long(_) => "long",
            Self::Double(_) => "double",
            Self::BigInteger(_) => "BigInteger",
            Self::BigDecimal(_) => "BigDecimal",
            Self::Enum(_) => "enum",
            Self::Sequence(_) => "sequence",
            Self::Map(_) => "map",
            Self::Entry(..) => "entry",
            Self::Object(_) => "object",
            Self::Opaque(_) => "json",
        }
    }

    /// Converts the value into its natural JSON shape without a descriptor.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Boolean(value) => Value::Bool(*value),
            Self::Character(value) => Value::String(value.to_string()),
            Self::String(value) => Value::String(value.clone()),
            Self::Integer(value) => Value::from(*value),
            Self::Long(value) => Value::from(*value),
            Self::Double(value) => serde_json::Number::from_f64(*value).map_or(Value::Null, Value::Number),
            Self::BigInteger(value) => number_or_string(&value.to_string()),
            Self::BigDecimal(value) => number_or_string(&value.to_string()),
            Self::Enum(literal) => Value::String(literal.name.clone()),
            Self::Sequence(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.to_json()))
                    .collect(),
            ),
            Self::Entry(key, value) => {
                let mut object = serde_json::Map::new();
                object.insert("key".to_owned(), Value::String(key.to_string()));
                object.insert("value".to_owned(), value.to_json());
                Value::Object(object)
            }
            Self::Object(object) => Value::String(format!("{object:?}")),
            Self::Opaque(value) => value.clone(),
        }
    }
}

fn number_or_string(text: &str) -> Value {
    serde_json::Number::from_str(text).map_or_else(|_| Value::String(text.to_owned()), Value::Number)
}

/// String form of a value, as used for map keys.
impl fmt::Display for Native {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => formatter.write_str("null"),
            Self::Boolean(value) => write!(formatter, "{value}"),
            Self::Character(value) => write!(formatter, "{value}"),
            Self::String(value) => formatter.write_str(value),
            Self::Integer(value) => write!(formatter, "{value}"),
            Self::Long(value) => write!(formatter, "{value}"),
            Self::Double(value) => write!(formatter, "{value}"),
            Self::BigInteger(value) => write!(formatter, "{value}"),
            Self::BigDecimal(value) => write!(formatter, "{value}"),
            Self::Enum(literal) => formatter.write_str(&literal.name),
            Self::Opaque(Value::String(value)) => formatter.write_str(value),
            other => write!(formatter, "{}", other.to_json()),
        }
    }
}

/// Errors raised while converting a [`Native`] into a typed Rust value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// The value had the wrong shape.
    #[error("expected {expected} but found {found}")]
    Mismatch {
        /// Expected type name.
        expected: &'static str,
        /// Variant that was supplied.
        found: &'static str,
    },
    /// A required primitive received no value.
    #[error("missing value for {expected}")]
    Missing {
        /// Expected type name.
        expected: &'static str,
    },
    /// The value does not fit the target type.
    #[error("{value} is out of range for {expected}")]
    OutOfRange {
        /// Expected type name.
        expected: &'static str,
        /// Offending value.
        value: String,
    },
    /// No enumeration literal carries this name.
    #[error("{literal} is not a literal of {enumeration}")]
    UnknownLiteral {
        /// Enumeration name.
        enumeration: &'static str,
        /// Supplied literal.
        literal: String,
    },
    /// A fixed size array received the wrong number of elements.
    #[error("expected {expected} elements but found {found}")]
    Length {
        /// Declared length.
        expected: usize,
        /// Supplied length.
        found: usize,
    },
}

impl ConversionError {
    /// Builds a [`ConversionError::Mismatch`] for `found`.
    #[must_use]
    pub const fn mismatch(expected: &'static str, found: &Native) -> Self {
        Self::Mismatch {
            expected,
            found: found.variant_name(),
        }
    }

    /// Builds a [`ConversionError::UnknownLiteral`].
    #[must_use]
    pub fn unknown_literal(enumeration: &'static str, literal: impl Into<String>) -> Self {
        Self::UnknownLiteral {
            enumeration,
            literal: literal.into(),
        }
    }
}

/// Conversion of typed Rust values into [`Native`].
pub trait IntoNative {
    /// Performs the conversion.
    fn into_native(self) -> Native;
}

/// Conversion of [`Native`] into typed Rust values.
///
/// A `Null` becomes `None` for `Option<T>`, an empty value for strings,
/// containers and big numbers, and an error for the primitive types.
pub trait FromNative: Sized {
    /// Performs the conversion.
    fn from_native(native: Native) -> Result<Self, ConversionError>;
}

impl IntoNative for Native {
    fn into_native(self) -> Native {
        self
    }
}

impl FromNative for Native {
    fn from_native(native: Native) -> Result<Self, ConversionError> {
        Ok(native)
    }
}

impl IntoNative for bool {
    fn into_native(self) -> Native {
        Native::Boolean(self)
    }
}

impl FromNative for bool {
    fn from_native(native: Native) -> Result<Self, ConversionError> {
        match native {
            Native::Boolean(value) => Ok(value),
            Native::Null => Err(ConversionError::Missing {
                expected: "boolean",
            }),
            other => Err(ConversionError::mismatch("boolean", &other)),
        }
    }
}

impl IntoNative for char {
    fn into_native(self) -> Native {
        Native::Character(self)
    }
}

impl FromNative for char {
    fn from_native(native: Native) -> Result<Self, ConversionError> {
        match native {
            Native::Character(value) => Ok(value),
            Native::Null => Err(ConversionError::Missing { expected: "char" }),
            other => Err(ConversionError::mismatch("char", &other)),
        }
    }
}

impl IntoNative for String {
    fn into_native(self) -> Native {
        Native::String(self)
    }
}

impl FromNative for String {
    fn from_native(native: Native) -> Result<Self, ConversionError> {
        match native {
            Native::String(value) => Ok(value),
            Native::Null => Ok(Self::new()),
            Native::Character(value) => Ok(value.to_string()),
            other => Err(ConversionError::mismatch("String", &other)),
        }
    }
}

impl IntoNative for i32 {
    fn into_native(self) -> Native {
        Native::Integer(self)
    }
}

impl FromNative for i32 {
    fn from_native(native: Native) -> Result<Self, ConversionError> {
        match native {
            Native::Integer(value) => Ok(value),
            Native::Long(value) => Self::try_from(value).map_err(|_| ConversionError::OutOfRange {
                expected: "int",
                value: value.to_string(),
            }),
            // Enumerations stored through an integer mutator use their ordinal.
            Native::Enum(literal) => {
                Self::try_from(literal.ordinal).map_err(|_| ConversionError::OutOfRange {
                    expected: "int",
                    value: literal.ordinal.to_string(),
                })
            }
            Native::Null => Err(ConversionError::Missing { expected: "int" }),
            other => Err(ConversionError::mismatch("int", &other)),
        }
    }
}

impl IntoNative for i64 {
    fn into_native(self) -> Native {
        Native::Long(self)
    }
}

impl FromNative for i64 {
    fn from_native(native: Native) -> Result<Self, ConversionError> {
        match native {
            Native::Long(value) => Ok(value),
            Native::Integer(value) => Ok(Self::from(value)),
            Native::Null => Err(ConversionError::Missing { expected: "long" }),
            other => Err(ConversionError::mismatch("long", &other)),
        }
    }
}

impl IntoNative for f64 {
    fn into_native(self) -> Native {
        Native::Double(self)
    }
}

impl FromNative for f64 {
    fn from_native(native: Native) -> Result<Self, ConversionError> {
        match native {
            Native::Double(value) => Ok(value),
            Native::Integer(value) => Ok(Self::from(value)),
            Native::Null => Err(ConversionError::Missing { expected: "double" }),
            other => Err(ConversionError::mismatch("double", &other)),
        }
    }
}

impl IntoNative for BigInt {
    fn into_native(self) -> Native {
        Native::BigInteger(self)
    }
}

impl FromNative for BigInt {
    fn from_native(native: Native) -> Result<Self, ConversionError> {
        match native {
            Native::BigInteger(value) => Ok(value),
            Native::Integer(value) => Ok(Self::from(value)),
            Native::Long(value) => Ok(Self::from(value)),
            Native::Null => Ok(Self::default()),
            other => Err(ConversionError::mismatch("BigInteger", &other)),
        }
    }
}

impl IntoNative for BigDecimal {
    fn into_native(self) -> Native {
        Native::BigDecimal(self)
    }
}

impl FromNative for BigDecimal {
    fn from_native(native: Native) -> Result<Self, ConversionError> {
        match native {
            Native::BigDecimal(value) => Ok(value),
            Native::BigInteger(value) => Ok(Self::from(value)),
            Native::Integer(value) => Ok(Self::from(value)),
            Native::Long(value) => Ok(Self::from(value)),
            Native::Null => Ok(Self::default()),
            other => Err(ConversionError::mismatch("BigDecimal", &other)),
        }
    }
}

impl IntoNative for Value {
    fn into_native(self) -> Native {
        Native::Opaque(self)
    }
}

impl FromNative for Value {
    fn from_native(native: Native) -> Result<Self, ConversionError> {
        Ok(native.to_json())
    }
}

impl<T: IntoNative> IntoNative for Option<T> {
    fn into_native(self) -> Native {
        self.map_or(Native::Null, IntoNative::into_native)
    }
}

impl<T: FromNative> FromNative for Option<T> {
    fn from_native(native: Native) -> Result<Self, ConversionError> {
        match native {
            Native::Null => Ok(None),
            other => T::from_native(other).map(Some),
        }
    }
}

impl<T: IntoNative> IntoNative for Box<T> {
    fn into_native(self) -> Native {
        (*self).into_native()
    }
}

impl<T: FromNative> FromNative for Box<T> {
    fn from_native(native: Native) -> Result<Self, ConversionError> {
        T::from_native(native).map(Self::new)
    }
}

impl<T: IntoNative> IntoNative for Vec<T> {
    fn into_native(self) -> Native {
        Native::Sequence(self.into_iter().map(IntoNative::into_native).collect())
    }
}

impl<T: FromNative> FromNative for Vec<T> {
    fn from_native(native: Native) -> Result<Self, ConversionError> {
        elements(native, "list")?
            .into_iter()
            .map(T::from_native)
            .collect()
    }
}

impl<T: IntoNative> IntoNative for BTreeSet<T> {
    fn into_native(self) -> Native {
        Native::Sequence(self.into_iter().map(IntoNative::into_native).collect())
    }
}

impl<T: FromNative + Ord> FromNative for BTreeSet<T> {
    fn from_native(native: Native) -> Result<Self, ConversionError> {
        elements(native, "set")?
            .into_iter()
            .map(T::from_native)
            .collect()
    }
}

impl<T: IntoNative, const N: usize> IntoNative for [T; N] {
    fn into_native(self) -> Native {
        Native::Sequence(self.into_iter().map(IntoNative::into_native).collect())
    }
}

impl<T: FromNative, const N: usize> FromNative for [T; N] {
    fn from_native(native: Native) -> Result<Self, ConversionError> {
        let items = Vec::<T>::from_native(native)?;
        let found = items.len();
        items
            .try_into()
            .map_err(|_| ConversionError::Length { expected: N, found })
    }
}

impl<K: IntoNative, V: IntoNative> IntoNative for BTreeMap<K, V> {
    fn into_native(self) -> Native {
        Native::Map(
            self.into_iter()
                .map(|(key, value)| (key.into_native(), value.into_native()))
                .collect(),
        )
    }
}

impl<K: FromNative + Ord, V: FromNative> FromNative for BTreeMap<K, V> {
    fn from_native(native: Native) -> Result<Self, ConversionError> {
        match native {
            Native::Map(entries) => entries
                .into_iter()
                .map(|(key, value)| Ok((K::from_native(key)?, V::from_native(value)?)))
                .collect(),
            Native::Null => Ok(Self::new()),
            other => Err(ConversionError::mismatch("map", &other)),
        }
    }
}

impl<K: IntoNative, V: IntoNative> IntoNative for (K, V) {
    fn into_native(self) -> Native {
        Native::Entry(Box::new(self.0.into_native()), Box::new(self.1.into_native()))
    }
}

impl<K: FromNative, V: FromNative> FromNative for (K, V) {
    fn from_native(native: Native) -> Result<Self, ConversionError> {
        match native {
            Native::Entry(key, value) => Ok((K::from_native(*key)?, V::from_native(*value)?)),
            other => Err(ConversionError::mismatch("entry", &other)),
        }
    }
}

fn elements(native: Native, expected: &'static str) -> Result<Vec<Native>, ConversionError> {
    match native {
        Native::Sequence(items) => Ok(items),
        Native::Null => Ok(Vec::new()),
        other => Err(ConversionError::mismatch(expected, &other)),
    }
}

/// Wraps a composite value.
pub fn object_into_native<T: Object>(value: T) -> Native {
    Native::Object(ObjectBox::new(value))
}

/// Recovers a composite value; `Null` yields the type's default instance.
pub fn object_from_native<T: Object + Default>(
    native: Native,
    expected: &'static str,
) -> Result<T, ConversionError> {
    match native {
        Native::Object(object) => object.downcast::<T>().ok_or(ConversionError::Mismatch {
            expected,
            found: "object",
        }),
        Native::Null => Ok(T::default()),
        other => Err(ConversionError::mismatch(expected, &other)),
    }
}

/// Recovers an enumeration literal name from a decoded value.
pub fn literal_name(native: Native, expected: &'static str) -> Result<String, ConversionError> {
    match native {
        Native::Enum(literal) => Ok(literal.name),
        Native::String(name) => Ok(name),
        Native::Null => Err(ConversionError::Missing { expected }),
        other => Err(ConversionError::mismatch(expected, &other)),
    }
}
