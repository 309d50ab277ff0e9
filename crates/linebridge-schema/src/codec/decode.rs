use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use serde_json::Value;

use super::CodecError;
use crate::descriptor::{Kind, TypeDescriptor};
use crate::native::{EnumLiteral, Native};
use crate::object::ObjectBox;

/// Decodes JSON text against a descriptor.
///
/// Text that is not JSON but forms a single bare word is taken as a string.
pub fn decode(text: &str, descriptor: &TypeDescriptor) -> Result<Native, CodecError> {
    let json = parse(text)?;
    from_json(&json, descriptor)
}

fn parse(text: &str) -> Result<Value, CodecError> {
    match serde_json::from_str::<Value>(text) {
        Ok(json) => Ok(json),
        Err(_) if is_bare_word(text) => Ok(Value::String(text.to_owned())),
        Err(source) => Err(CodecError::Malformed {
            text: text.to_owned(),
            source,
        }),
    }
}

fn is_bare_word(text: &str) -> bool {
    !text.is_empty()
        && !text
            .chars()
            .any(|character| character.is_whitespace() || "{}[]\",:".contains(character))
}

fn from_json(json: &Value, descriptor: &TypeDescriptor) -> Result<Native, CodecError> {
    match descriptor.kind() {
        Kind::Boolean => Ok(Native::Boolean(boolean(json))),
        Kind::Character => character(json),
        Kind::String => Ok(match json {
            Value::Null => Native::Null,
            Value::String(text) => Native::String(text.clone()),
            other => Native::String(other.to_string()),
        }),
        Kind::Integer => parse_number(json, "int").map(Native::Integer),
        Kind::Long => parse_number(json, "long").map(Native::Long),
        Kind::Double => parse_number(json, "double").map(Native::Double),
        Kind::BigInteger => parse_number::<BigInt>(json, "BigInteger").map(Native::BigInteger),
        Kind::BigDecimal => {
            parse_number::<BigDecimal>(json, "BigDecimal").map(Native::BigDecimal)
        }
        Kind::Enum => enumeration(json, descriptor),
        Kind::Array | Kind::List | Kind::Set => sequence(json, descriptor),
        Kind::Map => map(json, descriptor),
        Kind::Entry => entry(json, descriptor),
        Kind::Composite => composite(json, descriptor),
        Kind::Opaque => Ok(generic(json)),
    }
}

/// `null` and `false` are false, strings are true when non-empty, and every
/// other value is true.
fn boolean(json: &Value) -> bool {
    match json {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::String(text) => !text.is_empty(),
        _ => true,
    }
}

fn string_form(json: &Value) -> String {
    match json {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn character(json: &Value) -> Result<Native, CodecError> {
    if json.is_null() {
        return Ok(Native::Null);
    }
    string_form(json)
        .chars()
        .next()
        .map(Native::Character)
        .ok_or(CodecError::EmptyCharacter)
}

/// `null` and `false` read as zero, `true` as one, numbers and strings by
/// their text.
fn parse_number<T: FromStr>(json: &Value, expected: &'static str) -> Result<T, CodecError> {
    let text = match json {
        Value::Null | Value::Bool(false) => "0".to_owned(),
        Value::Bool(true) => "1".to_owned(),
        Value::String(text) => text.trim().to_owned(),
        other => other.to_string(),
    };
    text.parse::<T>()
        .map_err(|_| CodecError::number(expected, text))
}

fn enumeration(json: &Value, descriptor: &TypeDescriptor) -> Result<Native, CodecError> {
    if json.is_null() {
        return Ok(Native::Null);
    }
    let name = string_form(json);
    match descriptor.ordinal(&name) {
        Some(ordinal) => Ok(Native::Enum(EnumLiteral::new(name, ordinal))),
        None => Err(CodecError::UnknownLiteral {
            enumeration: descriptor.name().to_owned(),
            literal: name,
        }),
    }
}

fn component_of(descriptor: &TypeDescriptor) -> Option<&TypeDescriptor> {
    descriptor.component().map(|component| &**component)
}

fn element(json: &Value, component: Option<&TypeDescriptor>) -> Result<Native, CodecError> {
    match component {
        Some(component) => from_json(json, component),
        None => Ok(generic(json)),
    }
}

fn sequence(json: &Value, descriptor: &TypeDescriptor) -> Result<Native, CodecError> {
    let component = component_of(descriptor);
    let mut items = match json {
        Value::Null => return Ok(Native::Null),
        Value::Array(values) => values
            .iter()
            .map(|value| element(value, component))
            .collect::<Result<Vec<_>, _>>()?,
        single => vec![element(single, component)?],
    };
    if descriptor.kind() == Kind::Set {
        let mut unique: Vec<Native> = Vec::with_capacity(items.len());
        for item in items.drain(..) {
            if !unique.contains(&item) {
                unique.push(item);
            }
        }
        items = unique;
    }
    Ok(Native::Sequence(items))
}

fn map(json: &Value, descriptor: &TypeDescriptor) -> Result<Native, CodecError> {
    let object = match json {
        Value::Null => return Ok(Native::Null),
        Value::Object(object) => object,
        other => {
            return Err(CodecError::ExpectedObject {
                json: other.to_string(),
            });
        }
    };
    let key_type = descriptor.key().map(|key| &**key);
    let component = component_of(descriptor);
    object
        .iter()
        .map(|(key, value)| {
            Ok((
                element(&Value::String(key.clone()), key_type)?,
                element(value, component)?,
            ))
        })
        .collect::<Result<Vec<_>, CodecError>>()
        .map(Native::Map)
}

fn entry(json: &Value, descriptor: &TypeDescriptor) -> Result<Native, CodecError> {
    let object = match json {
        Value::Null => return Ok(Native::Null),
        Value::Object(object) => object,
        other => {
            return Err(CodecError::ExpectedObject {
                json: other.to_string(),
            });
        }
    };
    let key = match object.get("key") {
        Some(key) => element(
            &Value::String(string_form(key)),
            descriptor.key().map(|key| &**key),
        )?,
        None => Native::Null,
    };
    let value = match object.get("value") {
        Some(value) => element(value, component_of(descriptor))?,
        None => Native::Null,
    };
    Ok(Native::Entry(Box::new(key), Box::new(value)))
}

fn composite(json: &Value, descriptor: &TypeDescriptor) -> Result<Native, CodecError> {
    let object = match json {
        Value::Null => return Ok(Native::Null),
        Value::Object(object) => object,
        other => {
            return Err(CodecError::ExpectedObject {
                json: other.to_string(),
            });
        }
    };
    let mut instance = descriptor
        .construct()
        .ok_or_else(|| CodecError::MissingConstructor {
            type_name: descriptor.name().to_owned(),
        })?;
    for (name, value) in object {
        let Some(property) = descriptor.property(name) else {
            continue;
        };
        let decoded = from_json(value, property.descriptor())?;
        property
            .write(instance.as_mut(), decoded)
            .map_err(|source| CodecError::Property {
                property: name.clone(),
                source,
            })?;
    }
    Ok(Native::Object(ObjectBox::from_boxed(instance)))
}

/// Natural shape of JSON in an untyped slot.
fn generic(json: &Value) -> Native {
    match json {
        Value::Null => Native::Null,
        Value::Bool(flag) => Native::Boolean(*flag),
        Value::String(text) => Native::String(text.clone()),
        Value::Number(number) => number.as_i64().map_or_else(
            || {
                BigDecimal::from_str(&number.to_string())
                    .map_or_else(|_| Native::Opaque(json.clone()), Native::BigDecimal)
            },
            Native::Long,
        ),
        Value::Array(values) => Native::Sequence(values.iter().map(generic).collect()),
        Value::Object(_) => Native::Opaque(json.clone()),
    }
}
