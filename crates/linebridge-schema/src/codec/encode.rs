use serde_json::Value;

use crate::descriptor::{Kind, TypeDescriptor};
use crate::native::Native;
use crate::object::Object;

/// Encodes a value as compact JSON text guided by its descriptor.
///
/// Composites carry only the properties whose value differs from the
/// type's default instance.
#[must_use]
pub fn encode(value: &Native, descriptor: &TypeDescriptor) -> String {
    let mut out = String::new();
    write_value(&mut out, value, Some(descriptor));
    out
}

/// Encodes a value by its own shape when no descriptor is available.
#[must_use]
pub fn encode_untyped(value: &Native) -> String {
    let mut out = String::new();
    write_value(&mut out, value, None);
    out
}

fn write_value(out: &mut String, value: &Native, descriptor: Option<&TypeDescriptor>) {
    let component = descriptor
        .and_then(TypeDescriptor::component)
        .map(|component| &**component);
    match value {
        Native::Null => out.push_str("null"),
        Native::Boolean(flag) => out.push_str(if *flag { "true" } else { "false" }),
        Native::Character(character) => write_string(out, &character.to_string()),
        Native::String(text) => write_string(out, text),
        Native::Integer(number) => out.push_str(&number.to_string()),
        Native::Long(number) => out.push_str(&number.to_string()),
        Native::Double(number) => match serde_json::Number::from_f64(*number) {
            Some(number) => out.push_str(&number.to_string()),
            None => out.push_str("null"),
        },
        Native::BigInteger(number) => out.push_str(&number.to_string()),
        Native::BigDecimal(number) => out.push_str(&number.to_string()),
        Native::Enum(literal) => write_string(out, &literal.name),
        Native::Sequence(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_value(out, item, component);
            }
            out.push(']');
        }
        Native::Map(entries) => {
            out.push('{');
            for (index, (key, item)) in entries.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_string(out, &key.to_string());
                out.push(':');
                write_value(out, item, component);
            }
            out.push('}');
        }
        Native::Entry(key, item) => {
            out.push_str("{\"key\":");
            write_string(out, &key.to_string());
            out.push_str(",\"value\":");
            write_value(out, item, component);
            out.push('}');
        }
        Native::Object(object) => match descriptor {
            Some(descriptor) if descriptor.kind() == Kind::Composite => {
                write_composite(out, object.as_object(), descriptor);
            }
            _ => out.push_str("{}"),
        },
        Native::Opaque(json) => out.push_str(&json.to_string()),
    }
}

fn write_composite(out: &mut String, object: &dyn Object, descriptor: &TypeDescriptor) {
    out.push('{');
    let mut first = true;
    for property in descriptor.properties() {
        let value = property.read(object);
        let differs = descriptor
            .default_value(property.name())
            .map_or(!value.is_null(), |default| *default != value);
        if !differs {
            continue;
        }
        if !first {
            out.push(',');
        }
        first = false;
        write_string(out, property.name());
        out.push(':');
        write_value(out, &value, Some(property.descriptor()));
    }
    out.push('}');
}

fn write_string(out: &mut String, text: &str) {
    out.push_str(&Value::String(text.to_owned()).to_string());
}
