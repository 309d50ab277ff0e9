//! Type descriptors, value codec and command table for the line bridge.
//!
//! Bridged types declare their shape through [`Reflect`]. The
//! [`TypeRegistry`] turns declarations into shared [`TypeDescriptor`]s, the
//! [`codec`] converts between protocol JSON and [`Native`] values guided by
//! those descriptors, and the [`CommandTable`] indexes the operations of
//! bridged action sources by name.

pub mod codec;
pub mod commands;
pub mod descriptor;
pub mod events;
pub mod native;
mod object;
pub mod reflect;

#[cfg(test)]
mod test_support;

pub use codec::{CodecError, decode, encode, encode_untyped};
pub use commands::{
    ActionSource, Arguments, CommandError, CommandTable, CommandTableBuilder, Interface,
    InvocationError, Operation, Parameter, Targets,
};
pub use descriptor::{DescribeError, Kind, Property, TypeDescriptor, TypeRegistry};
pub use events::{EventArgument, EventSet, EventSignature, render_event};
pub use native::{ConversionError, EnumLiteral, FromNative, IntoNative, Native};
pub use object::{Object, ObjectBox};
pub use reflect::{ClassInfo, Composite, EnumInfo, Reflect, TypeInfo, TypeRef};

pub(crate) const SCHEMA_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::schema");
