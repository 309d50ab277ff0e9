//! Conversion between protocol JSON text and [`Native`](crate::Native)
//! values.
//!
//! Encoding never fails. Decoding is lenient in the ways the protocol
//! promises: scalars coerce between JSON shapes, a lone value is wrapped when
//! a container is expected, and composites only receive the properties that
//! are present.

mod decode;
mod encode;
mod errors;

pub use self::decode::decode;
pub use self::encode::{encode, encode_untyped};
pub use self::errors::CodecError;

#[cfg(test)]
mod tests;
