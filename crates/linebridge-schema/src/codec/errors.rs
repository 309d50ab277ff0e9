use thiserror::Error;

use crate::native::ConversionError;

/// Errors raised while decoding protocol JSON.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The text is neither JSON nor a bare word.
    #[error("malformed JSON {text}: {source}")]
    Malformed {
        /// Offending text.
        text: String,
        /// Parser failure.
        #[source]
        source: serde_json::Error,
    },
    /// A number could not be read as the expected numeric type.
    #[error("cannot convert {text} to {expected}")]
    Number {
        /// Target type name.
        expected: &'static str,
        /// Text that failed to parse.
        text: String,
    },
    /// A JSON object was required.
    #[error("Expected {json} to be an object")]
    ExpectedObject {
        /// Offending JSON.
        json: String,
    },
    /// An empty string cannot become a character.
    #[error("cannot convert an empty string to char")]
    EmptyCharacter,
    /// No literal of the enumeration has this name.
    #[error("{literal} is not a literal of {enumeration}")]
    UnknownLiteral {
        /// Enumeration name.
        enumeration: String,
        /// Supplied literal.
        literal: String,
    },
    /// The composite cannot be instantiated.
    #[error("{type_name} has no default constructor")]
    MissingConstructor {
        /// Composite name.
        type_name: String,
    },
    /// A decoded property was rejected by its mutator.
    #[error("cannot set {property}: {source}")]
    Property {
        /// Property name.
        property: String,
        /// Conversion failure.
        #[source]
        source: ConversionError,
    },
    /// Decoding failed for a positional argument.
    #[error("argument {position}: {source}")]
    Argument {
        /// One-based argument position.
        position: usize,
        /// Underlying failure.
        #[source]
        source: Box<CodecError>,
    },
}

impl CodecError {
    /// Attributes the error to a one-based argument position.
    #[must_use]
    pub fn at_argument(self, position: usize) -> Self {
        Self::Argument {
            position,
            source: Box::new(self),
        }
    }

    pub(crate) fn number(expected: &'static str, text: impl Into<String>) -> Self {
        Self::Number {
            expected,
            text: text.into(),
        }
    }
}
