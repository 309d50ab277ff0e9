use thiserror::Error;

/// Configuration errors raised while describing bridged types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescribeError {
    /// The type declares itself unsupported.
    #[error("type {name} cannot be carried across the bridge")]
    Unsupported {
        /// Declared or Rust name of the type.
        name: String,
    },
    /// A property of a composite could not be described.
    #[error("property {property} of {owner}: {source}")]
    Property {
        /// Composite that declares the property.
        owner: String,
        /// Property name.
        property: String,
        /// Underlying failure.
        #[source]
        source: Box<DescribeError>,
    },
}

impl DescribeError {
    pub(crate) fn unsupported(name: impl Into<String>) -> Self {
        Self::Unsupported { name: name.into() }
    }

    pub(crate) fn property(owner: &str, property: &str, source: Self) -> Self {
        Self::Property {
            owner: owner.to_owned(),
            property: property.to_owned(),
            source: Box::new(source),
        }
    }
}
