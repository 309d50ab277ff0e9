use thiserror::Error;

use crate::native::ConversionError;

/// Failures reported by an operation while it runs.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// An argument could not be converted to the parameter type.
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    /// The operation reported a failure.
    #[error("{message}")]
    Failed {
        /// Human readable reason.
        message: String,
    },
    /// The session holds no instance of the declaring source.
    #[error("no target implements {owner}")]
    MissingTarget {
        /// Rust name of the declaring source.
        owner: &'static str,
    },
}

impl InvocationError {
    /// Builds an [`InvocationError::Failed`].
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Errors raised by [`crate::CommandTable`] lookups and invocations.
#[derive(Debug, Error)]
pub enum CommandError {
    /// No operation is registered under the name.
    #[error("{name}?")]
    NotFound {
        /// Requested name.
        name: String,
    },
    /// The operation failed.
    #[error(transparent)]
    Invocation(#[from] InvocationError),
}

impl CommandError {
    pub(crate) fn not_found(name: &str) -> Self {
        Self::NotFound {
            name: name.to_owned(),
        }
    }
}
