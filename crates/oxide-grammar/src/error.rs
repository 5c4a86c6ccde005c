//! Error types for query and schema compilation.

/// Errors raised while building or compiling statements.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A fluent call received input it cannot represent.
    #[error("Invalid {context}: {message}")]
    Construction {
        /// The builder call that rejected the input.
        context: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// The selected grammar has no rendering for the requested feature.
    #[error("The {grammar} grammar does not support {operation}")]
    UnsupportedOperation {
        /// Name of the grammar that failed.
        grammar: &'static str,
        /// The clause, command, or operator that was requested.
        operation: String,
    },

    /// The emitted placeholders and the flattened bindings disagree.
    #[error("Compiled statement has {placeholders} placeholders but {bindings} bindings")]
    CompileInvariant {
        /// Number of `?` placeholders found in the SQL text.
        placeholders: usize,
        /// Number of values in the binding array.
        bindings: usize,
    },

    /// Error surfaced by a connection implementation.
    #[error("Connection error: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A result row did not have the shape a processor expected.
    #[error("Failed to process result: {0}")]
    Processing(String),
}

impl Error {
    pub(crate) fn construction(context: &'static str, message: impl Into<String>) -> Self {
        Self::Construction {
            context,
            message: message.into(),
        }
    }

    pub(crate) fn unsupported(grammar: &'static str, operation: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            grammar,
            operation: operation.into(),
        }
    }
}

/// Result type for compilation and execution.
pub type Result<T, E = Error> = std::result::Result<T, E>;
