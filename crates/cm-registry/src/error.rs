//! Error types for the cm-registry crate.

use cm_compiler::CompileError;
use cm_core::NamespaceError;
use cm_parser::ParseError;

/// Errors raised by dictionary session operations.
///
/// Compilation and resolution errors are never recovered locally; they
/// propagate to the admin-operation caller with a stable message
/// identifier.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A model document failed structural parsing or validation.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A model failed compilation.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Registering a model's namespaces clashed with another model.
    #[error(transparent)]
    Namespace(#[from] NamespaceError),

    /// An operation referenced a model that is not registered.
    #[error("model '{model}' is not registered")]
    UnknownModel {
        /// The unknown model's qualified name.
        model: String,
    },
}

impl RegistryError {
    /// Returns the stable, machine-checkable identifier for this error.
    #[must_use]
    pub const fn message_id(&self) -> &'static str {
        match self {
            Self::Parse(err) => err.message_id(),
            Self::Compile(err) => err.message_id(),
            Self::Namespace(err) => err.message_id(),
            Self::UnknownModel { .. } => "dictionary.registry.unknown_model",
        }
    }

    /// Returns `true` for cyclic-inheritance compile failures.
    #[must_use]
    pub const fn is_cyclic(&self) -> bool {
        matches!(self, Self::Compile(err) if err.is_cyclic())
    }
}
