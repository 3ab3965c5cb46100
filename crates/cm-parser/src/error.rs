//! Error types for the cm-parser crate.

use cm_core::NamespaceError;

/// Errors that can occur while parsing a model document.
///
/// Parse errors are always fatal to the model being registered; they are
/// never silently skipped.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The document is not valid JSON or does not match the model schema.
    #[error("malformed model document: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Two declarations of the same kind share a local name.
    #[error("duplicate {kind} name '{name}' in model '{model}'")]
    DuplicateName {
        /// The declaration kind ("type", "aspect", "property", ...).
        kind: &'static str,
        /// The duplicated prefixed name.
        name: String,
        /// The model containing the duplicates.
        model: String,
    },

    /// A name is not a well-formed `prefix:local` string.
    #[error(transparent)]
    Name(#[from] NamespaceError),
}

impl ParseError {
    /// Returns the stable, machine-checkable identifier for this error.
    #[must_use]
    pub const fn message_id(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "dictionary.parse.malformed",
            Self::DuplicateName { .. } => "dictionary.parse.duplicate_name",
            Self::Name(err) => err.message_id(),
        }
    }
}
