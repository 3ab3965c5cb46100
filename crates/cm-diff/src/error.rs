//! Error types for model diffing.

/// Errors raised by the diff engine.
///
/// Diff-input errors are programmer errors, not data errors: they surface
/// immediately and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    /// Both diff inputs were absent.
    #[error("no previous version of model to delete")]
    NoInput,
}

impl DiffError {
    /// Returns the stable, machine-checkable identifier for this error.
    #[must_use]
    pub const fn message_id(&self) -> &'static str {
        match self {
            Self::NoInput => "dictionary.diff.no_input",
        }
    }
}
