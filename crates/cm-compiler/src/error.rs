//! Error types for model compilation.
//!
//! Compilation errors are never recovered locally: they propagate to the
//! bootstrap or admin-operation caller. Every variant carries a stable
//! message identifier (see [`CompileError::message_id`]) so callers and
//! tests assert on the failure class rather than on free text.

use cm_core::NamespaceError;

/// Errors raised while compiling a raw model into a compiled model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum CompileError {
    /// A prefix environment or name resolution failure.
    #[error(transparent)]
    Namespace(#[from] NamespaceError),

    /// A class references a parent that cannot be resolved (unknown name,
    /// or a class of the wrong kind).
    #[error("class '{class}' references unresolvable parent '{parent}'")]
    UnresolvedParent {
        /// The declaring class.
        class: String,
        /// The unresolvable parent reference.
        parent: String,
    },

    /// A model imports a namespace no registered model provides.
    #[error("model '{model}' imports unregistered namespace '{uri}'")]
    UnresolvedImport {
        /// The importing model.
        model: String,
        /// The unknown namespace URI.
        uri: String,
    },

    /// A property references a data type that cannot be resolved, or a
    /// fresh declaration omits its data type.
    #[error("property '{property}' references unresolvable data type '{data_type}'")]
    UnresolvedDataType {
        /// The declaring property.
        property: String,
        /// The data-type reference (`<unset>` when omitted entirely).
        data_type: String,
    },

    /// A property references a named constraint that cannot be resolved.
    #[error("property '{property}' references unresolvable constraint '{constraint}'")]
    UnresolvedConstraint {
        /// The declaring property.
        property: String,
        /// The unresolvable constraint reference.
        constraint: String,
    },

    /// An association target or mandatory aspect cannot be resolved.
    #[error("class '{class}' references unresolvable {role} '{name}'")]
    UnresolvedClass {
        /// The declaring class.
        class: String,
        /// The unresolvable reference.
        name: String,
        /// The reference role ("association target" or "mandatory aspect").
        role: &'static str,
    },

    /// The class parent graph (or mandatory-aspect graph) contains a cycle.
    #[error("model '{model}' contains cyclic inheritance: {}", cycle.join(" -> "))]
    CyclicInheritance {
        /// The offending model.
        model: String,
        /// The cycle members, in traversal order.
        cycle: Vec<String>,
    },

    /// A property redeclaration changes the inherited data type.
    #[error(
        "class '{class}' overrides property '{property}' with incompatible data type \
         '{declared}' (inherited '{inherited}')"
    )]
    IncompatibleOverride {
        /// The overriding class.
        class: String,
        /// The overridden property.
        property: String,
        /// The inherited data type.
        inherited: String,
        /// The incompatible declared data type.
        declared: String,
    },

    /// Two definitions of the same kind resolve to the same qualified name.
    #[error("duplicate {kind} definition '{name}'")]
    DuplicateDefinition {
        /// The definition kind.
        kind: &'static str,
        /// The duplicated qualified name (prefixed form).
        name: String,
    },

    /// A class is declared in a namespace the model does not own.
    #[error("model '{model}' declares class '{class}' outside its own namespaces")]
    ForeignNamespace {
        /// The declaring model.
        model: String,
        /// The foreign class.
        class: String,
    },

    /// A constraint definition is invalid (bad regex, empty value list,
    /// inverted length bounds).
    #[error("invalid constraint '{name}': {reason}")]
    InvalidConstraint {
        /// The constraint name (prefixed form).
        name: String,
        /// Why the constraint is invalid.
        reason: String,
    },
}

impl CompileError {
    /// Returns the stable, machine-checkable identifier for this error.
    #[must_use]
    pub const fn message_id(&self) -> &'static str {
        match self {
            Self::Namespace(err) => err.message_id(),
            Self::UnresolvedParent { .. } => "dictionary.compile.unresolved_parent",
            Self::UnresolvedImport { .. } => "dictionary.compile.unresolved_import",
            Self::UnresolvedDataType { .. } => "dictionary.compile.unresolved_data_type",
            Self::UnresolvedConstraint { .. } => "dictionary.compile.unresolved_constraint",
            Self::UnresolvedClass { .. } => "dictionary.compile.unresolved_class",
            Self::CyclicInheritance { .. } => "dictionary.compile.cyclic_inheritance",
            Self::IncompatibleOverride { .. } => "dictionary.compile.incompatible_override",
            Self::DuplicateDefinition { .. } => "dictionary.compile.duplicate_definition",
            Self::ForeignNamespace { .. } => "dictionary.compile.foreign_namespace",
            Self::InvalidConstraint { .. } => "dictionary.compile.invalid_constraint",
        }
    }

    /// Returns `true` for cyclic-inheritance failures.
    ///
    /// Bootstrap distinguishes these from other compile failures in its
    /// own error identifiers.
    #[must_use]
    pub const fn is_cyclic(&self) -> bool {
        matches!(self, Self::CyclicInheritance { .. })
    }
}
