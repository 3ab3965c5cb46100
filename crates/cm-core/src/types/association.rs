//! Association declarations.

use serde::{Deserialize, Serialize};

/// Whether an association is a plain peer reference or a parent-child
/// containment edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum AssociationKind {
    /// A directed peer-to-peer reference.
    #[default]
    Peer,
    /// A parent-child containment edge.
    Child,
}

impl AssociationKind {
    /// Returns `true` for parent-child associations.
    #[inline]
    #[must_use]
    pub const fn is_child(self) -> bool {
        matches!(self, Self::Child)
    }
}

/// A directed association declared by a class.
///
/// The declaring class is the source; `target_class` names the target.
/// Cardinality and mandatory flags default to optional/single when unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationDecl {
    /// The association name as a prefixed string.
    pub name: String,

    /// Display title.
    pub title: Option<String>,

    /// Display description.
    pub description: Option<String>,

    /// Peer or child.
    pub kind: AssociationKind,

    /// Prefixed name of the target class.
    pub target_class: String,

    /// Role name at the source end.
    pub source_role: Option<String>,

    /// Role name at the target end.
    pub target_role: Option<String>,

    /// Whether the source end must exist.
    pub source_mandatory: Option<bool>,

    /// Whether the source end allows many participants.
    pub source_many: Option<bool>,

    /// Whether the target end must exist.
    pub target_mandatory: Option<bool>,

    /// Whether the target end allows many participants.
    pub target_many: Option<bool>,

    /// Child associations only: whether child timestamp changes propagate
    /// to the parent. Defaults to `false`.
    pub propagate_timestamps: Option<bool>,
}

impl AssociationDecl {
    /// Creates a peer association declaration.
    #[must_use]
    pub fn new(name: impl Into<String>, target_class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_class: target_class.into(),
            ..Self::default()
        }
    }

    /// Creates a child association declaration.
    #[must_use]
    pub fn child(name: impl Into<String>, target_class: impl Into<String>) -> Self {
        Self {
            kind: AssociationKind::Child,
            ..Self::new(name, target_class)
        }
    }
}
