//! Property declarations.

use serde::{Deserialize, Serialize};

use super::constraint::ConstraintRef;

/// Indexing hint for a property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum IndexMode {
    /// Not indexed.
    None,
    /// Indexed for exact-value lookup only.
    Values,
    /// Indexed for full-text search only.
    FullText,
    /// Indexed for both exact-value lookup and full-text search.
    #[default]
    Both,
}

impl IndexMode {
    /// Returns `true` if the property is indexed in any way.
    #[inline]
    #[must_use]
    pub const fn is_indexed(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// A property declaration inside a type or aspect.
///
/// Every attribute other than `name` is optional so that a subclass
/// redeclaration can override individual attributes: an unset attribute
/// inherits the ancestor's value unchanged. A fresh declaration (no
/// ancestor declares the same qualified name) must set `data_type`; the
/// compiler rejects it otherwise.
///
/// # Examples
///
/// ```
/// use cm_core::PropertyDecl;
///
/// let prop = PropertyDecl::new("ex:name", "d:text").with_mandatory(true);
/// assert_eq!(prop.data_type.as_deref(), Some("d:text"));
/// assert_eq!(prop.mandatory, Some(true));
/// assert_eq!(prop.enforced, None); // unset: inherits (or defaults)
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyDecl {
    /// The property name as a prefixed string.
    pub name: String,

    /// Display title.
    pub title: Option<String>,

    /// Display description.
    pub description: Option<String>,

    /// Prefixed name of the property's data type.
    #[serde(rename = "type")]
    pub data_type: Option<String>,

    /// Default value literal.
    pub default_value: Option<String>,

    /// Whether the property holds multiple values.
    pub multiple: Option<bool>,

    /// Whether a value is required.
    pub mandatory: Option<bool>,

    /// Whether the mandatory requirement is enforced on write.
    pub enforced: Option<bool>,

    /// Whether the property is system-maintained and rejects client writes.
    pub protected: Option<bool>,

    /// Indexing hint.
    pub indexed: Option<IndexMode>,

    /// Property-level locale-analyser bundle identifier.
    pub analyser_bundle: Option<String>,

    /// Constraint references, in declaration order.
    ///
    /// On redeclaration these accumulate after the ancestor's resolved
    /// list; order is significant.
    pub constraints: Vec<ConstraintRef>,
}

impl PropertyDecl {
    /// Creates a property declaration with a data type.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: Some(data_type.into()),
            ..Self::default()
        }
    }

    /// Creates a redeclaration carrying only the name.
    ///
    /// Use the `with_*` builders to set the attributes being overridden.
    #[must_use]
    pub fn override_of(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the mandatory flag.
    #[must_use]
    pub const fn with_mandatory(mut self, mandatory: bool) -> Self {
        self.mandatory = Some(mandatory);
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Appends a constraint reference.
    #[must_use]
    pub fn with_constraint(mut self, constraint: ConstraintRef) -> Self {
        self.constraints.push(constraint);
        self
    }
}
