//! Constraint declarations.
//!
//! Constraints are either named at model level and referenced from
//! properties, or declared inline on a single property. The closed set of
//! constraint kinds is: list-of-values, regex, string-length, and
//! references into the session's registered-constraint registry.

use serde::{Deserialize, Serialize};

/// A list-of-values constraint body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOfValuesDecl {
    /// The allowed values, in declaration order. Order is significant:
    /// display labels and positional consumers rely on it.
    pub values: Vec<String>,

    /// Whether value comparison is case sensitive.
    #[serde(default = "default_true")]
    pub case_sensitive: bool,

    /// Whether UIs should sort the values for display.
    #[serde(default)]
    pub sorted: bool,

    /// Key prefix for localised display labels
    /// (full key: `{label_key}.{value}`).
    #[serde(default)]
    pub label_key: Option<String>,
}

/// A regular-expression constraint body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexDecl {
    /// The expression, validated at compile time.
    pub expression: String,

    /// `true`: values must match. `false`: values must *not* match.
    #[serde(default = "default_true")]
    pub requires_match: bool,
}

/// A string-length constraint body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringLengthDecl {
    /// Minimum length in characters.
    #[serde(default)]
    pub min_length: usize,

    /// Maximum length in characters.
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

/// A reference to a constraint implementation registered on the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredDecl {
    /// The registration key.
    pub registered_name: String,
}

const fn default_true() -> bool {
    true
}

const fn default_max_length() -> usize {
    usize::MAX
}

/// The body of a constraint declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ConstraintBody {
    /// Restrict values to an explicit list.
    ListOfValues(ListOfValuesDecl),
    /// Restrict values by regular expression.
    Regex(RegexDecl),
    /// Restrict string length.
    StringLength(StringLengthDecl),
    /// Delegate to a registered constraint implementation.
    Registered(RegisteredDecl),
}

impl ConstraintBody {
    /// Returns a short kind label for diagnostics.
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::ListOfValues(_) => "list_of_values",
            Self::Regex(_) => "regex",
            Self::StringLength(_) => "string_length",
            Self::Registered(_) => "registered",
        }
    }
}

/// A named, model-level constraint declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintDecl {
    /// The constraint name as a prefixed string.
    pub name: String,

    /// Display title.
    #[serde(default)]
    pub title: Option<String>,

    /// Display description.
    #[serde(default)]
    pub description: Option<String>,

    /// The constraint body.
    #[serde(flatten)]
    pub body: ConstraintBody,
}

impl ConstraintDecl {
    /// Creates a named constraint declaration.
    #[must_use]
    pub fn new(name: impl Into<String>, body: ConstraintBody) -> Self {
        Self {
            name: name.into(),
            title: None,
            description: None,
            body,
        }
    }
}

/// A constraint reference on a property: named or inline.
///
/// # Examples
///
/// ```
/// use cm_core::{ConstraintRef, ListOfValuesDecl};
///
/// let named = ConstraintRef::Ref("ex:list1".to_owned());
/// let inline = ConstraintRef::ListOfValues(ListOfValuesDecl {
///     values: vec!["A".to_owned(), "B".to_owned()],
///     case_sensitive: true,
///     sorted: false,
///     label_key: None,
/// });
/// assert!(named.is_named());
/// assert!(!inline.is_named());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ConstraintRef {
    /// Reference to a named constraint (`{"ref": "ex:list1"}`).
    Ref(String),
    /// Inline list-of-values constraint.
    ListOfValues(ListOfValuesDecl),
    /// Inline regex constraint.
    Regex(RegexDecl),
    /// Inline string-length constraint.
    StringLength(StringLengthDecl),
    /// Inline registered-constraint reference.
    Registered(RegisteredDecl),
}

impl ConstraintRef {
    /// Returns `true` for references to named constraints.
    #[inline]
    #[must_use]
    pub const fn is_named(&self) -> bool {
        matches!(self, Self::Ref(_))
    }

    /// Converts an inline reference into a constraint body.
    ///
    /// Returns `None` for named references.
    #[must_use]
    pub fn to_body(&self) -> Option<ConstraintBody> {
        match self {
            Self::Ref(_) => None,
            Self::ListOfValues(decl) => Some(ConstraintBody::ListOfValues(decl.clone())),
            Self::Regex(decl) => Some(ConstraintBody::Regex(decl.clone())),
            Self::StringLength(decl) => Some(ConstraintBody::StringLength(decl.clone())),
            Self::Registered(decl) => Some(ConstraintBody::Registered(decl.clone())),
        }
    }
}
