//! Type and aspect declarations.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::association::AssociationDecl;
use super::property::PropertyDecl;

/// A class declaration: either a type or an aspect, depending on which
/// model section it appears in.
///
/// Inheritance is single-parent, multiple-root: `parent` names at most one
/// other class (possibly in an imported namespace). `mandatory_aspects`
/// name aspects automatically applied to every instance of the class.
///
/// # Examples
///
/// ```
/// use cm_core::{ClassDecl, PropertyDecl};
///
/// let mut class = ClassDecl::new("ex:document").with_parent("ex:base");
/// class.properties.push(PropertyDecl::new("ex:name", "d:text"));
///
/// assert_eq!(class.parent.as_deref(), Some("ex:base"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassDecl {
    /// The class name as a prefixed string.
    pub name: String,

    /// Display title. Unset inherits nothing; titles are per-class.
    pub title: Option<String>,

    /// Display description.
    pub description: Option<String>,

    /// Prefixed name of the parent class, if any.
    pub parent: Option<String>,

    /// Whether instances are archived rather than destroyed on delete.
    ///
    /// Unset inherits the ancestor's value; absent along the whole chain
    /// means "no archive behaviour defined".
    pub archive: Option<bool>,

    /// Class-level locale-analyser bundle identifier.
    pub analyser_bundle: Option<String>,

    /// Properties declared (or redeclared, for overrides) by this class.
    pub properties: Vec<PropertyDecl>,

    /// Associations declared by this class.
    pub associations: Vec<AssociationDecl>,

    /// Aspects automatically applied to instances of this class.
    pub mandatory_aspects: SmallVec<[String; 2]>,
}

impl ClassDecl {
    /// Creates a class declaration with the given prefixed name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the parent class.
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Sets the display title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Adds a mandatory aspect reference.
    pub fn add_mandatory_aspect(&mut self, aspect: impl Into<String>) {
        self.mandatory_aspects.push(aspect.into());
    }

    /// Returns the property declaration with the given prefixed name.
    #[must_use]
    pub fn property_decl(&self, name: &str) -> Option<&PropertyDecl> {
        self.properties.iter().find(|p| p.name == name)
    }
}
