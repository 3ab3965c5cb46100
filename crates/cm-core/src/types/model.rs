//! The raw model schema root.

use serde::{Deserialize, Serialize};

use super::class::ClassDecl;
use super::constraint::ConstraintDecl;
use super::datatype::DataTypeDecl;

/// A namespace (or import) declaration inside a model document.
///
/// In the `namespaces` section the declaration introduces a namespace the
/// model owns; in the `imports` section it references another model's
/// namespace and binds a local prefix for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceDecl {
    /// The namespace URI.
    pub uri: String,
    /// The prefix bound to the URI within this model.
    pub prefix: String,
}

impl NamespaceDecl {
    /// Creates a namespace declaration.
    #[inline]
    #[must_use]
    pub fn new(uri: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            prefix: prefix.into(),
        }
    }
}

/// A raw, author-facing model: one named, versioned schema unit.
///
/// Invariants enforced by the parser and compiler:
///
/// - local names are unique per declaration kind within one model
/// - prefixes in `namespaces` must not collide with prefixes already
///   registered by other models in the same dictionary
/// - classes must be declared in a namespace the model itself declares
///
/// # Examples
///
/// ```
/// use cm_core::{ClassDecl, ModelSchema};
///
/// let mut model = ModelSchema::new("ex:example");
/// model.add_namespace("http://ns.example.org/model/1.0", "ex");
/// model.add_import("urn:cm:datatype/1.0", "d");
/// model.types.push(ClassDecl::new("ex:base"));
///
/// assert_eq!(model.name, "ex:example");
/// assert_eq!(model.types.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSchema {
    /// The model name as a prefixed string (`ex:example`).
    pub name: String,

    /// Human-readable description.
    pub description: Option<String>,

    /// Author attribution.
    pub author: Option<String>,

    /// Version string, informational only.
    pub version: Option<String>,

    /// Model-level locale-analyser bundle identifier.
    ///
    /// Participates in the analyser fallback chain after property- and
    /// class-level bundles.
    pub analyser_bundle: Option<String>,

    /// Namespaces this model declares and owns.
    pub namespaces: Vec<NamespaceDecl>,

    /// Namespaces of other models this model references.
    pub imports: Vec<NamespaceDecl>,

    /// Custom data types declared by this model.
    pub data_types: Vec<DataTypeDecl>,

    /// Named, model-level constraints.
    pub constraints: Vec<ConstraintDecl>,

    /// Type declarations.
    pub types: Vec<ClassDecl>,

    /// Aspect declarations.
    pub aspects: Vec<ClassDecl>,
}

impl ModelSchema {
    /// Creates an empty model with the given prefixed name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Declares a namespace owned by this model.
    pub fn add_namespace(&mut self, uri: impl Into<String>, prefix: impl Into<String>) {
        self.namespaces.push(NamespaceDecl::new(uri, prefix));
    }

    /// Declares an import of another model's namespace.
    pub fn add_import(&mut self, uri: impl Into<String>, prefix: impl Into<String>) {
        self.imports.push(NamespaceDecl::new(uri, prefix));
    }

    /// Returns the type declaration with the given prefixed name, if any.
    #[must_use]
    pub fn type_decl(&self, name: &str) -> Option<&ClassDecl> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Returns the aspect declaration with the given prefixed name, if any.
    #[must_use]
    pub fn aspect_decl(&self, name: &str) -> Option<&ClassDecl> {
        self.aspects.iter().find(|a| a.name == name)
    }

    /// Iterates over all class declarations, types first.
    pub fn classes(&self) -> impl Iterator<Item = &ClassDecl> {
        self.types.iter().chain(self.aspects.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_schema_new() {
        let model = ModelSchema::new("ex:example");
        assert_eq!(model.name, "ex:example");
        assert!(model.namespaces.is_empty());
        assert!(model.types.is_empty());
        assert!(model.aspects.is_empty());
    }

    #[test]
    fn test_model_schema_lookup_decls() {
        let mut model = ModelSchema::new("ex:example");
        model.types.push(ClassDecl::new("ex:base"));
        model.aspects.push(ClassDecl::new("ex:auditable"));

        assert!(model.type_decl("ex:base").is_some());
        assert!(model.type_decl("ex:auditable").is_none());
        assert!(model.aspect_decl("ex:auditable").is_some());
        assert_eq!(model.classes().count(), 2);
    }

    #[test]
    fn test_model_schema_deserialize_minimal() {
        let model: ModelSchema = serde_json::from_str(
            r#"{
                "name": "ex:example",
                "namespaces": [{"uri": "http://ns.example.org/model/1.0", "prefix": "ex"}]
            }"#,
        )
        .unwrap();
        assert_eq!(model.name, "ex:example");
        assert_eq!(model.namespaces.len(), 1);
        assert_eq!(model.namespaces[0].prefix, "ex");
    }
}
