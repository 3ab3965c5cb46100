//! The compiled dictionary: the cross-model union of compiled models.
//!
//! A [`CompiledDictionary`] indexes every definition of every registered
//! model by qualified name for O(1) lookup, and answers the subtype and
//! effective-definition queries the rest of the system consumes. All
//! lookups for unknown names return `None`, never an error; only the
//! resolution of a malformed prefixed string fails, with a namespace error.
//!
//! The dictionary is rebuilt wholesale when any constituent model is
//! added, replaced, or removed, and published by reference swap; readers
//! never observe a partially updated dictionary.

use std::sync::Arc;

use cm_core::{FxHashMap, NamespaceError, NamespaceRegistry, QName};

use crate::compiled::{
    AssociationDefinition, ClassDefinition, ClassKind, CompiledModel, DataTypeDefinition,
    PropertyDefinition,
};
use crate::constraint::ConstraintDefinition;
use crate::datatype::core_model;

/// Cross-model lookup consulted by the compiler while compiling one model.
///
/// Implemented by [`CompiledDictionary`]; the compiler never reaches for
/// global state.
pub trait ModelLookup {
    /// Returns a class (type or aspect) by qualified name.
    fn lookup_class(&self, name: &QName) -> Option<&ClassDefinition>;

    /// Returns a data type by qualified name.
    fn lookup_data_type(&self, name: &QName) -> Option<&DataTypeDefinition>;

    /// Returns a constraint by qualified name.
    fn lookup_constraint(&self, name: &QName) -> Option<&ConstraintDefinition>;

    /// Returns `true` if any registered model owns the namespace URI.
    fn contains_namespace(&self, uri: &str) -> bool;
}

/// The union of all compiled models registered for one tenant.
#[derive(Debug, Clone)]
pub struct CompiledDictionary {
    models: FxHashMap<QName, Arc<CompiledModel>>,
    class_index: FxHashMap<QName, QName>,
    property_index: FxHashMap<QName, QName>,
    association_index: FxHashMap<QName, QName>,
    constraint_index: FxHashMap<QName, QName>,
    data_type_index: FxHashMap<QName, QName>,
    namespaces: NamespaceRegistry,
}

impl CompiledDictionary {
    /// Creates a dictionary pre-populated with the built-in data-type
    /// model (see [`core_model`](crate::datatype::core_model)).
    #[must_use]
    pub fn new() -> Self {
        let mut dictionary = Self {
            models: FxHashMap::default(),
            class_index: FxHashMap::default(),
            property_index: FxHashMap::default(),
            association_index: FxHashMap::default(),
            constraint_index: FxHashMap::default(),
            data_type_index: FxHashMap::default(),
            namespaces: NamespaceRegistry::new(),
        };
        // The core model's single namespace cannot clash in a fresh registry.
        let _ = dictionary.insert_model(core_model());
        dictionary
    }

    /// Registers (or replaces) a compiled model.
    ///
    /// The model's owned namespaces are registered dictionary-wide; when a
    /// model with the same name is already present it is replaced and its
    /// namespaces unregistered first.
    ///
    /// # Errors
    ///
    /// Returns [`NamespaceError::PrefixClash`] if one of the model's
    /// prefixes is bound to a different URI by another model. The
    /// dictionary is left unchanged on error.
    pub fn insert_model(&mut self, model: CompiledModel) -> Result<(), NamespaceError> {
        let previous = self.models.get(model.name()).cloned();

        // Stage namespace registration against a copy so a clash leaves
        // the published registry untouched.
        let mut namespaces = self.namespaces.clone();
        if let Some(previous) = &previous {
            for ns in &previous.info().namespaces {
                namespaces.unregister_prefix(&ns.prefix);
            }
        }
        for ns in &model.info().namespaces {
            namespaces.register(&ns.uri, &ns.prefix)?;
        }

        if let Some(previous) = previous {
            self.remove_indexes(&previous);
            self.models.remove(previous.name());
        }

        self.namespaces = namespaces;
        self.add_indexes(&model);
        self.models.insert(model.name().clone(), Arc::new(model));
        Ok(())
    }

    /// Removes a model, unregistering its namespaces.
    ///
    /// Returns the removed model, or `None` if it was not registered.
    pub fn remove_model(&mut self, name: &QName) -> Option<Arc<CompiledModel>> {
        let model = self.models.remove(name)?;
        self.remove_indexes(&model);
        for ns in &model.info().namespaces {
            self.namespaces.unregister_prefix(&ns.prefix);
        }
        Some(model)
    }

    fn add_indexes(&mut self, model: &CompiledModel) {
        let name = model.name().clone();
        for class in model.iter_classes() {
            self.class_index.insert(class.name().clone(), name.clone());
        }
        for (prop, _) in &model.properties {
            self.property_index.insert(prop.clone(), name.clone());
        }
        for (assoc, _) in &model.associations {
            self.association_index.insert(assoc.clone(), name.clone());
        }
        for constraint in model.iter_constraints() {
            self.constraint_index
                .insert(constraint.name.clone(), name.clone());
        }
        for data_type in model.iter_data_types() {
            self.data_type_index
                .insert(data_type.name.clone(), name.clone());
        }
    }

    fn remove_indexes(&mut self, model: &CompiledModel) {
        let name = model.name();
        self.class_index.retain(|_, m| m != name);
        self.property_index.retain(|_, m| m != name);
        self.association_index.retain(|_, m| m != name);
        self.constraint_index.retain(|_, m| m != name);
        self.data_type_index.retain(|_, m| m != name);
    }

    /// Returns a registered model by qualified name.
    #[must_use]
    pub fn model(&self, name: &QName) -> Option<&CompiledModel> {
        self.models.get(name).map(Arc::as_ref)
    }

    /// Iterates over all registered models.
    pub fn models(&self) -> impl Iterator<Item = &CompiledModel> {
        self.models.values().map(Arc::as_ref)
    }

    /// Returns the number of registered models (including the core model).
    #[must_use]
    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// Returns a class (type or aspect) by qualified name.
    #[must_use]
    pub fn class(&self, name: &QName) -> Option<&ClassDefinition> {
        let model = self.class_index.get(name)?;
        self.models.get(model)?.class(name)
    }

    /// Returns a type by qualified name.
    #[must_use]
    pub fn type_def(&self, name: &QName) -> Option<&ClassDefinition> {
        self.class(name).filter(|c| c.kind() == ClassKind::Type)
    }

    /// Returns an aspect by qualified name.
    #[must_use]
    pub fn aspect(&self, name: &QName) -> Option<&ClassDefinition> {
        self.class(name).filter(|c| c.kind() == ClassKind::Aspect)
    }

    /// Returns a root-declared property by qualified name.
    #[must_use]
    pub fn property(&self, name: &QName) -> Option<&PropertyDefinition> {
        let model = self.property_index.get(name)?;
        self.models.get(model)?.property(name)
    }

    /// Returns the effective definition of a property on a specific class.
    ///
    /// This is the override-aware view: the same property qualified name
    /// may carry different attributes on different classes.
    #[must_use]
    pub fn property_of(&self, class: &QName, property: &QName) -> Option<&PropertyDefinition> {
        self.class(class)?.property(property)
    }

    /// Returns a root-declared association by qualified name.
    #[must_use]
    pub fn association(&self, name: &QName) -> Option<&AssociationDefinition> {
        let model = self.association_index.get(name)?;
        self.models.get(model)?.association(name)
    }

    /// Returns a constraint by qualified name.
    #[must_use]
    pub fn constraint(&self, name: &QName) -> Option<&ConstraintDefinition> {
        let model = self.constraint_index.get(name)?;
        self.models.get(model)?.constraint(name)
    }

    /// Returns a data type by qualified name.
    #[must_use]
    pub fn data_type(&self, name: &QName) -> Option<&DataTypeDefinition> {
        let model = self.data_type_index.get(name)?;
        self.models.get(model)?.data_type(name)
    }

    /// Iterates over the constraints defined by one model.
    pub fn constraints_of_model(&self, model: &QName) -> impl Iterator<Item = &ConstraintDefinition> {
        self.models
            .get(model)
            .into_iter()
            .flat_map(|m| m.iter_constraints())
    }

    /// Tests whether `class` equals or descends from `of`.
    ///
    /// Reflexive: a registered class is a subclass of itself. Returns
    /// `false` when either name is unknown, and always `false` across the
    /// type/aspect divide.
    #[must_use]
    pub fn is_subclass(&self, class: &QName, of: &QName) -> bool {
        let Some(candidate) = self.class(class) else {
            return false;
        };
        let Some(ancestor) = self.class(of) else {
            return false;
        };
        if candidate.kind() != ancestor.kind() {
            return false;
        }

        let mut current = Some(candidate);
        while let Some(class_def) = current {
            if class_def.name() == of {
                return true;
            }
            current = class_def.parent().and_then(|p| self.class(p));
        }
        false
    }

    /// Returns the subclasses of a class.
    ///
    /// With `transitive` set, all descendants are returned; otherwise only
    /// direct children. The class itself is never included. Unknown names
    /// yield an empty result.
    #[must_use]
    pub fn subclasses_of(&self, name: &QName, transitive: bool) -> Vec<QName> {
        if self.class(name).is_none() {
            return Vec::new();
        }
        let mut result = Vec::new();
        for model in self.models.values() {
            for class in model.iter_classes() {
                if class.name() == name {
                    continue;
                }
                let matches = if transitive {
                    self.is_subclass(class.name(), name)
                } else {
                    class.parent() == Some(name)
                };
                if matches {
                    result.push(class.name().clone());
                }
            }
        }
        result
    }

    /// Resolves a prefixed name against the dictionary-wide registry.
    ///
    /// # Errors
    ///
    /// Fails with a namespace error for malformed strings or unknown
    /// prefixes; this is the only query that can fail.
    pub fn resolve_name(&self, prefixed: &str) -> Result<QName, NamespaceError> {
        QName::resolve(prefixed, &self.namespaces)
    }

    /// Formats a qualified name using the dictionary-wide registry.
    ///
    /// # Errors
    ///
    /// Fails when no prefix is registered for the name's namespace.
    pub fn to_prefixed(&self, name: &QName) -> Result<String, NamespaceError> {
        name.to_prefixed(&self.namespaces)
    }

    /// Returns the dictionary-wide namespace registry.
    #[must_use]
    pub fn namespaces(&self) -> &NamespaceRegistry {
        &self.namespaces
    }
}

impl Default for CompiledDictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelLookup for CompiledDictionary {
    fn lookup_class(&self, name: &QName) -> Option<&ClassDefinition> {
        self.class(name)
    }

    fn lookup_data_type(&self, name: &QName) -> Option<&DataTypeDefinition> {
        self.data_type(name)
    }

    fn lookup_constraint(&self, name: &QName) -> Option<&ConstraintDefinition> {
        self.constraint(name)
    }

    fn contains_namespace(&self, uri: &str) -> bool {
        self.namespaces.contains_uri(uri)
    }
}
