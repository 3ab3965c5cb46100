//! Compiled (immutable, inheritance-flattened) model definitions.
//!
//! A [`CompiledModel`] is produced once by the compiler and never mutated
//! afterwards; the cache publishes it behind `Arc` by reference swap.
//! Class definitions expose the complete *effective* property, association,
//! and constraint sets, including everything inherited from ancestors and
//! contributed by mandatory aspects.

use cm_core::{
    AssociationKind, FxHashMap, FxHashSet, IndexMode, MessageRegistry, NamespaceDecl, QName,
    ValueCodec,
};
use serde::Serialize;

use crate::constraint::ConstraintDefinition;

/// Whether a class is a type or an aspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    /// A concrete content type.
    Type,
    /// A cross-cutting aspect.
    Aspect,
}

impl ClassKind {
    /// Returns a short label for diagnostics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Aspect => "aspect",
        }
    }
}

/// Compiled model metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    /// The fully qualified model name.
    pub name: QName,
    /// The model name as declared (prefixed form).
    pub prefixed_name: String,
    /// Description.
    pub description: Option<String>,
    /// Author attribution.
    pub author: Option<String>,
    /// Version string.
    pub version: Option<String>,
    /// Model-level locale-analyser bundle identifier.
    pub analyser_bundle: Option<String>,
    /// Namespaces the model owns.
    pub namespaces: Vec<NamespaceDecl>,
    /// Namespaces the model imports.
    pub imports: Vec<NamespaceDecl>,
}

/// A fully resolved property definition.
///
/// Attribute defaults apply when no declaration along the inheritance
/// chain set the attribute: not multi-valued, not mandatory, not enforced,
/// not protected, indexed for both value and full-text lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyDefinition {
    /// The qualified property name.
    pub name: QName,
    /// The class that first declared the property.
    pub container: QName,
    /// The defining model.
    pub model: QName,
    /// Display title.
    pub title: Option<String>,
    /// Display description.
    pub description: Option<String>,
    /// The resolved data type.
    pub data_type: QName,
    /// Default value literal.
    pub default_value: Option<String>,
    /// Whether the property holds multiple values.
    pub multiple: bool,
    /// Whether a value is required.
    pub mandatory: bool,
    /// Whether the mandatory requirement is enforced on write.
    pub enforced: bool,
    /// Whether the property rejects client writes.
    pub protected: bool,
    /// Indexing hint.
    pub indexed: IndexMode,
    /// Property-level locale-analyser bundle identifier.
    pub analyser_bundle: Option<String>,
    /// The resolved constraint list, ancestor constraints first.
    pub constraints: Vec<ConstraintDefinition>,
}

impl PropertyDefinition {
    /// Returns `true` if the property is mandatory and that requirement is
    /// enforced on write.
    #[inline]
    #[must_use]
    pub const fn is_mandatory_enforced(&self) -> bool {
        self.mandatory && self.enforced
    }

    /// Resolves the localised title (key `property.{prefix}_{local}.title`),
    /// falling back to the declared title.
    #[must_use]
    pub fn localised_title(&self, messages: &MessageRegistry, prefixed: &str) -> Option<String> {
        lookup_label(messages, "property", prefixed, "title").or_else(|| self.title.clone())
    }

    /// Resolves the localised description, falling back to the declared
    /// description.
    #[must_use]
    pub fn localised_description(
        &self,
        messages: &MessageRegistry,
        prefixed: &str,
    ) -> Option<String> {
        lookup_label(messages, "property", prefixed, "description")
            .or_else(|| self.description.clone())
    }
}

/// A fully resolved association definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssociationDefinition {
    /// The qualified association name.
    pub name: QName,
    /// The class that first declared the association.
    pub container: QName,
    /// The defining model.
    pub model: QName,
    /// Display title.
    pub title: Option<String>,
    /// Display description.
    pub description: Option<String>,
    /// Peer or child.
    pub kind: AssociationKind,
    /// The resolved target class.
    pub target_class: QName,
    /// Role name at the source end.
    pub source_role: Option<String>,
    /// Role name at the target end.
    pub target_role: Option<String>,
    /// Whether the source end must exist.
    pub source_mandatory: bool,
    /// Whether the source end allows many participants.
    pub source_many: bool,
    /// Whether the target end must exist.
    pub target_mandatory: bool,
    /// Whether the target end allows many participants.
    pub target_many: bool,
    /// Child associations: whether child timestamp changes propagate to
    /// the parent. Always `false` for peer associations.
    pub propagate_timestamps: bool,
}

/// A fully resolved data-type definition with its capability descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataTypeDefinition {
    /// The qualified data-type name.
    pub name: QName,
    /// The defining model.
    pub model: QName,
    /// Display title.
    pub title: Option<String>,
    /// Display description.
    pub description: Option<String>,
    /// The value codec.
    pub codec: ValueCodec,
    /// Type-level locale-analyser bundle identifier.
    pub analyser_bundle: Option<String>,
    /// Default analyser identifier when no bundle resolves one.
    pub default_analyser: Option<String>,
}

/// A compiled class: a type or aspect with its effective definition sets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassDefinition {
    pub(crate) name: QName,
    pub(crate) kind: ClassKind,
    pub(crate) model: QName,
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) parent: Option<QName>,
    pub(crate) archive: Option<bool>,
    pub(crate) analyser_bundle: Option<String>,
    pub(crate) properties: FxHashMap<QName, PropertyDefinition>,
    pub(crate) associations: FxHashMap<QName, AssociationDefinition>,
    pub(crate) mandatory_aspects: Vec<QName>,
    pub(crate) declared_properties: FxHashSet<QName>,
    pub(crate) declared_associations: FxHashSet<QName>,
}

impl ClassDefinition {
    /// Returns the qualified class name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &QName {
        &self.name
    }

    /// Returns whether the class is a type or an aspect.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ClassKind {
        self.kind
    }

    /// Returns the defining model's qualified name.
    #[inline]
    #[must_use]
    pub fn model(&self) -> &QName {
        &self.model
    }

    /// Returns the declared title.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Returns the declared description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the parent class, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&QName> {
        self.parent.as_ref()
    }

    /// Returns the archive flag, resolved along the inheritance chain.
    ///
    /// `None` means no class in the chain set it.
    #[inline]
    #[must_use]
    pub const fn archive(&self) -> Option<bool> {
        self.archive
    }

    /// Returns the class's own locale-analyser bundle identifier.
    #[must_use]
    pub fn analyser_bundle(&self) -> Option<&str> {
        self.analyser_bundle.as_deref()
    }

    /// Returns the effective property set, including inherited and
    /// mandatory-aspect-contributed properties.
    #[inline]
    #[must_use]
    pub fn properties(&self) -> &FxHashMap<QName, PropertyDefinition> {
        &self.properties
    }

    /// Returns an effective property by qualified name.
    #[must_use]
    pub fn property(&self, name: &QName) -> Option<&PropertyDefinition> {
        self.properties.get(name)
    }

    /// Returns the effective association set.
    #[inline]
    #[must_use]
    pub fn associations(&self) -> &FxHashMap<QName, AssociationDefinition> {
        &self.associations
    }

    /// Returns an effective association by qualified name.
    #[must_use]
    pub fn association(&self, name: &QName) -> Option<&AssociationDefinition> {
        self.associations.get(name)
    }

    /// Returns the effective mandatory aspects, ancestors' first.
    #[inline]
    #[must_use]
    pub fn mandatory_aspects(&self) -> &[QName] {
        &self.mandatory_aspects
    }

    /// Returns the properties first declared by this class (not inherited,
    /// not overrides).
    #[inline]
    #[must_use]
    pub fn declared_properties(&self) -> &FxHashSet<QName> {
        &self.declared_properties
    }

    /// Returns the associations first declared by this class.
    #[inline]
    #[must_use]
    pub fn declared_associations(&self) -> &FxHashSet<QName> {
        &self.declared_associations
    }

    /// Resolves the localised title (key `{kind}.{prefix}_{local}.title`),
    /// falling back to the declared title.
    #[must_use]
    pub fn localised_title(&self, messages: &MessageRegistry, prefixed: &str) -> Option<String> {
        lookup_label(messages, self.kind.label(), prefixed, "title").or_else(|| self.title.clone())
    }
}

/// One compiled model: the immutable output of the compiler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledModel {
    pub(crate) info: ModelInfo,
    pub(crate) classes: FxHashMap<QName, ClassDefinition>,
    /// property name -> declaring class, for root declarations.
    pub(crate) properties: FxHashMap<QName, QName>,
    /// association name -> declaring class, for root declarations.
    pub(crate) associations: FxHashMap<QName, QName>,
    pub(crate) constraints: FxHashMap<QName, ConstraintDefinition>,
    pub(crate) data_types: FxHashMap<QName, DataTypeDefinition>,
}

impl CompiledModel {
    /// Returns the model metadata.
    #[inline]
    #[must_use]
    pub fn info(&self) -> &ModelInfo {
        &self.info
    }

    /// Returns the model's qualified name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &QName {
        &self.info.name
    }

    /// Returns a class (type or aspect) by qualified name.
    #[must_use]
    pub fn class(&self, name: &QName) -> Option<&ClassDefinition> {
        self.classes.get(name)
    }

    /// Returns a type by qualified name.
    #[must_use]
    pub fn type_def(&self, name: &QName) -> Option<&ClassDefinition> {
        self.classes
            .get(name)
            .filter(|c| c.kind == ClassKind::Type)
    }

    /// Returns an aspect by qualified name.
    #[must_use]
    pub fn aspect(&self, name: &QName) -> Option<&ClassDefinition> {
        self.classes
            .get(name)
            .filter(|c| c.kind == ClassKind::Aspect)
    }

    /// Returns a root-declared property by qualified name.
    #[must_use]
    pub fn property(&self, name: &QName) -> Option<&PropertyDefinition> {
        let class = self.properties.get(name)?;
        self.classes.get(class)?.property(name)
    }

    /// Returns a root-declared association by qualified name.
    #[must_use]
    pub fn association(&self, name: &QName) -> Option<&AssociationDefinition> {
        let class = self.associations.get(name)?;
        self.classes.get(class)?.association(name)
    }

    /// Returns a constraint (named or anonymous) by qualified name.
    #[must_use]
    pub fn constraint(&self, name: &QName) -> Option<&ConstraintDefinition> {
        self.constraints.get(name)
    }

    /// Returns a data type by qualified name.
    #[must_use]
    pub fn data_type(&self, name: &QName) -> Option<&DataTypeDefinition> {
        self.data_types.get(name)
    }

    /// Iterates over all classes.
    pub fn iter_classes(&self) -> impl Iterator<Item = &ClassDefinition> {
        self.classes.values()
    }

    /// Iterates over types only.
    pub fn iter_types(&self) -> impl Iterator<Item = &ClassDefinition> {
        self.classes
            .values()
            .filter(|c| c.kind == ClassKind::Type)
    }

    /// Iterates over aspects only.
    pub fn iter_aspects(&self) -> impl Iterator<Item = &ClassDefinition> {
        self.classes
            .values()
            .filter(|c| c.kind == ClassKind::Aspect)
    }

    /// Iterates over root-declared properties.
    pub fn iter_properties(&self) -> impl Iterator<Item = &PropertyDefinition> {
        self.properties
            .iter()
            .filter_map(|(name, class)| self.classes.get(class)?.property(name))
    }

    /// Iterates over root-declared associations.
    pub fn iter_associations(&self) -> impl Iterator<Item = &AssociationDefinition> {
        self.associations
            .iter()
            .filter_map(|(name, class)| self.classes.get(class)?.association(name))
    }

    /// Iterates over all constraints, named and anonymous.
    pub fn iter_constraints(&self) -> impl Iterator<Item = &ConstraintDefinition> {
        self.constraints.values()
    }

    /// Iterates over declared data types.
    pub fn iter_data_types(&self) -> impl Iterator<Item = &DataTypeDefinition> {
        self.data_types.values()
    }
}

fn lookup_label(
    messages: &MessageRegistry,
    kind: &str,
    prefixed: &str,
    field: &str,
) -> Option<String> {
    let key = format!("{kind}.{}.{field}", prefixed.replace(':', "_"));
    messages.lookup(&key).map(str::to_owned)
}
