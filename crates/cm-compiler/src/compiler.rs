//! The model compiler.
//!
//! Compilation turns a raw [`ModelSchema`] into an immutable
//! [`CompiledModel`]: prefixes are resolved against the model's own
//! namespace/import declarations, imports are verified against the
//! cross-model lookup, the class parent graph is cycle-checked before any
//! flattening, and classes are flattened ancestor-first so a subclass
//! starts from its parent's already-flattened definition and applies local
//! overrides attribute-wise.
//!
//! The compiler has no side effects beyond the returned model: it never
//! mutates the cross-model lookup, and a failed compilation leaves no
//! partial state anywhere.

use cm_core::{
    ClassDecl, ConstraintBody, ConstraintRef, FxHashMap, FxHashSet, ModelSchema, PrefixResolver,
    PropertyDecl, QName,
};
use tracing::{debug, info};

use crate::compiled::{
    AssociationDefinition, ClassDefinition, ClassKind, CompiledModel, DataTypeDefinition,
    ModelInfo, PropertyDefinition,
};
use crate::constraint::{
    CompiledConstraint, ConstraintDefinition, RegisteredConstraint, compile_list_of_values,
    compile_regex, compile_string_length,
};
use crate::dictionary::ModelLookup;
use crate::error::CompileError;
use crate::graph;

/// Compiles raw models against a cross-model lookup.
///
/// # Examples
///
/// ```
/// use cm_compiler::{CompiledDictionary, ModelCompiler};
/// use cm_core::{ClassDecl, ModelSchema, PropertyDecl};
///
/// let mut model = ModelSchema::new("ex:example");
/// model.add_namespace("http://ns.example.org/model/1.0", "ex");
/// model.add_import("urn:cm:datatype/1.0", "d");
/// let mut doc = ClassDecl::new("ex:document");
/// doc.properties.push(PropertyDecl::new("ex:title", "d:text"));
/// model.types.push(doc);
///
/// let dictionary = CompiledDictionary::new();
/// let compiled = ModelCompiler::new(&dictionary).compile(&model)?;
/// assert_eq!(compiled.iter_types().count(), 1);
/// # Ok::<(), cm_compiler::CompileError>(())
/// ```
pub struct ModelCompiler<'a, L: ModelLookup> {
    lookup: &'a L,
}

/// Model-local prefix environment: the model's own namespaces plus its
/// imports.
struct PrefixEnv {
    prefixes: FxHashMap<String, String>,
}

impl PrefixResolver for PrefixEnv {
    fn uri_for_prefix(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }

    fn prefix_for_uri(&self, uri: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .find(|(_, u)| u.as_str() == uri)
            .map(|(p, _)| p.as_str())
    }
}

/// Per-compilation working state.
struct Ctx<'s> {
    env: PrefixEnv,
    model_name: QName,
    /// Local part of the model name, used in anonymous constraint names.
    model_local: String,
    decls: FxHashMap<QName, (&'s ClassDecl, ClassKind)>,
    compiled: FxHashMap<QName, ClassDefinition>,
    constraints: FxHashMap<QName, ConstraintDefinition>,
    data_types: FxHashMap<QName, DataTypeDefinition>,
}

impl<'a, L: ModelLookup> ModelCompiler<'a, L> {
    /// Creates a compiler over the given cross-model lookup.
    #[must_use]
    pub const fn new(lookup: &'a L) -> Self {
        Self { lookup }
    }

    /// Compiles a raw model.
    ///
    /// # Errors
    ///
    /// Fails when a parent class, import, data type, or constraint
    /// reference cannot be resolved, when the class parent (or
    /// mandatory-aspect) graph contains a cycle, or when a redeclared
    /// property changes its inherited data type. See [`CompileError`].
    pub fn compile(&self, schema: &ModelSchema) -> Result<CompiledModel, CompileError> {
        let env = build_env(schema)?;
        let model_name = QName::resolve(&schema.name, &env)?;
        debug!(model = %schema.name, "Compiling model");

        for import in &schema.imports {
            if !self.lookup.contains_namespace(&import.uri) {
                return Err(CompileError::UnresolvedImport {
                    model: schema.name.clone(),
                    uri: import.uri.clone(),
                });
            }
        }

        let mut ctx = Ctx {
            env,
            model_local: model_name.local_name().to_owned(),
            model_name,
            decls: FxHashMap::default(),
            compiled: FxHashMap::default(),
            constraints: FxHashMap::default(),
            data_types: FxHashMap::default(),
        };

        self.collect_data_types(schema, &mut ctx)?;
        self.collect_named_constraints(schema, &mut ctx)?;
        self.collect_classes(schema, &mut ctx)?;
        self.check_cycles(schema, &ctx)?;

        let names: Vec<QName> = ctx.decls.keys().cloned().collect();
        for name in names {
            self.flatten(&mut ctx, &name)?;
        }

        let (properties, associations) = build_indexes(&ctx)?;

        info!(
            model = %schema.name,
            types = ctx.compiled.values().filter(|c| c.kind == ClassKind::Type).count(),
            aspects = ctx.compiled.values().filter(|c| c.kind == ClassKind::Aspect).count(),
            properties = properties.len(),
            constraints = ctx.constraints.len(),
            "Compiled model"
        );

        Ok(CompiledModel {
            info: ModelInfo {
                name: ctx.model_name,
                prefixed_name: schema.name.clone(),
                description: schema.description.clone(),
                author: schema.author.clone(),
                version: schema.version.clone(),
                analyser_bundle: schema.analyser_bundle.clone(),
                namespaces: schema.namespaces.clone(),
                imports: schema.imports.clone(),
            },
            classes: ctx.compiled,
            properties,
            associations,
            constraints: ctx.constraints,
            data_types: ctx.data_types,
        })
    }

    fn collect_data_types(
        &self,
        schema: &ModelSchema,
        ctx: &mut Ctx<'_>,
    ) -> Result<(), CompileError> {
        for decl in &schema.data_types {
            let name = QName::resolve(&decl.name, &ctx.env)?;
            if ctx.data_types.contains_key(&name) || self.lookup.lookup_data_type(&name).is_some()
            {
                return Err(CompileError::DuplicateDefinition {
                    kind: "data type",
                    name: decl.name.clone(),
                });
            }
            ctx.data_types.insert(
                name.clone(),
                DataTypeDefinition {
                    name,
                    model: ctx.model_name.clone(),
                    title: decl.title.clone(),
                    description: decl.description.clone(),
                    codec: decl.codec,
                    analyser_bundle: decl.analyser_bundle.clone(),
                    default_analyser: decl.default_analyser.clone(),
                },
            );
        }
        Ok(())
    }

    fn collect_named_constraints(
        &self,
        schema: &ModelSchema,
        ctx: &mut Ctx<'_>,
    ) -> Result<(), CompileError> {
        for decl in &schema.constraints {
            let name = QName::resolve(&decl.name, &ctx.env)?;
            if ctx.constraints.contains_key(&name)
                || self.lookup.lookup_constraint(&name).is_some()
            {
                return Err(CompileError::DuplicateDefinition {
                    kind: "constraint",
                    name: decl.name.clone(),
                });
            }
            let constraint =
                compile_body(&decl.body).map_err(|reason| CompileError::InvalidConstraint {
                    name: decl.name.clone(),
                    reason,
                })?;
            ctx.constraints.insert(
                name.clone(),
                ConstraintDefinition {
                    name,
                    model: ctx.model_name.clone(),
                    title: decl.title.clone(),
                    description: decl.description.clone(),
                    anonymous: false,
                    constraint,
                },
            );
        }
        Ok(())
    }

    fn collect_classes<'s>(
        &self,
        schema: &'s ModelSchema,
        ctx: &mut Ctx<'s>,
    ) -> Result<(), CompileError> {
        let owned_uris: FxHashSet<&str> =
            schema.namespaces.iter().map(|n| n.uri.as_str()).collect();

        let declared = schema
            .types
            .iter()
            .map(|t| (t, ClassKind::Type))
            .chain(schema.aspects.iter().map(|a| (a, ClassKind::Aspect)));

        for (decl, kind) in declared {
            let name = QName::resolve(&decl.name, &ctx.env)?;
            if !owned_uris.contains(name.namespace_uri()) {
                return Err(CompileError::ForeignNamespace {
                    model: schema.name.clone(),
                    class: decl.name.clone(),
                });
            }
            if ctx.decls.contains_key(&name) || self.lookup.lookup_class(&name).is_some() {
                return Err(CompileError::DuplicateDefinition {
                    kind: "class",
                    name: decl.name.clone(),
                });
            }
            ctx.decls.insert(name, (decl, kind));
        }
        Ok(())
    }

    /// Builds the combined dependency graph (parent edges plus local
    /// mandatory-aspect edges) and rejects any cycle before flattening.
    fn check_cycles(&self, schema: &ModelSchema, ctx: &Ctx<'_>) -> Result<(), CompileError> {
        let mut edges: FxHashMap<QName, Vec<QName>> = FxHashMap::default();

        for (name, (decl, kind)) in &ctx.decls {
            if let Some(parent) = &decl.parent {
                let parent_name = QName::resolve(parent, &ctx.env)?;
                if let Some((_, parent_kind)) = ctx.decls.get(&parent_name) {
                    if parent_kind != kind {
                        return Err(CompileError::UnresolvedParent {
                            class: decl.name.clone(),
                            parent: parent.clone(),
                        });
                    }
                    edges.entry(name.clone()).or_default().push(parent_name);
                } else if self
                    .lookup
                    .lookup_class(&parent_name)
                    .filter(|p| p.kind == *kind)
                    .is_none()
                {
                    return Err(CompileError::UnresolvedParent {
                        class: decl.name.clone(),
                        parent: parent.clone(),
                    });
                }
            }

            for aspect in &decl.mandatory_aspects {
                let aspect_name = QName::resolve(aspect, &ctx.env)?;
                if ctx.decls.contains_key(&aspect_name) {
                    edges.entry(name.clone()).or_default().push(aspect_name);
                }
            }
        }

        if let Some(cycle) = graph::find_cycle(ctx.decls.keys().cloned(), &edges) {
            let cycle = cycle
                .iter()
                .map(|q| {
                    q.to_prefixed(&ctx.env)
                        .unwrap_or_else(|_| q.to_string())
                })
                .collect();
            return Err(CompileError::CyclicInheritance {
                model: schema.name.clone(),
                cycle,
            });
        }
        Ok(())
    }

    /// Flattens one class, recursing into its (already cycle-checked)
    /// parent and mandatory aspects first.
    fn flatten(&self, ctx: &mut Ctx<'_>, name: &QName) -> Result<(), CompileError> {
        if ctx.compiled.contains_key(name) {
            return Ok(());
        }
        let Some(&(decl, kind)) = ctx.decls.get(name) else {
            return Ok(());
        };

        // Start from the parent's flattened definition.
        let base = match &decl.parent {
            Some(parent) => {
                let parent_name = QName::resolve(parent, &ctx.env)?;
                let parent_def = if ctx.decls.contains_key(&parent_name) {
                    self.flatten(ctx, &parent_name)?;
                    ctx.compiled.get(&parent_name).cloned()
                } else {
                    self.lookup.lookup_class(&parent_name).cloned()
                };
                match parent_def {
                    Some(parent_def) if parent_def.kind == kind => Some(parent_def),
                    _ => {
                        return Err(CompileError::UnresolvedParent {
                            class: decl.name.clone(),
                            parent: parent.clone(),
                        });
                    }
                }
            }
            None => None,
        };

        let parent_name = base.as_ref().map(|b| b.name.clone());
        let base_archive = base.as_ref().and_then(|b| b.archive);
        let mut properties = base.as_ref().map(|b| b.properties.clone()).unwrap_or_default();
        let mut associations = base
            .as_ref()
            .map(|b| b.associations.clone())
            .unwrap_or_default();
        let mut mandatory_aspects = base.map(|b| b.mandatory_aspects).unwrap_or_default();

        // Own property declarations: overrides merge attribute-wise, fresh
        // declarations require a resolvable data type.
        let mut declared_properties = FxHashSet::default();
        for pdecl in &decl.properties {
            let prop_name = QName::resolve(&pdecl.name, &ctx.env)?;
            let own_constraints = self.resolve_property_constraints(ctx, decl, pdecl)?;

            if let Some(inherited) = properties.get(&prop_name) {
                let mut merged = inherited.clone();
                if let Some(declared_type) = &pdecl.data_type {
                    let declared_name = QName::resolve(declared_type, &ctx.env)?;
                    if declared_name != merged.data_type {
                        return Err(CompileError::IncompatibleOverride {
                            class: decl.name.clone(),
                            property: pdecl.name.clone(),
                            inherited: merged.data_type.to_string(),
                            declared: declared_type.clone(),
                        });
                    }
                }
                apply_property_overrides(&mut merged, pdecl);
                merged.constraints.extend(own_constraints);
                properties.insert(prop_name, merged);
            } else {
                let declared_type = pdecl.data_type.as_deref().ok_or_else(|| {
                    CompileError::UnresolvedDataType {
                        property: pdecl.name.clone(),
                        data_type: "<unset>".to_owned(),
                    }
                })?;
                let data_type = QName::resolve(declared_type, &ctx.env)?;
                if !ctx.data_types.contains_key(&data_type)
                    && self.lookup.lookup_data_type(&data_type).is_none()
                {
                    return Err(CompileError::UnresolvedDataType {
                        property: pdecl.name.clone(),
                        data_type: declared_type.to_owned(),
                    });
                }
                properties.insert(
                    prop_name.clone(),
                    PropertyDefinition {
                        name: prop_name.clone(),
                        container: name.clone(),
                        model: ctx.model_name.clone(),
                        title: pdecl.title.clone(),
                        description: pdecl.description.clone(),
                        data_type,
                        default_value: pdecl.default_value.clone(),
                        multiple: pdecl.multiple.unwrap_or(false),
                        mandatory: pdecl.mandatory.unwrap_or(false),
                        enforced: pdecl.enforced.unwrap_or(false),
                        protected: pdecl.protected.unwrap_or(false),
                        indexed: pdecl.indexed.unwrap_or_default(),
                        analyser_bundle: pdecl.analyser_bundle.clone(),
                        constraints: own_constraints,
                    },
                );
                declared_properties.insert(prop_name);
            }
        }

        // Own association declarations.
        let mut declared_associations = FxHashSet::default();
        for adecl in &decl.associations {
            let assoc_name = QName::resolve(&adecl.name, &ctx.env)?;
            let target = QName::resolve(&adecl.target_class, &ctx.env)?;
            if !ctx.decls.contains_key(&target) && self.lookup.lookup_class(&target).is_none() {
                return Err(CompileError::UnresolvedClass {
                    class: decl.name.clone(),
                    name: adecl.target_class.clone(),
                    role: "association target",
                });
            }

            if let Some(inherited) = associations.get(&assoc_name) {
                let mut merged = inherited.clone();
                merged.target_class = target;
                if let Some(title) = &adecl.title {
                    merged.title = Some(title.clone());
                }
                if let Some(description) = &adecl.description {
                    merged.description = Some(description.clone());
                }
                if let Some(mandatory) = adecl.source_mandatory {
                    merged.source_mandatory = mandatory;
                }
                if let Some(many) = adecl.source_many {
                    merged.source_many = many;
                }
                if let Some(mandatory) = adecl.target_mandatory {
                    merged.target_mandatory = mandatory;
                }
                if let Some(many) = adecl.target_many {
                    merged.target_many = many;
                }
                if let Some(propagate) = adecl.propagate_timestamps {
                    merged.propagate_timestamps = propagate;
                }
                associations.insert(assoc_name, merged);
            } else {
                associations.insert(
                    assoc_name.clone(),
                    AssociationDefinition {
                        name: assoc_name.clone(),
                        container: name.clone(),
                        model: ctx.model_name.clone(),
                        title: adecl.title.clone(),
                        description: adecl.description.clone(),
                        kind: adecl.kind,
                        target_class: target,
                        source_role: adecl.source_role.clone(),
                        target_role: adecl.target_role.clone(),
                        source_mandatory: adecl.source_mandatory.unwrap_or(false),
                        source_many: adecl.source_many.unwrap_or(false),
                        target_mandatory: adecl.target_mandatory.unwrap_or(false),
                        target_many: adecl.target_many.unwrap_or(false),
                        propagate_timestamps: adecl.propagate_timestamps.unwrap_or(false),
                    },
                );
                declared_associations.insert(assoc_name);
            }
        }

        // Mandatory-aspect contributions merge after the class's own chain
        // and are non-overridable; an existing property or association of
        // the same name wins.
        for aspect_ref in &decl.mandatory_aspects {
            let aspect_name = QName::resolve(aspect_ref, &ctx.env)?;
            let aspect_def = if ctx.decls.contains_key(&aspect_name) {
                self.flatten(ctx, &aspect_name)?;
                ctx.compiled.get(&aspect_name).cloned()
            } else {
                self.lookup.lookup_class(&aspect_name).cloned()
            }
            .filter(|a| a.kind == ClassKind::Aspect)
            .ok_or_else(|| CompileError::UnresolvedClass {
                class: decl.name.clone(),
                name: aspect_ref.clone(),
                role: "mandatory aspect",
            })?;

            if !mandatory_aspects.contains(&aspect_name) {
                mandatory_aspects.push(aspect_name);
                for (prop_name, prop) in &aspect_def.properties {
                    properties
                        .entry(prop_name.clone())
                        .or_insert_with(|| prop.clone());
                }
                for (assoc_name, assoc) in &aspect_def.associations {
                    associations
                        .entry(assoc_name.clone())
                        .or_insert_with(|| assoc.clone());
                }
            }
        }

        ctx.compiled.insert(
            name.clone(),
            ClassDefinition {
                name: name.clone(),
                kind,
                model: ctx.model_name.clone(),
                title: decl.title.clone(),
                description: decl.description.clone(),
                parent: parent_name,
                archive: decl.archive.or(base_archive),
                analyser_bundle: decl.analyser_bundle.clone(),
                properties,
                associations,
                mandatory_aspects,
                declared_properties,
                declared_associations,
            },
        );
        Ok(())
    }

    /// Resolves a property's constraint list, wrapping every entry (named
    /// reference or inline declaration) in a property-scoped anonymous
    /// definition named `{model}_{class}_{prop}_anon_{i}` and registering
    /// it with the model.
    fn resolve_property_constraints(
        &self,
        ctx: &mut Ctx<'_>,
        class_decl: &ClassDecl,
        pdecl: &PropertyDecl,
    ) -> Result<Vec<ConstraintDefinition>, CompileError> {
        let mut resolved = Vec::with_capacity(pdecl.constraints.len());
        for (index, reference) in pdecl.constraints.iter().enumerate() {
            let anon_local = format!(
                "{}_{}_{}_anon_{index}",
                ctx.model_local,
                local_part(&class_decl.name),
                local_part(&pdecl.name),
            );
            let anon_name = QName::new(ctx.model_name.namespace_uri(), anon_local);

            let definition = match reference {
                ConstraintRef::Ref(target) => {
                    let target_name = QName::resolve(target, &ctx.env)?;
                    let referenced = ctx
                        .constraints
                        .get(&target_name)
                        .cloned()
                        .or_else(|| self.lookup.lookup_constraint(&target_name).cloned())
                        .ok_or_else(|| CompileError::UnresolvedConstraint {
                            property: pdecl.name.clone(),
                            constraint: target.clone(),
                        })?;
                    // A reference wrapper inherits the referenced
                    // constraint's title and description.
                    ConstraintDefinition {
                        name: anon_name,
                        model: ctx.model_name.clone(),
                        title: referenced.title,
                        description: referenced.description,
                        anonymous: true,
                        constraint: referenced.constraint,
                    }
                }
                inline => {
                    let body = inline.to_body().ok_or_else(|| {
                        CompileError::UnresolvedConstraint {
                            property: pdecl.name.clone(),
                            constraint: "<inline>".to_owned(),
                        }
                    })?;
                    let constraint = compile_body(&body).map_err(|reason| {
                        CompileError::InvalidConstraint {
                            name: format!("{}#{index}", pdecl.name),
                            reason,
                        }
                    })?;
                    ConstraintDefinition {
                        name: anon_name,
                        model: ctx.model_name.clone(),
                        title: None,
                        description: None,
                        anonymous: true,
                        constraint,
                    }
                }
            };

            ctx.constraints
                .insert(definition.name.clone(), definition.clone());
            resolved.push(definition);
        }
        Ok(resolved)
    }
}

/// Resolves a raw model's qualified name against its own prefix
/// environment, without compiling it.
///
/// # Errors
///
/// Fails when the model's prefixes clash internally or its name uses an
/// undeclared prefix.
pub fn resolve_model_name(schema: &ModelSchema) -> Result<QName, CompileError> {
    let env = build_env(schema)?;
    Ok(QName::resolve(&schema.name, &env)?)
}

fn build_env(schema: &ModelSchema) -> Result<PrefixEnv, CompileError> {
    let mut prefixes: FxHashMap<String, String> = FxHashMap::default();
    for ns in schema.namespaces.iter().chain(schema.imports.iter()) {
        if let Some(existing) = prefixes.get(&ns.prefix) {
            if existing != &ns.uri {
                return Err(cm_core::NamespaceError::PrefixClash {
                    prefix: ns.prefix.clone(),
                    existing_uri: existing.clone(),
                    new_uri: ns.uri.clone(),
                }
                .into());
            }
        } else {
            prefixes.insert(ns.prefix.clone(), ns.uri.clone());
        }
    }
    Ok(PrefixEnv { prefixes })
}

fn build_indexes(
    ctx: &Ctx<'_>,
) -> Result<(FxHashMap<QName, QName>, FxHashMap<QName, QName>), CompileError> {
    let mut properties: FxHashMap<QName, QName> = FxHashMap::default();
    let mut associations: FxHashMap<QName, QName> = FxHashMap::default();
    for class in ctx.compiled.values() {
        for prop in &class.declared_properties {
            if properties.insert(prop.clone(), class.name.clone()).is_some() {
                return Err(CompileError::DuplicateDefinition {
                    kind: "property",
                    name: prop.to_string(),
                });
            }
        }
        for assoc in &class.declared_associations {
            if associations
                .insert(assoc.clone(), class.name.clone())
                .is_some()
            {
                return Err(CompileError::DuplicateDefinition {
                    kind: "association",
                    name: assoc.to_string(),
                });
            }
        }
    }
    Ok((properties, associations))
}

fn apply_property_overrides(merged: &mut PropertyDefinition, decl: &PropertyDecl) {
    if let Some(title) = &decl.title {
        merged.title = Some(title.clone());
    }
    if let Some(description) = &decl.description {
        merged.description = Some(description.clone());
    }
    if let Some(default_value) = &decl.default_value {
        merged.default_value = Some(default_value.clone());
    }
    if let Some(multiple) = decl.multiple {
        merged.multiple = multiple;
    }
    if let Some(mandatory) = decl.mandatory {
        merged.mandatory = mandatory;
    }
    if let Some(enforced) = decl.enforced {
        merged.enforced = enforced;
    }
    if let Some(protected) = decl.protected {
        merged.protected = protected;
    }
    if let Some(indexed) = decl.indexed {
        merged.indexed = indexed;
    }
    if let Some(bundle) = &decl.analyser_bundle {
        merged.analyser_bundle = Some(bundle.clone());
    }
}

fn compile_body(body: &ConstraintBody) -> Result<CompiledConstraint, String> {
    match body {
        ConstraintBody::ListOfValues(decl) => {
            compile_list_of_values(decl).map(CompiledConstraint::ListOfValues)
        }
        ConstraintBody::Regex(decl) => compile_regex(decl).map(CompiledConstraint::Regex),
        ConstraintBody::StringLength(decl) => {
            compile_string_length(decl).map(CompiledConstraint::StringLength)
        }
        ConstraintBody::Registered(decl) => {
            Ok(CompiledConstraint::Registered(RegisteredConstraint {
                registered_name: decl.registered_name.clone(),
            }))
        }
        _ => Err("unsupported constraint body".to_owned()),
    }
}

fn local_part(prefixed: &str) -> &str {
    prefixed.split_once(':').map_or(prefixed, |(_, local)| local)
}

#[cfg(test)]
mod tests {
    use cm_core::{ListOfValuesDecl, NamespaceError};

    use crate::dictionary::CompiledDictionary;

    use super::*;

    const EX_URI: &str = "http://ns.example.org/model/1.0";
    const DT_URI: &str = "urn:cm:datatype/1.0";

    fn q(local: &str) -> QName {
        QName::new(EX_URI, local)
    }

    fn empty_model(name: &str) -> ModelSchema {
        let mut model = ModelSchema::new(name);
        model.add_namespace(EX_URI, "ex");
        model.add_import(DT_URI, "d");
        model
    }

    fn lov_ref(values: &[&str]) -> ConstraintRef {
        ConstraintRef::ListOfValues(ListOfValuesDecl {
            values: values.iter().map(|v| (*v).to_owned()).collect(),
            case_sensitive: true,
            sorted: false,
            label_key: None,
        })
    }

    fn compile(model: &ModelSchema) -> Result<CompiledModel, CompileError> {
        let dictionary = CompiledDictionary::new();
        ModelCompiler::new(&dictionary).compile(model)
    }

    #[test]
    fn test_compile_simple_type_with_defaults() {
        let mut model = empty_model("ex:example");
        let mut doc = ClassDecl::new("ex:document").with_title("Document");
        doc.properties.push(PropertyDecl::new("ex:name", "d:text"));
        model.types.push(doc);

        let compiled = compile(&model).unwrap();
        let class = compiled.type_def(&q("document")).unwrap();
        assert_eq!(class.title(), Some("Document"));
        assert!(class.parent().is_none());

        let prop = class.property(&q("name")).unwrap();
        assert_eq!(prop.data_type, QName::new(DT_URI, "text"));
        assert!(!prop.mandatory);
        assert!(!prop.enforced);
        assert!(!prop.protected);
        assert!(!prop.multiple);
        assert!(prop.indexed.is_indexed());
        assert_eq!(prop.container, q("document"));
    }

    #[test]
    fn test_inheritance_flattening() {
        let mut model = empty_model("ex:example");
        let mut base = ClassDecl::new("ex:base");
        base.properties.push(
            PropertyDecl::new("ex:p1", "d:text")
                .with_mandatory(true)
                .with_default_value("one"),
        );
        model.types.push(base);
        let mut derived = ClassDecl::new("ex:derived").with_parent("ex:base");
        derived
            .properties
            .push(PropertyDecl::new("ex:p2", "d:int"));
        model.types.push(derived);

        let compiled = compile(&model).unwrap();
        let derived = compiled.type_def(&q("derived")).unwrap();
        assert_eq!(derived.properties().len(), 2);

        // Inherited property keeps every ancestor attribute.
        let inherited = derived.property(&q("p1")).unwrap();
        assert!(inherited.mandatory);
        assert_eq!(inherited.default_value.as_deref(), Some("one"));
        assert_eq!(inherited.container, q("base"));

        // The root declaration index points at the declaring class.
        assert_eq!(compiled.property(&q("p1")).unwrap().container, q("base"));
        assert_eq!(compiled.property(&q("p2")).unwrap().container, q("derived"));
    }

    #[test]
    fn test_override_merges_only_set_attributes() {
        let mut model = empty_model("ex:example");
        let mut base = ClassDecl::new("ex:base");
        base.properties.push(
            PropertyDecl::new("ex:p1", "d:text")
                .with_mandatory(true)
                .with_default_value("one"),
        );
        model.types.push(base);

        // Overrides only the default value; title/mandatory must inherit.
        let mut mid = ClassDecl::new("ex:mid").with_parent("ex:base");
        mid.properties
            .push(PropertyDecl::override_of("ex:p1").with_default_value("two"));
        model.types.push(mid);

        let mut leaf = ClassDecl::new("ex:leaf").with_parent("ex:mid");
        leaf.properties
            .push(PropertyDecl::override_of("ex:p1").with_default_value("three"));
        model.types.push(leaf);

        let compiled = compile(&model).unwrap();

        let at = |class: &str| {
            compiled
                .type_def(&q(class))
                .and_then(|c| c.property(&q("p1")).cloned())
                .ok_or(class.to_owned())
        };
        assert_eq!(at("base").unwrap().default_value.as_deref(), Some("one"));
        assert_eq!(at("mid").unwrap().default_value.as_deref(), Some("two"));
        assert_eq!(at("leaf").unwrap().default_value.as_deref(), Some("three"));

        // Attributes not mentioned by the overrides are unchanged.
        assert!(at("leaf").unwrap().mandatory);
        assert_eq!(at("leaf").unwrap().container, q("base"));
    }

    #[test]
    fn test_override_incompatible_data_type_rejected() {
        let mut model = empty_model("ex:example");
        let mut base = ClassDecl::new("ex:base");
        base.properties.push(PropertyDecl::new("ex:p1", "d:text"));
        model.types.push(base);
        let mut derived = ClassDecl::new("ex:derived").with_parent("ex:base");
        derived.properties.push(PropertyDecl::new("ex:p1", "d:int"));
        model.types.push(derived);

        let err = compile(&model).unwrap_err();
        assert_eq!(err.message_id(), "dictionary.compile.incompatible_override");
    }

    #[test]
    fn test_three_node_cycle_rejected() {
        let mut model = empty_model("ex:example");
        model.types.push(ClassDecl::new("ex:a").with_parent("ex:c"));
        model.types.push(ClassDecl::new("ex:b").with_parent("ex:a"));
        model.types.push(ClassDecl::new("ex:c").with_parent("ex:b"));

        let err = compile(&model).unwrap_err();
        assert_eq!(err.message_id(), "dictionary.compile.cyclic_inheritance");
        assert!(err.is_cyclic());
        match err {
            CompileError::CyclicInheritance { cycle, .. } => {
                assert_eq!(cycle.len(), 4);
            }
            other => panic!("expected CyclicInheritance, got {other:?}"),
        }
    }

    #[test]
    fn test_mandatory_aspect_cycle_rejected() {
        let mut model = empty_model("ex:example");
        let mut a1 = ClassDecl::new("ex:a1");
        a1.add_mandatory_aspect("ex:a2");
        let mut a2 = ClassDecl::new("ex:a2");
        a2.add_mandatory_aspect("ex:a1");
        model.aspects.push(a1);
        model.aspects.push(a2);

        let err = compile(&model).unwrap_err();
        assert!(err.is_cyclic());
    }

    #[test]
    fn test_unresolved_parent_rejected() {
        let mut model = empty_model("ex:example");
        model
            .types
            .push(ClassDecl::new("ex:doc").with_parent("ex:missing"));

        let err = compile(&model).unwrap_err();
        assert_eq!(err.message_id(), "dictionary.compile.unresolved_parent");
    }

    #[test]
    fn test_type_cannot_parent_aspect() {
        let mut model = empty_model("ex:example");
        model.types.push(ClassDecl::new("ex:doc"));
        model
            .aspects
            .push(ClassDecl::new("ex:marker").with_parent("ex:doc"));

        let err = compile(&model).unwrap_err();
        assert_eq!(err.message_id(), "dictionary.compile.unresolved_parent");
    }

    #[test]
    fn test_unresolved_import_rejected() {
        let mut model = ModelSchema::new("ex:example");
        model.add_namespace(EX_URI, "ex");
        model.add_import("http://ns.example.org/absent/1.0", "ab");

        let err = compile(&model).unwrap_err();
        assert_eq!(err.message_id(), "dictionary.compile.unresolved_import");
    }

    #[test]
    fn test_unresolved_data_type_rejected() {
        let mut model = empty_model("ex:example");
        let mut doc = ClassDecl::new("ex:doc");
        doc.properties.push(PropertyDecl::new("ex:p1", "d:nosuch"));
        model.types.push(doc);

        let err = compile(&model).unwrap_err();
        assert_eq!(err.message_id(), "dictionary.compile.unresolved_data_type");
    }

    #[test]
    fn test_fresh_property_without_data_type_rejected() {
        let mut model = empty_model("ex:example");
        let mut doc = ClassDecl::new("ex:doc");
        doc.properties.push(PropertyDecl::override_of("ex:p1"));
        model.types.push(doc);

        let err = compile(&model).unwrap_err();
        assert_eq!(err.message_id(), "dictionary.compile.unresolved_data_type");
    }

    #[test]
    fn test_unresolved_constraint_rejected() {
        let mut model = empty_model("ex:example");
        let mut doc = ClassDecl::new("ex:doc");
        doc.properties.push(
            PropertyDecl::new("ex:p1", "d:text")
                .with_constraint(ConstraintRef::Ref("ex:nosuch".to_owned())),
        );
        model.types.push(doc);

        let err = compile(&model).unwrap_err();
        assert_eq!(err.message_id(), "dictionary.compile.unresolved_constraint");
    }

    #[test]
    fn test_duplicate_class_rejected() {
        let mut model = empty_model("ex:example");
        model.types.push(ClassDecl::new("ex:doc"));
        model.aspects.push(ClassDecl::new("ex:doc"));

        let err = compile(&model).unwrap_err();
        assert_eq!(err.message_id(), "dictionary.compile.duplicate_definition");
    }

    #[test]
    fn test_class_outside_model_namespace_rejected() {
        let mut model = empty_model("ex:example");
        model.types.push(ClassDecl::new("d:doc"));

        let err = compile(&model).unwrap_err();
        assert_eq!(err.message_id(), "dictionary.compile.foreign_namespace");
    }

    #[test]
    fn test_clashing_local_prefix_rejected() {
        let mut model = ModelSchema::new("ex:example");
        model.add_namespace(EX_URI, "ex");
        model.add_import(DT_URI, "ex");

        let err = compile(&model).unwrap_err();
        assert!(matches!(
            err,
            CompileError::Namespace(NamespaceError::PrefixClash { .. })
        ));
    }

    #[test]
    fn test_mandatory_aspect_contributes_properties() {
        let mut model = empty_model("ex:example");
        let mut auditable = ClassDecl::new("ex:auditable");
        auditable
            .properties
            .push(PropertyDecl::new("ex:created", "d:datetime"));
        model.aspects.push(auditable);

        let mut doc = ClassDecl::new("ex:doc");
        doc.properties.push(PropertyDecl::new("ex:name", "d:text"));
        doc.add_mandatory_aspect("ex:auditable");
        model.types.push(doc);

        let compiled = compile(&model).unwrap();
        let doc = compiled.type_def(&q("doc")).unwrap();
        assert_eq!(doc.mandatory_aspects(), &[q("auditable")]);
        // The aspect's property appears in the effective set, while its
        // root declaration stays with the aspect.
        assert!(doc.property(&q("created")).is_some());
        assert_eq!(
            compiled.property(&q("created")).unwrap().container,
            q("auditable")
        );
        // Mandatory aspects are inherited by subclasses of the type.
        assert!(!doc.declared_properties().contains(&q("created")));
    }

    #[test]
    fn test_constraint_accumulation_over_three_levels() {
        let mut model = empty_model("ex:example");

        let mut base = ClassDecl::new("ex:a-base");
        base.properties.push(
            PropertyDecl::new("ex:p1", "d:text").with_constraint(lov_ref(&["ABC", "DEF"])),
        );
        model.aspects.push(base);

        let mut one = ClassDecl::new("ex:a-one").with_parent("ex:a-base");
        one.properties
            .push(PropertyDecl::override_of("ex:p1").with_constraint(lov_ref(&["HIJ"])));
        model.aspects.push(one);

        let mut two = ClassDecl::new("ex:a-two").with_parent("ex:a-one");
        two.properties
            .push(PropertyDecl::override_of("ex:p1").with_constraint(lov_ref(&["XYZ"])));
        model.aspects.push(two);

        let compiled = compile(&model).unwrap();

        // Base keeps its own list.
        let base_prop = compiled
            .aspect(&q("a-base"))
            .and_then(|c| c.property(&q("p1")))
            .unwrap();
        assert_eq!(base_prop.constraints.len(), 1);

        // Each redeclaration accumulates ancestor constraints before its own.
        let two_prop = compiled
            .aspect(&q("a-two"))
            .and_then(|c| c.property(&q("p1")))
            .unwrap();
        let value_lists: Vec<&[String]> = two_prop
            .constraints
            .iter()
            .filter_map(|c| c.constraint.as_list_of_values())
            .map(|c| c.allowed_values())
            .collect();
        assert_eq!(value_lists.len(), 3);
        assert_eq!(value_lists[0], ["ABC", "DEF"]);
        assert_eq!(value_lists[1], ["HIJ"]);
        assert_eq!(value_lists[2], ["XYZ"]);

        // A subclass that does not redeclare inherits the exact list.
        let one_prop = compiled
            .aspect(&q("a-one"))
            .and_then(|c| c.property(&q("p1")))
            .unwrap();
        assert_eq!(one_prop.constraints.len(), 2);
    }

    #[test]
    fn test_anonymous_constraint_naming() {
        let mut model = empty_model("ex:example");
        model.constraints.push(cm_core::ConstraintDecl::new(
            "ex:regex1",
            ConstraintBody::Regex(cm_core::RegexDecl {
                expression: "[A-Z]+".to_owned(),
                requires_match: true,
            }),
        ));
        let mut base = ClassDecl::new("ex:base");
        base.properties.push(
            PropertyDecl::new("ex:p1", "d:text")
                .with_constraint(ConstraintRef::Ref("ex:regex1".to_owned()))
                .with_constraint(lov_ref(&["ABC"])),
        );
        model.types.push(base);

        let compiled = compile(&model).unwrap();
        let prop = compiled.property(&q("p1")).unwrap();
        assert_eq!(prop.constraints.len(), 2);
        assert_eq!(
            prop.constraints[0].name.local_name(),
            "example_base_p1_anon_0"
        );
        assert_eq!(
            prop.constraints[1].name.local_name(),
            "example_base_p1_anon_1"
        );
        assert!(prop.constraints[0].anonymous);

        // Both the named constraint and the anonymous wrappers are
        // registered with the model.
        assert!(compiled.constraint(&q("regex1")).is_some());
        assert!(compiled.constraint(&q("example_base_p1_anon_0")).is_some());
        assert_eq!(compiled.iter_constraints().count(), 3);
    }

    #[test]
    fn test_referenced_constraint_inherits_title() {
        let mut model = empty_model("ex:example");
        let mut decl = cm_core::ConstraintDecl::new(
            "ex:regex1",
            ConstraintBody::Regex(cm_core::RegexDecl {
                expression: "[A-Z]+".to_owned(),
                requires_match: true,
            }),
        );
        decl.title = Some("Regex1 title".to_owned());
        model.constraints.push(decl);

        let mut base = ClassDecl::new("ex:base");
        base.properties.push(
            PropertyDecl::new("ex:p1", "d:text")
                .with_constraint(ConstraintRef::Ref("ex:regex1".to_owned())),
        );
        model.types.push(base);

        let compiled = compile(&model).unwrap();
        let prop = compiled.property(&q("p1")).unwrap();
        assert_eq!(prop.constraints[0].title.as_deref(), Some("Regex1 title"));
    }

    #[test]
    fn test_archive_flag_inheritance_and_override() {
        let mut model = empty_model("ex:example");
        let mut file = ClassDecl::new("ex:file");
        file.archive = Some(true);
        model.types.push(file);
        model
            .types
            .push(ClassDecl::new("ex:file-derived").with_parent("ex:file"));
        let mut no_archive = ClassDecl::new("ex:file-derived-no-archive").with_parent("ex:file");
        no_archive.archive = Some(false);
        model.types.push(no_archive);
        model.types.push(ClassDecl::new("ex:folder"));

        let compiled = compile(&model).unwrap();
        assert_eq!(compiled.class(&q("file")).unwrap().archive(), Some(true));
        assert_eq!(
            compiled.class(&q("file-derived")).unwrap().archive(),
            Some(true)
        );
        assert_eq!(
            compiled
                .class(&q("file-derived-no-archive"))
                .unwrap()
                .archive(),
            Some(false)
        );
        assert_eq!(compiled.class(&q("folder")).unwrap().archive(), None);
    }

    #[test]
    fn test_association_target_resolution() {
        let mut model = empty_model("ex:example");
        let mut doc = ClassDecl::new("ex:doc");
        doc.associations
            .push(cm_core::AssociationDecl::child("ex:contains", "ex:folder"));
        model.types.push(doc);
        model.types.push(ClassDecl::new("ex:folder"));

        let compiled = compile(&model).unwrap();
        let assoc = compiled.association(&q("contains")).unwrap();
        assert!(assoc.kind.is_child());
        assert_eq!(assoc.target_class, q("folder"));
        assert!(!assoc.propagate_timestamps);
    }

    #[test]
    fn test_association_unresolved_target_rejected() {
        let mut model = empty_model("ex:example");
        let mut doc = ClassDecl::new("ex:doc");
        doc.associations
            .push(cm_core::AssociationDecl::new("ex:refers", "ex:missing"));
        model.types.push(doc);

        let err = compile(&model).unwrap_err();
        assert_eq!(err.message_id(), "dictionary.compile.unresolved_class");
    }
}
