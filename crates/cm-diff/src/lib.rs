//! Semantic model diffing for the cm-dictionary engine.
//!
//! Given two compiled model snapshots (or one and absent), the diff engine
//! computes a structured, per-element diff classifying every type, aspect,
//! property, association, and constraint as created, deleted, unchanged,
//! updated (breaking), or updated incrementally (safe). The whole-model
//! verdict ([`ModelDiffReport::is_incremental`]) gates whether a live
//! system may hot-swap the model update without a restart.
//!
//! The diff is a pure function of its two inputs: nothing is persisted and
//! neither input is touched.

mod classify;
mod error;

pub use error::DiffError;

use cm_compiler::CompiledModel;
use cm_core::{FxHashMap, QName};
use serde::Serialize;
use tracing::debug;

/// The kind of model element a diff entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// A content type.
    Type,
    /// An aspect.
    Aspect,
    /// A property (root declaration).
    Property,
    /// An association (root declaration).
    Association,
    /// A constraint (named or anonymous).
    Constraint,
}

/// How an element changed between the two model versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    /// Present only in the new version.
    Created,
    /// Present only in the old version.
    Deleted,
    /// Identical in both versions.
    Unchanged,
    /// Changed in a way that breaks existing data (tightening).
    Updated,
    /// Changed in a backward-compatible way (relaxing or cosmetic).
    UpdatedIncrementally,
}

impl DiffKind {
    /// Returns `true` for changes that are safe to apply to a live system.
    ///
    /// Created, Unchanged, and UpdatedIncrementally are safe; Updated and
    /// Deleted are not.
    #[inline]
    #[must_use]
    pub const fn is_incremental(self) -> bool {
        matches!(self, Self::Created | Self::Unchanged | Self::UpdatedIncrementally)
    }
}

/// One per-element diff record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementDiff {
    /// The element kind.
    pub element: ElementKind,
    /// The element's qualified name.
    pub name: QName,
    /// The classification.
    pub kind: DiffKind,
}

/// The structured diff between two model versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ModelDiffReport {
    entries: Vec<ElementDiff>,
}

impl ModelDiffReport {
    /// Returns the diff entries, ordered by element kind then name.
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[ElementDiff] {
        &self.entries
    }

    /// Consumes the report, returning the entries.
    #[must_use]
    pub fn into_entries(self) -> Vec<ElementDiff> {
        self.entries
    }

    /// Returns the number of entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the report has no entries.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counts entries matching an element kind and diff kind.
    #[must_use]
    pub fn count(&self, element: ElementKind, kind: DiffKind) -> usize {
        self.entries
            .iter()
            .filter(|e| e.element == element && e.kind == kind)
            .count()
    }

    /// Returns `true` if every entry is safe to apply to a live system.
    ///
    /// This is the verdict that gates hot-swapping a model update without
    /// a restart.
    #[must_use]
    pub fn is_incremental(&self) -> bool {
        self.entries.iter().all(|e| e.kind.is_incremental())
    }
}

/// Computes the diff between two compiled model snapshots.
///
/// Exactly one input may be `None`: `(Some, None)` denotes whole-model
/// deletion, `(None, Some)` whole-model creation.
///
/// # Errors
///
/// Returns [`DiffError::NoInput`] when both inputs are `None`: a usage
/// error, surfaced immediately.
pub fn diff_models(
    old: Option<&CompiledModel>,
    new: Option<&CompiledModel>,
) -> Result<ModelDiffReport, DiffError> {
    let mut entries = match (old, new) {
        (None, None) => return Err(DiffError::NoInput),
        (Some(old), None) => whole_model(old, DiffKind::Deleted),
        (None, Some(new)) => whole_model(new, DiffKind::Created),
        (Some(old), Some(new)) => diff_pair(old, new),
    };

    entries.sort_by(|a, b| (a.element, &a.name).cmp(&(b.element, &b.name)));
    debug!(entries = entries.len(), "Computed model diff");
    Ok(ModelDiffReport { entries })
}

fn whole_model(model: &CompiledModel, kind: DiffKind) -> Vec<ElementDiff> {
    let mut entries = Vec::new();
    for class in model.iter_types() {
        entries.push(entry(ElementKind::Type, class.name(), kind));
    }
    for class in model.iter_aspects() {
        entries.push(entry(ElementKind::Aspect, class.name(), kind));
    }
    for property in model.iter_properties() {
        entries.push(entry(ElementKind::Property, &property.name, kind));
    }
    for association in model.iter_associations() {
        entries.push(entry(ElementKind::Association, &association.name, kind));
    }
    for constraint in model.iter_constraints() {
        entries.push(entry(ElementKind::Constraint, &constraint.name, kind));
    }
    entries
}

fn diff_pair(old: &CompiledModel, new: &CompiledModel) -> Vec<ElementDiff> {
    let mut entries = Vec::new();

    diff_kind_section(
        &mut entries,
        ElementKind::Type,
        old.iter_types().map(|c| (c.name().clone(), c)).collect(),
        new.iter_types().map(|c| (c.name().clone(), c)).collect(),
        |o, n| classify::classify_class(o, n),
    );
    diff_kind_section(
        &mut entries,
        ElementKind::Aspect,
        old.iter_aspects().map(|c| (c.name().clone(), c)).collect(),
        new.iter_aspects().map(|c| (c.name().clone(), c)).collect(),
        |o, n| classify::classify_class(o, n),
    );
    diff_kind_section(
        &mut entries,
        ElementKind::Property,
        old.iter_properties().map(|p| (p.name.clone(), p)).collect(),
        new.iter_properties().map(|p| (p.name.clone(), p)).collect(),
        |o, n| classify::classify_property(o, n),
    );
    diff_kind_section(
        &mut entries,
        ElementKind::Association,
        old.iter_associations()
            .map(|a| (a.name.clone(), a))
            .collect(),
        new.iter_associations()
            .map(|a| (a.name.clone(), a))
            .collect(),
        |o, n| classify::classify_association(o, n),
    );
    diff_kind_section(
        &mut entries,
        ElementKind::Constraint,
        old.iter_constraints().map(|c| (c.name.clone(), c)).collect(),
        new.iter_constraints().map(|c| (c.name.clone(), c)).collect(),
        |o, n| classify::classify_constraint(o, n),
    );

    entries
}

fn diff_kind_section<'m, T>(
    entries: &mut Vec<ElementDiff>,
    element: ElementKind,
    old: FxHashMap<QName, &'m T>,
    new: FxHashMap<QName, &'m T>,
    classify: impl Fn(&T, &T) -> DiffKind,
) {
    for (name, old_def) in &old {
        match new.get(name) {
            Some(new_def) => entries.push(entry(element, name, classify(old_def, new_def))),
            None => entries.push(entry(element, name, DiffKind::Deleted)),
        }
    }
    for name in new.keys() {
        if !old.contains_key(name) {
            entries.push(entry(element, name, DiffKind::Created));
        }
    }
}

fn entry(element: ElementKind, name: &QName, kind: DiffKind) -> ElementDiff {
    ElementDiff {
        element,
        name: name.clone(),
        kind,
    }
}

#[cfg(test)]
mod tests {
    use cm_compiler::{CompiledDictionary, CompiledModel, ModelCompiler};
    use cm_core::{
        AssociationDecl, ClassDecl, ConstraintBody, ConstraintDecl, ListOfValuesDecl, ModelSchema,
        PropertyDecl,
    };

    use super::*;

    const EX_URI: &str = "http://ns.example.org/model/1.0";

    fn q(local: &str) -> QName {
        QName::new(EX_URI, local)
    }

    fn compile(build: impl FnOnce(&mut ModelSchema)) -> CompiledModel {
        let mut schema = ModelSchema::new("ex:example");
        schema.add_namespace(EX_URI, "ex");
        schema.add_import("urn:cm:datatype/1.0", "d");
        build(&mut schema);
        let dictionary = CompiledDictionary::new();
        ModelCompiler::new(&dictionary).compile(&schema).unwrap()
    }

    /// Three types and three aspects with two properties each.
    fn wide_model() -> CompiledModel {
        compile(|schema| {
            for i in 1..=3 {
                let mut class = ClassDecl::new(format!("ex:type{i}"));
                class
                    .properties
                    .push(PropertyDecl::new(format!("ex:tprop{i}a"), "d:text"));
                class
                    .properties
                    .push(PropertyDecl::new(format!("ex:tprop{i}b"), "d:int"));
                schema.types.push(class);

                let mut aspect = ClassDecl::new(format!("ex:aspect{i}"));
                aspect
                    .properties
                    .push(PropertyDecl::new(format!("ex:aprop{i}a"), "d:text"));
                aspect
                    .properties
                    .push(PropertyDecl::new(format!("ex:aprop{i}b"), "d:int"));
                schema.aspects.push(aspect);
            }
        })
    }

    fn aspect_with_props(props: &[&str]) -> CompiledModel {
        compile(|schema| {
            let mut aspect = ClassDecl::new("ex:a1");
            for prop in props {
                aspect
                    .properties
                    .push(PropertyDecl::new(format!("ex:{prop}"), "d:text"));
            }
            schema.aspects.push(aspect);
        })
    }

    #[test]
    fn test_both_inputs_absent_is_an_error() {
        let err = diff_models(None, None).unwrap_err();
        assert_eq!(err, DiffError::NoInput);
        assert_eq!(err.to_string(), "no previous version of model to delete");
    }

    #[test]
    fn test_whole_model_deletion() {
        let model = wide_model();
        let report = diff_models(Some(&model), None).unwrap();

        assert_eq!(report.count(ElementKind::Type, DiffKind::Deleted), 3);
        assert_eq!(report.count(ElementKind::Aspect, DiffKind::Deleted), 3);
        assert_eq!(report.count(ElementKind::Property, DiffKind::Deleted), 12);
        assert!(report.entries().iter().all(|e| e.kind == DiffKind::Deleted));
        assert!(!report.is_incremental());
    }

    #[test]
    fn test_whole_model_creation_mirrors_deletion() {
        let model = wide_model();
        let deleted = diff_models(Some(&model), None).unwrap();
        let created = diff_models(None, Some(&model)).unwrap();

        // Element-for-element duality, equal cardinality.
        assert_eq!(deleted.len(), created.len());
        assert!(created.entries().iter().all(|e| e.kind == DiffKind::Created));
        assert!(created.is_incremental());
    }

    #[test]
    fn test_identical_models_yield_only_unchanged() {
        let old = wide_model();
        let new = wide_model();
        let report = diff_models(Some(&old), Some(&new)).unwrap();

        // One entry per element, all unchanged.
        assert_eq!(report.len(), 3 + 3 + 12);
        assert!(report.entries().iter().all(|e| e.kind == DiffKind::Unchanged));
        assert!(report.is_incremental());
    }

    #[test]
    fn test_same_snapshot_against_itself() {
        let model = wide_model();
        let report = diff_models(Some(&model), Some(&model)).unwrap();
        assert!(report.entries().iter().all(|e| e.kind == DiffKind::Unchanged));
    }

    #[test]
    fn test_added_property_is_created_and_aspect_unchanged() {
        let old = aspect_with_props(&["p1"]);
        let new = aspect_with_props(&["p1", "p2"]);
        let report = diff_models(Some(&old), Some(&new)).unwrap();

        assert_eq!(report.count(ElementKind::Aspect, DiffKind::Unchanged), 1);
        assert_eq!(report.count(ElementKind::Property, DiffKind::Created), 1);
        assert_eq!(report.count(ElementKind::Property, DiffKind::Unchanged), 1);
        // No Updated entries appear anywhere, p1 included.
        assert_eq!(report.count(ElementKind::Property, DiffKind::Updated), 0);
        assert_eq!(
            report.count(ElementKind::Property, DiffKind::UpdatedIncrementally),
            0
        );
        assert!(report.is_incremental());
    }

    #[test]
    fn test_removed_property_is_breaking() {
        let old = aspect_with_props(&["p1", "p2"]);
        let new = aspect_with_props(&["p1"]);
        let report = diff_models(Some(&old), Some(&new)).unwrap();

        assert_eq!(report.count(ElementKind::Aspect, DiffKind::Updated), 1);
        assert_eq!(report.count(ElementKind::Property, DiffKind::Deleted), 1);
        assert!(!report.is_incremental());
    }

    #[test]
    fn test_property_becoming_mandatory_is_breaking() {
        let old = compile(|schema| {
            let mut class = ClassDecl::new("ex:t1");
            class.properties.push(PropertyDecl::new("ex:p1", "d:text"));
            schema.types.push(class);
        });
        let new = compile(|schema| {
            let mut class = ClassDecl::new("ex:t1");
            class
                .properties
                .push(PropertyDecl::new("ex:p1", "d:text").with_mandatory(true));
            schema.types.push(class);
        });

        let report = diff_models(Some(&old), Some(&new)).unwrap();
        assert_eq!(report.count(ElementKind::Property, DiffKind::Updated), 1);
        assert_eq!(report.count(ElementKind::Type, DiffKind::Unchanged), 1);
        assert!(!report.is_incremental());

        // The reverse transition relaxes the constraint.
        let report = diff_models(Some(&new), Some(&old)).unwrap();
        assert_eq!(
            report.count(ElementKind::Property, DiffKind::UpdatedIncrementally),
            1
        );
        assert_eq!(report.count(ElementKind::Property, DiffKind::Updated), 0);
        assert!(report.is_incremental());
    }

    #[test]
    fn test_default_value_change_is_incremental() {
        let old = compile(|schema| {
            let mut class = ClassDecl::new("ex:t1");
            class.properties.push(PropertyDecl::new("ex:p1", "d:text"));
            schema.types.push(class);
        });
        let new = compile(|schema| {
            let mut class = ClassDecl::new("ex:t1");
            class
                .properties
                .push(PropertyDecl::new("ex:p1", "d:text").with_default_value("x"));
            schema.types.push(class);
        });

        let report = diff_models(Some(&old), Some(&new)).unwrap();
        assert_eq!(
            report.count(ElementKind::Property, DiffKind::UpdatedIncrementally),
            1
        );
        assert!(report.is_incremental());
    }

    #[test]
    fn test_data_type_change_is_breaking() {
        let old = aspect_with_props(&["p1"]);
        let new = compile(|schema| {
            let mut aspect = ClassDecl::new("ex:a1");
            aspect.properties.push(PropertyDecl::new("ex:p1", "d:int"));
            schema.aspects.push(aspect);
        });

        let report = diff_models(Some(&old), Some(&new)).unwrap();
        assert_eq!(report.count(ElementKind::Property, DiffKind::Updated), 1);
    }

    #[test]
    fn test_added_association_is_incremental_for_the_class() {
        let two_types = |with_assoc: bool| {
            compile(move |schema| {
                let mut t1 = ClassDecl::new("ex:t1");
                if with_assoc {
                    t1.associations
                        .push(AssociationDecl::child("ex:contains", "ex:t2"));
                }
                schema.types.push(t1);
                schema.types.push(ClassDecl::new("ex:t2"));
            })
        };

        let report = diff_models(Some(&two_types(false)), Some(&two_types(true))).unwrap();
        assert_eq!(
            report.count(ElementKind::Type, DiffKind::UpdatedIncrementally),
            1
        );
        assert_eq!(report.count(ElementKind::Type, DiffKind::Unchanged), 1);
        assert_eq!(report.count(ElementKind::Association, DiffKind::Created), 1);
        assert!(report.is_incremental());

        // Removal reverses into a breaking change.
        let report = diff_models(Some(&two_types(true)), Some(&two_types(false))).unwrap();
        assert_eq!(report.count(ElementKind::Type, DiffKind::Updated), 1);
        assert_eq!(report.count(ElementKind::Association, DiffKind::Deleted), 1);
        assert!(!report.is_incremental());
    }

    #[test]
    fn test_added_mandatory_aspect_is_breaking_for_the_type() {
        let model = |with_mandatory: bool| {
            compile(move |schema| {
                let mut t1 = ClassDecl::new("ex:t1");
                t1.properties.push(PropertyDecl::new("ex:p1", "d:text"));
                if with_mandatory {
                    t1.add_mandatory_aspect("ex:a1");
                }
                schema.types.push(t1);

                let mut a1 = ClassDecl::new("ex:a1");
                a1.properties.push(PropertyDecl::new("ex:p9", "d:text"));
                schema.aspects.push(a1);
            })
        };

        let report = diff_models(Some(&model(false)), Some(&model(true))).unwrap();
        assert_eq!(report.count(ElementKind::Type, DiffKind::Updated), 1);
        assert_eq!(report.count(ElementKind::Aspect, DiffKind::Unchanged), 1);
        assert!(!report.is_incremental());
    }

    #[test]
    fn test_added_types_and_aspects_leave_existing_unchanged() {
        let old = compile(|schema| {
            schema.types.push(ClassDecl::new("ex:t1"));
            schema.aspects.push(ClassDecl::new("ex:a1"));
        });
        let new = compile(|schema| {
            schema.types.push(ClassDecl::new("ex:t1"));
            schema.types.push(ClassDecl::new("ex:t2"));
            schema.aspects.push(ClassDecl::new("ex:a1"));
            schema.aspects.push(ClassDecl::new("ex:a2"));
        });

        let report = diff_models(Some(&old), Some(&new)).unwrap();
        assert_eq!(report.count(ElementKind::Type, DiffKind::Unchanged), 1);
        assert_eq!(report.count(ElementKind::Type, DiffKind::Created), 1);
        assert_eq!(report.count(ElementKind::Aspect, DiffKind::Unchanged), 1);
        assert_eq!(report.count(ElementKind::Aspect, DiffKind::Created), 1);
        assert!(report.is_incremental());
    }

    #[test]
    fn test_mixed_update_per_kind() {
        // type1 unchanged, type2 deleted, type3 loses a property, type4 new.
        let old = compile(|schema| {
            schema.types.push(ClassDecl::new("ex:type1"));
            schema.types.push(ClassDecl::new("ex:type2"));
            let mut t3 = ClassDecl::new("ex:type3");
            t3.properties.push(PropertyDecl::new("ex:p5", "d:text"));
            t3.properties.push(PropertyDecl::new("ex:p6", "d:int"));
            schema.types.push(t3);
        });
        let new = compile(|schema| {
            schema.types.push(ClassDecl::new("ex:type1"));
            let mut t3 = ClassDecl::new("ex:type3");
            t3.properties.push(PropertyDecl::new("ex:p5", "d:text"));
            schema.types.push(t3);
            schema.types.push(ClassDecl::new("ex:type4"));
        });

        let report = diff_models(Some(&old), Some(&new)).unwrap();
        assert_eq!(report.count(ElementKind::Type, DiffKind::Unchanged), 1);
        assert_eq!(report.count(ElementKind::Type, DiffKind::Deleted), 1);
        assert_eq!(report.count(ElementKind::Type, DiffKind::Updated), 1);
        assert_eq!(report.count(ElementKind::Type, DiffKind::Created), 1);
        assert!(!report.is_incremental());
    }

    #[test]
    fn test_changed_constraint_is_breaking() {
        let model = |values: &'static [&'static str]| {
            compile(move |schema| {
                schema.constraints.push(ConstraintDecl::new(
                    "ex:list1",
                    ConstraintBody::ListOfValues(ListOfValuesDecl {
                        values: values.iter().map(|v| (*v).to_owned()).collect(),
                        case_sensitive: true,
                        sorted: false,
                        label_key: None,
                    }),
                ));
            })
        };

        let report = diff_models(Some(&model(&["A"])), Some(&model(&["A", "B"]))).unwrap();
        assert_eq!(report.count(ElementKind::Constraint, DiffKind::Updated), 1);
        assert!(!report.is_incremental());

        let report = diff_models(Some(&model(&["A"])), Some(&model(&["A"]))).unwrap();
        assert_eq!(report.count(ElementKind::Constraint, DiffKind::Unchanged), 1);
    }

    #[test]
    fn test_entries_are_deterministically_ordered() {
        let model = wide_model();
        let a = diff_models(Some(&model), None).unwrap();
        let b = diff_models(Some(&model), None).unwrap();
        assert_eq!(a.entries(), b.entries());
        // Types sort before aspects, aspects before properties.
        assert_eq!(a.entries()[0].element, ElementKind::Type);
    }

    #[test]
    fn test_report_serializes_to_json() {
        let old = aspect_with_props(&["p1"]);
        let new = aspect_with_props(&["p1", "p2"]);
        let report = diff_models(Some(&old), Some(&new)).unwrap();

        let json = serde_json::to_value(&report).unwrap();
        let entries = json.as_array().unwrap();
        assert_eq!(entries.len(), report.len());
        assert!(entries[0].get("element").is_some());
        assert!(entries[0].get("kind").is_some());
    }
}
