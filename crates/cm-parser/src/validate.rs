//! Structural validation of parsed model schemas.
//!
//! Validation checks what can be decided without cross-model knowledge:
//! every referenced name is a well-formed `prefix:local` string, and local
//! names are unique per declaration kind. Prefix resolution, inheritance,
//! and cross-model references are the compiler's responsibility.

use cm_core::{ConstraintRef, FxHashSet, ModelSchema, NamespaceError};

use crate::error::ParseError;

/// Validates a model schema's structure.
///
/// # Errors
///
/// Returns [`ParseError::Name`] for a name that is not `prefix:local` with
/// both parts non-empty, and [`ParseError::DuplicateName`] when two
/// declarations of the same kind share a name.
pub fn validate_schema(schema: &ModelSchema) -> Result<(), ParseError> {
    check_name(&schema.name)?;

    let mut prefixes: FxHashSet<&str> = FxHashSet::default();
    for ns in schema.namespaces.iter().chain(schema.imports.iter()) {
        if !prefixes.insert(ns.prefix.as_str()) {
            return Err(duplicate(schema, "namespace prefix", &ns.prefix));
        }
    }

    let mut class_names: FxHashSet<&str> = FxHashSet::default();
    for class in schema.classes() {
        check_name(&class.name)?;
        if !class_names.insert(class.name.as_str()) {
            return Err(duplicate(schema, "class", &class.name));
        }
        if let Some(parent) = &class.parent {
            check_name(parent)?;
        }
        for aspect in &class.mandatory_aspects {
            check_name(aspect)?;
        }

        let mut property_names: FxHashSet<&str> = FxHashSet::default();
        for property in &class.properties {
            check_name(&property.name)?;
            if !property_names.insert(property.name.as_str()) {
                return Err(duplicate(schema, "property", &property.name));
            }
            if let Some(data_type) = &property.data_type {
                check_name(data_type)?;
            }
            for constraint in &property.constraints {
                if let ConstraintRef::Ref(name) = constraint {
                    check_name(name)?;
                }
            }
        }

        let mut association_names: FxHashSet<&str> = FxHashSet::default();
        for association in &class.associations {
            check_name(&association.name)?;
            check_name(&association.target_class)?;
            if !association_names.insert(association.name.as_str()) {
                return Err(duplicate(schema, "association", &association.name));
            }
        }
    }

    let mut constraint_names: FxHashSet<&str> = FxHashSet::default();
    for constraint in &schema.constraints {
        check_name(&constraint.name)?;
        if !constraint_names.insert(constraint.name.as_str()) {
            return Err(duplicate(schema, "constraint", &constraint.name));
        }
    }

    let mut data_type_names: FxHashSet<&str> = FxHashSet::default();
    for data_type in &schema.data_types {
        check_name(&data_type.name)?;
        if !data_type_names.insert(data_type.name.as_str()) {
            return Err(duplicate(schema, "data type", &data_type.name));
        }
    }

    Ok(())
}

/// Checks that a name is `prefix:local` with both parts non-empty.
fn check_name(name: &str) -> Result<(), ParseError> {
    let malformed = || {
        ParseError::Name(NamespaceError::MalformedName {
            name: name.to_owned(),
        })
    };
    let (prefix, local) = name.split_once(':').ok_or_else(malformed)?;
    if prefix.is_empty() || local.is_empty() {
        return Err(malformed());
    }
    Ok(())
}

fn duplicate(schema: &ModelSchema, kind: &'static str, name: &str) -> ParseError {
    ParseError::DuplicateName {
        kind,
        name: name.to_owned(),
        model: schema.name.clone(),
    }
}
