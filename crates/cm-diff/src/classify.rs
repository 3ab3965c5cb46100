//! Element-level diff classification rules.
//!
//! The incremental/breaking distinction is attribute-specific and
//! asymmetric: relaxing a restriction (dropping mandatory/enforced/
//! protected, removing a constraint) is incremental, while tightening one
//! (turning those flags on, adding a constraint, changing a data type or
//! multiplicity) is breaking. At class level, adding an association is
//! incremental but removing one, or touching the mandatory-aspect set,
//! is breaking; property additions alone leave the class untouched because
//! the new property carries its own Created entry.

use cm_core::FxHashSet;
use cm_compiler::{
    AssociationDefinition, ClassDefinition, ConstraintDefinition, PropertyDefinition,
};

use crate::DiffKind;

/// Classifies a class present in both model versions.
pub(crate) fn classify_class(old: &ClassDefinition, new: &ClassDefinition) -> DiffKind {
    if old.parent() != new.parent() || old.archive() != new.archive() {
        return DiffKind::Updated;
    }

    let old_aspects: FxHashSet<_> = old.mandatory_aspects().iter().collect();
    let new_aspects: FxHashSet<_> = new.mandatory_aspects().iter().collect();
    if old_aspects != new_aspects {
        return DiffKind::Updated;
    }

    // A property that existed before and is gone now breaks existing data.
    if old.properties().keys().any(|p| !new.properties().contains_key(p)) {
        return DiffKind::Updated;
    }

    // Association removal is breaking; addition is incremental.
    if old
        .associations()
        .keys()
        .any(|a| !new.associations().contains_key(a))
    {
        return DiffKind::Updated;
    }
    let association_added = new
        .associations()
        .keys()
        .any(|a| !old.associations().contains_key(a));

    let cosmetic_change = old.title() != new.title()
        || old.description() != new.description()
        || old.analyser_bundle() != new.analyser_bundle();

    if association_added || cosmetic_change {
        DiffKind::UpdatedIncrementally
    } else {
        DiffKind::Unchanged
    }
}

/// Classifies a property present in both model versions.
pub(crate) fn classify_property(old: &PropertyDefinition, new: &PropertyDefinition) -> DiffKind {
    if old == new {
        return DiffKind::Unchanged;
    }

    let breaking = old.data_type != new.data_type
        || old.multiple != new.multiple
        || (!old.mandatory && new.mandatory)
        || (!old.enforced && new.enforced)
        || (!old.protected && new.protected)
        || constraints_tightened(&old.constraints, &new.constraints);

    if breaking {
        DiffKind::Updated
    } else {
        DiffKind::UpdatedIncrementally
    }
}

/// Classifies an association present in both model versions.
pub(crate) fn classify_association(
    old: &AssociationDefinition,
    new: &AssociationDefinition,
) -> DiffKind {
    if old == new {
        return DiffKind::Unchanged;
    }

    let breaking = old.kind != new.kind
        || old.target_class != new.target_class
        || old.source_many != new.source_many
        || old.target_many != new.target_many
        || (!old.source_mandatory && new.source_mandatory)
        || (!old.target_mandatory && new.target_mandatory);

    if breaking {
        DiffKind::Updated
    } else {
        DiffKind::UpdatedIncrementally
    }
}

/// Classifies a constraint present in both model versions.
///
/// Constraint bodies have no incremental variant: value lists are
/// positional, so any change may invalidate existing data.
pub(crate) fn classify_constraint(
    old: &ConstraintDefinition,
    new: &ConstraintDefinition,
) -> DiffKind {
    if old == new {
        DiffKind::Unchanged
    } else {
        DiffKind::Updated
    }
}

/// Returns `true` if the new constraint list tightens the old one.
///
/// Keeping the old list as a prefix and appending is a pure addition
/// (tightening, breaking); dropping a suffix is a pure relaxation; any
/// other difference is treated as tightening.
fn constraints_tightened(old: &[ConstraintDefinition], new: &[ConstraintDefinition]) -> bool {
    if old == new {
        return false;
    }
    if new.len() < old.len() && old[..new.len()] == *new {
        // Pure removal: relaxed.
        return false;
    }
    true
}
