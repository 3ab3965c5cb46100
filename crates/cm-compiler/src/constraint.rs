//! Compiled constraints and the constraint resolution engine.
//!
//! Properties carry ordered constraint lists. Each entry resolves either a
//! named model-level constraint or an inline declaration; both forms are
//! wrapped in a property-scoped anonymous definition named
//! `{model}_{class}_{prop}_anon_{i}` so that every constraint attached to a
//! property is individually addressable in the dictionary. Order is
//! significant: list-of-values consumers read positional value lists, and
//! inheritance accumulates ancestor lists before the subclass's own.

use cm_core::{ListOfValuesDecl, MessageRegistry, QName, RegexDecl, StringLengthDecl};
use serde::Serialize;

/// A compiled list-of-values constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListOfValuesConstraint {
    /// Allowed values, in declaration order.
    pub values: Vec<String>,
    /// Whether evaluation compares case-sensitively.
    pub case_sensitive: bool,
    /// Whether UIs should sort values for display.
    pub sorted: bool,
    /// Key prefix for localised display labels.
    pub label_key: Option<String>,
}

impl ListOfValuesConstraint {
    /// Returns the allowed values in declaration order.
    #[must_use]
    pub fn allowed_values(&self) -> &[String] {
        &self.values
    }

    /// Returns `true` if the value is in the allowed list.
    #[must_use]
    pub fn evaluate(&self, value: &str) -> bool {
        if self.case_sensitive {
            self.values.iter().any(|v| v == value)
        } else {
            self.values.iter().any(|v| v.eq_ignore_ascii_case(value))
        }
    }

    /// Resolves the localised display label for an allowed value.
    ///
    /// The label resolves through the message lookup keyed
    /// `{label_key}.{value}`; an allowed value without a label falls back
    /// to the raw value. A value that is not in the allowed list yields
    /// `None` (not an error) so UIs can degrade gracefully.
    #[must_use]
    pub fn display_label(&self, value: &str, messages: &MessageRegistry) -> Option<String> {
        if !self.values.iter().any(|v| v == value) {
            return None;
        }
        let label = self
            .label_key
            .as_deref()
            .and_then(|key| messages.lookup(&format!("{key}.{value}")));
        Some(label.unwrap_or(value).to_owned())
    }
}

/// A compiled regular-expression constraint.
#[derive(Debug, Clone, Serialize)]
pub struct RegexConstraint {
    /// The source expression.
    pub expression: String,
    /// `true`: values must match. `false`: values must not match.
    pub requires_match: bool,
    /// The compiled expression.
    #[serde(skip)]
    compiled: regex::Regex,
}

impl RegexConstraint {
    /// Compiles the expression.
    ///
    /// # Errors
    ///
    /// Returns the `regex` crate's error for an invalid expression.
    pub fn new(expression: impl Into<String>, requires_match: bool) -> Result<Self, regex::Error> {
        let expression = expression.into();
        let compiled = regex::Regex::new(&expression)?;
        Ok(Self {
            expression,
            requires_match,
            compiled,
        })
    }

    /// Returns `true` if the value satisfies the constraint.
    #[must_use]
    pub fn evaluate(&self, value: &str) -> bool {
        self.compiled.is_match(value) == self.requires_match
    }
}

impl PartialEq for RegexConstraint {
    fn eq(&self, other: &Self) -> bool {
        self.expression == other.expression && self.requires_match == other.requires_match
    }
}

impl Eq for RegexConstraint {}

/// A compiled string-length constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StringLengthConstraint {
    /// Minimum length in characters.
    pub min_length: usize,
    /// Maximum length in characters.
    pub max_length: usize,
}

impl StringLengthConstraint {
    /// Returns `true` if the value's character count is within bounds.
    #[must_use]
    pub fn evaluate(&self, value: &str) -> bool {
        let len = value.chars().count();
        len >= self.min_length && len <= self.max_length
    }
}

/// A reference into the session's registered-constraint registry.
///
/// Evaluation is deferred to the registry owner; the compiled dictionary
/// only records the registration key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredConstraint {
    /// The registration key.
    pub registered_name: String,
}

/// A compiled constraint of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum CompiledConstraint {
    /// Restrict values to an explicit list.
    ListOfValues(ListOfValuesConstraint),
    /// Restrict values by regular expression.
    Regex(RegexConstraint),
    /// Restrict string length.
    StringLength(StringLengthConstraint),
    /// Delegate to a registered implementation.
    Registered(RegisteredConstraint),
}

impl CompiledConstraint {
    /// Evaluates the constraint against a value.
    ///
    /// Returns `None` for registered constraints, whose implementation
    /// lives outside the compiled dictionary.
    #[must_use]
    pub fn evaluate(&self, value: &str) -> Option<bool> {
        match self {
            Self::ListOfValues(c) => Some(c.evaluate(value)),
            Self::Regex(c) => Some(c.evaluate(value)),
            Self::StringLength(c) => Some(c.evaluate(value)),
            Self::Registered(_) => None,
        }
    }

    /// Returns the constraint as a list-of-values, if it is one.
    #[must_use]
    pub fn as_list_of_values(&self) -> Option<&ListOfValuesConstraint> {
        match self {
            Self::ListOfValues(c) => Some(c),
            _ => None,
        }
    }

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

/// A constraint definition: a named (or anonymous, property-scoped)
/// compiled constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintDefinition {
    /// The qualified name (generated for anonymous constraints).
    pub name: QName,
    /// The defining model.
    pub model: QName,
    /// Declared title; anonymous wrappers inherit the referenced
    /// constraint's title.
    pub title: Option<String>,
    /// Declared description, inherited like the title.
    pub description: Option<String>,
    /// `true` for property-scoped anonymous definitions.
    pub anonymous: bool,
    /// The compiled constraint.
    pub constraint: CompiledConstraint,
}

impl ConstraintDefinition {
    /// Resolves the localised title, falling back to the declared text.
    ///
    /// Lookup key: `constraint.{prefix}_{local}.title` where the prefixed
    /// form uses `_` in place of `:`.
    #[must_use]
    pub fn localised_title(&self, messages: &MessageRegistry, prefixed: &str) -> Option<String> {
        let key = format!("constraint.{}.title", prefixed.replace(':', "_"));
        messages
            .lookup(&key)
            .map(str::to_owned)
            .or_else(|| self.title.clone())
    }
}

pub(crate) fn compile_list_of_values(
    decl: &ListOfValuesDecl,
) -> Result<ListOfValuesConstraint, String> {
    if decl.values.is_empty() {
        return Err("list-of-values constraint has no values".to_owned());
    }
    Ok(ListOfValuesConstraint {
        values: decl.values.clone(),
        case_sensitive: decl.case_sensitive,
        sorted: decl.sorted,
        label_key: decl.label_key.clone(),
    })
}

pub(crate) fn compile_regex(decl: &RegexDecl) -> Result<RegexConstraint, String> {
    RegexConstraint::new(decl.expression.clone(), decl.requires_match).map_err(|e| e.to_string())
}

pub(crate) fn compile_string_length(
    decl: &StringLengthDecl,
) -> Result<StringLengthConstraint, String> {
    if decl.min_length > decl.max_length {
        return Err(format!(
            "min_length {} exceeds max_length {}",
            decl.min_length, decl.max_length
        ));
    }
    Ok(StringLengthConstraint {
        min_length: decl.min_length,
        max_length: decl.max_length,
    })
}

#[cfg(test)]
mod tests {
    use cm_core::MessageBundle;

    use super::*;

    fn lov(values: &[&str], label_key: Option<&str>) -> ListOfValuesConstraint {
        ListOfValuesConstraint {
            values: values.iter().map(|v| (*v).to_owned()).collect(),
            case_sensitive: true,
            sorted: false,
            label_key: label_key.map(str::to_owned),
        }
    }

    #[test]
    fn test_list_of_values_evaluate() {
        let constraint = lov(&["ABC", "DEF"], None);
        assert!(constraint.evaluate("ABC"));
        assert!(!constraint.evaluate("abc"));
        assert!(!constraint.evaluate("XYZ"));
    }

    #[test]
    fn test_list_of_values_case_insensitive() {
        let mut constraint = lov(&["ABC"], None);
        constraint.case_sensitive = false;
        assert!(constraint.evaluate("abc"));
    }

    #[test]
    fn test_display_label_resolves_through_messages() {
        let mut bundle = MessageBundle::new();
        bundle.insert("ex_list1.ABC", "ABC display");
        let mut messages = MessageRegistry::new();
        messages.add_bundle(bundle);

        let constraint = lov(&["ABC", "OMEGA"], Some("ex_list1"));

        // Labelled value resolves through the bundle.
        assert_eq!(
            constraint.display_label("ABC", &messages).as_deref(),
            Some("ABC display")
        );
        // Allowed but unlabelled value falls back to the raw value.
        assert_eq!(
            constraint.display_label("OMEGA", &messages).as_deref(),
            Some("OMEGA")
        );
        // Unknown value yields None, never an error.
        assert_eq!(constraint.display_label("nosuchLOV", &messages), None);
    }

    #[test]
    fn test_regex_constraint_evaluate() {
        let constraint = RegexConstraint::new("^[A-Z]+$", true).unwrap();
        assert!(constraint.evaluate("ABC"));
        assert!(!constraint.evaluate("abc"));

        let negated = RegexConstraint::new("^[A-Z]+$", false).unwrap();
        assert!(!negated.evaluate("ABC"));
        assert!(negated.evaluate("abc"));
    }

    #[test]
    fn test_regex_constraint_equality_ignores_compiled_state() {
        let a = RegexConstraint::new("[A-Z]+", true).unwrap();
        let b = RegexConstraint::new("[A-Z]+", true).unwrap();
        let c = RegexConstraint::new("[a-z]+", true).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_regex_invalid_expression() {
        assert!(RegexConstraint::new("[unclosed", true).is_err());
    }

    #[test]
    fn test_string_length_evaluate() {
        let constraint = StringLengthConstraint {
            min_length: 2,
            max_length: 4,
        };
        assert!(!constraint.evaluate("a"));
        assert!(constraint.evaluate("ab"));
        assert!(constraint.evaluate("abcd"));
        assert!(!constraint.evaluate("abcde"));
    }

    #[test]
    fn test_compiled_constraint_registered_defers_evaluation() {
        let constraint = CompiledConstraint::Registered(RegisteredConstraint {
            registered_name: "uniqueness".to_owned(),
        });
        assert_eq!(constraint.evaluate("anything"), None);
        assert_eq!(constraint.kind_label(), "registered");
    }

    #[test]
    fn test_compile_helpers_reject_invalid() {
        let empty = ListOfValuesDecl {
            values: vec![],
            case_sensitive: true,
            sorted: false,
            label_key: None,
        };
        assert!(compile_list_of_values(&empty).is_err());

        let inverted = StringLengthDecl {
            min_length: 5,
            max_length: 2,
        };
        assert!(compile_string_length(&inverted).is_err());

        let bad = RegexDecl {
            expression: "[bad".to_owned(),
            requires_match: true,
        };
        assert!(compile_regex(&bad).is_err());
    }
}
