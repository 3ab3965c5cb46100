//! Label bundles for localised display text.
//!
//! Models carry machine-facing identifiers; human-facing titles,
//! descriptions, and list-of-values display labels resolve through a
//! [`MessageRegistry`] populated from label bundles at bootstrap time.
//!
//! Lookup is total and non-throwing: an unknown key yields `None` so
//! callers can fall back to the declared text (or to the raw value, for
//! list-of-values labels).

use serde::{Deserialize, Serialize};

use crate::collections::FxHashMap;

/// A single label bundle: a flat key-to-text mapping.
///
/// Bundles are deserialized from JSON objects of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageBundle {
    entries: FxHashMap<String, String>,
}

impl MessageBundle {
    /// Creates an empty bundle.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a label, replacing any previous text for the key.
    pub fn insert(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.entries.insert(key.into(), text.into());
    }

    /// Returns the number of labels in the bundle.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the bundle has no labels.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for MessageBundle {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// The merged view over all registered label bundles.
///
/// Bundles registered later override earlier ones key-by-key.
///
/// # Examples
///
/// ```
/// use cm_core::{MessageBundle, MessageRegistry};
///
/// let mut bundle = MessageBundle::new();
/// bundle.insert("ex_list1.ABC", "ABC display");
///
/// let mut registry = MessageRegistry::new();
/// registry.add_bundle(bundle);
///
/// assert_eq!(registry.lookup("ex_list1.ABC"), Some("ABC display"));
/// assert_eq!(registry.lookup("ex_list1.nosuch"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MessageRegistry {
    entries: FxHashMap<String, String>,
}

impl MessageRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a bundle into the registry. Later bundles win on key clashes.
    pub fn add_bundle(&mut self, bundle: MessageBundle) {
        self.entries.extend(bundle.entries);
    }

    /// Looks up the text for a key, or `None` if absent.
    #[inline]
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns the total number of registered labels.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no labels are registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
