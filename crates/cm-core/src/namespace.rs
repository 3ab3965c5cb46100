//! Namespace prefix registration and resolution.
//!
//! This module provides [`NamespaceRegistry`], the dictionary-wide mapping
//! between namespace prefixes and URIs, and the [`PrefixResolver`] trait
//! implemented both by the registry and by model-local prefix environments
//! during compilation.
//!
//! Prefix uniqueness is enforced dictionary-wide: once a prefix is bound to
//! a URI, any attempt to bind the same prefix to a *different* URI fails
//! with [`NamespaceError::PrefixClash`]. Re-registering the identical
//! (URI, prefix) pair is idempotent.

use serde::{Deserialize, Serialize};

use crate::collections::FxHashMap;

/// Errors raised during namespace registration and name resolution.
///
/// Every variant carries a stable message identifier (see
/// [`message_id`](NamespaceError::message_id)) so callers and tests can
/// assert on the failure class rather than on free text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamespaceError {
    /// A prefix is already bound to a different namespace URI.
    #[error("namespace prefix '{prefix}' is already registered to '{existing_uri}' (attempted rebind to '{new_uri}')")]
    PrefixClash {
        /// The clashing prefix.
        prefix: String,
        /// The URI the prefix is already bound to.
        existing_uri: String,
        /// The URI the caller attempted to bind.
        new_uri: String,
    },

    /// A prefixed name used a prefix that is not registered.
    #[error("namespace prefix '{prefix}' is not registered")]
    UnknownPrefix {
        /// The unknown prefix.
        prefix: String,
    },

    /// No prefix is registered for a namespace URI.
    #[error("no prefix registered for namespace URI '{uri}'")]
    UnknownUri {
        /// The unknown URI.
        uri: String,
    },

    /// A prefixed name string is structurally invalid.
    #[error("malformed qualified name '{name}'")]
    MalformedName {
        /// The malformed input.
        name: String,
    },
}

impl NamespaceError {
    /// Returns the stable, machine-checkable identifier for this error.
    #[must_use]
    pub const fn message_id(&self) -> &'static str {
        match self {
            Self::PrefixClash { .. } => "dictionary.namespace.prefix_clash",
            Self::UnknownPrefix { .. } => "dictionary.namespace.unknown_prefix",
            Self::UnknownUri { .. } => "dictionary.namespace.unknown_uri",
            Self::MalformedName { .. } => "dictionary.namespace.malformed_name",
        }
    }
}

/// Resolves namespace prefixes to URIs and back.
///
/// Implemented by [`NamespaceRegistry`] for dictionary-wide resolution and
/// by the compiler's model-local prefix environment.
pub trait PrefixResolver {
    /// Returns the URI bound to `prefix`, if any.
    fn uri_for_prefix(&self, prefix: &str) -> Option<&str>;

    /// Returns a prefix bound to `uri`, if any.
    ///
    /// When several prefixes map to the same URI, the first registered
    /// prefix is returned.
    fn prefix_for_uri(&self, uri: &str) -> Option<&str>;
}

/// Dictionary-wide namespace prefix registry.
///
/// # Examples
///
/// ```
/// use cm_core::NamespaceRegistry;
///
/// let mut registry = NamespaceRegistry::new();
/// registry.register("http://ns.example.org/model/1.0", "ex")?;
///
/// // Re-registering the identical pair is idempotent.
/// registry.register("http://ns.example.org/model/1.0", "ex")?;
///
/// // Binding the prefix to a different URI is a clash.
/// let err = registry
///     .register("http://ns.example.org/other/1.0", "ex")
///     .unwrap_err();
/// assert_eq!(err.message_id(), "dictionary.namespace.prefix_clash");
/// # Ok::<(), cm_core::NamespaceError>(())
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamespaceRegistry {
    /// prefix -> URI. The authoritative binding.
    prefixes: FxHashMap<String, String>,

    /// URI -> prefixes in registration order.
    uris: FxHashMap<String, Vec<String>>,
}

impl NamespaceRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a (URI, prefix) binding.
    ///
    /// # Errors
    ///
    /// Returns [`NamespaceError::PrefixClash`] if `prefix` is already bound
    /// to a different URI. Registering the identical pair again succeeds
    /// without effect.
    pub fn register(
        &mut self,
        uri: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Result<(), NamespaceError> {
        let uri = uri.into();
        let prefix = prefix.into();

        if let Some(existing) = self.prefixes.get(&prefix) {
            if *existing == uri {
                return Ok(());
            }
            return Err(NamespaceError::PrefixClash {
                prefix,
                existing_uri: existing.clone(),
                new_uri: uri,
            });
        }

        self.uris.entry(uri.clone()).or_default().push(prefix.clone());
        self.prefixes.insert(prefix, uri);
        Ok(())
    }

    /// Removes a prefix binding, if present.
    pub fn unregister_prefix(&mut self, prefix: &str) {
        if let Some(uri) = self.prefixes.remove(prefix) {
            if let Some(prefixes) = self.uris.get_mut(&uri) {
                prefixes.retain(|p| p != prefix);
                if prefixes.is_empty() {
                    self.uris.remove(&uri);
                }
            }
        }
    }

    /// Returns `true` if the prefix is registered.
    #[inline]
    #[must_use]
    pub fn contains_prefix(&self, prefix: &str) -> bool {
        self.prefixes.contains_key(prefix)
    }

    /// Returns `true` if any prefix is registered for the URI.
    #[inline]
    #[must_use]
    pub fn contains_uri(&self, uri: &str) -> bool {
        self.uris.contains_key(uri)
    }

    /// Returns an iterator over all registered (prefix, URI) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    /// Returns the number of registered prefixes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    /// Returns `true` if no prefixes are registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

impl PrefixResolver for NamespaceRegistry {
    fn uri_for_prefix(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }

    fn prefix_for_uri(&self, uri: &str) -> Option<&str> {
        self.uris
            .get(uri)
            .and_then(|prefixes| prefixes.first())
            .map(String::as_str)
    }
}
