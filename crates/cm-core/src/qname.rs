//! Qualified names.
//!
//! A [`QName`] is a (namespace URI, local name) pair. Model documents refer
//! to definitions by prefixed strings such as `ex:document`; the prefix is
//! resolved to a URI through a [`PrefixResolver`](crate::PrefixResolver)
//! (either the dictionary-wide [`NamespaceRegistry`](crate::NamespaceRegistry)
//! or a model-local prefix environment during compilation).
//!
//! # Examples
//!
//! ```
//! use cm_core::{NamespaceRegistry, QName};
//!
//! let mut registry = NamespaceRegistry::new();
//! registry.register("http://ns.example.org/model/1.0", "ex")?;
//!
//! let name = QName::resolve("ex:document", &registry)?;
//! assert_eq!(name.namespace_uri(), "http://ns.example.org/model/1.0");
//! assert_eq!(name.local_name(), "document");
//!
//! // Resolution and formatting are inverse for registered names.
//! assert_eq!(name.to_prefixed(&registry)?, "ex:document");
//! # Ok::<(), cm_core::NamespaceError>(())
//! ```

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::namespace::{NamespaceError, PrefixResolver};

/// A fully qualified name: namespace URI plus local name.
///
/// `QName` is the key type for every dictionary lookup. Two names are equal
/// iff both the URI and the local name are equal; prefixes are a purely
/// textual abbreviation and never part of identity.
///
/// Serializes as the expanded string form `{uri}local`, so qualified names
/// can key JSON maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    namespace_uri: String,
    local_name: String,
}

impl Serialize for QName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for QName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let expanded = String::deserialize(deserializer)?;
        let rest = expanded
            .strip_prefix('{')
            .ok_or_else(|| D::Error::custom("expected expanded qualified name '{uri}local'"))?;
        let (uri, local) = rest
            .split_once('}')
            .ok_or_else(|| D::Error::custom("expected expanded qualified name '{uri}local'"))?;
        if local.is_empty() {
            return Err(D::Error::custom("qualified name has an empty local part"));
        }
        Ok(Self::new(uri, local))
    }
}

impl QName {
    /// Creates a qualified name from a namespace URI and a local name.
    ///
    /// # Examples
    ///
    /// ```
    /// use cm_core::QName;
    ///
    /// let name = QName::new("http://ns.example.org/model/1.0", "document");
    /// assert_eq!(name.local_name(), "document");
    /// ```
    #[inline]
    #[must_use]
    pub fn new(namespace_uri: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace_uri: namespace_uri.into(),
            local_name: local_name.into(),
        }
    }

    /// Resolves a prefixed string (`prefix:local`) into a qualified name.
    ///
    /// A string without a colon resolves against the default (empty) prefix.
    ///
    /// # Errors
    ///
    /// Returns [`NamespaceError::MalformedName`] if the local part is empty,
    /// and [`NamespaceError::UnknownPrefix`] if the prefix is not registered
    /// with the resolver.
    pub fn resolve(prefixed: &str, resolver: &impl PrefixResolver) -> Result<Self, NamespaceError> {
        let (prefix, local) = match prefixed.split_once(':') {
            Some((prefix, local)) => (prefix, local),
            None => ("", prefixed),
        };

        if local.is_empty() {
            return Err(NamespaceError::MalformedName {
                name: prefixed.to_owned(),
            });
        }

        let uri = resolver
            .uri_for_prefix(prefix)
            .ok_or_else(|| NamespaceError::UnknownPrefix {
                prefix: prefix.to_owned(),
            })?;

        Ok(Self::new(uri, local))
    }

    /// Returns the namespace URI.
    #[inline]
    #[must_use]
    pub fn namespace_uri(&self) -> &str {
        &self.namespace_uri
    }

    /// Returns the local name.
    #[inline]
    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Formats this name as `prefix:local` using the resolver's prefix
    /// for the namespace URI.
    ///
    /// This is the inverse of [`QName::resolve`] for any name whose
    /// namespace was validly registered.
    ///
    /// # Errors
    ///
    /// Returns [`NamespaceError::UnknownUri`] if no prefix is registered
    /// for the namespace URI.
    pub fn to_prefixed(&self, resolver: &impl PrefixResolver) -> Result<String, NamespaceError> {
        let prefix =
            resolver
                .prefix_for_uri(&self.namespace_uri)
                .ok_or_else(|| NamespaceError::UnknownUri {
                    uri: self.namespace_uri.clone(),
                })?;

        if prefix.is_empty() {
            Ok(self.local_name.clone())
        } else {
            Ok(format!("{prefix}:{}", self.local_name))
        }
    }
}

impl fmt::Display for QName {
    /// Formats as the expanded form `{uri}local`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}{}", self.namespace_uri, self.local_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::NamespaceRegistry;

    const EX_URI: &str = "http://ns.example.org/model/1.0";

    fn registry() -> NamespaceRegistry {
        let mut registry = NamespaceRegistry::new();
        registry.register(EX_URI, "ex").unwrap();
        registry
    }

    #[test]
    fn test_qname_new() {
        let name = QName::new(EX_URI, "document");
        assert_eq!(name.namespace_uri(), EX_URI);
        assert_eq!(name.local_name(), "document");
    }

    #[test]
    fn test_qname_display_expanded_form() {
        let name = QName::new(EX_URI, "document");
        assert_eq!(name.to_string(), format!("{{{EX_URI}}}document"));
    }

    #[test]
    fn test_qname_resolve_prefixed() {
        let name = QName::resolve("ex:document", &registry()).unwrap();
        assert_eq!(name, QName::new(EX_URI, "document"));
    }

    #[test]
    fn test_qname_resolve_unknown_prefix() {
        let err = QName::resolve("zz:document", &registry()).unwrap_err();
        assert!(matches!(err, NamespaceError::UnknownPrefix { .. }));
        assert_eq!(err.message_id(), "dictionary.namespace.unknown_prefix");
    }

    #[test]
    fn test_qname_resolve_malformed() {
        let err = QName::resolve("ex:", &registry()).unwrap_err();
        assert!(matches!(err, NamespaceError::MalformedName { .. }));
        assert_eq!(err.message_id(), "dictionary.namespace.malformed_name");
    }

    #[test]
    fn test_qname_resolve_default_prefix() {
        let mut registry = NamespaceRegistry::new();
        registry.register(EX_URI, "").unwrap();
        let name = QName::resolve("document", &registry).unwrap();
        assert_eq!(name, QName::new(EX_URI, "document"));
        assert_eq!(name.to_prefixed(&registry).unwrap(), "document");
    }

    #[test]
    fn test_qname_round_trip() {
        let registry = registry();
        let name = QName::resolve("ex:document", &registry).unwrap();
        assert_eq!(name.to_prefixed(&registry).unwrap(), "ex:document");
    }

    #[test]
    fn test_qname_to_prefixed_unknown_uri() {
        let name = QName::new("http://ns.example.org/other/1.0", "document");
        let err = name.to_prefixed(&registry()).unwrap_err();
        assert!(matches!(err, NamespaceError::UnknownUri { .. }));
    }

    #[test]
    fn test_qname_equality_ignores_prefix_origin() {
        let mut other = NamespaceRegistry::new();
        other.register(EX_URI, "example").unwrap();

        let a = QName::resolve("ex:document", &registry()).unwrap();
        let b = QName::resolve("example:document", &other).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_qname_serde_round_trip() {
        let name = QName::new(EX_URI, "document");
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, format!("\"{{{EX_URI}}}document\""));
        let parsed: QName = serde_json::from_str(&json).unwrap();
        assert_eq!(name, parsed);
    }

    #[test]
    fn test_qname_serde_as_map_key() {
        use crate::FxHashMap;

        let mut map: FxHashMap<QName, u32> = FxHashMap::default();
        map.insert(QName::new(EX_URI, "document"), 1);
        let json = serde_json::to_string(&map).unwrap();
        assert!(json.contains("document"));

        let parsed: FxHashMap<QName, u32> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.get(&QName::new(EX_URI, "document")), Some(&1));
    }

    #[test]
    fn test_qname_deserialize_rejects_bare_string() {
        assert!(serde_json::from_str::<QName>("\"document\"").is_err());
    }
}
