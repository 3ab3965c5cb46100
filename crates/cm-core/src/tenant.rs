//! Tenant identifiers.
//!
//! The compiled-model cache is partitioned by tenant. Single-tenant
//! deployments use [`Tenant::default()`], which is the empty identifier.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a tenant partition of the dictionary.
///
/// # Examples
///
/// ```
/// use cm_core::Tenant;
///
/// let default = Tenant::default();
/// assert!(default.is_default());
///
/// let acme = Tenant::new("acme");
/// assert_eq!(acme.as_str(), "acme");
/// assert!(!acme.is_default());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tenant(String);

impl Tenant {
    /// Creates a new tenant identifier.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this is the default (single-tenant) identifier.
    #[inline]
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<default>")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl From<&str> for Tenant {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_default_is_empty() {
        assert!(Tenant::default().is_default());
        assert_eq!(Tenant::default().as_str(), "");
    }

    #[test]
    fn test_tenant_display() {
        assert_eq!(Tenant::default().to_string(), "<default>");
        assert_eq!(Tenant::new("acme").to_string(), "acme");
    }

    #[test]
    fn test_tenant_equality() {
        assert_eq!(Tenant::new("a"), Tenant::from("a"));
        assert_ne!(Tenant::new("a"), Tenant::new("b"));
    }
}
