//! Core types, errors, and utilities for the cm-dictionary engine.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - [`QName`] - qualified names (namespace URI + local name)
//! - [`NamespaceRegistry`] - prefix/URI registration and resolution
//! - Raw model declaration types ([`ModelSchema`], [`ClassDecl`], ...)
//! - [`Tenant`] - tenant identifiers for the compiled-model cache
//! - [`MessageRegistry`] - label bundles for localised display text
//! - Type aliases for `FxHashMap`/`FxHashSet` (faster than std)

pub mod collections;
pub mod messages;
pub mod namespace;
pub mod qname;
pub mod tenant;
pub mod types;

pub use collections::{FxBuildHasher, FxHashMap, FxHashSet, fx_hash_map_with_capacity};
pub use messages::{MessageBundle, MessageRegistry};
pub use namespace::{NamespaceError, NamespaceRegistry, PrefixResolver};
pub use qname::QName;
pub use tenant::Tenant;
pub use types::{
    AssociationDecl, AssociationKind, ClassDecl, ConstraintBody, ConstraintDecl, ConstraintRef,
    DataTypeDecl, IndexMode, ListOfValuesDecl, ModelSchema, NamespaceDecl, PropertyDecl,
    RegexDecl, RegisteredDecl, StringLengthDecl, ValueCodec,
};
