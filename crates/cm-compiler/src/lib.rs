//! Model compilation for the cm-dictionary engine.
//!
//! This crate is the schema compiler at the heart of the dictionary: it
//! resolves inheritance chains for types and aspects, merges and overrides
//! properties and constraints along the chain, resolves cross-model
//! references through imports, detects cyclic inheritance, and produces an
//! immutable [`CompiledModel`] per source model plus the merged cross-model
//! [`CompiledDictionary`].
//!
//! # Overview
//!
//! - [`ModelCompiler`]: `compile(RawModel, CrossModelLookup) -> CompiledModel`
//! - [`CompiledDictionary`]: qualified-name-indexed union of compiled
//!   models, with subtype queries
//! - Constraint resolution: named and inline constraints, accumulated in
//!   declaration order along the inheritance chain
//! - Data types: a closed capability registry seeded with the built-in
//!   core model (`d:text`, `d:int`, ...)
//!
//! # Example
//!
//! ```
//! use cm_compiler::{CompiledDictionary, ModelCompiler};
//! use cm_core::{ClassDecl, ModelSchema, PropertyDecl, QName};
//!
//! let mut schema = ModelSchema::new("ex:example");
//! schema.add_namespace("http://ns.example.org/model/1.0", "ex");
//! schema.add_import("urn:cm:datatype/1.0", "d");
//! let mut base = ClassDecl::new("ex:base");
//! base.properties.push(PropertyDecl::new("ex:name", "d:text"));
//! schema.types.push(base);
//! schema
//!     .types
//!     .push(ClassDecl::new("ex:document").with_parent("ex:base"));
//!
//! let mut dictionary = CompiledDictionary::new();
//! let compiled = ModelCompiler::new(&dictionary).compile(&schema)?;
//! dictionary.insert_model(compiled)?;
//!
//! let ns = "http://ns.example.org/model/1.0";
//! assert!(dictionary.is_subclass(&QName::new(ns, "document"), &QName::new(ns, "base")));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod compiled;
mod compiler;
mod constraint;
mod datatype;
mod dictionary;
mod error;
mod graph;

pub use compiled::{
    AssociationDefinition, ClassDefinition, ClassKind, CompiledModel, DataTypeDefinition,
    ModelInfo, PropertyDefinition,
};
pub use compiler::{ModelCompiler, resolve_model_name};
pub use constraint::{
    CompiledConstraint, ConstraintDefinition, ListOfValuesConstraint, RegexConstraint,
    RegisteredConstraint, StringLengthConstraint,
};
pub use datatype::{
    AnalyserError, CORE_DATATYPE_PREFIX, CORE_DATATYPE_URI, core_model, resolve_analyser,
};
pub use dictionary::{CompiledDictionary, ModelLookup};
pub use error::CompileError;
