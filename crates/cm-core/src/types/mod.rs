//! Raw (author-facing) model declaration types.
//!
//! These are the mutable, pre-compilation declarations produced by the
//! parser and consumed by the compiler. Names inside declarations are
//! prefixed strings (`ex:document`); they become [`QName`](crate::QName)s
//! only during compilation, when the model's prefix environment is known.
//!
//! # Module Organization
//!
//! - [`model`] - the model schema root
//! - [`class`] - type and aspect declarations
//! - [`property`] - property declarations and indexing hints
//! - [`association`] - peer and child association declarations
//! - [`constraint`] - named and inline constraint declarations
//! - [`datatype`] - data-type declarations and value codecs

mod association;
mod class;
mod constraint;
mod datatype;
mod model;
mod property;

pub use association::{AssociationDecl, AssociationKind};
pub use class::ClassDecl;
pub use constraint::{
    ConstraintBody, ConstraintDecl, ConstraintRef, ListOfValuesDecl, RegexDecl, RegisteredDecl,
    StringLengthDecl,
};
pub use datatype::{DataTypeDecl, ValueCodec};
pub use model::{ModelSchema, NamespaceDecl};
pub use property::{IndexMode, PropertyDecl};
