//! Model document parsing for the cm-dictionary engine.
//!
//! Model documents are JSON; this crate deserializes them into the raw
//! [`ModelSchema`] declaration graph and applies the structural validation
//! that can be decided without cross-model knowledge (name well-formedness,
//! per-kind local-name uniqueness). Everything requiring prefix resolution
//! or other models (imports, inheritance, data types, constraints) is
//! checked later by `cm-compiler`.
//!
//! # Examples
//!
//! ```
//! use cm_parser::parse_model;
//!
//! let model = parse_model(
//!     r#"{
//!         "name": "ex:example",
//!         "namespaces": [{"uri": "http://ns.example.org/model/1.0", "prefix": "ex"}],
//!         "imports": [{"uri": "urn:cm:datatype/1.0", "prefix": "d"}],
//!         "types": [{
//!             "name": "ex:document",
//!             "properties": [{"name": "ex:title", "type": "d:text"}]
//!         }]
//!     }"#,
//! )?;
//!
//! assert_eq!(model.name, "ex:example");
//! assert_eq!(model.types.len(), 1);
//! # Ok::<(), cm_parser::ParseError>(())
//! ```

mod error;
mod validate;

pub use error::ParseError;
pub use validate::validate_schema;

use cm_core::{MessageBundle, ModelSchema};
use tracing::debug;

/// Parses and validates a JSON model document.
///
/// # Errors
///
/// Returns [`ParseError::Malformed`] for documents that are not valid JSON
/// or do not match the schema, and the structural errors documented on
/// [`validate_schema`].
pub fn parse_model(source: &str) -> Result<ModelSchema, ParseError> {
    let schema: ModelSchema = serde_json::from_str(source)?;
    validate_schema(&schema)?;
    debug!(
        model = %schema.name,
        types = schema.types.len(),
        aspects = schema.aspects.len(),
        "Parsed model document"
    );
    Ok(schema)
}

/// Parses a JSON label bundle (a flat object of string labels).
///
/// # Errors
///
/// Returns [`ParseError::Malformed`] if the document is not a JSON object
/// of strings.
pub fn parse_bundle(source: &str) -> Result<MessageBundle, ParseError> {
    let bundle: MessageBundle = serde_json::from_str(source)?;
    debug!(labels = bundle.len(), "Parsed label bundle");
    Ok(bundle)
}
