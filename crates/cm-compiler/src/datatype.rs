//! The built-in data-type model and analyser resolution.
//!
//! Data types resolve through a closed, explicitly-registered capability
//! registry: the core model below pre-registers the built-in types, and
//! compiled models may add their own. There is no dynamic class loading;
//! a locale analyser is identified by a plain bundle identifier resolved
//! through a fixed fallback chain.

use cm_core::{FxHashMap, NamespaceDecl, QName, ValueCodec};

use crate::compiled::{CompiledModel, DataTypeDefinition, ModelInfo};
use crate::dictionary::CompiledDictionary;

/// Namespace URI of the built-in data types.
pub const CORE_DATATYPE_URI: &str = "urn:cm:datatype/1.0";

/// Canonical prefix for the built-in data-type namespace.
///
/// Models that use the built-in types still import the namespace
/// explicitly; this is merely the conventional prefix.
pub const CORE_DATATYPE_PREFIX: &str = "d";

/// The built-in data types: (local name, codec).
const CORE_DATA_TYPES: &[(&str, ValueCodec)] = &[
    ("text", ValueCodec::Text),
    ("mltext", ValueCodec::MlText),
    ("int", ValueCodec::Int),
    ("long", ValueCodec::Long),
    ("float", ValueCodec::Float),
    ("double", ValueCodec::Double),
    ("boolean", ValueCodec::Boolean),
    ("date", ValueCodec::Date),
    ("datetime", ValueCodec::DateTime),
    ("any", ValueCodec::Any),
];

/// Builds the core model carrying the built-in data types.
///
/// [`CompiledDictionary::new`] registers this model automatically, so
/// every dictionary can resolve `d:text` and friends out of the box.
#[must_use]
pub fn core_model() -> CompiledModel {
    let model_name = QName::new(CORE_DATATYPE_URI, "dictionary");

    let mut data_types: FxHashMap<QName, DataTypeDefinition> = FxHashMap::default();
    for (local, codec) in CORE_DATA_TYPES {
        let name = QName::new(CORE_DATATYPE_URI, *local);
        data_types.insert(
            name.clone(),
            DataTypeDefinition {
                name,
                model: model_name.clone(),
                title: None,
                description: None,
                codec: *codec,
                analyser_bundle: None,
                default_analyser: None,
            },
        );
    }

    CompiledModel {
        info: ModelInfo {
            name: model_name,
            prefixed_name: format!("{CORE_DATATYPE_PREFIX}:dictionary"),
            description: Some("Built-in data types".to_owned()),
            author: None,
            version: None,
            analyser_bundle: None,
            namespaces: vec![NamespaceDecl::new(CORE_DATATYPE_URI, CORE_DATATYPE_PREFIX)],
            imports: vec![],
        },
        classes: FxHashMap::default(),
        properties: FxHashMap::default(),
        associations: FxHashMap::default(),
        constraints: FxHashMap::default(),
        data_types,
    }
}

/// Error raised when no analyser bundle resolves for a property.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalyserError {
    /// The fallback chain was exhausted without finding a bundle.
    #[error("no analyser bundle resolves for property '{property}'")]
    NotFound {
        /// The property whose analyser was requested.
        property: String,
    },
}

impl AnalyserError {
    /// Returns the stable, machine-checkable identifier for this error.
    #[must_use]
    pub const fn message_id(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "dictionary.datatype.analyser_not_found",
        }
    }
}

/// Resolves the locale-analyser bundle identifier for a property.
///
/// Fallback order: property-level bundle, then the container class chain
/// (nearest class first), then the property's model, then the data type's
/// bundle and default analyser, then the process-wide default. Exhausting
/// the chain is a typed failure, not a silent fallback.
pub fn resolve_analyser(
    dictionary: &CompiledDictionary,
    property: &QName,
    default_bundle: Option<&str>,
) -> Result<String, AnalyserError> {
    let not_found = || AnalyserError::NotFound {
        property: property.to_string(),
    };

    let prop = dictionary.property(property).ok_or_else(not_found)?;

    if let Some(bundle) = &prop.analyser_bundle {
        return Ok(bundle.clone());
    }

    // Walk the container class chain, nearest first.
    let mut current = dictionary.class(&prop.container);
    while let Some(class) = current {
        if let Some(bundle) = class.analyser_bundle() {
            return Ok(bundle.to_owned());
        }
        current = class.parent().and_then(|p| dictionary.class(p));
    }

    if let Some(bundle) = dictionary
        .model(&prop.model)
        .and_then(|m| m.info().analyser_bundle.clone())
    {
        return Ok(bundle);
    }

    if let Some(data_type) = dictionary.data_type(&prop.data_type) {
        if let Some(bundle) = &data_type.analyser_bundle {
            return Ok(bundle.clone());
        }
        if let Some(analyser) = &data_type.default_analyser {
            return Ok(analyser.clone());
        }
    }

    default_bundle.map(str::to_owned).ok_or_else(not_found)
}
