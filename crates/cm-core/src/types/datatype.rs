//! Data-type declarations and value codecs.
//!
//! Data types resolve through a closed, explicitly-registered capability
//! registry (see `cm-compiler`): each type maps to a [`ValueCodec`]
//! describing how value literals are interpreted, plus optional
//! locale-analyser bundle identifiers. There is no dynamic class loading;
//! a model may declare additional data types, but only with capabilities
//! expressible in this closed set.

use serde::{Deserialize, Serialize};

/// How values of a data type are encoded and interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ValueCodec {
    /// Plain text.
    #[default]
    Text,
    /// Localisable text.
    MlText,
    /// 32-bit integer.
    Int,
    /// 64-bit integer.
    Long,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// Boolean.
    Boolean,
    /// Calendar date.
    Date,
    /// Date and time.
    DateTime,
    /// Opaque, uninterpreted value.
    Any,
}

impl ValueCodec {
    /// Returns `true` for the numeric codecs.
    #[inline]
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Long | Self::Float | Self::Double)
    }

    /// Returns `true` for the textual codecs.
    #[inline]
    #[must_use]
    pub const fn is_textual(self) -> bool {
        matches!(self, Self::Text | Self::MlText)
    }

    /// Returns a short label for diagnostics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::MlText => "mltext",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Any => "any",
        }
    }
}

/// A data-type declaration: name plus capability descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataTypeDecl {
    /// The data-type name as a prefixed string.
    pub name: String,

    /// Display title.
    pub title: Option<String>,

    /// Display description.
    pub description: Option<String>,

    /// The value codec.
    pub codec: ValueCodec,

    /// Type-level locale-analyser bundle identifier.
    pub analyser_bundle: Option<String>,

    /// Default analyser identifier used when no bundle resolves one.
    pub default_analyser: Option<String>,
}

impl DataTypeDecl {
    /// Creates a data-type declaration.
    #[must_use]
    pub fn new(name: impl Into<String>, codec: ValueCodec) -> Self {
        Self {
            name: name.into(),
            codec,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_codec_predicates() {
        assert!(ValueCodec::Int.is_numeric());
        assert!(ValueCodec::Double.is_numeric());
        assert!(!ValueCodec::Text.is_numeric());
        assert!(ValueCodec::Text.is_textual());
        assert!(ValueCodec::MlText.is_textual());
        assert!(!ValueCodec::Boolean.is_textual());
    }

    #[test]
    fn test_value_codec_serialization() {
        assert_eq!(
            serde_json::to_string(&ValueCodec::DateTime).unwrap(),
            r#""date_time""#
        );
        assert_eq!(ValueCodec::DateTime.label(), "datetime");
    }

    #[test]
    fn test_data_type_decl_new() {
        let decl = DataTypeDecl::new("ex:custom", ValueCodec::Text);
        assert_eq!(decl.name, "ex:custom");
        assert_eq!(decl.codec, ValueCodec::Text);
        assert!(decl.analyser_bundle.is_none());
    }
}
