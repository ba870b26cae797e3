//! Schema emitters over the TypeInfo kind hierarchy.
//!
//! Each converter renders a single item with a [`TypeVisitor`] and then hands
//! the fragment to its `collectionize` step whenever the arity is anything
//! other than exactly one.
//!
//! [`TypeVisitor`]: crate::type_info::TypeVisitor

mod dsl;
mod json_schema;
mod xml_schema;

use crate::arity::Arity;
use crate::error::SchemaError;
use crate::type_info::TypeInfo;

pub use dsl::DslConverter;
pub use json_schema::JsonSchemaConverter;
pub use xml_schema::XmlSchemaConverter;

/// Renders TypeInfo as an external schema fragment.
pub trait Converter {
    type Output;

    /// Fragment for one item, ignoring the arity.
    fn convert_item(&self, ti: &TypeInfo) -> Result<Self::Output, SchemaError>;

    /// Wrap an item fragment for a non-single arity.
    fn collectionize(&self, item: Self::Output, arity: &Arity) -> Self::Output;

    /// Fragment for `ti`, arity included.
    fn convert(&self, ti: &TypeInfo) -> Result<Self::Output, SchemaError> {
        let item = self.convert_item(ti)?;
        if ti.arity().is_single() {
            Ok(item)
        } else {
            Ok(self.collectionize(item, ti.arity()))
        }
    }
}

/// Output formats of the `convert` CLI command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    JsonSchema,
    XmlSchema,
    Dsl,
}

impl Format {
    /// Convert with the matching converter; JSON Schema is pretty-printed.
    pub fn render(self, ti: &TypeInfo) -> Result<String, SchemaError> {
        match self {
            Format::JsonSchema => {
                let schema = JsonSchemaConverter.convert(ti)?;
                serde_json::to_string_pretty(&schema)
                    .map_err(|source| SchemaError::InvalidJson { source })
            }
            Format::XmlSchema => XmlSchemaConverter.convert(ti),
            Format::Dsl => DslConverter.convert(ti),
        }
    }
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" | "json-schema" => Ok(Format::JsonSchema),
            "xml" | "xsd" | "xml-schema" => Ok(Format::XmlSchema),
            "dsl" => Ok(Format::Dsl),
            other => Err(format!(
                "unknown format \"{}\" (expected json, xml or dsl)",
                other
            )),
        }
    }
}
