//! Declaration Schema
//!
//! Declaration resolution, typed validation and schema emission for schema
//! definition sources.
//!
//! A parser front end drives a [`DocumentBuilder`] with visit callbacks; the
//! resolver turns the resulting declaration tree (plus any included documents)
//! into a committed [`Document`] whose declarations are classified and keyed.
//! Declarations lower to [`TypeInfo`], which validates values, converts them
//! to and from canonical strings, and emits JSON Schema, XML Schema or the
//! source notation.
//!
//! # Example
//!
//! ```
//! use decl_schema::{resolve_str, Converter, DslConverter, JsonFrontEnd, ResolveOptions, Value};
//!
//! let source = r#"{
//!     "declarations": [
//!         {"name": "Percent", "type": "int", "metadata": {"min": 0, "max": 100}},
//!         {"object": "Progress", "members": [
//!             {"name": "done", "type": "Percent"},
//!             {"name": "notes", "type": "string", "arity": "*"}
//!         ]}
//!     ]
//! }"#;
//!
//! let doc = resolve_str("progress.json", source, &JsonFrontEnd, &ResolveOptions::new()).unwrap();
//! let percent = doc.type_info_for("Percent").unwrap();
//!
//! assert!(percent.validate(&Value::Int(42)).is_ok());
//! assert!(percent.validate(&Value::Int(142)).is_err());
//! assert_eq!(DslConverter.convert(&percent).unwrap(), "<int min=0 max=100>");
//! ```
//!
//! # Subtypes
//!
//! | Subtype | Declared as | Lowers to |
//! |---------|-------------|-----------|
//! | Compound | object without a fundamental base | class of its members |
//! | Simple | object over a fundamental value | class of attributes plus the value |
//! | Fundamental | declaration naming a fundamental kind | that kind, constrained by metadata |
//! | Alias | declaration naming a type with only `description`/`plural` | the named type |
//! | Augmented | declaration naming a type with other tags or an arity | the named type, constrained |
//! | Extension / Config | extension invocation / config entry | - / its value type |
//!
//! # Arity Shorthand
//!
//! `?` optional, `*` zero or more, `+` one or more, `{n}` exactly n, `{n,m}`
//! between n and m.

mod arity;
mod converter;
mod declaration;
mod error;
mod linter;
mod loader;
mod metadata;
mod resolver;
mod serialization;
mod type_info;
mod types;
mod validator;

pub use arity::Arity;
pub use converter::{Converter, DslConverter, Format, JsonSchemaConverter, XmlSchemaConverter};
pub use declaration::{
    DeclId, Declaration, DeclarationGraph, DeclarationKind, Document, DocumentBuilder,
    ExtensionCall, FrontEnd, IncludeRequest, JsonFrontEnd, Production, Reference, SourceDocument,
    Subtype, Target, Walk,
};
pub use error::{PayloadError, SchemaError, ValidateError, ValidationError};
pub use linter::{
    lint, lint_document, lint_file, Diagnostic, FileResult, FileStatus, LintResult, Severity,
};
pub use loader::{
    include_path, lexical_normalize, load_descriptor, load_descriptor_str, load_document,
    load_type_info, normalize_path, read_source, FileSystem, MemorySources, SourceProvider,
};
pub use metadata::{
    MetadataDefault, MetadataItem, MetadataMap, MetadataScope, MetadataSpec, MetadataType,
    MetadataValue, CATALOG,
};
pub use resolver::{classify, resolve, resolve_str};
pub use serialization::{deserialize, regex_alternatives, serialize, RegexAlternative};
pub use type_info::{
    AnyOfKind, ClassKind, DirectoryKind, EnumKind, FilenameKind, FloatKind, FundamentalKind,
    IntKind, Member, Pattern, StringKind, TypeDescriptor, TypeInfo, TypeKind, TypeVisitor,
    ValidationHook,
};
pub use types::{value_type_name, FeatureFlags, ResolveOptions, SourceLocation, Value};
pub use validator::{validate_against_schema, validate_json};
