//! Declaration documents written as JSON.
//!
//! ```json
//! {
//!   "include": ["common.json"],
//!   "declarations": [
//!     { "name": "Age", "type": "int", "metadata": { "min": 0 } },
//!     { "object": "Person", "members": [
//!       { "name": "name", "type": "string" },
//!       { "name": "age", "type": "Age", "arity": "?" },
//!       { "name": "id", "type": "guid", "kind": "attribute" }
//!     ] },
//!     { "config": "max_people", "type": "int" },
//!     { "extension": "Custom", "args": ["a"], "keywords": { "limit": 3 } }
//!   ]
//! }
//! ```

use std::fmt;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::value::RawValue;
use serde_json::Value;

use super::builder::{DocumentBuilder, FrontEnd};
use super::DeclarationKind;
use crate::error::SchemaError;
use crate::metadata::MetadataValue;
use crate::types::SourceLocation;

/// Front end for JSON declaration documents.
///
/// Entries are read as raw slices of the source so that every declaration,
/// tag and include carries the line and column where its JSON value starts.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFrontEnd;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JsonSource<'a> {
    #[serde(default, borrow)]
    include: Vec<&'a RawValue>,
    #[serde(default, borrow)]
    declarations: Vec<&'a RawValue>,
}

/// One declaration entry. Which of `object`, `extension`, `config` or `name`
/// is present decides the production.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Entry<'a> {
    object: Option<String>,
    base: Option<String>,
    extension: Option<String>,
    args: Vec<String>,
    keywords: Tags,
    config: Option<String>,
    name: Option<String>,
    #[serde(rename = "type")]
    reference: Option<String>,
    kind: Option<Kind>,
    arity: Option<String>,
    metadata: Tags,
    #[serde(borrow)]
    members: Vec<&'a RawValue>,
}

impl Entry<'_> {
    /// First field set on this entry that its production does not take.
    fn misplaced(&self, allowed: &[&str]) -> Option<&'static str> {
        [
            ("base", self.base.is_some()),
            ("args", !self.args.is_empty()),
            ("keywords", !self.keywords.0.is_empty()),
            ("type", self.reference.is_some()),
            ("kind", self.kind.is_some()),
            ("arity", self.arity.is_some()),
            ("metadata", !self.metadata.0.is_empty()),
            ("members", !self.members.is_empty()),
        ]
        .into_iter()
        .find(|(field, set)| *set && !allowed.contains(field))
        .map(|(field, _)| field)
    }
}

/// Tag/value pairs in document order. Repeated tags are kept so the builder
/// can reject them.
#[derive(Debug, Default)]
struct Tags(Vec<(String, Value)>);

impl<'de> Deserialize<'de> for Tags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TagsVisitor;

        impl<'de> Visitor<'de> for TagsVisitor {
            type Value = Tags;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("an object of metadata tags")
            }

            fn visit_map<M>(self, mut map: M) -> Result<Tags, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut pairs: Vec<(String, Value)> = Vec::new();
                while let Some(pair) = map.next_entry()? {
                    pairs.push(pair);
                }
                Ok(Tags(pairs))
            }
        }

        deserializer.deserialize_map(TagsVisitor)
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Kind {
    Standard,
    Attribute,
    Definition,
}

impl From<Option<Kind>> for DeclarationKind {
    fn from(kind: Option<Kind>) -> Self {
        match kind {
            None | Some(Kind::Standard) => DeclarationKind::Standard,
            Some(Kind::Attribute) => DeclarationKind::Attribute,
            Some(Kind::Definition) => DeclarationKind::Definition,
        }
    }
}

impl FrontEnd for JsonFrontEnd {
    fn parse(
        &self,
        source: &str,
        text: &str,
        builder: &mut DocumentBuilder<'_>,
    ) -> Result<(), SchemaError> {
        let doc: JsonSource<'_> =
            serde_json::from_str(text).map_err(|source| SchemaError::InvalidJson { source })?;
        let reader = Reader { source, text };

        for &raw in &doc.include {
            let path: String = reader.read(raw)?;
            builder.include(&path, reader.location(raw));
        }
        for &raw in &doc.declarations {
            reader.visit(raw, builder)?;
        }
        Ok(())
    }
}

/// Reads entries out of one source text.
struct Reader<'t> {
    source: &'t str,
    text: &'t str,
}

impl<'t> Reader<'t> {
    fn read<T: Deserialize<'t>>(&self, raw: &'t RawValue) -> Result<T, SchemaError> {
        serde_json::from_str(raw.get()).map_err(|source| SchemaError::InvalidJson { source })
    }

    /// Line and column (1-based, counted in characters) where `raw` starts.
    fn location(&self, raw: &RawValue) -> SourceLocation {
        let offset = (raw.get().as_ptr() as usize).checked_sub(self.text.as_ptr() as usize);
        let Some(before) = offset.and_then(|offset| self.text.get(..offset)) else {
            return SourceLocation::new(self.source, 0, 0);
        };
        let line = before.matches('\n').count() + 1;
        let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
        SourceLocation::new(
            self.source,
            u32::try_from(line).unwrap_or(u32::MAX),
            u32::try_from(column).unwrap_or(u32::MAX),
        )
    }

    fn visit(
        &self,
        raw: &'t RawValue,
        builder: &mut DocumentBuilder<'_>,
    ) -> Result<(), SchemaError> {
        let location = self.location(raw);
        let mut entry: Entry<'t> = self.read(raw)?;

        match (
            entry.object.take(),
            entry.extension.take(),
            entry.config.take(),
            entry.name.take(),
        ) {
            (Some(object), None, None, None) => {
                check_fields(
                    &entry,
                    "an object",
                    &["base", "kind", "arity", "metadata", "members"],
                    &location,
                )?;
                builder.begin_object(
                    &object,
                    entry.kind.into(),
                    entry.base.as_deref(),
                    location.clone(),
                )?;
                for &member in &entry.members {
                    self.visit(member, builder)?;
                }
                builder.end_object()?;
                apply_common(entry, &location, builder)
            }
            (None, Some(extension), None, None) => {
                check_fields(
                    &entry,
                    "an extension",
                    &["args", "keywords"],
                    &location,
                )?;
                builder.extension(&extension, location.clone())?;
                for arg in &entry.args {
                    builder.string_literal(arg)?;
                }
                for (name, value) in entry.keywords.0 {
                    let value = metadata_value(&name, value, &location)?;
                    builder.metadata(&name, value, location.clone())?;
                }
                Ok(())
            }
            (None, None, Some(config), None) => {
                check_fields(
                    &entry,
                    "a config entry",
                    &["type", "kind", "arity", "metadata"],
                    &location,
                )?;
                let reference = required_type(&entry, &location)?;
                builder.config(&config, &reference, location.clone())?;
                apply_common(entry, &location, builder)
            }
            (None, None, None, Some(name)) => {
                check_fields(
                    &entry,
                    "a declaration",
                    &["type", "kind", "arity", "metadata"],
                    &location,
                )?;
                let reference = required_type(&entry, &location)?;
                builder.declaration(&name, entry.kind.into(), &reference, location.clone())?;
                apply_common(entry, &location, builder)
            }
            _ => Err(SchemaError::unsupported(
                "an entry without exactly one of \"object\", \"extension\", \"config\" or \"name\"",
                &location,
            )),
        }
    }
}

fn check_fields(
    entry: &Entry<'_>,
    what: &str,
    allowed: &[&str],
    location: &SourceLocation,
) -> Result<(), SchemaError> {
    match entry.misplaced(allowed) {
        Some(field) => Err(SchemaError::unsupported(
            format!("\"{}\" on {}", field, what),
            location,
        )),
        None => Ok(()),
    }
}

fn required_type(entry: &Entry<'_>, location: &SourceLocation) -> Result<String, SchemaError> {
    entry
        .reference
        .clone()
        .ok_or_else(|| SchemaError::unsupported("an entry without a \"type\"", location))
}

fn apply_common(
    entry: Entry<'_>,
    location: &SourceLocation,
    builder: &mut DocumentBuilder<'_>,
) -> Result<(), SchemaError> {
    if let Some(arity) = &entry.arity {
        builder.arity(arity, location.clone())?;
    }
    for (tag, value) in entry.metadata.0 {
        builder.metadata(&tag, metadata_value(&tag, value, location)?, location.clone())?;
    }
    Ok(())
}

fn metadata_value(
    tag: &str,
    value: Value,
    location: &SourceLocation,
) -> Result<MetadataValue, SchemaError> {
    let invalid = |what: &str| SchemaError::MetadataConstraint {
        tags: vec![tag.to_string()],
        message: format!("unsupported metadata value: {}", what),
        location: location.clone(),
    };

    match value {
        Value::String(s) => Ok(MetadataValue::String(s)),
        Value::Bool(b) => Ok(MetadataValue::Bool(b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(MetadataValue::Integer(i)),
            None => n
                .as_f64()
                .map(MetadataValue::Number)
                .ok_or_else(|| invalid("number out of range")),
        },
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                _ => Err(invalid("lists may only hold strings")),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(MetadataValue::List),
        Value::Null => Err(invalid("null")),
        Value::Object(_) => Err(invalid("object")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::{DeclarationGraph, Production, Reference};
    use crate::types::FeatureFlags;

    fn build(text: &str) -> Result<(DeclarationGraph, Vec<String>), SchemaError> {
        let mut graph = DeclarationGraph::new();
        let root = graph.new_declaration(
            DeclarationKind::Standard,
            Production::Root,
            None,
            SourceLocation::new("doc.json", 0, 0),
            false,
        )?;
        let flags = FeatureFlags::default();
        let mut builder = DocumentBuilder::new(&mut graph, &flags, root, false);
        JsonFrontEnd.parse("doc.json", text, &mut builder)?;
        let includes = builder.finish()?;
        Ok((graph, includes.into_iter().map(|i| i.path).collect()))
    }

    #[test]
    fn builds_nested_objects() {
        let (graph, includes) = build(
            r#"{
                "include": ["common.json"],
                "declarations": [
                    {"object": "Person", "metadata": {"require_exact_match": true}, "members": [
                        {"name": "age", "type": "int", "arity": "?", "metadata": {"min": 0}},
                        {"name": "id", "type": "guid", "kind": "attribute"}
                    ]}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(includes, vec!["common.json"]);
        let root = graph.ids().next().unwrap();
        let person = graph[root].children()[0];
        assert_eq!(graph[person].name(), Some("Person"));
        assert!(graph[person].metadata().get("require_exact_match").is_some());

        let members = graph[person].children();
        assert_eq!(members.len(), 2);
        assert_eq!(graph[members[0]].reference(), &Reference::Unresolved("int".into()));
        assert_eq!(
            graph[members[0]].metadata().value("min"),
            Some(&MetadataValue::Integer(0))
        );
        assert_eq!(graph[members[1]].kind(), DeclarationKind::Attribute);
    }

    #[test]
    fn extension_and_config_entries() {
        let (graph, _) = build(
            r#"{"declarations": [
                {"config": "limit", "type": "int", "metadata": {"max": 5}},
                {"extension": "Custom", "args": ["x"], "keywords": {"flag": true}}
            ]}"#,
        )
        .unwrap();
        let root = graph.ids().next().unwrap();
        let children = graph[root].children();
        assert_eq!(graph[children[0]].production(), Production::Config);
        let call = graph[children[1]].extension().unwrap();
        assert_eq!(call.keywords, vec![("flag".to_string(), MetadataValue::Bool(true))]);
    }

    #[test]
    fn rejects_bad_documents() {
        assert!(matches!(build("not json"), Err(SchemaError::InvalidJson { .. })));
        assert!(matches!(
            build(r#"{"declarations": [{"name": "x", "type": "int", "metadata": {"min": null}}]}"#),
            Err(SchemaError::MetadataConstraint { .. })
        ));
        assert!(matches!(
            build(r#"{"declarations": [{"name": "x", "type": "int", "arity": "{2,1}"}]}"#),
            Err(SchemaError::InvalidArity { .. })
        ));
        assert!(matches!(
            build(r#"{"declarations": [{"name": "x"}]}"#),
            Err(SchemaError::UnsupportedConstruct { .. })
        ));
        assert!(matches!(
            build(r#"{"declarations": [{"name": "x", "object": "y"}]}"#),
            Err(SchemaError::UnsupportedConstruct { .. })
        ));
        assert!(matches!(
            build(r#"{"declarations": [{"name": "x", "type": "int", "base": "y"}]}"#),
            Err(SchemaError::UnsupportedConstruct { ref construct, .. }) if construct.contains("base")
        ));
    }

    #[test]
    fn repeated_metadata_tags_fail() {
        let err = build(
            r#"{"declarations": [
                {"name": "x", "type": "int", "metadata": {"min": 0, "min": 1}}
            ]}"#,
        )
        .unwrap_err();
        match err {
            SchemaError::DuplicateMetadata { tag, location, .. } => {
                assert_eq!(tag, "min");
                assert_eq!(location, SourceLocation::new("doc.json", 2, 17));
            }
            other => panic!("expected duplicate metadata, got {other:?}"),
        }
    }

    #[test]
    fn entries_carry_line_and_column() {
        let (graph, _) = build(
            "{\"declarations\": [\n  {\"object\": \"Person\", \"members\": [\n    {\"name\": \"age\", \"type\": \"int\"}\n  ]}\n]}",
        )
        .unwrap();
        let root = graph.ids().next().unwrap();
        let person = graph[root].children()[0];
        assert_eq!(graph[person].location(), &SourceLocation::new("doc.json", 2, 3));
        let age = graph[person].children()[0];
        assert_eq!(graph[age].location(), &SourceLocation::new("doc.json", 3, 5));
        assert_eq!(graph[age].location().to_string(), "doc.json:3:5");
    }
}
