//! XML Schema fragments as compact text.
//!
//! Simple kinds render either as a bare built-in type name (`xs:boolean`) or
//! as an anonymous `xs:simpleType` restriction with facets. Classes become
//! `xs:complexType` sequences whose elements carry `minOccurs`/`maxOccurs`.

use super::Converter;
use crate::arity::Arity;
use crate::error::SchemaError;
use crate::type_info::{
    AnyOfKind, ClassKind, DirectoryKind, EnumKind, FilenameKind, FloatKind, IntKind, StringKind,
    TypeInfo, TypeVisitor,
};

const GUID_PATTERN: &str =
    "[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}";

#[derive(Debug, Clone, Copy, Default)]
pub struct XmlSchemaConverter;

impl Converter for XmlSchemaConverter {
    type Output = String;

    fn convert_item(&self, ti: &TypeInfo) -> Result<String, SchemaError> {
        ti.accept(&mut XmlFragment)
    }

    fn collectionize(&self, item: String, arity: &Arity) -> String {
        if !arity.is_collection() {
            return item;
        }
        format!(
            "<xs:complexType><xs:sequence>{}</xs:sequence></xs:complexType>",
            element("item", &item, arity)
        )
    }
}

/// Escape text for use inside a double-quoted attribute.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn occurs(arity: &Arity) -> String {
    let mut attributes = String::new();
    if arity.min() != 1 {
        attributes.push_str(&format!(" minOccurs=\"{}\"", arity.min()));
    }
    match arity.max() {
        Some(1) => {}
        Some(max) => attributes.push_str(&format!(" maxOccurs=\"{}\"", max)),
        None => attributes.push_str(" maxOccurs=\"unbounded\""),
    }
    attributes
}

/// An element holding `fragment`, referenced by name or nested inline.
fn element(name: &str, fragment: &str, arity: &Arity) -> String {
    if fragment.starts_with('<') {
        format!(
            "<xs:element name=\"{}\"{}>{}</xs:element>",
            escape(name),
            occurs(arity),
            fragment
        )
    } else {
        format!(
            "<xs:element name=\"{}\" type=\"{}\"{}/>",
            escape(name),
            fragment,
            occurs(arity)
        )
    }
}

/// `base` alone when there are no facets, otherwise a restriction.
fn restriction(base: &str, facets: &[(&str, String)]) -> String {
    if facets.is_empty() {
        return base.to_string();
    }
    let facets: String = facets
        .iter()
        .map(|(name, value)| format!("<xs:{} value=\"{}\"/>", name, escape(value)))
        .collect();
    format!(
        "<xs:simpleType><xs:restriction base=\"{}\">{}</xs:restriction></xs:simpleType>",
        base, facets
    )
}

/// Built-in integer type for a declared width and sign.
fn int_base(kind: &IntKind) -> &'static str {
    match (kind.is_unsigned(), kind.bytes) {
        (true, Some(1)) => "xs:unsignedByte",
        (true, Some(2)) => "xs:unsignedShort",
        (true, Some(4)) => "xs:nonNegativeInt",
        (true, Some(8)) => "xs:unsignedLong",
        (true, _) => "xs:nonNegativeInteger",
        (false, Some(1)) => "xs:byte",
        (false, Some(2)) => "xs:short",
        (false, Some(4)) => "xs:int",
        (false, Some(8)) => "xs:long",
        (false, _) => "xs:integer",
    }
}

fn complex(kind: &ClassKind) -> Result<String, SchemaError> {
    let mut elements = String::new();
    for member in &kind.members {
        let fragment = XmlSchemaConverter.convert_item(&member.type_info)?;
        elements.push_str(&element(&member.name, &fragment, member.type_info.arity()));
    }
    if !kind.require_exact_match {
        elements.push_str(
            "<xs:any minOccurs=\"0\" maxOccurs=\"unbounded\" processContents=\"lax\"/>",
        );
    }
    Ok(format!(
        "<xs:complexType><xs:sequence>{}</xs:sequence></xs:complexType>",
        elements
    ))
}

type Fragment = Result<String, SchemaError>;

struct XmlFragment;

impl TypeVisitor for XmlFragment {
    type Output = Fragment;

    fn visit_bool(&mut self, _: &TypeInfo) -> Fragment {
        Ok("xs:boolean".into())
    }

    fn visit_int(&mut self, _: &TypeInfo, kind: &IntKind) -> Fragment {
        let mut facets = Vec::new();
        if let Some(min) = kind.min {
            facets.push(("minInclusive", min.to_string()));
        }
        if let Some(max) = kind.max {
            facets.push(("maxInclusive", max.to_string()));
        }
        Ok(restriction(int_base(kind), &facets))
    }

    fn visit_float(&mut self, _: &TypeInfo, kind: &FloatKind) -> Fragment {
        let mut facets = Vec::new();
        if let Some(min) = kind.min {
            facets.push(("minInclusive", min.to_string()));
        }
        if let Some(max) = kind.max {
            facets.push(("maxInclusive", max.to_string()));
        }
        Ok(restriction("xs:double", &facets))
    }

    fn visit_string(&mut self, _: &TypeInfo, kind: &StringKind) -> Fragment {
        let mut facets = Vec::new();
        if kind.min_length > 0 {
            facets.push(("minLength", kind.min_length.to_string()));
        }
        if let Some(max) = kind.max_length {
            facets.push(("maxLength", max.to_string()));
        }
        if let Some(expression) = &kind.validation_expression {
            facets.push(("pattern", expression.as_str().to_string()));
        }
        Ok(restriction("xs:string", &facets))
    }

    fn visit_enum(&mut self, _: &TypeInfo, kind: &EnumKind) -> Fragment {
        let facets: Vec<_> = kind
            .values
            .iter()
            .map(|v| ("enumeration", v.clone()))
            .collect();
        Ok(restriction("xs:string", &facets))
    }

    fn visit_date(&mut self, _: &TypeInfo) -> Fragment {
        Ok("xs:date".into())
    }

    fn visit_time(&mut self, _: &TypeInfo) -> Fragment {
        Ok("xs:time".into())
    }

    fn visit_date_time(&mut self, _: &TypeInfo) -> Fragment {
        Ok("xs:dateTime".into())
    }

    fn visit_duration(&mut self, _: &TypeInfo) -> Fragment {
        Ok("xs:duration".into())
    }

    fn visit_guid(&mut self, _: &TypeInfo) -> Fragment {
        Ok(restriction(
            "xs:string",
            &[("pattern", GUID_PATTERN.to_string())],
        ))
    }

    fn visit_uri(&mut self, _: &TypeInfo) -> Fragment {
        Ok("xs:anyURI".into())
    }

    fn visit_filename(&mut self, _: &TypeInfo, _: &FilenameKind) -> Fragment {
        Ok(restriction("xs:string", &[("minLength", "1".to_string())]))
    }

    fn visit_directory(&mut self, _: &TypeInfo, _: &DirectoryKind) -> Fragment {
        Ok(restriction("xs:string", &[("minLength", "1".to_string())]))
    }

    fn visit_class(&mut self, _: &TypeInfo, kind: &ClassKind) -> Fragment {
        complex(kind)
    }

    fn visit_dict(&mut self, _: &TypeInfo, kind: &ClassKind) -> Fragment {
        complex(kind)
    }

    fn visit_any_of(&mut self, _: &TypeInfo, kind: &AnyOfKind) -> Fragment {
        let mut choices = String::new();
        // positions keep names unique when two alternatives share a kind
        for (position, alternative) in kind.alternatives.iter().enumerate() {
            let fragment = XmlSchemaConverter.convert_item(alternative)?;
            choices.push_str(&element(
                &format!("{}{}", alternative.kind_name(), position + 1),
                &fragment,
                alternative.arity(),
            ));
        }
        Ok(format!(
            "<xs:complexType><xs:choice>{}</xs:choice></xs:complexType>",
            choices
        ))
    }
}
