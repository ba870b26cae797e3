//! Angle-bracket notation used by schema sources.
//!
//! A single value renders as `<kind tag=value ... arity>`; classes and
//! dictionaries end their header with `:` and list one member per line,
//! indented by four spaces:
//!
//! ```text
//! <class require_exact_match=true>:
//!     <name string max_length=40>
//!     <tags string *>
//! ```

use super::Converter;
use crate::arity::Arity;
use crate::error::SchemaError;
use crate::type_info::{
    AnyOfKind, ClassKind, DirectoryKind, EnumKind, FilenameKind, FloatKind, IntKind, StringKind,
    TypeInfo, TypeVisitor,
};

const INDENT: &str = "    ";

#[derive(Debug, Clone, Copy, Default)]
pub struct DslConverter;

impl Converter for DslConverter {
    type Output = String;

    fn convert_item(&self, ti: &TypeInfo) -> Result<String, SchemaError> {
        ti.accept(&mut DslFragment)
    }

    /// Every non-single arity is written out, optional included.
    fn collectionize(&self, item: String, arity: &Arity) -> String {
        let header_end = item.find('\n').unwrap_or(item.len());
        match item[..header_end].rfind('>') {
            Some(close) => format!("{} {}{}", &item[..close], arity, &item[close..]),
            None => item,
        }
    }
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

fn quote_list(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|i| quote(i)).collect();
    format!("[{}]", quoted.join(", "))
}

/// `<kind tag=value ...>`
fn header(kind: &str, tags: &[(&str, String)]) -> String {
    let mut text = format!("<{}", kind);
    for (tag, value) in tags {
        text.push_str(&format!(" {}={}", tag, value));
    }
    text.push('>');
    text
}

/// `<name ...>` for a member, with nested lines indented one level deeper.
fn member_lines(name: &str, rendered: &str) -> String {
    let mut lines = rendered.lines();
    let mut text = String::new();
    if let Some(first) = lines.next() {
        text.push_str(&format!("{}<{} {}", INDENT, name, first.trim_start_matches('<')));
    }
    for line in lines {
        text.push('\n');
        text.push_str(INDENT);
        text.push_str(line);
    }
    text
}

fn with_members(kind: &str, class: &ClassKind) -> Result<String, SchemaError> {
    let mut tags = Vec::new();
    if class.require_exact_match {
        tags.push(("require_exact_match", "true".to_string()));
    }
    let mut text = header(kind, &tags);
    if class.members.is_empty() {
        return Ok(text);
    }
    text.push(':');
    for member in &class.members {
        let rendered = DslConverter.convert(&member.type_info)?;
        text.push('\n');
        text.push_str(&member_lines(&member.name, &rendered));
    }
    Ok(text)
}

type Fragment = Result<String, SchemaError>;

struct DslFragment;

impl TypeVisitor for DslFragment {
    type Output = Fragment;

    fn visit_bool(&mut self, info: &TypeInfo) -> Fragment {
        Ok(header(info.kind_name(), &[]))
    }

    fn visit_int(&mut self, info: &TypeInfo, kind: &IntKind) -> Fragment {
        let mut tags = Vec::new();
        if let Some(min) = kind.min {
            tags.push(("min", min.to_string()));
        }
        if let Some(max) = kind.max {
            tags.push(("max", max.to_string()));
        }
        if let Some(bytes) = kind.bytes {
            tags.push(("bytes", bytes.to_string()));
        }
        Ok(header(info.kind_name(), &tags))
    }

    fn visit_float(&mut self, info: &TypeInfo, kind: &FloatKind) -> Fragment {
        let mut tags = Vec::new();
        if let Some(min) = kind.min {
            tags.push(("min", min.to_string()));
        }
        if let Some(max) = kind.max {
            tags.push(("max", max.to_string()));
        }
        Ok(header(info.kind_name(), &tags))
    }

    fn visit_string(&mut self, info: &TypeInfo, kind: &StringKind) -> Fragment {
        let mut tags = Vec::new();
        if let Some(expression) = &kind.validation_expression {
            tags.push(("validation_expression", quote(expression.as_str())));
        }
        if kind.min_length != StringKind::default().min_length {
            tags.push(("min_length", kind.min_length.to_string()));
        }
        if let Some(max) = kind.max_length {
            tags.push(("max_length", max.to_string()));
        }
        Ok(header(info.kind_name(), &tags))
    }

    fn visit_enum(&mut self, info: &TypeInfo, kind: &EnumKind) -> Fragment {
        let mut tags = vec![("values", quote_list(&kind.values))];
        if let Some(friendly) = &kind.friendly_values {
            tags.push(("friendly_values", quote_list(friendly)));
        }
        Ok(header(info.kind_name(), &tags))
    }

    fn visit_date(&mut self, info: &TypeInfo) -> Fragment {
        Ok(header(info.kind_name(), &[]))
    }

    fn visit_time(&mut self, info: &TypeInfo) -> Fragment {
        Ok(header(info.kind_name(), &[]))
    }

    fn visit_date_time(&mut self, info: &TypeInfo) -> Fragment {
        Ok(header(info.kind_name(), &[]))
    }

    fn visit_duration(&mut self, info: &TypeInfo) -> Fragment {
        Ok(header(info.kind_name(), &[]))
    }

    fn visit_guid(&mut self, info: &TypeInfo) -> Fragment {
        Ok(header(info.kind_name(), &[]))
    }

    fn visit_uri(&mut self, info: &TypeInfo) -> Fragment {
        Ok(header(info.kind_name(), &[]))
    }

    fn visit_filename(&mut self, info: &TypeInfo, kind: &FilenameKind) -> Fragment {
        let mut tags = Vec::new();
        if kind.ensure_exists {
            tags.push(("ensure_exists", "true".to_string()));
        }
        if kind.match_any {
            tags.push(("match_any", "true".to_string()));
        }
        Ok(header(info.kind_name(), &tags))
    }

    fn visit_directory(&mut self, info: &TypeInfo, kind: &DirectoryKind) -> Fragment {
        let mut tags = Vec::new();
        if kind.ensure_exists {
            tags.push(("ensure_exists", "true".to_string()));
        }
        Ok(header(info.kind_name(), &tags))
    }

    fn visit_class(&mut self, info: &TypeInfo, kind: &ClassKind) -> Fragment {
        with_members(info.kind_name(), kind)
    }

    fn visit_dict(&mut self, info: &TypeInfo, kind: &ClassKind) -> Fragment {
        with_members(info.kind_name(), kind)
    }

    /// `<(int max=10 | string)>`; nested members are not repeated inline.
    fn visit_any_of(&mut self, _: &TypeInfo, kind: &AnyOfKind) -> Fragment {
        let mut heads = Vec::new();
        for alternative in &kind.alternatives {
            let rendered = DslConverter.convert(alternative)?;
            let first = rendered.lines().next().unwrap_or_default();
            heads.push(
                first
                    .trim_end_matches(':')
                    .trim_start_matches('<')
                    .trim_end_matches('>')
                    .to_string(),
            );
        }
        Ok(format!("<({})>", heads.join(" | ")))
    }
}
