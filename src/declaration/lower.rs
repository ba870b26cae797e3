//! Lowering committed declarations to [`TypeInfo`].

use super::{
    DeclId, Declaration, DeclarationGraph, DeclarationKind, Document, Production, Reference,
    Subtype, Target,
};
use crate::arity::Arity;
use crate::error::SchemaError;
use crate::metadata::{self, MetadataMap, MetadataValue};
use crate::type_info::{
    AnyOfKind, ClassKind, DirectoryKind, EnumKind, FilenameKind, FloatKind, IntKind, Member,
    StringKind, TypeInfo, TypeKind, TypeVisitor,
};
use crate::types::SourceLocation;

impl Document {
    /// Build the TypeInfo a declaration describes.
    ///
    /// # Errors
    ///
    /// - `UnresolvedReference` if the declaration depends on a placeholder
    /// - `CircularReference` if it contains itself
    /// - `UnsupportedConstruct` for extensions
    /// - `MetadataConstraint` for tags that do not fit the resulting kind
    pub fn type_info(&self, id: DeclId) -> Result<TypeInfo, SchemaError> {
        Lowering {
            graph: &self.graph,
            stack: Vec::new(),
        }
        .lower(id)
    }

    /// [`Document::type_info`] by dotted key.
    pub fn type_info_for(&self, key: &str) -> Result<TypeInfo, SchemaError> {
        let id = self
            .find(key)
            .ok_or_else(|| SchemaError::UnresolvedReference {
                reference: key.to_string(),
                location: SourceLocation::api(),
            })?;
        self.type_info(id)
    }
}

/// A non-object declaration traced to what it finally derives from.
pub(crate) struct Derivation {
    /// Alias/augmented/fundamental/config declarations, nearest first.
    pub chain: Vec<DeclId>,
    pub end: Target,
}

impl Derivation {
    /// Tags along the chain; nearer declarations override farther ones.
    pub fn metadata(&self, graph: &DeclarationGraph) -> MetadataMap {
        self.chain
            .iter()
            .rev()
            .fold(MetadataMap::new(), |acc, id| graph[*id].metadata().overlay(&acc))
    }

    /// First explicit arity along the chain.
    pub fn arity(&self, graph: &DeclarationGraph) -> Option<Arity> {
        self.chain
            .iter()
            .find_map(|id| graph[*id].explicit_arity().copied())
    }
}

/// Follow a non-object declaration to the object or fundamental kind it derives from.
pub(crate) fn derivation(graph: &DeclarationGraph, id: DeclId) -> Result<Derivation, SchemaError> {
    let mut chain = Vec::new();
    for cur in graph.walk(id) {
        let node = &graph[cur];
        if node.is_object() {
            return Ok(Derivation {
                chain,
                end: Target::Declaration(cur),
            });
        }
        chain.push(cur);
        match node.reference() {
            Reference::Fundamental(kind) => {
                return Ok(Derivation {
                    chain,
                    end: Target::Fundamental(*kind),
                })
            }
            Reference::Placeholder(text) | Reference::Unresolved(text) => {
                return Err(SchemaError::UnresolvedReference {
                    reference: text.clone(),
                    location: node.location().clone(),
                })
            }
            Reference::None | Reference::Declaration(_) => {}
        }
    }

    let node = &graph[id];
    Err(SchemaError::CircularReference {
        key: label(node),
        location: node.location().clone(),
    })
}

/// Check a declaration's tags against the kind it ends up describing.
pub(crate) fn check_metadata(graph: &DeclarationGraph, id: DeclId) -> Result<(), SchemaError> {
    let node = &graph[id];
    match node.subtype() {
        Some(Subtype::Extension) | None => Ok(()),
        Some(Subtype::Compound) | Some(Subtype::Simple) => {
            metadata::check_object_metadata(node.metadata())
        }
        Some(_) => {
            let derivation = match derivation(graph, id) {
                Ok(d) => d,
                // placeholders are reported by the resolver and the linter
                Err(SchemaError::UnresolvedReference { .. }) => return Ok(()),
                Err(e) => return Err(e),
            };
            let merged = derivation.metadata(graph);
            match derivation.end {
                Target::Fundamental(kind) => {
                    metadata::fundamental_type(kind, &merged, node.location()).map(|_| ())
                }
                Target::Declaration(_) => metadata::check_object_metadata(&merged),
            }
        }
    }
}

fn label(node: &Declaration) -> String {
    node.key()
        .or_else(|| node.name())
        .unwrap_or("<root>")
        .to_string()
}

enum Base {
    Class(ClassKind),
    Value(TypeInfo),
}

struct Lowering<'a> {
    graph: &'a DeclarationGraph,
    stack: Vec<DeclId>,
}

impl Lowering<'_> {
    fn lower(&mut self, id: DeclId) -> Result<TypeInfo, SchemaError> {
        let graph = self.graph;
        let node = &graph[id];
        if self.stack.contains(&id) {
            return Err(SchemaError::CircularReference {
                key: label(node),
                location: node.location().clone(),
            });
        }

        self.stack.push(id);
        let result = match node.subtype() {
            Some(Subtype::Compound) => self.compound(id),
            Some(Subtype::Simple) => self.simple(id),
            Some(Subtype::Extension) => Err(SchemaError::unsupported(
                "an extension invocation used as a type",
                node.location(),
            )),
            Some(Subtype::Alias)
            | Some(Subtype::Augmented)
            | Some(Subtype::Fundamental)
            | Some(Subtype::Config) => self.derived(id),
            None => Err(SchemaError::unsupported(
                "an unclassified declaration",
                node.location(),
            )),
        };
        self.stack.pop();
        result
    }

    fn derived(&mut self, id: DeclId) -> Result<TypeInfo, SchemaError> {
        let graph = self.graph;
        let node = &graph[id];
        let derivation = derivation(self.graph, id)?;
        let merged = derivation.metadata(self.graph);

        let info = match derivation.end {
            Target::Fundamental(kind) => {
                metadata::fundamental_type(kind, &merged, node.location())?
            }
            Target::Declaration(object) => {
                metadata::check_object_metadata(&merged)?;
                let base = self.lower(object)?;
                with_object_tags(base, &merged, node.location())?
            }
        };

        let arity = derivation
            .arity(self.graph)
            .unwrap_or_else(|| match derivation.end {
                Target::Declaration(_) => *info.arity(),
                Target::Fundamental(_) => Arity::single(),
            });
        Ok(info.with_arity(arity))
    }

    /// What an object inherits from the declaration it references.
    fn inherited(&mut self, node: &Declaration) -> Result<Option<Base>, SchemaError> {
        match node.reference() {
            Reference::Declaration(base) => {
                let info = self.lower(*base)?;
                Ok(Some(match info.accept(&mut ClassView) {
                    Some(class) => Base::Class(class),
                    None => Base::Value(info),
                }))
            }
            _ => Ok(None),
        }
    }

    fn compound(&mut self, id: DeclId) -> Result<TypeInfo, SchemaError> {
        let graph = self.graph;
        let node = &graph[id];
        let mut members = match self.inherited(node)? {
            Some(Base::Class(class)) => class.members,
            _ => Vec::new(),
        };

        for &child in node.children() {
            let child_node = &graph[child];
            if !is_member(child_node) {
                continue;
            }
            let info = self.lower(child)?;
            push_member(&mut members, child_node, info);
        }

        class_type(members, node)
    }

    fn simple(&mut self, id: DeclId) -> Result<TypeInfo, SchemaError> {
        let graph = self.graph;
        let node = &graph[id];
        let value_name = match node
            .metadata()
            .value_or_default("fundamental_name", node.name())
        {
            Some(MetadataValue::String(name)) => name,
            _ => "value".to_string(),
        };

        let mut members = Vec::new();
        for &child in node.children() {
            let child_node = &graph[child];
            if child_node.kind() != DeclarationKind::Attribute {
                continue;
            }
            let info = self.lower(child)?;
            push_member(&mut members, child_node, info);
        }

        match (node.reference(), self.inherited(node)?) {
            (Reference::Fundamental(kind), _) => {
                let value = metadata::fundamental_type(*kind, &MetadataMap::new(), node.location())?;
                members.push(Member::new(value_name, value));
            }
            (_, Some(Base::Class(class))) => {
                for member in class.members {
                    if !members.iter().any(|m| m.name == member.name) {
                        members.push(member);
                    }
                }
            }
            (_, Some(Base::Value(value))) => {
                members.push(Member::new(value_name, value.with_arity(Arity::single())));
            }
            (_, None) => {
                return Err(SchemaError::unsupported(
                    "a simple object without a base type",
                    node.location(),
                ))
            }
        }

        class_type(members, node)
    }
}

fn is_member(node: &Declaration) -> bool {
    node.kind() != DeclarationKind::Definition
        && matches!(node.production(), Production::Object | Production::Declaration)
}

/// Add or replace a member named after `node`.
fn push_member(members: &mut Vec<Member>, node: &Declaration, info: TypeInfo) {
    let name = node.name().unwrap_or_default().to_string();
    match members.iter_mut().find(|m| m.name == name) {
        Some(existing) => existing.type_info = info,
        None => members.push(Member::new(name, info)),
    }
}

fn exact_match(metadata: &MetadataMap) -> bool {
    matches!(
        metadata.value("require_exact_match"),
        Some(MetadataValue::Bool(true))
    )
}

fn class_type(members: Vec<Member>, node: &Declaration) -> Result<TypeInfo, SchemaError> {
    let kind = ClassKind {
        members,
        require_exact_match: exact_match(node.metadata()),
    };
    Ok(TypeInfo::new(TypeKind::Class(kind))
        .map_err(|e| e.at(node.location()))?
        .with_arity(node.arity()))
}

/// Apply object tags from a derived declaration to the class it names.
fn with_object_tags(
    base: TypeInfo,
    metadata: &MetadataMap,
    location: &SourceLocation,
) -> Result<TypeInfo, SchemaError> {
    if metadata.get("require_exact_match").is_none() {
        return Ok(base);
    }
    match base.accept(&mut ClassView) {
        Some(class) => Ok(TypeInfo::new(TypeKind::Class(ClassKind {
            members: class.members,
            require_exact_match: exact_match(metadata),
        }))
        .map_err(|e| e.at(location))?
        .with_arity(*base.arity())),
        None => Ok(base),
    }
}

/// Members of a class; `None` for every other kind.
struct ClassView;

impl TypeVisitor for ClassView {
    type Output = Option<ClassKind>;

    fn visit_bool(&mut self, _: &TypeInfo) -> Option<ClassKind> {
        None
    }
    fn visit_int(&mut self, _: &TypeInfo, _: &IntKind) -> Option<ClassKind> {
        None
    }
    fn visit_float(&mut self, _: &TypeInfo, _: &FloatKind) -> Option<ClassKind> {
        None
    }
    fn visit_string(&mut self, _: &TypeInfo, _: &StringKind) -> Option<ClassKind> {
        None
    }
    fn visit_enum(&mut self, _: &TypeInfo, _: &EnumKind) -> Option<ClassKind> {
        None
    }
    fn visit_date(&mut self, _: &TypeInfo) -> Option<ClassKind> {
        None
    }
    fn visit_time(&mut self, _: &TypeInfo) -> Option<ClassKind> {
        None
    }
    fn visit_date_time(&mut self, _: &TypeInfo) -> Option<ClassKind> {
        None
    }
    fn visit_duration(&mut self, _: &TypeInfo) -> Option<ClassKind> {
        None
    }
    fn visit_guid(&mut self, _: &TypeInfo) -> Option<ClassKind> {
        None
    }
    fn visit_uri(&mut self, _: &TypeInfo) -> Option<ClassKind> {
        None
    }
    fn visit_filename(&mut self, _: &TypeInfo, _: &FilenameKind) -> Option<ClassKind> {
        None
    }
    fn visit_directory(&mut self, _: &TypeInfo, _: &DirectoryKind) -> Option<ClassKind> {
        None
    }
    fn visit_class(&mut self, _: &TypeInfo, kind: &ClassKind) -> Option<ClassKind> {
        Some(kind.clone())
    }
    fn visit_dict(&mut self, _: &TypeInfo, _: &ClassKind) -> Option<ClassKind> {
        None
    }
    fn visit_any_of(&mut self, _: &TypeInfo, _: &AnyOfKind) -> Option<ClassKind> {
        None
    }
}
