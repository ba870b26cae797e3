//! Declaration model - the semantic tree built from schema sources.
//!
//! Declarations live in an arena ([`DeclarationGraph`]) and are addressed by
//! [`DeclId`]. Parent/child edges are owned; `referenced_by` back-links are plain
//! ids. Every declaration starts mutable and is committed exactly once, after
//! which every setter fails with `SchemaError::ImmutableViolation`.

mod builder;
mod json;
mod lower;

use std::collections::{BTreeMap, HashSet};
use std::ops::Index;
use std::path::PathBuf;

use crate::arity::Arity;
use crate::error::SchemaError;
use crate::metadata::{MetadataItem, MetadataMap, MetadataValue};
use crate::type_info::FundamentalKind;
use crate::types::SourceLocation;

pub use builder::{DocumentBuilder, FrontEnd, IncludeRequest};
pub(crate) use lower::check_metadata;
pub use json::JsonFrontEnd;

/// Index of a declaration in its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(usize);

impl DeclId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Role of a declaration inside its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    /// A member of the enclosing object.
    Standard,
    /// An attribute of the enclosing object (the only kind allowed on simple objects).
    Attribute,
    /// A type definition; not a member of its parent.
    Definition,
}

/// The grammar production a declaration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Production {
    /// Document root.
    Root,
    /// `begin_object` .. `end_object`.
    Object,
    /// A leaf declaration with a type reference.
    Declaration,
    Extension,
    Config,
}

/// Effective subtype, assigned by classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subtype {
    Extension,
    Config,
    /// Object with named members.
    Compound,
    /// Object wrapping a fundamental value, with attributes.
    Simple,
    /// Another name for the referenced type.
    Alias,
    /// The referenced type with new constraints or cardinality.
    Augmented,
    /// Constrained fundamental kind.
    Fundamental,
}

/// A type reference, resolved exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    None,
    Unresolved(String),
    Declaration(DeclId),
    Fundamental(FundamentalKind),
    /// Could not be resolved in non-strict mode.
    Placeholder(String),
}

impl Reference {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Reference::Unresolved(_))
    }
}

/// Terminal of a reference chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Fundamental(FundamentalKind),
    Declaration(DeclId),
}

/// Arguments of an extension invocation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtensionCall {
    pub name: String,
    pub positional: Vec<MetadataValue>,
    pub keywords: Vec<(String, MetadataValue)>,
}

#[derive(Debug, Clone)]
pub struct Declaration {
    name: Option<String>,
    parent: Option<DeclId>,
    children: Vec<DeclId>,
    kind: DeclarationKind,
    production: Production,
    subtype: Option<Subtype>,
    reference: Reference,
    arity: Option<Arity>,
    metadata: MetadataMap,
    extension: Option<ExtensionCall>,
    referenced_by: Vec<DeclId>,
    target: Option<Target>,
    key: Option<String>,
    is_new_type: bool,
    location: SourceLocation,
    is_external: bool,
}

impl Declaration {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn parent(&self) -> Option<DeclId> {
        self.parent
    }

    pub fn children(&self) -> &[DeclId] {
        &self.children
    }

    pub fn kind(&self) -> DeclarationKind {
        self.kind
    }

    pub fn production(&self) -> Production {
        self.production
    }

    pub fn is_object(&self) -> bool {
        matches!(self.production, Production::Object | Production::Root)
    }

    /// `None` until classified.
    pub fn subtype(&self) -> Option<Subtype> {
        self.subtype
    }

    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    /// Arity written in the source, if any.
    pub fn explicit_arity(&self) -> Option<&Arity> {
        self.arity.as_ref()
    }

    /// Effective arity; single unless one was written.
    pub fn arity(&self) -> Arity {
        self.arity.unwrap_or_default()
    }

    pub fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }

    pub fn extension(&self) -> Option<&ExtensionCall> {
        self.extension.as_ref()
    }

    pub fn referenced_by(&self) -> &[DeclId] {
        &self.referenced_by
    }

    /// The fundamental kind or declaration this one refers to.
    pub fn fundamental_or_item(&self) -> Option<Target> {
        self.target
    }

    /// Dotted path from the document root; available once committed.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn is_committed(&self) -> bool {
        self.key.is_some()
    }

    pub fn is_new_type(&self) -> bool {
        self.is_new_type
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    pub fn is_external(&self) -> bool {
        self.is_external
    }

    fn display_name(&self) -> String {
        self.key
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| "<root>".to_string())
    }

    fn ensure_mutable(&self, field: &'static str) -> Result<(), SchemaError> {
        if self.is_committed() {
            return Err(SchemaError::ImmutableViolation {
                key: self.display_name(),
                field,
                location: self.location.clone(),
            });
        }
        Ok(())
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), SchemaError> {
        self.ensure_mutable("name")?;
        self.name = Some(name.into());
        Ok(())
    }

    pub fn set_subtype(&mut self, subtype: Subtype) -> Result<(), SchemaError> {
        self.ensure_mutable("subtype")?;
        self.subtype = Some(subtype);
        Ok(())
    }

    pub fn set_reference(&mut self, reference: Reference) -> Result<(), SchemaError> {
        self.ensure_mutable("reference")?;
        if self.reference.is_resolved() && !matches!(self.reference, Reference::None) {
            return Err(SchemaError::ImmutableViolation {
                key: self.display_name(),
                field: "reference",
                location: self.location.clone(),
            });
        }
        self.target = match &reference {
            Reference::Declaration(id) => Some(Target::Declaration(*id)),
            Reference::Fundamental(kind) => Some(Target::Fundamental(*kind)),
            _ => None,
        };
        self.reference = reference;
        Ok(())
    }

    pub fn set_arity(&mut self, arity: Arity) -> Result<(), SchemaError> {
        self.ensure_mutable("arity")?;
        self.arity = Some(arity);
        Ok(())
    }

    /// Attach a metadata tag.
    ///
    /// # Errors
    ///
    /// `ImmutableViolation` once committed, `DuplicateMetadata` if the tag is
    /// already attached.
    pub fn add_metadata(&mut self, item: MetadataItem) -> Result<(), SchemaError> {
        self.ensure_mutable("metadata")?;
        self.metadata.insert(item)
    }

    pub fn set_extension(&mut self, call: ExtensionCall) -> Result<(), SchemaError> {
        self.ensure_mutable("extension")?;
        self.extension = Some(call);
        Ok(())
    }

    fn extension_mut(&mut self) -> Result<&mut ExtensionCall, SchemaError> {
        self.ensure_mutable("extension")?;
        let location = self.location.clone();
        self.extension
            .as_mut()
            .ok_or_else(|| SchemaError::unsupported("string literal outside an extension", &location))
    }

    pub fn add_positional(&mut self, value: MetadataValue) -> Result<(), SchemaError> {
        self.extension_mut()?.positional.push(value);
        Ok(())
    }

    pub fn add_keyword(
        &mut self,
        name: impl Into<String>,
        value: MetadataValue,
    ) -> Result<(), SchemaError> {
        self.extension_mut()?.keywords.push((name.into(), value));
        Ok(())
    }

    pub fn set_new_type(&mut self, is_new_type: bool) -> Result<(), SchemaError> {
        self.ensure_mutable("is_new_type")?;
        self.is_new_type = is_new_type;
        Ok(())
    }

    fn add_referrer(&mut self, id: DeclId) -> Result<(), SchemaError> {
        self.ensure_mutable("referenced_by")?;
        self.referenced_by.push(id);
        Ok(())
    }
}

/// Arena owning every declaration of a document set.
#[derive(Debug, Clone, Default)]
pub struct DeclarationGraph {
    nodes: Vec<Declaration>,
}

impl DeclarationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids in creation order.
    pub fn ids(&self) -> impl Iterator<Item = DeclId> {
        (0..self.nodes.len()).map(DeclId)
    }

    pub fn get(&self, id: DeclId) -> Option<&Declaration> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: DeclId) -> &mut Declaration {
        &mut self.nodes[id.0]
    }

    /// Create a mutable declaration and attach it to `parent`.
    pub fn new_declaration(
        &mut self,
        kind: DeclarationKind,
        production: Production,
        parent: Option<DeclId>,
        location: SourceLocation,
        is_external: bool,
    ) -> Result<DeclId, SchemaError> {
        let id = DeclId(self.nodes.len());
        if let Some(parent) = parent {
            self.nodes[parent.0].ensure_mutable("children")?;
            self.nodes[parent.0].children.push(id);
        }

        let subtype = match production {
            Production::Root | Production::Object => Some(Subtype::Compound),
            Production::Extension => Some(Subtype::Extension),
            Production::Config => Some(Subtype::Config),
            Production::Declaration => None,
        };

        self.nodes.push(Declaration {
            name: None,
            parent,
            children: Vec::new(),
            kind,
            production,
            subtype,
            reference: Reference::None,
            arity: None,
            metadata: MetadataMap::new(),
            extension: None,
            referenced_by: Vec::new(),
            target: None,
            key: None,
            is_new_type: false,
            location,
            is_external,
        });
        Ok(id)
    }

    /// Resolve `from`'s reference to `to`, recording the back-link.
    pub fn link(&mut self, from: DeclId, to: DeclId) -> Result<(), SchemaError> {
        self.nodes[from.0].set_reference(Reference::Declaration(to))?;
        self.nodes[to.0].add_referrer(from)
    }

    /// Compute the key and freeze the declaration.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::ImmutableViolation` if it is already committed.
    pub fn commit(&mut self, id: DeclId) -> Result<&str, SchemaError> {
        self.nodes[id.0].ensure_mutable("state")?;

        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            let node = &self.nodes[cur.0];
            if node.production != Production::Root {
                if let Some(name) = &node.name {
                    segments.push(name.as_str());
                }
            }
            current = node.parent;
        }
        segments.reverse();
        let key = segments.join(".");

        let node = &mut self.nodes[id.0];
        node.key = Some(key);
        Ok(node.key.as_deref().unwrap_or_default())
    }

    /// Follow `fundamental_or_item` from `id` (inclusive) while it names a
    /// declaration. Stops before revisiting a declaration.
    pub fn walk(&self, id: DeclId) -> Walk<'_> {
        Walk {
            graph: self,
            next: Some(id),
            seen: HashSet::new(),
        }
    }

    /// First declaration on the walk that is not an alias.
    pub fn resolve_aliases(&self, id: DeclId) -> DeclId {
        let mut last = id;
        for cur in self.walk(id) {
            last = cur;
            if self[cur].subtype != Some(Subtype::Alias) {
                return cur;
            }
        }
        last
    }

    /// First declaration on the walk that is neither an alias nor augmented.
    pub fn resolve_augmentations(&self, id: DeclId) -> DeclId {
        let mut last = id;
        for cur in self.walk(id) {
            last = cur;
            if !matches!(
                self[cur].subtype,
                Some(Subtype::Alias) | Some(Subtype::Augmented)
            ) {
                return cur;
            }
        }
        last
    }

    /// Where the chain of references from `id` ends.
    pub fn fundamental_type(&self, id: DeclId) -> Target {
        let last = self.walk(id).last().unwrap_or(id);
        match self[last].target {
            Some(Target::Fundamental(kind)) => Target::Fundamental(kind),
            _ => Target::Declaration(last),
        }
    }

    /// Whether following references from `id` comes back to a visited declaration.
    pub fn has_cycle(&self, id: DeclId) -> bool {
        let mut seen = HashSet::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            if !seen.insert(cur) {
                return true;
            }
            current = match self[cur].target {
                Some(Target::Declaration(next)) => Some(next),
                _ => None,
            };
        }
        false
    }
}

impl Index<DeclId> for DeclarationGraph {
    type Output = Declaration;

    fn index(&self, id: DeclId) -> &Declaration {
        &self.nodes[id.0]
    }
}

/// Iterator returned by [`DeclarationGraph::walk`].
pub struct Walk<'a> {
    graph: &'a DeclarationGraph,
    next: Option<DeclId>,
    seen: HashSet<DeclId>,
}

impl Iterator for Walk<'_> {
    type Item = DeclId;

    fn next(&mut self) -> Option<DeclId> {
        let current = self.next.take()?;
        if !self.seen.insert(current) {
            return None;
        }
        self.next = match self.graph[current].target {
            Some(Target::Declaration(next)) => Some(next),
            _ => None,
        };
        Some(current)
    }
}

/// A source that contributed declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub root: DeclId,
    pub is_external: bool,
}

/// A resolved, committed set of documents: the main source plus its includes.
#[derive(Debug, Clone)]
pub struct Document {
    graph: DeclarationGraph,
    sources: Vec<SourceDocument>,
    keys: BTreeMap<String, DeclId>,
}

impl Document {
    pub(crate) fn new(
        graph: DeclarationGraph,
        sources: Vec<SourceDocument>,
        keys: BTreeMap<String, DeclId>,
    ) -> Self {
        Self {
            graph,
            sources,
            keys,
        }
    }

    /// Root of the main source.
    pub fn root(&self) -> DeclId {
        self.sources[0].root
    }

    /// Main source first, then includes in discovery order.
    pub fn sources(&self) -> &[SourceDocument] {
        &self.sources
    }

    pub fn graph(&self) -> &DeclarationGraph {
        &self.graph
    }

    /// Look up a declaration by dotted key.
    pub fn find(&self, key: &str) -> Option<DeclId> {
        self.keys.get(key).copied()
    }

    /// Named declarations in key order.
    pub fn keys(&self) -> impl Iterator<Item = (&str, DeclId)> {
        self.keys.iter().map(|(k, id)| (k.as_str(), *id))
    }

    pub fn declarations(&self) -> impl Iterator<Item = (DeclId, &Declaration)> {
        self.graph.ids().map(move |id| (id, &self.graph[id]))
    }
}

impl Index<DeclId> for Document {
    type Output = Declaration;

    fn index(&self, id: DeclId) -> &Declaration {
        &self.graph[id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(line: u32) -> SourceLocation {
        SourceLocation::new("test.schema", line, 1)
    }

    fn named(
        graph: &mut DeclarationGraph,
        production: Production,
        parent: Option<DeclId>,
        name: &str,
    ) -> DeclId {
        let id = graph
            .new_declaration(DeclarationKind::Standard, production, parent, loc(1), false)
            .unwrap();
        graph.get_mut(id).set_name(name).unwrap();
        id
    }

    #[test]
    fn commit_computes_dotted_key() {
        let mut graph = DeclarationGraph::new();
        let root = graph
            .new_declaration(DeclarationKind::Standard, Production::Root, None, loc(0), false)
            .unwrap();
        let person = named(&mut graph, Production::Object, Some(root), "Person");
        let age = named(&mut graph, Production::Declaration, Some(person), "age");

        assert_eq!(graph.commit(age).unwrap(), "Person.age");
        assert_eq!(graph.commit(person).unwrap(), "Person");
        assert_eq!(graph.commit(root).unwrap(), "");
    }

    #[test]
    fn writes_after_commit_fail() {
        let mut graph = DeclarationGraph::new();
        let id = named(&mut graph, Production::Declaration, None, "Age");
        graph.commit(id).unwrap();

        let err = graph.get_mut(id).set_arity(Arity::optional()).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::ImmutableViolation { ref key, field: "arity", .. } if key == "Age"
        ));
        assert!(graph.get_mut(id).set_subtype(Subtype::Alias).is_err());
        assert!(graph.commit(id).is_err());
    }

    #[test]
    fn reference_resolves_once() {
        let mut graph = DeclarationGraph::new();
        let a = named(&mut graph, Production::Declaration, None, "A");
        let b = named(&mut graph, Production::Declaration, None, "B");
        graph
            .get_mut(a)
            .set_reference(Reference::Unresolved("B".into()))
            .unwrap();
        graph.link(a, b).unwrap();

        assert_eq!(graph[a].fundamental_or_item(), Some(Target::Declaration(b)));
        assert_eq!(graph[b].referenced_by(), &[a]);
        assert!(graph
            .get_mut(a)
            .set_reference(Reference::Fundamental(FundamentalKind::Int))
            .is_err());
    }

    fn chain(graph: &mut DeclarationGraph, subtypes: &[Subtype]) -> Vec<DeclId> {
        let ids: Vec<DeclId> = subtypes
            .iter()
            .enumerate()
            .map(|(i, _)| named(graph, Production::Declaration, None, &format!("T{}", i)))
            .collect();
        for (i, subtype) in subtypes.iter().enumerate() {
            graph.get_mut(ids[i]).set_subtype(*subtype).unwrap();
            if i + 1 < ids.len() {
                graph.link(ids[i], ids[i + 1]).unwrap();
            }
        }
        ids
    }

    #[test]
    fn walk_helpers() {
        let mut graph = DeclarationGraph::new();
        let ids = chain(
            &mut graph,
            &[
                Subtype::Alias,
                Subtype::Augmented,
                Subtype::Alias,
                Subtype::Fundamental,
            ],
        );
        graph
            .get_mut(ids[3])
            .set_reference(Reference::Fundamental(FundamentalKind::String))
            .unwrap();

        assert_eq!(graph.walk(ids[0]).collect::<Vec<_>>(), ids);
        assert_eq!(graph.resolve_aliases(ids[0]), ids[1]);
        assert_eq!(graph.resolve_augmentations(ids[0]), ids[3]);
        assert_eq!(
            graph.fundamental_type(ids[0]),
            Target::Fundamental(FundamentalKind::String)
        );
        // callers may stop early
        assert_eq!(graph.walk(ids[0]).take(2).count(), 2);
    }

    #[test]
    fn walk_is_cycle_safe() {
        let mut graph = DeclarationGraph::new();
        let ids = chain(&mut graph, &[Subtype::Alias, Subtype::Alias]);
        graph.link(ids[1], ids[0]).unwrap();

        assert_eq!(graph.walk(ids[0]).count(), 2);
        assert!(graph.has_cycle(ids[0]));
        assert_eq!(graph.fundamental_type(ids[0]), Target::Declaration(ids[1]));
    }

    #[test]
    fn objects_start_compound() {
        let mut graph = DeclarationGraph::new();
        let obj = named(&mut graph, Production::Object, None, "Person");
        let decl = named(&mut graph, Production::Declaration, None, "Age");
        assert_eq!(graph[obj].subtype(), Some(Subtype::Compound));
        assert_eq!(graph[decl].subtype(), None);
    }
}
