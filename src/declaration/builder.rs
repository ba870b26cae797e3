//! Visit callbacks that turn a parsed source into declarations.

use tracing::trace;

use super::{DeclId, DeclarationGraph, DeclarationKind, ExtensionCall, Production, Reference};
use crate::arity::Arity;
use crate::error::SchemaError;
use crate::metadata::{MetadataItem, MetadataValue};
use crate::types::{FeatureFlags, SourceLocation};

/// A parser front end: reads source text and drives a [`DocumentBuilder`].
pub trait FrontEnd {
    /// Visit `text` (named `source` in locations), calling builder callbacks in order.
    fn parse(
        &self,
        source: &str,
        text: &str,
        builder: &mut DocumentBuilder<'_>,
    ) -> Result<(), SchemaError>;
}

impl<F> FrontEnd for F
where
    F: Fn(&str, &str, &mut DocumentBuilder<'_>) -> Result<(), SchemaError>,
{
    fn parse(
        &self,
        source: &str,
        text: &str,
        builder: &mut DocumentBuilder<'_>,
    ) -> Result<(), SchemaError> {
        self(source, text, builder)
    }
}

/// An `include` statement seen while building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeRequest {
    pub path: String,
    pub location: SourceLocation,
}

/// Builds the declaration tree of one source document.
///
/// Metadata, arity and string literals apply to the current declaration: the
/// most recently created one, or the object just closed by `end_object`.
pub struct DocumentBuilder<'g> {
    graph: &'g mut DeclarationGraph,
    flags: &'g FeatureFlags,
    root: DeclId,
    scopes: Vec<DeclId>,
    current: DeclId,
    includes: Vec<IncludeRequest>,
    is_external: bool,
}

impl<'g> DocumentBuilder<'g> {
    pub(crate) fn new(
        graph: &'g mut DeclarationGraph,
        flags: &'g FeatureFlags,
        root: DeclId,
        is_external: bool,
    ) -> Self {
        Self {
            graph,
            flags,
            root,
            scopes: vec![root],
            current: root,
            includes: Vec::new(),
            is_external,
        }
    }

    pub fn root(&self) -> DeclId {
        self.root
    }

    /// Declaration that metadata and arity currently apply to.
    pub fn current(&self) -> DeclId {
        self.current
    }

    fn scope(&self) -> DeclId {
        self.scopes.last().copied().unwrap_or(self.root)
    }

    fn check_kind(&self, kind: DeclarationKind, location: &SourceLocation) -> Result<(), SchemaError> {
        match kind {
            DeclarationKind::Attribute if !self.flags.attributes => {
                Err(SchemaError::unsupported("attribute declarations", location))
            }
            DeclarationKind::Definition if !self.flags.definitions => {
                Err(SchemaError::unsupported("definition declarations", location))
            }
            _ => Ok(()),
        }
    }

    fn create(
        &mut self,
        name: Option<&str>,
        kind: DeclarationKind,
        production: Production,
        reference: Option<&str>,
        location: SourceLocation,
    ) -> Result<DeclId, SchemaError> {
        let parent = self.scope();
        let id = self
            .graph
            .new_declaration(kind, production, Some(parent), location, self.is_external)?;
        let node = self.graph.get_mut(id);
        if let Some(name) = name {
            node.set_name(name)?;
        }
        if let Some(reference) = reference {
            node.set_reference(Reference::Unresolved(reference.to_string()))?;
        }
        self.current = id;
        Ok(id)
    }

    /// Open an object declaration; following declarations become its children.
    ///
    /// `base` is the type the object derives from, if any.
    pub fn begin_object(
        &mut self,
        name: &str,
        kind: DeclarationKind,
        base: Option<&str>,
        location: SourceLocation,
    ) -> Result<DeclId, SchemaError> {
        trace!(name, ?kind, base, "begin_object");
        if !self.flags.custom_types {
            return Err(SchemaError::unsupported("object declarations", &location));
        }
        self.check_kind(kind, &location)?;
        let id = self.create(Some(name), kind, Production::Object, base, location)?;
        self.scopes.push(id);
        Ok(id)
    }

    /// Close the innermost object; it becomes the current declaration.
    pub fn end_object(&mut self) -> Result<DeclId, SchemaError> {
        trace!("end_object");
        if self.scopes.len() <= 1 {
            let location = self.graph[self.root].location().clone();
            return Err(SchemaError::unsupported("end_object without begin_object", &location));
        }
        let id = self.scope();
        self.scopes.pop();
        self.current = id;
        Ok(id)
    }

    /// A leaf declaration referring to `reference`.
    pub fn declaration(
        &mut self,
        name: &str,
        kind: DeclarationKind,
        reference: &str,
        location: SourceLocation,
    ) -> Result<DeclId, SchemaError> {
        trace!(name, ?kind, reference, "declaration");
        self.check_kind(kind, &location)?;
        self.create(Some(name), kind, Production::Declaration, Some(reference), location)
    }

    /// An extension invocation; literals and metadata that follow are its arguments.
    pub fn extension(&mut self, name: &str, location: SourceLocation) -> Result<DeclId, SchemaError> {
        trace!(name, "extension");
        if !self.flags.allows_extension(name) {
            return Err(SchemaError::unsupported(
                format!("extension \"{}\"", name),
                &location,
            ));
        }
        let id = self.create(
            None,
            DeclarationKind::Standard,
            Production::Extension,
            None,
            location,
        )?;
        self.graph.get_mut(id).set_extension(ExtensionCall {
            name: name.to_string(),
            ..ExtensionCall::default()
        })?;
        Ok(id)
    }

    /// A configuration value of type `reference`.
    pub fn config(
        &mut self,
        name: &str,
        reference: &str,
        location: SourceLocation,
    ) -> Result<DeclId, SchemaError> {
        trace!(name, reference, "config");
        self.create(
            Some(name),
            DeclarationKind::Standard,
            Production::Config,
            Some(reference),
            location,
        )
    }

    /// Attach a metadata tag (a keyword argument for extensions).
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::DuplicateMetadata` if the tag is already attached.
    pub fn metadata(
        &mut self,
        tag: &str,
        value: MetadataValue,
        location: SourceLocation,
    ) -> Result<(), SchemaError> {
        trace!(tag, %value, "metadata");
        let node = self.graph.get_mut(self.current);
        if node.production() == Production::Extension {
            return node.add_keyword(tag, value);
        }
        node.add_metadata(MetadataItem {
            tag: tag.to_string(),
            value,
            location,
        })
    }

    /// Set the arity of the current declaration from shorthand text.
    pub fn arity(&mut self, text: &str, location: SourceLocation) -> Result<(), SchemaError> {
        trace!(text, "arity");
        let arity = Arity::parse_at(text, &location)?;
        let node = self.graph.get_mut(self.current);
        if node.production() == Production::Root {
            return Err(SchemaError::unsupported("arity on the document", &location));
        }
        node.set_arity(arity)
    }

    /// A positional string argument for the current extension.
    pub fn string_literal(&mut self, value: &str) -> Result<(), SchemaError> {
        trace!(value, "string_literal");
        self.graph
            .get_mut(self.current)
            .add_positional(MetadataValue::String(value.to_string()))
    }

    /// Record an include; it is loaded after this document is built.
    pub fn include(&mut self, path: &str, location: SourceLocation) {
        trace!(path, "include");
        self.includes.push(IncludeRequest {
            path: path.to_string(),
            location,
        });
    }

    /// Finish the document, returning its include requests in source order.
    pub(crate) fn finish(self) -> Result<Vec<IncludeRequest>, SchemaError> {
        if self.scopes.len() > 1 {
            let open = self.scope();
            return Err(SchemaError::unsupported(
                "object without end_object",
                self.graph[open].location(),
            ));
        }
        Ok(self.includes)
    }
}
