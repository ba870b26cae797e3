//! Reference resolution - turns built declaration trees into a committed document.
//!
//! Resolution runs in one forward pass over every declaration of the main
//! source and its transitively discovered includes:
//!
//! 1. Build: parse the main source, then includes breadth-first.
//! 2. Postprocess: resolve textual references, scope by scope.
//! 3. SetSubType: classify each declaration and propagate Simple status.
//! 4. Check metadata against the kinds declarations end up describing.
//! 5. Commit every declaration and index it by key.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::declaration::{
    check_metadata, DeclId, DeclarationGraph, DeclarationKind, Document, DocumentBuilder,
    FrontEnd, Production, Reference, SourceDocument, Subtype, Target,
};
use crate::error::SchemaError;
use crate::loader::{include_path, lexical_normalize, MemorySources, SourceProvider};
use crate::type_info::FundamentalKind;
use crate::types::{ResolveOptions, SourceLocation};

/// Build and resolve the document at `path` and everything it includes.
///
/// Includes are read through `sources`, relative to the including document,
/// and each distinct path is loaded once.
///
/// # Errors
///
/// Returns the first error raised while reading, building, resolving,
/// classifying or committing. In non-strict mode unresolved references are
/// left as placeholders instead.
pub fn resolve(
    path: &Path,
    front_end: &dyn FrontEnd,
    sources: &dyn SourceProvider,
    options: &ResolveOptions,
) -> Result<Document, SchemaError> {
    let mut graph = DeclarationGraph::new();
    let documents = build_documents(path, front_end, sources, options, &mut graph)?;
    finish(graph, documents, options)
}

/// Resolve a single in-memory source named `name`.
///
/// Includes are looked up next to `name` and fail with `FileNotFound`.
pub fn resolve_str(
    name: &str,
    text: &str,
    front_end: &dyn FrontEnd,
    options: &ResolveOptions,
) -> Result<Document, SchemaError> {
    let sources = MemorySources::new().with(name, text);
    resolve(Path::new(name), front_end, &sources, options)
}

fn build_documents(
    path: &Path,
    front_end: &dyn FrontEnd,
    sources: &dyn SourceProvider,
    options: &ResolveOptions,
    graph: &mut DeclarationGraph,
) -> Result<Vec<SourceDocument>, SchemaError> {
    let main = lexical_normalize(path);
    let mut seen: HashSet<PathBuf> = HashSet::from([main.clone()]);
    let mut queue: VecDeque<(PathBuf, bool)> = VecDeque::from([(main, false)]);
    let mut documents = Vec::new();

    while let Some((path, is_external)) = queue.pop_front() {
        let text = sources.read(&path)?;
        let name = path.display().to_string();

        let root = graph.new_declaration(
            DeclarationKind::Standard,
            Production::Root,
            None,
            SourceLocation::new(name.clone(), 0, 0),
            is_external,
        )?;
        let mut builder = DocumentBuilder::new(graph, &options.flags, root, is_external);
        front_end.parse(&name, &text, &mut builder)?;
        let includes = builder.finish()?;

        for include in includes {
            let resolved = include_path(&path, &include.path);
            if seen.insert(resolved.clone()) {
                info!(from = %name, include = %resolved.display(), "discovered include");
                queue.push_back((resolved, true));
            } else {
                debug!(from = %name, include = %resolved.display(), "include already loaded");
            }
        }

        documents.push(SourceDocument {
            path,
            root,
            is_external,
        });
    }

    Ok(documents)
}

fn finish(
    mut graph: DeclarationGraph,
    documents: Vec<SourceDocument>,
    options: &ResolveOptions,
) -> Result<Document, SchemaError> {
    resolve_references(&mut graph, &documents, options)?;
    classify(&mut graph)?;
    for id in graph.ids() {
        check_metadata(&graph, id)?;
    }
    let keys = commit_all(&mut graph)?;

    info!(
        sources = documents.len(),
        declarations = graph.len(),
        "document resolved"
    );
    Ok(Document::new(graph, documents, keys))
}

/// Resolve every textual reference in creation order.
pub(crate) fn resolve_references(
    graph: &mut DeclarationGraph,
    documents: &[SourceDocument],
    options: &ResolveOptions,
) -> Result<(), SchemaError> {
    let ids: Vec<DeclId> = graph.ids().collect();

    for &id in &ids {
        let Reference::Unresolved(text) = graph[id].reference().clone() else {
            continue;
        };

        match lookup(graph, documents, id, &text) {
            Some(Target::Declaration(target)) => {
                debug!(reference = %text, from = id.index(), to = target.index(), "resolved reference");
                graph.link(id, target)?;
            }
            Some(Target::Fundamental(kind)) => {
                debug!(reference = %text, from = id.index(), "resolved fundamental reference");
                graph
                    .get_mut(id)
                    .set_reference(Reference::Fundamental(kind))?;
            }
            None if options.strict => {
                return Err(SchemaError::UnresolvedReference {
                    reference: text,
                    location: graph[id].location().clone(),
                });
            }
            None => {
                warn!(
                    reference = %text,
                    location = %graph[id].location(),
                    "unresolved reference left as placeholder"
                );
                graph
                    .get_mut(id)
                    .set_reference(Reference::Placeholder(text))?;
            }
        }
    }

    for &id in &ids {
        if graph.has_cycle(id) {
            let node = &graph[id];
            return Err(SchemaError::CircularReference {
                key: node.name().unwrap_or("<root>").to_string(),
                location: node.location().clone(),
            });
        }
    }
    Ok(())
}

/// Find what `reference` names, as seen from `from`.
fn lookup(
    graph: &DeclarationGraph,
    documents: &[SourceDocument],
    from: DeclId,
    reference: &str,
) -> Option<Target> {
    let segments: Vec<&str> = reference.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }

    let mut scope = Some(from);
    let mut own_root = from;
    while let Some(current) = scope {
        if let Some(found) = descend(graph, current, &segments, from) {
            return Some(Target::Declaration(found));
        }
        own_root = current;
        scope = graph[current].parent();
    }

    for doc in documents.iter().filter(|d| d.is_external && d.root != own_root) {
        if let Some(found) = descend(graph, doc.root, &segments, from) {
            return Some(Target::Declaration(found));
        }
    }

    FundamentalKind::from_name(reference).map(Target::Fundamental)
}

/// Match `segments` against the children of `scope`, never matching `exclude`
/// on the first segment.
fn descend(
    graph: &DeclarationGraph,
    scope: DeclId,
    segments: &[&str],
    exclude: DeclId,
) -> Option<DeclId> {
    let (first, rest) = segments.split_first()?;
    let mut current = child_named(graph, scope, first, Some(exclude))?;
    for segment in rest {
        current = child_named(graph, current, segment, None)?;
    }
    Some(current)
}

fn child_named(
    graph: &DeclarationGraph,
    parent: DeclId,
    name: &str,
    exclude: Option<DeclId>,
) -> Option<DeclId> {
    graph[parent]
        .children()
        .iter()
        .copied()
        .find(|&child| Some(child) != exclude && graph[child].name() == Some(name))
}

/// Assign every declaration its subtype. Running it again changes nothing.
pub fn classify(graph: &mut DeclarationGraph) -> Result<(), SchemaError> {
    let ids: Vec<DeclId> = graph.ids().collect();
    let mut done = HashSet::new();
    for &id in &ids {
        classify_one(graph, id, &mut done)?;
    }

    for &id in &ids {
        let node = &graph[id];
        if node.production() != Production::Object || node.subtype() != Some(Subtype::Simple) {
            continue;
        }
        if let Some(&child) = node
            .children()
            .iter()
            .find(|&&c| graph[c].kind() != DeclarationKind::Attribute)
        {
            let name = node.name().unwrap_or_default();
            return Err(SchemaError::unsupported(
                format!("non-attribute member on simple object \"{}\"", name),
                graph[child].location(),
            ));
        }
    }
    Ok(())
}

fn classify_one(
    graph: &mut DeclarationGraph,
    id: DeclId,
    done: &mut HashSet<DeclId>,
) -> Result<(), SchemaError> {
    if !done.insert(id) {
        return Ok(());
    }

    let node = &graph[id];
    let subtype = match (node.production(), node.reference().clone()) {
        (Production::Root, _) => Subtype::Compound,
        (Production::Extension, _) => Subtype::Extension,
        (Production::Config, _) => Subtype::Config,
        (Production::Object, Reference::None) => Subtype::Compound,
        (Production::Object, Reference::Fundamental(_)) => Subtype::Simple,
        (Production::Object, Reference::Placeholder(_)) => Subtype::Alias,
        (Production::Object, Reference::Declaration(target)) => {
            classify_one(graph, target, done)?;
            let base = graph.resolve_augmentations(target);
            let base_node = &graph[base];
            // only a top-level compound object passes its compoundness on
            let top_level = base_node
                .parent()
                .is_some_and(|parent| graph[parent].production() == Production::Root);
            let compound = base_node.is_object()
                && base_node.subtype() == Some(Subtype::Compound)
                && top_level;
            let unknown = matches!(base_node.reference(), Reference::Placeholder(_));
            if compound || unknown {
                Subtype::Compound
            } else {
                Subtype::Simple
            }
        }
        (Production::Declaration, Reference::Fundamental(_)) => Subtype::Fundamental,
        (Production::Declaration, Reference::Placeholder(_)) => Subtype::Alias,
        (Production::Declaration, Reference::Declaration(target)) => {
            classify_one(graph, target, done)?;
            let node = &graph[id];
            if node.metadata().only_alias_tags() && node.explicit_arity().is_none() {
                Subtype::Alias
            } else {
                Subtype::Augmented
            }
        }
        (_, Reference::Unresolved(text)) => {
            return Err(SchemaError::UnresolvedReference {
                reference: text,
                location: node.location().clone(),
            })
        }
        (Production::Declaration, Reference::None) => {
            return Err(SchemaError::unsupported(
                "a declaration without a type",
                node.location(),
            ))
        }
    };

    // propagation may already have made this object simple
    let current = graph[id].subtype();
    let subtype = if current == Some(Subtype::Simple) && subtype == Subtype::Compound {
        Subtype::Simple
    } else {
        subtype
    };

    let node = graph.get_mut(id);
    node.set_subtype(subtype)?;
    node.set_new_type(!matches!(
        subtype,
        Subtype::Alias | Subtype::Extension | Subtype::Config
    ))?;

    if subtype == Subtype::Simple {
        propagate_simple(graph, id)?;
    }
    Ok(())
}

/// Breadth-first over `referenced_by`: compound referrers become simple.
fn propagate_simple(graph: &mut DeclarationGraph, start: DeclId) -> Result<(), SchemaError> {
    let mut visited = HashSet::from([start]);
    let mut queue: VecDeque<DeclId> = graph[start].referenced_by().iter().copied().collect();

    while let Some(id) = queue.pop_front() {
        if !visited.insert(id) {
            continue;
        }
        let node = &graph[id];
        if node.production() == Production::Object && node.subtype() == Some(Subtype::Compound) {
            debug!(declaration = id.index(), from = start.index(), "propagated simple subtype");
            graph.get_mut(id).set_subtype(Subtype::Simple)?;
        }
        queue.extend(graph[id].referenced_by().iter().copied());
    }
    Ok(())
}

/// Commit every declaration; keys of named declarations must be unique.
fn commit_all(graph: &mut DeclarationGraph) -> Result<BTreeMap<String, DeclId>, SchemaError> {
    let mut keys: BTreeMap<String, DeclId> = BTreeMap::new();
    let ids: Vec<DeclId> = graph.ids().collect();

    for id in ids {
        let key = graph.commit(id)?.to_string();
        let node = &graph[id];
        if node.name().is_none() || node.production() == Production::Root {
            continue;
        }
        if let Some(&first) = keys.get(&key) {
            return Err(SchemaError::DuplicateKey {
                key,
                first: graph[first].location().clone(),
                location: node.location().clone(),
            });
        }
        keys.insert(key, id);
    }
    Ok(keys)
}
