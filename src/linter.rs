//! Document linting - static analysis of JSON declaration documents.
//!
//! Resolves each document non-strictly and reports:
//! - E001: references that stayed unresolved placeholders
//! - E002: documents that cannot be read, built or resolved
//! - E003: top-level declarations that cannot be lowered to a type
//! - W001: definitions nothing references
//! - W002: aliases of aliases

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::declaration::{DeclId, Declaration, Document, Reference, Subtype};
use crate::error::SchemaError;
use crate::loader::load_document;
use crate::types::ResolveOptions;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub file: PathBuf,
    /// Dotted key of the declaration (e.g. "Person.age"), or "/" for the document.
    pub path: String,
    pub message: String,
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Lint a file or directory.
///
/// If path is a directory, recursively finds all .json files.
/// If `strict` is true, warnings are treated as errors.
/// Returns aggregated results for all files.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let files = collect_documents(path);
    let mut results = Vec::new();
    let mut total_errors = 0;
    let mut total_warnings = 0;

    for file in &files {
        let file_result = lint_file(file, path);
        total_errors += count(&file_result.diagnostics, Severity::Error);
        total_warnings += count(&file_result.diagnostics, Severity::Warning);
        results.push(file_result);
    }

    let failed = results
        .iter()
        .filter(|r| {
            if strict {
                r.status != FileStatus::Ok
            } else {
                r.status == FileStatus::Error
            }
        })
        .count();

    LintResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors: total_errors,
        warnings: total_warnings,
        results,
    }
}

fn count(diagnostics: &[Diagnostic], severity: Severity) -> usize {
    diagnostics.iter().filter(|d| d.severity == severity).count()
}

/// Lint a single declaration document and its includes.
pub fn lint_file(file: &Path, base_path: &Path) -> FileResult {
    let diagnostics = match load_document(file, &ResolveOptions::new()) {
        Ok(document) => lint_document(&document, file),
        Err(e) => vec![Diagnostic {
            severity: Severity::Error,
            code: "E002".to_string(),
            file: file.to_path_buf(),
            path: "/".to_string(),
            message: format!("cannot resolve document: {}", e),
        }],
    };

    let status = if count(&diagnostics, Severity::Error) > 0 {
        FileStatus::Error
    } else if count(&diagnostics, Severity::Warning) > 0 {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    };

    FileResult {
        file: file.strip_prefix(base_path).unwrap_or(file).to_path_buf(),
        status,
        diagnostics,
    }
}

/// Check the declarations of a resolved document's main source.
///
/// Declarations that came from includes are left to their own files.
pub fn lint_document(document: &Document, file: &Path) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let root = document.root();
    let diagnostic = |severity, code: &str, node: &Declaration, message: String| Diagnostic {
        severity,
        code: code.to_string(),
        file: file.to_path_buf(),
        path: node.key().unwrap_or("/").to_string(),
        message,
    };

    for (id, node) in document.declarations() {
        if node.is_external() || id == root {
            continue;
        }

        if let Reference::Placeholder(text) = node.reference() {
            diagnostics.push(diagnostic(
                Severity::Error,
                "E001",
                node,
                format!("unresolved reference \"{}\"", text),
            ));
        }

        if node.parent() == Some(root) && node.subtype() != Some(Subtype::Extension) {
            match document.type_info(id) {
                Ok(_) | Err(SchemaError::UnresolvedReference { .. }) => {}
                Err(e) => diagnostics.push(diagnostic(
                    Severity::Error,
                    "E003",
                    node,
                    format!("cannot build type: {}", e),
                )),
            }
        }

        if node.kind() == crate::declaration::DeclarationKind::Definition
            && node.referenced_by().is_empty()
        {
            diagnostics.push(diagnostic(
                Severity::Warning,
                "W001",
                node,
                "definition is never referenced".to_string(),
            ));
        }

        if let Some(target) = alias_target(document, node) {
            diagnostics.push(diagnostic(
                Severity::Warning,
                "W002",
                node,
                format!(
                    "alias of alias \"{}\"; reference its target directly",
                    document[target].key().unwrap_or_default()
                ),
            ));
        }
    }

    diagnostics
}

/// The referenced declaration when both ends are aliases.
fn alias_target(document: &Document, node: &Declaration) -> Option<DeclId> {
    if node.subtype() != Some(Subtype::Alias) {
        return None;
    }
    match node.reference() {
        Reference::Declaration(target) if document[*target].subtype() == Some(Subtype::Alias) => {
            Some(*target)
        }
        _ => None,
    }
}

/// Collect all .json files in a path (file or directory).
fn collect_documents(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if path.extension().map(|e| e == "json").unwrap_or(false) {
            files.push(path);
        }
    }
}
