//! Core traits for whole-program symbol resolution.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::{Annotation, AnnotationSyntax, CompilationUnit, Declaration, TypeRef};
use crate::parser::ParseError;

/// Identity of a top-level declaration: file index plus declaration index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId {
    pub file: usize,
    pub index: usize,
}

/// A library: a defining unit plus the parts it includes.
#[derive(Debug, Clone)]
pub struct LibraryElement {
    pub id: usize,
    /// Path of the defining unit.
    pub path: PathBuf,
    /// `package:` URI if the library lives under the package's `lib/`.
    pub uri: Option<String>,
    /// File indices: the defining unit first, then parts in `part` order.
    pub units: Vec<usize>,
    /// Set when the library is structurally broken (e.g. a missing part).
    pub error: Option<String>,
}

/// Whole-program symbol resolution over one immutable snapshot.
///
/// Implementations must be safe to share across worker threads: every
/// query takes `&self` and observes the same state.
pub trait SymbolResolutionProvider: Send + Sync {
    /// Analysis roots (package directories) covering the analyzed directory.
    fn context_roots(&self) -> &[PathBuf];

    /// All analyzed source files in enumeration order.
    fn files(&self) -> &[PathBuf];

    /// Path of the file with the given index.
    fn file_path(&self, file: usize) -> &Path;

    /// Whether the file is a part merged into another library.
    fn is_fragment(&self, path: &Path) -> bool;

    /// Parsed unit of a file, or the error that prevented parsing it.
    fn unit(&self, file: usize) -> Result<&CompilationUnit, &ParseError>;

    /// Library whose defining unit is at `path`.
    fn library_by_path(&self, path: &Path) -> Option<&LibraryElement>;

    /// Library addressed by an import URI such as `package:flutter/widgets.dart`.
    fn library_by_uri(&self, uri: &str) -> Option<&LibraryElement>;

    /// Look a name up in a library's export namespace.
    fn export_lookup(&self, library: &LibraryElement, name: &str) -> Option<ElementId>;

    fn declaration(&self, id: ElementId) -> Option<&Declaration>;

    /// Resolve a type reference in the import scope of `file`.
    ///
    /// Type aliases are followed to the declaration they name; a cyclic
    /// alias chain resolves to nothing.
    fn resolve_type(&self, file: usize, ty: &TypeRef) -> Option<ElementId>;

    /// Transitive supertypes of a class or mixin. External types are absent.
    fn supertypes(&self, id: ElementId) -> BTreeSet<ElementId>;

    /// Evaluate an annotation attached to a declaration in `file`.
    fn evaluate_annotation(&self, file: usize, annotation: &AnnotationSyntax) -> Annotation;
}
