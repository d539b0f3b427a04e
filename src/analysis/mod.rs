//! Whole-program analysis of a Dart package.
//!
//! This module turns parsed compilation units into a resolvable snapshot:
//! - Syntactic facts (directives, declarations, annotations as written)
//! - Libraries formed from `part` / `part of` directives
//! - Export namespaces and import scopes
//! - Transitive supertype sets
//! - Constant evaluation of annotations
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────┐     ┌─────────────────┐
//! │ .dart files     │────▶│ parser       │────▶│ CompilationUnit │
//! └─────────────────┘     └──────────────┘     └─────────────────┘
//!                                                      │
//!                                                      ▼
//!                         ┌──────────────┐     ┌─────────────────┐
//!                         │ SymbolResolver│◀───│ AnalysisContext │
//!                         │ (crate::resolve)   │ (immutable)     │
//!                         └──────────────┘     └─────────────────┘
//! ```
//!
//! Consumers depend on the [`SymbolResolutionProvider`] trait rather than
//! on [`AnalysisContext`] directly.

mod constant;
mod context;
mod facts;
mod traits;

pub use constant::{Annotation, AnnotationField, ConstValue};
pub use context::{AnalysisContext, BuildOptions};
pub(crate) use context::compile_globs;
pub use facts::{
    AnnotationSyntax, Argument, ClassDecl, Combinator, CompilationUnit, ConstExpr,
    ConstructorDecl, Declaration, DeclarationKind, Directive, FieldDecl, Parameter,
    ParameterBinding, ParameterKind, Span, TypeRef, VariableDecl,
};
pub use traits::{ElementId, LibraryElement, SymbolResolutionProvider};
