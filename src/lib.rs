//! widget-catalog - a widget catalog generator for the Flutter SDK.
//!
//! The tool statically analyzes the Dart sources of a framework package,
//! finds every public class that transitively extends a root type
//! (`Widget` by default) and writes a sorted JSON catalog of them.
//!
//! # Architecture
//!
//! - `parser`: Tree-sitter based Dart declaration extraction
//! - `analysis`: Immutable whole-program snapshot (libraries, exports,
//!   scopes, supertypes, constant annotations)
//! - `index`: Library-unit enumeration
//! - `resolve`: Library resolution into class records
//! - `select`: Subtype selection against the root type
//! - `extract` / `docs`: Catalog entries and doc-comment condensation
//! - `report`: Catalog file and console output
//! - `pipeline`: The stages wired together
//! - `config` / `version`: Config file and SDK version lookup

pub mod analysis;
pub mod cli;
pub mod config;
pub mod docs;
pub mod error;
pub mod extract;
pub mod index;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod resolve;
pub mod select;
pub mod version;

pub use analysis::{AnalysisContext, BuildOptions, ElementId, SymbolResolutionProvider};
pub use config::CatalogConfig;
pub use error::{CatalogError, Result};
pub use extract::{CatalogEntry, MetadataExtractor};
pub use index::{LibraryUnit, SourceIndex};
pub use pipeline::{CatalogRun, Runner};
pub use report::{Catalog, CatalogWriter, WriteSummary};
pub use resolve::{ResolvedClass, SymbolResolver};
pub use select::HierarchyFilter;
pub use version::{FixedVersion, FlutterVersionFile, VersionInfo, VersionProvider};
