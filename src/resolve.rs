//! Library resolution into class records.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use rayon::prelude::*;
use tracing::debug;

use crate::analysis::{
    Annotation, DeclarationKind, ElementId, LibraryElement, SymbolResolutionProvider,
};
use crate::error::{CatalogError, Result};
use crate::index::LibraryUnit;

/// The declared superclass of a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupertypeRef {
    /// Simple name without prefix or type arguments. For an aliased
    /// supertype this is the name of the aliased declaration.
    pub name: String,
    /// The resolved declaration, if it lives inside the analyzed tree.
    pub element: Option<ElementId>,
}

/// A fully resolved class or mixin declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedClass {
    pub id: ElementId,
    pub name: String,
    pub library_path: PathBuf,
    pub library_uri: Option<String>,
    /// `extends` clause; the superclass of a mixin application.
    pub supertype: Option<SupertypeRef>,
    pub supertypes: BTreeSet<ElementId>,
    pub is_abstract: bool,
    pub is_mixin: bool,
    pub annotations: Vec<Annotation>,
    pub documentation: Option<String>,
}

/// Resolves libraries against one shared snapshot.
pub struct SymbolResolver<'a, P: SymbolResolutionProvider + ?Sized> {
    provider: &'a P,
}

impl<'a, P: SymbolResolutionProvider + ?Sized> SymbolResolver<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    /// Resolve `type_name` as exported by the library at `uri`.
    pub fn resolve_root_type(&self, uri: &str, type_name: &str) -> Result<ResolvedClass> {
        let library = self
            .provider
            .library_by_uri(uri)
            .ok_or_else(|| CatalogError::resolution(uri, "library not found"))?;
        self.check_library(library)?;

        let id = self.provider.export_lookup(library, type_name).ok_or_else(|| {
            CatalogError::resolution(uri, format!("'{}' is not exported", type_name))
        })?;
        let decl = self
            .provider
            .declaration(id)
            .ok_or_else(|| CatalogError::resolution(uri, format!("'{}' has no declaration", type_name)))?;
        if !matches!(decl.kind, DeclarationKind::Class(_)) {
            return Err(CatalogError::resolution(
                uri,
                format!("'{}' is a {}, not a class", type_name, decl.kind),
            ));
        }

        let owner = self.owning_library(id.file).unwrap_or(library);
        self.resolve_element(owner, id).ok_or_else(|| {
            CatalogError::resolution(uri, format!("'{}' could not be resolved", type_name))
        })
    }

    /// Resolve every class and mixin of the library defined at `path`:
    /// the defining unit first, then each part in `part` order.
    pub fn resolve_library(&self, path: &Path) -> Result<Vec<ResolvedClass>> {
        let library = self
            .provider
            .library_by_path(path)
            .ok_or_else(|| CatalogError::resolution(path, "not a library unit"))?;
        self.check_library(library)?;

        let mut classes = Vec::new();
        for &file in &library.units {
            let unit = self.provider.unit(file).map_err(|e| {
                CatalogError::resolution(self.provider.file_path(file), e.to_string())
            })?;
            for index in 0..unit.declarations.len() {
                if let Some(class) = self.resolve_element(library, ElementId { file, index }) {
                    classes.push(class);
                }
            }
        }

        debug!(library = %path.display(), classes = classes.len(), "resolved library");
        Ok(classes)
    }

    /// Resolve all units on the current rayon pool, keeping enumeration order.
    /// The first failure aborts the run.
    pub fn resolve_all(
        &self,
        units: &[LibraryUnit],
        progress: Option<&ProgressBar>,
    ) -> Result<Vec<Vec<ResolvedClass>>> {
        units
            .par_iter()
            .map(|unit| {
                let classes = self.resolve_library(&unit.path);
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                classes
            })
            .collect()
    }

    fn check_library(&self, library: &LibraryElement) -> Result<()> {
        match &library.error {
            Some(message) => Err(CatalogError::resolution(&library.path, message.clone())),
            None => Ok(()),
        }
    }

    fn owning_library(&self, file: usize) -> Option<&'a LibraryElement> {
        let provider: &'a P = self.provider;
        provider
            .library_by_path(provider.file_path(file))
            .or_else(|| {
                provider
                    .files()
                    .iter()
                    .filter_map(|p| provider.library_by_path(p))
                    .find(|lib| lib.units.contains(&file))
            })
    }

    fn resolve_element(&self, library: &LibraryElement, id: ElementId) -> Option<ResolvedClass> {
        let decl = self.provider.declaration(id)?;
        let (class, is_mixin) = match &decl.kind {
            DeclarationKind::Class(class) => (class, false),
            DeclarationKind::Mixin(class) => (class, true),
            _ => return None,
        };

        let supertype = class.extends.as_ref().map(|ty| {
            let element = self.provider.resolve_type(id.file, ty);
            let name = element
                .and_then(|e| self.provider.declaration(e))
                .map_or_else(|| ty.name.clone(), |d| d.name.clone());
            SupertypeRef { name, element }
        });

        Some(ResolvedClass {
            id,
            name: decl.name.clone(),
            library_path: library.path.clone(),
            library_uri: library.uri.clone(),
            supertype,
            supertypes: self.provider.supertypes(id),
            is_abstract: class.is_abstract,
            is_mixin,
            annotations: decl
                .annotations
                .iter()
                .map(|a| self.provider.evaluate_annotation(id.file, a))
                .collect(),
            documentation: decl.doc.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisContext, BuildOptions};
    use crate::index::SourceIndex;
    use std::fs;
    use tempfile::TempDir;

    fn package(files: &[(&str, &str)]) -> (TempDir, AnalysisContext) {
        let temp = TempDir::new().unwrap();
        let write = |rel: &str, content: &str| {
            let path = temp.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        };
        write("pubspec.yaml", "name: flutter\n");
        for (rel, content) in files {
            write(rel, content);
        }
        let ctx = AnalysisContext::build(temp.path().join("lib"), &BuildOptions::default()).unwrap();
        (temp, ctx)
    }

    #[test]
    fn test_resolve_root_type_through_exports() {
        let (_temp, ctx) = package(&[
            ("lib/widgets.dart", "export 'src/widgets/framework.dart' hide State;"),
            (
                "lib/src/widgets/framework.dart",
                "/// Describes part of a UI.\nabstract class Widget {}\nabstract class State {}\nmixin Diag {}",
            ),
        ]);
        let resolver = SymbolResolver::new(&ctx);

        let widget = resolver
            .resolve_root_type("package:flutter/widgets.dart", "Widget")
            .unwrap();
        assert_eq!(widget.name, "Widget");
        assert!(widget.is_abstract);
        assert_eq!(
            widget.library_uri.as_deref(),
            Some("package:flutter/src/widgets/framework.dart")
        );
        assert_eq!(widget.documentation.as_deref(), Some("/// Describes part of a UI."));

        let hidden = resolver.resolve_root_type("package:flutter/widgets.dart", "State");
        assert!(matches!(hidden, Err(CatalogError::Resolution { .. })));

        let mixin = resolver.resolve_root_type("package:flutter/widgets.dart", "Diag");
        assert!(mixin.unwrap_err().to_string().contains("not a class"));

        let unknown = resolver.resolve_root_type("package:flutter/material.dart", "Widget");
        assert!(unknown.unwrap_err().to_string().contains("library not found"));
    }

    #[test]
    fn test_resolve_library_includes_parts_in_order() {
        let (_temp, ctx) = package(&[
            (
                "lib/src/basic.dart",
                "part 'basic_flex.dart';\nclass Padding extends Widget {}\nabstract class Widget {}",
            ),
            (
                "lib/src/basic_flex.dart",
                "part of 'basic.dart';\nclass Row extends Flex {}\nclass Flex = Widget with FlexMixin;\nmixin FlexMixin {}",
            ),
        ]);
        let resolver = SymbolResolver::new(&ctx);
        let units = SourceIndex::new(&ctx).list_library_units().unwrap();
        assert_eq!(units.len(), 1);

        let classes = resolver.resolve_library(&units[0].path).unwrap();
        let names: Vec<_> = classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Padding", "Widget", "Row", "Flex", "FlexMixin"]);

        let widget = classes[1].id;
        let row = &classes[2];
        assert_eq!(row.supertype.as_ref().unwrap().name, "Flex");
        assert!(row.supertypes.contains(&widget));
        assert_eq!(classes[3].supertype.as_ref().unwrap().name, "Widget");
        assert!(classes[4].is_mixin);
        assert!(classes[1].supertype.is_none());
    }

    #[test]
    fn test_aliased_supertype_names_the_target() {
        let (_temp, ctx) = package(&[(
            "lib/src/alias.dart",
            "abstract class Widget {}\ntypedef WidgetAlias = Widget;\nclass ViaAlias extends WidgetAlias {}\nclass Plain extends Unknown {}",
        )]);
        let resolver = SymbolResolver::new(&ctx);
        let units = SourceIndex::new(&ctx).list_library_units().unwrap();
        let classes = resolver.resolve_library(&units[0].path).unwrap();

        let widget = classes[0].id;
        let via = classes.iter().find(|c| c.name == "ViaAlias").unwrap();
        let supertype = via.supertype.as_ref().unwrap();
        assert_eq!(supertype.name, "Widget");
        assert_eq!(supertype.element, Some(widget));
        assert!(via.supertypes.contains(&widget));

        let plain = classes.iter().find(|c| c.name == "Plain").unwrap();
        let supertype = plain.supertype.as_ref().unwrap();
        assert_eq!(supertype.name, "Unknown");
        assert_eq!(supertype.element, None);
    }

    #[test]
    fn test_syntax_error_is_resolution_error() {
        let (_temp, ctx) = package(&[("lib/broken.dart", "class Broken extends {")]);
        let resolver = SymbolResolver::new(&ctx);
        let units = SourceIndex::new(&ctx).list_library_units().unwrap();

        let err = resolver.resolve_library(&units[0].path).unwrap_err();
        match err {
            CatalogError::Resolution { path, .. } => assert!(path.ends_with("broken.dart")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_missing_part_is_resolution_error() {
        let (_temp, ctx) = package(&[("lib/a.dart", "part 'gone.dart';\nclass A {}")]);
        let resolver = SymbolResolver::new(&ctx);
        let units = SourceIndex::new(&ctx).list_library_units().unwrap();
        let err = resolver.resolve_library(&units[0].path).unwrap_err();
        assert!(err.to_string().contains("gone.dart"));
    }

    #[test]
    fn test_resolve_all_keeps_order_and_fails_fast() {
        let (_temp, ctx) = package(&[
            ("lib/a.dart", "class A {}"),
            ("lib/b.dart", "class B {}\nclass C {}"),
        ]);
        let resolver = SymbolResolver::new(&ctx);
        let units = SourceIndex::new(&ctx).list_library_units().unwrap();
        let resolved = resolver.resolve_all(&units, None).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0][0].name, "A");
        assert_eq!(resolved[1].len(), 2);

        let (_temp, ctx) = package(&[
            ("lib/a.dart", "class A {}"),
            ("lib/b.dart", "class B {"),
        ]);
        let resolver = SymbolResolver::new(&ctx);
        let units = SourceIndex::new(&ctx).list_library_units().unwrap();
        assert!(resolver.resolve_all(&units, None).is_err());
    }
}
