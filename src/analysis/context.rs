//! Analysis context: an immutable, whole-program snapshot of a Dart package.
//!
//! The AnalysisContext provides:
//! - Analysis-root discovery from `pubspec.yaml` files
//! - Parallel parsing of every `.dart` file under the analyzed directory
//! - Library formation from `part` / `part of` directives
//! - Export namespaces and per-library import scopes
//! - Precomputed transitive supertype sets for every class and mixin
//!
//! Everything is computed in [`AnalysisContext::build`]; afterwards the
//! context is only read, so a shared reference can be handed to any number
//! of worker threads.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use serde::Deserialize;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use super::constant::ConstEvaluator;
use super::{
    Annotation, AnnotationSyntax, Combinator, CompilationUnit, Declaration, Directive, ElementId,
    LibraryElement, SymbolResolutionProvider, TypeRef,
};
use crate::error::{CatalogError, Result};
use crate::parser::{parse_unit, ParseError};

const PUBSPEC: &str = "pubspec.yaml";
const ANALYSIS_OPTIONS: &str = "analysis_options.yaml";

/// Options for building an [`AnalysisContext`].
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Glob patterns, relative to the analyzed directory, of files to skip.
    pub excluded_paths: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Pubspec {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct AnalysisOptions {
    #[serde(default)]
    analyzer: Option<AnalyzerOptions>,
}

#[derive(Debug, Default, Deserialize)]
struct AnalyzerOptions {
    #[serde(default)]
    exclude: Vec<String>,
}

/// The package owning the analyzed directory.
#[derive(Debug, Clone)]
struct Package {
    name: String,
    lib_dir: PathBuf,
}

impl Package {
    fn uri_for(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.lib_dir).ok()?;
        let segments: Vec<_> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(format!("package:{}/{}", self.name, segments.join("/")))
    }
}

type Namespace = BTreeMap<String, ElementId>;

/// Names visible inside one library.
#[derive(Debug, Default)]
struct Scope {
    local: Namespace,
    imported: Namespace,
    prefixed: HashMap<String, Namespace>,
}

impl Scope {
    fn lookup(&self, prefix: Option<&str>, name: &str) -> Option<ElementId> {
        match prefix {
            Some(prefix) => self.prefixed.get(prefix)?.get(name).copied(),
            None => self
                .local
                .get(name)
                .or_else(|| self.imported.get(name))
                .copied(),
        }
    }
}

/// Immutable analysis snapshot for one package directory.
pub struct AnalysisContext {
    roots: Vec<PathBuf>,
    package: Option<Package>,
    paths: Vec<PathBuf>,
    units: Vec<std::result::Result<CompilationUnit, ParseError>>,
    file_index: HashMap<PathBuf, usize>,
    libraries: Vec<LibraryElement>,
    library_by_path: HashMap<PathBuf, usize>,
    library_of_file: HashMap<usize, usize>,
    exports: Vec<Namespace>,
    scopes: Vec<Scope>,
    supertypes: HashMap<ElementId, BTreeSet<ElementId>>,
}

impl AnalysisContext {
    /// Build the snapshot for `dir`.
    ///
    /// Parse errors do not fail the build; they are stored per file and
    /// reported when the owning library is resolved.
    pub fn build<P: AsRef<Path>>(dir: P, options: &BuildOptions) -> Result<Self> {
        let dir = dir.as_ref();
        let dir = fs::canonicalize(dir).map_err(|e| CatalogError::io(dir, e))?;

        let roots = discover_roots(&dir);
        let package = match roots.first() {
            Some(root) => Some(read_package(root)?),
            None => None,
        };
        debug!(roots = roots.len(), package = ?package.as_ref().map(|p| &p.name), "analysis roots");

        let excluded = compile_globs(&options.excluded_paths)?;
        let package_excluded = match roots.first() {
            Some(root) => read_analyzer_excludes(root),
            None => GlobSet::empty(),
        };
        let paths = enumerate_files(&dir, &excluded, roots.first(), &package_excluded)?;

        let units: Vec<_> = paths
            .par_iter()
            .map(|path| {
                let bytes = fs::read(path).map_err(|e| CatalogError::io(path, e))?;
                let unit = parse_unit(&String::from_utf8_lossy(&bytes));
                if let Err(err) = &unit {
                    debug!(file = %path.display(), error = %err, "parse failed");
                }
                Ok(unit)
            })
            .collect::<Result<Vec<_>>>()?;

        let file_index = paths
            .iter()
            .enumerate()
            .map(|(i, p)| (p.clone(), i))
            .collect();

        let mut ctx = Self {
            roots,
            package,
            paths,
            units,
            file_index,
            libraries: Vec::new(),
            library_by_path: HashMap::new(),
            library_of_file: HashMap::new(),
            exports: Vec::new(),
            scopes: Vec::new(),
            supertypes: HashMap::new(),
        };
        ctx.form_libraries();
        ctx.compute_exports();
        ctx.compute_scopes();
        ctx.compute_supertypes();

        debug!(
            files = ctx.paths.len(),
            libraries = ctx.libraries.len(),
            classes = ctx.supertypes.len(),
            "analysis context built"
        );
        Ok(ctx)
    }

    /// All libraries in enumeration order.
    pub fn libraries(&self) -> &[LibraryElement] {
        &self.libraries
    }

    /// Look a name up in the scope of the library that owns `file`.
    pub(crate) fn lookup(&self, file: usize, prefix: Option<&str>, name: &str) -> Option<ElementId> {
        let library = *self.library_of_file.get(&file)?;
        self.scopes[library].lookup(prefix, name)
    }

    /// Resolve a directive URI relative to the file containing it.
    fn resolve_uri(&self, from: &Path, uri: &str) -> Option<PathBuf> {
        if let Some(rest) = uri.strip_prefix("package:") {
            let package = self.package.as_ref()?;
            let (name, path) = rest.split_once('/')?;
            return (name == package.name).then(|| normalize(&package.lib_dir.join(path)));
        }
        if uri.contains(':') {
            // dart:, other schemes and absolute URLs are external.
            return None;
        }
        Some(normalize(&from.parent()?.join(uri)))
    }

    fn library_for_uri(&self, from_file: usize, uri: &str) -> Option<usize> {
        let path = self.resolve_uri(&self.paths[from_file], uri)?;
        self.library_by_path.get(&path).copied()
    }

    fn form_libraries(&mut self) {
        for (file, path) in self.paths.iter().enumerate() {
            let unit = self.units[file].as_ref().ok();
            if unit.is_some_and(CompilationUnit::is_part) {
                continue;
            }

            let mut library = LibraryElement {
                id: self.libraries.len(),
                path: path.clone(),
                uri: self.package.as_ref().and_then(|p| p.uri_for(path)),
                units: vec![file],
                error: None,
            };

            for directive in unit.map(|u| u.directives.as_slice()).unwrap_or_default() {
                let Directive::Part(uri) = directive else {
                    continue;
                };
                let part = self
                    .resolve_uri(path, uri)
                    .and_then(|p| self.file_index.get(&p).copied());
                match part {
                    Some(part) if self.units[part].as_ref().map_or(true, |u| u.is_part()) => {
                        library.units.push(part);
                    }
                    Some(_) => {
                        library
                            .error
                            .get_or_insert_with(|| format!("'{}' is not a part file", uri));
                    }
                    None => {
                        library
                            .error
                            .get_or_insert_with(|| format!("part '{}' not found", uri));
                    }
                }
            }

            for &unit_file in &library.units {
                self.library_of_file.entry(unit_file).or_insert(library.id);
            }
            self.library_by_path.insert(path.clone(), library.id);
            self.libraries.push(library);
        }

        let orphans = (0..self.paths.len())
            .filter(|f| !self.library_of_file.contains_key(f))
            .count();
        if orphans > 0 {
            warn!(count = orphans, "part files without an owning library");
        }
    }

    fn declarations_of(&self, library: usize) -> impl Iterator<Item = (ElementId, &Declaration)> {
        self.libraries[library].units.iter().flat_map(move |&file| {
            self.units[file]
                .as_ref()
                .map(|u| u.declarations.as_slice())
                .unwrap_or_default()
                .iter()
                .enumerate()
                .map(move |(index, decl)| (ElementId { file, index }, decl))
        })
    }

    fn directives_of(&self, library: usize) -> &[Directive] {
        let file = self.libraries[library].units[0];
        self.units[file]
            .as_ref()
            .map(|u| u.directives.as_slice())
            .unwrap_or_default()
    }

    /// Export namespaces, iterated to a fixed point so export cycles resolve.
    fn compute_exports(&mut self) {
        let mut exports: Vec<Namespace> = (0..self.libraries.len())
            .map(|lib| {
                let mut ns = Namespace::new();
                for (id, decl) in self.declarations_of(lib) {
                    if !decl.is_private() {
                        ns.entry(decl.name.clone()).or_insert(id);
                    }
                }
                ns
            })
            .collect();

        let edges: Vec<Vec<(usize, &[Combinator])>> = (0..self.libraries.len())
            .map(|lib| {
                let from = self.libraries[lib].units[0];
                self.directives_of(lib)
                    .iter()
                    .filter_map(|d| match d {
                        Directive::Export { uri, combinators } => self
                            .library_for_uri(from, uri)
                            .map(|target| (target, combinators.as_slice())),
                        _ => None,
                    })
                    .collect()
            })
            .collect();

        loop {
            let mut changed = false;
            for (lib, targets) in edges.iter().enumerate() {
                for &(target, combinators) in targets {
                    let incoming: Vec<_> = exports[target]
                        .iter()
                        .filter(|(name, _)| Combinator::allows(combinators, name))
                        .map(|(name, id)| (name.clone(), *id))
                        .collect();
                    for (name, id) in incoming {
                        if !exports[lib].contains_key(&name) {
                            exports[lib].insert(name, id);
                            changed = true;
                        }
                    }
                }
            }
            if !changed {
                break;
            }
        }

        self.exports = exports;
    }

    fn compute_scopes(&mut self) {
        let scopes = (0..self.libraries.len())
            .map(|lib| {
                let mut scope = Scope::default();
                for (id, decl) in self.declarations_of(lib) {
                    scope.local.entry(decl.name.clone()).or_insert(id);
                }

                let from = self.libraries[lib].units[0];
                for directive in self.directives_of(lib) {
                    let Directive::Import {
                        uri,
                        prefix,
                        combinators,
                    } = directive
                    else {
                        continue;
                    };
                    let Some(target) = self.library_for_uri(from, uri) else {
                        continue;
                    };
                    let names = match prefix {
                        Some(prefix) => scope.prefixed.entry(prefix.clone()).or_default(),
                        None => &mut scope.imported,
                    };
                    for (name, id) in &self.exports[target] {
                        if Combinator::allows(combinators, name) {
                            names.entry(name.clone()).or_insert(*id);
                        }
                    }
                }
                scope
            })
            .collect();
        self.scopes = scopes;
    }

    fn compute_supertypes(&mut self) {
        let mut direct: BTreeMap<ElementId, Vec<ElementId>> = BTreeMap::new();
        for (file, unit) in self.units.iter().enumerate() {
            let Ok(unit) = unit else {
                continue;
            };
            for (index, decl) in unit.declarations.iter().enumerate() {
                let Some(class) = decl.kind.class_like() else {
                    continue;
                };
                let parents = class
                    .direct_supertypes()
                    .filter_map(|ty| self.resolve_type(file, ty))
                    .filter(|id| {
                        self.declaration(*id)
                            .is_some_and(|d| d.kind.class_like().is_some())
                    })
                    .collect();
                direct.insert(ElementId { file, index }, parents);
            }
        }

        let mut memo = HashMap::new();
        for &id in direct.keys() {
            let mut visiting = HashSet::new();
            transitive_supertypes(id, &direct, &mut memo, &mut visiting);
        }
        self.supertypes = memo;
    }
}

fn transitive_supertypes(
    id: ElementId,
    direct: &BTreeMap<ElementId, Vec<ElementId>>,
    memo: &mut HashMap<ElementId, BTreeSet<ElementId>>,
    visiting: &mut HashSet<ElementId>,
) -> BTreeSet<ElementId> {
    if let Some(set) = memo.get(&id) {
        return set.clone();
    }
    if !visiting.insert(id) {
        return BTreeSet::new();
    }
    let mut set = BTreeSet::new();
    for &parent in direct.get(&id).into_iter().flatten() {
        set.insert(parent);
        set.extend(transitive_supertypes(parent, direct, memo, visiting));
    }
    visiting.remove(&id);
    memo.insert(id, set.clone());
    set
}

impl SymbolResolutionProvider for AnalysisContext {
    fn context_roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn files(&self) -> &[PathBuf] {
        &self.paths
    }

    fn file_path(&self, file: usize) -> &Path {
        &self.paths[file]
    }

    fn is_fragment(&self, path: &Path) -> bool {
        self.file_index
            .get(path)
            .is_some_and(|&f| self.units[f].as_ref().is_ok_and(CompilationUnit::is_part))
    }

    fn unit(&self, file: usize) -> std::result::Result<&CompilationUnit, &ParseError> {
        self.units[file].as_ref()
    }

    fn library_by_path(&self, path: &Path) -> Option<&LibraryElement> {
        let id = *self.library_by_path.get(path)?;
        Some(&self.libraries[id])
    }

    fn library_by_uri(&self, uri: &str) -> Option<&LibraryElement> {
        if !uri.starts_with("package:") {
            return None;
        }
        let path = self.resolve_uri(Path::new(""), uri)?;
        self.library_by_path(&path)
    }

    fn export_lookup(&self, library: &LibraryElement, name: &str) -> Option<ElementId> {
        self.exports.get(library.id)?.get(name).copied()
    }

    fn declaration(&self, id: ElementId) -> Option<&Declaration> {
        self.units.get(id.file)?.as_ref().ok()?.declarations.get(id.index)
    }

    fn resolve_type(&self, file: usize, ty: &TypeRef) -> Option<ElementId> {
        let mut id = self.lookup(file, ty.prefix.as_deref(), &ty.name)?;
        let mut aliases = HashSet::new();
        while let Some(target) = self.declaration(id)?.kind.aliased() {
            if !aliases.insert(id) {
                debug!(alias = %ty, "cyclic type alias");
                return None;
            }
            id = self.lookup(id.file, target.prefix.as_deref(), &target.name)?;
        }
        Some(id)
    }

    fn supertypes(&self, id: ElementId) -> BTreeSet<ElementId> {
        self.supertypes.get(&id).cloned().unwrap_or_default()
    }

    fn evaluate_annotation(&self, file: usize, annotation: &AnnotationSyntax) -> Annotation {
        ConstEvaluator::new(self).annotation(file, annotation)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

/// The nearest ancestor-or-self package root, plus nested package roots.
fn discover_roots(dir: &Path) -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Some(nearest) = dir.ancestors().find(|a| a.join(PUBSPEC).is_file()) {
        roots.push(nearest.to_path_buf());
    }
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_file() && entry.file_name() == PUBSPEC {
            if let Some(parent) = entry.path().parent() {
                if !roots.iter().any(|r| r == parent) {
                    roots.push(parent.to_path_buf());
                }
            }
        }
    }
    roots
}

fn read_package(root: &Path) -> Result<Package> {
    let path = root.join(PUBSPEC);
    let content = fs::read_to_string(&path).map_err(|e| CatalogError::io(&path, e))?;
    let pubspec: Pubspec = serde_yaml::from_str(&content).map_err(|e| {
        CatalogError::Configuration(format!("invalid {}: {}", path.display(), e))
    })?;
    Ok(Package {
        name: pubspec.name,
        lib_dir: root.join("lib"),
    })
}

/// `analyzer.exclude` globs from the package's analysis options.
fn read_analyzer_excludes(root: &Path) -> GlobSet {
    let path = root.join(ANALYSIS_OPTIONS);
    let Ok(content) = fs::read_to_string(&path) else {
        return GlobSet::empty();
    };
    let options: AnalysisOptions = match serde_yaml::from_str(&content) {
        Ok(options) => options,
        Err(e) => {
            warn!(file = %path.display(), error = %e, "ignoring unreadable analysis options");
            return GlobSet::empty();
        }
    };
    let patterns = options.analyzer.map(|a| a.exclude).unwrap_or_default();
    compile_globs(&patterns).unwrap_or_else(|e| {
        warn!(file = %path.display(), error = %e, "ignoring analyzer excludes");
        GlobSet::empty()
    })
}

pub(crate) fn compile_globs(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            CatalogError::Configuration(format!("invalid glob '{}': {}", pattern, e))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| CatalogError::Configuration(format!("invalid glob set: {}", e)))
}

/// `.dart` files under `dir`, sorted by file name within each directory.
fn enumerate_files(
    dir: &Path,
    excluded: &GlobSet,
    package_root: Option<&PathBuf>,
    package_excluded: &GlobSet,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            CatalogError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("dart") {
            continue;
        }
        let rel = path.strip_prefix(dir).unwrap_or(path);
        if excluded.is_match(rel) {
            debug!(file = %rel.display(), "excluded by configuration");
            continue;
        }
        if let Some(root) = package_root {
            if package_excluded.is_match(path.strip_prefix(root).unwrap_or(path)) {
                debug!(file = %rel.display(), "excluded by analysis options");
                continue;
            }
        }
        files.push(path.to_path_buf());
    }

    Ok(files)
}

/// Lexically normalize `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn package(files: &[(&str, &str)]) -> TempDir {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "pubspec.yaml", "name: ui\n");
        for (rel, content) in files {
            write(temp.path(), rel, content);
        }
        temp
    }

    fn build(temp: &TempDir) -> AnalysisContext {
        AnalysisContext::build(temp.path().join("lib"), &BuildOptions::default()).unwrap()
    }

    fn class_id(ctx: &AnalysisContext, uri: &str, name: &str) -> ElementId {
        let lib = ctx.library_by_uri(uri).expect("library");
        ctx.export_lookup(lib, name).expect("exported name")
    }

    #[test]
    fn test_roots_and_uris() {
        let temp = package(&[("lib/src/a.dart", "class A {}")]);
        let ctx = build(&temp);

        assert_eq!(ctx.context_roots().len(), 1);
        assert_eq!(ctx.files().len(), 1);
        let lib = ctx.library_by_uri("package:ui/src/a.dart").unwrap();
        assert_eq!(lib.uri.as_deref(), Some("package:ui/src/a.dart"));
        assert!(ctx.library_by_uri("package:other/a.dart").is_none());
        assert!(ctx.library_by_uri("dart:core").is_none());
    }

    #[test]
    fn test_no_pubspec_has_no_roots() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "lib/a.dart", "class A {}");
        let ctx = build(&temp);
        assert!(ctx.context_roots().is_empty());
    }

    #[test]
    fn test_nested_pubspec_is_another_root() {
        let temp = package(&[
            ("lib/a.dart", "class A {}"),
            ("lib/nested/pubspec.yaml", "name: nested\n"),
        ]);
        let ctx = build(&temp);
        assert_eq!(ctx.context_roots().len(), 2);
    }

    #[test]
    fn test_parts_form_one_library() {
        let temp = package(&[
            (
                "lib/src/basic.dart",
                "part 'basic_part.dart';\nclass Row extends Flex {}",
            ),
            ("lib/src/basic_part.dart", "part of 'basic.dart';\nclass Flex {}"),
        ]);
        let ctx = build(&temp);

        let part = ctx.files().iter().find(|p| p.ends_with("basic_part.dart")).unwrap();
        assert!(ctx.is_fragment(part));
        assert_eq!(ctx.libraries().len(), 1);
        assert_eq!(ctx.libraries()[0].units.len(), 2);

        let row = class_id(&ctx, "package:ui/src/basic.dart", "Row");
        let flex = class_id(&ctx, "package:ui/src/basic.dart", "Flex");
        assert!(ctx.supertypes(row).contains(&flex));
    }

    #[test]
    fn test_missing_part_is_library_error() {
        let temp = package(&[("lib/a.dart", "part 'gone.dart';\nclass A {}")]);
        let ctx = build(&temp);
        let lib = ctx.library_by_uri("package:ui/a.dart").unwrap();
        assert!(lib.error.as_deref().unwrap().contains("gone.dart"));
    }

    #[test]
    fn test_export_combinators() {
        let temp = package(&[
            ("lib/src/a.dart", "class A {}\nclass B {}\nclass _C {}"),
            ("lib/only_a.dart", "export 'src/a.dart' show A;"),
            ("lib/all_but_a.dart", "export 'src/a.dart' hide A;"),
        ]);
        let ctx = build(&temp);

        let only_a = ctx.library_by_uri("package:ui/only_a.dart").unwrap();
        assert!(ctx.export_lookup(only_a, "A").is_some());
        assert!(ctx.export_lookup(only_a, "B").is_none());

        let all_but_a = ctx.library_by_uri("package:ui/all_but_a.dart").unwrap();
        assert!(ctx.export_lookup(all_but_a, "A").is_none());
        assert!(ctx.export_lookup(all_but_a, "B").is_some());
        assert!(ctx.export_lookup(all_but_a, "_C").is_none());
    }

    #[test]
    fn test_export_cycle_terminates() {
        let temp = package(&[
            ("lib/a.dart", "export 'b.dart';\nclass A {}"),
            ("lib/b.dart", "export 'a.dart';\nclass B {}"),
        ]);
        let ctx = build(&temp);
        let a = ctx.library_by_uri("package:ui/a.dart").unwrap();
        let b = ctx.library_by_uri("package:ui/b.dart").unwrap();
        assert!(ctx.export_lookup(a, "B").is_some());
        assert!(ctx.export_lookup(b, "A").is_some());
    }

    #[test]
    fn test_transitive_supertypes_across_prefixed_imports() {
        let temp = package(&[
            ("lib/framework.dart", "abstract class Widget {}\nmixin Diag {}"),
            (
                "lib/basic.dart",
                "import 'package:ui/framework.dart' as fw;\n\
                 abstract class Stateless extends fw.Widget with fw.Diag {}",
            ),
            (
                "lib/text.dart",
                "import 'basic.dart';\nimport 'dart:ui';\nclass Text extends Stateless implements Paint {}",
            ),
        ]);
        let ctx = build(&temp);

        let widget = class_id(&ctx, "package:ui/framework.dart", "Widget");
        let diag = class_id(&ctx, "package:ui/framework.dart", "Diag");
        let text = class_id(&ctx, "package:ui/text.dart", "Text");
        let supers = ctx.supertypes(text);
        assert!(supers.contains(&widget));
        assert!(supers.contains(&diag));
        assert_eq!(supers.len(), 3);
        assert!(ctx.supertypes(widget).is_empty());
    }

    #[test]
    fn test_supertypes_through_type_aliases() {
        let temp = package(&[
            ("lib/framework.dart", "abstract class Widget {}"),
            (
                "lib/aliases.dart",
                "import 'framework.dart' as fw;
typedef WidgetAlias = fw.Widget;
typedef Again = WidgetAlias;",
            ),
            (
                "lib/via.dart",
                "import 'aliases.dart';
class ViaAlias extends WidgetAlias {}
class ViaChain extends Again {}",
            ),
        ]);
        let ctx = build(&temp);

        let widget = class_id(&ctx, "package:ui/framework.dart", "Widget");
        let via = class_id(&ctx, "package:ui/via.dart", "ViaAlias");
        let chain = class_id(&ctx, "package:ui/via.dart", "ViaChain");
        assert_eq!(ctx.supertypes(via), BTreeSet::from([widget]));
        assert_eq!(ctx.supertypes(chain), BTreeSet::from([widget]));
        assert_eq!(
            ctx.resolve_type(via.file, &TypeRef::simple("Again")),
            Some(widget)
        );
    }

    #[test]
    fn test_cyclic_type_alias_resolves_to_nothing() {
        let temp = package(&[(
            "lib/a.dart",
            "typedef A = B;
typedef B = A;
class C extends A {}",
        )]);
        let ctx = build(&temp);
        let c = class_id(&ctx, "package:ui/a.dart", "C");
        assert!(ctx.supertypes(c).is_empty());
        assert_eq!(ctx.resolve_type(c.file, &TypeRef::simple("A")), None);
    }

    #[test]
    fn test_cyclic_hierarchy_terminates() {
        let temp = package(&[("lib/a.dart", "class A extends B {}\nclass B extends A {}")]);
        let ctx = build(&temp);
        let a = class_id(&ctx, "package:ui/a.dart", "A");
        assert!(!ctx.supertypes(a).is_empty());
    }

    #[test]
    fn test_excludes() {
        let temp = package(&[
            ("lib/a.dart", "class A {}"),
            ("lib/gen/b.g.dart", "class B {}"),
            ("lib/.hidden/c.dart", "class C {}"),
            ("lib/skip/d.dart", "class D {}"),
            ("analysis_options.yaml", "analyzer:\n  exclude:\n    - lib/skip/**\n"),
        ]);
        let options = BuildOptions {
            excluded_paths: vec!["**/*.g.dart".to_string()],
        };
        let ctx = AnalysisContext::build(temp.path().join("lib"), &options).unwrap();
        assert_eq!(ctx.files().len(), 1);
        assert!(ctx.files()[0].ends_with("a.dart"));
    }

    #[test]
    fn test_parse_errors_are_stored() {
        let temp = package(&[("lib/bad.dart", "class A {"), ("lib/good.dart", "class B {}")]);
        let ctx = build(&temp);
        assert!(ctx.unit(0).is_err());
        assert!(ctx.unit(1).is_ok());
    }

    #[test]
    fn test_invalid_glob_is_configuration_error() {
        let temp = package(&[("lib/a.dart", "class A {}")]);
        let options = BuildOptions {
            excluded_paths: vec!["a[".to_string()],
        };
        let err = AnalysisContext::build(temp.path().join("lib"), &options)
            .err()
            .unwrap();
        assert!(matches!(err, CatalogError::Configuration(_)));
    }
}
