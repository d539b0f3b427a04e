//! Integration tests for the full catalog pipeline.
//!
//! These tests run every stage against the miniature SDK checkout in
//! `testdata/flutter`.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;
use widget_catalog::report::Catalog;
use widget_catalog::{
    CatalogConfig, CatalogEntry, CatalogError, FlutterVersionFile, Runner, VersionProvider,
};

fn sdk_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata/flutter")
}

fn collect(config: CatalogConfig) -> Vec<CatalogEntry> {
    Runner::new(sdk_root(), config)
        .jobs(Some(2))
        .collect()
        .expect("pipeline should succeed")
        .entries
}

fn entry<'a>(entries: &'a [CatalogEntry], name: &str) -> &'a CatalogEntry {
    entries
        .iter()
        .find(|e| e.name == name)
        .unwrap_or_else(|| panic!("{} should be cataloged", name))
}

/// Generate the catalog into a temp dir and parse it back.
fn generate(temp: &TempDir) -> (PathBuf, Catalog) {
    let output = temp.path().join("widgets.json");
    let config = CatalogConfig {
        output: output.clone(),
        ..Default::default()
    };
    let version = FlutterVersionFile::new(sdk_root());
    Runner::new(sdk_root(), config)
        .generate(&version)
        .expect("generate should succeed");
    let content = fs::read_to_string(&output).expect("catalog should be written");
    let catalog = serde_json::from_str(&content).expect("catalog should be valid JSON");
    (output, catalog)
}

#[test]
fn test_catalog_lists_public_widget_subtypes_sorted() {
    let temp = TempDir::new().unwrap();
    let (_, catalog) = generate(&temp);

    let names: Vec<_> = catalog.widgets.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Builder",
            "Column",
            "DefaultTextStyle",
            "Flex",
            "InheritedWidget",
            "MutedTickerMode",
            "Padding",
            "ProxyWidget",
            "Row",
            "SizedBox",
            "StatefulWidget",
            "StatelessWidget",
            "Text",
            "TickerMode",
        ]
    );
    assert_eq!(catalog.flutter.version, "3.22.0");
    assert_eq!(catalog.flutter.channel, "stable");
}

#[test]
fn test_private_mixins_and_unrelated_classes_are_excluded() {
    let entries = collect(CatalogConfig::default());
    let names: HashSet<_> = entries.iter().map(|e| e.name.as_str()).collect();

    for excluded in [
        "Widget",
        "_NullWidget",
        "State",
        "_TickerModeState",
        "SingleTickerProviderStateMixin",
        "Element",
        "Key",
        "Summary",
        "Placeholder",
    ] {
        assert!(!names.contains(excluded), "{} should not be cataloged", excluded);
    }
}

#[test]
fn test_parents_follow_declared_superclass() {
    let entries = collect(CatalogConfig::default());

    assert_eq!(entry(&entries, "StatelessWidget").parent.as_deref(), Some("Widget"));
    assert_eq!(entry(&entries, "Row").parent.as_deref(), Some("Flex"));
    assert_eq!(
        entry(&entries, "DefaultTextStyle").parent.as_deref(),
        Some("InheritedWidget")
    );
    // Mixin application: the superclass before `with`.
    assert_eq!(
        entry(&entries, "MutedTickerMode").parent.as_deref(),
        Some("TickerMode")
    );

    // Every parent is cataloged or is the root itself.
    let names: HashSet<_> = entries.iter().map(|e| e.name.as_str()).collect();
    for e in &entries {
        let parent = e.parent.as_deref().unwrap();
        assert!(
            parent == "Widget" || names.contains(parent),
            "{} has dangling parent {}",
            e.name,
            parent
        );
    }
}

#[test]
fn test_abstract_flag_and_library() {
    let entries = collect(CatalogConfig::default());

    assert!(entry(&entries, "Flex").is_abstract);
    assert!(entry(&entries, "ProxyWidget").is_abstract);
    assert!(!entry(&entries, "Row").is_abstract);
    assert!(entries.iter().all(|e| e.library == "widgets"));
}

#[test]
fn test_descriptions_and_categories() {
    let entries = collect(CatalogConfig::default());

    let padding = entry(&entries, "Padding");
    assert_eq!(
        padding.description,
        "A widget that insets its child by the given padding."
    );
    assert_eq!(
        padding.categories,
        Some(vec!["Layout".to_string(), "Basics".to_string()])
    );

    // @Summary wins over the doc comment.
    assert_eq!(
        entry(&entries, "SizedBox").description,
        "A box with a fixed width and height."
    );

    // Prefixed annotations, const references and adjacent strings.
    let text = entry(&entries, "Text");
    assert_eq!(text.description, "Displays a string of text with a single style.");
    assert_eq!(text.categories, Some(vec!["Text".to_string()]));

    // Constant declared in a part of the same library.
    assert_eq!(
        entry(&entries, "Row").categories,
        Some(vec!["Layout".to_string()])
    );

    // The first paragraph spans several comment lines.
    assert_eq!(
        entry(&entries, "Builder").description,
        "A stateless utility widget whose [build] method uses its [builder] callback to create the widget's child."
    );

    // Markers without a following space are kept verbatim.
    assert_eq!(
        entry(&entries, "DefaultTextStyle").description,
        "///The text style to apply to descendant [Text] widgets which don't have an ///explicit style."
    );
    assert_eq!(entry(&entries, "Flex").categories, None);
}

#[test]
fn test_include_root() {
    let entries = collect(CatalogConfig {
        include_root: true,
        ..Default::default()
    });
    let widget = entry(&entries, "Widget");
    assert_eq!(widget.parent, None);
    assert!(widget.is_abstract);
    assert_eq!(entries.len(), 15);
}

#[test]
fn test_excluded_paths() {
    let entries = collect(CatalogConfig {
        excluded_paths: vec!["src/widgets/text.dart".to_string()],
        ..Default::default()
    });
    let names: HashSet<_> = entries.iter().map(|e| e.name.as_str()).collect();
    assert!(!names.contains("Text"));
    assert!(!names.contains("DefaultTextStyle"));
    assert!(names.contains("Padding"));
}

#[test]
fn test_generate_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let (output, _) = generate(&temp);
    let first = fs::read(&output).unwrap();
    let (_, _) = generate(&temp);
    let second = fs::read(&output).unwrap();
    assert_eq!(first, second);
    assert!(first.ends_with(b"}\n"));
}

#[test]
fn test_version_file() {
    let info = FlutterVersionFile::new(sdk_root()).version_info().unwrap();
    assert_eq!(info.version, "3.22.0");
}

#[test]
fn test_unknown_root_type_is_resolution_error() {
    let err = Runner::new(
        sdk_root(),
        CatalogConfig {
            root_type: "RenderObject".to_string(),
            ..Default::default()
        },
    )
    .collect()
    .unwrap_err();
    assert!(matches!(err, CatalogError::Resolution { .. }));
    assert!(err.to_string().contains("RenderObject"));
}

#[test]
fn test_unknown_root_library_is_resolution_error() {
    let err = Runner::new(
        sdk_root(),
        CatalogConfig {
            root_library: "package:flutter/material.dart".to_string(),
            ..Default::default()
        },
    )
    .collect()
    .unwrap_err();
    assert!(matches!(err, CatalogError::Resolution { .. }));
}

#[test]
fn test_wrong_working_directory_is_configuration_error() {
    let temp = TempDir::new().unwrap();
    let err = Runner::new(temp.path(), CatalogConfig::default())
        .collect()
        .unwrap_err();
    assert_eq!(err.kind(), "ConfigurationError");
}

#[test]
fn test_supertype_through_type_alias() {
    let temp = TempDir::new().unwrap();
    let package = temp.path().join("packages/flutter");
    for (rel, content) in [
        ("pubspec.yaml", "name: flutter\n"),
        ("lib/widgets.dart", "export 'src/widgets/framework.dart';\nexport 'src/widgets/aliased.dart';"),
        ("lib/src/widgets/framework.dart", "abstract class Widget {}"),
        (
            "lib/src/widgets/aliased.dart",
            "import 'framework.dart' as fw;\ntypedef WidgetAlias = fw.Widget;\n/// Reached through an alias.\nclass ViaAlias extends WidgetAlias {}",
        ),
    ] {
        let path = package.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    let entries = Runner::new(temp.path(), CatalogConfig::default())
        .collect()
        .expect("pipeline should succeed")
        .entries;
    assert_eq!(entries.len(), 1);
    let via = entry(&entries, "ViaAlias");
    assert_eq!(via.parent.as_deref(), Some("Widget"));
    assert_eq!(via.description, "Reached through an alias.");
}
