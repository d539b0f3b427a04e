//! Catalog configuration schema.
//!
//! The configuration is optional: every key has a default matching the
//! Flutter SDK layout.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CatalogError, Result};

/// File names searched in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["widget-catalog.yaml", ".widget-catalog.yaml"];

lazy_static! {
    /// `package:<name>/<path>.dart`
    static ref PACKAGE_URI: Regex =
        Regex::new(r"^package:[a-z_][a-z0-9_]*/[^\s]+\.dart$").unwrap();
}

/// Top-level catalog configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Package directory, relative to the SDK root.
    pub package_path: PathBuf,
    /// Library that exports the root type.
    pub root_library: String,
    /// Name of the root type whose subtypes are cataloged.
    pub root_type: String,
    /// Output file, relative to the working directory unless absolute.
    pub output: PathBuf,
    /// Whether the root type itself is cataloged.
    pub include_root: bool,
    /// Index of the `package:` URI path segment used as the `library` value.
    pub library_segment: usize,
    pub summary: AnnotationShape,
    pub category: AnnotationShape,
    /// Glob patterns, relative to the package's `lib/`, of files to skip.
    pub excluded_paths: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            package_path: PathBuf::from("packages/flutter"),
            root_library: "package:flutter/widgets.dart".to_string(),
            root_type: "Widget".to_string(),
            output: PathBuf::from("widgets.json"),
            include_root: false,
            library_segment: 2,
            summary: AnnotationShape::new("Summary", "text"),
            category: AnnotationShape::new("Category", "sections"),
            excluded_paths: Vec::new(),
        }
    }
}

/// A recognized annotation: its class name and the field carrying the value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AnnotationShape {
    pub annotation: String,
    pub field: String,
}

impl AnnotationShape {
    pub fn new(annotation: &str, field: &str) -> Self {
        Self {
            annotation: annotation.to_string(),
            field: field.to_string(),
        }
    }
}

impl CatalogConfig {
    /// Parse a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| CatalogError::io(path, e))?;
        let config: CatalogConfig = serde_yaml::from_str(&content).map_err(|e| {
            CatalogError::Configuration(format!("invalid config {}: {}", path.display(), e))
        })?;
        Ok(config)
    }

    /// Load `explicit` if given, else the first default file name present,
    /// else the defaults. The result is validated.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => Self::parse_file(path)?,
            None => match DEFAULT_CONFIG_NAMES
                .iter()
                .map(Path::new)
                .find(|p| p.is_file())
            {
                Some(path) => Self::parse_file(path)?,
                None => Self::default(),
            },
        };
        validate(&config)?;
        Ok(config)
    }

    /// `<sdk_root>/<package_path>/lib`
    pub fn lib_dir(&self, sdk_root: &Path) -> PathBuf {
        sdk_root.join(&self.package_path).join("lib")
    }
}

/// Validate a configuration for correctness.
pub fn validate(config: &CatalogConfig) -> Result<()> {
    let invalid = |msg: String| Err(CatalogError::Configuration(msg));

    if !PACKAGE_URI.is_match(&config.root_library) {
        return invalid(format!(
            "root_library {:?} is not a package: URI",
            config.root_library
        ));
    }
    if config.root_type.trim().is_empty() {
        return invalid("root_type must not be empty".to_string());
    }
    for (key, shape) in [("summary", &config.summary), ("category", &config.category)] {
        if shape.annotation.trim().is_empty() || shape.field.trim().is_empty() {
            return invalid(format!("{}: annotation and field must not be empty", key));
        }
    }
    if config.output.as_os_str().is_empty() {
        return invalid("output must not be empty".to_string());
    }

    // Validate excluded_paths glob patterns compile
    crate::analysis::compile_globs(&config.excluded_paths)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = CatalogConfig::default();
        assert_eq!(config.root_type, "Widget");
        assert_eq!(config.library_segment, 2);
        assert!(!config.include_root);
        assert_eq!(
            config.lib_dir(Path::new("/sdk")),
            PathBuf::from("/sdk/packages/flutter/lib")
        );
        validate(&config).unwrap();
    }

    #[test]
    fn test_parse_partial_config() {
        let yaml = r#"
root_type: "StatelessWidget"
include_root: true
summary:
  annotation: Doc
  field: short
excluded_paths:
  - "src/cupertino/**"
"#;
        let config: CatalogConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.root_type, "StatelessWidget");
        assert!(config.include_root);
        assert_eq!(config.summary, AnnotationShape::new("Doc", "short"));
        assert_eq!(config.category, AnnotationShape::new("Category", "sections"));
        assert_eq!(config.root_library, "package:flutter/widgets.dart");
        validate(&config).unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = CatalogConfig {
            root_library: "widgets.dart".to_string(),
            ..Default::default()
        };
        assert!(matches!(validate(&config), Err(CatalogError::Configuration(_))));

        config.root_library = "package:flutter/widgets.dart".to_string();
        config.excluded_paths = vec!["src/[".to_string()];
        assert!(validate(&config).is_err());

        config.excluded_paths.clear();
        config.category.field = " ".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("catalog.yaml");
        fs::write(&path, "output: out/catalog.json\n").unwrap();

        let config = CatalogConfig::load(Some(&path)).unwrap();
        assert_eq!(config.output, PathBuf::from("out/catalog.json"));

        let missing = CatalogConfig::load(Some(&temp.path().join("nope.yaml")));
        assert!(matches!(missing, Err(CatalogError::Io { .. })));
    }

    #[test]
    fn test_malformed_values_are_configuration_errors() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("catalog.yaml");
        fs::write(&path, "library_segment: two\n").unwrap();
        assert!(matches!(
            CatalogConfig::load(Some(&path)),
            Err(CatalogError::Configuration(_))
        ));
    }
}
