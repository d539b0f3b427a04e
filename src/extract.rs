//! Catalog metadata extraction.

use serde::{Deserialize, Serialize};

use crate::analysis::{Annotation, ConstValue};
use crate::config::{AnnotationShape, CatalogConfig};
use crate::docs::condense;
use crate::error::{CatalogError, Result};
use crate::resolve::ResolvedClass;

/// Name of the implicit superclass of classes without `extends`.
const OBJECT: &str = "Object";

/// One widget in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub library: String,
    #[serde(rename = "abstract", default, skip_serializing_if = "is_false")]
    pub is_abstract: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    pub description: String,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Turns selected classes into catalog entries.
#[derive(Debug, Clone)]
pub struct MetadataExtractor {
    summary: AnnotationShape,
    category: AnnotationShape,
    library_segment: usize,
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::from_config(&CatalogConfig::default())
    }
}

impl MetadataExtractor {
    pub fn from_config(config: &CatalogConfig) -> Self {
        Self {
            summary: config.summary.clone(),
            category: config.category.clone(),
            library_segment: config.library_segment,
        }
    }

    pub fn extract(&self, class: &ResolvedClass, root: &ResolvedClass) -> Result<CatalogEntry> {
        let parent = if class.id == root.id {
            None
        } else {
            Some(
                class
                    .supertype
                    .as_ref()
                    .map_or_else(|| OBJECT.to_string(), |s| s.name.clone()),
            )
        };

        let categories = match self.first(class, &self.category) {
            Some(annotation) => {
                let value = self.field(class, annotation, &self.category)?;
                Some(value.as_string_list().ok_or_else(|| {
                    self.wrong_type(class, &self.category, "List<String>", value)
                })?)
            }
            None => None,
        };

        let description = match self.first(class, &self.summary) {
            Some(annotation) => {
                let value = self.field(class, annotation, &self.summary)?;
                value
                    .as_str()
                    .ok_or_else(|| self.wrong_type(class, &self.summary, "String", value))?
                    .trim()
                    .to_string()
            }
            None => condense(class.documentation.as_deref()),
        };

        Ok(CatalogEntry {
            name: class.name.clone(),
            parent,
            library: self.library_name(class)?,
            is_abstract: class.is_abstract,
            categories,
            description,
        })
    }

    /// Segment `library_segment` of the owning library's `package:` URI path.
    fn library_name(&self, class: &ResolvedClass) -> Result<String> {
        let uri = class.library_uri.as_deref().ok_or_else(|| {
            CatalogError::metadata(
                &class.name,
                format!("{} is outside the package's lib/", class.library_path.display()),
            )
        })?;
        let path = uri.strip_prefix("package:").unwrap_or(uri);
        path.split('/')
            .nth(self.library_segment)
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                CatalogError::metadata(
                    &class.name,
                    format!("{} has no path segment {}", uri, self.library_segment),
                )
            })
    }

    fn first<'c>(&self, class: &'c ResolvedClass, shape: &AnnotationShape) -> Option<&'c Annotation> {
        class
            .annotations
            .iter()
            .find(|a| a.type_name == shape.annotation)
    }

    fn field<'c>(
        &self,
        class: &ResolvedClass,
        annotation: &'c Annotation,
        shape: &AnnotationShape,
    ) -> Result<&'c ConstValue> {
        let field = annotation.field(&shape.field).ok_or_else(|| {
            CatalogError::metadata(
                &class.name,
                format!("@{} has no field '{}'", shape.annotation, shape.field),
            )
        })?;
        field.value.as_ref().ok_or_else(|| {
            CatalogError::metadata(
                &class.name,
                format!(
                    "@{}.{} is not a constant expression",
                    shape.annotation, shape.field
                ),
            )
        })
    }

    fn wrong_type(
        &self,
        class: &ResolvedClass,
        shape: &AnnotationShape,
        expected: &str,
        found: &ConstValue,
    ) -> CatalogError {
        CatalogError::metadata(
            &class.name,
            format!(
                "@{}.{} must be a {}, found {}",
                shape.annotation, shape.field, expected, found
            ),
        )
    }
}
