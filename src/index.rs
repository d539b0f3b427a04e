//! Library-unit enumeration.

use std::path::PathBuf;

use tracing::debug;

use crate::analysis::SymbolResolutionProvider;
use crate::error::{CatalogError, Result};

/// A standalone compilation unit (not a `part of` fragment).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryUnit {
    pub path: PathBuf,
    pub uri: Option<String>,
}

/// Enumerates the library units of one analysis root.
pub struct SourceIndex<'a, P: SymbolResolutionProvider + ?Sized> {
    provider: &'a P,
}

impl<'a, P: SymbolResolutionProvider + ?Sized> SourceIndex<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    /// Library units in the provider's enumeration order.
    ///
    /// Fails unless the provider reports exactly one analysis root.
    pub fn list_library_units(&self) -> Result<Vec<LibraryUnit>> {
        match self.provider.context_roots() {
            [_] => {}
            [] => {
                return Err(CatalogError::Configuration(
                    "no analysis root found (no pubspec.yaml in or above the package directory)"
                        .to_string(),
                ))
            }
            roots => {
                let listed: Vec<_> = roots.iter().map(|r| r.display().to_string()).collect();
                return Err(CatalogError::Configuration(format!(
                    "expected exactly one analysis root, found {}: {}",
                    roots.len(),
                    listed.join(", ")
                )));
            }
        }

        let files = self.provider.files();
        let units: Vec<_> = files
            .iter()
            .filter(|path| !self.provider.is_fragment(path))
            .map(|path| LibraryUnit {
                path: path.clone(),
                uri: self
                    .provider
                    .library_by_path(path)
                    .and_then(|lib| lib.uri.clone()),
            })
            .collect();

        debug!(
            files = files.len(),
            libraries = units.len(),
            "enumerated library units"
        );
        Ok(units)
    }
}
