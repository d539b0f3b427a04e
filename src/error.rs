//! Error taxonomy for catalog generation.
//!
//! Every variant is fatal: the pipeline never emits a partial catalog.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that abort a catalog run.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Wrong working directory, missing SDK files, or an ambiguous analysis root.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A library could not be resolved (syntax error, missing part, unknown symbol).
    #[error("cannot resolve {}: {message}", .path.display())]
    Resolution { path: PathBuf, message: String },

    /// A recognized annotation is malformed.
    #[error("malformed metadata on '{class}': {message}")]
    Metadata { class: String, message: String },

    /// The catalog or an entry could not be rendered as JSON.
    #[error("failed to serialize catalog: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CatalogError {
    pub fn resolution(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        CatalogError::Resolution {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    pub fn metadata(class: impl Into<String>, message: impl Into<String>) -> Self {
        CatalogError::Metadata {
            class: class.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        CatalogError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Short label used in console output.
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogError::Configuration(_) => "ConfigurationError",
            CatalogError::Resolution { .. } => "ResolutionError",
            CatalogError::Metadata { .. } => "MetadataError",
            CatalogError::Serialization(_) => "SerializationError",
            CatalogError::Io { .. } => "IOError",
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
