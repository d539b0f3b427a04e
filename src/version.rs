//! Framework version lookup for the SDK checkout.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CatalogError, Result};

/// Version and release channel embedded in the catalog header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub channel: String,
}

/// Source of the version embedded in the catalog.
pub trait VersionProvider {
    fn version_info(&self) -> Result<VersionInfo>;
}

/// A version supplied explicitly (command line overrides, tests).
#[derive(Debug, Clone)]
pub struct FixedVersion(pub VersionInfo);

impl FixedVersion {
    pub fn new(version: impl Into<String>, channel: impl Into<String>) -> Self {
        Self(VersionInfo {
            version: version.into(),
            channel: channel.into(),
        })
    }
}

impl VersionProvider for FixedVersion {
    fn version_info(&self) -> Result<VersionInfo> {
        Ok(self.0.clone())
    }
}

/// Reads the version files the Flutter tool writes into the SDK.
#[derive(Debug, Clone)]
pub struct FlutterVersionFile {
    sdk_root: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlutterVersionJson {
    framework_version: String,
    #[serde(default)]
    channel: Option<String>,
}

impl FlutterVersionFile {
    pub fn new<P: AsRef<Path>>(sdk_root: P) -> Self {
        Self {
            sdk_root: sdk_root.as_ref().to_path_buf(),
        }
    }

    fn json_path(&self) -> PathBuf {
        self.sdk_root.join("bin/cache/flutter.version.json")
    }

    fn plain_path(&self) -> PathBuf {
        self.sdk_root.join("version")
    }
}

impl VersionProvider for FlutterVersionFile {
    fn version_info(&self) -> Result<VersionInfo> {
        let json_path = self.json_path();
        if json_path.is_file() {
            let content =
                fs::read_to_string(&json_path).map_err(|e| CatalogError::io(&json_path, e))?;
            let parsed: FlutterVersionJson = serde_json::from_str(&content).map_err(|e| {
                CatalogError::Configuration(format!("invalid {}: {}", json_path.display(), e))
            })?;
            return Ok(VersionInfo {
                version: parsed.framework_version,
                channel: parsed.channel.unwrap_or_else(|| "unknown".to_string()),
            });
        }

        let plain_path = self.plain_path();
        if plain_path.is_file() {
            let content =
                fs::read_to_string(&plain_path).map_err(|e| CatalogError::io(&plain_path, e))?;
            let version = content.trim();
            if version.is_empty() {
                return Err(CatalogError::Configuration(format!(
                    "{} is empty",
                    plain_path.display()
                )));
            }
            return Ok(VersionInfo {
                version: version.to_string(),
                channel: "unknown".to_string(),
            });
        }

        Err(CatalogError::Configuration(format!(
            "no framework version found under {} (run `flutter --version` once to populate bin/cache)",
            self.sdk_root.display()
        )))
    }
}
