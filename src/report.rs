//! Catalog serialization and console reporting.
//!
//! - JSON: the catalog file consumed by downstream tooling
//! - Pretty: colored terminal summary for humans

use colored::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CatalogError, Result};
use crate::extract::CatalogEntry;
use crate::version::VersionInfo;

// =============================================================================
// JSON Format
// =============================================================================

/// Root object of the catalog file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub flutter: VersionInfo,
    pub widgets: Vec<CatalogEntry>,
}

impl Catalog {
    /// Build a catalog with entries sorted by name.
    pub fn new(mut entries: Vec<CatalogEntry>, version: VersionInfo) -> Self {
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            flutter: version,
            widgets: entries,
        }
    }

    /// Two-space indented JSON with a single trailing newline.
    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}

/// What was written, for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub path: PathBuf,
    pub widgets: usize,
    pub bytes: usize,
}

impl WriteSummary {
    /// Size in kilobytes, rounded up.
    pub fn kilobytes(&self) -> usize {
        self.bytes.div_ceil(1024)
    }
}

/// Writes the catalog file.
#[derive(Debug, Clone, Default)]
pub struct CatalogWriter;

impl CatalogWriter {
    pub fn new() -> Self {
        Self
    }

    /// Sort, serialize and write `entries`, overwriting `output`.
    pub fn write(
        &self,
        entries: Vec<CatalogEntry>,
        version: VersionInfo,
        output: &Path,
    ) -> Result<WriteSummary> {
        let catalog = Catalog::new(entries, version);
        let json = catalog.to_json()?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| CatalogError::io(parent, e))?;
        }
        fs::write(output, json.as_bytes()).map_err(|e| CatalogError::io(output, e))?;

        Ok(WriteSummary {
            path: output.to_path_buf(),
            widgets: catalog.widgets.len(),
            bytes: json.len(),
        })
    }
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Header printed before a run.
pub fn write_header(sdk_root: &Path, version: &VersionInfo) {
    println!();
    print!("  ");
    print!("{}", "widget-catalog".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "SDK:      ".dimmed());
    println!("{}", sdk_root.display());
    print!("  {}", "Flutter:  ".dimmed());
    println!("{} ({})", version.version, version.channel);
    println!();
}

/// One progress line, e.g. `✓ Found 312 libraries`.
pub fn write_step(message: &str) {
    println!("  {} {}", "✓".green(), message);
}

/// Final status line after the file was written.
pub fn write_summary(summary: &WriteSummary) {
    println!();
    print!("  {}", "✓ DONE".green().bold());
    println!(
        "  Wrote {} widgets to {} ({} KB)",
        summary.widgets.to_string().bold(),
        summary.path.display(),
        summary.kilobytes()
    );
    println!();
}

/// Single entry, for the `show` command.
pub fn write_entry(entry: &CatalogEntry) -> Result<()> {
    let json = serde_json::to_string_pretty(entry)?;
    println!("{}", json);
    Ok(())
}

/// Error line printed to stderr before exiting.
pub fn write_error(kind: &str, message: &str) {
    eprintln!("  {} {}: {}", "✗".red(), kind.red().bold(), message);
}
