//! Catalog pipeline that orchestrates every stage.

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::analysis::{AnalysisContext, BuildOptions};
use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};
use crate::extract::{CatalogEntry, MetadataExtractor};
use crate::index::SourceIndex;
use crate::report::{CatalogWriter, WriteSummary};
use crate::resolve::SymbolResolver;
use crate::select::HierarchyFilter;
use crate::version::VersionProvider;

/// Entries of one run plus counts for reporting.
#[derive(Debug, Clone)]
pub struct CatalogRun {
    pub entries: Vec<CatalogEntry>,
    pub libraries: usize,
    pub classes: usize,
}

/// Executes the catalog pipeline against one SDK checkout.
pub struct Runner {
    sdk_root: PathBuf,
    config: CatalogConfig,
    jobs: Option<usize>,
    show_progress: bool,
}

impl Runner {
    /// Create a new runner for the SDK at `sdk_root`.
    pub fn new<P: AsRef<Path>>(sdk_root: P, config: CatalogConfig) -> Self {
        Self {
            sdk_root: sdk_root.as_ref().to_path_buf(),
            config,
            jobs: None,
            show_progress: false,
        }
    }

    /// Worker threads for library resolution (default: available cores).
    pub fn jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    /// Show a progress bar on stderr while resolving libraries.
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// The package's `lib/` directory, which must exist.
    pub fn lib_dir(&self) -> Result<PathBuf> {
        let lib = self.config.lib_dir(&self.sdk_root);
        if !lib.is_dir() {
            return Err(CatalogError::Configuration(format!(
                "{} not found; run from the SDK root or pass --flutter-root",
                lib.display()
            )));
        }
        Ok(lib)
    }

    /// Analyze, resolve, select and extract, without writing anything.
    pub fn collect(&self) -> Result<CatalogRun> {
        let lib = self.lib_dir()?;
        let options = BuildOptions {
            excluded_paths: self.config.excluded_paths.clone(),
        };
        info!(dir = %lib.display(), "building analysis context");
        let ctx = AnalysisContext::build(&lib, &options)?;

        let units = SourceIndex::new(&ctx).list_library_units()?;
        info!(libraries = units.len(), "found library units");

        let resolver = SymbolResolver::new(&ctx);
        let root = resolver.resolve_root_type(&self.config.root_library, &self.config.root_type)?;
        debug!(root = %root.name, library = %root.library_path.display(), "resolved root type");

        let pool = self.thread_pool()?;
        let progress = self.progress_bar(units.len() as u64);
        let resolved = pool.install(|| resolver.resolve_all(&units, Some(&progress)));
        progress.finish_and_clear();
        let resolved = resolved?;

        let classes = resolved.iter().map(Vec::len).sum();
        let filter = HierarchyFilter::new(self.config.include_root);
        let selected = filter.select_subtypes(resolved.iter().flatten(), &root);
        info!(classes, selected = selected.len(), "selected subtypes of {}", root.name);

        let extractor = MetadataExtractor::from_config(&self.config);
        let entries = selected
            .into_iter()
            .map(|class| extractor.extract(class, &root))
            .collect::<Result<Vec<_>>>()?;

        Ok(CatalogRun {
            entries,
            libraries: units.len(),
            classes,
        })
    }

    /// Run the whole pipeline and write the catalog to the configured output.
    pub fn generate(&self, version: &dyn VersionProvider) -> Result<(CatalogRun, WriteSummary)> {
        let info = version.version_info()?;
        let run = self.collect()?;
        let summary = CatalogWriter::new().write(run.entries.clone(), info, &self.config.output)?;
        info!(
            path = %summary.path.display(),
            widgets = summary.widgets,
            bytes = summary.bytes,
            "catalog written"
        );
        Ok((run, summary))
    }

    /// The entry for the widget named `name`, if it is cataloged.
    pub fn show(&self, name: &str) -> Result<Option<CatalogEntry>> {
        let run = self.collect()?;
        Ok(run.entries.into_iter().find(|entry| entry.name == name))
    }

    fn thread_pool(&self) -> Result<rayon::ThreadPool> {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(jobs) = self.jobs {
            builder = builder.num_threads(jobs);
        }
        builder.build().map_err(|e| {
            CatalogError::Configuration(format!("cannot start worker pool: {}", e))
        })
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        if let Ok(style) =
            ProgressStyle::with_template("  {spinner} [{bar:30}] {pos}/{len} libraries")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb
    }
}
