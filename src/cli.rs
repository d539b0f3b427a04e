//! Command-line interface for widget-catalog.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::CatalogConfig;
use crate::pipeline::Runner;
use crate::report;
use crate::version::{FixedVersion, FlutterVersionFile, VersionProvider};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 2;

/// Generate a JSON catalog of the widgets in a Flutter SDK checkout.
///
/// Every public class that transitively extends the root widget type is
/// listed with its parent, library, categories and a one-paragraph
/// description taken from its annotations or doc comment.
#[derive(Parser)]
#[command(name = "widget-catalog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the catalog and write it to the output file
    Generate(GenerateArgs),
    /// Print the catalog entry for a single widget
    Show(ShowArgs),
}

/// Options shared by every command that analyzes the SDK.
#[derive(Args, Clone)]
pub struct AnalysisArgs {
    /// Flutter SDK root
    #[arg(long, env = "FLUTTER_ROOT", default_value = ".")]
    pub flutter_root: PathBuf,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Worker threads for library resolution (default: available cores)
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

/// Arguments for the generate command.
#[derive(Args, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub analysis: AnalysisArgs,

    /// Output file (overrides the config)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Framework version to embed instead of reading the SDK's version files
    #[arg(long, requires = "channel")]
    pub framework_version: Option<String>,

    /// Release channel to embed together with --framework-version
    #[arg(long, requires = "framework_version")]
    pub channel: Option<String>,
}

/// Arguments for the show command.
#[derive(Args)]
pub struct ShowArgs {
    /// Widget class name
    pub name: String,

    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

/// Install the stderr log subscriber.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "widget_catalog=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A second call (tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn runner(args: &AnalysisArgs, output: Option<&PathBuf>) -> anyhow::Result<Runner> {
    let mut config = CatalogConfig::load(args.config.as_deref())?;
    if let Some(output) = output {
        config.output = output.clone();
    }
    let runner = Runner::new(&args.flutter_root, config).jobs(args.jobs);
    runner.lib_dir()?;
    Ok(runner)
}

fn version_provider(args: &GenerateArgs) -> Box<dyn VersionProvider> {
    match (&args.framework_version, &args.channel) {
        (Some(version), Some(channel)) => Box::new(FixedVersion::new(version, channel)),
        _ => Box::new(FlutterVersionFile::new(&args.analysis.flutter_root)),
    }
}

/// Run the generate command.
pub fn run_generate(args: &GenerateArgs) -> anyhow::Result<i32> {
    let runner = runner(&args.analysis, args.output.as_ref())?.show_progress(true);
    let version = version_provider(args);
    let info = version.version_info()?;

    report::write_header(&args.analysis.flutter_root, &info);
    let (run, summary) = runner.generate(&FixedVersion(info))?;

    report::write_step(&format!("Analyzed {} libraries", run.libraries));
    report::write_step(&format!(
        "Selected {} of {} classes",
        run.entries.len(),
        run.classes
    ));
    report::write_summary(&summary);

    Ok(EXIT_SUCCESS)
}

/// Run the show command.
pub fn run_show(args: &ShowArgs) -> anyhow::Result<i32> {
    let runner = runner(&args.analysis, None)?;
    match runner.show(&args.name)? {
        Some(entry) => {
            report::write_entry(&entry)?;
            Ok(EXIT_SUCCESS)
        }
        None => {
            report::write_error(
                "NotFound",
                &format!(
                    "{} is not a cataloged subtype of {}",
                    args.name,
                    runner.config().root_type
                ),
            );
            Ok(EXIT_ERROR)
        }
    }
}
