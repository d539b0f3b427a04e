//! widget-catalog CLI entry point.

use clap::Parser;
use widget_catalog::cli::{self, Cli, Commands, EXIT_ERROR};
use widget_catalog::report;
use widget_catalog::CatalogError;

fn main() {
    let cli = Cli::parse();
    cli::init_logging(cli.verbose);

    let result = match &cli.command {
        Commands::Generate(args) => cli::run_generate(args),
        Commands::Show(args) => cli::run_show(args),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            let kind = e
                .downcast_ref::<CatalogError>()
                .map_or("Error", CatalogError::kind);
            report::write_error(kind, &format!("{:#}", e));
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
