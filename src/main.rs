//! apidoc-from-source: build an endpoint catalog from a Rust web project's source.
//!
//! # Usage
//!
//! ```bash
//! apidoc-from-source [OPTIONS] <PROJECT_PATH>
//! ```
//!
//! # Examples
//!
//! Write the full document as YAML:
//! ```bash
//! apidoc-from-source ./my-api-project -o apidoc.yaml
//! ```
//!
//! Only the navigation tree, as JSON, with a configuration file:
//! ```bash
//! apidoc-from-source ./my-api-project -c apidoc.yaml -f json --view tree
//! ```

use anyhow::Result;
use apidoc_from_source::cli;
use clap::Parser;
use log::info;

fn main() -> Result<()> {
    // Parse once up front so the verbose flag can set the log level
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("apidoc-from-source starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    info!("Documentation build completed successfully");

    Ok(())
}
