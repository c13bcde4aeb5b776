use crate::config::DocumentatorConfig;
use crate::detector::{DetectionResult, FrameworkDetector};
use crate::discovery::actix::ActixSource;
use crate::discovery::axum::AxumSource;
use crate::discovery::OperationSource;
use crate::error::Error;
use crate::parser::{AstParser, ParsedFile};
use crate::pipeline::build_document;
use crate::scanner::FileScanner;
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::path::PathBuf;

/// Build an endpoint catalog and navigation tree from the source of a Rust web project
#[derive(Parser, Debug)]
#[command(name = "apidoc-from-source")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the Rust project directory
    #[arg(value_name = "PROJECT_PATH")]
    pub project_path: PathBuf,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Specify the web framework to parse (if not specified, auto-detect)
    #[arg(short = 'w', long = "framework", value_enum)]
    pub framework: Option<Framework>,

    /// Configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_path: Option<PathBuf>,

    /// Which part of the document to output
    #[arg(long = "view", value_enum, default_value = "full")]
    pub view: View,

    /// Override the example depth limit from the configuration
    #[arg(long = "max-depth", value_name = "N")]
    pub max_depth: Option<usize>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Output views
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum View {
    /// Catalog, tree and diagnostics
    Full,
    /// Flat endpoint list
    Catalog,
    /// Navigation tree
    Tree,
}

/// Supported web frameworks
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Framework {
    /// Axum framework
    Axum,
    /// Actix-Web framework
    #[value(name = "actix-web")]
    ActixWeb,
}

impl Framework {
    /// The discovery source for this framework
    pub fn source(&self) -> Box<dyn OperationSource> {
        match self {
            Framework::Axum => Box::new(AxumSource),
            Framework::ActixWeb => Box::new(ActixSource),
        }
    }
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.project_path.exists() {
        anyhow::bail!(
            "Project path does not exist: {}",
            args.project_path.display()
        );
    }

    if !args.project_path.is_dir() {
        anyhow::bail!(
            "Project path is not a directory: {}",
            args.project_path.display()
        );
    }

    if let Some(config) = &args.config_path {
        if !config.is_file() {
            anyhow::bail!("Configuration file does not exist: {}", config.display());
        }
    }

    info!("Project path: {}", args.project_path.display());
    info!("Output format: {:?}, view: {:?}", args.output_format, args.view);
    if let Some(ref output) = args.output_path {
        info!("Output file: {}", output.display());
    } else {
        info!("Output: stdout");
    }
    if let Some(ref framework) = args.framework {
        info!("Framework: {:?}", framework);
    } else {
        info!("Framework: auto-detect");
    }

    Ok(args)
}

/// Load the configuration named on the command line, or the defaults
pub fn load_config(args: &CliArgs) -> Result<DocumentatorConfig> {
    let config = match &args.config_path {
        Some(path) => DocumentatorConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => DocumentatorConfig::default(),
    };

    match args.max_depth {
        Some(depth) => Ok(config.with_max_example_depth(depth)?),
        None => Ok(config),
    }
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting documentation build...");
    let config = load_config(&args)?;

    // Step 1: Scan directory for Rust files
    info!("Scanning project directory...");
    let scanner = FileScanner::new(args.project_path.clone());
    let scan_result = scanner.scan()?;

    info!("Found {} Rust files", scan_result.rust_files.len());
    for warning in &scan_result.warnings {
        warn!("{}", warning);
    }

    if scan_result.rust_files.is_empty() {
        anyhow::bail!("No Rust files found in the project directory");
    }

    // Step 2: Parse files into AST, skipping files with syntax errors
    info!("Parsing Rust files...");
    let parsed_files: Vec<ParsedFile> = AstParser::parse_files(&scan_result.rust_files)
        .into_iter()
        .filter_map(|r| match r {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                debug!("Skipping file due to parse error: {}", e);
                None
            }
        })
        .collect();

    info!("Successfully parsed {} files", parsed_files.len());

    if parsed_files.is_empty() {
        anyhow::bail!("No files could be parsed successfully");
    }

    // Step 3: Detect framework (or use user-specified framework)
    let frameworks = if let Some(framework) = args.framework {
        info!("Using user-specified framework: {:?}", framework);
        vec![framework]
    } else {
        info!("Detecting web frameworks...");
        let detection_result: DetectionResult = FrameworkDetector::detect(&parsed_files);

        if detection_result.frameworks.is_empty() {
            return Err(Error::FrameworkNotDetected).context(
                "Please specify a framework using --framework option. \
                 Supported frameworks: axum, actix-web",
            );
        }

        info!("Detected frameworks: {:?}", detection_result.frameworks);
        detection_result.frameworks
    };

    // Step 4: Discover, document, deduplicate and build the tree
    let sources: Vec<Box<dyn OperationSource>> = frameworks.iter().map(Framework::source).collect();
    let document = build_document(&sources, &parsed_files, &config);

    if document.endpoints.is_empty() {
        warn!("No endpoints found in the project");
    }

    // Step 5: Serialize the requested view
    info!("Serializing to {:?} format...", args.output_format);
    let content = match (args.output_format, args.view) {
        (OutputFormat::Yaml, View::Full) => serialize_yaml(&document)?,
        (OutputFormat::Yaml, View::Catalog) => serialize_yaml(&document.catalog_view())?,
        (OutputFormat::Yaml, View::Tree) => serialize_yaml(&document.tree_view())?,
        (OutputFormat::Json, View::Full) => serialize_json(&document)?,
        (OutputFormat::Json, View::Catalog) => serialize_json(&document.catalog_view())?,
        (OutputFormat::Json, View::Tree) => serialize_json(&document.tree_view())?,
    };

    // Step 6: Output to file or stdout
    if let Some(output_path) = &args.output_path {
        info!("Writing output to: {}", output_path.display());
        write_to_file(&content, output_path)?;
    } else {
        println!("{}", content);
    }

    let diagnostics = document.diagnostics;
    info!("Summary:");
    info!("  - Files scanned: {}", scan_result.rust_files.len());
    info!("  - Files parsed: {}", parsed_files.len());
    info!("  - Operations discovered: {}", diagnostics.discovered);
    info!("  - Endpoints documented: {}", document.endpoints.len());
    info!(
        "  - Excluded: {}, duplicates resolved: {}, degenerate dropped: {}",
        diagnostics.excluded, diagnostics.duplicates_resolved, diagnostics.degenerate_dropped
    );
    info!(
        "  - Parameters skipped: {}, service parameters: {}",
        diagnostics.skipped_parameters, diagnostics.service_parameters
    );
    info!("  - Frameworks: {:?}", frameworks);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn args(project: &std::path::Path, extra: &[&str]) -> CliArgs {
        let mut argv = vec!["apidoc-from-source".to_string(), project.display().to_string()];
        argv.extend(extra.iter().map(|s| s.to_string()));
        CliArgs::parse_from(argv)
    }

    #[test]
    fn test_parse_defaults() {
        let dir = TempDir::new().unwrap();
        let parsed = args(dir.path(), &[]);
        assert!(matches!(parsed.output_format, OutputFormat::Yaml));
        assert_eq!(parsed.view, View::Full);
        assert!(parsed.framework.is_none());
        assert!(parsed.max_depth.is_none());
    }

    #[test]
    fn test_parse_all_flags() {
        let dir = TempDir::new().unwrap();
        let parsed = args(
            dir.path(),
            &["-f", "json", "-w", "actix-web", "--view", "tree", "--max-depth", "2", "-v"],
        );
        assert!(matches!(parsed.output_format, OutputFormat::Json));
        assert_eq!(parsed.framework, Some(Framework::ActixWeb));
        assert_eq!(parsed.view, View::Tree);
        assert_eq!(parsed.max_depth, Some(2));
        assert!(parsed.verbose);
    }

    #[test]
    fn test_validation_rejects_missing_paths() {
        let dir = TempDir::new().unwrap();
        let missing = args(&dir.path().join("nope"), &[]);
        assert!(parse_args_from_parsed(missing).is_err());

        let missing_config = args(dir.path(), &["-c", "does-not-exist.yaml"]);
        assert!(parse_args_from_parsed(missing_config).is_err());
    }

    #[test]
    fn test_load_config_with_depth_override() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("apidoc.yaml");
        fs::write(&config_path, "api_name: Shop\nmax_example_depth: 6\n").unwrap();

        let config = load_config(&args(
            dir.path(),
            &["-c", config_path.to_str().unwrap(), "--max-depth", "3"],
        ))
        .unwrap();
        assert_eq!(config.api_name, "Shop");
        assert_eq!(config.max_example_depth, 3);

        let zero = load_config(&args(dir.path(), &["--max-depth", "0"]));
        assert!(zero.is_err());
    }

    #[test]
    fn test_run_writes_tree_view() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("main.rs"),
            r#"
            use axum::{routing::get, Json, Router};
            pub struct Ping { pub ok: bool }
            pub fn app() -> Router { Router::new().route("/ping", get(ping)) }
            async fn ping() -> Json<Ping> { todo!() }
            "#,
        )
        .unwrap();
        let output = dir.path().join("out").join("tree.json");

        run(args(
            dir.path(),
            &["-f", "json", "--view", "tree", "-o", output.to_str().unwrap()],
        ))
        .unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["tree"][0]["name"], "ping");
        assert_eq!(written["tree"][0]["endpoints"][0]["returnType"], "Ping");
    }

    #[test]
    fn test_run_without_framework_fails() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("lib.rs"), "pub fn nothing() {}").unwrap();
        let err = run(args(dir.path(), &[])).unwrap_err();
        assert!(err.downcast_ref::<Error>().is_some());
    }
}
