//! apidoc-from-source - Endpoint catalogs and navigation trees from Rust web projects.
//!
//! The library reads a project's source statically, discovers its HTTP operations and
//! turns them into a deduplicated catalog of endpoint descriptors. Each descriptor carries
//! classified parameters, a depth-bounded schema of the return type and a sample JSON
//! payload. A route tree groups the endpoints for navigation.
//!
//! # Supported Frameworks
//!
//! - **Axum**: `Router` chains, nested routers and handler signatures
//! - **Actix-Web**: route macros (`#[get]`, `#[post]`, ...), scopes and `web::resource`
//!
//! # Architecture
//!
//! 1. [`scanner`] - Finds the Rust files of a project
//! 2. [`parser`] - Parses them with `syn`
//! 3. [`detector`] - Detects which web frameworks are used
//! 4. [`discovery`] - Framework sources producing raw operations
//! 5. [`type_table`] - Struct and enum definitions behind the [`type_descriptor`] view
//! 6. [`classifier`] - Decides where each parameter comes from
//! 7. [`schema`] - Depth-bounded, cycle-safe schemas and sample values
//! 8. [`parameters`] - Rendered parameter descriptors and descriptions
//! 9. [`catalog`] - Exclusion, deduplication and identifiers
//! 10. [`route_tree`] - Navigation tree over the catalog
//! 11. [`pipeline`] - Ties the steps together into an [`pipeline::ApiDocument`]
//! 12. [`serializer`] - YAML or JSON output
//!
//! # Example Usage
//!
//! ```no_run
//! use apidoc_from_source::{
//!     cli::Framework,
//!     config::DocumentatorConfig,
//!     parser::AstParser,
//!     pipeline::build_document,
//!     scanner::FileScanner,
//!     serializer::serialize_yaml,
//! };
//! use std::path::PathBuf;
//!
//! let scan_result = FileScanner::new(PathBuf::from("./my-project")).scan().unwrap();
//! let parsed_files: Vec<_> = AstParser::parse_files(&scan_result.rust_files)
//!     .into_iter()
//!     .filter_map(Result::ok)
//!     .collect();
//!
//! let sources = vec![Framework::Axum.source()];
//! let document = build_document(&sources, &parsed_files, &DocumentatorConfig::default());
//!
//! println!("{}", serialize_yaml(&document.catalog_view()).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! See the [`cli`] module.

pub mod catalog;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod detector;
pub mod discovery;
pub mod docs;
pub mod error;
pub mod parameters;
pub mod parser;
pub mod pipeline;
pub mod route_tree;
pub mod sample;
pub mod scanner;
pub mod schema;
pub mod serializer;
pub mod type_descriptor;
pub mod type_name;
pub mod type_table;
