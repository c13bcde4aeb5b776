//! Documentation build configuration.
//!
//! Every field has a default, so an empty YAML file (or no file at all) yields a working
//! configuration:
//!
//! ```yaml
//! api_name: Orders API
//! version: 2.1.0
//! excluded_route_prefixes: ["/internal", "/metrics"]
//! max_example_depth: 3
//! always_keep: ["/health", "POST /webhooks"]
//! tie_break_order: [known_return_type, most_parameters]
//! ```

use crate::error::{Error, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Criteria used to pick one operation out of a duplicate `(route, method)` group.
///
/// Each criterion prefers the candidate that scores higher; the first criterion that
/// separates two candidates decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// More discovered parameters wins
    MostParameters,
    /// A resolvable return type wins over `Unknown`
    KnownReturnType,
    /// A summary without the disambiguation marker wins
    UndisambiguatedSummary,
}

/// Configuration for one documentation build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentatorConfig {
    /// Document title
    pub api_name: String,
    /// Document version
    pub version: String,
    /// Free-text document description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Routes starting with any of these prefixes are dropped (case-insensitive)
    pub excluded_route_prefixes: Vec<String>,
    /// Recursion depth after which examples degrade to a sentinel
    pub max_example_depth: usize,
    /// Degenerate operations kept anyway: a route (`/health`) or `METHOD route`
    pub always_keep: Vec<String>,
    /// Duplicate resolution order
    pub tie_break_order: Vec<TieBreak>,
    /// Marker whose presence in a summary loses the summary tie-break
    pub disambiguation_marker: String,
    /// Type names resolved from the service registry rather than the request
    pub service_types: Vec<String>,
}

pub const DEFAULT_MAX_EXAMPLE_DEPTH: usize = 4;

impl Default for DocumentatorConfig {
    fn default() -> Self {
        Self {
            api_name: "Generated API".to_string(),
            version: "1.0.0".to_string(),
            description: None,
            excluded_route_prefixes: vec!["/get-metadata".to_string(), "/openapi".to_string()],
            max_example_depth: DEFAULT_MAX_EXAMPLE_DEPTH,
            always_keep: Vec::new(),
            tie_break_order: vec![
                TieBreak::MostParameters,
                TieBreak::KnownReturnType,
                TieBreak::UndisambiguatedSummary,
            ],
            disambiguation_marker: " (".to_string(),
            service_types: [
                "HttpRequest",
                "HeaderMap",
                "Request",
                "Method",
                "Uri",
                "OriginalUri",
                "ConnectInfo",
                "Extensions",
                "Payload",
                "CancellationToken",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl DocumentatorConfig {
    /// Load a configuration file, filling absent keys with defaults
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path)?;
        let config = Self::from_yaml(&content).map_err(|e| match e {
            Error::ConfigError { message, .. } => Error::ConfigError {
                file: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        Ok(config)
    }

    /// Parse a configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to a mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = serde_yaml::from_str(content).map_err(|e| Error::ConfigError {
            file: Default::default(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_example_depth == 0 {
            return Err(Error::InvalidArgument(
                "max_example_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply a depth override from the command line
    pub fn with_max_example_depth(mut self, depth: usize) -> Result<Self> {
        self.max_example_depth = depth;
        self.validate()?;
        Ok(self)
    }
}
