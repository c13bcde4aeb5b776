//! Serialization of the documentation output to YAML or JSON.
//!
//! Any serializable view works: the full [`crate::pipeline::ApiDocument`], its catalog
//! view or its tree view.

use anyhow::{Context, Result};
use log::debug;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Serializes a value to YAML.
///
/// # Example
///
/// ```ignore
/// use apidoc_from_source::serializer::serialize_yaml;
///
/// let yaml = serialize_yaml(&document.catalog_view()).unwrap();
/// println!("{}", yaml);
/// ```
pub fn serialize_yaml<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    debug!("Serializing document to YAML");
    serde_yaml::to_string(value).context("Failed to serialize document to YAML")
}

/// Serializes a value to pretty-printed JSON.
pub fn serialize_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    debug!("Serializing document to JSON");
    serde_json::to_string_pretty(value).context("Failed to serialize document to JSON")
}

/// Writes string content to a file, creating parent directories as needed.
///
/// Overwrites the file if it already exists.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{endpoint_id, EndpointDescriptor};
    use crate::discovery::HttpMethod;
    use crate::pipeline::{ApiDocument, ApiInfo, Diagnostics};
    use crate::route_tree::build_route_tree;
    use tempfile::TempDir;

    /// Helper function to create a small document for testing
    fn create_test_document() -> ApiDocument {
        let endpoints = vec![EndpointDescriptor {
            id: endpoint_id(HttpMethod::Get, "/users/{id}"),
            http_method: HttpMethod::Get,
            route: "/users/{id}".to_string(),
            summary: "Fetch a user".to_string(),
            description: "Fetch a user".to_string(),
            parameters: Vec::new(),
            return_type_label: "User".to_string(),
            return_schema: None,
            example_json: Some("{}".to_string()),
        }];
        let tree = build_route_tree(&endpoints);
        ApiDocument {
            info: ApiInfo {
                title: "Test API".to_string(),
                version: "1.0.0".to_string(),
                description: Some("A test API".to_string()),
            },
            endpoints,
            tree,
            diagnostics: Diagnostics::default(),
        }
    }

    #[test]
    fn test_serialize_yaml() {
        let doc = create_test_document();
        let yaml = serialize_yaml(&doc).unwrap();

        assert!(yaml.contains("info:"));
        assert!(yaml.contains("title: Test API"));
        assert!(yaml.contains("method: GET"));
        assert!(yaml.contains("returnType: User"));
        assert!(yaml.contains("tree:"));
        assert!(yaml.contains("diagnostics:"));

        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed["endpoints"][0]["route"].as_str(), Some("/users/{id}"));
    }

    #[test]
    fn test_serialize_json() {
        let doc = create_test_document();
        let json = serialize_json(&doc).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["info"]["title"], "Test API");
        assert_eq!(parsed["endpoints"][0]["method"], "GET");
        assert_eq!(parsed["endpoints"][0]["exampleJson"], "{}");
        assert_eq!(parsed["tree"][0]["name"], "users");
        assert_eq!(parsed["diagnostics"]["duplicatesResolved"], 0);
        assert!(parsed["endpoints"][0].get("returnSchema").is_none());
    }

    #[test]
    fn test_serialize_json_pretty_format() {
        let doc = create_test_document();
        let json = serialize_json(&doc).unwrap();

        assert!(json.contains('\n'));
        assert!(json.contains("  "));
        assert!(json.lines().count() > 5, "Pretty printed JSON should have multiple lines");
    }

    #[test]
    fn test_serialize_views() {
        let doc = create_test_document();

        let catalog = serialize_yaml(&doc.catalog_view()).unwrap();
        assert!(catalog.contains("endpoints:"));
        assert!(!catalog.contains("tree:"));

        let tree: serde_json::Value =
            serde_json::from_str(&serialize_json(&doc.tree_view()).unwrap()).unwrap();
        assert!(tree.get("endpoints").is_none());
        assert_eq!(tree["tree"][0]["endpoints"][0]["route"], "/users/{id}");
    }

    #[test]
    fn test_write_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.yaml");
        let content = "test content";

        write_to_file(content, &file_path).unwrap();

        let read_content = fs::read_to_string(&file_path).unwrap();
        assert_eq!(read_content, content);
    }

    #[test]
    fn test_write_to_file_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("subdir").join("nested").join("test.yaml");

        write_to_file("test content", &file_path).unwrap();

        assert!(file_path.exists());
    }

    #[test]
    fn test_write_to_file_overwrites_existing() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.yaml");

        write_to_file("initial content", &file_path).unwrap();
        write_to_file("new content", &file_path).unwrap();

        let read_content = fs::read_to_string(&file_path).unwrap();
        assert_eq!(read_content, "new content");
    }

    #[test]
    fn test_write_json_file_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("api.json");

        let doc = create_test_document();
        write_to_file(&serialize_json(&doc).unwrap(), &file_path).unwrap();

        let content = fs::read_to_string(&file_path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["info"]["version"], "1.0.0");
    }
}
