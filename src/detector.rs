use crate::cli::Framework;
use crate::parser::ParsedFile;
use log::debug;
use std::collections::BTreeSet;
use syn::visit::Visit;
use syn::UseTree;

/// Framework detector for identifying web frameworks used in a Rust project.
///
/// A framework counts as used when any file imports it (`use axum::...`, also inside
/// functions and inline modules) or refers to it by a qualified path such as
/// `actix_web::web::get()` or `#[actix_web::main]`.
pub struct FrameworkDetector;

/// Result of framework detection.
pub struct DetectionResult {
    /// Detected frameworks, in a stable order
    pub frameworks: Vec<Framework>,
}

impl FrameworkDetector {
    /// Detects web frameworks used in the provided parsed files.
    ///
    /// # Arguments
    ///
    /// * `parsed_files` - Slice of successfully parsed Rust files to analyze
    ///
    /// # Example
    ///
    /// ```no_run
    /// use apidoc_from_source::detector::FrameworkDetector;
    /// use apidoc_from_source::parser::AstParser;
    /// use std::path::Path;
    ///
    /// let parsed = AstParser::parse_file(Path::new("src/main.rs")).unwrap();
    /// let result = FrameworkDetector::detect(&[parsed]);
    /// println!("Detected {} framework(s)", result.frameworks.len());
    /// ```
    pub fn detect(parsed_files: &[ParsedFile]) -> DetectionResult {
        debug!("Detecting frameworks in {} files", parsed_files.len());

        let mut visitor = FrameworkUsage::default();
        for parsed_file in parsed_files {
            visitor.visit_file(&parsed_file.syntax_tree);
        }

        let frameworks: Vec<Framework> = visitor.detected.into_iter().collect();
        debug!("Detected frameworks: {:?}", frameworks);

        DetectionResult { frameworks }
    }
}

#[derive(Default)]
struct FrameworkUsage {
    detected: BTreeSet<Framework>,
}

impl FrameworkUsage {
    fn record(&mut self, crate_name: &str) {
        match crate_name {
            "axum" => {
                self.detected.insert(Framework::Axum);
            }
            "actix_web" => {
                self.detected.insert(Framework::ActixWeb);
            }
            _ => {}
        }
    }

    /// Only the root of a use tree names a crate
    fn check_use_root(&mut self, tree: &UseTree) {
        match tree {
            UseTree::Path(path) => self.record(&path.ident.to_string()),
            UseTree::Name(name) => self.record(&name.ident.to_string()),
            UseTree::Rename(rename) => self.record(&rename.ident.to_string()),
            UseTree::Group(group) => {
                for item in &group.items {
                    self.check_use_root(item);
                }
            }
            UseTree::Glob(_) => {}
        }
    }
}

impl<'ast> Visit<'ast> for FrameworkUsage {
    fn visit_item_use(&mut self, node: &'ast syn::ItemUse) {
        self.check_use_root(&node.tree);
    }

    fn visit_path(&mut self, node: &'ast syn::Path) {
        if node.segments.len() > 1 {
            if let Some(first) = node.segments.first() {
                self.record(&first.ident.to_string());
            }
        }
        syn::visit::visit_path(self, node);
    }
}
