//! One documentation build, from parsed files to the finished document.
//!
//! A [`DocumentationContext`] holds everything a build needs (configuration, service
//! registry, type table). Nothing is cached between builds: each call to
//! [`build_document`] rediscovers operations and regenerates every schema.

use crate::catalog::{CatalogBuilder, EndpointDescriptor};
use crate::classifier::ConfiguredServices;
use crate::config::DocumentatorConfig;
use crate::discovery::{OperationSource, RawOperation};
use crate::parameters::{operation_summary, ParameterBuilder};
use crate::parser::ParsedFile;
use crate::route_tree::{build_route_tree, RouteTreeNode};
use crate::schema::{render_example, SchemaGenerator};
use crate::type_name::type_label;
use crate::type_table::{TypeExpr, TypeTable};
use log::{debug, info};
use serde::Serialize;

/// Document metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiInfo {
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Counters describing what happened during a build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub discovered: usize,
    pub excluded: usize,
    pub duplicates_resolved: usize,
    pub degenerate_dropped: usize,
    pub skipped_parameters: usize,
    pub service_parameters: usize,
}

/// The complete documentation output
#[derive(Debug, Clone, Serialize)]
pub struct ApiDocument {
    pub info: ApiInfo,
    pub endpoints: Vec<EndpointDescriptor>,
    pub tree: Vec<RouteTreeNode>,
    pub diagnostics: Diagnostics,
}

/// Flat endpoint list without the tree
#[derive(Debug, Serialize)]
pub struct CatalogView<'a> {
    pub info: &'a ApiInfo,
    pub endpoints: &'a [EndpointDescriptor],
}

/// Navigation tree without the flat list
#[derive(Debug, Serialize)]
pub struct TreeView<'a> {
    pub info: &'a ApiInfo,
    pub tree: &'a [RouteTreeNode],
}

impl ApiDocument {
    pub fn catalog_view(&self) -> CatalogView<'_> {
        CatalogView {
            info: &self.info,
            endpoints: &self.endpoints,
        }
    }

    pub fn tree_view(&self) -> TreeView<'_> {
        TreeView {
            info: &self.info,
            tree: &self.tree,
        }
    }

    /// Look up an endpoint by id
    pub fn find_endpoint(&self, id: &str) -> Option<&EndpointDescriptor> {
        self.endpoints.iter().find(|e| e.id == id)
    }
}

/// Endpoint descriptors for a batch of operations, with parameter counters
#[derive(Debug, Default)]
pub struct DocumentedOperations {
    pub endpoints: Vec<EndpointDescriptor>,
    pub skipped_parameters: usize,
    pub service_parameters: usize,
}

/// Everything one build needs
pub struct DocumentationContext<'a> {
    config: &'a DocumentatorConfig,
    registry: ConfiguredServices,
    types: TypeTable,
}

impl<'a> DocumentationContext<'a> {
    pub fn new(config: &'a DocumentatorConfig, parsed_files: &[ParsedFile]) -> Self {
        Self {
            config,
            registry: ConfiguredServices::new(&config.service_types),
            types: TypeTable::new(parsed_files),
        }
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    /// Turn raw operations into endpoint descriptors (ids are assigned by the catalog)
    pub fn document_operations(&self, operations: Vec<RawOperation<TypeExpr>>) -> DocumentedOperations {
        let generator = SchemaGenerator::new(self.config.max_example_depth);
        let builder = ParameterBuilder::new(generator, &self.registry);
        let mut documented = DocumentedOperations::default();

        for operation in operations {
            let operation = operation.map_types(|expr| self.types.describe(expr));
            debug!("Documenting {} {}", operation.method, operation.route);

            let built = builder.build(&operation);
            documented.skipped_parameters += built.skipped;
            documented.service_parameters += built.services;

            let return_schema = operation.return_type.as_ref().map(|ty| generator.generate(ty));
            let example_json = return_schema
                .as_ref()
                .and_then(|schema| schema.example.as_ref())
                .map(render_example);

            documented.endpoints.push(EndpointDescriptor {
                id: String::new(),
                http_method: operation.method,
                summary: operation_summary(&operation.docs, &operation.handler_name),
                description: built.description,
                parameters: built.parameters,
                return_type_label: type_label(operation.return_type.as_ref()),
                return_schema,
                example_json,
                route: operation.route,
            });
        }

        documented
    }
}

/// Run every discovery source over the parsed files and build the document
pub fn build_document(
    sources: &[Box<dyn OperationSource>],
    parsed_files: &[ParsedFile],
    config: &DocumentatorConfig,
) -> ApiDocument {
    let context = DocumentationContext::new(config, parsed_files);

    let mut operations = Vec::new();
    for source in sources {
        let discovered = source.discover(parsed_files);
        info!("{} source discovered {} operations", source.name(), discovered.len());
        operations.extend(discovered);
    }
    let discovered = operations.len();

    let documented = context.document_operations(operations);
    let catalog = CatalogBuilder::new(config).build(documented.endpoints);
    let stats = catalog.stats();
    let endpoints = catalog.into_endpoints();
    let tree = build_route_tree(&endpoints);

    ApiDocument {
        info: ApiInfo {
            title: config.api_name.clone(),
            version: config.version.clone(),
            description: config.description.clone(),
        },
        endpoints,
        tree,
        diagnostics: Diagnostics {
            discovered,
            excluded: stats.excluded,
            duplicates_resolved: stats.duplicates_resolved,
            degenerate_dropped: stats.degenerate_dropped,
            skipped_parameters: documented.skipped_parameters,
            service_parameters: documented.service_parameters,
        },
    }
}
