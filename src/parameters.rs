//! Per-operation parameter list and description assembly.

use crate::classifier::{classify, OperationContext, ParameterSource, ServiceRegistry};
use crate::discovery::{route_placeholders, ParameterAnnotation, RawOperation, RawParameter};
use crate::docs::DocComment;
use crate::schema::{SchemaGenerator, SchemaNode};
use crate::type_descriptor::TypeDescriptor;
use crate::type_name::type_label;
use log::{debug, warn};
use serde::Serialize;

/// One documented parameter of an endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub type_label: String,
    pub source: ParameterSource,
    pub required: bool,
    pub is_collection: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaNode>,
}

/// Output of [`ParameterBuilder::build`]
#[derive(Debug, Clone, Default)]
pub struct BuiltParameters {
    /// Rendered parameters, in signature order with query objects expanded in place
    pub parameters: Vec<ParameterDescriptor>,
    /// Free-text description of the operation
    pub description: String,
    /// Parameters dropped for having no usable name
    pub skipped: usize,
    /// Parameters resolved from the service registry
    pub services: usize,
}

/// Builds parameter descriptors and the description text for one operation
pub struct ParameterBuilder<'a> {
    generator: SchemaGenerator,
    registry: &'a dyn ServiceRegistry,
}

impl<'a> ParameterBuilder<'a> {
    pub fn new(generator: SchemaGenerator, registry: &'a dyn ServiceRegistry) -> Self {
        Self {
            generator,
            registry,
        }
    }

    pub fn build<T: TypeDescriptor>(&self, operation: &RawOperation<T>) -> BuiltParameters {
        let placeholders = route_placeholders(&operation.route);
        let context = OperationContext {
            method: operation.method,
            placeholders: &placeholders,
            content: &operation.request_content,
        };

        let mut built = BuiltParameters::default();
        let mut lines = Vec::new();
        if let Some(summary) = &operation.docs.summary {
            lines.push(trim_punctuation(summary));
        }

        for parameter in &operation.parameters {
            if !is_valid_name(&parameter.name) {
                warn!(
                    "Skipping parameter '{}' of {} {}: not a valid name",
                    parameter.name, operation.method, operation.route
                );
                built.skipped += 1;
                continue;
            }

            let source = classify(parameter, &context, self.registry);
            let label = type_label(Some(&parameter.ty));

            if source == ParameterSource::Service {
                debug!(
                    "Parameter '{}' ({}) of {} {} is a service",
                    parameter.name, label, operation.method, operation.route
                );
                built.services += 1;
                lines.push(format!("Service: {}", label));
                continue;
            }

            if let Some(doc) = &parameter.documentation {
                lines.push(format!("{} ({}): {}", parameter.name, label, trim_punctuation(doc)));
            }

            if let Some(expanded) = self.expand_query_object(parameter, source) {
                built.parameters.extend(expanded);
            } else {
                built.parameters.push(self.single(parameter, source, label));
            }
        }

        if let Some(returns) = &operation.docs.returns {
            lines.push(format!("Returns: {}", trim_punctuation(returns)));
        }
        if let Some(remarks) = &operation.docs.remarks {
            lines.push(format!("Remarks: {}", trim_punctuation(remarks)));
        }

        lines.retain(|line| !line.is_empty());
        built.description = if lines.is_empty() {
            operation.handler_name.clone()
        } else {
            lines.join("\n")
        };
        built
    }

    fn single<T: TypeDescriptor>(
        &self,
        parameter: &RawParameter<T>,
        source: ParameterSource,
        label: String,
    ) -> ParameterDescriptor {
        let inner = parameter.ty.unwrap_nullable();
        let element = inner.element_type();

        let schema = match source {
            ParameterSource::Body | ParameterSource::Form => Some(self.generator.generate(&inner)),
            ParameterSource::Query if inner.leaf_kind().is_none() => {
                Some(self.generator.generate(&inner))
            }
            _ => None,
        };

        ParameterDescriptor {
            name: parameter.name.clone(),
            type_label: label,
            source,
            required: !parameter.is_optional
                && (!parameter.ty.is_nullable() || parameter.has(ParameterAnnotation::Required)),
            is_collection: element.is_some(),
            element_type: element.as_ref().map(|e| type_label(Some(e))),
            description: parameter
                .documentation
                .as_deref()
                .map(trim_punctuation)
                .unwrap_or_else(|| default_description(source).to_string()),
            schema,
        }
    }

    /// A query object arrives as one query key per property
    fn expand_query_object<T: TypeDescriptor>(
        &self,
        parameter: &RawParameter<T>,
        source: ParameterSource,
    ) -> Option<Vec<ParameterDescriptor>> {
        if source != ParameterSource::Query || !parameter.has(ParameterAnnotation::FromQuery) {
            return None;
        }

        let inner = parameter.ty.unwrap_nullable();
        if inner.leaf_kind().is_some() || inner.is_collection() {
            return None;
        }
        let properties = inner.properties();
        if properties.is_empty() {
            return None;
        }

        let fallback = parameter
            .documentation
            .as_deref()
            .map(trim_punctuation)
            .unwrap_or_else(|| default_description(source).to_string());

        let expanded = properties
            .into_iter()
            .map(|property| {
                let property_inner = property.ty.unwrap_nullable();
                let element = property_inner.element_type();
                ParameterDescriptor {
                    name: property.wire_name(),
                    type_label: type_label(Some(&property.ty)),
                    source,
                    required: property.required,
                    is_collection: element.is_some(),
                    element_type: element.as_ref().map(|e| type_label(Some(e))),
                    description: property
                        .documentation
                        .as_deref()
                        .map(trim_punctuation)
                        .unwrap_or_else(|| fallback.clone()),
                    schema: property_inner
                        .leaf_kind()
                        .is_none()
                        .then(|| self.generator.generate(&property_inner)),
                }
            })
            .collect();
        Some(expanded)
    }
}

/// Summary line of an operation: its doc summary, else the handler name
pub fn operation_summary(docs: &DocComment, handler_name: &str) -> String {
    docs.summary
        .as_deref()
        .map(|s| s.trim().trim_end_matches('.').to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| handler_name.to_string())
}

fn default_description(source: ParameterSource) -> &'static str {
    match source {
        ParameterSource::Path => "Route parameter",
        ParameterSource::Query => "Query parameter",
        ParameterSource::Body => "Request body",
        ParameterSource::Form => "Form field",
        ParameterSource::Service | ParameterSource::Unknown => "",
    }
}

/// Names produced by compilers or patterns rather than written by a developer
fn is_valid_name(name: &str) -> bool {
    let name = name.trim();
    !name.is_empty()
        && name != "_"
        && !name.contains(['<', '>', '$'])
        && !name.starts_with("b__")
}

fn trim_punctuation(text: &str) -> String {
    text.trim()
        .trim_end_matches(['.', ';', ','])
        .trim_end()
        .to_string()
}
