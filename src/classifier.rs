//! Parameter source classification.
//!
//! Decides where a parameter's value comes from at request time. The decision is an
//! ordered chain of checks; the first one that matches wins, and the final fallback
//! guarantees every parameter gets exactly one source.

use crate::discovery::{ContentTypeHint, HttpMethod, ParameterAnnotation, RawParameter};
use crate::type_descriptor::TypeDescriptor;
use crate::type_name;
use serde::Serialize;

/// Origin of a parameter's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterSource {
    Path,
    Query,
    Body,
    Form,
    /// Injected by the framework or the application, not sent by the client
    Service,
    /// Reserved for hosts that cannot classify; the classifier never yields it
    Unknown,
}

impl ParameterSource {
    /// Whether the parameter is shown to API consumers
    pub fn is_rendered(&self) -> bool {
        !matches!(self, ParameterSource::Service | ParameterSource::Unknown)
    }
}

/// Probe for types the application resolves itself (state, request handles, ...)
pub trait ServiceRegistry {
    fn is_registered(&self, type_label: &str) -> bool;
}

/// Service registry backed by a list of type names.
///
/// Matching uses the base name only, so `ConnectInfo<SocketAddr>` matches `ConnectInfo`.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredServices {
    names: Vec<String>,
}

impl ConfiguredServices {
    pub fn new(names: &[String]) -> Self {
        Self {
            names: names.iter().map(|n| base_name(n).to_string()).collect(),
        }
    }
}

impl ServiceRegistry for ConfiguredServices {
    fn is_registered(&self, type_label: &str) -> bool {
        let base = base_name(type_label);
        self.names.iter().any(|name| name == base)
    }
}

fn base_name(label: &str) -> &str {
    label.split('<').next().unwrap_or(label).trim()
}

/// Operation-level facts the classifier needs
pub struct OperationContext<'a, T> {
    pub method: HttpMethod,
    /// Placeholder names of the route template
    pub placeholders: &'a [String],
    pub content: &'a [ContentTypeHint<T>],
}

/// Classify one parameter
pub fn classify<T: TypeDescriptor>(
    parameter: &RawParameter<T>,
    operation: &OperationContext<'_, T>,
    registry: &dyn ServiceRegistry,
) -> ParameterSource {
    if operation
        .placeholders
        .iter()
        .any(|p| p.eq_ignore_ascii_case(&parameter.name))
    {
        return ParameterSource::Path;
    }

    if parameter.has(ParameterAnnotation::FromQuery) {
        return ParameterSource::Query;
    }

    let identity = parameter.ty.unwrap_nullable().identity();
    let targets = |hint: &ContentTypeHint<T>| match &hint.target {
        Some(target) => target.unwrap_nullable().identity() == identity,
        None => true,
    };

    if parameter.has(ParameterAnnotation::FromForm)
        || operation.content.iter().any(|h| h.is_form() && targets(h))
    {
        return ParameterSource::Form;
    }

    // A JSON hint only claims the parameter of the exact type it was declared for
    let json_for_type = operation
        .content
        .iter()
        .any(|h| h.is_json() && h.target.is_some() && targets(h));
    if parameter.has(ParameterAnnotation::FromBody) || json_for_type {
        return ParameterSource::Body;
    }

    if parameter.has(ParameterAnnotation::FromServices) {
        return ParameterSource::Service;
    }

    if registry.is_registered(&type_name::type_label(Some(&parameter.ty.unwrap_nullable()))) {
        return ParameterSource::Service;
    }

    match operation.method {
        HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch => ParameterSource::Body,
        HttpMethod::Get | HttpMethod::Head => ParameterSource::Query,
        _ => ParameterSource::Body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{FORM_CONTENT, JSON_CONTENT};
    use crate::type_table::{SourceType, TypeExpr, TypeTable};
    use std::collections::BTreeSet;

    const ALL_METHODS: &[HttpMethod] = &[
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Options,
        HttpMethod::Head,
    ];

    const ALL_ANNOTATIONS: &[ParameterAnnotation] = &[
        ParameterAnnotation::FromQuery,
        ParameterAnnotation::FromForm,
        ParameterAnnotation::FromBody,
        ParameterAnnotation::FromServices,
        ParameterAnnotation::Required,
    ];

    fn param<'a>(
        table: &'a TypeTable,
        name: &str,
        ty: &str,
        annotations: &[ParameterAnnotation],
    ) -> RawParameter<SourceType<'a>> {
        RawParameter {
            name: name.to_string(),
            ty: table.describe(TypeExpr::new(ty)),
            annotations: annotations.iter().copied().collect(),
            documentation: None,
            is_optional: false,
        }
    }

    fn registry() -> ConfiguredServices {
        ConfiguredServices::new(&["HeaderMap".to_string(), "ConnectInfo".to_string()])
    }

    fn run(
        parameter: &RawParameter<SourceType<'_>>,
        method: HttpMethod,
        placeholders: &[String],
        content: &[ContentTypeHint<SourceType<'_>>],
    ) -> ParameterSource {
        let operation = OperationContext {
            method,
            placeholders,
            content,
        };
        classify(parameter, &operation, &registry())
    }

    #[test]
    fn test_route_placeholder_wins_regardless_of_annotations() {
        let table = TypeTable::default();
        let placeholders = vec!["id".to_string()];

        // Every subset of annotations, every verb
        for mask in 0..(1u32 << ALL_ANNOTATIONS.len()) {
            let annotations: Vec<_> = ALL_ANNOTATIONS
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, a)| *a)
                .collect();
            let p = param(&table, "id", "u32", &annotations);
            for method in ALL_METHODS {
                assert_eq!(run(&p, *method, &placeholders, &[]), ParameterSource::Path);
            }
        }
    }

    #[test]
    fn test_placeholder_match_is_case_insensitive() {
        let table = TypeTable::default();
        let p = param(&table, "userId", "u32", &[]);
        assert_eq!(
            run(&p, HttpMethod::Post, &["USERID".to_string()], &[]),
            ParameterSource::Path
        );
    }

    #[test]
    fn test_explicit_annotations() {
        let table = TypeTable::default();
        let cases = [
            (ParameterAnnotation::FromQuery, ParameterSource::Query),
            (ParameterAnnotation::FromForm, ParameterSource::Form),
            (ParameterAnnotation::FromBody, ParameterSource::Body),
            (ParameterAnnotation::FromServices, ParameterSource::Service),
        ];
        for (annotation, expected) in cases {
            let p = param(&table, "value", "Payload", &[annotation]);
            assert_eq!(run(&p, HttpMethod::Delete, &[], &[]), expected);
        }
    }

    #[test]
    fn test_query_annotation_beats_form_and_body() {
        let table = TypeTable::default();
        let p = param(
            &table,
            "filter",
            "Filter",
            &[ParameterAnnotation::FromBody, ParameterAnnotation::FromQuery],
        );
        assert_eq!(run(&p, HttpMethod::Post, &[], &[]), ParameterSource::Query);
    }

    #[test]
    fn test_form_content_hint() {
        let table = TypeTable::default();
        let p = param(&table, "name", "String", &[]);
        let untargeted = vec![ContentTypeHint {
            media_type: FORM_CONTENT.to_string(),
            target: None,
        }];
        assert_eq!(run(&p, HttpMethod::Get, &[], &untargeted), ParameterSource::Form);

        let other_type = vec![ContentTypeHint {
            media_type: FORM_CONTENT.to_string(),
            target: Some(table.describe(TypeExpr::new("Signup"))),
        }];
        assert_eq!(run(&p, HttpMethod::Get, &[], &other_type), ParameterSource::Query);
    }

    #[test]
    fn test_json_hint_only_for_exact_type() {
        let table = TypeTable::default();
        let content = vec![ContentTypeHint {
            media_type: JSON_CONTENT.to_string(),
            target: Some(table.describe(TypeExpr::new("CreateUser"))),
        }];

        let body = param(&table, "payload", "CreateUser", &[]);
        assert_eq!(run(&body, HttpMethod::Get, &[], &content), ParameterSource::Body);

        let other = param(&table, "page", "u32", &[]);
        assert_eq!(run(&other, HttpMethod::Get, &[], &content), ParameterSource::Query);
    }

    #[test]
    fn test_registry_probe() {
        let table = TypeTable::default();
        let headers = param(&table, "headers", "HeaderMap", &[]);
        assert_eq!(run(&headers, HttpMethod::Post, &[], &[]), ParameterSource::Service);

        let info = RawParameter {
            ty: table.describe(TypeExpr::generic(
                "ConnectInfo",
                vec![TypeExpr::new("SocketAddr")],
            )),
            ..param(&table, "info", "String", &[])
        };
        assert_eq!(run(&info, HttpMethod::Get, &[], &[]), ParameterSource::Service);
    }

    #[test]
    fn test_verb_fallbacks() {
        let table = TypeTable::default();
        let p = param(&table, "value", "String", &[]);
        assert_eq!(run(&p, HttpMethod::Post, &[], &[]), ParameterSource::Body);
        assert_eq!(run(&p, HttpMethod::Put, &[], &[]), ParameterSource::Body);
        assert_eq!(run(&p, HttpMethod::Patch, &[], &[]), ParameterSource::Body);
        assert_eq!(run(&p, HttpMethod::Get, &[], &[]), ParameterSource::Query);
        assert_eq!(run(&p, HttpMethod::Head, &[], &[]), ParameterSource::Query);
        assert_eq!(run(&p, HttpMethod::Delete, &[], &[]), ParameterSource::Body);
        assert_eq!(run(&p, HttpMethod::Options, &[], &[]), ParameterSource::Body);
    }

    #[test]
    fn test_classifier_never_yields_unknown() {
        let table = TypeTable::default();
        let names = ["id", "filter", "headers", "_x"];
        let types = ["u32", "Filter", "HeaderMap", "Vec"];
        let placeholders = vec!["id".to_string()];
        for name in names {
            for ty in types {
                for annotation in ALL_ANNOTATIONS {
                    let p = RawParameter {
                        annotations: BTreeSet::from([*annotation]),
                        ..param(&table, name, ty, &[])
                    };
                    for method in ALL_METHODS {
                        let source = run(&p, *method, &placeholders, &[]);
                        assert_ne!(source, ParameterSource::Unknown);
                    }
                }
            }
        }
    }

    #[test]
    fn test_rendered_sources() {
        assert!(ParameterSource::Body.is_rendered());
        assert!(!ParameterSource::Service.is_rendered());
        assert!(!ParameterSource::Unknown.is_rendered());
    }
}
