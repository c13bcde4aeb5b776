//! Example requests for documented endpoints: a ready-to-send URL, a JSON body and the
//! form encoding to use.

use crate::catalog::EndpointDescriptor;
use crate::classifier::ParameterSource;
use crate::discovery::{FORM_CONTENT, MULTIPART_CONTENT};
use crate::parameters::ParameterDescriptor;
use crate::route_tree::clean_segment;
use crate::schema::render_example;
use serde_json::Value;

/// Example value of a parameter as it would appear in a URL or form field
pub fn parameter_example(parameter: &ParameterDescriptor) -> String {
    if let Some(example) = parameter.schema.as_ref().and_then(|s| s.example.as_ref()) {
        return match example {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
    }

    let label = parameter.element_type.as_deref().unwrap_or(&parameter.type_label);
    let base = label
        .strip_prefix("Option<")
        .and_then(|inner| inner.strip_suffix('>'))
        .unwrap_or(label);
    match base {
        "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64"
        | "u128" | "usize" => "123".to_string(),
        "f32" | "f64" | "Decimal" => "123.45".to_string(),
        "bool" => "true".to_string(),
        _ => "example".to_string(),
    }
}

/// The endpoint's route with path parameters filled in and query parameters appended
pub fn example_request_url(endpoint: &EndpointDescriptor) -> String {
    let path: Vec<String> = endpoint
        .route
        .split('/')
        .map(|segment| {
            if !(segment.starts_with('{') && segment.ends_with('}')) {
                return segment.to_string();
            }
            let name = clean_segment(segment);
            endpoint
                .parameters
                .iter()
                .find(|p| p.source == ParameterSource::Path && p.name.eq_ignore_ascii_case(&name))
                .map(|p| urlencoding::encode(&parameter_example(p)).into_owned())
                .unwrap_or_else(|| segment.to_string())
        })
        .collect();
    let mut url = path.join("/");

    let mut pairs = Vec::new();
    for parameter in endpoint
        .parameters
        .iter()
        .filter(|p| p.source == ParameterSource::Query)
    {
        let pair = format!(
            "{}={}",
            urlencoding::encode(&parameter.name),
            urlencoding::encode(&parameter_example(parameter))
        );
        if parameter.is_collection {
            pairs.push(pair.clone());
        }
        pairs.push(pair);
    }

    if !pairs.is_empty() {
        url.push('?');
        url.push_str(&pairs.join("&"));
    }
    url
}

/// Indented example of the first body parameter; a plain string body is returned unquoted
pub fn request_body_json(endpoint: &EndpointDescriptor) -> Option<String> {
    endpoint
        .parameters
        .iter()
        .filter(|p| p.source == ParameterSource::Body)
        .find_map(|p| p.schema.as_ref().and_then(|s| s.example.as_ref()))
        .map(|example| match example {
            Value::String(s) => s.clone(),
            other => render_example(other),
        })
}

/// Encoding a form submission should use
pub fn form_enctype(endpoint: &EndpointDescriptor) -> &'static str {
    let has_file = endpoint
        .parameters
        .iter()
        .filter(|p| p.source == ParameterSource::Form)
        .any(|p| {
            let label = p.type_label.to_lowercase();
            label == "vec<u8>"
                || label.contains("bytes")
                || label.contains("file")
                || label.contains("multipart")
        });
    if has_file {
        MULTIPART_CONTENT
    } else {
        FORM_CONTENT
    }
}
