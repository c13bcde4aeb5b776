//! Operation discovery from framework source code.
//!
//! Each supported framework has an [`OperationSource`] that reads parsed files and yields
//! one [`RawOperation`] per `(method, route, handler)` registration. Raw operations carry
//! unresolved [`TypeExpr`]s; the pipeline binds them to the project's type table afterwards.
//!
//! # Supported Frameworks
//!
//! - **Axum**: See [`axum::AxumSource`]
//! - **Actix-Web**: See [`actix::ActixSource`]

pub mod actix;
pub mod axum;

use crate::docs::DocComment;
use crate::parser::ParsedFile;
use crate::type_table::TypeExpr;
use log::debug;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

/// A discovery collaborator for one web framework.
pub trait OperationSource {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Discover every operation registered in the parsed files.
    ///
    /// # Arguments
    ///
    /// * `parsed_files` - All successfully parsed Rust source files in the project
    fn discover(&self, parsed_files: &[ParsedFile]) -> Vec<RawOperation<TypeExpr>>;
}

/// HTTP methods an operation can be registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl HttpMethod {
    /// Parse a method name, case-insensitively
    pub fn parse(method: &str) -> Option<Self> {
        match method.to_lowercase().as_str() {
            "get" => Some(HttpMethod::Get),
            "post" => Some(HttpMethod::Post),
            "put" => Some(HttpMethod::Put),
            "delete" => Some(HttpMethod::Delete),
            "patch" => Some(HttpMethod::Patch),
            "head" => Some(HttpMethod::Head),
            "options" => Some(HttpMethod::Options),
            _ => None,
        }
    }

    /// Upper-case method name
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit source markers attached to a parameter at discovery time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParameterAnnotation {
    FromQuery,
    FromForm,
    FromBody,
    FromServices,
    Required,
}

pub const JSON_CONTENT: &str = "application/json";
pub const FORM_CONTENT: &str = "application/x-www-form-urlencoded";
pub const MULTIPART_CONTENT: &str = "multipart/form-data";

/// Request content-type metadata declared by an operation.
///
/// A hint without a target applies to every parameter of the operation.
#[derive(Debug, Clone)]
pub struct ContentTypeHint<T> {
    pub media_type: String,
    pub target: Option<T>,
}

impl<T> ContentTypeHint<T> {
    /// Whether the hint declares a url-encoded or multipart form
    pub fn is_form(&self) -> bool {
        self.media_type == FORM_CONTENT || self.media_type == MULTIPART_CONTENT
    }

    /// Whether the hint declares a JSON payload
    pub fn is_json(&self) -> bool {
        self.media_type == JSON_CONTENT
    }
}

/// One parameter of a discovered operation
#[derive(Debug, Clone)]
pub struct RawParameter<T> {
    pub name: String,
    pub ty: T,
    pub annotations: BTreeSet<ParameterAnnotation>,
    pub documentation: Option<String>,
    /// The request may omit the parameter entirely
    pub is_optional: bool,
}

impl<T> RawParameter<T> {
    pub fn has(&self, annotation: ParameterAnnotation) -> bool {
        self.annotations.contains(&annotation)
    }
}

/// One discovered operation, as read from source.
#[derive(Debug, Clone)]
pub struct RawOperation<T> {
    pub method: HttpMethod,
    /// Route template with `{name}` placeholders
    pub route: String,
    pub handler_name: String,
    pub parameters: Vec<RawParameter<T>>,
    pub return_type: Option<T>,
    pub request_content: Vec<ContentTypeHint<T>>,
    pub docs: DocComment,
}

impl<T> RawOperation<T> {
    /// Create an operation with no parameters or type information
    pub fn new(method: HttpMethod, route: String, handler_name: String) -> Self {
        Self {
            method,
            route,
            handler_name,
            parameters: Vec::new(),
            return_type: None,
            request_content: Vec::new(),
            docs: DocComment::default(),
        }
    }

    /// Convert every type handle with `f`
    pub fn map_types<U>(self, f: impl Fn(T) -> U) -> RawOperation<U> {
        RawOperation {
            method: self.method,
            route: self.route,
            handler_name: self.handler_name,
            parameters: self
                .parameters
                .into_iter()
                .map(|p| RawParameter {
                    name: p.name,
                    ty: f(p.ty),
                    annotations: p.annotations,
                    documentation: p.documentation,
                    is_optional: p.is_optional,
                })
                .collect(),
            return_type: self.return_type.map(&f),
            request_content: self
                .request_content
                .into_iter()
                .map(|h| ContentTypeHint {
                    media_type: h.media_type,
                    target: h.target.map(&f),
                })
                .collect(),
            docs: self.docs,
        }
    }
}

impl RawOperation<TypeExpr> {
    /// Fill parameters, return type, content hints and docs from a handler function
    pub fn with_handler(mut self, handler: &syn::ItemFn) -> Self {
        let docs = DocComment::from_attrs(&handler.attrs);
        let analysis = analyze_signature(&handler.sig, &self.route, &docs);
        self.parameters = analysis.parameters;
        self.request_content = analysis.request_content;
        self.return_type = response_type(&handler.sig.output);
        self.docs = docs;
        self
    }
}

/// Join a prefix and a path with exactly one slash between them
pub fn combine_paths(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        return path.to_string();
    }

    let prefix = prefix.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        prefix.to_string()
    } else {
        format!("{}/{}", prefix, path)
    }
}

/// Rewrite a route to `{name}` placeholder syntax with a leading slash.
///
/// `/users/:id` and `/files/*rest` become `/users/{id}` and `/files/{rest}`;
/// `{id}` and `{id:\d+}` are kept as written.
pub fn normalize_route(route: &str) -> String {
    let segments: Vec<String> = route
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| {
            if let Some(name) = segment.strip_prefix(':').or_else(|| segment.strip_prefix('*')) {
                format!("{{{}}}", name)
            } else if let Some(name) = segment
                .strip_prefix("{*")
                .and_then(|rest| rest.strip_suffix('}'))
            {
                format!("{{{}}}", name)
            } else {
                segment.to_string()
            }
        })
        .collect();
    format!("/{}", segments.join("/"))
}

/// Placeholder names of a route template, without constraints (`{id:int}` yields `id`)
pub fn route_placeholders(route: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = route;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let inner = &rest[start + 1..start + len];
        let name = inner.split(':').next().unwrap_or(inner).trim_start_matches('*');
        if !name.is_empty() {
            names.push(name.to_string());
        }
        rest = &rest[start + len + 1..];
    }
    names
}

/// The value of a string literal expression
pub fn string_literal(expr: &syn::Expr) -> Option<String> {
    match expr {
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(lit_str),
            ..
        }) => Some(lit_str.value()),
        syn::Expr::Paren(paren) => string_literal(&paren.expr),
        _ => None,
    }
}

/// Free functions of the project, indexed by name.
///
/// Functions are also tagged with the module they live in (the innermost inline `mod`,
/// else the file stem or, for `mod.rs`, its directory) so `users::router` and
/// `posts::router` can be told apart.
pub struct FunctionIndex<'a> {
    entries: Vec<FunctionEntry<'a>>,
    by_name: HashMap<String, Vec<usize>>,
}

pub struct FunctionEntry<'a> {
    pub module: String,
    pub item: &'a syn::ItemFn,
}

impl<'a> FunctionIndex<'a> {
    pub fn new(parsed_files: &'a [ParsedFile]) -> Self {
        let mut index = Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
        };
        for parsed_file in parsed_files {
            let module = module_name_of(&parsed_file.path);
            index.collect(&parsed_file.syntax_tree.items, &module);
        }
        debug!("Indexed {} functions", index.entries.len());
        index
    }

    fn collect(&mut self, items: &'a [syn::Item], module: &str) {
        for item in items {
            match item {
                syn::Item::Fn(item_fn) => {
                    let id = self.entries.len();
                    self.entries.push(FunctionEntry {
                        module: module.to_string(),
                        item: item_fn,
                    });
                    self.by_name
                        .entry(item_fn.sig.ident.to_string())
                        .or_default()
                        .push(id);
                }
                syn::Item::Mod(item_mod) => {
                    if let Some((_, items)) = &item_mod.content {
                        self.collect(items, &item_mod.ident.to_string());
                    }
                }
                _ => {}
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: usize) -> &FunctionEntry<'a> {
        &self.entries[id]
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &FunctionEntry<'a>)> {
        self.entries.iter().enumerate()
    }

    /// Resolve a path such as `handler` or `users::handler` to a function id
    pub fn resolve(&self, path: &syn::Path) -> Option<usize> {
        let name = path.segments.last()?.ident.to_string();
        let candidates = self.by_name.get(&name)?;
        let qualifier = path
            .segments
            .iter()
            .rev()
            .nth(1)
            .map(|s| s.ident.to_string())
            .filter(|q| q != "self" && q != "crate" && q != "super");

        if let Some(qualifier) = qualifier {
            if let Some(&id) = candidates
                .iter()
                .find(|&&id| self.entries[id].module == qualifier)
            {
                return Some(id);
            }
        }
        candidates.first().copied()
    }

    /// Resolve an expression naming a function (`handler`, `users::handler`)
    pub fn resolve_expr(&self, expr: &syn::Expr) -> Option<usize> {
        match expr {
            syn::Expr::Path(path_expr) => self.resolve(&path_expr.path),
            _ => None,
        }
    }
}

fn module_name_of(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    if stem == "mod" {
        if let Some(dir) = path.parent().and_then(|p| p.file_name()) {
            return dir.to_string_lossy().to_string();
        }
    }
    stem
}

/// Name of the handler an expression refers to, for logging
pub fn handler_name(expr: &syn::Expr) -> String {
    match expr {
        syn::Expr::Path(path_expr) => path_expr
            .path
            .segments
            .last()
            .map(|s| s.ident.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        syn::Expr::Closure(_) => "closure".to_string(),
        _ => "unknown".to_string(),
    }
}

/// Response types that do not describe their payload
const OPAQUE_RESPONSES: &[&str] = &[
    "HttpResponse",
    "Response",
    "StatusCode",
    "Redirect",
    "Sse",
    "Html",
    "Body",
    "NoContent",
    "HttpResponseBuilder",
];

/// Resolve the payload type of a handler's return type.
///
/// `Json<T>` yields `T`, `Result<T, E>` resolves `T`, tuples yield their `Json<T>`
/// element. `impl Trait`, unit and opaque response types yield `None`.
pub fn response_type(output: &syn::ReturnType) -> Option<TypeExpr> {
    match output {
        syn::ReturnType::Default => None,
        syn::ReturnType::Type(_, ty) => payload_type(ty),
    }
}

fn payload_type(ty: &syn::Type) -> Option<TypeExpr> {
    match ty {
        syn::Type::ImplTrait(_) => None,
        syn::Type::Paren(paren) => payload_type(&paren.elem),
        syn::Type::Tuple(tuple) => tuple.elems.iter().find_map(json_inner),
        syn::Type::Path(type_path) => {
            let segment = type_path.path.segments.last()?;
            let name = segment.ident.to_string();
            match name.as_str() {
                "Json" => first_type_arg(segment).map(TypeExpr::from_syn),
                "Result" => first_type_arg(segment).and_then(payload_type),
                _ if OPAQUE_RESPONSES.contains(&name.as_str()) => None,
                _ => {
                    let expr = TypeExpr::from_syn(ty);
                    (!expr.is_unknown()).then_some(expr)
                }
            }
        }
        _ => {
            let expr = TypeExpr::from_syn(ty);
            (!expr.is_unknown()).then_some(expr)
        }
    }
}

fn json_inner(ty: &syn::Type) -> Option<TypeExpr> {
    if let syn::Type::Path(type_path) = ty {
        let segment = type_path.path.segments.last()?;
        if segment.ident == "Json" {
            return first_type_arg(segment).map(TypeExpr::from_syn);
        }
    }
    None
}

fn first_type_arg(segment: &syn::PathSegment) -> Option<&syn::Type> {
    if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
        args.args.iter().find_map(|arg| match arg {
            syn::GenericArgument::Type(ty) => Some(ty),
            _ => None,
        })
    } else {
        None
    }
}

/// Parameters and content hints read from a handler signature
#[derive(Debug, Default)]
pub struct SignatureAnalysis {
    pub parameters: Vec<RawParameter<TypeExpr>>,
    pub request_content: Vec<ContentTypeHint<TypeExpr>>,
}

/// Map handler arguments to raw parameters using the extractor conventions shared by
/// Axum and Actix-Web.
pub fn analyze_signature(sig: &syn::Signature, route: &str, docs: &DocComment) -> SignatureAnalysis {
    let mut analysis = SignatureAnalysis::default();
    let placeholders = route_placeholders(route);

    for input in &sig.inputs {
        let syn::FnArg::Typed(pat_type) = input else {
            continue;
        };

        // Option<Extractor<T>>: the whole extractor may be absent
        let (ty, is_optional) = match strip_option(&pat_type.ty) {
            Some(inner) => (inner, true),
            None => (&*pat_type.ty, false),
        };

        let Some(segment) = last_segment(ty) else {
            analysis.parameters.push(plain_parameter(&pat_type.pat, ty, docs, is_optional));
            continue;
        };
        let extractor = segment.ident.to_string();
        let inner = first_type_arg(segment);

        match (extractor.as_str(), inner) {
            ("Json", Some(inner)) => {
                let expr = TypeExpr::from_syn(inner);
                analysis.request_content.push(ContentTypeHint {
                    media_type: JSON_CONTENT.to_string(),
                    target: Some(expr.clone()),
                });
                analysis.parameters.push(annotated(
                    &pat_type.pat,
                    expr,
                    ParameterAnnotation::FromBody,
                    docs,
                    is_optional,
                ));
            }
            ("Form", Some(inner)) => {
                let expr = TypeExpr::from_syn(inner);
                analysis.request_content.push(ContentTypeHint {
                    media_type: FORM_CONTENT.to_string(),
                    target: Some(expr.clone()),
                });
                analysis.parameters.push(annotated(
                    &pat_type.pat,
                    expr,
                    ParameterAnnotation::FromForm,
                    docs,
                    is_optional,
                ));
            }
            ("Multipart", _) => {
                let expr = TypeExpr::new("Multipart");
                analysis.request_content.push(ContentTypeHint {
                    media_type: MULTIPART_CONTENT.to_string(),
                    target: Some(expr.clone()),
                });
                analysis.parameters.push(annotated(
                    &pat_type.pat,
                    expr,
                    ParameterAnnotation::FromForm,
                    docs,
                    is_optional,
                ));
            }
            ("Query", Some(inner)) => {
                analysis.parameters.push(annotated(
                    &pat_type.pat,
                    TypeExpr::from_syn(inner),
                    ParameterAnnotation::FromQuery,
                    docs,
                    is_optional,
                ));
            }
            ("State" | "Extension" | "Data", Some(inner)) => {
                analysis.parameters.push(annotated(
                    &pat_type.pat,
                    TypeExpr::from_syn(inner),
                    ParameterAnnotation::FromServices,
                    docs,
                    is_optional,
                ));
            }
            ("Path", Some(inner)) => {
                analysis
                    .parameters
                    .extend(path_parameters(inner, &placeholders, docs));
            }
            _ => {
                analysis.parameters.push(plain_parameter(&pat_type.pat, ty, docs, is_optional));
            }
        }
    }

    // Placeholders the handler never extracts are still part of the route
    for name in &placeholders {
        let covered = analysis
            .parameters
            .iter()
            .any(|p| p.name.eq_ignore_ascii_case(name));
        if !covered {
            analysis.parameters.push(RawParameter {
                name: name.clone(),
                ty: TypeExpr::new("String"),
                annotations: BTreeSet::from([ParameterAnnotation::Required]),
                documentation: docs.argument(name).map(str::to_string),
                is_optional: false,
            });
        }
    }

    analysis
}

/// One parameter per route placeholder, typed from the `Path<T>` argument when the arity
/// matches
fn path_parameters(
    inner: &syn::Type,
    placeholders: &[String],
    docs: &DocComment,
) -> Vec<RawParameter<TypeExpr>> {
    if placeholders.is_empty() {
        debug!("Path extractor on a route without placeholders");
        return Vec::new();
    }

    let types: Vec<TypeExpr> = match inner {
        syn::Type::Tuple(tuple) if tuple.elems.len() == placeholders.len() => {
            tuple.elems.iter().map(TypeExpr::from_syn).collect()
        }
        syn::Type::Tuple(_) => vec![TypeExpr::new("String"); placeholders.len()],
        _ if placeholders.len() == 1 => vec![TypeExpr::from_syn(inner)],
        _ => vec![TypeExpr::new("String"); placeholders.len()],
    };

    placeholders
        .iter()
        .zip(types)
        .map(|(name, ty)| RawParameter {
            name: name.clone(),
            ty,
            annotations: BTreeSet::from([ParameterAnnotation::Required]),
            documentation: docs.argument(name).map(str::to_string),
            is_optional: false,
        })
        .collect()
}

fn annotated(
    pat: &syn::Pat,
    ty: TypeExpr,
    annotation: ParameterAnnotation,
    docs: &DocComment,
    is_optional: bool,
) -> RawParameter<TypeExpr> {
    let name = binding_name(pat, &ty);
    RawParameter {
        documentation: docs.argument(&name).map(str::to_string),
        name,
        ty,
        annotations: BTreeSet::from([annotation]),
        is_optional,
    }
}

fn plain_parameter(
    pat: &syn::Pat,
    ty: &syn::Type,
    docs: &DocComment,
    is_optional: bool,
) -> RawParameter<TypeExpr> {
    let mut expr = TypeExpr::from_syn(ty);
    if is_optional {
        expr = TypeExpr::option(expr);
    }
    let name = binding_name(pat, &expr);
    RawParameter {
        documentation: docs.argument(&name).map(str::to_string),
        name,
        ty: expr,
        annotations: BTreeSet::new(),
        is_optional: false,
    }
}

/// Name of the variable a pattern binds.
///
/// `Json(payload)` binds `payload`; destructured structs (`Query(Filter { .. })`) are
/// named after their type; wildcards keep `_`, which is not a valid surface name.
fn binding_name(pat: &syn::Pat, ty: &TypeExpr) -> String {
    match pat {
        syn::Pat::Ident(pat_ident) => pat_ident.ident.to_string(),
        syn::Pat::TupleStruct(tuple_struct) if tuple_struct.elems.len() == 1 => {
            match tuple_struct.elems.first() {
                Some(inner) => binding_name(inner, ty),
                None => "_".to_string(),
            }
        }
        syn::Pat::Type(pat_type) => binding_name(&pat_type.pat, ty),
        syn::Pat::Reference(reference) => binding_name(&reference.pat, ty),
        syn::Pat::Wild(_) => "_".to_string(),
        _ => crate::type_descriptor::to_lower_camel(&ty.name),
    }
}

fn strip_option(ty: &syn::Type) -> Option<&syn::Type> {
    let segment = last_segment(ty)?;
    if segment.ident == "Option" {
        first_type_arg(segment)
    } else {
        None
    }
}

fn last_segment(ty: &syn::Type) -> Option<&syn::PathSegment> {
    match ty {
        syn::Type::Path(type_path) => type_path.path.segments.last(),
        _ => None,
    }
}
