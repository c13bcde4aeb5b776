use crate::discovery::{
    combine_paths, handler_name, normalize_route, string_literal, FunctionIndex, HttpMethod,
    OperationSource, RawOperation,
};
use crate::parser::ParsedFile;
use crate::type_table::TypeExpr;
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use syn::punctuated::Punctuated;
use syn::visit::Visit;
use syn::{Attribute, Expr, ExprMethodCall, Token};

/// Builder methods that register services or routes
const REGISTRATION_METHODS: &[&str] = &["service", "route", "configure"];

/// Actix-Web operation source.
///
/// Reads route macros (`#[get("/path")]`, `#[route("/path", method = "GET", method = "HEAD")]`)
/// and resolves their prefixes from where the handlers are mounted:
///
/// - `web::scope("/prefix").service(handler)`, nested to any depth
/// - `.configure(config_fn)` applying the enclosing scope to everything `config_fn` registers
/// - `.route("/path", web::get().to(handler))` and `web::resource("/path").route(...)`
///
/// Macro-routed handlers that are never mounted are reported at their own path.
pub struct ActixSource;

impl OperationSource for ActixSource {
    fn name(&self) -> &'static str {
        "actix-web"
    }

    fn discover(&self, parsed_files: &[ParsedFile]) -> Vec<RawOperation<TypeExpr>> {
        let functions = FunctionIndex::new(parsed_files);
        let mut walker = ServiceWalker::new(&functions);
        walker.walk_roots();
        walker.register_unmounted();

        debug!("Actix-Web discovery: {} operations", walker.operations.len());
        walker.operations
    }
}

/// Route declared by a macro on a handler: methods and path
type MacroRoute = (Vec<HttpMethod>, String);

/// Parse the route macros on a function
fn route_macros(item_fn: &syn::ItemFn) -> Vec<MacroRoute> {
    item_fn.attrs.iter().filter_map(parse_route_macro).collect()
}

/// Parse a route macro attribute to extract HTTP methods and path
fn parse_route_macro(attr: &Attribute) -> Option<MacroRoute> {
    let attr_name = attr.path().segments.last()?.ident.to_string();
    let fixed_method = HttpMethod::parse(&attr_name);
    if fixed_method.is_none() && attr_name != "route" {
        return None;
    }

    let args = attr
        .parse_args_with(Punctuated::<Expr, Token![,]>::parse_terminated)
        .ok()?;
    let mut args = args.iter();
    let path = string_literal(args.next()?)?;

    let methods = match fixed_method {
        Some(method) => vec![method],
        None => args
            .filter_map(|arg| match arg {
                Expr::Assign(assign) if is_ident(&assign.left, "method") => {
                    string_literal(&assign.right).and_then(|m| HttpMethod::parse(&m))
                }
                _ => None,
            })
            .collect(),
    };

    if methods.is_empty() {
        debug!("Route macro without a method: {}", path);
        return None;
    }
    Some((methods, path))
}

fn is_ident(expr: &Expr, name: &str) -> bool {
    matches!(expr, Expr::Path(p) if p.path.is_ident(name))
}

/// Finds the outermost registration calls of each method chain in a function body
#[derive(Default)]
struct RegistrationRoots<'ast> {
    roots: Vec<&'ast ExprMethodCall>,
    configured: Vec<&'ast Expr>,
}

impl<'ast> Visit<'ast> for RegistrationRoots<'ast> {
    fn visit_expr_method_call(&mut self, node: &'ast ExprMethodCall) {
        if REGISTRATION_METHODS.contains(&node.method.to_string().as_str()) {
            self.roots.push(node);
            collect_configured(node, &mut self.configured);
            return;
        }
        syn::visit::visit_expr_method_call(self, node);
    }
}

/// Collect every `.configure(f)` argument along a chain
fn collect_configured<'ast>(call: &'ast ExprMethodCall, out: &mut Vec<&'ast Expr>) {
    if call.method == "configure" {
        out.extend(call.args.iter());
    }
    for arg in &call.args {
        if let Expr::MethodCall(inner) = arg {
            collect_configured(inner, out);
        }
    }
    if let Expr::MethodCall(receiver) = &*call.receiver {
        collect_configured(receiver, out);
    }
}

struct ServiceWalker<'a> {
    functions: &'a FunctionIndex<'a>,
    macro_routes: HashMap<usize, Vec<MacroRoute>>,
    configure_fns: HashSet<usize>,
    mounted: HashSet<usize>,
    active: Vec<usize>,
    operations: Vec<RawOperation<TypeExpr>>,
}

impl<'a> ServiceWalker<'a> {
    fn new(functions: &'a FunctionIndex<'a>) -> Self {
        let mut macro_routes = HashMap::new();
        let mut configure_fns = HashSet::new();

        for (id, entry) in functions.iter() {
            let routes = route_macros(entry.item);
            if !routes.is_empty() {
                macro_routes.insert(id, routes);
            }

            let mut finder = RegistrationRoots::default();
            finder.visit_block(&entry.item.block);
            for arg in finder.configured {
                if let Some(target) = functions.resolve_expr(arg) {
                    configure_fns.insert(target);
                }
            }
        }

        Self {
            functions,
            macro_routes,
            configure_fns,
            mounted: HashSet::new(),
            active: Vec::new(),
            operations: Vec::new(),
        }
    }

    /// Walk the registrations of every function not reached through `.configure`
    fn walk_roots(&mut self) {
        let functions = self.functions;
        for (id, _) in functions.iter() {
            if !self.configure_fns.contains(&id) {
                self.walk_fn(id, "");
            }
        }
    }

    fn walk_fn(&mut self, id: usize, prefix: &str) {
        if self.active.contains(&id) {
            return;
        }
        self.active.push(id);

        let functions = self.functions;
        let mut finder = RegistrationRoots::default();
        finder.visit_block(&functions.get(id).item.block);
        for call in finder.roots {
            self.walk_call(call, prefix);
        }

        self.active.pop();
    }

    /// Walk a builder chain ending in `call`, registering under `outer`
    fn walk_call(&mut self, call: &'a ExprMethodCall, outer: &str) {
        if let Expr::MethodCall(receiver) = &*call.receiver {
            self.walk_call(receiver, outer);
        }

        let prefix = combine_paths(outer, &scope_prefix(&call.receiver));
        let args: Vec<&'a Expr> = call.args.iter().collect();

        match (call.method.to_string().as_str(), args.as_slice()) {
            ("service", services) => {
                for service in services {
                    self.mount(*service, &prefix);
                }
            }
            ("route", [path, router]) => {
                let Some(path) = string_literal(path) else {
                    debug!("Skipping route with non-literal path");
                    return;
                };
                let route = normalize_route(&combine_paths(&prefix, &path));
                for (method, handler) in method_routes(router) {
                    self.register_handler(method, &route, handler);
                }
            }
            ("route", [router]) => {
                let route = normalize_route(&prefix);
                for (method, handler) in method_routes(router) {
                    self.register_handler(method, &route, handler);
                }
            }
            ("configure", [config_fn]) => match self.functions.resolve_expr(config_fn) {
                Some(id) => self.walk_fn(id, &prefix),
                None => debug!("Unresolved configure function: {}", handler_name(config_fn)),
            },
            _ => {}
        }
    }

    /// Mount a `.service(...)` argument under `prefix`
    fn mount(&mut self, service: &'a Expr, prefix: &str) {
        match service {
            Expr::Path(_) => {
                let Some(id) = self.functions.resolve_expr(service) else {
                    debug!("Unresolved service: {}", handler_name(service));
                    return;
                };
                let Some(routes) = self.macro_routes.get(&id).cloned() else {
                    debug!("Service without route macro: {}", handler_name(service));
                    return;
                };
                self.mounted.insert(id);
                for (methods, path) in routes {
                    let route = normalize_route(&combine_paths(prefix, &path));
                    for method in methods {
                        self.register(method, &route, id);
                    }
                }
            }
            Expr::MethodCall(call) => self.walk_call(call, prefix),
            Expr::Paren(paren) => self.mount(&paren.expr, prefix),
            _ => {}
        }
    }

    /// Report macro-routed handlers that no registration mounted
    fn register_unmounted(&mut self) {
        let mut unmounted: Vec<(usize, Vec<MacroRoute>)> = self
            .macro_routes
            .iter()
            .filter(|(id, _)| !self.mounted.contains(id))
            .map(|(id, routes)| (*id, routes.clone()))
            .collect();
        unmounted.sort_by_key(|(id, _)| *id);

        for (id, routes) in unmounted {
            for (methods, path) in routes {
                let route = normalize_route(&path);
                for method in methods {
                    self.register(method, &route, id);
                }
            }
        }
    }

    fn register(&mut self, method: HttpMethod, route: &str, id: usize) {
        let item = self.functions.get(id).item;
        let name = item.sig.ident.to_string();
        debug!("Discovered {} {} -> {}", method, route, name);
        self.operations
            .push(RawOperation::new(method, route.to_string(), name).with_handler(item));
    }

    fn register_handler(&mut self, method: HttpMethod, route: &str, handler: &Expr) {
        match self.functions.resolve_expr(handler) {
            Some(id) => self.register(method, route, id),
            None => {
                let name = handler_name(handler);
                warn!("Unknown handler: {} for {} {}", name, method, route);
                self.operations
                    .push(RawOperation::new(method, route.to_string(), name));
            }
        }
    }
}

/// Path of the `web::scope(..)` or `web::resource(..)` a builder chain starts from
fn scope_prefix(expr: &Expr) -> String {
    match expr {
        Expr::MethodCall(call) => scope_prefix(&call.receiver),
        Expr::Paren(paren) => scope_prefix(&paren.expr),
        Expr::Call(call) => {
            let Expr::Path(func) = &*call.func else {
                return String::new();
            };
            let is_scope = func
                .path
                .segments
                .last()
                .is_some_and(|s| s.ident == "scope" || s.ident == "resource");
            match (is_scope, call.args.first()) {
                (true, Some(arg)) => string_literal(arg).unwrap_or_default(),
                _ => String::new(),
            }
        }
        _ => String::new(),
    }
}

/// Expand `web::get().to(handler)` or `web::method(Method::POST).to(handler)`
fn method_routes(expr: &Expr) -> Vec<(HttpMethod, &Expr)> {
    let Expr::MethodCall(call) = expr else {
        return Vec::new();
    };
    if call.method != "to" {
        return method_routes(&call.receiver);
    }
    match (route_method(&call.receiver), call.args.first()) {
        (Some(method), Some(handler)) => vec![(method, handler)],
        _ => Vec::new(),
    }
}

/// Method of a route builder such as `web::get()`, `web::post().guard(..)` or
/// `web::method(Method::PUT)`
fn route_method(expr: &Expr) -> Option<HttpMethod> {
    match expr {
        Expr::MethodCall(call) => route_method(&call.receiver),
        Expr::Call(call) => {
            let Expr::Path(func) = &*call.func else {
                return None;
            };
            let name = func.path.segments.last()?.ident.to_string();
            if name == "method" {
                match call.args.first()? {
                    Expr::Path(arg) => HttpMethod::parse(&arg.path.segments.last()?.ident.to_string()),
                    _ => None,
                }
            } else {
                HttpMethod::parse(&name)
            }
        }
        _ => None,
    }
}
