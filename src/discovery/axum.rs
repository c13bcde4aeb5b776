use crate::discovery::{
    combine_paths, handler_name, normalize_route, string_literal, FunctionIndex, HttpMethod,
    OperationSource, RawOperation,
};
use crate::parser::ParsedFile;
use crate::type_table::TypeExpr;
use log::{debug, warn};
use std::collections::HashSet;
use syn::visit::Visit;
use syn::{Expr, ExprMethodCall, Stmt};

/// Router methods that register or compose routes
const ROUTER_METHODS: &[&str] = &["route", "nest", "merge"];

/// Axum operation source.
///
/// Walks router method chains starting from every router-building function that is not
/// itself nested into another router:
///
/// - `.route("/path", get(handler).post(other))`
/// - `.nest("/prefix", router)` where `router` is an inline chain, a `let`-bound router
///   or a call to another router-building function
/// - `.merge(router)`
pub struct AxumSource;

impl OperationSource for AxumSource {
    fn name(&self) -> &'static str {
        "axum"
    }

    fn discover(&self, parsed_files: &[ParsedFile]) -> Vec<RawOperation<TypeExpr>> {
        let functions = FunctionIndex::new(parsed_files);
        let mut walker = RouterWalker::new(&functions);
        walker.walk_roots();

        debug!(
            "Axum discovery: {} router functions, {} operations",
            walker.router_fns.len(),
            walker.operations.len()
        );
        walker.operations
    }
}

/// Collects router method calls and called function paths inside an expression or block
#[derive(Default)]
struct RouterCalls<'ast> {
    has_router_calls: bool,
    called: Vec<&'ast syn::Path>,
    idents: HashSet<String>,
}

impl<'ast> Visit<'ast> for RouterCalls<'ast> {
    fn visit_expr_method_call(&mut self, node: &'ast ExprMethodCall) {
        if ROUTER_METHODS.contains(&node.method.to_string().as_str()) {
            self.has_router_calls = true;
        }
        syn::visit::visit_expr_method_call(self, node);
    }

    fn visit_expr_call(&mut self, node: &'ast syn::ExprCall) {
        if let Expr::Path(path_expr) = &*node.func {
            self.called.push(&path_expr.path);
        }
        syn::visit::visit_expr_call(self, node);
    }

    fn visit_expr_path(&mut self, node: &'ast syn::ExprPath) {
        if let Some(ident) = node.path.get_ident() {
            self.idents.insert(ident.to_string());
        }
        syn::visit::visit_expr_path(self, node);
    }
}

impl<'ast> RouterCalls<'ast> {
    fn of_expr(expr: &'ast Expr) -> Self {
        let mut calls = Self::default();
        calls.visit_expr(expr);
        calls
    }
}

struct RouterWalker<'a> {
    functions: &'a FunctionIndex<'a>,
    router_fns: HashSet<usize>,
    active: Vec<usize>,
    operations: Vec<RawOperation<TypeExpr>>,
}

impl<'a> RouterWalker<'a> {
    fn new(functions: &'a FunctionIndex<'a>) -> Self {
        let router_fns = functions
            .iter()
            .filter(|(_, entry)| {
                let mut calls = RouterCalls::default();
                calls.visit_block(&entry.item.block);
                calls.has_router_calls
            })
            .map(|(id, _)| id)
            .collect();

        Self {
            functions,
            router_fns,
            active: Vec::new(),
            operations: Vec::new(),
        }
    }

    /// Walk every router function that no other router function calls
    fn walk_roots(&mut self) {
        let mut nested = HashSet::new();
        for &id in &self.router_fns {
            let mut calls = RouterCalls::default();
            calls.visit_block(&self.functions.get(id).item.block);
            for path in calls.called {
                if let Some(callee) = self.functions.resolve(path) {
                    if callee != id && self.router_fns.contains(&callee) {
                        nested.insert(callee);
                    }
                }
            }
        }

        let mut roots: Vec<usize> = self
            .router_fns
            .iter()
            .copied()
            .filter(|id| !nested.contains(id))
            .collect();
        roots.sort_unstable();

        for id in roots {
            debug!(
                "Walking root router function: {}",
                self.functions.get(id).item.sig.ident
            );
            self.walk_fn(id, "");
        }
    }

    fn walk_fn(&mut self, id: usize, prefix: &str) {
        if self.active.contains(&id) {
            warn!(
                "Recursive router function skipped: {}",
                self.functions.get(id).item.sig.ident
            );
            return;
        }
        self.active.push(id);
        let functions = self.functions;
        let block = &functions.get(id).item.block;
        self.walk_block(block, prefix);
        self.active.pop();
    }

    /// Walk the routers of a function body.
    ///
    /// `let` bindings that feed into another router expression are walked through that
    /// expression only, so a nested router is not also registered at the outer prefix.
    fn walk_block(&mut self, block: &'a syn::Block, prefix: &str) {
        let mut bindings: Vec<(String, &'a Expr)> = Vec::new();
        let mut consumed: HashSet<usize> = HashSet::new();
        let mut tails: Vec<(usize, &'a Expr)> = Vec::new();

        for stmt in &block.stmts {
            match stmt {
                Stmt::Local(local) => {
                    let (Some(name), Some(init)) = (local_name(&local.pat), &local.init) else {
                        continue;
                    };
                    let calls = RouterCalls::of_expr(&init.expr);
                    mark_consumed(&calls, &bindings, &mut consumed);
                    bindings.push((name, &*init.expr));
                }
                Stmt::Expr(expr, _) => {
                    let calls = RouterCalls::of_expr(expr);
                    mark_consumed(&calls, &bindings, &mut consumed);
                    if calls.has_router_calls || self.calls_router_fn(&calls) {
                        tails.push((bindings.len(), expr));
                    }
                }
                _ => {}
            }
        }

        for idx in 0..bindings.len() {
            if consumed.contains(&idx) {
                continue;
            }
            let expr = bindings[idx].1;
            let calls = RouterCalls::of_expr(expr);
            if calls.has_router_calls || self.calls_router_fn(&calls) {
                self.walk_expr(expr, prefix, &bindings[..idx]);
            }
        }

        for (visible, expr) in tails {
            self.walk_expr(expr, prefix, &bindings[..visible]);
        }
    }

    fn calls_router_fn(&self, calls: &RouterCalls) -> bool {
        calls.called.iter().any(|path| {
            self.functions
                .resolve(path)
                .is_some_and(|id| self.router_fns.contains(&id))
        })
    }

    /// Walk a router expression, registering its routes under `prefix`
    fn walk_expr(&mut self, expr: &'a Expr, prefix: &str, scope: &[(String, &'a Expr)]) {
        match expr {
            Expr::MethodCall(call) => {
                self.walk_expr(&call.receiver, prefix, scope);
                let args: Vec<&'a Expr> = call.args.iter().collect();

                match (call.method.to_string().as_str(), args.as_slice()) {
                    ("route", [path, method_router]) => {
                        let Some(path) = string_literal(path) else {
                            debug!("Skipping route with non-literal path");
                            return;
                        };
                        let route = normalize_route(&combine_paths(prefix, &path));
                        for (method, handler) in method_routes(method_router) {
                            self.register(method, &route, handler);
                        }
                    }
                    ("nest", [path, router]) => {
                        let Some(path) = string_literal(path) else {
                            debug!("Skipping nest with non-literal prefix");
                            return;
                        };
                        let nested = combine_paths(prefix, &path);
                        self.walk_expr(*router, &nested, scope);
                    }
                    ("merge", [router]) => self.walk_expr(*router, prefix, scope),
                    _ => {}
                }
            }
            Expr::Call(call) => {
                if let Expr::Path(path_expr) = &*call.func {
                    if let Some(id) = self.functions.resolve(&path_expr.path) {
                        if self.router_fns.contains(&id) {
                            self.walk_fn(id, prefix);
                        }
                    }
                }
            }
            Expr::Path(path_expr) => {
                let Some(ident) = path_expr.path.get_ident() else {
                    return;
                };
                let name = ident.to_string();
                if let Some(idx) = scope.iter().rposition(|(bound, _)| *bound == name) {
                    self.walk_expr(scope[idx].1, prefix, &scope[..idx]);
                }
            }
            Expr::Paren(paren) => self.walk_expr(&paren.expr, prefix, scope),
            Expr::Reference(reference) => self.walk_expr(&reference.expr, prefix, scope),
            Expr::Try(try_expr) => self.walk_expr(&try_expr.expr, prefix, scope),
            Expr::Block(block) => {
                if let Some(Stmt::Expr(tail, None)) = block.block.stmts.last() {
                    self.walk_expr(tail, prefix, scope);
                }
            }
            _ => {}
        }
    }

    fn register(&mut self, method: HttpMethod, route: &str, handler: &Expr) {
        let name = handler_name(handler);
        let operation = RawOperation::new(method, route.to_string(), name.clone());

        let operation = match self.functions.resolve_expr(handler) {
            Some(id) => operation.with_handler(self.functions.get(id).item),
            None => {
                warn!("Unknown handler: {} for {} {}", name, method, route);
                operation
            }
        };

        debug!("Discovered {} {} -> {}", method, route, name);
        self.operations.push(operation);
    }
}

/// Expand a method router such as `get(a).post(b)` into `(method, handler)` pairs
fn method_routes(expr: &Expr) -> Vec<(HttpMethod, &Expr)> {
    match expr {
        Expr::Call(call) => {
            let Expr::Path(path_expr) = &*call.func else {
                return Vec::new();
            };
            let method = path_expr
                .path
                .segments
                .last()
                .and_then(|s| HttpMethod::parse(&s.ident.to_string()));
            match (method, call.args.first()) {
                (Some(method), Some(handler)) => vec![(method, handler)],
                _ => Vec::new(),
            }
        }
        Expr::MethodCall(call) => {
            let mut routes = method_routes(&call.receiver);
            if let (Some(method), Some(handler)) =
                (HttpMethod::parse(&call.method.to_string()), call.args.first())
            {
                routes.push((method, handler));
            }
            routes
        }
        Expr::Paren(paren) => method_routes(&paren.expr),
        _ => Vec::new(),
    }
}

/// Mark the bindings a router expression refers to
fn mark_consumed(calls: &RouterCalls<'_>, bindings: &[(String, &Expr)], consumed: &mut HashSet<usize>) {
    if !calls.has_router_calls {
        return;
    }
    for ident in &calls.idents {
        if let Some(idx) = bindings.iter().rposition(|(name, _)| name == ident) {
            consumed.insert(idx);
        }
    }
}

fn local_name(pat: &syn::Pat) -> Option<String> {
    match pat {
        syn::Pat::Ident(pat_ident) => Some(pat_ident.ident.to_string()),
        syn::Pat::Type(pat_type) => local_name(&pat_type.pat),
        _ => None,
    }
}
