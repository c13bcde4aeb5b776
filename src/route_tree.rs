//! Navigation tree over the endpoint catalog.
//!
//! Endpoints are grouped by their first path segment, then nested segment by segment.
//! Nodes that end up holding a single endpoint and no children are folded into their
//! parent, so leaf operations sit directly under the closest segment that actually
//! branches.

use crate::catalog::EndpointDescriptor;
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;

/// Group key for routes without segments (`/`)
pub const ROOT_KEY: &str = "/";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteTreeNode {
    pub name: String,
    pub endpoints: Vec<EndpointDescriptor>,
    pub children: Vec<RouteTreeNode>,
}

impl RouteTreeNode {
    fn new(name: String) -> Self {
        Self {
            name,
            endpoints: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Endpoints of this node and all its descendants
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
            + self
                .children
                .iter()
                .map(RouteTreeNode::endpoint_count)
                .sum::<usize>()
    }
}

/// An endpoint together with the route segments not yet consumed by the tree
struct Pending {
    remaining: Vec<String>,
    endpoint: EndpointDescriptor,
}

/// Build the navigation forest for a deduplicated endpoint list
pub fn build_route_tree(endpoints: &[EndpointDescriptor]) -> Vec<RouteTreeNode> {
    let mut groups: BTreeMap<String, (String, Vec<Pending>)> = BTreeMap::new();

    for endpoint in endpoints {
        let mut segments: Vec<String> = endpoint
            .route
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let (key, name) = if segments.is_empty() {
            (ROOT_KEY.to_string(), ROOT_KEY.to_string())
        } else {
            let first = segments.remove(0);
            (segment_key(&first), clean_segment(&first))
        };

        groups
            .entry(key)
            .or_insert_with(|| (name, Vec::new()))
            .1
            .push(Pending {
                remaining: segments,
                endpoint: endpoint.clone(),
            });
    }

    let mut roots: Vec<RouteTreeNode> = groups
        .into_values()
        .map(|(name, items)| {
            let mut node = build_node(name, items);
            collapse_children(&mut node);
            node
        })
        .collect();

    sort_nodes(&mut roots);
    debug!("Built route tree with {} top-level nodes", roots.len());
    roots
}

fn build_node(name: String, items: Vec<Pending>) -> RouteTreeNode {
    let mut node = RouteTreeNode::new(name);
    let mut subgroups: BTreeMap<String, (String, Vec<Pending>)> = BTreeMap::new();

    for mut item in items {
        if item.remaining.is_empty() {
            node.endpoints.push(item.endpoint);
            continue;
        }
        let next = item.remaining.remove(0);
        subgroups
            .entry(segment_key(&next))
            .or_insert_with(|| (clean_segment(&next), Vec::new()))
            .1
            .push(item);
    }

    for (name, mut group) in subgroups.into_values() {
        // A lone operation ending at this segment needs no node of its own
        if group.len() == 1 && group[0].remaining.is_empty() {
            if let Some(item) = group.pop() {
                node.endpoints.push(item.endpoint);
            }
            continue;
        }
        node.children.push(build_node(name, group));
    }

    node
}

/// Fold single-endpoint, childless descendants into their parents, bottom-up
fn collapse_children(node: &mut RouteTreeNode) {
    let children = std::mem::take(&mut node.children);
    for mut child in children {
        collapse_children(&mut child);
        if child.children.is_empty() && child.endpoints.len() == 1 {
            node.endpoints.append(&mut child.endpoints);
        } else {
            node.children.push(child);
        }
    }
}

fn sort_nodes(nodes: &mut [RouteTreeNode]) {
    nodes.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
    for node in nodes {
        node.endpoints.sort_by(|a, b| {
            a.route
                .cmp(&b.route)
                .then_with(|| a.http_method.as_str().cmp(b.http_method.as_str()))
        });
        sort_nodes(&mut node.children);
    }
}

/// Display name of a segment: `{id:int}` becomes `id`
pub fn clean_segment(segment: &str) -> String {
    match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        Some(inner) => inner
            .split(':')
            .next()
            .unwrap_or(inner)
            .trim_start_matches('*')
            .to_string(),
        None => segment.to_string(),
    }
}

/// Comparison key of a segment: case-insensitive, placeholders constraint-stripped
fn segment_key(segment: &str) -> String {
    if segment.starts_with('{') && segment.ends_with('}') {
        format!("{{{}}}", clean_segment(segment).to_lowercase())
    } else {
        segment.to_lowercase()
    }
}

/// Total number of endpoints held by a forest
pub fn endpoint_count(nodes: &[RouteTreeNode]) -> usize {
    nodes.iter().map(RouteTreeNode::endpoint_count).sum()
}

/// Every endpoint of a forest, depth-first
pub fn all_endpoints(nodes: &[RouteTreeNode]) -> Vec<&EndpointDescriptor> {
    let mut out = Vec::new();
    for node in nodes {
        out.extend(node.endpoints.iter());
        out.extend(all_endpoints(&node.children));
    }
    out
}

/// Look up an endpoint anywhere in a forest by id
pub fn find_endpoint<'a>(nodes: &'a [RouteTreeNode], id: &str) -> Option<&'a EndpointDescriptor> {
    nodes.iter().find_map(|node| {
        node.endpoints
            .iter()
            .find(|e| e.id == id)
            .or_else(|| find_endpoint(&node.children, id))
    })
}
