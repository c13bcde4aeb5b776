//! Endpoint catalog: stable ids, exclusion, duplicate resolution and noise filtering.

use crate::config::{DocumentatorConfig, TieBreak};
use crate::discovery::HttpMethod;
use crate::parameters::ParameterDescriptor;
use crate::schema::SchemaNode;
use crate::type_name;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use log::{debug, info};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A fully documented operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDescriptor {
    /// Stable identifier derived from method and route, see [`endpoint_id`]
    pub id: String,
    #[serde(rename = "method")]
    pub http_method: HttpMethod,
    pub route: String,
    pub summary: String,
    pub description: String,
    pub parameters: Vec<ParameterDescriptor>,
    #[serde(rename = "returnType")]
    pub return_type_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_schema: Option<SchemaNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example_json: Option<String>,
}

impl EndpointDescriptor {
    pub fn has_known_return_type(&self) -> bool {
        self.return_type_label != type_name::UNKNOWN
    }

    /// Neither a resolvable return type nor any parameter
    pub fn is_degenerate(&self) -> bool {
        !self.has_known_return_type() && self.parameters.is_empty()
    }
}

/// Deterministic identifier for an operation.
///
/// The lower-cased `method:route` string is hashed with SHA-256; the first 16 bytes are
/// encoded as unpadded URL-safe base64, so the id never contains `/`, `+` or `=`.
pub fn endpoint_id(method: HttpMethod, route: &str) -> String {
    let key = format!("{}:{}", method.as_str(), route).to_lowercase();
    let digest = Sha256::digest(key.as_bytes());
    URL_SAFE_NO_PAD.encode(&digest[..16])
}

/// Counters collected while building a catalog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub input: usize,
    pub excluded: usize,
    pub duplicates_resolved: usize,
    pub degenerate_dropped: usize,
}

/// Flat, deduplicated list of endpoints, one per `(route, method)`
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    endpoints: Vec<EndpointDescriptor>,
    stats: CatalogStats,
}

impl Catalog {
    pub fn endpoints(&self) -> &[EndpointDescriptor] {
        &self.endpoints
    }

    pub fn into_endpoints(self) -> Vec<EndpointDescriptor> {
        self.endpoints
    }

    pub fn stats(&self) -> CatalogStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Look up an endpoint by its id
    pub fn find(&self, id: &str) -> Option<&EndpointDescriptor> {
        self.endpoints.iter().find(|e| e.id == id)
    }
}

pub struct CatalogBuilder<'a> {
    config: &'a DocumentatorConfig,
}

impl<'a> CatalogBuilder<'a> {
    pub fn new(config: &'a DocumentatorConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, endpoints: Vec<EndpointDescriptor>) -> Catalog {
        let mut stats = CatalogStats {
            input: endpoints.len(),
            ..Default::default()
        };

        // keyed by method name so methods sharing a route come out DELETE, GET, PATCH, ...
        let mut groups: BTreeMap<(String, &'static str), Vec<EndpointDescriptor>> = BTreeMap::new();
        for mut endpoint in endpoints {
            endpoint.id = endpoint_id(endpoint.http_method, &endpoint.route);

            if self.is_excluded(&endpoint.route) {
                debug!("Excluding {} {}", endpoint.http_method, endpoint.route);
                stats.excluded += 1;
                continue;
            }

            groups
                .entry((endpoint.route.to_lowercase(), endpoint.http_method.as_str()))
                .or_default()
                .push(endpoint);
        }

        let mut selected = Vec::with_capacity(groups.len());
        for ((route, method), mut candidates) in groups {
            if candidates.len() > 1 {
                debug!(
                    "Resolving {} duplicates of {} {}",
                    candidates.len(),
                    method,
                    route
                );
                stats.duplicates_resolved += candidates.len() - 1;
                candidates.sort_by(|a, b| self.preference(a, b));
            }
            if let Some(winner) = candidates.into_iter().next() {
                selected.push(winner);
            }
        }

        let mut kept = Vec::with_capacity(selected.len());
        for endpoint in selected {
            if endpoint.is_degenerate() && !self.is_always_kept(&endpoint) {
                debug!(
                    "Dropping {} {}: no return type and no parameters",
                    endpoint.http_method, endpoint.route
                );
                stats.degenerate_dropped += 1;
                continue;
            }
            kept.push(endpoint);
        }

        info!(
            "Catalog: {} endpoints ({} excluded, {} duplicates, {} degenerate)",
            kept.len(),
            stats.excluded,
            stats.duplicates_resolved,
            stats.degenerate_dropped
        );

        Catalog {
            endpoints: kept,
            stats,
        }
    }

    fn is_excluded(&self, route: &str) -> bool {
        let route = route.to_lowercase();
        self.config
            .excluded_route_prefixes
            .iter()
            .any(|prefix| route.starts_with(&prefix.to_lowercase()))
    }

    fn is_always_kept(&self, endpoint: &EndpointDescriptor) -> bool {
        self.config.always_keep.iter().any(|entry| {
            let entry = entry.trim();
            match entry.split_once(char::is_whitespace) {
                Some((method, route)) => {
                    method.eq_ignore_ascii_case(endpoint.http_method.as_str())
                        && route.trim().eq_ignore_ascii_case(&endpoint.route)
                }
                None => entry.eq_ignore_ascii_case(&endpoint.route),
            }
        })
    }

    /// Total order over duplicates; `Less` means `a` is preferred.
    ///
    /// Configured criteria come first. Candidates they cannot separate are ordered by
    /// their text fields so the winner never depends on discovery order.
    fn preference(&self, a: &EndpointDescriptor, b: &EndpointDescriptor) -> Ordering {
        let marker = self.config.disambiguation_marker.as_str();
        let undisambiguated = |e: &EndpointDescriptor| marker.is_empty() || !e.summary.contains(marker);

        for criterion in &self.config.tie_break_order {
            let ordering = match criterion {
                TieBreak::MostParameters => b.parameters.len().cmp(&a.parameters.len()),
                TieBreak::KnownReturnType => {
                    b.has_known_return_type().cmp(&a.has_known_return_type())
                }
                TieBreak::UndisambiguatedSummary => undisambiguated(b).cmp(&undisambiguated(a)),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }

        a.route
            .cmp(&b.route)
            .then_with(|| a.summary.cmp(&b.summary))
            .then_with(|| a.description.cmp(&b.description))
            .then_with(|| a.return_type_label.cmp(&b.return_type_label))
            .then_with(|| {
                let names = |e: &EndpointDescriptor| {
                    e.parameters.iter().map(|p| p.name.clone()).collect::<Vec<_>>()
                };
                names(a).cmp(&names(b))
            })
    }
}
