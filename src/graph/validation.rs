//! Structural integrity checks on a graph snapshot.
//!
//! Findings are data, never errors: the report lists every issue found and
//! `valid` is true only when the list is empty.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::models::{CachedValue, Graph, SharedCache, ValidationIssue, ValidationReport};
use crate::cache::{CacheKey, Operation};

/// Run every check over a graph.
///
/// Issues are reported in this order: duplicate node ids, then per edge
/// (missing source, missing target, self-loop, invalid weight, duplicate),
/// then orphan nodes in graph order.
pub fn validate_graph(graph: &Graph) -> ValidationReport {
    let mut issues = Vec::new();

    let mut node_ids: HashSet<&str> = HashSet::with_capacity(graph.nodes.len());
    for node in &graph.nodes {
        if !node_ids.insert(node.id.as_str()) {
            issues.push(ValidationIssue::DuplicateNodeId {
                node_id: node.id.clone(),
            });
        }
    }

    let mut connected: HashSet<&str> = HashSet::new();
    let mut seen_pairs: HashMap<(&str, &str), &str> = HashMap::new();

    for edge in &graph.edges {
        let source = edge.source.as_str();
        let target = edge.target.as_str();
        connected.insert(source);
        connected.insert(target);

        if !node_ids.contains(source) {
            issues.push(ValidationIssue::MissingSource {
                edge_id: edge.id.clone(),
                source: edge.source.clone(),
            });
        }
        if !node_ids.contains(target) {
            issues.push(ValidationIssue::MissingTarget {
                edge_id: edge.id.clone(),
                target: edge.target.clone(),
            });
        }
        if source == target {
            issues.push(ValidationIssue::SelfLoop {
                edge_id: edge.id.clone(),
                node_id: edge.source.clone(),
            });
        }
        if let Some(weight) = edge.properties.weight {
            if !weight.is_finite() || weight < 0.0 {
                issues.push(ValidationIssue::InvalidWeight {
                    edge_id: edge.id.clone(),
                    weight,
                });
            }
        }

        let pair = if graph.directed || source <= target {
            (source, target)
        } else {
            (target, source)
        };
        match seen_pairs.get(&pair) {
            Some(first) => issues.push(ValidationIssue::DuplicateEdge {
                edge_id: edge.id.clone(),
                first_edge_id: first.to_string(),
                source: edge.source.clone(),
                target: edge.target.clone(),
            }),
            None => {
                seen_pairs.insert(pair, edge.id.as_str());
            }
        }
    }

    let mut reported: HashSet<&str> = HashSet::new();
    for node in &graph.nodes {
        if !connected.contains(node.id.as_str()) && reported.insert(node.id.as_str()) {
            issues.push(ValidationIssue::OrphanNode {
                node_id: node.id.clone(),
                label: node.label.clone(),
            });
        }
    }

    ValidationReport::from_issues(issues)
}

/// Cached validation of one graph snapshot.
pub struct GraphValidator {
    graph: Arc<Graph>,
    cache: SharedCache,
    scope: String,
}

impl GraphValidator {
    pub fn new(graph: Arc<Graph>, cache: SharedCache, scope: impl Into<String>) -> Self {
        Self {
            graph,
            cache,
            scope: scope.into(),
        }
    }

    pub fn validate(&self) -> Arc<ValidationReport> {
        let key = CacheKey::new(self.scope.as_str(), Operation::Validation);
        if let Some(CachedValue::Validation(cached)) = self.cache.get(&key) {
            return cached;
        }

        let report = Arc::new(validate_graph(&self.graph));
        if !report.valid {
            tracing::debug!(
                "Graph {}: validation found {} issues",
                self.graph.id,
                report.issues.len()
            );
        }

        self.cache
            .set(key, CachedValue::Validation(report.clone()));
        report
    }
}
