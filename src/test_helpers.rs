//! Test helper factories
//!
//! Graph builders with sensible defaults and a cache that never spawns a sweep
//! task, so unit tests run without a tokio runtime.
#![allow(dead_code)]

use crate::cache::{CacheConfig, ResultCache};
use crate::graph::models::{Edge, Graph, Node, SharedCache};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Cache
// ============================================================================

/// Cache with a long default TTL and no background sweep.
pub fn test_cache() -> SharedCache {
    ResultCache::new(CacheConfig {
        default_ttl: Duration::from_secs(300),
        max_entries: 1000,
        sweep_interval: Duration::ZERO,
    })
}

// ============================================================================
// Graph builders
// ============================================================================

/// Build a graph from node ids and `(source, target, weight)` triples.
///
/// Labels are upper-cased ids and edge ids are `e0`, `e1`, ...
pub fn graph_from_edges(
    id: &str,
    directed: bool,
    nodes: &[&str],
    edges: &[(&str, &str, f64)],
) -> Graph {
    let mut graph = Graph::new(id, directed);
    for node_id in nodes {
        graph
            .nodes
            .push(Node::new(*node_id, node_id.to_uppercase(), "concept"));
    }
    for (i, (source, target, weight)) in edges.iter().enumerate() {
        graph
            .edges
            .push(Edge::new(format!("e{}", i), *source, *target).with_weight(*weight));
    }
    graph
}

/// Undirected chain n0 - n1 - ... - n{len-1}, unit weights.
pub fn chain(len: usize) -> Graph {
    let ids: Vec<String> = (0..len).map(|i| format!("n{}", i)).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let edges: Vec<(&str, &str, f64)> = id_refs
        .windows(2)
        .map(|pair| (pair[0], pair[1], 1.0))
        .collect();
    graph_from_edges("chain", false, &id_refs, &edges)
}

/// Undirected star: `hub` connected to leaves l0..l{leaves-1}.
pub fn star(leaves: usize) -> Graph {
    let mut ids = vec!["hub".to_string()];
    ids.extend((0..leaves).map(|i| format!("l{}", i)));
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let edges: Vec<(&str, &str, f64)> = id_refs[1..].iter().map(|l| ("hub", *l, 1.0)).collect();
    graph_from_edges("star", false, &id_refs, &edges)
}

/// Two disjoint undirected triangles: a-b-c and x-y-z.
pub fn two_triangles() -> Graph {
    graph_from_edges(
        "triangles",
        false,
        &["a", "b", "c", "x", "y", "z"],
        &[
            ("a", "b", 1.0),
            ("b", "c", 1.0),
            ("c", "a", 1.0),
            ("x", "y", 1.0),
            ("y", "z", 1.0),
            ("z", "x", 1.0),
        ],
    )
}

/// Two undirected 4-cliques (a0..a3, b0..b3) joined by a single a0 - b0 edge.
pub fn two_cliques() -> Graph {
    let ids: Vec<String> = ["a", "b"]
        .iter()
        .flat_map(|p| (0..4).map(move |i| format!("{}{}", p, i)))
        .collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();

    let mut edges = Vec::new();
    for group in [&id_refs[0..4], &id_refs[4..8]] {
        for i in 0..group.len() {
            for j in (i + 1)..group.len() {
                edges.push((group[i], group[j], 1.0));
            }
        }
    }
    edges.push(("a0", "b0", 1.0));
    graph_from_edges("cliques", false, &id_refs, &edges)
}

/// Undirected complete graph on `n` nodes, unit weights.
pub fn complete(n: usize) -> Graph {
    let ids: Vec<String> = (0..n).map(|i| format!("k{}", i)).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let mut edges = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            edges.push((id_refs[i], id_refs[j], 1.0));
        }
    }
    graph_from_edges("complete", false, &id_refs, &edges)
}
