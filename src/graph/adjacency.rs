//! Adjacency structure shared by every analyzer.
//!
//! Node ids are interned into dense indices (graph order) and each node owns an
//! insertion-ordered neighbor map. Iteration order is therefore deterministic,
//! which keeps shortest-path and community tie-breaking reproducible.

use indexmap::{IndexMap, IndexSet};

use super::models::Graph;

/// Weighted adjacency over a [`Graph`] snapshot.
#[derive(Debug, Clone, Default)]
pub struct Adjacency {
    ids: IndexSet<String>,
    neighbors: Vec<IndexMap<usize, f64>>,
    directed: bool,
    skipped_edges: usize,
}

/// Build the adjacency of a graph.
///
/// - every node gets an entry, even without edges
/// - undirected graphs get both directions of every edge
/// - a repeated `(source, target)` pair keeps its first position and the last weight
/// - edges whose endpoints are not nodes are skipped
/// - negative or non-finite weights fall back to 1.0
pub fn build_adjacency(graph: &Graph) -> Adjacency {
    let mut ids = IndexSet::with_capacity(graph.nodes.len());
    for node in &graph.nodes {
        ids.insert(node.id.clone());
    }

    let mut neighbors = vec![IndexMap::new(); ids.len()];
    let mut skipped_edges = 0;

    for edge in &graph.edges {
        let (Some(source), Some(target)) =
            (ids.get_index_of(&edge.source), ids.get_index_of(&edge.target))
        else {
            skipped_edges += 1;
            continue;
        };

        let weight = sanitize_weight(edge.weight());
        neighbors[source].insert(target, weight);
        if !graph.directed {
            neighbors[target].insert(source, weight);
        }
    }

    if skipped_edges > 0 {
        tracing::warn!(
            "Graph {}: skipped {} edges with unknown endpoints",
            graph.id,
            skipped_edges
        );
    }

    Adjacency {
        ids,
        neighbors,
        directed: graph.directed,
        skipped_edges,
    }
}

fn sanitize_weight(weight: f64) -> f64 {
    if weight.is_finite() && weight >= 0.0 {
        weight
    } else {
        1.0
    }
}

impl Adjacency {
    /// Number of distinct node ids.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    /// Edges dropped because an endpoint was not a node.
    pub fn skipped_edges(&self) -> usize {
        self.skipped_edges
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.ids.get_index_of(id)
    }

    /// Node id at a dense index. Panics if `index >= len()`.
    pub fn id(&self, index: usize) -> &str {
        &self.ids[index]
    }

    /// Node ids in graph order.
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.ids.iter().map(String::as_str)
    }

    /// Neighbor map of a node: neighbor index → weight.
    pub fn neighbors(&self, index: usize) -> &IndexMap<usize, f64> {
        &self.neighbors[index]
    }

    /// Neighbors of a node by id, in insertion order.
    pub fn neighbors_of(&self, id: &str) -> Option<Vec<(&str, f64)>> {
        let index = self.index_of(id)?;
        Some(
            self.neighbors[index]
                .iter()
                .map(|(&n, &w)| (self.id(n), w))
                .collect(),
        )
    }

    /// Weight of the `from → to` entry, if present.
    pub fn weight(&self, from: &str, to: &str) -> Option<f64> {
        let from = self.index_of(from)?;
        let to = self.index_of(to)?;
        self.neighbors[from].get(&to).copied()
    }

    /// Size of the neighbor set (out-neighbors for directed graphs).
    pub fn degree(&self, index: usize) -> usize {
        self.neighbors[index].len()
    }

    pub fn degree_of(&self, id: &str) -> Option<usize> {
        self.index_of(id).map(|i| self.degree(i))
    }

    /// Neighbor count ignoring a self-loop.
    pub fn degree_without_self(&self, index: usize) -> usize {
        let map = &self.neighbors[index];
        map.len() - usize::from(map.contains_key(&index))
    }

    /// Number of distinct unordered links between different nodes.
    ///
    /// Meaningful on the undirected view, where each link appears twice.
    pub fn link_count(&self) -> usize {
        let mut count = 0;
        for (i, map) in self.neighbors.iter().enumerate() {
            count += map.keys().filter(|&&j| j > i).count();
        }
        count
    }

    /// Undirected view: every `a → b` entry is mirrored as `b → a`.
    ///
    /// For an undirected graph this is a plain clone. When both directions
    /// already exist with different weights, the first one seen wins.
    pub fn undirected(&self) -> Adjacency {
        if !self.directed {
            return self.clone();
        }

        let mut neighbors = vec![IndexMap::new(); self.len()];
        for (i, map) in self.neighbors.iter().enumerate() {
            for (&j, &weight) in map {
                neighbors[i].entry(j).or_insert(weight);
                neighbors[j].entry(i).or_insert(weight);
            }
        }

        Adjacency {
            ids: self.ids.clone(),
            neighbors,
            directed: false,
            skipped_edges: self.skipped_edges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::models::{Edge, Node};
    use crate::test_helpers::graph_from_edges;

    #[test]
    fn test_undirected_edges_are_mirrored() {
        let graph = graph_from_edges("g", false, &["a", "b", "c"], &[("a", "b", 2.0)]);
        let adj = build_adjacency(&graph);

        assert_eq!(adj.len(), 3);
        assert_eq!(adj.weight("a", "b"), Some(2.0));
        assert_eq!(adj.weight("b", "a"), Some(2.0));
        assert_eq!(adj.degree_of("c"), Some(0), "isolated node still has an entry");
    }

    #[test]
    fn test_directed_edges_are_one_way() {
        let graph = graph_from_edges("g", true, &["a", "b"], &[("a", "b", 1.0)]);
        let adj = build_adjacency(&graph);

        assert_eq!(adj.weight("a", "b"), Some(1.0));
        assert_eq!(adj.weight("b", "a"), None);
        assert_eq!(adj.degree_of("a"), Some(1));
        assert_eq!(adj.degree_of("b"), Some(0));
    }

    #[test]
    fn test_missing_endpoint_edges_are_skipped() {
        let graph = graph_from_edges(
            "g",
            false,
            &["a", "b"],
            &[("a", "b", 1.0), ("a", "ghost", 1.0), ("ghost", "b", 1.0)],
        );
        let adj = build_adjacency(&graph);

        assert_eq!(adj.skipped_edges(), 2);
        assert_eq!(adj.degree_of("a"), Some(1));
        assert!(adj.index_of("ghost").is_none());
    }

    #[test]
    fn test_invalid_weights_fall_back_to_one() {
        let mut graph = Graph::new("g", true);
        for id in ["a", "b", "c", "d"] {
            graph.nodes.push(Node::new(id, id, "concept"));
        }
        graph.edges.push(Edge::new("e1", "a", "b").with_weight(-3.0));
        graph.edges.push(Edge::new("e2", "a", "c").with_weight(f64::NAN));
        graph.edges.push(Edge::new("e3", "a", "d").with_weight(0.0));
        let adj = build_adjacency(&graph);

        assert_eq!(adj.weight("a", "b"), Some(1.0));
        assert_eq!(adj.weight("a", "c"), Some(1.0));
        assert_eq!(adj.weight("a", "d"), Some(0.0), "zero is a valid weight");
    }

    #[test]
    fn test_duplicate_pair_keeps_last_weight() {
        let graph = graph_from_edges(
            "g",
            true,
            &["a", "b", "c"],
            &[("a", "b", 1.0), ("a", "c", 1.0), ("a", "b", 5.0)],
        );
        let adj = build_adjacency(&graph);

        assert_eq!(adj.weight("a", "b"), Some(5.0));
        let order: Vec<&str> = adj
            .neighbors_of("a")
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(order, vec!["b", "c"], "first position is kept");
    }

    #[test]
    fn test_undirected_view_of_directed_graph() {
        let graph = graph_from_edges(
            "g",
            true,
            &["a", "b", "c"],
            &[("a", "b", 1.0), ("b", "a", 3.0), ("c", "b", 2.0)],
        );
        let undirected = build_adjacency(&graph).undirected();

        assert!(!undirected.is_directed());
        assert_eq!(undirected.weight("a", "b"), Some(1.0));
        assert_eq!(undirected.weight("b", "a"), Some(1.0), "first direction seen wins");
        assert_eq!(undirected.weight("b", "c"), Some(2.0));
        assert_eq!(undirected.link_count(), 2);
    }

    #[test]
    fn test_degree_without_self_loop() {
        let graph = graph_from_edges(
            "g",
            false,
            &["a", "b"],
            &[("a", "a", 1.0), ("a", "b", 1.0)],
        );
        let adj = build_adjacency(&graph);
        let a = adj.index_of("a").unwrap();

        assert_eq!(adj.degree(a), 2);
        assert_eq!(adj.degree_without_self(a), 1);
        assert_eq!(adj.link_count(), 1, "self-loops are not links");
    }

    #[test]
    fn test_empty_graph() {
        let adj = build_adjacency(&Graph::new("empty", false));
        assert!(adj.is_empty());
        assert_eq!(adj.link_count(), 0);
        assert_eq!(adj.ids().count(), 0);
    }
}
