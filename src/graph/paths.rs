//! Shortest paths (Dijkstra) over the weighted adjacency.
//!
//! Single-pair queries stop as soon as the target is settled and are cached per
//! `(start, end)`, including "no path" answers. All-pairs runs one full Dijkstra
//! per source and reads every pair off the resulting shortest-path tree.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use super::adjacency::{build_adjacency, Adjacency};
use super::models::{
    AllShortestPaths, AnalyticsConfig, CachedValue, Graph, PathResult, SharedCache,
};
use crate::cache::{CacheKey, Operation};
use crate::error::{AnalyticsError, AnalyticsResult};

/// Shortest paths stay valid for 10 minutes.
pub const PATH_TTL: Duration = Duration::from_secs(10 * 60);

// ============================================================================
// Dijkstra
// ============================================================================

/// Min-heap entry. Equal costs pop in push order so the first-discovered
/// path wins ties.
#[derive(Debug, Clone, Copy)]
struct QueueItem {
    cost: f64,
    seq: u64,
    node: usize,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueItem {}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for BinaryHeap (max-heap → min-heap)
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Distances and predecessors from one source.
#[derive(Debug, Clone)]
pub(crate) struct ShortestPathTree {
    source: usize,
    dist: Vec<f64>,
    prev: Vec<Option<usize>>,
}

impl ShortestPathTree {
    /// Path from the tree's source to `target`, `None` if unreachable.
    pub(crate) fn path_to(&self, adjacency: &Adjacency, target: usize) -> Option<PathResult> {
        let total_weight = self.dist[target];
        if !total_weight.is_finite() {
            return None;
        }

        let mut path = vec![adjacency.id(target).to_string()];
        let mut current = target;
        while current != self.source {
            current = self.prev[current]?;
            path.push(adjacency.id(current).to_string());
        }
        path.reverse();

        let length = path.len() - 1;
        Some(PathResult {
            path,
            total_weight,
            length,
        })
    }
}

/// Dijkstra from `source`. With a `target`, stops once the target is settled.
///
/// Relaxation is strict (`<`), so among equal-cost paths the one found first is kept.
pub(crate) fn dijkstra(
    adjacency: &Adjacency,
    source: usize,
    target: Option<usize>,
) -> ShortestPathTree {
    let n = adjacency.len();
    let mut dist = vec![f64::INFINITY; n];
    let mut prev = vec![None; n];
    let mut settled = vec![false; n];
    let mut heap = BinaryHeap::new();
    let mut seq = 0u64;

    dist[source] = 0.0;
    heap.push(QueueItem {
        cost: 0.0,
        seq,
        node: source,
    });

    while let Some(QueueItem { cost, node, .. }) = heap.pop() {
        if settled[node] {
            continue;
        }
        settled[node] = true;
        if target == Some(node) {
            break;
        }

        for (&next, &weight) in adjacency.neighbors(node) {
            if settled[next] {
                continue;
            }
            let candidate = cost + weight;
            if candidate < dist[next] {
                dist[next] = candidate;
                prev[next] = Some(node);
                seq += 1;
                heap.push(QueueItem {
                    cost: candidate,
                    seq,
                    node: next,
                });
            }
        }
    }

    ShortestPathTree { source, dist, prev }
}

// ============================================================================
// PathFinder
// ============================================================================

/// Shortest-path queries over one graph snapshot.
pub struct PathFinder {
    graph: Arc<Graph>,
    cache: SharedCache,
    scope: String,
    config: AnalyticsConfig,
    adjacency: OnceLock<Adjacency>,
}

impl PathFinder {
    pub fn new(
        graph: Arc<Graph>,
        cache: SharedCache,
        scope: impl Into<String>,
        config: AnalyticsConfig,
    ) -> Self {
        Self {
            graph,
            cache,
            scope: scope.into(),
            config,
            adjacency: OnceLock::new(),
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Adjacency of the graph, built on first use.
    pub fn adjacency(&self) -> &Adjacency {
        self.adjacency.get_or_init(|| build_adjacency(&self.graph))
    }

    /// Minimum-weight path from `start` to `end`.
    ///
    /// Returns `None` when either id is unknown or `end` is unreachable.
    /// `start == end` yields a single-node path of weight 0.
    pub fn find_shortest_path(&self, start: &str, end: &str) -> Option<PathResult> {
        let key = CacheKey::new(self.scope.as_str(), Operation::shortest_path(start, end));
        if let Some(CachedValue::Path(cached)) = self.cache.get(&key) {
            return cached;
        }

        let adjacency = self.adjacency();
        let result = match (adjacency.index_of(start), adjacency.index_of(end)) {
            (Some(source), Some(target)) => {
                dijkstra(adjacency, source, Some(target)).path_to(adjacency, target)
            }
            _ => None,
        };

        self.cache
            .set_with_ttl(key, CachedValue::Path(result.clone()), PATH_TTL);
        result
    }

    /// Shortest paths between every pair of distinct, mutually reachable nodes.
    ///
    /// Each unordered pair `{a, b}` (a before b in graph order) is computed once
    /// as `a → b`; `[b][a]` holds the same path reversed with the same weight.
    /// Per-pair results are not written to the cache.
    pub fn find_all_shortest_paths(&self) -> AnalyticsResult<AllShortestPaths> {
        let adjacency = self.adjacency();
        let n = adjacency.len();
        if n > self.config.max_all_pairs_nodes {
            tracing::warn!(
                "Graph {}: {} nodes exceeds the all-pairs limit of {}",
                self.graph.id,
                n,
                self.config.max_all_pairs_nodes
            );
            return Err(AnalyticsError::GraphTooLarge {
                nodes: n,
                limit: self.config.max_all_pairs_nodes,
            });
        }

        let mut all: AllShortestPaths = HashMap::with_capacity(n);
        for i in 0..n {
            let tree = dijkstra(adjacency, i, None);
            for j in (i + 1)..n {
                let Some(forward) = tree.path_to(adjacency, j) else {
                    continue;
                };
                let mut reversed = forward.clone();
                reversed.path.reverse();

                all.entry(adjacency.id(i).to_string())
                    .or_default()
                    .insert(adjacency.id(j).to_string(), forward);
                all.entry(adjacency.id(j).to_string())
                    .or_default()
                    .insert(adjacency.id(i).to_string(), reversed);
            }
        }

        tracing::debug!(
            "Graph {}: computed all-pairs shortest paths over {} nodes",
            self.graph.id,
            n
        );
        Ok(all)
    }
}
