//! Global graph statistics and connectivity.

use std::collections::VecDeque;
use std::sync::{Arc, OnceLock};

use super::adjacency::Adjacency;
use super::models::{
    AnalyticsConfig, CachedValue, ConnectivityResult, Graph, GraphStatistics, SharedCache,
};
use super::paths::PathFinder;
use crate::cache::{CacheKey, Operation};
use crate::error::AnalyticsResult;

/// Sizes of the connected components of an undirected adjacency, in discovery order.
pub(crate) fn component_sizes(adjacency: &Adjacency) -> Vec<usize> {
    let n = adjacency.len();
    let mut visited = vec![false; n];
    let mut sizes = Vec::new();

    for start in 0..n {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let mut queue = VecDeque::from([start]);
        let mut size = 0;

        while let Some(current) = queue.pop_front() {
            size += 1;
            for &neighbor in adjacency.neighbors(current).keys() {
                if !visited[neighbor] {
                    visited[neighbor] = true;
                    queue.push_back(neighbor);
                }
            }
        }
        sizes.push(size);
    }
    sizes
}

/// Global clustering coefficient: closed neighbor pairs over possible neighbor
/// pairs, summed across all nodes. Self-loops are ignored.
pub(crate) fn global_clustering(adjacency: &Adjacency) -> f64 {
    let mut closed = 0usize;
    let mut possible = 0usize;

    for i in 0..adjacency.len() {
        let neighbors: Vec<usize> = adjacency
            .neighbors(i)
            .keys()
            .copied()
            .filter(|&j| j != i)
            .collect();
        let k = neighbors.len();
        if k < 2 {
            continue;
        }
        possible += k * (k - 1) / 2;

        for (pos, &a) in neighbors.iter().enumerate() {
            for &b in &neighbors[pos + 1..] {
                if adjacency.neighbors(a).contains_key(&b) {
                    closed += 1;
                }
            }
        }
    }

    if possible > 0 {
        closed as f64 / possible as f64
    } else {
        0.0
    }
}

/// Connectivity and summary statistics over one graph snapshot.
pub struct StatisticsAnalyzer {
    paths: PathFinder,
    cache: SharedCache,
    scope: String,
    undirected: OnceLock<Adjacency>,
}

impl StatisticsAnalyzer {
    pub fn new(
        graph: Arc<Graph>,
        cache: SharedCache,
        scope: impl Into<String>,
        config: AnalyticsConfig,
    ) -> Self {
        let scope = scope.into();
        Self {
            paths: PathFinder::new(graph, cache.clone(), scope.clone(), config),
            cache,
            scope,
            undirected: OnceLock::new(),
        }
    }

    fn undirected(&self) -> &Adjacency {
        self.undirected
            .get_or_init(|| self.paths.adjacency().undirected())
    }

    /// Connected components, ignoring edge direction.
    pub fn check_connectivity(&self) -> ConnectivityResult {
        let key = CacheKey::new(self.scope.as_str(), Operation::Connectivity);
        if let Some(CachedValue::Connectivity(cached)) = self.cache.get(&key) {
            return cached;
        }

        let sizes = component_sizes(self.undirected());
        let result = ConnectivityResult {
            connected: sizes.len() <= 1,
            components: sizes.len(),
            largest_component: sizes.iter().copied().max().unwrap_or(0),
        };

        tracing::debug!(
            "Graph {}: {} components, largest {}",
            self.paths.graph().id,
            result.components,
            result.largest_component
        );

        self.cache.set(key, CachedValue::Connectivity(result));
        result
    }

    /// Size, density, degree, path-length and clustering statistics.
    ///
    /// Diameter and average path length count hops and are only computed for
    /// connected graphs with more than one node; they stay 0 otherwise.
    pub fn calculate_statistics(&self) -> AnalyticsResult<Arc<GraphStatistics>> {
        let key = CacheKey::new(self.scope.as_str(), Operation::Statistics);
        if let Some(CachedValue::Statistics(cached)) = self.cache.get(&key) {
            return Ok(cached);
        }

        let graph = self.paths.graph();
        let adjacency = self.paths.adjacency();
        let total_nodes = graph.node_count();
        let total_edges = graph.edge_count();

        let density = if total_nodes < 2 {
            0.0
        } else {
            let pairs = (total_nodes * (total_nodes - 1)) as f64;
            if graph.directed {
                total_edges as f64 / pairs
            } else {
                total_edges as f64 / (pairs / 2.0)
            }
        };

        let n = adjacency.len();
        let average_degree = if n > 0 {
            (0..n).map(|i| adjacency.degree(i)).sum::<usize>() as f64 / n as f64
        } else {
            0.0
        };

        let mut diameter = 0;
        let mut average_path_length = 0.0;
        if n > 1 && self.check_connectivity().connected {
            let all = self.paths.find_all_shortest_paths()?;
            let mut hops = 0usize;
            let mut count = 0usize;
            for i in 0..n {
                let Some(from) = all.get(adjacency.id(i)) else {
                    continue;
                };
                for j in (i + 1)..n {
                    if let Some(path) = from.get(adjacency.id(j)) {
                        diameter = diameter.max(path.length);
                        hops += path.length;
                        count += 1;
                    }
                }
            }
            if count > 0 {
                average_path_length = hops as f64 / count as f64;
            }
        }

        let statistics = Arc::new(GraphStatistics {
            total_nodes,
            total_edges,
            density,
            average_degree,
            diameter,
            average_path_length,
            clustering_coefficient: global_clustering(self.undirected()),
        });

        tracing::debug!(
            "Graph {}: {} nodes, {} edges, density {:.3}, diameter {}",
            graph.id,
            total_nodes,
            total_edges,
            density,
            diameter
        );

        self.cache
            .set(key, CachedValue::Statistics(statistics.clone()));
        Ok(statistics)
    }
}
