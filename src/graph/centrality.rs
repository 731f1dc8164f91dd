//! Node importance: degree, betweenness, closeness, eigenvector proxy and PageRank.
//!
//! Betweenness and closeness are derived from the all-pairs shortest paths, so
//! both inherit the node ceiling of [`PathFinder::find_all_shortest_paths`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::adjacency::Adjacency;
use super::models::{
    AnalyticsConfig, CachedValue, CentralityResult, Graph, SharedCache,
};
use super::paths::PathFinder;
use crate::cache::{CacheKey, Operation};
use crate::error::AnalyticsResult;

/// Centrality and PageRank results stay valid for 15 minutes.
pub const CENTRALITY_TTL: Duration = Duration::from_secs(15 * 60);

// ============================================================================
// PageRank (power iteration)
// ============================================================================

/// PageRank scores indexed like the adjacency.
///
/// Runs exactly `iterations` rounds. Each node passes `damping * rank / out_degree`
/// to every out-neighbor; nodes without out-neighbors spread their rank evenly
/// over the whole graph so the scores keep summing to 1.
pub(crate) fn pagerank(adjacency: &Adjacency, damping: f64, iterations: usize) -> Vec<f64> {
    let n = adjacency.len();
    if n == 0 {
        return Vec::new();
    }

    let base = (1.0 - damping) / n as f64;
    let mut scores = vec![1.0 / n as f64; n];
    let mut next = vec![0.0; n];

    for _ in 0..iterations {
        next.iter_mut().for_each(|s| *s = base);

        let mut dangling = 0.0;
        for (i, &score) in scores.iter().enumerate() {
            let out_degree = adjacency.degree(i);
            if out_degree == 0 {
                dangling += score;
                continue;
            }
            let contribution = damping * score / out_degree as f64;
            for &neighbor in adjacency.neighbors(i).keys() {
                next[neighbor] += contribution;
            }
        }

        if dangling > 0.0 {
            let share = damping * dangling / n as f64;
            next.iter_mut().for_each(|s| *s += share);
        }

        std::mem::swap(&mut scores, &mut next);
    }

    // Guard against floating point drift
    let total: f64 = scores.iter().sum();
    if total > 0.0 {
        scores.iter_mut().for_each(|s| *s /= total);
    }
    scores
}

/// Copy PageRank scores into centrality results, matching on node id.
pub fn merge_pagerank(results: &mut [CentralityResult], ranks: &HashMap<String, f64>) {
    for result in results.iter_mut() {
        if let Some(&rank) = ranks.get(&result.node_id) {
            result.pagerank = rank;
        }
    }
}

// ============================================================================
// CentralityCalculator
// ============================================================================

/// Centrality measures over one graph snapshot.
pub struct CentralityCalculator {
    paths: PathFinder,
    cache: SharedCache,
    scope: String,
    config: AnalyticsConfig,
}

impl CentralityCalculator {
    pub fn new(
        graph: Arc<Graph>,
        cache: SharedCache,
        scope: impl Into<String>,
        config: AnalyticsConfig,
    ) -> Self {
        let scope = scope.into();
        Self {
            paths: PathFinder::new(graph, cache.clone(), scope.clone(), config.clone()),
            cache,
            scope,
            config,
        }
    }

    /// The path finder this calculator derives its distances from.
    pub fn paths(&self) -> &PathFinder {
        &self.paths
    }

    /// Degree, betweenness, closeness and eigenvector proxy for every node, in
    /// graph order. `pagerank` is left at 0; see [`merge_pagerank`].
    ///
    /// - betweenness: number of unordered pairs whose shortest path passes
    ///   through the node (endpoints excluded), over `(n-1)(n-2)/2`; 0 when n < 3
    /// - closeness: `(n-1) / sum of distances` to reachable nodes; 0 when none
    /// - eigenvector: `degree / average degree`; 0 when there are no edges
    pub fn calculate_centrality(&self) -> AnalyticsResult<Arc<Vec<CentralityResult>>> {
        let key = CacheKey::new(self.scope.as_str(), Operation::Centrality);
        if let Some(CachedValue::Centrality(cached)) = self.cache.get(&key) {
            return Ok(cached);
        }

        let adjacency = self.paths.adjacency();
        let n = adjacency.len();
        let all = self.paths.find_all_shortest_paths()?;

        let mut through = vec![0usize; n];
        for i in 0..n {
            let Some(from) = all.get(adjacency.id(i)) else {
                continue;
            };
            for j in (i + 1)..n {
                let Some(path) = from.get(adjacency.id(j)) else {
                    continue;
                };
                if path.path.len() < 3 {
                    continue;
                }
                for inner in &path.path[1..path.path.len() - 1] {
                    if let Some(k) = adjacency.index_of(inner) {
                        through[k] += 1;
                    }
                }
            }
        }

        let pair_count = if n >= 3 {
            ((n - 1) * (n - 2)) as f64 / 2.0
        } else {
            0.0
        };
        let total_degree: usize = (0..n).map(|i| adjacency.degree(i)).sum();
        let average_degree = if n > 0 {
            total_degree as f64 / n as f64
        } else {
            0.0
        };
        let labels = self.paths.graph().labels();

        let results: Vec<CentralityResult> = (0..n)
            .map(|i| {
                let id = adjacency.id(i);
                let degree = adjacency.degree(i);

                let betweenness = if pair_count > 0.0 {
                    through[i] as f64 / pair_count
                } else {
                    0.0
                };

                let distance_sum: f64 = all
                    .get(id)
                    .map(|targets| targets.values().map(|p| p.total_weight).sum())
                    .unwrap_or(0.0);
                let closeness = if distance_sum > 0.0 {
                    (n - 1) as f64 / distance_sum
                } else {
                    0.0
                };

                let eigenvector = if average_degree > 0.0 {
                    degree as f64 / average_degree
                } else {
                    0.0
                };

                CentralityResult {
                    node_id: id.to_string(),
                    label: labels.get(id).copied().unwrap_or(id).to_string(),
                    degree,
                    betweenness,
                    closeness,
                    eigenvector,
                    pagerank: 0.0,
                }
            })
            .collect();

        tracing::debug!(
            "Graph {}: centrality computed for {} nodes",
            self.paths.graph().id,
            n
        );

        let results = Arc::new(results);
        self.cache.set_with_ttl(
            key,
            CachedValue::Centrality(results.clone()),
            CENTRALITY_TTL,
        );
        Ok(results)
    }

    /// PageRank with explicit parameters. Cached per `(damping, iterations)`.
    pub fn calculate_pagerank(&self, damping: f64, iterations: usize) -> Arc<HashMap<String, f64>> {
        let key = CacheKey::new(self.scope.as_str(), Operation::pagerank(damping, iterations));
        if let Some(CachedValue::PageRank(cached)) = self.cache.get(&key) {
            return cached;
        }

        let adjacency = self.paths.adjacency();
        let scores = pagerank(adjacency, damping, iterations);
        let ranks: HashMap<String, f64> = adjacency
            .ids()
            .zip(scores)
            .map(|(id, score)| (id.to_string(), score))
            .collect();

        let ranks = Arc::new(ranks);
        self.cache
            .set_with_ttl(key, CachedValue::PageRank(ranks.clone()), CENTRALITY_TTL);
        ranks
    }

    /// PageRank with the configured damping and iteration count.
    pub fn calculate_pagerank_default(&self) -> Arc<HashMap<String, f64>> {
        self.calculate_pagerank(self.config.pagerank_damping, self.config.pagerank_iterations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalyticsError;
    use crate::test_helpers::{chain, complete, graph_from_edges, star, test_cache};

    fn calculator(graph: Graph) -> CentralityCalculator {
        let scope = graph.id.clone();
        CentralityCalculator::new(
            Arc::new(graph),
            test_cache(),
            scope,
            AnalyticsConfig::default(),
        )
    }

    fn by_id<'a>(results: &'a [CentralityResult], id: &str) -> &'a CentralityResult {
        results.iter().find(|r| r.node_id == id).unwrap()
    }

    #[test]
    fn test_star_hub_is_most_central() {
        let calc = calculator(star(4));
        let results = calc.calculate_centrality().unwrap();

        let hub = by_id(&results, "hub");
        assert_eq!(hub.degree, 4);
        // Every leaf pair (6 of them) routes through the hub; (n-1)(n-2)/2 = 6
        assert!((hub.betweenness - 1.0).abs() < 1e-9, "got {}", hub.betweenness);
        assert!((hub.closeness - 1.0).abs() < 1e-9);

        let leaf = by_id(&results, "l0");
        assert_eq!(leaf.betweenness, 0.0);
        // 1 + 2 + 2 + 2 = 7
        assert!((leaf.closeness - 4.0 / 7.0).abs() < 1e-9);
        // average degree = 8 / 5
        assert!((hub.eigenvector - 4.0 / 1.6).abs() < 1e-9);
        assert!((leaf.eigenvector - 1.0 / 1.6).abs() < 1e-9);
    }

    #[test]
    fn test_chain_middle_has_highest_betweenness() {
        let results = calculator(chain(5)).calculate_centrality().unwrap();
        let middle = by_id(&results, "n2");
        let end = by_id(&results, "n0");

        // n2 sits inside n0-n3, n0-n4, n1-n3, n1-n4: 4 of 6 pairs
        assert!((middle.betweenness - 4.0 / 6.0).abs() < 1e-9);
        assert_eq!(end.betweenness, 0.0);
        assert!(middle.closeness > end.closeness);
    }

    #[test]
    fn test_results_follow_graph_order_with_labels() {
        let results = calculator(chain(3)).calculate_centrality().unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.node_id.as_str()).collect();
        assert_eq!(ids, vec!["n0", "n1", "n2"]);
        assert_eq!(results[1].label, "N1");
        assert!(results.iter().all(|r| r.pagerank == 0.0));
    }

    #[test]
    fn test_small_and_edgeless_graphs() {
        let pair = graph_from_edges("pair", false, &["a", "b"], &[("a", "b", 1.0)]);
        let results = calculator(pair).calculate_centrality().unwrap();
        assert!(results.iter().all(|r| r.betweenness == 0.0), "n < 3");

        let lonely = graph_from_edges("lonely", false, &["a", "b"], &[]);
        let results = calculator(lonely).calculate_centrality().unwrap();
        for r in results.iter() {
            assert_eq!(r.closeness, 0.0);
            assert_eq!(r.eigenvector, 0.0);
        }

        let empty = calculator(Graph::new("empty", false));
        assert!(empty.calculate_centrality().unwrap().is_empty());
    }

    #[test]
    fn test_centrality_is_cached() {
        let cache = test_cache();
        let calc = CentralityCalculator::new(
            Arc::new(star(3)),
            cache.clone(),
            "star",
            AnalyticsConfig::default(),
        );
        let first = calc.calculate_centrality().unwrap();
        let second = calc.calculate_centrality().unwrap();
        assert!(Arc::ptr_eq(&first, &second), "second call is served from cache");
        assert!(cache.has(&CacheKey::new("star", Operation::Centrality)));
    }

    #[test]
    fn test_centrality_respects_size_limit() {
        let config = AnalyticsConfig {
            max_all_pairs_nodes: 2,
            ..AnalyticsConfig::default()
        };
        let calc = CentralityCalculator::new(Arc::new(chain(3)), test_cache(), "chain", config);
        assert!(matches!(
            calc.calculate_centrality(),
            Err(AnalyticsError::GraphTooLarge { nodes: 3, limit: 2 })
        ));
    }

    #[test]
    fn test_pagerank_sums_to_one() {
        for graph in [star(5), chain(6), complete(4)] {
            let ranks = calculator(graph).calculate_pagerank_default();
            let total: f64 = ranks.values().sum();
            assert!((total - 1.0).abs() < 1e-6, "sum was {}", total);
        }
    }

    #[test]
    fn test_pagerank_with_dangling_nodes() {
        // c has no out-links; its rank is spread over every node
        let graph = graph_from_edges(
            "g",
            true,
            &["a", "b", "c"],
            &[("a", "b", 1.0), ("b", "c", 1.0)],
        );
        let ranks = calculator(graph).calculate_pagerank(0.85, 50);
        let total: f64 = ranks.values().sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!(ranks["c"] > ranks["b"]);
        assert!(ranks["b"] > ranks["a"]);
    }

    #[test]
    fn test_pagerank_complete_graph_is_uniform() {
        let ranks = calculator(complete(5)).calculate_pagerank(0.85, 30);
        for score in ranks.values() {
            assert!((score - 0.2).abs() < 1e-9);
        }
    }

    #[test]
    fn test_pagerank_zero_iterations_is_uniform() {
        let ranks = calculator(chain(4)).calculate_pagerank(0.85, 0);
        for score in ranks.values() {
            assert!((score - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn test_pagerank_cached_per_parameters() {
        let cache = test_cache();
        let calc = CentralityCalculator::new(
            Arc::new(star(3)),
            cache.clone(),
            "star",
            AnalyticsConfig::default(),
        );
        let a = calc.calculate_pagerank(0.85, 100);
        let b = calc.calculate_pagerank(0.85, 100);
        let c = calc.calculate_pagerank(0.5, 100);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert!(c["hub"] < a["hub"], "lower damping flattens the distribution");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_merge_pagerank() {
        let calc = calculator(star(3));
        let mut results = calc.calculate_centrality().unwrap().as_ref().clone();
        let ranks = calc.calculate_pagerank_default();
        merge_pagerank(&mut results, &ranks);

        let hub = by_id(&results, "hub");
        assert!((hub.pagerank - ranks["hub"]).abs() < f64::EPSILON);
        assert!(results.iter().all(|r| r.pagerank > 0.0));
    }
}
