//! Community detection and knowledge-gap analysis.
//!
//! Both work on the undirected view of the graph. Communities come from greedy
//! local moves: every node starts alone and repeatedly joins the neighboring
//! community it shares the most links with, until a pass moves nothing.
//! Gaps are then read off the community structure: sparse communities,
//! weakly linked community pairs and near-isolated nodes.

use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use super::adjacency::{build_adjacency, Adjacency};
use super::models::{
    AnalyticsConfig, BridgeOpportunity, CachedValue, CommunityResult, GapAnalysis, Graph,
    SharedCache, SparseArea,
};
use crate::cache::{CacheKey, Operation};

/// Community and gap results stay valid for 15 minutes.
pub const COMMUNITY_TTL: Duration = Duration::from_secs(15 * 60);

/// Labels listed in a sparse-area suggestion.
const MAX_SUGGESTED_LABELS: usize = 5;

/// Bridge candidates proposed per community.
const BRIDGE_CANDIDATES: usize = 2;

// ============================================================================
// Greedy community assignment
// ============================================================================

/// Assign each node a dense community id (0..k, in order of first appearance).
///
/// A node moves only when some neighboring community holds strictly more of its
/// links than its current one; on equal counts the community met first in
/// neighbor order wins. Self-loops are ignored.
pub(crate) fn assign_communities(adjacency: &Adjacency, max_passes: usize) -> Vec<usize> {
    let n = adjacency.len();
    let mut community: Vec<usize> = (0..n).collect();

    let total_links = adjacency.link_count();
    if total_links == 0 {
        return community;
    }
    let m = total_links as f64;

    let mut passes = 0;
    let mut improved = true;
    while improved && passes < max_passes {
        improved = false;
        passes += 1;

        for node in 0..n {
            let current = community[node];

            // Links to each neighboring community, in neighbor order
            let mut links: IndexMap<usize, usize> = IndexMap::new();
            for &neighbor in adjacency.neighbors(node).keys() {
                if neighbor != node {
                    *links.entry(community[neighbor]).or_default() += 1;
                }
            }

            let mut best = current;
            let mut best_gain = links.get(&current).copied().unwrap_or(0) as f64 / m;
            for (&target, &count) in &links {
                if target == current {
                    continue;
                }
                let gain = count as f64 / m;
                if gain > best_gain {
                    best_gain = gain;
                    best = target;
                }
            }

            if best != current {
                community[node] = best;
                improved = true;
            }
        }
    }

    tracing::debug!("Community detection settled after {} passes", passes);

    // Renumber communities to be contiguous (0, 1, 2, ...)
    let mut remap: HashMap<usize, usize> = HashMap::new();
    for c in community.iter_mut() {
        let next_id = remap.len();
        *c = *remap.entry(*c).or_insert(next_id);
    }
    community
}

/// Newman modularity of an assignment over the undirected view, unit weights:
/// `Q = Σ_c [ in_c / 2m - (deg_c / 2m)² ]`.
pub(crate) fn compute_modularity(adjacency: &Adjacency, community: &[usize]) -> f64 {
    let m2 = 2.0 * adjacency.link_count() as f64;
    if m2 == 0.0 {
        return 0.0;
    }

    let k = community.iter().max().map_or(0, |&c| c + 1);
    let mut internal = vec![0.0; k];
    let mut degree = vec![0.0; k];

    for (i, &c) in community.iter().enumerate() {
        for &j in adjacency.neighbors(i).keys() {
            if j == i {
                continue;
            }
            degree[c] += 1.0;
            if community[j] == c {
                internal[c] += 1.0;
            }
        }
    }

    internal
        .iter()
        .zip(&degree)
        .map(|(in_c, deg_c)| in_c / m2 - (deg_c / m2).powi(2))
        .sum()
}

// ============================================================================
// CommunityDetector
// ============================================================================

/// Community and gap analysis over one graph snapshot.
pub struct CommunityDetector {
    graph: Arc<Graph>,
    cache: SharedCache,
    scope: String,
    config: AnalyticsConfig,
    undirected: OnceLock<Adjacency>,
}

impl CommunityDetector {
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
            undirected: OnceLock::new(),
        }
    }

    /// Undirected view of the graph, built on first use.
    pub fn adjacency(&self) -> &Adjacency {
        self.undirected
            .get_or_init(|| build_adjacency(&self.graph).undirected())
    }

    /// Partition the nodes into communities.
    pub fn detect_communities(&self) -> Arc<CommunityResult> {
        let key = CacheKey::new(self.scope.as_str(), Operation::Communities);
        if let Some(CachedValue::Communities(cached)) = self.cache.get(&key) {
            return cached;
        }

        let adjacency = self.adjacency();
        let assignment = assign_communities(adjacency, self.config.community_max_passes);
        let modularity = compute_modularity(adjacency, &assignment);

        let mut communities = HashMap::with_capacity(assignment.len());
        let mut community_nodes: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for (i, &c) in assignment.iter().enumerate() {
            let id = adjacency.id(i).to_string();
            communities.insert(id.clone(), c);
            community_nodes.entry(c).or_default().push(id);
        }

        tracing::info!(
            "Graph {}: {} communities (modularity {:.3})",
            self.graph.id,
            community_nodes.len(),
            modularity
        );

        let result = Arc::new(CommunityResult {
            communities,
            modularity,
            community_nodes,
        });
        self.cache.set_with_ttl(
            key,
            CachedValue::Communities(result.clone()),
            COMMUNITY_TTL,
        );
        result
    }

    /// Find sparse communities, weakly linked community pairs and isolated nodes.
    pub fn detect_gaps(&self) -> Arc<GapAnalysis> {
        let key = CacheKey::new(self.scope.as_str(), Operation::Gaps);
        if let Some(CachedValue::Gaps(cached)) = self.cache.get(&key) {
            return cached;
        }

        let communities = self.detect_communities();
        let adjacency = self.adjacency();
        let labels = self.graph.labels();
        let label = |index: usize| {
            let id = adjacency.id(index);
            labels.get(id).copied().unwrap_or(id)
        };

        let members: BTreeMap<usize, Vec<usize>> = communities
            .community_nodes
            .iter()
            .map(|(&c, ids)| {
                let indices: Vec<usize> =
                    ids.iter().filter_map(|id| adjacency.index_of(id)).collect();
                (c, indices)
            })
            .collect();
        let community_of: Vec<usize> = adjacency
            .ids()
            .map(|id| communities.communities.get(id).copied().unwrap_or(0))
            .collect();

        let isolated_nodes: Vec<String> = (0..adjacency.len())
            .filter(|&i| adjacency.degree_without_self(i) <= 1)
            .map(|i| adjacency.id(i).to_string())
            .collect();

        // Sparse areas
        let mut sparse_areas = Vec::new();
        for (&c, nodes) in &members {
            let size = nodes.len();
            if size < 3 {
                continue;
            }
            let internal: usize = nodes
                .iter()
                .map(|&i| {
                    adjacency
                        .neighbors(i)
                        .keys()
                        .filter(|&&j| j > i && community_of[j] == c)
                        .count()
                })
                .sum();
            let possible = size * (size - 1) / 2;
            let density = internal as f64 / possible as f64;
            if density >= self.config.sparse_density_threshold {
                continue;
            }

            let names: Vec<&str> = nodes
                .iter()
                .take(MAX_SUGGESTED_LABELS)
                .map(|&i| label(i))
                .collect();
            sparse_areas.push(SparseArea {
                community_id: c,
                nodes: nodes.iter().map(|&i| adjacency.id(i).to_string()).collect(),
                density,
                suggestion: format!(
                    "Community {} has {} concepts but only {} of {} possible links (density {:.2}). \
                     Look for missing relations between: {}",
                    c,
                    size,
                    internal,
                    possible,
                    density,
                    names.join(", ")
                ),
            });
        }

        // Cross-community link counts, keyed by (smaller id, larger id)
        let mut cross: HashMap<(usize, usize), usize> = HashMap::new();
        for i in 0..adjacency.len() {
            for &j in adjacency.neighbors(i).keys() {
                let (a, b) = (community_of[i], community_of[j]);
                if j > i && a != b {
                    *cross.entry((a.min(b), a.max(b))).or_default() += 1;
                }
            }
        }

        // Bridge opportunities
        let mut bridge_opportunities = Vec::new();
        let ids: Vec<usize> = members.keys().copied().collect();
        for (pos, &a) in ids.iter().enumerate() {
            for &b in &ids[pos + 1..] {
                let (size_a, size_b) = (members[&a].len(), members[&b].len());
                if size_a < 2 || size_b < 2 {
                    continue;
                }
                let cross_edges = cross.get(&(a, b)).copied().unwrap_or(0);
                let max_possible = size_a * size_b;
                if cross_edges as f64 >= self.config.bridge_ratio_threshold * max_possible as f64
                {
                    continue;
                }

                let candidates_a = top_by_degree(adjacency, &members[&a]);
                let candidates_b = top_by_degree(adjacency, &members[&b]);
                let suggestion = format!(
                    "Communities {} and {} share {} of {} possible links. \
                     Consider relating {} with {}",
                    a,
                    b,
                    cross_edges,
                    max_possible,
                    candidates_a.iter().map(|&i| label(i)).collect::<Vec<_>>().join(" / "),
                    candidates_b.iter().map(|&i| label(i)).collect::<Vec<_>>().join(" / ")
                );
                bridge_opportunities.push(BridgeOpportunity {
                    community_a: a,
                    community_b: b,
                    cross_edges,
                    max_possible,
                    candidates_a: candidates_a
                        .iter()
                        .map(|&i| adjacency.id(i).to_string())
                        .collect(),
                    candidates_b: candidates_b
                        .iter()
                        .map(|&i| adjacency.id(i).to_string())
                        .collect(),
                    suggestion,
                });
            }
        }

        tracing::info!(
            "Graph {}: {} sparse areas, {} bridge opportunities, {} isolated nodes",
            self.graph.id,
            sparse_areas.len(),
            bridge_opportunities.len(),
            isolated_nodes.len()
        );

        let result = Arc::new(GapAnalysis {
            sparse_areas,
            bridge_opportunities,
            isolated_nodes,
        });
        self.cache
            .set_with_ttl(key, CachedValue::Gaps(result.clone()), COMMUNITY_TTL);
        result
    }
}

/// Highest-degree members, ties broken by graph order.
fn top_by_degree(adjacency: &Adjacency, nodes: &[usize]) -> Vec<usize> {
    let mut ranked = nodes.to_vec();
    ranked.sort_by_key(|&i| (std::cmp::Reverse(adjacency.degree_without_self(i)), i));
    ranked.truncate(BRIDGE_CANDIDATES);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{chain, graph_from_edges, star, test_cache, two_cliques, two_triangles};

    fn detector(graph: Graph) -> CommunityDetector {
        let scope = graph.id.clone();
        CommunityDetector::new(
            Arc::new(graph),
            test_cache(),
            scope,
            AnalyticsConfig::default(),
        )
    }

    #[test]
    fn test_two_triangles_form_two_communities() {
        let result = detector(two_triangles()).detect_communities();

        assert_eq!(result.community_count(), 2);
        assert_eq!(result.communities["a"], result.communities["b"]);
        assert_eq!(result.communities["a"], result.communities["c"]);
        assert_eq!(result.communities["x"], result.communities["z"]);
        assert_ne!(result.communities["a"], result.communities["x"]);
        assert!((result.modularity - 0.5).abs() < 1e-9, "got {}", result.modularity);
    }

    #[test]
    fn test_community_ids_are_dense() {
        let result = detector(two_cliques()).detect_communities();
        let ids: Vec<usize> = result.community_nodes.keys().copied().collect();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(result.community_nodes[&0], vec!["a0", "a1", "a2", "a3"]);
        assert_eq!(result.community_nodes[&1], vec!["b0", "b1", "b2", "b3"]);
        // m = 13: 2 * (12/26 - (13/26)^2)
        let expected = 2.0 * (12.0 / 26.0 - 0.25);
        assert!((result.modularity - expected).abs() < 1e-9);
    }

    #[test]
    fn test_connected_chain_collapses_to_one_community() {
        let result = detector(chain(5)).detect_communities();
        assert_eq!(result.community_count(), 1);
        assert_eq!(result.modularity, 0.0);
    }

    #[test]
    fn test_edgeless_graph_keeps_singletons() {
        let graph = graph_from_edges("g", false, &["a", "b", "c"], &[]);
        let result = detector(graph).detect_communities();
        assert_eq!(result.community_count(), 3);
        assert_eq!(result.modularity, 0.0);
        assert_eq!(result.communities["c"], 2);
    }

    #[test]
    fn test_empty_graph() {
        let d = detector(Graph::new("empty", false));
        let result = d.detect_communities();
        assert!(result.communities.is_empty());
        assert_eq!(result.modularity, 0.0);

        let gaps = d.detect_gaps();
        assert!(gaps.sparse_areas.is_empty());
        assert!(gaps.bridge_opportunities.is_empty());
        assert!(gaps.isolated_nodes.is_empty());
    }

    #[test]
    fn test_direction_is_ignored() {
        let mut graph = two_triangles();
        graph.directed = true;
        let result = detector(graph).detect_communities();
        assert_eq!(result.community_count(), 2);
    }

    #[test]
    fn test_single_pass_limit() {
        let config = AnalyticsConfig {
            community_max_passes: 0,
            ..AnalyticsConfig::default()
        };
        let d = CommunityDetector::new(Arc::new(two_triangles()), test_cache(), "t", config);
        assert_eq!(d.detect_communities().community_count(), 6, "no pass, no moves");
    }

    #[test]
    fn test_bridge_between_cliques() {
        let gaps = detector(two_cliques()).detect_gaps();

        assert!(gaps.sparse_areas.is_empty(), "cliques are dense");
        assert!(gaps.isolated_nodes.is_empty());
        assert_eq!(gaps.bridge_opportunities.len(), 1);

        let bridge = &gaps.bridge_opportunities[0];
        assert_eq!((bridge.community_a, bridge.community_b), (0, 1));
        assert_eq!(bridge.cross_edges, 1);
        assert_eq!(bridge.max_possible, 16);
        assert_eq!(bridge.candidates_a, vec!["a0", "a1"]);
        assert_eq!(bridge.candidates_b, vec!["b0", "b1"]);
        assert!(bridge.suggestion.contains("A0 / A1"));
    }

    #[test]
    fn test_disconnected_triangles_are_bridge_candidates() {
        let gaps = detector(two_triangles()).detect_gaps();
        assert_eq!(gaps.bridge_opportunities.len(), 1);
        assert_eq!(gaps.bridge_opportunities[0].cross_edges, 0);
    }

    #[test]
    fn test_sparse_star_and_isolated_leaves() {
        // 7 nodes, 6 links out of 21 possible
        let gaps = detector(star(6)).detect_gaps();

        assert_eq!(gaps.sparse_areas.len(), 1);
        let area = &gaps.sparse_areas[0];
        assert_eq!(area.nodes.len(), 7);
        assert!((area.density - 6.0 / 21.0).abs() < 1e-9);
        assert!(area.suggestion.contains("HUB, L0, L1, L2, L3"));
        assert!(!area.suggestion.contains("L4"), "at most 5 labels");

        assert_eq!(gaps.isolated_nodes.len(), 6);
        assert!(!gaps.isolated_nodes.contains(&"hub".to_string()));
    }

    #[test]
    fn test_dense_star_is_not_sparse() {
        // 5 nodes, 4 of 10 possible links: density 0.4
        let gaps = detector(star(4)).detect_gaps();
        assert!(gaps.sparse_areas.is_empty());
    }

    #[test]
    fn test_singleton_communities_are_not_bridged() {
        let graph = graph_from_edges("g", false, &["a", "b", "c"], &[("a", "b", 1.0)]);
        let gaps = detector(graph).detect_gaps();
        assert!(gaps.bridge_opportunities.is_empty());
        assert_eq!(gaps.isolated_nodes, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_results_are_cached() {
        let cache = test_cache();
        let d = CommunityDetector::new(
            Arc::new(two_triangles()),
            cache.clone(),
            "t",
            AnalyticsConfig::default(),
        );
        let gaps = d.detect_gaps();
        assert!(cache.has(&CacheKey::new("t", Operation::Communities)));
        assert!(cache.has(&CacheKey::new("t", Operation::Gaps)));
        assert!(Arc::ptr_eq(&gaps, &d.detect_gaps()));
    }
}
