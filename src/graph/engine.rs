//! Analytics engine: owns the shared cache and orchestrates the analyzers.
//!
//! The engine hands out one [`GraphSession`] per graph id. A session bundles one
//! analyzer per component, all scoped to the graph id and sharing the engine's
//! cache, so repeated calls on the same snapshot are served from the cache.
//!
//! Snapshots are immutable: when a graph changes, pass the new snapshot (the
//! engine notices the pointer change and invalidates) or call
//! [`AnalyticsEngine::invalidate`] explicitly.

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;

use super::centrality::{merge_pagerank, CentralityCalculator};
use super::community::CommunityDetector;
use super::models::{Graph, GraphAnalytics, SharedCache};
use super::paths::PathFinder;
use super::statistics::StatisticsAnalyzer;
use super::validation::GraphValidator;
use crate::cache::{KeyPattern, ResultCache};
use crate::error::AnalyticsResult;
use crate::Config;

// ============================================================================
// Session
// ============================================================================

/// Every analyzer for one graph snapshot, scoped to the graph id.
pub struct GraphSession {
    graph: Arc<Graph>,
    pub paths: PathFinder,
    pub centrality: CentralityCalculator,
    pub communities: CommunityDetector,
    pub statistics: StatisticsAnalyzer,
    pub validator: GraphValidator,
}

impl GraphSession {
    pub fn new(graph: Arc<Graph>, cache: SharedCache, config: &Config) -> Self {
        let scope = graph.id.clone();
        let analytics = &config.analytics;
        Self {
            paths: PathFinder::new(graph.clone(), cache.clone(), scope.as_str(), analytics.clone()),
            centrality: CentralityCalculator::new(
                graph.clone(),
                cache.clone(),
                scope.as_str(),
                analytics.clone(),
            ),
            communities: CommunityDetector::new(
                graph.clone(),
                cache.clone(),
                scope.as_str(),
                analytics.clone(),
            ),
            statistics: StatisticsAnalyzer::new(
                graph.clone(),
                cache.clone(),
                scope.as_str(),
                analytics.clone(),
            ),
            validator: GraphValidator::new(graph.clone(), cache, scope),
            graph,
        }
    }

    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Process-wide entry point: shared cache plus memoized sessions.
pub struct AnalyticsEngine {
    cache: SharedCache,
    config: Config,
    sessions: DashMap<String, Arc<GraphSession>>,
}

impl AnalyticsEngine {
    /// Create the engine and its cache. Inside a tokio runtime this also starts
    /// the cache's background sweep.
    pub fn new(config: Config) -> Self {
        let cache = ResultCache::new(config.cache.clone());
        Self {
            cache,
            config,
            sessions: DashMap::new(),
        }
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Session for a graph snapshot, created on first use.
    ///
    /// A different snapshot under an already known id replaces the old session
    /// and drops every cached result of that id.
    pub fn session(&self, graph: Arc<Graph>) -> Arc<GraphSession> {
        let existing = self.sessions.get(&graph.id).map(|s| s.value().clone());
        if let Some(session) = existing {
            if Arc::ptr_eq(session.graph(), &graph) {
                return session;
            }
            tracing::debug!("Graph {} snapshot changed, invalidating", graph.id);
            self.invalidate(&graph.id);
        }

        let session = Arc::new(GraphSession::new(
            graph.clone(),
            self.cache.clone(),
            &self.config,
        ));
        self.sessions.insert(graph.id.clone(), session.clone());
        session
    }

    /// Run every analyzer over a graph and collect the results.
    ///
    /// Fails only when the graph is above the all-pairs node limit.
    pub fn analyze(&self, graph: Arc<Graph>) -> AnalyticsResult<GraphAnalytics> {
        let start = Instant::now();
        let session = self.session(graph);

        let validation = session.validator.validate();
        let statistics = session.statistics.calculate_statistics()?;
        let connectivity = session.statistics.check_connectivity();

        let mut centrality = session.centrality.calculate_centrality()?.as_ref().clone();
        let ranks = session.centrality.calculate_pagerank_default();
        merge_pagerank(&mut centrality, &ranks);

        let communities = session.communities.detect_communities();
        let gaps = session.communities.detect_gaps();

        let computation_ms = start.elapsed().as_millis() as u64;
        let graph_id = session.graph().id.clone();
        tracing::info!(
            "Analyzed graph {}: {} nodes, {} edges, {} communities, {} validation issues in {}ms",
            graph_id,
            statistics.total_nodes,
            statistics.total_edges,
            communities.community_count(),
            validation.issues.len(),
            computation_ms
        );

        Ok(GraphAnalytics {
            graph_id,
            statistics: statistics.as_ref().clone(),
            connectivity,
            centrality,
            communities: communities.as_ref().clone(),
            gaps: gaps.as_ref().clone(),
            validation: validation.as_ref().clone(),
            computed_at: Utc::now(),
            computation_ms,
        })
    }

    /// Forget a graph: drop its session and every cached result under its id.
    /// Returns the number of cache entries removed.
    pub fn invalidate(&self, graph_id: &str) -> usize {
        self.sessions.remove(graph_id);
        let removed = self.cache.clear_pattern(&KeyPattern::scope(graph_id));
        tracing::debug!("Invalidated graph {}: {} cache entries", graph_id, removed);
        removed
    }

    /// Drop all sessions and destroy the cache (stops the sweep). Idempotent.
    pub fn shutdown(&self) {
        self.sessions.clear();
        self.cache.destroy();
        tracing::info!("Analytics engine shut down");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheConfig, CacheKey, Operation};
    use crate::test_helpers::{chain, two_cliques};
    use std::time::Duration;

    fn test_engine() -> AnalyticsEngine {
        AnalyticsEngine::new(Config {
            cache: CacheConfig {
                sweep_interval: Duration::ZERO,
                ..CacheConfig::default()
            },
            ..Config::default()
        })
    }

    #[test]
    fn test_session_is_memoized_per_snapshot() {
        let engine = test_engine();
        let graph = Arc::new(chain(3));

        let first = engine.session(graph.clone());
        let second = engine.session(graph);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_new_snapshot_invalidates_old_results() {
        let engine = test_engine();
        let session = engine.session(Arc::new(chain(3)));
        assert!(session.paths.find_shortest_path("n0", "n2").is_some());
        assert_eq!(engine.cache().len(), 1);

        // Same id, different content: n3 now exists
        let replaced = engine.session(Arc::new(chain(4)));
        assert!(!Arc::ptr_eq(&session, &replaced));
        assert!(engine.cache().is_empty(), "old results are dropped");
        assert!(replaced.paths.find_shortest_path("n0", "n3").is_some());
    }

    #[test]
    fn test_analyze_collects_everything() {
        let engine = test_engine();
        let analytics = engine.analyze(Arc::new(two_cliques())).unwrap();

        assert_eq!(analytics.graph_id, "cliques");
        assert!(analytics.validation.valid);
        assert_eq!(analytics.statistics.total_nodes, 8);
        assert_eq!(analytics.statistics.total_edges, 13);
        assert!(analytics.connectivity.connected);
        assert_eq!(analytics.communities.community_count(), 2);
        assert_eq!(analytics.gaps.bridge_opportunities.len(), 1);
        assert_eq!(analytics.centrality.len(), 8);
        assert!(
            analytics.centrality.iter().all(|c| c.pagerank > 0.0),
            "PageRank is merged into centrality"
        );

        let a0 = analytics
            .centrality
            .iter()
            .find(|c| c.node_id == "a0")
            .unwrap();
        let a1 = analytics
            .centrality
            .iter()
            .find(|c| c.node_id == "a1")
            .unwrap();
        assert!(a0.betweenness > a1.betweenness, "bridge endpoint carries cross paths");
    }

    #[test]
    fn test_analyze_twice_hits_cache() {
        let engine = test_engine();
        let graph = Arc::new(chain(4));
        engine.analyze(graph.clone()).unwrap();
        let hits_before = engine.cache().stats().hits;

        engine.analyze(graph).unwrap();
        assert!(engine.cache().stats().hits > hits_before);
    }

    #[test]
    fn test_invalidate_clears_only_that_graph() {
        let engine = test_engine();
        let mut other = chain(3);
        other.id = "other".to_string();

        engine.analyze(Arc::new(chain(3))).unwrap();
        engine.analyze(Arc::new(other)).unwrap();

        let removed = engine.invalidate("chain");
        assert!(removed > 0);
        assert!(!engine
            .cache()
            .has(&CacheKey::new("chain", Operation::Centrality)));
        assert!(engine
            .cache()
            .has(&CacheKey::new("other", Operation::Centrality)));
    }

    #[test]
    fn test_analyze_propagates_size_limit() {
        let mut config = Config::default();
        config.cache.sweep_interval = Duration::ZERO;
        config.analytics.max_all_pairs_nodes = 2;
        let engine = AnalyticsEngine::new(config);

        assert!(engine.analyze(Arc::new(chain(3))).is_err());
    }

    #[test]
    fn test_shutdown_destroys_cache() {
        let engine = test_engine();
        engine.analyze(Arc::new(chain(3))).unwrap();
        engine.shutdown();
        assert!(engine.cache().is_destroyed());
        assert!(engine.cache().is_empty());
        engine.shutdown();
    }
}
