//! Graph analytics over literature-derived knowledge graphs.
//!
//! Every analyzer takes an immutable [`Graph`] snapshot, a shared result cache
//! and a cache scope (normally the graph id). Results are cached under
//! `(scope, operation)` so repeated queries on the same snapshot are free.
//!
//! ## Architecture
//!
//! ```text
//! Graph (JSON snapshot) ──► adjacency ──┬── paths ──► centrality (+ PageRank)
//!                                       │      └────► statistics
//!                                       ├── community (undirected view) ──► gaps
//!                                       └── validation
//!                                                  │
//!                                 ResultCache ◄────┘  (shared, TTL-bounded)
//!                                                  │
//!                                    AnalyticsEngine (sessions per graph id)
//! ```
//!
//! ## Modules
//!
//! - [`models`]: Input graph, result types, cached values, `AnalyticsConfig`
//! - [`adjacency`]: Weighted adjacency with a symmetrized undirected view
//! - [`paths`]: Dijkstra shortest paths, single pair and all pairs
//! - [`centrality`]: Degree, betweenness, closeness, eigenvector proxy, PageRank
//! - [`community`]: Greedy community detection, modularity, gap analysis
//! - [`statistics`]: Connectivity, density, diameter, clustering
//! - [`validation`]: Structural integrity checks
//! - [`engine`]: `AnalyticsEngine` orchestrator and per-graph sessions

pub mod adjacency;
pub mod centrality;
pub mod community;
pub mod engine;
pub mod models;
pub mod paths;
pub mod statistics;
pub mod validation;

// Re-export primary types for convenience
pub use adjacency::{build_adjacency, Adjacency};
pub use centrality::{merge_pagerank, CentralityCalculator};
pub use community::CommunityDetector;
pub use engine::{AnalyticsEngine, GraphSession};
pub use models::{
    AllShortestPaths, AnalyticsConfig, BridgeOpportunity, CachedValue, CentralityResult,
    CommunityResult, ConnectivityResult, Edge, EdgeProperties, GapAnalysis, Graph,
    GraphAnalytics, GraphStatistics, Node, NodeProperties, PathResult, SharedCache, SparseArea,
    ValidationIssue, ValidationReport,
};
pub use paths::PathFinder;
pub use statistics::StatisticsAnalyzer;
pub use validation::{validate_graph, GraphValidator};
