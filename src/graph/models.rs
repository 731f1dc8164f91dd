//! Graph analytics data models.
//!
//! ## Input types (boundary contract)
//! - [`Graph`] / [`Node`] / [`Edge`]: the snapshot handed in by the caller
//! - [`NodeProperties`] / [`EdgeProperties`]: typed well-known fields plus an overflow map
//!
//! ## Output types (analytics)
//! - [`PathResult`]: a shortest path
//! - [`CentralityResult`]: per-node centrality scores
//! - [`CommunityResult`] / [`GapAnalysis`]: communities and knowledge gaps
//! - [`ConnectivityResult`] / [`GraphStatistics`]: global structure
//! - [`ValidationReport`]: structural integrity findings
//! - [`GraphAnalytics`]: aggregated result of a full engine run
//!
//! ## Caching & configuration
//! - [`CachedValue`] / [`SharedCache`]: what analyzers store in the shared cache
//! - [`AnalyticsConfig`]: tuning parameters for the algorithms

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::cache::ResultCache;

// ============================================================================
// Input types: Graph snapshot
// ============================================================================

/// Well-known node attributes. Anything else lands in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A concept or entity extracted from the literature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier within the graph
    pub id: String,
    /// Display string
    pub label: String,
    /// Free-form category tag (e.g. "gene", "method", "disease")
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default)]
    pub properties: NodeProperties,
}

impl Node {
    pub fn new(id: impl Into<String>, label: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            node_type: node_type.into(),
            properties: NodeProperties::default(),
        }
    }

    /// Node weight, 1.0 when absent.
    pub fn weight(&self) -> f64 {
        self.properties.weight.unwrap_or(1.0)
    }
}

/// Well-known edge attributes. Anything else lands in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Supporting passages or citations
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A relation between two concepts. Always stored source → target; undirected
/// semantics are applied when the adjacency is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub properties: EdgeProperties,
}

impl Edge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            properties: EdgeProperties::default(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.properties.weight = Some(weight);
        self
    }

    /// Edge weight, 1.0 when absent.
    pub fn weight(&self) -> f64 {
        self.properties.weight.unwrap_or(1.0)
    }
}

/// Immutable graph snapshot owned by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub id: String,
    #[serde(default)]
    pub directed: bool,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new(id: impl Into<String>, directed: bool) -> Self {
        Self {
            id: id.into(),
            directed,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// First node with the given id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Node id → label lookup (first occurrence wins).
    pub fn labels(&self) -> HashMap<&str, &str> {
        let mut labels = HashMap::with_capacity(self.nodes.len());
        for node in &self.nodes {
            labels.entry(node.id.as_str()).or_insert(node.label.as_str());
        }
        labels
    }
}

// ============================================================================
// Output types: Paths & centrality
// ============================================================================

/// A shortest path between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathResult {
    /// Node ids from start to end, both included
    pub path: Vec<String>,
    /// Sum of edge weights along the path
    pub total_weight: f64,
    /// Number of hops (`path.len() - 1`)
    pub length: usize,
}

/// Shortest paths indexed by `[from][to]`. Unreachable pairs are absent.
pub type AllShortestPaths = HashMap<String, HashMap<String, PathResult>>;

/// Centrality scores of a single node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentralityResult {
    pub node_id: String,
    pub label: String,
    /// Neighbor-set size in the adjacency (out-neighbors for directed graphs)
    pub degree: usize,
    /// Share of all-pairs shortest paths passing through the node (0.0–1.0)
    pub betweenness: f64,
    /// (n - 1) / sum of distances to reachable nodes
    pub closeness: f64,
    /// `degree / average degree`, a linear stand-in for eigenvector centrality
    pub eigenvector: f64,
    /// 0.0 until merged from PageRank
    pub pagerank: f64,
}

// ============================================================================
// Output types: Communities & gaps
// ============================================================================

/// Community assignment produced by the greedy detector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunityResult {
    /// Node id → dense community id (0..k)
    pub communities: HashMap<String, usize>,
    pub modularity: f64,
    /// Community id → member node ids in graph order
    pub community_nodes: BTreeMap<usize, Vec<String>>,
}

impl CommunityResult {
    pub fn community_count(&self) -> usize {
        self.community_nodes.len()
    }
}

/// A community whose members are poorly connected to each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseArea {
    pub community_id: usize,
    pub nodes: Vec<String>,
    /// internal edges / possible pairs
    pub density: f64,
    pub suggestion: String,
}

/// Two communities with few links between them, with candidate endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeOpportunity {
    pub community_a: usize,
    pub community_b: usize,
    pub cross_edges: usize,
    /// size(a) * size(b)
    pub max_possible: usize,
    /// Highest-degree members of `community_a` (at most 2)
    pub candidates_a: Vec<String>,
    /// Highest-degree members of `community_b` (at most 2)
    pub candidates_b: Vec<String>,
    pub suggestion: String,
}

/// Where knowledge looks missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GapAnalysis {
    pub sparse_areas: Vec<SparseArea>,
    pub bridge_opportunities: Vec<BridgeOpportunity>,
    /// Nodes with at most one neighbor
    pub isolated_nodes: Vec<String>,
}

// ============================================================================
// Output types: Statistics
// ============================================================================

/// Connected components, ignoring edge direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityResult {
    pub connected: bool,
    pub components: usize,
    pub largest_component: usize,
}

/// Global graph statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub density: f64,
    pub average_degree: f64,
    /// Longest shortest path in hops; 0 unless the graph is connected
    pub diameter: usize,
    /// Mean shortest path in hops; 0 unless the graph is connected
    pub average_path_length: f64,
    /// Global clustering: closed neighbor pairs / possible neighbor pairs
    pub clustering_coefficient: f64,
}

// ============================================================================
// Output types: Validation
// ============================================================================

/// A single structural problem found by the validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    MissingSource {
        edge_id: String,
        source: String,
    },
    MissingTarget {
        edge_id: String,
        target: String,
    },
    SelfLoop {
        edge_id: String,
        node_id: String,
    },
    DuplicateEdge {
        edge_id: String,
        first_edge_id: String,
        source: String,
        target: String,
    },
    OrphanNode {
        node_id: String,
        label: String,
    },
    DuplicateNodeId {
        node_id: String,
    },
    InvalidWeight {
        edge_id: String,
        weight: f64,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSource { edge_id, source } => write!(
                f,
                "Edge {} references non-existent source node {}",
                edge_id, source
            ),
            Self::MissingTarget { edge_id, target } => write!(
                f,
                "Edge {} references non-existent target node {}",
                edge_id, target
            ),
            Self::SelfLoop { edge_id, node_id } => {
                write!(f, "Edge {} is a self-loop on node {}", edge_id, node_id)
            }
            Self::DuplicateEdge {
                edge_id,
                first_edge_id,
                source,
                target,
            } => write!(
                f,
                "Duplicate edge {}: {} -> {} is already defined by edge {}",
                edge_id, source, target, first_edge_id
            ),
            Self::OrphanNode { node_id, label } => {
                write!(f, "Node {} ({}) has no connections", node_id, label)
            }
            Self::DuplicateNodeId { node_id } => {
                write!(f, "Node id {} is used more than once", node_id)
            }
            Self::InvalidWeight { edge_id, weight } => write!(
                f,
                "Edge {} has invalid weight {} (expected a finite, non-negative number)",
                edge_id, weight
            ),
        }
    }
}

/// Outcome of [`GraphValidator::validate`](super::validation::GraphValidator::validate).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    /// Human-readable findings, one per issue
    pub errors: Vec<String>,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        Self {
            valid: issues.is_empty(),
            errors: issues.iter().map(ToString::to_string).collect(),
            issues,
        }
    }
}

// ============================================================================
// Aggregated analytics result
// ============================================================================

/// Complete result of [`AnalyticsEngine::analyze`](super::engine::AnalyticsEngine::analyze).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphAnalytics {
    pub graph_id: String,
    pub statistics: GraphStatistics,
    pub connectivity: ConnectivityResult,
    /// Per-node centrality with PageRank merged in, in graph order
    pub centrality: Vec<CentralityResult>,
    pub communities: CommunityResult,
    pub gaps: GapAnalysis,
    pub validation: ValidationReport,
    pub computed_at: DateTime<Utc>,
    /// Wall time of the run, cache hits included
    pub computation_ms: u64,
}

// ============================================================================
// Cached values
// ============================================================================

/// Every analyzer output, as stored in the shared cache.
#[derive(Debug, Clone, Serialize)]
pub enum CachedValue {
    Path(Option<PathResult>),
    Centrality(Arc<Vec<CentralityResult>>),
    PageRank(Arc<HashMap<String, f64>>),
    Communities(Arc<CommunityResult>),
    Gaps(Arc<GapAnalysis>),
    Connectivity(ConnectivityResult),
    Statistics(Arc<GraphStatistics>),
    Validation(Arc<ValidationReport>),
}

/// The process-wide cache shared by every analyzer.
pub type SharedCache = Arc<ResultCache<CachedValue>>;

// ============================================================================
// Configuration
// ============================================================================

/// Tuning parameters for the analytics algorithms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// PageRank damping factor (default: 0.85)
    pub pagerank_damping: f64,
    /// PageRank iteration count, no convergence check (default: 100)
    pub pagerank_iterations: usize,
    /// Maximum passes of the community detector (default: 50)
    pub community_max_passes: usize,
    /// Communities below this internal density are reported as sparse (default: 0.3)
    pub sparse_density_threshold: f64,
    /// Community pairs below this share of possible cross links are bridge candidates (default: 0.1)
    pub bridge_ratio_threshold: f64,
    /// Node ceiling for all-pairs computations (default: 2000)
    pub max_all_pairs_nodes: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            pagerank_damping: 0.85,
            pagerank_iterations: 100,
            community_max_passes: 50,
            sparse_density_threshold: 0.3,
            bridge_ratio_threshold: 0.1,
            max_all_pairs_nodes: 2000,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
