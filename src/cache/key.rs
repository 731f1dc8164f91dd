//! Structured cache keys and invalidation patterns.
//!
//! A key is a `(scope, operation)` pair. The scope is the cache key prefix an
//! analyzer was constructed with (normally the graph id); the operation carries
//! its own parameters, so two calls only share an entry when every parameter
//! matches.

use std::fmt;

/// An analyzer operation together with the parameters that affect its result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    ShortestPath { start: String, end: String },
    Centrality,
    /// `damping_bits` is `f64::to_bits` of the damping factor so the key stays hashable.
    PageRank { damping_bits: u64, iterations: usize },
    Communities,
    Gaps,
    Connectivity,
    Statistics,
    Validation,
}

impl Operation {
    /// Build a PageRank operation key.
    pub fn pagerank(damping: f64, iterations: usize) -> Self {
        Self::PageRank {
            damping_bits: damping.to_bits(),
            iterations,
        }
    }

    /// Build a shortest-path operation key.
    pub fn shortest_path(start: &str, end: &str) -> Self {
        Self::ShortestPath {
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    /// The parameter-free kind of this operation.
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::ShortestPath { .. } => OperationKind::ShortestPath,
            Self::Centrality => OperationKind::Centrality,
            Self::PageRank { .. } => OperationKind::PageRank,
            Self::Communities => OperationKind::Communities,
            Self::Gaps => OperationKind::Gaps,
            Self::Connectivity => OperationKind::Connectivity,
            Self::Statistics => OperationKind::Statistics,
            Self::Validation => OperationKind::Validation,
        }
    }

    fn heap_size(&self) -> usize {
        match self {
            Self::ShortestPath { start, end } => start.len() + end.len(),
            _ => 0,
        }
    }
}

/// Operation discriminant, used by [`KeyPattern::Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    ShortestPath,
    Centrality,
    PageRank,
    Communities,
    Gaps,
    Connectivity,
    Statistics,
    Validation,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShortestPath => write!(f, "shortestPath"),
            Self::Centrality => write!(f, "centrality"),
            Self::PageRank => write!(f, "pagerank"),
            Self::Communities => write!(f, "communities"),
            Self::Gaps => write!(f, "gaps"),
            Self::Connectivity => write!(f, "connectivity"),
            Self::Statistics => write!(f, "statistics"),
            Self::Validation => write!(f, "validation"),
        }
    }
}

/// Key of a cached analyzer result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub scope: String,
    pub operation: Operation,
}

impl CacheKey {
    pub fn new(scope: impl Into<String>, operation: Operation) -> Self {
        Self {
            scope: scope.into(),
            operation,
        }
    }

    /// Rough number of bytes this key occupies, heap included.
    pub(crate) fn approximate_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.scope.len() + self.operation.heap_size()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operation {
            Operation::ShortestPath { start, end } => {
                write!(f, "{}:shortestPath:{}:{}", self.scope, start, end)
            }
            Operation::PageRank {
                damping_bits,
                iterations,
            } => write!(
                f,
                "{}:pagerank:{}:{}",
                self.scope,
                f64::from_bits(*damping_bits),
                iterations
            ),
            other => write!(f, "{}:{}", self.scope, other.kind()),
        }
    }
}

/// Selects cache keys for bulk invalidation.
#[derive(Debug, Clone)]
pub enum KeyPattern {
    /// Every key of one scope (all cached results for one graph).
    Scope(String),
    /// Every key whose scope matches a shell-style glob (e.g. `project-*`).
    ScopeGlob(glob::Pattern),
    /// One operation kind within one scope.
    Operation { scope: String, kind: OperationKind },
}

impl KeyPattern {
    pub fn scope(scope: impl Into<String>) -> Self {
        Self::Scope(scope.into())
    }

    /// Compile a glob over scopes. Fails on malformed patterns such as `[`.
    pub fn glob(pattern: &str) -> Result<Self, glob::PatternError> {
        Ok(Self::ScopeGlob(glob::Pattern::new(pattern)?))
    }

    pub fn operation(scope: impl Into<String>, kind: OperationKind) -> Self {
        Self::Operation {
            scope: scope.into(),
            kind,
        }
    }

    pub fn matches(&self, key: &CacheKey) -> bool {
        match self {
            Self::Scope(scope) => key.scope == *scope,
            Self::ScopeGlob(pattern) => pattern.matches(&key.scope),
            Self::Operation { scope, kind } => {
                key.scope == *scope && key.operation.kind() == *kind
            }
        }
    }
}
