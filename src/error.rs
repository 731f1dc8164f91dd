//! Error types for the analytics engine.
//!
//! Most operations never fail: "no path" is `None`, validation findings are data,
//! and empty graphs produce zeros. The only failure mode is the size ceiling on
//! all-pairs computations, which fails fast instead of blocking on huge inputs.

use thiserror::Error;

/// Errors returned by analyzer operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalyticsError {
    #[error("graph has {nodes} nodes, above the all-pairs limit of {limit}")]
    GraphTooLarge { nodes: usize, limit: usize },
}

/// Result type for analyzer operations.
pub type AnalyticsResult<T> = std::result::Result<T, AnalyticsError>;
