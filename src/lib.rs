//! Literature Graph Analytics
//!
//! Graph analytics for knowledge graphs extracted from research literature:
//! - Dijkstra shortest paths, single pair and all pairs
//! - Centrality (degree, betweenness, closeness, eigenvector proxy) and PageRank
//! - Greedy community detection and knowledge-gap analysis
//! - Connectivity and global statistics
//! - Structural validation
//!
//! All results go through a shared TTL cache ([`cache::ResultCache`]) with
//! capacity eviction and a background sweep on the tokio runtime.

pub mod cache;
pub mod error;
pub mod graph;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use cache::{CacheConfig, CacheKey, CacheStats, KeyPattern, Operation, ResultCache};
pub use error::{AnalyticsError, AnalyticsResult};
pub use graph::{AnalyticsConfig, AnalyticsEngine, Graph, GraphAnalytics};

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub cache: CacheYamlConfig,
    pub analytics: AnalyticsConfig,
}

/// Cache configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheYamlConfig {
    pub default_ttl_secs: u64,
    pub max_entries: usize,
    /// 0 disables the background sweep
    pub sweep_interval_secs: u64,
}

impl Default for CacheYamlConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 300,
            max_entries: 1000,
            sweep_interval_secs: 60,
        }
    }
}

// ============================================================================
// Runtime config (what the engine actually uses)
// ============================================================================

/// Engine configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub cache: CacheConfig,
    pub analytics: AnalyticsConfig,
}

impl Config {
    /// Load configuration from environment variables and `litgraph.yaml` in CWD.
    /// Equivalent to from_yaml_and_env(None).
    pub fn from_env() -> Result<Self> {
        Self::from_yaml_and_env(None)
    }

    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "litgraph.yaml" in CWD. A missing or
    /// unparsable file falls back to defaults. The result is validated.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        // 1. Load YAML config (or defaults if file not found)
        let yaml = Self::load_yaml(yaml_path);

        // 2. Build Config with env var overrides
        let mut analytics = yaml.analytics;
        analytics.max_all_pairs_nodes =
            env_or("LITGRAPH_MAX_ALL_PAIRS_NODES", analytics.max_all_pairs_nodes);

        let config = Self {
            cache: CacheConfig {
                default_ttl: Duration::from_secs(env_or(
                    "LITGRAPH_CACHE_TTL_SECS",
                    yaml.cache.default_ttl_secs,
                )),
                max_entries: env_or("LITGRAPH_CACHE_MAX_ENTRIES", yaml.cache.max_entries),
                sweep_interval: Duration::from_secs(env_or(
                    "LITGRAPH_CACHE_SWEEP_SECS",
                    yaml.cache.sweep_interval_secs,
                )),
            },
            analytics,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.cache.max_entries >= 1,
            "cache.max_entries must be at least 1"
        );
        anyhow::ensure!(
            !self.cache.default_ttl.is_zero(),
            "cache.default_ttl_secs must be positive"
        );
        let damping = self.analytics.pagerank_damping;
        anyhow::ensure!(
            damping > 0.0 && damping < 1.0,
            "analytics.pagerank_damping must be in (0, 1), got {}",
            damping
        );
        anyhow::ensure!(
            self.analytics.sparse_density_threshold >= 0.0
                && self.analytics.bridge_ratio_threshold >= 0.0,
            "analytics thresholds must be non-negative"
        );
        Ok(())
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("litgraph.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }
}

/// Parsed env var, or `fallback` when unset or unparsable.
fn env_or<T: FromStr>(var: &str, fallback: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(fallback)
}

// ============================================================================
// Tests
// ============================================================================
