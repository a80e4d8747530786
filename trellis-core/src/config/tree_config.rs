use serde::{Deserialize, Serialize};

use crate::constants::MAX_TREE_LAYERS;
use crate::errors::IndexError;

use super::defaults;

/// Clustering backend for the tree builder. Closed set — new methods are a
/// code change, not a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClusterMethod {
    /// Diagonal-covariance Gaussian mixture with BIC model selection.
    #[default]
    Gmm,
}

/// Tree builder configuration, consumed from the per-KB settings store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// When false the collection is indexed flat (leaves only).
    pub enabled: bool,
    /// Summary layers above the leaves, 1..=5.
    pub max_layers: u8,
    pub cluster_method: ClusterMethod,
    /// A layer with fewer nodes than this cannot be summarized further.
    pub min_cluster_size: usize,
    /// Template for cluster summarization; `{chunks}` is replaced with the
    /// member texts. `None` uses the built-in prompt.
    pub summary_prompt: Option<String>,
    /// Bound on concurrent outstanding LLM summarization calls per layer.
    pub summary_concurrency: usize,
    /// Max tokens requested per cluster summary.
    pub summary_max_tokens: usize,
    /// Target dimension for the lossy clustering-only reduction.
    pub reduce_dim: usize,
    /// Posterior responsibility above which a node joins a secondary
    /// cluster. Values > 0.5 effectively disable multi-parent membership.
    pub soft_threshold: f64,
    /// Seed for reduction and GMM initialization; fixed seed → reproducible
    /// builds.
    pub seed: Option<u64>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_layers: defaults::DEFAULT_MAX_LAYERS,
            cluster_method: ClusterMethod::Gmm,
            min_cluster_size: defaults::DEFAULT_MIN_CLUSTER_SIZE,
            summary_prompt: None,
            summary_concurrency: defaults::DEFAULT_SUMMARY_CONCURRENCY,
            summary_max_tokens: defaults::DEFAULT_SUMMARY_MAX_TOKENS,
            reduce_dim: defaults::DEFAULT_REDUCE_DIM,
            soft_threshold: defaults::DEFAULT_SOFT_THRESHOLD,
            seed: None,
        }
    }
}

impl TreeConfig {
    /// Reject configurations the builder cannot honor.
    pub fn validate(&self) -> Result<(), IndexError> {
        if self.max_layers == 0 || self.max_layers > MAX_TREE_LAYERS {
            return Err(IndexError::InvalidConfig {
                name: "max_layers",
                message: format!("must be in 1..={MAX_TREE_LAYERS}, got {}", self.max_layers),
            });
        }
        if self.min_cluster_size == 0 {
            return Err(IndexError::InvalidConfig {
                name: "min_cluster_size",
                message: "must be >= 1".to_string(),
            });
        }
        if self.summary_concurrency == 0 {
            return Err(IndexError::InvalidConfig {
                name: "summary_concurrency",
                message: "must be >= 1".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.soft_threshold) {
            return Err(IndexError::InvalidConfig {
                name: "soft_threshold",
                message: format!("must be in [0, 1], got {}", self.soft_threshold),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(TreeConfig::default().validate().is_ok());
    }

    #[test]
    fn layer_bounds_are_enforced() {
        let mut config = TreeConfig::default();
        config.max_layers = 0;
        assert!(config.validate().is_err());
        config.max_layers = 6;
        assert!(config.validate().is_err());
        config.max_layers = 5;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: TreeConfig = toml::from_str("max_layers = 2\nmin_cluster_size = 4").unwrap();
        assert_eq!(config.max_layers, 2);
        assert_eq!(config.min_cluster_size, 4);
        assert!(config.enabled);
        assert_eq!(config.cluster_method, ClusterMethod::Gmm);
        assert_eq!(
            config.summary_concurrency,
            defaults::DEFAULT_SUMMARY_CONCURRENCY
        );
    }
}
