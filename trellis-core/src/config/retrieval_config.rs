use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_RRF_K;

use super::defaults;

/// Retrieval orchestrator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// RRF smoothing constant. Higher values flatten the influence of
    /// top-ranked items from any single list.
    pub rrf_k: f64,
    /// Hybrid blend weight for the dense score. Normalized against
    /// `sparse_weight` at query time so the pair always sums to 1.
    pub dense_weight: f64,
    pub sparse_weight: f64,
    /// Number of LLM query variants for the multi-query strategy.
    pub expansion_variants: usize,
    /// When false, tree-collapsed retrieval returns summary hits as-is
    /// instead of expanding them to descendant leaves.
    pub collapse_expansion: bool,
    /// Nodes kept per level during tree traversal.
    pub traversal_beam: usize,
    /// Per-retriever deadline; a retriever past it is excluded from fusion.
    pub request_timeout_ms: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            rrf_k: DEFAULT_RRF_K,
            dense_weight: defaults::DEFAULT_DENSE_WEIGHT,
            sparse_weight: defaults::DEFAULT_SPARSE_WEIGHT,
            expansion_variants: defaults::DEFAULT_EXPANSION_VARIANTS,
            collapse_expansion: true,
            traversal_beam: defaults::DEFAULT_TRAVERSAL_BEAM,
            request_timeout_ms: defaults::DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl RetrievalConfig {
    /// Hybrid weights normalized to sum to 1. Degenerate zero/negative
    /// weights fall back to the defaults.
    pub fn hybrid_weights(&self) -> (f64, f64) {
        let (d, s) = (self.dense_weight.max(0.0), self.sparse_weight.max(0.0));
        let total = d + s;
        if total <= f64::EPSILON {
            return (
                defaults::DEFAULT_DENSE_WEIGHT,
                defaults::DEFAULT_SPARSE_WEIGHT,
            );
        }
        (d / total, s / total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_normalize_to_one() {
        let config = RetrievalConfig {
            dense_weight: 2.0,
            sparse_weight: 2.0,
            ..Default::default()
        };
        let (d, s) = config.hybrid_weights();
        assert!((d - 0.5).abs() < 1e-12);
        assert!((s - 0.5).abs() < 1e-12);
    }

    #[test]
    fn zero_weights_fall_back_to_defaults() {
        let config = RetrievalConfig {
            dense_weight: 0.0,
            sparse_weight: 0.0,
            ..Default::default()
        };
        assert_eq!(
            config.hybrid_weights(),
            (
                defaults::DEFAULT_DENSE_WEIGHT,
                defaults::DEFAULT_SPARSE_WEIGHT
            )
        );
    }

    #[test]
    fn toml_round_trip_preserves_rrf_k() {
        let config = RetrievalConfig {
            rrf_k: 30.0,
            ..Default::default()
        };
        let text = toml::to_string(&config).unwrap();
        let back: RetrievalConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.rrf_k, 30.0);
    }
}
