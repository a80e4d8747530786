//! Cluster engine: dimensionality reduction + soft clustering with automatic
//! cluster-count selection.
//!
//! Used only by the tree builder. The reduction is lossy and exists purely to
//! find cluster structure — stored embeddings keep their full dimension. Any
//! numerical failure here is recoverable: the builder treats it the same as a
//! layer too small to cluster.

mod gmm;
mod model_selection;
mod reduce;

pub use gmm::{Gmm, GmmFit};
pub use model_selection::select_components;
pub use reduce::reduce;

use ndarray::Array2;
use tracing::debug;

use trellis_core::config::TreeConfig;
use trellis_core::constants::MAX_CLUSTER_SWEEP;

/// Fallback seed when the config does not pin one. Builds are reproducible
/// either way; the config seed exists to get a *different* reproducible run.
const DEFAULT_BUILD_SEED: u64 = 42;

/// Outcome of one layer's clustering pass.
#[derive(Debug, Clone)]
pub enum ClusterAttempt {
    /// Per-cluster member indices into the input slice. Soft assignment: an
    /// index may appear in more than one cluster.
    Assigned(Vec<Vec<usize>>),
    /// The layer cannot be clustered (degenerate input or too few samples
    /// for the reduction subspace). Normal termination, not an error.
    Skipped(&'static str),
}

/// Reduction + GMM + BIC, wired together for the tree builder.
pub struct ClusterEngine {
    seed: u64,
    reduce_dim: usize,
    soft_threshold: f64,
    min_cluster_size: usize,
}

impl ClusterEngine {
    pub fn from_config(config: &TreeConfig) -> Self {
        Self {
            seed: config.seed.unwrap_or(DEFAULT_BUILD_SEED),
            reduce_dim: config.reduce_dim,
            soft_threshold: config.soft_threshold,
            min_cluster_size: config.min_cluster_size,
        }
    }

    /// Cluster one layer of embeddings.
    ///
    /// The sweep upper bound keeps average cluster size at or above
    /// `min_cluster_size`, which also stops BIC from chasing the degenerate
    /// one-point-per-component fit on small layers.
    pub fn assign(&self, embeddings: &[Vec<f32>]) -> ClusterAttempt {
        let n = embeddings.len();
        let dim = embeddings.first().map(Vec::len).unwrap_or(0);

        let reduced = match reduce(embeddings, self.reduce_dim, self.seed) {
            Ok(r) => r,
            Err(reason) => return ClusterAttempt::Skipped(reason),
        };

        let max_k = (n / self.min_cluster_size.max(1))
            .min(MAX_CLUSTER_SWEEP)
            .max(1);

        let fit = match select_components(&reduced, max_k, self.seed) {
            Some(fit) => fit,
            None => return ClusterAttempt::Skipped("model selection produced no usable fit"),
        };

        debug!(
            nodes = n,
            dim,
            reduced_dim = reduced.ncols(),
            components = fit.n_components,
            "layer clustered"
        );

        ClusterAttempt::Assigned(soft_members(
            &fit.responsibilities,
            self.soft_threshold,
        ))
    }
}

/// Turn a responsibility matrix into per-cluster member lists.
///
/// Every node joins its argmax cluster; it additionally joins any other
/// cluster whose responsibility reaches the soft threshold, so a node
/// spanning two topics contributes to both summaries. Empty clusters are
/// dropped.
fn soft_members(responsibilities: &Array2<f64>, soft_threshold: f64) -> Vec<Vec<usize>> {
    let (n, k) = responsibilities.dim();
    let mut clusters: Vec<Vec<usize>> = vec![Vec::new(); k];

    for i in 0..n {
        let row = responsibilities.row(i);
        let primary = row
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(c, _)| c)
            .unwrap_or(0);
        clusters[primary].push(i);

        for (c, &resp) in row.iter().enumerate() {
            if c != primary && resp >= soft_threshold {
                clusters[c].push(i);
            }
        }
    }

    clusters.retain(|members| !members.is_empty());
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn soft_members_assigns_argmax() {
        let resp = array![[0.9, 0.1], [0.2, 0.8]];
        let clusters = soft_members(&resp, 0.5);
        assert_eq!(clusters, vec![vec![0], vec![1]]);
    }

    #[test]
    fn soft_members_duplicates_above_threshold() {
        // Node 0 is split 0.55/0.45 — with a 0.4 threshold it joins both.
        let resp = array![[0.55, 0.45], [0.1, 0.9]];
        let clusters = soft_members(&resp, 0.4);
        assert_eq!(clusters[0], vec![0]);
        assert_eq!(clusters[1], vec![0, 1]);
    }

    #[test]
    fn soft_members_drops_empty_clusters() {
        let resp = array![[0.9, 0.1], [0.8, 0.2]];
        let clusters = soft_members(&resp, 0.5);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0], vec![0, 1]);
    }

    #[test]
    fn two_obvious_groups_cluster_apart() {
        let mut embeddings = Vec::new();
        for i in 0..6 {
            embeddings.push(vec![0.0 + 0.01 * i as f32, 0.0, 1.0, 0.0]);
        }
        for i in 0..6 {
            embeddings.push(vec![50.0 + 0.01 * i as f32, 50.0, 0.0, 1.0]);
        }

        let config = TreeConfig {
            min_cluster_size: 3,
            seed: Some(7),
            ..Default::default()
        };
        let engine = ClusterEngine::from_config(&config);
        match engine.assign(&embeddings) {
            ClusterAttempt::Assigned(clusters) => {
                assert_eq!(clusters.len(), 2);
                let mut sizes: Vec<usize> = clusters.iter().map(Vec::len).collect();
                sizes.sort_unstable();
                assert_eq!(sizes, vec![6, 6]);
            }
            ClusterAttempt::Skipped(reason) => panic!("expected clusters, skipped: {reason}"),
        }
    }

    #[test]
    fn too_few_samples_skip_the_layer() {
        let embeddings = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.5, 0.5]];
        let config = TreeConfig {
            min_cluster_size: 1,
            ..Default::default()
        };
        let engine = ClusterEngine::from_config(&config);
        // 3 samples cannot support a 2-component subspace (n - 2 < 2).
        assert!(matches!(
            engine.assign(&embeddings),
            ClusterAttempt::Skipped(_)
        ));
    }
}
