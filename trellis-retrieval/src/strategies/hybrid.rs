//! Hybrid retrieval: dense and sparse run together, scores blended as
//! `w_d·dense + w_s·sparse` on the raw scores.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use trellis_core::errors::TrellisResult;
use trellis_core::models::{QueryContext, RetrievalHit, StrategySource};
use trellis_core::traits::{IRetriever, ISparseIndex, IVectorIndex};

use super::hits_from_scored;

pub struct HybridRetriever {
    vector: Arc<dyn IVectorIndex>,
    sparse: Arc<dyn ISparseIndex>,
    dense_weight: f64,
    sparse_weight: f64,
}

impl HybridRetriever {
    /// Weights are normalized by the config before they arrive here;
    /// `dense_weight + sparse_weight == 1`.
    pub fn new(
        vector: Arc<dyn IVectorIndex>,
        sparse: Arc<dyn ISparseIndex>,
        dense_weight: f64,
        sparse_weight: f64,
    ) -> Self {
        Self {
            vector,
            sparse,
            dense_weight,
            sparse_weight,
        }
    }
}

#[async_trait]
impl IRetriever for HybridRetriever {
    async fn retrieve(
        &self,
        ctx: &QueryContext,
        top_k: usize,
    ) -> TrellisResult<Vec<RetrievalHit>> {
        let (dense_scored, sparse_scored) = tokio::join!(
            self.vector
                .search(&ctx.scope, &ctx.query_embedding, top_k, Some(&ctx.filter)),
            self.sparse
                .search(&ctx.scope, &ctx.query, top_k, Some(&ctx.filter)),
        );

        let dense_hits = hits_from_scored(&ctx.index, dense_scored?, StrategySource::Dense);
        let sparse_hits = hits_from_scored(&ctx.index, sparse_scored?, StrategySource::Sparse);

        let mut hits = blend(
            &dense_hits,
            &sparse_hits,
            self.dense_weight,
            self.sparse_weight,
        );
        hits.truncate(top_k);
        Ok(hits)
    }

    fn source(&self) -> StrategySource {
        StrategySource::Hybrid
    }
}

/// Blend raw dense and sparse scores. A fragment missing from one side
/// contributes 0 for it. Ties on the blended score break by higher raw
/// dense score, then by the global id rule.
pub(crate) fn blend(
    dense: &[RetrievalHit],
    sparse: &[RetrievalHit],
    dense_weight: f64,
    sparse_weight: f64,
) -> Vec<RetrievalHit> {
    let mut entries: HashMap<String, (Option<f64>, Option<f64>, RetrievalHit)> = HashMap::new();

    for hit in dense {
        entries
            .entry(hit.fragment_id.clone())
            .or_insert_with(|| (None, None, hit.clone()))
            .0 = Some(hit.score);
    }
    for hit in sparse {
        entries
            .entry(hit.fragment_id.clone())
            .or_insert_with(|| (None, None, hit.clone()))
            .1 = Some(hit.score);
    }

    let mut blended: Vec<(f64, RetrievalHit)> = entries
        .into_values()
        .map(|(dense_score, sparse_score, mut hit)| {
            let raw_dense = dense_score.unwrap_or(0.0);
            hit.score = dense_weight * raw_dense + sparse_weight * sparse_score.unwrap_or(0.0);
            hit.source = StrategySource::Hybrid;
            (raw_dense, hit)
        })
        .collect();

    blended.sort_by(|(dense_a, a), (dense_b, b)| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                dense_b
                    .partial_cmp(dense_a)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.fragment_id.cmp(&b.fragment_id))
    });

    blended.into_iter().map(|(_, hit)| hit).collect()
}
