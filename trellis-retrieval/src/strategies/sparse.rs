//! Sparse retrieval: keyword scoring on the sparse index.

use std::sync::Arc;

use async_trait::async_trait;

use trellis_core::errors::TrellisResult;
use trellis_core::models::{rank_hits, QueryContext, RetrievalHit, StrategySource};
use trellis_core::traits::{IRetriever, ISparseIndex};

use super::hits_from_scored;

pub struct SparseRetriever {
    sparse: Arc<dyn ISparseIndex>,
}

impl SparseRetriever {
    pub fn new(sparse: Arc<dyn ISparseIndex>) -> Self {
        Self { sparse }
    }
}

#[async_trait]
impl IRetriever for SparseRetriever {
    async fn retrieve(
        &self,
        ctx: &QueryContext,
        top_k: usize,
    ) -> TrellisResult<Vec<RetrievalHit>> {
        let scored = self
            .sparse
            .search(&ctx.scope, &ctx.query, top_k, Some(&ctx.filter))
            .await?;

        let mut hits = hits_from_scored(&ctx.index, scored, StrategySource::Sparse);
        rank_hits(&mut hits);
        hits.truncate(top_k);
        Ok(hits)
    }

    fn source(&self) -> StrategySource {
        StrategySource::Sparse
    }
}
