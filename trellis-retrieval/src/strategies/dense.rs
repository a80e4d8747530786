//! Dense retrieval: nearest-neighbor search on the vector index.

use std::sync::Arc;

use async_trait::async_trait;

use trellis_core::errors::TrellisResult;
use trellis_core::models::{rank_hits, QueryContext, RetrievalHit, StrategySource};
use trellis_core::traits::{IRetriever, IVectorIndex};

use super::hits_from_scored;

pub struct DenseRetriever {
    vector: Arc<dyn IVectorIndex>,
}

impl DenseRetriever {
    pub fn new(vector: Arc<dyn IVectorIndex>) -> Self {
        Self { vector }
    }
}

#[async_trait]
impl IRetriever for DenseRetriever {
    async fn retrieve(
        &self,
        ctx: &QueryContext,
        top_k: usize,
    ) -> TrellisResult<Vec<RetrievalHit>> {
        let scored = self
            .vector
            .search(&ctx.scope, &ctx.query_embedding, top_k, Some(&ctx.filter))
            .await?;

        let mut hits = hits_from_scored(&ctx.index, scored, StrategySource::Dense);
        rank_hits(&mut hits);
        hits.truncate(top_k);
        Ok(hits)
    }

    fn source(&self) -> StrategySource {
        StrategySource::Dense
    }
}
