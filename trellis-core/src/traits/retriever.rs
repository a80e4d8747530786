use async_trait::async_trait;

use crate::errors::TrellisResult;
use crate::models::{QueryContext, RetrievalHit, StrategySource};

/// One retrieval strategy. Implementations are stateless between queries;
/// everything query-scoped arrives in the context.
#[async_trait]
pub trait IRetriever: Send + Sync {
    /// Produce up to `top_k` ranked hits for the query. Scores are
    /// strategy-local and only comparable after fusion.
    async fn retrieve(
        &self,
        ctx: &QueryContext,
        top_k: usize,
    ) -> TrellisResult<Vec<RetrievalHit>>;

    /// The source tag stamped on hits this retriever produces.
    fn source(&self) -> StrategySource;
}
