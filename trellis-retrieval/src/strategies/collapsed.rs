//! Tree-collapsed retrieval: every fragment at every level forms one flat
//! candidate pool ranked by similarity to the query embedding. Summary hits
//! are expanded back to their descendant leaves, which inherit the summary's
//! score and record where they came from.

use async_trait::async_trait;

use trellis_core::errors::TrellisResult;
use trellis_core::models::{rank_hits, QueryContext, RetrievalHit, StrategySource};
use trellis_core::traits::IRetriever;

use super::cosine;

pub struct TreeCollapsedRetriever {
    expand: bool,
}

impl TreeCollapsedRetriever {
    /// `expand = false` returns summary hits as-is instead of replacing
    /// them with their leaves.
    pub fn new(expand: bool) -> Self {
        Self { expand }
    }
}

#[async_trait]
impl IRetriever for TreeCollapsedRetriever {
    async fn retrieve(
        &self,
        ctx: &QueryContext,
        top_k: usize,
    ) -> TrellisResult<Vec<RetrievalHit>> {
        // Score the whole arena — leaves and summaries alike.
        let mut pool: Vec<RetrievalHit> = ctx
            .index
            .iter()
            .filter_map(|fragment| {
                let embedding = fragment.embedding.as_ref()?;
                Some(RetrievalHit {
                    fragment_id: fragment.id.clone(),
                    text: fragment.text.clone(),
                    score: cosine(&ctx.query_embedding, embedding),
                    source: StrategySource::TreeCollapsed,
                    level: fragment.level,
                    metadata: fragment.metadata.clone(),
                    context: None,
                    expanded_from: None,
                })
            })
            .collect();

        rank_hits(&mut pool);
        pool.truncate(top_k);

        if !self.expand {
            return Ok(pool);
        }

        // Replace summary hits with their descendant leaves. A leaf reached
        // both directly and through a summary keeps its best-scoring entry.
        let mut expanded: Vec<RetrievalHit> = Vec::with_capacity(pool.len());
        for hit in pool {
            if hit.level == 0 {
                push_best(&mut expanded, hit);
                continue;
            }

            let summary_id = hit.fragment_id.clone();
            let summary_text = hit.text.clone();
            for leaf in ctx.index.descendant_leaves(&summary_id) {
                push_best(
                    &mut expanded,
                    RetrievalHit {
                        fragment_id: leaf.id.clone(),
                        text: leaf.text.clone(),
                        score: hit.score,
                        source: StrategySource::TreeCollapsed,
                        level: 0,
                        metadata: leaf.metadata.clone(),
                        context: Some(summary_text.clone()),
                        expanded_from: Some(summary_id.clone()),
                    },
                );
            }
        }

        rank_hits(&mut expanded);
        expanded.truncate(top_k);
        Ok(expanded)
    }

    fn source(&self) -> StrategySource {
        StrategySource::TreeCollapsed
    }
}

/// Keep at most one hit per fragment, preferring the higher score; on equal
/// scores prefer the direct (non-expanded) hit.
fn push_best(hits: &mut Vec<RetrievalHit>, candidate: RetrievalHit) {
    if let Some(existing) = hits
        .iter_mut()
        .find(|h| h.fragment_id == candidate.fragment_id)
    {
        let better = candidate.score > existing.score
            || (candidate.score == existing.score
                && existing.expanded_from.is_some()
                && candidate.expanded_from.is_none());
        if better {
            *existing = candidate;
        }
    } else {
        hits.push(candidate);
    }
}
