//! Tree-traversal retrieval: beam search from the highest populated level
//! down to the leaves. Only nodes at the current level are scored; the beam
//! descends into the union of the survivors' children. The final output is
//! always a leaf set.

use async_trait::async_trait;

use trellis_core::errors::TrellisResult;
use trellis_core::models::{rank_hits, QueryContext, RetrievalHit, StrategySource};
use trellis_core::traits::IRetriever;

use super::cosine;

pub struct TreeTraversalRetriever {
    beam: usize,
}

impl TreeTraversalRetriever {
    pub fn new(beam: usize) -> Self {
        Self { beam: beam.max(1) }
    }

    /// Score the given candidate ids at one level, best first.
    fn score_level(&self, ctx: &QueryContext, candidate_ids: &[String]) -> Vec<RetrievalHit> {
        let mut scored: Vec<RetrievalHit> = candidate_ids
            .iter()
            .filter_map(|id| {
                let fragment = ctx.index.get(id)?;
                let embedding = fragment.embedding.as_ref()?;
                Some(RetrievalHit {
                    fragment_id: fragment.id.clone(),
                    text: fragment.text.clone(),
                    score: cosine(&ctx.query_embedding, embedding),
                    source: StrategySource::TreeTraversal,
                    level: fragment.level,
                    metadata: fragment.metadata.clone(),
                    context: None,
                    expanded_from: None,
                })
            })
            .collect();
        rank_hits(&mut scored);
        scored
    }
}

#[async_trait]
impl IRetriever for TreeTraversalRetriever {
    async fn retrieve(
        &self,
        ctx: &QueryContext,
        top_k: usize,
    ) -> TrellisResult<Vec<RetrievalHit>> {
        let mut level = ctx.index.highest_level();
        let mut candidates: Vec<String> = ctx.index.level_ids(level).to_vec();

        // Narrow level by level until the candidates are leaves.
        while level > 0 {
            let mut scored = self.score_level(ctx, &candidates);
            scored.truncate(self.beam);

            let mut next: Vec<String> = Vec::new();
            for hit in &scored {
                if let Some(fragment) = ctx.index.get(&hit.fragment_id) {
                    for child in &fragment.children_ids {
                        if !next.contains(child) {
                            next.push(child.clone());
                        }
                    }
                }
            }

            if next.is_empty() {
                // Malformed level (no children survived) — fall back to the
                // leaf set rather than returning summary nodes.
                next = ctx.index.level_ids(0).to_vec();
                level = 0;
            } else {
                level -= 1;
            }
            candidates = next;
        }

        let mut hits = self.score_level(ctx, &candidates);
        hits.retain(|h| h.level == 0);
        hits.truncate(top_k);
        Ok(hits)
    }

    fn source(&self) -> StrategySource {
        StrategySource::TreeTraversal
    }
}
