//! Query expansion strategies.
//!
//! Multi-query generates several rephrasings of the query; HyDE generates a
//! hypothetical answer and searches with its embedding instead. Either way
//! the base dense retriever runs once per variant and the per-variant
//! rankings are RRF-fused into a single strategy result before the
//! orchestrator sees it. Generation failures fall back to the plain query.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use trellis_core::errors::TrellisResult;
use trellis_core::models::{QueryContext, RetrievalHit, StrategySource};
use trellis_core::traits::{IEmbeddingProvider, ILlmProvider, IRetriever};

use crate::fusion::fuse_rrf;

use super::DenseRetriever;

const VARIANT_MAX_TOKENS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionMode {
    /// N alternative phrasings of the query.
    MultiQuery,
    /// One hypothetical answer document.
    Hyde,
}

pub struct QueryExpansionRetriever {
    mode: ExpansionMode,
    llm: Arc<dyn ILlmProvider>,
    embedder: Arc<dyn IEmbeddingProvider>,
    base: Arc<DenseRetriever>,
    variants: usize,
    rrf_k: f64,
}

impl QueryExpansionRetriever {
    pub fn new(
        mode: ExpansionMode,
        llm: Arc<dyn ILlmProvider>,
        embedder: Arc<dyn IEmbeddingProvider>,
        base: Arc<DenseRetriever>,
        variants: usize,
        rrf_k: f64,
    ) -> Self {
        Self {
            mode,
            llm,
            embedder,
            base,
            variants: variants.max(1),
            rrf_k,
        }
    }

    /// Generate the variant texts for this query. On any generation failure
    /// the plain query is the only variant.
    async fn variants(&self, query: &str) -> Vec<String> {
        let generated = match self.mode {
            ExpansionMode::MultiQuery => {
                let prompt = format!(
                    "Rewrite the search query below in {} different ways, one per line. \
                     Keep each rewrite short and self-contained.\n\nQuery: {query}",
                    self.variants
                );
                self.llm.generate(&prompt, VARIANT_MAX_TOKENS).await.map(|text| {
                    text.lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty())
                        .take(self.variants)
                        .map(String::from)
                        .collect::<Vec<_>>()
                })
            }
            ExpansionMode::Hyde => {
                let prompt = format!(
                    "Write a short passage that would plausibly answer this \
                     question:\n\n{query}"
                );
                self.llm
                    .generate(&prompt, VARIANT_MAX_TOKENS)
                    .await
                    .map(|answer| vec![answer])
            }
        };

        match generated {
            Ok(variants) if !variants.is_empty() => variants,
            Ok(_) => vec![query.to_string()],
            Err(error) => {
                warn!(mode = ?self.mode, %error, "query expansion failed; using plain query");
                vec![query.to_string()]
            }
        }
    }
}

#[async_trait]
impl IRetriever for QueryExpansionRetriever {
    async fn retrieve(
        &self,
        ctx: &QueryContext,
        top_k: usize,
    ) -> TrellisResult<Vec<RetrievalHit>> {
        let variants = self.variants(&ctx.query).await;

        // One base-retriever pass per variant; a variant whose embedding
        // fails is skipped rather than failing the strategy.
        let mut lists: Vec<Vec<RetrievalHit>> = Vec::with_capacity(variants.len());
        for variant in &variants {
            let embedding = match self.embedder.embed(variant).await {
                Ok(embedding) => embedding,
                Err(error) => {
                    warn!(%error, "variant embedding failed; skipping variant");
                    continue;
                }
            };
            let variant_ctx = QueryContext {
                query: variant.clone(),
                query_embedding: embedding,
                ..ctx.clone()
            };
            lists.push(self.base.retrieve(&variant_ctx, top_k).await?);
        }

        if lists.is_empty() {
            // Every variant embedding failed; fall back to the query's own
            // embedding which the orchestrator already computed.
            lists.push(self.base.retrieve(ctx, top_k).await?);
        }

        let mut fused = fuse_rrf(&lists, self.rrf_k);
        let source = self.source();
        for hit in &mut fused {
            hit.source = source;
        }
        fused.truncate(top_k);
        Ok(fused)
    }

    fn source(&self) -> StrategySource {
        match self.mode {
            ExpansionMode::MultiQuery => StrategySource::MultiQuery,
            ExpansionMode::Hyde => StrategySource::Hyde,
        }
    }
}
