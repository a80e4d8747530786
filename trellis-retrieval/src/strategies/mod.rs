//! The retrieval strategy set.
//!
//! A closed set of retrievers dispatched by a name lookup — adding a
//! strategy is a code change here, not runtime registration. Each retriever
//! is stateless between queries and ranks its own output with the global
//! tie-break before handing it to the orchestrator.

mod collapsed;
mod dense;
mod expansion;
mod hybrid;
mod sparse;
mod traversal;

pub use collapsed::TreeCollapsedRetriever;
pub use dense::DenseRetriever;
pub use expansion::{ExpansionMode, QueryExpansionRetriever};
pub use hybrid::HybridRetriever;
pub use sparse::SparseRetriever;
pub use traversal::TreeTraversalRetriever;

use std::sync::Arc;

use trellis_core::config::RetrievalConfig;
use trellis_core::models::{RetrievalHit, StrategySource, TreeIndex};
use trellis_core::traits::{
    IEmbeddingProvider, ILlmProvider, IRetriever, ISparseIndex, IVectorIndex,
};

/// Strategy names accepted by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Dense,
    Sparse,
    Hybrid,
    MultiQuery,
    Hyde,
    TreeCollapsed,
    TreeTraversal,
    /// Composition of dense + sparse + tree-collapsed fused by RRF.
    Fusion,
}

impl Strategy {
    /// Name → strategy lookup. `None` for anything outside the closed set.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "dense" => Some(Self::Dense),
            "sparse" => Some(Self::Sparse),
            "hybrid" => Some(Self::Hybrid),
            "multi_query" | "multi-query" => Some(Self::MultiQuery),
            "hyde" => Some(Self::Hyde),
            "tree_collapsed" | "collapsed" => Some(Self::TreeCollapsed),
            "tree_traversal" | "traversal" => Some(Self::TreeTraversal),
            "fusion" => Some(Self::Fusion),
            _ => None,
        }
    }
}

/// Owns one instance of every retriever and resolves a strategy to the
/// retrievers it fans out to (≤ 4 by construction).
pub struct StrategyRegistry {
    dense: Arc<DenseRetriever>,
    sparse: Arc<SparseRetriever>,
    hybrid: Arc<HybridRetriever>,
    multi_query: Arc<QueryExpansionRetriever>,
    hyde: Arc<QueryExpansionRetriever>,
    collapsed: Arc<TreeCollapsedRetriever>,
    traversal: Arc<TreeTraversalRetriever>,
}

impl StrategyRegistry {
    pub fn new(
        embedder: Arc<dyn IEmbeddingProvider>,
        llm: Arc<dyn ILlmProvider>,
        vector: Arc<dyn IVectorIndex>,
        sparse_index: Arc<dyn ISparseIndex>,
        config: &RetrievalConfig,
    ) -> Self {
        let dense = Arc::new(DenseRetriever::new(Arc::clone(&vector)));
        let sparse = Arc::new(SparseRetriever::new(Arc::clone(&sparse_index)));
        let (dense_weight, sparse_weight) = config.hybrid_weights();

        Self {
            hybrid: Arc::new(HybridRetriever::new(
                Arc::clone(&vector),
                Arc::clone(&sparse_index),
                dense_weight,
                sparse_weight,
            )),
            multi_query: Arc::new(QueryExpansionRetriever::new(
                ExpansionMode::MultiQuery,
                Arc::clone(&llm),
                Arc::clone(&embedder),
                Arc::clone(&dense),
                config.expansion_variants,
                config.rrf_k,
            )),
            hyde: Arc::new(QueryExpansionRetriever::new(
                ExpansionMode::Hyde,
                llm,
                embedder,
                Arc::clone(&dense),
                config.expansion_variants,
                config.rrf_k,
            )),
            collapsed: Arc::new(TreeCollapsedRetriever::new(config.collapse_expansion)),
            traversal: Arc::new(TreeTraversalRetriever::new(config.traversal_beam)),
            dense,
            sparse,
        }
    }

    /// The retrievers a strategy dispatches to.
    pub fn resolve(&self, strategy: Strategy) -> Vec<Arc<dyn IRetriever>> {
        match strategy {
            Strategy::Dense => vec![Arc::clone(&self.dense) as Arc<dyn IRetriever>],
            Strategy::Sparse => vec![Arc::clone(&self.sparse) as Arc<dyn IRetriever>],
            Strategy::Hybrid => vec![Arc::clone(&self.hybrid) as Arc<dyn IRetriever>],
            Strategy::MultiQuery => vec![Arc::clone(&self.multi_query) as Arc<dyn IRetriever>],
            Strategy::Hyde => vec![Arc::clone(&self.hyde) as Arc<dyn IRetriever>],
            Strategy::TreeCollapsed => vec![Arc::clone(&self.collapsed) as Arc<dyn IRetriever>],
            Strategy::TreeTraversal => vec![Arc::clone(&self.traversal) as Arc<dyn IRetriever>],
            Strategy::Fusion => vec![
                Arc::clone(&self.dense) as Arc<dyn IRetriever>,
                Arc::clone(&self.sparse) as Arc<dyn IRetriever>,
                Arc::clone(&self.collapsed) as Arc<dyn IRetriever>,
            ],
        }
    }
}

/// Resolve `(fragment_id, score)` pairs from an index search against the
/// arena. Rows the arena no longer knows (stale entries surviving a rebuild
/// swap) are silently skipped.
pub(crate) fn hits_from_scored(
    index: &TreeIndex,
    scored: Vec<(String, f64)>,
    source: StrategySource,
) -> Vec<RetrievalHit> {
    scored
        .into_iter()
        .filter_map(|(id, score)| {
            index.get(&id).map(|fragment| RetrievalHit {
                fragment_id: id,
                text: fragment.text.clone(),
                score,
                source,
                level: fragment.level,
                metadata: fragment.metadata.clone(),
                context: None,
                expanded_from: None,
            })
        })
        .collect()
}

pub(crate) fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += *x as f64 * *y as f64;
        norm_a += *x as f64 * *x as f64;
        norm_b += *y as f64 * *y as f64;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
