//! RetrievalEngine: the top-level coordinator.
//!
//! Owns the provider handles, the tree builder, and the per-collection index
//! registry. Per query the pipeline is Dispatch → Await → Fuse → Trim →
//! Done: resolve the strategy name, run the dispatched retrievers
//! concurrently under the request deadline, RRF-fuse whatever subset
//! succeeded, trim against the access profile, truncate to `top_k`.
//!
//! Index snapshots are immutable `Arc`s; a rebuild constructs the new tree
//! fully off to the side and publishes it with a single map insert, so
//! readers never observe a partially built index.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use trellis_core::config::{RetrievalConfig, TreeConfig};
use trellis_core::errors::{ProviderError, RetrievalError, TrellisResult};
use trellis_core::fragment::Fragment;
use trellis_core::models::{
    AccessProfile, BuildOutcome, CollectionScope, QueryContext, RetrievalHit, StrategySource,
    TreeIndex,
};
use trellis_core::traits::{
    IEmbeddingProvider, ILlmProvider, IRetriever, ISparseIndex, IVectorIndex,
};
use trellis_tree::TreeBuilder;

use crate::fusion::fuse_rrf;
use crate::strategies::{Strategy, StrategyRegistry};
use crate::trimming;

pub struct RetrievalEngine {
    embedder: Arc<dyn IEmbeddingProvider>,
    vector: Arc<dyn IVectorIndex>,
    sparse: Arc<dyn ISparseIndex>,
    builder: TreeBuilder,
    registry: StrategyRegistry,
    config: RetrievalConfig,
    /// Per-collection snapshots. Writers replace the `Arc`; readers clone it
    /// and drop the lock before touching the tree.
    indexes: RwLock<HashMap<String, Arc<TreeIndex>>>,
}

impl RetrievalEngine {
    pub fn new(
        embedder: Arc<dyn IEmbeddingProvider>,
        llm: Arc<dyn ILlmProvider>,
        vector: Arc<dyn IVectorIndex>,
        sparse: Arc<dyn ISparseIndex>,
        config: RetrievalConfig,
    ) -> Self {
        let registry = StrategyRegistry::new(
            Arc::clone(&embedder),
            Arc::clone(&llm),
            Arc::clone(&vector),
            Arc::clone(&sparse),
            &config,
        );
        Self {
            builder: TreeBuilder::new(Arc::clone(&embedder), llm),
            embedder,
            vector,
            sparse,
            registry,
            config,
            indexes: RwLock::new(HashMap::new()),
        }
    }

    /// Build (or rebuild) the hierarchical index for a collection and make
    /// it visible atomically once the external indexes hold every node.
    pub async fn build_index(
        &self,
        scope: &CollectionScope,
        leaves: Vec<Fragment>,
        tree_config: &TreeConfig,
    ) -> TrellisResult<BuildOutcome> {
        if !scope.is_valid() {
            return Err(RetrievalError::InvalidScope {
                scope: scope.to_string(),
            }
            .into());
        }

        let build = self.builder.build(scope.clone(), leaves, tree_config).await?;
        let mut index = build.index;

        for fragment in index.iter() {
            if let Some(embedding) = fragment.embedding.as_ref() {
                self.vector
                    .upsert(scope, &fragment.id, embedding, &fragment.metadata)
                    .await?;
            }
            self.sparse
                .upsert(scope, &fragment.id, &fragment.text, &fragment.metadata)
                .await?;
        }
        index.mark_indexed();

        let stats = build.outcome.stats;
        self.indexes
            .write()
            .expect("index registry lock")
            .insert(scope.key(), Arc::new(index));

        info!(
            %scope,
            total_nodes = stats.total_nodes,
            levels = stats.levels,
            "index published"
        );
        Ok(build.outcome)
    }

    /// Drop a collection's index from the registry and both search indexes.
    pub async fn delete_index(&self, scope: &CollectionScope) -> TrellisResult<()> {
        if !scope.is_valid() {
            return Err(RetrievalError::InvalidScope {
                scope: scope.to_string(),
            }
            .into());
        }

        let removed = self
            .indexes
            .write()
            .expect("index registry lock")
            .remove(&scope.key());
        if removed.is_none() {
            return Err(RetrievalError::InvalidScope {
                scope: scope.to_string(),
            }
            .into());
        }

        self.vector.remove_collection(scope).await?;
        self.sparse.remove_collection(scope).await?;
        info!(%scope, "index deleted");
        Ok(())
    }

    /// Run one query end to end. An empty `Ok` means genuinely no matching
    /// content; results removed entirely by access control surface as
    /// [`RetrievalError::AccessDenied`] instead.
    pub async fn retrieve(
        &self,
        scope: &CollectionScope,
        query: &str,
        strategy_name: &str,
        top_k: usize,
        profile: &AccessProfile,
    ) -> TrellisResult<Vec<RetrievalHit>> {
        // Dispatch: validate scope and resolve the strategy before any
        // provider work.
        if !scope.is_valid() {
            return Err(RetrievalError::InvalidScope {
                scope: scope.to_string(),
            }
            .into());
        }
        let index = self
            .indexes
            .read()
            .expect("index registry lock")
            .get(&scope.key())
            .cloned()
            .ok_or_else(|| RetrievalError::InvalidScope {
                scope: scope.to_string(),
            })?;
        let strategy =
            Strategy::parse(strategy_name).ok_or_else(|| RetrievalError::UnknownStrategy {
                name: strategy_name.to_string(),
            })?;

        let query_embedding = self.embedder.embed(query).await?;
        let ctx = QueryContext {
            query: query.to_string(),
            query_embedding,
            scope: scope.clone(),
            filter: profile.filter(),
            index,
        };

        // Await: concurrent fan-out under the request deadline. Dropping
        // this future aborts every in-flight retriever.
        let retrievers = self.registry.resolve(strategy);
        let fetch_k = top_k.max(1).saturating_mul(2);
        let lists = self.run_retrievers(&retrievers, &ctx, fetch_k).await;

        if lists.is_empty() {
            return Err(RetrievalError::AllRetrieversFailed.into());
        }

        // Fuse: a single surviving list is already ranked.
        let fused = if lists.len() == 1 {
            lists.into_iter().next().expect("one list")
        } else {
            fuse_rrf(&lists, self.config.rrf_k)
        };

        // Trim, then Done.
        let pre_trim = fused.len();
        let outcome = trimming::trim(fused, profile);
        if outcome.all_filtered {
            return Err(RetrievalError::AccessDenied.into());
        }

        let mut hits = outcome.kept;
        hits.truncate(top_k);
        debug!(
            %scope,
            strategy = strategy_name,
            pre_trim,
            returned = hits.len(),
            "retrieval complete"
        );
        Ok(hits)
    }

    /// Run every dispatched retriever concurrently; failed or timed-out
    /// retrievers are logged and excluded from fusion.
    async fn run_retrievers(
        &self,
        retrievers: &[Arc<dyn IRetriever>],
        ctx: &QueryContext,
        fetch_k: usize,
    ) -> Vec<Vec<RetrievalHit>> {
        let deadline = Duration::from_millis(self.config.request_timeout_ms);
        let mut tasks: JoinSet<(StrategySource, TrellisResult<Vec<RetrievalHit>>)> =
            JoinSet::new();

        for retriever in retrievers {
            let retriever = Arc::clone(retriever);
            let ctx = ctx.clone();
            tasks.spawn(async move {
                let source = retriever.source();
                let result =
                    match tokio::time::timeout(deadline, retriever.retrieve(&ctx, fetch_k)).await
                    {
                        Ok(result) => result,
                        Err(_) => Err(ProviderError::Timeout {
                            provider: source.to_string(),
                            elapsed_ms: deadline.as_millis() as u64,
                        }
                        .into()),
                    };
                (source, result)
            });
        }

        let mut lists = Vec::with_capacity(retrievers.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((source, Ok(hits))) => {
                    debug!(%source, hits = hits.len(), "retriever finished");
                    lists.push(hits);
                }
                Ok((source, Err(error))) => {
                    warn!(%source, %error, "retriever failed; excluded from fusion");
                }
                Err(join_error) => {
                    warn!(%join_error, "retriever task panicked; excluded from fusion");
                }
            }
        }
        lists
    }
}
