//! TreeBuilder: turns a flat leaf set into a multi-level `TreeIndex`.
//!
//! Per layer: cluster → summarize each cluster under bounded concurrency →
//! embed summaries → next layer. A failed summarization drops its cluster
//! (members stay retrievable one level down); an unclusterable layer ends
//! the build. Only empty input and dimension mismatches are fatal.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

use trellis_core::config::TreeConfig;
use trellis_core::errors::{IndexError, TrellisResult};
use trellis_core::fragment::Fragment;
use trellis_core::models::{BuildOutcome, CollectionScope, TreeIndex};
use trellis_core::traits::{IEmbeddingProvider, ILlmProvider};

use crate::cluster::{ClusterAttempt, ClusterEngine};
use crate::summary;

/// A finished build: the index plus its degradation record.
#[derive(Debug)]
pub struct TreeBuild {
    pub index: TreeIndex,
    pub outcome: BuildOutcome,
}

/// Builds hierarchical abstraction trees for collections.
pub struct TreeBuilder {
    embedder: Arc<dyn IEmbeddingProvider>,
    llm: Arc<dyn ILlmProvider>,
}

impl TreeBuilder {
    pub fn new(embedder: Arc<dyn IEmbeddingProvider>, llm: Arc<dyn ILlmProvider>) -> Self {
        Self { embedder, llm }
    }

    /// Build a tree from level-0 fragments.
    ///
    /// Preconditions enforced here: a non-empty leaf set and one consistent
    /// embedding dimension across every leaf.
    pub async fn build(
        &self,
        scope: CollectionScope,
        leaves: Vec<Fragment>,
        config: &TreeConfig,
    ) -> TrellisResult<TreeBuild> {
        config.validate()?;

        if leaves.is_empty() {
            return Err(IndexError::EmptyInput.into());
        }
        let dim = check_dimensions(&leaves)?;

        let mut arena: Vec<Fragment> = leaves;
        let mut levels: Vec<Vec<String>> = vec![arena.iter().map(|f| f.id.clone()).collect()];
        let mut skipped_layers = 0usize;
        let mut dropped_clusters = 0usize;

        if config.enabled {
            let engine = ClusterEngine::from_config(config);
            let mut by_id: HashMap<String, usize> =
                arena.iter().enumerate().map(|(i, f)| (f.id.clone(), i)).collect();

            for layer in 1..=config.max_layers {
                let current = levels.last().expect("levels never empty").clone();

                if current.len() < config.min_cluster_size {
                    info!(
                        layer,
                        nodes = current.len(),
                        min_cluster_size = config.min_cluster_size,
                        "layer too small to summarize further"
                    );
                    skipped_layers += 1;
                    break;
                }

                let embeddings: Vec<Vec<f32>> = current
                    .iter()
                    .map(|id| {
                        arena[by_id[id]]
                            .embedding
                            .clone()
                            .expect("checked at build entry")
                    })
                    .collect();

                let clusters = match engine.assign(&embeddings) {
                    ClusterAttempt::Assigned(clusters) => clusters,
                    ClusterAttempt::Skipped(reason) => {
                        info!(layer, reason, "clustering skipped the layer");
                        skipped_layers += 1;
                        break;
                    }
                };

                let summaries = self
                    .summarize_layer(&arena, &by_id, &current, &clusters, config)
                    .await;
                // Panicked tasks return no entry at all.
                dropped_clusters += clusters.len().saturating_sub(summaries.len());

                let mut level_ids = Vec::new();
                for (cluster_idx, outcome) in summaries {
                    let (text, embedding) = match outcome {
                        Ok(pair) => pair,
                        Err(error) => {
                            warn!(
                                layer,
                                cluster = cluster_idx,
                                %error,
                                "cluster summarization failed; dropping cluster"
                            );
                            dropped_clusters += 1;
                            continue;
                        }
                    };

                    if embedding.len() != dim {
                        warn!(
                            layer,
                            cluster = cluster_idx,
                            expected = dim,
                            found = embedding.len(),
                            "summary embedding has wrong dimension; dropping cluster"
                        );
                        dropped_clusters += 1;
                        continue;
                    }

                    let children_ids: Vec<String> = clusters[cluster_idx]
                        .iter()
                        .map(|&i| current[i].clone())
                        .collect();
                    let children: Vec<&Fragment> = clusters[cluster_idx]
                        .iter()
                        .map(|&i| &arena[by_id[&current[i]]])
                        .collect();
                    let metadata = summary::merge_acl(&children);

                    let fragment = Fragment::summary(
                        format!("s{layer}-{}", Uuid::new_v4()),
                        text,
                        embedding,
                        layer,
                        children_ids,
                        metadata,
                    );

                    by_id.insert(fragment.id.clone(), arena.len());
                    level_ids.push(fragment.id.clone());
                    arena.push(fragment);
                }

                if level_ids.is_empty() {
                    warn!(layer, "every cluster in the layer was dropped; stopping build");
                    break;
                }
                levels.push(level_ids);
            }
        }

        let index = TreeIndex::new(scope, arena, levels, dim);
        let stats = index.stats();
        info!(
            scope = %index.scope,
            total_nodes = stats.total_nodes,
            levels = stats.levels,
            summary_nodes = stats.summary_nodes,
            skipped_layers,
            dropped_clusters,
            "tree build complete"
        );

        Ok(TreeBuild {
            index,
            outcome: BuildOutcome {
                stats,
                skipped_layers,
                dropped_clusters,
            },
        })
    }

    /// Summarize every cluster of one layer with bounded concurrency.
    /// Returns one entry per cluster, in cluster order.
    async fn summarize_layer(
        &self,
        arena: &[Fragment],
        by_id: &HashMap<String, usize>,
        current: &[String],
        clusters: &[Vec<usize>],
        config: &TreeConfig,
    ) -> Vec<(usize, TrellisResult<(String, Vec<f32>)>)> {
        let semaphore = Arc::new(Semaphore::new(config.summary_concurrency));
        let mut tasks: JoinSet<(usize, TrellisResult<(String, Vec<f32>)>)> = JoinSet::new();

        for (cluster_idx, members) in clusters.iter().enumerate() {
            let member_texts: Vec<String> = members
                .iter()
                .map(|&i| arena[by_id[&current[i]]].text.clone())
                .collect();
            let prompt = summary::render_prompt(
                config.summary_prompt.as_deref(),
                &member_texts.iter().map(String::as_str).collect::<Vec<_>>(),
            );

            let llm = Arc::clone(&self.llm);
            let embedder = Arc::clone(&self.embedder);
            let semaphore = Arc::clone(&semaphore);
            let max_tokens = config.summary_max_tokens;

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("summary semaphore never closed");
                let result = async {
                    let text = llm.generate(&prompt, max_tokens).await?;
                    let embedding = embedder.embed(&text).await?;
                    Ok((text, embedding))
                }
                .await;
                (cluster_idx, result)
            });
        }

        let mut outcomes = Vec::with_capacity(clusters.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(entry) => outcomes.push(entry),
                Err(join_error) => {
                    warn!(%join_error, "summary task panicked; cluster dropped");
                }
            }
        }
        // Completion order is nondeterministic; fragment creation is not.
        outcomes.sort_by_key(|(idx, _)| *idx);
        outcomes
    }
}

/// All leaves must carry an embedding of one consistent dimension.
fn check_dimensions(leaves: &[Fragment]) -> Result<usize, IndexError> {
    let mut dim = None;
    for leaf in leaves {
        let embedding = leaf.embedding.as_ref().ok_or_else(|| {
            IndexError::MissingEmbedding {
                id: leaf.id.clone(),
                level: leaf.level,
            }
        })?;
        match dim {
            None => dim = Some(embedding.len()),
            Some(expected) if expected != embedding.len() => {
                return Err(IndexError::DimensionMismatch {
                    expected,
                    found: embedding.len(),
                });
            }
            Some(_) => {}
        }
    }
    dim.ok_or(IndexError::EmptyInput)
}
