//! Shared test fixtures: deterministic in-memory providers and fragment
//! builders used by the integration suites across the workspace.
//!
//! The topic embedder gives tests controllable geometry: texts mentioning
//! `topicN` land near a fixed per-topic center, topics 0–3 and 4–7 sit in
//! two far-apart super-groups, and everything is deterministic.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use trellis_core::errors::{ProviderError, TrellisResult};
use trellis_core::fragment::{Fragment, FragmentMetadata, Sensitivity};
use trellis_core::models::{AccessFilter, CollectionScope};
use trellis_core::traits::{
    IEmbeddingProvider, ILlmProvider, ISparseIndex, IVectorIndex,
};

// ---------------------------------------------------------------------------
// Embedding provider
// ---------------------------------------------------------------------------

/// Deterministic embedder with topic geometry.
///
/// Every `topicN` token adds 10.0 on dimension `N % dim`; topics ≥ 4 shift
/// the vector by 300.0 on dimension 0, forming a second super-group.
/// `passage K` tokens add a tiny jitter so no two fragments are identical.
/// Texts without topic tokens fall back to a hash-derived unit vector.
pub struct TopicEmbedder {
    dim: usize,
}

impl TopicEmbedder {
    pub fn new() -> Self {
        Self { dim: 8 }
    }

    pub fn with_dim(dim: usize) -> Self {
        Self { dim }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];
        let mut topics = 0usize;
        let mut last_topic = 0usize;

        for token in text.split_whitespace() {
            if let Some(n) = token.strip_prefix("topic").and_then(|s| s.parse::<usize>().ok()) {
                vector[n % self.dim] += 10.0;
                if n >= 4 {
                    vector[0] += 300.0;
                }
                topics += 1;
                last_topic = n;
            } else if let Some(k) = token
                .strip_prefix("passage")
                .and_then(|s| s.parse::<usize>().ok())
            {
                vector[(last_topic + 1 + k) % self.dim] += 0.01 * (k + 1) as f32;
            }
        }

        if topics > 0 {
            // Summaries mention several members of one topic; average back
            // to the topic center.
            for v in &mut vector {
                *v /= topics as f32;
            }
            return vector;
        }

        // No topic tokens: deterministic hash fallback.
        let mut hash = 0xcbf2_9ce4_8422_2325u64;
        for byte in text.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x1000_0000_01b3);
        }
        for (i, v) in vector.iter_mut().enumerate() {
            *v = (((hash >> (i % 56)) & 0xff) as f32) / 255.0 + 0.01;
        }
        vector
    }
}

impl Default for TopicEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IEmbeddingProvider for TopicEmbedder {
    async fn embed(&self, text: &str) -> TrellisResult<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> TrellisResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dim
    }

    fn name(&self) -> &str {
        "topic-embedder"
    }
}

/// Embedder that always fails; for exercising provider-error paths.
pub struct FailingEmbedder;

#[async_trait]
impl IEmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> TrellisResult<Vec<f32>> {
        Err(ProviderError::Embedding {
            reason: "fixture failure".to_string(),
        }
        .into())
    }

    async fn embed_batch(&self, _texts: &[String]) -> TrellisResult<Vec<Vec<f32>>> {
        Err(ProviderError::Embedding {
            reason: "fixture failure".to_string(),
        }
        .into())
    }

    fn dimensions(&self) -> usize {
        8
    }

    fn name(&self) -> &str {
        "failing-embedder"
    }
}

// ---------------------------------------------------------------------------
// LLM provider
// ---------------------------------------------------------------------------

/// Echoing generator: the "summary" is the prompt itself, so topic tokens
/// survive into summary embeddings.
pub struct EchoLlm;

#[async_trait]
impl ILlmProvider for EchoLlm {
    async fn generate(&self, prompt: &str, _max_tokens: usize) -> TrellisResult<String> {
        Ok(format!("Summary: {prompt}"))
    }

    fn name(&self) -> &str {
        "echo-llm"
    }
}

/// Fails whenever the prompt contains the poison token; succeeds otherwise.
/// Used to exercise per-cluster summarization failures.
pub struct PoisonLlm {
    pub poison: &'static str,
}

#[async_trait]
impl ILlmProvider for PoisonLlm {
    async fn generate(&self, prompt: &str, _max_tokens: usize) -> TrellisResult<String> {
        if prompt.contains(self.poison) {
            return Err(ProviderError::Generation {
                reason: format!("poisoned prompt ({})", self.poison),
            }
            .into());
        }
        Ok(format!("Summary: {prompt}"))
    }

    fn name(&self) -> &str {
        "poison-llm"
    }
}

/// Always fails. For all-retrievers-failed and degraded-build scenarios.
pub struct FailingLlm;

#[async_trait]
impl ILlmProvider for FailingLlm {
    async fn generate(&self, _prompt: &str, _max_tokens: usize) -> TrellisResult<String> {
        Err(ProviderError::Generation {
            reason: "fixture failure".to_string(),
        }
        .into())
    }

    fn name(&self) -> &str {
        "failing-llm"
    }
}

// ---------------------------------------------------------------------------
// Vector index
// ---------------------------------------------------------------------------

type VectorRow = (Vec<f32>, FragmentMetadata);

/// Brute-force cosine-similarity index with metadata filter push-down,
/// scoped per collection.
#[derive(Default)]
pub struct InMemoryVectorIndex {
    collections: Mutex<HashMap<String, HashMap<String, VectorRow>>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, scope: &CollectionScope) -> usize {
        self.collections
            .lock()
            .unwrap()
            .get(&scope.key())
            .map(HashMap::len)
            .unwrap_or(0)
    }

    pub fn is_empty(&self, scope: &CollectionScope) -> bool {
        self.len(scope) == 0
    }
}

#[async_trait]
impl IVectorIndex for InMemoryVectorIndex {
    async fn upsert(
        &self,
        scope: &CollectionScope,
        id: &str,
        vector: &[f32],
        metadata: &FragmentMetadata,
    ) -> TrellisResult<()> {
        self.collections
            .lock()
            .unwrap()
            .entry(scope.key())
            .or_default()
            .insert(id.to_string(), (vector.to_vec(), metadata.clone()));
        Ok(())
    }

    async fn search(
        &self,
        scope: &CollectionScope,
        query: &[f32],
        top_k: usize,
        filter: Option<&AccessFilter>,
    ) -> TrellisResult<Vec<(String, f64)>> {
        let collections = self.collections.lock().unwrap();
        let Some(rows) = collections.get(&scope.key()) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<(String, f64)> = rows
            .iter()
            .filter(|(_, (_, metadata))| filter.map_or(true, |f| f.allows(metadata)))
            .map(|(id, (vector, _))| (id.clone(), cosine_similarity(query, vector)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn remove_collection(&self, scope: &CollectionScope) -> TrellisResult<()> {
        self.collections.lock().unwrap().remove(&scope.key());
        Ok(())
    }
}

/// Vector index whose search always fails; upserts succeed.
#[derive(Default)]
pub struct FailingVectorIndex {
    inner: InMemoryVectorIndex,
}

#[async_trait]
impl IVectorIndex for FailingVectorIndex {
    async fn upsert(
        &self,
        scope: &CollectionScope,
        id: &str,
        vector: &[f32],
        metadata: &FragmentMetadata,
    ) -> TrellisResult<()> {
        self.inner.upsert(scope, id, vector, metadata).await
    }

    async fn search(
        &self,
        _scope: &CollectionScope,
        _query: &[f32],
        _top_k: usize,
        _filter: Option<&AccessFilter>,
    ) -> TrellisResult<Vec<(String, f64)>> {
        Err(ProviderError::VectorIndex {
            reason: "fixture failure".to_string(),
        }
        .into())
    }

    async fn remove_collection(&self, scope: &CollectionScope) -> TrellisResult<()> {
        self.inner.remove_collection(scope).await
    }
}

/// Vector index that sleeps before every search; for deadline tests.
#[derive(Default)]
pub struct SlowVectorIndex {
    inner: InMemoryVectorIndex,
    pub delay_ms: u64,
}

impl SlowVectorIndex {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            inner: InMemoryVectorIndex::new(),
            delay_ms,
        }
    }
}

#[async_trait]
impl IVectorIndex for SlowVectorIndex {
    async fn upsert(
        &self,
        scope: &CollectionScope,
        id: &str,
        vector: &[f32],
        metadata: &FragmentMetadata,
    ) -> TrellisResult<()> {
        self.inner.upsert(scope, id, vector, metadata).await
    }

    async fn search(
        &self,
        scope: &CollectionScope,
        query: &[f32],
        top_k: usize,
        filter: Option<&AccessFilter>,
    ) -> TrellisResult<Vec<(String, f64)>> {
        tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        self.inner.search(scope, query, top_k, filter).await
    }

    async fn remove_collection(&self, scope: &CollectionScope) -> TrellisResult<()> {
        self.inner.remove_collection(scope).await
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
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

// ---------------------------------------------------------------------------
// Sparse index
// ---------------------------------------------------------------------------

type SparseRow = (String, FragmentMetadata);

/// Term-frequency keyword index with the same filter push-down contract.
#[derive(Default)]
pub struct InMemorySparseIndex {
    collections: Mutex<HashMap<String, HashMap<String, SparseRow>>>,
}

impl InMemorySparseIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ISparseIndex for InMemorySparseIndex {
    async fn upsert(
        &self,
        scope: &CollectionScope,
        id: &str,
        text: &str,
        metadata: &FragmentMetadata,
    ) -> TrellisResult<()> {
        self.collections
            .lock()
            .unwrap()
            .entry(scope.key())
            .or_default()
            .insert(id.to_string(), (text.to_lowercase(), metadata.clone()));
        Ok(())
    }

    async fn search(
        &self,
        scope: &CollectionScope,
        query: &str,
        top_k: usize,
        filter: Option<&AccessFilter>,
    ) -> TrellisResult<Vec<(String, f64)>> {
        let terms: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(String::from)
            .collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let collections = self.collections.lock().unwrap();
        let Some(rows) = collections.get(&scope.key()) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<(String, f64)> = rows
            .iter()
            .filter(|(_, (_, metadata))| filter.map_or(true, |f| f.allows(metadata)))
            .filter_map(|(id, (text, _))| {
                let words: Vec<&str> = text.split_whitespace().collect();
                let score: f64 = terms
                    .iter()
                    .map(|t| words.iter().filter(|w| *w == t).count() as f64)
                    .sum();
                (score > 0.0).then(|| (id.clone(), score))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn remove_collection(&self, scope: &CollectionScope) -> TrellisResult<()> {
        self.collections.lock().unwrap().remove(&scope.key());
        Ok(())
    }
}

/// Sparse index whose search always fails; upserts succeed.
#[derive(Default)]
pub struct FailingSparseIndex {
    inner: InMemorySparseIndex,
}

#[async_trait]
impl ISparseIndex for FailingSparseIndex {
    async fn upsert(
        &self,
        scope: &CollectionScope,
        id: &str,
        text: &str,
        metadata: &FragmentMetadata,
    ) -> TrellisResult<()> {
        self.inner.upsert(scope, id, text, metadata).await
    }

    async fn search(
        &self,
        _scope: &CollectionScope,
        _query: &str,
        _top_k: usize,
        _filter: Option<&AccessFilter>,
    ) -> TrellisResult<Vec<(String, f64)>> {
        Err(ProviderError::SparseIndex {
            reason: "fixture failure".to_string(),
        }
        .into())
    }

    async fn remove_collection(&self, scope: &CollectionScope) -> TrellisResult<()> {
        self.inner.remove_collection(scope).await
    }
}

// ---------------------------------------------------------------------------
// Fragment builders
// ---------------------------------------------------------------------------

pub fn scope() -> CollectionScope {
    CollectionScope::new("tenant-1", "collection-1")
}

/// `per_topic` leaves for each of `n_topics` topics, embedded with the topic
/// geometry. Ids are `t{topic}-p{passage}`.
pub fn topic_leaves(n_topics: usize, per_topic: usize) -> Vec<Fragment> {
    let embedder = TopicEmbedder::new();
    let mut leaves = Vec::with_capacity(n_topics * per_topic);
    for topic in 0..n_topics {
        for passage in 0..per_topic {
            let text = format!("topic{topic} passage{passage} body text");
            let embedding = embedder.embed_text(&text);
            leaves.push(Fragment::leaf(
                format!("t{topic}-p{passage}"),
                text,
                embedding,
            ));
        }
    }
    leaves
}

pub fn restricted_meta(roles: &[&str], groups: &[&str], users: &[&str]) -> FragmentMetadata {
    FragmentMetadata {
        sensitivity: Sensitivity::Restricted,
        acl_roles: roles.iter().map(|s| s.to_string()).collect(),
        acl_groups: groups.iter().map(|s| s.to_string()).collect(),
        acl_users: users.iter().map(|s| s.to_string()).collect(),
        extra: Default::default(),
    }
}
