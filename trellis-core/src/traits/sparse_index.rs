use async_trait::async_trait;

use crate::errors::TrellisResult;
use crate::fragment::FragmentMetadata;
use crate::models::{AccessFilter, CollectionScope};

/// Keyword/BM25-style scoring over stored text. Same filter push-down
/// contract as the vector index.
#[async_trait]
pub trait ISparseIndex: Send + Sync {
    async fn upsert(
        &self,
        scope: &CollectionScope,
        id: &str,
        text: &str,
        metadata: &FragmentMetadata,
    ) -> TrellisResult<()>;

    /// Returns `(fragment_id, score)` pairs, best first.
    async fn search(
        &self,
        scope: &CollectionScope,
        query: &str,
        top_k: usize,
        filter: Option<&AccessFilter>,
    ) -> TrellisResult<Vec<(String, f64)>>;

    /// Drop every document stored for the collection.
    async fn remove_collection(&self, scope: &CollectionScope) -> TrellisResult<()>;
}
