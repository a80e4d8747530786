use async_trait::async_trait;

use crate::errors::TrellisResult;
use crate::fragment::FragmentMetadata;
use crate::models::{AccessFilter, CollectionScope};

/// Approximate nearest-neighbor search over stored vectors.
///
/// `search` SHOULD honor the access filter as a pre-filter when the backing
/// store supports metadata predicates; the security trimmer re-applies the
/// same predicate afterwards regardless.
#[async_trait]
pub trait IVectorIndex: Send + Sync {
    async fn upsert(
        &self,
        scope: &CollectionScope,
        id: &str,
        vector: &[f32],
        metadata: &FragmentMetadata,
    ) -> TrellisResult<()>;

    /// Returns `(fragment_id, similarity)` pairs, best first.
    async fn search(
        &self,
        scope: &CollectionScope,
        query: &[f32],
        top_k: usize,
        filter: Option<&AccessFilter>,
    ) -> TrellisResult<Vec<(String, f64)>>;

    /// Drop every vector stored for the collection.
    async fn remove_collection(&self, scope: &CollectionScope) -> TrellisResult<()>;
}
