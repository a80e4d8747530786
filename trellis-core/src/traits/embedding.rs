use async_trait::async_trait;

use crate::errors::TrellisResult;

/// Embedding generation provider: text → fixed-length vector.
#[async_trait]
pub trait IEmbeddingProvider: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> TrellisResult<Vec<f32>>;

    /// Embed a batch of texts, one vector per input in order.
    async fn embed_batch(&self, texts: &[String]) -> TrellisResult<Vec<Vec<f32>>>;

    /// The dimensionality of vectors produced by this provider.
    fn dimensions(&self) -> usize;

    /// Human-readable provider name.
    fn name(&self) -> &str;
}
