use async_trait::async_trait;

use crate::errors::TrellisResult;

/// Text generation provider, used for cluster summarization and query
/// transforms.
#[async_trait]
pub trait ILlmProvider: Send + Sync {
    async fn generate(&self, prompt: &str, max_tokens: usize) -> TrellisResult<String>;

    /// Human-readable provider name.
    fn name(&self) -> &str;
}
