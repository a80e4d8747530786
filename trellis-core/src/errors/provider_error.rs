/// Errors from the external provider contracts (embedding, LLM, indexes).
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("embedding provider failed: {reason}")]
    Embedding { reason: String },

    #[error("llm generation failed: {reason}")]
    Generation { reason: String },

    #[error("vector index error: {reason}")]
    VectorIndex { reason: String },

    #[error("sparse index error: {reason}")]
    SparseIndex { reason: String },

    #[error("provider call timed out after {elapsed_ms}ms: {provider}")]
    Timeout { provider: String, elapsed_ms: u64 },
}
