//! Error taxonomy for the Trellis core.
//!
//! Each subsystem has its own `thiserror` enum; `TrellisError` wraps them
//! with `#[from]` conversions so `?` works across crate boundaries.

mod index_error;
mod provider_error;
mod retrieval_error;

pub use index_error::IndexError;
pub use provider_error::ProviderError;
pub use retrieval_error::RetrievalError;

/// Result alias used throughout the workspace.
pub type TrellisResult<T> = Result<T, TrellisError>;

/// Top-level error wrapping all subsystem errors.
#[derive(Debug, thiserror::Error)]
pub enum TrellisError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TrellisError {
    /// Whether this error is an access denial (post-trim empty result on a
    /// non-empty candidate set). Callers use this to report "forbidden"
    /// rather than "not found".
    pub fn is_access_denied(&self) -> bool {
        matches!(self, TrellisError::Retrieval(RetrievalError::AccessDenied))
    }
}
