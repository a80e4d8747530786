//! Collaborator contracts consumed by the core.
//!
//! Every method that reaches a provider is async and therefore a
//! cancellation point; the orchestrator relies on this to abort in-flight
//! work when the caller cancels or a deadline elapses.

mod embedding;
mod llm;
mod retriever;
mod sparse_index;
mod vector_index;

pub use embedding::IEmbeddingProvider;
pub use llm::ILlmProvider;
pub use retriever::IRetriever;
pub use sparse_index::ISparseIndex;
pub use vector_index::IVectorIndex;
