/// Tree building subsystem errors.
///
/// Only two conditions are fatal for a build; clustering and summarization
/// failures degrade gracefully and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("cannot build an index from an empty leaf set")]
    EmptyInput,

    #[error("embedding dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("fragment {id} at level {level} has no embedding")]
    MissingEmbedding { id: String, level: u8 },

    #[error("invalid tree config: {name} {message}")]
    InvalidConfig {
        name: &'static str,
        message: String,
    },
}
