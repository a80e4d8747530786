/// Retrieval subsystem errors.
///
/// `AccessDenied` and a genuinely empty result are distinct outcomes:
/// an empty result is `Ok(vec![])`, never an error.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("unknown or malformed collection scope: {scope}")]
    InvalidScope { scope: String },

    #[error("unknown retrieval strategy: {name}")]
    UnknownStrategy { name: String },

    #[error("all retrievers failed for this query")]
    AllRetrieversFailed,

    #[error("all results were removed by access control")]
    AccessDenied,

    #[error("search failed: {reason}")]
    SearchFailed { reason: String },
}
