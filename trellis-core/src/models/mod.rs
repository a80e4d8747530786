//! Shared model types: scopes, access profiles, the tree index arena,
//! retrieval hits, and the per-query context handed to retrievers.

mod access;
mod hit;
mod query;
mod scope;
mod tree_index;

pub use access::{AccessFilter, AccessProfile, Clearance};
pub use hit::{rank_hits, RetrievalHit, StrategySource};
pub use query::QueryContext;
pub use scope::CollectionScope;
pub use tree_index::{BuildOutcome, TreeIndex, TreeStats};
