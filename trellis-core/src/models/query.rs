use std::sync::Arc;

use crate::models::access::AccessFilter;
use crate::models::scope::CollectionScope;
use crate::models::tree_index::TreeIndex;

/// Everything a retriever needs for one query. The index snapshot is an
/// `Arc` clone — retrievers share read-only access and a concurrent rebuild
/// can never mutate what they see.
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub query: String,
    pub query_embedding: Vec<f32>,
    pub scope: CollectionScope,
    pub filter: AccessFilter,
    pub index: Arc<TreeIndex>,
}
