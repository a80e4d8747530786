use serde::{Deserialize, Serialize};

/// Tenant/collection addressing for every build and retrieve call.
///
/// Supplied per request by the routing layer. A scope with an empty tenant or
/// collection id is malformed and rejected before dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionScope {
    pub tenant_id: String,
    pub collection_id: String,
}

impl CollectionScope {
    pub fn new(tenant_id: impl Into<String>, collection_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            collection_id: collection_id.into(),
        }
    }

    /// Structural validity. Unknown-collection checks happen against the
    /// index registry, not here.
    pub fn is_valid(&self) -> bool {
        !self.tenant_id.is_empty() && !self.collection_id.is_empty()
    }

    /// Stable key for registry maps and index namespacing.
    pub fn key(&self) -> String {
        format!("{}/{}", self.tenant_id, self.collection_id)
    }
}

impl std::fmt::Display for CollectionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.tenant_id, self.collection_id)
    }
}
