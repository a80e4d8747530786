//! The fragment data model.
//!
//! A `Fragment` is the unit of retrievable text. Level 0 fragments are
//! original document chunks; higher levels are generated summaries whose
//! `children_ids` point one level down within the same collection arena.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Coarse public/restricted classification, independent of the fine-grained
/// ACL lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    #[default]
    Public,
    Restricted,
}

/// Index-maintenance lifecycle for a fragment. The only field mutated after
/// a fragment is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IndexingStatus {
    #[default]
    Pending,
    Indexed,
    Failed,
}

/// Access-control and free-form metadata attached to a fragment.
///
/// Empty ACL lists mean "no explicit grant via that dimension", not
/// "open to all" — the trim predicate is fail-closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FragmentMetadata {
    /// Public fragments are visible to every requester.
    #[serde(default)]
    pub sensitivity: Sensitivity,
    /// Roles granted access when `sensitivity == Restricted`.
    #[serde(default)]
    pub acl_roles: Vec<String>,
    /// Groups granted access.
    #[serde(default)]
    pub acl_groups: Vec<String>,
    /// Individual users granted access.
    #[serde(default)]
    pub acl_users: Vec<String>,
    /// Free-form key-value metadata carried through to the indexes.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

/// A unit of retrievable text with an embedding.
///
/// Fragments are created once (at upload time or during a tree build) and are
/// immutable afterwards except for `indexing_status`. They are destroyed only
/// by a full index rebuild or an explicit delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fragment {
    /// Unique within its collection.
    pub id: String,
    pub text: String,
    /// Fixed dimension per collection. `None` only transiently before the
    /// build embeds the fragment; the builder rejects leaves without one.
    pub embedding: Option<Vec<f32>>,
    /// 0 = original chunk, >0 = generated summary.
    pub level: u8,
    /// Ordered child ids, empty at level 0. Invariant: every child resolves
    /// to a fragment of level exactly `level - 1`.
    #[serde(default)]
    pub children_ids: Vec<String>,
    #[serde(default)]
    pub metadata: FragmentMetadata,
    #[serde(default)]
    pub indexing_status: IndexingStatus,
}

impl Fragment {
    /// Create a level-0 fragment from raw chunk text and its embedding.
    pub fn leaf(id: impl Into<String>, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            embedding: Some(embedding),
            level: 0,
            children_ids: Vec::new(),
            metadata: FragmentMetadata::default(),
            indexing_status: IndexingStatus::Pending,
        }
    }

    /// Create a summary fragment one level above its children.
    pub fn summary(
        id: impl Into<String>,
        text: impl Into<String>,
        embedding: Vec<f32>,
        level: u8,
        children_ids: Vec<String>,
        metadata: FragmentMetadata,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            embedding: Some(embedding),
            level,
            children_ids,
            metadata,
            indexing_status: IndexingStatus::Pending,
        }
    }

    /// Attach ACL metadata, builder-style.
    pub fn with_metadata(mut self, metadata: FragmentMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Whether this fragment is an original chunk rather than a summary.
    pub fn is_leaf(&self) -> bool {
        self.level == 0
    }
}

/// Identity equality: a fragment's identity is its id within the collection.
impl PartialEq for Fragment {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
