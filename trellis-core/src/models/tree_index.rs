//! The tree index arena: all fragments for one collection plus derived
//! aggregates.
//!
//! Fragments reference each other by id only — children are looked up through
//! the arena, there are no parent pointers and no in-memory cycles. Once
//! built, a `TreeIndex` is immutable; a rebuild produces a fresh index that
//! the registry swaps in atomically.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fragment::{Fragment, IndexingStatus};
use crate::models::scope::CollectionScope;

/// Aggregates computed over the final node set of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    pub total_nodes: usize,
    /// Number of populated levels including the leaves (a flat index has 1).
    pub levels: usize,
    pub leaf_nodes: usize,
    pub summary_nodes: usize,
}

/// What a build run produced beyond the tree itself. Degradation (skipped
/// layers, dropped clusters) is surfaced here as data, never as an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOutcome {
    pub stats: TreeStats,
    /// Layers that could not be clustered (too small, or the reduction step
    /// had too few samples) and ended the build early.
    pub skipped_layers: usize,
    /// Clusters whose summarization failed and were dropped; their members
    /// remain retrievable one level down.
    pub dropped_clusters: usize,
}

/// The full hierarchical fragment set for one collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeIndex {
    pub scope: CollectionScope,
    /// Arena keyed by fragment id.
    fragments: HashMap<String, Fragment>,
    /// Fragment ids per level; index 0 = leaves. Levels above the last
    /// populated one are never stored.
    levels: Vec<Vec<String>>,
    pub embedding_dim: usize,
    pub built_at: DateTime<Utc>,
}

impl TreeIndex {
    /// Assemble an index from its parts. The builder guarantees the level
    /// invariant; this constructor only wires the arena together.
    pub fn new(
        scope: CollectionScope,
        fragments: Vec<Fragment>,
        levels: Vec<Vec<String>>,
        embedding_dim: usize,
    ) -> Self {
        let fragments = fragments.into_iter().map(|f| (f.id.clone(), f)).collect();
        Self {
            scope,
            fragments,
            levels,
            embedding_dim,
            built_at: Utc::now(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Fragment> {
        self.fragments.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.fragments.contains_key(id)
    }

    /// All fragments across every level, in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.values()
    }

    /// Fragment ids at one level (0 = leaves). Empty slice for levels the
    /// build never reached.
    pub fn level_ids(&self, level: usize) -> &[String] {
        self.levels.get(level).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The highest populated level (0 when the tree is flat).
    pub fn highest_level(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    /// Walk `children_ids` down to level 0 and return the leaf fragments
    /// under `id`, in arena traversal order. Returns the fragment itself if
    /// it is already a leaf.
    pub fn descendant_leaves(&self, id: &str) -> Vec<&Fragment> {
        let mut leaves = Vec::new();
        let mut stack = vec![id.to_string()];
        while let Some(current) = stack.pop() {
            if let Some(fragment) = self.fragments.get(&current) {
                if fragment.is_leaf() {
                    leaves.push(fragment);
                } else {
                    stack.extend(fragment.children_ids.iter().cloned());
                }
            }
        }
        // Deterministic order regardless of arena iteration.
        leaves.sort_by(|a, b| a.id.cmp(&b.id));
        leaves
    }

    /// Flip every fragment to `Indexed` once the external indexes have
    /// accepted the full node set. The only post-build mutation a fragment
    /// ever sees.
    pub fn mark_indexed(&mut self) {
        for fragment in self.fragments.values_mut() {
            fragment.indexing_status = IndexingStatus::Indexed;
        }
    }

    pub fn stats(&self) -> TreeStats {
        let leaf_nodes = self.levels.first().map(Vec::len).unwrap_or(0);
        let total_nodes = self.fragments.len();
        TreeStats {
            total_nodes,
            levels: self.levels.len(),
            leaf_nodes,
            summary_nodes: total_nodes - leaf_nodes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> CollectionScope {
        CollectionScope::new("t1", "c1")
    }

    fn leaf(id: &str) -> Fragment {
        Fragment::leaf(id, format!("text {id}"), vec![0.0; 4])
    }

    fn index_with_one_summary() -> TreeIndex {
        let leaves = vec![leaf("a"), leaf("b")];
        let summary = Fragment::summary(
            "s1",
            "summary of a and b",
            vec![0.0; 4],
            1,
            vec!["a".into(), "b".into()],
            Default::default(),
        );
        let mut fragments = leaves;
        fragments.push(summary);
        TreeIndex::new(
            scope(),
            fragments,
            vec![vec!["a".into(), "b".into()], vec!["s1".into()]],
            4,
        )
    }

    #[test]
    fn stats_count_leaves_and_summaries() {
        let index = index_with_one_summary();
        let stats = index.stats();
        assert_eq!(stats.total_nodes, 3);
        assert_eq!(stats.levels, 2);
        assert_eq!(stats.leaf_nodes, 2);
        assert_eq!(stats.summary_nodes, 1);
    }

    #[test]
    fn descendant_leaves_resolve_through_the_arena() {
        let index = index_with_one_summary();
        let leaves = index.descendant_leaves("s1");
        let ids: Vec<&str> = leaves.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn descendant_leaves_of_a_leaf_is_itself() {
        let index = index_with_one_summary();
        let leaves = index.descendant_leaves("a");
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].id, "a");
    }

    #[test]
    fn highest_level_is_zero_for_flat_index() {
        let index = TreeIndex::new(scope(), vec![leaf("a")], vec![vec!["a".into()]], 4);
        assert_eq!(index.highest_level(), 0);
    }
}
