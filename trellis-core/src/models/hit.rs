//! Per-query retrieval hits and the global ranking tie-break.

use serde::{Deserialize, Serialize};

use crate::fragment::FragmentMetadata;

/// Which retriever produced a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategySource {
    Dense,
    Sparse,
    Hybrid,
    MultiQuery,
    Hyde,
    TreeCollapsed,
    TreeTraversal,
    Fusion,
}

impl std::fmt::Display for StrategySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StrategySource::Dense => "dense",
            StrategySource::Sparse => "sparse",
            StrategySource::Hybrid => "hybrid",
            StrategySource::MultiQuery => "multi_query",
            StrategySource::Hyde => "hyde",
            StrategySource::TreeCollapsed => "tree_collapsed",
            StrategySource::TreeTraversal => "tree_traversal",
            StrategySource::Fusion => "fusion",
        };
        f.write_str(s)
    }
}

/// One ranked candidate. Scores are strategy-local and not comparable across
/// strategies until fusion. Created per query, discarded after it completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub fragment_id: String,
    pub text: String,
    pub score: f64,
    pub source: StrategySource,
    /// Tree level of the fragment (0 = original chunk).
    pub level: u8,
    /// ACL metadata carried along so the trimmer can evaluate the predicate
    /// without another arena lookup.
    pub metadata: FragmentMetadata,
    /// Optional ancestor/descendant text attached for answer synthesis.
    #[serde(default)]
    pub context: Option<String>,
    /// Set only when a summary hit was expanded to this leaf.
    #[serde(default)]
    pub expanded_from: Option<String>,
}

/// Global tie-break rule: higher score wins; on exact score ties the
/// lexicographically lower fragment id wins, so identical inputs always
/// produce identical orderings.
pub fn rank_hits(hits: &mut [RetrievalHit]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.fragment_id.cmp(&b.fragment_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, score: f64) -> RetrievalHit {
        RetrievalHit {
            fragment_id: id.to_string(),
            text: String::new(),
            score,
            source: StrategySource::Dense,
            level: 0,
            metadata: FragmentMetadata::default(),
            context: None,
            expanded_from: None,
        }
    }

    #[test]
    fn higher_score_wins() {
        let mut hits = vec![hit("a", 0.2), hit("b", 0.9)];
        rank_hits(&mut hits);
        assert_eq!(hits[0].fragment_id, "b");
    }

    #[test]
    fn exact_ties_break_by_lower_id() {
        let mut hits = vec![hit("zeta", 0.5), hit("alpha", 0.5), hit("mid", 0.5)];
        rank_hits(&mut hits);
        let ids: Vec<&str> = hits.iter().map(|h| h.fragment_id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
    }
}
