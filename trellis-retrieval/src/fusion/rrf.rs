//! Reciprocal Rank Fusion: score = Σ 1/(k + rank + 1).
//!
//! Combines ranked lists without requiring score normalization across
//! retrieval methods. Ranks are 0-based; lists a fragment is absent from
//! contribute nothing.

use std::collections::HashMap;

use trellis_core::models::{rank_hits, RetrievalHit, StrategySource};

use super::pick_representative;

/// Fuse ranked lists with the RRF formula.
///
/// `k` is the smoothing constant (reference value 60). Higher k reduces the
/// influence of top-ranked items from any single list.
pub fn fuse_rrf(lists: &[Vec<RetrievalHit>], k: f64) -> Vec<RetrievalHit> {
    let mut scores: HashMap<String, f64> = HashMap::new();
    let mut hits_by_id: HashMap<String, Vec<RetrievalHit>> = HashMap::new();

    for list in lists {
        for (rank, hit) in list.iter().enumerate() {
            *scores.entry(hit.fragment_id.clone()).or_default() += 1.0 / (k + rank as f64 + 1.0);
            hits_by_id
                .entry(hit.fragment_id.clone())
                .or_default()
                .push(hit.clone());
        }
    }

    let mut fused: Vec<RetrievalHit> = scores
        .into_iter()
        .map(|(id, score)| {
            let hits = hits_by_id.remove(&id).expect("scored fragment has hits");
            let mut representative = pick_representative(hits);
            representative.score = score;
            representative.source = StrategySource::Fusion;
            representative
        })
        .collect();

    rank_hits(&mut fused);
    fused
}
