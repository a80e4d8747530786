//! Weighted fusion: per-list min-max normalization, then a weighted sum.

use std::collections::HashMap;

use trellis_core::models::{rank_hits, RetrievalHit, StrategySource};

use super::pick_representative;

/// Fuse with one caller-supplied weight per list. Scores are min-max
/// normalized to [0, 1] within each list before weighting; absence from a
/// list contributes 0. A constant-score (or single-element) list normalizes
/// to 1.0 for every member.
pub fn fuse_weighted(lists: &[Vec<RetrievalHit>], weights: &[f64]) -> Vec<RetrievalHit> {
    let mut scores: HashMap<String, f64> = HashMap::new();
    let mut hits_by_id: HashMap<String, Vec<RetrievalHit>> = HashMap::new();

    for (list, &weight) in lists.iter().zip(weights) {
        let min = list.iter().map(|h| h.score).fold(f64::INFINITY, f64::min);
        let max = list.iter().map(|h| h.score).fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;

        for hit in list {
            let normalized = if range > f64::EPSILON {
                (hit.score - min) / range
            } else {
                1.0
            };
            *scores.entry(hit.fragment_id.clone()).or_default() += weight * normalized;
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

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::fragment::FragmentMetadata;

    fn hit(id: &str, score: f64) -> RetrievalHit {
        RetrievalHit {
            fragment_id: id.to_string(),
            text: String::new(),
            score,
            source: StrategySource::Sparse,
            level: 0,
            metadata: FragmentMetadata::default(),
            context: None,
            expanded_from: None,
        }
    }

    #[test]
    fn weights_scale_normalized_scores() {
        let dense = vec![hit("a", 1.0), hit("b", 0.0)];
        let sparse = vec![hit("b", 5.0), hit("a", 1.0)];
        let fused = fuse_weighted(&[dense, sparse], &[0.5, 0.5]);
        // a: 0.5·1.0 + 0.5·0.0 = 0.5; b: 0.5·0.0 + 0.5·1.0 = 0.5 — id tie-break.
        assert_eq!(fused[0].fragment_id, "a");
        assert!((fused[0].score - 0.5).abs() < 1e-12);
        assert!((fused[1].score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn absence_contributes_zero() {
        let l1 = vec![hit("a", 2.0), hit("b", 1.0)];
        let l2 = vec![hit("c", 9.0)];
        let fused = fuse_weighted(&[l1, l2], &[0.4, 0.6]);
        let a = fused.iter().find(|h| h.fragment_id == "a").unwrap();
        let c = fused.iter().find(|h| h.fragment_id == "c").unwrap();
        assert!((a.score - 0.4).abs() < 1e-12);
        // Single-element list normalizes to 1.0.
        assert!((c.score - 0.6).abs() < 1e-12);
    }

    #[test]
    fn commutative_when_weights_follow_their_lists() {
        let l1 = vec![hit("a", 2.0), hit("b", 1.0)];
        let l2 = vec![hit("b", 3.0), hit("c", 1.0)];
        let forward = fuse_weighted(&[l1.clone(), l2.clone()], &[0.7, 0.3]);
        let reverse = fuse_weighted(&[l2, l1], &[0.3, 0.7]);
        let f: Vec<(String, f64)> = forward
            .iter()
            .map(|h| (h.fragment_id.clone(), h.score))
            .collect();
        let r: Vec<(String, f64)> = reverse
            .iter()
            .map(|h| (h.fragment_id.clone(), h.score))
            .collect();
        assert_eq!(f, r);
    }
}
