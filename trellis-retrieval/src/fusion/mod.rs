//! Rank fusion: combine one or more ranked hit lists into a single ordering.
//!
//! Both methods are commutative over the order of their input lists and
//! never drop a fragment that appears in at least one list with positive
//! score. Output ordering follows the global tie-break (score descending,
//! then fragment id ascending).

mod rrf;
mod weighted;

pub use rrf::fuse_rrf;
pub use weighted::fuse_weighted;

use trellis_core::errors::{RetrievalError, TrellisResult};
use trellis_core::models::RetrievalHit;

/// Fusion method selection, supplied by the orchestrator.
#[derive(Debug, Clone)]
pub enum FusionMethod {
    /// Reciprocal rank fusion with smoothing constant `k`.
    Rrf { k: f64 },
    /// Weighted sum of per-list min-max-normalized scores; one weight per
    /// input list.
    Weighted { weights: Vec<f64> },
}

/// Fuse ranked lists into one ordering.
pub fn fuse(lists: &[Vec<RetrievalHit>], method: &FusionMethod) -> TrellisResult<Vec<RetrievalHit>> {
    match method {
        FusionMethod::Rrf { k } => Ok(fuse_rrf(lists, *k)),
        FusionMethod::Weighted { weights } => {
            if weights.len() != lists.len() {
                return Err(RetrievalError::SearchFailed {
                    reason: format!(
                        "weighted fusion needs one weight per list: {} weights for {} lists",
                        weights.len(),
                        lists.len()
                    ),
                }
                .into());
            }
            Ok(fuse_weighted(lists, weights))
        }
    }
}

/// Choose a deterministic representative hit for a fragment that appears in
/// several lists. The choice depends only on the set of hits, never on list
/// order, which keeps fusion commutative.
pub(crate) fn pick_representative(hits: Vec<RetrievalHit>) -> RetrievalHit {
    hits.into_iter()
        .max_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.source.to_string().cmp(&a.source.to_string()))
        })
        .expect("representative of at least one hit")
}
