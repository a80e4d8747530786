//! Security trimming: filter a ranked hit list against an access profile.
//!
//! Always the last gate before results leave the orchestrator. The same
//! predicate is pushed down to the indexes as a pre-filter, but the trimmer
//! runs unconditionally — push-down is an optimization, never a substitute.

use tracing::debug;

use trellis_core::models::{AccessProfile, RetrievalHit};

/// Result of a trim pass. `all_filtered` distinguishes "everything was
/// removed by access control" from "there was nothing to begin with" — the
/// caller reports the former as forbidden, not as not-found.
#[derive(Debug, Clone)]
pub struct TrimOutcome {
    pub kept: Vec<RetrievalHit>,
    pub all_filtered: bool,
}

/// Keep exactly the hits the profile may see, preserving order.
///
/// The predicate ([`trellis_core::models::AccessFilter::allows`]) is
/// fail-closed: restricted fragments with empty ACL lists are visible to
/// no one. Trimming is idempotent — re-trimming kept hits removes nothing.
pub fn trim(hits: Vec<RetrievalHit>, profile: &AccessProfile) -> TrimOutcome {
    let before = hits.len();
    let filter = profile.filter();

    let kept: Vec<RetrievalHit> = hits
        .into_iter()
        .filter(|hit| filter.allows(&hit.metadata))
        .collect();

    let all_filtered = before > 0 && kept.is_empty();
    if before != kept.len() {
        debug!(
            user = %profile.user_id,
            before,
            after = kept.len(),
            all_filtered,
            "security trim removed hits"
        );
    }

    TrimOutcome { kept, all_filtered }
}
