//! Property tests: RRF ordering/commutativity and trimmer invariants.

use proptest::prelude::*;

use trellis_core::fragment::{FragmentMetadata, Sensitivity};
use trellis_core::models::{AccessProfile, RetrievalHit, StrategySource};
use trellis_retrieval::fusion::fuse_rrf;
use trellis_retrieval::trimming::trim;

fn hit(id: &str, score: f64, metadata: FragmentMetadata) -> RetrievalHit {
    RetrievalHit {
        fragment_id: id.to_string(),
        text: format!("text {id}"),
        score,
        source: StrategySource::Dense,
        level: 0,
        metadata,
        context: None,
        expanded_from: None,
    }
}

/// A ranked list built from distinct ids drawn from a small alphabet.
fn ranked_list() -> impl Strategy<Value = Vec<RetrievalHit>> {
    proptest::collection::btree_set("[a-h]", 0..6).prop_map(|ids| {
        ids.into_iter()
            .enumerate()
            .map(|(rank, id)| hit(&id, 1.0 - rank as f64 * 0.05, FragmentMetadata::default()))
            .collect()
    })
}

fn acl_metadata() -> impl Strategy<Value = FragmentMetadata> {
    (
        any::<bool>(),
        proptest::collection::vec("(eng|sales|ops)", 0..3),
        proptest::collection::vec("(core|platform)", 0..2),
        proptest::collection::vec("(u1|u2)", 0..2),
    )
        .prop_map(|(public, roles, groups, users)| FragmentMetadata {
            sensitivity: if public {
                Sensitivity::Public
            } else {
                Sensitivity::Restricted
            },
            acl_roles: roles,
            acl_groups: groups,
            acl_users: users,
            extra: Default::default(),
        })
}

fn profile() -> impl Strategy<Value = AccessProfile> {
    (
        "(u1|u2|u3)",
        proptest::collection::vec("(eng|sales|ops)", 0..3),
        proptest::collection::vec("(core|platform)", 0..2),
    )
        .prop_map(|(user, roles, groups)| {
            AccessProfile::new(user).with_roles(roles).with_groups(groups)
        })
}

proptest! {
    /// Within a single list, the RRF score strictly decreases with rank.
    #[test]
    fn prop_rrf_strictly_decreasing_in_rank(list in ranked_list()) {
        prop_assume!(list.len() >= 2);
        let original: Vec<String> = list.iter().map(|h| h.fragment_id.clone()).collect();
        let fused = fuse_rrf(&[list], 60.0);

        // With one input list, fused order matches list order and scores
        // strictly decrease.
        let fused_ids: Vec<String> = fused.iter().map(|h| h.fragment_id.clone()).collect();
        prop_assert_eq!(fused_ids, original);
        for pair in fused.windows(2) {
            prop_assert!(pair[0].score > pair[1].score);
        }
    }

    /// Fusion is commutative over the order of its input lists.
    #[test]
    fn prop_rrf_commutative(a in ranked_list(), b in ranked_list(), c in ranked_list()) {
        let forward = fuse_rrf(&[a.clone(), b.clone(), c.clone()], 60.0);
        let shuffled = fuse_rrf(&[c, a, b], 60.0);

        let f: Vec<(String, String)> = forward
            .iter()
            .map(|h| (h.fragment_id.clone(), format!("{:.12}", h.score)))
            .collect();
        let s: Vec<(String, String)> = shuffled
            .iter()
            .map(|h| (h.fragment_id.clone(), format!("{:.12}", h.score)))
            .collect();
        prop_assert_eq!(f, s);
    }

    /// No fragment that appears in any list is dropped by fusion.
    #[test]
    fn prop_rrf_drops_nothing(a in ranked_list(), b in ranked_list()) {
        let fused = fuse_rrf(&[a.clone(), b.clone()], 60.0);
        for input in a.iter().chain(b.iter()) {
            prop_assert!(fused.iter().any(|h| h.fragment_id == input.fragment_id));
        }
    }

    /// Trim output is a subset of its input and every kept hit satisfies the
    /// access predicate; every non-public hit failing it is absent.
    #[test]
    fn prop_trim_subset_and_predicate(
        metas in proptest::collection::vec(acl_metadata(), 0..8),
        profile in profile(),
    ) {
        let hits: Vec<RetrievalHit> = metas
            .into_iter()
            .enumerate()
            .map(|(i, meta)| hit(&format!("f{i}"), 1.0, meta))
            .collect();

        let outcome = trim(hits.clone(), &profile);
        let filter = profile.filter();

        prop_assert!(outcome.kept.len() <= hits.len());
        for kept in &outcome.kept {
            prop_assert!(hits.iter().any(|h| h.fragment_id == kept.fragment_id));
            prop_assert!(filter.allows(&kept.metadata));
        }
        for original in &hits {
            if !filter.allows(&original.metadata) {
                prop_assert!(
                    outcome.kept.iter().all(|h| h.fragment_id != original.fragment_id)
                );
            }
        }
        prop_assert_eq!(
            outcome.all_filtered,
            !hits.is_empty() && outcome.kept.is_empty()
        );
    }

    /// Trimming an already-trimmed list changes nothing.
    #[test]
    fn prop_trim_idempotent(
        metas in proptest::collection::vec(acl_metadata(), 0..8),
        profile in profile(),
    ) {
        let hits: Vec<RetrievalHit> = metas
            .into_iter()
            .enumerate()
            .map(|(i, meta)| hit(&format!("f{i}"), 1.0, meta))
            .collect();

        let once = trim(hits, &profile);
        let twice = trim(once.kept.clone(), &profile);

        let first: Vec<&str> = once.kept.iter().map(|h| h.fragment_id.as_str()).collect();
        let second: Vec<&str> = twice.kept.iter().map(|h| h.fragment_id.as_str()).collect();
        prop_assert_eq!(first, second);
        prop_assert!(!twice.all_filtered || once.kept.is_empty());
    }
}
