//! Integration tests for the tree builder: layer construction, degradation
//! paths, and the fatal preconditions.

use std::sync::Arc;

use test_fixtures::{scope, topic_leaves, EchoLlm, PoisonLlm, TopicEmbedder};
use trellis_core::config::TreeConfig;
use trellis_core::errors::{IndexError, TrellisError};
use trellis_core::fragment::Fragment;
use trellis_tree::TreeBuilder;

fn builder() -> TreeBuilder {
    TreeBuilder::new(Arc::new(TopicEmbedder::new()), Arc::new(EchoLlm))
}

fn config(max_layers: u8, min_cluster_size: usize) -> TreeConfig {
    TreeConfig {
        max_layers,
        min_cluster_size,
        seed: Some(17),
        ..Default::default()
    }
}

#[tokio::test]
async fn leaf_set_below_min_cluster_size_stays_flat() {
    let leaves = topic_leaves(1, 2);
    let build = builder()
        .build(scope(), leaves, &config(3, 3))
        .await
        .unwrap();

    assert_eq!(build.outcome.stats.levels, 1);
    assert_eq!(build.outcome.stats.summary_nodes, 0);
    assert_eq!(build.outcome.stats.leaf_nodes, 2);
    assert_eq!(build.outcome.skipped_layers, 1);
}

#[tokio::test]
async fn forty_eight_leaves_build_three_levels() {
    // 8 topics × 6 passages, topics 0–3 and 4–7 in two far-apart
    // super-groups. Layer 1 clusters the topics, layer 2 the super-groups,
    // and the third layer is skipped once its candidate count drops below 3.
    let leaves = topic_leaves(8, 6);
    let build = builder()
        .build(scope(), leaves, &config(3, 3))
        .await
        .unwrap();

    let stats = build.outcome.stats;
    assert_eq!(stats.leaf_nodes, 48);
    assert_eq!(stats.levels, 3);

    let layer1 = build.index.level_ids(1).len();
    let layer2 = build.index.level_ids(2).len();
    assert!(layer1 >= 3, "layer 1 has {layer1} nodes");
    assert!(layer2 >= 1 && layer2 < 3, "layer 2 has {layer2} nodes");
    assert_eq!(stats.total_nodes, 48 + layer1 + layer2);
    assert!(build.outcome.skipped_layers >= 1);
}

#[tokio::test]
async fn children_are_exactly_one_level_down() {
    let leaves = topic_leaves(8, 6);
    let build = builder()
        .build(scope(), leaves, &config(3, 3))
        .await
        .unwrap();

    for fragment in build.index.iter() {
        if fragment.level == 0 {
            assert!(fragment.children_ids.is_empty());
            continue;
        }
        assert!(
            !fragment.children_ids.is_empty(),
            "summary {} has no children",
            fragment.id
        );
        for child_id in &fragment.children_ids {
            let child = build
                .index
                .get(child_id)
                .unwrap_or_else(|| panic!("dangling child id {child_id}"));
            assert_eq!(child.level, fragment.level - 1);
        }
    }
}

#[tokio::test]
async fn empty_leaf_set_is_fatal() {
    let result = builder().build(scope(), vec![], &config(3, 3)).await;
    assert!(matches!(
        result,
        Err(TrellisError::Index(IndexError::EmptyInput))
    ));
}

#[tokio::test]
async fn dimension_mismatch_is_fatal() {
    let leaves = vec![
        Fragment::leaf("a", "topic0 passage0", vec![0.0; 8]),
        Fragment::leaf("b", "topic0 passage1", vec![0.0; 4]),
    ];
    let result = builder().build(scope(), leaves, &config(3, 3)).await;
    assert!(matches!(
        result,
        Err(TrellisError::Index(IndexError::DimensionMismatch {
            expected: 8,
            found: 4
        }))
    ));
}

#[tokio::test]
async fn missing_embedding_is_fatal() {
    let mut leaf = Fragment::leaf("a", "topic0 passage0", vec![0.0; 8]);
    leaf.embedding = None;
    let result = builder().build(scope(), vec![leaf], &config(3, 3)).await;
    assert!(matches!(
        result,
        Err(TrellisError::Index(IndexError::MissingEmbedding { .. }))
    ));
}

#[tokio::test]
async fn failed_summarization_drops_only_that_cluster() {
    // Two topic groups; the LLM refuses any prompt mentioning topic0.
    let leaves = topic_leaves(2, 6);
    let builder = TreeBuilder::new(
        Arc::new(TopicEmbedder::new()),
        Arc::new(PoisonLlm { poison: "topic0" }),
    );
    let build = builder
        .build(scope(), leaves, &config(3, 3))
        .await
        .unwrap();

    assert_eq!(build.outcome.dropped_clusters, 1);
    assert_eq!(build.outcome.stats.leaf_nodes, 12);
    // The surviving cluster still produced its summary.
    assert_eq!(build.index.level_ids(1).len(), 1);
    // Dropped members remain retrievable at level 0.
    assert!(build.index.get("t0-p0").is_some());
}

#[tokio::test]
async fn disabled_tree_config_builds_flat_index() {
    let leaves = topic_leaves(8, 6);
    let build = builder()
        .build(
            scope(),
            leaves,
            &TreeConfig {
                enabled: false,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(build.outcome.stats.levels, 1);
    assert_eq!(build.outcome.stats.summary_nodes, 0);
    assert_eq!(build.outcome.stats.leaf_nodes, 48);
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let leaves = topic_leaves(1, 4);
    let result = builder().build(scope(), leaves, &config(0, 3)).await;
    assert!(matches!(
        result,
        Err(TrellisError::Index(IndexError::InvalidConfig { .. }))
    ));
}

#[tokio::test]
async fn summary_fragments_embed_with_the_collection_dimension() {
    let leaves = topic_leaves(4, 4);
    let build = builder()
        .build(scope(), leaves, &config(2, 3))
        .await
        .unwrap();

    for fragment in build.index.iter() {
        assert_eq!(fragment.embedding.as_ref().unwrap().len(), 8);
    }
}

#[tokio::test]
async fn builds_are_reproducible_for_a_fixed_seed() {
    let first = builder()
        .build(scope(), topic_leaves(8, 6), &config(3, 3))
        .await
        .unwrap();
    let second = builder()
        .build(scope(), topic_leaves(8, 6), &config(3, 3))
        .await
        .unwrap();

    assert_eq!(first.outcome.stats.levels, second.outcome.stats.levels);
    assert_eq!(
        first.index.level_ids(1).len(),
        second.index.level_ids(1).len()
    );
}
