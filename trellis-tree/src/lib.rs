//! # trellis-tree
//!
//! Builds the hierarchical abstraction index for one collection: leaf
//! fragments are soft-clustered layer by layer, each cluster is summarized by
//! the LLM provider, and summaries become the next layer's nodes. Clustering
//! and summarization failures degrade gracefully; only an empty leaf set or
//! an embedding dimension mismatch fails a build.

pub mod builder;
pub mod cluster;
pub mod summary;

pub use builder::{TreeBuild, TreeBuilder};
pub use cluster::{ClusterAttempt, ClusterEngine};
