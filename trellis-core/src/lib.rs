//! # trellis-core
//!
//! Foundation crate for the Trellis retrieval core.
//! Defines the fragment data model, provider traits, errors, config, and
//! constants. Every other crate in the workspace depends on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod fragment;
pub mod models;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use config::{RetrievalConfig, TreeConfig};
pub use errors::{TrellisError, TrellisResult};
pub use fragment::{Fragment, FragmentMetadata, Sensitivity};
pub use models::{
    AccessFilter, AccessProfile, CollectionScope, QueryContext, RetrievalHit, StrategySource,
    TreeIndex, TreeStats,
};
