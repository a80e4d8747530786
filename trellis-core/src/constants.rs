/// Trellis system version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Hard ceiling on abstraction tree depth (summary layers above the leaves).
pub const MAX_TREE_LAYERS: u8 = 5;

/// Upper bound for the BIC sweep when choosing a cluster count.
pub const MAX_CLUSTER_SWEEP: usize = 12;

/// Reference RRF smoothing constant from the literature.
pub const DEFAULT_RRF_K: f64 = 60.0;

/// Maximum number of retrievers a single strategy may fan out to.
pub const MAX_STRATEGY_FANOUT: usize = 4;
