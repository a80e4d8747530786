//! Named defaults for the configuration surface.

pub const DEFAULT_MAX_LAYERS: u8 = 3;
pub const DEFAULT_MIN_CLUSTER_SIZE: usize = 3;
pub const DEFAULT_SUMMARY_CONCURRENCY: usize = 4;
pub const DEFAULT_REDUCE_DIM: usize = 10;
pub const DEFAULT_SOFT_THRESHOLD: f64 = 0.3;
pub const DEFAULT_SUMMARY_MAX_TOKENS: usize = 512;

pub const DEFAULT_DENSE_WEIGHT: f64 = 0.7;
pub const DEFAULT_SPARSE_WEIGHT: f64 = 0.3;
pub const DEFAULT_EXPANSION_VARIANTS: usize = 3;
pub const DEFAULT_TRAVERSAL_BEAM: usize = 5;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
