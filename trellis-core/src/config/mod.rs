//! KB-level configuration surface.
//!
//! Both configs deserialize with `#[serde(default)]` so a partial TOML
//! fragment from the knowledge-base settings store fills in the rest.

pub mod defaults;
mod retrieval_config;
mod tree_config;

pub use retrieval_config::RetrievalConfig;
pub use tree_config::{ClusterMethod, TreeConfig};
