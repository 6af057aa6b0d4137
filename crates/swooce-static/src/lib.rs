//! Static build orchestrator for swooce sites.
//!
//! Cleans the target directory, resolves every producer of a site and emits
//! each artifact to disk.

pub mod pipeline;

pub use pipeline::{BuildResult, BuildState, StaticBuilder};
