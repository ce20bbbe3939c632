//! Configuration objects for the extraction core.
//!
//! This module contains re-exported configurations that are needed by pipelines.

// Re-exports.
pub use cdk_config::shared::*;
