use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Worker pool sizing for a pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WorkersConfig {
    /// Maximum number of partition generator/reader tasks executing at the same time.
    #[serde(default = "default_max_workers")]
    pub max_workers: u16,
    /// Maximum number of submitted tasks that may be outstanding (not yet completed)
    /// before task submission blocks.
    #[serde(default = "default_max_outstanding_tasks")]
    pub max_outstanding_tasks: usize,
}

impl WorkersConfig {
    /// Default number of concurrently executing worker tasks.
    pub const DEFAULT_MAX_WORKERS: u16 = 10;

    /// Default ceiling on outstanding task submissions.
    pub const DEFAULT_MAX_OUTSTANDING_TASKS: usize = 10_000;

    /// Validates worker pool configuration settings.
    ///
    /// Ensures both ceilings are non-zero, since a zero ceiling would block
    /// submission forever.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_workers == 0 {
            return Err(ValidationError::MaxWorkersZero);
        }

        if self.max_outstanding_tasks == 0 {
            return Err(ValidationError::MaxOutstandingTasksZero);
        }

        Ok(())
    }
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            max_outstanding_tasks: default_max_outstanding_tasks(),
        }
    }
}

fn default_max_workers() -> u16 {
    WorkersConfig::DEFAULT_MAX_WORKERS
}

fn default_max_outstanding_tasks() -> usize {
    WorkersConfig::DEFAULT_MAX_OUTSTANDING_TASKS
}
