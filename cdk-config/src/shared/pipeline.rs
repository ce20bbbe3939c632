use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::shared::{ValidationError, workers::WorkersConfig};

/// Configuration for a concurrent extraction pipeline.
///
/// Contains all settings required to run one sync: worker pool sizing,
/// the stream concurrency ceiling, and the queue stall detection timeout.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// The unique identifier for this pipeline.
    pub id: u64,
    /// Maximum number of streams that may be concurrently generating partitions.
    ///
    /// Streams beyond this ceiling are queued and started as earlier generators
    /// finish. Partition reading is not stream-scoped and is bounded only by the
    /// worker pool ceilings.
    #[serde(default = "default_max_concurrent_streams")]
    pub max_concurrent_streams: usize,
    /// Worker pool configuration.
    #[serde(default)]
    pub workers: WorkersConfig,
    /// Maximum time, in milliseconds, the orchestrator waits for a queue item
    /// before declaring the pipeline stalled.
    #[serde(default = "default_queue_timeout_ms")]
    pub queue_timeout_ms: u64,
    /// Whether every generated partition surfaces a slice log message, regardless
    /// of the active log level.
    #[serde(default)]
    pub log_slices: bool,
}

impl PipelineConfig {
    /// Default number of streams concurrently generating partitions.
    pub const DEFAULT_MAX_CONCURRENT_STREAMS: usize = 1;

    /// Default queue stall timeout in milliseconds.
    pub const DEFAULT_QUEUE_TIMEOUT_MS: u64 = 900_000;

    /// Returns the queue stall timeout as a [`Duration`].
    pub fn queue_timeout(&self) -> Duration {
        Duration::from_millis(self.queue_timeout_ms)
    }

    /// Validates pipeline configuration settings.
    ///
    /// Checks worker pool sizing and ensures the stream concurrency ceiling is
    /// non-zero.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.workers.validate()?;

        if self.max_concurrent_streams == 0 {
            return Err(ValidationError::MaxConcurrentStreamsZero);
        }

        if self.queue_timeout_ms == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "queue_timeout_ms".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            id: 0,
            max_concurrent_streams: default_max_concurrent_streams(),
            workers: WorkersConfig::default(),
            queue_timeout_ms: default_queue_timeout_ms(),
            log_slices: false,
        }
    }
}

fn default_max_concurrent_streams() -> usize {
    PipelineConfig::DEFAULT_MAX_CONCURRENT_STREAMS
}

fn default_queue_timeout_ms() -> u64 {
    PipelineConfig::DEFAULT_QUEUE_TIMEOUT_MS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_concurrent_streams, 1);
        assert_eq!(config.queue_timeout(), Duration::from_secs(900));
    }

    #[test]
    fn test_zero_concurrent_streams_is_rejected() {
        let config = PipelineConfig {
            max_concurrent_streams: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MaxConcurrentStreamsZero)
        ));
    }

    #[test]
    fn test_zero_worker_ceilings_are_rejected() {
        let config = PipelineConfig {
            workers: WorkersConfig {
                max_workers: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MaxWorkersZero)
        ));

        let config = PipelineConfig {
            workers: WorkersConfig {
                max_outstanding_tasks: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MaxOutstandingTasksZero)
        ));
    }

    #[test]
    fn test_deserializes_with_defaults() {
        let config: PipelineConfig = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        assert_eq!(config.id, 42);
        assert_eq!(config.max_concurrent_streams, 1);
        assert_eq!(
            config.workers.max_outstanding_tasks,
            WorkersConfig::DEFAULT_MAX_OUTSTANDING_TASKS
        );
        assert!(!config.log_slices);
    }
}
