use std::sync::Arc;
use std::sync::Once;

use cdk::config::PipelineConfig;
use cdk::pipeline::Pipeline;
use cdk::sink::MemorySink;
use cdk::source::stream::SourceStream;
use cdk::types::{SourceMessage, StreamStatus};
use serde_json::Value;

static INIT: Once = Once::new();

/// Initializes tracing once for the whole test binary, honoring `RUST_LOG`.
pub fn init_test_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Creates a pipeline over a fresh memory sink with the default configuration.
pub fn create_pipeline(
    id: u64,
    streams: Vec<Arc<dyn SourceStream>>,
    sink: MemorySink,
) -> Pipeline<MemorySink> {
    create_pipeline_with_config(
        streams,
        sink,
        PipelineConfig {
            id,
            ..Default::default()
        },
    )
}

/// Creates a pipeline over a fresh memory sink with the given configuration.
pub fn create_pipeline_with_config(
    streams: Vec<Arc<dyn SourceStream>>,
    sink: MemorySink,
    config: PipelineConfig,
) -> Pipeline<MemorySink> {
    Pipeline::new(config.id, config, streams, sink)
}

/// A message stripped down to what ordering assertions care about.
///
/// Log messages are dropped since slice logging depends on the active log level.
#[derive(Debug, Clone, PartialEq)]
pub enum Simplified {
    Status(String, StreamStatus),
    Record(String, Value),
}

pub fn simplify(messages: &[SourceMessage]) -> Vec<Simplified> {
    messages
        .iter()
        .filter_map(|message| match message {
            SourceMessage::StreamStatus(status) => Some(Simplified::Status(
                status.stream.clone(),
                status.status,
            )),
            SourceMessage::Record(record) => {
                Some(Simplified::Record(record.stream.clone(), record.data.clone()))
            }
            SourceMessage::Log(_) => None,
        })
        .collect()
}

/// Returns the simplified messages that belong to one stream, in emission order.
pub fn simplify_for_stream(messages: &[SourceMessage], stream: &str) -> Vec<Simplified> {
    simplify(messages)
        .into_iter()
        .filter(|message| match message {
            Simplified::Status(name, _) | Simplified::Record(name, _) => name == stream,
        })
        .collect()
}
