//! In-memory streams and partitions with scriptable outcomes.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde_json::{Value, json};

use crate::cdk_error;
use crate::error::{CdkError, CdkResult, ErrorKind};
use crate::source::partition::Partition;
use crate::source::stream::{SourceStream, StreamAvailability};
use crate::types::Record;

/// A partition yielding a fixed sequence of record results.
#[derive(Debug, Clone)]
pub struct TestPartition {
    stream_name: String,
    slice: Option<Value>,
    records: Vec<CdkResult<Record>>,
    stalled: bool,
}

impl TestPartition {
    /// Creates a partition yielding the given record results in order.
    pub fn new(stream_name: impl Into<String>, records: Vec<CdkResult<Record>>) -> Self {
        Self {
            stream_name: stream_name.into(),
            slice: None,
            records,
            stalled: false,
        }
    }

    /// Attaches a slice representation for slice logging.
    pub fn with_slice(mut self, slice: Value) -> Self {
        self.slice = Some(slice);
        self
    }

    /// Makes the record sequence never finish after its scripted items.
    pub fn stalled(mut self) -> Self {
        self.stalled = true;
        self
    }
}

impl Partition for TestPartition {
    fn stream_name(&self) -> &str {
        &self.stream_name
    }

    fn to_slice(&self) -> Option<Value> {
        self.slice.clone()
    }

    fn records(&self) -> BoxStream<'_, CdkResult<Record>> {
        let scripted = futures::stream::iter(self.records.clone());
        if self.stalled {
            Box::pin(scripted.chain(futures::stream::pending()))
        } else {
            Box::pin(scripted)
        }
    }
}

/// A stream with scriptable partitions, availability and failures.
#[derive(Debug)]
pub struct TestStream {
    name: String,
    availability: StreamAvailability,
    partitions: Vec<TestPartition>,
    generation_error: Option<CdkError>,
}

impl TestStream {
    /// Creates an available stream with no partitions.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            availability: StreamAvailability::Available,
            partitions: Vec::new(),
            generation_error: None,
        }
    }

    /// Adds a partition yielding the given record payloads.
    pub fn with_partition(mut self, records: Vec<Value>) -> Self {
        let index = self.partitions.len();
        let records = records
            .into_iter()
            .map(|data| Ok(Record::new(self.name.clone(), data)))
            .collect();
        self.partitions.push(
            TestPartition::new(self.name.clone(), records).with_slice(json!({"partition": index})),
        );
        self
    }

    /// Adds a partition yielding the given payloads and then failing.
    pub fn with_failing_partition(mut self, records: Vec<Value>, error: &str) -> Self {
        let mut records: Vec<CdkResult<Record>> = records
            .into_iter()
            .map(|data| Ok(Record::new(self.name.clone(), data)))
            .collect();
        records.push(Err(cdk_error!(
            ErrorKind::StreamError,
            "Partition read failed",
            detail = error.to_string()
        )));
        self.partitions
            .push(TestPartition::new(self.name.clone(), records));
        self
    }

    /// Adds a partition that yields the given payloads and then never finishes.
    pub fn with_stalled_partition(mut self, records: Vec<Value>) -> Self {
        let records = records
            .into_iter()
            .map(|data| Ok(Record::new(self.name.clone(), data)))
            .collect();
        self.partitions
            .push(TestPartition::new(self.name.clone(), records).stalled());
        self
    }

    /// Makes partition generation fail after any scripted partitions.
    pub fn with_generation_error(mut self, error: &str) -> Self {
        self.generation_error = Some(cdk_error!(
            ErrorKind::StreamError,
            "Partition generation failed",
            detail = error.to_string()
        ));
        self
    }

    /// Makes the stream report itself unavailable.
    pub fn unavailable(mut self, reason: &str) -> Self {
        self.availability = StreamAvailability::unavailable(reason);
        self
    }
}

#[async_trait]
impl SourceStream for TestStream {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check_availability(&self) -> CdkResult<StreamAvailability> {
        Ok(self.availability.clone())
    }

    fn generate_partitions(&self) -> BoxStream<'_, CdkResult<Box<dyn Partition>>> {
        let mut items: Vec<CdkResult<Box<dyn Partition>>> = self
            .partitions
            .iter()
            .cloned()
            .map(|partition| Ok(Box::new(partition) as Box<dyn Partition>))
            .collect();
        if let Some(err) = &self.generation_error {
            items.push(Err(err.clone()));
        }
        Box::pin(futures::stream::iter(items))
    }
}
