use std::sync::Arc;
use std::time::Duration;

use cdk::config::PipelineConfig;
use cdk::error::ErrorKind;
use cdk::sink::MemorySink;
use cdk::source::stream::SourceStream;
use cdk::test_utils::stream::TestStream;
use cdk::types::{LogLevel, SourceMessage, StreamStatus};
use serde_json::json;
use tokio::time::{sleep, timeout};

use crate::common::{
    Simplified, create_pipeline, create_pipeline_with_config, init_test_tracing, simplify,
    simplify_for_stream,
};

#[tokio::test(flavor = "multi_thread")]
async fn single_stream_two_records_ordered_output_test() {
    init_test_tracing();

    let stream: Arc<dyn SourceStream> = Arc::new(
        TestStream::new("users").with_partition(vec![json!({"id": "1"}), json!({"id": "2"})]),
    );
    let sink = MemorySink::new();

    let mut pipeline = create_pipeline(1, vec![stream], sink.clone());
    pipeline.start().await.unwrap();
    pipeline.wait().await.unwrap();

    let messages = sink.messages().await;
    assert_eq!(
        simplify(&messages),
        vec![
            Simplified::Status("users".to_string(), StreamStatus::Started),
            Simplified::Status("users".to_string(), StreamStatus::Running),
            Simplified::Record("users".to_string(), json!({"id": "1"})),
            Simplified::Record("users".to_string(), json!({"id": "2"})),
            Simplified::Status("users".to_string(), StreamStatus::Complete),
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn two_streams_emit_all_records_and_one_terminal_status_each_test() {
    init_test_tracing();

    let users: Arc<dyn SourceStream> = Arc::new(
        TestStream::new("users").with_partition(vec![json!({"id": "1"}), json!({"id": "2"})]),
    );
    let orders: Arc<dyn SourceStream> = Arc::new(
        TestStream::new("orders").with_partition(vec![json!({"id": "3"}), json!({"id": "4"})]),
    );
    let sink = MemorySink::new();

    let mut pipeline = create_pipeline_with_config(
        vec![users, orders],
        sink.clone(),
        PipelineConfig {
            id: 2,
            max_concurrent_streams: 2,
            ..Default::default()
        },
    );
    pipeline.start().await.unwrap();
    pipeline.wait().await.unwrap();

    let messages = sink.messages().await;
    assert_eq!(sink.records().await.len(), 4);

    // Cross-stream interleaving is unspecified; each stream on its own must
    // follow started -> running -> records -> complete.
    for (stream, first, second) in [
        ("users", json!({"id": "1"}), json!({"id": "2"})),
        ("orders", json!({"id": "3"}), json!({"id": "4"})),
    ] {
        assert_eq!(
            simplify_for_stream(&messages, stream),
            vec![
                Simplified::Status(stream.to_string(), StreamStatus::Started),
                Simplified::Status(stream.to_string(), StreamStatus::Running),
                Simplified::Record(stream.to_string(), first),
                Simplified::Record(stream.to_string(), second),
                Simplified::Status(stream.to_string(), StreamStatus::Complete),
            ]
        );
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn stream_completes_only_after_all_partitions_close_test() {
    init_test_tracing();

    let stream: Arc<dyn SourceStream> = Arc::new(
        TestStream::new("users")
            .with_partition(vec![json!({"id": "1"}), json!({"id": "2"})])
            .with_partition(vec![json!({"id": "3"}), json!({"id": "4"})]),
    );
    let sink = MemorySink::new();

    let mut pipeline = create_pipeline(3, vec![stream], sink.clone());
    pipeline.start().await.unwrap();
    pipeline.wait().await.unwrap();

    let messages = simplify(&sink.messages().await);

    // Every record appears exactly once.
    let mut ids: Vec<String> = messages
        .iter()
        .filter_map(|message| match message {
            Simplified::Record(_, data) => Some(data["id"].as_str().unwrap().to_string()),
            _ => None,
        })
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["1", "2", "3", "4"]);

    // The terminal status comes after every record, and there is exactly one.
    let complete_index = messages
        .iter()
        .position(|message| {
            matches!(message, Simplified::Status(_, StreamStatus::Complete))
        })
        .expect("stream should complete");
    let last_record_index = messages
        .iter()
        .rposition(|message| matches!(message, Simplified::Record(..)))
        .unwrap();
    assert!(complete_index > last_record_index);
    assert_eq!(
        messages
            .iter()
            .filter(|message| matches!(
                message,
                Simplified::Status(_, StreamStatus::Complete | StreamStatus::Incomplete)
            ))
            .count(),
        1
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_partition_stops_sync_and_reports_incomplete_test() {
    init_test_tracing();

    let stream: Arc<dyn SourceStream> = Arc::new(
        TestStream::new("users").with_failing_partition(vec![json!({"id": "1"})], "test exception"),
    );
    let sink = MemorySink::new();

    let mut pipeline = create_pipeline(4, vec![stream], sink.clone());
    pipeline.start().await.unwrap();

    let err = pipeline.wait().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StreamError);
    assert_eq!(err.detail(), Some("test exception"));

    // The record read before the failure was forwarded.
    let records = sink.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].data, json!({"id": "1"}));

    // The stream never completes; it is reported incomplete instead.
    let statuses = sink.stream_statuses("users").await;
    assert!(statuses.contains(&StreamStatus::Incomplete));
    assert!(!statuses.contains(&StreamStatus::Complete));
}

#[tokio::test(flavor = "multi_thread")]
async fn generation_failure_propagates_to_the_caller_test() {
    init_test_tracing();

    let stream: Arc<dyn SourceStream> =
        Arc::new(TestStream::new("users").with_generation_error("listing failed"));
    let sink = MemorySink::new();

    let mut pipeline = create_pipeline(5, vec![stream], sink.clone());
    pipeline.start().await.unwrap();

    let err = pipeline.wait().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StreamError);

    let statuses = sink.stream_statuses("users").await;
    assert_eq!(statuses, vec![StreamStatus::Started]);
}

#[tokio::test(flavor = "multi_thread")]
async fn second_stream_starts_only_after_first_stops_generating_test() {
    init_test_tracing();

    let first: Arc<dyn SourceStream> = Arc::new(TestStream::new("users"));
    let second: Arc<dyn SourceStream> = Arc::new(TestStream::new("orders"));
    let sink = MemorySink::new();

    // The default concurrency ceiling is one generating stream at a time.
    let mut pipeline = create_pipeline(6, vec![first, second], sink.clone());
    pipeline.start().await.unwrap();
    pipeline.wait().await.unwrap();

    let messages = simplify(&sink.messages().await);
    assert_eq!(
        messages,
        vec![
            Simplified::Status("users".to_string(), StreamStatus::Started),
            Simplified::Status("users".to_string(), StreamStatus::Complete),
            Simplified::Status("orders".to_string(), StreamStatus::Started),
            Simplified::Status("orders".to_string(), StreamStatus::Complete),
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn unavailable_stream_is_skipped_test() {
    init_test_tracing();

    let unavailable: Arc<dyn SourceStream> =
        Arc::new(TestStream::new("locked").unavailable("missing permissions"));
    let available: Arc<dyn SourceStream> =
        Arc::new(TestStream::new("users").with_partition(vec![json!({"id": "1"})]));
    let sink = MemorySink::new();

    let mut pipeline = create_pipeline(7, vec![unavailable, available], sink.clone());
    pipeline.start().await.unwrap();
    pipeline.wait().await.unwrap();

    assert!(sink.stream_statuses("locked").await.is_empty());
    assert_eq!(
        sink.stream_statuses("users").await,
        vec![
            StreamStatus::Started,
            StreamStatus::Running,
            StreamStatus::Complete
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_reports_unfinished_streams_as_incomplete_test() {
    init_test_tracing();

    let stream: Arc<dyn SourceStream> =
        Arc::new(TestStream::new("users").with_stalled_partition(vec![json!({"id": "1"})]));
    let sink = MemorySink::new();

    let mut pipeline = create_pipeline(8, vec![stream], sink.clone());
    pipeline.start().await.unwrap();

    // Wait until the stalled partition has demonstrably been picked up.
    timeout(Duration::from_secs(5), async {
        while sink.records().await.is_empty() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("the stalled partition should produce its first record");

    pipeline.shutdown_and_wait().await.unwrap();

    let statuses = sink.stream_statuses("users").await;
    assert!(statuses.contains(&StreamStatus::Incomplete));
    assert!(!statuses.contains(&StreamStatus::Complete));
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_pipeline_completes_without_output_test() {
    init_test_tracing();

    let sink = MemorySink::new();
    let mut pipeline = create_pipeline(9, vec![], sink.clone());
    pipeline.start().await.unwrap();
    pipeline.wait().await.unwrap();

    assert!(sink.messages().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn slice_logging_surfaces_slices_in_output_test() {
    init_test_tracing();

    let stream: Arc<dyn SourceStream> =
        Arc::new(TestStream::new("users").with_partition(vec![json!({"id": "1"})]));
    let sink = MemorySink::new();

    let mut pipeline = create_pipeline_with_config(
        vec![stream],
        sink.clone(),
        PipelineConfig {
            id: 10,
            log_slices: true,
            ..Default::default()
        },
    );
    pipeline.start().await.unwrap();
    pipeline.wait().await.unwrap();

    let messages = sink.messages().await;
    assert!(messages.contains(&SourceMessage::log(
        LogLevel::Info,
        r#"slice:{"partition":0}"#
    )));
}
