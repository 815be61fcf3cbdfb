//! End-to-end tests of the consumer, executor and processor together.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use inventory_listener_adapters::sink::{HostSink, MemorySink, SinkError};
use inventory_listener_adapters::source::ChannelSource;
use inventory_listener_benchmarks::BenchmarkRecorder;
use inventory_listener_core::{request, ChecksumStatus, HostId, StoredHost};
use inventory_listener_pipeline::{run_pipeline, ExecutorConfig};
use mockall::mock;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

mock! {
    pub Sink {}

    #[async_trait]
    impl HostSink for Sink {
        async fn insert(&self, host: StoredHost) -> Result<(), SinkError>;
        async fn get(&self, id: HostId) -> Result<Option<StoredHost>, SinkError>;
        async fn delete_all(&self) -> Result<u64, SinkError>;
    }
}

/// Memory sink whose inserts wait for a permit.
struct GatedSink {
    inner: MemorySink,
    gate: Semaphore,
}

#[async_trait]
impl HostSink for GatedSink {
    async fn insert(&self, host: StoredHost) -> Result<(), SinkError> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;
        self.inner.insert(host).await
    }

    async fn get(&self, id: HostId) -> Result<Option<StoredHost>, SinkError> {
        self.inner.get(id).await
    }

    async fn delete_all(&self) -> Result<u64, SinkError> {
        self.inner.delete_all().await
    }
}

fn payload(id: HostId, arch: &str, packages: &[&str]) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "id": id,
        "arch": arch,
        "packages": packages,
    }))
    .unwrap()
}

fn recorder(batch_size: usize) -> Arc<BenchmarkRecorder> {
    Arc::new(BenchmarkRecorder::new(NonZeroUsize::new(batch_size).unwrap()))
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_five_messages_are_stored_and_verified() {
    let (sender, source) = ChannelSource::channel("host.packages", 16);
    let sink = Arc::new(MemorySink::new());
    let recorder = recorder(5);

    for id in 1..=5 {
        sender
            .send(payload(
                id,
                "x86_64",
                &["foo-1.0-1.x86_64.rpm", "bar-1:9-123a.ia64.rpm", "baz-2:3.1-4.el8.x86_64"],
            ))
            .await
            .unwrap();
    }
    drop(sender);

    let stats = run_pipeline(
        source,
        ExecutorConfig::new(4, 2),
        sink.clone(),
        recorder.clone(),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(stats.received, 5);
    assert_eq!(stats.submitted, 5);
    assert_eq!(stats.malformed, 0);

    let records = sink.records();
    assert_eq!(records.len(), 5);
    for (host, id) in records.iter().zip(1..=5) {
        assert_eq!(host.id, id);
        assert_eq!(host.verify(), ChecksumStatus::Valid);
        assert_eq!(host.checksum, request::checksum(host.request.as_bytes()));
        assert_eq!(
            host.request,
            r#"{"package_list":["foo-1.0-1.x86_64","baz-2:3.1-4.el8.x86_64"]}"#
        );
    }

    assert_eq!(recorder.reports().len(), 1);
    assert_eq!(recorder.collected(), 0);
}

#[tokio::test]
async fn test_malformed_message_is_skipped() {
    let (sender, source) = ChannelSource::channel("host.packages", 4);
    let sink = Arc::new(MemorySink::new());

    sender
        .send(br#"{"id": 1, "arch": "x86_64"}"#.to_vec())
        .await
        .unwrap();
    sender.send(b"not json at all".to_vec()).await.unwrap();
    sender
        .send(payload(2, "noarch", &["tzdata-2019c-1.el8.noarch.rpm"]))
        .await
        .unwrap();
    drop(sender);

    let stats = run_pipeline(
        source,
        ExecutorConfig::new(2, 1),
        sink.clone(),
        recorder(10),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(stats.received, 3);
    assert_eq!(stats.malformed, 2);
    assert_eq!(stats.submitted, 1);
    assert_eq!(sink.len(), 1);
    assert!(sink.get(2).await.unwrap().is_some());
}

#[tokio::test]
async fn test_sink_failure_does_not_stop_ingestion() {
    let (sender, source) = ChannelSource::channel("host.packages", 4);
    let mut sink = MockSink::new();
    sink.expect_insert()
        .withf(|host| host.id == 1)
        .times(1)
        .returning(|_| Err(SinkError::Unavailable("connection refused".to_string())));
    sink.expect_insert()
        .withf(|host| host.id == 2)
        .times(1)
        .returning(|_| Ok(()));
    let recorder = recorder(10);

    sender.send(payload(1, "x86_64", &[])).await.unwrap();
    sender.send(payload(2, "x86_64", &[])).await.unwrap();
    drop(sender);

    let stats = run_pipeline(
        source,
        ExecutorConfig::new(2, 1),
        Arc::new(sink),
        recorder.clone(),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(stats.submitted, 2);
    // Only the stored report counts towards throughput.
    assert_eq!(recorder.collected(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_full_queue_throttles_source_reads() {
    let (sender, source) = ChannelSource::channel("host.packages", 10);
    let sink = Arc::new(GatedSink {
        inner: MemorySink::new(),
        gate: Semaphore::new(0),
    });

    for id in 1..=5 {
        sender.send(payload(id, "x86_64", &[])).await.unwrap();
    }

    let shutdown = CancellationToken::new();
    let pipeline = tokio::spawn(run_pipeline(
        source,
        ExecutorConfig::new(1, 1),
        sink.clone(),
        recorder(100),
        shutdown.clone(),
    ));

    // One task running, one queued, one blocked in submit: two messages
    // stay unread in the source.
    wait_for(|| sender.capacity() == 8).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(sender.capacity(), 8);
    assert!(sink.inner.is_empty());

    sink.gate.add_permits(100);
    wait_for(|| sink.inner.len() == 5).await;

    shutdown.cancel();
    let stats = pipeline.await.unwrap().unwrap();
    assert_eq!(stats.received, 5);
    assert_eq!(stats.submitted, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_drains_accepted_tasks() {
    let (sender, source) = ChannelSource::channel("host.packages", 4);
    let sink = Arc::new(GatedSink {
        inner: MemorySink::new(),
        gate: Semaphore::new(0),
    });

    sender.send(payload(1, "x86_64", &[])).await.unwrap();
    sender.send(payload(2, "x86_64", &[])).await.unwrap();

    let shutdown = CancellationToken::new();
    let pipeline = tokio::spawn(run_pipeline(
        source,
        ExecutorConfig::new(2, 1),
        sink.clone(),
        recorder(100),
        shutdown.clone(),
    ));

    wait_for(|| sender.capacity() == 4).await;
    shutdown.cancel();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!pipeline.is_finished(), "drain waits for accepted tasks");

    // The loop has stopped pulling: a late message stays in the source.
    sender.send(payload(3, "x86_64", &[])).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(sender.capacity(), 3);

    sink.gate.add_permits(10);
    let stats = pipeline.await.unwrap().unwrap();
    assert_eq!(stats.received, 2);
    assert_eq!(stats.submitted, 2);
    assert_eq!(sink.inner.len(), 2);
    assert!(sink.inner.get(3).await.unwrap().is_none());
}
