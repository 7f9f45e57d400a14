//! Dispatcher tests: bounded admission, per-request completion, isolation

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use argus::{
    ConfigStore, ConvertError, Converter, Dispatcher, DispatcherConfig, EnvironmentResolver,
    MemoryStore, Result, Status,
};
use async_trait::async_trait;
use tokio::sync::Semaphore;

const GATED_WORKFLOW: &str = "jobs:\n  a:\n    runs-on: gpu\n    steps:\n      - run: echo hi\n";

/// Store whose lookups block until the test opens the gate
struct GatedStore {
    entered: AtomicUsize,
    gate: Semaphore,
}

impl GatedStore {
    fn new() -> Self {
        Self {
            entered: AtomicUsize::new(0),
            gate: Semaphore::new(0),
        }
    }

    fn open(&self) {
        self.gate.add_permits(Semaphore::MAX_PERMITS / 2);
    }

    async fn wait_for_entered(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while self.entered.load(Ordering::SeqCst) < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("workers never became busy");
    }
}

#[async_trait]
impl ConfigStore for GatedStore {
    async fn lookup(&self, _namespace: &str, _key: &str) -> Result<Option<Vec<u8>>> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        let _permit = self.gate.acquire().await.map_err(|e| ConvertError::Internal {
            reason: e.to_string(),
        })?;
        Ok(Some(b"image: cuda:12\n".to_vec()))
    }
}

/// Store that records the order keys are looked up in, behind a gate
struct RecordingStore {
    seen: std::sync::Mutex<Vec<String>>,
    gate: Semaphore,
}

#[async_trait]
impl ConfigStore for RecordingStore {
    async fn lookup(&self, _namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        self.seen.lock().unwrap().push(key.to_string());
        let _permit = self.gate.acquire().await.map_err(|e| ConvertError::Internal {
            reason: e.to_string(),
        })?;
        Ok(None)
    }
}

/// Store that panics on every lookup
struct PanickingStore;

#[async_trait]
impl ConfigStore for PanickingStore {
    async fn lookup(&self, _namespace: &str, _key: &str) -> Result<Option<Vec<u8>>> {
        panic!("store exploded");
    }
}

fn dispatcher(store: Arc<dyn ConfigStore>, workers: usize, queue_capacity: usize) -> Dispatcher {
    let converter = Converter::new(EnvironmentResolver::new(store, "argo"));
    Dispatcher::start(
        DispatcherConfig {
            workers,
            queue_capacity,
        },
        Arc::new(converter),
    )
    .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn full_queue_rejects_and_accepted_requests_complete() {
    const WORKERS: usize = 2;
    const CAPACITY: usize = 3;

    let store = Arc::new(GatedStore::new());
    let dispatcher = dispatcher(store.clone(), WORKERS, CAPACITY);

    // Occupy every worker
    let mut tickets: Vec<_> = (0..WORKERS)
        .map(|_| dispatcher.submit(GATED_WORKFLOW).unwrap())
        .collect();
    store.wait_for_entered(WORKERS).await;

    // C + 1 more while all workers are busy
    let mut rejected = 0;
    for _ in 0..=CAPACITY {
        match dispatcher.submit(GATED_WORKFLOW) {
            Ok(ticket) => tickets.push(ticket),
            Err(e) => {
                assert!(matches!(e, ConvertError::QueueFull { capacity: CAPACITY }));
                assert_eq!(e.status(), Status::Busy);
                rejected += 1;
            }
        }
    }
    assert_eq!(tickets.len(), WORKERS + CAPACITY);
    assert_eq!(rejected, 1);

    let stats = dispatcher.stats();
    assert_eq!(stats.in_progress, WORKERS);
    assert_eq!(stats.queued, CAPACITY);
    assert_eq!(stats.rejected, 1);

    store.open();
    for ticket in tickets {
        let output = tokio::time::timeout(Duration::from_secs(10), ticket)
            .await
            .expect("request never completed")
            .unwrap();
        assert!(output.payload.contains("image: cuda:12"));
    }

    let stats = dispatcher.stats();
    assert_eq!(stats.completed, WORKERS + CAPACITY);
    assert_eq!(stats.in_progress, 0);
    dispatcher.shutdown().await;
}

#[tokio::test]
async fn at_most_w_conversions_run_concurrently() {
    let store = Arc::new(GatedStore::new());
    let dispatcher = dispatcher(store.clone(), 3, 10);

    let tickets: Vec<_> = (0..8)
        .map(|_| dispatcher.submit(GATED_WORKFLOW).unwrap())
        .collect();
    store.wait_for_entered(3).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(store.entered.load(Ordering::SeqCst), 3);

    store.open();
    for ticket in tickets {
        ticket.await.unwrap();
    }
    assert_eq!(store.entered.load(Ordering::SeqCst), 8);
    dispatcher.shutdown().await;
}

#[tokio::test]
async fn queued_requests_run_in_submission_order() {
    const REQUESTS: usize = 6;

    let store = Arc::new(RecordingStore {
        seen: std::sync::Mutex::new(Vec::new()),
        gate: Semaphore::new(0),
    });
    let dispatcher = dispatcher(store.clone(), 1, REQUESTS);

    let tickets: Vec<_> = (0..REQUESTS)
        .map(|i| {
            let source = format!("jobs:\n  a:\n    runs-on: runner-{i}\n");
            dispatcher.submit(source).unwrap()
        })
        .collect();
    store.gate.add_permits(REQUESTS);
    for ticket in tickets {
        ticket.await.unwrap();
    }

    let expected: Vec<String> = (0..REQUESTS).map(|i| format!("runner-{i}.yaml")).collect();
    assert_eq!(*store.seen.lock().unwrap(), expected);
    dispatcher.shutdown().await;
}

#[tokio::test]
async fn long_dependency_chain_converts_on_a_worker() {
    const JOBS: usize = 50_000;

    let mut source = String::from("jobs:\n  j0: {}\n");
    for i in 1..JOBS {
        source.push_str(&format!("  j{i}: {{ needs: j{} }}\n", i - 1));
    }

    let dispatcher = dispatcher(Arc::new(MemoryStore::new()), 1, 1);
    let output = dispatcher.convert(source).await.unwrap();
    assert!(output.payload.contains("name: j49999"));
    assert_eq!(output.warnings.len(), JOBS);

    // The worker is still alive afterwards
    assert!(dispatcher.convert("jobs:\n  a: {}\n").await.is_ok());
    dispatcher.shutdown().await;
}

#[tokio::test]
async fn panic_becomes_internal_error_and_worker_survives() {
    let dispatcher = dispatcher(Arc::new(PanickingStore), 1, 4);

    let err = dispatcher
        .convert("jobs:\n  a:\n    runs-on: gpu\n")
        .await
        .unwrap_err();
    assert!(matches!(err, ConvertError::Internal { ref reason } if reason.contains("store exploded")));
    assert_eq!(err.status(), Status::Failed);

    // Same single worker still serves jobs that never touch the store
    let output = dispatcher.convert("jobs:\n  a: {}\n").await.unwrap();
    assert!(output.payload.contains("image: ubuntu:22.04"));
    dispatcher.shutdown().await;
}

#[tokio::test]
async fn one_failure_does_not_affect_others() {
    let dispatcher = dispatcher(Arc::new(MemoryStore::new()), 2, 8);

    let good = dispatcher.submit("jobs:\n  a: {}\n").unwrap();
    let bad = dispatcher.submit("jobs:\n  a: { needs: b }\n  b: { needs: a }\n").unwrap();
    let also_good = dispatcher.submit("name: X\njobs:\n  b: {}\n").unwrap();

    assert!(good.await.is_ok());
    assert!(bad.await.unwrap_err().is_validation());
    assert!(also_good.await.unwrap().payload.contains("generateName: x-"));

    let stats = dispatcher.stats();
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.failed, 1);
    dispatcher.shutdown().await;
}

#[tokio::test]
async fn shutdown_drains_queued_requests() {
    let store = Arc::new(GatedStore::new());
    let dispatcher = dispatcher(store.clone(), 1, 4);

    let tickets: Vec<_> = (0..4)
        .map(|_| dispatcher.submit(GATED_WORKFLOW).unwrap())
        .collect();
    store.open();
    dispatcher.shutdown().await;

    for ticket in tickets {
        assert!(ticket.await.is_ok());
    }
}

#[tokio::test]
async fn zero_workers_is_rejected() {
    let converter = Converter::new(EnvironmentResolver::new(Arc::new(MemoryStore::new()), "argo"));
    let err = Dispatcher::start(
        DispatcherConfig {
            workers: 0,
            queue_capacity: 1,
        },
        Arc::new(converter),
    )
    .err()
    .unwrap();
    assert!(matches!(err, ConvertError::Config { .. }));
}
