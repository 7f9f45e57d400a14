//! Dispatcher - fixed worker pool over a bounded FIFO queue
//!
//! `W` long-lived tokio tasks share one receiver. Submission never blocks:
//! a full queue fails immediately with [`ConvertError::QueueFull`] and the
//! dispatcher never retries. Every accepted request is answered exactly
//! once on its own oneshot channel, surfaced to the caller as a [`Ticket`].
//!
//! Request lifecycle: `Queued → InProgress → Completed | Failed`.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::convert::{ConversionOutput, Converter};
use crate::error::{ConvertError, Result};
use crate::util::constants::{DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS};

/// Pool dimensions, fixed for the dispatcher's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl DispatcherConfig {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(ConvertError::Config {
                reason: "dispatcher needs at least one worker".to_string(),
            });
        }
        if self.queue_capacity == 0 {
            return Err(ConvertError::Config {
                reason: "queue capacity must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Queued,
    InProgress,
    Completed,
    Failed,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RequestState::Queued => "queued",
            RequestState::InProgress => "in_progress",
            RequestState::Completed => "completed",
            RequestState::Failed => "failed",
        })
    }
}

/// Point-in-time counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    pub queued: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
    pub rejected: usize,
}

#[derive(Default)]
struct Counters {
    queued: AtomicUsize,
    in_progress: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    rejected: AtomicUsize,
}

impl Counters {
    fn snapshot(&self) -> DispatcherStats {
        DispatcherStats {
            queued: self.queued.load(Ordering::Relaxed),
            in_progress: self.in_progress.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

struct ConversionRequest {
    id: u64,
    source: Vec<u8>,
    reply: oneshot::Sender<Result<ConversionOutput>>,
}

/// Completion handle for one accepted request.
///
/// Awaiting it yields the conversion result. Callers wanting a deadline
/// race it against their own timer; dropping it does not cancel the work.
#[derive(Debug)]
pub struct Ticket {
    id: u64,
    receiver: oneshot::Receiver<Result<ConversionOutput>>,
}

impl Ticket {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Future for Ticket {
    type Output = Result<ConversionOutput>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let id = self.id;
        Pin::new(&mut self.receiver).poll(cx).map(|reply| {
            reply.unwrap_or_else(|_| {
                Err(ConvertError::Internal {
                    reason: format!("request {id} was dropped without a result"),
                })
            })
        })
    }
}

pub struct Dispatcher {
    sender: mpsc::Sender<ConversionRequest>,
    workers: Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
    next_id: AtomicU64,
    config: DispatcherConfig,
}

impl Dispatcher {
    /// Spawn the worker pool. Must be called inside a tokio runtime.
    pub fn start(config: DispatcherConfig, converter: Arc<Converter>) -> Result<Self> {
        config.validate()?;

        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let receiver = Arc::new(Mutex::new(receiver));
        let counters = Arc::new(Counters::default());

        let workers = (0..config.workers)
            .map(|worker| {
                tokio::spawn(worker_loop(
                    worker,
                    Arc::clone(&receiver),
                    Arc::clone(&converter),
                    Arc::clone(&counters),
                ))
            })
            .collect();

        info!(
            workers = config.workers,
            queue_capacity = config.queue_capacity,
            "dispatcher started"
        );

        Ok(Self {
            sender,
            workers,
            counters,
            next_id: AtomicU64::new(1),
            config,
        })
    }

    pub fn config(&self) -> DispatcherConfig {
        self.config
    }

    /// Enqueue a conversion without waiting for queue space
    pub fn submit(&self, source: impl Into<Vec<u8>>) -> Result<Ticket> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply, receiver) = oneshot::channel();
        let request = ConversionRequest {
            id,
            source: source.into(),
            reply,
        };

        self.counters.queued.fetch_add(1, Ordering::Relaxed);
        match self.sender.try_send(request) {
            Ok(()) => {
                debug!(request = id, state = %RequestState::Queued, "request accepted");
                Ok(Ticket { id, receiver })
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.counters.queued.fetch_sub(1, Ordering::Relaxed);
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(request = id, capacity = self.config.queue_capacity, "queue full, request rejected");
                Err(ConvertError::QueueFull {
                    capacity: self.config.queue_capacity,
                })
            }
            // Only reachable once the runtime has dropped every worker
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.counters.queued.fetch_sub(1, Ordering::Relaxed);
                warn!(request = id, "no workers left, request rejected");
                Err(ConvertError::Internal {
                    reason: "worker pool is no longer running".to_string(),
                })
            }
        }
    }

    /// Submit and wait for the result
    pub async fn convert(&self, source: impl Into<Vec<u8>>) -> Result<ConversionOutput> {
        self.submit(source)?.await
    }

    pub fn stats(&self) -> DispatcherStats {
        self.counters.snapshot()
    }

    /// Stop accepting work, let workers drain the queue, then join them
    pub async fn shutdown(self) {
        let Self {
            sender,
            workers,
            counters,
            ..
        } = self;
        drop(sender);

        for handle in workers {
            if let Err(e) = handle.await {
                warn!(error = %e, "worker task ended abnormally");
            }
        }
        let stats = counters.snapshot();
        info!(
            completed = stats.completed,
            failed = stats.failed,
            rejected = stats.rejected,
            "dispatcher stopped"
        );
    }
}

async fn worker_loop(
    worker: usize,
    receiver: Arc<Mutex<mpsc::Receiver<ConversionRequest>>>,
    converter: Arc<Converter>,
    counters: Arc<Counters>,
) {
    loop {
        // Lock only while waiting for the next request
        let next = receiver.lock().await.recv().await;
        let Some(ConversionRequest { id, source, reply }) = next else {
            break;
        };

        counters.queued.fetch_sub(1, Ordering::Relaxed);
        counters.in_progress.fetch_add(1, Ordering::Relaxed);
        debug!(request = id, worker, state = %RequestState::InProgress, "request started");

        let result = AssertUnwindSafe(converter.convert(&source))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(ConvertError::Internal {
                    reason: format!("worker panicked: {}", panic_message(panic.as_ref())),
                })
            });

        counters.in_progress.fetch_sub(1, Ordering::Relaxed);
        match &result {
            Ok(_) => {
                counters.completed.fetch_add(1, Ordering::Relaxed);
                debug!(request = id, worker, state = %RequestState::Completed, "request finished");
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                debug!(request = id, worker, state = %RequestState::Failed, error = %e, "request finished");
            }
        }

        if reply.send(result).is_err() {
            debug!(request = id, "submitter went away before the result");
        }
    }
    debug!(worker, "worker stopped");
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
