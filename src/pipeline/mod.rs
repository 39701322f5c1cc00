//! Concurrent frame pipeline: one producer, a fixed worker pool, one result store.
//!
//! Data Flow:
//! ```text
//!                                ┌─► worker 0 ─┐
//! FrameSource ─► producer ─► WorkQueue ─► ...  ├─► ResultStore ─► into_ordered()
//!                                └─► worker N ─┘
//! ```
//!
//! Shutdown:
//! 1. The producer exhausts the source and closes the queue.
//! 2. Each worker drains what is left and exits on `Pop::Done`.
//! 3. The orchestrator joins every worker before handing the store out.
//!
//! A worker abort or `Pipeline::cancel` trips the run's cancellation token;
//! blocked workers and a producer waiting on a full queue observe it within
//! one wait slice.

use std::{
    fmt::{Display, Formatter},
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::{
    config::PipelineConfig,
    error::{PipelineError, QueueError},
    filter::FrameFilter,
    source::FrameSource,
};

pub mod queue;
pub mod store;
pub mod worker;

use queue::{FrameItem, WorkQueue};
use store::{ProcessedFrame, ResultStore};
use worker::{WorkerContext, WorkerReport};

/// Owns the configuration and filter chain; each `run` builds a fresh queue,
/// store and worker group.
pub struct Pipeline {
    config: PipelineConfig,
    chain: Arc<dyn FrameFilter>,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, chain: impl FrameFilter) -> Self {
        Self {
            config,
            chain: Arc::new(chain),
            cancel: CancellationToken::new(),
        }
    }

    /// Aborts the current and any future run.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token that cancels this pipeline, e.g. from a signal handler.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Reads `source` to exhaustion through the worker pool and returns the
    /// drained results once every worker has been joined.
    pub async fn run<S: FrameSource>(&self, source: S) -> Result<PipelineRun, PipelineError> {
        let start = Instant::now();
        let cancel = self.cancel.child_token();
        let queue = Arc::new(WorkQueue::new(self.config.queue_capacity, cancel.clone()));
        let store = Arc::new(ResultStore::new());

        let mut workers = JoinSet::new();
        for worker_id in 0..self.config.workers {
            let ctx = WorkerContext {
                queue: Arc::clone(&queue),
                store: Arc::clone(&store),
                chain: Arc::clone(&self.chain),
                cancel: cancel.clone(),
                policy: self.config.failure_policy,
            };
            workers.spawn_blocking(move || worker::run_worker(worker_id, ctx));
        }
        log::info!(
            "pipeline: {} workers, queue {}",
            self.config.workers,
            match queue.capacity() {
                Some(capacity) => format!("bounded to {}", capacity),
                None => "unbounded".to_string(),
            }
        );

        let declared_frames = source.len_hint();
        if let Some(declared) = declared_frames {
            log::info!("pipeline: source declares {} frames", declared);
        }

        let producer = {
            let queue = Arc::clone(&queue);
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || produce(source, &queue, &cancel))
        };
        let produced = match producer.await {
            Ok(result) => result,
            Err(e) => Err(PipelineError::Worker(format!("producer: {}", e))),
        };
        // producer closes the queue itself; repeat in case its task panicked
        queue.mark_producer_done();
        if produced.is_err() {
            cancel.cancel();
        }

        let mut reports = Vec::with_capacity(self.config.workers);
        let mut worker_error = None;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Ok(report)) => reports.push(report),
                Ok(Err(e)) => {
                    worker_error.get_or_insert(e);
                }
                Err(e) => {
                    log::error!("pipeline: worker task failed: {}", e);
                    cancel.cancel();
                    worker_error.get_or_insert(PipelineError::Worker(e.to_string()));
                }
            }
        }

        if let Some(e) = worker_error {
            return Err(e);
        }
        let frames_read = produced?;
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        reports.sort_by_key(|r| r.worker_id);
        drop(queue);
        let store = Arc::try_unwrap(store)
            .map_err(|_| PipelineError::Worker("result store still shared after drain".into()))?;

        let run = PipelineRun {
            frames_read,
            declared_frames,
            elapsed: start.elapsed(),
            workers: reports,
            store,
        };
        log::info!("pipeline: {} in {:.3}s", run.summary(), run.elapsed.as_secs_f64());
        Ok(run)
    }
}

/// Producer loop. Always closes the queue before returning.
fn produce<S: FrameSource>(
    mut source: S,
    queue: &WorkQueue,
    cancel: &CancellationToken,
) -> Result<u64, PipelineError> {
    let mut index = 0u64;
    let result = loop {
        if cancel.is_cancelled() {
            break Err(PipelineError::Cancelled);
        }
        match source.next_frame() {
            Ok(Some(raw)) => match queue.push(FrameItem { index, raw }) {
                Ok(()) => index += 1,
                Err(QueueError::Cancelled) => break Err(PipelineError::Cancelled),
                Err(e) => break Err(e.into()),
            },
            Ok(None) => {
                log::debug!("producer: source exhausted after {} frames", index);
                break Ok(index);
            }
            Err(e) => {
                log::error!("producer: reading frame {} failed: {:#}", index, e);
                cancel.cancel();
                break Err(PipelineError::Source { index, source: e });
            }
        }
    };

    queue.mark_producer_done();
    result
}

/// Outcome of a drained run.
#[derive(Debug)]
pub struct PipelineRun {
    frames_read: u64,
    declared_frames: Option<u64>,
    elapsed: Duration,
    workers: Vec<WorkerReport>,
    store: ResultStore,
}

impl PipelineRun {
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Frame count the source announced up front, when it knows one.
    pub fn declared_frames(&self) -> Option<u64> {
        self.declared_frames
    }

    /// Wall-clock time from worker spawn to the last join.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn workers(&self) -> &[WorkerReport] {
        &self.workers
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    pub fn processed(&self) -> u64 {
        self.store.len() as u64
    }

    /// Frames the filter chain rejected, ascending.
    pub fn failed(&self) -> Vec<u64> {
        let mut failed: Vec<u64> = self
            .workers
            .iter()
            .flat_map(|w| w.failed.iter().copied())
            .collect();
        failed.sort_unstable();
        failed
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            total: self.frames_read,
            processed: self.processed(),
            missing: self.store.missing(self.frames_read),
        }
    }

    /// Processed frames in sequence order.
    pub fn into_frames(self) -> Vec<ProcessedFrame> {
        self.store.into_ordered()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub total: u64,
    pub processed: u64,
    pub missing: Vec<u64>,
}

impl RunSummary {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.processed == self.total
    }
}

impl Display for RunSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "Processed {} of {} frames", self.processed, self.total)?;
        if !self.missing.is_empty() {
            write!(f, " (missing: {:?})", self.missing)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "pipe_test.rs"]
mod pipe_test;
