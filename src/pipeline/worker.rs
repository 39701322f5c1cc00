use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    config::FailurePolicy,
    error::PipelineError,
    filter::FrameFilter,
    pipeline::{
        queue::{Pop, WorkQueue},
        store::{ProcessedFrame, ResultStore},
    },
};

/// What one worker did during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub processed: u64,
    /// Frames the filter chain rejected under [`FailurePolicy::Skip`].
    pub failed: Vec<u64>,
}

/// Shared handles a worker needs; cloned once per spawned worker.
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub queue: Arc<WorkQueue>,
    pub store: Arc<ResultStore>,
    pub chain: Arc<dyn FrameFilter>,
    pub cancel: CancellationToken,
    pub policy: FailurePolicy,
}

/// Worker loop: pop, filter with no lock held, insert, repeat until the queue
/// reports no more work.
pub(crate) fn run_worker(
    worker_id: usize,
    ctx: WorkerContext,
) -> Result<WorkerReport, PipelineError> {
    let mut report = WorkerReport {
        worker_id,
        ..Default::default()
    };
    log::trace!("worker {}: started", worker_id);
    // trips the run if this worker unwinds, so a producer blocked on a full
    // queue is released
    let panic_guard = ctx.cancel.clone().drop_guard();

    loop {
        let item = match ctx.queue.pop() {
            Pop::Item(item) => item,
            Pop::Done => {
                log::debug!("worker {}: no more work after {} frames", worker_id, report.processed);
                break;
            }
            Pop::Cancelled => {
                log::debug!("worker {}: cancelled after {} frames", worker_id, report.processed);
                break;
            }
        };

        let index = item.index;
        match ctx.chain.apply(&item.raw) {
            Ok((stage1, stage2)) => {
                let frame = ProcessedFrame {
                    index,
                    original: item.raw,
                    stage1,
                    stage2,
                };
                if let Err(e) = ctx.store.insert(frame) {
                    log::error!("worker {}: {}", worker_id, e);
                    ctx.cancel.cancel();
                    return Err(e.into());
                }
                report.processed += 1;
                log::trace!("worker {}: frame {} done", worker_id, index);
            }
            Err(e) => {
                log::error!("worker {}: filter failed on frame {}: {}", worker_id, index, e);
                report.failed.push(index);
                match ctx.policy {
                    FailurePolicy::Skip => continue,
                    FailurePolicy::Abort => {
                        ctx.cancel.cancel();
                        return Err(PipelineError::Filter { index, source: e });
                    }
                }
            }
        }
    }

    panic_guard.disarm();
    Ok(report)
}
