// ============================================================================
// Pipeline Tests
// ============================================================================

use std::{collections::HashSet, time::Duration};

use super::{Pipeline, PipelineRun};
use crate::{
    config::{FailurePolicy, PipelineConfig},
    error::{FilterError, PipelineError},
    filter::{FilterChain, FrameFilter, convolve},
    image::Image,
    source::{FrameSource, IterSource},
};

const RUN_TIMEOUT: Duration = Duration::from_secs(30);

/// Deterministic, non-flat RGB frame so the high-pass stages produce real output.
fn synthetic_frame(index: u64) -> Image {
    Image::from_fn(24, 16, 3, |x, y, c| {
        let v = (x * 13 + y * 7 + c as u32 * 31) as u64 + index * 17;
        if (x + y + index as u32) % 5 == 0 { 255 } else { (v % 200) as u8 }
    })
    .unwrap()
}

fn synthetic_source(frames: u64) -> impl FrameSource {
    IterSource::new((0..frames).map(synthetic_frame).collect::<Vec<_>>())
}

/// Source that hands over a malformed buffer at `bad_index`.
fn source_with_bad_frame(frames: u64, bad_index: u64) -> impl FrameSource {
    IterSource::new(
        (0..frames)
            .map(|i| {
                if i == bad_index {
                    Image::from_raw(24, 16, 3, vec![0u8; 10])
                } else {
                    synthetic_frame(i)
                }
            })
            .collect::<Vec<_>>(),
    )
}

/// Source whose read fails at `fail_at`.
struct FailingSource {
    next: u64,
    fail_at: u64,
}

impl FrameSource for FailingSource {
    fn next_frame(&mut self) -> anyhow::Result<Option<Image>> {
        if self.next == self.fail_at {
            anyhow::bail!("decoder error");
        }
        self.next += 1;
        Ok(Some(synthetic_frame(self.next - 1)))
    }
}

/// Filter that panics on frames of width `PANIC_WIDTH`, standing in for a bug
/// inside the per-frame work.
struct PanicOnWidth;

const PANIC_WIDTH: u32 = 13;

impl FrameFilter for PanicOnWidth {
    fn apply(&self, image: &Image) -> Result<(Image, Image), FilterError> {
        if image.width() == PANIC_WIDTH {
            panic!("filter blew up on a {}-wide frame", PANIC_WIDTH);
        }
        FilterChain::default().apply(image)
    }
}

/// Source with one `PANIC_WIDTH`-wide frame at `panic_index`.
fn source_with_panicking_frame(frames: u64, panic_index: u64) -> impl FrameSource {
    IterSource::new(
        (0..frames)
            .map(|i| {
                if i == panic_index {
                    Image::from_fn(PANIC_WIDTH, 4, 3, |x, y, _| (x + y) as u8).unwrap()
                } else {
                    synthetic_frame(i)
                }
            })
            .collect::<Vec<_>>(),
    )
}

fn config(workers: usize) -> PipelineConfig {
    PipelineConfig::builder().workers(workers).build().unwrap()
}

async fn run_with(
    config: PipelineConfig,
    source: impl FrameSource,
) -> Result<PipelineRun, PipelineError> {
    let pipeline = Pipeline::new(config, FilterChain::default());
    tokio::time::timeout(RUN_TIMEOUT, pipeline.run(source))
        .await
        .expect("pipeline did not drain in time")
}

fn assert_complete(run: &PipelineRun, frames: u64) {
    assert_eq!(run.frames_read(), frames);
    assert_eq!(run.store().indices(), (0..frames).collect::<Vec<_>>());
    assert!(run.summary().is_complete());
    // exactly-once: insert counts add up to the number of frames
    let processed: u64 = run.workers().iter().map(|w| w.processed).sum();
    assert_eq!(processed, frames);
}

// ------------------------------------------------------------------------
// Scenarios
// ------------------------------------------------------------------------

#[tokio::test]
async fn test_five_frames_two_workers() {
    let run = run_with(config(2), synthetic_source(5)).await.unwrap();
    assert_complete(&run, 5);
    assert_eq!(run.workers().len(), 2);
    assert_eq!(run.store().len(), 5);
}

#[tokio::test]
async fn test_single_frame_stage2_from_stage1() {
    let raw = synthetic_frame(0);
    let run = run_with(config(1), IterSource::new(vec![raw.clone()]))
        .await
        .unwrap();
    assert_complete(&run, 1);

    let chain = FilterChain::default();
    let frames = run.into_frames();
    assert_eq!(frames.len(), 1);
    let frame = &frames[0];
    assert_eq!(frame.index, 0);
    assert_eq!(frame.original, raw);
    assert_eq!(frame.stage1, convolve(&raw, chain.stage1()).unwrap());
    assert_eq!(frame.stage2, convolve(&frame.stage1, chain.stage2()).unwrap());
    assert_ne!(frame.stage2, convolve(&raw, chain.stage2()).unwrap());
    assert_ne!(frame.stage1, frame.stage2);
}

#[tokio::test]
async fn test_empty_source_terminates_cleanly() {
    let run = run_with(config(3), synthetic_source(0)).await.unwrap();
    assert_eq!(run.frames_read(), 0);
    assert!(run.store().is_empty());
    assert_eq!(run.workers().len(), 3);
    assert!(run.workers().iter().all(|w| w.processed == 0));
    assert!(run.summary().is_complete());
}

#[tokio::test]
async fn test_more_workers_than_frames() {
    let run = run_with(config(8), synthetic_source(3)).await.unwrap();
    assert_complete(&run, 3);
    assert_eq!(run.workers().len(), 8);
    let idle = run.workers().iter().filter(|w| w.processed == 0).count();
    assert!(idle >= 5, "{} idle workers", idle);
}

// ------------------------------------------------------------------------
// Properties
// ------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_worker_count_does_not_change_results() {
    let baseline = run_with(config(1), synthetic_source(24))
        .await
        .unwrap()
        .into_frames();

    for workers in [2, 4, 7] {
        let frames = run_with(config(workers), synthetic_source(24))
            .await
            .unwrap()
            .into_frames();
        assert_eq!(frames, baseline, "{} workers", workers);
    }
}

#[tokio::test]
async fn test_ordered_frames_follow_source_order() {
    let frames = run_with(config(4), synthetic_source(12))
        .await
        .unwrap()
        .into_frames();
    for (i, frame) in frames.iter().enumerate() {
        assert_eq!(frame.index, i as u64);
        assert_eq!(frame.original, synthetic_frame(i as u64));
    }
}

#[tokio::test]
async fn test_bounded_queue_drains_every_frame() {
    let config = PipelineConfig::builder()
        .workers(3)
        .queue_capacity(1)
        .build()
        .unwrap();
    let run = run_with(config, synthetic_source(20)).await.unwrap();
    assert_complete(&run, 20);
}

// ------------------------------------------------------------------------
// Failures
// ------------------------------------------------------------------------

#[tokio::test]
async fn test_skip_policy_leaves_reported_gap() {
    let config = PipelineConfig::builder()
        .workers(2)
        .failure_policy(FailurePolicy::Skip)
        .build()
        .unwrap();
    let run = run_with(config, source_with_bad_frame(5, 2)).await.unwrap();

    assert_eq!(run.frames_read(), 5);
    assert_eq!(run.processed(), 4);
    assert_eq!(run.failed(), vec![2]);
    let summary = run.summary();
    assert_eq!(summary.missing, vec![2]);
    assert!(!summary.is_complete());
    assert_eq!(summary.to_string(), "Processed 4 of 5 frames (missing: [2])");
}

#[tokio::test]
async fn test_abort_policy_names_failing_frame() {
    for capacity in [0, 1] {
        let config = PipelineConfig::builder()
            .workers(2)
            .queue_capacity(capacity)
            .build()
            .unwrap();
        let err = run_with(config, source_with_bad_frame(40, 3))
            .await
            .unwrap_err();
        match err {
            PipelineError::Filter { index, source } => {
                assert_eq!(index, 3);
                assert!(matches!(source, FilterError::BufferSize { .. }));
            }
            other => panic!("expected filter error, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_worker_panic_releases_bounded_producer() {
    for workers in [1, 2] {
        let config = PipelineConfig::builder()
            .workers(workers)
            .queue_capacity(1)
            .build()
            .unwrap();
        let pipeline = Pipeline::new(config, PanicOnWidth);
        let source = source_with_panicking_frame(50, 3);
        let err = tokio::time::timeout(RUN_TIMEOUT, pipeline.run(source))
            .await
            .expect("run hung after a worker panicked")
            .unwrap_err();
        assert!(matches!(err, PipelineError::Worker(_)), "got {:?}", err);
        // the panic cancels only that run
        assert!(!pipeline.is_cancelled());
    }
}

#[tokio::test]
async fn test_pipeline_runs_again_after_worker_panic() {
    let config = PipelineConfig::builder().workers(1).queue_capacity(1).build().unwrap();
    let pipeline = Pipeline::new(config, PanicOnWidth);
    let source = source_with_panicking_frame(20, 0);
    let first = tokio::time::timeout(RUN_TIMEOUT, pipeline.run(source))
        .await
        .expect("run hung after a worker panicked");
    assert!(first.is_err());

    let second = tokio::time::timeout(RUN_TIMEOUT, pipeline.run(synthetic_source(5)))
        .await
        .expect("second run hung")
        .unwrap();
    assert_complete(&second, 5);
}

#[tokio::test]
async fn test_run_reports_declared_frame_count() {
    let run = run_with(config(2), synthetic_source(5)).await.unwrap();
    assert_eq!(run.declared_frames(), Some(5));

    // a filtered iterator cannot say how many frames it will yield
    let unsized_source = IterSource::new((0..3).map(synthetic_frame).filter(|_| true));
    let run = run_with(config(2), unsized_source).await.unwrap();
    assert_eq!(run.declared_frames(), None);
    assert_complete(&run, 3);
}

#[tokio::test]
async fn test_source_error_stops_run() {
    let err = run_with(config(2), FailingSource { next: 0, fail_at: 3 })
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Source { index: 3, .. }));
}

#[tokio::test]
async fn test_cancelled_pipeline_does_not_run() {
    let pipeline = Pipeline::new(config(2), FilterChain::default());
    pipeline.cancel();
    assert!(pipeline.is_cancelled());
    let err = tokio::time::timeout(RUN_TIMEOUT, pipeline.run(synthetic_source(10)))
        .await
        .expect("cancelled run hung")
        .unwrap_err();
    assert!(matches!(err, PipelineError::Cancelled));
}

#[tokio::test]
async fn test_pipeline_can_run_twice() {
    let pipeline = Pipeline::new(config(2), FilterChain::default());
    let first = pipeline.run(synthetic_source(4)).await.unwrap();
    // a finished run leaves the pipeline token alone
    assert!(!pipeline.is_cancelled());
    let second = pipeline.run(synthetic_source(6)).await.unwrap();
    assert_complete(&first, 4);
    assert_complete(&second, 6);

    let seen: HashSet<u64> = second.store().indices().into_iter().collect();
    assert_eq!(seen.len(), 6);
}

#[test]
fn test_summary_display() {
    let summary = super::RunSummary {
        total: 3,
        processed: 3,
        missing: vec![],
    };
    assert_eq!(summary.to_string(), "Processed 3 of 3 frames");
}
