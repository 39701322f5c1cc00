use crate::error::PipelineError;

pub const DEFAULT_WORKERS: usize = 2;

/// What a worker does when the filter chain rejects a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FailurePolicy {
    /// Cancel the whole run and report the failing frame.
    #[default]
    Abort,
    /// Log the frame, leave a gap in the results and keep going.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub workers: usize,
    /// `None` keeps the work queue unbounded.
    pub queue_capacity: Option<usize>,
    pub failure_policy: FailurePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: None,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }
}

#[derive(Default)]
pub struct PipelineConfigBuilder {
    workers: Option<usize>,
    queue_capacity: Option<usize>,
    failure_policy: FailurePolicy,
}

impl PipelineConfigBuilder {
    /// Number of filter workers, at least 1.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Bound the work queue; 0 means unbounded.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = (capacity > 0).then_some(capacity);
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        let workers = self.workers.unwrap_or(DEFAULT_WORKERS);
        if workers == 0 {
            return Err(PipelineError::Config("worker count must be at least 1"));
        }
        Ok(PipelineConfig {
            workers,
            queue_capacity: self.queue_capacity,
            failure_policy: self.failure_policy,
        })
    }
}
