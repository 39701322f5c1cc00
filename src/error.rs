//! Typed errors of the frame pipeline.
//!
//! Library code returns these; the binary wraps them in `anyhow` with context.

use thiserror::Error;

/// Reasons a frame cannot go through the filter chain.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("unsupported channel count {0}, expected 1 to 4")]
    Channels(u8),

    #[error("image buffer holds {actual} bytes, {width}x{height}x{channels} needs {expected}")]
    BufferSize {
        width: u32,
        height: u32,
        channels: u8,
        expected: usize,
        actual: usize,
    },

    #[error("kernel must be square with an odd side, got {len} weights for side {side}")]
    KernelShape { side: usize, len: usize },
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("work queue is closed")]
    Closed,

    #[error("work queue wait cancelled")]
    Cancelled,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    #[error("frame {0} is already in the result store")]
    DuplicateIndex(u64),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid pipeline config: {0}")]
    Config(&'static str),

    #[error("reading frame {index} from source failed")]
    Source {
        index: u64,
        #[source]
        source: anyhow::Error,
    },

    #[error("filter chain failed on frame {index}")]
    Filter {
        index: u64,
        #[source]
        source: FilterError,
    },

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("worker task failed: {0}")]
    Worker(String),

    #[error("pipeline cancelled")]
    Cancelled,
}
