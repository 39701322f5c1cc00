//! Parallel two-stage high-pass filtering of video frames.
//!
//! A single producer reads frames from a [`source::FrameSource`], a fixed pool
//! of workers runs the [`filter::FilterChain`] on each one, and the results land
//! in a [`pipeline::store::ResultStore`] that is read back in frame order for
//! display or re-encoding.

pub mod config;
pub mod error;
pub mod filter;
pub mod image;
pub mod output;
pub mod pipeline;
pub mod source;

pub use config::{FailurePolicy, PipelineConfig};
pub use error::PipelineError;
pub use filter::{FilterChain, FrameFilter, Kernel};
pub use image::Image;
pub use pipeline::{Pipeline, PipelineRun};
pub use source::{FrameSource, VideoSource};
