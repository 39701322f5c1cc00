use std::path::PathBuf;

use clap::Parser;
use video_filter::{
    FailurePolicy, PipelineConfig, PipelineError, output::encode::DEFAULT_OUTPUT_PATH,
};

/// Token that turns on the display windows.
const SHOW_TOKEN: &str = "show";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Runs a two-stage high-pass filter over every frame of a video",
    long_about = None
)]
pub struct Args {
    /// Path to the input video
    pub video: PathBuf,

    /// `show` to display the processed frames; any other value runs headless
    pub mode: Option<String>,

    /// Number of filter worker threads (default 2)
    pub threads: Option<usize>,

    /// Where the stage-2 video is written
    #[arg(long, default_value = DEFAULT_OUTPUT_PATH)]
    pub output: PathBuf,

    /// Skip writing the output video
    #[arg(long, default_value_t = false)]
    pub no_encode: bool,

    /// Bound the work queue to this many frames (0 = unbounded)
    #[arg(long, default_value_t = 0)]
    pub queue_capacity: usize,

    /// What to do when a frame cannot be filtered
    #[arg(long, value_enum, default_value_t = FailurePolicy::Abort)]
    pub on_error: FailurePolicy,
}

impl Args {
    pub fn show(&self) -> bool {
        self.mode.as_deref() == Some(SHOW_TOKEN)
    }

    pub fn pipeline_config(&self) -> Result<PipelineConfig, PipelineError> {
        let mut builder = PipelineConfig::builder()
            .queue_capacity(self.queue_capacity)
            .failure_policy(self.on_error);
        if let Some(threads) = self.threads {
            builder = builder.workers(threads);
        }
        builder.build()
    }
}
