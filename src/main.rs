use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use video_filter::{
    FilterChain, Pipeline, VideoSource,
    output::{display, encode},
};

mod args;

use args::Args;

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_module("ffmpeg_next", log::LevelFilter::Warn)
        .init();
}

#[tokio::main]
async fn main() {
    init_logging();
    let args = Args::parse();

    if let Err(e) = run(args).await {
        log::error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = args.pipeline_config()?;
    ffmpeg_io::init()?;

    let source = VideoSource::open(&args.video)
        .with_context(|| format!("Error opening video stream or file {}", args.video.display()))?;
    let frame_rate = source.frame_rate();

    let pipeline = Pipeline::new(config, FilterChain::default());
    let cancel = pipeline.cancel_token();
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("ctrl+c received, cancelling");
            cancel.cancel();
        }
    });

    let run = pipeline.run(source).await;
    signal.abort();
    let run = run?;
    println!(
        "Pipeline execution time: {:.6} seconds",
        run.elapsed().as_secs_f64()
    );
    if let Some(declared) = run.declared_frames() {
        println!("Number of frames: {}", declared);
    }
    let summary = run.summary();
    println!("{}", summary);
    if !summary.is_complete() {
        log::warn!("run finished with gaps, output video skips frames {:?}", summary.missing);
    }
    let frames = Arc::new(run.into_frames());

    if !args.no_encode {
        let frames = Arc::clone(&frames);
        let output = args.output.clone();
        let written = tokio::task::spawn_blocking(move || {
            encode::encode_frames(&output, &frames, frame_rate)
        })
        .await??;
        log::info!("wrote {} frames to {}", written, args.output.display());
    }

    if args.show() {
        // windows stay on the main thread
        display::show_frames(&frames, display::FRAME_DELAY)?;
    }

    Ok(())
}
