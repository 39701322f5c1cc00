use std::path::Path;

use anyhow::Context;
use ffmpeg_io::{Rational, RgbFrame, VideoWriter, WriterSettings};

use crate::{image::Image, pipeline::store::ProcessedFrame};

pub const DEFAULT_OUTPUT_PATH: &str = "out/output_video.avi";

/// Four-character code of the written stream; FFmpeg's `mjpeg` encoder in AVI.
pub const OUTPUT_FOURCC: &str = "MJPG";
const OUTPUT_CODEC: &str = "mjpeg";

/// Re-encodes the stage-2 output of `frames` (already in sequence order) to
/// `path`. Frame size comes from the first frame. Returns frames written;
/// nothing is created for an empty run.
pub fn encode_frames(
    path: &Path,
    frames: &[ProcessedFrame],
    frame_rate: Rational,
) -> anyhow::Result<u64> {
    let Some(first) = frames.first() else {
        log::warn!("encode: no frames, {} not written", path.display());
        return Ok(0);
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output directory {}", parent.display()))?;
    }

    let (width, height) = (first.stage2.width(), first.stage2.height());
    let settings = WriterSettings {
        codec: OUTPUT_CODEC.to_string(),
        frame_rate,
        ..Default::default()
    };
    let mut writer = VideoWriter::open(path, width, height, settings)?;
    log::info!(
        "encode: {} frames as {} to {}",
        frames.len(),
        OUTPUT_FOURCC,
        path.display()
    );

    for frame in frames {
        let rgb = to_rgb_frame(&frame.stage2)
            .with_context(|| format!("frame {} cannot be encoded", frame.index))?;
        writer
            .write(&rgb)
            .with_context(|| format!("encode frame {}", frame.index))?;
    }
    writer.finish()
}

fn to_rgb_frame(image: &Image) -> anyhow::Result<RgbFrame> {
    if image.channels() != 3 {
        anyhow::bail!("expected 3 channels, image has {}", image.channels());
    }
    RgbFrame::new(image.width(), image.height(), image.as_bytes().clone())
}
