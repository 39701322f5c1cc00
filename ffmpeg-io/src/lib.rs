//! Blocking FFmpeg helpers for frame-at-a-time video processing.
//!
//! ```text
//! file ──► AvInput ──► Decoder ──► Scaler(RGB24) ──► RgbFrame      (VideoReader)
//! RgbFrame ──► Scaler(YUVJ420P) ──► Encoder ──► AvOutput ──► file  (VideoWriter)
//! ```

/// Registers FFmpeg components and quiets libav logging. Call once at startup.
pub fn init() -> anyhow::Result<()> {
    ffmpeg_next::init().map_err(|e| anyhow::anyhow!("ffmpeg_next init: {}", e))?;
    ffmpeg_next::util::log::set_level(ffmpeg_next::util::log::Level::Error);
    Ok(())
}

pub mod decoder;
pub mod encoder;
pub mod frame;
pub mod input;
pub mod output;
pub mod packet;
pub mod reader;
pub mod scaler;
pub mod stream;
pub mod writer;

pub use ffmpeg_next::Rational;
pub use frame::RgbFrame;
pub use reader::VideoReader;
pub use writer::{VideoWriter, WriterSettings};
