use std::path::Path;

use ffmpeg_next::{Rational, format::Pixel};

use crate::{
    encoder::{Encoder, Settings},
    frame::RgbFrame,
    output::AvOutput,
};

/// Codec and timing of a written video. Size comes from the frames.
#[derive(Debug, Clone)]
pub struct WriterSettings {
    pub codec: String,
    pub pixel_format: Pixel,
    pub frame_rate: Rational,
}

impl Default for WriterSettings {
    /// Motion JPEG (`MJPG` fourcc in AVI) at 25 fps.
    fn default() -> Self {
        Self {
            codec: "mjpeg".to_string(),
            pixel_format: Pixel::YUVJ420P,
            frame_rate: Rational::new(25, 1),
        }
    }
}

/// Encodes a sequence of equally sized RGB frames into a video file.
pub struct VideoWriter {
    output: AvOutput,
    encoder: Encoder,
    stream_index: usize,
    packets_written: u64,
}

impl VideoWriter {
    pub fn open(
        path: impl AsRef<Path>,
        width: u32,
        height: u32,
        settings: WriterSettings,
    ) -> anyhow::Result<Self> {
        let mut output = AvOutput::open(path)?;
        let encoder = Encoder::new(
            Settings {
                width,
                height,
                codec: settings.codec,
                pixel_format: settings.pixel_format,
                frame_rate: settings.frame_rate,
                global_header: output.needs_global_header(),
            },
            None,
        )?;
        let stream_index = output.add_stream(&encoder)?;
        log::info!(
            "writing {}x{} video to {}",
            width,
            height,
            output.path().display()
        );

        Ok(Self {
            output,
            encoder,
            stream_index,
            packets_written: 0,
        })
    }

    pub fn write(&mut self, frame: &RgbFrame) -> anyhow::Result<()> {
        self.encoder.send_frame(frame)?;
        self.drain()
    }

    /// Flushes the encoder and writes the trailer. Returns the number of frames encoded.
    pub fn finish(mut self) -> anyhow::Result<u64> {
        self.encoder.send_eof()?;
        self.drain()?;
        self.output.finish()?;
        log::debug!(
            "{}: {} frames, {} packets",
            self.output.path().display(),
            self.encoder.frames_sent(),
            self.packets_written
        );
        Ok(self.encoder.frames_sent().max(0) as u64)
    }

    fn drain(&mut self) -> anyhow::Result<()> {
        while let Some(packet) = self.encoder.receive_packet()? {
            self.output.write_packet(self.stream_index, packet)?;
            self.packets_written += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "writer_test.rs"]
mod writer_test;
