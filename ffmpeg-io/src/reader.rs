use std::path::Path;

use ffmpeg_next::{Rational, format::Pixel};

use crate::{decoder::Decoder, frame::RgbFrame, input::AvInput, scaler::Scaler, stream::AvStream};

/// Sequential frame reader: demuxes, decodes and converts every picture of the
/// best video stream to packed RGB24, in presentation order of the decoder.
pub struct VideoReader {
    input: AvInput,
    decoder: Decoder,
    scaler: Option<Scaler>,
    eof_sent: bool,
    frames_read: u64,
}

impl VideoReader {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let input = AvInput::open(path)?;
        let decoder = Decoder::new(input.video_stream())?;
        Ok(Self {
            input,
            decoder,
            scaler: None,
            eof_sent: false,
            frames_read: 0,
        })
    }

    pub fn stream(&self) -> &AvStream {
        self.input.video_stream()
    }

    pub fn width(&self) -> u32 {
        self.decoder.width()
    }

    pub fn height(&self) -> u32 {
        self.decoder.height()
    }

    pub fn frame_rate(&self) -> Option<Rational> {
        self.stream().frame_rate()
    }

    /// Frame count declared by the container; decoders may deliver a different number.
    pub fn frame_count(&self) -> Option<u64> {
        self.stream().frames()
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Returns the next decoded frame, or `None` once the stream and the
    /// decoder's delayed frames are exhausted.
    pub fn read_frame(&mut self) -> anyhow::Result<Option<RgbFrame>> {
        loop {
            if let Some(frame) = self.decoder.receive_frame()? {
                let rgb = self.convert(&frame)?;
                self.frames_read += 1;
                return Ok(Some(rgb));
            }

            if self.eof_sent {
                return Ok(None);
            }

            match self.input.read_video_packet() {
                Some(packet) => {
                    if let Err(e) = self.decoder.send_packet(&packet) {
                        // corrupt packets are dropped, the decoder resyncs on the next keyframe
                        log::warn!(
                            "decode packet (stream {}, pts {:?}) failed: {:#}",
                            self.decoder.stream_index(),
                            packet.pts(),
                            e
                        );
                    }
                }
                None => {
                    log::debug!("end of input after {} frames, flushing decoder", self.frames_read);
                    self.decoder.send_eof()?;
                    self.eof_sent = true;
                }
            }
        }
    }

    fn convert(&mut self, frame: &ffmpeg_next::frame::Video) -> anyhow::Result<RgbFrame> {
        if frame.format() == Pixel::RGB24 {
            return RgbFrame::from_video(frame);
        }

        let stale = self.scaler.as_ref().is_none_or(|s| !s.accepts(frame));
        if stale {
            self.scaler = Some(Scaler::new(
                frame.format(),
                frame.width(),
                frame.height(),
                Pixel::RGB24,
                frame.width(),
                frame.height(),
            )?);
        }

        let scaler = self
            .scaler
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("rgb scaler not initialised"))?;
        RgbFrame::from_video(&scaler.run(frame)?)
    }
}
