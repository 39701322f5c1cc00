use std::path::Path;

use anyhow::Context;

use crate::{packet::RawPacket, stream::AvStream};

/// Demuxer for a video file. Only the best video stream is exposed; packets
/// from other streams are skipped by [`AvInput::read_video_packet`].
pub struct AvInput {
    inner: ffmpeg_next::format::context::Input,
    video: AvStream,
}

impl AvInput {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let inner = ffmpeg_next::format::input(&path)
            .with_context(|| format!("open input {}", path.display()))?;

        let video = inner
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .map(AvStream::from)
            .ok_or_else(|| anyhow::anyhow!("no video stream in {}", path.display()))?;

        log::debug!(
            "input {}: video stream {} {}x{}, rate {:?}, time_base {:?}",
            path.display(),
            video.index(),
            video.width(),
            video.height(),
            video.rate(),
            video.time_base()
        );

        Ok(Self { inner, video })
    }

    pub fn video_stream(&self) -> &AvStream {
        &self.video
    }

    /// Next packet of the video stream, or `None` at end of input.
    pub fn read_video_packet(&mut self) -> Option<RawPacket> {
        let wanted = self.video.index();
        loop {
            match self.inner.packets().next() {
                Some((stream, packet)) if stream.index() == wanted => {
                    return Some((packet, stream.time_base()).into());
                }
                Some(_) => continue,
                None => return None,
            }
        }
    }
}

unsafe impl Send for AvInput {}
