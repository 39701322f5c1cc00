use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::{encoder::Encoder, packet::RawPacket};

/// File muxer. The header is written lazily before the first packet so that
/// every stream can be added first.
pub struct AvOutput {
    inner: ffmpeg_next::format::context::Output,
    path: PathBuf,
    have_written_header: bool,
    have_written_trailer: bool,
}

impl AvOutput {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let inner = ffmpeg_next::format::output(&path)
            .with_context(|| format!("open output {}", path.display()))?;
        Ok(Self {
            inner,
            path: path.to_path_buf(),
            have_written_header: false,
            have_written_trailer: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether encoders feeding this container must emit a global header.
    pub fn needs_global_header(&self) -> bool {
        self.inner
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER)
    }

    /// Adds a stream carrying `encoder`'s output; returns its stream index.
    pub fn add_stream(&mut self, encoder: &Encoder) -> anyhow::Result<usize> {
        if self.have_written_header {
            anyhow::bail!("cannot add stream after header was written");
        }
        let mut writer_stream = self.inner.add_stream(encoder.codec())?;
        writer_stream.set_parameters(encoder.inner());
        writer_stream.set_time_base(encoder.time_base());
        Ok(writer_stream.index())
    }

    pub fn write_packet(
        &mut self,
        stream_index: usize,
        mut packet: RawPacket,
    ) -> anyhow::Result<()> {
        if !self.have_written_header {
            self.inner.write_header()?;
            self.have_written_header = true;
        }
        let time_base = packet.time_base();
        let out_time_base = self
            .inner
            .stream(stream_index)
            .ok_or_else(|| anyhow::anyhow!("stream {} not found", stream_index))?
            .time_base();

        let p = packet.get_mut();
        p.set_stream(stream_index);
        p.set_position(-1);
        p.rescale_ts(time_base, out_time_base);
        p.write_interleaved(&mut self.inner)?;
        Ok(())
    }

    pub fn finish(&mut self) -> anyhow::Result<()> {
        if !self.have_written_header {
            self.inner.write_header()?;
            self.have_written_header = true;
        }
        if !self.have_written_trailer {
            self.have_written_trailer = true;
            self.inner.write_trailer()?;
        }
        Ok(())
    }
}

unsafe impl Send for AvOutput {}
