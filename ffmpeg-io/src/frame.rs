use std::fmt::{Display, Formatter};

use bytes::Bytes;
use ffmpeg_next::{format::Pixel, frame::Video};

/// Bytes per pixel of packed RGB24.
pub const RGB_CHANNELS: usize = 3;

/// A packed RGB24 picture with no row padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbFrame {
    width: u32,
    height: u32,
    data: Bytes,
    pts: Option<i64>,
}

impl RgbFrame {
    pub fn new(width: u32, height: u32, data: impl Into<Bytes>) -> anyhow::Result<Self> {
        let data = data.into();
        let expected = width as usize * height as usize * RGB_CHANNELS;
        if width == 0 || height == 0 {
            anyhow::bail!("invalid frame size {}x{}", width, height);
        }
        if data.len() != expected {
            anyhow::bail!(
                "rgb frame {}x{} needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            );
        }
        Ok(Self {
            width,
            height,
            data,
            pts: None,
        })
    }

    pub fn with_pts(mut self, pts: Option<i64>) -> Self {
        self.pts = pts;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pts(&self) -> Option<i64> {
        self.pts
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn into_data(self) -> Bytes {
        self.data
    }

    /// Copies an RGB24 ffmpeg frame out of its (possibly padded) plane.
    pub fn from_video(frame: &Video) -> anyhow::Result<Self> {
        if frame.format() != Pixel::RGB24 {
            anyhow::bail!("expected rgb24 frame, got {:?}", frame.format());
        }
        let width = frame.width();
        let height = frame.height();
        let row_len = width as usize * RGB_CHANNELS;
        let stride = frame.stride(0);
        let plane = frame.data(0);

        let mut data = Vec::with_capacity(row_len * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            data.extend_from_slice(&plane[start..start + row_len]);
        }

        Ok(Self::new(width, height, data)?.with_pts(frame.pts()))
    }

    /// Builds an RGB24 ffmpeg frame honoring the destination stride.
    pub fn to_video(&self) -> Video {
        let mut frame = Video::new(Pixel::RGB24, self.width, self.height);
        let row_len = self.width as usize * RGB_CHANNELS;
        let stride = frame.stride(0);
        let plane = frame.data_mut(0);
        for (row, src) in self.data.chunks_exact(row_len).enumerate() {
            let start = row * stride;
            plane[start..start + row_len].copy_from_slice(src);
        }
        frame.set_pts(self.pts);
        frame
    }
}

impl Display for RgbFrame {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "RgbFrame {}x{}, data_len: {}, pts: {:?}",
            self.width,
            self.height,
            self.data.len(),
            self.pts
        )
    }
}
