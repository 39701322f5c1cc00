use bytes::Bytes;

use crate::error::FilterError;

/// Packed 8-bit interleaved image, row-major without padding.
///
/// Cloning is cheap: the pixel buffer is reference counted and never mutated
/// after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    channels: u8,
    data: Bytes,
}

impl Image {
    /// Builds a validated image.
    pub fn new(
        width: u32,
        height: u32,
        channels: u8,
        data: impl Into<Bytes>,
    ) -> Result<Self, FilterError> {
        let image = Self::from_raw(width, height, channels, data);
        image.validate()?;
        Ok(image)
    }

    /// Wraps a buffer as-is. Frame sources hand over decoder output this way;
    /// the filter chain validates before touching pixels.
    pub fn from_raw(width: u32, height: u32, channels: u8, data: impl Into<Bytes>) -> Self {
        Self {
            width,
            height,
            channels,
            data: data.into(),
        }
    }

    /// Builds an image by evaluating `f(x, y, channel)` for every sample.
    pub fn from_fn(
        width: u32,
        height: u32,
        channels: u8,
        mut f: impl FnMut(u32, u32, u8) -> u8,
    ) -> Result<Self, FilterError> {
        let mut data = Vec::with_capacity(width as usize * height as usize * channels as usize);
        for y in 0..height {
            for x in 0..width {
                for c in 0..channels {
                    data.push(f(x, y, c));
                }
            }
        }
        Self::new(width, height, channels, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }

    /// Expected buffer length for the declared geometry.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.channels as usize
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        if self.width == 0 || self.height == 0 {
            return Err(FilterError::EmptyImage {
                width: self.width,
                height: self.height,
            });
        }
        if !(1..=4).contains(&self.channels) {
            return Err(FilterError::Channels(self.channels));
        }
        let expected = self.expected_len();
        if self.data.len() != expected {
            return Err(FilterError::BufferSize {
                width: self.width,
                height: self.height,
                channels: self.channels,
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    /// Sample at `(x, y, channel)`. Panics when out of range.
    pub fn sample(&self, x: u32, y: u32, channel: u8) -> u8 {
        let idx = (y as usize * self.width as usize + x as usize) * self.channels as usize
            + channel as usize;
        self.data[idx]
    }
}
