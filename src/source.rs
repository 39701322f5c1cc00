use std::path::Path;

use ffmpeg_io::{Rational, VideoReader};

use crate::image::Image;

/// Frame rate used when the container does not declare one.
pub const FALLBACK_FRAME_RATE: (i32, i32) = (25, 1);

/// Sequential producer of frames in strictly increasing source order.
///
/// `Ok(None)` ends the stream; a source is not polled again afterwards.
pub trait FrameSource: Send + 'static {
    fn next_frame(&mut self) -> anyhow::Result<Option<Image>>;

    /// Number of frames the source expects to yield, when known.
    fn len_hint(&self) -> Option<u64> {
        None
    }
}

/// Frames decoded from a video file as packed RGB24.
pub struct VideoSource {
    reader: VideoReader,
}

impl VideoSource {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let reader = VideoReader::open(path)?;
        log::info!(
            "opened {}x{} video, {:?} fps, {:?} frames declared",
            reader.width(),
            reader.height(),
            reader.stream().fps(),
            reader.frame_count()
        );
        Ok(Self { reader })
    }

    pub fn frame_rate(&self) -> Rational {
        self.reader.frame_rate().unwrap_or_else(|| {
            log::warn!(
                "source has no frame rate, using {}/{}",
                FALLBACK_FRAME_RATE.0,
                FALLBACK_FRAME_RATE.1
            );
            Rational::new(FALLBACK_FRAME_RATE.0, FALLBACK_FRAME_RATE.1)
        })
    }

    pub fn width(&self) -> u32 {
        self.reader.width()
    }

    pub fn height(&self) -> u32 {
        self.reader.height()
    }
}

impl FrameSource for VideoSource {
    fn next_frame(&mut self) -> anyhow::Result<Option<Image>> {
        Ok(self.reader.read_frame()?.map(|frame| {
            let (width, height) = (frame.width(), frame.height());
            Image::from_raw(width, height, 3, frame.into_data())
        }))
    }

    fn len_hint(&self) -> Option<u64> {
        self.reader.frame_count()
    }
}

/// Adapts any iterator of images into a frame source.
pub struct IterSource<I> {
    frames: I,
}

impl<I> IterSource<I>
where
    I: Iterator<Item = Image> + Send + 'static,
{
    pub fn new(frames: impl IntoIterator<Item = Image, IntoIter = I>) -> Self {
        Self {
            frames: frames.into_iter(),
        }
    }
}

impl<I> FrameSource for IterSource<I>
where
    I: Iterator<Item = Image> + Send + 'static,
{
    fn next_frame(&mut self) -> anyhow::Result<Option<Image>> {
        Ok(self.frames.next())
    }

    fn len_hint(&self) -> Option<u64> {
        match self.frames.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(lower as u64),
            _ => None,
        }
    }
}
