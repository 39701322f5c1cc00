use ffmpeg_next::{Rational, codec::Parameters, format::stream};

unsafe impl Send for AvStream {}
unsafe impl Sync for AvStream {}

/// Codec parameters and timing of one demuxed stream, detached from its format context.
#[derive(Clone)]
pub struct AvStream {
    index: usize,
    parameters: Parameters,
    time_base: Rational,
    rate: Rational,
    frames: Option<u64>,
}

impl AvStream {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    /// Average frame rate as reported by the container. May be `0/0` for
    /// streams without timing information.
    pub fn rate(&self) -> Rational {
        self.rate
    }

    /// Frame count declared by the container, if any.
    pub fn frames(&self) -> Option<u64> {
        self.frames
    }

    pub fn is_video(&self) -> bool {
        self.parameters.medium() == ffmpeg_next::media::Type::Video
    }

    pub fn width(&self) -> u32 {
        unsafe {
            let ptr = self.parameters.as_ptr() as *const ffmpeg_next::ffi::AVCodecParameters;
            (*ptr).width.max(0) as u32
        }
    }

    pub fn height(&self) -> u32 {
        unsafe {
            let ptr = self.parameters.as_ptr() as *const ffmpeg_next::ffi::AVCodecParameters;
            (*ptr).height.max(0) as u32
        }
    }

    /// Frame rate, or `None` when the container does not carry a usable one.
    pub fn frame_rate(&self) -> Option<Rational> {
        if self.rate.numerator() > 0 && self.rate.denominator() > 0 {
            Some(self.rate)
        } else {
            None
        }
    }

    pub fn fps(&self) -> Option<f64> {
        self.frame_rate()
            .map(|r| r.numerator() as f64 / r.denominator() as f64)
    }
}

impl From<stream::Stream<'_>> for AvStream {
    fn from(stream: stream::Stream<'_>) -> Self {
        let frames = stream.frames();
        Self {
            index: stream.index(),
            parameters: stream.parameters(),
            time_base: stream.time_base(),
            rate: stream.avg_frame_rate(),
            frames: (frames > 0).then_some(frames as u64),
        }
    }
}
