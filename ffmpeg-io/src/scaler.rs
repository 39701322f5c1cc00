use ffmpeg_next::{format::Pixel, frame::Video, software::scaling};

/// Pixel format / size converter. Rebuilt by callers when the source geometry changes.
pub struct Scaler {
    context: scaling::Context,
}

impl Scaler {
    pub fn new(
        src_format: Pixel,
        src_width: u32,
        src_height: u32,
        dst_format: Pixel,
        dst_width: u32,
        dst_height: u32,
    ) -> anyhow::Result<Self> {
        let context = scaling::Context::get(
            src_format,
            src_width,
            src_height,
            dst_format,
            dst_width,
            dst_height,
            scaling::flag::Flags::BILINEAR,
        )?;
        Ok(Self { context })
    }

    /// Whether `frame` has the format and size this scaler was built for.
    pub fn accepts(&self, frame: &Video) -> bool {
        let input = self.context.input();
        input.format == frame.format()
            && input.width == frame.width()
            && input.height == frame.height()
    }

    pub fn run(&mut self, frame: &Video) -> anyhow::Result<Video> {
        let mut converted = Video::empty();
        self.context.run(frame, &mut converted)?;
        converted.set_pts(frame.pts());
        Ok(converted)
    }
}

unsafe impl Send for Scaler {}
