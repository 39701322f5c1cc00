use ffmpeg_next::{Dictionary, Rational, format::Pixel};

use crate::{frame::RgbFrame, packet::RawPacket, scaler::Scaler};

#[derive(Debug, Clone)]
pub struct Settings {
    pub width: u32,
    pub height: u32,
    pub codec: String,
    pub pixel_format: Pixel,
    pub frame_rate: Rational,
    /// Set when the container wants codec extradata in its header instead of in-band.
    pub global_header: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            codec: "mjpeg".to_string(),
            pixel_format: Pixel::YUVJ420P,
            frame_rate: Rational::new(25, 1),
            global_header: false,
        }
    }
}

/// Video encoder fed with RGB frames; converts to the codec's pixel format and
/// stamps sequential timestamps in a `1/fps` time base.
pub struct Encoder {
    codec: ffmpeg_next::Codec,
    inner: ffmpeg_next::codec::encoder::Video,
    settings: Settings,
    time_base: Rational,
    frame_index: i64,
    scaler: Option<Scaler>,
}

impl Encoder {
    pub fn new(settings: Settings, options: Option<Dictionary>) -> anyhow::Result<Self> {
        if settings.width == 0 || settings.height == 0 {
            anyhow::bail!("invalid encoder size {}x{}", settings.width, settings.height);
        }
        if settings.frame_rate.numerator() <= 0 || settings.frame_rate.denominator() <= 0 {
            anyhow::bail!("invalid encoder frame rate {:?}", settings.frame_rate);
        }

        let codec = ffmpeg_next::encoder::find_by_name(&settings.codec)
            .ok_or(anyhow::anyhow!("codec not found: {}", settings.codec))?;
        let time_base = settings.frame_rate.invert();

        let mut encoder = ffmpeg_next::codec::Context::new_with_codec(codec)
            .encoder()
            .video()?;
        encoder.set_width(settings.width);
        encoder.set_height(settings.height);
        encoder.set_format(settings.pixel_format);
        encoder.set_frame_rate(Some(settings.frame_rate));
        encoder.set_time_base(time_base);
        if settings.global_header {
            encoder.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let inner = encoder.open_with(options.unwrap_or_default())?;
        log::info!(
            "encoder opened: {} {}x{} {:?} @ {:?}",
            settings.codec,
            settings.width,
            settings.height,
            settings.pixel_format,
            settings.frame_rate
        );

        Ok(Self {
            codec,
            inner,
            settings,
            time_base,
            frame_index: 0,
            scaler: None,
        })
    }

    pub fn codec(&self) -> ffmpeg_next::Codec {
        self.codec
    }

    pub fn inner(&self) -> &ffmpeg_next::codec::encoder::Video {
        &self.inner
    }

    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    pub fn send_frame(&mut self, frame: &RgbFrame) -> anyhow::Result<()> {
        if frame.width() != self.settings.width || frame.height() != self.settings.height {
            anyhow::bail!(
                "frame {}x{} does not match encoder size {}x{}",
                frame.width(),
                frame.height(),
                self.settings.width,
                self.settings.height
            );
        }

        let rgb = frame.to_video();
        let mut converted = if self.settings.pixel_format == rgb.format() {
            rgb
        } else {
            if self.scaler.is_none() {
                self.scaler = Some(Scaler::new(
                    rgb.format(),
                    rgb.width(),
                    rgb.height(),
                    self.settings.pixel_format,
                    self.settings.width,
                    self.settings.height,
                )?);
            }
            let scaler = self
                .scaler
                .as_mut()
                .ok_or_else(|| anyhow::anyhow!("encoder scaler not initialised"))?;
            scaler.run(&rgb)?
        };

        converted.set_pts(Some(self.frame_index));
        self.inner.send_frame(&converted)?;
        self.frame_index += 1;
        Ok(())
    }

    pub fn send_eof(&mut self) -> anyhow::Result<()> {
        self.inner.send_eof()?;
        Ok(())
    }

    pub fn receive_packet(&mut self) -> anyhow::Result<Option<RawPacket>> {
        let mut packet = ffmpeg_next::codec::packet::Packet::empty();
        match self.inner.receive_packet(&mut packet) {
            Ok(()) => Ok(Some(RawPacket::from((packet, self.time_base)))),
            Err(ffmpeg_next::Error::Other { errno })
                if errno == ffmpeg_next::util::error::EAGAIN =>
            {
                Ok(None)
            }
            Err(ffmpeg_next::Error::Eof) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub fn frames_sent(&self) -> i64 {
        self.frame_index
    }
}

unsafe impl Send for Encoder {}
