use std::time::Duration;

use anyhow::Result;

use crate::{image::Image, pipeline::store::ProcessedFrame};

pub const ORIGINAL_TITLE: &str = "Original Frame";
pub const STAGE1_TITLE: &str = "Filtered Frame with h1";
pub const STAGE2_TITLE: &str = "Filtered Frame with h2";

/// Pause between frames while displaying.
pub const FRAME_DELAY: Duration = Duration::from_millis(25);

pub struct FrameWindow {
    window: minifb::Window,
    buffer: Vec<u32>,
    width: usize,
    height: usize,
}

impl FrameWindow {
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
        let window = minifb::Window::new(
            title,
            width,
            height,
            minifb::WindowOptions {
                resize: true,
                ..minifb::WindowOptions::default()
            },
        )
        .map_err(|e| anyhow::anyhow!("failed to create window {:?}: {}", title, e))?;

        Ok(Self {
            window,
            buffer: vec![0; width * height],
            width,
            height,
        })
    }

    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn escape_pressed(&self) -> bool {
        self.window.is_key_down(minifb::Key::Escape)
    }

    pub fn show(&mut self, image: &Image) -> Result<()> {
        self.width = image.width() as usize;
        self.height = image.height() as usize;
        to_argb(image, &mut self.buffer);
        self.window
            .update_with_buffer(&self.buffer, self.width, self.height)
            .map_err(|e| anyhow::anyhow!(e))
    }
}

/// Packs an image into minifb's `0RGB` pixels. Gray images are replicated,
/// a fourth channel is ignored.
pub fn to_argb(image: &Image, buffer: &mut Vec<u32>) {
    let channels = image.channels() as usize;
    buffer.clear();
    buffer.extend(image.as_bytes().chunks_exact(channels).map(|px| {
        let (r, g, b) = if channels >= 3 {
            (px[0], px[1], px[2])
        } else {
            (px[0], px[0], px[0])
        };
        (r as u32) << 16 | (g as u32) << 8 | b as u32
    }));
}

/// Shows original and both filter stages side by side in three windows, in
/// sequence order. Escape or closing a window stops early. Returns the number
/// of frames shown.
pub fn show_frames(frames: &[ProcessedFrame], delay: Duration) -> Result<usize> {
    let Some(first) = frames.first() else {
        log::warn!("display: no frames to show");
        return Ok(0);
    };
    let (width, height) = (first.original.width() as usize, first.original.height() as usize);

    let mut windows = [
        FrameWindow::new(ORIGINAL_TITLE, width, height)?,
        FrameWindow::new(STAGE1_TITLE, width, height)?,
        FrameWindow::new(STAGE2_TITLE, width, height)?,
    ];

    let mut shown = 0;
    for frame in frames {
        if windows.iter().any(|w| !w.is_open() || w.escape_pressed()) {
            log::info!("display: stopped by user at frame {}", frame.index);
            break;
        }
        windows[0].show(&frame.original)?;
        windows[1].show(&frame.stage1)?;
        windows[2].show(&frame.stage2)?;
        shown += 1;
        std::thread::sleep(delay);
    }
    Ok(shown)
}
