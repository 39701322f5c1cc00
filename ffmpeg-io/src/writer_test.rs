use std::path::PathBuf;

use super::{VideoWriter, WriterSettings};
use crate::{Rational, frame::RgbFrame, reader::VideoReader};

fn temp_video_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ffmpeg-io-{}-{}.avi", std::process::id(), name))
}

fn gradient(width: u32, height: u32, shift: u8) -> RgbFrame {
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            data.push((x as u8).wrapping_mul(4).wrapping_add(shift));
            data.push((y as u8).wrapping_mul(4));
            data.push(shift);
        }
    }
    RgbFrame::new(width, height, data).unwrap()
}

#[test]
fn test_written_video_reads_back_frame_by_frame() -> anyhow::Result<()> {
    crate::init()?;
    let path = temp_video_path("readback");

    let settings = WriterSettings {
        frame_rate: Rational::new(10, 1),
        ..Default::default()
    };
    let mut writer = VideoWriter::open(&path, 64, 48, settings)?;
    for i in 0..6u8 {
        writer.write(&gradient(64, 48, i * 20))?;
    }
    assert_eq!(writer.finish()?, 6);

    let mut reader = VideoReader::open(&path)?;
    assert_eq!((reader.width(), reader.height()), (64, 48));
    assert!(reader.frame_rate().is_some());

    let mut frames = 0;
    while let Some(frame) = reader.read_frame()? {
        assert_eq!((frame.width(), frame.height()), (64, 48));
        assert_eq!(frame.data().len(), 64 * 48 * 3);
        frames += 1;
    }
    assert_eq!(frames, 6);
    assert_eq!(reader.frames_read(), 6);

    std::fs::remove_file(&path)?;
    Ok(())
}

#[test]
fn test_writer_rejects_mismatched_frame_size() -> anyhow::Result<()> {
    crate::init()?;
    let path = temp_video_path("mismatch");

    let mut writer = VideoWriter::open(&path, 32, 32, WriterSettings::default())?;
    writer.write(&gradient(32, 32, 0))?;
    assert!(writer.write(&gradient(16, 32, 0)).is_err());
    writer.finish()?;

    let _ = std::fs::remove_file(&path);
    Ok(())
}

#[test]
fn test_open_missing_file_fails() {
    crate::init().unwrap();
    let missing = temp_video_path("does-not-exist");
    assert!(VideoReader::open(&missing).is_err());
}
