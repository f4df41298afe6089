//! Fixtures shared by the in-crate tests.

use std::path::{Path, PathBuf};

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;
use crate::video::infrastructure::ffmpeg_writer::{EncoderProfile, FfmpegWriter};

/// Grey value painted into frame `index` of [`write_test_video`] output.
pub fn gray_level(index: usize) -> u8 {
    (16 + (index * 9) % 208) as u8
}

pub fn gray_frame(width: u32, height: u32, value: u8, index: usize) -> Frame {
    Frame::solid(width, height, [value, value, value, 255], index)
}

/// Encodes `n_frames` solid grey frames, each a distinct [`gray_level`].
pub fn write_test_video(dir: &Path, n_frames: usize, width: u32, height: u32, fps: f64) -> PathBuf {
    write_named_test_video(dir, "clip", n_frames, width, height, fps)
}

pub fn write_named_test_video(
    dir: &Path,
    stem: &str,
    n_frames: usize,
    width: u32,
    height: u32,
    fps: f64,
) -> PathBuf {
    let frames: Vec<Frame> = (0..n_frames)
        .map(|i| gray_frame(width, height, gray_level(i), i))
        .collect();
    write_frames(dir, stem, &frames, fps)
}

/// Encodes arbitrary frames into `dir/<stem>.<ext>` with the preferred encoder.
pub fn write_frames(dir: &Path, stem: &str, frames: &[Frame], fps: f64) -> PathBuf {
    let profile = EncoderProfile::best_available().expect("no encoder available for tests");
    let mut writer = FfmpegWriter::new(profile);
    let path = dir.join(format!("{stem}.{}", writer.container_extension()));
    let first = frames.first().expect("at least one frame");
    let meta = VideoMetadata::for_encoding(first.width(), first.height(), fps, frames.len());
    writer.open(&path, &meta).unwrap();
    for frame in frames {
        writer.write(frame).unwrap();
    }
    writer.close().unwrap();
    path
}

/// A PNG of a single solid colour, base64 encoded without a data-URL prefix.
pub fn png_base64(width: u32, height: u32, rgba: [u8; 4]) -> String {
    use base64::Engine;

    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut bytes = std::io::Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
    base64::engine::general_purpose::STANDARD.encode(bytes.into_inner())
}

/// The default toolchain when both tools are on `PATH`; tests needing the
/// external tools return early otherwise.
pub fn available_toolchain() -> Option<crate::splicing::infrastructure::toolchain::Toolchain> {
    let toolchain = crate::splicing::infrastructure::toolchain::Toolchain::default();
    if toolchain.report().is_complete() {
        Some(toolchain)
    } else {
        eprintln!("ffmpeg/ffprobe not on PATH, skipping");
        None
    }
}

/// Writes an executable shell script standing in for a media tool.
#[cfg(unix)]
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
