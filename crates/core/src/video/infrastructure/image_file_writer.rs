use std::path::Path;

use crate::shared::error::{MediaError, MediaResult};
use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// Writes a single frame to an image file using the `image` crate.
///
/// The format follows the path's extension. Supports optional resizing.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame, size: Option<(u32, u32)>) -> MediaResult<()> {
        // Ensure parent directory exists (infrastructure concern)
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| MediaError::io(format!("Failed to create {}", parent.display()), e))?;
        }

        let img = image::RgbaImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or_else(|| MediaError::encode("Failed to create image from frame data"))?;

        let img = if let Some((w, h)) = size {
            image::imageops::resize(&img, w, h, image::imageops::FilterType::Triangle)
        } else {
            img
        };

        img.save(path).map_err(MediaError::encode)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_frame(width: u32, height: u32, r: u8, g: u8, b: u8) -> Frame {
        Frame::solid(width, height, [r, g, b, 255], 0)
    }

    #[test]
    fn test_write_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let frame = make_frame(100, 80, 50, 100, 200);
        let writer = ImageFileWriter::new();
        writer.write(&path, &frame, None).unwrap();
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_roundtrip_preserves_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let frame = make_frame(50, 50, 50, 100, 200);
        let writer = ImageFileWriter::new();
        writer.write(&path, &frame, None).unwrap();

        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!(img.width(), 50);
        assert_eq!(img.height(), 50);
        assert_eq!(img.get_pixel(0, 0).0, [50, 100, 200, 255]);
    }

    #[test]
    fn test_write_with_resize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thumb.png");
        let frame = make_frame(200, 200, 128, 128, 128);
        let writer = ImageFileWriter::new();
        writer.write(&path, &frame, Some((64, 64))).unwrap();

        let img = image::open(&path).unwrap();
        assert_eq!(img.width(), 64);
        assert_eq!(img.height(), 64);
    }

    #[test]
    fn test_creates_missing_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/frame.png");
        ImageFileWriter::new()
            .write(&path, &make_frame(4, 4, 0, 0, 0), None)
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_unknown_extension_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let frame = make_frame(10, 10, 0, 0, 0);
        let writer = ImageFileWriter::new();
        let err = writer
            .write(&dir.path().join("out.notanimage"), &frame, None)
            .unwrap_err();
        assert!(matches!(err, MediaError::EncodeFailed(_)));
    }
}
