use std::io::Cursor;

use image::imageops::FilterType;

use crate::keyframe::domain::keyframe_decoder::KeyframeDecoder;
use crate::keyframe::domain::keyframe_image::{KeyframeImage, KeyframeRole};
use crate::shared::error::{MediaError, MediaResult};
use crate::shared::frame::Frame;

/// Decodes keyframes with the `image` crate (PNG, JPEG, WebP, BMP, ...).
#[derive(Clone, Copy, Debug)]
pub struct ImageKeyframeDecoder {
    filter: FilterType,
}

impl ImageKeyframeDecoder {
    pub fn new() -> Self {
        Self {
            filter: FilterType::Triangle,
        }
    }

    pub fn with_filter(filter: FilterType) -> Self {
        Self { filter }
    }
}

impl Default for ImageKeyframeDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyframeDecoder for ImageKeyframeDecoder {
    fn decode(&self, keyframe: &KeyframeImage, width: u32, height: u32) -> MediaResult<Frame> {
        if width == 0 || height == 0 {
            return Err(MediaError::malformed(format!(
                "keyframe target size {width}x{height} is empty"
            )));
        }

        let bytes = keyframe.to_bytes()?;
        let decoded = image::load_from_memory(&bytes).map_err(|e| {
            MediaError::decode(format!("{} keyframe could not be decoded: {e}", keyframe.role))
        })?;

        let rgba = decoded.to_rgba8();
        let rgba = if rgba.dimensions() == (width, height) {
            rgba
        } else {
            log::debug!(
                "Resizing {} keyframe {}x{} -> {width}x{height}",
                keyframe.role,
                rgba.width(),
                rgba.height()
            );
            image::imageops::resize(&rgba, width, height, self.filter)
        };

        Ok(Frame::new(rgba.into_raw(), width, height, 0))
    }
}

/// Encodes a frame as a PNG data-URL keyframe.
pub fn encode_keyframe(frame: &Frame, role: KeyframeRole) -> MediaResult<KeyframeImage> {
    let img = image::RgbaImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        .ok_or_else(|| MediaError::encode("Failed to create image from frame data"))?;

    let mut png = Cursor::new(Vec::new());
    img.write_to(&mut png, image::ImageFormat::Png)
        .map_err(MediaError::encode)?;

    Ok(KeyframeImage::from_encoded_bytes(
        role,
        "image/png",
        &png.into_inner(),
    ))
}
