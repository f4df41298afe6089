use crate::keyframe::domain::keyframe_image::KeyframeImage;
use crate::shared::error::MediaResult;
use crate::shared::frame::Frame;

/// Turns a reference still into a frame of exact target dimensions.
///
/// The image is resized, never cropped, so aspect ratio may change.
/// Implementations must be pure: malformed input fails outright and no
/// partially decoded frame is ever returned.
pub trait KeyframeDecoder: Send + Sync {
    fn decode(&self, keyframe: &KeyframeImage, width: u32, height: u32) -> MediaResult<Frame>;
}
