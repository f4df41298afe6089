use std::path::Path;

use crate::shared::error::MediaResult;
use crate::shared::frame::TimedFrame;
use crate::shared::video_metadata::VideoMetadata;

/// Reads frames from an encoded video.
///
/// Implementations handle I/O details (codec, container format, etc.)
/// while the pipeline works with the abstract `Frame` and `VideoMetadata`
/// types. Each reader owns its own decode session.
pub trait VideoReader: Send {
    /// Opens a video and returns its metadata, stamped with the caller's
    /// nominal `fps`.
    fn open(&mut self, path: &Path, fps: f64) -> MediaResult<VideoMetadata>;

    /// Returns an iterator over frames in presentation order.
    fn frames(&mut self) -> Box<dyn Iterator<Item = MediaResult<TimedFrame>> + '_>;

    /// Decodes the frame on screen at `timestamp_secs`, without decoding the
    /// whole stream. `None` when the timestamp lies past the end.
    fn frame_at(&mut self, timestamp_secs: f64) -> MediaResult<Option<TimedFrame>>;

    /// Decodes the final frame, starting `backoff_secs` before the reported
    /// duration. `None` when the stream holds no frames.
    fn last_frame(&mut self, backoff_secs: f64) -> MediaResult<Option<TimedFrame>>;

    /// Releases any resources held by the reader.
    fn close(&mut self);
}
