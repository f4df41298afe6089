use std::path::Path;

use crate::shared::error::MediaResult;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Abstracts video encoding so the pipeline can write output without
/// depending on a specific codec library.
pub trait VideoWriter: Send {
    /// Extension of the container this writer produces (without the dot).
    fn container_extension(&self) -> &str;

    fn open(&mut self, path: &Path, metadata: &VideoMetadata) -> MediaResult<()>;

    fn write(&mut self, frame: &Frame) -> MediaResult<()>;

    /// Flushes buffered packets and finalises the container.
    fn close(&mut self) -> MediaResult<()>;
}
