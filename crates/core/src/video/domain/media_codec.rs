use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

/// Single seam over the platform's decode and encode capabilities.
///
/// Every call to `reader`/`writer` hands out a fresh session, so concurrent
/// operations never share decoder or encoder state.
pub trait MediaCodec: Send + Sync {
    fn reader(&self) -> Box<dyn VideoReader>;

    /// A new encode session, or `None` when no supported encoder exists.
    fn writer(&self) -> Option<Box<dyn VideoWriter>>;

    /// Whether any supported encoder is present in this runtime.
    fn is_supported(&self) -> bool;
}
