use std::path::PathBuf;

/// Container-level facts about an opened video.
///
/// `fps` is the caller-supplied nominal rate, not the container's own rate;
/// `native_fps` keeps the latter for diagnostics.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub native_fps: f64,
    pub duration_secs: f64,
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Metadata for a sequence about to be encoded.
    pub fn for_encoding(width: u32, height: u32, fps: f64, total_frames: usize) -> Self {
        Self {
            width,
            height,
            fps,
            native_fps: fps,
            duration_secs: total_frames as f64 / fps,
            total_frames,
            codec: String::new(),
            source_path: None,
        }
    }

    /// Number of frames on the nominal grid covering the whole duration.
    pub fn nominal_frame_count(&self) -> usize {
        if self.duration_secs <= 0.0 || self.fps <= 0.0 {
            return 0;
        }
        (self.duration_secs * self.fps).round() as usize
    }
}
