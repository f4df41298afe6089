use crate::shared::error::{MediaError, MediaResult};
use crate::shared::frame::Frame;

/// An ordered, finite run of same-sized frames at a nominal rate.
///
/// Sequences are built once and never mutated; transformations produce a
/// new sequence so the source frames are never aliased.
#[derive(Clone, Debug)]
pub struct FrameSequence {
    frames: Vec<Frame>,
    width: u32,
    height: u32,
    fps: f64,
}

impl FrameSequence {
    /// Builds a sequence, rejecting frames whose dimensions differ from the first.
    pub fn new(frames: Vec<Frame>, fps: f64) -> MediaResult<Self> {
        validate_fps(fps)?;
        let (width, height) = frames
            .first()
            .map(|f| (f.width(), f.height()))
            .unwrap_or((0, 0));
        if let Some(bad) = frames
            .iter()
            .find(|f| f.width() != width || f.height() != height)
        {
            return Err(MediaError::malformed(format!(
                "frame {} is {}x{}, sequence is {width}x{height}",
                bad.index(),
                bad.width(),
                bad.height()
            )));
        }
        Ok(Self {
            frames,
            width,
            height,
            fps,
        })
    }

    /// The explicit empty result of a failed or zero-frame extraction.
    pub fn empty(fps: f64) -> Self {
        Self {
            frames: Vec::new(),
            width: 0,
            height: 0,
            fps,
        }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn first(&self) -> Option<&Frame> {
        self.frames.first()
    }

    pub fn last(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames.len() as f64 / self.fps
    }
}

/// Frame rates are always supplied by the caller; there is no assumed default.
pub fn validate_fps(fps: f64) -> MediaResult<()> {
    if fps.is_finite() && fps > 0.0 {
        Ok(())
    } else {
        Err(MediaError::malformed(format!(
            "frame rate must be a positive number, got {fps}"
        )))
    }
}
