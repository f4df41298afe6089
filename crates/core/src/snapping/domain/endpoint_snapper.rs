use ndarray::Zip;

use crate::shared::error::{MediaError, MediaResult};
use crate::shared::frame::Frame;
use crate::shared::frame_sequence::FrameSequence;
use crate::snapping::domain::snapping_options::SnappingOptions;

/// A sequence with its boundary frames pinned, plus what was replaced.
#[derive(Clone, Debug)]
pub struct SnappedSequence {
    pub sequence: FrameSequence,
    pub start_frames_replaced: usize,
    pub end_frames_replaced: usize,
}

/// Pure pixel stage of endpoint snapping: no decode, no encode.
///
/// Builds a new sequence; the input sequence and keyframes are only read.
pub struct EndpointSnapper {
    options: SnappingOptions,
}

impl EndpointSnapper {
    pub fn new(options: SnappingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SnappingOptions {
        &self.options
    }

    pub fn apply(
        &self,
        sequence: &FrameSequence,
        start_keyframe: Option<&Frame>,
        end_keyframe: Option<&Frame>,
    ) -> MediaResult<SnappedSequence> {
        if sequence.is_empty() {
            return Err(MediaError::malformed("cannot snap an empty sequence"));
        }
        for keyframe in [start_keyframe, end_keyframe].into_iter().flatten() {
            if keyframe.width() != sequence.width() || keyframe.height() != sequence.height() {
                return Err(MediaError::malformed(format!(
                    "keyframe is {}x{}, sequence is {}x{}",
                    keyframe.width(),
                    keyframe.height(),
                    sequence.width(),
                    sequence.height()
                )));
            }
        }

        let n = sequence.frame_count();
        let counts = self.options.clamped(n);
        let start_count = start_keyframe.map_or(0, |_| counts.start);
        let end_count = end_keyframe.map_or(0, |_| counts.end);
        let fade = self.options.effective_fade_frames();

        let frames = sequence
            .frames()
            .iter()
            .enumerate()
            .map(|(i, original)| {
                let from_tail = n - 1 - i;
                match (start_keyframe, end_keyframe) {
                    (Some(key), _) if i < start_count => blend(original, key, blend_weight(i, fade)),
                    (_, Some(key)) if from_tail < end_count => {
                        blend(original, key, blend_weight(from_tail, fade))
                    }
                    _ => original.clone(),
                }
            })
            .collect();

        Ok(SnappedSequence {
            sequence: FrameSequence::new(frames, sequence.fps())?,
            start_frames_replaced: start_count,
            end_frames_replaced: end_count,
        })
    }
}

/// Share of the original frame kept at `distance` frames from the boundary.
///
/// Zero at the boundary itself, rising linearly to one across the fade
/// window. A zero-width window keeps nothing of the original.
pub fn blend_weight(distance: usize, fade_frames: usize) -> f32 {
    if fade_frames == 0 {
        return 0.0;
    }
    (distance as f32 / fade_frames as f32).min(1.0)
}

/// Linear per-channel mix: `keyframe + (original - keyframe) * weight`.
pub fn blend(original: &Frame, keyframe: &Frame, weight: f32) -> Frame {
    if weight <= 0.0 {
        return keyframe.with_index(original.index());
    }
    if weight >= 1.0 {
        return original.clone();
    }

    let mut out = original.clone();
    Zip::from(out.as_ndarray_mut())
        .and(keyframe.as_ndarray())
        .for_each(|o, &k| {
            let k = k as f32;
            *o = (k + (*o as f32 - k) * weight).round().clamp(0.0, 255.0) as u8;
        });
    out
}
