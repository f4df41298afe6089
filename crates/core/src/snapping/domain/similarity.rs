use serde::{Deserialize, Serialize};

use crate::keyframe::domain::keyframe_image::KeyframeRole;
use crate::shared::error::{MediaError, MediaResult};
use crate::shared::frame::{Frame, CHANNELS};
use crate::shared::frame_sequence::FrameSequence;

/// 0..=100, where 100 means pixel-identical over the RGB channels.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimilarityScore(f64);

impl SimilarityScore {
    pub const IDENTICAL: Self = Self(100.0);

    pub fn value(self) -> f64 {
        self.0
    }

    /// Mean absolute RGB difference mapped onto the 0..=100 scale.
    pub fn between(a: &Frame, b: &Frame) -> MediaResult<Self> {
        if !a.same_dimensions(b) {
            return Err(MediaError::malformed(format!(
                "cannot compare {}x{} with {}x{}",
                a.width(),
                a.height(),
                b.width(),
                b.height()
            )));
        }

        let (total, samples) = a
            .data()
            .chunks_exact(CHANNELS)
            .zip(b.data().chunks_exact(CHANNELS))
            .flat_map(|(pa, pb)| pa[..3].iter().zip(&pb[..3]))
            .fold((0u64, 0u64), |(sum, n), (&x, &y)| {
                (sum + x.abs_diff(y) as u64, n + 1)
            });

        if samples == 0 {
            return Ok(Self::IDENTICAL);
        }
        let mean = total as f64 / samples as f64;
        Ok(Self(100.0 * (1.0 - mean / 255.0)))
    }
}

impl std::fmt::Display for SimilarityScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Similarity of one boundary frame to its keyframe, before and after snapping.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryScore {
    pub before: SimilarityScore,
    pub after: SimilarityScore,
}

impl BoundaryScore {
    pub fn improvement(&self) -> f64 {
        self.after.value() - self.before.value()
    }
}

/// Diagnostic boundary report; never gates success.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryQuality {
    pub start: Option<BoundaryScore>,
    pub end: Option<BoundaryScore>,
}

impl BoundaryQuality {
    /// Scores the first and last frame of `original` and `result` against
    /// whichever keyframes were supplied.
    pub fn evaluate(
        original: &FrameSequence,
        result: &FrameSequence,
        start_keyframe: Option<&Frame>,
        end_keyframe: Option<&Frame>,
    ) -> MediaResult<Self> {
        Ok(Self {
            start: score_boundary(start_keyframe, original.first(), result.first())?,
            end: score_boundary(end_keyframe, original.last(), result.last())?,
        })
    }
}

fn score_boundary(
    keyframe: Option<&Frame>,
    before: Option<&Frame>,
    after: Option<&Frame>,
) -> MediaResult<Option<BoundaryScore>> {
    let (Some(key), Some(before), Some(after)) = (keyframe, before, after) else {
        return Ok(None);
    };
    Ok(Some(BoundaryScore {
        before: SimilarityScore::between(before, key)?,
        after: SimilarityScore::between(after, key)?,
    }))
}

/// Similarity of each frame to `keyframe`, walking inward from the boundary
/// named by `role`, for at most `depth` frames.
pub fn similarity_profile(
    sequence: &FrameSequence,
    keyframe: &Frame,
    role: KeyframeRole,
    depth: usize,
) -> MediaResult<Vec<SimilarityScore>> {
    let frames = sequence.frames();
    let ordered: Box<dyn Iterator<Item = &Frame>> = match role {
        KeyframeRole::Start => Box::new(frames.iter()),
        KeyframeRole::End => Box::new(frames.iter().rev()),
    };
    ordered
        .take(depth)
        .map(|frame| SimilarityScore::between(frame, keyframe))
        .collect()
}
