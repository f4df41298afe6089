use serde::{Deserialize, Serialize};

use crate::shared::constants::MAX_SNAP_DIVISOR;

/// How replaced boundary frames are combined with the keyframe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    /// Replaced frames become the keyframe outright.
    #[default]
    Hard,
    /// Replaced frames dissolve from the keyframe into the original content.
    Fade,
}

/// How many frames at each end are pinned to their keyframe, and how.
///
/// Requested counts are never rejected; they are clamped to
/// [`SnappingOptions::max_replaceable`] at application time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SnappingOptions {
    pub start_frame_count: usize,
    pub end_frame_count: usize,
    pub blend_mode: BlendMode,
    pub fade_frames: usize,
}

impl Default for SnappingOptions {
    fn default() -> Self {
        Self {
            start_frame_count: 1,
            end_frame_count: 1,
            blend_mode: BlendMode::Hard,
            fade_frames: 0,
        }
    }
}

/// Replacement counts after clamping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClampedCounts {
    pub start: usize,
    pub end: usize,
}

impl SnappingOptions {
    pub fn hard(start_frame_count: usize, end_frame_count: usize) -> Self {
        Self {
            start_frame_count,
            end_frame_count,
            blend_mode: BlendMode::Hard,
            fade_frames: 0,
        }
    }

    pub fn fade(start_frame_count: usize, end_frame_count: usize, fade_frames: usize) -> Self {
        Self {
            start_frame_count,
            end_frame_count,
            blend_mode: BlendMode::Fade,
            fade_frames,
        }
    }

    /// Upper bound on frames replaced at either end.
    pub fn max_replaceable(frame_count: usize) -> usize {
        frame_count / MAX_SNAP_DIVISOR
    }

    pub fn clamped(&self, frame_count: usize) -> ClampedCounts {
        let max = Self::max_replaceable(frame_count);
        ClampedCounts {
            start: self.start_frame_count.min(max),
            end: self.end_frame_count.min(max),
        }
    }

    /// Width of the dissolve window; zero means a hard replacement.
    pub fn effective_fade_frames(&self) -> usize {
        match self.blend_mode {
            BlendMode::Hard => 0,
            BlendMode::Fade => self.fade_frames,
        }
    }

    /// Human-readable notes on requests that will not be honoured as written.
    pub fn validate(&self, frame_count: usize) -> Vec<String> {
        let max = Self::max_replaceable(frame_count);
        let mut warnings = Vec::new();

        for (label, requested) in [
            ("startFrameCount", self.start_frame_count),
            ("endFrameCount", self.end_frame_count),
        ] {
            if requested > max {
                warnings.push(format!(
                    "{label} {requested} exceeds {max} (a third of {frame_count} frames); clamped to {max}"
                ));
            }
        }

        if self.blend_mode == BlendMode::Fade {
            let clamped = self.clamped(frame_count);
            let span = clamped.start.max(clamped.end);
            if self.fade_frames == 0 {
                warnings.push("fade mode with fadeFrames 0 behaves as hard".to_string());
            } else if self.fade_frames > span && span > 0 {
                warnings.push(format!(
                    "fadeFrames {} is wider than the {span} replaced frames; the dissolve will not reach the original content",
                    self.fade_frames
                ));
            }
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_is_single_hard_frame() {
        let options = SnappingOptions::default();
        assert_eq!(options.start_frame_count, 1);
        assert_eq!(options.end_frame_count, 1);
        assert_eq!(options.blend_mode, BlendMode::Hard);
        assert_eq!(options.fade_frames, 0);
    }

    #[rstest]
    #[case(48, 1, 1)]
    #[case(48, 16, 16)]
    #[case(48, 20, 16)]
    #[case(48, usize::MAX, 16)]
    #[case(2, 1, 0)]
    #[case(0, 5, 0)]
    fn test_clamp_to_a_third(#[case] frames: usize, #[case] requested: usize, #[case] expected: usize) {
        let clamped = SnappingOptions::hard(requested, requested).clamped(frames);
        assert_eq!(clamped.start, expected);
        assert_eq!(clamped.end, expected);
    }

    #[test]
    fn test_valid_request_has_no_warnings() {
        assert!(SnappingOptions::hard(1, 1).validate(48).is_empty());
    }

    #[test]
    fn test_oversized_request_warns() {
        let warnings = SnappingOptions::hard(20, 1).validate(48);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("startFrameCount 20"));
        assert!(warnings[0].contains("clamped to 16"));
    }

    #[test]
    fn test_fade_warnings() {
        assert_eq!(SnappingOptions::fade(4, 4, 0).validate(48).len(), 1);
        let wide = SnappingOptions::fade(4, 4, 10).validate(48);
        assert_eq!(wide.len(), 1);
        assert!(wide[0].contains("fadeFrames 10"));
        assert!(SnappingOptions::fade(4, 4, 4).validate(48).is_empty());
    }

    #[test]
    fn test_hard_ignores_fade_frames() {
        let mut options = SnappingOptions::hard(3, 3);
        options.fade_frames = 5;
        assert_eq!(options.effective_fade_frames(), 0);
        options.blend_mode = BlendMode::Fade;
        assert_eq!(options.effective_fade_frames(), 5);
    }

    #[test]
    fn test_deserialize_camel_case_with_defaults() {
        let options: SnappingOptions =
            serde_json::from_str(r#"{"startFrameCount": 3, "blendMode": "fade", "fadeFrames": 2}"#)
                .unwrap();
        assert_eq!(options, SnappingOptions::fade(3, 1, 2));
    }
}
