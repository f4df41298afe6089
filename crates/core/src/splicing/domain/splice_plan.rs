use serde::{Deserialize, Serialize};

use crate::shared::constants::DEFAULT_SEGMENT_DURATION_SECS;
use crate::splicing::domain::splice_options::SpliceOptions;

/// Where segment B's crossfade starts on segment A: `max(0, durA - frames/fps)`.
pub fn transition_offset(duration_a_secs: f64, transition_frames: usize, fps: f64) -> f64 {
    (duration_a_secs - transition_frames as f64 / fps).max(0.0)
}

/// Timing of one splice, computed before the transcoder runs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplicePlan {
    pub duration_a_secs: f64,
    /// True when segment A reported no usable duration and the default was assumed.
    pub duration_a_assumed: bool,
    pub transition_secs: f64,
    pub offset_secs: f64,
}

impl SplicePlan {
    /// `probed_duration_a` is `None` when probing failed or reported no duration.
    pub fn new(probed_duration_a: Option<f64>, options: &SpliceOptions) -> Self {
        let (duration_a_secs, duration_a_assumed) = match probed_duration_a {
            Some(d) => (d, false),
            None => (DEFAULT_SEGMENT_DURATION_SECS, true),
        };
        Self {
            duration_a_secs,
            duration_a_assumed,
            transition_secs: options.transition_secs(),
            offset_secs: transition_offset(
                duration_a_secs,
                options.transition_frames,
                options.fps,
            ),
        }
    }

    /// A zero-frame window splices with a hard cut instead of a crossfade.
    pub fn is_hard_cut(&self) -> bool {
        self.transition_secs <= 0.0
    }

    /// Output length: segment B plays out in full from the offset.
    pub fn expected_duration(&self, duration_b_secs: f64) -> f64 {
        self.offset_secs + duration_b_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_two_second_clips_one_frame_transition() {
        let plan = SplicePlan::new(Some(2.0), &SpliceOptions::new(24.0));
        assert_relative_eq!(plan.transition_secs, 0.041_666_666, epsilon = 1e-6);
        assert_relative_eq!(plan.offset_secs, 1.958_333_333, epsilon = 1e-6);
        assert!(!plan.duration_a_assumed);
        assert_relative_eq!(plan.expected_duration(2.0), 3.958_333_333, epsilon = 1e-6);
    }

    #[rstest]
    #[case(0.0, 10, 24.0)]
    #[case(0.1, 48, 24.0)]
    #[case(5.0, 1000, 30.0)]
    fn test_offset_never_negative(#[case] duration: f64, #[case] frames: usize, #[case] fps: f64) {
        assert!(transition_offset(duration, frames, fps) >= 0.0);
    }

    #[test]
    fn test_unprobed_duration_falls_back_to_default() {
        let options = SpliceOptions::new(25.0).with_transition_frames(25);
        let plan = SplicePlan::new(None, &options);
        assert!(plan.duration_a_assumed);
        assert_relative_eq!(plan.duration_a_secs, DEFAULT_SEGMENT_DURATION_SECS);
        assert_relative_eq!(plan.offset_secs, DEFAULT_SEGMENT_DURATION_SECS - 1.0);
    }

    #[test]
    fn test_zero_frames_is_hard_cut_at_end_of_a() {
        let plan = SplicePlan::new(Some(3.0), &SpliceOptions::new(24.0).with_transition_frames(0));
        assert!(plan.is_hard_cut());
        assert_relative_eq!(plan.offset_secs, 3.0);
        assert_relative_eq!(plan.expected_duration(2.0), 5.0);
    }
}
