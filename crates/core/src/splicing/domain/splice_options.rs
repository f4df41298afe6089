use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::shared::constants::{DEFAULT_SPLICE_CODEC, DEFAULT_SPLICE_CRF};
use crate::shared::error::{MediaError, MediaResult};
use crate::shared::frame_sequence::validate_fps;

/// Highest CRF accepted by the x264/x265 family.
const MAX_CRF: u8 = 51;

/// Crossfade shape, named after the transcoder's `xfade` transitions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionType {
    #[default]
    Fade,
    Dissolve,
    FadeBlack,
    FadeWhite,
    WipeLeft,
    WipeRight,
    SlideLeft,
    SlideRight,
}

impl TransitionType {
    pub const ALL: [TransitionType; 8] = [
        Self::Fade,
        Self::Dissolve,
        Self::FadeBlack,
        Self::FadeWhite,
        Self::WipeLeft,
        Self::WipeRight,
        Self::SlideLeft,
        Self::SlideRight,
    ];

    pub fn xfade_name(self) -> &'static str {
        match self {
            Self::Fade => "fade",
            Self::Dissolve => "dissolve",
            Self::FadeBlack => "fadeblack",
            Self::FadeWhite => "fadewhite",
            Self::WipeLeft => "wipeleft",
            Self::WipeRight => "wiperight",
            Self::SlideLeft => "slideleft",
            Self::SlideRight => "slideright",
        }
    }
}

impl std::fmt::Display for TransitionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.xfade_name())
    }
}

impl FromStr for TransitionType {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.xfade_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| MediaError::malformed(format!("unknown transition type '{s}'")))
    }
}

/// Parameters of one splice. `fps` has no default and must be supplied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpliceOptions {
    pub transition_frames: usize,
    #[serde(default)]
    pub transition_type: TransitionType,
    pub fps: f64,
    pub codec: String,
    pub crf: u8,
}

impl SpliceOptions {
    pub fn new(fps: f64) -> Self {
        Self {
            transition_frames: 1,
            transition_type: TransitionType::Fade,
            fps,
            codec: DEFAULT_SPLICE_CODEC.to_string(),
            crf: DEFAULT_SPLICE_CRF,
        }
    }

    pub fn with_transition_frames(mut self, frames: usize) -> Self {
        self.transition_frames = frames;
        self
    }

    pub fn with_transition_type(mut self, transition_type: TransitionType) -> Self {
        self.transition_type = transition_type;
        self
    }

    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = codec.into();
        self
    }

    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf;
        self
    }

    /// Length of the crossfade window in seconds.
    pub fn transition_secs(&self) -> f64 {
        self.transition_frames as f64 / self.fps
    }

    pub fn validate(&self) -> MediaResult<()> {
        validate_fps(self.fps)?;
        if self.codec.trim().is_empty() {
            return Err(MediaError::malformed("codec must not be empty"));
        }
        if self.crf > MAX_CRF {
            return Err(MediaError::malformed(format!(
                "crf {} is above the maximum of {MAX_CRF}",
                self.crf
            )));
        }
        Ok(())
    }
}
