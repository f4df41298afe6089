use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::shared::error::{MediaError, MediaResult};

/// The two external programs the splicer depends on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaTool {
    Transcoder,
    Prober,
}

impl std::fmt::Display for MediaTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transcoder => write!(f, "transcoder"),
            Self::Prober => write!(f, "prober"),
        }
    }
}

/// Program names or paths for the media toolchain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toolchain {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

/// Where each tool was found, if anywhere.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainReport {
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
}

impl ToolchainReport {
    pub fn is_complete(&self) -> bool {
        self.ffmpeg.is_some() && self.ffprobe.is_some()
    }
}

impl Toolchain {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    pub fn program(&self, tool: MediaTool) -> &Path {
        match tool {
            MediaTool::Transcoder => &self.ffmpeg,
            MediaTool::Prober => &self.ffprobe,
        }
    }

    /// Resolves `tool` on `PATH` (or checks an explicit path).
    pub fn check_tool_available(&self, tool: MediaTool) -> MediaResult<PathBuf> {
        let program = self.program(tool);
        which::which(program).map_err(|_| {
            MediaError::unavailable(format!("{tool} '{}'", program.display()))
        })
    }

    pub fn report(&self) -> ToolchainReport {
        ToolchainReport {
            ffmpeg: self.check_tool_available(MediaTool::Transcoder).ok(),
            ffprobe: self.check_tool_available(MediaTool::Prober).ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::error::FailureClass;

    #[test]
    fn test_default_programs() {
        let toolchain = Toolchain::default();
        assert_eq!(toolchain.program(MediaTool::Transcoder), Path::new("ffmpeg"));
        assert_eq!(toolchain.program(MediaTool::Prober), Path::new("ffprobe"));
    }

    #[test]
    fn test_missing_tool_is_unavailable() {
        let toolchain = Toolchain::new("ffmpeg-definitely-missing", "/nonexistent/ffprobe");
        let err = toolchain
            .check_tool_available(MediaTool::Prober)
            .unwrap_err();
        assert_eq!(err.class(), FailureClass::Unavailable);
        assert!(err.to_string().contains("prober"));

        let report = toolchain.report();
        assert!(report.ffmpeg.is_none());
        assert!(!report.is_complete());
    }
}
