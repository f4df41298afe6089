use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

/// Every failure the continuity layer can report.
///
/// Errors never cross a component boundary as panics; use cases fold them
/// into their tagged result types so callers branch on [`MediaError::class`].
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Malformed input: {0}")]
    InputMalformed(String),

    #[error("{capability} is not available")]
    CapabilityUnavailable { capability: String },

    #[error("Decode failed: {0}")]
    DecodeFailed(String),

    #[error("Frame {index} not found")]
    FrameNotFound { index: usize },

    #[error("Encode failed: {0}")]
    EncodeFailed(String),

    #[error("{tool} exited with status {}: {diagnostic}", describe_exit(.exit_code))]
    SubprocessFailed {
        tool: String,
        exit_code: Option<i32>,
        diagnostic: String,
    },

    #[error("Failed to spawn {tool}: {source}")]
    SpawnFailed {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    code.map_or_else(|| "<signal>".to_string(), |c| c.to_string())
}

/// Flat error taxonomy used in structured reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    InputNotFound,
    InputMalformed,
    CapabilityUnavailable,
    DecodeFailed,
    EncodeFailed,
    SubprocessNonzeroExit,
    SubprocessSpawnFailed,
    Timeout,
    Cancelled,
    Io,
}

/// The three outcomes a caller distinguishes when post-processing fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureClass {
    /// Skip post-processing and keep the unmodified input.
    Unavailable,
    /// Surface as a failure of the specific scene or segment.
    Data,
    /// Offer a manual retry.
    Timeout,
}

impl MediaError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::InputMalformed(message.into())
    }

    pub fn decode(message: impl std::fmt::Display) -> Self {
        Self::DecodeFailed(message.to_string())
    }

    pub fn encode(message: impl std::fmt::Display) -> Self {
        Self::EncodeFailed(message.to_string())
    }

    pub fn unavailable(capability: impl Into<String>) -> Self {
        Self::CapabilityUnavailable {
            capability: capability.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InputNotFound(_) | Self::FrameNotFound { .. } => ErrorKind::InputNotFound,
            Self::InputMalformed(_) => ErrorKind::InputMalformed,
            Self::CapabilityUnavailable { .. } => ErrorKind::CapabilityUnavailable,
            Self::DecodeFailed(_) => ErrorKind::DecodeFailed,
            Self::EncodeFailed(_) => ErrorKind::EncodeFailed,
            Self::SubprocessFailed { .. } => ErrorKind::SubprocessNonzeroExit,
            Self::SpawnFailed { .. } => ErrorKind::SubprocessSpawnFailed,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Io { .. } => ErrorKind::Io,
        }
    }

    pub fn class(&self) -> FailureClass {
        match self.kind() {
            ErrorKind::CapabilityUnavailable | ErrorKind::SubprocessSpawnFailed => {
                FailureClass::Unavailable
            }
            ErrorKind::Timeout | ErrorKind::Cancelled => FailureClass::Timeout,
            _ => FailureClass::Data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::missing(MediaError::InputNotFound(PathBuf::from("/x.mp4")), ErrorKind::InputNotFound)]
    #[case::frame(MediaError::FrameNotFound { index: 7 }, ErrorKind::InputNotFound)]
    #[case::malformed(MediaError::malformed("bad"), ErrorKind::InputMalformed)]
    #[case::exit(
        MediaError::SubprocessFailed { tool: "ffmpeg".into(), exit_code: Some(1), diagnostic: String::new() },
        ErrorKind::SubprocessNonzeroExit
    )]
    #[case::cancelled(MediaError::Cancelled, ErrorKind::Cancelled)]
    fn test_kind_mapping(#[case] error: MediaError, #[case] expected: ErrorKind) {
        assert_eq!(error.kind(), expected);
    }

    #[test]
    fn test_missing_tool_is_unavailable() {
        assert_eq!(
            MediaError::unavailable("ffprobe").class(),
            FailureClass::Unavailable
        );
        let spawn = MediaError::SpawnFailed {
            tool: "ffmpeg".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(spawn.class(), FailureClass::Unavailable);
    }

    #[test]
    fn test_timeout_and_cancel_share_class() {
        assert_eq!(
            MediaError::Timeout(Duration::from_secs(3)).class(),
            FailureClass::Timeout
        );
        assert_eq!(MediaError::Cancelled.class(), FailureClass::Timeout);
    }

    #[test]
    fn test_data_errors() {
        assert_eq!(MediaError::decode("eof").class(), FailureClass::Data);
        assert_eq!(MediaError::encode("x264").class(), FailureClass::Data);
    }

    #[test]
    fn test_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&ErrorKind::CapabilityUnavailable).unwrap();
        assert_eq!(json, "\"capability-unavailable\"");
    }

    #[test]
    fn test_subprocess_message_includes_tail() {
        let err = MediaError::SubprocessFailed {
            tool: "ffmpeg".into(),
            exit_code: Some(234),
            diagnostic: "Invalid argument".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("234"));
        assert!(msg.contains("Invalid argument"));
    }
}
