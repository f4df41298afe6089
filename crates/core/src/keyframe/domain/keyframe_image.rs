use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::shared::error::{MediaError, MediaResult};

/// Which end of a sequence a reference still is pinned to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyframeRole {
    Start,
    End,
}

impl std::fmt::Display for KeyframeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::End => write!(f, "end"),
        }
    }
}

/// An encoded reference still: raw base64 or a `data:` URL.
///
/// Holds the text as supplied; decoding happens per call and is never cached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyframeImage {
    pub role: KeyframeRole,
    pub data: String,
}

impl KeyframeImage {
    pub fn new(role: KeyframeRole, data: impl Into<String>) -> Self {
        Self {
            role,
            data: data.into(),
        }
    }

    pub fn start(data: impl Into<String>) -> Self {
        Self::new(KeyframeRole::Start, data)
    }

    pub fn end(data: impl Into<String>) -> Self {
        Self::new(KeyframeRole::End, data)
    }

    /// Wraps encoded image bytes as a base64 data URL.
    pub fn from_encoded_bytes(role: KeyframeRole, mime_type: &str, bytes: &[u8]) -> Self {
        Self::new(
            role,
            format!("data:{mime_type};base64,{}", STANDARD.encode(bytes)),
        )
    }

    /// MIME type declared by a data-URL prefix, if any.
    pub fn mime_type(&self) -> Option<&str> {
        let header = self.data.trim_start().strip_prefix("data:")?;
        let header = &header[..header.find(',')?];
        let mime = header.split(';').next().unwrap_or_default();
        (!mime.is_empty()).then_some(mime)
    }

    /// The base64 payload with any `data:...,` prefix removed.
    pub fn payload(&self) -> &str {
        let data = self.data.trim();
        match data.strip_prefix("data:") {
            Some(rest) => rest.split_once(',').map_or("", |(_, payload)| payload),
            None => data,
        }
    }

    /// Decodes the base64 payload into encoded image bytes.
    pub fn to_bytes(&self) -> MediaResult<Vec<u8>> {
        let payload: String = self
            .payload()
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        if payload.is_empty() {
            return Err(MediaError::malformed(format!(
                "{} keyframe has no image data",
                self.role
            )));
        }
        STANDARD.decode(payload.as_bytes()).map_err(|e| {
            MediaError::malformed(format!("{} keyframe is not valid base64: {e}", self.role))
        })
    }
}
