use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::shared::error::{MediaError, MediaResult};

/// Where an encoded video comes from: a file on disk or an in-memory blob.
#[derive(Clone, Debug)]
pub enum VideoSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl VideoSource {
    /// Makes the source addressable by path for the demuxer.
    ///
    /// Blobs are spilled into a temp file owned by the returned handle and
    /// removed when it drops.
    pub fn materialize(&self) -> MediaResult<MaterializedSource> {
        match self {
            Self::Path(path) => {
                if !path.is_file() {
                    return Err(MediaError::InputNotFound(path.clone()));
                }
                Ok(MaterializedSource::Borrowed(path.clone()))
            }
            Self::Bytes(bytes) => {
                if bytes.is_empty() {
                    return Err(MediaError::malformed("video blob is empty"));
                }
                let mut file = NamedTempFile::new()
                    .map_err(|e| MediaError::io("Failed to create temp file", e))?;
                file.write_all(bytes)
                    .and_then(|_| file.flush())
                    .map_err(|e| MediaError::io("Failed to spill video blob", e))?;
                Ok(MaterializedSource::Spilled(file))
            }
        }
    }
}

impl From<PathBuf> for VideoSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for VideoSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for VideoSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

/// A readable path that stays valid for the lifetime of this value.
pub enum MaterializedSource {
    Borrowed(PathBuf),
    Spilled(NamedTempFile),
}

impl MaterializedSource {
    pub fn path(&self) -> &Path {
        match self {
            Self::Borrowed(path) => path,
            Self::Spilled(file) => file.path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_source_must_exist() {
        let source = VideoSource::from(PathBuf::from("/nonexistent/clip.mp4"));
        let err = source.materialize().err().unwrap();
        assert!(matches!(err, MediaError::InputNotFound(_)));
    }

    #[test]
    fn test_existing_path_is_borrowed() {
        let file = NamedTempFile::new().unwrap();
        let source = VideoSource::from(file.path());
        let materialized = source.materialize().unwrap();
        assert_eq!(materialized.path(), file.path());
    }

    #[test]
    fn test_bytes_are_spilled_and_cleaned_up() {
        let source = VideoSource::from(vec![1u8, 2, 3]);
        let materialized = source.materialize().unwrap();
        let path = materialized.path().to_path_buf();
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
        drop(materialized);
        assert!(!path.exists());
    }

    #[test]
    fn test_empty_blob_is_malformed() {
        let err = VideoSource::from(Vec::new()).materialize().err().unwrap();
        assert!(matches!(err, MediaError::InputMalformed(_)));
    }
}
