use crate::shared::constants::LAST_FRAME_BACKOFF_SECS;
use crate::shared::error::{MediaError, MediaResult};
use crate::shared::frame::{Frame, TimedFrame};
use crate::shared::frame_sequence::{validate_fps, FrameSequence};
use crate::shared::video_metadata::VideoMetadata;
use crate::shared::video_source::VideoSource;
use crate::video::domain::video_reader::VideoReader;

/// Decodes a video onto the caller's nominal frame grid.
///
/// Every call opens and closes its own decode session on the owned reader.
pub struct ExtractFramesUseCase {
    reader: Box<dyn VideoReader>,
}

impl ExtractFramesUseCase {
    pub fn new(reader: Box<dyn VideoReader>) -> Self {
        Self { reader }
    }

    /// Full-sequence decode. An unopenable or frameless video yields the
    /// explicit empty sequence; only an invalid `fps` is an error.
    pub fn extract_all(&mut self, source: &VideoSource, fps: f64) -> MediaResult<FrameSequence> {
        validate_fps(fps)?;
        match self.try_extract_all(source, fps) {
            Ok(sequence) => Ok(sequence),
            Err(e) => {
                log::warn!("Extraction failed, returning empty sequence: {e}");
                Ok(FrameSequence::empty(fps))
            }
        }
    }

    /// Like [`Self::extract_all`] but reports why decoding failed.
    pub fn try_extract_all(
        &mut self,
        source: &VideoSource,
        fps: f64,
    ) -> MediaResult<FrameSequence> {
        let materialized = source.materialize()?;
        let metadata = self.reader.open(materialized.path(), fps)?;
        let result = resample(self.reader.frames(), &metadata);
        self.reader.close();

        let frames = result?;
        log::debug!(
            "Extracted {} frames at {fps} fps ({} native, {:.3}s)",
            frames.len(),
            metadata.native_fps,
            metadata.duration_secs
        );
        FrameSequence::new(frames, fps)
    }

    /// Decodes only the frame at `index / fps`.
    pub fn extract_frame(
        &mut self,
        source: &VideoSource,
        index: usize,
        fps: f64,
    ) -> MediaResult<Frame> {
        let materialized = source.materialize()?;
        let metadata = self.reader.open(materialized.path(), fps)?;

        let nominal = metadata.nominal_frame_count();
        let result = if nominal > 0 && index >= nominal {
            Ok(None)
        } else {
            self.reader.frame_at(index as f64 / fps)
        };
        self.reader.close();

        match result? {
            Some(timed) => Ok(timed.frame.with_index(index)),
            None => Err(MediaError::FrameNotFound { index }),
        }
    }

    /// Decodes the true final frame, seeking from just before the end.
    pub fn extract_last_frame(&mut self, source: &VideoSource, fps: f64) -> MediaResult<Frame> {
        let materialized = source.materialize()?;
        let metadata = self.reader.open(materialized.path(), fps)?;
        let result = self.reader.last_frame(LAST_FRAME_BACKOFF_SECS);
        self.reader.close();

        let last_index = metadata.nominal_frame_count().saturating_sub(1);
        match result? {
            Some(timed) => Ok(timed.frame.with_index(last_index)),
            None => Err(MediaError::FrameNotFound { index: last_index }),
        }
    }
}

/// Samples decoded frames at `t_i = i / fps`, holding the most recent frame.
///
/// The grid covers `round(duration * fps)` points. Without a known duration
/// every decoded frame is kept once.
fn resample<'a>(
    decoded: Box<dyn Iterator<Item = MediaResult<TimedFrame>> + 'a>,
    metadata: &VideoMetadata,
) -> MediaResult<Vec<Frame>> {
    let count = metadata.nominal_frame_count();
    if count == 0 {
        return decoded
            .enumerate()
            .map(|(i, timed)| timed.map(|t| t.frame.with_index(i)))
            .collect();
    }

    let fps = metadata.fps;
    // Absorbs container timestamp rounding around grid points.
    let tolerance = 0.25 / fps;
    let mut decoded = decoded;
    let mut out = Vec::with_capacity(count);
    let mut held: Option<Frame> = None;
    let mut pending: Option<TimedFrame> = None;

    for i in 0..count {
        let due = i as f64 / fps + tolerance;
        loop {
            if pending.is_none() {
                pending = decoded.next().transpose()?;
            }
            match pending.take() {
                Some(next) if held.is_none() || next.timestamp_secs <= due => {
                    held = Some(next.frame);
                }
                Some(next) => {
                    pending = Some(next);
                    break;
                }
                None => break,
            }
        }
        match &held {
            Some(frame) => out.push(frame.with_index(i)),
            None => break,
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{gray_level, write_test_video};
    use crate::video::infrastructure::ffmpeg_reader::FfmpegReader;
    use std::path::{Path, PathBuf};

    // --- Stubs ---

    /// Serves solid frames whose first byte is their decode order.
    struct StubReader {
        timestamps: Vec<f64>,
        metadata: VideoMetadata,
        fail_open: bool,
    }

    impl StubReader {
        fn new(timestamps: Vec<f64>, fps: f64, duration_secs: f64) -> Self {
            let mut metadata = VideoMetadata::for_encoding(2, 2, fps, timestamps.len());
            metadata.duration_secs = duration_secs;
            Self {
                timestamps,
                metadata,
                fail_open: false,
            }
        }

        fn timed(&self, i: usize) -> TimedFrame {
            TimedFrame {
                frame: Frame::solid(2, 2, [i as u8, 0, 0, 255], i),
                timestamp_secs: self.timestamps[i],
            }
        }
    }

    impl VideoReader for StubReader {
        fn open(&mut self, _path: &Path, fps: f64) -> MediaResult<VideoMetadata> {
            if self.fail_open {
                return Err(MediaError::decode("stub open failure"));
            }
            self.metadata.fps = fps;
            Ok(self.metadata.clone())
        }

        fn frames(&mut self) -> Box<dyn Iterator<Item = MediaResult<TimedFrame>> + '_> {
            Box::new((0..self.timestamps.len()).map(|i| Ok(self.timed(i))))
        }

        fn frame_at(&mut self, timestamp_secs: f64) -> MediaResult<Option<TimedFrame>> {
            let interval = 1.0 / self.metadata.native_fps;
            Ok(self
                .timestamps
                .iter()
                .rposition(|&t| t <= timestamp_secs + 1e-6)
                .map(|i| self.timed(i))
                .filter(|last| last.is_shown_at(timestamp_secs, interval)))
        }

        fn last_frame(&mut self, _backoff_secs: f64) -> MediaResult<Option<TimedFrame>> {
            Ok((!self.timestamps.is_empty()).then(|| self.timed(self.timestamps.len() - 1)))
        }

        fn close(&mut self) {}
    }

    fn existing_file() -> (tempfile::NamedTempFile, VideoSource) {
        let file = tempfile::NamedTempFile::new().unwrap();
        let source = VideoSource::from(file.path());
        (file, source)
    }

    fn order(sequence: &FrameSequence) -> Vec<u8> {
        sequence.frames().iter().map(|f| f.data()[0]).collect()
    }

    // --- Tests ---

    #[test]
    fn test_matching_rate_keeps_every_frame() {
        let (_file, source) = existing_file();
        let stamps = (0..6).map(|i| i as f64 / 24.0).collect();
        let mut uc = ExtractFramesUseCase::new(Box::new(StubReader::new(stamps, 24.0, 0.25)));
        let seq = uc.try_extract_all(&source, 24.0).unwrap();
        assert_eq!(order(&seq), vec![0, 1, 2, 3, 4, 5]);
        let indices: Vec<_> = seq.frames().iter().map(|f| f.index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_lower_native_rate_holds_frames() {
        // 12 fps content read on a 24 fps grid
        let (_file, source) = existing_file();
        let stamps = (0..4).map(|i| i as f64 / 12.0).collect();
        let mut uc = ExtractFramesUseCase::new(Box::new(StubReader::new(stamps, 12.0, 4.0 / 12.0)));
        let seq = uc.try_extract_all(&source, 24.0).unwrap();
        assert_eq!(order(&seq), vec![0, 0, 1, 1, 2, 2, 3, 3]);
    }

    #[test]
    fn test_higher_native_rate_drops_frames() {
        // 48 fps content read on a 24 fps grid
        let (_file, source) = existing_file();
        let stamps = (0..8).map(|i| i as f64 / 48.0).collect();
        let mut uc = ExtractFramesUseCase::new(Box::new(StubReader::new(stamps, 48.0, 8.0 / 48.0)));
        let seq = uc.try_extract_all(&source, 24.0).unwrap();
        assert_eq!(order(&seq), vec![0, 2, 4, 6]);
    }

    #[test]
    fn test_late_first_frame_is_held_backwards() {
        let (_file, source) = existing_file();
        let mut uc = ExtractFramesUseCase::new(Box::new(StubReader::new(vec![0.1, 0.2], 10.0, 0.3)));
        let seq = uc.try_extract_all(&source, 10.0).unwrap();
        assert_eq!(order(&seq), vec![0, 0, 1]);
    }

    #[test]
    fn test_unknown_duration_keeps_decoded_frames() {
        let (_file, source) = existing_file();
        let mut uc = ExtractFramesUseCase::new(Box::new(StubReader::new(vec![0.0, 0.5, 0.9], 24.0, 0.0)));
        assert_eq!(uc.try_extract_all(&source, 24.0).unwrap().frame_count(), 3);
    }

    #[test]
    fn test_unopenable_video_yields_empty_sequence() {
        let (_file, source) = existing_file();
        let mut reader = StubReader::new(vec![0.0], 24.0, 1.0);
        reader.fail_open = true;
        let mut uc = ExtractFramesUseCase::new(Box::new(reader));

        let seq = uc.extract_all(&source, 24.0).unwrap();
        assert_eq!(seq.frame_count(), 0);
        assert!(uc.try_extract_all(&source, 24.0).is_err());
    }

    #[test]
    fn test_missing_fps_is_still_an_error() {
        let (_file, source) = existing_file();
        let mut uc = ExtractFramesUseCase::new(Box::new(StubReader::new(vec![0.0], 24.0, 1.0)));
        assert!(matches!(
            uc.extract_all(&source, 0.0).unwrap_err(),
            MediaError::InputMalformed(_)
        ));
    }

    #[test]
    fn test_extract_frame_past_end_reports_index() {
        let (_file, source) = existing_file();
        let stamps = (0..24).map(|i| i as f64 / 24.0).collect();
        let mut uc = ExtractFramesUseCase::new(Box::new(StubReader::new(stamps, 24.0, 1.0)));
        let err = uc.extract_frame(&source, 30, 24.0).unwrap_err();
        assert!(matches!(err, MediaError::FrameNotFound { index: 30 }));

        let frame = uc.extract_frame(&source, 7, 24.0).unwrap();
        assert_eq!(frame.index(), 7);
        assert_eq!(frame.data()[0], 7);
    }

    #[test]
    fn test_extract_frame_past_end_without_duration() {
        let (_file, source) = existing_file();
        let stamps = (0..24).map(|i| i as f64 / 24.0).collect();
        let mut uc = ExtractFramesUseCase::new(Box::new(StubReader::new(stamps, 24.0, 0.0)));

        let err = uc.extract_frame(&source, 10_000, 24.0).unwrap_err();
        assert!(matches!(err, MediaError::FrameNotFound { index: 10_000 }));
        assert!(matches!(
            uc.extract_frame(&source, 24, 24.0).unwrap_err(),
            MediaError::FrameNotFound { index: 24 }
        ));

        let last = uc.extract_frame(&source, 23, 24.0).unwrap();
        assert_eq!(last.data()[0], 23);
    }

    #[test]
    fn test_extract_last_frame_of_empty_video() {
        let (_file, source) = existing_file();
        let mut uc = ExtractFramesUseCase::new(Box::new(StubReader::new(vec![], 24.0, 0.0)));
        assert!(matches!(
            uc.extract_last_frame(&source, 24.0).unwrap_err(),
            MediaError::FrameNotFound { index: 0 }
        ));
    }

    #[test]
    fn test_missing_path_is_not_found() {
        let mut uc = ExtractFramesUseCase::new(Box::new(StubReader::new(vec![0.0], 24.0, 1.0)));
        let source = VideoSource::from(PathBuf::from("/nonexistent/a.mp4"));
        assert!(matches!(
            uc.extract_last_frame(&source, 24.0).unwrap_err(),
            MediaError::InputNotFound(_)
        ));
    }

    // --- ffmpeg-backed ---

    #[test]
    fn test_real_video_from_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_video(dir.path(), 12, 64, 48, 24.0);
        let source = VideoSource::from(std::fs::read(&path).unwrap());

        let mut uc = ExtractFramesUseCase::new(Box::new(FfmpegReader::new()));
        let seq = uc.extract_all(&source, 24.0).unwrap();
        assert_eq!(seq.frame_count(), 12);
        assert_eq!((seq.width(), seq.height()), (64, 48));

        let last = uc.extract_last_frame(&source, 24.0).unwrap();
        assert_eq!(last.index(), 11);
        let luma = last.data()[0] as i32;
        assert!((luma - gray_level(11) as i32).abs() <= 6, "luma {luma}");
    }

    #[test]
    fn test_real_video_resampled_to_lower_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_video(dir.path(), 24, 64, 48, 24.0);
        let mut uc = ExtractFramesUseCase::new(Box::new(FfmpegReader::new()));
        let seq = uc.extract_all(&VideoSource::from(path), 12.0).unwrap();
        assert_eq!(seq.frame_count(), 12);
    }
}
