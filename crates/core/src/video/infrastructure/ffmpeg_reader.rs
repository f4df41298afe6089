use std::path::{Path, PathBuf};

use ffmpeg_next::format::context::Input;
use ffmpeg_next::Rational;

use crate::shared::error::{MediaError, MediaResult};
use crate::shared::frame::{Frame, TimedFrame, CHANNELS};
use crate::shared::frame_sequence::validate_fps;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

/// Decodes video frames via ffmpeg-next (libavformat + libavcodec).
///
/// Converts each decoded frame to RGBA and wraps it in a [`TimedFrame`]
/// whose timestamp is relative to the stream start.
pub struct FfmpegReader {
    input_ctx: Option<Input>,
    path: Option<PathBuf>,
    video_stream_index: usize,
    time_base: Rational,
    start_secs: f64,
    metadata: Option<VideoMetadata>,
}

// Safety: FfmpegReader is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn new() -> Self {
        Self {
            input_ctx: None,
            path: None,
            video_stream_index: 0,
            time_base: Rational(1, 1),
            start_secs: 0.0,
            metadata: None,
        }
    }

    fn opened(&self) -> MediaResult<&VideoMetadata> {
        self.metadata
            .as_ref()
            .ok_or_else(|| MediaError::decode("FfmpegReader: not opened"))
    }

    fn session(&self) -> MediaResult<DecodeSession> {
        let ictx = self
            .input_ctx
            .as_ref()
            .ok_or_else(|| MediaError::decode("FfmpegReader: not opened"))?;
        let metadata = self.opened()?;
        DecodeSession::open(
            ictx,
            self.video_stream_index,
            self.time_base,
            self.start_secs,
            metadata.native_fps,
        )
    }

    /// Positions the demuxer at or before `timestamp_secs`.
    ///
    /// Backward seeks land on the preceding keyframe; pre-roll frames are
    /// skipped by the caller's timestamp filter. When the container refuses
    /// to seek, the input is reopened and decoding restarts from zero.
    fn rewind_to(&mut self, timestamp_secs: f64) -> MediaResult<()> {
        let ictx = self
            .input_ctx
            .as_mut()
            .ok_or_else(|| MediaError::decode("FfmpegReader: not opened"))?;
        let absolute = (timestamp_secs + self.start_secs).max(0.0);
        let target = (absolute * ffmpeg_next::ffi::AV_TIME_BASE as f64) as i64;
        match ictx.seek(target, ..target) {
            Ok(()) => Ok(()),
            Err(e) => {
                log::warn!("Seek to {timestamp_secs:.3}s failed ({e}), reopening input");
                let path = self
                    .path
                    .as_ref()
                    .ok_or_else(|| MediaError::decode("FfmpegReader: not opened"))?;
                let reopened = ffmpeg_next::format::input(path).map_err(MediaError::decode)?;
                self.input_ctx = Some(reopened);
                Ok(())
            }
        }
    }

    fn decode_remaining(&mut self) -> MediaResult<Option<TimedFrame>> {
        let mut session = self.session()?;
        let ictx = self
            .input_ctx
            .as_mut()
            .ok_or_else(|| MediaError::decode("FfmpegReader: not opened"))?;
        let mut last = None;
        while let Some(frame) = session.next_frame(ictx)? {
            last = Some(frame);
        }
        Ok(last)
    }
}

impl Default for FfmpegReader {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoReader for FfmpegReader {
    fn open(&mut self, path: &Path, fps: f64) -> MediaResult<VideoMetadata> {
        validate_fps(fps)?;
        if !path.is_file() {
            return Err(MediaError::InputNotFound(path.to_path_buf()));
        }
        ffmpeg_next::init().map_err(MediaError::decode)?;

        let ictx = ffmpeg_next::format::input(path).map_err(MediaError::decode)?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| MediaError::decode("No video stream found"))?;

        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(MediaError::decode)?;
        let decoder = codec_ctx.decoder().video().map_err(MediaError::decode)?;

        let time_base = stream.time_base();
        let start_secs = if stream.start_time() == ffmpeg_next::ffi::AV_NOPTS_VALUE {
            0.0
        } else {
            stream.start_time() as f64 * f64::from(time_base)
        };

        let rate = stream.avg_frame_rate();
        let rate = if rate.denominator() != 0 && rate.numerator() != 0 {
            rate
        } else {
            stream.rate()
        };
        let native_fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        let duration_secs = video_duration_secs(
            (stream.duration() > 0).then(|| stream.duration() as f64 * f64::from(time_base)),
            (ictx.duration() > 0)
                .then(|| ictx.duration() as f64 / ffmpeg_next::ffi::AV_TIME_BASE as f64),
        );

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            fps,
            native_fps,
            duration_secs,
            total_frames: stream.frames().max(0) as usize,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source_path: Some(path.to_path_buf()),
        };

        self.video_stream_index = video_stream_index;
        self.time_base = time_base;
        self.start_secs = start_secs;
        self.metadata = Some(metadata.clone());
        self.path = Some(path.to_path_buf());
        self.input_ctx = Some(ictx);

        Ok(metadata)
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = MediaResult<TimedFrame>> + '_> {
        let session = match self.session() {
            Ok(session) => session,
            Err(e) => return Box::new(std::iter::once(Err(e))),
        };
        let Some(ictx) = self.input_ctx.as_mut() else {
            return Box::new(std::iter::once(Err(MediaError::decode(
                "FfmpegReader: not opened",
            ))));
        };

        Box::new(FfmpegFrameIter {
            ictx,
            session,
            done: false,
        })
    }

    fn frame_at(&mut self, timestamp_secs: f64) -> MediaResult<Option<TimedFrame>> {
        let metadata = self.opened()?.clone();
        if timestamp_secs < 0.0
            || (metadata.duration_secs > 0.0 && timestamp_secs >= metadata.duration_secs)
        {
            return Ok(None);
        }

        // Half a native frame absorbs timestamp rounding in the container.
        let tolerance = if metadata.native_fps > 0.0 {
            0.5 / metadata.native_fps
        } else {
            0.5 / metadata.fps
        };

        self.rewind_to(timestamp_secs)?;
        let mut session = self.session()?;
        let ictx = self
            .input_ctx
            .as_mut()
            .ok_or_else(|| MediaError::decode("FfmpegReader: not opened"))?;

        let mut candidate: Option<TimedFrame> = None;
        while let Some(decoded) = session.next_frame(ictx)? {
            if decoded.timestamp_secs > timestamp_secs + tolerance {
                // The seek may land past the target on sparse-keyframe streams.
                return Ok(Some(candidate.unwrap_or(decoded)));
            }
            candidate = Some(decoded);
        }
        // Without a known duration the stream end is the only bound.
        Ok(candidate.filter(|last| last.is_shown_at(timestamp_secs, 2.0 * tolerance)))
    }

    fn last_frame(&mut self, backoff_secs: f64) -> MediaResult<Option<TimedFrame>> {
        let duration = self.opened()?.duration_secs;

        if duration > 0.0 {
            self.rewind_to((duration - backoff_secs).max(0.0))?;
            if let Some(frame) = self.decode_remaining()? {
                return Ok(Some(frame));
            }
            log::debug!("No frame after {backoff_secs}s back-off, rescanning from start");
        }

        self.rewind_to(0.0)?;
        self.decode_remaining()
    }

    fn close(&mut self) {
        self.input_ctx = None;
        self.metadata = None;
        self.path = None;
    }
}

/// Length of the video track. The container's duration also covers longer
/// audio tracks, so it is only used when the stream reports none.
fn video_duration_secs(stream_secs: Option<f64>, container_secs: Option<f64>) -> f64 {
    stream_secs.or(container_secs).unwrap_or(0.0)
}

/// One decoder plus RGBA scaler, created fresh for every pass over the stream.
struct DecodeSession {
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    video_stream_index: usize,
    time_base: Rational,
    start_secs: f64,
    fallback_interval: f64,
    decoded: usize,
    flushing: bool,
}

impl DecodeSession {
    fn open(
        ictx: &Input,
        video_stream_index: usize,
        time_base: Rational,
        start_secs: f64,
        native_fps: f64,
    ) -> MediaResult<Self> {
        let stream = ictx
            .stream(video_stream_index)
            .ok_or_else(|| MediaError::decode("Video stream disappeared"))?;
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(MediaError::decode)?;
        let decoder = codec_ctx.decoder().video().map_err(MediaError::decode)?;

        let width = decoder.width();
        let height = decoder.height();

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGBA,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(MediaError::decode)?;

        Ok(Self {
            decoder,
            scaler,
            width,
            height,
            video_stream_index,
            time_base,
            start_secs,
            fallback_interval: if native_fps > 0.0 { 1.0 / native_fps } else { 0.0 },
            decoded: 0,
            flushing: false,
        })
    }

    fn try_receive(&mut self) -> MediaResult<Option<TimedFrame>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }

        let mut rgba_frame = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler
            .run(&decoded, &mut rgba_frame)
            .map_err(MediaError::decode)?;

        let timestamp_secs = match decoded.timestamp().or(decoded.pts()) {
            Some(ts) => ts as f64 * f64::from(self.time_base) - self.start_secs,
            None => self.decoded as f64 * self.fallback_interval,
        };

        let pixels = extract_rgba_pixels(&rgba_frame, self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, self.decoded);
        self.decoded += 1;
        Ok(Some(TimedFrame {
            frame,
            timestamp_secs,
        }))
    }

    /// Decodes the next frame, or `None` once the stream is drained.
    fn next_frame(&mut self, ictx: &mut Input) -> MediaResult<Option<TimedFrame>> {
        if let Some(frame) = self.try_receive()? {
            return Ok(Some(frame));
        }
        if self.flushing {
            return Ok(None);
        }

        loop {
            let Some((stream, packet)) = ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                return self.try_receive();
            };

            if stream.index() != self.video_stream_index {
                continue;
            }

            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }

            if let Some(frame) = self.try_receive()? {
                return Ok(Some(frame));
            }
        }
    }
}

/// Lazy iterator that decodes video frames one at a time, avoiding the need
/// to buffer the entire video in memory.
struct FfmpegFrameIter<'a> {
    ictx: &'a mut Input,
    session: DecodeSession,
    done: bool,
}

impl Iterator for FfmpegFrameIter<'_> {
    type Item = MediaResult<TimedFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.session.next_frame(self.ictx) {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGBA buffer.
///
/// ffmpeg frames may have padding bytes at the end of each row (stride > width*4).
/// This function strips that padding to produce a tightly-packed pixel buffer.
fn extract_rgba_pixels(
    rgba_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgba_frame.stride(0);
    let data = rgba_frame.data(0);
    let row_bytes = width as usize * CHANNELS;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(row_bytes * h);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + row_bytes]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{gray_level, write_test_video};
    use approx::assert_relative_eq;

    #[test]
    fn test_open_returns_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_video(dir.path(), 24, 64, 48, 24.0);

        let mut reader = FfmpegReader::new();
        let meta = reader.open(&path, 24.0).unwrap();
        assert_eq!(meta.width, 64);
        assert_eq!(meta.height, 48);
        assert_relative_eq!(meta.fps, 24.0);
        assert!(meta.native_fps > 0.0);
        assert!(meta.duration_secs > 0.9 && meta.duration_secs < 1.1);
        assert_eq!(meta.source_path, Some(path));
    }

    #[test]
    fn test_stream_duration_wins_over_container() {
        // Audio track runs 1.5s past the video
        assert_relative_eq!(video_duration_secs(Some(2.0), Some(3.5)), 2.0);
        assert_relative_eq!(video_duration_secs(None, Some(3.5)), 3.5);
        assert_relative_eq!(video_duration_secs(None, None), 0.0);
    }

    #[test]
    fn test_open_nonexistent_is_not_found() {
        let mut reader = FfmpegReader::new();
        let err = reader
            .open(Path::new("/nonexistent/test.mp4"), 24.0)
            .unwrap_err();
        assert!(matches!(err, MediaError::InputNotFound(_)));
    }

    #[test]
    fn test_open_garbage_is_decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.mp4");
        std::fs::write(&path, b"definitely not a video").unwrap();
        let mut reader = FfmpegReader::new();
        assert!(matches!(
            reader.open(&path, 24.0).unwrap_err(),
            MediaError::DecodeFailed(_)
        ));
    }

    #[test]
    fn test_open_rejects_missing_fps() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_video(dir.path(), 3, 64, 48, 24.0);
        let mut reader = FfmpegReader::new();
        assert!(matches!(
            reader.open(&path, 0.0).unwrap_err(),
            MediaError::InputMalformed(_)
        ));
    }

    #[test]
    fn test_frames_yields_correct_count_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_video(dir.path(), 5, 64, 48, 24.0);

        let mut reader = FfmpegReader::new();
        reader.open(&path, 24.0).unwrap();

        let frames: Vec<_> = reader.frames().map(|f| f.unwrap()).collect();
        assert_eq!(frames.len(), 5);
        for (i, timed) in frames.iter().enumerate() {
            assert_eq!(timed.frame.index(), i);
            assert_relative_eq!(timed.timestamp_secs, i as f64 / 24.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_frames_are_rgba() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_video(dir.path(), 2, 64, 48, 24.0);

        let mut reader = FfmpegReader::new();
        reader.open(&path, 24.0).unwrap();

        let timed = reader.frames().next().unwrap().unwrap();
        assert_eq!(timed.frame.data().len(), 64 * 48 * 4);
        assert_eq!(timed.frame.data()[3], 255);
    }

    #[test]
    fn test_frames_without_open_returns_error() {
        let mut reader = FfmpegReader::new();
        let result = reader.frames().next().unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn test_frame_at_seeks_to_requested_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_video(dir.path(), 24, 64, 48, 24.0);

        let mut reader = FfmpegReader::new();
        reader.open(&path, 24.0).unwrap();

        let timed = reader.frame_at(10.0 / 24.0).unwrap().unwrap();
        assert_relative_eq!(timed.timestamp_secs, 10.0 / 24.0, epsilon = 1e-3);
        let luma = timed.frame.data()[0] as i32;
        assert!((luma - gray_level(10) as i32).abs() <= 6, "luma {luma}");
    }

    #[test]
    fn test_frame_at_past_end_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_video(dir.path(), 6, 64, 48, 24.0);

        let mut reader = FfmpegReader::new();
        reader.open(&path, 24.0).unwrap();
        assert!(reader.frame_at(10.0).unwrap().is_none());
    }

    #[test]
    fn test_last_frame_is_final_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_video(dir.path(), 24, 64, 48, 24.0);

        let mut reader = FfmpegReader::new();
        reader.open(&path, 24.0).unwrap();

        let timed = reader.last_frame(0.1).unwrap().unwrap();
        assert_relative_eq!(timed.timestamp_secs, 23.0 / 24.0, epsilon = 1e-3);
        let luma = timed.frame.data()[0] as i32;
        assert!((luma - gray_level(23) as i32).abs() <= 6, "luma {luma}");
    }

    #[test]
    fn test_last_frame_with_oversized_backoff_still_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_video(dir.path(), 4, 64, 48, 24.0);

        let mut reader = FfmpegReader::new();
        reader.open(&path, 24.0).unwrap();
        let timed = reader.last_frame(30.0).unwrap().unwrap();
        assert_relative_eq!(timed.timestamp_secs, 3.0 / 24.0, epsilon = 1e-3);
    }

    #[test]
    fn test_close_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_video(dir.path(), 1, 64, 48, 24.0);

        let mut reader = FfmpegReader::new();
        reader.open(&path, 24.0).unwrap();
        reader.close();
        reader.close();
        assert!(reader.frame_at(0.0).is_err());
    }
}
