use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::keyframe::domain::keyframe_decoder::KeyframeDecoder;
use crate::keyframe::domain::keyframe_image::{KeyframeImage, KeyframeRole};
use crate::pipeline::extract_frames_use_case::ExtractFramesUseCase;
use crate::pipeline::pipeline_logger::{PipelineLogger, SnapStage};
use crate::shared::error::{MediaError, MediaResult};
use crate::shared::frame::Frame;
use crate::shared::frame_sequence::{validate_fps, FrameSequence};
use crate::shared::video_metadata::VideoMetadata;
use crate::shared::video_source::VideoSource;
use crate::snapping::domain::endpoint_snapper::EndpointSnapper;
use crate::snapping::domain::similarity::BoundaryQuality;
use crate::snapping::domain::snapping_options::SnappingOptions;
use crate::video::domain::media_codec::MediaCodec;

/// How frames are fed to the encoder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderPacing {
    /// As fast as the encoder accepts them.
    #[default]
    Unpaced,
    /// One frame per `1 / fps` of wall-clock time, so encoding takes at
    /// least `frame_count / fps` seconds.
    FixedInterval,
}

/// A successful snap: the re-encoded video plus what was done to it.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapOutput {
    #[serde(skip)]
    pub video: Vec<u8>,
    /// Extension of the container in `video`.
    pub container: String,
    pub original_frame_count: usize,
    pub start_frames_replaced: usize,
    pub end_frames_replaced: usize,
    pub fps: f64,
    pub warnings: Vec<String>,
    pub quality: BoundaryQuality,
    pub processing_time_ms: u64,
}

/// A failed snap. No partial output is ever produced.
#[derive(Debug)]
pub struct SnapFailure {
    pub error: MediaError,
    /// Frames decoded before the failure; 0 when decoding never finished.
    pub original_frame_count: usize,
    pub processing_time_ms: u64,
}

impl std::fmt::Display for SnapFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "snap failed: {}", self.error)
    }
}

impl std::error::Error for SnapFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

pub type SnapResult = Result<SnapOutput, SnapFailure>;

/// Decode → pin boundary frames to keyframes → evaluate → re-encode.
pub struct SnapEndpointsUseCase {
    codec: Arc<dyn MediaCodec>,
    decoder: Arc<dyn KeyframeDecoder>,
    logger: Box<dyn PipelineLogger>,
    pacing: RenderPacing,
}

impl SnapEndpointsUseCase {
    pub fn new(
        codec: Arc<dyn MediaCodec>,
        decoder: Arc<dyn KeyframeDecoder>,
        logger: Box<dyn PipelineLogger>,
        pacing: RenderPacing,
    ) -> Self {
        Self {
            codec,
            decoder,
            logger,
            pacing,
        }
    }

    pub fn execute(
        &mut self,
        source: &VideoSource,
        start_keyframe: Option<&KeyframeImage>,
        end_keyframe: Option<&KeyframeImage>,
        options: &SnappingOptions,
        fps: f64,
    ) -> SnapResult {
        let started = Instant::now();
        let mut original_frame_count = 0;

        let result = self.run(
            source,
            start_keyframe,
            end_keyframe,
            options,
            fps,
            &mut original_frame_count,
        );
        let processing_time_ms = started.elapsed().as_millis() as u64;
        self.logger.summary();

        match result {
            Ok(mut output) => {
                output.processing_time_ms = processing_time_ms;
                log::info!(
                    "Snapped {} frames (start {}, end {}) in {processing_time_ms}ms",
                    output.original_frame_count,
                    output.start_frames_replaced,
                    output.end_frames_replaced
                );
                Ok(output)
            }
            Err(error) => {
                log::warn!("Snap failed after {processing_time_ms}ms: {error}");
                Err(SnapFailure {
                    error,
                    original_frame_count,
                    processing_time_ms,
                })
            }
        }
    }

    fn run(
        &mut self,
        source: &VideoSource,
        start_keyframe: Option<&KeyframeImage>,
        end_keyframe: Option<&KeyframeImage>,
        options: &SnappingOptions,
        fps: f64,
        original_frame_count: &mut usize,
    ) -> MediaResult<SnapOutput> {
        validate_fps(fps)?;
        if !self.codec.is_supported() {
            return Err(MediaError::unavailable("video encoder"));
        }

        let original =
            ExtractFramesUseCase::new(self.codec.reader()).try_extract_all(source, fps)?;
        if original.is_empty() {
            return Err(MediaError::malformed("video contains no frames"));
        }
        *original_frame_count = original.frame_count();
        let n = original.frame_count();
        self.logger.begin(n, fps);

        let mut warnings = options.validate(n);
        if start_keyframe.is_none() && end_keyframe.is_none() {
            warnings.push("no keyframes supplied; video is re-encoded unchanged".to_string());
        }
        for warning in &warnings {
            log::warn!("{warning}");
        }

        let t = Instant::now();
        let start = self.decode_keyframe(start_keyframe, KeyframeRole::Start, &original)?;
        let end = self.decode_keyframe(end_keyframe, KeyframeRole::End, &original)?;
        self.logger.stage(SnapStage::DecodeKeyframes, t.elapsed());

        let t = Instant::now();
        let snapped = EndpointSnapper::new(options.clone()).apply(
            &original,
            start.as_ref(),
            end.as_ref(),
        )?;
        self.logger.stage(SnapStage::Blend, t.elapsed());
        self.logger
            .boundary(KeyframeRole::Start, snapped.start_frames_replaced);
        self.logger
            .boundary(KeyframeRole::End, snapped.end_frames_replaced);

        let t = Instant::now();
        let quality =
            BoundaryQuality::evaluate(&original, &snapped.sequence, start.as_ref(), end.as_ref())?;
        self.logger.stage(SnapStage::Evaluate, t.elapsed());

        let t = Instant::now();
        let (video, container) = self.encode(&snapped.sequence)?;
        self.logger.stage(SnapStage::Encode, t.elapsed());

        Ok(SnapOutput {
            video,
            container,
            original_frame_count: n,
            start_frames_replaced: snapped.start_frames_replaced,
            end_frames_replaced: snapped.end_frames_replaced,
            fps,
            warnings,
            quality,
            processing_time_ms: 0,
        })
    }

    fn decode_keyframe(
        &self,
        keyframe: Option<&KeyframeImage>,
        expected: KeyframeRole,
        sequence: &FrameSequence,
    ) -> MediaResult<Option<Frame>> {
        let Some(keyframe) = keyframe else {
            return Ok(None);
        };
        if keyframe.role != expected {
            log::debug!("Using {} keyframe at the {expected} boundary", keyframe.role);
        }
        self.decoder
            .decode(keyframe, sequence.width(), sequence.height())
            .map(Some)
    }

    /// Encodes into a temp file of the writer's container and reads it back.
    fn encode(&mut self, sequence: &FrameSequence) -> MediaResult<(Vec<u8>, String)> {
        let mut writer = self
            .codec
            .writer()
            .ok_or_else(|| MediaError::unavailable("video encoder"))?;
        let container = writer.container_extension().to_string();

        let file = tempfile::Builder::new()
            .prefix("framesnap-")
            .suffix(&format!(".{container}"))
            .tempfile()
            .map_err(|e| MediaError::io("Failed to create encode target", e))?;

        let total = sequence.frame_count();
        let metadata =
            VideoMetadata::for_encoding(sequence.width(), sequence.height(), sequence.fps(), total);
        let interval = Duration::from_secs_f64(1.0 / sequence.fps());

        writer.open(file.path(), &metadata)?;
        for (i, frame) in sequence.frames().iter().enumerate() {
            let frame_started = Instant::now();
            writer.write(frame)?;
            self.logger.encode_progress(i + 1, total);
            if self.pacing == RenderPacing::FixedInterval {
                if let Some(remaining) = interval.checked_sub(frame_started.elapsed()) {
                    std::thread::sleep(remaining);
                }
            }
        }
        writer.close()?;

        let bytes = std::fs::read(file.path())
            .map_err(|e| MediaError::io("Failed to read encoded video", e))?;
        Ok((bytes, container))
    }
}
