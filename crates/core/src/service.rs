use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task;

use crate::keyframe::domain::keyframe_decoder::KeyframeDecoder;
use crate::keyframe::domain::keyframe_image::KeyframeImage;
use crate::keyframe::infrastructure::image_keyframe_codec::ImageKeyframeDecoder;
use crate::pipeline::chain_frame_use_case::{ChainFrameUseCase, ChainedFrame};
use crate::pipeline::extract_frames_use_case::ExtractFramesUseCase;
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::pipeline::snap_endpoints_use_case::{
    RenderPacing, SnapEndpointsUseCase, SnapFailure, SnapResult,
};
use crate::pipeline::splice_segments_use_case::{
    SpliceControl, SpliceResult, SpliceSegmentsUseCase,
};
use crate::shared::error::{MediaError, MediaResult};
use crate::shared::frame::Frame;
use crate::shared::frame_sequence::FrameSequence;
use crate::shared::video_source::VideoSource;
use crate::snapping::domain::snapping_options::SnappingOptions;
use crate::splicing::domain::splice_options::SpliceOptions;
use crate::splicing::infrastructure::ffprobe::{probe_video, VideoInfo};
use crate::splicing::infrastructure::toolchain::{MediaTool, Toolchain};
use crate::video::domain::media_codec::MediaCodec;
use crate::video::infrastructure::ffmpeg_codec::FfmpegCodec;
use crate::video::infrastructure::image_file_writer::ImageFileWriter;

/// Async entry point for the continuity layer.
///
/// Cloning is cheap and clones share nothing mutable: every call opens its
/// own decode/encode session on a blocking task, or its own subprocess.
#[derive(Clone)]
pub struct ContinuityService {
    codec: Arc<dyn MediaCodec>,
    decoder: Arc<dyn KeyframeDecoder>,
    toolchain: Toolchain,
    pacing: RenderPacing,
}

impl ContinuityService {
    pub fn new(
        codec: Arc<dyn MediaCodec>,
        decoder: Arc<dyn KeyframeDecoder>,
        toolchain: Toolchain,
    ) -> Self {
        Self {
            codec,
            decoder,
            toolchain,
            pacing: RenderPacing::default(),
        }
    }

    pub fn with_pacing(mut self, pacing: RenderPacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    /// Whether the snapper can re-encode in this runtime.
    pub fn is_encode_supported(&self) -> bool {
        self.codec.is_supported()
    }

    /// Resolves the transcoder or prober, failing with `capability-unavailable`.
    pub fn check_tool_available(&self, tool: MediaTool) -> MediaResult<PathBuf> {
        self.toolchain.check_tool_available(tool)
    }

    pub async fn probe(&self, path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
        probe_video(&self.toolchain, path).await
    }

    /// Decodes the whole video; an unreadable container yields an empty
    /// sequence.
    pub async fn extract_frames(&self, source: VideoSource, fps: f64) -> MediaResult<FrameSequence> {
        let codec = self.codec.clone();
        run_blocking(move || ExtractFramesUseCase::new(codec.reader()).extract_all(&source, fps))
            .await?
    }

    pub async fn extract_frame(
        &self,
        source: VideoSource,
        index: usize,
        fps: f64,
    ) -> MediaResult<Frame> {
        let codec = self.codec.clone();
        run_blocking(move || {
            ExtractFramesUseCase::new(codec.reader()).extract_frame(&source, index, fps)
        })
        .await?
    }

    pub async fn extract_last_frame(&self, source: VideoSource, fps: f64) -> MediaResult<Frame> {
        let codec = self.codec.clone();
        run_blocking(move || {
            ExtractFramesUseCase::new(codec.reader()).extract_last_frame(&source, fps)
        })
        .await?
    }

    pub async fn snap(
        &self,
        source: VideoSource,
        start_keyframe: Option<KeyframeImage>,
        end_keyframe: Option<KeyframeImage>,
        options: SnappingOptions,
        fps: f64,
    ) -> SnapResult {
        self.snap_with_logger(
            source,
            start_keyframe,
            end_keyframe,
            options,
            fps,
            Box::new(NullPipelineLogger),
        )
        .await
    }

    pub async fn snap_with_logger(
        &self,
        source: VideoSource,
        start_keyframe: Option<KeyframeImage>,
        end_keyframe: Option<KeyframeImage>,
        options: SnappingOptions,
        fps: f64,
        logger: Box<dyn PipelineLogger>,
    ) -> SnapResult {
        let mut use_case =
            SnapEndpointsUseCase::new(self.codec.clone(), self.decoder.clone(), logger, self.pacing);
        let joined = run_blocking(move || {
            use_case.execute(
                &source,
                start_keyframe.as_ref(),
                end_keyframe.as_ref(),
                &options,
                fps,
            )
        })
        .await;

        match joined {
            Ok(result) => result,
            Err(error) => Err(SnapFailure {
                error,
                original_frame_count: 0,
                processing_time_ms: 0,
            }),
        }
    }

    pub async fn splice(
        &self,
        segment_a: &Path,
        segment_b: &Path,
        output: &Path,
        options: &SpliceOptions,
        control: SpliceControl,
    ) -> SpliceResult {
        SpliceSegmentsUseCase::new(self.toolchain.clone(), control)
            .execute(segment_a, segment_b, output, options)
            .await
    }

    /// Extracts the final frame of `source` as the next segment's start
    /// keyframe.
    pub async fn chain(
        &self,
        source: VideoSource,
        fps: f64,
        image_path: Option<PathBuf>,
    ) -> MediaResult<ChainedFrame> {
        let codec = self.codec.clone();
        run_blocking(move || {
            ChainFrameUseCase::new(codec.reader(), Box::new(ImageFileWriter::new())).execute(
                &source,
                fps,
                image_path.as_deref(),
            )
        })
        .await?
    }
}

impl Default for ContinuityService {
    fn default() -> Self {
        Self::new(
            Arc::new(FfmpegCodec::new()),
            Arc::new(ImageKeyframeDecoder::new()),
            Toolchain::default(),
        )
    }
}

async fn run_blocking<T, F>(f: F) -> MediaResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(f)
        .await
        .map_err(|e| MediaError::io("Blocking media task failed", std::io::Error::other(e)))
}
