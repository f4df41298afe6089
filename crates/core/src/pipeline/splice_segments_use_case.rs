use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::watch;

use crate::shared::constants::DEFAULT_SEGMENT_DURATION_SECS;
use crate::shared::error::{FailureClass, MediaError, MediaResult};
use crate::splicing::domain::filter_graph::{build_filter_graph, OUTPUT_LABEL};
use crate::splicing::domain::splice_options::SpliceOptions;
use crate::splicing::domain::splice_plan::SplicePlan;
use crate::splicing::infrastructure::ffmpeg_command::FfmpegCommand;
use crate::splicing::infrastructure::ffmpeg_runner::FfmpegRunner;
use crate::splicing::infrastructure::ffprobe::{probe_video, VideoInfo};
use crate::splicing::infrastructure::progress::ProgressCallback;
use crate::splicing::infrastructure::toolchain::{MediaTool, Toolchain};

/// A finished splice.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpliceOutput {
    pub output_path: PathBuf,
    /// Probed length of the output, or the planned length if probing failed.
    pub duration_secs: f64,
    pub plan: SplicePlan,
    pub processing_time_ms: u64,
}

#[derive(Debug)]
pub struct SpliceFailure {
    pub error: MediaError,
    pub output_path: PathBuf,
    pub processing_time_ms: u64,
}

impl std::fmt::Display for SpliceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "splice into {} failed: {}", self.output_path.display(), self.error)
    }
}

impl std::error::Error for SpliceFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

pub type SpliceResult = Result<SpliceOutput, SpliceFailure>;

/// Caller-side controls for the transcoder run.
#[derive(Clone, Default)]
pub struct SpliceControl {
    pub cancel: Option<watch::Receiver<bool>>,
    pub timeout: Option<Duration>,
    pub on_progress: Option<ProgressCallback>,
}

/// Joins segment A and segment B with a timed crossfade via the transcoder.
pub struct SpliceSegmentsUseCase {
    toolchain: Toolchain,
    control: SpliceControl,
}

impl SpliceSegmentsUseCase {
    pub fn new(toolchain: Toolchain, control: SpliceControl) -> Self {
        Self { toolchain, control }
    }

    pub async fn execute(
        &self,
        segment_a: &Path,
        segment_b: &Path,
        output: &Path,
        options: &SpliceOptions,
    ) -> SpliceResult {
        let started = Instant::now();
        let result = self.run(segment_a, segment_b, output, options).await;
        let processing_time_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok((duration_secs, plan)) => {
                log::info!(
                    "Spliced {} + {} -> {} ({duration_secs:.3}s) in {processing_time_ms}ms",
                    segment_a.display(),
                    segment_b.display(),
                    output.display()
                );
                Ok(SpliceOutput {
                    output_path: output.to_path_buf(),
                    duration_secs,
                    plan,
                    processing_time_ms,
                })
            }
            Err(error) => {
                log::warn!("Splice failed after {processing_time_ms}ms: {error}");
                Err(SpliceFailure {
                    error,
                    output_path: output.to_path_buf(),
                    processing_time_ms,
                })
            }
        }
    }

    async fn run(
        &self,
        segment_a: &Path,
        segment_b: &Path,
        output: &Path,
        options: &SpliceOptions,
    ) -> MediaResult<(f64, SplicePlan)> {
        options.validate()?;

        for segment in [segment_a, segment_b] {
            let metadata = std::fs::metadata(segment)
                .ok()
                .filter(|m| m.is_file())
                .ok_or_else(|| MediaError::InputNotFound(segment.to_path_buf()))?;
            if metadata.len() == 0 {
                return Err(MediaError::malformed(format!(
                    "{} is empty",
                    segment.display()
                )));
            }
        }

        self.toolchain.check_tool_available(MediaTool::Transcoder)?;
        self.toolchain.check_tool_available(MediaTool::Prober)?;

        let info_a = self.probe_optional(segment_a).await?;
        if let Some(duration) = info_a.as_ref().and_then(|i| i.duration) {
            if duration <= 0.0 {
                return Err(MediaError::malformed(format!(
                    "{} has zero duration",
                    segment_a.display()
                )));
            }
        }
        let info_b = self.probe_optional(segment_b).await?;

        let plan = SplicePlan::new(info_a.as_ref().and_then(|i| i.duration), options);
        if plan.duration_a_assumed {
            log::warn!(
                "Assuming {DEFAULT_SEGMENT_DURATION_SECS}s for {}; transition may be misplaced",
                segment_a.display()
            );
        }
        log::debug!(
            "Transition {:.4}s at offset {:.4}s",
            plan.transition_secs,
            plan.offset_secs
        );

        let size = info_a
            .as_ref()
            .map(|i| (i.width, i.height))
            .filter(|&(w, h)| w > 0 && h > 0);
        let graph = build_filter_graph(&plan, options, size);

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                MediaError::io(format!("Failed to create {}", parent.display()), e)
            })?;
        }

        let cmd = FfmpegCommand::new(output)
            .input(segment_a)
            .input(segment_b)
            .filter_complex(graph)
            .map(OUTPUT_LABEL)
            .video_codec(options.codec.as_str())
            .crf(options.crf)
            .pixel_format("yuv420p")
            .frame_rate(options.fps)
            .no_audio();

        let mut runner = FfmpegRunner::new(self.toolchain.program(MediaTool::Transcoder));
        if let Some(cancel) = self.control.cancel.clone() {
            runner = runner.with_cancel(cancel);
        }
        if let Some(timeout) = self.control.timeout {
            runner = runner.with_timeout(timeout);
        }
        runner
            .run_with_progress(&cmd, self.control.on_progress.clone())
            .await?;

        let planned = plan.expected_duration(
            info_b
                .as_ref()
                .and_then(|i| i.duration)
                .unwrap_or(DEFAULT_SEGMENT_DURATION_SECS),
        );
        let duration = match probe_video(&self.toolchain, output).await {
            Ok(info) => info.duration.filter(|d| *d > 0.0).unwrap_or(planned),
            Err(e) => {
                log::warn!("Could not probe splice output, using planned duration: {e}");
                planned
            }
        };

        Ok((duration, plan))
    }

    /// Probe failures other than a missing prober degrade to `None`.
    async fn probe_optional(&self, path: &Path) -> MediaResult<Option<VideoInfo>> {
        match probe_video(&self.toolchain, path).await {
            Ok(info) => Ok(Some(info)),
            Err(e) if e.class() == FailureClass::Unavailable => Err(e),
            Err(e) => {
                log::warn!("Probing {} failed: {e}", path.display());
                Ok(None)
            }
        }
    }
}
