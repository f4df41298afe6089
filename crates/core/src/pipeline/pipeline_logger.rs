use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::keyframe::domain::keyframe_image::KeyframeRole;

/// A timed step of a snap run, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SnapStage {
    DecodeKeyframes,
    Blend,
    Evaluate,
    Encode,
}

impl fmt::Display for SnapStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DecodeKeyframes => "decode_keyframes",
            Self::Blend => "blend",
            Self::Evaluate => "evaluate",
            Self::Encode => "encode",
        };
        f.write_str(name)
    }
}

/// Observer for a snap run.
///
/// The snapper reports through this trait instead of a concrete sink, so the
/// CLI can print a report while the service stays silent.
pub trait PipelineLogger: Send {
    /// The decoded sequence is known: `frame_count` frames at `fps`.
    fn begin(&mut self, frame_count: usize, fps: f64);

    fn stage(&mut self, stage: SnapStage, elapsed: Duration);

    /// How many frames at one boundary were pinned or blended.
    fn boundary(&mut self, role: KeyframeRole, frames_replaced: usize);

    /// `written` of `total` frames handed to the encoder.
    fn encode_progress(&mut self, written: usize, total: usize);

    /// Emit the end-of-run report. Default: no-op.
    fn summary(&self) {}
}

/// Discards every event.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn begin(&mut self, _frame_count: usize, _fps: f64) {}
    fn stage(&mut self, _stage: SnapStage, _elapsed: Duration) {}
    fn boundary(&mut self, _role: KeyframeRole, _frames_replaced: usize) {}
    fn encode_progress(&mut self, _written: usize, _total: usize) {}
}

/// Collects one snap run and logs a report through the `log` facade.
///
/// Encode progress is logged every `throttle_frames` frames. The report
/// compares encode time with the real-time floor `frame_count / fps`, which
/// a fixed-interval render can never beat.
pub struct SummaryPipelineLogger {
    throttle_frames: usize,
    frame_count: usize,
    fps: f64,
    stages: BTreeMap<SnapStage, Duration>,
    replaced: BTreeMap<KeyframeRole, usize>,
}

impl SummaryPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            frame_count: 0,
            fps: 0.0,
            stages: BTreeMap::new(),
            replaced: BTreeMap::new(),
        }
    }

    pub fn stage_time(&self, stage: SnapStage) -> Option<Duration> {
        self.stages.get(&stage).copied()
    }

    pub fn frames_replaced(&self, role: KeyframeRole) -> usize {
        self.replaced.get(&role).copied().unwrap_or(0)
    }

    /// Wall-clock time the sequence plays for, `None` before [`begin`](PipelineLogger::begin).
    pub fn real_time_floor(&self) -> Option<Duration> {
        (self.fps > 0.0).then(|| Duration::from_secs_f64(self.frame_count as f64 / self.fps))
    }

    /// Encode time as a multiple of the real-time floor.
    pub fn encode_speed(&self) -> Option<f64> {
        let encode = self.stage_time(SnapStage::Encode)?.as_secs_f64();
        let floor = self.real_time_floor()?.as_secs_f64();
        (encode > 0.0).then(|| floor / encode)
    }

    /// The formatted report, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.stages.is_empty() && self.replaced.is_empty() {
            return None;
        }

        let mut lines = vec![format!(
            "Snap summary ({} frames @ {:.3} fps): start {} replaced, end {} replaced",
            self.frame_count,
            self.fps,
            self.frames_replaced(KeyframeRole::Start),
            self.frames_replaced(KeyframeRole::End)
        )];
        for (stage, elapsed) in &self.stages {
            lines.push(format!(
                "  {:16}: {:8.1}ms",
                stage.to_string(),
                elapsed.as_secs_f64() * 1000.0
            ));
        }
        if let (Some(floor), Some(speed)) = (self.real_time_floor(), self.encode_speed()) {
            lines.push(format!(
                "  Encode: {speed:.2}x real time (floor {:.1}ms)",
                floor.as_secs_f64() * 1000.0
            ));
        }
        Some(lines.join("\n"))
    }
}

impl Default for SummaryPipelineLogger {
    fn default() -> Self {
        Self::new(10)
    }
}

impl PipelineLogger for SummaryPipelineLogger {
    fn begin(&mut self, frame_count: usize, fps: f64) {
        self.frame_count = frame_count;
        self.fps = fps;
    }

    fn stage(&mut self, stage: SnapStage, elapsed: Duration) {
        *self.stages.entry(stage).or_default() += elapsed;
    }

    fn boundary(&mut self, role: KeyframeRole, frames_replaced: usize) {
        self.replaced.insert(role, frames_replaced);
        if frames_replaced > 0 {
            log::debug!("{role} boundary: {frames_replaced} frames replaced");
        }
    }

    fn encode_progress(&mut self, written: usize, total: usize) {
        if total > 0 && (written % self.throttle_frames == 0 || written == total) {
            let pct = written as f64 / total as f64 * 100.0;
            log::info!("Encoding: {written}/{total} ({pct:.1}%)");
        }
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(SummaryPipelineLogger::default().summary_string().is_none());
    }

    #[test]
    fn test_boundaries_are_reported_separately() {
        let mut logger = SummaryPipelineLogger::new(10);
        logger.begin(48, 24.0);
        logger.boundary(KeyframeRole::Start, 3);
        logger.boundary(KeyframeRole::End, 0);

        assert_eq!(logger.frames_replaced(KeyframeRole::Start), 3);
        assert_eq!(logger.frames_replaced(KeyframeRole::End), 0);
        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("start 3 replaced, end 0 replaced"));
    }

    #[test]
    fn test_stage_times_accumulate_in_run_order() {
        let mut logger = SummaryPipelineLogger::new(10);
        logger.stage(SnapStage::Encode, Duration::from_millis(30));
        logger.stage(SnapStage::Blend, Duration::from_millis(5));
        logger.stage(SnapStage::Encode, Duration::from_millis(20));

        assert_eq!(
            logger.stage_time(SnapStage::Encode),
            Some(Duration::from_millis(50))
        );
        let summary = logger.summary_string().unwrap();
        let blend = summary.find("blend").unwrap();
        let encode = summary.find("encode").unwrap();
        assert!(blend < encode);
    }

    #[test]
    fn test_encode_speed_against_real_time_floor() {
        let mut logger = SummaryPipelineLogger::new(10);
        logger.begin(24, 24.0);
        logger.stage(SnapStage::Encode, Duration::from_millis(250));

        assert_eq!(logger.real_time_floor(), Some(Duration::from_secs(1)));
        assert_relative_eq!(logger.encode_speed().unwrap(), 4.0, epsilon = 1e-9);
        assert!(logger.summary_string().unwrap().contains("4.00x real time"));
    }

    #[test]
    fn test_no_floor_before_begin() {
        let mut logger = SummaryPipelineLogger::new(10);
        logger.stage(SnapStage::Encode, Duration::from_millis(10));
        assert!(logger.real_time_floor().is_none());
        assert!(logger.encode_speed().is_none());
        assert!(!logger.summary_string().unwrap().contains("real time"));
    }

    #[test]
    fn test_throttle_is_at_least_one() {
        let mut logger = SummaryPipelineLogger::new(0);
        assert_eq!(logger.throttle_frames, 1);
        logger.encode_progress(1, 2);
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(SnapStage::DecodeKeyframes.to_string(), "decode_keyframes");
        assert_eq!(SnapStage::Evaluate.to_string(), "evaluate");
    }
}
