//! Stream prober: container and video-stream facts as JSON.

use std::path::Path;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::shared::constants::DIAGNOSTIC_TAIL_LINES;
use crate::shared::error::{MediaError, MediaResult};
use crate::splicing::infrastructure::toolchain::{MediaTool, Toolchain};

/// Video file information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    /// Duration in seconds; `None` when neither the container nor the
    /// video stream reports one
    pub duration: Option<f64>,
    pub width: u32,
    pub height: u32,
    /// Container-reported frame rate; 0 when unknown
    pub fps: f64,
    /// Frame count when the container records it
    pub frame_count: Option<u64>,
    pub codec: String,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
    nb_frames: Option<String>,
}

/// Probes `path` with the toolchain's prober.
pub async fn probe_video(toolchain: &Toolchain, path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(MediaError::InputNotFound(path.to_path_buf()));
    }

    toolchain.check_tool_available(MediaTool::Prober)?;
    let program = toolchain.program(MediaTool::Prober);

    let output = Command::new(program)
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| MediaError::SpawnFailed {
            tool: program.display().to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(MediaError::SubprocessFailed {
            tool: program.display().to_string(),
            exit_code: output.status.code(),
            diagnostic: diagnostic_tail(&String::from_utf8_lossy(&output.stderr)),
        });
    }

    parse_probe_output(&output.stdout)
}

/// Duration of `path` in seconds, if the file reports one.
pub async fn probe_duration(
    toolchain: &Toolchain,
    path: impl AsRef<Path>,
) -> MediaResult<Option<f64>> {
    Ok(probe_video(toolchain, path).await?.duration)
}

fn parse_probe_output(stdout: &[u8]) -> MediaResult<VideoInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)
        .map_err(|e| MediaError::decode(format!("unreadable prober output: {e}")))?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| MediaError::malformed("no video stream found"))?;

    let duration = probe
        .format
        .as_ref()
        .and_then(|f| parse_seconds(f.duration.as_deref()))
        .or_else(|| parse_seconds(video_stream.duration.as_deref()));

    let fps = video_stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| video_stream.r_frame_rate.as_deref().and_then(parse_frame_rate))
        .unwrap_or(0.0);

    Ok(VideoInfo {
        duration,
        width: video_stream.width.unwrap_or(0),
        height: video_stream.height.unwrap_or(0),
        fps,
        frame_count: video_stream
            .nb_frames
            .as_deref()
            .and_then(|n| n.parse().ok()),
        codec: video_stream.codec_name.clone().unwrap_or_default(),
    })
}

/// Last non-empty stderr lines, bounded like the transcoder's tail.
fn diagnostic_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let skip = lines.len().saturating_sub(DIAGNOSTIC_TAIL_LINES);
    lines[skip..].join("\n")
}

fn parse_seconds(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
}

/// Parse frame rate string (e.g., "30/1" or "29.97"); "0/0" is unknown.
pub fn parse_frame_rate(s: &str) -> Option<f64> {
    let rate = match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den <= 0.0 {
                return None;
            }
            num / den
        }
        None => s.parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}
