use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use tokio::sync::watch;

use framesnap_core::keyframe::domain::keyframe_image::{KeyframeImage, KeyframeRole};
use framesnap_core::keyframe::infrastructure::image_keyframe_codec::ImageKeyframeDecoder;
use framesnap_core::pipeline::pipeline_logger::SummaryPipelineLogger;
use framesnap_core::pipeline::snap_endpoints_use_case::RenderPacing;
use framesnap_core::pipeline::splice_segments_use_case::SpliceControl;
use framesnap_core::shared::constants::{DEFAULT_SPLICE_CODEC, DEFAULT_SPLICE_CRF, IMAGE_EXTENSIONS};
use framesnap_core::shared::frame::Frame;
use framesnap_core::shared::video_source::VideoSource;
use framesnap_core::snapping::domain::snapping_options::{BlendMode, SnappingOptions};
use framesnap_core::splicing::domain::splice_options::{SpliceOptions, TransitionType};
use framesnap_core::splicing::infrastructure::progress::{FfmpegProgress, ProgressCallback};
use framesnap_core::splicing::infrastructure::toolchain::{MediaTool, Toolchain};
use framesnap_core::video::domain::image_writer::ImageWriter;
use framesnap_core::video::infrastructure::ffmpeg_codec::FfmpegCodec;
use framesnap_core::video::infrastructure::image_file_writer::ImageFileWriter;
use framesnap_core::{ContinuityService, MediaError};

/// Boundary snapping, splicing and frame extraction for generated video.
#[derive(Parser)]
#[command(name = "framesnap")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Transcoder program name or path.
    #[arg(long, global = true, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// Prober program name or path.
    #[arg(long, global = true, default_value = "ffprobe")]
    ffprobe: PathBuf,

    /// Print a JSON report on stdout instead of log lines.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Pin the first/last frames of a video to reference stills.
    Snap(SnapArgs),
    /// Join two segments with a timed crossfade.
    Splice(SpliceArgs),
    /// Save one frame of a video as an image.
    ExtractFrame(ExtractFrameArgs),
    /// Save the final frame of a video as an image.
    LastFrame(LastFrameArgs),
    /// Emit the final frame of a segment as the next segment's start keyframe.
    Chain(ChainArgs),
    /// Report encoder and toolchain availability.
    Check,
}

#[derive(Args)]
struct SnapArgs {
    /// Input video file.
    input: PathBuf,

    /// Output video file.
    output: PathBuf,

    /// Nominal frame rate of the input.
    #[arg(long)]
    fps: f64,

    /// Start keyframe: an image file, or a text file holding base64 or a data URL.
    #[arg(long)]
    start_keyframe: Option<PathBuf>,

    /// End keyframe: an image file, or a text file holding base64 or a data URL.
    #[arg(long)]
    end_keyframe: Option<PathBuf>,

    /// JSON file with snapping options; flags below override it.
    #[arg(long)]
    options: Option<PathBuf>,

    /// Frames to replace at the start.
    #[arg(long)]
    start_frames: Option<usize>,

    /// Frames to replace at the end.
    #[arg(long)]
    end_frames: Option<usize>,

    /// How replaced frames meet the keyframe.
    #[arg(long, value_enum)]
    blend_mode: Option<BlendArg>,

    /// Width of the fade window in frames.
    #[arg(long)]
    fade_frames: Option<usize>,

    /// Pace encoding at one frame per 1/fps of wall-clock time.
    #[arg(long)]
    paced: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum BlendArg {
    /// Replaced frames become the keyframe.
    Hard,
    /// Replaced frames dissolve from the keyframe into the original.
    Fade,
}

impl From<BlendArg> for BlendMode {
    fn from(arg: BlendArg) -> Self {
        match arg {
            BlendArg::Hard => BlendMode::Hard,
            BlendArg::Fade => BlendMode::Fade,
        }
    }
}

fn transition_type_parser() -> impl TypedValueParser<Value = TransitionType> {
    PossibleValuesParser::new(TransitionType::ALL.map(TransitionType::xfade_name))
        .try_map(|name| name.parse::<TransitionType>())
}

#[derive(Args)]
struct SpliceArgs {
    /// First segment.
    segment_a: PathBuf,

    /// Second segment, faded in over the end of the first.
    segment_b: PathBuf,

    /// Output video file.
    output: PathBuf,

    /// Output frame rate.
    #[arg(long)]
    fps: f64,

    /// Transition length in frames (0 = hard cut).
    #[arg(long, default_value = "1")]
    transition_frames: usize,

    /// Transition type.
    #[arg(long, default_value = "fade", value_parser = transition_type_parser())]
    transition_type: TransitionType,

    /// Output video codec.
    #[arg(long, default_value = DEFAULT_SPLICE_CODEC)]
    codec: String,

    /// CRF quality (0=lossless, 51=worst).
    #[arg(long, default_value_t = DEFAULT_SPLICE_CRF)]
    crf: u8,

    /// Kill the transcoder after this many seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[derive(Args)]
struct ExtractFrameArgs {
    input: PathBuf,

    /// Frame index on the nominal grid.
    index: usize,

    /// Output image file.
    output: PathBuf,

    #[arg(long)]
    fps: f64,
}

#[derive(Args)]
struct LastFrameArgs {
    input: PathBuf,

    /// Output image file.
    output: PathBuf,

    #[arg(long)]
    fps: f64,
}

#[derive(Args)]
struct ChainArgs {
    input: PathBuf,

    #[arg(long)]
    fps: f64,

    /// Also write the frame to this image file.
    #[arg(long)]
    image: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let json_output = cli.json;
    if let Err(e) = run(cli).await {
        if json_output {
            print_json(&failure_report(e.as_ref()));
        } else {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let toolchain = Toolchain::new(&cli.ffmpeg, &cli.ffprobe);
    let service = ContinuityService::new(
        Arc::new(FfmpegCodec::new()),
        Arc::new(ImageKeyframeDecoder::new()),
        toolchain,
    );

    match cli.command {
        Command::Snap(args) => run_snap(service, args, cli.json).await,
        Command::Splice(args) => run_splice(&service, args, cli.json).await,
        Command::ExtractFrame(args) => {
            let frame = service
                .extract_frame(VideoSource::from(args.input), args.index, args.fps)
                .await?;
            save_frame(&frame, &args.output, cli.json)
        }
        Command::LastFrame(args) => {
            let frame = service
                .extract_last_frame(VideoSource::from(args.input), args.fps)
                .await?;
            save_frame(&frame, &args.output, cli.json)
        }
        Command::Chain(args) => {
            let chained = service
                .chain(VideoSource::from(args.input), args.fps, args.image)
                .await?;
            if cli.json {
                print_json(&serde_json::to_value(&chained)?);
            } else {
                println!("{}", chained.keyframe.data);
            }
            Ok(())
        }
        Command::Check => run_check(&service, cli.json),
    }
}

async fn run_snap(
    service: ContinuityService,
    args: SnapArgs,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    validate_fps(args.fps)?;
    let options = snapping_options(&args)?;
    let start = args
        .start_keyframe
        .as_deref()
        .map(|p| load_keyframe(p, KeyframeRole::Start))
        .transpose()?;
    let end = args
        .end_keyframe
        .as_deref()
        .map(|p| load_keyframe(p, KeyframeRole::End))
        .transpose()?;

    let pacing = if args.paced {
        RenderPacing::FixedInterval
    } else {
        RenderPacing::Unpaced
    };
    let output = service
        .with_pacing(pacing)
        .snap_with_logger(
            VideoSource::from(args.input),
            start,
            end,
            options,
            args.fps,
            Box::new(SummaryPipelineLogger::new(24)),
        )
        .await?;

    let path = with_container_extension(&args.output, &output.container);
    std::fs::write(&path, &output.video)
        .map_err(|e| MediaError::io(format!("Failed to write {}", path.display()), e))?;

    if json_output {
        let mut report = serde_json::to_value(&output)?;
        report["success"] = json!(true);
        report["outputPath"] = json!(path);
        print_json(&report);
    } else {
        log::info!(
            "Replaced {} start and {} end frames of {}; output written to {}",
            output.start_frames_replaced,
            output.end_frames_replaced,
            output.original_frame_count,
            path.display()
        );
    }
    Ok(())
}

async fn run_splice(
    service: &ContinuityService,
    args: SpliceArgs,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = SpliceOptions::new(args.fps)
        .with_transition_frames(args.transition_frames)
        .with_transition_type(args.transition_type)
        .with_codec(args.codec)
        .with_crf(args.crf);

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });

    let control = SpliceControl {
        cancel: Some(cancel_rx),
        timeout: args.timeout_secs.map(Duration::from_secs),
        on_progress: if json_output {
            None
        } else {
            Some(Arc::new(splice_progress) as ProgressCallback)
        },
    };

    let output = service
        .splice(&args.segment_a, &args.segment_b, &args.output, &options, control)
        .await;
    if !json_output {
        eprintln!();
    }
    let output = output?;

    if json_output {
        let mut report = serde_json::to_value(&output)?;
        report["success"] = json!(true);
        print_json(&report);
    } else {
        if output.plan.duration_a_assumed {
            log::warn!("Segment A duration could not be probed; transition placement assumed");
        }
        log::info!(
            "Spliced {:.3}s into {}",
            output.duration_secs,
            output.output_path.display()
        );
    }
    Ok(())
}

fn run_check(service: &ContinuityService, json_output: bool) -> Result<(), Box<dyn std::error::Error>> {
    let encode = service.is_encode_supported();
    let report = service.toolchain().report();

    if json_output {
        print_json(&json!({
            "encodeSupported": encode,
            "toolchain": report,
        }));
    } else {
        println!("encoder: {}", if encode { "available" } else { "missing" });
        for tool in [MediaTool::Transcoder, MediaTool::Prober] {
            match service.check_tool_available(tool) {
                Ok(path) => println!("{tool}: {}", path.display()),
                Err(e) => println!("{tool}: {e}"),
            }
        }
    }
    Ok(())
}

fn save_frame(frame: &Frame, output: &Path, json_output: bool) -> Result<(), Box<dyn std::error::Error>> {
    ImageFileWriter::new().write(output, frame, None)?;
    if json_output {
        print_json(&json!({
            "success": true,
            "index": frame.index(),
            "width": frame.width(),
            "height": frame.height(),
            "outputPath": output,
        }));
    } else {
        log::info!("Frame {} written to {}", frame.index(), output.display());
    }
    Ok(())
}

fn snapping_options(args: &SnapArgs) -> Result<SnappingOptions, Box<dyn std::error::Error>> {
    let mut options = match &args.options {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| MediaError::io(format!("Failed to read {}", path.display()), e))?;
            serde_json::from_str(&text)?
        }
        None => SnappingOptions::default(),
    };

    if let Some(n) = args.start_frames {
        options.start_frame_count = n;
    }
    if let Some(n) = args.end_frames {
        options.end_frame_count = n;
    }
    if let Some(mode) = args.blend_mode {
        options.blend_mode = mode.into();
    }
    if let Some(n) = args.fade_frames {
        options.fade_frames = n;
    }
    Ok(options)
}

fn validate_fps(fps: f64) -> Result<(), Box<dyn std::error::Error>> {
    if !fps.is_finite() || fps <= 0.0 {
        return Err(format!("Frame rate must be positive, got {fps}").into());
    }
    Ok(())
}

fn load_keyframe(path: &Path, role: KeyframeRole) -> Result<KeyframeImage, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(MediaError::InputNotFound(path.to_path_buf()).into());
    }
    if let Some(mime) = image_mime_type(path) {
        let bytes = std::fs::read(path)
            .map_err(|e| MediaError::io(format!("Failed to read {}", path.display()), e))?;
        return Ok(KeyframeImage::from_encoded_bytes(role, mime, &bytes));
    }
    let text = std::fs::read_to_string(path)
        .map_err(|e| MediaError::io(format!("Failed to read {}", path.display()), e))?;
    Ok(KeyframeImage::new(role, text.trim()))
}

fn image_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    Some(match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    })
}

/// The snapper picks its container from the available encoder; keep the
/// requested stem and swap in the real extension when they differ.
fn with_container_extension(path: &Path, container: &str) -> PathBuf {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case(container) => path.to_path_buf(),
        _ => path.with_extension(container),
    }
}

fn splice_progress(progress: FfmpegProgress) {
    eprint!(
        "\rSplicing: frame {} ({:.2}s, {:.1}x)",
        progress.frame,
        progress.out_time_ms as f64 / 1000.0,
        progress.speed
    );
}

fn failure_report(error: &(dyn std::error::Error + 'static)) -> serde_json::Value {
    let media = find_media_error(error);
    json!({
        "success": false,
        "error": error.to_string(),
        "kind": media.map(|e| e.kind()),
        "class": media.map(|e| e.class()),
    })
}

fn find_media_error<'a>(error: &'a (dyn std::error::Error + 'static)) -> Option<&'a MediaError> {
    let mut current = Some(error);
    while let Some(e) = current {
        if let Some(media) = e.downcast_ref::<MediaError>() {
            return Some(media);
        }
        current = e.source();
    }
    None
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("Error: {e}"),
    }
}
