//! Transcoder command builder.

use std::path::{Path, PathBuf};

/// Builder for a multi-input transcoder invocation.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Each input with the arguments that precede its `-i`
    inputs: Vec<(Vec<String>, PathBuf)>,
    output: PathBuf,
    /// Arguments after the inputs, before the output path
    output_args: Vec<String>,
    overwrite: bool,
    log_level: String,
}

impl FfmpegCommand {
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            inputs: Vec::new(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    pub fn input(self, path: impl AsRef<Path>) -> Self {
        self.input_with_args(Vec::<String>::new(), path)
    }

    /// Adds an input preceded by its own options (`-f`, `-ss`, `-re`, ...).
    pub fn input_with_args<I, S>(mut self, args: I, path: impl AsRef<Path>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.push((
            args.into_iter().map(Into::into).collect(),
            path.as_ref().to_path_buf(),
        ));
        self
    }

    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(filter)
    }

    /// Selects a stream or filter-graph label for the output.
    pub fn map(self, label: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(label)
    }

    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    pub fn crf(self, crf: u8) -> Self {
        self.output_arg("-crf").output_arg(crf.to_string())
    }

    pub fn pixel_format(self, format: impl Into<String>) -> Self {
        self.output_arg("-pix_fmt").output_arg(format)
    }

    pub fn frame_rate(self, fps: f64) -> Self {
        self.output_arg("-r").output_arg(fps.to_string())
    }

    pub fn no_audio(self) -> Self {
        self.output_arg("-an")
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        } else {
            args.push("-n".to_string());
        }

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        // Progress blocks go to stderr, interleaved with diagnostics
        args.push("-nostats".to_string());
        args.push("-progress".to_string());
        args.push("pipe:2".to_string());

        for (input_args, input) in &self.inputs {
            args.extend(input_args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.to_string_lossy().to_string());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inputs_precede_output_args() {
        let args = FfmpegCommand::new("out.mp4")
            .input("a.mp4")
            .input("b.mp4")
            .filter_complex("[0:v][1:v]concat=n=2:v=1:a=0[vout]")
            .map("[vout]")
            .video_codec("libx264")
            .crf(18)
            .no_audio()
            .build_args();

        let pos = |needle: &str| args.iter().position(|a| a == needle).unwrap();
        assert_eq!(args[0], "-y");
        assert_eq!(args[pos("-i") + 1], "a.mp4");
        assert!(pos("a.mp4") < pos("b.mp4"));
        assert!(pos("b.mp4") < pos("-filter_complex"));
        assert_eq!(args[pos("-crf") + 1], "18");
        assert_eq!(args[pos("-c:v") + 1], "libx264");
        assert_eq!(args.last().unwrap(), "out.mp4");
    }

    #[test]
    fn test_progress_to_stderr() {
        let args = FfmpegCommand::new("o.mp4").build_args();
        let idx = args.iter().position(|a| a == "-progress").unwrap();
        assert_eq!(args[idx + 1], "pipe:2");
        assert!(args.contains(&"error".to_string()));
    }

    #[test]
    fn test_input_args_precede_their_input() {
        let args = FfmpegCommand::new("-")
            .input("a.mp4")
            .input_with_args(["-f", "lavfi"], "testsrc")
            .build_args();
        let f = args.iter().position(|a| a == "-f").unwrap();
        assert!(args.iter().position(|a| a == "a.mp4").unwrap() < f);
        assert_eq!(args[f + 1], "lavfi");
        assert_eq!(args[f + 2], "-i");
        assert_eq!(args[f + 3], "testsrc");
    }

    #[test]
    fn test_no_overwrite() {
        let args = FfmpegCommand::new("o.mp4").overwrite(false).build_args();
        assert_eq!(args[0], "-n");
    }

    #[test]
    fn test_frame_rate_and_pixel_format() {
        let args = FfmpegCommand::new("o.mp4")
            .frame_rate(24.0)
            .pixel_format("yuv420p")
            .build_args();
        let r = args.iter().position(|a| a == "-r").unwrap();
        assert_eq!(args[r + 1], "24");
        assert!(args.contains(&"yuv420p".to_string()));
    }
}
