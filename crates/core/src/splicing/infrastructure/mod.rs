pub mod ffmpeg_command;
pub mod ffmpeg_runner;
pub mod ffprobe;
pub mod progress;
pub mod toolchain;
