use crate::video::domain::media_codec::MediaCodec;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;
use crate::video::infrastructure::ffmpeg_reader::FfmpegReader;
use crate::video::infrastructure::ffmpeg_writer::{EncoderProfile, FfmpegWriter};

/// In-process codec backed by the linked ffmpeg libraries.
///
/// The encoder is chosen once, at construction.
pub struct FfmpegCodec {
    profile: Option<EncoderProfile>,
}

impl FfmpegCodec {
    pub fn new() -> Self {
        let profile = EncoderProfile::best_available();
        match profile {
            Some(p) => log::debug!("Selected encoder {} ({})", p.codec_name, p.container),
            None => log::warn!("No supported video encoder found in this ffmpeg build"),
        }
        Self { profile }
    }

    pub fn with_profile(profile: Option<EncoderProfile>) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> Option<EncoderProfile> {
        self.profile
    }
}

impl Default for FfmpegCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaCodec for FfmpegCodec {
    fn reader(&self) -> Box<dyn VideoReader> {
        Box::new(FfmpegReader::new())
    }

    fn writer(&self) -> Option<Box<dyn VideoWriter>> {
        self.profile
            .map(|p| Box::new(FfmpegWriter::new(p)) as Box<dyn VideoWriter>)
    }

    fn is_supported(&self) -> bool {
        self.profile.is_some()
    }
}
