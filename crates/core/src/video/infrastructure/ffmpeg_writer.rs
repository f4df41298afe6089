use std::path::Path;

use ffmpeg_next::Rational;

use crate::shared::constants::{DEFAULT_ENCODE_BITRATE, ENCODER_PREFERENCES};
use crate::shared::error::{MediaError, MediaResult};
use crate::shared::frame::{Frame, CHANNELS};
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

/// A lossy encoder and the container it is muxed into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncoderProfile {
    pub codec_name: &'static str,
    pub container: &'static str,
}

impl EncoderProfile {
    /// The first encoder from [`ENCODER_PREFERENCES`] linked into this ffmpeg.
    pub fn best_available() -> Option<Self> {
        if let Err(e) = ffmpeg_next::init() {
            log::warn!("ffmpeg initialisation failed: {e}");
            return None;
        }
        ENCODER_PREFERENCES
            .iter()
            .find(|(name, _)| ffmpeg_next::encoder::find_by_name(name).is_some())
            .map(|&(codec_name, container)| Self {
                codec_name,
                container,
            })
    }
}

/// Encodes RGBA frames via ffmpeg-next at a fixed bitrate.
pub struct FfmpegWriter {
    profile: EncoderProfile,
    bitrate: usize,
    octx: Option<ffmpeg_next::format::context::Output>,
    encoder: Option<ffmpeg_next::codec::encoder::video::Encoder>,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    width: u32,
    height: u32,
    time_base: Rational,
    frame_count: usize,
    video_stream_index: usize,
}

// Safety: FfmpegWriter is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new(profile: EncoderProfile) -> Self {
        Self {
            profile,
            bitrate: DEFAULT_ENCODE_BITRATE,
            octx: None,
            encoder: None,
            scaler: None,
            width: 0,
            height: 0,
            time_base: Rational(1, 1),
            frame_count: 0,
            video_stream_index: 0,
        }
    }

    pub fn with_bitrate(mut self, bitrate: usize) -> Self {
        self.bitrate = bitrate;
        self
    }

    pub fn profile(&self) -> EncoderProfile {
        self.profile
    }

    fn drain_packets(&mut self) -> MediaResult<()> {
        let (Some(encoder), Some(octx)) = (self.encoder.as_mut(), self.octx.as_mut()) else {
            return Err(MediaError::encode("FfmpegWriter: not opened"));
        };
        let ost_time_base = octx
            .stream(self.video_stream_index)
            .ok_or_else(|| MediaError::encode("Output stream missing"))?
            .time_base();

        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(self.video_stream_index);
            encoded.rescale_ts(self.time_base, ost_time_base);
            encoded.write_interleaved(octx).map_err(MediaError::encode)?;
        }
        Ok(())
    }
}

impl VideoWriter for FfmpegWriter {
    fn container_extension(&self) -> &str {
        self.profile.container
    }

    fn open(&mut self, path: &Path, metadata: &VideoMetadata) -> MediaResult<()> {
        ffmpeg_next::init().map_err(MediaError::encode)?;

        if metadata.width == 0 || metadata.height == 0 {
            return Err(MediaError::malformed("cannot encode zero-sized frames"));
        }

        self.width = metadata.width;
        self.height = metadata.height;
        let (coded_width, coded_height) = (padded_to_even(self.width), padded_to_even(self.height));
        if (coded_width, coded_height) != (self.width, self.height) {
            log::debug!(
                "Padding {}x{} to {}x{} for 4:2:0 output",
                self.width,
                self.height,
                coded_width,
                coded_height
            );
        }

        let mut octx = ffmpeg_next::format::output(path).map_err(MediaError::encode)?;

        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find_by_name(self.profile.codec_name).ok_or_else(|| {
            MediaError::unavailable(format!("{} encoder", self.profile.codec_name))
        })?;

        let mut ost = octx.add_stream(Some(codec)).map_err(MediaError::encode)?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(MediaError::encode)?;

        let frame_rate = Rational::from(metadata.fps);
        self.time_base = frame_rate.invert();

        encoder_ctx.set_width(coded_width);
        encoder_ctx.set_height(coded_height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(self.time_base);
        encoder_ctx.set_frame_rate(Some(frame_rate));
        encoder_ctx.set_bit_rate(self.bitrate);

        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx
            .open_with(ffmpeg_next::Dictionary::new())
            .map_err(MediaError::encode)?;
        ost.set_parameters(&encoder);
        self.video_stream_index = ost.index();

        octx.write_header().map_err(MediaError::encode)?;

        let scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGBA,
            coded_width,
            coded_height,
            ffmpeg_next::format::Pixel::YUV420P,
            coded_width,
            coded_height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(MediaError::encode)?;

        log::debug!(
            "Encoding {}x{} @ {} fps with {} into .{}",
            coded_width,
            coded_height,
            metadata.fps,
            self.profile.codec_name,
            self.profile.container
        );

        self.octx = Some(octx);
        self.encoder = Some(encoder);
        self.scaler = Some(scaler);
        self.frame_count = 0;

        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> MediaResult<()> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(MediaError::encode(format!(
                "frame {} is {}x{}, encoder expects {}x{}",
                frame.index(),
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }
        let (Some(encoder), Some(scaler)) = (self.encoder.as_mut(), self.scaler.as_mut()) else {
            return Err(MediaError::encode("FfmpegWriter: not opened"));
        };

        let (coded_width, coded_height) = (padded_to_even(self.width), padded_to_even(self.height));
        let mut rgba_frame = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::RGBA,
            coded_width,
            coded_height,
        );

        let stride = rgba_frame.stride(0);
        let row_bytes = self.width as usize * CHANNELS;
        let data = rgba_frame.data_mut(0);
        let src = frame.data();

        // Copy pixel data, respecting stride. A padding row or column repeats
        // the last source row or column.
        for row in 0..coded_height as usize {
            let src_start = row.min(self.height as usize - 1) * row_bytes;
            let dst_start = row * stride;
            data[dst_start..dst_start + row_bytes]
                .copy_from_slice(&src[src_start..src_start + row_bytes]);
            if coded_width != self.width {
                let last_pixel = dst_start + row_bytes - CHANNELS;
                data.copy_within(last_pixel..last_pixel + CHANNELS, dst_start + row_bytes);
            }
        }

        let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
        scaler
            .run(&rgba_frame, &mut yuv_frame)
            .map_err(MediaError::encode)?;
        yuv_frame.set_pts(Some(self.frame_count as i64));

        encoder.send_frame(&yuv_frame).map_err(MediaError::encode)?;
        self.drain_packets()?;

        self.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) -> MediaResult<()> {
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.send_eof().map_err(MediaError::encode)?;
            self.drain_packets()?;
            if let Some(octx) = self.octx.as_mut() {
                octx.write_trailer().map_err(MediaError::encode)?;
            }
        }

        self.octx = None;
        self.encoder = None;
        self.scaler = None;

        Ok(())
    }
}

/// 4:2:0 chroma is subsampled in both directions, so coded sizes must be even.
fn padded_to_even(dimension: u32) -> u32 {
    dimension + dimension % 2
}
