use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::keyframe::domain::keyframe_image::{KeyframeImage, KeyframeRole};
use crate::keyframe::infrastructure::image_keyframe_codec::encode_keyframe;
use crate::pipeline::extract_frames_use_case::ExtractFramesUseCase;
use crate::shared::error::MediaResult;
use crate::shared::video_source::VideoSource;
use crate::video::domain::image_writer::ImageWriter;
use crate::video::domain::video_reader::VideoReader;

/// The final frame of one segment, packaged as the next segment's start.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainedFrame {
    pub keyframe: KeyframeImage,
    pub frame_index: usize,
    pub width: u32,
    pub height: u32,
    pub image_path: Option<PathBuf>,
}

/// Hands the true last frame of a segment to the next generation call.
pub struct ChainFrameUseCase {
    extractor: ExtractFramesUseCase,
    image_writer: Box<dyn ImageWriter>,
}

impl ChainFrameUseCase {
    pub fn new(reader: Box<dyn VideoReader>, image_writer: Box<dyn ImageWriter>) -> Self {
        Self {
            extractor: ExtractFramesUseCase::new(reader),
            image_writer,
        }
    }

    /// Extracts the last frame as a `start` keyframe, also saving it to
    /// `image_path` when given.
    pub fn execute(
        &mut self,
        source: &VideoSource,
        fps: f64,
        image_path: Option<&Path>,
    ) -> MediaResult<ChainedFrame> {
        let frame = self.extractor.extract_last_frame(source, fps)?;
        let keyframe = encode_keyframe(&frame, KeyframeRole::Start)?;

        if let Some(path) = image_path {
            self.image_writer.write(path, &frame, None)?;
            log::info!("Wrote chain frame {} to {}", frame.index(), path.display());
        }

        Ok(ChainedFrame {
            keyframe,
            frame_index: frame.index(),
            width: frame.width(),
            height: frame.height(),
            image_path: image_path.map(Path::to_path_buf),
        })
    }
}
