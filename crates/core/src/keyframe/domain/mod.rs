pub mod keyframe_decoder;
pub mod keyframe_image;
