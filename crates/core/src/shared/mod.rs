pub mod constants;
pub mod error;
pub mod frame;
pub mod frame_sequence;
pub mod video_metadata;
pub mod video_source;
