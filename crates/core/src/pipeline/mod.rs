pub mod chain_frame_use_case;
pub mod extract_frames_use_case;
pub mod pipeline_logger;
pub mod snap_endpoints_use_case;
pub mod splice_segments_use_case;
