//! Temporal continuity for generated video: endpoint snapping against
//! reference stills, crossfade splicing of adjacent segments, and boundary
//! frame extraction for chained generation.

pub mod keyframe;
pub mod pipeline;
pub mod service;
pub mod shared;
pub mod snapping;
pub mod splicing;
pub mod video;

#[cfg(test)]
mod test_support;

pub use service::ContinuityService;
pub use shared::error::{ErrorKind, FailureClass, MediaError, MediaResult};
