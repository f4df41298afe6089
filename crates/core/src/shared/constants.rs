/// Seeking to the exact end of stream is unreliable; last-frame extraction
/// starts this far before the reported duration.
pub const LAST_FRAME_BACKOFF_SECS: f64 = 0.1;

/// Duration assumed for a segment whose length could not be probed.
pub const DEFAULT_SEGMENT_DURATION_SECS: f64 = 5.0;

/// Bitrate for the snapper's re-encode.
pub const DEFAULT_ENCODE_BITRATE: usize = 8_000_000;

/// Encoders tried in order, with the container each one is written into.
pub const ENCODER_PREFERENCES: &[(&str, &str)] = &[
    ("libx264", "mp4"),
    ("libvpx-vp9", "webm"),
    ("libvpx", "webm"),
    ("mpeg4", "mp4"),
];

/// At most `frame_count / MAX_SNAP_DIVISOR` frames are replaced per end.
pub const MAX_SNAP_DIVISOR: usize = 3;

/// Non-progress stderr lines kept from a failed subprocess.
pub const DIAGNOSTIC_TAIL_LINES: usize = 20;

pub const DEFAULT_SPLICE_CODEC: &str = "libx264";
pub const DEFAULT_SPLICE_CRF: u8 = 18;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
