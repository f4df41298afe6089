use ndarray::{ArrayView3, ArrayViewMut3};

/// Bytes per pixel: every frame is RGBA.
pub const CHANNELS: usize = 4;

/// A single video/image frame: contiguous RGBA bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only; the domain layer
/// treats pixel data as opaque.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            byte_len(width, height),
            "data length must equal width * height * 4"
        );
        Self {
            data,
            width,
            height,
            index,
        }
    }

    /// A frame filled with a single RGBA colour.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4], index: usize) -> Self {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(byte_len(width, height))
            .collect();
        Self::new(data, width, height, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns a copy carrying a different ordinal index.
    pub fn with_index(&self, index: usize) -> Self {
        Self {
            data: self.data.clone(),
            width: self.width,
            height: self.height,
            index,
        }
    }

    pub fn same_dimensions(&self, other: &Frame) -> bool {
        self.width == other.width && self.height == other.height
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, CHANNELS)
    }
}

/// A decoded frame together with its presentation time in seconds.
#[derive(Clone, Debug)]
pub struct TimedFrame {
    pub frame: Frame,
    pub timestamp_secs: f64,
}

impl TimedFrame {
    /// Whether the frame is still on screen at `timestamp_secs` when each
    /// frame is held for `frame_interval_secs`.
    pub fn is_shown_at(&self, timestamp_secs: f64, frame_interval_secs: f64) -> bool {
        timestamp_secs < self.timestamp_secs + frame_interval_secs
    }
}

pub(crate) fn byte_len(width: u32, height: u32) -> usize {
    (width as usize) * (height as usize) * CHANNELS
}
