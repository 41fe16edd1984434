//! Core frame types shared across the pipeline

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Bytes per pixel of the raw stream (32-bit BGRA).
pub const BYTES_PER_PIXEL: usize = 4;

/// Pixel format name as ffmpeg spells it.
pub const PIXEL_FORMAT: &str = "bgra";

/// One captured image as handed over by a [`FrameSource`](crate::source::FrameSource).
///
/// The buffer is 32-bit BGRA, row-major, top-down. Rows may carry padding:
/// `stride` is the byte distance between row starts and is at least
/// `width * 4`.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    pub data: Vec<u8>,
}

impl RawImage {
    /// Create an image with tightly packed rows (stride == width * 4).
    pub fn packed(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            stride: width as usize * BYTES_PER_PIXEL,
            data,
        }
    }
}

/// One paced frame, ready for transmission to the encoder.
///
/// Immutable once built. The pixel buffer is shared behind an `Arc` so a
/// stall duplicate references the identical bytes of the frame it repeats.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<Vec<u8>>,
}

impl Frame {
    /// Byte length one frame of the given dimensions must have.
    pub fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * BYTES_PER_PIXEL
    }
}

/// Target resolution for the encoder's scale filter.
///
/// H.264 encoders reject odd output dimensions, so each axis is rounded
/// down to the nearest even value. The raw input stream keeps the true
/// captured dimensions; only the scale filter uses these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvenDimensions {
    pub width: u32,
    pub height: u32,
}

impl EvenDimensions {
    pub fn from_captured(width: u32, height: u32) -> Self {
        Self {
            width: width & !1,
            height: height & !1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_rounding_drops_odd_pixel() {
        let dims = EvenDimensions::from_captured(101, 51);
        assert_eq!(dims.width, 100);
        assert_eq!(dims.height, 50);
    }

    #[test]
    fn even_dimensions_stay_put() {
        let dims = EvenDimensions::from_captured(640, 480);
        assert_eq!(dims.width, 640);
        assert_eq!(dims.height, 480);
    }

    #[test]
    fn expected_len_is_four_bytes_per_pixel() {
        assert_eq!(Frame::expected_len(640, 480), 640 * 480 * 4);
    }
}
