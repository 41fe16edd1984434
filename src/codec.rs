//! Raw-image-to-frame extraction
//!
//! Pure transform from a captured [`RawImage`] to the fixed wire layout the
//! encoder reads: `height` rows of `width * 4` BGRA bytes, top-down, no row
//! padding. No compression, no color conversion.

use std::sync::Arc;

use crate::errors::ReelError;
use crate::types::{Frame, RawImage, BYTES_PER_PIXEL};

/// Convert a captured image into a packed frame.
///
/// Strips any row padding the capture backend left in the buffer. When the
/// image is already tightly packed, the buffer moves without a copy.
pub fn pack_frame(image: RawImage) -> Result<Frame, ReelError> {
    if image.width == 0 || image.height == 0 {
        return Err(ReelError::Codec(format!(
            "invalid dimensions {}x{}",
            image.width, image.height
        )));
    }

    let row_bytes = image.width as usize * BYTES_PER_PIXEL;
    if image.stride < row_bytes {
        return Err(ReelError::Codec(format!(
            "stride {} shorter than row of {} bytes",
            image.stride, row_bytes
        )));
    }

    let needed = image
        .stride
        .checked_mul(image.height as usize)
        .ok_or_else(|| ReelError::Codec("image dimensions overflow".to_string()))?;
    if image.data.len() < needed {
        return Err(ReelError::Codec(format!(
            "buffer has {} bytes, need {} for {}x{} stride {}",
            image.data.len(),
            needed,
            image.width,
            image.height,
            image.stride
        )));
    }

    let data = if image.stride == row_bytes && image.data.len() == needed {
        image.data
    } else {
        let mut packed = Vec::with_capacity(row_bytes * image.height as usize);
        for row in 0..image.height as usize {
            let start = row * image.stride;
            packed.extend_from_slice(&image.data[start..start + row_bytes]);
        }
        packed
    };

    Ok(Frame {
        width: image.width,
        height: image.height,
        data: Arc::new(data),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_image_passes_through() {
        let data = vec![7u8; 4 * 2 * BYTES_PER_PIXEL];
        let frame = pack_frame(RawImage::packed(4, 2, data)).expect("pack failed");
        assert_eq!(frame.width, 4);
        assert_eq!(frame.height, 2);
        assert_eq!(frame.data.len(), Frame::expected_len(4, 2));
    }

    #[test]
    fn padded_rows_are_stripped() {
        // 2x2 image, stride 12: each row is 8 pixel bytes + 4 padding bytes.
        let mut data = Vec::new();
        for row in 0..2u8 {
            data.extend_from_slice(&[row; 8]);
            data.extend_from_slice(&[0xEE; 4]);
        }
        let image = RawImage {
            width: 2,
            height: 2,
            stride: 12,
            data,
        };
        let frame = pack_frame(image).expect("pack failed");
        assert_eq!(frame.data.len(), 16);
        assert_eq!(&frame.data[..8], &[0u8; 8]);
        assert_eq!(&frame.data[8..], &[1u8; 8]);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let image = RawImage::packed(10, 10, vec![0u8; 16]);
        assert!(pack_frame(image).is_err());
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        let image = RawImage::packed(0, 10, Vec::new());
        assert!(pack_frame(image).is_err());
    }
}
