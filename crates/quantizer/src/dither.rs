use crate::error::{check_rgba_len, EncodeError};

/// 4x4 Bayer matrix levels in row-major order.
pub const BAYER_4X4: [u8; 16] = [0, 8, 2, 10, 12, 4, 14, 6, 3, 11, 1, 9, 15, 7, 13, 5];

/// Channel offset applied per unit of threshold at strength 1 (2% of full scale).
const DITHER_AMPLITUDE: f64 = 255.0 * 0.02;

/// Threshold for pixel `(x, y)`, normalized into `[-0.5, 0.5)`.
///
/// The matrix tiles the image; `(y mod 4, x mod 4)` selects the cell.
pub fn bayer_threshold(x: usize, y: usize) -> f64 {
    f64::from(BAYER_4X4[(y & 3) * 4 + (x & 3)]) / 16.0 - 0.5
}

/// Applies a light ordered dither to the RGB channels of an RGBA buffer.
///
/// Each colour channel becomes `clamp(v + threshold * 255 * 0.02 * strength)`,
/// truncated back to a byte. Alpha is copied through untouched. The output is
/// a fresh buffer; the input is never modified.
pub fn dither_ordered(
    rgba: &[u8],
    width: u32,
    height: u32,
    strength: f64,
) -> Result<Vec<u8>, EncodeError> {
    check_rgba_len(rgba, width, height)?;
    let mut out = vec![0u8; rgba.len()];
    let width = width as usize;
    for (pixel, (src, dst)) in rgba.chunks_exact(4).zip(out.chunks_exact_mut(4)).enumerate() {
        let offset = bayer_threshold(pixel % width, pixel / width) * DITHER_AMPLITUDE * strength;
        for channel in 0..3 {
            let value = f64::from(src[channel]) + offset;
            dst[channel] = value.clamp(0.0, 255.0) as u8;
        }
        dst[3] = src[3];
    }
    Ok(out)
}
