use crate::error::EncodeError;
use crate::palette::Palette;

/// Palette slot declared transparent in alpha-aware frames.
pub const TRANSPARENT_INDEX: u8 = 0;

/// Pixels whose original alpha is below this value become transparent.
pub const ALPHA_CUTOFF: u8 = 8;

/// One fully prepared frame awaiting the encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    width: u16,
    height: u16,
    indices: Vec<u8>,
    palette: Palette,
    delay_ms: u32,
    loop_forever: bool,
    transparent: bool,
}

impl FrameRecord {
    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn indices(&self) -> &[u8] {
        &self.indices
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn delay_ms(&self) -> u32 {
        self.delay_ms
    }

    /// GIF delays are stored in hundredths of a second.
    pub fn delay_centiseconds(&self) -> u16 {
        ((f64::from(self.delay_ms) / 10.0).round() as u64).min(u64::from(u16::MAX)) as u16
    }

    /// Whether the infinite-repeat directive rides on this frame.
    pub fn loops_forever(&self) -> bool {
        self.loop_forever
    }

    pub fn is_transparent(&self) -> bool {
        self.transparent
    }
}

/// Validates an index buffer against its palette and wraps it as a frame.
///
/// Only the first frame of an animation carries the loop directive.
#[allow(clippy::too_many_arguments)]
pub fn assemble_frame(
    indices: Vec<u8>,
    palette: Palette,
    width: u32,
    height: u32,
    delay_ms: u32,
    is_first: bool,
    has_transparency: bool,
) -> Result<FrameRecord, EncodeError> {
    let (frame_width, frame_height) = match (u16::try_from(width), u16::try_from(height)) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(EncodeError::Dimensions { width, height }),
    };
    let expected = width as usize * height as usize;
    if indices.len() != expected {
        return Err(EncodeError::IndexCount {
            expected,
            actual: indices.len(),
        });
    }
    if palette.is_empty() || palette.len() > crate::MAX_PALETTE_COLORS {
        return Err(EncodeError::PaletteSize(palette.len()));
    }
    if let Some((pixel, &index)) = indices
        .iter()
        .enumerate()
        .find(|(_, &index)| usize::from(index) >= palette.len())
    {
        return Err(EncodeError::IndexOutOfRange {
            index,
            pixel,
            len: palette.len(),
        });
    }

    Ok(FrameRecord {
        width: frame_width,
        height: frame_height,
        indices,
        palette,
        delay_ms,
        loop_forever: is_first,
        transparent: has_transparency,
    })
}

/// Forces the transparency sentinel onto every pixel whose original
/// (pre-dither) alpha falls below [`ALPHA_CUTOFF`]. Returns how many pixels
/// were masked.
pub fn mask_transparent(indices: &mut [u8], original_rgba: &[u8]) -> usize {
    let mut masked = 0;
    for (index, pixel) in indices.iter_mut().zip(original_rgba.chunks_exact(4)) {
        if pixel[3] < ALPHA_CUTOFF {
            *index = TRANSPARENT_INDEX;
            masked += 1;
        }
    }
    masked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_colour() -> Palette {
        Palette::new(vec![[0, 0, 0], [255, 255, 255]]).unwrap()
    }

    #[test]
    fn only_first_frame_loops() {
        let first = assemble_frame(vec![0, 1], two_colour(), 2, 1, 50, true, false).unwrap();
        let second = assemble_frame(vec![1, 0], two_colour(), 2, 1, 50, false, false).unwrap();
        assert!(first.loops_forever());
        assert!(!second.loops_forever());
    }

    #[test]
    fn delay_rounds_to_centiseconds() {
        let frame = assemble_frame(vec![0], two_colour(), 1, 1, 333, false, false).unwrap();
        assert_eq!(frame.delay_centiseconds(), 33);
        let frame = assemble_frame(vec![0], two_colour(), 1, 1, 15, false, false).unwrap();
        assert_eq!(frame.delay_centiseconds(), 2);
        let frame = assemble_frame(vec![0], two_colour(), 1, 1, 10, false, false).unwrap();
        assert_eq!(frame.delay_centiseconds(), 1);
    }

    #[test]
    fn rejects_out_of_range_indices() {
        let err = assemble_frame(vec![0, 2], two_colour(), 2, 1, 10, true, false).unwrap_err();
        assert!(matches!(
            err,
            EncodeError::IndexOutOfRange {
                index: 2,
                pixel: 1,
                len: 2
            }
        ));
    }

    #[test]
    fn rejects_wrong_index_count_and_dimensions() {
        assert!(matches!(
            assemble_frame(vec![0; 3], two_colour(), 2, 2, 10, true, false),
            Err(EncodeError::IndexCount { expected: 4, actual: 3 })
        ));
        assert!(matches!(
            assemble_frame(vec![], two_colour(), 0, 2, 10, true, false),
            Err(EncodeError::Dimensions { .. })
        ));
        assert!(matches!(
            assemble_frame(vec![], two_colour(), 70_000, 1, 10, true, false),
            Err(EncodeError::Dimensions { .. })
        ));
    }

    #[test]
    fn low_alpha_pixels_are_masked() {
        let rgba = [
            10, 10, 10, 0, //
            10, 10, 10, 7, //
            10, 10, 10, 8, //
            10, 10, 10, 255,
        ];
        let mut indices = vec![3, 3, 3, 3];
        assert_eq!(mask_transparent(&mut indices, &rgba), 2);
        assert_eq!(indices, vec![0, 0, 3, 3]);
    }
}
