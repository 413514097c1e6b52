use crate::error::{check_rgba_len, EncodeError};

/// Vertical layout of a captured pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOrder {
    /// Row 0 is the top of the image.
    TopDown,
    /// Row 0 is the bottom of the image (GL-style readback origin).
    BottomUp,
}

/// Flips an RGBA buffer upside down in place by swapping row `y` with row
/// `height - 1 - y`. Applying it twice restores the original buffer.
pub fn flip_vertical(rgba: &mut [u8], width: u32, height: u32) -> Result<(), EncodeError> {
    check_rgba_len(rgba, width, height)?;
    let row = width as usize * 4;
    let rows = height as usize;
    for y in 0..rows / 2 {
        let (upper, lower) = rgba.split_at_mut((rows - 1 - y) * row);
        upper[y * row..(y + 1) * row].swap_with_slice(&mut lower[..row]);
    }
    Ok(())
}

/// Brings a captured buffer into top-down order.
pub fn normalize_rows(
    rgba: &mut [u8],
    width: u32,
    height: u32,
    order: RowOrder,
) -> Result<(), EncodeError> {
    match order {
        RowOrder::TopDown => check_rgba_len(rgba, width, height),
        RowOrder::BottomUp => flip_vertical(rgba, width, height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(width: u32, height: u32) -> Vec<u8> {
        (0..width * height * 4).map(|value| (value % 251) as u8).collect()
    }

    #[test]
    fn flip_twice_is_identity() {
        for (width, height) in [(1, 1), (3, 4), (5, 7), (16, 1), (2, 9)] {
            let original = numbered(width, height);
            let mut buffer = original.clone();
            flip_vertical(&mut buffer, width, height).unwrap();
            flip_vertical(&mut buffer, width, height).unwrap();
            assert_eq!(buffer, original, "{width}x{height}");
        }
    }

    #[test]
    fn flip_swaps_first_and_last_rows() {
        let width = 2;
        let height = 3;
        let original = numbered(width, height);
        let mut buffer = original.clone();
        flip_vertical(&mut buffer, width, height).unwrap();
        let row = (width * 4) as usize;
        assert_eq!(&buffer[..row], &original[2 * row..]);
        assert_eq!(&buffer[row..2 * row], &original[row..2 * row]);
        assert_eq!(&buffer[2 * row..], &original[..row]);
    }

    #[test]
    fn top_down_buffers_are_left_alone() {
        let original = numbered(4, 4);
        let mut buffer = original.clone();
        normalize_rows(&mut buffer, 4, 4, RowOrder::TopDown).unwrap();
        assert_eq!(buffer, original);
        normalize_rows(&mut buffer, 4, 4, RowOrder::BottomUp).unwrap();
        assert_ne!(buffer, original);
    }

    #[test]
    fn flip_rejects_short_buffers() {
        let mut buffer = vec![0u8; 10];
        assert!(flip_vertical(&mut buffer, 2, 2).is_err());
    }
}
