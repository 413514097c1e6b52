use std::collections::HashMap;

use crate::error::EncodeError;
use crate::quantize::MAX_PALETTE_COLORS;

/// Ordered list of RGB entries referenced by an index buffer.
///
/// A palette built with [`Palette::with_transparent_slot`] reserves entry 0
/// for the transparency sentinel; nearest-colour lookups never return it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<[u8; 3]>,
    transparent_slot: bool,
}

impl Palette {
    /// Wraps a list of colours, enforcing the 1..=256 entry range.
    pub fn new(colors: Vec<[u8; 3]>) -> Result<Self, EncodeError> {
        if colors.is_empty() || colors.len() > MAX_PALETTE_COLORS {
            return Err(EncodeError::PaletteSize(colors.len()));
        }
        Ok(Self::from_colors_unchecked(colors))
    }

    pub(crate) fn from_colors_unchecked(colors: Vec<[u8; 3]>) -> Self {
        debug_assert!(!colors.is_empty() && colors.len() <= MAX_PALETTE_COLORS);
        Self {
            colors,
            transparent_slot: false,
        }
    }

    /// Prepends a dedicated transparent entry at index 0.
    pub fn with_transparent_slot(self) -> Result<Self, EncodeError> {
        if self.transparent_slot {
            return Ok(self);
        }
        if self.colors.len() >= MAX_PALETTE_COLORS {
            return Err(EncodeError::PaletteSize(self.colors.len() + 1));
        }
        let mut colors = Vec::with_capacity(self.colors.len() + 1);
        colors.push([0, 0, 0]);
        colors.extend(self.colors);
        Ok(Self {
            colors,
            transparent_slot: true,
        })
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[[u8; 3]] {
        &self.colors
    }

    pub fn has_transparent_slot(&self) -> bool {
        self.transparent_slot
    }

    /// Flattened `rgbrgb...` bytes as written into a GIF colour table.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.colors.iter().flatten().copied().collect()
    }

    /// Index of the closest opaque entry by squared RGB distance.
    /// Ties resolve to the lowest index.
    pub fn nearest(&self, rgb: [u8; 3]) -> u8 {
        let first = usize::from(self.transparent_slot);
        let mut best = first;
        let mut best_distance = u32::MAX;
        for (index, entry) in self.colors.iter().enumerate().skip(first) {
            let distance = squared_distance(*entry, rgb);
            if distance < best_distance {
                best = index;
                best_distance = distance;
                if distance == 0 {
                    break;
                }
            }
        }
        best as u8
    }
}

fn squared_distance(a: [u8; 3], b: [u8; 3]) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let delta = i32::from(x) - i32::from(y);
            (delta * delta) as u32
        })
        .sum()
}

/// Maps every pixel to its nearest palette entry, one index per pixel in
/// row-major order. Alpha is ignored.
///
/// Lookups are memoized on the exact RGB value, so repeated colours are
/// searched once and every pixel resolves to its own nearest entry.
pub fn apply_palette(rgba: &[u8], palette: &Palette) -> Vec<u8> {
    let mut cache: HashMap<[u8; 3], u8> = HashMap::new();
    rgba.chunks_exact(4)
        .map(|pixel| {
            let rgb = [pixel[0], pixel[1], pixel[2]];
            *cache.entry(rgb).or_insert_with(|| palette.nearest(rgb))
        })
        .collect()
}
