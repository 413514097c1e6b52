use crate::palette::Palette;

/// Upper bound on palette size for a GIF local colour table.
pub const MAX_PALETTE_COLORS: usize = 256;

/// Reduced-precision colour space used to bucket pixels before palette
/// construction. Coarser buckets favour smooth gradients over exact colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BucketFormat {
    /// 5 bits red, 6 bits green, 5 bits blue.
    #[default]
    Rgb565,
    /// 4 bits per channel.
    Rgb444,
}

impl BucketFormat {
    fn bits(self) -> [u32; 3] {
        match self {
            BucketFormat::Rgb565 => [5, 6, 5],
            BucketFormat::Rgb444 => [4, 4, 4],
        }
    }

    /// Number of distinct bucket keys.
    pub fn bucket_count(self) -> usize {
        let [r, g, b] = self.bits();
        1 << (r + g + b)
    }

    /// Packs an RGB triple into its bucket key.
    pub fn key(self, rgb: [u8; 3]) -> u16 {
        let [r, g, b] = self.bits();
        let red = u16::from(rgb[0] >> (8 - r));
        let green = u16::from(rgb[1] >> (8 - g));
        let blue = u16::from(rgb[2] >> (8 - b));
        (red << (g + b)) | (green << b) | blue
    }

    /// Colour at the middle of the bucket's range.
    pub fn centre(self, key: u16) -> [u8; 3] {
        let [r, g, b] = self.bits();
        let levels = [
            (key >> (g + b)) & ((1 << r) - 1),
            (key >> b) & ((1 << g) - 1),
            key & ((1 << b) - 1),
        ];
        let mut rgb = [0u8; 3];
        for (channel, (level, bits)) in levels.iter().zip([r, g, b]).enumerate() {
            let shift = 8 - bits;
            rgb[channel] = ((level << shift) | (1 << (shift - 1))) as u8;
        }
        rgb
    }
}

/// Options accepted by [`quantize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuantizeOptions {
    pub format: BucketFormat,
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    key: u16,
    count: u64,
    sum: [u64; 3],
}

impl Bucket {
    fn mean(&self) -> [f64; 3] {
        let count = self.count as f64;
        [
            self.sum[0] as f64 / count,
            self.sum[1] as f64 / count,
            self.sum[2] as f64 / count,
        ]
    }
}

#[derive(Debug, Clone, Copy)]
struct ColorBox {
    start: usize,
    end: usize,
}

/// Builds a palette of at most `max_colors` entries from an RGBA buffer.
///
/// Pixels are bucketed in the reduced colour space chosen by `options`
/// (alpha is ignored). When the occupied buckets fit the budget each bucket
/// contributes its mean colour; otherwise the buckets are partitioned with a
/// weighted median cut and each partition contributes its weighted mean.
/// The result depends only on the input bytes.
pub fn quantize(rgba: &[u8], max_colors: usize, options: QuantizeOptions) -> Palette {
    let max_colors = max_colors.clamp(1, MAX_PALETTE_COLORS);
    let buckets = histogram(rgba, options.format);
    if buckets.is_empty() {
        return Palette::from_colors_unchecked(vec![[0, 0, 0]]);
    }

    let colors = if buckets.len() <= max_colors {
        buckets.iter().map(|bucket| round_rgb(bucket.mean())).collect()
    } else {
        median_cut(buckets, max_colors)
    };
    Palette::from_colors_unchecked(colors)
}

fn histogram(rgba: &[u8], format: BucketFormat) -> Vec<Bucket> {
    let mut dense = vec![(0u64, [0u64; 3]); format.bucket_count()];
    for pixel in rgba.chunks_exact(4) {
        let slot = &mut dense[format.key([pixel[0], pixel[1], pixel[2]]) as usize];
        slot.0 += 1;
        for channel in 0..3 {
            slot.1[channel] += u64::from(pixel[channel]);
        }
    }
    dense
        .into_iter()
        .enumerate()
        .filter(|(_, (count, _))| *count > 0)
        .map(|(key, (count, sum))| Bucket {
            key: key as u16,
            count,
            sum,
        })
        .collect()
}

fn median_cut(mut buckets: Vec<Bucket>, max_colors: usize) -> Vec<[u8; 3]> {
    let mut boxes = vec![ColorBox {
        start: 0,
        end: buckets.len(),
    }];

    while boxes.len() < max_colors {
        let candidate = boxes
            .iter()
            .enumerate()
            .filter(|(_, color_box)| color_box.end - color_box.start > 1)
            .map(|(index, color_box)| (index, split_score(&buckets[color_box.start..color_box.end])))
            .filter(|(_, (score, _))| *score > 0.0)
            .fold(None::<(usize, (f64, usize))>, |best, current| match best {
                Some(best) if best.1 .0 >= current.1 .0 => Some(best),
                _ => Some(current),
            });
        let Some((index, (_, channel))) = candidate else {
            break;
        };

        let ColorBox { start, end } = boxes[index];
        let slice = &mut buckets[start..end];
        slice.sort_by(|a, b| {
            a.mean()[channel]
                .total_cmp(&b.mean()[channel])
                .then(a.key.cmp(&b.key))
        });
        let mid = start + weighted_median(slice);
        boxes[index] = ColorBox { start, end: mid };
        boxes.insert(index + 1, ColorBox { start: mid, end });
    }

    boxes
        .iter()
        .map(|color_box| box_mean(&buckets[color_box.start..color_box.end]))
        .collect()
}

/// Weighted spread of a box along its widest channel, and that channel.
fn split_score(buckets: &[Bucket]) -> (f64, usize) {
    let mut min = [f64::MAX; 3];
    let mut max = [f64::MIN; 3];
    let mut weight = 0u64;
    for bucket in buckets {
        let mean = bucket.mean();
        for channel in 0..3 {
            min[channel] = min[channel].min(mean[channel]);
            max[channel] = max[channel].max(mean[channel]);
        }
        weight += bucket.count;
    }
    let (channel, range) = (0..3)
        .map(|channel| (channel, max[channel] - min[channel]))
        .fold((0, f64::MIN), |best, current| {
            if current.1 > best.1 {
                current
            } else {
                best
            }
        });
    (range * (weight as f64).sqrt(), channel)
}

/// Split offset inside a sorted box; both halves keep at least one bucket.
fn weighted_median(buckets: &[Bucket]) -> usize {
    let total: u64 = buckets.iter().map(|bucket| bucket.count).sum();
    let mut running = 0u64;
    for (index, bucket) in buckets.iter().enumerate() {
        running += bucket.count;
        if running * 2 >= total {
            return (index + 1).clamp(1, buckets.len() - 1);
        }
    }
    buckets.len() - 1
}

fn box_mean(buckets: &[Bucket]) -> [u8; 3] {
    let mut sum = [0u64; 3];
    let mut count = 0u64;
    for bucket in buckets {
        for channel in 0..3 {
            sum[channel] += bucket.sum[channel];
        }
        count += bucket.count;
    }
    let count = count as f64;
    round_rgb([
        sum[0] as f64 / count,
        sum[1] as f64 / count,
        sum[2] as f64 / count,
    ])
}

fn round_rgb(rgb: [f64; 3]) -> [u8; 3] {
    rgb.map(|value| value.round().clamp(0.0, 255.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noisy(width: u32, height: u32) -> Vec<u8> {
        let mut state = 0x2545_f491_u32;
        let mut rgba = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..width * height {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let bytes = state.to_le_bytes();
            rgba.extend_from_slice(&[bytes[0], bytes[1], bytes[2], 255]);
        }
        rgba
    }

    #[test]
    fn few_colours_map_to_their_buckets() {
        let rgba = [
            255, 0, 0, 255, //
            255, 0, 0, 255, //
            0, 0, 255, 255, //
            0, 0, 255, 0,
        ];
        let palette = quantize(&rgba, 256, QuantizeOptions::default());
        assert_eq!(palette.colors(), &[[0, 0, 255], [255, 0, 0]]);
    }

    #[test]
    fn never_exceeds_budget() {
        let rgba = noisy(64, 64);
        for budget in [1, 2, 16, 255, 256, 1000] {
            let palette = quantize(&rgba, budget, QuantizeOptions::default());
            assert!(palette.len() <= budget.min(MAX_PALETTE_COLORS));
            assert!(!palette.is_empty());
        }
        let full = quantize(&rgba, 256, QuantizeOptions::default());
        assert_eq!(full.len(), 256);
    }

    #[test]
    fn quantize_is_deterministic() {
        let rgba = noisy(32, 32);
        let options = QuantizeOptions {
            format: BucketFormat::Rgb444,
        };
        assert_eq!(quantize(&rgba, 64, options), quantize(&rgba, 64, options));
    }

    #[test]
    fn empty_input_yields_single_black_entry() {
        let palette = quantize(&[], 256, QuantizeOptions::default());
        assert_eq!(palette.colors(), &[[0, 0, 0]]);
    }

    #[test]
    fn bucket_keys_round_trip_through_centre() {
        for format in [BucketFormat::Rgb565, BucketFormat::Rgb444] {
            for rgb in [[0, 0, 0], [255, 255, 255], [12, 200, 99], [128, 64, 32]] {
                let key = format.key(rgb);
                assert!((key as usize) < format.bucket_count());
                assert_eq!(format.key(format.centre(key)), key);
            }
        }
        assert_eq!(BucketFormat::Rgb565.bucket_count(), 65536);
        assert_eq!(BucketFormat::Rgb444.bucket_count(), 4096);
    }

    #[test]
    fn gradient_is_split_along_its_varying_channel() {
        let mut rgba = Vec::new();
        for value in 0..=255u8 {
            rgba.extend_from_slice(&[value, 40, 40, 255]);
        }
        let palette = quantize(&rgba, 4, QuantizeOptions::default());
        assert_eq!(palette.len(), 4);
        let mut reds: Vec<u8> = palette.colors().iter().map(|rgb| rgb[0]).collect();
        reds.sort_unstable();
        reds.dedup();
        assert_eq!(reds.len(), 4);
        assert!(palette.colors().iter().all(|rgb| rgb[1] == 40 && rgb[2] == 40));
    }
}
