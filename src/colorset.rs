//! Gathering a block's pixels into the weighted point sets the fitters
//! consume.
//!
//! Points are deduplicated under exact equality; the weight of a point is the
//! sum of the per-pixel weights that mapped to it, and a remap table records
//! which set point each block pixel landed on. Pixels excluded by the
//! validity mask (or by transparency, where a format asks for it) carry no
//! point and no weight.

use glam::Vec4;

use crate::partition::Partition;
use crate::Flags;

/// Alpha below this threshold counts as transparent for formats with a
/// transparent codeword.
pub(crate) const ALPHA_THRESHOLD: f32 = 0.5;

/// Marker for pixels that are not represented by any set point.
pub(crate) const UNMAPPED: u8 = u8::MAX;

fn pixel_weight(pixel: [f32; 4], flags: Flags) -> f32 {
    if flags.contains(Flags::WEIGHT_BY_ALPHA) {
        pixel[3].clamp(0.0, 1.0)
    } else {
        1.0
    }
}

/// The RGB point set of a one-subset color block. Points carry a fixed
/// opaque fourth component so the vector fitters can consume them directly.
pub(crate) struct ColorSet {
    pub points: [Vec4; 16],
    pub weights: [f32; 16],
    pub len: usize,
    /// Set point of each block pixel, [`UNMAPPED`] for excluded pixels.
    pub remap: [u8; 16],
    /// Whether any valid pixel was excluded as transparent.
    pub has_transparent: bool,
}

impl ColorSet {
    /// Gathers the masked pixels of a block. With
    /// [`Flags::EXCLUDE_TRANSPARENT`], pixels below the alpha threshold are
    /// left out of the set and flagged.
    pub fn new(pixels: &[[f32; 4]; 16], mask: u16, flags: Flags) -> Self {
        let mut set = ColorSet {
            points: [Vec4::ZERO; 16],
            weights: [0.0; 16],
            len: 0,
            remap: [UNMAPPED; 16],
            has_transparent: false,
        };

        let exclude = flags.contains(Flags::EXCLUDE_TRANSPARENT);
        for (i, &pixel) in pixels.iter().enumerate() {
            if mask & (1 << i) == 0 {
                continue;
            }
            if exclude && pixel[3] < ALPHA_THRESHOLD {
                set.has_transparent = true;
                continue;
            }

            let w = pixel_weight(pixel, flags);
            if w <= 0.0 {
                continue;
            }
            let p = Vec4::new(
                pixel[0].clamp(0.0, 1.0),
                pixel[1].clamp(0.0, 1.0),
                pixel[2].clamp(0.0, 1.0),
                1.0,
            );

            // merge exact duplicates
            let mut found = None;
            for j in 0..set.len {
                if set.points[j] == p {
                    found = Some(j);
                    break;
                }
            }
            match found {
                Some(j) => {
                    set.weights[j] += w;
                    set.remap[i] = j as u8;
                }
                None => {
                    set.points[set.len] = p;
                    set.weights[set.len] = w;
                    set.remap[i] = set.len as u8;
                    set.len += 1;
                }
            }
        }

        set
    }
}

/// One subset of a partitioned palette block.
#[derive(Clone)]
pub(crate) struct PaletteSubset {
    pub points: [Vec4; 16],
    pub weights: [f32; 16],
    pub len: usize,
}

impl PaletteSubset {
    const EMPTY: Self = PaletteSubset {
        points: [Vec4::ZERO; 16],
        weights: [0.0; 16],
        len: 0,
    };
}

/// A block's pixels grouped by a partition, with an optional channel
/// rotation applied first.
pub(crate) struct PaletteSet {
    pub subsets: [PaletteSubset; 3],
    pub n_subsets: u8,
    /// `(subset, set point)` of each block pixel; the point is [`UNMAPPED`]
    /// for excluded pixels (the subset still follows the partition).
    pub remap: [(u8, u8); 16],
}

impl PaletteSet {
    /// Palette formats carry no transparent codeword, so transparency never
    /// drops a pixel here; every masked-in pixel with weight becomes a point
    /// and gets a real codebook index.
    pub fn new(
        pixels: &[[f32; 4]; 16],
        mask: u16,
        flags: Flags,
        partition: &Partition,
        rotation: u8,
    ) -> Self {
        let mut set = PaletteSet {
            subsets: [PaletteSubset::EMPTY, PaletteSubset::EMPTY, PaletteSubset::EMPTY],
            n_subsets: partition.subsets(),
            remap: [(0, UNMAPPED); 16],
        };

        for (i, &pixel) in pixels.iter().enumerate() {
            let s = partition.subset_of(i);
            set.remap[i] = (s, UNMAPPED);

            if mask & (1 << i) == 0 {
                continue;
            }
            let w = pixel_weight(pixel, flags);
            if w <= 0.0 {
                continue;
            }

            let p = rotate(pixel, rotation);
            let subset = &mut set.subsets[s as usize];

            let mut found = None;
            for j in 0..subset.len {
                if subset.points[j] == p {
                    found = Some(j);
                    break;
                }
            }
            match found {
                Some(j) => {
                    subset.weights[j] += w;
                    set.remap[i] = (s, j as u8);
                }
                None => {
                    subset.points[subset.len] = p;
                    subset.weights[subset.len] = w;
                    set.remap[i] = (s, subset.len as u8);
                    subset.len += 1;
                }
            }
        }

        set
    }
}

/// A scalar (single channel) point set, used by the alpha fits.
pub(crate) struct ScalarSet {
    pub values: [f32; 16],
    pub weights: [f32; 16],
    pub len: usize,
    pub remap: [u8; 16],
}

impl ScalarSet {
    /// Gathers channel `channel` of the masked pixels.
    pub fn new(pixels: &[[f32; 4]; 16], mask: u16, flags: Flags, channel: usize) -> Self {
        let mut set = ScalarSet {
            values: [0.0; 16],
            weights: [0.0; 16],
            len: 0,
            remap: [UNMAPPED; 16],
        };

        for (i, &pixel) in pixels.iter().enumerate() {
            if mask & (1 << i) == 0 {
                continue;
            }
            let w = pixel_weight(pixel, flags);
            if w <= 0.0 {
                continue;
            }
            let v = pixel[channel].clamp(0.0, 1.0);

            let mut found = None;
            for j in 0..set.len {
                if set.values[j] == v {
                    found = Some(j);
                    break;
                }
            }
            match found {
                Some(j) => {
                    set.weights[j] += w;
                    set.remap[i] = j as u8;
                }
                None => {
                    set.values[set.len] = v;
                    set.weights[set.len] = w;
                    set.remap[i] = set.len as u8;
                    set.len += 1;
                }
            }
        }

        set
    }
}

/// Swaps the rotated channel with alpha. Rotation 0 is the identity; 1-3
/// move R, G or B into the scalar (alpha) slot.
pub(crate) fn rotate(pixel: [f32; 4], rotation: u8) -> Vec4 {
    let mut p = pixel;
    match rotation {
        1 => p.swap(0, 3),
        2 => p.swap(1, 3),
        3 => p.swap(2, 3),
        _ => {}
    }
    Vec4::new(
        p[0].clamp(0.0, 1.0),
        p[1].clamp(0.0, 1.0),
        p[2].clamp(0.0, 1.0),
        p[3].clamp(0.0, 1.0),
    )
}
