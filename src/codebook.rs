//! Codebook interpolation shared by the encoder and the decoders.
//!
//! All interpolation happens on dequantized 8-bit channel values with
//! round-to-nearest integer arithmetic, so the encoder scores candidates
//! against exactly the values a decoder will reconstruct.

use glam::Vec4;

// Weights are multiplied by 4 compared to the format's 6-bit weights. This
// changes the interpolation formula from
//   ((64-w)*e0 + w*e1 + 32) >> 6
// to
//   ((256-w)*e0 + w*e1 + 128) >> 8
// Intermediate results still fit into u16, and the compiler can optimize
// away the `>> 8`.
pub(crate) const WEIGHTS_2: [u16; 4] = [0, 84, 172, 256];
pub(crate) const WEIGHTS_3: [u16; 8] = [0, 36, 72, 108, 148, 184, 220, 256];
pub(crate) const WEIGHTS_4: [u16; 16] = [
    0, 16, 36, 52, 68, 84, 104, 120, 136, 152, 172, 188, 204, 220, 240, 256,
];

/// Interpolates between two endpoint bytes with a x4-scaled weight.
pub(crate) fn interpolate_weighted(e0: u8, e1: u8, weight: u16) -> u8 {
    let w0 = 256 - weight;
    let w1 = weight;
    ((w0 * e0 as u16 + w1 * e1 as u16 + 128) >> 8) as u8
}

/// Integer division with round-to-nearest.
pub(crate) fn div_round(n: u16, d: u16) -> u8 {
    ((n + d / 2) / d) as u8
}

/// The interpolation rule of a block format's codebook.
///
/// Slots are in ascending order along the endpoint segment: slot 0 is the
/// start byte, the last slot is the end byte. The mapping from ascending
/// slots to wire index values is format-specific and handled by the block
/// writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum CodebookKind {
    /// 3-entry color codebook: start, midpoint, end.
    Thirds3,
    /// 4-entry color codebook: start, one third, two thirds, end.
    Thirds4,
    /// Weighted palette codebook with 2-, 3- or 4-bit indices.
    Weighted(u8),
    /// 8-entry scalar codebook in sevenths.
    Sevenths,
    /// 6-entry scalar codebook in fifths (the wire adds 0 and 255).
    Fifths,
}

impl CodebookKind {
    /// Number of entries on the interpolation segment.
    pub const fn len(self) -> usize {
        match self {
            CodebookKind::Thirds3 => 3,
            CodebookKind::Thirds4 => 4,
            CodebookKind::Weighted(bits) => 1 << bits,
            CodebookKind::Sevenths => 8,
            CodebookKind::Fifths => 6,
        }
    }

    /// Value of the ascending `slot` between endpoint bytes `a` and `b`.
    pub fn interpolate(self, a: u8, b: u8, slot: usize) -> u8 {
        debug_assert!(slot < self.len());
        let (a16, b16) = (a as u16, b as u16);
        match self {
            CodebookKind::Thirds3 => match slot {
                0 => a,
                1 => div_round(a16 + b16, 2),
                _ => b,
            },
            CodebookKind::Thirds4 => match slot {
                0 => a,
                1 => div_round(2 * a16 + b16, 3),
                2 => div_round(a16 + 2 * b16, 3),
                _ => b,
            },
            CodebookKind::Weighted(bits) => {
                let weight = match bits {
                    2 => WEIGHTS_2[slot],
                    3 => WEIGHTS_3[slot],
                    4 => WEIGHTS_4[slot],
                    _ => unreachable!(),
                };
                interpolate_weighted(a, b, weight)
            }
            CodebookKind::Sevenths => {
                let j = slot as u16;
                div_round((7 - j) * a16 + j * b16, 7)
            }
            CodebookKind::Fifths => {
                let j = slot as u16;
                div_round((5 - j) * a16 + j * b16, 5)
            }
        }
    }

    /// Builds the full 4-channel codebook in ascending order from expanded
    /// endpoint bytes, as normalized vectors.
    pub fn build(self, a: [u8; 4], b: [u8; 4], out: &mut [Vec4; 16]) -> usize {
        let len = self.len();
        for (slot, entry) in out[..len].iter_mut().enumerate() {
            *entry = Vec4::new(
                self.interpolate(a[0], b[0], slot) as f32 / 255.0,
                self.interpolate(a[1], b[1], slot) as f32 / 255.0,
                self.interpolate(a[2], b[2], slot) as f32 / 255.0,
                self.interpolate(a[3], b[3], slot) as f32 / 255.0,
            );
        }
        len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_reproduced_exactly() {
        for kind in [
            CodebookKind::Thirds3,
            CodebookKind::Thirds4,
            CodebookKind::Weighted(2),
            CodebookKind::Weighted(3),
            CodebookKind::Weighted(4),
            CodebookKind::Sevenths,
            CodebookKind::Fifths,
        ] {
            for (a, b) in [(0_u8, 255_u8), (17, 203), (255, 0), (90, 90)] {
                assert_eq!(kind.interpolate(a, b, 0), a);
                assert_eq!(kind.interpolate(a, b, kind.len() - 1), b);
            }
        }
    }

    #[test]
    fn interpolants_are_monotone() {
        for kind in [
            CodebookKind::Thirds4,
            CodebookKind::Weighted(3),
            CodebookKind::Sevenths,
            CodebookKind::Fifths,
        ] {
            for slot in 1..kind.len() {
                let prev = kind.interpolate(0, 255, slot - 1);
                let next = kind.interpolate(0, 255, slot);
                assert!(next > prev, "{kind:?} slot {slot}");
            }
        }
    }

    #[test]
    fn weighted_interpolation_matches_reference_formula() {
        // ((64-w)*e0 + w*e1 + 32) >> 6 with the unscaled 6-bit weights
        let unscaled: [u16; 4] = [0, 21, 43, 64];
        for (slot, &w) in unscaled.iter().enumerate() {
            let reference = ((64 - w) * 40 + w * 200 + 32) >> 6;
            assert_eq!(
                CodebookKind::Weighted(2).interpolate(40, 200, slot),
                reference as u8
            );
        }
    }
}
