//! Projection of floating-point endpoints onto the legal endpoint lattice of
//! a block format.
//!
//! Each channel stores an integer of `b` bits; decoding replicates the top
//! bits into the low bits so that 0 maps to 0.0 and the maximum maps to 1.0
//! exactly. Formats with shared low bits force the least significant bit of
//! every channel to a per-endpoint (or per-subset) pattern bit, which the
//! quantizer honors as a constraint on the rounding.

use glam::Vec4;

/// How the low-order endpoint bits are shared within a subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SharedBits {
    /// All endpoint bits are independent.
    None,
    /// One bit, appended as the LSB of every channel of both endpoints.
    OnePerSubset,
    /// One bit per endpoint, appended as the LSB of every channel of that
    /// endpoint.
    OnePerEndpoint,
}

impl SharedBits {
    /// The `(start, end)` bit patterns a fitter has to try.
    pub(crate) fn patterns(self) -> &'static [(u8, u8)] {
        match self {
            SharedBits::None => &[(0, 0)],
            SharedBits::OnePerSubset => &[(0, 0), (1, 1)],
            SharedBits::OnePerEndpoint => &[(0, 0), (1, 0), (0, 1), (1, 1)],
        }
    }

    /// Number of forced low bits per channel.
    pub(crate) const fn bits(self) -> u8 {
        match self {
            SharedBits::None => 0,
            _ => 1,
        }
    }
}

/// The endpoint lattice of one block format: per-channel stored bit widths
/// (including the shared bit, if any) and the shared-bit configuration.
///
/// A width of 0 marks a channel without stored endpoint bits; it dequantizes
/// to the maximum (opaque alpha).
#[derive(Debug, Clone, Copy)]
pub(crate) struct Quantizer {
    bits: [u8; 4],
    shared: SharedBits,
}

impl Quantizer {
    /// Lattice with uniform color width `cb` and alpha width `ab`, both
    /// including the shared bit. `ab == 0` fixes alpha to opaque.
    pub fn new(cb: u8, ab: u8, shared: SharedBits) -> Self {
        debug_assert!((4..=8).contains(&cb));
        debug_assert!(ab == 0 || (4..=8).contains(&ab));
        Self {
            bits: [cb, cb, cb, ab],
            shared,
        }
    }

    /// The 5:6:5 color lattice with fixed opaque alpha.
    pub fn rgb565() -> Self {
        Self {
            bits: [5, 6, 5, 0],
            shared: SharedBits::None,
        }
    }

    pub fn shared(&self) -> SharedBits {
        self.shared
    }

    /// Stored bits of a channel, including the shared bit. 0 for channels
    /// without stored endpoint bits.
    pub fn bits(&self, channel: usize) -> u8 {
        self.bits[channel]
    }

    /// Normalized distance between adjacent lattice points of a channel.
    ///
    /// Used for ratio tests; returns 0 for channels without stored bits.
    pub fn stride(&self, channel: usize) -> f32 {
        let b = self.bits[channel];
        if b == 0 {
            0.0
        } else {
            1.0 / max_value(b) as f32
        }
    }

    /// Rounds `v` to the nearest lattice point whose forced low bits match
    /// the shared `pattern` bit, returning stored-domain channel values.
    ///
    /// Rounding is to nearest with ties away from zero, then clamped to the
    /// channel range. Without shared bits the pattern is ignored.
    pub fn snap(&self, v: Vec4, pattern: u8) -> [u8; 4] {
        let mut q = [0_u8; 4];
        for (c, out) in q.iter_mut().enumerate() {
            *out = snap_channel(v[c], self.bits[c], self.shared.bits(), pattern);
        }
        q
    }

    /// Dequantizes stored-domain channel values to bytes by replicating the
    /// top bits into the low bits. Channels without stored bits yield 255.
    pub fn expand(&self, q: [u8; 4]) -> [u8; 4] {
        let mut bytes = [0_u8; 4];
        for (c, out) in bytes.iter_mut().enumerate() {
            let b = self.bits[c];
            *out = if b == 0 { 255 } else { promote(q[c], b) };
        }
        bytes
    }

    /// Dequantizes stored-domain channel values to a normalized vector.
    ///
    /// `lookup(snap(v))` is within half a channel stride of `v` for inputs
    /// in [0, 1].
    pub fn lookup(&self, q: [u8; 4]) -> Vec4 {
        let b = self.expand(q);
        Vec4::new(
            b[0] as f32 / 255.0,
            b[1] as f32 / 255.0,
            b[2] as f32 / 255.0,
            b[3] as f32 / 255.0,
        )
    }
}

const fn max_value(bits: u8) -> u8 {
    (((1_u16) << bits) - 1) as u8
}

/// Replicates the top bits of a `bits`-wide value into its low bits, widening
/// it to 8 bits. This is the standard BCn dequantization: 0 stays 0 and the
/// maximum becomes 255.
pub(crate) fn promote(value: u8, bits: u8) -> u8 {
    debug_assert!((4..=8).contains(&bits));
    debug_assert!(value <= max_value(bits));
    if bits == 8 {
        return value;
    }
    (value << (8 - bits)) | (value >> (2 * bits - 8))
}

fn snap_channel(v: f32, bits: u8, shared_bits: u8, pattern: u8) -> u8 {
    if bits == 0 {
        return 0;
    }
    let max = max_value(bits) as f32;
    let v = v.clamp(0.0, 1.0);

    if shared_bits == 0 {
        // ties away from zero; v is non-negative here
        return (v * max + 0.5) as u8;
    }

    // the LSB is forced, so round within the even/odd sub-lattice; the
    // clamp stays inside it (the top even value for pattern 0)
    let p = (pattern & 1) as f32;
    let top = ((max - p) * 0.5).floor();
    let stepped = ((v * max - p) * 0.5 + 0.5).floor().clamp(0.0, top);
    (stepped * 2.0 + p) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snap_lookup_round_trip_is_within_half_a_stride() {
        for &(cb, ab, shared) in &[
            (5, 0, SharedBits::None),
            (6, 6, SharedBits::None),
            (7, 0, SharedBits::OnePerEndpoint),
            (5, 5, SharedBits::OnePerEndpoint),
            (7, 0, SharedBits::OnePerSubset),
            (8, 8, SharedBits::None),
        ] {
            let q = Quantizer::new(cb, ab, shared);
            for &(s, _) in shared.patterns() {
                for i in 0..=64 {
                    let v = Vec4::splat(i as f32 / 64.0);
                    let snapped = q.snap(v, s);
                    let back = q.lookup(snapped);
                    for c in 0..3 {
                        let stride = q.stride(c) * (1 << shared.bits()) as f32;
                        // bit replication skews dequantized values off the
                        // ideal i/max grid by up to ~0.75/255
                        assert!(
                            (back[c] - v[c]).abs() <= 0.5 * stride + 0.004,
                            "cb={cb} shared={shared:?} v={} back={}",
                            v[c],
                            back[c]
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn lattice_extremes_are_exact() {
        let q = Quantizer::new(5, 6, SharedBits::None);
        assert_eq!(q.lookup(q.snap(Vec4::ZERO, 0)), Vec4::ZERO);
        assert_eq!(q.lookup(q.snap(Vec4::ONE, 0)), Vec4::ONE);
    }

    #[test]
    fn shared_pattern_forces_parity() {
        let q = Quantizer::new(6, 0, SharedBits::OnePerEndpoint);
        for i in 0..=32 {
            let v = Vec4::splat(i as f32 / 32.0);
            for pattern in 0..2_u8 {
                let snapped = q.snap(v, pattern);
                for c in 0..3 {
                    assert_eq!(snapped[c] & 1, pattern);
                }
            }
        }
    }

    #[test]
    fn fixed_alpha_channel_expands_to_opaque() {
        let q = Quantizer::rgb565();
        let snapped = q.snap(Vec4::new(0.5, 0.5, 0.5, 0.1), 0);
        assert_eq!(q.expand(snapped)[3], 255);
    }

    #[test]
    fn promote_replicates_top_bits() {
        assert_eq!(promote(0, 5), 0);
        assert_eq!(promote(31, 5), 255);
        assert_eq!(promote(63, 6), 255);
        assert_eq!(promote(16, 5), 132);
    }
}
