//! Serialization of encoder token trees into block bytes.
//!
//! The packers are injective: every distinct token tree produces distinct
//! bytes, and the decoders in [`crate::decode`] invert them exactly.

use crate::format::PaletteMode;
use crate::partition::partition;
use crate::quantizer::SharedBits;

/// Packs a 4-color block: two 5:6:5 endpoints and 16 two-bit indices.
///
/// The caller is responsible for the endpoint order (`c0 > c1` selects the
/// 4-entry codebook, `c0 <= c1` the 3-entry + transparent one).
pub(crate) fn pack_color_block(c0: u16, c1: u16, indices: &[u8; 16]) -> [u8; 8] {
    let mut packed: u32 = 0;
    for (i, &index) in indices.iter().enumerate() {
        debug_assert!(index < 4);
        packed |= (index as u32) << (i * 2);
    }

    let c0 = c0.to_le_bytes();
    let c1 = c1.to_le_bytes();
    let [i0, i1, i2, i3] = packed.to_le_bytes();
    [c0[0], c0[1], c1[0], c1[1], i0, i1, i2, i3]
}

/// Packs an 8-alpha block: two 8-bit endpoints and 16 three-bit indices.
///
/// `a0 > a1` selects the 8-entry codebook, `a0 <= a1` the 6-entry one with
/// literal 0 and 255.
pub(crate) fn pack_alpha_block(a0: u8, a1: u8, indices: &[u8; 16]) -> [u8; 8] {
    let mut packed: u64 = 0;
    for (i, &index) in indices.iter().enumerate() {
        debug_assert!(index < 8);
        packed |= (index as u64) << (i * 3);
    }

    let idx = packed.to_le_bytes();
    [a0, a1, idx[0], idx[1], idx[2], idx[3], idx[4], idx[5]]
}

/// The token tree of one palette block before bit packing.
///
/// Endpoints are in stored domain, with the shared bit (if the mode has one)
/// in the LSB of every channel. Index values are ascending codebook slots;
/// the packer performs the anchor normalization.
#[derive(Debug, Clone)]
pub(crate) struct PaletteTokens {
    pub mode: PaletteMode,
    pub partition: u8,
    pub rotation: u8,
    pub endpoints: [[[u8; 4]; 2]; 3],
    pub indices: [u8; 16],
    /// Secondary index list for modes with separate alpha indices.
    pub alpha_indices: [u8; 16],
}

impl PaletteTokens {
    pub fn new(mode: PaletteMode) -> Self {
        PaletteTokens {
            mode,
            partition: 0,
            rotation: 0,
            endpoints: [[[0; 4]; 2]; 3],
            indices: [0; 16],
            alpha_indices: [0; 16],
        }
    }
}

/// Serializes a palette token tree into its 16-byte block.
pub(crate) fn pack_palette_block(tokens: &PaletteTokens) -> [u8; 16] {
    let d = tokens.mode.descriptor();
    let part = partition(d.subsets, tokens.partition);
    let sbits = d.shared.bits();

    let mut tokens = tokens.clone();

    // Anchor normalization: the wire drops the MSB of each subset's anchor
    // index, so flip any subset whose anchor landed in the upper half. A flip
    // mirrors the codebook, which is compensated by swapping the endpoints.
    let max_index = (1_u8 << d.ib) - 1;
    for s in 0..d.subsets {
        let anchor = part.anchor_of(s) as usize;
        if tokens.indices[anchor] > max_index / 2 {
            for i in 0..16 {
                if part.subset_of(i) == s {
                    tokens.indices[i] = max_index - tokens.indices[i];
                }
            }
            let pair = &mut tokens.endpoints[s as usize];
            if d.has_alpha_indices() {
                // separate lists flip color and alpha independently
                for c in 0..3 {
                    let tmp = pair[0][c];
                    pair[0][c] = pair[1][c];
                    pair[1][c] = tmp;
                }
            } else {
                pair.swap(0, 1);
            }
        }
    }
    if d.has_alpha_indices() {
        let max_index2 = (1_u8 << d.ib2) - 1;
        if tokens.alpha_indices[0] > max_index2 / 2 {
            for index in tokens.alpha_indices.iter_mut() {
                *index = max_index2 - *index;
            }
            let pair = &mut tokens.endpoints[0];
            let tmp = pair[0][3];
            pair[0][3] = pair[1][3];
            pair[1][3] = tmp;
        }
    }

    let mut stream = BitWriter::new();
    stream.write(1_u64 << d.mode, d.mode + 1);
    if d.partition_bits > 0 {
        stream.write(tokens.partition as u64, d.partition_bits);
    }
    if d.rotation_bits > 0 {
        stream.write(tokens.rotation as u64, d.rotation_bits);
    }
    if d.index_mode_bits > 0 {
        // the encoder always emits the primary index assignment
        stream.write(0, d.index_mode_bits);
    }

    // endpoints, channel-major, without their shared bit
    for c in 0..3 {
        for s in 0..d.subsets as usize {
            for e in 0..2 {
                stream.write((tokens.endpoints[s][e][c] >> sbits) as u64, d.cb - sbits);
            }
        }
    }
    if d.has_alpha() {
        for s in 0..d.subsets as usize {
            for e in 0..2 {
                stream.write((tokens.endpoints[s][e][3] >> sbits) as u64, d.ab - sbits);
            }
        }
    }

    // shared bits; every channel of an endpoint agrees on its LSB
    match d.shared {
        SharedBits::None => {}
        SharedBits::OnePerSubset => {
            for s in 0..d.subsets as usize {
                stream.write((tokens.endpoints[s][0][0] & 1) as u64, 1);
            }
        }
        SharedBits::OnePerEndpoint => {
            for s in 0..d.subsets as usize {
                for e in 0..2 {
                    stream.write((tokens.endpoints[s][e][0] & 1) as u64, 1);
                }
            }
        }
    }

    // indices, anchors one bit short
    for i in 0..16_u8 {
        let width = d.ib - part.is_anchored(i) as u8;
        let index = tokens.indices[i as usize];
        debug_assert!(index < (1 << width));
        stream.write(index as u64, width);
    }
    if d.has_alpha_indices() {
        for i in 0..16_u8 {
            let width = d.ib2 - (i == 0) as u8;
            let index = tokens.alpha_indices[i as usize];
            debug_assert!(index < (1 << width));
            stream.write(index as u64, width);
        }
    }

    stream.finish()
}

struct BitWriter {
    data: u128,
    bits: u8,
}

impl BitWriter {
    fn new() -> Self {
        Self { data: 0, bits: 0 }
    }

    #[inline]
    fn write(&mut self, value: u64, bits: u8) {
        debug_assert!(bits < 64);
        debug_assert!(value < (1 << bits));

        self.data |= (value as u128) << self.bits;
        self.bits += bits;
    }

    fn finish(self) -> [u8; 16] {
        debug_assert_eq!(self.bits, 128);
        self.data.to_le_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_block_layout_is_little_endian() {
        let block = pack_color_block(0xF800, 0x001F, &[0; 16]);
        assert_eq!(&block[..4], &[0x00, 0xF8, 0x1F, 0x00]);
        assert_eq!(&block[4..], &[0; 4]);
    }

    #[test]
    fn color_indices_pack_two_bits_each() {
        let mut indices = [0_u8; 16];
        indices[0] = 3;
        indices[15] = 1;
        let block = pack_color_block(0xFFFF, 0, &indices);
        assert_eq!(block[4], 0b0000_0011);
        assert_eq!(block[7], 0b0100_0000);
    }

    #[test]
    fn alpha_indices_pack_three_bits_each() {
        let mut indices = [0_u8; 16];
        indices[0] = 0b111;
        let block = pack_alpha_block(200, 10, &indices);
        assert_eq!(block[0], 200);
        assert_eq!(block[1], 10);
        assert_eq!(block[2], 0b0000_0111);
    }

    #[test]
    fn palette_anchor_flip_preserves_low_msb() {
        let mode = PaletteMode::new(6).unwrap();
        let mut tokens = PaletteTokens::new(mode);
        tokens.endpoints[0][0] = [10, 20, 30, 40];
        tokens.endpoints[0][1] = [200, 210, 220, 230];
        tokens.indices = [15; 16];

        let block = pack_palette_block(&tokens);
        // mode 6 marker: bit 6 set
        assert_eq!(block[0] & 0x7F, 1 << 6);

        let pixels = crate::decode::decompress_palette_block(&block);
        // index 15 selects the end point; after the flip the anchor selects
        // the start, so the decoded color must still be the original end
        let expanded = crate::quantizer::promote(200, 8);
        assert_eq!(pixels[0][0], expanded);
    }
}
