//! Rate-distortion block compression for the BCn/BPTC block-format lineage.
//!
//! The crate compresses 4x4 RGBA pixel tiles into fixed-size blocks of three
//! families — 4-color interpolated blocks, 8-alpha interpolated blocks, and
//! partitioned palette blocks — and decodes them back. Per block, the
//! encoder derives the principal axis of the weighted pixel distribution,
//! dispatches between a single-color fitter backed by precomputed lookup
//! tables, a fast range fitter and an exhaustive cluster fitter, projects
//! the resulting endpoints onto the format's endpoint lattice, and keeps the
//! candidate with the lowest metric-weighted squared error.
//!
//! Blocks are encoded independently, so a caller may freely dispatch them
//! across threads; for a given input, format and flag word the output bytes
//! are bit-exact deterministic.
//!
//! ```
//! use blockfit::{compress_color_block, decompress_color_block, Flags, UNIFORM_METRIC};
//!
//! let red = [[1.0, 0.0, 0.0, 1.0]; 16];
//! let (block, error) = compress_color_block(&red, u16::MAX, UNIFORM_METRIC, Flags::default());
//! assert_eq!(error, 0.0);
//! assert_eq!(decompress_color_block(&block)[0], [255, 0, 0, 255]);
//! ```

#![forbid(unsafe_code)]

mod block;
mod codebook;
mod colorset;
mod decode;
mod encode;
mod error;
mod format;
mod gamma;
mod math;
mod partition;
mod quantizer;

pub use decode::{decompress_alpha_block, decompress_color_block, decompress_palette_block};
pub use error::FormatError;
pub use format::{BlockFormat, PaletteMode};
pub use gamma::gamma_lut;
pub use quantizer::SharedBits;

bitflags::bitflags! {
    /// Switches of the per-block encoder.
    ///
    /// The fitter flags pick between the exhaustive cluster fitter (the
    /// default) and the fast range fitter; the remaining flags tune the
    /// error metric and the treatment of transparent pixels.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u32 {
        /// Use the cluster fitter (implied unless `RANGE_FIT` is given
        /// alone).
        const CLUSTER_FIT = 1 << 0;
        /// Use the range fitter.
        const RANGE_FIT = 1 << 1;
        /// After a cluster fit, re-derive the principal axis from the
        /// quantized endpoints and refit, up to 8 times.
        const ITERATIVE_REFINE = 1 << 2;
        /// Accumulate errors through the sRGB transfer curve.
        const SRGB_METRIC = 1 << 3;
        /// Scale per-pixel weights by the pixel's alpha.
        const WEIGHT_BY_ALPHA = 1 << 4;
        /// Give transparent pixels no weight and encode them to the
        /// format's transparent codeword where one exists.
        const EXCLUDE_TRANSPARENT = 1 << 5;
    }
}

/// All channels weighted equally.
pub const UNIFORM_METRIC: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Luma-weighted channel metric (ITU-R BT.709 coefficients).
pub const PERCEPTUAL_METRIC: [f32; 4] = [0.2126, 0.7152, 0.0722, 1.0];

/// A compressed block of either family size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressedBlock {
    Eight([u8; 8]),
    Sixteen([u8; 16]),
}

impl CompressedBlock {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            CompressedBlock::Eight(b) => b,
            CompressedBlock::Sixteen(b) => b,
        }
    }
}

/// Compresses one 4x4 block.
///
/// `pixels` are RGBA in [0, 1] in row-major order; `mask` has one bit per
/// pixel (bit `i` for pixel `i`), cleared bits mark pixels whose value does
/// not matter. `metric` weighs the channels of the squared-error metric.
///
/// Returns the compressed block and the achieved metric-weighted squared
/// error, summed over the valid pixels in normalized channel units. A block
/// with every pixel masked out compresses to the canonical empty block with
/// zero error.
pub fn compress_block(
    pixels: &[[f32; 4]; 16],
    mask: u16,
    format: BlockFormat,
    metric: [f32; 4],
    flags: Flags,
) -> (CompressedBlock, f32) {
    match format {
        BlockFormat::Color => {
            let (block, error) = encode::compress_color(pixels, mask, metric, flags);
            (CompressedBlock::Eight(block), error)
        }
        BlockFormat::Alpha => {
            let (block, error) = encode::compress_alpha(pixels, mask, metric, flags);
            (CompressedBlock::Eight(block), error)
        }
        BlockFormat::Palette(mode) => {
            let (block, error) = encode::compress_palette(pixels, mask, mode, metric, flags);
            (CompressedBlock::Sixteen(block), error)
        }
    }
}

/// Compresses one block to the 4-color family. See [`compress_block`].
pub fn compress_color_block(
    pixels: &[[f32; 4]; 16],
    mask: u16,
    metric: [f32; 4],
    flags: Flags,
) -> ([u8; 8], f32) {
    encode::compress_color(pixels, mask, metric, flags)
}

/// Compresses the alpha channel of one block to the 8-alpha family.
/// See [`compress_block`].
pub fn compress_alpha_block(
    pixels: &[[f32; 4]; 16],
    mask: u16,
    metric: [f32; 4],
    flags: Flags,
) -> ([u8; 8], f32) {
    encode::compress_alpha(pixels, mask, metric, flags)
}

/// Compresses one block with a single palette mode. See [`compress_block`].
pub fn compress_palette_block(
    pixels: &[[f32; 4]; 16],
    mask: u16,
    mode: PaletteMode,
    metric: [f32; 4],
    flags: Flags,
) -> ([u8; 16], f32) {
    encode::compress_palette(pixels, mask, mode, metric, flags)
}

/// Compresses one block with every palette mode in `modes` and keeps the
/// lowest-error block. Ties keep the earlier mode in the list.
///
/// # Panics
///
/// Panics if `modes` is empty.
pub fn compress_palette_block_best(
    pixels: &[[f32; 4]; 16],
    mask: u16,
    modes: &[PaletteMode],
    metric: [f32; 4],
    flags: Flags,
) -> ([u8; 16], f32) {
    assert!(!modes.is_empty(), "mode list is empty");
    encode::compress_palette_modes(pixels, mask, modes, metric, flags)
}

/// Compresses a slice of blocks in parallel.
///
/// Blocks are independent, so this is a plain data-parallel map; the output
/// order matches the input order and every block is bit-identical to what
/// [`compress_block`] produces.
#[cfg(feature = "rayon")]
pub fn compress_blocks(
    blocks: &[[[f32; 4]; 16]],
    format: BlockFormat,
    metric: [f32; 4],
    flags: Flags,
) -> Vec<(CompressedBlock, f32)> {
    use rayon::prelude::*;

    blocks
        .par_iter()
        .map(|pixels| compress_block(pixels, u16::MAX, format, metric, flags))
        .collect()
}
