//! Per-block compression: pixel-set construction, fitter dispatch,
//! partition/rotation enumeration and candidate selection.

use glam::Vec4;

mod alpha;
mod cluster;
mod range;
mod single;

use crate::block::{pack_alpha_block, pack_color_block, pack_palette_block, PaletteTokens};
use crate::codebook::CodebookKind;
use crate::colorset::{ColorSet, PaletteSet, ScalarSet, ALPHA_THRESHOLD, UNMAPPED};
use crate::format::{ModeDescriptor, PaletteMode};
use crate::gamma::gamma_lut;
use crate::partition::{partition, PARTITION_1};
use crate::quantizer::{Quantizer, SharedBits};
use crate::Flags;

/// A completely transparent 4-color block in 3-entry mode.
///
/// The endpoint words only have to satisfy `c0 <= c1`; distinct values are
/// chosen because some decoders mishandle `c0 == c1`.
const TRANSPARENT_BLOCK: [u8; 8] = [0, 0, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];

/// The error metric of one compression call.
pub(crate) struct Scoring {
    pub metric: Vec4,
    pub srgb: bool,
}

impl Scoring {
    fn new(metric: [f32; 4], flags: Flags) -> Self {
        Scoring {
            metric: Vec4::from_array(metric),
            srgb: flags.contains(Flags::SRGB_METRIC),
        }
    }

    #[cfg(test)]
    pub(crate) fn uniform() -> Self {
        Scoring {
            metric: Vec4::ONE,
            srgb: false,
        }
    }

    /// Metric-weighted squared distance between two normalized colors.
    ///
    /// With the sRGB metric, per-channel absolute differences are pushed
    /// through the sRGB error table first.
    pub(crate) fn distance(&self, a: Vec4, b: Vec4) -> f32 {
        if self.srgb {
            let lut = gamma_lut(true);
            let d = (a - b).abs() * 255.0;
            let mapped = Vec4::new(
                lut[(d.x + 0.5) as usize],
                lut[(d.y + 0.5) as usize],
                lut[(d.z + 0.5) as usize],
                lut[(d.w + 0.5) as usize],
            );
            (self.metric * mapped).length_squared()
        } else {
            (self.metric * (a - b)).length_squared()
        }
    }

    fn elut(&self) -> &'static [f32; 256] {
        gamma_lut(self.srgb)
    }
}

/// Input of one vector endpoint fit over a (sub)set of weighted points.
pub(crate) struct FitInput<'a> {
    pub points: &'a [Vec4],
    pub weights: &'a [f32],
    pub kind: CodebookKind,
    pub q: Quantizer,
    pub scoring: &'a Scoring,
}

/// A fitted endpoint pair in stored domain, the ascending codebook slot of
/// every set point, and the exact metric-weighted squared error.
pub(crate) struct FitOutput {
    pub start: [u8; 4],
    pub end: [u8; 4],
    pub slots: [u8; 16],
    pub error: f32,
}

/// Scores a quantized endpoint pair exactly: builds the real codebook and
/// assigns every point its nearest entry.
pub(crate) fn score_candidate(input: &FitInput, start: [u8; 4], end: [u8; 4]) -> FitOutput {
    let mut codebook = [Vec4::ZERO; 16];
    let len = input
        .kind
        .build(input.q.expand(start), input.q.expand(end), &mut codebook);

    let mut out = FitOutput {
        start,
        end,
        slots: [0; 16],
        error: 0.0,
    };
    for (i, (&p, &w)) in input.points.iter().zip(input.weights).enumerate() {
        let mut best_slot = 0;
        let mut best_dist = input.scoring.distance(p, codebook[0]);
        for (slot, &entry) in codebook[1..len].iter().enumerate() {
            let dist = input.scoring.distance(p, entry);
            if dist < best_dist {
                best_dist = dist;
                best_slot = slot + 1;
            }
        }
        out.slots[i] = best_slot as u8;
        out.error += w * best_dist;
    }
    out
}

fn use_cluster(flags: Flags) -> bool {
    // cluster fit is the default; the range fitter takes over only when it
    // is requested without the cluster fitter
    !(flags.contains(Flags::RANGE_FIT) && !flags.contains(Flags::CLUSTER_FIT))
}

/// Dispatches one subset to the single-color, cluster or range fitter.
fn fit_vector(input: &FitInput, channels: [bool; 4], flags: Flags) -> FitOutput {
    debug_assert!(!input.points.is_empty());

    if input.points.len() == 1 {
        let fit = single::fit_single(
            input.points[0],
            input.kind,
            &input.q,
            channels,
            input.scoring.metric,
            input.scoring.elut(),
        );
        return FitOutput {
            start: fit.start,
            end: fit.end,
            slots: [fit.slot; 16],
            error: fit.error * input.weights[0],
        };
    }

    if use_cluster(flags) {
        cluster::fit_cluster(input, flags.contains(Flags::ITERATIVE_REFINE))
    } else {
        range::fit_range(input)
    }
}

/// Stored 5:6:5 endpoint channels as the 16-bit endpoint word.
fn to_565(stored: [u8; 4]) -> u16 {
    ((stored[0] as u16) << 11) | ((stored[1] as u16) << 5) | stored[2] as u16
}

/// Compresses one block to the 4-color family.
pub(crate) fn compress_color(
    pixels: &[[f32; 4]; 16],
    mask: u16,
    metric: [f32; 4],
    flags: Flags,
) -> ([u8; 8], f32) {
    let set = ColorSet::new(pixels, mask, flags);
    if set.len == 0 {
        if set.has_transparent {
            return (TRANSPARENT_BLOCK, 0.0);
        }
        // fully masked-out block
        return ([0; 8], 0.0);
    }

    let mut scoring = Scoring::new(metric, flags);
    scoring.metric.w = 0.0;
    let channels = [true, true, true, false];

    // transparent pixels force the 3-entry mode; opaque blocks try both
    let mut best: Option<([u8; 8], f32)> = None;
    let kinds: &[CodebookKind] = if set.has_transparent {
        &[CodebookKind::Thirds3]
    } else {
        &[CodebookKind::Thirds4, CodebookKind::Thirds3]
    };

    for &kind in kinds {
        let input = FitInput {
            points: &set.points[..set.len],
            weights: &set.weights[..set.len],
            kind,
            q: Quantizer::rgb565(),
            scoring: &scoring,
        };
        let fit = fit_vector(&input, channels, flags);
        let block = write_color_block(&set, &fit, kind, pixels, mask, flags);
        if best.map_or(true, |(_, e)| fit.error < e) {
            best = Some((block, fit.error));
        }
    }

    best.expect("at least one codebook kind")
}

/// Orders the endpoints for the wire and maps ascending slots to wire
/// indices.
fn write_color_block(
    set: &ColorSet,
    fit: &FitOutput,
    kind: CodebookKind,
    pixels: &[[f32; 4]; 16],
    mask: u16,
    flags: Flags,
) -> [u8; 8] {
    let s = to_565(fit.start);
    let e = to_565(fit.end);

    let (c0, c1, map): (u16, u16, &[u8]) = match kind {
        CodebookKind::Thirds4 => {
            if s > e {
                (s, e, &[0, 2, 3, 1])
            } else if s < e {
                (e, s, &[1, 3, 2, 0])
            } else {
                // equal endpoints decode through the 3-entry mode where every
                // non-transparent entry is the same color
                (s, e, &[0, 0, 0, 0])
            }
        }
        CodebookKind::Thirds3 => {
            if s <= e {
                (s, e, &[0, 2, 1])
            } else {
                (e, s, &[1, 2, 0])
            }
        }
        _ => unreachable!(),
    };

    let exclude = flags.contains(Flags::EXCLUDE_TRANSPARENT);
    let mut indices = [0_u8; 16];
    for (i, index) in indices.iter_mut().enumerate() {
        let point = set.remap[i];
        if point != UNMAPPED {
            *index = map[fit.slots[point as usize] as usize];
        } else if exclude && mask & (1 << i) != 0 && pixels[i][3] < ALPHA_THRESHOLD {
            // the 3-entry transparent codeword
            *index = 3;
        }
    }

    pack_color_block(c0, c1, &indices)
}

/// Ascending slot to wire index for the 8-entry alpha codebook
/// (`a0 = hi`, `a1 = lo`).
const SEVENTHS_WIRE: [u8; 8] = [1, 7, 6, 5, 4, 3, 2, 0];
/// Ascending slot (6 segment entries, then literal 0 and 255) to wire index
/// for the 6-entry alpha codebook (`a0 = lo`, `a1 = hi`).
const FIFTHS_WIRE: [u8; 8] = [0, 2, 3, 4, 5, 1, 6, 7];

/// Compresses the alpha channel of one block to the 8-alpha family.
pub(crate) fn compress_alpha(
    pixels: &[[f32; 4]; 16],
    mask: u16,
    metric: [f32; 4],
    flags: Flags,
) -> ([u8; 8], f32) {
    let set = ScalarSet::new(pixels, mask, flags, 3);
    if set.len == 0 {
        return ([0; 8], 0.0);
    }

    const NO_EXTRAS: &[f32] = &[];
    const FIFTHS_EXTRAS: &[f32] = &[0.0, 1.0];

    let mut best: Option<([u8; 8], f32)> = None;
    for (kind, extras, require_distinct, wire) in [
        (CodebookKind::Sevenths, NO_EXTRAS, true, &SEVENTHS_WIRE),
        (CodebookKind::Fifths, FIFTHS_EXTRAS, false, &FIFTHS_WIRE),
    ] {
        let input = alpha::ScalarInput {
            values: &set.values[..set.len],
            weights: &set.weights[..set.len],
            bits: 8,
            kind,
            extras,
            weight: metric[3],
            require_distinct,
        };
        let fit = if use_cluster(flags) {
            alpha::fit_scalar_cluster(&input)
        } else {
            alpha::fit_scalar_range(&input)
        };
        let Some(fit) = fit else {
            continue;
        };

        let (a0, a1) = match kind {
            CodebookKind::Sevenths => (fit.hi, fit.lo),
            _ => (fit.lo, fit.hi),
        };
        let mut indices = [0_u8; 16];
        for (i, index) in indices.iter_mut().enumerate() {
            let point = set.remap[i];
            if point != UNMAPPED {
                *index = wire[fit.slots[point as usize] as usize];
            }
        }

        if best.map_or(true, |(_, e)| fit.error < e) {
            best = Some((pack_alpha_block(a0, a1, &indices), fit.error));
        }
    }

    best.expect("the 6-entry mode accepts any endpoint pair")
}

/// Compresses one block with a single palette mode.
pub(crate) fn compress_palette(
    pixels: &[[f32; 4]; 16],
    mask: u16,
    mode: PaletteMode,
    metric: [f32; 4],
    flags: Flags,
) -> ([u8; 16], f32) {
    let d = mode.descriptor();
    if mask == 0 {
        // canonical empty block: the reserved all-zero encoding
        return ([0; 16], 0.0);
    }

    if d.rotation_bits > 0 {
        return compress_rotation_mode(pixels, mask, mode, d, metric, flags);
    }

    let q = Quantizer::new(d.cb, d.ab, d.shared);
    let kind = CodebookKind::Weighted(d.ib);
    let mut scoring = Scoring::new(metric, flags);
    if !d.has_alpha() {
        scoring.metric.w = 0.0;
    }
    let channels = [true, true, true, d.has_alpha()];

    let mut best: Option<(PaletteTokens, f32)> = None;
    for part_index in 0..d.partitions() {
        let part = partition(d.subsets, part_index);
        let pset = PaletteSet::new(pixels, mask, flags, part, 0);

        let mut tokens = PaletteTokens::new(mode);
        tokens.partition = part_index;
        let mut subset_slots = [[0_u8; 16]; 3];
        let mut total = 0.0;
        let mut pruned = false;

        for s in 0..d.subsets as usize {
            let subset = &pset.subsets[s];
            if subset.len == 0 {
                continue;
            }
            let input = FitInput {
                points: &subset.points[..subset.len],
                weights: &subset.weights[..subset.len],
                kind,
                q,
                scoring: &scoring,
            };
            let fit = fit_vector(&input, channels, flags);
            tokens.endpoints[s] = [fit.start, fit.end];
            subset_slots[s] = fit.slots;
            total += fit.error;

            if best.as_ref().map_or(false, |&(_, e)| total >= e) {
                pruned = true;
                break;
            }
        }
        if pruned {
            continue;
        }

        for (i, index) in tokens.indices.iter_mut().enumerate() {
            let (s, point) = pset.remap[i];
            if point != UNMAPPED {
                *index = subset_slots[s as usize][point as usize];
            }
        }

        if best.as_ref().map_or(true, |&(_, e)| total < e) {
            best = Some((tokens, total));
        }
    }

    let (tokens, error) = best.expect("partition enumeration is non-empty");
    (pack_palette_block(&tokens), error)
}

/// The rotation modes fit the rotated RGB vector part and the rotated scalar
/// part independently, then keep the best rotation.
fn compress_rotation_mode(
    pixels: &[[f32; 4]; 16],
    mask: u16,
    mode: PaletteMode,
    d: &ModeDescriptor,
    metric: [f32; 4],
    flags: Flags,
) -> ([u8; 16], f32) {
    let q = Quantizer::new(d.cb, 0, SharedBits::None);
    let kind = CodebookKind::Weighted(d.ib);
    let rotations = 1_u8 << d.rotation_bits;

    let mut best: Option<(PaletteTokens, f32)> = None;
    for rotation in 0..rotations {
        // the channel that trades places with alpha
        let scalar_channel = [3_usize, 0, 1, 2][rotation as usize];
        let mut rotated_metric = metric;
        rotated_metric.swap(scalar_channel, 3);

        let mut scoring = Scoring::new(rotated_metric, flags);
        scoring.metric.w = 0.0;

        let pset = PaletteSet::new(pixels, mask, flags, &PARTITION_1, rotation);
        let subset = &pset.subsets[0];
        let aset = ScalarSet::new(pixels, mask, flags, scalar_channel);

        let mut tokens = PaletteTokens::new(mode);
        tokens.rotation = rotation;
        let mut total = 0.0;

        if subset.len > 0 {
            let input = FitInput {
                points: &subset.points[..subset.len],
                weights: &subset.weights[..subset.len],
                kind,
                q,
                scoring: &scoring,
            };
            let fit = fit_vector(&input, [true, true, true, false], flags);
            for c in 0..3 {
                tokens.endpoints[0][0][c] = fit.start[c];
                tokens.endpoints[0][1][c] = fit.end[c];
            }
            for (i, index) in tokens.indices.iter_mut().enumerate() {
                let (_, point) = pset.remap[i];
                if point != UNMAPPED {
                    *index = fit.slots[point as usize];
                }
            }
            total += fit.error;
        }

        if aset.len > 0 {
            let input = alpha::ScalarInput {
                values: &aset.values[..aset.len],
                weights: &aset.weights[..aset.len],
                bits: d.ab,
                kind: CodebookKind::Weighted(d.ib2),
                extras: &[],
                weight: metric[scalar_channel],
                require_distinct: false,
            };
            let fit = if use_cluster(flags) {
                alpha::fit_scalar_cluster(&input)
            } else {
                alpha::fit_scalar_range(&input)
            }
            .expect("weighted codebooks accept any endpoint pair");

            tokens.endpoints[0][0][3] = fit.lo;
            tokens.endpoints[0][1][3] = fit.hi;
            for (i, index) in tokens.alpha_indices.iter_mut().enumerate() {
                let point = aset.remap[i];
                if point != UNMAPPED {
                    *index = fit.slots[point as usize];
                }
            }
            total += fit.error;
        }

        if best.as_ref().map_or(true, |&(_, e)| total < e) {
            best = Some((tokens, total));
        }
    }

    let (tokens, error) = best.expect("rotation enumeration is non-empty");
    (pack_palette_block(&tokens), error)
}

/// Compresses one block with every mode in `modes` and keeps the best.
pub(crate) fn compress_palette_modes(
    pixels: &[[f32; 4]; 16],
    mask: u16,
    modes: &[PaletteMode],
    metric: [f32; 4],
    flags: Flags,
) -> ([u8; 16], f32) {
    debug_assert!(!modes.is_empty());

    let mut best: Option<([u8; 16], f32)> = None;
    for &mode in modes {
        let (block, error) = compress_palette(pixels, mask, mode, metric, flags);
        if best.map_or(true, |(_, e)| error < e) {
            best = Some((block, error));
        }
    }
    best.expect("mode list is non-empty")
}
