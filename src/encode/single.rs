//! The single-color fitter and its endpoint lookup tables.
//!
//! For a subset that collapses to one color, the best endpoint pair for each
//! codebook slot is a pure function of the 8-bit target value, the channel's
//! lattice and the interpolation rule. Those functions are tabulated once per
//! lattice configuration and kept for the rest of the process; the fitter is
//! then a handful of table reads per slot.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use glam::Vec4;

use crate::codebook::CodebookKind;
use crate::quantizer::{promote, Quantizer, SharedBits};

/// One lookup entry: the stored-domain endpoint pair whose `slot`-th
/// interpolant comes closest to the target, and the absolute channel error.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SourceEntry {
    pub start: u8,
    pub end: u8,
    pub error: u8,
}

/// 256 rows (one per target byte) of `k` entries each.
pub(crate) struct SingleLookup {
    k: usize,
    entries: Box<[SourceEntry]>,
}

impl SingleLookup {
    fn get(&self, target: u8, slot: usize) -> SourceEntry {
        self.entries[target as usize * self.k + slot]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct LookupKey {
    /// Stored bits, including the shared bit.
    bits: u8,
    /// Forced `(start, end)` LSBs, if the lattice has shared bits.
    shared: Option<(u8, u8)>,
    kind: CodebookKind,
}

/// Returns the table for one lattice configuration, building it on first use.
fn lookup(key: LookupKey) -> &'static SingleLookup {
    static CACHE: OnceLock<Mutex<HashMap<LookupKey, &'static SingleLookup>>> = OnceLock::new();

    let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let mut map = cache.lock().unwrap();
    *map.entry(key)
        .or_insert_with(|| Box::leak(Box::new(build_lookup(key))))
}

/// Exhaustive search over the endpoint lattice.
///
/// Instead of searching per target, every reachable interpolant is recorded
/// in a first-pair-wins sweep (ascending start, then end, so ties prefer the
/// smaller pair), and each target then takes the nearest reachable value,
/// preferring the smaller one on equidistant ties. The result is identical
/// to the per-target exhaustive search and monotone in the target.
fn build_lookup(key: LookupKey) -> SingleLookup {
    let k = key.kind.len();
    let max = (1_u16 << key.bits) - 1;
    let mut reached: Vec<Option<SourceEntry>> = vec![None; 256 * k];

    for s in 0..=max {
        if let Some((ps, _)) = key.shared {
            if (s & 1) as u8 != ps {
                continue;
            }
        }
        let sb = promote(s as u8, key.bits);
        for e in 0..=max {
            if let Some((_, pe)) = key.shared {
                if (e & 1) as u8 != pe {
                    continue;
                }
            }
            // equal 5:6:5 endpoints flip the block into its 3-entry mode, so
            // the 4-entry table never proposes them
            if key.kind == CodebookKind::Thirds4 && s == e {
                continue;
            }
            let eb = promote(e as u8, key.bits);

            for slot in 0..k {
                let v = key.kind.interpolate(sb, eb, slot) as usize;
                let entry = &mut reached[v * k + slot];
                if entry.is_none() {
                    *entry = Some(SourceEntry {
                        start: s as u8,
                        end: e as u8,
                        error: 0,
                    });
                }
            }
        }
    }

    let mut entries = vec![SourceEntry::default(); 256 * k].into_boxed_slice();
    for slot in 0..k {
        for target in 0..256_i32 {
            let found = (0..256_i32)
                .flat_map(|d| [target - d, target + d])
                .find_map(|v| {
                    if (0..256).contains(&v) {
                        reached[v as usize * k + slot].map(|e| (e, target.abs_diff(v) as u8))
                    } else {
                        None
                    }
                });
            let (mut entry, error) = found.expect("every slot reaches at least one value");
            entry.error = error;
            entries[target as usize * k + slot] = entry;
        }
    }

    SingleLookup { k, entries }
}

/// Result of a single-color fit: stored-domain endpoints and the ascending
/// codebook slot every pixel of the subset shares.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SingleFit {
    pub start: [u8; 4],
    pub end: [u8; 4],
    pub slot: u8,
    /// Per-occurrence squared error (not yet weighted by the subset weight).
    pub error: f32,
}

/// Finds the endpoint pair and codebook slot that best reproduce a single
/// color.
///
/// Disabled channels and channels without stored endpoint bits contribute no
/// error; the latter dequantize to opaque alpha. Per-channel byte errors are
/// mapped through `elut` before the metric weighting.
pub(crate) fn fit_single(
    color: Vec4,
    kind: CodebookKind,
    q: &Quantizer,
    channels: [bool; 4],
    metric: Vec4,
    elut: &'static [f32; 256],
) -> SingleFit {
    let k = kind.len();
    let mut targets = [0_u8; 4];
    for (c, t) in targets.iter_mut().enumerate() {
        *t = (color[c].clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
    }

    let mut best = SingleFit {
        start: [0; 4],
        end: [0; 4],
        slot: 0,
        error: f32::INFINITY,
    };

    for &(ps, pe) in q.shared().patterns() {
        let shared = match q.shared() {
            SharedBits::None => None,
            _ => Some((ps, pe)),
        };
        let mut tables: [Option<&'static SingleLookup>; 4] = [None; 4];
        for (c, table) in tables.iter_mut().enumerate() {
            if channels[c] && q.bits(c) > 0 {
                *table = Some(lookup(LookupKey {
                    bits: q.bits(c),
                    shared,
                    kind,
                }));
            }
        }

        for slot in 0..k {
            let mut sources = [SourceEntry::default(); 4];
            let mut cerror = Vec4::ZERO;
            for c in 0..4 {
                if let Some(table) = tables[c] {
                    sources[c] = table.get(targets[c], slot);
                    cerror[c] = elut[sources[c].error as usize];
                }
            }

            let error = (metric * cerror).length_squared();
            if error < best.error {
                for c in 0..4 {
                    best.start[c] = sources[c].start;
                    best.end[c] = sources[c].end;
                }
                best.slot = slot as u8;
                best.error = error;

                if error == 0.0 {
                    return best;
                }
            }
        }
    }

    best
}
