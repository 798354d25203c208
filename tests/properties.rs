//! Cross-format properties: determinism, encode/decode agreement, flag
//! monotonicity and round-trip fixpoints.

use blockfit::{
    compress_alpha_block, compress_block, compress_color_block, compress_palette_block,
    compress_palette_block_best, decompress_alpha_block, decompress_color_block,
    decompress_palette_block, BlockFormat, CompressedBlock, Flags, PaletteMode, UNIFORM_METRIC,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

const OPAQUE: u16 = u16::MAX;

fn random_block(rng: &mut StdRng, alpha: bool) -> [[f32; 4]; 16] {
    let mut pixels = [[0.0_f32; 4]; 16];
    for pixel in pixels.iter_mut() {
        *pixel = [
            rng.gen(),
            rng.gen(),
            rng.gen(),
            if alpha { rng.gen() } else { 1.0 },
        ];
    }
    pixels
}

fn pixels_from_bytes(decoded: &[[u8; 4]; 16]) -> [[f32; 4]; 16] {
    let mut pixels = [[0.0_f32; 4]; 16];
    for (out, src) in pixels.iter_mut().zip(decoded) {
        for c in 0..4 {
            out[c] = src[c] as f32 / 255.0;
        }
    }
    pixels
}

#[test]
fn output_is_deterministic() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..8 {
        let pixels = random_block(&mut rng, true);
        for flags in [Flags::empty(), Flags::RANGE_FIT, Flags::ITERATIVE_REFINE] {
            let a = compress_color_block(&pixels, OPAQUE, UNIFORM_METRIC, flags);
            let b = compress_color_block(&pixels, OPAQUE, UNIFORM_METRIC, flags);
            assert_eq!(a, b);

            let a = compress_alpha_block(&pixels, OPAQUE, UNIFORM_METRIC, flags);
            let b = compress_alpha_block(&pixels, OPAQUE, UNIFORM_METRIC, flags);
            assert_eq!(a, b);
        }
    }
}

#[test]
fn dispatch_matches_family_entry_points() {
    let mut rng = StdRng::seed_from_u64(11);
    let pixels = random_block(&mut rng, true);

    let (block, error) = compress_block(
        &pixels,
        OPAQUE,
        BlockFormat::Color,
        UNIFORM_METRIC,
        Flags::empty(),
    );
    let (direct, direct_error) =
        compress_color_block(&pixels, OPAQUE, UNIFORM_METRIC, Flags::empty());
    assert_eq!(block, CompressedBlock::Eight(direct));
    assert_eq!(error, direct_error);
}

#[test]
fn cluster_flag_never_increases_error() {
    let mut rng = StdRng::seed_from_u64(23);
    for _ in 0..12 {
        let pixels = random_block(&mut rng, false);

        let (_, with) = compress_color_block(
            &pixels,
            OPAQUE,
            UNIFORM_METRIC,
            Flags::CLUSTER_FIT | Flags::RANGE_FIT,
        );
        let (_, without) =
            compress_color_block(&pixels, OPAQUE, UNIFORM_METRIC, Flags::RANGE_FIT);
        assert!(with <= without);

        let (_, with) = compress_alpha_block(
            &pixels,
            OPAQUE,
            UNIFORM_METRIC,
            Flags::CLUSTER_FIT | Flags::RANGE_FIT,
        );
        let (_, without) =
            compress_alpha_block(&pixels, OPAQUE, UNIFORM_METRIC, Flags::RANGE_FIT);
        assert!(with <= without);
    }
}

#[test]
fn refinement_never_increases_error() {
    let mut rng = StdRng::seed_from_u64(29);
    for _ in 0..8 {
        let pixels = random_block(&mut rng, false);
        let (_, plain) = compress_color_block(&pixels, OPAQUE, UNIFORM_METRIC, Flags::empty());
        let (_, refined) =
            compress_color_block(&pixels, OPAQUE, UNIFORM_METRIC, Flags::ITERATIVE_REFINE);
        assert!(refined <= plain);
    }
}

#[test]
fn permutations_leave_the_error_unchanged() {
    let mut rng = StdRng::seed_from_u64(31);
    // a fixed permutation of the 16 block slots
    let perm: [usize; 16] = [5, 0, 12, 7, 3, 15, 9, 1, 14, 2, 11, 6, 13, 8, 4, 10];

    for _ in 0..8 {
        let pixels = random_block(&mut rng, false);
        let mut permuted = [[0.0_f32; 4]; 16];
        for (i, &p) in perm.iter().enumerate() {
            permuted[i] = pixels[p];
        }

        let (_, a) = compress_color_block(&pixels, OPAQUE, UNIFORM_METRIC, Flags::empty());
        let (_, b) = compress_color_block(&permuted, OPAQUE, UNIFORM_METRIC, Flags::empty());
        // summation order inside the fitters differs, so allow rounding slack
        let diff = (a - b).abs();
        assert!(diff <= 0.02 * (1.0 + a.max(b)), "{a} vs {b}");
    }
}

/// Recomputes the reported error of a color block from its decoded pixels.
fn color_error_from_decode(pixels: &[[f32; 4]; 16], block: &[u8; 8]) -> f32 {
    let decoded = decompress_color_block(block);
    let mut error = 0.0;
    for (p, d) in pixels.iter().zip(&decoded) {
        for c in 0..3 {
            let diff = p[c] - d[c] as f32 / 255.0;
            error += diff * diff;
        }
    }
    error
}

#[test]
fn reported_color_error_matches_decode() {
    let mut rng = StdRng::seed_from_u64(37);
    for _ in 0..10 {
        let pixels = random_block(&mut rng, false);
        for flags in [Flags::empty(), Flags::RANGE_FIT] {
            let (block, reported) =
                compress_color_block(&pixels, OPAQUE, UNIFORM_METRIC, flags);
            let recomputed = color_error_from_decode(&pixels, &block);
            assert!(
                (reported - recomputed).abs() <= 1e-3 * (1.0 + recomputed),
                "reported {reported} recomputed {recomputed}"
            );
        }
    }
}

#[test]
fn reported_alpha_error_matches_decode() {
    let mut rng = StdRng::seed_from_u64(41);
    for _ in 0..10 {
        let pixels = random_block(&mut rng, true);
        let (block, reported) =
            compress_alpha_block(&pixels, OPAQUE, UNIFORM_METRIC, Flags::empty());

        let decoded = decompress_alpha_block(&block);
        let mut recomputed = 0.0;
        for (p, &d) in pixels.iter().zip(&decoded) {
            let diff = p[3] - d as f32 / 255.0;
            recomputed += diff * diff;
        }
        assert!(
            (reported - recomputed).abs() <= 1e-3 * (1.0 + recomputed),
            "reported {reported} recomputed {recomputed}"
        );
    }
}

#[test]
fn reported_palette_error_matches_decode() {
    let mut rng = StdRng::seed_from_u64(43);
    let pixels = random_block(&mut rng, true);

    for mode_index in 0..8 {
        let mode = PaletteMode::new(mode_index).unwrap();
        // the partitioned modes use the fast fitter to keep the sweep small
        let flags = match mode_index {
            4..=6 => Flags::empty(),
            _ => Flags::RANGE_FIT,
        };
        let (block, reported) =
            compress_palette_block(&pixels, OPAQUE, mode, UNIFORM_METRIC, flags);

        let decoded = decompress_palette_block(&block);
        let opaque_alpha = mode_index < 4;
        let mut recomputed = 0.0;
        for (p, d) in pixels.iter().zip(&decoded) {
            for c in 0..4 {
                if c == 3 && opaque_alpha {
                    continue;
                }
                let diff = p[c] - d[c] as f32 / 255.0;
                recomputed += diff * diff;
            }
        }
        assert!(
            (reported - recomputed).abs() <= 1e-3 * (1.0 + recomputed),
            "mode {mode_index}: reported {reported} recomputed {recomputed}"
        );
    }
}

#[test]
fn exclude_transparent_palette_error_matches_decode() {
    // palette formats have no transparent codeword, so the exclusion flag
    // must not leave sub-threshold pixels out of the fit or the reported
    // error
    let mut rng = StdRng::seed_from_u64(53);
    let mut pixels = random_block(&mut rng, false);
    pixels[3][3] = 0.1;
    pixels[9][3] = 0.0;

    for mode_index in 0..8 {
        let mode = PaletteMode::new(mode_index).unwrap();
        let flags = match mode_index {
            4..=6 => Flags::EXCLUDE_TRANSPARENT,
            _ => Flags::EXCLUDE_TRANSPARENT | Flags::RANGE_FIT,
        };
        let (block, reported) = compress_palette_block(&pixels, OPAQUE, mode, UNIFORM_METRIC, flags);

        let decoded = decompress_palette_block(&block);
        let opaque_alpha = mode_index < 4;
        let mut recomputed = 0.0;
        for (p, d) in pixels.iter().zip(&decoded) {
            for c in 0..4 {
                if c == 3 && opaque_alpha {
                    continue;
                }
                let diff = p[c] - d[c] as f32 / 255.0;
                recomputed += diff * diff;
            }
        }
        assert!(
            (reported - recomputed).abs() <= 1e-3 * (1.0 + recomputed),
            "mode {mode_index}: reported {reported} recomputed {recomputed}"
        );
    }
}

#[test]
fn white_block_is_exact_in_every_palette_mode() {
    let pixels = [[1.0_f32; 4]; 16];
    for mode_index in 0..8 {
        let mode = PaletteMode::new(mode_index).unwrap();
        let (block, error) =
            compress_palette_block(&pixels, OPAQUE, mode, UNIFORM_METRIC, Flags::empty());
        assert_eq!(error, 0.0, "mode {mode_index}");
        assert_eq!(
            decompress_palette_block(&block),
            [[255_u8; 4]; 16],
            "mode {mode_index}"
        );
    }
}

#[test]
fn best_mode_selection_is_at_least_single_mode() {
    let mut rng = StdRng::seed_from_u64(47);
    let pixels = random_block(&mut rng, true);

    let (_, best) = compress_palette_block_best(
        &pixels,
        OPAQUE,
        &PaletteMode::ALL,
        UNIFORM_METRIC,
        Flags::RANGE_FIT,
    );
    for mode in PaletteMode::ALL {
        let (_, single) =
            compress_palette_block(&pixels, OPAQUE, mode, UNIFORM_METRIC, Flags::RANGE_FIT);
        assert!(best <= single, "mode {}", mode.index());
    }
}

#[test]
fn color_round_trip_is_idempotent() {
    let red = [1.0, 0.0, 0.0, 1.0];
    let blue = [0.0, 0.0, 1.0, 1.0];
    let mut checker = [[0.0_f32; 4]; 16];
    for (i, pixel) in checker.iter_mut().enumerate() {
        *pixel = if i % 2 == 0 { red } else { blue };
    }
    let mut gradient = [[0.0_f32; 4]; 16];
    for (i, pixel) in gradient.iter_mut().enumerate() {
        let v = ((i % 4) * 17) as f32 / 255.0;
        *pixel = [v, v, v, 1.0];
    }

    for pixels in [[[0.5_f32, 0.25, 0.75, 1.0]; 16], checker, gradient] {
        let (block, _) = compress_color_block(&pixels, OPAQUE, UNIFORM_METRIC, Flags::empty());
        let once = decompress_color_block(&block);

        let (block2, _) = compress_color_block(
            &pixels_from_bytes(&once),
            OPAQUE,
            UNIFORM_METRIC,
            Flags::empty(),
        );
        let twice = decompress_color_block(&block2);
        assert_eq!(once, twice);
    }
}

#[test]
fn alpha_round_trip_is_idempotent() {
    // two byte-exact alpha levels, both representable as endpoints
    let mut pixels = [[0.0_f32, 0.0, 0.0, 51.0 / 255.0]; 16];
    for pixel in pixels.iter_mut().skip(8) {
        pixel[3] = 204.0 / 255.0;
    }

    let (block, error) = compress_alpha_block(&pixels, OPAQUE, UNIFORM_METRIC, Flags::empty());
    assert_eq!(error, 0.0);
    let once = decompress_alpha_block(&block);

    let mut decoded_pixels = pixels;
    for (p, &a) in decoded_pixels.iter_mut().zip(&once) {
        p[3] = a as f32 / 255.0;
    }
    let (block2, _) = compress_alpha_block(&decoded_pixels, OPAQUE, UNIFORM_METRIC, Flags::empty());
    assert_eq!(decompress_alpha_block(&block2), once);
}

#[test]
fn masked_palette_block_is_empty() {
    let pixels = [[0.7_f32; 4]; 16];
    for mode in PaletteMode::ALL {
        let (block, error) =
            compress_palette_block(&pixels, 0, mode, UNIFORM_METRIC, Flags::empty());
        assert_eq!(error, 0.0);
        assert_eq!(block, [0; 16]);
    }
}
