use std::sync::OnceLock;

/// Returns the 256-entry table mapping an 8-bit channel value to its
/// normalized intensity.
///
/// With `srgb == false` the table is linear (`i / 255`). With `srgb == true`
/// the values are decoded through the IEC 61966-2-1 transfer curve, so that
/// error accumulation happens in (approximately) linear light. Entry 0 is
/// exactly `0.0` and entry 255 is exactly `1.0` in both tables.
///
/// The tables are built once and live for the rest of the process.
pub fn gamma_lut(srgb: bool) -> &'static [f32; 256] {
    static LINEAR: OnceLock<[f32; 256]> = OnceLock::new();
    static SRGB: OnceLock<[f32; 256]> = OnceLock::new();

    if srgb {
        SRGB.get_or_init(|| build_lut(srgb_to_linear))
    } else {
        LINEAR.get_or_init(|| build_lut(|x| x))
    }
}

fn build_lut(f: impl Fn(f32) -> f32) -> [f32; 256] {
    let mut lut = [0.0_f32; 256];
    for (i, entry) in lut.iter_mut().enumerate() {
        *entry = f(i as f32 / 255.0);
    }
    lut
}

/// The sRGB decoding curve: linear segment below the 0.04045 break, power
/// segment with exponent 2.4 above it.
fn srgb_to_linear(x: f32) -> f32 {
    if x <= 0.04045 {
        x / 12.92
    } else {
        ((x + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lut_endpoints_are_exact() {
        for srgb in [false, true] {
            let lut = gamma_lut(srgb);
            assert_eq!(lut[0], 0.0);
            assert_eq!(lut[255], 1.0);
        }
    }

    #[test]
    fn linear_lut_is_uniform() {
        let lut = gamma_lut(false);
        for (i, &v) in lut.iter().enumerate() {
            assert_eq!(v, i as f32 / 255.0);
        }
    }

    #[test]
    fn srgb_lut_is_monotone_and_below_linear() {
        let lut = gamma_lut(true);
        for i in 1..256 {
            assert!(lut[i] > lut[i - 1]);
            // the decoding curve is convex, so it stays below the diagonal
            if i < 255 {
                assert!(lut[i] < i as f32 / 255.0);
            }
        }
    }
}
