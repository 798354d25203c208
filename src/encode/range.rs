//! The range fitter: a single pass that spans the subset with the two points
//! at the extreme projections onto the principal axis.

use glam::Vec3A;

use super::{score_candidate, FitInput, FitOutput};
use crate::math::{principal_component, weighted_covariance4};

/// Fits endpoints to the extreme projections of the point set.
///
/// The two points at the minimum and maximum projection onto the principal
/// axis become the endpoint proposal; every legal shared-bit pattern is
/// tried and the candidates are scored against the real codebook.
pub(crate) fn fit_range(input: &FitInput) -> FitOutput {
    let n = input.points.len();
    debug_assert!(n > 0);

    let axis = principal_component(weighted_covariance4(input.points, input.weights));

    let mut imin = 0;
    let mut imax = 0;
    let mut dmin = Vec3A::from(input.points[0].truncate()).dot(axis);
    let mut dmax = dmin;
    for (i, &p) in input.points.iter().enumerate().skip(1) {
        let d = Vec3A::from(p.truncate()).dot(axis);
        if d < dmin {
            dmin = d;
            imin = i;
        }
        if d > dmax {
            dmax = d;
            imax = i;
        }
    }

    let start_v = input.points[imin];
    let end_v = input.points[imax];

    let mut best: Option<FitOutput> = None;
    for &(ps, pe) in input.q.shared().patterns() {
        let start = input.q.snap(start_v, ps);
        let end = input.q.snap(end_v, pe);
        let candidate = score_candidate(input, start, end);

        if best.as_ref().map_or(true, |b| candidate.error < b.error) {
            best = Some(candidate);
        }
    }

    best.expect("at least one shared-bit pattern")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codebook::CodebookKind;
    use crate::encode::Scoring;
    use crate::quantizer::Quantizer;
    use glam::Vec4;

    #[test]
    fn endpoints_span_the_extremes() {
        let points = [
            Vec4::new(0.0, 0.0, 0.0, 1.0),
            Vec4::new(0.25, 0.25, 0.25, 1.0),
            Vec4::new(1.0, 1.0, 1.0, 1.0),
        ];
        let weights = [1.0_f32; 3];
        let scoring = Scoring::uniform();
        let input = FitInput {
            points: &points,
            weights: &weights,
            kind: CodebookKind::Thirds4,
            q: Quantizer::rgb565(),
            scoring: &scoring,
        };

        let fit = fit_range(&input);
        assert_eq!(input.q.expand(fit.start)[0], 0);
        assert_eq!(input.q.expand(fit.end)[0], 255);
        assert_eq!(fit.slots[0], 0);
        assert_eq!(fit.slots[2], 3);
    }

    #[test]
    fn single_point_collapses_the_segment() {
        let points = [Vec4::new(0.5, 0.5, 0.5, 1.0)];
        let weights = [16.0_f32];
        let scoring = Scoring::uniform();
        let input = FitInput {
            points: &points,
            weights: &weights,
            kind: CodebookKind::Weighted(2),
            q: Quantizer::new(7, 0, crate::quantizer::SharedBits::None),
            scoring: &scoring,
        };

        let fit = fit_range(&input);
        assert_eq!(fit.start, fit.end);
    }
}
