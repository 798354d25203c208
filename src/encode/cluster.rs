//! The cluster fitter: exhaustive enumeration of ordered, projection-sorted
//! cluster assignments with a closed-form least-squares endpoint solve per
//! candidate.
//!
//! For a k-entry codebook the optimal index assignment partitions the points,
//! sorted by their projection onto the principal axis, into k contiguous
//! clusters where cluster `j` takes index `j`. The fitter walks every such
//! partition (empty clusters included), solves the weighted least squares for
//! the endpoint pair in closed form from running sums, quantizes the
//! proposal, and measures its error with the quantized endpoints through a
//! quadratic form that costs O(1) per candidate.

use glam::{Vec3A, Vec4};

use super::{score_candidate, FitInput, FitOutput};
use crate::math::{principal_component, weighted_covariance4};
use crate::quantizer::Quantizer;

/// Compositions with more codebook entries than this fall back to the range
/// fitter; the enumeration space for 16 entries is out of reach.
const MAX_CLUSTER_ENTRIES: usize = 8;

/// Runs the cluster fitter, seeded with the range fitter's result so the
/// returned error never exceeds it.
///
/// With `refine` the principal axis is re-derived from the winning quantized
/// endpoint pair and the enumeration repeats, up to 8 times or until an
/// iteration stops improving.
pub(crate) fn fit_cluster(input: &FitInput, refine: bool) -> FitOutput {
    let mut best = super::range::fit_range(input);

    let n = input.points.len();
    let k = input.kind.len();
    if best.error == 0.0 || n < 2 || k > MAX_CLUSTER_ENTRIES {
        return best;
    }

    let mut axis = principal_component(weighted_covariance4(input.points, input.weights));

    let max_iterations = if refine { 8 } else { 1 };
    for _ in 0..max_iterations {
        let Some((start, end)) = best_composition(input, axis) else {
            break;
        };
        let candidate = score_candidate(input, start, end);
        if candidate.error < best.error {
            best = candidate;
        } else {
            break;
        }

        // re-derive the search axis from the quantized endpoints
        let next = Vec3A::from((input.q.lookup(best.end) - input.q.lookup(best.start)).truncate());
        if next == Vec3A::ZERO {
            break;
        }
        axis = next;
    }

    best
}

/// Enumerates every composition along `axis` and returns the quantized
/// endpoint pair of the lowest-error candidate.
fn best_composition(input: &FitInput, axis: Vec3A) -> Option<([u8; 4], [u8; 4])> {
    let n = input.points.len();
    let k = input.kind.len();

    // projection sort; the index tie-break makes the order total, so the
    // unstable sort is deterministic and allocation-free
    let mut order = [0_usize; 16];
    for (i, slot) in order[..n].iter_mut().enumerate() {
        *slot = i;
    }
    order[..n].sort_unstable_by(|&a, &b| {
        let da = Vec3A::from(input.points[a].truncate()).dot(axis);
        let db = Vec3A::from(input.points[b].truncate()).dot(axis);
        da.partial_cmp(&db).unwrap().then(a.cmp(&b))
    });

    // prefix sums over the sorted order
    let mut xsum = [Vec4::ZERO; 17];
    let mut wsum = [0.0_f32; 17];
    let metric2 = input.scoring.metric * input.scoring.metric;
    let mut constant = 0.0_f32;
    for (i, &p) in order[..n].iter().enumerate() {
        let point = input.points[p];
        let weight = input.weights[p];
        xsum[i + 1] = xsum[i] + weight * point;
        wsum[i + 1] = wsum[i] + weight;
        constant += weight * (point * point).dot(metric2);
    }

    let mut enumerator = Enumerator {
        input,
        k,
        n,
        xsum,
        wsum,
        metric2,
        constant,
        best_error: f32::INFINITY,
        best: None,
    };
    enumerator.descend(0, 0, Sums::ZERO);
    enumerator.best
}

/// Running per-candidate aggregates. `u` is the start weight of a cluster's
/// codebook position, `v = 1 - u` the end weight.
#[derive(Clone, Copy)]
struct Sums {
    alphax: Vec4,
    betax: Vec4,
    alpha2: f32,
    beta2: f32,
    alphabeta: f32,
}

impl Sums {
    const ZERO: Sums = Sums {
        alphax: Vec4::ZERO,
        betax: Vec4::ZERO,
        alpha2: 0.0,
        beta2: 0.0,
        alphabeta: 0.0,
    };

    fn add_cluster(mut self, u: f32, v: f32, x: Vec4, w: f32) -> Sums {
        self.alphax += u * x;
        self.betax += v * x;
        self.alpha2 += u * u * w;
        self.beta2 += v * v * w;
        self.alphabeta += u * v * w;
        self
    }
}

struct Enumerator<'a, 'b> {
    input: &'a FitInput<'b>,
    k: usize,
    n: usize,
    xsum: [Vec4; 17],
    wsum: [f32; 17],
    metric2: Vec4,
    constant: f32,
    best_error: f32,
    best: Option<([u8; 4], [u8; 4])>,
}

impl Enumerator<'_, '_> {
    /// Recursively places the boundary after cluster `j`, with clusters
    /// before `from` already folded into `sums`.
    fn descend(&mut self, j: usize, from: usize, sums: Sums) {
        let spacing = 1.0 / (self.k - 1) as f32;

        if j == self.k - 1 {
            // the last cluster takes all remaining points at full end weight
            let x = self.xsum[self.n] - self.xsum[from];
            let w = self.wsum[self.n] - self.wsum[from];
            self.evaluate(sums.add_cluster(0.0, 1.0, x, w));
            return;
        }

        let v = j as f32 * spacing;
        let u = 1.0 - v;
        for to in from..=self.n {
            let next = if to == from {
                sums
            } else {
                let x = self.xsum[to] - self.xsum[from];
                let w = self.wsum[to] - self.wsum[from];
                sums.add_cluster(u, v, x, w)
            };
            self.descend(j + 1, to, next);
        }
    }

    /// Solves the 2x2 least squares for the endpoint pair, quantizes it, and
    /// keeps the candidate if its quadratic-form error improves on the best.
    fn evaluate(&mut self, sums: Sums) {
        let det = sums.alpha2 * sums.beta2 - sums.alphabeta * sums.alphabeta;
        if det.abs() < f32::EPSILON {
            // all points in one cluster; such candidates are rank deficient
            return;
        }
        let inv = 1.0 / det;

        let start = (sums.alphax * sums.beta2 - sums.betax * sums.alphabeta) * inv;
        let end = (sums.betax * sums.alpha2 - sums.alphax * sums.alphabeta) * inv;
        let start = start.clamp(Vec4::ZERO, Vec4::ONE);
        let end = end.clamp(Vec4::ZERO, Vec4::ONE);

        let q: &Quantizer = &self.input.q;
        for &(ps, pe) in q.shared().patterns() {
            let sq = q.snap(start, ps);
            let eq = q.snap(end, pe);
            let sv = q.lookup(sq);
            let ev = q.lookup(eq);

            // squared error with the quantized endpoints, from the sums
            let error = self.constant
                - 2.0 * ((sv * self.metric2).dot(sums.alphax) + (ev * self.metric2).dot(sums.betax))
                + (sv * sv).dot(self.metric2) * sums.alpha2
                + 2.0 * (sv * ev).dot(self.metric2) * sums.alphabeta
                + (ev * ev).dot(self.metric2) * sums.beta2;

            if error < self.best_error {
                self.best_error = error;
                self.best = Some((sq, eq));
            }
        }
    }
}
