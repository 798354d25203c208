//! Weighted covariance and the closed-form symmetric 3x3 eigensolver that
//! produces the principal axis for the fitters.

use glam::{Vec3A, Vec4};

/// Upper triangle of a symmetric 3x3 matrix, stored as
/// `[xx, xy, xz, yy, yz, zz]`.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Sym3x3(pub [f32; 6]);

impl std::ops::Index<usize> for Sym3x3 {
    type Output = f32;
    fn index(&self, index: usize) -> &f32 {
        &self.0[index]
    }
}

/// Computes the weighted covariance of a point set around its weighted
/// centroid.
///
/// The covariance is accumulated over the first three components only; the
/// principal axis of a 4-component set has a zero fourth component and the
/// fitters account for the alpha channel through the metric and the codebook
/// error instead.
pub(crate) fn weighted_covariance4(points: &[Vec4], weights: &[f32]) -> Sym3x3 {
    debug_assert_eq!(points.len(), weights.len());
    debug_assert!(!points.is_empty());

    let mut total = 0.0_f32;
    let mut centroid = Vec4::ZERO;
    for (&p, &w) in points.iter().zip(weights) {
        total += w;
        centroid += w * p;
    }
    centroid /= total;

    let mut cov = [0.0_f32; 6];
    for (&p, &w) in points.iter().zip(weights) {
        let a = p - centroid;
        let b = w * a;

        cov[0] += a.x * b.x;
        cov[1] += a.x * b.y;
        cov[2] += a.x * b.z;
        cov[3] += a.y * b.y;
        cov[4] += a.y * b.z;
        cov[5] += a.z * b.z;
    }

    Sym3x3(cov)
}

/// Returns the (unnormalized) eigenvector of the largest-magnitude eigenvalue.
///
/// The symmetric 3x3 eigenproblem is solved in closed form through the
/// characteristic cubic. The discriminant decides between the triple-root
/// (near-identity), three-distinct-roots and double-root cases; the eigenvalue
/// of largest absolute value is selected in each.
pub(crate) fn principal_component(m: Sym3x3) -> Vec3A {
    // characteristic cubic coefficients
    let c0 = m[0] * m[3] * m[5] + 2.0 * m[1] * m[2] * m[4]
        - m[0] * m[4] * m[4]
        - m[3] * m[2] * m[2]
        - m[5] * m[1] * m[1];
    let c1 = m[0] * m[3] + m[0] * m[5] + m[3] * m[5]
        - m[1] * m[1]
        - m[2] * m[2]
        - m[4] * m[4];
    let c2 = m[0] + m[3] + m[5];

    // depressed cubic
    let a = c1 - (1.0 / 3.0) * c2 * c2;
    let b = (-2.0 / 27.0) * c2 * c2 * c2 + (1.0 / 3.0) * c1 * c2 - c0;

    // root-count discriminant
    let q = 0.25 * b * b + (1.0 / 27.0) * a * a * a;

    if q > f32::EPSILON {
        // one root: a multiple of the identity
        Vec3A::ONE
    } else if q < -f32::EPSILON {
        // three distinct roots
        let theta = f32::atan2((-q).sqrt(), -0.5 * b);
        let rho = (0.25 * b * b - q).sqrt();

        let rt = rho.cbrt();
        let ct = (theta / 3.0).cos();
        let st = (theta / 3.0).sin();

        let mut l1 = (1.0 / 3.0) * c2 + 2.0 * rt * ct;
        let l2 = (1.0 / 3.0) * c2 - rt * (ct + 3.0_f32.sqrt() * st);
        let l3 = (1.0 / 3.0) * c2 - rt * (ct - 3.0_f32.sqrt() * st);

        // pick the largest magnitude
        if l2.abs() > l1.abs() {
            l1 = l2;
        }
        if l3.abs() > l1.abs() {
            l1 = l3;
        }

        multiplicity1_evector(m, l1)
    } else {
        // two roots, one repeated
        let rt = if b < 0.0 {
            -(-0.5 * b).cbrt()
        } else {
            (0.5 * b).cbrt()
        };

        let l1 = (1.0 / 3.0) * c2 + rt; // repeated
        let l2 = (1.0 / 3.0) * c2 - 2.0 * rt;

        if l1.abs() > l2.abs() {
            multiplicity2_evector(m, l1)
        } else {
            multiplicity1_evector(m, l2)
        }
    }
}

/// Eigenvector for an eigenvalue of multiplicity 1: the adjugate of
/// `M = m - evalue*I` has rank 1 and its columns span the eigenspace; the
/// column holding the largest-magnitude element is the stable pick.
fn multiplicity1_evector(m: Sym3x3, evalue: f32) -> Vec3A {
    let m = Sym3x3([
        m[0] - evalue,
        m[1],
        m[2],
        m[3] - evalue,
        m[4],
        m[5] - evalue,
    ]);

    let u = Sym3x3([
        m[3] * m[5] - m[4] * m[4],
        m[2] * m[4] - m[1] * m[5],
        m[1] * m[4] - m[2] * m[3],
        m[0] * m[5] - m[2] * m[2],
        m[1] * m[2] - m[4] * m[0],
        m[0] * m[3] - m[1] * m[1],
    ]);

    let mut mc = u[0].abs();
    let mut mi = 0;
    for i in 1..6 {
        let c = u[i].abs();
        if c > mc {
            mc = c;
            mi = i;
        }
    }

    match mi {
        0 => Vec3A::new(u[0], u[1], u[2]),
        1 | 3 => Vec3A::new(u[1], u[3], u[4]),
        _ => Vec3A::new(u[2], u[4], u[5]),
    }
}

/// Eigenvector for the repeated eigenvalue: `M = m - evalue*I` has rank 1,
/// so any non-degenerate row yields a vector orthogonal to the distinct
/// eigenspace. The row is picked by its largest-magnitude element with a
/// fixed tie-break order.
fn multiplicity2_evector(m: Sym3x3, evalue: f32) -> Vec3A {
    let m = Sym3x3([
        m[0] - evalue,
        m[1],
        m[2],
        m[3] - evalue,
        m[4],
        m[5] - evalue,
    ]);

    let mut mc = m[0].abs();
    let mut mi = 0;
    for i in 1..6 {
        let c = m[i].abs();
        if c > mc {
            mc = c;
            mi = i;
        }
    }

    match mi {
        0 | 1 => Vec3A::new(-m[1], m[0], 0.0),
        2 => Vec3A::new(m[2], 0.0, -m[0]),
        3 | 4 => Vec3A::new(0.0, -m[4], m[3]),
        _ => Vec3A::new(0.0, -m[5], m[4]),
    }
}
