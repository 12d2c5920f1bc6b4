//! Batched unit-quaternion algebra on ndarray tensors.
//!
//! Quaternions are stored as rows `[w, x, y, z]` along the last axis of a
//! point-set tensor `[batch, points, 4]`. All operations respect the double
//! cover: `q` and `-q` encode the same rotation, so the geodesic angle is
//! taken through `|<p, q>|`.

use crate::Energy;
use crate::GEODESIC_GUARD;
use ndarray::Array1;
use ndarray::Array3;
use ndarray::ArrayView1;
use ndarray::ArrayView3;
use ndarray::ArrayViewMut3;
use ndarray::Axis;

/// Hamilton product `a ⊗ b`.
pub fn hamilton(a: ArrayView1<f32>, b: ArrayView1<f32>) -> Array1<f32> {
    let (aw, ax, ay, az) = (a[0], a[1], a[2], a[3]);
    let (bw, bx, by, bz) = (b[0], b[1], b[2], b[3]);
    Array1::from(vec![
        aw * bw - ax * bx - ay * by - az * bz,
        aw * bx + ax * bw + ay * bz - az * by,
        aw * by - ax * bz + ay * bw + az * bx,
        aw * bz + ax * by - ay * bx + az * bw,
    ])
}

/// Conjugate `q* = [w, -x, -y, -z]`. Equals the inverse for unit quaternions.
pub fn conjugate(q: ArrayView1<f32>) -> Array1<f32> {
    Array1::from(vec![q[0], -q[1], -q[2], -q[3]])
}

/// Relative rotation `a ⊗ b⁻¹` between two unit quaternions.
pub fn relative(a: ArrayView1<f32>, b: ArrayView1<f32>) -> Array1<f32> {
    hamilton(a, conjugate(b).view())
}

/// Geodesic angle from a (possibly overshooting) inner product.
///
/// Floating-point rounding pushes |<p, q>| past 1, which would turn arccos
/// into NaN; the clamp is what makes the squared-angle cost stable. The
/// absolute value folds the double cover so antipodal quaternions are at
/// distance zero.
pub fn stable_angle(dot: f32) -> Energy {
    2.0 * dot.abs().clamp(0.0, 1.0).acos()
}

/// Derivative weight dθ/ds of [`stable_angle`] at inner product `s`.
///
/// Vanishes inside the guard band around |s| = 1 where the true derivative
/// is unbounded; identical and antipodal pairs therefore contribute zero
/// gradient instead of Inf.
pub fn stable_angle_slope(dot: f32) -> Energy {
    let clamped = dot.abs().clamp(0.0, 1.0);
    let radicand = 1.0 - clamped * clamped;
    if radicand < GEODESIC_GUARD {
        0.0
    } else {
        -2.0 * dot.signum() / radicand.sqrt()
    }
}

/// Pairwise inner products `<x_i, y_j>` with shape `[batch, P, Q]`.
///
/// Built by unsqueeze-broadcast over the two point axes rather than nested
/// loops, so the work is a single elementwise pass over `batch·P·Q·D`.
pub fn inner(x: ArrayView3<f32>, y: ArrayView3<f32>) -> Array3<f32> {
    let (n, p, d) = x.dim();
    let (_, q, _) = y.dim();
    let lhs = x.insert_axis(Axis(2));
    let rhs = y.insert_axis(Axis(1));
    let lhs = lhs.broadcast((n, p, q, d)).expect("lhs broadcast");
    let rhs = rhs.broadcast((n, p, q, d)).expect("rhs broadcast");
    (&lhs * &rhs).sum_axis(Axis(3))
}

/// Pairwise geodesic angles `θ[b, i, j]` between two quaternion clouds.
pub fn pairwise_angle(x: ArrayView3<f32>, y: ArrayView3<f32>) -> Array3<Energy> {
    inner(x, y).mapv(stable_angle)
}

/// Renormalize every quaternion row onto S³ in place.
///
/// Degenerate all-zero rows are reset to the identity rotation rather than
/// divided by zero.
pub fn renormalize(mut cloud: ArrayViewMut3<f32>) {
    for mut row in cloud.rows_mut() {
        let norm = row.iter().map(|c| c * c).sum::<f32>().sqrt();
        if norm > 0.0 {
            row.mapv_inplace(|c| c / norm);
        } else {
            row[0] = 1.0;
        }
    }
}

/// Project an ambient gradient onto the tangent space of S³ at `q`.
///
/// `g_t = g - <g, q> q`, the Riemannian gradient for the embedded sphere.
pub fn tangent(q: ArrayView1<f32>, g: ArrayView1<f32>) -> Array1<f32> {
    let radial: f32 = q.iter().zip(g.iter()).map(|(a, b)| a * b).sum();
    let mut out = g.to_owned();
    out.iter_mut()
        .zip(q.iter())
        .for_each(|(o, &c)| *o -= radial * c);
    out
}
