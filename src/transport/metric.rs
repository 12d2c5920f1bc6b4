use crate::geometry::quaternion;
use crate::Energy;
use crate::Error;
use crate::Probability;
use crate::Result;
use ndarray::Array3;
use ndarray::Array4;
use ndarray::ArrayView3;
use ndarray::Axis;
use ndarray::Zip;

/// Ground metric between elements of two point clouds.
///
/// Defines the cost of transporting one unit of mass from a point in the
/// source cloud to a point in the target cloud. Represented as a closed
/// enum so that configuration strings are matched exactly once at load
/// time; the solve itself never branches on names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Coordinate-wise power cost `C[i,j] = Σ_d |x_d − y_d|^p`.
    Euclidean {
        /// Exponent p; 2 recovers squared Euclidean distance.
        power: i32,
    },
    /// Geodesic angle between unit quaternions, optionally squared.
    /// Respects the double cover: `cost(q, -q) = 0`.
    Quaternion {
        /// Use the squared angle instead of the plain angle.
        squared: bool,
    },
}

impl Metric {
    /// Pairwise cost matrix `C[b, i, j]` of shape `[batch, P, Q]`.
    ///
    /// Built by unsqueeze-broadcast elementwise differences over the two
    /// point axes, so the work scales as `batch·P·Q·D` with no nested
    /// point loops.
    pub fn cost(&self, x: ArrayView3<f32>, y: ArrayView3<f32>) -> Array3<Energy> {
        match self {
            Self::Euclidean { power } => displacement(x, y)
                .mapv(|t| t.abs().powi(*power))
                .sum_axis(Axis(3)),
            Self::Quaternion { squared: false } => quaternion::pairwise_angle(x, y),
            Self::Quaternion { squared: true } => {
                quaternion::pairwise_angle(x, y).mapv(|t| t * t)
            }
        }
    }

    /// Gradient of the plan-weighted cost `Σ_{i,j} π[i,j]·C(x_i, y_j)` with
    /// respect to the *target* cloud `y`, with the plan held fixed.
    ///
    /// This is the envelope-theorem reverse rule for entropic OT at a fixed
    /// number of iterations: only the converged plan carries gradient to the
    /// particle coordinates, matching the theory where the ground cost is a
    /// constant at each outer step.
    pub fn pullback(
        &self,
        x: ArrayView3<f32>,
        y: ArrayView3<f32>,
        plan: &Array3<Probability>,
    ) -> Array3<f32> {
        let (_, _, d) = y.dim();
        let (n, _, q) = plan.dim();
        let mut grad = Array3::<f32>::zeros((n, q, d));
        match self {
            Self::Euclidean { power } => {
                // ∂C/∂y_d = −p·|δ|^{p−1}·sign(δ), δ = x − y
                let slope = displacement(x, y)
                    .mapv(|t| -(*power as f32) * t.abs().powi(power - 1) * t.signum());
                for dim in 0..d {
                    let per_pair = &slope.index_axis(Axis(3), dim) * plan;
                    grad.index_axis_mut(Axis(2), dim)
                        .assign(&per_pair.sum_axis(Axis(1)));
                }
            }
            Self::Quaternion { squared } => {
                // ∂θ/∂y = (dθ/ds)·x at s = <x, y>, guarded at |s| = 1
                let dots = quaternion::inner(x, y);
                let mut coeff = dots.mapv(quaternion::stable_angle_slope);
                if *squared {
                    coeff *= &(dots.mapv(quaternion::stable_angle) * 2.0);
                }
                let weighted = &coeff * plan;
                for dim in 0..d {
                    let lhs = x.index_axis(Axis(2), dim);
                    let per_pair = &weighted * &lhs.insert_axis(Axis(2));
                    grad.index_axis_mut(Axis(2), dim)
                        .assign(&per_pair.sum_axis(Axis(1)));
                }
            }
        }
        grad
    }

    /// Coordinate dimension this metric requires, if it is fixed.
    pub fn dimension(&self) -> Option<usize> {
        match self {
            Self::Euclidean { .. } => None,
            Self::Quaternion { .. } => Some(4),
        }
    }
}

impl TryFrom<&str> for Metric {
    type Error = Error;
    fn try_from(name: &str) -> Result<Self> {
        match name {
            "euclidian" | "euclidean" => Ok(Self::Euclidean { power: 2 }),
            "quaternion" => Ok(Self::Quaternion { squared: false }),
            other => Err(Error::UnsupportedKernel(other.to_string())),
        }
    }
}

/// Elementwise differences `x_i − y_j` with shape `[batch, P, Q, D]`.
fn displacement(x: ArrayView3<f32>, y: ArrayView3<f32>) -> Array4<f32> {
    let (n, p, d) = x.dim();
    let (_, q, _) = y.dim();
    let lhs = x.insert_axis(Axis(2));
    let rhs = y.insert_axis(Axis(1));
    let lhs = lhs.broadcast((n, p, q, d)).expect("lhs broadcast");
    let rhs = rhs.broadcast((n, p, q, d)).expect("rhs broadcast");
    let mut out = Array4::<f32>::zeros((n, p, q, d));
    Zip::from(&mut out)
        .and(&lhs)
        .and(&rhs)
        .for_each(|o, &a, &b| *o = a - b);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn squared_euclidean_of_unit_offset_is_one() {
        let x = array![[[0.0, 0.0, 0.0]]];
        let y = array![[[0.0, 1.0, 0.0]]];
        let c = Metric::Euclidean { power: 2 }.cost(x.view(), y.view());
        assert_eq!(c[[0, 0, 0]], 1.0);
    }

    #[test]
    fn identical_quaternions_cost_nothing() {
        let q = array![[[0.5, 0.5, 0.5, 0.5]]];
        let c = Metric::Quaternion { squared: false }.cost(q.view(), q.view());
        assert!(c[[0, 0, 0]].abs() < 1e-3);
    }

    #[test]
    fn antipodal_quaternions_cost_nothing() {
        let q = array![[[0.5, 0.5, 0.5, 0.5]]];
        let negated = array![[[-0.5, -0.5, -0.5, -0.5]]];
        let c = Metric::Quaternion { squared: true }.cost(q.view(), negated.view());
        assert!(c[[0, 0, 0]].is_finite());
        assert!(c[[0, 0, 0]].abs() < 1e-3);
    }

    #[test]
    fn euclidean_cost_broadcasts_over_batches() {
        let x = array![[[0.0], [1.0]], [[2.0], [3.0]]];
        let y = array![[[0.0], [1.0]], [[2.0], [3.0]]];
        let c = Metric::Euclidean { power: 2 }.cost(x.view(), y.view());
        assert_eq!(c.dim(), (2, 2, 2));
        assert_eq!(c[[0, 0, 1]], 1.0);
        assert_eq!(c[[1, 1, 0]], 1.0);
        assert_eq!(c[[1, 1, 1]], 0.0);
    }

    #[test]
    fn pullback_points_towards_the_source() {
        // a unit plan between two 1-D points moves y toward x under -grad
        let x = array![[[1.0]]];
        let y = array![[[0.0]]];
        let plan = array![[[1.0]]];
        let grad = Metric::Euclidean { power: 2 }.pullback(x.view(), y.view(), &plan);
        assert_eq!(grad[[0, 0, 0]], -2.0);
    }

    #[test]
    fn quaternion_pullback_is_finite_at_coincidence() {
        let q = array![[[1.0, 0.0, 0.0, 0.0]]];
        let plan = array![[[1.0]]];
        let grad = Metric::Quaternion { squared: true }.pullback(q.view(), q.view(), &plan);
        assert!(grad.iter().all(|g| g.is_finite()));
    }

    #[test]
    fn unknown_metric_names_fail_fast() {
        let err = Metric::try_from("chebyshev").unwrap_err();
        assert!(err.to_string().contains("chebyshev"));
    }
}
