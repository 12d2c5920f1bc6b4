use super::coupling::Coupling;
use super::metric::Metric;
use crate::Energy;
use crate::Entropy;
use crate::Error;
use crate::Probability;
use crate::Result;
use crate::SINKHORN_FLOOR;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::Array3;
use ndarray::ArrayView2;
use ndarray::ArrayView3;
use ndarray::Axis;
use ndarray::Zip;

/// How the per-batch transport costs collapse into the returned cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Reduction {
    /// One cost per batch element.
    None,
    /// Average over the batch.
    Mean,
    /// Sum over the batch.
    #[default]
    Sum,
}

impl Reduction {
    /// Collapse per-batch costs according to the mode.
    pub fn apply(&self, costs: Array1<Energy>) -> Array1<Energy> {
        match self {
            Self::None => costs,
            Self::Mean => Array1::from(vec![costs.mean().unwrap_or(0.0)]),
            Self::Sum => Array1::from(vec![costs.sum()]),
        }
    }
}

impl TryFrom<&str> for Reduction {
    type Error = Error;
    fn try_from(name: &str) -> Result<Self> {
        match name {
            "none" => Ok(Self::None),
            "mean" => Ok(Self::Mean),
            "sum" => Ok(Self::Sum),
            other => Err(Error::UnsupportedReduction(other.to_string())),
        }
    }
}

/// Log-stabilized Sinkhorn solver for entropic optimal transport.
///
/// Given two point clouds `[batch, P, D]`, `[batch, Q, D]` with weight
/// vectors `[batch, P]`, `[batch, Q]`, alternates dual-potential updates in
/// log space until the mean L1 change of the LHS potential drops below
/// tolerance or the iteration cap is hit. Batch parallelism is expressed
/// entirely through broadcasting: there is no per-batch-element loop.
///
/// The multiplicative Sinkhorn iteration underflows the kernel `exp(-C/ε)`
/// for any ε small enough to approximate true OT; the log-domain
/// reformulation with logsumexp is what makes small temperatures viable,
/// and is the single most important correctness property here.
#[derive(Debug, Clone)]
pub struct Sinkhorn {
    metric: Metric,
    epsilon: Entropy,
    iterations: usize,
    tolerance: Energy,
    reduction: Reduction,
}

impl Sinkhorn {
    pub fn new(
        metric: Metric,
        epsilon: Entropy,
        iterations: usize,
        tolerance: Energy,
        reduction: Reduction,
    ) -> Result<Self> {
        if !(epsilon > 0.0 && epsilon.is_finite()) {
            return Err(Error::InvalidRegularization(epsilon));
        }
        Ok(Self {
            metric,
            epsilon,
            iterations,
            tolerance,
            reduction,
        })
    }

    pub fn metric(&self) -> &Metric {
        &self.metric
    }

    pub fn cap(&self) -> usize {
        self.iterations
    }

    /// Solve transport between two weighted point clouds.
    ///
    /// Computes the ground cost once per call via the active metric, then
    /// hands off to [`couple`](Self::couple). The weight vectors are treated
    /// as fixed constants for the duration of the inner loop.
    pub fn transport(
        &self,
        x: ArrayView3<f32>,
        y: ArrayView3<f32>,
        wx: ArrayView2<Probability>,
        wy: ArrayView2<Probability>,
    ) -> Result<Coupling> {
        let (n, p, d) = x.dim();
        let (m, q, e) = y.dim();
        if n != m {
            return Err(Error::BatchMismatch(n, m));
        }
        if d != e {
            return Err(Error::DimensionMismatch(d, e));
        }
        if let Some(required) = self.metric.dimension() {
            if d != required {
                return Err(Error::DimensionMismatch(required, d));
            }
        }
        if wx.dim() != (n, p) {
            return Err(Error::WeightMismatch(wx.dim().0, wx.dim().1, n, p));
        }
        if wy.dim() != (m, q) {
            return Err(Error::WeightMismatch(wy.dim().0, wy.dim().1, m, q));
        }
        self.couple(self.metric.cost(x, y), wx, wy)
    }

    /// Run the fixed-point iteration against a prebuilt ground cost.
    ///
    /// The ground batch axis may be 1 (a shared cost matrix solved against
    /// per-batch marginals) or equal to the weight batch. Dual potentials
    /// are zero-initialized per call and discarded afterwards. A non-finite
    /// ground cost is *not* sanitized: NaN/Inf propagates into the returned
    /// cost so callers can treat it as a divergence signal.
    pub fn couple(
        &self,
        ground: Array3<Energy>,
        wx: ArrayView2<Probability>,
        wy: ArrayView2<Probability>,
    ) -> Result<Coupling> {
        let (n, p) = wx.dim();
        let (m, q) = wy.dim();
        if n != m {
            return Err(Error::BatchMismatch(n, m));
        }
        let (gb, gp, gq) = ground.dim();
        if !(gb == n || gb == 1) || gp != p || gq != q {
            return Err(Error::GroundMismatch(gb, gp, gq, n, p, q));
        }
        let mut u = Array2::<f32>::zeros((n, p));
        let mut v = Array2::<f32>::zeros((n, q));
        let log_mu = wx.mapv(|w| (w + SINKHORN_FLOOR).ln());
        let log_nu = wy.mapv(|w| (w + SINKHORN_FLOOR).ln());
        let mut nits = 0;
        for _ in 0..self.iterations {
            let prev = u.clone();
            // Gauss-Seidel: the v-update sees the freshly updated u
            let mut step = &log_mu - &logsumexp(&self.kernel(&ground, &u, &v), Axis(2));
            step *= self.epsilon;
            u += &step;
            let mut step = &log_nu - &logsumexp(&self.kernel(&ground, &u, &v), Axis(1));
            step *= self.epsilon;
            v += &step;
            nits += 1;
            let err = (&u - &prev)
                .mapv(f32::abs)
                .sum_axis(Axis(1))
                .mean()
                .unwrap_or(0.0);
            if err < self.tolerance {
                break;
            }
        }
        let plan = self.kernel(&ground, &u, &v).mapv(f32::exp);
        let costs = (&plan * &ground)
            .sum_axis(Axis(2))
            .sum_axis(Axis(1));
        Ok(Coupling {
            cost: self.reduction.apply(costs),
            plan,
            ground,
            iterations: nits,
        })
    }

    /// Log-domain kernel `M[b,i,j] = (−C[b,i,j] + u_i + v_j) / ε`.
    fn kernel(&self, ground: &Array3<Energy>, u: &Array2<f32>, v: &Array2<f32>) -> Array3<f32> {
        let (n, p) = u.dim();
        let (_, q) = v.dim();
        let mut m = u
            .view()
            .insert_axis(Axis(2))
            .broadcast((n, p, q))
            .expect("potential broadcast")
            .to_owned();
        m += &v.view().insert_axis(Axis(1));
        m -= ground;
        m /= self.epsilon;
        m
    }
}

/// Numerically stable logsumexp over one axis of a batched matrix.
///
/// Classic max-shift trick per lane; a non-finite lane maximum (all -inf,
/// or an Inf/NaN cost leaking in) is propagated as-is rather than turned
/// into spurious finite output.
fn logsumexp(m: &Array3<f32>, axis: Axis) -> Array2<f32> {
    let (n, p, q) = m.dim();
    let shape = match axis {
        Axis(1) => (n, q),
        _ => (n, p),
    };
    let mut out = Array2::<f32>::zeros(shape);
    Zip::from(&mut out).and(m.lanes(axis)).for_each(|o, lane| {
        let max = lane.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
        *o = if max.is_finite() {
            max + lane.iter().map(|&t| (t - max).exp()).sum::<f32>().ln()
        } else {
            max
        };
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use ndarray::Array2;
    use ndarray::Array3;

    fn uniform(n: usize, p: usize) -> Array2<Probability> {
        Array2::from_elem((n, p), 1.0 / p as Probability)
    }

    fn solver(epsilon: Entropy, iterations: usize, tolerance: Energy) -> Sinkhorn {
        Sinkhorn::new(
            Metric::Euclidean { power: 2 },
            epsilon,
            iterations,
            tolerance,
            Reduction::None,
        )
        .expect("valid solver")
    }

    #[test]
    fn rejects_nonpositive_regularization() {
        let bad = Sinkhorn::new(
            Metric::Euclidean { power: 2 },
            0.0,
            10,
            0.1,
            Reduction::Sum,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn rejects_mismatched_batches() {
        let x = Array3::<f32>::zeros((2, 3, 1));
        let y = Array3::<f32>::zeros((1, 3, 1));
        let out = solver(0.1, 10, 0.1).transport(x.view(), y.view(), uniform(2, 3).view(), uniform(1, 3).view());
        assert!(matches!(out, Err(Error::BatchMismatch(2, 1))));
    }

    #[test]
    fn rejects_ground_costs_shaped_unlike_the_marginals() {
        let ground = Array3::<f32>::zeros((1, 3, 3));
        let err = solver(0.1, 10, 0.1)
            .couple(ground, uniform(2, 2).view(), uniform(2, 2).view())
            .unwrap_err();
        assert!(matches!(err, Error::GroundMismatch(1, 3, 3, 2, 2, 2)));
        assert!(err.to_string().contains("ground cost"));
    }

    #[test]
    fn plan_is_nonnegative_and_shaped_like_the_cost() {
        let x = array![[[0.0], [1.0], [2.0]]];
        let y = array![[[0.5], [1.5]]];
        let coupling = solver(0.1, 100, 1e-3)
            .transport(x.view(), y.view(), uniform(1, 3).view(), uniform(1, 2).view())
            .expect("solve");
        assert_eq!(coupling.plan.dim(), coupling.ground.dim());
        assert!(coupling.plan.iter().all(|&p| p >= 0.0));
    }

    #[test]
    fn converged_marginals_match_the_weights() {
        let x = array![[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]];
        let y = array![[[0.2, 0.1], [0.9, 0.4], [0.5, 0.8]]];
        let wx = array![[0.1, 0.2, 0.3, 0.4]];
        let wy = array![[0.3, 0.3, 0.4]];
        let coupling = solver(0.1, 1000, 1e-4)
            .transport(x.view(), y.view(), wx.view(), wy.view())
            .expect("solve");
        let rows = coupling.plan.sum_axis(Axis(2));
        let cols = coupling.plan.sum_axis(Axis(1));
        for (observed, expected) in rows.iter().zip(wx.iter()) {
            assert!((observed - expected).abs() < 1e-2);
        }
        for (observed, expected) in cols.iter().zip(wy.iter()) {
            assert!((observed - expected).abs() < 1e-2);
        }
    }

    #[test]
    fn identical_clouds_cost_almost_nothing() {
        let x = array![[[0.0], [1.0], [2.0]]];
        let coupling = solver(0.05, 100, 0.1)
            .transport(x.view(), x.view(), uniform(1, 3).view(), uniform(1, 3).view())
            .expect("solve");
        assert!(coupling.total() < 0.1);
    }

    #[test]
    fn one_dimensional_grid_yields_a_diagonal_plan() {
        // X = Y = [0, 1, 2], ε = 0.05: mass concentrates where i == j
        let x = array![[[0.0], [1.0], [2.0]]];
        let coupling = solver(0.05, 100, 0.1)
            .transport(x.view(), x.view(), uniform(1, 3).view(), uniform(1, 3).view())
            .expect("solve");
        for i in 0..3 {
            for j in 0..3 {
                if i != j {
                    assert!(coupling.plan[[0, i, i]] > coupling.plan[[0, i, j]]);
                }
            }
        }
    }

    #[test]
    fn iteration_count_is_capped_and_exposed() {
        let x = array![[[0.0], [10.0]]];
        let y = array![[[5.0], [6.0]]];
        let tight = solver(0.01, 7, 0.0);
        let coupling = tight
            .transport(x.view(), y.view(), uniform(1, 2).view(), uniform(1, 2).view())
            .expect("solve");
        assert_eq!(coupling.iterations, 7);
        assert!(!coupling.converged(tight.cap()));
    }

    #[test]
    fn reduction_modes_agree_on_known_batch_costs() {
        let x = array![[[0.0], [1.0]], [[0.0], [2.0]], [[0.0], [3.0]]];
        let y = array![[[0.5], [0.5]], [[1.0], [1.0]], [[1.5], [1.5]]];
        let wx = uniform(3, 2);
        let wy = uniform(3, 2);
        let per_batch = solver(0.1, 200, 1e-3)
            .transport(x.view(), y.view(), wx.view(), wy.view())
            .expect("solve")
            .cost;
        let summed = Sinkhorn::new(Metric::Euclidean { power: 2 }, 0.1, 200, 1e-3, Reduction::Sum)
            .expect("solver")
            .transport(x.view(), y.view(), wx.view(), wy.view())
            .expect("solve")
            .cost;
        let averaged = Sinkhorn::new(Metric::Euclidean { power: 2 }, 0.1, 200, 1e-3, Reduction::Mean)
            .expect("solver")
            .transport(x.view(), y.view(), wx.view(), wy.view())
            .expect("solve")
            .cost;
        assert_eq!(per_batch.len(), 3);
        assert!((summed[0] - per_batch.sum()).abs() < 1e-5);
        assert!((averaged[0] - per_batch.sum() / 3.0).abs() < 1e-5);
    }

    #[test]
    fn infinite_ground_costs_are_not_sanitized() {
        let mut ground = Array3::<f32>::zeros((1, 2, 2));
        ground[[0, 0, 0]] = f32::INFINITY;
        let coupling = solver(0.1, 50, 1e-3)
            .couple(ground, uniform(1, 2).view(), uniform(1, 2).view())
            .expect("solve");
        assert!(!coupling.total().is_finite());
    }

    #[test]
    fn shared_ground_cost_broadcasts_across_the_batch() {
        let ground = array![[[0.0, 1.0], [1.0, 0.0]]];
        let wx = uniform(3, 2);
        let wy = uniform(3, 2);
        let coupling = solver(0.1, 200, 1e-3)
            .couple(ground, wx.view(), wy.view())
            .expect("solve");
        assert_eq!(coupling.plan.dim(), (3, 2, 2));
        assert_eq!(coupling.cost.len(), 3);
    }

    #[test]
    fn quaternion_transport_of_identical_clouds_is_free() {
        let q = array![[
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.70710677, 0.70710677, 0.0, 0.0]
        ]];
        let coupling = Sinkhorn::new(
            Metric::Quaternion { squared: false },
            0.05,
            100,
            1e-3,
            Reduction::Sum,
        )
        .expect("solver")
        .transport(q.view(), q.view(), uniform(1, 3).view(), uniform(1, 3).view())
        .expect("solve");
        assert!(coupling.total() < 0.25);
    }
}
