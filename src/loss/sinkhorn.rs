use super::Objective;
use crate::measure::RelativeMeasure;
use crate::transport::Metric;
use crate::transport::Reduction;
use crate::transport::Sinkhorn;
use crate::Energy;
use crate::Entropy;
use crate::Error;
use crate::Result;
use ndarray::ArrayView2;
use ndarray::ArrayView3;

/// Entropic-OT objective between mapped and observed relative measures.
///
/// Each graph edge is one batch element of the solver: the observed
/// relative measure is the source marginal, the mapped particle cloud the
/// target. The gradient follows the envelope rule, treating the converged
/// plan as a constant and differentiating only the ground cost, then pulls
/// the edge gradients back through the relative measure map.
pub struct SinkhornLoss {
    solver: Sinkhorn,
    map: RelativeMeasure,
}

impl SinkhornLoss {
    pub fn new(
        kernel: &str,
        map: RelativeMeasure,
        epsilon: Entropy,
        iterations: usize,
        tolerance: Energy,
        reduction: Reduction,
    ) -> Result<Self> {
        let metric = match kernel {
            "gaussian" => Metric::Euclidean { power: 2 },
            "laplacequaternion" => Metric::Quaternion { squared: false },
            "gaussianquaternion" => Metric::Quaternion { squared: true },
            other => return Err(Error::UnsupportedKernel(other.to_string())),
        };
        let solver = Sinkhorn::new(metric, epsilon, iterations, tolerance, reduction)?;
        Ok(Self { solver, map })
    }

    pub fn evaluate(
        &self,
        data: ArrayView3<f32>,
        weights: ArrayView2<f32>,
        target: ArrayView3<f32>,
        target_weights: ArrayView2<f32>,
    ) -> Result<Objective> {
        let (mapped, mass) = self.map.map(data, weights);
        let coupling = self.solver.transport(
            target,
            mapped.view(),
            target_weights,
            mass.view(),
        )?;
        let value = coupling.total();
        let pulled = self
            .solver
            .metric()
            .pullback(target, mapped.view(), &coupling.plan);
        let grad = self.map.pullback(data, &pulled);
        Ok(Objective { value, grad })
    }
}
