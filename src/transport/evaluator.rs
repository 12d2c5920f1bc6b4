use super::metric::Metric;
use super::sinkhorn::Reduction;
use super::sinkhorn::Sinkhorn;
use crate::geometry::Manifold;
use crate::Energy;
use crate::Entropy;
use crate::Probability;
use crate::Result;
use ndarray::ArrayView2;
use ndarray::ArrayView3;
use ndarray::Axis;

/// Gradient-free Sinkhorn distance probe.
///
/// A separate named instantiation of the solver used purely to report a
/// distance between the current configuration and ground truth; its budget
/// (ε, iteration cap) is configured independently of the training-time
/// solver and its output is consumed only as a scalar readout.
///
/// For quaternion clouds the per-node ground costs are summed into a single
/// shared matrix before solving, treating the batch of poses as a product
/// measure coupled by one joint plan; Euclidean clouds are solved per batch
/// element.
#[derive(Debug, Clone)]
pub struct Evaluator {
    solver: Sinkhorn,
    joint: bool,
}

impl Evaluator {
    pub fn new(manifold: Manifold, epsilon: Entropy, iterations: usize) -> Result<Self> {
        let metric = match manifold {
            Manifold::Euclidean => Metric::Euclidean { power: 2 },
            Manifold::Quaternion => Metric::Quaternion { squared: false },
        };
        let solver = Sinkhorn::new(
            metric,
            epsilon,
            iterations,
            crate::SINKHORN_TOLERANCE,
            Reduction::Sum,
        )?;
        Ok(Self {
            solver,
            joint: manifold == Manifold::Quaternion,
        })
    }

    /// Sinkhorn distance between two weighted point clouds.
    pub fn distance(
        &self,
        x: ArrayView3<f32>,
        y: ArrayView3<f32>,
        wx: ArrayView2<Probability>,
        wy: ArrayView2<Probability>,
    ) -> Result<Energy> {
        if self.joint {
            let shared = self
                .solver
                .metric()
                .cost(x, y)
                .sum_axis(Axis(0))
                .insert_axis(Axis(0));
            Ok(self.solver.couple(shared, wx, wy)?.total())
        } else {
            Ok(self.solver.transport(x, y, wx, wy)?.total())
        }
    }
}
