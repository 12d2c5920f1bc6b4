use crate::Energy;
use crate::Probability;
use ndarray::Array1;
use ndarray::Array3;

/// A solved transport plan between two weighted point clouds.
///
/// In optimal transport theory, a coupling is a joint distribution π(x, y)
/// whose marginals match the source and target weights. All three numeric
/// outputs are exposed because callers use the plan and the ground cost for
/// diagnostics beyond the scalar loss.
#[derive(Debug, Clone)]
pub struct Coupling {
    /// Reduced transport cost: one entry per batch element under
    /// [`Reduction::None`](super::Reduction::None), a single entry otherwise.
    pub cost: Array1<Energy>,
    /// Transport plan π with shape `[batch, P, Q]`; entries are nonnegative
    /// and, at convergence, rows sum to the source weights and columns to
    /// the target weights.
    pub plan: Array3<Probability>,
    /// Ground cost matrix the plan was solved against. Its batch axis is
    /// either the full batch or 1 when a shared ground cost was supplied.
    pub ground: Array3<Energy>,
    /// Number of Sinkhorn iterations actually performed. Equal to the
    /// iteration cap when the solve stopped without meeting tolerance.
    pub iterations: usize,
}

impl Coupling {
    /// Total scalar cost across the (reduced) batch.
    pub fn total(&self) -> Energy {
        self.cost.sum()
    }

    /// Whether the dual potentials met tolerance before the iteration cap.
    /// Non-convergence is soft: the coupling still holds the best estimate.
    pub fn converged(&self, cap: usize) -> bool {
        self.iterations < cap
    }
}
