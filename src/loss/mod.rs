//! Training objectives over relative measures.
//!
//! Both losses compare the particle cloud, pushed through the relative
//! measure map, against the observed relative measures on every edge, and
//! return the explicit gradient with respect to the absolute particles.
//! There is no tape: each loss knows its own reverse rule.

mod mmd;
mod sinkhorn;

pub use mmd::*;
pub use sinkhorn::*;

use crate::Energy;
use crate::Result;
use ndarray::Array3;
use ndarray::ArrayView2;
use ndarray::ArrayView3;

/// A loss evaluation: the scalar objective and its gradient with respect
/// to the absolute particle tensor `[nodes, particles, dim]`.
pub struct Objective {
    pub value: Energy,
    pub grad: Array3<f32>,
}

/// Closed dispatch over the supported objectives.
pub enum Loss {
    Sinkhorn(SinkhornLoss),
    Mmd(MmdLoss),
}

impl Loss {
    pub fn evaluate(
        &self,
        data: ArrayView3<f32>,
        weights: ArrayView2<f32>,
        target: ArrayView3<f32>,
        target_weights: ArrayView2<f32>,
    ) -> Result<Objective> {
        match self {
            Self::Sinkhorn(loss) => loss.evaluate(data, weights, target, target_weights),
            Self::Mmd(loss) => loss.evaluate(data, weights, target, target_weights),
        }
    }
}
