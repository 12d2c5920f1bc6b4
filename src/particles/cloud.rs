use super::prior::Prior;
use crate::geometry::quaternion;
use crate::geometry::Manifold;
use crate::Energy;
use crate::Probability;
use ndarray::Array2;
use ndarray::Array3;
use ndarray::ArrayView2;
use ndarray::ArrayView3;
use ndarray::ArrayViewMut3;
use rand::rngs::SmallRng;
use rand::Rng;

/// The optimized particle state: one weighted cloud per node.
///
/// `data` has shape `[nodes, particles, dim]`; weight rows are normalized to
/// sum to 1 and stay fixed through the inner solver loop. The optional
/// annealed noise level is consumed by sampling-based losses and decays on
/// a schedule driven by the trainer.
#[derive(Debug, Clone)]
pub struct Particles {
    manifold: Manifold,
    data: Array3<f32>,
    weights: Array2<Probability>,
    noise: Energy,
    decay: Energy,
}

impl Particles {
    /// Sample a fresh cloud from the prior with uniform weights.
    pub fn sample(
        prior: &Prior,
        manifold: Manifold,
        rng: &mut SmallRng,
        nodes: usize,
        particles: usize,
        dim: usize,
        noise: Energy,
        decay: Energy,
    ) -> Self {
        let data = prior.sample(rng, nodes, particles, dim);
        let weights = Array2::from_elem((nodes, particles), 1.0 / particles as Probability);
        Self {
            manifold,
            data,
            weights,
            noise,
            decay,
        }
    }

    pub fn manifold(&self) -> Manifold {
        self.manifold
    }

    pub fn data(&self) -> ArrayView3<f32> {
        self.data.view()
    }

    pub fn data_mut(&mut self) -> ArrayViewMut3<f32> {
        self.data.view_mut()
    }

    /// Normalized per-node particle weights.
    pub fn weights(&self) -> ArrayView2<Probability> {
        self.weights.view()
    }

    pub fn nodes(&self) -> usize {
        self.data.dim().0
    }

    pub fn count(&self) -> usize {
        self.data.dim().1
    }

    pub fn noise(&self) -> Energy {
        self.noise
    }

    /// Anneal the sampling noise level by one decay step.
    pub fn update_noise_level(&mut self) {
        self.noise *= self.decay;
    }

    /// Pin the first node to the identity pose, removing the global gauge
    /// freedom of the synchronization problem.
    pub fn gauge_fix(&mut self) {
        let mut first = self.data.index_axis_mut(ndarray::Axis(0), 0);
        match self.manifold {
            Manifold::Euclidean => first.fill(0.0),
            Manifold::Quaternion => {
                first.fill(0.0);
                first.index_axis_mut(ndarray::Axis(1), 0).fill(1.0);
            }
        }
    }

    /// A copy of the cloud jittered by the current annealing noise.
    ///
    /// Losses evaluate on the jittered copy, which smooths the objective
    /// early in training; the decay schedule removes the smoothing as the
    /// particles settle. At zero noise this is a plain copy.
    pub fn perturbed(&self, rng: &mut SmallRng) -> Array3<f32> {
        let mut jittered = self.data.clone();
        if self.noise > 0.0 {
            let scale = self.noise;
            jittered.mapv_inplace(|c| {
                c + scale * rng.sample::<f32, _>(rand_distr::StandardNormal)
            });
            if self.manifold == Manifold::Quaternion {
                quaternion::renormalize(jittered.view_mut());
            }
        }
        jittered
    }

    /// Restore manifold invariants after an ambient-space update.
    pub fn retract(&mut self) {
        if self.manifold == Manifold::Quaternion {
            quaternion::renormalize(self.data.view_mut());
        }
    }
}
