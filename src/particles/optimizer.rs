use super::cloud::Particles;
use crate::geometry::quaternion;
use crate::geometry::Manifold;
use crate::Energy;
use crate::Error;
use crate::Result;
use ndarray::Array3;

/// First-order particle optimizer.
///
/// Euclidean particles take plain gradient steps. Quaternion particles take
/// Riemannian steps: the ambient gradient is projected onto the tangent
/// space of S³ at each particle before the update, and the cloud is
/// retracted back onto the sphere afterwards.
#[derive(Debug, Clone, Copy)]
pub enum Optimizer {
    Sgd { rate: Energy },
    QuaternionSgd { rate: Energy },
}

impl Optimizer {
    /// Resolve an optimizer name against the particle manifold.
    pub fn parse(name: &str, manifold: Manifold, rate: Energy) -> Result<Self> {
        match (name, manifold) {
            ("sgd", Manifold::Euclidean) => Ok(Self::Sgd { rate }),
            ("sgd", Manifold::Quaternion) => Ok(Self::QuaternionSgd { rate }),
            (other, _) => Err(Error::UnsupportedOptimizer(other.to_string())),
        }
    }

    /// Descend one step along the given ambient gradient.
    pub fn step(&self, particles: &mut Particles, grad: &Array3<f32>) {
        match self {
            Self::Sgd { rate } => {
                let mut data = particles.data_mut();
                data.zip_mut_with(grad, |p, g| *p -= rate * g);
            }
            Self::QuaternionSgd { rate } => {
                {
                    let mut data = particles.data_mut();
                    for (mut row, g) in data.rows_mut().into_iter().zip(grad.rows()) {
                        let step = quaternion::tangent(row.view(), g);
                        row.iter_mut()
                            .zip(step.iter())
                            .for_each(|(p, s)| *p -= rate * s);
                    }
                }
                particles.retract();
            }
        }
    }
}
