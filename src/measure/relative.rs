use crate::geometry::quaternion;
use crate::geometry::Manifold;
use crate::Energy;
use crate::Probability;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::Array3;
use ndarray::ArrayView1;
use ndarray::ArrayView2;
use ndarray::ArrayView3;
use rand::rngs::SmallRng;
use rand::Rng;
use rand_distr::StandardNormal;

/// Observation corruption applied to the ground-truth relative measures.
#[derive(Debug, Clone, Copy, Default)]
pub struct Corruption {
    /// Scale of tangent-space Gaussian noise composed onto each measure.
    pub noise: Energy,
    /// Probability of replacing a measure with a uniformly random outlier.
    pub flips: Probability,
}

/// The map from absolute particle clouds to relative measures along edges.
///
/// For an edge (i, j), each relative particle is `q_i ⊗ q_j⁻¹` on the
/// quaternion manifold or `x_i − x_j` in flat space. In the `joint` variant
/// particles are paired index-wise (M relative particles per edge); in the
/// `product` variant every pair is formed (M² relative particles per edge)
/// with product weights. The map is pure: it reads the particle state and
/// never mutates it.
#[derive(Debug, Clone)]
pub struct RelativeMeasure {
    edges: Vec<(usize, usize)>,
    manifold: Manifold,
    product: bool,
}

impl RelativeMeasure {
    pub fn new(edges: Vec<(usize, usize)>, manifold: Manifold, product: bool) -> Self {
        Self {
            edges,
            manifold,
            product,
        }
    }

    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    /// Relative particles per edge for a cloud of M absolute particles.
    pub fn arity(&self, particles: usize) -> usize {
        if self.product {
            particles * particles
        } else {
            particles
        }
    }

    /// Push a particle cloud through the map.
    ///
    /// Returns relative particles `[edges, arity, dim]` and normalized
    /// relative weights `[edges, arity]`.
    pub fn map(
        &self,
        data: ArrayView3<f32>,
        weights: ArrayView2<Probability>,
    ) -> (Array3<f32>, Array2<Probability>) {
        let (_, m, d) = data.dim();
        let arity = self.arity(m);
        let mut mapped = Array3::<f32>::zeros((self.edges.len(), arity, d));
        let mut mass = Array2::<Probability>::zeros((self.edges.len(), arity));
        for (e, &(i, j)) in self.edges.iter().enumerate() {
            for (k, (a, b)) in self.pairs(m).enumerate() {
                let lhs = data.slice(ndarray::s![i, a, ..]);
                let rhs = data.slice(ndarray::s![j, b, ..]);
                mapped
                    .slice_mut(ndarray::s![e, k, ..])
                    .assign(&self.displace(lhs, rhs));
                mass[[e, k]] = weights[[i, a]] * weights[[j, b]];
            }
            let total = mass.row(e).sum();
            if total > 0.0 {
                mass.row_mut(e).mapv_inplace(|w| w / total);
            }
        }
        (mapped, mass)
    }

    /// Push ground-truth particles through the map with observation noise.
    pub fn corrupted(
        &self,
        data: ArrayView3<f32>,
        weights: ArrayView2<Probability>,
        corruption: Corruption,
        rng: &mut SmallRng,
    ) -> (Array3<f32>, Array2<Probability>) {
        let (mut mapped, mass) = self.map(data, weights);
        for mut row in mapped.rows_mut() {
            if corruption.flips > 0.0 && rng.random::<f32>() < corruption.flips {
                self.outlier(row.view_mut(), rng);
            } else if corruption.noise > 0.0 {
                self.jitter(row.view_mut(), corruption.noise, rng);
            }
        }
        (mapped, mass)
    }

    /// Adjoint of the map: carry a gradient on the relative measures back
    /// to the absolute particle clouds.
    ///
    /// The quaternion chain rule uses the linearity of the Hamilton product:
    /// for `r = q_i ⊗ q_j*`, the pullbacks are `g ⊗ q_j` onto `q_i` and
    /// `(q_i* ⊗ g)*` onto `q_j`.
    pub fn pullback(&self, data: ArrayView3<f32>, grad: &Array3<f32>) -> Array3<f32> {
        let (n, m, d) = data.dim();
        let mut out = Array3::<f32>::zeros((n, m, d));
        for (e, &(i, j)) in self.edges.iter().enumerate() {
            for (k, (a, b)) in self.pairs(m).enumerate() {
                let g = grad.slice(ndarray::s![e, k, ..]);
                match self.manifold {
                    Manifold::Euclidean => {
                        let mut lhs = out.slice_mut(ndarray::s![i, a, ..]);
                        lhs += &g;
                        let mut rhs = out.slice_mut(ndarray::s![j, b, ..]);
                        rhs -= &g;
                    }
                    Manifold::Quaternion => {
                        let qi = data.slice(ndarray::s![i, a, ..]);
                        let qj = data.slice(ndarray::s![j, b, ..]);
                        let into_i = quaternion::hamilton(g, qj);
                        let twisted = quaternion::hamilton(quaternion::conjugate(qi).view(), g);
                        let into_j = quaternion::conjugate(twisted.view());
                        let mut lhs = out.slice_mut(ndarray::s![i, a, ..]);
                        lhs += &into_i;
                        let mut rhs = out.slice_mut(ndarray::s![j, b, ..]);
                        rhs += &into_j;
                    }
                }
            }
        }
        out
    }

    /// Index pairs (a, b) contributing one relative particle each.
    fn pairs(&self, m: usize) -> Box<dyn Iterator<Item = (usize, usize)>> {
        if self.product {
            Box::new((0..m).flat_map(move |a| (0..m).map(move |b| (a, b))))
        } else {
            Box::new((0..m).map(|k| (k, k)))
        }
    }

    fn displace(&self, lhs: ArrayView1<f32>, rhs: ArrayView1<f32>) -> Array1<f32> {
        match self.manifold {
            Manifold::Euclidean => &lhs - &rhs,
            Manifold::Quaternion => quaternion::relative(lhs, rhs),
        }
    }

    fn jitter(&self, mut row: ndarray::ArrayViewMut1<f32>, scale: Energy, rng: &mut SmallRng) {
        match self.manifold {
            Manifold::Euclidean => {
                row.mapv_inplace(|c| c + scale * rng.sample::<f32, _>(StandardNormal));
            }
            Manifold::Quaternion => {
                // compose a small tangent perturbation exp([0, εz]) onto r
                let mut bump = Array1::from(vec![
                    1.0,
                    scale * rng.sample::<f32, _>(StandardNormal),
                    scale * rng.sample::<f32, _>(StandardNormal),
                    scale * rng.sample::<f32, _>(StandardNormal),
                ]);
                let norm = bump.iter().map(|c| c * c).sum::<f32>().sqrt();
                bump.mapv_inplace(|c| c / norm);
                let perturbed = quaternion::hamilton(bump.view(), row.view());
                row.assign(&perturbed);
            }
        }
    }

    fn outlier(&self, mut row: ndarray::ArrayViewMut1<f32>, rng: &mut SmallRng) {
        match self.manifold {
            Manifold::Euclidean => {
                row.mapv_inplace(|_| rng.sample::<f32, _>(StandardNormal));
            }
            Manifold::Quaternion => {
                let mut q = Array1::from(
                    (0..4)
                        .map(|_| rng.sample::<f32, _>(StandardNormal))
                        .collect::<Vec<f32>>(),
                );
                let norm = q.iter().map(|c| c * c).sum::<f32>().sqrt();
                if norm > 0.0 {
                    q.mapv_inplace(|c| c / norm);
                } else {
                    q[0] = 1.0;
                }
                row.assign(&q);
            }
        }
    }
}
