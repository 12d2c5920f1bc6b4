use super::config::Config;
use super::snapshot::Snapshot;
use crate::loss::Loss;
use crate::loss::MmdKernel;
use crate::loss::MmdLoss;
use crate::loss::SinkhornLoss;
use crate::measure::PoseGraph;
use crate::measure::RelativeMeasure;
use crate::particles::Optimizer;
use crate::particles::Particles;
use crate::transport::Evaluator;
use crate::Energy;
use crate::Error;
use crate::Probability;
use crate::Result;
use ndarray::Array2;
use ndarray::Array3;
use rand::rngs::SmallRng;
use rand::SeedableRng;

/// A fully wired synchronization run.
///
/// Construction resolves every configuration identifier, samples the
/// ground-truth cloud, pushes it through the (corrupted) relative measure
/// map and freezes the result as the training target. The truth itself is
/// kept only for the evaluation probes.
pub struct Trainer {
    config: Config,
    rng: SmallRng,
    map: RelativeMeasure,
    particles: Particles,
    truth: Particles,
    target: Array3<f32>,
    target_weights: Array2<Probability>,
    loss: Loss,
    optimizer: Optimizer,
    evaluator: Evaluator,
}

impl Trainer {
    pub fn build(config: Config) -> Result<Self> {
        let mut rng = SmallRng::seed_from_u64(config.seed);
        let graph = PoseGraph::synthetic(config.nodes, config.completeness, &mut rng);
        if !graph.connected() {
            log::warn!("observation graph is disconnected; gauge is not identifiable");
        }
        log::info!(
            "synthetic graph: {} nodes, {} edges, completeness {}",
            graph.nodes(),
            graph.edges().len(),
            config.completeness
        );
        let map = RelativeMeasure::new(graph.edges().to_vec(), config.manifold, config.product);
        let true_map =
            RelativeMeasure::new(graph.edges().to_vec(), config.manifold, config.true_product);
        let mut truth = Particles::sample(
            &config.true_prior,
            config.manifold,
            &mut rng,
            config.nodes,
            config.true_particles,
            config.dimension,
            0.0,
            1.0,
        );
        truth.gauge_fix();
        let (target, target_weights) =
            true_map.corrupted(truth.data(), truth.weights(), config.corruption, &mut rng);
        let particles = Particles::sample(
            &config.prior,
            config.manifold,
            &mut rng,
            config.nodes,
            config.particles,
            config.dimension,
            config.noise,
            config.decay,
        );
        let loss = match config.loss.as_str() {
            "sinkhorn" => Loss::Sinkhorn(SinkhornLoss::new(
                &config.kernel,
                map.clone(),
                config.epsilon,
                config.iterations,
                config.tolerance,
                config.reduction,
            )?),
            "mmd" => Loss::Mmd(MmdLoss::new(
                MmdKernel::parse(&config.kernel, config.bandwidth, config.power)?,
                map.clone(),
            )),
            other => return Err(Error::UnsupportedLoss(other.to_string())),
        };
        let optimizer =
            Optimizer::parse(&config.optimizer, config.manifold, config.learning_rate)?;
        let evaluator = Evaluator::new(config.manifold, crate::EVAL_EPSILON, crate::EVAL_ITERATIONS)?;
        Ok(Self {
            config,
            rng,
            map,
            particles,
            truth,
            target,
            target_weights,
            loss,
            optimizer,
            evaluator,
        })
    }

    /// Run the training loop to completion and return the final loss.
    ///
    /// A non-finite loss stops the run rather than erroring: divergence is
    /// an experimental outcome, and whatever snapshots were written before
    /// it remain valid.
    pub fn train(&mut self) -> Result<Energy> {
        let mut last = Energy::NAN;
        for iteration in 0..self.config.total {
            let jittered = self.particles.perturbed(&mut self.rng);
            let objective = self.loss.evaluate(
                jittered.view(),
                self.particles.weights(),
                self.target.view(),
                self.target_weights.view(),
            )?;
            last = objective.value;
            if !last.is_finite() {
                log::error!("loss diverged to {} at iteration {}", last, iteration);
                break;
            }
            self.optimizer.step(&mut self.particles, &objective.grad);
            log::info!("iteration {:>6} loss {:>12.6}", iteration, last);
            if iteration > 0 && iteration % self.config.decay_every == 0 {
                self.particles.update_noise_level();
                log::info!("noise level decayed to {}", self.particles.noise());
            }
            if iteration % self.config.evaluate_every == 0 {
                self.evaluate(iteration, last)?;
            }
        }
        Ok(last)
    }

    /// Probe the Sinkhorn distance to the truth in absolute and relative
    /// coordinates, and persist a snapshot if the run is being recorded.
    fn evaluate(&self, iteration: usize, loss: Energy) -> Result<()> {
        let absolute = self.evaluator.distance(
            self.particles.data(),
            self.truth.data(),
            self.particles.weights(),
            self.truth.weights(),
        )?;
        let (relative_cloud, relative_mass) =
            self.map.map(self.particles.data(), self.particles.weights());
        let relative = self.evaluator.distance(
            relative_cloud.view(),
            self.target.view(),
            relative_mass.view(),
            self.target_weights.view(),
        )?;
        log::info!("sinkhorn distance to truth: absolute {absolute:.6} relative {relative:.6}");
        if self.config.save {
            Snapshot {
                iteration,
                loss,
                absolute_distance: absolute,
                relative_distance: relative,
                particles: self.particles.data().to_owned(),
                weights: self.particles.weights().to_owned(),
            }
            .save(&self.config.directory)?;
        }
        Ok(())
    }

    pub fn particles(&self) -> &Particles {
        &self.particles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::Args;
    use clap::Parser;

    fn tiny() -> Config {
        let args = Args::parse_from([
            "trainer",
            "--nodes",
            "3",
            "--particles",
            "4",
            "--true-particles",
            "2",
            "--total",
            "5",
            "--evaluate-every",
            "100",
            "--completeness",
            "1.0",
        ]);
        Config::try_from(&args).expect("config")
    }

    #[test]
    fn a_tiny_quaternion_run_completes() {
        let mut trainer = Trainer::build(tiny()).expect("build");
        let last = trainer.train().expect("train");
        assert!(last.is_finite());
        for row in trainer.particles().data().rows() {
            let norm = row.iter().map(|c| c * c).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn unknown_loss_names_are_rejected_at_build() {
        let mut config = tiny();
        config.loss = "wasserstein".to_string();
        assert!(Trainer::build(config).is_err());
    }

    #[test]
    fn builds_are_deterministic_under_a_fixed_seed() {
        let a = Trainer::build(tiny()).expect("build");
        let b = Trainer::build(tiny()).expect("build");
        assert_eq!(a.particles().data(), b.particles().data());
        assert_eq!(a.target, b.target);
    }
}
