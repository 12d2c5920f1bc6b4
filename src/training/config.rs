use crate::geometry::Manifold;
use crate::measure::Corruption;
use crate::particles::Prior;
use crate::transport::Reduction;
use crate::Energy;
use crate::Entropy;
use crate::Error;
use crate::Probability;
use crate::Result;
use clap::Parser;
use std::path::PathBuf;

/// Command-line surface of the trainer binary.
///
/// Everything string-valued here is resolved into closed enums by
/// [`Config::try_from`]; unknown identifiers are rejected before any data
/// is allocated.
#[derive(Parser, Debug)]
#[command(about = "distributional pose synchronization by entropic optimal transport")]
pub struct Args {
    /// RNG seed shared by graph, truth and particle initialization.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
    /// Particle manifold: euclidian | quaternion.
    #[arg(long, default_value = "quaternion")]
    pub manifold: String,
    /// Objective family: sinkhorn | mmd.
    #[arg(long, default_value = "sinkhorn")]
    pub loss: String,
    /// Ground cost or kernel identifier for the chosen loss.
    #[arg(long, default_value = "laplacequaternion")]
    pub kernel: String,
    /// Initialization prior: gaussian | mixture_gaussians.
    #[arg(long, default_value = "gaussian")]
    pub prior: String,
    /// Prior for the ground-truth particles.
    #[arg(long, default_value = "gaussian")]
    pub true_prior: String,
    /// Mode count for the mixture prior.
    #[arg(long, default_value_t = 3)]
    pub modes: usize,
    /// Optimizer identifier.
    #[arg(long, default_value = "sgd")]
    pub optimizer: String,
    /// Batch cost reduction: none | mean | sum.
    #[arg(long, default_value = "sum")]
    pub reduction: String,
    /// Number of poses in the synthetic graph.
    #[arg(long, default_value_t = 10)]
    pub nodes: usize,
    /// Particles per node in the optimized cloud.
    #[arg(long, default_value_t = 50)]
    pub particles: usize,
    /// Particles per node in the ground-truth cloud.
    #[arg(long, default_value_t = 2)]
    pub true_particles: usize,
    /// Coordinate dimension for euclidean particles (quaternions force 4).
    #[arg(long, default_value_t = 3)]
    pub dimension: usize,
    /// Probability of observing each non-cycle node pair.
    #[arg(long, default_value_t = 0.1)]
    pub completeness: Probability,
    /// Pair particles across nodes as a product measure.
    #[arg(long)]
    pub product: bool,
    /// Product pairing for the ground-truth relative measures.
    #[arg(long)]
    pub true_product: bool,
    /// Entropic regularization of the training solver.
    #[arg(long, default_value_t = crate::SINKHORN_EPSILON)]
    pub epsilon: Entropy,
    /// Iteration cap of the training solver.
    #[arg(long, default_value_t = crate::SINKHORN_ITERATIONS)]
    pub iterations: usize,
    /// Convergence tolerance on the dual potentials.
    #[arg(long, default_value_t = crate::SINKHORN_TOLERANCE)]
    pub tolerance: Energy,
    /// Log bandwidth of the MMD kernel.
    #[arg(long, default_value_t = 0.0)]
    pub bandwidth_log: Energy,
    /// Exponent of the power-quaternion kernel.
    #[arg(long, default_value_t = 2)]
    pub power: i32,
    /// SGD learning rate.
    #[arg(long, default_value_t = 0.1)]
    pub learning_rate: Energy,
    /// Total training iterations.
    #[arg(long, default_value_t = 1000)]
    pub total: usize,
    /// Evaluate and snapshot every this many iterations.
    #[arg(long, default_value_t = 100)]
    pub evaluate_every: usize,
    /// Initial annealing noise on the particle cloud.
    #[arg(long, default_value_t = 0.0)]
    pub noise: Energy,
    /// Multiplicative noise decay factor.
    #[arg(long, default_value_t = 0.5)]
    pub decay: Energy,
    /// Apply the noise decay every this many iterations.
    #[arg(long, default_value_t = 1000)]
    pub decay_every: usize,
    /// Tangent noise level on the observed relative measures.
    #[arg(long, default_value_t = 0.0)]
    pub measurement_noise: Energy,
    /// Probability of replacing an observed measure with an outlier.
    #[arg(long, default_value_t = 0.0)]
    pub outliers: Probability,
    /// Output directory for snapshots.
    #[arg(long, default_value = "runs")]
    pub directory: PathBuf,
    /// Run identifier appended to the output directory.
    #[arg(long, default_value_t = 0)]
    pub run: usize,
    /// Write JSON snapshots at every evaluation.
    #[arg(long)]
    pub save: bool,
}

/// Fully resolved experiment configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub seed: u64,
    pub manifold: Manifold,
    pub loss: String,
    pub kernel: String,
    pub prior: Prior,
    pub true_prior: Prior,
    pub optimizer: String,
    pub reduction: Reduction,
    pub nodes: usize,
    pub particles: usize,
    pub true_particles: usize,
    pub dimension: usize,
    pub completeness: Probability,
    pub product: bool,
    pub true_product: bool,
    pub epsilon: Entropy,
    pub iterations: usize,
    pub tolerance: Energy,
    pub bandwidth: Energy,
    pub power: i32,
    pub learning_rate: Energy,
    pub total: usize,
    pub evaluate_every: usize,
    pub noise: Energy,
    pub decay: Energy,
    pub decay_every: usize,
    pub corruption: Corruption,
    pub directory: PathBuf,
    pub save: bool,
}

impl TryFrom<&Args> for Config {
    type Error = Error;
    fn try_from(args: &Args) -> Result<Self> {
        for (option, count) in [
            ("nodes", args.nodes),
            ("particles", args.particles),
            ("true-particles", args.true_particles),
            ("dimension", args.dimension),
        ] {
            if count == 0 {
                return Err(Error::EmptyCount(option, count));
            }
        }
        let manifold = Manifold::try_from(args.manifold.as_str())?;
        let dimension = match manifold {
            Manifold::Euclidean => args.dimension,
            Manifold::Quaternion => 4,
        };
        Ok(Self {
            seed: args.seed,
            manifold,
            loss: args.loss.clone(),
            kernel: args.kernel.clone(),
            prior: Prior::parse(&args.prior, manifold, args.modes)?,
            true_prior: Prior::parse(&args.true_prior, manifold, args.modes)?,
            optimizer: args.optimizer.clone(),
            reduction: Reduction::try_from(args.reduction.as_str())?,
            nodes: args.nodes,
            particles: args.particles,
            true_particles: args.true_particles,
            dimension,
            completeness: args.completeness,
            product: args.product,
            true_product: args.true_product,
            epsilon: args.epsilon,
            iterations: args.iterations,
            tolerance: args.tolerance,
            bandwidth: args.bandwidth_log.exp(),
            power: args.power,
            learning_rate: args.learning_rate,
            total: args.total,
            evaluate_every: args.evaluate_every.max(1),
            noise: args.noise,
            decay: args.decay,
            decay_every: args.decay_every.max(1),
            corruption: Corruption {
                noise: args.measurement_noise,
                flips: args.outliers,
            },
            directory: args.directory.join(format!("run_{}", args.run)),
            save: args.save,
        })
    }
}
