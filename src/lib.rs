//! Distributional pose synchronization via entropic optimal transport.
//!
//! Rather than averaging rotations algebraically, this crate represents each
//! pose as an empirical measure over a manifold (Euclidean space or the unit
//! quaternions) and optimizes a particle cloud to match target measures under
//! a Sinkhorn (entropic OT) or MMD loss. The solver core lives in
//! [`transport`]; the synchronization experiment around it lives in
//! [`measure`], [`particles`], [`loss`], and [`training`].

pub mod geometry;
pub mod loss;
pub mod measure;
pub mod particles;
pub mod training;
pub mod transport;

mod error;

pub use error::Error;
pub use error::Result;

// ============================================================================
// TYPE ALIASES
// ============================================================================
/// Transport costs, distances, and convergence errors.
pub type Energy = f32;
/// Entropic regularization strength (temperature).
pub type Entropy = f32;
/// Particle weights, marginal masses, and corruption rates.
pub type Probability = f32;

// ============================================================================
// SINKHORN OPTIMAL TRANSPORT
// Log-domain entropic OT over batched cost matrices.
// ============================================================================
/// Entropic regularization strength. Lower = closer to true OT, higher = faster convergence.
pub const SINKHORN_EPSILON: Entropy = 0.05;
/// Maximum Sinkhorn iterations before stopping.
pub const SINKHORN_ITERATIONS: usize = 100;
/// Early stopping threshold on the mean L1 change of the LHS potential.
/// Loose by typical Sinkhorn-solver standards; tighten via configuration
/// when marginal accuracy matters more than wall-clock time.
pub const SINKHORN_TOLERANCE: Energy = 0.1;
/// Additive floor inside log() so zero-mass marginals stay finite.
pub const SINKHORN_FLOOR: Probability = 1e-8;

// ============================================================================
// QUATERNION GEOMETRY
// ============================================================================
/// Guard band around |<p, q>| = 1 where the arccos derivative blows up.
pub const GEODESIC_GUARD: Energy = 1e-6;

// ============================================================================
// EVALUATION
// Read-only distance probes against ground truth use their own solver budget.
// ============================================================================
/// Regularization for evaluation-time Sinkhorn distances.
pub const EVAL_EPSILON: Entropy = 0.05;
/// Iteration cap for evaluation-time Sinkhorn distances.
pub const EVAL_ITERATIONS: usize = 100;

// ============================================================================
// RUNTIME UTILITIES
// ============================================================================
/// Initialize dual logging (terminal + file) with timestamped log files.
/// Creates `logs/` directory and writes DEBUG level to file, INFO to terminal.
pub fn log() {
    std::fs::create_dir_all("logs").expect("create logs directory");
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves slow")
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{}.log", time)).expect("create log file"),
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config.clone(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file]).expect("initialize logger");
}
