use thiserror::Error;

/// Failure modes of the synchronization experiment.
///
/// Configuration errors fire synchronously at load time, before any numeric
/// work, and name the offending identifier. Numerical divergence is *not* an
/// error variant: a diverged solve propagates as ordinary non-finite output
/// and the stop decision belongs to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown particle manifold identifier.
    #[error("unsupported particle manifold: {0}")]
    UnsupportedManifold(String),

    /// Unknown ground-cost / kernel identifier.
    #[error("unsupported kernel cost: {0}")]
    UnsupportedKernel(String),

    /// Unknown loss identifier.
    #[error("unsupported loss: {0}")]
    UnsupportedLoss(String),

    /// Unknown prior identifier (or prior incompatible with the manifold).
    #[error("unsupported prior '{0}' for manifold '{1}'")]
    UnsupportedPrior(String, String),

    /// Unknown optimizer identifier.
    #[error("unsupported optimizer: {0}")]
    UnsupportedOptimizer(String),

    /// Unknown reduction mode identifier.
    #[error("unsupported reduction: {0}")]
    UnsupportedReduction(String),

    /// Point sets disagree on batch size.
    #[error("batch size mismatch: {0} vs {1}")]
    BatchMismatch(usize, usize),

    /// Point sets disagree on coordinate dimension.
    #[error("coordinate dimension mismatch: {0} vs {1}")]
    DimensionMismatch(usize, usize),

    /// Weight vector length does not match its point set's point count.
    #[error("weight shape [{0}, {1}] does not match point set [{2}, {3}]")]
    WeightMismatch(usize, usize, usize, usize),

    /// Ground cost tensor shape does not match the marginals.
    #[error("ground cost shape [{0}, {1}, {2}] does not match marginals [batch {3}, {4}, {5}]")]
    GroundMismatch(usize, usize, usize, usize, usize, usize),

    /// A count-valued option must be at least one.
    #[error("{0} must be at least 1, got {1}")]
    EmptyCount(&'static str, usize),

    /// Regularization must be positive and finite.
    #[error("regularization must be positive and finite, got {0}")]
    InvalidRegularization(f32),

    /// Snapshot directory or file could not be written.
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot serialization failed.
    #[error("snapshot encoding: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for synchronization operations.
pub type Result<T> = std::result::Result<T, Error>;
