//! The synchronization experiment loop.
//!
//! Wires the synthetic pose graph, the ground-truth relative measures, the
//! particle cloud, the chosen objective and the optimizer into a training
//! run, with periodic Sinkhorn-distance probes against the truth.

mod config;
mod snapshot;
mod trainer;

pub use config::*;
pub use snapshot::*;
pub use trainer::*;
