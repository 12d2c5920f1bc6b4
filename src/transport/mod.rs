//! Entropic optimal transport between weighted point clouds.
//!
//! This module computes distances between empirical measures over metric
//! spaces, enabling the synchronization experiment to match a particle
//! representation against target measures.
//!
//! ## Core Types
//!
//! - [`Metric`] — pluggable ground cost (Euclidean power, quaternion geodesic)
//! - [`Sinkhorn`] — log-stabilized entropic-OT fixed point iteration
//! - [`Coupling`] — a solved transport plan with its cost and diagnostics
//! - [`Evaluator`] — gradient-free distance probe against ground truth
//!
//! ## Usage
//!
//! The Sinkhorn iterations are controlled by temperature, iteration count,
//! and convergence tolerance parameters. Lower temperature yields sharper
//! transport plans at the cost of numerical stability; the log-domain
//! updates are what keep small temperatures from underflowing the kernel.
mod coupling;
mod evaluator;
mod metric;
mod sinkhorn;

pub use coupling::*;
pub use evaluator::*;
pub use metric::*;
pub use sinkhorn::*;
