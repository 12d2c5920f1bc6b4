//! Relative measures over a pose graph.
//!
//! The synchronization experiment never observes absolute poses; it sees
//! *relative* measures along graph edges. This module owns the synthetic
//! pose graph and the (differentiable) map from absolute particle clouds to
//! relative ones.
mod graph;
mod relative;

pub use graph::*;
pub use relative::*;
