//! Particle representation of pose distributions.
//!
//! Each of the N nodes in the synchronization problem carries a cloud of M
//! weighted particles approximating its posterior pose. Particles are
//! sampled from a [`Prior`], optimized in place by an [`Optimizer`], and
//! never mutated by the losses that read them.
mod cloud;
mod optimizer;
mod prior;

pub use cloud::*;
pub use optimizer::*;
pub use prior::*;
