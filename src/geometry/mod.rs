//! Manifold geometry for particle clouds.
//!
//! Particles live either in flat Euclidean space or on the unit-quaternion
//! sphere S³ (the double cover of SO(3)). This module owns the quaternion
//! algebra: Hamilton products, relative rotations, tangent-space projection,
//! and the numerically guarded geodesic angle used as a ground cost.
pub mod quaternion;

use crate::Error;
use crate::Result;

/// The space a particle cloud lives in.
///
/// Closed set of supported manifolds; string-valued configuration is parsed
/// into this enum exactly once at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Manifold {
    /// Flat coordinates, arbitrary dimension.
    Euclidean,
    /// Unit 4-vectors on S³ interpreted as rotations.
    Quaternion,
}

impl Manifold {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Euclidean => "euclidian",
            Self::Quaternion => "quaternion",
        }
    }
}

impl TryFrom<&str> for Manifold {
    type Error = Error;
    fn try_from(name: &str) -> Result<Self> {
        match name {
            "euclidian" | "euclidean" => Ok(Self::Euclidean),
            "quaternion" => Ok(Self::Quaternion),
            other => Err(Error::UnsupportedManifold(other.to_string())),
        }
    }
}
