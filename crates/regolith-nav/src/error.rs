//! Error types for the navigation core.

use std::fmt;

use crate::bounds::Axis;

/// Result type for navigation operations.
pub type Result<T> = std::result::Result<T, NavError>;

/// Conditions reported by the navigation pipeline.
///
/// Only [`NavError::InvalidConfig`] is ever returned as an `Err`. The other
/// variants describe why a sub-system skipped its work for a tick and are
/// carried as skip reasons; none of them aborts a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum NavError {
    /// A ray query that was expected to hit the terrain missed.
    MissingTerrain,
    /// The terrain was hit but its slope exceeds the configured limit.
    ExcessiveSlope {
        /// Angle between the surface normal and world-up, in radians.
        angle: f32,
        /// Configured limit, in radians.
        max: f32,
    },
    /// Obstacle volumes have not been built yet.
    ObstacleNotLoaded,
    /// A candidate position left the navigation envelope and was clamped.
    OutOfBounds {
        /// The first axis found outside its range.
        axis: Axis,
    },
    /// A configuration value is outside its valid range.
    InvalidConfig {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        detail: String,
    },
}

impl fmt::Display for NavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTerrain => write!(f, "no terrain below the ray origin"),
            Self::ExcessiveSlope { angle, max } => write!(
                f,
                "terrain slope {:.1}° exceeds the {:.1}° limit",
                angle.to_degrees(),
                max.to_degrees()
            ),
            Self::ObstacleNotLoaded => write!(f, "obstacle volumes are not loaded"),
            Self::OutOfBounds { axis } => {
                write!(f, "position outside navigation bounds on the {axis} axis")
            }
            Self::InvalidConfig { field, detail } => {
                write!(f, "invalid configuration value for {field}: {detail}")
            }
        }
    }
}

impl std::error::Error for NavError {}
