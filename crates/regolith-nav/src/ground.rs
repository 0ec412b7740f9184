//! Terrain following: keeps the viewpoint a fixed height above the ground.

use glam::{Quat, Vec3};

use crate::config::GroundConfig;
use crate::error::NavError;
use crate::ray::{RayQuery, SurfaceHit};

/// Outcome of resolving one candidate against the terrain.
#[derive(Debug, Clone, PartialEq)]
pub enum GroundResolution {
    /// The candidate was moved toward its resting position.
    Snapped {
        position: Vec3,
        /// Terrain normal under the candidate.
        normal: Vec3,
        /// Rotation taking world-up onto `normal`.
        tilt: Quat,
    },
    /// Vertical resolution was skipped.
    Skipped(NavError),
}

impl GroundResolution {
    /// The resolved position, or `fallback` when resolution was skipped.
    pub fn position_or(&self, fallback: Vec3) -> Vec3 {
        match self {
            Self::Snapped { position, .. } => *position,
            Self::Skipped(_) => fallback,
        }
    }

    /// Terrain tilt to ease toward, if the candidate reached the ground.
    pub fn tilt(&self) -> Option<Quat> {
        match self {
            Self::Snapped { tilt, .. } => Some(*tilt),
            Self::Skipped(_) => None,
        }
    }
}

/// Snaps candidate positions onto the terrain below them.
#[derive(Debug, Clone)]
pub struct GroundFollower {
    stand_height: f32,
    padding: f32,
    max_slope: f32,
    gravity_blend: f32,
    ray_lift: f32,
    ray_length: f32,
}

impl GroundFollower {
    pub fn new(config: &GroundConfig) -> Self {
        Self {
            stand_height: config.stand_height,
            padding: config.padding,
            max_slope: config.max_slope,
            gravity_blend: config.gravity_blend,
            ray_lift: config.ray_lift,
            ray_length: config.ray_length,
        }
    }

    pub fn stand_height(&self) -> f32 {
        self.stand_height
    }

    /// Resolve `candidate` against `terrain`.
    ///
    /// The ray starts `ray_lift` above the candidate so a candidate
    /// that has sunk slightly into the ground still finds it.
    pub fn resolve(&self, candidate: Vec3, terrain: &impl RayQuery) -> GroundResolution {
        let origin = candidate + Vec3::Y * self.ray_lift;
        let Some(hit) = terrain.query_down(origin, self.ray_length) else {
            return GroundResolution::Skipped(NavError::MissingTerrain);
        };
        self.resolve_hit(candidate, &hit)
    }

    /// Resolve `candidate` against a known ground contact.
    pub fn resolve_hit(&self, candidate: Vec3, hit: &SurfaceHit) -> GroundResolution {
        let angle = hit.normal.angle_between(Vec3::Y);
        if angle > self.max_slope {
            return GroundResolution::Skipped(NavError::ExcessiveSlope {
                angle,
                max: self.max_slope,
            });
        }

        let resting = self.resting_position(hit);
        let mut position = candidate.lerp(resting, self.gravity_blend);

        let clearance = self.stand_height + self.padding;
        if position.distance(hit.point) < clearance {
            position = hit.point + hit.normal * clearance;
        }

        GroundResolution::Snapped {
            position,
            normal: hit.normal,
            tilt: Quat::from_rotation_arc(Vec3::Y, hit.normal),
        }
    }

    /// Where the viewpoint rests above `hit`.
    pub fn resting_position(&self, hit: &SurfaceHit) -> Vec3 {
        hit.point + hit.normal * self.stand_height
    }
}
