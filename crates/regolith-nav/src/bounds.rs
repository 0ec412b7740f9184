//! Axis-aligned navigation envelope.

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::NavError;

/// A world axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        })
    }
}

/// Axis-aligned box the viewpoint may never leave.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NavigationBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for NavigationBounds {
    /// The explorable region of the bundled lunar terrain.
    fn default() -> Self {
        Self {
            min: Vec3::new(-3750.0, 5350.0, -3050.0),
            max: Vec3::new(1800.0, 10_000.0, 5450.0),
        }
    }
}

impl NavigationBounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Bounds that never clamp anything.
    pub fn unbounded() -> Self {
        Self {
            min: Vec3::splat(f32::NEG_INFINITY),
            max: Vec3::splat(f32::INFINITY),
        }
    }

    /// Whether `min <= max` holds on every axis.
    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Clamp `point` into the envelope, axis by axis.
    pub fn clamp(&self, point: Vec3) -> Vec3 {
        point.max(self.min).min(self.max)
    }

    /// Clamp `point`, also reporting the first axis that was out of range.
    pub fn clamp_reporting(&self, point: Vec3) -> (Vec3, Option<NavError>) {
        let clamped = self.clamp(point);
        let axis = [Axis::X, Axis::Y, Axis::Z]
            .into_iter()
            .zip(point.to_array())
            .zip(clamped.to_array())
            .find_map(|((axis, before), after)| (before != after).then_some(axis));
        (clamped, axis.map(|axis| NavError::OutOfBounds { axis }))
    }
}
