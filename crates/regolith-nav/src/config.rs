//! Tunable parameters for every stage of the navigation pipeline.
//!
//! Defaults reproduce the behaviour of the lunar explorer the viewer ships
//! with. Every section is `#[serde(default)]`, so a JSON file only needs to
//! name the values it overrides:
//!
//! ```json
//! { "ground": { "gravity_blend": 0.2 }, "shake": { "seed": 7 } }
//! ```

use std::collections::HashMap;
use std::f32::consts::FRAC_PI_3;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::bounds::NavigationBounds;
use crate::error::{NavError, Result};
use crate::input::NavKey;
use crate::markers::{MarkerColor, MarkerDefinition};
use crate::smoothing::TimingMode;

/// Complete controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub input: InputConfig,
    pub ground: GroundConfig,
    pub collision: CollisionConfig,
    pub smoothing: SmoothingConfig,
    pub shake: ShakeConfig,
    pub bounds: NavigationBounds,
    pub view: ViewConfig,
    pub placement: PlacementConfig,
    pub telemetry: TelemetryConfig,
    pub markers: Vec<MarkerDefinition>,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            input: InputConfig::default(),
            ground: GroundConfig::default(),
            collision: CollisionConfig::default(),
            smoothing: SmoothingConfig::default(),
            shake: ShakeConfig::default(),
            bounds: NavigationBounds::default(),
            view: ViewConfig::default(),
            placement: PlacementConfig::default(),
            telemetry: TelemetryConfig::default(),
            markers: MarkerDefinition::lunar_defaults(),
        }
    }
}

impl NavigationConfig {
    /// Check every value against its valid range.
    pub fn validate(&self) -> Result<()> {
        let input = &self.input;
        positive("input.walk_speed", input.walk_speed)?;
        positive("input.run_speed", input.run_speed)?;
        positive("input.look_sensitivity", input.look_sensitivity)?;
        in_range(
            "input.pitch_limit",
            input.pitch_limit,
            0.0,
            std::f32::consts::FRAC_PI_2,
        )?;

        let ground = &self.ground;
        positive("ground.stand_height", ground.stand_height)?;
        in_range("ground.padding", ground.padding, 0.0, f32::MAX)?;
        in_range("ground.max_slope", ground.max_slope, 0.0, std::f32::consts::PI)?;
        unit("ground.gravity_blend", ground.gravity_blend)?;
        positive("ground.ray_lift", ground.ray_lift)?;
        positive("ground.ray_length", ground.ray_length)?;

        in_range("collision.padding", self.collision.padding, 0.0, f32::MAX)?;
        in_range("collision.epsilon", self.collision.epsilon, 0.0, f32::MAX)?;

        unit("smoothing.position_factor", self.smoothing.position_factor)?;
        unit("smoothing.rotation_factor", self.smoothing.rotation_factor)?;
        if let TimingMode::DtNormalized { reference_dt } = self.smoothing.timing {
            positive("smoothing.timing.reference_dt", reference_dt)?;
        }

        in_range("shake.intensity", self.shake.intensity, 0.0, f32::MAX)?;
        unit("shake.decay", self.shake.decay)?;
        in_range("shake.threshold", self.shake.threshold, 0.0, f32::MAX)?;
        positive("shake.normalizer", self.shake.normalizer)?;

        if !self.bounds.is_valid() {
            return Err(NavError::InvalidConfig {
                field: "bounds",
                detail: format!("min {} exceeds max {}", self.bounds.min, self.bounds.max),
            });
        }

        in_range(
            "view.fov_y",
            self.view.fov_y,
            f32::EPSILON,
            std::f32::consts::PI - f32::EPSILON,
        )?;
        positive("view.near", self.view.near)?;
        if self.view.far <= self.view.near {
            return Err(NavError::InvalidConfig {
                field: "view.far",
                detail: format!("far plane {} must exceed near plane {}", self.view.far, self.view.near),
            });
        }

        for marker in &self.markers {
            positive("markers.radius", marker.radius)?;
        }

        Ok(())
    }
}

fn in_range(field: &'static str, value: f32, min: f32, max: f32) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(NavError::InvalidConfig {
            field,
            detail: format!("{value} is outside [{min}, {max}]"),
        })
    }
}

fn positive(field: &'static str, value: f32) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(NavError::InvalidConfig {
            field,
            detail: format!("{value} must be a positive number"),
        })
    }
}

fn unit(field: &'static str, value: f32) -> Result<()> {
    in_range(field, value, 0.0, 1.0)
}

/// Keyboard and pointer-look settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Translation per reference frame while walking.
    pub walk_speed: f32,
    /// Translation per reference frame while the run key is held.
    pub run_speed: f32,
    /// Radians of look rotation per pixel of pointer drag.
    pub look_sensitivity: f32,
    /// Largest absolute pitch, in radians.
    pub pitch_limit: f32,
    /// Raw key ids (lowercase) to logical keys.
    pub bindings: HashMap<String, NavKey>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            walk_speed: 40.0,
            run_speed: 80.0,
            look_sensitivity: 0.002,
            pitch_limit: 89f32.to_radians(),
            bindings: NavKey::default_bindings(),
        }
    }
}

/// Terrain-following settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundConfig {
    /// Offset kept between the viewpoint and the ground contact, along the normal.
    pub stand_height: f32,
    /// Extra clearance below which the viewpoint is pushed back out of the ground.
    pub padding: f32,
    /// Steepest walkable slope in radians (inclusive).
    pub max_slope: f32,
    /// Per-tick blend toward the resting height; 0 never converges, 1 snaps.
    pub gravity_blend: f32,
    /// How far above the candidate the downward ground ray starts.
    pub ray_lift: f32,
    /// Maximum length of the downward ground ray.
    pub ray_length: f32,
}

impl Default for GroundConfig {
    fn default() -> Self {
        Self {
            stand_height: 5.0,
            padding: 2.0,
            max_slope: FRAC_PI_3,
            gravity_blend: 0.0,
            ray_lift: 100.0,
            ray_length: 20_000.0,
        }
    }
}

/// Obstacle avoidance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Added to the unioned bounding sphere of each obstacle.
    pub padding: f32,
    /// Ejected positions land this far outside the obstacle sphere.
    pub epsilon: f32,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            padding: 2.0,
            epsilon: 0.01,
        }
    }
}

/// Exponential smoothing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub position_factor: f32,
    pub rotation_factor: f32,
    pub timing: TimingMode,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            position_factor: 0.15,
            rotation_factor: 0.1,
            timing: TimingMode::FrameCoupled,
        }
    }
}

/// Camera shake settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShakeConfig {
    /// Peak jitter amplitude at full shake.
    pub intensity: f32,
    /// Per-tick multiplier applied to the carried offset.
    pub decay: f32,
    /// Frame speed above which shake is generated.
    pub threshold: f32,
    /// Speed excess that maps to full shake.
    pub normalizer: f32,
    /// Seed for the jitter source; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for ShakeConfig {
    fn default() -> Self {
        Self {
            intensity: 1.0,
            decay: 0.95,
            threshold: 5.0,
            normalizer: 50.0,
            seed: None,
        }
    }
}

/// Perspective camera settings used for pointer rays.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    /// Initial viewport size in pixels, replaced by the first resize.
    pub viewport: [f32; 2],
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            fov_y: 55f32.to_radians(),
            near: 0.1,
            far: 12_000.0,
            viewport: [1920.0, 1080.0],
        }
    }
}

/// Where the viewpoint starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Origin of the initial downward ray once terrain is ready.
    pub ray_origin: Vec3,
    /// Start position used when terrain never loads.
    pub default_position: Vec3,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            ray_origin: Vec3::new(0.0, 5500.0, 5000.0),
            default_position: Vec3::new(1799.0, 5500.0, 5000.0),
        }
    }
}

/// Telemetry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Height reported as zero elevation.
    pub elevation_reference: f32,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            elevation_reference: 5350.0,
        }
    }
}

impl MarkerDefinition {
    /// Waypoints of the bundled lunar scene.
    pub fn lunar_defaults() -> Vec<Self> {
        let rover = Vec3::new(1000.0, 5350.0, 2000.0);
        vec![
            Self::new("NASA Rover", rover, MarkerColor(0xff_00_00)),
            Self::new("Crater Alpha", rover, MarkerColor(0xff_00_00)),
            Self::new(
                "Ridge Beta",
                Vec3::new(-2000.0, 5350.0, 3000.0),
                MarkerColor(0x00_ff_00),
            ),
            Self::new(
                "Valley Gamma",
                Vec3::new(1500.0, 5350.0, -2000.0),
                MarkerColor(0x00_00_ff),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        NavigationConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_overrides() {
        let config: NavigationConfig =
            serde_json::from_str(r#"{ "ground": { "gravity_blend": 0.5 }, "shake": { "seed": 3 } }"#)
                .unwrap();
        assert!((config.ground.gravity_blend - 0.5).abs() < f32::EPSILON);
        assert!((config.ground.stand_height - 5.0).abs() < f32::EPSILON);
        assert_eq!(config.shake.seed, Some(3));
        assert_eq!(config.input.bindings.get("w"), Some(&NavKey::Forward));
    }

    #[test]
    fn test_rejects_out_of_range_factor() {
        let mut config = NavigationConfig::default();
        config.smoothing.position_factor = 1.5;
        assert!(matches!(
            config.validate(),
            Err(NavError::InvalidConfig {
                field: "smoothing.position_factor",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let mut config = NavigationConfig::default();
        config.bounds = NavigationBounds::new(Vec3::ONE, Vec3::ZERO);
        assert!(matches!(
            config.validate(),
            Err(NavError::InvalidConfig { field: "bounds", .. })
        ));
    }

    #[test]
    fn test_rejects_far_before_near() {
        let mut config = NavigationConfig::default();
        config.view.far = 0.05;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_lunar_markers() {
        let names: Vec<_> = MarkerDefinition::lunar_defaults()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(
            names,
            ["NASA Rover", "Crater Alpha", "Ridge Beta", "Valley Gamma"]
        );
    }
}
