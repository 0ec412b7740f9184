//! Perspective camera model used to turn pointer positions into world rays.

use glam::{Quat, Vec2, Vec3};

use crate::config::ViewConfig;
use crate::ray::Ray;

#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveView {
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    viewport: Vec2,
}

impl Default for PerspectiveView {
    fn default() -> Self {
        Self::new(&ViewConfig::default())
    }
}

impl PerspectiveView {
    pub fn new(config: &ViewConfig) -> Self {
        let mut view = Self {
            fov_y: config.fov_y,
            near: config.near,
            far: config.far,
            viewport: Vec2::ONE,
        };
        let [width, height] = config.viewport;
        view.on_resize(width, height);
        view
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn aspect(&self) -> f32 {
        self.viewport.x / self.viewport.y
    }

    /// Track a new viewport size. Zero or negative sizes are ignored.
    pub fn on_resize(&mut self, width: f32, height: f32) -> bool {
        if width <= 0.0 || height <= 0.0 || !width.is_finite() || !height.is_finite() {
            tracing::debug!(width, height, "Ignoring degenerate viewport size");
            return false;
        }
        self.viewport = Vec2::new(width, height);
        true
    }

    /// Client pixel coordinates (origin top-left) to normalized device coordinates.
    pub fn client_to_ndc(&self, client: Vec2) -> Vec2 {
        Vec2::new(
            2.0 * client.x / self.viewport.x - 1.0,
            1.0 - 2.0 * client.y / self.viewport.y,
        )
    }

    /// World ray from a camera at `eye` with `orientation` through `ndc`.
    pub fn ray_from_ndc(&self, eye: Vec3, orientation: Quat, ndc: Vec2) -> Ray {
        let tan_half = (self.fov_y * 0.5).tan();
        let local = Vec3::new(ndc.x * tan_half * self.aspect(), ndc.y * tan_half, -1.0);
        Ray {
            origin: eye,
            direction: (orientation * local).normalize(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_to_ndc_corners() {
        let mut view = PerspectiveView::default();
        view.on_resize(800.0, 600.0);
        assert_eq!(view.client_to_ndc(Vec2::new(0.0, 0.0)), Vec2::new(-1.0, 1.0));
        assert_eq!(view.client_to_ndc(Vec2::new(400.0, 300.0)), Vec2::ZERO);
        assert_eq!(view.client_to_ndc(Vec2::new(800.0, 600.0)), Vec2::new(1.0, -1.0));
    }

    #[test]
    fn test_zero_resize_is_ignored() {
        let mut view = PerspectiveView::default();
        let before = view.viewport();
        assert!(!view.on_resize(0.0, 600.0));
        assert_eq!(view.viewport(), before);
    }

    #[test]
    fn test_center_ray_follows_orientation() {
        let view = PerspectiveView::default();
        let ray = view.ray_from_ndc(Vec3::ONE, Quat::IDENTITY, Vec2::ZERO);
        assert_eq!(ray.origin, Vec3::ONE);
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-6);

        let turned = view.ray_from_ndc(Vec3::ZERO, Quat::from_rotation_y(std::f32::consts::FRAC_PI_2), Vec2::ZERO);
        assert!((turned.direction - Vec3::NEG_X).length() < 1e-5);
    }

    #[test]
    fn test_top_edge_ray_matches_fov() {
        let view = PerspectiveView::default();
        let ray = view.ray_from_ndc(Vec3::ZERO, Quat::IDENTITY, Vec2::new(0.0, 1.0));
        let angle = ray.direction.angle_between(Vec3::NEG_Z);
        assert!((angle - view.fov_y * 0.5).abs() < 1e-5);
    }
}
