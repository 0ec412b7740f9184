//! The navigation controller: sole owner of the viewpoint's mutable state.

use glam::{Quat, Vec2, Vec3};

use crate::bounds::NavigationBounds;
use crate::collision::{BoundingSphere, CollisionResolver, ObstacleVolume};
use crate::config::NavigationConfig;
use crate::error::{NavError, Result};
use crate::ground::{GroundFollower, GroundResolution};
use crate::input::{InputAggregator, LookAngles, NavKey, PointerButton};
use crate::markers::{HitTester, MarkerId, MarkerRegistry};
use crate::ray::RayQuery;
use crate::shake::ShakeGenerator;
use crate::smoothing::MotionSmoother;
use crate::telemetry::TelemetrySample;
use crate::view::PerspectiveView;

/// Rendered camera pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    /// Terrain tilt applied on top of the look rotation.
    pub orientation: Quat,
    pub look: LookAngles,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            look: LookAngles::default(),
        }
    }
}

impl Pose {
    /// View direction.
    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }
}

/// Progress of an asynchronously loaded dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Pending,
    Ready,
    Failed,
}

/// Everything a host needs after a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutput {
    pub pose: Pose,
    /// Smoothed position change this tick, shake excluded.
    pub displacement: Vec3,
    pub telemetry: TelemetrySample,
    /// Stages that skipped their work this tick, and why.
    pub skipped: Vec<NavError>,
}

/// First-person navigation over static terrain.
///
/// Event handlers may be called at any time; [`NavigationController::tick`]
/// is called once per presented frame with the current terrain.
#[derive(Debug)]
pub struct NavigationController {
    config: NavigationConfig,
    input: InputAggregator,
    ground: GroundFollower,
    collision: CollisionResolver,
    smoother: MotionSmoother,
    shake: ShakeGenerator,
    markers: MarkerRegistry,
    view: PerspectiveView,
    bounds: NavigationBounds,
    terrain: LoadState,
    obstacles: LoadState,
    active: bool,
    pose: Pose,
    elapsed: f32,
}

impl NavigationController {
    /// Build a controller from a validated configuration.
    pub fn new(config: NavigationConfig) -> Result<Self> {
        config.validate()?;
        let smoother = MotionSmoother::new(&config.smoothing, config.placement.default_position);
        Ok(Self {
            input: InputAggregator::new(&config.input),
            ground: GroundFollower::new(&config.ground),
            collision: CollisionResolver::new(&config.collision),
            shake: ShakeGenerator::new(&config.shake, config.smoothing.timing),
            markers: MarkerRegistry::from_definitions(&config.markers),
            view: PerspectiveView::new(&config.view),
            bounds: config.bounds,
            terrain: LoadState::Pending,
            obstacles: LoadState::Pending,
            active: false,
            pose: Pose {
                position: config.placement.default_position,
                ..Pose::default()
            },
            elapsed: 0.0,
            smoother,
            config,
        })
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Smoothed position without shake. Each tick starts from here.
    pub fn smoothed_position(&self) -> Vec3 {
        self.smoother.position()
    }

    pub fn markers(&self) -> &MarkerRegistry {
        &self.markers
    }

    pub fn view(&self) -> &PerspectiveView {
        &self.view
    }

    pub fn input(&self) -> &InputAggregator {
        &self.input
    }

    pub fn terrain_state(&self) -> LoadState {
        self.terrain
    }

    pub fn obstacle_state(&self) -> LoadState {
        self.obstacles
    }

    /// Whether the viewpoint has been placed and ticks produce output.
    pub fn is_active(&self) -> bool {
        self.active
    }

    // ========================================================================
    // Readiness signals
    // ========================================================================

    /// Terrain geometry is queryable. Placement happens on the next tick.
    pub fn mark_terrain_ready(&mut self) {
        tracing::info!("Terrain ready");
        self.terrain = LoadState::Ready;
    }

    /// Terrain will never load; navigate without ground resolution.
    pub fn mark_terrain_failed(&mut self) {
        tracing::warn!("Terrain failed to load, navigating without ground contact");
        self.terrain = LoadState::Failed;
    }

    /// Install obstacles, each given as the bounding spheres of its sub-meshes.
    ///
    /// Obstacles with no sub-meshes are ignored.
    pub fn set_obstacles<I, S>(&mut self, obstacles: I)
    where
        I: IntoIterator<Item = S>,
        S: IntoIterator<Item = BoundingSphere>,
    {
        let padding = self.collision.padding();
        let volumes: Vec<ObstacleVolume> = obstacles
            .into_iter()
            .filter_map(|spheres| ObstacleVolume::from_sub_spheres(spheres, padding))
            .collect();
        for volume in &volumes {
            tracing::debug!(center = %volume.center, radius = volume.radius, "Obstacle volume");
        }
        self.collision.set_volumes(volumes);
        self.obstacles = LoadState::Ready;
    }

    /// Obstacles will never load; collision stays disabled.
    pub fn mark_obstacles_failed(&mut self) {
        tracing::warn!("Obstacles failed to load, collision disabled");
        self.obstacles = LoadState::Failed;
    }

    // ========================================================================
    // Input events
    // ========================================================================

    /// Raw key transition. Returns the logical key, if the key is bound.
    pub fn on_key(&mut self, key: &str, pressed: bool) -> Option<NavKey> {
        self.input.on_key(key, pressed)
    }

    /// Drop all held input, e.g. on focus loss.
    pub fn release_all(&mut self) {
        self.input.release_all();
    }

    /// Pointer moved to `client` pixels. Updates orbit look and hover
    /// highlighting; returns the highlighted marker.
    pub fn on_pointer_move(&mut self, client: Vec2) -> Option<MarkerId> {
        self.input.on_pointer_move(client);
        if !self.active {
            return None;
        }
        let ndc = self.view.client_to_ndc(client);
        HitTester::new(&self.view, self.pose.position, self.live_orientation())
            .hover(&mut self.markers, ndc)
    }

    /// Pointer button pressed at `client`. The primary button picks a marker;
    /// the auxiliary button starts orbiting.
    pub fn on_pointer_down(&mut self, button: PointerButton, client: Vec2) -> Option<MarkerId> {
        self.input.on_pointer_down(button);
        if button != PointerButton::Primary || !self.active {
            return None;
        }
        let ndc = self.view.client_to_ndc(client);
        HitTester::new(&self.view, self.pose.position, self.live_orientation())
            .click(&self.markers, ndc)
    }

    pub fn on_pointer_up(&mut self, button: PointerButton) {
        self.input.on_pointer_up(button);
    }

    /// Viewport resized. Zero sizes are ignored.
    pub fn on_resize(&mut self, width: f32, height: f32) {
        self.view.on_resize(width, height);
    }

    /// Orientation for picking: the current tilt with the live look, so drags
    /// since the last tick are already reflected.
    fn live_orientation(&self) -> Quat {
        self.smoother.orientation(self.input.look())
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Advance by `dt` seconds against `terrain`.
    ///
    /// Returns `None` until the viewpoint has been placed.
    pub fn tick(&mut self, dt: f32, terrain: &impl RayQuery) -> Option<FrameOutput> {
        if !self.active && !self.try_activate(terrain) {
            return None;
        }

        let timing = self.smoother.timing();
        let scale = timing.scale(dt);
        let mut skipped = Vec::new();

        let base = self.smoother.position();
        let forward = self.live_orientation() * Vec3::NEG_Z;
        let intent = self.input.take_intent(forward, scale);
        self.input.apply_look(intent.yaw_delta, intent.pitch_delta);

        let (moved, out_of_bounds) = self.bounds.clamp_reporting(base + intent.translate);
        skipped.extend(out_of_bounds);

        let (candidate, obstacle_skip) = self.collision.resolve(moved);
        skipped.extend(obstacle_skip);

        // Without ground contact the height stays where it was; only an
        // obstacle push may change it.
        let held = Vec3::new(candidate.x, base.y + (candidate.y - moved.y), candidate.z);

        let mut grounded = false;
        let candidate = if self.terrain == LoadState::Ready {
            let resolution = self.ground.resolve(candidate, terrain);
            if let Some(tilt) = resolution.tilt() {
                self.smoother.set_target_tilt(tilt);
                grounded = true;
            }
            if let GroundResolution::Skipped(reason) = &resolution {
                skipped.push(reason.clone());
            }
            resolution.position_or(held)
        } else {
            held
        };

        let (target, out_of_bounds) = self.bounds.clamp_reporting(candidate);
        skipped.extend(out_of_bounds);

        let displacement = self.smoother.step(target, dt);
        let speed = if scale > 0.0 {
            displacement.length() / scale
        } else {
            0.0
        };
        let shake = self.shake.update(speed, dt);

        let look = self.input.look();
        self.pose = Pose {
            position: self.smoother.position() + shake,
            orientation: self.smoother.orientation(look),
            look,
        };
        self.elapsed += dt;

        for reason in &skipped {
            tracing::trace!(%reason, "Navigation stage skipped");
        }

        Some(FrameOutput {
            pose: self.pose,
            displacement,
            telemetry: TelemetrySample {
                elapsed: self.elapsed,
                dt,
                position: self.pose.position,
                elevation: self.pose.position.y - self.config.telemetry.elevation_reference,
                speed,
                heading: look.yaw,
                grounded,
                shake: shake.length(),
            },
            skipped,
        })
    }

    /// Place the viewpoint once terrain is available, or at the default
    /// position if terrain failed. Returns whether the controller is active.
    fn try_activate(&mut self, terrain: &impl RayQuery) -> bool {
        match self.terrain {
            LoadState::Pending => false,
            LoadState::Failed => {
                let position = self.bounds.clamp(self.config.placement.default_position);
                self.activate(position, LookAngles::default());
                true
            }
            LoadState::Ready => {
                let origin = self.config.placement.ray_origin;
                let Some(hit) = terrain.query_down(origin, self.config.ground.ray_length) else {
                    tracing::debug!(%origin, "Initial placement ray missed, retrying next tick");
                    return false;
                };
                let position = self.ground.resting_position(&hit);
                let look = LookAngles::from_direction(
                    hit.point + hit.normal - position,
                    self.config.input.pitch_limit,
                );
                self.activate(self.bounds.clamp(position), look);
                true
            }
        }
    }

    fn activate(&mut self, position: Vec3, look: LookAngles) {
        tracing::info!(%position, "Viewpoint placed");
        self.input.set_look(look);
        self.smoother.reset(position);
        let look = self.input.look();
        self.pose = Pose {
            position,
            orientation: self.smoother.orientation(look),
            look,
        };
        self.active = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GroundConfig, ShakeConfig};
    use crate::ray::{NoSurface, TriangleSurface};

    fn flat_config() -> NavigationConfig {
        NavigationConfig {
            bounds: NavigationBounds::unbounded(),
            shake: ShakeConfig {
                seed: Some(1),
                ..ShakeConfig::default()
            },
            ..NavigationConfig::default()
        }
    }

    fn lunar_patch() -> TriangleSurface {
        TriangleSurface::flat(-10_000.0, 10_000.0, 5350.0)
    }

    #[test]
    fn test_tick_waits_for_terrain() {
        let mut controller = NavigationController::new(flat_config()).unwrap();
        assert!(controller.tick(1.0 / 60.0, &lunar_patch()).is_none());
        assert!(!controller.is_active());
    }

    #[test]
    fn test_initial_placement_stands_on_terrain() {
        let mut controller = NavigationController::new(flat_config()).unwrap();
        controller.mark_terrain_ready();
        let frame = controller.tick(1.0 / 60.0, &lunar_patch()).unwrap();
        assert!(controller.is_active());
        // Placed at stand height, then held at the padded clearance.
        assert!((frame.pose.position.x).abs() < 1e-3);
        assert!((frame.pose.position.z - 5000.0).abs() < 1e-3);
        let height = frame.pose.position.y - 5350.0;
        assert!((5.0..=7.0 + 1e-3).contains(&height), "height {height}");
        // Looking down at the ground.
        assert!(frame.pose.look.pitch < -1.5);
    }

    #[test]
    fn test_placement_retries_after_miss() {
        let mut controller = NavigationController::new(flat_config()).unwrap();
        controller.mark_terrain_ready();
        assert!(controller.tick(1.0 / 60.0, &NoSurface).is_none());
        assert!(controller.tick(1.0 / 60.0, &lunar_patch()).is_some());
    }

    #[test]
    fn test_failed_terrain_uses_default_position() {
        let mut controller = NavigationController::new(NavigationConfig::default()).unwrap();
        controller.mark_terrain_failed();
        let frame = controller.tick(1.0 / 60.0, &NoSurface).unwrap();
        assert!((frame.pose.position - Vec3::new(1799.0, 5500.0, 5000.0)).length() < 1.0);
        assert!(!frame.telemetry.grounded);
        assert!(!frame.skipped.contains(&NavError::MissingTerrain));
    }

    #[test]
    fn test_forward_key_moves_along_view() {
        let mut config = flat_config();
        config.shake.intensity = 0.0;
        let mut controller = NavigationController::new(config).unwrap();
        controller.mark_terrain_failed();
        controller.tick(1.0 / 60.0, &NoSurface).unwrap();

        controller.on_key("W", true);
        let frame = controller.tick(1.0 / 60.0, &NoSurface).unwrap();
        // Default look faces -Z; smoothing moves 15% of the 40 unit step.
        assert!((frame.displacement - Vec3::new(0.0, 0.0, -6.0)).length() < 1e-3);
        assert!((frame.telemetry.speed - 6.0).abs() < 1e-3);

        controller.on_key("shift", true);
        let frame = controller.tick(1.0 / 60.0, &NoSurface).unwrap();
        assert!((frame.displacement.z + 12.0).abs() < 1e-3);

        // Each tick targets the smoothed position, so releasing stops at once.
        controller.on_key("w", false);
        let frame = controller.tick(1.0 / 60.0, &NoSurface).unwrap();
        assert!(frame.displacement.length() < 1e-4);
    }

    #[test]
    fn test_obstacles_reported_until_loaded() {
        let mut controller = NavigationController::new(flat_config()).unwrap();
        controller.mark_terrain_failed();
        let frame = controller.tick(1.0 / 60.0, &NoSurface).unwrap();
        assert!(frame.skipped.contains(&NavError::ObstacleNotLoaded));

        controller.set_obstacles([[BoundingSphere::new(Vec3::new(0.0, -1000.0, 0.0), 1.0)]]);
        assert_eq!(controller.obstacle_state(), LoadState::Ready);
        let frame = controller.tick(1.0 / 60.0, &NoSurface).unwrap();
        assert!(!frame.skipped.contains(&NavError::ObstacleNotLoaded));
    }

    #[test]
    fn test_steep_terrain_holds_height() {
        let mut config = flat_config();
        config.ground = GroundConfig {
            gravity_blend: 1.0,
            ..GroundConfig::default()
        };
        config.placement.ray_origin = Vec3::new(0.0, 100.0, 0.0);
        let mut controller = NavigationController::new(config).unwrap();
        controller.mark_terrain_ready();
        let steep = TriangleSurface::tilted(1.3, 500.0);
        // Placement itself succeeds, the follower then refuses the slope.
        let frame = controller.tick(1.0 / 60.0, &steep).unwrap();
        assert!(!frame.telemetry.grounded);
        assert!(
            frame
                .skipped
                .iter()
                .any(|reason| matches!(reason, NavError::ExcessiveSlope { .. }))
        );
    }

    /// Orbit-drag the look `radians` upward.
    fn drag_pitch_up(controller: &mut NavigationController, radians: f32) {
        let start = Vec2::new(960.0, 540.0);
        let pixels = radians / controller.config().input.look_sensitivity;
        controller.on_pointer_move(start);
        controller.on_pointer_down(PointerButton::Auxiliary, start);
        controller.on_pointer_move(start - Vec2::Y * pixels);
        controller.on_pointer_up(PointerButton::Auxiliary);
    }

    #[test]
    fn test_missed_ground_holds_height() {
        let mut config = flat_config();
        config.shake.intensity = 0.0;
        let mut controller = NavigationController::new(config).unwrap();
        controller.mark_terrain_ready();
        let placed = controller.tick(1.0 / 60.0, &lunar_patch()).unwrap();
        let y0 = placed.pose.position.y;

        // From looking straight down to slightly above the horizon.
        drag_pitch_up(&mut controller, -placed.pose.look.pitch + 0.127);
        controller.on_key("w", true);
        for _ in 0..30 {
            let frame = controller.tick(1.0 / 60.0, &NoSurface).unwrap();
            assert!(frame.skipped.contains(&NavError::MissingTerrain));
            assert!(frame.pose.look.pitch > 0.1);
            assert!(
                (frame.pose.position.y - y0).abs() < 1e-3,
                "height drifted from {y0} to {}",
                frame.pose.position.y
            );
        }
        assert!(controller.pose().position.z < placed.pose.position.z - 100.0);
    }

    #[test]
    fn test_failed_terrain_holds_height() {
        let mut config = flat_config();
        config.shake.intensity = 0.0;
        let mut controller = NavigationController::new(config).unwrap();
        controller.mark_terrain_failed();
        let y0 = controller.tick(1.0 / 60.0, &NoSurface).unwrap().pose.position.y;

        drag_pitch_up(&mut controller, 0.5);
        controller.on_key("w", true);
        controller.on_key("shift", true);
        for _ in 0..30 {
            let frame = controller.tick(1.0 / 60.0, &NoSurface).unwrap();
            assert!(frame.displacement.length() > 1.0);
            assert!((frame.pose.position.y - y0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_steep_terrain_keeps_height_while_moving() {
        let mut config = flat_config();
        config.shake.intensity = 0.0;
        config.placement.ray_origin = Vec3::new(0.0, 100.0, 0.0);
        let mut controller = NavigationController::new(config).unwrap();
        controller.mark_terrain_ready();
        let steep = TriangleSurface::tilted(1.3, 500.0);
        let y0 = controller.tick(1.0 / 60.0, &steep).unwrap().pose.position.y;

        drag_pitch_up(&mut controller, 0.5);
        controller.on_key("w", true);
        for _ in 0..10 {
            let frame = controller.tick(1.0 / 60.0, &steep).unwrap();
            assert!(!frame.telemetry.grounded);
            assert!((frame.pose.position.y - y0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_pointer_events_before_activation_pick_nothing() {
        let mut controller = NavigationController::new(NavigationConfig::default()).unwrap();
        assert_eq!(controller.on_pointer_move(Vec2::new(960.0, 540.0)), None);
        assert_eq!(
            controller.on_pointer_down(PointerButton::Primary, Vec2::new(960.0, 540.0)),
            None
        );
    }
}
