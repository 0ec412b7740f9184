//! End-to-end behaviour of the navigation pipeline.

use glam::{Vec2, Vec3};
use regolith_nav::{
    BoundingSphere, CollisionResolver, GroundFollower, GroundResolution, MarkerColor,
    MarkerDefinition, MarkerId, MarkerRegistry, NavError, NavigationBounds, NavigationConfig,
    NavigationController, NoSurface, PointerButton, Ray, RayQuery, TriangleSurface,
    collision::ObstacleVolume,
    config::{CollisionConfig, GroundConfig},
};

fn seeded(mut config: NavigationConfig) -> NavigationConfig {
    config.shake.seed = Some(11);
    config
}

#[test]
fn test_flat_ground_snap() {
    let terrain = TriangleSurface::flat(-1000.0, 1000.0, 0.0);
    let hit = terrain.query_down(Vec3::new(0.0, 50.0, 0.0), 1000.0).unwrap();
    assert!((hit.normal - Vec3::Y).length() < 1e-5);

    let ground = GroundFollower::new(&GroundConfig {
        padding: 0.0,
        gravity_blend: 1.0,
        ..GroundConfig::default()
    });
    match ground.resolve(Vec3::new(0.0, 50.0, 0.0), &terrain) {
        GroundResolution::Snapped {
            position, normal, ..
        } => {
            assert!((position - Vec3::new(0.0, 5.0, 0.0)).length() < 1e-4);
            assert!((normal - Vec3::Y).length() < 1e-5);
        }
        GroundResolution::Skipped(reason) => panic!("unexpected skip: {reason}"),
    }
}

#[test]
fn test_obstacle_ejection() {
    let mut resolver = CollisionResolver::new(&CollisionConfig::default());
    resolver.set_volumes(vec![ObstacleVolume {
        center: Vec3::ZERO,
        radius: 100.0,
    }]);
    let (resolved, skipped) = resolver.resolve(Vec3::new(10.0, 0.0, 0.0));
    assert!(skipped.is_none());
    assert!(resolved.x >= 100.0 && resolved.x < 100.1);
    assert!(resolved.y.abs() < 1e-5 && resolved.z.abs() < 1e-5);
}

#[test]
fn test_hover_exclusivity() {
    let mut registry = MarkerRegistry::from_definitions(&[
        MarkerDefinition::new("A", Vec3::new(0.0, 200.0, -300.0), MarkerColor(0xff_00_00)),
        MarkerDefinition::new("B", Vec3::new(0.0, 0.0, -300.0), MarkerColor(0x00_ff_00)),
        MarkerDefinition::new("C", Vec3::new(0.0, -200.0, -300.0), MarkerColor(0x00_00_ff)),
    ]);
    let hits_b = Ray::new(Vec3::ZERO, Vec3::NEG_Z).unwrap();
    assert_eq!(registry.hover(&hits_b), Some(MarkerId(1)));
    let visible: Vec<_> = registry.iter().filter(|m| m.visible).map(|m| m.id).collect();
    assert_eq!(visible, [MarkerId(1)]);

    let misses = Ray::new(Vec3::ZERO, Vec3::Z).unwrap();
    assert_eq!(registry.hover(&misses), None);
    assert_eq!(registry.iter().filter(|m| m.visible).count(), 0);
}

#[test]
fn test_controller_stays_in_bounds() {
    let mut config = seeded(NavigationConfig::default());
    let bounds = NavigationBounds::new(Vec3::new(-50.0, 0.0, -50.0), Vec3::new(50.0, 100.0, 50.0));
    config.bounds = bounds;
    config.shake.intensity = 0.0;
    config.placement.ray_origin = Vec3::new(0.0, 90.0, 0.0);
    let terrain = TriangleSurface::flat(-500.0, 500.0, 0.0);

    let mut controller = NavigationController::new(config).unwrap();
    controller.mark_terrain_ready();
    controller.tick(1.0 / 60.0, &terrain).unwrap();
    controller.on_key("w", true);
    controller.on_key("a", true);
    controller.on_key("shift", true);

    let mut saw_out_of_bounds = false;
    for _ in 0..300 {
        let frame = controller.tick(1.0 / 60.0, &terrain).unwrap();
        saw_out_of_bounds |= frame
            .skipped
            .iter()
            .any(|reason| matches!(reason, NavError::OutOfBounds { .. }));
        let p = frame.pose.position;
        assert!(
            (p - bounds.clamp(p)).length() < 1e-3,
            "{p} left the navigation bounds"
        );
    }
    assert!(saw_out_of_bounds);
}

#[test]
fn test_controller_routes_around_obstacle() {
    let mut config = seeded(NavigationConfig::default());
    config.bounds = NavigationBounds::unbounded();
    config.shake.intensity = 0.0;
    let mut controller = NavigationController::new(config).unwrap();
    controller.mark_terrain_failed();
    controller.tick(1.0 / 60.0, &NoSurface).unwrap();

    let start = controller.pose().position;
    let center = start + Vec3::new(0.0, 0.0, -200.0);
    controller.set_obstacles([[BoundingSphere::new(center, 48.0)]]);

    controller.on_key("w", true);
    for _ in 0..600 {
        let frame = controller.tick(1.0 / 60.0, &NoSurface).unwrap();
        // Padding of 2 brings the volume radius to 50.
        assert!(frame.pose.position.distance(center) >= 50.0 - 1e-2);
    }
}

#[test]
fn test_click_reports_marker_under_pointer() {
    let mut config = seeded(NavigationConfig::default());
    config.bounds = NavigationBounds::unbounded();
    config.shake.intensity = 0.0;
    config.placement.default_position = Vec3::ZERO;
    config.markers = vec![MarkerDefinition::new(
        "Beacon",
        Vec3::new(0.0, 0.0, -500.0),
        MarkerColor(0xff_ff_00),
    )];
    let mut controller = NavigationController::new(config).unwrap();
    controller.mark_terrain_failed();
    controller.on_resize(800.0, 600.0);
    controller.tick(1.0 / 60.0, &NoSurface).unwrap();

    let center = Vec2::new(400.0, 300.0);
    assert_eq!(controller.on_pointer_move(center), Some(MarkerId(0)));
    assert_eq!(controller.markers().visible(), Some(MarkerId(0)));

    // Clicking does not change what is highlighted.
    assert_eq!(
        controller.on_pointer_down(PointerButton::Primary, center),
        Some(MarkerId(0))
    );
    assert_eq!(controller.markers().visible(), Some(MarkerId(0)));

    assert_eq!(controller.on_pointer_move(Vec2::new(0.0, 0.0)), None);
    assert_eq!(controller.markers().visible(), None);

    // The auxiliary button orbits instead of clicking.
    assert_eq!(
        controller.on_pointer_down(PointerButton::Auxiliary, center),
        None
    );
    assert!(controller.input().is_orbiting());
}

#[test]
fn test_orbit_then_click_matches_hover() {
    let mut config = seeded(NavigationConfig::default());
    config.bounds = NavigationBounds::unbounded();
    config.shake.intensity = 0.0;
    config.placement.default_position = Vec3::ZERO;
    config.markers = vec![MarkerDefinition::new(
        "East",
        Vec3::new(500.0, 0.0, 0.0),
        MarkerColor(0x00_ff_ff),
    )];
    let mut controller = NavigationController::new(config).unwrap();
    controller.mark_terrain_failed();
    controller.on_resize(800.0, 600.0);
    controller.tick(1.0 / 60.0, &NoSurface).unwrap();

    // Turn a quarter right, from -Z to +X, without ticking.
    let center = Vec2::new(400.0, 300.0);
    let pixels = std::f32::consts::FRAC_PI_2 / controller.config().input.look_sensitivity;
    controller.on_pointer_move(center);
    controller.on_pointer_down(PointerButton::Auxiliary, center);
    controller.on_pointer_move(center + Vec2::X * pixels);
    controller.on_pointer_up(PointerButton::Auxiliary);

    assert_eq!(controller.on_pointer_move(center), Some(MarkerId(0)));
    assert_eq!(
        controller.on_pointer_down(PointerButton::Primary, center),
        Some(MarkerId(0))
    );

    // The tick commits the same look, so picking does not change.
    let frame = controller.tick(1.0 / 60.0, &NoSurface).unwrap();
    assert!((frame.pose.forward() - Vec3::X).length() < 1e-3);
    assert_eq!(
        controller.on_pointer_down(PointerButton::Primary, center),
        Some(MarkerId(0))
    );
}

#[test]
fn test_shake_never_moves_smoothed_path() {
    let terrain = TriangleSurface::flat(-10_000.0, 10_000.0, 5350.0);
    let controller_with_shake = |intensity: f32| {
        let mut config = seeded(NavigationConfig::default());
        config.bounds = NavigationBounds::unbounded();
        config.shake.intensity = intensity;
        config.shake.threshold = 0.0;
        config.shake.normalizer = 1.0;
        let mut controller = NavigationController::new(config).unwrap();
        controller.mark_terrain_ready();
        controller.tick(1.0 / 60.0, &terrain).unwrap();
        controller.on_key("w", true);
        controller.on_key("d", true);
        controller.on_key("shift", true);
        controller
    };
    let mut shaken = controller_with_shake(40.0);
    let mut steady = controller_with_shake(0.0);

    let mut max_offset = 0.0_f32;
    for _ in 0..120 {
        let base = shaken.smoothed_position();
        let frame = shaken.tick(1.0 / 60.0, &terrain).unwrap();
        let reference = steady.tick(1.0 / 60.0, &terrain).unwrap();

        // Displacement is measured on the smoothed path alone.
        assert!((frame.displacement - (shaken.smoothed_position() - base)).length() < 1e-3);
        assert!((frame.displacement - reference.displacement).length() < 1e-3);
        assert!((shaken.smoothed_position() - steady.smoothed_position()).length() < 1e-2);

        let offset = frame.pose.position - shaken.smoothed_position();
        assert!((offset.length() - frame.telemetry.shake).abs() < 1e-2);
        max_offset = max_offset.max(offset.length());
    }
    assert!(max_offset > 1.0, "shake never engaged");
}
