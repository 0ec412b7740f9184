//! Physics integration.
//!
//! avian3d is used only for its spatial query pipeline: terrain meshes get
//! static trimesh colliders and the navigation core casts rays against them
//! through [`SpatialRayQuery`]. Nothing is simulated.

use avian3d::prelude::*;
use bevy::prelude::*;
use regolith_nav::{Ray, RayQuery, SurfaceHit};

/// Plugin for physics integration.
pub struct PhysicsIntegrationPlugin;

impl Plugin for PhysicsIntegrationPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(PhysicsPlugins::default())
            .insert_resource(Gravity(Vec3::ZERO));
    }
}

/// Marker component for terrain mesh entities that carry a collider.
#[derive(Component)]
pub struct TerrainCollider;

/// Nearest-hit ray queries over the terrain colliders.
pub struct SpatialRayQuery<'a, 'w, 's> {
    query: &'a SpatialQuery<'w, 's>,
    filter: SpatialQueryFilter,
}

impl<'a, 'w, 's> SpatialRayQuery<'a, 'w, 's> {
    pub fn new(query: &'a SpatialQuery<'w, 's>) -> Self {
        Self {
            query,
            filter: SpatialQueryFilter::default(),
        }
    }
}

impl RayQuery for SpatialRayQuery<'_, '_, '_> {
    fn cast(&self, ray: &Ray, max_distance: f32) -> Option<SurfaceHit> {
        let direction = Dir3::new(ray.direction).ok()?;
        // Solid casts would report a zero-distance hit from inside a trimesh.
        let hit = self
            .query
            .cast_ray(ray.origin, direction, max_distance, false, &self.filter)?;
        Some(surface_hit(ray, hit.distance, hit.normal))
    }
}

/// Build a hit whose normal faces back toward the ray origin.
fn surface_hit(ray: &Ray, distance: f32, normal: Vec3) -> SurfaceHit {
    let normal = normal.normalize_or(Vec3::Y);
    let normal = if normal.dot(ray.direction) > 0.0 {
        -normal
    } else {
        normal
    };
    SurfaceHit {
        point: ray.at(distance),
        normal,
        distance,
    }
}
