//! Nearest-hit ray queries against static terrain.
//!
//! [`RayQuery`] is the seam between the navigation core and whatever owns the
//! terrain geometry. The viewer implements it over the physics engine's
//! spatial query pipeline; [`TriangleSurface`] wraps a parry trimesh for the
//! replay tool and the tests.

use glam::{Affine3A, Vec2, Vec3};
use parry3d::{
    math::{Isometry, Point, Vector},
    query::RayCast,
    shape::TriMesh,
};

/// A half-line with a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Always normalized.
    pub direction: Vec3,
}

impl Ray {
    /// Build a ray, normalizing `direction`. `None` for a zero or non-finite direction.
    pub fn new(origin: Vec3, direction: Vec3) -> Option<Self> {
        direction.try_normalize().map(|direction| Self { origin, direction })
    }

    /// A ray pointing straight down.
    pub fn down(origin: Vec3) -> Self {
        Self {
            origin,
            direction: Vec3::NEG_Y,
        }
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }

    /// Distance along the ray to the first intersection with a sphere, if any.
    ///
    /// A ray starting inside the sphere hits it at distance zero.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let to_origin = self.origin - center;
        let b = to_origin.dot(self.direction);
        let c = to_origin.length_squared() - radius * radius;
        if c <= 0.0 {
            return Some(0.0);
        }
        if b > 0.0 {
            return None;
        }
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        Some(-b - discriminant.sqrt())
    }
}

/// The nearest intersection of a ray with the terrain, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub point: Vec3,
    /// Unit face normal, oriented toward the ray origin.
    pub normal: Vec3,
    /// Distance from the ray origin to `point`.
    pub distance: f32,
}

/// Nearest-hit queries against immutable terrain.
pub trait RayQuery {
    /// Nearest hit along `ray` no further than `max_distance`.
    fn cast(&self, ray: &Ray, max_distance: f32) -> Option<SurfaceHit>;

    /// Nearest hit straight below `origin`.
    fn query_down(&self, origin: Vec3, max_distance: f32) -> Option<SurfaceHit> {
        self.cast(&Ray::down(origin), max_distance)
    }

    /// Nearest hit along `direction` at any distance.
    fn query_direction(&self, origin: Vec3, direction: Vec3) -> Option<SurfaceHit> {
        self.cast(&Ray::new(origin, direction)?, f32::MAX)
    }
}

impl<T: RayQuery + ?Sized> RayQuery for &T {
    fn cast(&self, ray: &Ray, max_distance: f32) -> Option<SurfaceHit> {
        (**self).cast(ray, max_distance)
    }
}

/// Terrain that is never hit.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSurface;

impl RayQuery for NoSurface {
    fn cast(&self, _ray: &Ray, _max_distance: f32) -> Option<SurfaceHit> {
        None
    }
}

/// World-space triangle mesh queried through parry's trimesh ray cast.
#[derive(Clone)]
pub struct TriangleSurface {
    /// `None` when every triangle was dropped.
    mesh: Option<TriMesh>,
}

impl std::fmt::Debug for TriangleSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriangleSurface")
            .field("triangles", &self.triangle_count())
            .finish()
    }
}

impl TriangleSurface {
    /// Build from an indexed mesh, transforming vertices into world space.
    ///
    /// Triangles referencing missing vertices, and degenerate triangles, are
    /// skipped.
    pub fn from_indexed(positions: &[Vec3], indices: &[[u32; 3]], transform: Affine3A) -> Self {
        let world: Vec<Vec3> = positions
            .iter()
            .map(|p| transform.transform_point3(*p))
            .collect();
        let kept: Vec<[u32; 3]> = indices
            .iter()
            .copied()
            .filter(|[i, j, k]| {
                let (Some(a), Some(b), Some(c)) = (
                    world.get(*i as usize),
                    world.get(*j as usize),
                    world.get(*k as usize),
                ) else {
                    return false;
                };
                (*b - *a).cross(*c - *a).length_squared() > 0.0
            })
            .collect();
        if kept.is_empty() {
            return Self { mesh: None };
        }

        let vertices = world.iter().map(|v| Point::new(v.x, v.y, v.z)).collect();
        let mesh = match TriMesh::new(vertices, kept) {
            Ok(mesh) => mesh,
            Err(e) => {
                tracing::warn!("Failed to build terrain trimesh: {e:?}");
                return Self { mesh: None };
            }
        };
        tracing::debug!(triangles = mesh.num_triangles(), "Built triangle surface");
        Self { mesh: Some(mesh) }
    }

    /// Build a regular height field with `cells` quads per axis of `cell_size`
    /// starting at `origin` (x, z), sampling heights from `height`.
    pub fn from_height_field(
        origin: Vec2,
        cells: [usize; 2],
        cell_size: f32,
        height: impl Fn(f32, f32) -> f32,
    ) -> Self {
        let [nx, nz] = cells;
        let mut positions = Vec::with_capacity((nx + 1) * (nz + 1));
        for j in 0..=nz {
            for i in 0..=nx {
                let x = origin.x + i as f32 * cell_size;
                let z = origin.y + j as f32 * cell_size;
                positions.push(Vec3::new(x, height(x, z), z));
            }
        }

        let stride = nx + 1;
        let index = |i: usize, j: usize| u32::try_from(j * stride + i).unwrap_or(u32::MAX);
        let mut indices = Vec::with_capacity(nx * nz * 2);
        for j in 0..nz {
            for i in 0..nx {
                let a = index(i, j);
                let b = index(i + 1, j);
                let c = index(i, j + 1);
                let d = index(i + 1, j + 1);
                indices.push([a, c, b]);
                indices.push([b, c, d]);
            }
        }
        Self::from_indexed(&positions, &indices, Affine3A::IDENTITY)
    }

    /// A horizontal square at height `y` spanning `min..max` on X and Z.
    pub fn flat(min: f32, max: f32, y: f32) -> Self {
        Self::from_height_field(Vec2::splat(min), [1, 1], max - min, |_, _| y)
    }

    /// A square plane through the origin whose normal is tilted `angle`
    /// radians away from world-up, toward +X.
    pub fn tilted(angle: f32, half_extent: f32) -> Self {
        let rise = -angle.tan();
        Self::from_height_field(
            Vec2::splat(-half_extent),
            [1, 1],
            2.0 * half_extent,
            |x, _| rise * x,
        )
    }

    pub fn triangle_count(&self) -> usize {
        self.mesh.as_ref().map_or(0, TriMesh::num_triangles)
    }
}

impl RayQuery for TriangleSurface {
    fn cast(&self, ray: &Ray, max_distance: f32) -> Option<SurfaceHit> {
        let mesh = self.mesh.as_ref()?;
        let query = parry3d::query::Ray::new(
            Point::new(ray.origin.x, ray.origin.y, ray.origin.z),
            Vector::new(ray.direction.x, ray.direction.y, ray.direction.z),
        );
        let hit = mesh.cast_ray_and_get_normal(&Isometry::identity(), &query, max_distance, false)?;

        let normal = Vec3::new(hit.normal.x, hit.normal.y, hit.normal.z).try_normalize()?;
        let normal = if normal.dot(ray.direction) > 0.0 {
            -normal
        } else {
            normal
        };
        Some(SurfaceHit {
            point: ray.at(hit.time_of_impact),
            normal,
            distance: hit.time_of_impact,
        })
    }
}
