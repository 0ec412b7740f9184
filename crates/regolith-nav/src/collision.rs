//! Obstacle avoidance against padded bounding spheres.

use glam::Vec3;

use crate::config::CollisionConfig;
use crate::error::NavError;

/// A sphere enclosing some geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Sphere centred on the points' bounding box, reaching the farthest point.
    ///
    /// `None` when `points` is empty.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let points: Vec<Vec3> = points.into_iter().collect();
        let (min, max) = points.iter().fold(
            (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
            |(lo, hi), p| (lo.min(*p), hi.max(*p)),
        );
        if points.is_empty() {
            return None;
        }
        let center = (min + max) * 0.5;
        let radius = points
            .iter()
            .map(|p| p.distance_squared(center))
            .fold(0.0, f32::max)
            .sqrt();
        Some(Self { center, radius })
    }

    pub fn contains_sphere(&self, other: &Self) -> bool {
        self.center.distance(other.center) + other.radius <= self.radius
    }

    /// Smallest sphere enclosing both.
    pub fn union(&self, other: &Self) -> Self {
        if self.contains_sphere(other) {
            return *self;
        }
        if other.contains_sphere(self) {
            return *other;
        }
        let offset = other.center - self.center;
        let distance = offset.length();
        let radius = (distance + self.radius + other.radius) * 0.5;
        let center = self.center + offset / distance * (radius - self.radius);
        Self { center, radius }
    }

    /// Fold [`BoundingSphere::union`] over `spheres`.
    pub fn union_all(spheres: impl IntoIterator<Item = Self>) -> Option<Self> {
        spheres.into_iter().reduce(|acc, sphere| acc.union(&sphere))
    }
}

/// A padded sphere the viewpoint may not enter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleVolume {
    pub center: Vec3,
    pub radius: f32,
}

impl ObstacleVolume {
    /// Union the sub-mesh spheres of one obstacle and grow the result by `padding`.
    pub fn from_sub_spheres(spheres: impl IntoIterator<Item = BoundingSphere>, padding: f32) -> Option<Self> {
        let sphere = BoundingSphere::union_all(spheres)?;
        Some(Self {
            center: sphere.center,
            radius: sphere.radius + padding,
        })
    }
}

/// Pushes candidates out of obstacle volumes.
#[derive(Debug, Clone)]
pub struct CollisionResolver {
    padding: f32,
    epsilon: f32,
    volumes: Option<Vec<ObstacleVolume>>,
}

impl CollisionResolver {
    pub fn new(config: &CollisionConfig) -> Self {
        Self {
            padding: config.padding,
            epsilon: config.epsilon,
            volumes: None,
        }
    }

    /// Padding to apply when building volumes for this resolver.
    pub fn padding(&self) -> f32 {
        self.padding
    }

    pub fn is_loaded(&self) -> bool {
        self.volumes.is_some()
    }

    pub fn volumes(&self) -> &[ObstacleVolume] {
        self.volumes.as_deref().unwrap_or_default()
    }

    /// Install the obstacle volumes. Registration order is resolution order.
    pub fn set_volumes(&mut self, volumes: Vec<ObstacleVolume>) {
        tracing::info!(count = volumes.len(), "Obstacle volumes loaded");
        self.volumes = Some(volumes);
    }

    /// Eject `candidate` from every volume it lies inside, in registration order.
    ///
    /// Before volumes are loaded the candidate is returned unchanged along
    /// with [`NavError::ObstacleNotLoaded`].
    pub fn resolve(&self, candidate: Vec3) -> (Vec3, Option<NavError>) {
        let Some(volumes) = &self.volumes else {
            return (candidate, Some(NavError::ObstacleNotLoaded));
        };
        let resolved = volumes.iter().fold(candidate, |position, volume| {
            let offset = position - volume.center;
            if offset.length() >= volume.radius {
                return position;
            }
            let direction = offset.try_normalize().unwrap_or(Vec3::Y);
            volume.center + direction * (volume.radius + self.epsilon)
        });
        (resolved, None)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn resolver_with(volumes: Vec<ObstacleVolume>) -> CollisionResolver {
        let mut resolver = CollisionResolver::new(&CollisionConfig::default());
        resolver.set_volumes(volumes);
        resolver
    }

    #[test]
    fn test_pushes_candidate_to_surface() {
        let resolver = resolver_with(vec![ObstacleVolume {
            center: Vec3::ZERO,
            radius: 100.0,
        }]);
        let (resolved, skipped) = resolver.resolve(Vec3::new(10.0, 0.0, 0.0));
        assert!(skipped.is_none());
        assert!((resolved - Vec3::new(100.01, 0.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn test_outside_candidate_is_untouched() {
        let resolver = resolver_with(vec![ObstacleVolume {
            center: Vec3::ZERO,
            radius: 10.0,
        }]);
        let candidate = Vec3::new(0.0, 11.0, 0.0);
        assert_eq!(resolver.resolve(candidate).0, candidate);
    }

    #[test]
    fn test_candidate_at_center_goes_up() {
        let resolver = resolver_with(vec![ObstacleVolume {
            center: Vec3::new(1.0, 2.0, 3.0),
            radius: 10.0,
        }]);
        let (resolved, _) = resolver.resolve(Vec3::new(1.0, 2.0, 3.0));
        assert!((resolved - Vec3::new(1.0, 12.01, 3.0)).length() < 1e-3);
    }

    #[test]
    fn test_not_loaded_is_noop() {
        let resolver = CollisionResolver::new(&CollisionConfig::default());
        let candidate = Vec3::ZERO;
        assert_eq!(
            resolver.resolve(candidate),
            (candidate, Some(NavError::ObstacleNotLoaded))
        );
    }

    #[test]
    fn test_overlapping_volumes_resolve_in_order() {
        let resolver = resolver_with(vec![
            ObstacleVolume {
                center: Vec3::ZERO,
                radius: 10.0,
            },
            ObstacleVolume {
                center: Vec3::new(15.0, 0.0, 0.0),
                radius: 10.0,
            },
        ]);
        // A single pass: ejected from the first sphere into the second, which
        // pushes it back along -X.
        let (resolved, _) = resolver.resolve(Vec3::new(1.0, 0.0, 0.0));
        assert!((resolved - Vec3::new(4.99, 0.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn test_sphere_from_points() {
        let sphere = BoundingSphere::from_points([
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(3.0, 0.0, 0.0),
            Vec3::new(1.0, 2.0, 0.0),
        ])
        .unwrap();
        assert_eq!(sphere.center, Vec3::new(1.0, 1.0, 0.0));
        assert!((sphere.radius - 5f32.sqrt()).abs() < 1e-5);
        assert!(BoundingSphere::from_points([]).is_none());
    }

    #[test]
    fn test_union_encloses_both() {
        let a = BoundingSphere::new(Vec3::ZERO, 1.0);
        let b = BoundingSphere::new(Vec3::new(10.0, 0.0, 0.0), 3.0);
        let u = a.union(&b);
        assert!((u.radius - 7.0).abs() < 1e-5);
        assert!((u.center - Vec3::new(6.0, 0.0, 0.0)).length() < 1e-5);
        for sphere in [a, b] {
            assert!(u.center.distance(sphere.center) + sphere.radius <= u.radius + 1e-4);
        }

        let inner = BoundingSphere::new(Vec3::new(0.5, 0.0, 0.0), 0.2);
        assert_eq!(a.union(&inner), a);
        assert_eq!(inner.union(&a), a);
    }

    #[test]
    fn test_volume_adds_padding() {
        let volume = ObstacleVolume::from_sub_spheres(
            [
                BoundingSphere::new(Vec3::ZERO, 1.0),
                BoundingSphere::new(Vec3::new(4.0, 0.0, 0.0), 1.0),
            ],
            2.0,
        )
        .unwrap();
        assert!((volume.radius - 5.0).abs() < 1e-5);
        assert!((volume.center - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);
        assert!(ObstacleVolume::from_sub_spheres([], 2.0).is_none());
    }

    proptest! {
        #[test]
        fn ejected_points_stay_on_ray_from_center(
            x in -50f32..50.0,
            y in -50f32..50.0,
            z in -50f32..50.0,
        ) {
            let candidate = Vec3::new(x, y, z);
            prop_assume!(candidate.length() > 1e-3 && candidate.length() < 100.0);
            let resolver = resolver_with(vec![ObstacleVolume { center: Vec3::ZERO, radius: 100.0 }]);
            let (resolved, _) = resolver.resolve(candidate);
            prop_assert!(resolved.length() >= 100.0);
            prop_assert!(resolved.normalize().dot(candidate.normalize()) > 1.0 - 1e-4);
        }
    }
}
