//! Clickable waypoint markers and pointer hit-testing.

use std::fmt;

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::ray::Ray;
use crate::view::PerspectiveView;

/// Radius of a marker's hit sphere unless configured otherwise.
pub const DEFAULT_MARKER_RADIUS: f32 = 20.0;

/// Height of a marker's label above the marker itself.
pub const LABEL_HEIGHT: f32 = 50.0;

/// Stable identity of a registered marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub u32);

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "marker#{}", self.0)
    }
}

/// A packed `0xRRGGBB` colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerColor(pub u32);

impl MarkerColor {
    pub fn rgb(self) -> [u8; 3] {
        let [_, r, g, b] = self.0.to_be_bytes();
        [r, g, b]
    }

    /// Channels scaled to `0.0..=1.0`, in sRGB.
    pub fn rgb_f32(self) -> [f32; 3] {
        self.rgb().map(|c| f32::from(c) / 255.0)
    }
}

/// Configuration entry for a marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerDefinition {
    pub name: String,
    pub position: Vec3,
    pub color: MarkerColor,
    #[serde(default = "default_radius")]
    pub radius: f32,
}

fn default_radius() -> f32 {
    DEFAULT_MARKER_RADIUS
}

impl MarkerDefinition {
    pub fn new(name: impl Into<String>, position: Vec3, color: MarkerColor) -> Self {
        Self {
            name: name.into(),
            position,
            color,
            radius: DEFAULT_MARKER_RADIUS,
        }
    }
}

/// A registered marker and its current highlight state.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractiveMarker {
    pub id: MarkerId,
    pub position: Vec3,
    pub display_name: String,
    pub color: MarkerColor,
    pub radius: f32,
    pub visible: bool,
}

impl InteractiveMarker {
    pub fn label_position(&self) -> Vec3 {
        self.position + Vec3::Y * LABEL_HEIGHT
    }
}

/// All markers in the scene. At most one is visible at a time.
#[derive(Debug, Clone, Default)]
pub struct MarkerRegistry {
    markers: Vec<InteractiveMarker>,
}

impl MarkerRegistry {
    /// Register `definitions` in order, all hidden.
    pub fn from_definitions(definitions: &[MarkerDefinition]) -> Self {
        let mut registry = Self::default();
        for definition in definitions {
            registry.register(definition);
        }
        registry
    }

    pub fn register(&mut self, definition: &MarkerDefinition) -> MarkerId {
        let id = MarkerId(u32::try_from(self.markers.len()).unwrap_or(u32::MAX));
        self.markers.push(InteractiveMarker {
            id,
            position: definition.position,
            display_name: definition.name.clone(),
            color: definition.color,
            radius: definition.radius,
            visible: false,
        });
        id
    }

    pub fn get(&self, id: MarkerId) -> Option<&InteractiveMarker> {
        self.markers.get(id.0 as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InteractiveMarker> {
        self.markers.iter()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// The highlighted marker, if any.
    pub fn visible(&self) -> Option<MarkerId> {
        self.markers.iter().find(|m| m.visible).map(|m| m.id)
    }

    /// Nearest marker whose hit sphere `ray` intersects, hidden ones included.
    pub fn nearest_hit(&self, ray: &Ray) -> Option<MarkerId> {
        self.markers
            .iter()
            .filter_map(|m| Some((m.id, ray.intersect_sphere(m.position, m.radius)?)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Hide every marker, then show the nearest one hit by `ray`.
    pub fn hover(&mut self, ray: &Ray) -> Option<MarkerId> {
        let hit = self.nearest_hit(ray);
        for marker in &mut self.markers {
            marker.visible = Some(marker.id) == hit;
        }
        hit
    }
}

/// Casts pointer rays from a camera into the marker registry.
#[derive(Debug, Clone, Copy)]
pub struct HitTester<'a> {
    view: &'a PerspectiveView,
    eye: Vec3,
    orientation: Quat,
}

impl<'a> HitTester<'a> {
    pub fn new(view: &'a PerspectiveView, eye: Vec3, orientation: Quat) -> Self {
        Self {
            view,
            eye,
            orientation,
        }
    }

    pub fn ray(&self, ndc: Vec2) -> Ray {
        self.view.ray_from_ndc(self.eye, self.orientation, ndc)
    }

    /// Update hover highlighting for a pointer at `ndc`.
    pub fn hover(&self, registry: &mut MarkerRegistry, ndc: Vec2) -> Option<MarkerId> {
        registry.hover(&self.ray(ndc))
    }

    /// The marker under a click at `ndc`. Visibility is left alone.
    pub fn click(&self, registry: &MarkerRegistry, ndc: Vec2) -> Option<MarkerId> {
        let hit = registry.nearest_hit(&self.ray(ndc));
        if let Some(marker) = hit.and_then(|id| registry.get(id)) {
            tracing::info!(marker = %marker.display_name, "Clicked on {}", marker.display_name);
        }
        hit
    }
}
