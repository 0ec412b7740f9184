//! Key and pointer aggregation into per-tick motion intent.
//!
//! Raw key ids are the strings a windowing layer reports (`"w"`, `"Shift"`,
//! ...). They are lowercased and resolved through the configured bindings, so
//! a host never has to know which logical action a physical key maps to.

use std::collections::{HashMap, HashSet};
use std::f32::consts::{PI, TAU};

use glam::{EulerRot, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::config::InputConfig;

/// Logical navigation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavKey {
    Forward,
    Back,
    StrafeLeft,
    StrafeRight,
    /// Held to switch from walk to run speed.
    Run,
}

impl NavKey {
    /// WASD movement with shift to run.
    pub fn default_bindings() -> HashMap<String, NavKey> {
        [
            ("w", Self::Forward),
            ("s", Self::Back),
            ("a", Self::StrafeLeft),
            ("d", Self::StrafeRight),
            ("shift", Self::Run),
        ]
        .into_iter()
        .map(|(key, nav)| (key.to_owned(), nav))
        .collect()
    }
}

/// Pointer buttons, numbered the way DOM and most toolkits number them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// Usually the left button. Clicks markers.
    Primary,
    /// Usually the middle button. Held to orbit the view.
    Auxiliary,
    /// Usually the right button.
    Secondary,
}

impl PointerButton {
    pub fn from_index(index: u16) -> Option<Self> {
        match index {
            0 => Some(Self::Primary),
            1 => Some(Self::Auxiliary),
            2 => Some(Self::Secondary),
            _ => None,
        }
    }
}

/// Look direction as yaw around world-up and pitch around the local right axis.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LookAngles {
    /// Radians, positive turns left (counter-clockwise seen from above).
    pub yaw: f32,
    /// Radians, positive looks up.
    pub pitch: f32,
}

impl LookAngles {
    /// Rotation taking the camera's rest direction (-Z) to this look direction.
    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    /// Angles that look along `direction`, with pitch limited to `pitch_limit`.
    pub fn from_direction(direction: Vec3, pitch_limit: f32) -> Self {
        let Some(direction) = direction.try_normalize() else {
            return Self::default();
        };
        let pitch = direction.y.clamp(-1.0, 1.0).asin();
        // A vertical direction has no heading of its own; keep facing -Z.
        let yaw = if direction.x.abs() + direction.z.abs() > f32::EPSILON {
            (-direction.x).atan2(-direction.z)
        } else {
            0.0
        };
        Self {
            yaw,
            pitch: pitch.clamp(-pitch_limit, pitch_limit),
        }
    }
}

/// Movement requested for a single tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionIntent {
    /// World-space displacement for this tick.
    pub translate: Vec3,
    /// Yaw from pointer drags since the previous tick.
    pub yaw_delta: f32,
    /// Pitch from pointer drags since the previous tick, already limited so
    /// the committed pitch stays within range.
    pub pitch_delta: f32,
}

/// Accumulates key and pointer state between ticks.
#[derive(Debug, Clone)]
pub struct InputAggregator {
    bindings: HashMap<String, NavKey>,
    pressed: HashSet<NavKey>,
    walk_speed: f32,
    run_speed: f32,
    sensitivity: f32,
    pitch_limit: f32,
    orbiting: bool,
    last_pointer: Option<Vec2>,
    look: LookAngles,
    pending_yaw: f32,
    pending_pitch: f32,
}

impl InputAggregator {
    pub fn new(config: &InputConfig) -> Self {
        Self {
            bindings: config
                .bindings
                .iter()
                .map(|(key, nav)| (key.to_lowercase(), *nav))
                .collect(),
            pressed: HashSet::new(),
            walk_speed: config.walk_speed,
            run_speed: config.run_speed,
            sensitivity: config.look_sensitivity,
            pitch_limit: config.pitch_limit,
            orbiting: false,
            last_pointer: None,
            look: LookAngles::default(),
            pending_yaw: 0.0,
            pending_pitch: 0.0,
        }
    }

    /// Record a key transition. Returns the logical key it maps to, if any.
    pub fn on_key(&mut self, key: &str, pressed: bool) -> Option<NavKey> {
        let nav = *self.bindings.get(&key.to_lowercase())?;
        if pressed {
            self.pressed.insert(nav);
        } else {
            self.pressed.remove(&nav);
        }
        Some(nav)
    }

    pub fn is_pressed(&self, key: NavKey) -> bool {
        self.pressed.contains(&key)
    }

    /// Forget every held key and stop orbiting, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        self.pressed.clear();
        self.orbiting = false;
    }

    pub fn on_pointer_down(&mut self, button: PointerButton) {
        if button == PointerButton::Auxiliary {
            self.orbiting = true;
        }
    }

    pub fn on_pointer_up(&mut self, button: PointerButton) {
        if button == PointerButton::Auxiliary {
            self.orbiting = false;
        }
    }

    pub fn is_orbiting(&self) -> bool {
        self.orbiting
    }

    /// Record a pointer position in client pixels (y grows downward).
    ///
    /// While orbiting, the drag is accumulated into the pending look deltas
    /// handed out by the next [`InputAggregator::take_intent`].
    pub fn on_pointer_move(&mut self, client: Vec2) {
        if self.orbiting
            && let Some(last) = self.last_pointer
        {
            let delta = (client - last) * self.sensitivity;
            let current = self.look().pitch;
            let pitch = (current - delta.y).clamp(-self.pitch_limit, self.pitch_limit);
            self.pending_pitch += pitch - current;
            self.pending_yaw -= delta.x;
        }
        self.last_pointer = Some(client);
    }

    /// Look angles including drags not yet consumed by a tick.
    pub fn look(&self) -> LookAngles {
        LookAngles {
            yaw: wrap_angle(self.look.yaw + self.pending_yaw),
            pitch: self.look.pitch + self.pending_pitch,
        }
    }

    /// Replace the look angles, e.g. after initial placement. Pending drags
    /// are discarded.
    pub fn set_look(&mut self, look: LookAngles) {
        self.look = LookAngles {
            yaw: wrap_angle(look.yaw),
            pitch: look.pitch.clamp(-self.pitch_limit, self.pitch_limit),
        };
        self.pending_yaw = 0.0;
        self.pending_pitch = 0.0;
    }

    /// Turn the committed look by the deltas of a taken intent.
    pub fn apply_look(&mut self, yaw_delta: f32, pitch_delta: f32) {
        self.look = LookAngles {
            yaw: wrap_angle(self.look.yaw + yaw_delta),
            pitch: (self.look.pitch + pitch_delta).clamp(-self.pitch_limit, self.pitch_limit),
        };
    }

    /// Current speed tier.
    pub fn speed(&self) -> f32 {
        if self.is_pressed(NavKey::Run) {
            self.run_speed
        } else {
            self.walk_speed
        }
    }

    /// Build this tick's intent and reset the accumulated look deltas.
    ///
    /// The deltas are not applied here; the caller commits them with
    /// [`InputAggregator::apply_look`].
    ///
    /// `forward` is the camera's current view direction; strafing follows its
    /// cross product with world-up. `scale` multiplies the configured speed
    /// (1 for frame-coupled timing).
    pub fn take_intent(&mut self, forward: Vec3, scale: f32) -> MotionIntent {
        let forward = forward.normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();

        let mut translate = Vec3::ZERO;
        if self.is_pressed(NavKey::Forward) {
            translate += forward;
        }
        if self.is_pressed(NavKey::Back) {
            translate -= forward;
        }
        if self.is_pressed(NavKey::StrafeLeft) {
            translate -= right;
        }
        if self.is_pressed(NavKey::StrafeRight) {
            translate += right;
        }

        let intent = MotionIntent {
            translate: translate * self.speed() * scale,
            yaw_delta: self.pending_yaw,
            pitch_delta: self.pending_pitch,
        };
        self.pending_yaw = 0.0;
        self.pending_pitch = 0.0;
        intent
    }
}

/// Wrap an angle into (-PI, PI].
fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { wrapped + TAU } else { wrapped }
}
