//! Exponential smoothing of the viewpoint's position and terrain tilt.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::config::SmoothingConfig;
use crate::input::LookAngles;

/// How per-tick factors relate to elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingMode {
    /// Factors apply once per tick regardless of `dt`.
    #[default]
    FrameCoupled,
    /// Factors are defined per `reference_dt` seconds and rescaled to the
    /// actual tick length.
    DtNormalized { reference_dt: f32 },
}

impl TimingMode {
    /// Number of reference frames covered by a tick of `dt` seconds.
    pub fn scale(self, dt: f32) -> f32 {
        match self {
            Self::FrameCoupled => 1.0,
            Self::DtNormalized { reference_dt } => (dt / reference_dt).max(0.0),
        }
    }

    /// Blend factor for a tick of `dt` seconds.
    pub fn factor(self, factor: f32, dt: f32) -> f32 {
        match self {
            Self::FrameCoupled => factor,
            Self::DtNormalized { .. } => 1.0 - (1.0 - factor).powf(self.scale(dt)),
        }
    }

    /// Retention multiplier for a tick of `dt` seconds.
    pub fn decay(self, decay: f32, dt: f32) -> f32 {
        match self {
            Self::FrameCoupled => decay,
            Self::DtNormalized { .. } => decay.powf(self.scale(dt)),
        }
    }
}

/// Low-pass filter between the resolved pose and the rendered one.
#[derive(Debug, Clone)]
pub struct MotionSmoother {
    position_factor: f32,
    rotation_factor: f32,
    timing: TimingMode,
    position: Vec3,
    tilt: Quat,
    target_tilt: Quat,
}

impl MotionSmoother {
    pub fn new(config: &SmoothingConfig, position: Vec3) -> Self {
        Self {
            position_factor: config.position_factor,
            rotation_factor: config.rotation_factor,
            timing: config.timing,
            position,
            tilt: Quat::IDENTITY,
            target_tilt: Quat::IDENTITY,
        }
    }

    pub fn timing(&self) -> TimingMode {
        self.timing
    }

    /// Jump to `position` with no tilt and no pending motion.
    pub fn reset(&mut self, position: Vec3) {
        self.position = position;
        self.tilt = Quat::IDENTITY;
        self.target_tilt = Quat::IDENTITY;
    }

    /// Smoothed position, without shake.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn tilt(&self) -> Quat {
        self.tilt
    }

    /// Tilt the smoother converges toward until the next call.
    pub fn set_target_tilt(&mut self, tilt: Quat) {
        self.target_tilt = tilt;
    }

    /// Advance one tick toward `target`, returning this tick's displacement.
    pub fn step(&mut self, target: Vec3, dt: f32) -> Vec3 {
        let previous = self.position;
        self.position = previous.lerp(target, self.timing.factor(self.position_factor, dt));
        self.tilt = self
            .tilt
            .slerp(self.target_tilt, self.timing.factor(self.rotation_factor, dt))
            .normalize();
        self.position - previous
    }

    /// Final orientation: terrain tilt applied on top of the look rotation.
    pub fn orientation(&self, look: LookAngles) -> Quat {
        (self.tilt * look.rotation()).normalize()
    }
}
