//! Speed-triggered camera jitter.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ShakeConfig;
use crate::smoothing::TimingMode;

/// Produces a decaying positional jitter while the viewpoint moves fast.
#[derive(Debug, Clone)]
pub struct ShakeGenerator {
    intensity: f32,
    decay: f32,
    threshold: f32,
    normalizer: f32,
    timing: TimingMode,
    rng: StdRng,
    offset: Vec3,
}

impl ShakeGenerator {
    pub fn new(config: &ShakeConfig, timing: TimingMode) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            intensity: config.intensity,
            decay: config.decay,
            threshold: config.threshold,
            normalizer: config.normalizer,
            timing,
            rng,
            offset: Vec3::ZERO,
        }
    }

    /// The offset carried from the last update.
    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    /// Shake amplitude produced at `speed`, zero at or below the threshold.
    pub fn amount(&self, speed: f32) -> f32 {
        if speed <= self.threshold {
            return 0.0;
        }
        ((speed - self.threshold) / self.normalizer).min(1.0) * self.intensity
    }

    /// Decay the carried offset, then add fresh jitter for `speed`.
    pub fn update(&mut self, speed: f32, dt: f32) -> Vec3 {
        self.offset *= self.timing.decay(self.decay, dt);
        let amount = self.amount(speed);
        if amount > 0.0 {
            let half = amount * 0.5;
            self.offset += Vec3::new(
                self.rng.random_range(-half..=half),
                self.rng.random_range(-half..=half),
                self.rng.random_range(-half..=half),
            );
        }
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(seed: u64) -> ShakeGenerator {
        ShakeGenerator::new(
            &ShakeConfig {
                seed: Some(seed),
                ..ShakeConfig::default()
            },
            TimingMode::FrameCoupled,
        )
    }

    #[test]
    fn test_no_shake_below_threshold() {
        let mut shake = generator(1);
        for _ in 0..10 {
            assert_eq!(shake.update(5.0, 1.0 / 60.0), Vec3::ZERO);
        }
    }

    #[test]
    fn test_amount_saturates() {
        let shake = generator(1);
        assert!((shake.amount(30.0) - 0.5).abs() < 1e-6);
        assert!((shake.amount(500.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_growth_is_bounded() {
        let mut shake = generator(7);
        // Per-axis fresh contribution is at most half the amount.
        let fresh = Vec3::splat(0.5).length();
        let mut previous = shake.offset();
        for _ in 0..500 {
            let offset = shake.update(200.0, 1.0 / 60.0);
            assert!(offset.length() <= 0.95 * previous.length() + fresh + 1e-5);
            previous = offset;
        }
        // Geometric series bound on the steady state.
        assert!(previous.length() <= fresh / (1.0 - 0.95) + 1e-3);
    }

    #[test]
    fn test_decays_monotonically_once_stopped() {
        let mut shake = generator(3);
        for _ in 0..20 {
            shake.update(100.0, 1.0 / 60.0);
        }
        let mut previous = shake.offset().length();
        assert!(previous > 0.0);
        for _ in 0..100 {
            let current = shake.update(0.0, 1.0 / 60.0).length();
            assert!(current <= previous);
            assert!((current - previous * 0.95).abs() < 1e-5);
            previous = current;
        }
    }

    #[test]
    fn test_seeded_sequences_repeat() {
        let mut a = generator(42);
        let mut b = generator(42);
        for _ in 0..10 {
            assert_eq!(a.update(80.0, 0.016), b.update(80.0, 0.016));
        }
    }
}
